/*
 * Copyright (c) 2022-2024 The NAMIB Project Developers.
 * Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
 * https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
 * <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
 * option. This file may not be copied, modified, or distributed
 * except according to those terms.
 *
 * SPDX-License-Identifier: MIT OR Apache-2.0
 */

//! Implementations of the backend traits ([`SignCryptoBackend`](crate::SignCryptoBackend),
//! [`MacCryptoBackend`](crate::MacCryptoBackend),
//! [`CertificateBackend`](crate::CertificateBackend)) for different cryptographic libraries.

/// Backend based on the [RustCrypto](https://github.com/RustCrypto) crates.
#[cfg(rustcrypto_base)]
pub mod rustcrypto;
