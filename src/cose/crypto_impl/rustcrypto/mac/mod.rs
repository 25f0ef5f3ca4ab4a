/*
 * Copyright (c) 2024 The NAMIB Project Developers.
 * Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
 * https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
 * <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
 * option. This file may not be copied, modified, or distributed
 * except according to those terms.
 *
 * SPDX-License-Identifier: MIT OR Apache-2.0
 */
use crate::cose::crypto_impl::rustcrypto::RustCryptoContext;
use crate::cose::key::{DigestAlgorithm, SymmetricKey};
use crate::cose::maced::MacCryptoBackend;
use crate::error::CoseError;

#[cfg(feature = "rustcrypto-hmac")]
mod hmac;

impl MacCryptoBackend for RustCryptoContext {
    fn compute_hmac(
        &mut self,
        digest: DigestAlgorithm,
        key: &SymmetricKey,
        payload: &[u8],
    ) -> Result<Vec<u8>, CoseError<Self::Error>> {
        Self::compute_hmac(digest, key, payload)
    }

    fn verify_hmac(
        &mut self,
        digest: DigestAlgorithm,
        key: &SymmetricKey,
        tag: &[u8],
        payload: &[u8],
    ) -> Result<(), CoseError<Self::Error>> {
        Self::verify_hmac(digest, key, tag, payload)
    }
}
