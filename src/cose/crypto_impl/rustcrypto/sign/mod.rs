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
#[cfg(feature = "rustcrypto-ecdsa")]
use crate::cose::key::{Algorithm, Ec2Key};
#[cfg(feature = "rustcrypto-eddsa")]
use crate::cose::key::OkpKey;
use crate::cose::crypto_impl::rustcrypto::RustCryptoContext;
use crate::cose::signed::SignCryptoBackend;
#[cfg(any(feature = "rustcrypto-ecdsa", feature = "rustcrypto-eddsa"))]
use crate::error::CoseError;

#[cfg(feature = "rustcrypto-ecdsa")]
pub(super) mod ecdsa;
#[cfg(feature = "rustcrypto-eddsa")]
pub(super) mod eddsa;

impl SignCryptoBackend for RustCryptoContext {
    #[cfg(feature = "rustcrypto-ecdsa")]
    fn sign_ecdsa(
        &mut self,
        algorithm: Algorithm,
        key: &Ec2Key,
        payload: &[u8],
    ) -> Result<Vec<u8>, CoseError<Self::Error>> {
        Self::sign_ecdsa(algorithm, key, payload)
    }

    #[cfg(feature = "rustcrypto-ecdsa")]
    fn verify_ecdsa(
        &mut self,
        algorithm: Algorithm,
        key: &Ec2Key,
        signature: &[u8],
        payload: &[u8],
    ) -> Result<(), CoseError<Self::Error>> {
        Self::verify_ecdsa(algorithm, key, signature, payload)
    }

    #[cfg(feature = "rustcrypto-eddsa")]
    fn sign_eddsa(&mut self, key: &OkpKey, payload: &[u8]) -> Result<Vec<u8>, CoseError<Self::Error>> {
        Self::sign_eddsa(key, payload)
    }

    #[cfg(feature = "rustcrypto-eddsa")]
    fn verify_eddsa(
        &mut self,
        key: &OkpKey,
        signature: &[u8],
        payload: &[u8],
    ) -> Result<(), CoseError<Self::Error>> {
        Self::verify_eddsa(key, signature, payload)
    }
}
