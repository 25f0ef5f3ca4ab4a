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
use digest::KeyInit;
use hmac::{Hmac, Mac};
use sha2::{Sha256, Sha384, Sha512};

use crate::cose::crypto_impl::rustcrypto::{CoseRustCryptoCipherError, RustCryptoContext};
use crate::cose::key::{DigestAlgorithm, SymmetricKey};
use crate::cose::CryptoBackend;
use crate::error::CoseError;

type Result<T> = core::result::Result<T, CoseError<<RustCryptoContext as CryptoBackend>::Error>>;

impl RustCryptoContext {
    /// Create the HMAC function `MAC` keyed with `key` and feed it `payload`.
    fn keyed_mac<MAC: Mac + KeyInit>(key: &SymmetricKey, payload: &[u8]) -> Result<MAC> {
        let mut hmac = <MAC as Mac>::new_from_slice(&key.k)
            .map_err(|e| CoseError::Other(CoseRustCryptoCipherError::from(e)))?;
        Mac::update(&mut hmac, payload);
        Ok(hmac)
    }

    /// Compute the HMAC of `payload` using the given `key` with the HMAC function `MAC`.
    fn compute_hmac_using_mac<MAC: Mac + KeyInit>(
        key: &SymmetricKey,
        payload: &[u8],
    ) -> Result<Vec<u8>> {
        Ok(Self::keyed_mac::<MAC>(key, payload)?
            .finalize()
            .into_bytes()
            .to_vec())
    }

    /// Verify the HMAC of `payload` using the given `key` with the HMAC function `MAC`.
    ///
    /// The comparison is performed in constant time by [`Mac::verify_slice`].
    fn verify_hmac_using_mac<MAC: Mac + KeyInit>(
        key: &SymmetricKey,
        payload: &[u8],
        tag: &[u8],
    ) -> Result<()> {
        Self::keyed_mac::<MAC>(key, payload)?
            .verify_slice(tag)
            .map_err(|_| CoseError::MacVerification)
    }

    /// Compute the HMAC of `payload` using the given `key` with the hash function `digest`.
    pub(super) fn compute_hmac(
        digest: DigestAlgorithm,
        key: &SymmetricKey,
        payload: &[u8],
    ) -> Result<Vec<u8>> {
        match digest {
            DigestAlgorithm::Sha256 => Self::compute_hmac_using_mac::<Hmac<Sha256>>(key, payload),
            DigestAlgorithm::Sha384 => Self::compute_hmac_using_mac::<Hmac<Sha384>>(key, payload),
            DigestAlgorithm::Sha512 => Self::compute_hmac_using_mac::<Hmac<Sha512>>(key, payload),
        }
    }

    /// Verify the HMAC `tag` of `payload` using the given `key` with the hash function `digest`.
    pub(super) fn verify_hmac(
        digest: DigestAlgorithm,
        key: &SymmetricKey,
        tag: &[u8],
        payload: &[u8],
    ) -> Result<()> {
        match digest {
            DigestAlgorithm::Sha256 => {
                Self::verify_hmac_using_mac::<Hmac<Sha256>>(key, payload, tag)
            }
            DigestAlgorithm::Sha384 => {
                Self::verify_hmac_using_mac::<Hmac<Sha384>>(key, payload, tag)
            }
            DigestAlgorithm::Sha512 => {
                Self::verify_hmac_using_mac::<Hmac<Sha512>>(key, payload, tag)
            }
        }
    }
}
