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

//! Contains [`Mac0`] and the trait backends implement to compute and verify MACs for it.

use crate::cose::key::{
    cose_to_jwk_algorithm, CoseAlgorithm, CoseKey, DigestAlgorithm, KeyMaterial, MacAlgorithm,
    SymmetricKey,
};
use crate::cose::CryptoBackend;
use crate::error::{CoseError, KeyError, UnsupportedValueError};

pub use mac0::{to_tag17_mac0, Mac0};

mod mac0;

/// Trait for cryptographic backends that can perform Message Authentication Code (MAC) computation
/// and verification operations for algorithms used in COSE structures.
pub trait MacCryptoBackend: CryptoBackend {
    /// Computes an HMAC for the given `payload` using the hash function `digest` and `key`.
    ///
    /// The MAC should be computed with the padding specified in RFC 2104 (as described in
    /// section 3.1 of [RFC 9053](https://www.rfc-editor.org/rfc/rfc9053.html#section-3.1)).
    ///
    /// # Errors
    ///
    /// [`CoseError::UnsupportedAlgorithm`] if the backend does not support `digest`, any other
    /// [`CoseError`] for failures of the backend.
    fn compute_hmac(
        &mut self,
        digest: DigestAlgorithm,
        key: &SymmetricKey,
        payload: &[u8],
    ) -> Result<Vec<u8>, CoseError<Self::Error>>;

    /// Verifies the HMAC provided as `tag` for the given `payload` using the hash function
    /// `digest` and `key`.
    ///
    /// The comparison must be performed in constant time.
    ///
    /// # Errors
    ///
    /// [`CoseError::MacVerification`] if the tag does not match, otherwise as for
    /// [`MacCryptoBackend::compute_hmac`].
    fn verify_hmac(
        &mut self,
        digest: DigestAlgorithm,
        key: &SymmetricKey,
        tag: &[u8],
        payload: &[u8],
    ) -> Result<(), CoseError<Self::Error>>;
}

/// Interprets the algorithm header `code` of a MAC structure.
///
/// Returns `None` if no algorithm header is present.
fn header_mac_algorithm<E>(code: Option<i64>) -> Result<Option<MacAlgorithm>, CoseError<E>> {
    code.map(|code| {
        MacAlgorithm::from_code(code).map_err(|_| {
            CoseError::InvalidMacAlgorithm(
                cose_to_jwk_algorithm(code).map_or_else(|_| code.to_string(), str::to_string),
            )
        })
    })
    .transpose()
}

/// Determines the MAC algorithm for `key` given the algorithm header `header` and checks that it
/// agrees with the algorithm the key declares.
fn determine_mac_algorithm<E>(
    header: Option<i64>,
    key: &CoseKey,
) -> Result<MacAlgorithm, CoseError<E>> {
    let algorithm = match (header_mac_algorithm(header)?, key.alg) {
        (Some(algorithm), _) | (None, Some(CoseAlgorithm::Mac(algorithm))) => algorithm,
        (None, Some(CoseAlgorithm::Sign(algorithm))) => {
            return Err(CoseError::InvalidMacAlgorithm(algorithm.to_string()))
        }
        (None, None) => return Err(CoseError::MissingAlgorithm),
    };
    match key.alg {
        Some(key_alg) if key_alg != CoseAlgorithm::Mac(algorithm) => {
            Err(CoseError::AlgorithmMismatch {
                header: algorithm.to_string(),
                key: key_alg.to_string(),
            })
        }
        _ => Ok(algorithm),
    }
}

fn symmetric_key<E>(key: &CoseKey) -> Result<&SymmetricKey, CoseError<E>> {
    match &key.material {
        KeyMaterial::Symmetric(k) => Ok(k),
        _ => Err(KeyError::from(UnsupportedValueError::new(
            "MAC key type",
            key.key_type(),
        ))
        .into()),
    }
}
