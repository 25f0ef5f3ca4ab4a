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

//! Contains [`Sign1`] and the trait backends implement to compute and verify signatures for it.

use log::debug;

use crate::cose::key::{Algorithm, CoseAlgorithm, CoseKey, Ec2Key, KeyMaterial, OkpKey};
use crate::cose::CryptoBackend;
use crate::error::{CoseError, KeyError};

pub use sign1::{to_tag18_sign1, Sign1};

pub(crate) mod sign1;

/// Trait for cryptographic backends that can create and verify digital signatures for COSE
/// structures.
///
/// Every method defaults to [`CoseError::UnsupportedAlgorithm`], implementations override the
/// ones they support.
pub trait SignCryptoBackend: CryptoBackend {
    /// Computes an ECDSA signature over `payload` using the given `algorithm` (ES256, ES384 or
    /// ES512, determining the hash function) and private `key`.
    ///
    /// Callers guarantee that `key` has a private part and lies on the curve belonging to
    /// `algorithm`.
    ///
    /// # Returns
    ///
    /// A signature conforming to section 2.1 of
    /// [RFC 9053](https://www.rfc-editor.org/rfc/rfc9053.html#section-2.1), i.e. the `r` and `s`
    /// values, each padded with zeros to the size of the curve.
    ///
    /// # Errors
    ///
    /// [`CoseError::UnsupportedAlgorithm`] or [`CoseError::UnsupportedCurve`] if the backend
    /// does not support the combination, [`CoseError::Other`] for backend-specific failures.
    #[allow(unused_variables)]
    fn sign_ecdsa(
        &mut self,
        algorithm: Algorithm,
        key: &Ec2Key,
        payload: &[u8],
    ) -> Result<Vec<u8>, CoseError<Self::Error>> {
        Err(CoseError::UnsupportedAlgorithm(algorithm.to_string()))
    }

    /// Verifies the ECDSA `signature` over `payload` using the given `algorithm` and public `key`.
    ///
    /// The signature is user-provided input, implementations must not rely on it being well
    /// formed.
    ///
    /// # Errors
    ///
    /// [`CoseError::SignatureVerification`] if the signature is malformed or does not match.
    /// Otherwise as for [`SignCryptoBackend::sign_ecdsa`].
    #[allow(unused_variables)]
    fn verify_ecdsa(
        &mut self,
        algorithm: Algorithm,
        key: &Ec2Key,
        signature: &[u8],
        payload: &[u8],
    ) -> Result<(), CoseError<Self::Error>> {
        Err(CoseError::UnsupportedAlgorithm(algorithm.to_string()))
    }

    /// Computes an EdDSA signature over `payload` using the given private `key`.
    ///
    /// # Errors
    ///
    /// [`CoseError::UnsupportedCurve`] if the backend does not support the curve of `key`,
    /// [`CoseError::Other`] for backend-specific failures.
    #[allow(unused_variables)]
    fn sign_eddsa(&mut self, key: &OkpKey, payload: &[u8]) -> Result<Vec<u8>, CoseError<Self::Error>> {
        Err(CoseError::UnsupportedAlgorithm(Algorithm::EdDSA.to_string()))
    }

    /// Verifies the EdDSA `signature` over `payload` using the given public `key`.
    ///
    /// # Errors
    ///
    /// [`CoseError::SignatureVerification`] if the signature is malformed or does not match.
    #[allow(unused_variables)]
    fn verify_eddsa(
        &mut self,
        key: &OkpKey,
        signature: &[u8],
        payload: &[u8],
    ) -> Result<(), CoseError<Self::Error>> {
        Err(CoseError::UnsupportedAlgorithm(Algorithm::EdDSA.to_string()))
    }
}

/// Determines the signature algorithm to use with `key` for a structure whose algorithm header
/// is `header`.
///
/// The algorithm header takes precedence, followed by the algorithm of the key and finally the
/// default algorithm for the key's curve. The result is checked against the key.
fn determine_algorithm<E>(header: Option<i64>, key: &CoseKey) -> Result<Algorithm, CoseError<E>> {
    let algorithm = match (header, key.alg) {
        (Some(code), key_alg) => {
            let algorithm = CoseAlgorithm::from_code(code)?;
            if let Some(key_alg) = key_alg.filter(|a| *a != algorithm) {
                return Err(CoseError::AlgorithmMismatch {
                    header: algorithm.to_string(),
                    key: key_alg.to_string(),
                });
            }
            algorithm
        }
        (None, Some(key_alg)) => key_alg,
        (None, None) => key
            .curve()
            .and_then(|crv| crv.default_algorithm())
            .map(CoseAlgorithm::Sign)
            .ok_or(CoseError::MissingAlgorithm)?,
    };
    let CoseAlgorithm::Sign(algorithm) = algorithm else {
        return Err(CoseError::UnsupportedAlgorithm(algorithm.to_string()));
    };
    if let Some(curve) = key.curve() {
        if !algorithm.supports_curve(curve) {
            return Err(CoseError::AlgorithmCurveMismatch {
                algorithm: algorithm.to_string(),
                curve: curve.to_string(),
            });
        }
    }
    Ok(algorithm)
}

/// Signs `structure` with `key` using `algorithm`, which must have been checked against the key.
fn create_signature<B: SignCryptoBackend>(
    backend: &mut B,
    algorithm: Algorithm,
    key: &CoseKey,
    structure: &[u8],
) -> Result<Vec<u8>, CoseError<B::Error>> {
    if !key.is_private() {
        return Err(KeyError::MissingParameter("d").into());
    }
    debug!("Creating {algorithm} signature");
    match (algorithm, &key.material) {
        (Algorithm::ES256 | Algorithm::ES384 | Algorithm::ES512, KeyMaterial::Ec2(ec2)) => {
            backend.sign_ecdsa(algorithm, ec2, structure)
        }
        (Algorithm::EdDSA, KeyMaterial::Okp(okp)) => backend.sign_eddsa(okp, structure),
        (algorithm, _) => Err(CoseError::UnsupportedAlgorithm(algorithm.to_string())),
    }
}

/// Verifies `signature` over `structure` with `key` using `algorithm`.
fn verify_signature<B: SignCryptoBackend>(
    backend: &mut B,
    algorithm: Algorithm,
    key: &CoseKey,
    signature: &[u8],
    structure: &[u8],
) -> Result<(), CoseError<B::Error>> {
    debug!("Verifying {algorithm} signature");
    match (algorithm, &key.material) {
        (Algorithm::ES256 | Algorithm::ES384 | Algorithm::ES512, KeyMaterial::Ec2(ec2)) => {
            backend.verify_ecdsa(algorithm, ec2, signature, structure)
        }
        (Algorithm::EdDSA, KeyMaterial::Okp(okp)) => {
            backend.verify_eddsa(okp, signature, structure)
        }
        (algorithm, _) => Err(CoseError::UnsupportedAlgorithm(algorithm.to_string())),
    }
}
