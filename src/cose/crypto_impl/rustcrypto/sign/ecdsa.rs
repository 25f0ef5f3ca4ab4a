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
use p256::ecdsa::signature::{Signer, Verifier};

use crate::cose::crypto_impl::rustcrypto::{CoseRustCryptoCipherError, RustCryptoContext};
use crate::cose::key::{Algorithm, Curve, Ec2Key};
use crate::cose::CryptoBackend;
use crate::error::{CoseError, KeyError};

type Result<T> = core::result::Result<T, CoseError<<RustCryptoContext as CryptoBackend>::Error>>;

impl RustCryptoContext {
    /// Perform an ECDSA signature operation with the ECDSA variant given in `algorithm` for the
    /// given `payload` using the provided `key`.
    ///
    /// The hash function is the one belonging to the key's curve, which must match `algorithm`.
    pub(super) fn sign_ecdsa(algorithm: Algorithm, key: &Ec2Key, payload: &[u8]) -> Result<Vec<u8>> {
        check_curve(algorithm, key)?;
        let d = key.d.as_deref().ok_or(KeyError::MissingParameter("d"))?;
        match key.crv {
            Curve::P256 => {
                let sign_key = p256::ecdsa::SigningKey::from(p256::SecretKey::from_slice(d)?);
                let signature: p256::ecdsa::Signature = sign_key.sign(payload);
                Ok(signature.to_bytes().to_vec())
            }
            Curve::P384 => {
                let sign_key = p384::ecdsa::SigningKey::from(p384::SecretKey::from_slice(d)?);
                let signature: p384::ecdsa::Signature = sign_key.sign(payload);
                Ok(signature.to_bytes().to_vec())
            }
            // P-521 must implement DigestPrimitive in order to be usable in ECDSA, which p521 only
            // does starting with version 0.14.0.
            v => Err(CoseError::UnsupportedCurve(v.to_string())),
        }
    }

    /// Perform an ECDSA verification operation with the ECDSA variant given in `algorithm` for the
    /// given `payload` and `sig`nature using the provided `key`.
    pub(super) fn verify_ecdsa(
        algorithm: Algorithm,
        key: &Ec2Key,
        sig: &[u8],
        payload: &[u8],
    ) -> Result<()> {
        check_curve(algorithm, key)?;
        let point = sec1_point(key);
        match key.crv {
            Curve::P256 => {
                let verify_key = p256::ecdsa::VerifyingKey::from_sec1_bytes(&point)
                    .map_err(|_| CoseError::Other(CoseRustCryptoCipherError::InvalidPoint))?;
                let signature = p256::ecdsa::Signature::from_slice(sig)
                    .map_err(|_| CoseError::SignatureVerification)?;
                verify_key
                    .verify(payload, &signature)
                    .map_err(|_| CoseError::SignatureVerification)
            }
            Curve::P384 => {
                let verify_key = p384::ecdsa::VerifyingKey::from_sec1_bytes(&point)
                    .map_err(|_| CoseError::Other(CoseRustCryptoCipherError::InvalidPoint))?;
                let signature = p384::ecdsa::Signature::from_slice(sig)
                    .map_err(|_| CoseError::SignatureVerification)?;
                verify_key
                    .verify(payload, &signature)
                    .map_err(|_| CoseError::SignatureVerification)
            }
            v => Err(CoseError::UnsupportedCurve(v.to_string())),
        }
    }
}

fn check_curve(algorithm: Algorithm, key: &Ec2Key) -> Result<()> {
    if algorithm.supports_curve(key.crv) {
        Ok(())
    } else {
        Err(CoseError::AlgorithmCurveMismatch {
            algorithm: algorithm.to_string(),
            curve: key.crv.to_string(),
        })
    }
}

/// Uncompressed SEC1 encoding of the public point of `key`.
fn sec1_point(key: &Ec2Key) -> Vec<u8> {
    let mut point = Vec::with_capacity(1 + key.x.len() + key.y.len());
    point.push(0x04);
    point.extend_from_slice(&key.x);
    point.extend_from_slice(&key.y);
    point
}
