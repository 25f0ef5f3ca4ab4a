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
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};

use crate::cose::crypto_impl::rustcrypto::RustCryptoContext;
use crate::cose::key::{Curve, OkpKey};
use crate::cose::CryptoBackend;
use crate::error::{CoseError, KeyError};

type Result<T> = core::result::Result<T, CoseError<<RustCryptoContext as CryptoBackend>::Error>>;

impl RustCryptoContext {
    /// Perform an Ed25519 signature operation for the given `payload` using the provided `key`.
    pub(super) fn sign_eddsa(key: &OkpKey, payload: &[u8]) -> Result<Vec<u8>> {
        check_curve(key)?;
        let d = key.d.as_deref().ok_or(KeyError::MissingParameter("d"))?;
        let sign_key = SigningKey::from_bytes(&key_bytes(d, "d")?);
        Ok(sign_key.sign(payload).to_bytes().to_vec())
    }

    /// Perform an Ed25519 verification operation for the given `payload` and `sig`nature using
    /// the provided `key`.
    pub(super) fn verify_eddsa(key: &OkpKey, sig: &[u8], payload: &[u8]) -> Result<()> {
        check_curve(key)?;
        let verify_key = VerifyingKey::from_bytes(&key_bytes(&key.x, "x")?)?;
        let signature = Signature::from_slice(sig).map_err(|_| CoseError::SignatureVerification)?;
        verify_key
            .verify(payload, &signature)
            .map_err(|_| CoseError::SignatureVerification)
    }
}

fn check_curve(key: &OkpKey) -> Result<()> {
    match key.crv {
        Curve::Ed25519 => Ok(()),
        Curve::Ed448 => Err(CoseError::UnsupportedCurve(key.crv.to_string())),
        v => Err(CoseError::AlgorithmCurveMismatch {
            algorithm: "EdDSA".to_string(),
            curve: v.to_string(),
        }),
    }
}

fn key_bytes(value: &[u8], parameter: &'static str) -> Result<[u8; 32]> {
    <[u8; 32]>::try_from(value).map_err(|_| {
        KeyError::invalid_parameter(
            parameter,
            format!("Ed25519 keys are 32 bytes long, got {}", value.len()),
        )
        .into()
    })
}
