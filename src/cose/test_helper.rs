/*
 * Copyright (c) 2024-2025 The NAMIB Project Developers.
 * Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
 * https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
 * <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
 * option. This file may not be copied, modified, or distributed
 * except according to those terms.
 *
 * SPDX-License-Identifier: MIT OR Apache-2.0
 */

use core::fmt::{Display, Formatter};

use rstest::fixture;

#[cfg(rustcrypto_base)]
use crate::cose::crypto_impl::rustcrypto::RustCryptoContext;
use crate::cose::key::{
    jwk_to_cose_private_key, jwk_to_cose_symmetric_key, Algorithm, CoseKey, Curve, DigestAlgorithm,
    Ec2Key, Jwk, OkpKey, SymmetricKey,
};
use crate::cose::maced::MacCryptoBackend;
use crate::cose::signed::SignCryptoBackend;
use crate::cose::x509::CertificateBackend;
use crate::cose::CryptoBackend;
use crate::error::CoseError;

pub(crate) const P256_JWK: &str = r#"{
    "kty": "EC",
    "kid": "11",
    "crv": "P-256",
    "x": "usWxHK2PmfnHKwXPS54m0kTcGJ90UiglWiGahtagnv8",
    "y": "IBOL-C3BttVivg-lSreASjpkttcsz-1rb7btKLv8EX4",
    "d": "V8kgd2ZBRuh2dgyVINBUqpPDr7BOMGcF22CQMIUHtNM"
}"#;

pub(crate) const ED25519_JWK: &str = r#"{
    "kty": "OKP",
    "crv": "Ed25519",
    "x": "11qYAYKxCrfVS_7TyWQHOg7hcvPapiMlrwIaaPcHURo",
    "d": "nWGxne_9WmC6hEr0kuwsxERJxWl7MmkZcDusAxyuf2A"
}"#;

pub(crate) const HMAC_JWK: &str = r#"{
    "kty": "oct",
    "kid": "our-secret",
    "alg": "HS256",
    "k": "hJtXIZ2uSN5kbQfbtTNWbpdmhkV8FJG-Onbc6mxCcYg"
}"#;

/// The P-256 key "11" from the COSE examples, including its private part.
#[fixture]
pub(crate) fn p256_key() -> CoseKey {
    jwk_to_cose_private_key(&Jwk::from_json(P256_JWK).expect("invalid JWK"))
        .expect("invalid P-256 key")
}

/// The Ed25519 key of test 1 in section 7.1 of RFC 8032.
#[fixture]
pub(crate) fn ed25519_key() -> CoseKey {
    jwk_to_cose_private_key(&Jwk::from_json(ED25519_JWK).expect("invalid JWK"))
        .expect("invalid Ed25519 key")
}

/// The symmetric key "our-secret" from the COSE examples, restricted to HS256.
#[fixture]
pub(crate) fn hmac_key() -> CoseKey {
    jwk_to_cose_symmetric_key(&Jwk::from_json(HMAC_JWK).expect("invalid JWK"))
        .expect("invalid symmetric key")
}

/// A freshly generated P-384 key.
#[cfg(feature = "rustcrypto-ecdsa")]
#[fixture]
pub(crate) fn p384_key() -> CoseKey {
    use p384::elliptic_curve::sec1::ToEncodedPoint;

    let secret = p384::SecretKey::random(&mut rand::rngs::OsRng);
    let point = secret.public_key().to_encoded_point(false);
    CoseKey::new(Ec2Key {
        crv: Curve::P384,
        x: point.x().expect("uncompressed point has x").to_vec(),
        y: point.y().expect("uncompressed point has y").to_vec(),
        d: Some(secret.to_bytes().to_vec()),
    })
}

#[cfg(rustcrypto_base)]
#[fixture]
pub(crate) fn rustcrypto_ctx() -> RustCryptoContext {
    RustCryptoContext::new()
}

#[fixture]
pub(crate) fn echo_ctx() -> EchoBackend {
    EchoBackend
}

/// Backend whose "signatures" and "tags" are the authenticated structure itself.
///
/// Makes the exact `Sig_structure` and `MAC_structure` observable without any cryptography.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct EchoBackend;

#[derive(Debug)]
pub(crate) struct EchoError;

impl Display for EchoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        write!(f, "echo backend error")
    }
}

impl CryptoBackend for EchoBackend {
    type Error = EchoError;
}

fn echo_verify(expected: &[u8], actual: &[u8], error: CoseError<EchoError>) -> Result<(), CoseError<EchoError>> {
    if expected == actual {
        Ok(())
    } else {
        Err(error)
    }
}

impl SignCryptoBackend for EchoBackend {
    fn sign_ecdsa(
        &mut self,
        _algorithm: Algorithm,
        _key: &Ec2Key,
        payload: &[u8],
    ) -> Result<Vec<u8>, CoseError<Self::Error>> {
        Ok(payload.to_vec())
    }

    fn verify_ecdsa(
        &mut self,
        _algorithm: Algorithm,
        _key: &Ec2Key,
        signature: &[u8],
        payload: &[u8],
    ) -> Result<(), CoseError<Self::Error>> {
        echo_verify(payload, signature, CoseError::SignatureVerification)
    }

    fn sign_eddsa(&mut self, _key: &OkpKey, payload: &[u8]) -> Result<Vec<u8>, CoseError<Self::Error>> {
        Ok(payload.to_vec())
    }

    fn verify_eddsa(
        &mut self,
        _key: &OkpKey,
        signature: &[u8],
        payload: &[u8],
    ) -> Result<(), CoseError<Self::Error>> {
        echo_verify(payload, signature, CoseError::SignatureVerification)
    }
}

impl MacCryptoBackend for EchoBackend {
    fn compute_hmac(
        &mut self,
        _digest: DigestAlgorithm,
        _key: &SymmetricKey,
        payload: &[u8],
    ) -> Result<Vec<u8>, CoseError<Self::Error>> {
        Ok(payload.to_vec())
    }

    fn verify_hmac(
        &mut self,
        _digest: DigestAlgorithm,
        _key: &SymmetricKey,
        tag: &[u8],
        payload: &[u8],
    ) -> Result<(), CoseError<Self::Error>> {
        echo_verify(payload, tag, CoseError::MacVerification)
    }
}

impl CertificateBackend for EchoBackend {}
