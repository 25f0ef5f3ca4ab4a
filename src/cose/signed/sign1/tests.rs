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
use rstest::rstest;

use crate::common::cbor::{CborValue, Codec};
use crate::common::tags::TaggedValue;
use crate::cose::header::{Header, HeaderValue, ProtectedHeaderMap, UnprotectedHeaderMap};
use crate::cose::key::{Algorithm, CoseAlgorithm, CoseKey, MacAlgorithm};
use crate::cose::signed::{to_tag18_sign1, Sign1};
use crate::cose::test_helper::{echo_ctx, ed25519_key, p256_key, EchoBackend, EchoError};
use crate::cose::{HeaderBearer, SignOptions, SignOptionsBuilder, VerifyOptions, VerifyOptionsBuilder};
use crate::error::{CodecError, CoseError, KeyError};

const CONTENT: &[u8] = b"This is the content.";

/// `Sig_structure` for empty protected headers, no external AAD and [`CONTENT`].
const TO_BE_SIGNED: &str = "846A5369676E617475726531404054546869732069732074686520636F6E74656E742E";

fn sign(
    backend: &mut EchoBackend,
    protected: ProtectedHeaderMap,
    payload: Option<&[u8]>,
    options: &SignOptions,
    key: &CoseKey,
) -> Result<Sign1, CoseError<EchoError>> {
    Sign1::sign(
        backend,
        protected,
        UnprotectedHeaderMap::new(),
        payload,
        options,
        key,
    )
}

/// Unprotected headers declaring ES256, which leaves the protected headers empty.
fn unprotected_es256() -> UnprotectedHeaderMap {
    let mut unprotected = UnprotectedHeaderMap::new();
    unprotected.set_algorithm(Algorithm::ES256);
    unprotected
}

#[rstest]
fn sig_structure_matches_reference(mut echo_ctx: EchoBackend, p256_key: CoseKey) {
    let sign1 = Sign1::sign(
        &mut echo_ctx,
        ProtectedHeaderMap::new(),
        unprotected_es256(),
        Some(CONTENT),
        &SignOptions::default(),
        &p256_key,
    )
    .expect("unable to sign");
    assert_eq!(sign1.signature(), hex::decode(TO_BE_SIGNED).unwrap());
    assert_eq!(sign1.payload(), Some(CONTENT));
    assert!(!sign1.is_detached());
    assert!(sign1.headers().protected().bytes().is_empty());
}

#[rstest]
#[case::curve_default(None)]
#[case::key_algorithm(Some(CoseAlgorithm::Sign(Algorithm::ES256)))]
fn inferred_algorithm_is_protected(
    mut echo_ctx: EchoBackend,
    mut p256_key: CoseKey,
    #[case] key_alg: Option<CoseAlgorithm>,
) {
    p256_key.alg = key_alg;
    let sign1 = sign(
        &mut echo_ctx,
        ProtectedHeaderMap::new(),
        Some(b"x".as_slice()),
        &SignOptions::default(),
        &p256_key,
    )
    .unwrap();
    // ["Signature1", h'A10126', h'', h'78']
    assert_eq!(
        hex::encode(sign1.signature()),
        "846a5369676e61747572653143a10126404178"
    );

    let decoded = Sign1::from_bytes(&sign1.to_bytes().unwrap()).unwrap();
    assert_eq!(
        decoded.headers().protected().map().algorithm(),
        Some(Algorithm::ES256.code())
    );
    p256_key.alg = None;
    decoded
        .verify(&mut echo_ctx, Some(&p256_key.to_public()), &VerifyOptions::default())
        .expect("algorithm should be read from the protected headers");
}

#[rstest]
fn sig_structure_includes_protected_and_aad(mut echo_ctx: EchoBackend, p256_key: CoseKey) {
    let mut protected = ProtectedHeaderMap::new();
    protected.set_algorithm(Algorithm::ES256);
    let options = SignOptionsBuilder::default()
        .external_aad(vec![0x11, 0xaa])
        .build()
        .unwrap();
    let sign1 = sign(&mut echo_ctx, protected, Some(b"x".as_slice()), &options, &p256_key).unwrap();
    // ["Signature1", h'A10126', h'11AA', h'78']
    assert_eq!(
        hex::encode(sign1.signature()),
        "846a5369676e61747572653143a101264211aa4178"
    );
}

#[rstest]
#[case::both(Some(CONTENT), Some(CONTENT.to_vec()))]
#[case::neither(None, None)]
fn sign_requires_exactly_one_payload(
    mut echo_ctx: EchoBackend,
    p256_key: CoseKey,
    #[case] payload: Option<&[u8]>,
    #[case] detached: Option<Vec<u8>>,
) {
    let options = SignOptions {
        external_aad: None,
        detached_payload: detached,
    };
    let result = sign(&mut echo_ctx, ProtectedHeaderMap::new(), payload, &options, &p256_key);
    assert!(matches!(result, Err(CoseError::PayloadConfiguration)));
}

#[rstest]
fn detached_payload_roundtrip(mut echo_ctx: EchoBackend, p256_key: CoseKey) {
    let options = SignOptionsBuilder::default()
        .detached_payload(CONTENT.to_vec())
        .build()
        .unwrap();
    let sign1 = Sign1::sign(
        &mut echo_ctx,
        ProtectedHeaderMap::new(),
        unprotected_es256(),
        None,
        &options,
        &p256_key,
    )
    .unwrap();
    assert!(sign1.is_detached());
    assert_eq!(sign1.signature(), hex::decode(TO_BE_SIGNED).unwrap());

    let decoded = Sign1::from_bytes(&sign1.to_bytes().unwrap()).unwrap();
    assert_eq!(decoded.payload(), None);

    let missing = decoded.verify(&mut echo_ctx, Some(&p256_key), &VerifyOptions::default());
    assert!(matches!(missing, Err(CoseError::DetachedPayloadRequired)));

    let verify_options = VerifyOptionsBuilder::default()
        .detached_payload(CONTENT.to_vec())
        .build()
        .unwrap();
    decoded
        .verify(&mut echo_ctx, Some(&p256_key), &verify_options)
        .expect("detached payload should verify");

    let wrong = VerifyOptionsBuilder::default()
        .detached_payload(b"This is other content.".to_vec())
        .build()
        .unwrap();
    let result = decoded.verify(&mut echo_ctx, Some(&p256_key), &wrong);
    assert!(matches!(result, Err(CoseError::SignatureVerification)));
}

#[rstest]
fn verify_rejects_detached_payload_for_embedded(mut echo_ctx: EchoBackend, p256_key: CoseKey) {
    let sign1 = sign(
        &mut echo_ctx,
        ProtectedHeaderMap::new(),
        Some(CONTENT),
        &SignOptions::default(),
        &p256_key,
    )
    .unwrap();
    let options = VerifyOptionsBuilder::default()
        .detached_payload(CONTENT.to_vec())
        .build()
        .unwrap();
    let result = sign1.verify(&mut echo_ctx, Some(&p256_key), &options);
    assert!(matches!(result, Err(CoseError::PayloadConfiguration)));
}

#[rstest]
fn verify_checks_external_aad(mut echo_ctx: EchoBackend, p256_key: CoseKey) {
    let options = SignOptionsBuilder::default()
        .external_aad(b"aad".to_vec())
        .build()
        .unwrap();
    let sign1 = sign(&mut echo_ctx, ProtectedHeaderMap::new(), Some(CONTENT), &options, &p256_key)
        .unwrap();
    let result = sign1.verify(&mut echo_ctx, Some(&p256_key), &VerifyOptions::default());
    assert!(matches!(result, Err(CoseError::SignatureVerification)));
    let good = VerifyOptionsBuilder::default()
        .external_aad(b"aad".to_vec())
        .build()
        .unwrap();
    assert!(sign1.verify(&mut echo_ctx, Some(&p256_key), &good).is_ok());
}

#[rstest]
fn verify_without_key_or_chain(mut echo_ctx: EchoBackend, p256_key: CoseKey) {
    let sign1 = sign(
        &mut echo_ctx,
        ProtectedHeaderMap::new(),
        Some(CONTENT),
        &SignOptions::default(),
        &p256_key,
    )
    .unwrap();
    let result = sign1.verify(&mut echo_ctx, None, &VerifyOptions::default());
    assert!(matches!(result, Err(CoseError::KeyResolution)));
}

#[rstest]
fn verify_with_unsupported_chain_backend(mut echo_ctx: EchoBackend, p256_key: CoseKey) {
    let mut unprotected = UnprotectedHeaderMap::new();
    unprotected.set_x5chain(vec![vec![0x30, 0x00]]);
    let sign1 = Sign1::sign(
        &mut echo_ctx,
        ProtectedHeaderMap::new(),
        unprotected,
        Some(CONTENT),
        &SignOptions::default(),
        &p256_key,
    )
    .unwrap();
    assert_eq!(sign1.x5chain(), Some(vec![[0x30, 0x00].as_slice()]));
    let result = sign1.verify(&mut echo_ctx, None, &VerifyOptions::default());
    assert!(matches!(result, Err(CoseError::X509ChainInvalid(_))));
}

#[rstest]
fn header_and_key_algorithm_mismatch(mut echo_ctx: EchoBackend, p256_key: CoseKey) {
    let mut protected = ProtectedHeaderMap::new();
    protected.set_algorithm(Algorithm::ES384);
    let result = sign(&mut echo_ctx, protected, Some(CONTENT), &SignOptions::default(), &p256_key);
    match result {
        Err(CoseError::AlgorithmMismatch { header, key }) => {
            assert_eq!(header, "ES384");
            assert_eq!(key, "ES256");
        }
        other => panic!("expected an algorithm mismatch, got {other:?}"),
    }
}

#[rstest]
fn algorithm_curve_mismatch(mut echo_ctx: EchoBackend, mut p256_key: CoseKey) {
    p256_key.alg = None;
    let mut protected = ProtectedHeaderMap::new();
    protected.set_algorithm(Algorithm::ES384);
    let result = sign(&mut echo_ctx, protected, Some(CONTENT), &SignOptions::default(), &p256_key);
    match result {
        Err(CoseError::AlgorithmCurveMismatch { algorithm, curve }) => {
            assert_eq!(algorithm, "ES384");
            assert_eq!(curve, "P-256");
        }
        other => panic!("expected an algorithm/curve mismatch, got {other:?}"),
    }
}

#[rstest]
fn eddsa_with_ec_key(mut echo_ctx: EchoBackend, mut p256_key: CoseKey) {
    p256_key.alg = None;
    let mut protected = ProtectedHeaderMap::new();
    protected.set_algorithm(Algorithm::EdDSA);
    let result = sign(&mut echo_ctx, protected, Some(CONTENT), &SignOptions::default(), &p256_key);
    assert!(matches!(result, Err(CoseError::AlgorithmCurveMismatch { .. })));
}

#[rstest]
fn algorithm_from_curve(mut echo_ctx: EchoBackend, mut ed25519_key: CoseKey) {
    ed25519_key.alg = None;
    let sign1 = sign(
        &mut echo_ctx,
        ProtectedHeaderMap::new(),
        Some(CONTENT),
        &SignOptions::default(),
        &ed25519_key,
    )
    .expect("EdDSA should be inferred from Ed25519");
    sign1
        .verify(&mut echo_ctx, Some(&ed25519_key.to_public()), &VerifyOptions::default())
        .unwrap();
}

#[rstest]
fn mac_algorithm_is_not_a_signature_algorithm(mut echo_ctx: EchoBackend, mut p256_key: CoseKey) {
    p256_key.alg = None;
    let mut protected = ProtectedHeaderMap::new();
    protected.set_algorithm(MacAlgorithm::HS256);
    let result = sign(&mut echo_ctx, protected, Some(CONTENT), &SignOptions::default(), &p256_key);
    assert!(matches!(result, Err(CoseError::UnsupportedAlgorithm(alg)) if alg == "HS256"));
}

#[rstest]
fn signing_requires_private_key(mut echo_ctx: EchoBackend, p256_key: CoseKey) {
    let result = sign(
        &mut echo_ctx,
        ProtectedHeaderMap::new(),
        Some(CONTENT),
        &SignOptions::default(),
        &p256_key.to_public(),
    );
    assert!(matches!(
        result,
        Err(CoseError::Key(KeyError::MissingParameter("d")))
    ));
}

#[rstest]
fn protected_headers_take_precedence(mut echo_ctx: EchoBackend, p256_key: CoseKey) {
    let mut protected = ProtectedHeaderMap::new();
    protected.set_key_id(b"protected".to_vec());
    let mut unprotected = UnprotectedHeaderMap::new();
    unprotected.set_key_id(b"unprotected".to_vec());
    unprotected.set_content_format(50);
    let sign1 = Sign1::sign(
        &mut echo_ctx,
        protected,
        unprotected,
        Some(CONTENT),
        &SignOptions::default(),
        &p256_key,
    )
    .unwrap();
    let decoded = Sign1::from_bytes(&sign1.to_bytes().unwrap()).unwrap();
    assert_eq!(decoded, sign1);
    assert_eq!(decoded.headers().key_id(), Some(b"protected".as_slice()));
    assert_eq!(
        decoded.header(Header::ContentType),
        Some(&HeaderValue::Int(50))
    );
}

#[rstest]
fn tampered_protected_headers_fail(mut echo_ctx: EchoBackend, p256_key: CoseKey) {
    let mut protected = ProtectedHeaderMap::new();
    protected.set_key_id(b"11".to_vec());
    let sign1 = sign(&mut echo_ctx, protected, Some(CONTENT), &SignOptions::default(), &p256_key)
        .unwrap();
    let CborValue::Array(mut elements) = sign1.content_for_encoding() else {
        panic!("content must be an array");
    };
    let mut other = ProtectedHeaderMap::new();
    other.set_key_id(b"12".to_vec());
    elements[0] = CborValue::from(
        Codec::canonical()
            .encode(&other.to_cbor_value())
            .unwrap(),
    );
    let tampered = to_tag18_sign1(&CborValue::from(TaggedValue::new(18, CborValue::Array(elements))))
        .unwrap();
    let result = tampered.verify(&mut echo_ctx, Some(&p256_key), &VerifyOptions::default());
    assert!(matches!(result, Err(CoseError::SignatureVerification)));
}

fn tag18(elements: Vec<CborValue>) -> CborValue {
    CborValue::from(TaggedValue::new(18, CborValue::Array(elements)))
}

fn valid_elements() -> Vec<CborValue> {
    vec![
        CborValue::Bytes(vec![]),
        CborValue::Map(vec![]),
        CborValue::Bytes(CONTENT.to_vec()),
        CborValue::Bytes(vec![1, 2, 3]),
    ]
}

#[test]
fn tag18_adapter_accepts_valid_structure() {
    let sign1 = to_tag18_sign1(&tag18(valid_elements())).unwrap();
    assert_eq!(sign1.payload(), Some(CONTENT));
    assert_eq!(sign1.signature(), &[1, 2, 3]);
    assert_eq!(sign1.to_cbor_value(), tag18(valid_elements()));
    assert_eq!(Sign1::try_from(&tag18(valid_elements())), Ok(sign1));
}

#[test]
fn tag18_adapter_accepts_null_payload() {
    let mut elements = valid_elements();
    elements[2] = CborValue::Null;
    let sign1 = to_tag18_sign1(&tag18(elements)).unwrap();
    assert!(sign1.is_detached());
}

#[test]
fn tag18_adapter_rejects_untagged() {
    let result = to_tag18_sign1(&CborValue::Array(valid_elements()));
    assert_eq!(
        result,
        Err(CodecError::shape("COSE_Sign1 is not a Tag, received array"))
    );
}

#[test]
fn tag18_adapter_rejects_other_tag() {
    let value = CborValue::from(TaggedValue::new(17, CborValue::Array(valid_elements())));
    assert_eq!(
        to_tag18_sign1(&value),
        Err(CodecError::TagMismatch {
            expected: 18,
            received: 17
        })
    );
}

#[rstest]
#[case::three(3, "COSE_Sign1 must be an array of 4 elements, received 3")]
#[case::five(5, "COSE_Sign1 must be an array of 4 elements, received 5")]
fn tag18_adapter_rejects_wrong_length(#[case] len: usize, #[case] message: &str) {
    let mut elements = valid_elements();
    elements.resize(len, CborValue::Null);
    assert_eq!(to_tag18_sign1(&tag18(elements)), Err(CodecError::shape(message)));
}

#[test]
fn tag18_adapter_rejects_non_array() {
    let value = CborValue::from(TaggedValue::new(18, CborValue::Text("x".to_string())));
    assert_eq!(
        to_tag18_sign1(&value),
        Err(CodecError::shape(
            "COSE_Sign1 must be an array of 4 elements, received text string"
        ))
    );
}

#[rstest]
#[case::protected(0, CborValue::Map(vec![]), "index 0 (protectedHeaders) must be a byte string, received map")]
#[case::unprotected(1, CborValue::Bytes(vec![]), "index 1 (unprotectedHeaders) must be a map, received byte string")]
#[case::payload(2, CborValue::Integer(1), "index 2 (payload) must be a byte string or null, received integer")]
#[case::signature(3, CborValue::Null, "index 3 (signature or tag) must be a byte string, received null")]
fn tag18_adapter_rejects_wrong_element(
    #[case] index: usize,
    #[case] value: CborValue,
    #[case] message: &str,
) {
    let mut elements = valid_elements();
    elements[index] = value;
    assert_eq!(to_tag18_sign1(&tag18(elements)), Err(CodecError::shape(message)));
}

#[test]
fn tag18_adapter_reports_first_violation() {
    let elements = vec![
        CborValue::Integer(1),
        CborValue::Integer(2),
        CborValue::Integer(3),
        CborValue::Integer(4),
    ];
    assert_eq!(
        to_tag18_sign1(&tag18(elements)),
        Err(CodecError::shape(
            "index 0 (protectedHeaders) must be a byte string, received integer"
        ))
    );
}

#[test]
fn decode_rejects_invalid_protected_headers() {
    let mut elements = valid_elements();
    // a map with a text label
    elements[0] = CborValue::Bytes(hex::decode("a1616101").unwrap());
    assert!(matches!(
        to_tag18_sign1(&tag18(elements)),
        Err(CodecError::Header(_))
    ));
}

#[cfg(feature = "rustcrypto-ecdsa")]
mod rustcrypto {
    use rstest::rstest;

    use super::CONTENT;
    #[cfg(feature = "rustcrypto-eddsa")]
    use crate::cose::crypto_impl::rustcrypto::CoseRustCryptoCipherError;
    use crate::cose::crypto_impl::rustcrypto::RustCryptoContext;
    use crate::cose::header::{ProtectedHeaderMap, UnprotectedHeaderMap};
    #[cfg(feature = "rustcrypto-eddsa")]
    use crate::cose::key::{Curve, OkpKey};
    use crate::cose::key::{Algorithm, CoseKey};
    use crate::cose::signed::Sign1;
    use crate::cose::test_helper::{p256_key, p384_key, rustcrypto_ctx};
    use crate::cose::{SignOptions, VerifyOptions};
    use crate::error::CoseError;

    #[rstest]
    #[case::es256(p256_key(), Algorithm::ES256, 64)]
    #[case::es384(p384_key(), Algorithm::ES384, 96)]
    fn ecdsa_sign_and_verify(
        mut rustcrypto_ctx: RustCryptoContext,
        #[case] key: CoseKey,
        #[case] algorithm: Algorithm,
        #[case] signature_len: usize,
    ) {
        let mut protected = ProtectedHeaderMap::new();
        protected.set_algorithm(algorithm);
        let sign1 = Sign1::sign(
            &mut rustcrypto_ctx,
            protected,
            UnprotectedHeaderMap::new(),
            Some(CONTENT),
            &SignOptions::default(),
            &key,
        )
        .expect("unable to sign");
        assert_eq!(sign1.signature().len(), signature_len);
        let decoded = Sign1::from_bytes(&sign1.to_bytes().unwrap()).unwrap();
        decoded
            .verify(&mut rustcrypto_ctx, Some(&key.to_public()), &VerifyOptions::default())
            .expect("unable to verify");
    }

    #[rstest]
    fn ecdsa_rejects_modified_signature(mut rustcrypto_ctx: RustCryptoContext, p256_key: CoseKey) {
        let sign1 = Sign1::sign(
            &mut rustcrypto_ctx,
            ProtectedHeaderMap::new(),
            UnprotectedHeaderMap::new(),
            Some(CONTENT),
            &SignOptions::default(),
            &p256_key,
        )
        .unwrap();
        let mut bytes = sign1.to_bytes().unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0x01;
        let tampered = Sign1::from_bytes(&bytes).unwrap();
        let result = tampered.verify(&mut rustcrypto_ctx, Some(&p256_key), &VerifyOptions::default());
        assert!(matches!(result, Err(CoseError::SignatureVerification)));
    }

    #[rstest]
    fn ecdsa_rejects_wrong_key(
        mut rustcrypto_ctx: RustCryptoContext,
        p256_key: CoseKey,
    ) {
        let sign1 = Sign1::sign(
            &mut rustcrypto_ctx,
            ProtectedHeaderMap::new(),
            UnprotectedHeaderMap::new(),
            Some(CONTENT),
            &SignOptions::default(),
            &p256_key,
        )
        .unwrap();
        let other = {
            let crate::cose::key::KeyMaterial::Ec2(mut ec2) = p256_key.material.clone() else {
                panic!("expected an EC2 key");
            };
            // the generator point of P-256
            ec2.x = hex::decode("6b17d1f2e12c4247f8bce6e563a440f277037d812deb33a0f4a13945d898c296")
                .unwrap();
            ec2.y = hex::decode("4fe342e2fe1a7f9b8ee7eb4a7c0f9e162bce33576b315ececbb6406837bf51f5")
                .unwrap();
            ec2.d = None;
            CoseKey::new(ec2)
        };
        let result = sign1.verify(&mut rustcrypto_ctx, Some(&other), &VerifyOptions::default());
        assert!(matches!(result, Err(CoseError::SignatureVerification)));
    }

    #[cfg(feature = "rustcrypto-eddsa")]
    #[rstest]
    fn eddsa_sign_and_verify(mut rustcrypto_ctx: RustCryptoContext) {
        let key = crate::cose::test_helper::ed25519_key();
        let sign1 = Sign1::sign(
            &mut rustcrypto_ctx,
            ProtectedHeaderMap::new(),
            UnprotectedHeaderMap::new(),
            Some(b"".as_slice()),
            &SignOptions::default(),
            &key,
        )
        .unwrap();
        assert_eq!(sign1.signature().len(), 64);
        sign1
            .verify(&mut rustcrypto_ctx, Some(&key.to_public()), &VerifyOptions::default())
            .unwrap();
    }

    #[cfg(feature = "rustcrypto-eddsa")]
    #[rstest]
    fn eddsa_rejects_invalid_public_key(mut rustcrypto_ctx: RustCryptoContext) {
        let key = crate::cose::test_helper::ed25519_key();
        let sign1 = Sign1::sign(
            &mut rustcrypto_ctx,
            ProtectedHeaderMap::new(),
            UnprotectedHeaderMap::new(),
            Some(CONTENT),
            &SignOptions::default(),
            &key,
        )
        .unwrap();
        // y = 2 has no corresponding x on edwards25519
        let mut invalid = [0_u8; 32];
        invalid[0] = 2;
        let public = CoseKey::new(OkpKey {
            crv: Curve::Ed25519,
            x: invalid.to_vec(),
            d: None,
        });
        let result = sign1.verify(&mut rustcrypto_ctx, Some(&public), &VerifyOptions::default());
        assert!(matches!(
            result,
            Err(CoseError::Other(CoseRustCryptoCipherError::SignatureError(_)))
        ));
    }
}
