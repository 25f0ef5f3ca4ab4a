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

use crate::common::cbor::CborValue;
use crate::common::tags::TaggedValue;
use crate::cose::header::{ProtectedHeaderMap, UnprotectedHeaderMap};
use crate::cose::key::{Algorithm, CoseAlgorithm, CoseKey, MacAlgorithm};
use crate::cose::maced::{to_tag17_mac0, Mac0};
use crate::cose::test_helper::{echo_ctx, hmac_key, p256_key, EchoBackend};
use crate::cose::{
    HeaderBearer, SignOptions, SignOptionsBuilder, VerifyOptions, VerifyOptionsBuilder,
};
use crate::error::{CodecError, CoseError, KeyError};

const CONTENT: &[u8] = b"This is the content.";

/// `MAC_structure` for protected headers `{1: 5}`, no external AAD and [`CONTENT`].
const TO_BE_MACED: &str = "84644d41433043a101054054546869732069732074686520636f6e74656e742e";

fn hs256_headers() -> ProtectedHeaderMap {
    let mut protected = ProtectedHeaderMap::new();
    protected.set_algorithm(MacAlgorithm::HS256);
    protected
}

#[rstest]
fn mac_structure_matches_reference(mut echo_ctx: EchoBackend, hmac_key: CoseKey) {
    let mac0 = Mac0::create(
        &mut echo_ctx,
        hs256_headers(),
        UnprotectedHeaderMap::new(),
        Some(CONTENT),
        &SignOptions::default(),
        &hmac_key,
    )
    .expect("unable to create MAC");
    assert_eq!(hex::encode(mac0.tag()), TO_BE_MACED);
    assert_eq!(mac0.mac_algorithm().unwrap(), MacAlgorithm::HS256);
}

#[rstest]
fn algorithm_taken_from_key(mut echo_ctx: EchoBackend, mut hmac_key: CoseKey) {
    let mac0 = Mac0::create(
        &mut echo_ctx,
        ProtectedHeaderMap::new(),
        UnprotectedHeaderMap::new(),
        Some(CONTENT),
        &SignOptions::default(),
        &hmac_key,
    )
    .unwrap();
    assert_eq!(mac0.mac_algorithm().unwrap(), MacAlgorithm::HS256);
    // the inferred algorithm is part of the MAC_structure
    assert_eq!(hex::encode(mac0.tag()), TO_BE_MACED);

    let decoded = Mac0::from_bytes(&mac0.to_bytes().unwrap()).unwrap();
    assert_eq!(
        decoded.headers().protected().map().algorithm(),
        Some(MacAlgorithm::HS256.code())
    );
    hmac_key.alg = None;
    decoded
        .verify(&mut echo_ctx, &hmac_key, &VerifyOptions::default())
        .expect("algorithm should be read from the protected headers");
}

#[rstest]
fn unprotected_algorithm_is_not_duplicated(mut echo_ctx: EchoBackend, hmac_key: CoseKey) {
    let mut unprotected = UnprotectedHeaderMap::new();
    unprotected.set_algorithm(MacAlgorithm::HS256);
    let mac0 = Mac0::create(
        &mut echo_ctx,
        ProtectedHeaderMap::new(),
        unprotected,
        Some(CONTENT),
        &SignOptions::default(),
        &hmac_key,
    )
    .unwrap();
    assert!(mac0.headers().protected().bytes().is_empty());
    assert_eq!(mac0.mac_algorithm().unwrap(), MacAlgorithm::HS256);
}

#[test]
fn absent_mac_algorithm_is_invalid() {
    let mac0 = to_tag17_mac0(&tag17(vec![
        CborValue::Bytes(vec![]),
        CborValue::Map(vec![]),
        CborValue::Bytes(CONTENT.to_vec()),
        CborValue::Bytes(vec![0; 32]),
    ]))
    .unwrap();
    assert!(matches!(
        mac0.mac_algorithm(),
        Err(CoseError::InvalidMacAlgorithm(alg)) if alg == "none"
    ));
}

#[rstest]
fn missing_algorithm(mut echo_ctx: EchoBackend, mut hmac_key: CoseKey) {
    hmac_key.alg = None;
    let result = Mac0::create(
        &mut echo_ctx,
        ProtectedHeaderMap::new(),
        UnprotectedHeaderMap::new(),
        Some(CONTENT),
        &SignOptions::default(),
        &hmac_key,
    );
    assert!(matches!(result, Err(CoseError::MissingAlgorithm)));
}

#[rstest]
fn verify_checks_key_algorithm_first(mut echo_ctx: EchoBackend, mut hmac_key: CoseKey) {
    let mut protected = ProtectedHeaderMap::new();
    protected.set_algorithm(MacAlgorithm::HS384);
    hmac_key.alg = None;
    let mac0 = Mac0::create(
        &mut echo_ctx,
        protected,
        UnprotectedHeaderMap::new(),
        Some(CONTENT),
        &SignOptions::default(),
        &hmac_key,
    )
    .unwrap();
    hmac_key.alg = Some(CoseAlgorithm::Mac(MacAlgorithm::HS256));
    match mac0.verify(&mut echo_ctx, &hmac_key, &VerifyOptions::default()) {
        Err(CoseError::AlgorithmMismatch { header, key }) => {
            assert_eq!(header, "HS384");
            assert_eq!(key, "HS256");
        }
        other => panic!("expected an algorithm mismatch, got {other:?}"),
    }
}

#[rstest]
#[case::signature_algorithm(Algorithm::ES256.code(), "ES256")]
#[case::unknown(-65000, "-65000")]
fn invalid_mac_algorithm(
    mut echo_ctx: EchoBackend,
    hmac_key: CoseKey,
    #[case] code: i64,
    #[case] name: &str,
) {
    let mut protected = ProtectedHeaderMap::new();
    protected
        .set(crate::cose::header::Header::Algorithm, code.into())
        .unwrap();
    let result = Mac0::create(
        &mut echo_ctx,
        protected,
        UnprotectedHeaderMap::new(),
        Some(CONTENT),
        &SignOptions::default(),
        &hmac_key,
    );
    assert!(matches!(result, Err(CoseError::InvalidMacAlgorithm(alg)) if alg == name));
}

#[rstest]
fn mac_algorithm_of_decoded_structure(mut echo_ctx: EchoBackend, mut p256_key: CoseKey) {
    let mut protected = ProtectedHeaderMap::new();
    protected.set_algorithm(Algorithm::ES256);
    let sign1 = crate::cose::signed::Sign1::sign(
        &mut echo_ctx,
        protected,
        UnprotectedHeaderMap::new(),
        Some(CONTENT),
        &SignOptions::default(),
        &p256_key,
    )
    .unwrap();
    let CborValue::Array(elements) = sign1.content_for_encoding() else {
        panic!("content must be an array");
    };
    let mac0 = to_tag17_mac0(&CborValue::from(TaggedValue::new(17, CborValue::Array(elements))))
        .unwrap();
    assert!(matches!(mac0.mac_algorithm(), Err(CoseError::InvalidMacAlgorithm(alg)) if alg == "ES256"));

    p256_key.alg = None;
    let result = mac0.verify(&mut echo_ctx, &p256_key, &VerifyOptions::default());
    assert!(matches!(result, Err(CoseError::InvalidMacAlgorithm(_))));
}

#[rstest]
fn mac_requires_symmetric_key(mut echo_ctx: EchoBackend, mut p256_key: CoseKey) {
    p256_key.alg = None;
    let result = Mac0::create(
        &mut echo_ctx,
        hs256_headers(),
        UnprotectedHeaderMap::new(),
        Some(CONTENT),
        &SignOptions::default(),
        &p256_key,
    );
    assert!(matches!(
        result,
        Err(CoseError::Key(KeyError::UnsupportedValue(e))) if e.kind() == "MAC key type" && e.value() == "EC"
    ));
}

#[rstest]
fn signature_algorithm_on_key(mut echo_ctx: EchoBackend, mut hmac_key: CoseKey) {
    hmac_key.alg = Some(CoseAlgorithm::Sign(Algorithm::ES256));
    let result = Mac0::create(
        &mut echo_ctx,
        ProtectedHeaderMap::new(),
        UnprotectedHeaderMap::new(),
        Some(CONTENT),
        &SignOptions::default(),
        &hmac_key,
    );
    assert!(matches!(result, Err(CoseError::InvalidMacAlgorithm(alg)) if alg == "ES256"));
}

#[rstest]
fn detached_payload(mut echo_ctx: EchoBackend, hmac_key: CoseKey) {
    let options = SignOptionsBuilder::default()
        .detached_payload(CONTENT.to_vec())
        .external_aad(b"aad".to_vec())
        .build()
        .unwrap();
    let mac0 = Mac0::create(
        &mut echo_ctx,
        hs256_headers(),
        UnprotectedHeaderMap::new(),
        None,
        &options,
        &hmac_key,
    )
    .unwrap();
    let decoded = Mac0::from_bytes(&mac0.to_bytes().unwrap()).unwrap();
    assert!(decoded.is_detached());
    assert_eq!(decoded, mac0);

    let result = decoded.verify(&mut echo_ctx, &hmac_key, &VerifyOptions::default());
    assert!(matches!(result, Err(CoseError::DetachedPayloadRequired)));

    let without_aad = VerifyOptionsBuilder::default()
        .detached_payload(CONTENT.to_vec())
        .build()
        .unwrap();
    let result = decoded.verify(&mut echo_ctx, &hmac_key, &without_aad);
    assert!(matches!(result, Err(CoseError::MacVerification)));

    let complete = VerifyOptionsBuilder::default()
        .detached_payload(CONTENT.to_vec())
        .external_aad(b"aad".to_vec())
        .build()
        .unwrap();
    decoded.verify(&mut echo_ctx, &hmac_key, &complete).unwrap();
}

#[rstest]
#[case::both(Some(CONTENT), Some(CONTENT.to_vec()))]
#[case::neither(None, None)]
fn create_requires_exactly_one_payload(
    mut echo_ctx: EchoBackend,
    hmac_key: CoseKey,
    #[case] payload: Option<&[u8]>,
    #[case] detached: Option<Vec<u8>>,
) {
    let options = SignOptions {
        external_aad: None,
        detached_payload: detached,
    };
    let result = Mac0::create(
        &mut echo_ctx,
        hs256_headers(),
        UnprotectedHeaderMap::new(),
        payload,
        &options,
        &hmac_key,
    );
    assert!(matches!(result, Err(CoseError::PayloadConfiguration)));
}

fn tag17(elements: Vec<CborValue>) -> CborValue {
    CborValue::from(TaggedValue::new(17, CborValue::Array(elements)))
}

#[test]
fn tag17_adapter_rejects_sign1_tag() {
    let value = CborValue::from(TaggedValue::new(
        18,
        CborValue::Array(vec![
            CborValue::Bytes(vec![]),
            CborValue::Map(vec![]),
            CborValue::Null,
            CborValue::Bytes(vec![0]),
        ]),
    ));
    assert_eq!(
        to_tag17_mac0(&value),
        Err(CodecError::TagMismatch {
            expected: 17,
            received: 18
        })
    );
}

#[rstest]
#[case::untagged(CborValue::Integer(17), "COSE_Mac0 is not a Tag, received integer")]
#[case::short(tag17(vec![CborValue::Bytes(vec![])]), "COSE_Mac0 must be an array of 4 elements, received 1")]
#[case::tag_not_bytes(
    tag17(vec![CborValue::Bytes(vec![]), CborValue::Map(vec![]), CborValue::Null, CborValue::Text("t".to_string())]),
    "index 3 (signature or tag) must be a byte string, received text string"
)]
fn tag17_adapter_rejects_malformed(#[case] value: CborValue, #[case] message: &str) {
    assert_eq!(to_tag17_mac0(&value), Err(CodecError::shape(message)));
}

#[cfg(feature = "rustcrypto-hmac")]
mod rustcrypto {
    use rstest::rstest;

    use super::{hs256_headers, CONTENT};
    use crate::cose::crypto_impl::rustcrypto::RustCryptoContext;
    use crate::cose::header::{ProtectedHeaderMap, UnprotectedHeaderMap};
    use crate::cose::key::{CoseAlgorithm, CoseKey, MacAlgorithm, SymmetricKey};
    use crate::cose::maced::Mac0;
    use crate::cose::test_helper::{hmac_key, rustcrypto_ctx};
    use crate::cose::{SignOptions, VerifyOptions};
    use crate::error::CoseError;

    /// Tag 17 `COSE_Mac0` for [`CONTENT`] with HS256 and the key "our-secret".
    const HMAC_01: &str = "d18443a10105a054546869732069732074686520636f6e74656e742e5820\
                           a1a848d3471f9d61ee49018d244c824772f223ad4f935293f1789fc3a08d8c58";

    #[rstest]
    fn hmac_reference_output(mut rustcrypto_ctx: RustCryptoContext, hmac_key: CoseKey) {
        let mac0 = Mac0::create(
            &mut rustcrypto_ctx,
            hs256_headers(),
            UnprotectedHeaderMap::new(),
            Some(CONTENT),
            &SignOptions::default(),
            &hmac_key,
        )
        .unwrap();
        assert_eq!(hex::encode(mac0.to_bytes().unwrap()), HMAC_01);
    }

    #[rstest]
    fn hmac_verifies_reference(mut rustcrypto_ctx: RustCryptoContext, hmac_key: CoseKey) {
        let mac0 = Mac0::from_bytes(&hex::decode(HMAC_01).unwrap()).unwrap();
        assert_eq!(mac0.payload(), Some(CONTENT));
        mac0.verify(&mut rustcrypto_ctx, &hmac_key, &VerifyOptions::default())
            .expect("reference tag should verify");
    }

    #[rstest]
    fn hmac_rejects_modified_tag(mut rustcrypto_ctx: RustCryptoContext, hmac_key: CoseKey) {
        let mut bytes = hex::decode(HMAC_01).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0x80;
        let mac0 = Mac0::from_bytes(&bytes).unwrap();
        let result = mac0.verify(&mut rustcrypto_ctx, &hmac_key, &VerifyOptions::default());
        assert!(matches!(result, Err(CoseError::MacVerification)));
    }

    #[rstest]
    #[case::hs384(MacAlgorithm::HS384, 48)]
    #[case::hs512(MacAlgorithm::HS512, 64)]
    fn hmac_tag_lengths(
        mut rustcrypto_ctx: RustCryptoContext,
        #[case] algorithm: MacAlgorithm,
        #[case] tag_len: usize,
    ) {
        let mut key = CoseKey::new(SymmetricKey { k: vec![0x42; 64] });
        key.alg = Some(CoseAlgorithm::Mac(algorithm));
        let mut protected = ProtectedHeaderMap::new();
        protected.set_algorithm(algorithm);
        let mac0 = Mac0::create(
            &mut rustcrypto_ctx,
            protected,
            UnprotectedHeaderMap::new(),
            Some(CONTENT),
            &SignOptions::default(),
            &key,
        )
        .unwrap();
        assert_eq!(mac0.tag().len(), tag_len);
        mac0.verify(&mut rustcrypto_ctx, &key, &VerifyOptions::default())
            .unwrap();
    }
}
