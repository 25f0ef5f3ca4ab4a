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
use crate::cose::header::{
    Header, HeaderValue, ProtectedHeaderMap, ProtectedHeaders, UnprotectedHeaderMap,
};
use crate::cose::key::{Algorithm, MacAlgorithm};
use crate::error::HeaderError;

#[rstest]
#[case::alg(Header::Algorithm, 1)]
#[case::crit(Header::Critical, 2)]
#[case::content_type(Header::ContentType, 3)]
#[case::kid(Header::KeyId, 4)]
#[case::iv(Header::Iv, 5)]
#[case::partial_iv(Header::PartialIv, 6)]
#[case::counter_signature(Header::CounterSignature, 7)]
#[case::counter_signature0(Header::CounterSignature0, 9)]
#[case::counter_signature_v2(Header::CounterSignatureV2, 11)]
#[case::counter_signature0_v2(Header::CounterSignature0V2, 12)]
#[case::x5chain(Header::X5Chain, 33)]
#[case::other(Header::Other(-65537), -65537)]
fn header_labels(#[case] header: Header, #[case] label: i64) {
    assert_eq!(header.label(), label);
    assert_eq!(Header::from_label(label), header);
}

#[rstest]
#[case::alg_as_text(Header::Algorithm, HeaderValue::Text("ES256".to_string()))]
#[case::kid_as_int(Header::KeyId, HeaderValue::Int(1))]
#[case::iv_as_text(Header::Iv, HeaderValue::Text("iv".to_string()))]
#[case::crit_as_int(Header::Critical, HeaderValue::Int(1))]
#[case::x5chain_as_ints(Header::X5Chain, HeaderValue::IntArray(vec![1]))]
#[case::other_as_text(Header::Other(100), HeaderValue::Text("x".to_string()))]
fn mistyped_values_are_rejected(#[case] header: Header, #[case] value: HeaderValue) {
    let mut map = ProtectedHeaderMap::new();
    let result = map.set(header, value).map(|_| ());
    assert!(matches!(result, Err(HeaderError::InvalidValue { label, .. }) if label == header.label()));
    assert!(map.is_empty());
}

#[test]
fn set_get_has_delete() {
    let mut map = UnprotectedHeaderMap::new();
    map.set(Header::KeyId, HeaderValue::Bytes(b"11".to_vec()))
        .expect("unable to set kid")
        .set(-70_000_i64, HeaderValue::IntArray(vec![1, 2]))
        .expect("unable to set private header");

    assert!(map.has(Header::KeyId));
    assert!(map.has(4_i64));
    assert_eq!(map.key_id(), Some(b"11".as_slice()));
    assert_eq!(
        map.get(-70_000_i64),
        Some(&HeaderValue::IntArray(vec![1, 2]))
    );
    assert_eq!(
        map.delete(Header::KeyId),
        Some(HeaderValue::Bytes(b"11".to_vec()))
    );
    assert!(!map.has(Header::KeyId));
    assert_eq!(map.len(), 1);
}

#[test]
fn critical_is_protected_only() {
    let mut unprotected = UnprotectedHeaderMap::new();
    assert_eq!(
        unprotected
            .set(Header::Critical, HeaderValue::IntArray(vec![1]))
            .map(|_| ()),
        Err(HeaderError::NotPermitted {
            label: 2,
            bucket: "unprotected"
        })
    );

    let mut protected = ProtectedHeaderMap::new();
    protected.set_critical(vec![33]);
    assert_eq!(
        protected.get(Header::Critical),
        Some(&HeaderValue::IntArray(vec![33]))
    );

    let encoded = CborValue::Map(vec![(CborValue::from(2), CborValue::Array(vec![]))]);
    assert!(UnprotectedHeaderMap::from_cbor_value(&encoded).is_err());
}

#[test]
fn typed_setters() {
    let mut map = ProtectedHeaderMap::new();
    map.set_algorithm(Algorithm::ES256)
        .set_content_format(60)
        .set_iv(vec![1, 2, 3])
        .set_partial_iv(vec![4]);
    assert_eq!(map.algorithm(), Some(-7));
    assert_eq!(map.get(Header::ContentType), Some(&HeaderValue::Int(60)));

    map.set_algorithm(MacAlgorithm::HS256)
        .set_content_type("application/cbor");
    assert_eq!(map.algorithm(), Some(5));
    assert_eq!(
        map.get(Header::ContentType).and_then(HeaderValue::as_text),
        Some("application/cbor")
    );
}

#[test]
fn single_certificate_x5chain_is_a_bare_byte_string() {
    let mut map = UnprotectedHeaderMap::new();
    map.set_x5chain(vec![vec![0x30, 0x00]]);
    assert_eq!(
        map.get(Header::X5Chain),
        Some(&HeaderValue::Bytes(vec![0x30, 0x00]))
    );
    map.set_x5chain(vec![vec![0x30, 0x00], vec![0x30, 0x01]]);
    assert_eq!(
        map.get(Header::X5Chain),
        Some(&HeaderValue::BytesArray(vec![vec![0x30, 0x00], vec![0x30, 0x01]]))
    );
}

#[test]
fn protected_headers_from_map_are_canonical() {
    let mut map = ProtectedHeaderMap::new();
    map.set_key_id(b"11".to_vec()).set_algorithm(Algorithm::ES256);
    let protected = ProtectedHeaders::from_map(map.clone()).expect("unable to encode headers");
    // {1: -7, 4: h'3131'}
    assert_eq!(hex::encode(protected.bytes()), "a2012604423131");
    assert_eq!(protected.map(), &map);

    let decoded = ProtectedHeaders::from_bytes(protected.bytes().to_vec())
        .expect("unable to decode headers");
    assert_eq!(decoded, protected);
}

#[test]
fn empty_protected_headers_are_empty_bytes() {
    let protected =
        ProtectedHeaders::from_map(ProtectedHeaderMap::new()).expect("unable to encode headers");
    assert!(protected.bytes().is_empty());
    let decoded = ProtectedHeaders::from_bytes(Vec::new()).expect("unable to decode headers");
    assert!(decoded.map().is_empty());
}

#[test]
fn protected_bytes_are_kept_verbatim() {
    // Non-canonical order {4: h'3131', 1: -7} must survive decoding untouched.
    let bytes = hex::decode("a2044231310126").expect("invalid hex");
    let protected = ProtectedHeaders::from_bytes(bytes.clone()).expect("unable to decode headers");
    assert_eq!(protected.bytes(), bytes.as_slice());
    assert_eq!(protected.map().algorithm(), Some(-7));
}

#[rstest]
#[case::not_a_map("8101", HeaderError::NotAMap("array"))]
#[case::text_label("a1616101", HeaderError::NonIntegerLabel("Text(\"a\")".to_string()))]
#[case::duplicate("a201260127", HeaderError::DuplicateLabel(1))]
#[case::alg_bytes(
    "a10141ff",
    HeaderError::InvalidValue { label: 1, expected: "an integer", found: "byte string" }
)]
fn invalid_protected_bytes_are_rejected(#[case] hex_bytes: &str, #[case] expected: HeaderError) {
    let bytes = hex::decode(hex_bytes).expect("invalid hex");
    let value = Codec::default().decode(&bytes).expect("invalid CBOR");
    assert_eq!(ProtectedHeaderMap::from_cbor_value(&value), Err(expected));
}

#[test]
fn object_maps_with_numeric_keys_are_accepted() {
    let object = CborValue::Object(
        [
            ("1".to_string(), CborValue::from(-7)),
            ("33".to_string(), CborValue::from(vec![0x30_u8])),
        ]
        .into_iter()
        .collect(),
    );
    let map = UnprotectedHeaderMap::from_cbor_value(&object).expect("invalid headers");
    assert_eq!(map.algorithm(), Some(-7));
    assert_eq!(
        map.get(Header::X5Chain),
        Some(&HeaderValue::Bytes(vec![0x30]))
    );
}

#[test]
fn counter_signatures_are_passed_through() {
    let signature = CborValue::Array(vec![
        CborValue::from(vec![0xa0_u8]),
        CborValue::Map(vec![]),
        CborValue::from(vec![0x01_u8]),
    ]);
    let encoded = CborValue::Map(vec![(CborValue::from(7), signature.clone())]);
    let map = UnprotectedHeaderMap::from_cbor_value(&encoded).expect("invalid headers");
    assert_eq!(
        map.get(Header::CounterSignature),
        Some(&HeaderValue::Cbor(signature))
    );
    assert_eq!(map.to_cbor_value(), encoded);
}
