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

//! Contains the COSE header model.
//!
//! A [`HeaderMap`] maps integer labels to [`HeaderValue`]s. Well-known labels (see [`Header`])
//! only accept the value types registered for them, every other integer label accepts integers,
//! byte strings and arrays of either. The bucket a map belongs to is part of its type:
//! [`ProtectedHeaderMap`] and [`UnprotectedHeaderMap`]. Some headers, such as `crit`, can only be
//! set on the protected bucket.
//!
//! Protected headers are integrity-protected through their encoded form, which is why they are
//! carried as [`ProtectedHeaders`]: the encoded bytes plus a view decoded from them exactly once.

use core::marker::PhantomData;
use std::collections::BTreeMap;

use coset::iana::{self, EnumI64};

use crate::common::cbor::{CborValue, Codec};
use crate::common::constants::header_labels;
use crate::cose::key::CoseAlgorithm;
use crate::error::{CodecError, HeaderError};

#[cfg(test)]
mod tests;

/// Header labels with a registered value type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Header {
    /// `alg` (1): integer algorithm identifier.
    Algorithm,
    /// `crit` (2): labels the recipient must understand. Protected headers only.
    Critical,
    /// `content type` (3): CoAP content format (integer) or media type (text).
    ContentType,
    /// `kid` (4): key identifier.
    KeyId,
    /// `IV` (5): full initialization vector.
    Iv,
    /// `Partial IV` (6).
    PartialIv,
    /// `counter signature` (7), passed through as-is.
    CounterSignature,
    /// `CounterSignature0` (9), passed through as-is.
    CounterSignature0,
    /// `Countersignature version 2` (11), passed through as-is.
    CounterSignatureV2,
    /// `Countersignature0 version 2` (12), passed through as-is.
    CounterSignature0V2,
    /// `x5chain` (33): DER-encoded X.509 certificate, or an array of them with the leaf first.
    X5Chain,
    /// Any other label.
    Other(i64),
}

const WELL_KNOWN: [Header; 11] = [
    Header::Algorithm,
    Header::Critical,
    Header::ContentType,
    Header::KeyId,
    Header::Iv,
    Header::PartialIv,
    Header::CounterSignature,
    Header::CounterSignature0,
    Header::CounterSignatureV2,
    Header::CounterSignature0V2,
    Header::X5Chain,
];

impl Header {
    /// Returns the integer label of this header.
    #[must_use]
    pub fn label(self) -> i64 {
        match self {
            Header::Algorithm => iana::HeaderParameter::Alg.to_i64(),
            Header::Critical => iana::HeaderParameter::Crit.to_i64(),
            Header::ContentType => iana::HeaderParameter::ContentType.to_i64(),
            Header::KeyId => iana::HeaderParameter::Kid.to_i64(),
            Header::Iv => iana::HeaderParameter::Iv.to_i64(),
            Header::PartialIv => iana::HeaderParameter::PartialIv.to_i64(),
            Header::CounterSignature => iana::HeaderParameter::CounterSignature.to_i64(),
            Header::CounterSignature0 => header_labels::COUNTER_SIGNATURE0,
            Header::CounterSignatureV2 => header_labels::COUNTER_SIGNATURE_V2,
            Header::CounterSignature0V2 => header_labels::COUNTER_SIGNATURE0_V2,
            Header::X5Chain => header_labels::X5CHAIN,
            Header::Other(label) => label,
        }
    }

    /// Returns the header for the given integer `label`.
    #[must_use]
    pub fn from_label(label: i64) -> Header {
        WELL_KNOWN
            .into_iter()
            .find(|h| h.label() == label)
            .unwrap_or(Header::Other(label))
    }

    fn expected(self) -> &'static str {
        match self {
            Header::Algorithm => "an integer",
            Header::Critical => "an array of integers",
            Header::ContentType => "an integer or a text string",
            Header::KeyId | Header::Iv | Header::PartialIv => "a byte string",
            Header::CounterSignature0 | Header::CounterSignature0V2 => "a byte string",
            Header::CounterSignature | Header::CounterSignatureV2 => "a CBOR value",
            Header::X5Chain => "a byte string or an array of byte strings",
            Header::Other(_) => {
                "an integer, a byte string, or an array of integers or byte strings"
            }
        }
    }

    fn accepts(self, value: &HeaderValue) -> bool {
        match (self, value) {
            (Header::Algorithm, HeaderValue::Int(_))
            | (Header::Critical, HeaderValue::IntArray(_))
            | (Header::ContentType, HeaderValue::Int(_) | HeaderValue::Text(_))
            | (
                Header::KeyId
                | Header::Iv
                | Header::PartialIv
                | Header::CounterSignature0
                | Header::CounterSignature0V2,
                HeaderValue::Bytes(_),
            )
            | (Header::CounterSignature | Header::CounterSignatureV2, _)
            | (Header::X5Chain, HeaderValue::Bytes(_) | HeaderValue::BytesArray(_))
            | (
                Header::Other(_),
                HeaderValue::Int(_)
                | HeaderValue::IntArray(_)
                | HeaderValue::Bytes(_)
                | HeaderValue::BytesArray(_),
            ) => true,
            _ => false,
        }
    }

    fn value_from_cbor(self, value: &CborValue) -> Result<HeaderValue, HeaderError> {
        let invalid = || HeaderError::InvalidValue {
            label: self.label(),
            expected: self.expected(),
            found: value.kind(),
        };
        let converted = match (self, value) {
            (Header::CounterSignature | Header::CounterSignatureV2, v) => {
                HeaderValue::Cbor(v.clone())
            }
            (_, CborValue::Integer(i)) => HeaderValue::Int(i64::try_from(*i).map_err(|_| invalid())?),
            (_, CborValue::Text(s)) => HeaderValue::Text(s.clone()),
            (_, CborValue::Bytes(b)) => HeaderValue::Bytes(b.clone()),
            (header, CborValue::Array(items)) => {
                let ints = items
                    .iter()
                    .map(|v| v.as_integer().and_then(|i| i64::try_from(i).ok()))
                    .collect::<Option<Vec<_>>>();
                let bytes = items
                    .iter()
                    .map(|v| v.as_bytes().map(<[u8]>::to_vec))
                    .collect::<Option<Vec<_>>>();
                match (ints, bytes) {
                    (_, Some(b)) if header == Header::X5Chain => HeaderValue::BytesArray(b),
                    (Some(i), _) => HeaderValue::IntArray(i),
                    (None, Some(b)) => HeaderValue::BytesArray(b),
                    (None, None) => return Err(invalid()),
                }
            }
            _ => return Err(invalid()),
        };
        if self.accepts(&converted) {
            Ok(converted)
        } else {
            Err(invalid())
        }
    }
}

impl From<i64> for Header {
    fn from(value: i64) -> Self {
        Header::from_label(value)
    }
}

impl From<Header> for i64 {
    fn from(value: Header) -> Self {
        value.label()
    }
}

/// The value of a header.
#[derive(Debug, Clone, PartialEq)]
pub enum HeaderValue {
    /// Integer.
    Int(i64),
    /// Array of integers.
    IntArray(Vec<i64>),
    /// Text string.
    Text(String),
    /// Byte string.
    Bytes(Vec<u8>),
    /// Array of byte strings.
    BytesArray(Vec<Vec<u8>>),
    /// Arbitrary CBOR value, only accepted for counter signatures.
    Cbor(CborValue),
}

impl HeaderValue {
    fn kind(&self) -> &'static str {
        match self {
            HeaderValue::Int(_) => "integer",
            HeaderValue::IntArray(_) => "array of integers",
            HeaderValue::Text(_) => "text string",
            HeaderValue::Bytes(_) => "byte string",
            HeaderValue::BytesArray(_) => "array of byte strings",
            HeaderValue::Cbor(v) => v.kind(),
        }
    }

    /// Returns the contained integer, or `None` if this value is something else.
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            HeaderValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the contained byte string, or `None` if this value is something else.
    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            HeaderValue::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Returns the contained text string, or `None` if this value is something else.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            HeaderValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Converts this value into its CBOR representation.
    #[must_use]
    pub fn to_cbor_value(&self) -> CborValue {
        match self {
            HeaderValue::Int(i) => CborValue::from(*i),
            HeaderValue::IntArray(items) => {
                CborValue::Array(items.iter().copied().map(CborValue::from).collect())
            }
            HeaderValue::Text(s) => CborValue::Text(s.clone()),
            HeaderValue::Bytes(b) => CborValue::Bytes(b.clone()),
            HeaderValue::BytesArray(items) => {
                CborValue::Array(items.iter().cloned().map(CborValue::Bytes).collect())
            }
            HeaderValue::Cbor(v) => v.clone(),
        }
    }
}

impl From<i64> for HeaderValue {
    fn from(value: i64) -> Self {
        HeaderValue::Int(value)
    }
}

impl From<Vec<u8>> for HeaderValue {
    fn from(value: Vec<u8>) -> Self {
        HeaderValue::Bytes(value)
    }
}

impl From<&str> for HeaderValue {
    fn from(value: &str) -> Self {
        HeaderValue::Text(value.to_string())
    }
}

mod private {
    pub trait Sealed {}
    impl Sealed for super::Protected {}
    impl Sealed for super::Unprotected {}
}

/// Marker for the bucket a [`HeaderMap`] belongs to.
pub trait HeaderBucket: private::Sealed {
    /// Name of the bucket, used in error messages.
    const NAME: &'static str;

    /// Whether the given header may be set in this bucket.
    fn permits(header: Header) -> bool;
}

/// Marker for integrity-protected headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Protected;

/// Marker for unprotected headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Unprotected;

impl HeaderBucket for Protected {
    const NAME: &'static str = "protected";

    fn permits(_header: Header) -> bool {
        true
    }
}

impl HeaderBucket for Unprotected {
    const NAME: &'static str = "unprotected";

    fn permits(header: Header) -> bool {
        header != Header::Critical
    }
}

/// Map from header labels to typed values, for the bucket `B`.
#[derive(Debug, Clone, PartialEq)]
pub struct HeaderMap<B: HeaderBucket> {
    entries: BTreeMap<i64, HeaderValue>,
    bucket: PhantomData<B>,
}

/// Headers which are integrity-protected when encoded.
pub type ProtectedHeaderMap = HeaderMap<Protected>;

/// Headers which are not covered by a signature or MAC.
pub type UnprotectedHeaderMap = HeaderMap<Unprotected>;

impl<B: HeaderBucket> Default for HeaderMap<B> {
    fn default() -> Self {
        HeaderMap {
            entries: BTreeMap::new(),
            bucket: PhantomData,
        }
    }
}

impl<B: HeaderBucket> HeaderMap<B> {
    /// Creates an empty header map.
    #[must_use]
    pub fn new() -> HeaderMap<B> {
        HeaderMap::default()
    }

    /// Sets `header` to `value`, replacing any previous value.
    ///
    /// # Errors
    /// - If `value` is not of a type registered for `header`.
    /// - If `header` may not appear in this bucket.
    pub fn set<H>(&mut self, header: H, value: HeaderValue) -> Result<&mut Self, HeaderError>
    where
        H: Into<Header>,
    {
        let header = header.into();
        if !B::permits(header) {
            return Err(HeaderError::NotPermitted {
                label: header.label(),
                bucket: B::NAME,
            });
        }
        if !header.accepts(&value) {
            return Err(HeaderError::InvalidValue {
                label: header.label(),
                expected: header.expected(),
                found: value.kind(),
            });
        }
        self.entries.insert(header.label(), value);
        Ok(self)
    }

    /// Returns the value of `header`, if present.
    pub fn get<H>(&self, header: H) -> Option<&HeaderValue>
    where
        H: Into<Header>,
    {
        self.entries.get(&header.into().label())
    }

    /// Returns `true` if `header` is present.
    pub fn has<H>(&self, header: H) -> bool
    where
        H: Into<Header>,
    {
        self.entries.contains_key(&header.into().label())
    }

    /// Removes `header`, returning its previous value.
    pub fn delete<H>(&mut self, header: H) -> Option<HeaderValue>
    where
        H: Into<Header>,
    {
        self.entries.remove(&header.into().label())
    }

    /// Returns the number of headers in this map.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if this map contains no headers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over all headers in ascending label order.
    pub fn iter(&self) -> impl Iterator<Item = (Header, &HeaderValue)> + '_ {
        self.entries
            .iter()
            .map(|(label, value)| (Header::from_label(*label), value))
    }

    /// Sets the `alg` header.
    pub fn set_algorithm<A>(&mut self, algorithm: A) -> &mut Self
    where
        A: Into<CoseAlgorithm>,
    {
        self.entries.insert(
            Header::Algorithm.label(),
            HeaderValue::Int(algorithm.into().code()),
        );
        self
    }

    /// Sets the `content type` header to a CoAP content format.
    pub fn set_content_format(&mut self, content_format: u16) -> &mut Self {
        self.entries.insert(
            Header::ContentType.label(),
            HeaderValue::Int(i64::from(content_format)),
        );
        self
    }

    /// Sets the `content type` header to a media type.
    pub fn set_content_type(&mut self, media_type: &str) -> &mut Self {
        self.entries.insert(
            Header::ContentType.label(),
            HeaderValue::Text(media_type.to_string()),
        );
        self
    }

    /// Sets the `kid` header.
    pub fn set_key_id(&mut self, key_id: Vec<u8>) -> &mut Self {
        self.entries
            .insert(Header::KeyId.label(), HeaderValue::Bytes(key_id));
        self
    }

    /// Sets the `IV` header.
    pub fn set_iv(&mut self, iv: Vec<u8>) -> &mut Self {
        self.entries.insert(Header::Iv.label(), HeaderValue::Bytes(iv));
        self
    }

    /// Sets the `Partial IV` header.
    pub fn set_partial_iv(&mut self, partial_iv: Vec<u8>) -> &mut Self {
        self.entries
            .insert(Header::PartialIv.label(), HeaderValue::Bytes(partial_iv));
        self
    }

    /// Sets the `x5chain` header to the given DER-encoded certificates, leaf first.
    ///
    /// A single certificate is stored as a bare byte string.
    pub fn set_x5chain(&mut self, mut chain: Vec<Vec<u8>>) -> &mut Self {
        let value = if chain.len() == 1 {
            HeaderValue::Bytes(chain.remove(0))
        } else {
            HeaderValue::BytesArray(chain)
        };
        self.entries.insert(Header::X5Chain.label(), value);
        self
    }

    /// Returns the `alg` header, if present and an integer.
    #[must_use]
    pub fn algorithm(&self) -> Option<i64> {
        self.get(Header::Algorithm).and_then(HeaderValue::as_int)
    }

    /// Returns the `kid` header, if present and a byte string.
    #[must_use]
    pub fn key_id(&self) -> Option<&[u8]> {
        self.get(Header::KeyId).and_then(HeaderValue::as_bytes)
    }

    /// Converts this map into a CBOR map with integer keys in ascending order.
    #[must_use]
    pub fn to_cbor_value(&self) -> CborValue {
        CborValue::Map(
            self.entries
                .iter()
                .map(|(label, value)| (CborValue::from(*label), value.to_cbor_value()))
                .collect(),
        )
    }

    /// Builds a header map from its CBOR representation.
    ///
    /// Maps decoded as objects are accepted as long as every key is the decimal representation
    /// of an integer.
    ///
    /// # Errors
    /// - If `value` is not a map.
    /// - If a key is not an integer label, or appears twice.
    /// - If a value does not have a type registered for its label.
    /// - If a header may not appear in this bucket.
    pub fn from_cbor_value(value: &CborValue) -> Result<HeaderMap<B>, HeaderError> {
        let entries = value
            .map_entries()
            .ok_or(HeaderError::NotAMap(value.kind()))?;
        let mut map = HeaderMap::new();
        for (key, value) in entries {
            let label = match &key {
                CborValue::Integer(i) => i64::try_from(*i).ok(),
                CborValue::Text(s) => s.parse::<i64>().ok(),
                _ => None,
            }
            .ok_or_else(|| HeaderError::NonIntegerLabel(format!("{key:?}")))?;
            if map.entries.contains_key(&label) {
                return Err(HeaderError::DuplicateLabel(label));
            }
            let header = Header::from_label(label);
            let value = header.value_from_cbor(value)?;
            map.set(header, value)?;
        }
        Ok(map)
    }
}

impl HeaderMap<Protected> {
    /// Sets the `crit` header, listing the labels a recipient must understand.
    pub fn set_critical(&mut self, labels: Vec<i64>) -> &mut Self {
        self.entries
            .insert(Header::Critical.label(), HeaderValue::IntArray(labels));
        self
    }
}

/// Protected headers in their encoded form, together with the map decoded from it.
///
/// The encoded bytes are what is signed or MACed. The map is derived from them once at
/// construction and never modified independently. An empty map is encoded as an empty byte
/// string, as required by section 3 of [RFC 8152](https://www.rfc-editor.org/rfc/rfc8152.html#section-3).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProtectedHeaders {
    bytes: Vec<u8>,
    map: ProtectedHeaderMap,
}

impl ProtectedHeaders {
    /// Encodes the given `map` once, canonically.
    ///
    /// # Errors
    /// If the map can't be encoded.
    pub fn from_map(map: ProtectedHeaderMap) -> Result<ProtectedHeaders, CodecError> {
        let bytes = if map.is_empty() {
            Vec::new()
        } else {
            Codec::canonical().encode(&map.to_cbor_value())?
        };
        Ok(ProtectedHeaders { bytes, map })
    }

    /// Decodes the given encoded headers once.
    ///
    /// # Errors
    /// If `bytes` is not empty and does not contain a valid protected header map.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<ProtectedHeaders, CodecError> {
        let map = if bytes.is_empty() {
            ProtectedHeaderMap::new()
        } else {
            ProtectedHeaderMap::from_cbor_value(&Codec::default().decode(&bytes)?)?
        };
        Ok(ProtectedHeaders { bytes, map })
    }

    /// Returns the encoded headers.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Returns the decoded view of the headers.
    #[must_use]
    pub fn map(&self) -> &ProtectedHeaderMap {
        &self.map
    }

    /// Returns the encoded headers, consuming this value.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

impl TryFrom<ProtectedHeaderMap> for ProtectedHeaders {
    type Error = CodecError;

    fn try_from(value: ProtectedHeaderMap) -> Result<Self, Self::Error> {
        ProtectedHeaders::from_map(value)
    }
}
