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

//! Contains the CBOR value model and the tag-aware [`Codec`].
//!
//! [`CborValue`] is the logical value every other part of this crate works with. It differs from
//! [`ciborium::Value`] in two ways: tagged values are resolved through a
//! [`TagRegistry`] into typed wrappers (see [`Tagged`]), and maps may either keep their entry
//! order ([`CborValue::Map`]) or be keyed by strings ([`CborValue::Object`]).
//!
//! # Example
//! ```
//! # use cosekit::common::cbor::{CborValue, Codec};
//! let codec = Codec::default();
//! let value = CborValue::Array(vec![CborValue::from(1), CborValue::from("two")]);
//! let encoded = codec.encode(&value)?;
//! assert_eq!(encoded, vec![0x82, 0x01, 0x63, 0x74, 0x77, 0x6f]);
//! assert_eq!(codec.decode(&encoded)?, value);
//! # Ok::<(), cosekit::error::CodecError>(())
//! ```

use core::fmt::Debug;
use std::collections::BTreeMap;
use std::sync::Arc;

use ciborium::value::{Integer, Value};
use derive_builder::Builder;
use lazy_static::lazy_static;
use log::trace;

use crate::common::constants::tags;
use crate::common::tags::{TagRegistry, Tagged, TaggedValue};
use crate::error::CodecError;


lazy_static! {
    static ref STANDARD_REGISTRY: Arc<TagRegistry> = Arc::new(TagRegistry::standard());
}

/// Returns the process-wide registry containing the built-in tag handlers.
///
/// The registry is built once on first access and never modified afterwards.
#[must_use]
pub fn standard_registry() -> Arc<TagRegistry> {
    Arc::clone(&STANDARD_REGISTRY)
}

/// A logical CBOR data item.
#[derive(Debug, Clone, PartialEq)]
pub enum CborValue {
    /// `null`.
    Null,
    /// `true` or `false`.
    Bool(bool),
    /// Integer in the range of CBOR major types 0 and 1.
    Integer(i128),
    /// Floating point number.
    Float(f64),
    /// Text string.
    Text(String),
    /// Byte string.
    Bytes(Vec<u8>),
    /// Array.
    Array(Vec<CborValue>),
    /// Map which keeps its entries (and their order) exactly as given.
    Map(Vec<(CborValue, CborValue)>),
    /// Map keyed by strings, produced when decoding with [`MapMode::Object`].
    Object(BTreeMap<String, CborValue>),
    /// Tagged value.
    Tag(Tagged),
}

impl CborValue {
    /// Returns a short name for the type of this value, used in error messages.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            CborValue::Null => "null",
            CborValue::Bool(_) => "bool",
            CborValue::Integer(_) => "integer",
            CborValue::Float(_) => "float",
            CborValue::Text(_) => "text string",
            CborValue::Bytes(_) => "byte string",
            CborValue::Array(_) => "array",
            CborValue::Map(_) | CborValue::Object(_) => "map",
            CborValue::Tag(_) => "tag",
        }
    }

    /// Returns `true` if this value is `null`.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, CborValue::Null)
    }

    /// Returns `true` if this value is a map in either representation.
    #[must_use]
    pub fn is_map(&self) -> bool {
        matches!(self, CborValue::Map(_) | CborValue::Object(_))
    }

    /// Returns the contained integer, or `None` if this value is something else.
    #[must_use]
    pub fn as_integer(&self) -> Option<i128> {
        match self {
            CborValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the contained text string, or `None` if this value is something else.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            CborValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the contained byte string, or `None` if this value is something else.
    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            CborValue::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Returns the contained array, or `None` if this value is something else.
    #[must_use]
    pub fn as_array(&self) -> Option<&[CborValue]> {
        match self {
            CborValue::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Returns the contained tagged value, or `None` if this value is something else.
    #[must_use]
    pub fn as_tag(&self) -> Option<&Tagged> {
        match self {
            CborValue::Tag(t) => Some(t),
            _ => None,
        }
    }

    /// Returns the entries of this map as key-value pairs, in encoding order.
    ///
    /// Keys of [`CborValue::Object`]s are returned as text strings.
    /// Returns `None` if this value is not a map.
    #[must_use]
    pub fn map_entries(&self) -> Option<Vec<(CborValue, &CborValue)>> {
        match self {
            CborValue::Map(entries) => Some(entries.iter().map(|(k, v)| (k.clone(), v)).collect()),
            CborValue::Object(fields) => Some(
                fields
                    .iter()
                    .map(|(k, v)| (CborValue::Text(k.clone()), v))
                    .collect(),
            ),
            _ => None,
        }
    }
}

impl From<bool> for CborValue {
    fn from(value: bool) -> Self {
        CborValue::Bool(value)
    }
}

impl From<i64> for CborValue {
    fn from(value: i64) -> Self {
        CborValue::Integer(i128::from(value))
    }
}

impl From<u64> for CborValue {
    fn from(value: u64) -> Self {
        CborValue::Integer(i128::from(value))
    }
}

impl From<i32> for CborValue {
    fn from(value: i32) -> Self {
        CborValue::Integer(i128::from(value))
    }
}

impl From<f64> for CborValue {
    fn from(value: f64) -> Self {
        CborValue::Float(value)
    }
}

impl From<&str> for CborValue {
    fn from(value: &str) -> Self {
        CborValue::Text(value.to_string())
    }
}

impl From<String> for CborValue {
    fn from(value: String) -> Self {
        CborValue::Text(value)
    }
}

impl From<Vec<u8>> for CborValue {
    fn from(value: Vec<u8>) -> Self {
        CborValue::Bytes(value)
    }
}

impl From<&[u8]> for CborValue {
    fn from(value: &[u8]) -> Self {
        CborValue::Bytes(value.to_vec())
    }
}

impl From<Vec<CborValue>> for CborValue {
    fn from(value: Vec<CborValue>) -> Self {
        CborValue::Array(value)
    }
}

impl From<Tagged> for CborValue {
    fn from(value: Tagged) -> Self {
        CborValue::Tag(value)
    }
}

impl From<TaggedValue> for CborValue {
    fn from(value: TaggedValue) -> Self {
        CborValue::Tag(Tagged::Other(value))
    }
}

/// How CBOR maps are represented after decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MapMode {
    /// Maps decode to [`CborValue::Map`], keeping every entry in wire order.
    #[default]
    Ordered,
    /// Maps whose keys are all text strings or integers decode to [`CborValue::Object`], with
    /// integer keys converted to their decimal representation. Other maps stay ordered, as do
    /// maps in which two keys convert to the same string (e.g. `1` and `"1"`).
    Object,
}

/// Options of a [`Codec`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Builder)]
#[builder(setter(into), default, derive(Debug, PartialEq))]
pub struct CodecOptions {
    /// Representation of decoded maps.
    pub map_mode: MapMode,

    /// Whether encoded maps are wrapped in tag 259, marking them as key-order-preserving maps
    /// for peers that would otherwise decode them as plain objects.
    ///
    /// Tag 259 is always unwrapped on decode, yielding an ordered map.
    pub tag_maps: bool,

    /// Whether map entries are sorted by the bytewise order of their encoded keys
    /// (section 4.2.1 of [RFC 8949](https://www.rfc-editor.org/rfc/rfc8949.html#section-4.2.1)).
    ///
    /// Without this, entries are emitted in the order they are stored in, which is already
    /// deterministic for a given value.
    pub canonical: bool,
}

/// Encoder and decoder for [`CborValue`]s, resolving tags through a [`TagRegistry`].
#[derive(Debug, Clone)]
pub struct Codec {
    registry: Arc<TagRegistry>,
    options: CodecOptions,
}

impl Default for Codec {
    fn default() -> Self {
        Codec::new(standard_registry(), CodecOptions::default())
    }
}

impl Codec {
    /// Creates a new codec using the given `registry` and `options`.
    #[must_use]
    pub fn new(registry: Arc<TagRegistry>, options: CodecOptions) -> Codec {
        Codec { registry, options }
    }

    /// Creates a new codec using the standard registry and the given `options`.
    #[must_use]
    pub fn with_options(options: CodecOptions) -> Codec {
        Codec::new(standard_registry(), options)
    }

    /// Creates a codec using the standard registry which sorts map entries deterministically.
    ///
    /// This is the codec used for protected headers, keys and the structures that are signed or
    /// MACed.
    #[must_use]
    pub fn canonical() -> Codec {
        Codec::with_options(CodecOptions {
            canonical: true,
            ..CodecOptions::default()
        })
    }

    /// Returns the options of this codec.
    #[must_use]
    pub fn options(&self) -> &CodecOptions {
        &self.options
    }

    /// Returns the tag registry of this codec.
    #[must_use]
    pub fn registry(&self) -> &TagRegistry {
        &self.registry
    }

    /// Encodes the given `value` into bytes.
    ///
    /// # Errors
    /// - If an integer is out of CBOR's range.
    /// - If a typed tag wrapper has no handler in the registry or its payload can't be normalized.
    pub fn encode(&self, value: &CborValue) -> Result<Vec<u8>, CodecError> {
        let mut encoded = Vec::new();
        self.encode_into(value, &mut encoded)?;
        trace!("Encoded {} into {} bytes of CBOR", value.kind(), encoded.len());
        Ok(encoded)
    }

    /// Encodes the given `value` into the given `writer`.
    ///
    /// # Errors
    /// Same as [`Codec::encode`], and additionally if writing fails.
    pub fn encode_into<W>(&self, value: &CborValue, writer: W) -> Result<(), CodecError>
    where
        W: ciborium_io::Write,
        W::Error: Debug,
    {
        let wire = self.to_wire(value)?;
        ciborium::ser::into_writer(&wire, writer).map_err(|e| CodecError::Encode(e.to_string()))
    }

    /// Decodes exactly one CBOR item from `bytes`.
    ///
    /// Tags without a registered handler decode to a [`Tagged::Other`] placeholder, registered
    /// tags decode to their typed wrapper without validating the payload.
    ///
    /// # Errors
    /// - If `bytes` is not well-formed CBOR.
    /// - If `bytes` contains anything after the first item.
    pub fn decode(&self, bytes: &[u8]) -> Result<CborValue, CodecError> {
        let mut reader = bytes;
        let wire: Value = ciborium::de::from_reader(&mut reader)
            .map_err(|e| CodecError::Decode(e.to_string()))?;
        if !reader.is_empty() {
            return Err(CodecError::TrailingBytes(reader.len()));
        }
        trace!("Decoded {} bytes of CBOR", bytes.len());
        self.from_wire(wire)
    }

    fn to_wire(&self, value: &CborValue) -> Result<Value, CodecError> {
        Ok(match value {
            CborValue::Null => Value::Null,
            CborValue::Bool(b) => Value::Bool(*b),
            CborValue::Integer(i) => Value::Integer(
                Integer::try_from(*i).map_err(|_| CodecError::IntegerOutOfRange(*i))?,
            ),
            CborValue::Float(f) => Value::Float(*f),
            CborValue::Text(s) => Value::Text(s.clone()),
            CborValue::Bytes(b) => Value::Bytes(b.clone()),
            CborValue::Array(items) => Value::Array(
                items
                    .iter()
                    .map(|v| self.to_wire(v))
                    .collect::<Result<Vec<_>, _>>()?,
            ),
            CborValue::Map(entries) => self.wire_map(
                entries
                    .iter()
                    .map(|(k, v)| Ok((self.to_wire(k)?, self.to_wire(v)?)))
                    .collect::<Result<Vec<_>, CodecError>>()?,
            )?,
            CborValue::Object(fields) => self.wire_map(
                fields
                    .iter()
                    .map(|(k, v)| Ok((Value::Text(k.clone()), self.to_wire(v)?)))
                    .collect::<Result<Vec<_>, CodecError>>()?,
            )?,
            CborValue::Tag(tagged) => {
                let payload = self.registry.encode(tagged)?;
                Value::Tag(tagged.tag(), Box::new(self.to_wire(&payload)?))
            }
        })
    }

    fn wire_map(&self, mut entries: Vec<(Value, Value)>) -> Result<Value, CodecError> {
        if self.options.canonical {
            let mut keyed = entries
                .into_iter()
                .map(|(k, v)| {
                    let mut key_bytes = Vec::new();
                    ciborium::ser::into_writer(&k, &mut key_bytes)
                        .map_err(|e| CodecError::Encode(e.to_string()))?;
                    Ok((key_bytes, k, v))
                })
                .collect::<Result<Vec<_>, CodecError>>()?;
            keyed.sort_by(|a, b| a.0.cmp(&b.0));
            entries = keyed.into_iter().map(|(_, k, v)| (k, v)).collect();
        }
        let map = Value::Map(entries);
        Ok(if self.options.tag_maps {
            Value::Tag(tags::MAP, Box::new(map))
        } else {
            map
        })
    }

    fn from_wire(&self, value: Value) -> Result<CborValue, CodecError> {
        Ok(match value {
            Value::Null => CborValue::Null,
            Value::Bool(b) => CborValue::Bool(b),
            Value::Integer(i) => CborValue::Integer(i128::from(i)),
            Value::Float(f) => CborValue::Float(f),
            Value::Text(s) => CborValue::Text(s),
            Value::Bytes(b) => CborValue::Bytes(b),
            Value::Array(items) => CborValue::Array(
                items
                    .into_iter()
                    .map(|v| self.from_wire(v))
                    .collect::<Result<Vec<_>, _>>()?,
            ),
            Value::Map(entries) => self.map_from_wire(entries, self.options.map_mode)?,
            Value::Tag(tag, inner) if tag == tags::MAP && inner.is_map() => match *inner {
                Value::Map(entries) => self.map_from_wire(entries, MapMode::Ordered)?,
                other => self.from_wire(other)?,
            },
            Value::Tag(tag, inner) => {
                let payload = self.from_wire(*inner)?;
                CborValue::Tag(self.registry.decode(tag, payload))
            }
            other => return Err(CodecError::Decode(format!("unsupported CBOR item {other:?}"))),
        })
    }

    fn map_from_wire(
        &self,
        entries: Vec<(Value, Value)>,
        mode: MapMode,
    ) -> Result<CborValue, CodecError> {
        let entries = entries
            .into_iter()
            .map(|(k, v)| Ok((self.from_wire(k)?, self.from_wire(v)?)))
            .collect::<Result<Vec<_>, CodecError>>()?;
        if mode == MapMode::Ordered {
            return Ok(CborValue::Map(entries));
        }
        let keys = entries
            .iter()
            .map(|(k, _)| match k {
                CborValue::Text(s) => Some(s.clone()),
                CborValue::Integer(i) => Some(i.to_string()),
                _ => None,
            })
            .collect::<Option<Vec<String>>>();
        let Some(keys) = keys else {
            return Ok(CborValue::Map(entries));
        };
        let fields = keys
            .into_iter()
            .zip(entries.iter().map(|(_, v)| v.clone()))
            .collect::<BTreeMap<_, _>>();
        // keys like 1 and "1" collide once converted, and no entry may be lost
        if fields.len() == entries.len() {
            Ok(CborValue::Object(fields))
        } else {
            Ok(CborValue::Map(entries))
        }
    }
}
