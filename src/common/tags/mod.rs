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

//! Contains the tag extension mechanism of the [`Codec`](crate::common::cbor::Codec).
//!
//! A [`TagRegistry`] maps tag numbers to a pair of pure functions: one turning a typed
//! [`Tagged`] wrapper into the payload that is written after the tag, and one turning a decoded
//! payload back into a wrapper. Tags without a handler decode to [`Tagged::Other`].
//!
//! Decode functions never fail. A registered tag wrapping a payload of the wrong shape (such as
//! tag 0 wrapping an array) is kept as-is and only rejected once its accessor is called, e.g.
//! [`DateTimeTag::to_offset_date_time`]. Producers that merely pass such values through are
//! therefore unaffected by malformed payloads.

use core::fmt::{Debug, Formatter};
use std::collections::BTreeMap;

use crate::common::cbor::CborValue;
use crate::common::constants::tags;
use crate::error::CodecError;

pub use date::{DateTimeTag, FullDateTag};
pub use embedded::EmbeddedCbor;

mod date;
pub mod embedded;


/// A tag number together with its (decoded) payload, used for tags without a typed wrapper.
#[derive(Debug, Clone, PartialEq)]
pub struct TaggedValue {
    /// The tag number.
    pub tag: u64,
    /// The payload following the tag.
    pub value: Box<CborValue>,
}

impl TaggedValue {
    /// Creates a new tagged value with the given `tag` number and `value` as its payload.
    #[must_use]
    pub fn new(tag: u64, value: CborValue) -> TaggedValue {
        TaggedValue {
            tag,
            value: Box::new(value),
        }
    }
}

/// A tagged CBOR value.
#[derive(Debug, Clone, PartialEq)]
pub enum Tagged {
    /// Tag 0, standard date/time string.
    DateTime(DateTimeTag),
    /// Tag 1004, full-date string.
    FullDate(FullDateTag),
    /// Tag 24, embedded CBOR data item.
    Embedded(EmbeddedCbor),
    /// Any other tag, including `COSE_Sign1` (18) and `COSE_Mac0` (17) whose payload is
    /// interpreted by [`Sign1`](crate::Sign1) and [`Mac0`](crate::Mac0).
    Other(TaggedValue),
}

impl Tagged {
    /// Returns the tag number of this value.
    #[must_use]
    pub fn tag(&self) -> u64 {
        match self {
            Tagged::DateTime(_) => tags::DATE_TIME,
            Tagged::FullDate(_) => tags::FULL_DATE,
            Tagged::Embedded(_) => tags::EMBEDDED_CBOR,
            Tagged::Other(t) => t.tag,
        }
    }

    /// Returns the payload of this value as it was given or decoded, without normalization.
    #[must_use]
    pub fn payload(&self) -> &CborValue {
        match self {
            Tagged::DateTime(d) => d.payload(),
            Tagged::FullDate(d) => d.payload(),
            Tagged::Embedded(e) => e.payload(),
            Tagged::Other(t) => &t.value,
        }
    }
}

/// Function turning a tagged value into the payload written after its tag number.
pub type TagEncoder = fn(&Tagged) -> Result<CborValue, CodecError>;

/// Function turning a decoded payload into a tagged value. Must not fail.
pub type TagDecoder = fn(CborValue) -> Tagged;

/// The pair of functions responsible for one tag number.
#[derive(Clone, Copy)]
pub struct TagHandler {
    encode: TagEncoder,
    decode: TagDecoder,
}

impl TagHandler {
    /// Creates a new handler from the given `encode` and `decode` functions.
    #[must_use]
    pub const fn new(encode: TagEncoder, decode: TagDecoder) -> TagHandler {
        TagHandler { encode, decode }
    }
}

/// Registry mapping tag numbers to [`TagHandler`]s.
///
/// A registry is populated once and then shared (read-only) by any number of codecs, see
/// [`standard_registry`](crate::common::cbor::standard_registry).
#[derive(Clone, Default)]
pub struct TagRegistry {
    handlers: BTreeMap<u64, TagHandler>,
}

impl Debug for TagRegistry {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TagRegistry")
            .field("tags", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl TagRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> TagRegistry {
        TagRegistry::default()
    }

    /// Creates a registry containing handlers for the tags this crate knows about:
    /// 0 (date/time), 1004 (full-date), 24 (embedded CBOR), 17 (`COSE_Mac0`) and
    /// 18 (`COSE_Sign1`).
    #[must_use]
    pub fn standard() -> TagRegistry {
        let mut registry = TagRegistry::new();
        registry
            .register(
                tags::DATE_TIME,
                TagHandler::new(date::encode_date_time, date::decode_date_time),
            )
            .register(
                tags::FULL_DATE,
                TagHandler::new(date::encode_full_date, date::decode_full_date),
            )
            .register(
                tags::EMBEDDED_CBOR,
                TagHandler::new(embedded::encode_embedded, embedded::decode_embedded),
            )
            .register(
                tags::COSE_SIGN1,
                TagHandler::new(encode_passthrough, decode_cose_sign1),
            )
            .register(
                tags::COSE_MAC0,
                TagHandler::new(encode_passthrough, decode_cose_mac0),
            );
        registry
    }

    /// Registers `handler` for the given `tag` number.
    ///
    /// # Panics
    /// If a handler for `tag` is already registered. Registering a tag twice is a programming
    /// error.
    pub fn register(&mut self, tag: u64, handler: TagHandler) -> &mut TagRegistry {
        assert!(
            !self.handlers.contains_key(&tag),
            "a handler for CBOR tag {tag} is already registered"
        );
        self.handlers.insert(tag, handler);
        self
    }

    /// Returns `true` if a handler is registered for the given `tag` number.
    #[must_use]
    pub fn contains(&self, tag: u64) -> bool {
        self.handlers.contains_key(&tag)
    }

    /// Returns the registered tag numbers in ascending order.
    pub fn tags(&self) -> impl Iterator<Item = u64> + '_ {
        self.handlers.keys().copied()
    }

    pub(crate) fn encode(&self, tagged: &Tagged) -> Result<CborValue, CodecError> {
        match (self.handlers.get(&tagged.tag()), tagged) {
            (Some(handler), _) => (handler.encode)(tagged),
            (None, Tagged::Other(t)) => Ok((*t.value).clone()),
            (None, typed) => Err(CodecError::UnregisteredTag(typed.tag())),
        }
    }

    pub(crate) fn decode(&self, tag: u64, payload: CborValue) -> Tagged {
        match self.handlers.get(&tag) {
            Some(handler) => (handler.decode)(payload),
            None => Tagged::Other(TaggedValue::new(tag, payload)),
        }
    }
}

fn encode_passthrough(tagged: &Tagged) -> Result<CborValue, CodecError> {
    Ok(tagged.payload().clone())
}

fn decode_cose_sign1(payload: CborValue) -> Tagged {
    Tagged::Other(TaggedValue::new(tags::COSE_SIGN1, payload))
}

fn decode_cose_mac0(payload: CborValue) -> Tagged {
    Tagged::Other(TaggedValue::new(tags::COSE_MAC0, payload))
}
