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

//! Tag 24: CBOR data items embedded as byte strings, see
//! [RFC 8949, section 3.4.5.1](https://www.rfc-editor.org/rfc/rfc8949.html#section-3.4.5.1).
//!
//! # Example
//! ```
//! # use cosekit::common::cbor::{CborValue, Codec};
//! # use cosekit::common::tags::embedded;
//! let codec = Codec::default();
//! let wrapped = embedded::wrap(&codec, &CborValue::from(123))?;
//! let encoded = codec.encode(&wrapped.clone().into())?;
//! assert_eq!(encoded, vec![0xd8, 0x18, 0x42, 0x18, 0x7b]);
//! assert_eq!(embedded::unwrap(&codec, &wrapped.into())?, CborValue::from(123));
//! # Ok::<(), cosekit::error::CodecError>(())
//! ```

use crate::common::cbor::{CborValue, Codec};
use crate::common::constants::tags;
use crate::common::tags::Tagged;
use crate::error::CodecError;

/// The payload of a tag 24 value, normally the encoded bytes of the embedded item.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddedCbor {
    payload: Box<CborValue>,
}

impl EmbeddedCbor {
    /// Creates a new wrapper around the given encoded CBOR `bytes`.
    #[must_use]
    pub fn from_bytes(bytes: Vec<u8>) -> EmbeddedCbor {
        EmbeddedCbor {
            payload: Box::new(CborValue::Bytes(bytes)),
        }
    }

    /// Wraps the given payload without checking it.
    #[must_use]
    pub fn from_payload(payload: CborValue) -> EmbeddedCbor {
        EmbeddedCbor {
            payload: Box::new(payload),
        }
    }

    /// Returns the payload as given or decoded.
    #[must_use]
    pub fn payload(&self) -> &CborValue {
        &self.payload
    }

    /// Returns the embedded encoded bytes.
    ///
    /// # Errors
    /// If the payload is not a byte string.
    pub fn bytes(&self) -> Result<&[u8], CodecError> {
        self.payload.as_bytes().ok_or_else(|| {
            CodecError::shape(format!(
                "tag {} must wrap a byte string, not a {}",
                tags::EMBEDDED_CBOR,
                self.payload.kind()
            ))
        })
    }
}

impl From<EmbeddedCbor> for CborValue {
    fn from(value: EmbeddedCbor) -> Self {
        CborValue::Tag(Tagged::Embedded(value))
    }
}

/// Encodes `value` with the given `codec` and wraps the result in tag 24.
///
/// # Errors
/// If `value` can't be encoded.
pub fn wrap(codec: &Codec, value: &CborValue) -> Result<EmbeddedCbor, CodecError> {
    Ok(EmbeddedCbor::from_bytes(codec.encode(value)?))
}

/// Decodes the item embedded in `value`, which must either be a tag 24 value or the encoded
/// bytes of one.
///
/// # Errors
/// - [`CodecError::Shape`] if `value` is neither a tagged value nor bytes decoding to one, or if
///   the embedded payload isn't a byte string.
/// - [`CodecError::TagMismatch`] if the tag is not 24.
/// - If the embedded bytes are not valid CBOR.
pub fn unwrap(codec: &Codec, value: &CborValue) -> Result<CborValue, CodecError> {
    match value {
        CborValue::Tag(tagged) => unwrap_tagged(codec, tagged),
        CborValue::Bytes(bytes) => unwrap_bytes(codec, bytes),
        other => Err(CodecError::shape(format!(
            "expected a tag {} value or its encoded bytes, received a {}",
            tags::EMBEDDED_CBOR,
            other.kind()
        ))),
    }
}

/// Decodes `bytes` as a tag 24 value and returns the item embedded in it.
///
/// # Errors
/// Same as [`unwrap`].
pub fn unwrap_bytes(codec: &Codec, bytes: &[u8]) -> Result<CborValue, CodecError> {
    match codec.decode(bytes) {
        Ok(CborValue::Tag(tagged)) => unwrap_tagged(codec, &tagged),
        Ok(other) => Err(CodecError::shape(format!(
            "expected the encoding of a tag {} value, received a {}",
            tags::EMBEDDED_CBOR,
            other.kind()
        ))),
        Err(e) => Err(CodecError::shape(format!(
            "expected the encoding of a tag {} value, but the bytes are not CBOR ({e})",
            tags::EMBEDDED_CBOR
        ))),
    }
}

fn unwrap_tagged(codec: &Codec, tagged: &Tagged) -> Result<CborValue, CodecError> {
    if tagged.tag() != tags::EMBEDDED_CBOR {
        return Err(CodecError::TagMismatch {
            expected: tags::EMBEDDED_CBOR,
            received: tagged.tag(),
        });
    }
    match tagged {
        Tagged::Embedded(e) => codec.decode(e.bytes()?),
        other => codec.decode(EmbeddedCbor::from_payload(other.payload().clone()).bytes()?),
    }
}

pub(super) fn encode_embedded(tagged: &Tagged) -> Result<CborValue, CodecError> {
    Ok(tagged.payload().clone())
}

pub(super) fn decode_embedded(payload: CborValue) -> Tagged {
    Tagged::Embedded(EmbeddedCbor::from_payload(payload))
}
