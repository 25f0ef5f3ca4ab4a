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

//! This module contains common error types used across this crate.

use core::convert::Infallible;
use core::fmt::{Display, Formatter};

/// Error type used when encoding, decoding or reshaping CBOR values fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// The underlying CBOR encoder reported an error.
    Encode(String),
    /// The input could not be decoded as a single well-formed CBOR item.
    Decode(String),
    /// The input contained the given number of bytes after the first CBOR item.
    TrailingBytes(usize),
    /// An integer does not fit into a CBOR major type 0/1 item.
    IntegerOutOfRange(i128),
    /// A value does not have the container shape the caller expected.
    ///
    /// The contained message describes the offending position and the expected shape.
    Shape(String),
    /// A tagged value carries a different tag number than the one expected.
    TagMismatch {
        /// Tag number the caller expected.
        expected: u64,
        /// Tag number that was actually present.
        received: u64,
    },
    /// A typed tag wrapper was encoded with a registry that has no handler for its tag.
    UnregisteredTag(u64),
    /// The payload of a registered tag could not be normalized during encoding.
    InvalidTagPayload {
        /// Tag number of the offending value.
        tag: u64,
        /// Human readable reason.
        reason: String,
    },
    /// A header map contained in the value is invalid.
    Header(HeaderError),
}

impl Display for CodecError {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match self {
            CodecError::Encode(e) => write!(f, "unable to encode CBOR: {e}"),
            CodecError::Decode(e) => write!(f, "unable to decode CBOR: {e}"),
            CodecError::TrailingBytes(n) => {
                write!(f, "input contains {n} trailing bytes after the CBOR item")
            }
            CodecError::IntegerOutOfRange(i) => {
                write!(f, "integer {i} cannot be represented in CBOR")
            }
            CodecError::Shape(message) => write!(f, "invalid shape: {message}"),
            CodecError::TagMismatch { expected, received } => {
                write!(f, "expected CBOR tag {expected}, received tag {received}")
            }
            CodecError::UnregisteredTag(tag) => {
                write!(f, "no handler is registered for CBOR tag {tag}")
            }
            CodecError::InvalidTagPayload { tag, reason } => {
                write!(f, "invalid payload for CBOR tag {tag}: {reason}")
            }
            CodecError::Header(e) => write!(f, "{e}"),
        }
    }
}

impl CodecError {
    /// Creates a new [`CodecError::Shape`] with the given `message`.
    pub fn shape<T>(message: T) -> CodecError
    where
        T: Into<String>,
    {
        CodecError::Shape(message.into())
    }
}

impl From<HeaderError> for CodecError {
    fn from(value: HeaderError) -> Self {
        CodecError::Header(value)
    }
}

/// Error type used when the payload of a date tag (tag 0 or tag 1004) can't be interpreted.
///
/// Decoding never produces this error, it is only raised by the accessors of
/// [`DateTimeTag`](crate::common::tags::DateTimeTag) and
/// [`FullDateTag`](crate::common::tags::FullDateTag).
#[derive(Debug, Clone, PartialEq)]
pub enum DateError {
    /// The payload has a CBOR type that can't represent a date (the kind is contained here).
    InvalidPayload(&'static str),
    /// The payload is a string that is not a valid date.
    Parse {
        /// The string as found in the payload.
        input: String,
        /// Parser error message.
        reason: String,
    },
    /// The payload is a number outside of the representable date range.
    OutOfRange(String),
    /// The date could not be formatted.
    Format(String),
}

impl Display for DateError {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match self {
            DateError::InvalidPayload(kind) => {
                write!(f, "a {kind} cannot be interpreted as a date")
            }
            DateError::Parse { input, reason } => {
                write!(f, "invalid date \"{input}\": {reason}")
            }
            DateError::OutOfRange(value) => write!(f, "date {value} is out of range"),
            DateError::Format(e) => write!(f, "unable to format date: {e}"),
        }
    }
}

/// Error type used when a header map or one of its values is invalid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderError {
    /// A value of the wrong type was given for a well-known header label.
    InvalidValue {
        /// Label of the header.
        label: i64,
        /// Description of the value types permitted for this label.
        expected: &'static str,
        /// Kind of value that was given instead.
        found: &'static str,
    },
    /// The header may not appear in this bucket (e.g. `crit` in unprotected headers).
    NotPermitted {
        /// Label of the header.
        label: i64,
        /// Name of the bucket that rejected the header.
        bucket: &'static str,
    },
    /// A header map key is not an integer label.
    NonIntegerLabel(String),
    /// The same label appears twice in an encoded header map.
    DuplicateLabel(i64),
    /// The encoded headers are not a map (the actual kind is contained here).
    NotAMap(&'static str),
}

impl Display for HeaderError {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match self {
            HeaderError::InvalidValue {
                label,
                expected,
                found,
            } => write!(
                f,
                "header {label} must be {expected}, but a {found} was given"
            ),
            HeaderError::NotPermitted { label, bucket } => {
                write!(f, "header {label} is not permitted in {bucket} headers")
            }
            HeaderError::NonIntegerLabel(label) => {
                write!(f, "header label {label} is not an integer")
            }
            HeaderError::DuplicateLabel(label) => {
                write!(f, "header label {label} appears more than once")
            }
            HeaderError::NotAMap(kind) => write!(f, "headers must be a map, not a {kind}"),
        }
    }
}

/// Error type used when a value is outside of a closed COSE or JWK enumeration.
///
/// The message always names the offending input verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsupportedValueError {
    /// Name of the enumeration the value was looked up in.
    kind: &'static str,
    /// The offending input, coerced to a string.
    value: String,
}

impl Display for UnsupportedValueError {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        write!(f, "unsupported {}: {}", self.kind, self.value)
    }
}

impl UnsupportedValueError {
    /// Creates a new error for the enumeration `kind`, naming the offending `value`.
    pub fn new<T>(kind: &'static str, value: T) -> UnsupportedValueError
    where
        T: Display,
    {
        UnsupportedValueError {
            kind,
            value: value.to_string(),
        }
    }

    /// Returns the name of the enumeration the value was looked up in.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        self.kind
    }

    /// Returns the offending input.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }
}

/// Error type used when a key (COSE_Key or JWK) can't be built or interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyError {
    /// The key could not be encoded or decoded as CBOR.
    Codec(CodecError),
    /// One of the key's enumerated parameters has an unsupported value.
    UnsupportedValue(UnsupportedValueError),
    /// An EC key lacks the named public coordinate (`x` or `y`).
    MissingCoordinate(&'static str),
    /// A required key parameter is missing.
    MissingParameter(&'static str),
    /// A key parameter has an invalid value.
    InvalidParameter {
        /// Name of the key parameter.
        parameter: &'static str,
        /// Human readable reason.
        reason: String,
    },
    /// The curve does not belong to the key type it is used with.
    CurveMismatch {
        /// JWK name of the key type.
        key_type: &'static str,
        /// JWK name of the curve.
        curve: &'static str,
    },
}

impl Display for KeyError {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match self {
            KeyError::Codec(e) => write!(f, "{e}"),
            KeyError::UnsupportedValue(e) => write!(f, "{e}"),
            KeyError::MissingCoordinate(c) => write!(f, "EC key is missing the {c} coordinate"),
            KeyError::MissingParameter(p) => write!(f, "key is missing the {p} parameter"),
            KeyError::InvalidParameter { parameter, reason } => {
                write!(f, "invalid key parameter {parameter}: {reason}")
            }
            KeyError::CurveMismatch { key_type, curve } => {
                write!(f, "curve {curve} can't be used with key type {key_type}")
            }
        }
    }
}

impl KeyError {
    /// Creates a new [`KeyError::InvalidParameter`] for `parameter` with the given `reason`.
    pub fn invalid_parameter<T>(parameter: &'static str, reason: T) -> KeyError
    where
        T: Into<String>,
    {
        KeyError::InvalidParameter {
            parameter,
            reason: reason.into(),
        }
    }
}

impl From<UnsupportedValueError> for KeyError {
    fn from(value: UnsupportedValueError) -> Self {
        KeyError::UnsupportedValue(value)
    }
}

/// Error type returned by the COSE signing and MAC operations.
///
/// `E` is the error type of the cryptographic backend in use, backend-specific failures are
/// contained in [`CoseError::Other`].
#[derive(Debug)]
pub enum CoseError<E = Infallible> {
    /// Encoding or decoding of a CBOR structure failed.
    Codec(CodecError),
    /// A header is invalid.
    Header(HeaderError),
    /// A key is invalid.
    Key(KeyError),
    /// A value is outside of a closed COSE enumeration.
    UnsupportedValue(UnsupportedValueError),
    /// Both or neither of an embedded and a detached payload were supplied.
    PayloadConfiguration,
    /// The payload is detached, but no detached payload was supplied for verification.
    DetachedPayloadRequired,
    /// No public key was supplied and the headers carry no X.509 certificate chain.
    KeyResolution,
    /// The signature does not match the structure and key.
    SignatureVerification,
    /// The MAC tag does not match the structure and key.
    MacVerification,
    /// The algorithm declared by the key disagrees with the one declared in the headers.
    AlgorithmMismatch {
        /// Algorithm declared in the headers.
        header: String,
        /// Algorithm declared by the key.
        key: String,
    },
    /// The algorithm can't be used with the curve of the key.
    AlgorithmCurveMismatch {
        /// JWK name of the algorithm.
        algorithm: String,
        /// JWK name of the curve.
        curve: String,
    },
    /// The algorithm header of a MAC structure is not a supported MAC algorithm.
    InvalidMacAlgorithm(String),
    /// No algorithm is declared in the headers or the key, and none can be inferred.
    MissingAlgorithm,
    /// The backend does not support the given algorithm.
    UnsupportedAlgorithm(String),
    /// The backend does not support the given curve.
    UnsupportedCurve(String),
    /// The X.509 certificate chain could not be parsed or validated.
    X509ChainInvalid(String),
    /// A backend-specific error occurred.
    Other(E),
}

impl<E: Display> Display for CoseError<E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match self {
            CoseError::Codec(e) => write!(f, "{e}"),
            CoseError::Header(e) => write!(f, "{e}"),
            CoseError::Key(e) => write!(f, "{e}"),
            CoseError::UnsupportedValue(e) => write!(f, "{e}"),
            CoseError::PayloadConfiguration => {
                write!(f, "must provide exactly one of payload or detachedPayload")
            }
            CoseError::DetachedPayloadRequired => write!(
                f,
                "payload is detached, detachedPayload must be provided for verification"
            ),
            CoseError::KeyResolution => write!(
                f,
                "no public key was provided and the headers contain no X.509 certificate chain"
            ),
            CoseError::SignatureVerification => write!(f, "signature verification failed"),
            CoseError::MacVerification => write!(f, "MAC verification failed"),
            CoseError::AlgorithmMismatch { header, key } => write!(
                f,
                "algorithm mismatch: headers declare {header}, but the key declares {key}"
            ),
            CoseError::AlgorithmCurveMismatch { algorithm, curve } => {
                write!(f, "algorithm {algorithm} can't be used with curve {curve}")
            }
            CoseError::InvalidMacAlgorithm(alg) => write!(
                f,
                "invalid MAC algorithm {alg}, expected one of HS256, HS384 or HS512"
            ),
            CoseError::MissingAlgorithm => {
                write!(f, "no algorithm is declared by the headers or the key")
            }
            CoseError::UnsupportedAlgorithm(alg) => write!(f, "unsupported algorithm {alg}"),
            CoseError::UnsupportedCurve(crv) => write!(f, "unsupported curve {crv}"),
            CoseError::X509ChainInvalid(reason) => {
                write!(f, "invalid X.509 certificate chain: {reason}")
            }
            CoseError::Other(e) => write!(f, "{e}"),
        }
    }
}

impl<E> From<CodecError> for CoseError<E> {
    fn from(value: CodecError) -> Self {
        CoseError::Codec(value)
    }
}

impl<E> From<HeaderError> for CoseError<E> {
    fn from(value: HeaderError) -> Self {
        CoseError::Header(value)
    }
}

impl<E> From<KeyError> for CoseError<E> {
    fn from(value: KeyError) -> Self {
        CoseError::Key(value)
    }
}

impl<E> From<UnsupportedValueError> for CoseError<E> {
    fn from(value: UnsupportedValueError) -> Self {
        CoseError::UnsupportedValue(value)
    }
}

mod std_error {
    use core::fmt::Debug;
    use std::error::Error;

    use super::*;

    impl Error for CodecError {}

    impl Error for DateError {}

    impl Error for HeaderError {}

    impl Error for UnsupportedValueError {}

    impl Error for KeyError {}

    impl<E> Error for CoseError<E> where E: Debug + Display {}
}
