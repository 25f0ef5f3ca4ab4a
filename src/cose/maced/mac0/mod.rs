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
use log::debug;

use crate::common::cbor::{CborValue, Codec};
use crate::common::constants::{context, tags};
use crate::common::tags::TaggedValue;
use crate::cose::header::{Header, ProtectedHeaderMap, UnprotectedHeaderMap};
use crate::cose::key::{CoseKey, MacAlgorithm};
use crate::cose::maced::{determine_mac_algorithm, header_mac_algorithm, symmetric_key};
use crate::cose::signed::sign1::{expect_bytes, parse_headers, parse_payload, structure_elements};
use crate::cose::{
    authenticated_structure, select_payload, select_verified_payload, CoseHeaders, HeaderBearer,
    SignOptions, VerifyOptions,
};
use crate::error::{CodecError, CoseError};

use super::MacCryptoBackend;

#[cfg(test)]
mod tests;

/// A `COSE_Mac0` structure, i.e. a message authenticated with a MAC and an implicit key.
///
/// See section 6.2 of [RFC 8152](https://www.rfc-editor.org/rfc/rfc8152.html#section-6.2).
#[derive(Debug, Clone, PartialEq)]
pub struct Mac0 {
    headers: CoseHeaders,
    payload: Option<Vec<u8>>,
    tag: Vec<u8>,
}

impl Mac0 {
    /// Authenticates `payload` (or the detached payload given in `options`) with the symmetric
    /// `key`.
    ///
    /// The algorithm is taken from the headers or from the key. Unless one of the header buckets
    /// already names it, the algorithm is recorded in the protected headers.
    ///
    /// # Errors
    /// - [`CoseError::PayloadConfiguration`] unless exactly one of `payload` and
    ///   `options.detached_payload` is given.
    /// - [`CoseError::InvalidMacAlgorithm`] if the declared algorithm is not an HMAC algorithm.
    /// - [`CoseError::AlgorithmMismatch`] if headers and key declare different algorithms.
    /// - [`CoseError::MissingAlgorithm`] if neither declares one.
    /// - [`CoseError::Key`] if `key` is not a symmetric key.
    /// - Any error of the backend.
    pub fn create<B: MacCryptoBackend>(
        backend: &mut B,
        mut protected: ProtectedHeaderMap,
        unprotected: UnprotectedHeaderMap,
        payload: Option<&[u8]>,
        options: &SignOptions,
        key: &CoseKey,
    ) -> Result<Mac0, CoseError<B::Error>> {
        let maced_payload = select_payload(payload, options.detached_payload.as_deref())?;
        let algorithm = determine_mac_algorithm(
            protected.algorithm().or_else(|| unprotected.algorithm()),
            key,
        )?;
        let symmetric = symmetric_key(key)?;
        if !protected.has(Header::Algorithm) && !unprotected.has(Header::Algorithm) {
            protected.set_algorithm(algorithm);
        }
        let headers = CoseHeaders::new(protected, unprotected)?;
        let structure = authenticated_structure(
            context::MAC0,
            headers.protected().bytes(),
            options.external_aad.as_deref(),
            maced_payload,
        )?;
        debug!("Computing {algorithm} tag");
        let tag = backend.compute_hmac(algorithm.digest(), symmetric, &structure)?;
        Ok(Mac0 {
            headers,
            payload: payload.map(<[u8]>::to_vec),
            tag,
        })
    }

    /// Verifies the tag of this structure with the symmetric `key`.
    ///
    /// # Errors
    /// - [`CoseError::DetachedPayloadRequired`] if the payload is detached and
    ///   `options.detached_payload` is not set.
    /// - [`CoseError::PayloadConfiguration`] if the payload is embedded and
    ///   `options.detached_payload` is set too.
    /// - [`CoseError::MacVerification`] if the tag does not match.
    /// - The algorithm and key errors of [`Mac0::create`].
    pub fn verify<B: MacCryptoBackend>(
        &self,
        backend: &mut B,
        key: &CoseKey,
        options: &VerifyOptions,
    ) -> Result<(), CoseError<B::Error>> {
        let maced_payload = select_verified_payload(
            self.payload.as_deref(),
            options.detached_payload.as_deref(),
        )?;
        let algorithm = determine_mac_algorithm(self.headers.algorithm(), key)?;
        let symmetric = symmetric_key(key)?;
        let structure = authenticated_structure(
            context::MAC0,
            self.headers.protected().bytes(),
            options.external_aad.as_deref(),
            maced_payload,
        )?;
        debug!("Verifying {algorithm} tag");
        backend.verify_hmac(algorithm.digest(), symmetric, &self.tag, &structure)
    }

    /// Returns the MAC algorithm declared in the headers.
    ///
    /// # Errors
    /// [`CoseError::InvalidMacAlgorithm`] if the algorithm header is absent or not an HMAC
    /// algorithm.
    pub fn mac_algorithm(&self) -> Result<MacAlgorithm, CoseError> {
        header_mac_algorithm(self.headers.algorithm())?
            .ok_or_else(|| CoseError::InvalidMacAlgorithm("none".to_string()))
    }

    /// Returns the embedded payload, or `None` if it is detached.
    #[must_use]
    pub fn payload(&self) -> Option<&[u8]> {
        self.payload.as_deref()
    }

    /// Returns whether the payload is detached, i.e. transported separately.
    #[must_use]
    pub fn is_detached(&self) -> bool {
        self.payload.is_none()
    }

    /// Returns the raw MAC tag bytes.
    #[must_use]
    pub fn tag(&self) -> &[u8] {
        &self.tag
    }

    /// Returns `[protected, unprotected, payload, tag]`, with `null` for a detached payload.
    #[must_use]
    pub fn content_for_encoding(&self) -> CborValue {
        CborValue::Array(vec![
            CborValue::from(self.headers.protected().bytes()),
            self.headers.unprotected().to_cbor_value(),
            self.payload
                .as_ref()
                .map_or(CborValue::Null, |p| CborValue::from(p.clone())),
            CborValue::from(self.tag.clone()),
        ])
    }

    /// Returns this structure wrapped in tag 17.
    #[must_use]
    pub fn to_cbor_value(&self) -> CborValue {
        CborValue::from(TaggedValue::new(tags::COSE_MAC0, self.content_for_encoding()))
    }

    /// Encodes this structure as a tagged `COSE_Mac0`.
    ///
    /// # Errors
    /// If encoding fails.
    pub fn to_bytes(&self) -> Result<Vec<u8>, CodecError> {
        Codec::default().encode(&self.to_cbor_value())
    }

    /// Decodes a tagged `COSE_Mac0`, see [`to_tag17_mac0`].
    ///
    /// # Errors
    /// If `bytes` is not valid CBOR or not a valid `COSE_Mac0`.
    pub fn from_bytes(bytes: &[u8]) -> Result<Mac0, CodecError> {
        to_tag17_mac0(&Codec::default().decode(bytes)?)
    }
}

impl HeaderBearer for Mac0 {
    fn headers(&self) -> &CoseHeaders {
        &self.headers
    }
}

impl TryFrom<&CborValue> for Mac0 {
    type Error = CodecError;

    fn try_from(value: &CborValue) -> Result<Self, Self::Error> {
        to_tag17_mac0(value)
    }
}

impl TryFrom<TaggedValue> for Mac0 {
    type Error = CodecError;

    fn try_from(value: TaggedValue) -> Result<Self, Self::Error> {
        to_tag17_mac0(&CborValue::from(value))
    }
}

impl From<Mac0> for CborValue {
    fn from(value: Mac0) -> Self {
        value.to_cbor_value()
    }
}

/// Interprets a decoded tag 17 value as a [`Mac0`].
///
/// Performs the same checks in the same order as
/// [`to_tag18_sign1`](crate::cose::signed::to_tag18_sign1).
///
/// # Errors
/// [`CodecError::Shape`] or [`CodecError::TagMismatch`] if the value is not shaped like a
/// `COSE_Mac0`, [`CodecError::Header`] or [`CodecError::Decode`] if the headers are invalid.
pub fn to_tag17_mac0(value: &CborValue) -> Result<Mac0, CodecError> {
    let [protected, unprotected, payload, tag] =
        structure_elements(value, tags::COSE_MAC0, "COSE_Mac0")?;
    Ok(Mac0 {
        headers: parse_headers(protected, unprotected)?,
        payload: parse_payload(payload)?,
        tag: expect_bytes(tag, 3, "tag")?.to_vec(),
    })
}
