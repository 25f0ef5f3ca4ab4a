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
use crate::common::tags::{Tagged, TaggedValue};
use crate::cose::header::{Header, ProtectedHeaderMap, ProtectedHeaders, UnprotectedHeaderMap};
use crate::cose::key::CoseKey;
use crate::cose::signed::{create_signature, determine_algorithm, verify_signature};
use crate::cose::x509::{resolve_chain_key, CertificateBackend};
use crate::cose::{
    authenticated_structure, select_payload, select_verified_payload, CoseHeaders, HeaderBearer,
    SignOptions, VerifyOptions,
};
use crate::error::{CodecError, CoseError};

use super::SignCryptoBackend;

#[cfg(test)]
mod tests;

/// A `COSE_Sign1` structure, i.e. a message signed by a single signer.
///
/// See section 4.2 of [RFC 8152](https://www.rfc-editor.org/rfc/rfc8152.html#section-4.2).
/// Instances are only obtained by [signing](Sign1::sign) or by decoding, so the signature always
/// belongs to the exact protected header bytes contained.
///
/// # Example
/// ```
/// # use cosekit::{CoseKey, Curve, Ec2Key, ProtectedHeaderMap, Sign1, SignOptions,
/// #     UnprotectedHeaderMap, VerifyOptions};
/// # use cosekit::RustCryptoContext;
/// # let d = [1u8; 32];
/// # let secret = p256::SecretKey::from_slice(&d).map_err(|e| e.to_string())?;
/// # let point = p256::elliptic_curve::sec1::ToEncodedPoint::to_encoded_point(&secret.public_key(), false);
/// # let key = CoseKey::new(Ec2Key {
/// #     crv: Curve::P256,
/// #     x: point.x().map(|x| x.to_vec()).unwrap_or_default(),
/// #     y: point.y().map(|y| y.to_vec()).unwrap_or_default(),
/// #     d: Some(d.to_vec()),
/// # });
/// let mut backend = RustCryptoContext::new();
/// let sign1 = Sign1::sign(
///     &mut backend,
///     ProtectedHeaderMap::new(),
///     UnprotectedHeaderMap::new(),
///     Some(b"This is the content.".as_slice()),
///     &SignOptions::default(),
///     &key,
/// )?;
/// let decoded = Sign1::from_bytes(&sign1.to_bytes()?)?;
/// decoded.verify(&mut backend, Some(&key.to_public()), &VerifyOptions::default())?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Sign1 {
    headers: CoseHeaders,
    payload: Option<Vec<u8>>,
    signature: Vec<u8>,
}

impl Sign1 {
    /// Signs `payload` (or the detached payload given in `options`) with `key`.
    ///
    /// The algorithm is taken from the headers, the key, or the default for the key's curve, in
    /// this order. Unless one of the header buckets already names it, the algorithm is recorded in
    /// the protected headers.
    ///
    /// # Errors
    /// - [`CoseError::PayloadConfiguration`] unless exactly one of `payload` and
    ///   `options.detached_payload` is given.
    /// - [`CoseError::AlgorithmMismatch`] if headers and key declare different algorithms.
    /// - [`CoseError::AlgorithmCurveMismatch`] if the algorithm can't be used with the key's curve.
    /// - [`CoseError::Key`] if `key` is not a private key.
    /// - Any error of the backend.
    pub fn sign<B: SignCryptoBackend>(
        backend: &mut B,
        mut protected: ProtectedHeaderMap,
        unprotected: UnprotectedHeaderMap,
        payload: Option<&[u8]>,
        options: &SignOptions,
        key: &CoseKey,
    ) -> Result<Sign1, CoseError<B::Error>> {
        let signed_payload = select_payload(payload, options.detached_payload.as_deref())?;
        let algorithm = determine_algorithm(
            protected.algorithm().or_else(|| unprotected.algorithm()),
            key,
        )?;
        if !protected.has(Header::Algorithm) && !unprotected.has(Header::Algorithm) {
            protected.set_algorithm(algorithm);
        }
        let headers = CoseHeaders::new(protected, unprotected)?;
        let structure = authenticated_structure(
            context::SIGNATURE1,
            headers.protected().bytes(),
            options.external_aad.as_deref(),
            signed_payload,
        )?;
        let signature = create_signature(backend, algorithm, key, &structure)?;
        Ok(Sign1 {
            headers,
            payload: payload.map(<[u8]>::to_vec),
            signature,
        })
    }

    /// Verifies the signature of this structure.
    ///
    /// If no `key` is given, it is taken from the leaf of the X.509 chain in the `x5chain`
    /// header after the chain has been validated by `backend`.
    ///
    /// # Errors
    /// - [`CoseError::DetachedPayloadRequired`] if the payload is detached and
    ///   `options.detached_payload` is not set.
    /// - [`CoseError::PayloadConfiguration`] if the payload is embedded and
    ///   `options.detached_payload` is set too.
    /// - [`CoseError::KeyResolution`] if neither a key nor an `x5chain` header is present.
    /// - [`CoseError::X509ChainInvalid`] if the chain can't be validated.
    /// - [`CoseError::SignatureVerification`] if the signature does not match.
    /// - The algorithm errors of [`Sign1::sign`].
    pub fn verify<B>(
        &self,
        backend: &mut B,
        key: Option<&CoseKey>,
        options: &VerifyOptions,
    ) -> Result<(), CoseError<B::Error>>
    where
        B: SignCryptoBackend + CertificateBackend,
    {
        let signed_payload = select_verified_payload(
            self.payload.as_deref(),
            options.detached_payload.as_deref(),
        )?;
        let chain_key;
        let key = if let Some(key) = key {
            key
        } else {
            let chain = self.x5chain().ok_or(CoseError::KeyResolution)?;
            debug!("No key supplied, using the x5chain header");
            chain_key = resolve_chain_key(backend, &chain)?;
            &chain_key
        };
        let algorithm = determine_algorithm(self.headers.algorithm(), key)?;
        let structure = authenticated_structure(
            context::SIGNATURE1,
            self.headers.protected().bytes(),
            options.external_aad.as_deref(),
            signed_payload,
        )?;
        verify_signature(backend, algorithm, key, &self.signature, &structure)
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

    /// Returns the raw signature bytes.
    #[must_use]
    pub fn signature(&self) -> &[u8] {
        &self.signature
    }

    /// Returns the four elements of the structure in wire order:
    /// `[protected, unprotected, payload, signature]`, with `null` for a detached payload.
    #[must_use]
    pub fn content_for_encoding(&self) -> CborValue {
        CborValue::Array(vec![
            CborValue::from(self.headers.protected().bytes()),
            self.headers.unprotected().to_cbor_value(),
            self.payload
                .as_ref()
                .map_or(CborValue::Null, |p| CborValue::from(p.clone())),
            CborValue::from(self.signature.clone()),
        ])
    }

    /// Returns this structure wrapped in tag 18.
    #[must_use]
    pub fn to_cbor_value(&self) -> CborValue {
        CborValue::from(TaggedValue::new(tags::COSE_SIGN1, self.content_for_encoding()))
    }

    /// Encodes this structure as a tagged `COSE_Sign1`.
    ///
    /// # Errors
    /// If encoding fails.
    pub fn to_bytes(&self) -> Result<Vec<u8>, CodecError> {
        Codec::default().encode(&self.to_cbor_value())
    }

    /// Decodes a tagged `COSE_Sign1`, see [`to_tag18_sign1`].
    ///
    /// # Errors
    /// If `bytes` is not valid CBOR or not a valid `COSE_Sign1`.
    pub fn from_bytes(bytes: &[u8]) -> Result<Sign1, CodecError> {
        to_tag18_sign1(&Codec::default().decode(bytes)?)
    }
}

impl HeaderBearer for Sign1 {
    fn headers(&self) -> &CoseHeaders {
        &self.headers
    }
}

impl TryFrom<&CborValue> for Sign1 {
    type Error = CodecError;

    fn try_from(value: &CborValue) -> Result<Self, Self::Error> {
        to_tag18_sign1(value)
    }
}

impl TryFrom<TaggedValue> for Sign1 {
    type Error = CodecError;

    fn try_from(value: TaggedValue) -> Result<Self, Self::Error> {
        to_tag18_sign1(&CborValue::from(value))
    }
}

impl From<Sign1> for CborValue {
    fn from(value: Sign1) -> Self {
        value.to_cbor_value()
    }
}

/// Interprets a decoded tag 18 value as a [`Sign1`].
///
/// The checks are made in a fixed order and the first violation is reported: `value` must be a
/// tag, the tag must be 18, its payload an array of four elements, and the elements must be a
/// byte string, a map, a byte string or `null`, and a byte string.
///
/// # Errors
/// [`CodecError::Shape`] or [`CodecError::TagMismatch`] for the violations above,
/// [`CodecError::Header`] or [`CodecError::Decode`] if the headers are invalid.
pub fn to_tag18_sign1(value: &CborValue) -> Result<Sign1, CodecError> {
    let [protected, unprotected, payload, signature] =
        structure_elements(value, tags::COSE_SIGN1, "COSE_Sign1")?;
    Ok(Sign1 {
        headers: parse_headers(protected, unprotected)?,
        payload: parse_payload(payload)?,
        signature: expect_bytes(signature, 3, "signature")?.to_vec(),
    })
}

/// Checks the outer shape shared by tag 17 and tag 18 structures and returns the four elements.
pub(crate) fn structure_elements<'a>(
    value: &'a CborValue,
    expected_tag: u64,
    name: &str,
) -> Result<[&'a CborValue; 4], CodecError> {
    let CborValue::Tag(tagged) = value else {
        return Err(CodecError::shape(format!(
            "{name} is not a Tag, received {}",
            value.kind()
        )));
    };
    if tagged.tag() != expected_tag {
        return Err(CodecError::TagMismatch {
            expected: expected_tag,
            received: tagged.tag(),
        });
    }
    let elements = match tagged {
        Tagged::Other(t) => t.value.as_array(),
        _ => None,
    }
    .ok_or_else(|| {
        CodecError::shape(format!(
            "{name} must be an array of 4 elements, received {}",
            tagged.payload().kind()
        ))
    })?;
    match elements {
        [protected, unprotected, payload, tail] => {
            if protected.as_bytes().is_none() {
                return Err(unexpected(0, "protectedHeaders", "a byte string", protected));
            }
            if !unprotected.is_map() {
                return Err(unexpected(1, "unprotectedHeaders", "a map", unprotected));
            }
            if !(payload.is_null() || payload.as_bytes().is_some()) {
                return Err(unexpected(2, "payload", "a byte string or null", payload));
            }
            if tail.as_bytes().is_none() {
                return Err(unexpected(3, "signature or tag", "a byte string", tail));
            }
            Ok([protected, unprotected, payload, tail])
        }
        _ => Err(CodecError::shape(format!(
            "{name} must be an array of 4 elements, received {}",
            elements.len()
        ))),
    }
}

pub(crate) fn parse_headers(
    protected: &CborValue,
    unprotected: &CborValue,
) -> Result<CoseHeaders, CodecError> {
    let protected = ProtectedHeaders::from_bytes(expect_bytes(protected, 0, "protectedHeaders")?.to_vec())?;
    let unprotected = UnprotectedHeaderMap::from_cbor_value(unprotected)?;
    Ok(CoseHeaders::from_parts(protected, unprotected))
}

pub(crate) fn parse_payload(payload: &CborValue) -> Result<Option<Vec<u8>>, CodecError> {
    if payload.is_null() {
        Ok(None)
    } else {
        expect_bytes(payload, 2, "payload").map(|p| Some(p.to_vec()))
    }
}

pub(crate) fn expect_bytes<'a>(
    value: &'a CborValue,
    index: usize,
    field: &str,
) -> Result<&'a [u8], CodecError> {
    value
        .as_bytes()
        .ok_or_else(|| unexpected(index, field, "a byte string", value))
}

fn unexpected(index: usize, field: &str, expected: &str, found: &CborValue) -> CodecError {
    CodecError::shape(format!(
        "index {index} ({field}) must be {expected}, received {}",
        found.kind()
    ))
}
