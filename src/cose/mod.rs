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

//! Contains the COSE structures of this crate and the traits cryptographic backends implement.
//!
//! [`Sign1`](signed::Sign1) and [`Mac0`](maced::Mac0) share their header handling through
//! [`CoseHeaders`] and the [`HeaderBearer`] trait. All cryptographic primitives are provided by a
//! backend implementing [`CryptoBackend`] and the operation specific traits
//! [`SignCryptoBackend`](signed::SignCryptoBackend),
//! [`MacCryptoBackend`](maced::MacCryptoBackend) and
//! [`CertificateBackend`](x509::CertificateBackend).

use core::fmt::{Debug, Display};

use derive_builder::Builder;

use crate::cose::header::{
    Header, HeaderValue, ProtectedHeaderMap, ProtectedHeaders, UnprotectedHeaderMap,
};
use crate::common::cbor::{CborValue, Codec};
use crate::error::{CodecError, CoseError};

pub mod crypto_impl;
pub mod header;
pub mod key;
pub mod maced;
pub mod signed;
pub mod x509;

#[cfg(test)]
pub(crate) mod test_helper;

/// Base trait for cryptographic backends.
pub trait CryptoBackend {
    /// Type of errors specific to this backend.
    type Error: Display + Debug;
}

/// Options for creating a [`Sign1`](signed::Sign1) or [`Mac0`](maced::Mac0).
///
/// # Example
/// ```
/// # use cosekit::cose::SignOptionsBuilder;
/// let options = SignOptionsBuilder::default()
///     .external_aad(b"context".to_vec())
///     .build()?;
/// assert!(options.detached_payload.is_none());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, Builder)]
#[builder(setter(into, strip_option), default, derive(Debug, PartialEq))]
pub struct SignOptions {
    /// Externally supplied data that is authenticated, but not transported.
    pub external_aad: Option<Vec<u8>>,
    /// Payload that is authenticated, but not embedded in the structure.
    ///
    /// Mutually exclusive with an embedded payload.
    pub detached_payload: Option<Vec<u8>>,
}

/// Options for verifying a [`Sign1`](signed::Sign1) or [`Mac0`](maced::Mac0).
#[derive(Debug, Clone, PartialEq, Eq, Default, Builder)]
#[builder(setter(into, strip_option), default, derive(Debug, PartialEq))]
pub struct VerifyOptions {
    /// Externally supplied data, must match the one used at creation.
    pub external_aad: Option<Vec<u8>>,
    /// The payload, if the structure was created with a detached payload.
    pub detached_payload: Option<Vec<u8>>,
}

/// Selects the payload that is authenticated out of an embedded and a `detached` one.
pub(crate) fn select_payload<'a, E>(
    embedded: Option<&'a [u8]>,
    detached: Option<&'a [u8]>,
) -> Result<&'a [u8], CoseError<E>> {
    match (embedded, detached) {
        (Some(payload), None) | (None, Some(payload)) => Ok(payload),
        _ => Err(CoseError::PayloadConfiguration),
    }
}

/// Like [`select_payload`], but for verification, where a missing payload means the caller forgot
/// to supply the detached one.
pub(crate) fn select_verified_payload<'a, E>(
    embedded: Option<&'a [u8]>,
    detached: Option<&'a [u8]>,
) -> Result<&'a [u8], CoseError<E>> {
    match (embedded, detached) {
        (None, None) => Err(CoseError::DetachedPayloadRequired),
        _ => select_payload(embedded, detached),
    }
}

/// Builds the `Sig_structure` or `MAC_structure` for `context`.
///
/// See sections 4.4 and 6.3 of [RFC 8152](https://www.rfc-editor.org/rfc/rfc8152.html).
pub(crate) fn authenticated_structure(
    context: &str,
    protected: &[u8],
    external_aad: Option<&[u8]>,
    payload: &[u8],
) -> Result<Vec<u8>, CodecError> {
    Codec::canonical().encode(&CborValue::Array(vec![
        CborValue::from(context),
        CborValue::from(protected),
        CborValue::from(external_aad.unwrap_or_default()),
        CborValue::from(payload),
    ]))
}

/// The protected and unprotected headers of a COSE structure.
///
/// Protected headers are kept in their encoded form (see [`ProtectedHeaders`]), so that the exact
/// bytes received are the ones verified.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CoseHeaders {
    protected: ProtectedHeaders,
    unprotected: UnprotectedHeaderMap,
}

impl CoseHeaders {
    /// Creates a new header pair, encoding the `protected` map once.
    ///
    /// # Errors
    /// If the protected map can't be encoded.
    pub fn new(
        protected: ProtectedHeaderMap,
        unprotected: UnprotectedHeaderMap,
    ) -> Result<CoseHeaders, CodecError> {
        Ok(CoseHeaders {
            protected: ProtectedHeaders::from_map(protected)?,
            unprotected,
        })
    }

    /// Creates a new header pair from already encoded protected headers.
    #[must_use]
    pub fn from_parts(protected: ProtectedHeaders, unprotected: UnprotectedHeaderMap) -> CoseHeaders {
        CoseHeaders {
            protected,
            unprotected,
        }
    }

    /// Returns the protected headers along with their encoded form.
    #[must_use]
    pub fn protected(&self) -> &ProtectedHeaders {
        &self.protected
    }

    /// Returns the unprotected headers.
    #[must_use]
    pub fn unprotected(&self) -> &UnprotectedHeaderMap {
        &self.unprotected
    }

    /// Looks up `header`, preferring the protected bucket over the unprotected one.
    pub fn header<H>(&self, header: H) -> Option<&HeaderValue>
    where
        H: Into<Header>,
    {
        let header = header.into();
        self.protected
            .map()
            .get(header)
            .or_else(|| self.unprotected.get(header))
    }

    /// Returns the algorithm identifier, preferring the protected bucket.
    #[must_use]
    pub fn algorithm(&self) -> Option<i64> {
        self.header(Header::Algorithm).and_then(HeaderValue::as_int)
    }

    /// Returns the key identifier, preferring the protected bucket.
    #[must_use]
    pub fn key_id(&self) -> Option<&[u8]> {
        self.header(Header::KeyId).and_then(HeaderValue::as_bytes)
    }

    /// Returns the X.509 certificate chain (leaf first).
    ///
    /// A chain consisting of a single certificate may be encoded as a bare byte string, it is
    /// returned as a one element list all the same.
    #[must_use]
    pub fn x5chain(&self) -> Option<Vec<&[u8]>> {
        match self.header(Header::X5Chain)? {
            HeaderValue::Bytes(cert) => Some(vec![cert.as_slice()]),
            HeaderValue::BytesArray(certs) => Some(certs.iter().map(Vec::as_slice).collect()),
            _ => None,
        }
    }
}

/// Common header access for COSE structures.
pub trait HeaderBearer {
    /// Returns the headers of this structure.
    fn headers(&self) -> &CoseHeaders;

    /// Looks up `header`, preferring the protected bucket over the unprotected one.
    fn header(&self, header: Header) -> Option<&HeaderValue> {
        self.headers().header(header)
    }

    /// Returns the X.509 certificate chain carried in the headers, if any.
    fn x5chain(&self) -> Option<Vec<&[u8]>> {
        self.headers().x5chain()
    }
}
