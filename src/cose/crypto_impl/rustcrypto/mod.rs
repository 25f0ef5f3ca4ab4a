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
use strum_macros::Display;

use crate::cose::CryptoBackend;
#[cfg(any(feature = "rustcrypto-ecdsa", feature = "rustcrypto-eddsa"))]
use crate::error::CoseError;

#[cfg(rustcrypto_mac_base)]
mod mac;
#[cfg(rustcrypto_sign_base)]
mod sign;
mod x509;

#[derive(Debug, Display)]
/// Errors that might be returned from the `RustCrypto` cryptographic backend.
pub enum CoseRustCryptoCipherError {
    /// Provided parameter has invalid length.
    #[cfg(feature = "rustcrypto-hmac")]
    InvalidLength(digest::InvalidLength),
    /// Error regarding elliptic curve operations.
    #[cfg(feature = "rustcrypto-ecdsa")]
    EcError(elliptic_curve::Error),
    /// Error while creating or verifying an ECDSA or Ed25519 signature, or while parsing a key
    /// for one of them.
    #[cfg(any(feature = "rustcrypto-ecdsa", feature = "rustcrypto-eddsa"))]
    SignatureError(signature::Error),
    /// Invalid elliptic curve point.
    #[cfg(feature = "rustcrypto-ecdsa")]
    InvalidPoint,
}

#[cfg(feature = "rustcrypto-hmac")]
impl From<digest::InvalidLength> for CoseRustCryptoCipherError {
    fn from(value: digest::InvalidLength) -> Self {
        CoseRustCryptoCipherError::InvalidLength(value)
    }
}

#[cfg(feature = "rustcrypto-ecdsa")]
impl From<elliptic_curve::Error> for CoseRustCryptoCipherError {
    fn from(value: elliptic_curve::Error) -> Self {
        CoseRustCryptoCipherError::EcError(value)
    }
}

#[cfg(feature = "rustcrypto-ecdsa")]
impl From<elliptic_curve::Error> for CoseError<CoseRustCryptoCipherError> {
    fn from(value: elliptic_curve::Error) -> Self {
        CoseError::Other(CoseRustCryptoCipherError::EcError(value))
    }
}

// `ecdsa::Error` and `ed25519_dalek::SignatureError` are both re-exports of this type.
#[cfg(any(feature = "rustcrypto-ecdsa", feature = "rustcrypto-eddsa"))]
impl From<signature::Error> for CoseError<CoseRustCryptoCipherError> {
    fn from(value: signature::Error) -> Self {
        CoseError::Other(CoseRustCryptoCipherError::SignatureError(value))
    }
}

/// Context for the RustCrypto cryptographic backend
///
/// Can be used as a [`CryptoBackend`] for COSE operations.
///
/// Generic properties of this backend:
/// - [x] Deterministic signatures (RFC 6979 nonces for ECDSA), so no random number generator is
///       required.
/// - [ ] Can work with compressed EC public keys (EC keys using point compression)
///
/// Algorithm support:
/// - Signature Algorithms (for COSE_Sign1)
///     - [x] ECDSA
///         - [x] ES256
///         - [x] ES384
///         - [ ] ES512
///     - [x] EdDSA
///         - [x] Ed25519
///         - [ ] Ed448
/// - Message Authentication Code Algorithms (for COSE_Mac0)
///     - [x] HMAC
///         - [x] HMAC 256/256
///         - [x] HMAC 384/384
///         - [x] HMAC 512/512
/// - X.509 certificate chains (`x5chain`)
///     - [x] Certificates signed with ecdsa-with-SHA256 and ecdsa-with-SHA384
///     - [x] Certificates signed with Ed25519
///     - [x] Leaf keys on P-256, P-384 and Ed25519
///     - [x] Trust anchors
///     - [ ] Revocation checks
///
/// Elliptic Curve support (for EC algorithms):
/// - ES256/ES384/ES512 [^1]
///     - [x] P-256
///     - [x] P-384
///     - [ ] P-521 [^2]
///
/// [^1]: RFC 9053, Section 2.1 suggests using ES256 only with curve P-256, ES384 with curve P-384
///       and ES512 only with curve P-521. This crate enforces this pairing.
/// [^2]: P-521 must implement DigestPrimitive in order to be usable in ECDSA.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RustCryptoContext {
    trust_anchors: Vec<Vec<u8>>,
}

impl RustCryptoContext {
    /// Creates a new RustCrypto context for cryptographic COSE operations without trust anchors.
    ///
    /// Certificate chains are then only checked for internal consistency.
    #[must_use]
    pub fn new() -> RustCryptoContext {
        RustCryptoContext::default()
    }

    /// Creates a new RustCrypto context that only accepts certificate chains ending in (or issued
    /// by) one of the given DER encoded `trust_anchors`.
    #[must_use]
    pub fn with_trust_anchors(trust_anchors: Vec<Vec<u8>>) -> RustCryptoContext {
        RustCryptoContext { trust_anchors }
    }

    /// Returns the DER encoded trust anchors of this context.
    #[must_use]
    pub fn trust_anchors(&self) -> &[Vec<u8>] {
        &self.trust_anchors
    }
}

impl CryptoBackend for RustCryptoContext {
    type Error = CoseRustCryptoCipherError;
}
