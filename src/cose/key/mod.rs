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

//! Contains the key parameter model and the closed enumerations it is built from.
//!
//! Every enumeration here has two encodings: the numeric code registered for COSE
//! (see [`coset::iana`]) and the string used in JWKs. Both directions are total over the
//! enumeration and fail with an [`UnsupportedValueError`] naming the offending input otherwise.
//!
//! [`CoseKey`] is the typed form of a COSE_Key map. Its [`KeyMaterial`] is a sum type per key
//! type, so an EC2 key always has both coordinates and an OKP key always has `x`.

use core::fmt::{Display, Formatter};
use core::str::FromStr;
use std::collections::BTreeMap;

use coset::iana::{self, EnumI64};
use derive_builder::Builder;
use enumflags2::{bitflags, BitFlags};
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::common::cbor::{CborValue, Codec};
use crate::common::constants::key_labels;
use crate::error::{KeyError, UnsupportedValueError};

pub use jwk::*;

mod jwk;


/// Signature algorithms, named as in JWK (`alg`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, EnumString, IntoStaticStr, Display)]
#[allow(clippy::upper_case_acronyms)]
pub enum Algorithm {
    /// EdDSA (-8).
    EdDSA,
    /// ECDSA w/ SHA-256 (-7).
    ES256,
    /// ECDSA w/ SHA-384 (-35).
    ES384,
    /// ECDSA w/ SHA-512 (-36).
    ES512,
    /// RSASSA-PSS w/ SHA-256 (-37).
    PS256,
    /// RSASSA-PSS w/ SHA-384 (-38).
    PS384,
    /// RSASSA-PSS w/ SHA-512 (-39).
    PS512,
    /// RSASSA-PKCS1-v1_5 w/ SHA-256 (-257).
    RS256,
    /// RSASSA-PKCS1-v1_5 w/ SHA-384 (-258).
    RS384,
    /// RSASSA-PKCS1-v1_5 w/ SHA-512 (-259).
    RS512,
}

impl Algorithm {
    /// Returns the COSE algorithm identifier.
    #[must_use]
    pub fn code(self) -> i64 {
        let alg = match self {
            Algorithm::EdDSA => iana::Algorithm::EdDSA,
            Algorithm::ES256 => iana::Algorithm::ES256,
            Algorithm::ES384 => iana::Algorithm::ES384,
            Algorithm::ES512 => iana::Algorithm::ES512,
            Algorithm::PS256 => iana::Algorithm::PS256,
            Algorithm::PS384 => iana::Algorithm::PS384,
            Algorithm::PS512 => iana::Algorithm::PS512,
            Algorithm::RS256 => iana::Algorithm::RS256,
            Algorithm::RS384 => iana::Algorithm::RS384,
            Algorithm::RS512 => iana::Algorithm::RS512,
        };
        alg.to_i64()
    }

    /// Looks up the algorithm with the given COSE identifier.
    ///
    /// # Errors
    /// If `code` is not a supported signature algorithm.
    pub fn from_code(code: i64) -> Result<Algorithm, UnsupportedValueError> {
        Algorithm::iter()
            .find(|a| a.code() == code)
            .ok_or_else(|| UnsupportedValueError::new("algorithm", code))
    }

    /// Looks up the algorithm with the given JWK name.
    ///
    /// # Errors
    /// If `name` is not a supported signature algorithm.
    pub fn from_jwk(name: &str) -> Result<Algorithm, UnsupportedValueError> {
        Algorithm::from_str(name).map_err(|_| UnsupportedValueError::new("algorithm", name))
    }

    /// Returns the JWK name of this algorithm.
    #[must_use]
    pub fn jwk_name(self) -> &'static str {
        self.into()
    }

    /// Returns the digest this algorithm hashes with, if any.
    #[must_use]
    pub fn digest(self) -> Option<DigestAlgorithm> {
        match self {
            Algorithm::EdDSA => None,
            Algorithm::ES256 | Algorithm::PS256 | Algorithm::RS256 => Some(DigestAlgorithm::Sha256),
            Algorithm::ES384 | Algorithm::PS384 | Algorithm::RS384 => Some(DigestAlgorithm::Sha384),
            Algorithm::ES512 | Algorithm::PS512 | Algorithm::RS512 => Some(DigestAlgorithm::Sha512),
        }
    }

    /// Returns `true` if this algorithm may be used with the given `curve`.
    ///
    /// ES256, ES384 and ES512 are bound to P-256, P-384 and P-521 respectively (see section 2.1
    /// of [RFC 9053](https://www.rfc-editor.org/rfc/rfc9053.html#section-2.1)), EdDSA to Ed25519
    /// and Ed448. RSA algorithms don't use curves at all.
    #[must_use]
    pub fn supports_curve(self, curve: Curve) -> bool {
        matches!(
            (self, curve),
            (Algorithm::ES256, Curve::P256)
                | (Algorithm::ES384, Curve::P384)
                | (Algorithm::ES512, Curve::P521)
                | (Algorithm::EdDSA, Curve::Ed25519 | Curve::Ed448)
        )
    }
}

/// MAC algorithms, named as in JWK (`alg`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, EnumString, IntoStaticStr, Display)]
#[allow(clippy::upper_case_acronyms)]
pub enum MacAlgorithm {
    /// HMAC w/ SHA-256 (5).
    HS256,
    /// HMAC w/ SHA-384 (6).
    HS384,
    /// HMAC w/ SHA-512 (7).
    HS512,
}

impl MacAlgorithm {
    /// Returns the COSE algorithm identifier.
    #[must_use]
    pub fn code(self) -> i64 {
        let alg = match self {
            MacAlgorithm::HS256 => iana::Algorithm::HMAC_256_256,
            MacAlgorithm::HS384 => iana::Algorithm::HMAC_384_384,
            MacAlgorithm::HS512 => iana::Algorithm::HMAC_512_512,
        };
        alg.to_i64()
    }

    /// Looks up the MAC algorithm with the given COSE identifier.
    ///
    /// # Errors
    /// If `code` is not a supported MAC algorithm.
    pub fn from_code(code: i64) -> Result<MacAlgorithm, UnsupportedValueError> {
        MacAlgorithm::iter()
            .find(|a| a.code() == code)
            .ok_or_else(|| UnsupportedValueError::new("MAC algorithm", code))
    }

    /// Looks up the MAC algorithm with the given JWK name.
    ///
    /// # Errors
    /// If `name` is not a supported MAC algorithm.
    pub fn from_jwk(name: &str) -> Result<MacAlgorithm, UnsupportedValueError> {
        MacAlgorithm::from_str(name).map_err(|_| UnsupportedValueError::new("MAC algorithm", name))
    }

    /// Returns the JWK name of this algorithm.
    #[must_use]
    pub fn jwk_name(self) -> &'static str {
        self.into()
    }

    /// Returns the digest used by this HMAC variant.
    #[must_use]
    pub fn digest(self) -> DigestAlgorithm {
        match self {
            MacAlgorithm::HS256 => DigestAlgorithm::Sha256,
            MacAlgorithm::HS384 => DigestAlgorithm::Sha384,
            MacAlgorithm::HS512 => DigestAlgorithm::Sha512,
        }
    }
}

/// Digest algorithms used by the signature and MAC algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, EnumString, IntoStaticStr, Display)]
pub enum DigestAlgorithm {
    /// SHA-256.
    #[strum(serialize = "SHA-256")]
    Sha256,
    /// SHA-384.
    #[strum(serialize = "SHA-384")]
    Sha384,
    /// SHA-512.
    #[strum(serialize = "SHA-512")]
    Sha512,
}

/// Either a signature or a MAC algorithm, as found in an `alg` header or key parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CoseAlgorithm {
    /// A signature algorithm.
    Sign(Algorithm),
    /// A MAC algorithm.
    Mac(MacAlgorithm),
}

impl CoseAlgorithm {
    /// Returns the COSE algorithm identifier.
    #[must_use]
    pub fn code(self) -> i64 {
        match self {
            CoseAlgorithm::Sign(a) => a.code(),
            CoseAlgorithm::Mac(a) => a.code(),
        }
    }

    /// Looks up the algorithm with the given COSE identifier in both families.
    ///
    /// # Errors
    /// If `code` is neither a supported signature nor MAC algorithm.
    pub fn from_code(code: i64) -> Result<CoseAlgorithm, UnsupportedValueError> {
        Algorithm::from_code(code)
            .map(CoseAlgorithm::Sign)
            .or_else(|_| MacAlgorithm::from_code(code).map(CoseAlgorithm::Mac))
            .map_err(|_| UnsupportedValueError::new("algorithm", code))
    }

    /// Looks up the algorithm with the given JWK name in both families.
    ///
    /// # Errors
    /// If `name` is neither a supported signature nor MAC algorithm.
    pub fn from_jwk(name: &str) -> Result<CoseAlgorithm, UnsupportedValueError> {
        Algorithm::from_jwk(name)
            .map(CoseAlgorithm::Sign)
            .or_else(|_| MacAlgorithm::from_jwk(name).map(CoseAlgorithm::Mac))
            .map_err(|_| UnsupportedValueError::new("algorithm", name))
    }

    /// Returns the JWK name of this algorithm.
    #[must_use]
    pub fn jwk_name(self) -> &'static str {
        match self {
            CoseAlgorithm::Sign(a) => a.jwk_name(),
            CoseAlgorithm::Mac(a) => a.jwk_name(),
        }
    }
}

impl Display for CoseAlgorithm {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.jwk_name())
    }
}

impl From<Algorithm> for CoseAlgorithm {
    fn from(value: Algorithm) -> Self {
        CoseAlgorithm::Sign(value)
    }
}

impl From<MacAlgorithm> for CoseAlgorithm {
    fn from(value: MacAlgorithm) -> Self {
        CoseAlgorithm::Mac(value)
    }
}

/// Key types, named as in JWK (`kty`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, EnumString, IntoStaticStr, Display)]
#[allow(clippy::upper_case_acronyms)]
pub enum KeyType {
    /// Octet key pair (1).
    OKP,
    /// Elliptic curve key with x and y coordinates (2).
    #[strum(serialize = "EC")]
    EC2,
    /// Symmetric key (4).
    #[strum(serialize = "oct")]
    Symmetric,
}

impl KeyType {
    /// Returns the COSE key type identifier.
    #[must_use]
    pub fn code(self) -> i64 {
        let kty = match self {
            KeyType::OKP => iana::KeyType::OKP,
            KeyType::EC2 => iana::KeyType::EC2,
            KeyType::Symmetric => iana::KeyType::Symmetric,
        };
        kty.to_i64()
    }

    /// Looks up the key type with the given COSE identifier.
    ///
    /// # Errors
    /// If `code` is not a supported key type.
    pub fn from_code(code: i64) -> Result<KeyType, UnsupportedValueError> {
        KeyType::iter()
            .find(|k| k.code() == code)
            .ok_or_else(|| UnsupportedValueError::new("key type", code))
    }

    /// Looks up the key type with the given JWK name.
    ///
    /// # Errors
    /// If `name` is not a supported key type.
    pub fn from_jwk(name: &str) -> Result<KeyType, UnsupportedValueError> {
        KeyType::from_str(name).map_err(|_| UnsupportedValueError::new("key type", name))
    }

    /// Returns the JWK name of this key type.
    #[must_use]
    pub fn jwk_name(self) -> &'static str {
        self.into()
    }
}

/// Elliptic curves, named as in JWK (`crv`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, EnumString, IntoStaticStr, Display)]
pub enum Curve {
    /// NIST P-256 (1).
    #[strum(serialize = "P-256")]
    P256,
    /// NIST P-384 (2).
    #[strum(serialize = "P-384")]
    P384,
    /// NIST P-521 (3).
    #[strum(serialize = "P-521")]
    P521,
    /// X25519 for ECDH (4).
    X25519,
    /// X448 for ECDH (5).
    X448,
    /// Ed25519 for EdDSA (6).
    Ed25519,
    /// Ed448 for EdDSA (7).
    Ed448,
}

impl Curve {
    /// Returns the COSE curve identifier.
    #[must_use]
    pub fn code(self) -> i64 {
        let crv = match self {
            Curve::P256 => iana::EllipticCurve::P_256,
            Curve::P384 => iana::EllipticCurve::P_384,
            Curve::P521 => iana::EllipticCurve::P_521,
            Curve::X25519 => iana::EllipticCurve::X25519,
            Curve::X448 => iana::EllipticCurve::X448,
            Curve::Ed25519 => iana::EllipticCurve::Ed25519,
            Curve::Ed448 => iana::EllipticCurve::Ed448,
        };
        crv.to_i64()
    }

    /// Looks up the curve with the given COSE identifier.
    ///
    /// # Errors
    /// If `code` is not a supported curve.
    pub fn from_code(code: i64) -> Result<Curve, UnsupportedValueError> {
        Curve::iter()
            .find(|c| c.code() == code)
            .ok_or_else(|| UnsupportedValueError::new("curve", code))
    }

    /// Looks up the curve with the given JWK name.
    ///
    /// # Errors
    /// If `name` is not a supported curve.
    pub fn from_jwk(name: &str) -> Result<Curve, UnsupportedValueError> {
        Curve::from_str(name).map_err(|_| UnsupportedValueError::new("curve", name))
    }

    /// Returns the JWK name of this curve.
    #[must_use]
    pub fn jwk_name(self) -> &'static str {
        self.into()
    }

    /// Returns the key type keys on this curve have.
    #[must_use]
    pub fn key_type(self) -> KeyType {
        match self {
            Curve::P256 | Curve::P384 | Curve::P521 => KeyType::EC2,
            Curve::X25519 | Curve::X448 | Curve::Ed25519 | Curve::Ed448 => KeyType::OKP,
        }
    }

    /// Returns the signature algorithm used for keys on this curve when none is declared.
    #[must_use]
    pub fn default_algorithm(self) -> Option<Algorithm> {
        match self {
            Curve::P256 => Some(Algorithm::ES256),
            Curve::P384 => Some(Algorithm::ES384),
            Curve::P521 => Some(Algorithm::ES512),
            Curve::Ed25519 | Curve::Ed448 => Some(Algorithm::EdDSA),
            Curve::X25519 | Curve::X448 => None,
        }
    }
}

/// Key operations (`key_ops`).
///
/// JWK has no separate names for the MAC operations, symmetric keys use `sign` and `verify` for
/// [`KeyOp::MacCreate`] and [`KeyOp::MacVerify`].
#[bitflags]
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyOp {
    /// Compute a signature (1).
    Sign = 1 << 0,
    /// Verify a signature (2).
    Verify = 1 << 1,
    /// Encrypt content (3).
    Encrypt = 1 << 2,
    /// Decrypt content (4).
    Decrypt = 1 << 3,
    /// Wrap a key (5).
    WrapKey = 1 << 4,
    /// Unwrap a key (6).
    UnwrapKey = 1 << 5,
    /// Derive a key (7).
    DeriveKey = 1 << 6,
    /// Derive bits not used as a key (8).
    DeriveBits = 1 << 7,
    /// Compute a MAC (9).
    MacCreate = 1 << 8,
    /// Verify a MAC (10).
    MacVerify = 1 << 9,
}

impl KeyOp {
    /// Returns the COSE key operation identifier.
    #[must_use]
    pub fn code(self) -> i64 {
        let op = match self {
            KeyOp::Sign => iana::KeyOperation::Sign,
            KeyOp::Verify => iana::KeyOperation::Verify,
            KeyOp::Encrypt => iana::KeyOperation::Encrypt,
            KeyOp::Decrypt => iana::KeyOperation::Decrypt,
            KeyOp::WrapKey => iana::KeyOperation::WrapKey,
            KeyOp::UnwrapKey => iana::KeyOperation::UnwrapKey,
            KeyOp::DeriveKey => iana::KeyOperation::DeriveKey,
            KeyOp::DeriveBits => iana::KeyOperation::DeriveBits,
            KeyOp::MacCreate => iana::KeyOperation::MacCreate,
            KeyOp::MacVerify => iana::KeyOperation::MacVerify,
        };
        op.to_i64()
    }

    /// Looks up the key operation with the given COSE identifier.
    ///
    /// # Errors
    /// If `code` is not a known key operation.
    pub fn from_code(code: i64) -> Result<KeyOp, UnsupportedValueError> {
        BitFlags::<KeyOp>::all()
            .iter()
            .find(|op| op.code() == code)
            .ok_or_else(|| UnsupportedValueError::new("key operation", code))
    }

    /// Returns the JWK name of this key operation.
    #[must_use]
    pub fn jwk_name(self) -> &'static str {
        match self {
            KeyOp::Sign | KeyOp::MacCreate => "sign",
            KeyOp::Verify | KeyOp::MacVerify => "verify",
            KeyOp::Encrypt => "encrypt",
            KeyOp::Decrypt => "decrypt",
            KeyOp::WrapKey => "wrapKey",
            KeyOp::UnwrapKey => "unwrapKey",
            KeyOp::DeriveKey => "deriveKey",
            KeyOp::DeriveBits => "deriveBits",
        }
    }

    /// Looks up the key operation with the given JWK name for a key of `key_type`.
    ///
    /// # Errors
    /// If `name` is not a known key operation.
    pub fn from_jwk(name: &str, key_type: KeyType) -> Result<KeyOp, UnsupportedValueError> {
        let op = match name {
            "sign" if key_type == KeyType::Symmetric => KeyOp::MacCreate,
            "verify" if key_type == KeyType::Symmetric => KeyOp::MacVerify,
            "sign" => KeyOp::Sign,
            "verify" => KeyOp::Verify,
            "encrypt" => KeyOp::Encrypt,
            "decrypt" => KeyOp::Decrypt,
            "wrapKey" => KeyOp::WrapKey,
            "unwrapKey" => KeyOp::UnwrapKey,
            "deriveKey" => KeyOp::DeriveKey,
            "deriveBits" => KeyOp::DeriveBits,
            other => return Err(UnsupportedValueError::new("key operation", other)),
        };
        Ok(op)
    }
}

/// Public (and optionally private) parts of an EC2 key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ec2Key {
    /// Curve of the key.
    pub crv: Curve,
    /// x coordinate.
    pub x: Vec<u8>,
    /// y coordinate.
    pub y: Vec<u8>,
    /// Private key, if known.
    pub d: Option<Vec<u8>>,
}

/// Public (and optionally private) parts of an OKP key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OkpKey {
    /// Curve of the key.
    pub crv: Curve,
    /// Public key.
    pub x: Vec<u8>,
    /// Private key, if known.
    pub d: Option<Vec<u8>>,
}

/// A symmetric key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymmetricKey {
    /// Key value.
    pub k: Vec<u8>,
}

/// Key type specific parameters of a [`CoseKey`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyMaterial {
    /// EC2 key.
    Ec2(Ec2Key),
    /// OKP key.
    Okp(OkpKey),
    /// Symmetric key.
    Symmetric(SymmetricKey),
}

impl KeyMaterial {
    /// Returns the key type of this material.
    #[must_use]
    pub fn key_type(&self) -> KeyType {
        match self {
            KeyMaterial::Ec2(_) => KeyType::EC2,
            KeyMaterial::Okp(_) => KeyType::OKP,
            KeyMaterial::Symmetric(_) => KeyType::Symmetric,
        }
    }
}

impl From<Ec2Key> for KeyMaterial {
    fn from(value: Ec2Key) -> Self {
        KeyMaterial::Ec2(value)
    }
}

impl From<OkpKey> for KeyMaterial {
    fn from(value: OkpKey) -> Self {
        KeyMaterial::Okp(value)
    }
}

impl From<SymmetricKey> for KeyMaterial {
    fn from(value: SymmetricKey) -> Self {
        KeyMaterial::Symmetric(value)
    }
}

/// A COSE_Key as defined in section 7 of [RFC 8152](https://www.rfc-editor.org/rfc/rfc8152.html#section-7).
///
/// # Example
/// ```
/// # use cosekit::{Algorithm, CoseKey, CoseKeyBuilder, Curve, Ec2Key};
/// let key: CoseKey = CoseKeyBuilder::default()
///     .kid(b"11".to_vec())
///     .alg(Algorithm::ES256)
///     .material(Ec2Key { crv: Curve::P256, x: vec![1; 32], y: vec![2; 32], d: None })
///     .build()?;
/// let decoded = CoseKey::from_bytes(&key.to_bytes()?)?;
/// assert_eq!(decoded, key);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Builder)]
#[builder(setter(into, strip_option), derive(Debug, PartialEq))]
pub struct CoseKey {
    /// Key identifier.
    #[builder(default)]
    pub kid: Option<Vec<u8>>,
    /// Algorithm this key is restricted to.
    #[builder(default)]
    pub alg: Option<CoseAlgorithm>,
    /// Operations this key is restricted to. Empty means unrestricted.
    #[builder(default)]
    pub key_ops: BitFlags<KeyOp>,
    /// Key type specific parameters.
    pub material: KeyMaterial,
}

impl CoseKey {
    /// Creates a key without identifier, algorithm or operation restrictions.
    #[must_use]
    pub fn new<M>(material: M) -> CoseKey
    where
        M: Into<KeyMaterial>,
    {
        CoseKey {
            kid: None,
            alg: None,
            key_ops: BitFlags::empty(),
            material: material.into(),
        }
    }

    /// Returns the key type, as determined by the key material.
    #[must_use]
    pub fn key_type(&self) -> KeyType {
        self.material.key_type()
    }

    /// Returns the curve of an EC2 or OKP key.
    #[must_use]
    pub fn curve(&self) -> Option<Curve> {
        match &self.material {
            KeyMaterial::Ec2(k) => Some(k.crv),
            KeyMaterial::Okp(k) => Some(k.crv),
            KeyMaterial::Symmetric(_) => None,
        }
    }

    /// Returns `true` if this key contains private or symmetric key material.
    #[must_use]
    pub fn is_private(&self) -> bool {
        match &self.material {
            KeyMaterial::Ec2(k) => k.d.is_some(),
            KeyMaterial::Okp(k) => k.d.is_some(),
            KeyMaterial::Symmetric(_) => true,
        }
    }

    /// Returns a copy of this key without its private part.
    ///
    /// Symmetric keys are returned unchanged.
    #[must_use]
    pub fn to_public(&self) -> CoseKey {
        let mut public = self.clone();
        match &mut public.material {
            KeyMaterial::Ec2(k) => k.d = None,
            KeyMaterial::Okp(k) => k.d = None,
            KeyMaterial::Symmetric(_) => {}
        }
        public
    }

    /// Converts this key into a COSE_Key map.
    #[must_use]
    pub fn to_cbor_value(&self) -> CborValue {
        let mut entries = vec![(
            CborValue::from(key_labels::KTY),
            CborValue::from(self.key_type().code()),
        )];
        if let Some(kid) = &self.kid {
            entries.push((CborValue::from(key_labels::KID), CborValue::from(kid.clone())));
        }
        if let Some(alg) = self.alg {
            entries.push((CborValue::from(key_labels::ALG), CborValue::from(alg.code())));
        }
        if !self.key_ops.is_empty() {
            entries.push((
                CborValue::from(key_labels::KEY_OPS),
                CborValue::Array(self.key_ops.iter().map(|op| CborValue::from(op.code())).collect()),
            ));
        }
        match &self.material {
            KeyMaterial::Ec2(k) => {
                entries.push((CborValue::from(key_labels::CRV), CborValue::from(k.crv.code())));
                entries.push((CborValue::from(key_labels::X), CborValue::from(k.x.clone())));
                entries.push((CborValue::from(key_labels::Y), CborValue::from(k.y.clone())));
                if let Some(d) = &k.d {
                    entries.push((CborValue::from(key_labels::D), CborValue::from(d.clone())));
                }
            }
            KeyMaterial::Okp(k) => {
                entries.push((CborValue::from(key_labels::CRV), CborValue::from(k.crv.code())));
                entries.push((CborValue::from(key_labels::X), CborValue::from(k.x.clone())));
                if let Some(d) = &k.d {
                    entries.push((CborValue::from(key_labels::D), CborValue::from(d.clone())));
                }
            }
            KeyMaterial::Symmetric(k) => {
                entries.push((CborValue::from(key_labels::K), CborValue::from(k.k.clone())));
            }
        }
        CborValue::Map(entries)
    }

    /// Builds a key from a COSE_Key map. Unknown labels are ignored.
    ///
    /// # Errors
    /// - If `value` is not a map with integer labels.
    /// - If a required parameter is missing or has the wrong type.
    /// - If the key type, curve, algorithm or a key operation is unsupported.
    /// - If the curve does not belong to the key type.
    pub fn from_cbor_value(value: &CborValue) -> Result<CoseKey, KeyError> {
        let entries = value
            .map_entries()
            .ok_or_else(|| KeyError::invalid_parameter("COSE_Key", "not a map"))?;
        let params = KeyParams::from_entries(entries)?;

        let kty = KeyType::from_code(params.int("kty", key_labels::KTY)?)?;
        let kid = params.optional_bytes("kid", key_labels::KID)?;
        let alg = params
            .optional_int("alg", key_labels::ALG)?
            .map(CoseAlgorithm::from_code)
            .transpose()?;
        let key_ops = match params.get(key_labels::KEY_OPS) {
            None => BitFlags::empty(),
            Some(CborValue::Array(ops)) => ops
                .iter()
                .map(|op| {
                    op.as_integer()
                        .and_then(|i| i64::try_from(i).ok())
                        .ok_or_else(|| KeyError::invalid_parameter("key_ops", "not an integer"))
                        .and_then(|code| KeyOp::from_code(code).map_err(KeyError::from))
                })
                .collect::<Result<BitFlags<KeyOp>, KeyError>>()?,
            Some(_) => return Err(KeyError::invalid_parameter("key_ops", "not an array")),
        };

        let material = match kty {
            KeyType::EC2 => {
                let crv = checked_curve(params.int("crv", key_labels::CRV)?, kty)?;
                KeyMaterial::Ec2(Ec2Key {
                    crv,
                    x: params
                        .optional_bytes("x", key_labels::X)?
                        .ok_or(KeyError::MissingCoordinate("x"))?,
                    y: params
                        .optional_bytes("y", key_labels::Y)?
                        .ok_or(KeyError::MissingCoordinate("y"))?,
                    d: params.optional_bytes("d", key_labels::D)?,
                })
            }
            KeyType::OKP => {
                let crv = checked_curve(params.int("crv", key_labels::CRV)?, kty)?;
                KeyMaterial::Okp(OkpKey {
                    crv,
                    x: params
                        .optional_bytes("x", key_labels::X)?
                        .ok_or(KeyError::MissingParameter("x"))?,
                    d: params.optional_bytes("d", key_labels::D)?,
                })
            }
            KeyType::Symmetric => KeyMaterial::Symmetric(SymmetricKey {
                k: params
                    .optional_bytes("k", key_labels::K)?
                    .ok_or(KeyError::MissingParameter("k"))?,
            }),
        };

        Ok(CoseKey {
            kid,
            alg,
            key_ops,
            material,
        })
    }

    /// Encodes this key as a canonical COSE_Key.
    ///
    /// # Errors
    /// If encoding fails.
    pub fn to_bytes(&self) -> Result<Vec<u8>, KeyError> {
        Codec::canonical()
            .encode(&self.to_cbor_value())
            .map_err(KeyError::Codec)
    }

    /// Decodes a COSE_Key.
    ///
    /// # Errors
    /// If `bytes` is not CBOR or not a valid COSE_Key.
    pub fn from_bytes(bytes: &[u8]) -> Result<CoseKey, KeyError> {
        let value = Codec::default().decode(bytes).map_err(KeyError::Codec)?;
        CoseKey::from_cbor_value(&value)
    }
}

fn checked_curve(code: i64, key_type: KeyType) -> Result<Curve, KeyError> {
    let crv = Curve::from_code(code)?;
    if crv.key_type() == key_type {
        Ok(crv)
    } else {
        Err(KeyError::CurveMismatch {
            key_type: key_type.jwk_name(),
            curve: crv.jwk_name(),
        })
    }
}

/// Integer-labelled parameters of a COSE_Key map, each label appearing at most once.
struct KeyParams<'a> {
    entries: BTreeMap<i64, &'a CborValue>,
}

impl<'a> KeyParams<'a> {
    fn from_entries(entries: Vec<(CborValue, &'a CborValue)>) -> Result<KeyParams<'a>, KeyError> {
        let mut params = BTreeMap::new();
        for (key, value) in entries {
            let label = match &key {
                CborValue::Integer(i) => i64::try_from(*i).ok(),
                CborValue::Text(s) => s.parse::<i64>().ok(),
                _ => None,
            }
            .ok_or_else(|| KeyError::invalid_parameter("COSE_Key", "non-integer label"))?;
            if params.insert(label, value).is_some() {
                return Err(KeyError::invalid_parameter(
                    "COSE_Key",
                    format!("duplicate label {label}"),
                ));
            }
        }
        Ok(KeyParams { entries: params })
    }

    fn get(&self, label: i64) -> Option<&'a CborValue> {
        self.entries.get(&label).copied()
    }

    fn optional_int(&self, name: &'static str, label: i64) -> Result<Option<i64>, KeyError> {
        self.get(label)
            .map(|v| {
                v.as_integer()
                    .and_then(|i| i64::try_from(i).ok())
                    .ok_or_else(|| KeyError::invalid_parameter(name, "not an integer"))
            })
            .transpose()
    }

    fn int(&self, name: &'static str, label: i64) -> Result<i64, KeyError> {
        self.optional_int(name, label)?
            .ok_or(KeyError::MissingParameter(name))
    }

    fn optional_bytes(&self, name: &'static str, label: i64) -> Result<Option<Vec<u8>>, KeyError> {
        self.get(label)
            .map(|v| {
                v.as_bytes()
                    .map(<[u8]>::to_vec)
                    .ok_or_else(|| KeyError::invalid_parameter(name, "not a byte string"))
            })
            .transpose()
    }
}
