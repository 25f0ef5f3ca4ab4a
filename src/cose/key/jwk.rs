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

//! Conversions between JWK ([RFC 7517](https://www.rfc-editor.org/rfc/rfc7517.html)) and COSE
//! key parameters.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use enumflags2::BitFlags;
use serde::{Deserialize, Serialize};

use crate::cose::key::{
    Algorithm, CoseAlgorithm, CoseKey, Curve, Ec2Key, KeyMaterial, KeyOp, KeyType, MacAlgorithm,
    OkpKey, SymmetricKey,
};
use crate::error::{KeyError, UnsupportedValueError};

/// A JSON Web Key.
///
/// Only the members needed for EC, OKP and symmetric keys are modelled, binary members are
/// base64url encoded without padding.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Jwk {
    /// Key type.
    pub kty: String,
    /// Curve of an EC or OKP key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crv: Option<String>,
    /// Algorithm the key is intended for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alg: Option<String>,
    /// Key identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,
    /// Permitted key operations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_ops: Option<Vec<String>>,
    /// x coordinate (EC) or public key (OKP).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<String>,
    /// y coordinate (EC).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<String>,
    /// Private key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub d: Option<String>,
    /// Symmetric key value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub k: Option<String>,
}

impl Jwk {
    /// Parses a JWK from its JSON representation.
    ///
    /// # Errors
    /// If `json` is not a JSON object with a `kty` member.
    pub fn from_json(json: &str) -> Result<Jwk, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serializes this JWK to JSON.
    ///
    /// # Errors
    /// If serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Converts a JWK `kty` to a COSE key type.
///
/// # Errors
/// If `kty` is not one of `EC`, `OKP` or `oct`.
pub fn jwk_to_cose_key_type(kty: &str) -> Result<KeyType, UnsupportedValueError> {
    KeyType::from_jwk(kty)
}

/// Converts a JWK `crv` to a COSE curve.
///
/// # Errors
/// If `crv` is not a supported curve.
pub fn jwk_to_cose_curve(crv: &str) -> Result<Curve, UnsupportedValueError> {
    Curve::from_jwk(crv)
}

/// Converts a JWK `alg` to a COSE signature or MAC algorithm.
///
/// # Errors
/// If `alg` is not a supported algorithm.
pub fn jwk_to_cose_algorithm(alg: &str) -> Result<CoseAlgorithm, UnsupportedValueError> {
    CoseAlgorithm::from_jwk(alg)
}

/// Converts a single JWK key operation for an asymmetric key.
///
/// # Errors
/// If `op` is not a key operation defined for JWK.
pub fn jwk_to_cose_key_op(op: &str) -> Result<KeyOp, UnsupportedValueError> {
    KeyOp::from_jwk(op, KeyType::EC2)
}

/// Converts the JWK `key_ops` of a key with type `key_type`.
///
/// For symmetric keys, `sign` and `verify` become [`KeyOp::MacCreate`] and [`KeyOp::MacVerify`].
///
/// # Errors
/// If any of `ops` is not a key operation defined for JWK.
pub fn jwk_to_cose_key_ops<I, S>(
    ops: I,
    key_type: KeyType,
) -> Result<BitFlags<KeyOp>, UnsupportedValueError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    ops.into_iter()
        .map(|op| KeyOp::from_jwk(op.as_ref(), key_type))
        .collect()
}

/// Determines the signature algorithm of a key on curve `crv`.
///
/// If `alg` is given it takes precedence, otherwise P-256, P-384 and P-521 default to
/// ES256, ES384 and ES512 while Ed25519 and Ed448 default to EdDSA.
///
/// # Errors
/// - If `crv` is not a supported curve.
/// - If `alg` is given but not a signature algorithm.
/// - If `alg` is absent and the curve has no signature algorithm.
pub fn jwk_to_cose_curve_algorithm(
    crv: &str,
    alg: Option<&str>,
) -> Result<Algorithm, UnsupportedValueError> {
    let curve = jwk_to_cose_curve(crv)?;
    match alg {
        Some(alg) => Algorithm::from_jwk(alg),
        None => curve
            .default_algorithm()
            .ok_or_else(|| UnsupportedValueError::new("signature curve", crv)),
    }
}

/// Converts a JWK with public EC or OKP key material to a public [`CoseKey`].
///
/// A private `d` member is ignored.
///
/// # Errors
/// - If the key type, curve, algorithm or a key operation is unsupported.
/// - If the key is symmetric.
/// - If a required member is missing or not base64url.
pub fn jwk_to_cose_public_key(jwk: &Jwk) -> Result<CoseKey, KeyError> {
    let mut key = asymmetric_key(jwk)?;
    key.material = key.to_public().material;
    Ok(key)
}

/// Converts a JWK with private EC or OKP key material to a private [`CoseKey`].
///
/// # Errors
/// - If [`jwk_to_cose_public_key`] would fail.
/// - If the `d` member is missing.
pub fn jwk_to_cose_private_key(jwk: &Jwk) -> Result<CoseKey, KeyError> {
    let key = asymmetric_key(jwk)?;
    if key.is_private() {
        Ok(key)
    } else {
        Err(KeyError::MissingParameter("d"))
    }
}

/// Converts an `oct` JWK to a symmetric [`CoseKey`] for use with MACs.
///
/// # Errors
/// - If the key type is not `oct`.
/// - If `k` is missing or not base64url.
/// - If `alg` is given but not a MAC algorithm.
pub fn jwk_to_cose_symmetric_key(jwk: &Jwk) -> Result<CoseKey, KeyError> {
    let kty = jwk_to_cose_key_type(&jwk.kty)?;
    if kty != KeyType::Symmetric {
        return Err(UnsupportedValueError::new("symmetric key type", &jwk.kty).into());
    }
    let alg = jwk
        .alg
        .as_deref()
        .map(MacAlgorithm::from_jwk)
        .transpose()?
        .map(CoseAlgorithm::Mac);
    Ok(CoseKey {
        kid: kid_from_jwk(jwk),
        alg,
        key_ops: key_ops_from_jwk(jwk, kty)?,
        material: KeyMaterial::Symmetric(SymmetricKey {
            k: required_bytes(jwk.k.as_deref(), "k")?,
        }),
    })
}

/// Converts a COSE key type identifier to its JWK name.
///
/// # Errors
/// If `code` is not a supported key type.
pub fn cose_to_jwk_key_type(code: i64) -> Result<&'static str, UnsupportedValueError> {
    KeyType::from_code(code).map(KeyType::jwk_name)
}

/// Converts a COSE curve identifier to its JWK name.
///
/// # Errors
/// If `code` is not a supported curve.
pub fn cose_to_jwk_curve(code: i64) -> Result<&'static str, UnsupportedValueError> {
    Curve::from_code(code).map(Curve::jwk_name)
}

/// Converts a COSE signature or MAC algorithm identifier to its JWK name.
///
/// # Errors
/// If `code` is not a supported algorithm.
pub fn cose_to_jwk_algorithm(code: i64) -> Result<&'static str, UnsupportedValueError> {
    CoseAlgorithm::from_code(code).map(CoseAlgorithm::jwk_name)
}

/// Converts a COSE key operation identifier to its JWK name.
///
/// # Errors
/// If `code` is not a known key operation.
pub fn cose_to_jwk_key_op(code: i64) -> Result<&'static str, UnsupportedValueError> {
    KeyOp::from_code(code).map(KeyOp::jwk_name)
}

impl CoseKey {
    /// Converts this key to a JWK.
    ///
    /// # Errors
    /// [`KeyError::InvalidParameter`] if the key identifier is not valid UTF-8, as JWK key
    /// identifiers are strings.
    pub fn to_jwk(&self) -> Result<Jwk, KeyError> {
        let kid = self
            .kid
            .as_ref()
            .map(|kid| {
                String::from_utf8(kid.clone()).map_err(|e| {
                    KeyError::invalid_parameter("kid", format!("not valid UTF-8 ({e})"))
                })
            })
            .transpose()?;
        let mut jwk = Jwk {
            kty: self.key_type().jwk_name().to_string(),
            alg: self.alg.map(|a| a.jwk_name().to_string()),
            kid,
            key_ops: (!self.key_ops.is_empty()).then(|| {
                self.key_ops
                    .iter()
                    .map(|op| op.jwk_name().to_string())
                    .collect()
            }),
            ..Jwk::default()
        };
        match &self.material {
            KeyMaterial::Ec2(k) => {
                jwk.crv = Some(k.crv.jwk_name().to_string());
                jwk.x = Some(URL_SAFE_NO_PAD.encode(&k.x));
                jwk.y = Some(URL_SAFE_NO_PAD.encode(&k.y));
                jwk.d = k.d.as_ref().map(|d| URL_SAFE_NO_PAD.encode(d));
            }
            KeyMaterial::Okp(k) => {
                jwk.crv = Some(k.crv.jwk_name().to_string());
                jwk.x = Some(URL_SAFE_NO_PAD.encode(&k.x));
                jwk.d = k.d.as_ref().map(|d| URL_SAFE_NO_PAD.encode(d));
            }
            KeyMaterial::Symmetric(k) => {
                jwk.k = Some(URL_SAFE_NO_PAD.encode(&k.k));
            }
        }
        Ok(jwk)
    }
}

fn asymmetric_key(jwk: &Jwk) -> Result<CoseKey, KeyError> {
    let kty = jwk_to_cose_key_type(&jwk.kty)?;
    if kty == KeyType::Symmetric {
        return Err(UnsupportedValueError::new("asymmetric key type", &jwk.kty).into());
    }
    let crv_name = jwk.crv.as_deref().ok_or(KeyError::MissingParameter("crv"))?;
    let crv = jwk_to_cose_curve(crv_name)?;
    if crv.key_type() != kty {
        return Err(KeyError::CurveMismatch {
            key_type: kty.jwk_name(),
            curve: crv.jwk_name(),
        });
    }
    // ECDH-only curves have no signature algorithm to fall back on.
    let alg = match (jwk.alg.as_deref(), crv.default_algorithm()) {
        (None, None) => None,
        (alg, _) => Some(jwk_to_cose_curve_algorithm(crv_name, alg)?),
    };
    let d = optional_bytes(jwk.d.as_deref(), "d")?;
    let material = match kty {
        KeyType::EC2 => KeyMaterial::Ec2(Ec2Key {
            crv,
            x: optional_bytes(jwk.x.as_deref(), "x")?.ok_or(KeyError::MissingCoordinate("x"))?,
            y: optional_bytes(jwk.y.as_deref(), "y")?.ok_or(KeyError::MissingCoordinate("y"))?,
            d,
        }),
        _ => KeyMaterial::Okp(OkpKey {
            crv,
            x: required_bytes(jwk.x.as_deref(), "x")?,
            d,
        }),
    };
    Ok(CoseKey {
        kid: kid_from_jwk(jwk),
        alg: alg.map(CoseAlgorithm::Sign),
        key_ops: key_ops_from_jwk(jwk, kty)?,
        material,
    })
}

fn kid_from_jwk(jwk: &Jwk) -> Option<Vec<u8>> {
    jwk.kid
        .as_deref()
        .filter(|kid| !kid.is_empty())
        .map(|kid| kid.as_bytes().to_vec())
}

fn key_ops_from_jwk(jwk: &Jwk, key_type: KeyType) -> Result<BitFlags<KeyOp>, KeyError> {
    Ok(jwk
        .key_ops
        .as_ref()
        .map(|ops| jwk_to_cose_key_ops(ops, key_type))
        .transpose()?
        .unwrap_or_default())
}

fn optional_bytes(value: Option<&str>, name: &'static str) -> Result<Option<Vec<u8>>, KeyError> {
    value
        .map(|v| {
            URL_SAFE_NO_PAD
                .decode(v)
                .map_err(|e| KeyError::invalid_parameter(name, e.to_string()))
        })
        .transpose()
}

fn required_bytes(value: Option<&str>, name: &'static str) -> Result<Vec<u8>, KeyError> {
    optional_bytes(value, name)?.ok_or(KeyError::MissingParameter(name))
}
