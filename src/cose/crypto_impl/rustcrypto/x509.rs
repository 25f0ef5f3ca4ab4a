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
#[cfg(rustcrypto_x509_base)]
use log::{debug, warn};
#[cfg(rustcrypto_x509_base)]
use p256::elliptic_curve::sec1::ToEncodedPoint;
#[cfg(rustcrypto_x509_base)]
use p256::pkcs8::DecodePublicKey;
#[cfg(rustcrypto_x509_base)]
use p256::ecdsa::signature::Verifier;
#[cfg(rustcrypto_x509_base)]
use time::OffsetDateTime;

use crate::cose::crypto_impl::rustcrypto::RustCryptoContext;
#[cfg(rustcrypto_x509_base)]
use crate::cose::key::{CoseKey, Curve, Ec2Key, OkpKey};
#[cfg(rustcrypto_x509_base)]
use crate::cose::x509::Certificate;
use crate::cose::x509::CertificateBackend;
#[cfg(rustcrypto_x509_base)]
use crate::cose::CryptoBackend;
#[cfg(rustcrypto_x509_base)]
use crate::error::CoseError;

#[cfg(rustcrypto_x509_base)]
type Result<T> = core::result::Result<T, CoseError<<RustCryptoContext as CryptoBackend>::Error>>;

#[cfg(rustcrypto_x509_base)]
mod oid {
    pub(super) const ECDSA_WITH_SHA256: &str = "1.2.840.10045.4.3.2";
    pub(super) const ECDSA_WITH_SHA384: &str = "1.2.840.10045.4.3.3";
    pub(super) const EC_PUBLIC_KEY: &str = "1.2.840.10045.2.1";
    pub(super) const ED25519: &str = "1.3.101.112";
}

#[cfg(not(rustcrypto_x509_base))]
impl CertificateBackend for RustCryptoContext {}

#[cfg(rustcrypto_x509_base)]
impl CertificateBackend for RustCryptoContext {
    fn parse_certificate(&mut self, der: &[u8]) -> Result<Certificate> {
        parse_der(der)
    }

    fn verify_chain(&mut self, chain: &[Certificate]) -> Result<CoseKey> {
        let (leaf, root) = match (chain.first(), chain.last()) {
            (Some(leaf), Some(root)) => (leaf, root),
            _ => return Err(invalid("certificate chain is empty")),
        };
        let now = OffsetDateTime::now_utc().unix_timestamp();
        if let Some(expired) = chain.iter().find(|c| !c.is_valid_at(now)) {
            return Err(invalid(format!(
                "certificate {} is not valid at the current time",
                expired.subject
            )));
        }
        for pair in chain.windows(2) {
            let (cert, issuer) = (&pair[0], &pair[1]);
            if cert.issuer != issuer.subject {
                return Err(invalid(format!(
                    "certificate {} was not issued by {}",
                    cert.subject, issuer.subject
                )));
            }
            verify_issued_by(cert, issuer)?;
        }
        if self.trust_anchors.is_empty() {
            warn!("No trust anchors configured, accepting certificate chain of {}", leaf.subject);
            if root.is_self_issued() {
                verify_issued_by(root, root)?;
            }
        } else {
            let anchors = self
                .trust_anchors
                .iter()
                .map(|der| parse_der(der))
                .collect::<Result<Vec<_>>>()?;
            let trusted = anchors.iter().any(|anchor| {
                anchor.der == root.der
                    || (root.issuer == anchor.subject && verify_issued_by(root, anchor).is_ok())
            });
            if !trusted {
                return Err(invalid(format!(
                    "certificate {} is not issued by a trust anchor",
                    root.subject
                )));
            }
        }
        debug!("Certificate chain of {} is valid", leaf.subject);
        leaf_key(leaf)
    }
}

#[cfg(rustcrypto_x509_base)]
fn invalid<T: Into<String>>(reason: T) -> CoseError<<RustCryptoContext as CryptoBackend>::Error> {
    CoseError::X509ChainInvalid(reason.into())
}

#[cfg(rustcrypto_x509_base)]
fn parse_der(der: &[u8]) -> Result<Certificate> {
    let (rest, cert) = x509_parser::parse_x509_certificate(der)
        .map_err(|e| invalid(format!("invalid certificate DER: {e}")))?;
    if !rest.is_empty() {
        return Err(invalid(format!(
            "certificate is followed by {} trailing bytes",
            rest.len()
        )));
    }
    let tbs = &cert.tbs_certificate;
    Ok(Certificate {
        der: der.to_vec(),
        subject: tbs.subject.to_string(),
        issuer: tbs.issuer.to_string(),
        tbs: tbs.as_ref().to_vec(),
        signature_algorithm: cert.signature_algorithm.algorithm.to_id_string(),
        signature: cert.signature_value.data.to_vec(),
        public_key_algorithm: tbs.subject_pki.algorithm.algorithm.to_id_string(),
        spki: tbs.subject_pki.raw.to_vec(),
        public_key: tbs.subject_pki.subject_public_key.data.to_vec(),
        not_before: cert.validity().not_before.timestamp(),
        not_after: cert.validity().not_after.timestamp(),
    })
}

/// Checks the signature `issuer` made over `cert`.
#[cfg(rustcrypto_x509_base)]
fn verify_issued_by(cert: &Certificate, issuer: &Certificate) -> Result<()> {
    let failed = || {
        invalid(format!(
            "signature of certificate {} does not verify with the key of {}",
            cert.subject, issuer.subject
        ))
    };
    match cert.signature_algorithm.as_str() {
        oid::ECDSA_WITH_SHA256 => {
            let pk = p256::PublicKey::from_public_key_der(&issuer.spki)
                .map_err(|e| invalid(format!("bad P-256 issuer public key: {e}")))?;
            let signature = p256::ecdsa::Signature::from_der(&cert.signature)
                .map_err(|e| invalid(format!("bad ECDSA signature: {e}")))?;
            p256::ecdsa::VerifyingKey::from(pk)
                .verify(&cert.tbs, &signature)
                .map_err(|_| failed())
        }
        oid::ECDSA_WITH_SHA384 => {
            let pk = p384::PublicKey::from_public_key_der(&issuer.spki)
                .map_err(|e| invalid(format!("bad P-384 issuer public key: {e}")))?;
            let signature = p384::ecdsa::Signature::from_der(&cert.signature)
                .map_err(|e| invalid(format!("bad ECDSA signature: {e}")))?;
            p384::ecdsa::VerifyingKey::from(pk)
                .verify(&cert.tbs, &signature)
                .map_err(|_| failed())
        }
        #[cfg(feature = "rustcrypto-eddsa")]
        oid::ED25519 => {
            let key = <[u8; 32]>::try_from(issuer.public_key.as_slice())
                .map_err(|_| invalid("Ed25519 issuer public key must be 32 bytes long"))?;
            let pk = ed25519_dalek::VerifyingKey::from_bytes(&key)
                .map_err(|e| invalid(format!("bad Ed25519 issuer public key: {e}")))?;
            let signature = ed25519_dalek::Signature::from_slice(&cert.signature)
                .map_err(|e| invalid(format!("bad Ed25519 signature: {e}")))?;
            ed25519_dalek::Verifier::verify(&pk, &cert.tbs, &signature).map_err(|_| failed())
        }
        other => Err(invalid(format!(
            "unsupported certificate signature algorithm {other}"
        ))),
    }
}

/// Extracts the public key of the leaf certificate as a [`CoseKey`].
#[cfg(rustcrypto_x509_base)]
fn leaf_key(leaf: &Certificate) -> Result<CoseKey> {
    match leaf.public_key_algorithm.as_str() {
        oid::EC_PUBLIC_KEY => {
            if let Ok(pk) = p256::PublicKey::from_public_key_der(&leaf.spki) {
                let point = pk.to_encoded_point(false);
                Ok(ec2_key(Curve::P256, point.x(), point.y()))
            } else if let Ok(pk) = p384::PublicKey::from_public_key_der(&leaf.spki) {
                let point = pk.to_encoded_point(false);
                Ok(ec2_key(Curve::P384, point.x(), point.y()))
            } else {
                Err(invalid(format!(
                    "leaf certificate {} has an EC key on an unsupported curve",
                    leaf.subject
                )))
            }
        }
        oid::ED25519 => Ok(CoseKey::new(OkpKey {
            crv: Curve::Ed25519,
            x: leaf.public_key.clone(),
            d: None,
        })),
        other => Err(invalid(format!(
            "leaf certificate {} has an unsupported key algorithm {other}",
            leaf.subject
        ))),
    }
}

#[cfg(rustcrypto_x509_base)]
fn ec2_key<T: AsRef<[u8]>>(crv: Curve, x: Option<T>, y: Option<T>) -> CoseKey {
    CoseKey::new(Ec2Key {
        crv,
        x: x.map(|x| x.as_ref().to_vec()).unwrap_or_default(),
        y: y.map(|y| y.as_ref().to_vec()).unwrap_or_default(),
        d: None,
    })
}
