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

//! Resolution of verification keys from X.509 certificate chains (`x5chain`, label 33).

use log::debug;

use crate::cose::key::CoseKey;
use crate::cose::CryptoBackend;
use crate::error::CoseError;

/// The parts of a parsed X.509 certificate needed for chain validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Certificate {
    /// The complete certificate as DER.
    pub der: Vec<u8>,
    /// Distinguished name of the subject.
    pub subject: String,
    /// Distinguished name of the issuer.
    pub issuer: String,
    /// The DER encoded `TBSCertificate`, i.e. the signed part.
    pub tbs: Vec<u8>,
    /// OID (dotted decimal) of the algorithm the issuer signed this certificate with.
    pub signature_algorithm: String,
    /// The issuer's signature over [`tbs`](Certificate::tbs).
    pub signature: Vec<u8>,
    /// OID (dotted decimal) of the subject public key algorithm.
    pub public_key_algorithm: String,
    /// DER encoded `SubjectPublicKeyInfo`.
    pub spki: Vec<u8>,
    /// Contents of the subject public key bit string.
    pub public_key: Vec<u8>,
    /// Start of the validity period as a UNIX timestamp.
    pub not_before: i64,
    /// End of the validity period as a UNIX timestamp.
    pub not_after: i64,
}

impl Certificate {
    /// Returns `true` if `timestamp` lies within the validity period of this certificate.
    #[must_use]
    pub fn is_valid_at(&self, timestamp: i64) -> bool {
        (self.not_before..=self.not_after).contains(&timestamp)
    }

    /// Returns `true` if issuer and subject of this certificate are the same.
    #[must_use]
    pub fn is_self_issued(&self) -> bool {
        self.issuer == self.subject
    }
}

/// Trait for cryptographic backends that can parse and validate X.509 certificate chains.
///
/// Both methods default to failing with [`CoseError::X509ChainInvalid`], so a backend that only
/// verifies with directly supplied keys can simply declare `impl CertificateBackend for B {}`.
pub trait CertificateBackend: CryptoBackend {
    /// Parses a single DER encoded certificate.
    ///
    /// # Errors
    /// [`CoseError::X509ChainInvalid`] if `der` is not a certificate this backend understands.
    fn parse_certificate(&mut self, der: &[u8]) -> Result<Certificate, CoseError<Self::Error>> {
        let _ = der;
        Err(CoseError::X509ChainInvalid(
            "certificate parsing is not supported by this backend".to_string(),
        ))
    }

    /// Validates `chain` (leaf first) and returns the public key of the leaf certificate.
    ///
    /// Implementations must check that every certificate is signed by its successor, that all
    /// certificates are currently valid, and that the chain ends in a trusted certificate if the
    /// backend is configured with trust anchors.
    ///
    /// # Errors
    /// [`CoseError::X509ChainInvalid`] if any of these checks fails or the leaf key type is not
    /// supported.
    fn verify_chain(&mut self, chain: &[Certificate]) -> Result<CoseKey, CoseError<Self::Error>> {
        let _ = chain;
        Err(CoseError::X509ChainInvalid(
            "chain validation is not supported by this backend".to_string(),
        ))
    }
}

/// Parses and validates the given DER encoded `chain` and returns the leaf public key.
pub(crate) fn resolve_chain_key<B: CertificateBackend>(
    backend: &mut B,
    chain: &[&[u8]],
) -> Result<CoseKey, CoseError<B::Error>> {
    if chain.is_empty() {
        return Err(CoseError::X509ChainInvalid(
            "certificate chain is empty".to_string(),
        ));
    }
    let certificates = chain
        .iter()
        .map(|der| backend.parse_certificate(der))
        .collect::<Result<Vec<_>, _>>()?;
    debug!(
        "Resolving verification key from X.509 chain with leaf {}",
        certificates[0].subject
    );
    backend.verify_chain(&certificates)
}
