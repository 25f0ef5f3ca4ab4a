/*
 * Copyright (c) 2022-2024 The NAMIB Project Developers.
 * Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
 * https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
 * <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
 * option. This file may not be copied, modified, or distributed
 * except according to those terms.
 *
 * SPDX-License-Identifier: MIT OR Apache-2.0
 */

//! An implementation of single-signer and single-recipient [COSE](https://www.rfc-editor.org/rfc/rfc9052.html)
//! structures on top of a tag-extensible CBOR codec.
//!
//! This crate provides
//! - a CBOR [`Codec`] whose handling of tags can be extended through a [`TagRegistry`], with
//!   handlers for date/time (tag 0), full-date (tag 1004) and embedded CBOR (tag 24) included,
//! - [`Sign1`] (`COSE_Sign1`, tag 18) and [`Mac0`] (`COSE_Mac0`, tag 17) structures, including
//!   detached payloads, externally supplied data and verification keys taken from X.509
//!   certificate chains (`x5chain`),
//! - [`CoseKey`]s along with conversions from and to [JWK](https://www.rfc-editor.org/rfc/rfc7517.html)s.
//!
//! Cryptographic operations are delegated to a backend implementing [`SignCryptoBackend`],
//! [`MacCryptoBackend`] or [`CertificateBackend`]. A backend based on the
//! [RustCrypto](https://github.com/RustCrypto) crates is available as [`RustCryptoContext`] if the
//! `rustcrypto` feature (enabled by default) is active.
//!
//! Note that transporting the structures (e.g. via CoAP) as well as multi-signer (`COSE_Sign`),
//! multi-recipient (`COSE_Mac`) and encrypted structures are *out of scope* for this crate.
//!
//! # Usage
//! ```toml
//! [dependencies]
//! cosekit = { version = "^0.1.0" }
//! ```
//! Or, if you plan to bring your own cryptographic backend:
//! ```toml
//! [dependencies]
//! cosekit = { version = "^0.1.0", default-features = false }
//! ```
//!
//! # Example
//! ## Signing and verifying
//! Creating a [`Sign1`] structure with an ECDSA key, encoding it, and verifying the decoded
//! structure again looks like this:
//! ```
//! # #[cfg(feature = "rustcrypto")] {
//! use cosekit::{
//!     CoseKey, Curve, Ec2Key, ProtectedHeaderMap, RustCryptoContext, Sign1, SignOptions,
//!     UnprotectedHeaderMap, VerifyOptions,
//! };
//! # use base64::Engine;
//! # let b64 = |s: &str| base64::engine::general_purpose::URL_SAFE_NO_PAD.decode(s);
//!
//! let key = CoseKey::new(Ec2Key {
//!     crv: Curve::P256,
//!     x: b64("usWxHK2PmfnHKwXPS54m0kTcGJ90UiglWiGahtagnv8")?,
//!     y: b64("IBOL-C3BttVivg-lSreASjpkttcsz-1rb7btKLv8EX4")?,
//!     d: Some(b64("V8kgd2ZBRuh2dgyVINBUqpPDr7BOMGcF22CQMIUHtNM")?),
//! });
//! let mut backend = RustCryptoContext::new();
//! // The algorithm (ES256) is inferred from the curve of the key.
//! let signed = Sign1::sign(
//!     &mut backend,
//!     ProtectedHeaderMap::new(),
//!     UnprotectedHeaderMap::new(),
//!     Some(b"This is the content.".as_slice()),
//!     &SignOptions::default(),
//!     &key,
//! )?;
//! let encoded = signed.to_bytes()?;
//!
//! let decoded = Sign1::from_bytes(&encoded)?;
//! decoded.verify(&mut backend, Some(&key.to_public()), &VerifyOptions::default())?;
//! assert_eq!(decoded.payload(), Some(b"This is the content.".as_slice()));
//! # }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Extending the codec
//! Tags without a handler are decoded into a generic [`TaggedValue`]. To give a tag a typed
//! representation, register a [`TagHandler`] for it in your own [`TagRegistry`] and create a
//! [`Codec`] from that registry. See the [`tags`](common::tags) module for details.
//!
//! # Provided backends
//! The RustCrypto backend currently supports ES256, ES384, EdDSA (Ed25519) and HMAC with
//! SHA-256, SHA-384 and SHA-512, as well as certificate chains signed with these algorithms.
//! The individual algorithm families can be selected with the `rustcrypto-ecdsa`,
//! `rustcrypto-eddsa`, `rustcrypto-hmac` and `rustcrypto-x509` features.
//! If you need anything else, implement the backend traits for your own type.

#![deny(rustdoc::broken_intra_doc_links, clippy::pedantic)]
#![warn(missing_docs, rustdoc::missing_crate_level_docs)]
// These ones are a little too eager
#![allow(
    clippy::doc_markdown,
    clippy::module_name_repetitions,
    clippy::wildcard_imports
)]

#[doc(inline)]
pub use common::cbor::{standard_registry, CborValue, Codec, CodecOptions, MapMode};
#[doc(inline)]
pub use common::constants;
#[doc(inline)]
pub use common::tags::{
    DateTimeTag, EmbeddedCbor, FullDateTag, TagHandler, TagRegistry, Tagged, TaggedValue,
};
#[doc(inline)]
pub use cose::header::{
    Header, HeaderMap, HeaderValue, ProtectedHeaderMap, ProtectedHeaders, UnprotectedHeaderMap,
};
#[doc(inline)]
pub use cose::key::{
    cose_to_jwk_algorithm, cose_to_jwk_curve, cose_to_jwk_key_op, cose_to_jwk_key_type,
    jwk_to_cose_algorithm, jwk_to_cose_curve, jwk_to_cose_curve_algorithm, jwk_to_cose_key_op,
    jwk_to_cose_key_ops, jwk_to_cose_key_type, jwk_to_cose_private_key, jwk_to_cose_public_key,
    jwk_to_cose_symmetric_key, Algorithm, CoseAlgorithm, CoseKey, CoseKeyBuilder, Curve,
    DigestAlgorithm, Ec2Key, Jwk, KeyMaterial, KeyOp, KeyType, MacAlgorithm, OkpKey,
    SymmetricKey,
};
#[doc(inline)]
pub use cose::maced::{to_tag17_mac0, Mac0, MacCryptoBackend};
#[doc(inline)]
pub use cose::signed::{to_tag18_sign1, Sign1, SignCryptoBackend};
#[doc(inline)]
pub use cose::x509::{Certificate, CertificateBackend};
#[doc(inline)]
pub use cose::{
    CoseHeaders, CryptoBackend, HeaderBearer, SignOptions, SignOptionsBuilder, VerifyOptions,
    VerifyOptionsBuilder,
};
#[cfg(rustcrypto_base)]
#[doc(inline)]
pub use cose::crypto_impl::rustcrypto::{CoseRustCryptoCipherError, RustCryptoContext};
#[doc(inline)]
pub use error::{CodecError, CoseError, DateError, HeaderError, KeyError, UnsupportedValueError};

pub mod common;
pub mod cose;
pub mod error;
