// Copyright (c) 2026 Zajel
// Licensed under the Apache-2.0 License.

#![forbid(unsafe_code)]

//! Content-preserving authenticated encryption and key handling.
//!
//! Shared by both cores: keypair generation, detached signatures, AEAD with
//! `nonce||ct||tag` framing, HKDF chains, and fingerprint derivation.

pub mod aead;
pub mod fingerprint;
pub mod kdf;
pub mod keys;
pub mod sign;

use crate::core::types::CodecError;
use thiserror::Error;

/// Crypto primitive errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CryptoError {
    /// base64/hex/canonical decode failed.
    #[error("bad encoding")]
    BadEncoding,
    /// Public key has the wrong length.
    #[error("bad key")]
    BadKey,
    /// Signature verification returned false.
    #[error("bad signature")]
    BadSignature,
    /// AEAD tag did not verify.
    #[error("auth failed")]
    AuthFailed,
    /// RNG or primitive invariant violation.
    #[error("internal crypto failure")]
    Internal,
}

impl From<CodecError> for CryptoError {
    fn from(_: CodecError) -> Self {
        CryptoError::BadEncoding
    }
}
