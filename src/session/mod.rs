// Copyright (c) 2026 Zajel
// Licensed under the Apache-2.0 License.

#![forbid(unsafe_code)]

//! Pairwise session core: static-key Diffie-Hellman sessions with replay
//! protection, expiry, and out-of-band key verification.

pub mod pairwise;
pub mod replay;
pub mod verify;

use thiserror::Error;

use crate::core::crypto::CryptoError;

/// Why a frame was classified as a replay.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReplayCause {
    /// The 12-byte nonce was seen before.
    DuplicateNonce,
    /// The sequence number's window bit is already set.
    DuplicateSequence,
    /// The sequence number fell behind the sliding window.
    StaleSequence,
}

impl std::fmt::Display for ReplayCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReplayCause::DuplicateNonce => f.write_str("duplicate nonce"),
            ReplayCause::DuplicateSequence => f.write_str("duplicate sequence number"),
            ReplayCause::StaleSequence => f.write_str("sequence too old"),
        }
    }
}

/// Pairwise session errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    /// base64 decode failed.
    #[error("bad encoding")]
    BadEncoding,
    /// Peer key has the wrong length or is degenerate.
    #[error("bad key")]
    BadKey,
    /// No session established with this peer.
    #[error("no session with peer")]
    NoSession,
    /// The session outlived its expiry.
    #[error("session expired")]
    Expired,
    /// Replay protection rejected the frame.
    #[error("replay: {0}")]
    Replay(ReplayCause),
    /// AEAD tag did not verify.
    #[error("auth failed")]
    AuthFailed,
    /// Invariant violation.
    #[error("internal")]
    Internal,
}

impl From<CryptoError> for SessionError {
    fn from(e: CryptoError) -> Self {
        match e {
            CryptoError::BadEncoding => SessionError::BadEncoding,
            CryptoError::BadKey => SessionError::BadKey,
            CryptoError::BadSignature | CryptoError::AuthFailed => SessionError::AuthFailed,
            CryptoError::Internal => SessionError::Internal,
        }
    }
}
