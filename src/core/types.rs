// Copyright (c) 2026 Zajel
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//     http://www.apache.org/licenses/LICENSE-2.0
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! Deterministic wire types, canonical encoding, and configuration.
//!
//! Canonical bytes (fixed field order, length-prefixed strings, count-prefixed
//! sequences) are what signatures cover. JSON forms exist for external
//! transports only and never participate in signing.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use bincode::Options;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Canonical serialization error.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("serialization")]
    Serialize,
    #[error("deserialization")]
    Deserialize,
    #[error("size limit exceeded")]
    TooLarge,
    /// base64/hex/JSON decode failed.
    #[error("bad encoding")]
    BadEncoding,
}

/// Canonical bincode options (deterministic).
fn bincode_opts() -> impl Options {
    // Fixint encoding provides a stable integer representation.
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .reject_trailing_bytes()
}

/// Encode with deterministic rules. Field order is the declared struct order;
/// strings and sequences carry their length/count as a prefix.
pub fn encode_canonical<T: Serialize>(v: &T) -> Result<Vec<u8>, CodecError> {
    bincode_opts()
        .serialize(v)
        .map_err(|_| CodecError::Serialize)
}

/// Decode with a hard size cap.
pub fn decode_canonical_limited<T: DeserializeOwned>(
    bytes: &[u8],
    max: usize,
) -> Result<T, CodecError> {
    // Fast-path cap on the raw wire payload.
    if bytes.len() > max {
        return Err(CodecError::TooLarge);
    }
    // Defensive cap inside the deserializer to prevent memory/CPU bombs via large container lengths.
    bincode_opts()
        .with_limit(max as u64)
        .deserialize(bytes)
        .map_err(|_| CodecError::Deserialize)
}

/// Encode bytes as standard base64.
pub fn b64_encode(bytes: &[u8]) -> String {
    BASE64.encode(bytes)
}

/// Decode standard base64.
pub fn b64_decode(s: &str) -> Result<Vec<u8>, CodecError> {
    BASE64.decode(s).map_err(|_| CodecError::BadEncoding)
}

/// JSON transport form (not signed).
pub fn to_json<T: Serialize>(v: &T) -> Result<String, CodecError> {
    serde_json::to_string(v).map_err(|_| CodecError::Serialize)
}

/// Parse a JSON transport form (not signed).
pub fn from_json<T: DeserializeOwned>(s: &str) -> Result<T, CodecError> {
    serde_json::from_str(s).map_err(|_| CodecError::BadEncoding)
}

/// Milliseconds since UNIX epoch (0 if the clock is unavailable).
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Secret byte material zeroized on drop. Serde-transparent so storage
/// records round-trip, but `Debug` never prints the contents.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(transparent)]
pub struct SecretBytes(pub Vec<u8>);

impl SecretBytes {
    /// Borrow the raw bytes.
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Debug for SecretBytes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SecretBytes(len={})", self.0.len())
    }
}

impl From<Vec<u8>> for SecretBytes {
    fn from(v: Vec<u8>) -> Self {
        Self(v)
    }
}

/// Opaque chunk label length (display only, never verified).
pub const CHUNK_ID_LEN: usize = 20;

/// Admin entry in a manifest: base64 signing public key plus display label.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminKey {
    /// base64 of the admin's Ed25519 signing public key.
    pub key: String,
    /// Display label.
    pub label: String,
}

/// Channel policy advertised to subscribers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelRules {
    /// Whether upstream replies are accepted.
    pub replies_enabled: bool,
    /// Whether upstream votes (polls) are accepted.
    pub polls_enabled: bool,
    /// Maximum canonical upstream payload size in bytes.
    pub max_upstream_size: u64,
    /// Payload kinds the owner accepts (e.g. "text").
    pub allowed_types: Vec<String>,
}

/// The channel's signed public contract.
///
/// `channel_id` is the lowercase-hex SHA-256 of `owner_key`; `key_epoch`
/// strictly increases across versions the owner emits.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    /// 64 lowercase hex chars.
    pub channel_id: String,
    /// Display name.
    pub name: String,
    /// Display description.
    pub description: String,
    /// base64 of the owner's Ed25519 signing public key (the channel identity).
    pub owner_key: String,
    /// Delegated admin signing keys, ordered.
    pub admin_keys: Vec<AdminKey>,
    /// base64 of the current X25519 agreement public key.
    pub current_encrypt_key: String,
    /// Monotonic key epoch, starts at 1.
    pub key_epoch: u64,
    /// Channel policy.
    pub rules: ChannelRules,
    /// base64 of the owner's detached signature over the canonical encoding
    /// with this field cleared.
    pub signature: String,
}

/// Plaintext payload carried by a channel message, canonically encoded
/// before encryption.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkPayload {
    /// Symbolic tag from `rules.allowed_types`.
    pub kind: String,
    /// Raw content.
    pub bytes: Vec<u8>,
    /// Sender's emit time, ms since UNIX epoch.
    pub timestamp_ms: u64,
}

/// One slice of an encrypted channel message as it crosses the relay.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// 20-byte opaque label (display only).
    pub chunk_id: Vec<u8>,
    /// 32 lowercase hex chars of the epoch routing fingerprint.
    pub routing_hash: String,
    /// Channel-level message sequence (monotonic per channel).
    pub sequence: u64,
    /// 0-based index within one message.
    pub chunk_index: u32,
    /// Chunk count for the message.
    pub total_chunks: u32,
    /// Byte length of `encrypted_payload`.
    pub size: u64,
    /// base64 detached signature over `encrypted_payload` by an authorised key.
    pub signature: String,
    /// base64 signing public key of the signer (owner or admin).
    pub author_pubkey: String,
    /// `nonce(12) || ciphertext || tag(16)` for this slice.
    pub encrypted_payload: Vec<u8>,
}

/// Upstream message kinds subscribers can send to the owner.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpstreamKind {
    /// Threaded reply to a published message.
    Reply,
    /// Poll vote.
    Vote,
    /// Emoji reaction.
    Reaction,
}

/// Plaintext of an upstream message, canonically encoded before encryption.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpstreamPayload {
    /// Kind tag.
    pub kind: UpstreamKind,
    /// Raw content.
    pub body: Vec<u8>,
    /// Parent message id for replies.
    pub reply_to: Option<String>,
    /// Sender's emit time, ms since UNIX epoch.
    pub timestamp_ms: u64,
}

/// Subscriber-to-owner envelope. The ephemeral agreement public key travels
/// beside it in the transport frame; the signing key here is single-use.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpstreamEnvelope {
    /// Envelope id (hex, random).
    pub id: String,
    /// Target channel.
    pub channel_id: String,
    /// Kind tag (repeated outside the ciphertext for relay routing).
    pub kind: UpstreamKind,
    /// `nonce(12) || ciphertext || tag(16)`.
    pub encrypted_payload: Vec<u8>,
    /// base64 detached signature over `encrypted_payload` by the ephemeral
    /// signing key.
    pub signature: String,
    /// base64 of the fresh, single-use Ed25519 public key.
    pub sender_ephemeral_signing_key: String,
    /// Sender's emit time, ms since UNIX epoch.
    pub timestamp_ms: u64,
}

/// Routing epoch granularity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EpochDuration {
    /// One fingerprint per hour.
    Hourly,
    /// One fingerprint per day.
    Daily,
}

impl EpochDuration {
    /// Epoch period in milliseconds.
    pub fn period_ms(self) -> u64 {
        match self {
            EpochDuration::Hourly => 3_600_000,
            EpochDuration::Daily => 86_400_000,
        }
    }

    /// Label segment used in epoch labels.
    pub fn name(self) -> &'static str {
        match self {
            EpochDuration::Hourly => "hourly",
            EpochDuration::Daily => "daily",
        }
    }
}

/// Result of one relay fetch, as reported by the external relay client.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FetchResult {
    /// Chunks were returned.
    Success,
    /// Transport-level failure (timeout, refused, DNS).
    NetworkError,
    /// The relay actively refused this routing fingerprint.
    Blocked,
    /// Reachable, but nothing stored for the fingerprint.
    Empty,
}

/// Local role in a channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelRole {
    /// Holds the owner signing secret.
    Owner,
    /// Holds an admin signing secret listed in the manifest.
    Admin,
    /// Holds only the channel decryption secret.
    Subscriber,
}

/// Storage record for a channel. Secret fields are zeroized on drop.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChannelRecord {
    /// Channel id (hex of the owner signing public key hash).
    pub id: String,
    /// Local role.
    pub role: ChannelRole,
    /// Latest manifest seen.
    pub manifest: Manifest,
    /// X25519 channel decryption secret (all roles).
    pub encryption_secret: SecretBytes,
    /// X25519 channel public key.
    pub encryption_public: Vec<u8>,
    /// Ed25519 owner signing seed (owner only).
    pub owner_signing_secret: Option<SecretBytes>,
    /// Ed25519 admin signing seed (admin only).
    pub admin_signing_secret: Option<SecretBytes>,
    /// Creation time, ms since UNIX epoch.
    pub created_at_ms: u64,
}

fn default_chunk_size() -> usize {
    65_536
}
fn default_max_message_size() -> u64 {
    52_428_800
}
fn default_max_chunk_payload_size() -> u64 {
    131_072
}
fn default_routing_epoch() -> EpochDuration {
    EpochDuration::Hourly
}
fn default_session_expiry_ms() -> u64 {
    86_400_000
}
fn default_max_nonce_history() -> usize {
    10_000
}
fn default_sliding_window() -> u32 {
    64
}
fn default_max_pending_upstream() -> usize {
    100
}
fn default_max_consecutive_failures() -> u32 {
    3
}
fn default_unhealthy_cooldown_ms() -> u64 {
    600_000
}
fn default_ringing_timeout_ms() -> u64 {
    60_000
}

/// Runtime configuration (TOML-loadable, every field defaulted).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ZajelConfig {
    /// Plaintext slice size for chunking.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// Hard cap on one reassembled message.
    #[serde(default = "default_max_message_size")]
    pub max_message_size: u64,
    /// Hard cap on one encrypted chunk payload.
    #[serde(default = "default_max_chunk_payload_size")]
    pub max_chunk_payload_size: u64,
    /// Routing fingerprint rotation period.
    #[serde(default = "default_routing_epoch")]
    pub routing_epoch: EpochDuration,
    /// Pairwise session lifetime.
    #[serde(default = "default_session_expiry_ms")]
    pub session_expiry_ms: u64,
    /// Nonce history capacity per peer.
    #[serde(default = "default_max_nonce_history")]
    pub max_nonce_history: usize,
    /// Sliding replay window width in sequence numbers.
    #[serde(default = "default_sliding_window")]
    pub sliding_window: u32,
    /// Pending upstream queue capacity while detached.
    #[serde(default = "default_max_pending_upstream")]
    pub max_pending_upstream: usize,
    /// Recent failures before a relay node is suspected.
    #[serde(default = "default_max_consecutive_failures")]
    pub max_consecutive_failures: u32,
    /// Cooldown before a suspected node may be re-adopted.
    #[serde(default = "default_unhealthy_cooldown_ms")]
    pub unhealthy_cooldown_ms: u64,
    /// Call-signaling ring timeout (consumed by the external transport).
    #[serde(default = "default_ringing_timeout_ms")]
    pub ringing_timeout_ms: u64,
}

impl Default for ZajelConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            max_message_size: default_max_message_size(),
            max_chunk_payload_size: default_max_chunk_payload_size(),
            routing_epoch: default_routing_epoch(),
            session_expiry_ms: default_session_expiry_ms(),
            max_nonce_history: default_max_nonce_history(),
            sliding_window: default_sliding_window(),
            max_pending_upstream: default_max_pending_upstream(),
            max_consecutive_failures: default_max_consecutive_failures(),
            unhealthy_cooldown_ms: default_unhealthy_cooldown_ms(),
            ringing_timeout_ms: default_ringing_timeout_ms(),
        }
    }
}

impl ZajelConfig {
    /// Parse a TOML config document. Missing fields take their defaults.
    pub fn from_toml(raw: &str) -> Result<Self, CodecError> {
        toml::from_str(raw).map_err(|_| CodecError::BadEncoding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_roundtrip_rejects_trailing_bytes() {
        let payload = ChunkPayload {
            kind: "text".to_string(),
            bytes: b"hello".to_vec(),
            timestamp_ms: 7,
        };
        let mut bytes = encode_canonical(&payload).unwrap();
        let back: ChunkPayload = decode_canonical_limited(&bytes, 1024).unwrap();
        assert_eq!(back, payload);

        bytes.push(0);
        let res: Result<ChunkPayload, _> = decode_canonical_limited(&bytes, 1024);
        assert!(res.is_err());
    }

    #[test]
    fn b64_rejects_malformed_input() {
        assert!(matches!(b64_decode("not base64!!"), Err(CodecError::BadEncoding)));
        assert_eq!(b64_decode(&b64_encode(b"abc")).unwrap(), b"abc");
    }

    #[test]
    fn config_defaults_match_contract() {
        let cfg = ZajelConfig::default();
        assert_eq!(cfg.chunk_size, 65_536);
        assert_eq!(cfg.max_message_size, 52_428_800);
        assert_eq!(cfg.max_chunk_payload_size, 131_072);
        assert_eq!(cfg.max_nonce_history, 10_000);

        let parsed = ZajelConfig::from_toml("chunk_size = 1024\n").unwrap();
        assert_eq!(parsed.chunk_size, 1024);
        assert_eq!(parsed.session_expiry_ms, 86_400_000);
    }
}
