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
#![deny(missing_docs)]

//! Upstream return path: subscriber replies, votes, and reactions encrypted
//! to the channel owner.
//!
//! Every message uses one fresh agreement keypair (for ECDH against the
//! owner's agreement public key) and one fresh signing keypair (over the
//! ciphertext), so upstream senders are unlinkable across messages.

use rand::RngCore;
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::warn;
use x25519_dalek::{PublicKey, StaticSecret};

use crate::core::crypto::{aead, kdf, keys, sign, CryptoError};
use crate::core::types::{
    b64_decode, b64_encode, decode_canonical_limited, encode_canonical, CodecError, Manifest,
    UpstreamEnvelope, UpstreamKind, UpstreamPayload,
};
use crate::monitoring::metrics::Metrics;

/// Upstream path errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum UpstreamError {
    /// base64/canonical decode failed.
    #[error("bad encoding")]
    BadEncoding,
    /// Key has the wrong length.
    #[error("bad key")]
    BadKey,
    /// Envelope signature did not verify.
    #[error("bad signature")]
    BadSignature,
    /// AEAD tag did not verify.
    #[error("auth failed")]
    AuthFailed,
    /// Payload exceeds `rules.max_upstream_size` or its kind is disabled.
    #[error("policy violation")]
    PolicyViolation,
    /// Invariant violation.
    #[error("internal")]
    Internal,
}

impl From<CryptoError> for UpstreamError {
    fn from(e: CryptoError) -> Self {
        match e {
            CryptoError::BadEncoding => UpstreamError::BadEncoding,
            CryptoError::BadKey => UpstreamError::BadKey,
            CryptoError::BadSignature => UpstreamError::BadSignature,
            CryptoError::AuthFailed => UpstreamError::AuthFailed,
            CryptoError::Internal => UpstreamError::Internal,
        }
    }
}

impl From<CodecError> for UpstreamError {
    fn from(_: CodecError) -> Self {
        UpstreamError::BadEncoding
    }
}

/// An envelope ready for the relay, with the transport-level ephemeral
/// agreement public key beside it.
#[derive(Clone, Debug)]
pub struct OutboundUpstream {
    /// The signed, encrypted envelope.
    pub envelope: UpstreamEnvelope,
    /// X25519 public key the owner needs for ECDH. Single-use.
    pub ephemeral_agreement_public: [u8; 32],
}

fn kind_allowed(kind: UpstreamKind, manifest: &Manifest) -> bool {
    match kind {
        UpstreamKind::Reply => manifest.rules.replies_enabled,
        UpstreamKind::Vote => manifest.rules.polls_enabled,
        UpstreamKind::Reaction => true,
    }
}

fn zero_shared(shared: &[u8; 32]) -> bool {
    shared.iter().all(|&b| b == 0)
}

/// Encrypt and sign an upstream payload for the channel owner.
pub fn seal_upstream(
    payload: &UpstreamPayload,
    manifest: &Manifest,
) -> Result<OutboundUpstream, UpstreamError> {
    if !kind_allowed(payload.kind, manifest) {
        return Err(UpstreamError::PolicyViolation);
    }
    let plain = encode_canonical(payload)?;
    if plain.len() as u64 > manifest.rules.max_upstream_size {
        return Err(UpstreamError::PolicyViolation);
    }

    let owner_pub = keys::decode_public_key_b64(&manifest.current_encrypt_key)?;

    let eph_agreement = keys::generate_agreement_keypair();
    let eph_signing = keys::generate_signing_keypair()?;

    let secret = StaticSecret::from(*eph_agreement.secret.as_bytes());
    let shared = secret.diffie_hellman(&PublicKey::from(owner_pub));
    if zero_shared(shared.as_bytes()) {
        return Err(UpstreamError::BadKey);
    }
    let content_key = kdf::derive_key(shared.as_bytes(), &[kdf::UPSTREAM_INFO])?;

    let wire = aead::seal(&content_key, &plain)?;
    let signature = sign::sign(eph_signing.secret.as_bytes(), &wire)?;

    let mut id = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut id);

    Ok(OutboundUpstream {
        envelope: UpstreamEnvelope {
            id: hex::encode(id),
            channel_id: manifest.channel_id.clone(),
            kind: payload.kind,
            encrypted_payload: wire,
            signature: b64_encode(&signature),
            sender_ephemeral_signing_key: b64_encode(&eph_signing.public),
            timestamp_ms: payload.timestamp_ms,
        },
        ephemeral_agreement_public: eph_agreement.public,
    })
}

/// Owner side: verify the ephemeral signature, re-derive the content key,
/// and decrypt.
pub fn open_upstream(
    envelope: &UpstreamEnvelope,
    ephemeral_agreement_public: &[u8; 32],
    owner_agreement_secret: &[u8; 32],
    max_upstream_size: u64,
) -> Result<UpstreamPayload, UpstreamError> {
    let eph_sig_pub = keys::decode_public_key_b64(&envelope.sender_ephemeral_signing_key)?;
    let sig = b64_decode(&envelope.signature)?;
    if !sign::verify(&eph_sig_pub, &envelope.encrypted_payload, &sig) {
        return Err(UpstreamError::BadSignature);
    }

    let secret = StaticSecret::from(*owner_agreement_secret);
    let shared = secret.diffie_hellman(&PublicKey::from(*ephemeral_agreement_public));
    if zero_shared(shared.as_bytes()) {
        return Err(UpstreamError::BadKey);
    }
    let content_key = kdf::derive_key(shared.as_bytes(), &[kdf::UPSTREAM_INFO])?;

    let plain = aead::open(&content_key, &envelope.encrypted_payload)?;
    Ok(decode_canonical_limited(
        &plain,
        (max_upstream_size as usize).saturating_add(1024),
    )?)
}

/// Partition decrypted replies into threads keyed by parent message id.
/// Non-replies and replies without a parent are skipped; order within each
/// bucket is insertion order.
pub fn group_replies(payloads: &[UpstreamPayload]) -> BTreeMap<String, Vec<UpstreamPayload>> {
    let mut threads: BTreeMap<String, Vec<UpstreamPayload>> = BTreeMap::new();
    for p in payloads {
        if p.kind != UpstreamKind::Reply {
            continue;
        }
        let Some(parent) = p.reply_to.as_ref() else {
            continue;
        };
        threads.entry(parent.clone()).or_default().push(p.clone());
    }
    threads
}

/// Outbound upstream handle: sends when a relay channel is attached,
/// otherwise queues up to capacity and drains FIFO on attach. Overflow
/// drops the newest message (recovered, logged, counted).
pub struct UpstreamMailer {
    tx: Option<mpsc::Sender<OutboundUpstream>>,
    pending: VecDeque<OutboundUpstream>,
    capacity: usize,
    metrics: Option<Arc<Metrics>>,
}

impl UpstreamMailer {
    /// Create a detached mailer with the given pending capacity.
    pub fn new(capacity: usize) -> Self {
        Self {
            tx: None,
            pending: VecDeque::new(),
            capacity,
            metrics: None,
        }
    }

    /// Attach metrics for drop accounting.
    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Attach a relay send channel and drain the pending queue in insertion
    /// order.
    pub fn attach(&mut self, tx: mpsc::Sender<OutboundUpstream>) {
        while let Some(msg) = self.pending.pop_front() {
            if let Err(e) = tx.try_send(msg) {
                match e {
                    mpsc::error::TrySendError::Full(msg) => {
                        // Transport back-pressure: keep the rest queued.
                        self.pending.push_front(msg);
                        break;
                    }
                    mpsc::error::TrySendError::Closed(msg) => {
                        self.pending.push_front(msg);
                        return;
                    }
                }
            }
        }
        self.tx = Some(tx);
    }

    /// Drop the relay send channel; later sends queue locally again.
    pub fn detach(&mut self) {
        self.tx = None;
    }

    /// Send immediately when attached, otherwise queue. A full queue drops
    /// the message.
    pub fn send_or_queue(&mut self, msg: OutboundUpstream) {
        let Some(tx) = self.tx.clone() else {
            self.queue(msg);
            return;
        };
        match tx.try_send(msg) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(msg))
            | Err(mpsc::error::TrySendError::Closed(msg)) => {
                self.tx = None;
                self.queue(msg);
            }
        }
    }

    fn queue(&mut self, msg: OutboundUpstream) {
        if self.pending.len() >= self.capacity {
            warn!(
                channel = %msg.envelope.channel_id,
                pending = self.pending.len(),
                "pending upstream queue full; dropping message"
            );
            if let Some(m) = &self.metrics {
                m.upstream_dropped_total.inc();
            }
            return;
        }
        self.pending.push_back(msg);
    }

    /// Number of queued messages.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}
