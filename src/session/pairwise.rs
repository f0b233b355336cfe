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

//! Two-party sessions over static X25519 keys.
//!
//! `establish_session` pins the peer's canonical public key; any key later
//! presented over the data path is compared in constant time against it, so
//! a transport that swaps keys after signaling is caught. Sessions expire
//! after 24 hours and every encrypt/decrypt enforces that.

use std::collections::BTreeMap;
use std::sync::Arc;
use x25519_dalek::{PublicKey, StaticSecret};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::core::crypto::keys::{decode_public_key_b64, AgreementKeypair};
use crate::core::crypto::{aead, fingerprint, kdf};
use crate::core::types::{b64_encode, ZajelConfig};
use crate::monitoring::metrics::Metrics;
use crate::session::replay::{NonceHistory, SlidingWindow, MAX_NONCE_HISTORY};
use crate::session::{ReplayCause, SessionError};

/// Session lifetime: 24 hours.
pub const SESSION_EXPIRY_MS: u64 = 86_400_000;

/// Sequenced frames prepend the sequence as 8 big-endian bytes.
const SEQ_PREFIX_LEN: usize = 8;

#[derive(Zeroize, ZeroizeOnDrop)]
struct Session {
    session_key: [u8; 32],
    #[zeroize(skip)]
    peer_public: [u8; 32],
    #[zeroize(skip)]
    created_at_ms: u64,
    #[zeroize(skip)]
    nonces: NonceHistory,
    #[zeroize(skip)]
    window: SlidingWindow,
    #[zeroize(skip)]
    send_seq: u64,
}

/// Pairwise session store keyed by peer id, over one process-lifetime
/// agreement keypair.
pub struct SessionManager {
    own: AgreementKeypair,
    sessions: BTreeMap<String, Session>,
    expiry_ms: u64,
    nonce_capacity: usize,
    metrics: Option<Arc<Metrics>>,
}

impl SessionManager {
    /// Manager with the built-in expiry and nonce-history limits.
    pub fn new(own: AgreementKeypair) -> Self {
        Self {
            own,
            sessions: BTreeMap::new(),
            expiry_ms: SESSION_EXPIRY_MS,
            nonce_capacity: MAX_NONCE_HISTORY,
            metrics: None,
        }
    }

    /// Manager with limits from the runtime config.
    pub fn from_config(own: AgreementKeypair, cfg: &ZajelConfig) -> Self {
        Self {
            expiry_ms: cfg.session_expiry_ms,
            nonce_capacity: cfg.max_nonce_history,
            ..Self::new(own)
        }
    }

    /// Attach metrics for replay/auth accounting.
    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// This process's agreement public key.
    pub fn own_public(&self) -> &[u8; 32] {
        &self.own.public
    }

    /// This process's agreement public key, base64.
    pub fn own_public_b64(&self) -> String {
        b64_encode(&self.own.public)
    }

    /// Perform DH with the peer's static public key and derive the session
    /// key. Replaces any existing session with this peer.
    pub fn establish_session(
        &mut self,
        peer_id: &str,
        peer_public_b64: &str,
        now_ms: u64,
    ) -> Result<(), SessionError> {
        let peer_public = decode_public_key_b64(peer_public_b64)?;

        let secret = StaticSecret::from(*self.own.secret.as_bytes());
        let mut shared = *secret.diffie_hellman(&PublicKey::from(peer_public)).as_bytes();
        if shared.iter().all(|&b| b == 0) {
            return Err(SessionError::BadKey);
        }
        let session_key = kdf::derive_key(&shared, &[kdf::SESSION_INFO, peer_id.as_bytes()])?;
        shared.zeroize();

        self.sessions.insert(
            peer_id.to_string(),
            Session {
                session_key,
                peer_public,
                created_at_ms: now_ms,
                nonces: NonceHistory::new(self.nonce_capacity),
                window: SlidingWindow::new(),
                send_seq: 0,
            },
        );
        Ok(())
    }

    /// Whether a session exists for this peer.
    pub fn has_session(&self, peer_id: &str) -> bool {
        self.sessions.contains_key(peer_id)
    }

    /// Constant-time comparison of a key received over the data path against
    /// the canonical key pinned at establishment. `false` when no session
    /// exists, the encoding is invalid, or lengths differ.
    pub fn verify_peer_key(&self, peer_id: &str, received_b64: &str) -> bool {
        let Some(session) = self.sessions.get(peer_id) else {
            return false;
        };
        let Ok(received) = crate::core::types::b64_decode(received_b64) else {
            return false;
        };
        fingerprint::constant_time_equal(&session.peer_public, &received)
    }

    /// The peer public key pinned at establishment.
    pub fn peer_public(&self, peer_id: &str) -> Option<&[u8; 32]> {
        self.sessions.get(peer_id).map(|s| &s.peer_public)
    }

    /// Drop a session: key material, pinned peer key, and replay state.
    pub fn clear_session(&mut self, peer_id: &str) {
        // Session key zeroizes on drop.
        self.sessions.remove(peer_id);
    }

    /// Whether the session outlived its expiry. Absent sessions count as
    /// expired.
    pub fn is_expired(&self, peer_id: &str, now_ms: u64) -> bool {
        match self.sessions.get(peer_id) {
            Some(s) => now_ms.saturating_sub(s.created_at_ms) > self.expiry_ms,
            None => true,
        }
    }

    fn live_session(&mut self, peer_id: &str, now_ms: u64) -> Result<&mut Session, SessionError> {
        let expired = self.is_expired(peer_id, now_ms);
        let Some(session) = self.sessions.get_mut(peer_id) else {
            return Err(SessionError::NoSession);
        };
        if expired {
            return Err(SessionError::Expired);
        }
        Ok(session)
    }

    /// Encrypt a frame for the peer: fresh nonce, `nonce||ct||tag` wire.
    pub fn encrypt(
        &mut self,
        peer_id: &str,
        plaintext: &[u8],
        now_ms: u64,
    ) -> Result<Vec<u8>, SessionError> {
        let session = self.live_session(peer_id, now_ms)?;
        Ok(aead::seal(&session.session_key, plaintext)?)
    }

    /// Decrypt a frame from the peer with nonce-replay rejection.
    pub fn decrypt(
        &mut self,
        peer_id: &str,
        wire: &[u8],
        now_ms: u64,
    ) -> Result<Vec<u8>, SessionError> {
        let metrics = self.metrics.clone();
        let session = self.live_session(peer_id, now_ms)?;

        let nonce = aead::nonce_of(wire).map_err(|_| SessionError::BadEncoding)?;
        if session.nonces.contains(&nonce) {
            if let Some(m) = &metrics {
                m.replay_dropped_total.inc();
            }
            return Err(SessionError::Replay(ReplayCause::DuplicateNonce));
        }

        let plain = aead::open(&session.session_key, wire).map_err(|e| {
            if let Some(m) = &metrics {
                m.auth_failed_total.inc();
            }
            SessionError::from(e)
        })?;
        // Only authenticated frames consume nonce-history capacity.
        session.nonces.insert(&nonce);
        Ok(plain)
    }

    /// Encrypt with a strictly increasing sequence number prepended
    /// (8 bytes, big-endian) for the sliding-window variant.
    pub fn encrypt_sequenced(
        &mut self,
        peer_id: &str,
        plaintext: &[u8],
        now_ms: u64,
    ) -> Result<Vec<u8>, SessionError> {
        let session = self.live_session(peer_id, now_ms)?;
        session.send_seq = session.send_seq.saturating_add(1);
        let seq = session.send_seq;

        let frame = aead::seal(&session.session_key, plaintext)?;
        let mut out = Vec::with_capacity(SEQ_PREFIX_LEN + frame.len());
        out.extend_from_slice(&seq.to_be_bytes());
        out.extend_from_slice(&frame);
        Ok(out)
    }

    /// Decrypt a sequenced frame: authenticate first, then run the sliding
    /// window so unauthenticated garbage cannot advance it.
    pub fn decrypt_sequenced(
        &mut self,
        peer_id: &str,
        wire: &[u8],
        now_ms: u64,
    ) -> Result<Vec<u8>, SessionError> {
        if wire.len() < SEQ_PREFIX_LEN {
            return Err(SessionError::BadEncoding);
        }
        let mut seq_bytes = [0u8; SEQ_PREFIX_LEN];
        seq_bytes.copy_from_slice(&wire[..SEQ_PREFIX_LEN]);
        let seq = u64::from_be_bytes(seq_bytes);
        let frame = &wire[SEQ_PREFIX_LEN..];

        let metrics = self.metrics.clone();
        let session = self.live_session(peer_id, now_ms)?;

        let nonce = aead::nonce_of(frame).map_err(|_| SessionError::BadEncoding)?;
        if session.nonces.contains(&nonce) {
            if let Some(m) = &metrics {
                m.replay_dropped_total.inc();
            }
            return Err(SessionError::Replay(ReplayCause::DuplicateNonce));
        }

        let plain = aead::open(&session.session_key, frame).map_err(|e| {
            if let Some(m) = &metrics {
                m.auth_failed_total.inc();
            }
            SessionError::from(e)
        })?;

        session.window.check(seq).map_err(|cause| {
            if let Some(m) = &metrics {
                m.replay_dropped_total.inc();
            }
            SessionError::Replay(cause)
        })?;
        session.nonces.insert(&nonce);
        Ok(plain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::crypto::keys::generate_agreement_keypair;

    fn pair() -> (SessionManager, SessionManager) {
        (
            SessionManager::new(generate_agreement_keypair()),
            SessionManager::new(generate_agreement_keypair()),
        )
    }

    #[test]
    fn both_sides_derive_the_same_key() {
        let (mut alice, mut bob) = pair();
        // The KDF bakes the peer id into the expansion input, so the ids
        // must be mirrored: both sides label the *session*, not themselves.
        alice
            .establish_session("pair-1", &bob.own_public_b64(), 0)
            .unwrap();
        bob.establish_session("pair-1", &alice.own_public_b64(), 0)
            .unwrap();

        let wire = alice.encrypt("pair-1", b"m", 1).unwrap();
        assert_eq!(bob.decrypt("pair-1", &wire, 1).unwrap(), b"m");
    }

    #[test]
    fn replaying_a_frame_is_rejected() {
        let (mut alice, mut bob) = pair();
        alice.establish_session("p", &bob.own_public_b64(), 0).unwrap();
        bob.establish_session("p", &alice.own_public_b64(), 0).unwrap();

        let wire = alice.encrypt("p", b"m", 1).unwrap();
        assert_eq!(bob.decrypt("p", &wire, 2).unwrap(), b"m");
        assert_eq!(
            bob.decrypt("p", &wire, 3).unwrap_err(),
            SessionError::Replay(ReplayCause::DuplicateNonce)
        );
    }

    #[test]
    fn expiry_rejects_both_directions() {
        let (mut alice, mut bob) = pair();
        alice.establish_session("p", &bob.own_public_b64(), 0).unwrap();

        let later = SESSION_EXPIRY_MS + 1;
        assert!(alice.is_expired("p", later));
        assert_eq!(
            alice.encrypt("p", b"m", later).unwrap_err(),
            SessionError::Expired
        );
        assert_eq!(
            alice.decrypt("p", &[0u8; 64], later).unwrap_err(),
            SessionError::Expired
        );
        assert_eq!(
            bob.encrypt("p", b"m", 1).unwrap_err(),
            SessionError::NoSession
        );
    }

    #[test]
    fn establish_validates_the_key() {
        let (mut alice, _) = pair();
        assert_eq!(
            alice.establish_session("p", "@@@", 0).unwrap_err(),
            SessionError::BadEncoding
        );
        let short = b64_encode(&[1u8; 16]);
        assert_eq!(
            alice.establish_session("p", &short, 0).unwrap_err(),
            SessionError::BadKey
        );
    }

    #[test]
    fn peer_key_verification_is_pinned() {
        let (mut alice, bob) = pair();
        alice.establish_session("p", &bob.own_public_b64(), 0).unwrap();

        assert!(alice.verify_peer_key("p", &bob.own_public_b64()));
        let other = generate_agreement_keypair();
        assert!(!alice.verify_peer_key("p", &b64_encode(&other.public)));
        assert!(!alice.verify_peer_key("p", "@@@"));
        assert!(!alice.verify_peer_key("unknown", &bob.own_public_b64()));
    }

    #[test]
    fn clear_session_wipes_state() {
        let (mut alice, bob) = pair();
        alice.establish_session("p", &bob.own_public_b64(), 0).unwrap();
        assert!(alice.has_session("p"));
        alice.clear_session("p");
        assert!(!alice.has_session("p"));
        assert!(alice.is_expired("p", 0));
    }

    #[test]
    fn sequenced_frames_tolerate_reorder_but_not_replay() {
        let (mut alice, mut bob) = pair();
        alice.establish_session("p", &bob.own_public_b64(), 0).unwrap();
        bob.establish_session("p", &alice.own_public_b64(), 0).unwrap();

        let f1 = alice.encrypt_sequenced("p", b"one", 1).unwrap();
        let f2 = alice.encrypt_sequenced("p", b"two", 1).unwrap();

        // Out-of-order delivery is fine.
        assert_eq!(bob.decrypt_sequenced("p", &f2, 2).unwrap(), b"two");
        assert_eq!(bob.decrypt_sequenced("p", &f1, 2).unwrap(), b"one");
        // Replay of either is not.
        assert_eq!(
            bob.decrypt_sequenced("p", &f1, 3).unwrap_err(),
            SessionError::Replay(ReplayCause::DuplicateNonce)
        );
    }

    #[test]
    fn tampered_sequence_prefix_cannot_advance_the_window() {
        let (mut alice, mut bob) = pair();
        alice.establish_session("p", &bob.own_public_b64(), 0).unwrap();
        bob.establish_session("p", &alice.own_public_b64(), 0).unwrap();

        let mut forged = alice.encrypt_sequenced("p", b"one", 1).unwrap();
        // Attacker rewrites the (unauthenticated) sequence prefix and mangles
        // the ciphertext: authentication fails before the window moves.
        forged[0] = 0xFF;
        forged[SEQ_PREFIX_LEN + 13] ^= 1;
        assert_eq!(
            bob.decrypt_sequenced("p", &forged, 2).unwrap_err(),
            SessionError::AuthFailed
        );

        // The genuine frame still goes through.
        let genuine = alice.encrypt_sequenced("p", b"two", 1).unwrap();
        assert_eq!(bob.decrypt_sequenced("p", &genuine, 2).unwrap(), b"two");
    }
}
