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

//! Deterministic chunking and hardened reassembly.
//!
//! Splitting slices the encrypted message into fixed-size chunks and signs
//! each slice. Reassembly is all-or-nothing: any structural, authorisation,
//! signature, or size failure rejects the whole set.

use rand::RngCore;
use std::collections::BTreeSet;

use crate::channel::crypto::{sign_chunk, verify_chunk};
use crate::channel::ChannelError;
use crate::core::crypto::keys::SecretKey32;
use crate::core::types::{b64_encode, Chunk, ZajelConfig, CHUNK_ID_LEN};

/// Plaintext slice size.
pub const CHUNK_SIZE: usize = 64 * 1024;
/// Hard cap on one reassembled message.
pub const MAX_MESSAGE_SIZE: u64 = 50 * 1024 * 1024;
/// Hard cap on one chunk's encrypted payload.
pub const MAX_CHUNK_PAYLOAD_SIZE: u64 = 2 * CHUNK_SIZE as u64;

/// Size limits governing split and reassembly.
#[derive(Clone, Copy, Debug)]
pub struct ChunkerLimits {
    /// Slice size for splitting.
    pub chunk_size: usize,
    /// Cumulative message cap.
    pub max_message_size: u64,
    /// Per-chunk encrypted payload cap.
    pub max_chunk_payload_size: u64,
}

impl Default for ChunkerLimits {
    fn default() -> Self {
        Self {
            chunk_size: CHUNK_SIZE,
            max_message_size: MAX_MESSAGE_SIZE,
            max_chunk_payload_size: MAX_CHUNK_PAYLOAD_SIZE,
        }
    }
}

impl From<&ZajelConfig> for ChunkerLimits {
    fn from(cfg: &ZajelConfig) -> Self {
        Self {
            chunk_size: cfg.chunk_size,
            max_message_size: cfg.max_message_size,
            max_chunk_payload_size: cfg.max_chunk_payload_size,
        }
    }
}

/// Signing identity for outgoing chunks (owner or admin seed plus the
/// matching base64 public key carried as `author_pubkey`).
pub struct ChunkSigner {
    /// Ed25519 seed.
    pub seed: SecretKey32,
    /// base64 signing public key listed in the manifest.
    pub author_pubkey: String,
}

fn fresh_chunk_id() -> Vec<u8> {
    let mut id = vec![0u8; CHUNK_ID_LEN];
    rand::thread_rng().fill_bytes(&mut id);
    id
}

/// Split an encrypted message into signed chunks for one sequence number.
pub fn split(
    encrypted_message: &[u8],
    signer: &ChunkSigner,
    sequence: u64,
    routing_hash: &str,
    limits: ChunkerLimits,
) -> Result<Vec<Chunk>, ChannelError> {
    if limits.chunk_size == 0 {
        return Err(ChannelError::Internal);
    }
    if encrypted_message.is_empty() {
        return Err(ChannelError::Malformed("empty message"));
    }
    if encrypted_message.len() as u64 > limits.max_message_size {
        return Err(ChannelError::PolicyViolation);
    }

    let total_chunks = encrypted_message.len().div_ceil(limits.chunk_size);
    let mut chunks = Vec::with_capacity(total_chunks);
    for (i, slice) in encrypted_message.chunks(limits.chunk_size).enumerate() {
        let signature = sign_chunk(slice, signer.seed.as_bytes())?;
        chunks.push(Chunk {
            chunk_id: fresh_chunk_id(),
            routing_hash: routing_hash.to_string(),
            sequence,
            chunk_index: i as u32,
            total_chunks: total_chunks as u32,
            size: slice.len() as u64,
            signature: b64_encode(&signature),
            author_pubkey: signer.author_pubkey.clone(),
            encrypted_payload: slice.to_vec(),
        });
    }
    Ok(chunks)
}

/// Verify a chunk set and reconstruct the encrypted message.
///
/// Checks, in order: non-empty set; constant `sequence`/`total_chunks`;
/// exact index coverage `[0, total)` without duplicates; authorised authors
/// with verifying signatures; per-chunk and (overflow-checked) cumulative
/// size caps. Partial content is never surfaced.
pub fn verify_and_reassemble(
    chunks: &[Chunk],
    authorised_keys: &[String],
    limits: ChunkerLimits,
) -> Result<Vec<u8>, ChannelError> {
    if chunks.is_empty() {
        return Err(ChannelError::Malformed("empty chunk set"));
    }

    let sequence = chunks[0].sequence;
    let total = chunks[0].total_chunks;
    if total == 0 {
        return Err(ChannelError::Malformed("zero total_chunks"));
    }
    if chunks.len() != total as usize {
        return Err(ChannelError::Malformed("chunk count mismatch"));
    }

    let mut seen = BTreeSet::new();
    let mut running: u64 = 0;
    for chunk in chunks {
        if chunk.sequence != sequence {
            return Err(ChannelError::Malformed("sequence mismatch"));
        }
        if chunk.total_chunks != total {
            return Err(ChannelError::Malformed("total_chunks mismatch"));
        }
        if chunk.chunk_index >= total {
            return Err(ChannelError::Malformed("index out of range"));
        }
        if !seen.insert(chunk.chunk_index) {
            return Err(ChannelError::Malformed("duplicate index"));
        }
        if chunk.size != chunk.encrypted_payload.len() as u64 {
            return Err(ChannelError::Malformed("size field mismatch"));
        }
        if chunk.size > limits.max_chunk_payload_size {
            return Err(ChannelError::Malformed("chunk payload too large"));
        }

        verify_chunk(chunk, authorised_keys)?;

        running = running
            .checked_add(chunk.size)
            .ok_or(ChannelError::Malformed("size overflow"))?;
        if running > limits.max_message_size {
            return Err(ChannelError::Malformed("message too large"));
        }
    }

    let mut ordered: Vec<&Chunk> = chunks.iter().collect();
    ordered.sort_by_key(|c| c.chunk_index);

    let mut out = Vec::with_capacity(running as usize);
    for chunk in ordered {
        out.extend_from_slice(&chunk.encrypted_payload);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::crypto::keys::generate_signing_keypair;

    fn test_signer() -> (ChunkSigner, Vec<String>) {
        let kp = generate_signing_keypair().unwrap();
        let author = b64_encode(&kp.public);
        (
            ChunkSigner {
                seed: kp.secret,
                author_pubkey: author.clone(),
            },
            vec![author],
        )
    }

    #[test]
    fn exact_multiple_has_no_empty_trailing_chunk() {
        let (signer, keys) = test_signer();
        let limits = ChunkerLimits {
            chunk_size: 16,
            ..ChunkerLimits::default()
        };
        let msg = vec![0x41u8; 48];
        let chunks = split(&msg, &signer, 1, "ab", limits).unwrap();
        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|c| c.size == 16));
        assert_eq!(verify_and_reassemble(&chunks, &keys, limits).unwrap(), msg);
    }

    #[test]
    fn remainder_lands_in_a_shorter_last_chunk() {
        let (signer, keys) = test_signer();
        let limits = ChunkerLimits {
            chunk_size: 16,
            ..ChunkerLimits::default()
        };
        let msg = vec![0x41u8; 50];
        let chunks = split(&msg, &signer, 1, "ab", limits).unwrap();
        assert_eq!(chunks.len(), 4);
        assert_eq!(chunks[3].size, 2);
        assert_eq!(verify_and_reassemble(&chunks, &keys, limits).unwrap(), msg);
    }

    #[test]
    fn reassembly_is_order_insensitive() {
        let (signer, keys) = test_signer();
        let limits = ChunkerLimits {
            chunk_size: 8,
            ..ChunkerLimits::default()
        };
        let msg: Vec<u8> = (0..64u8).collect();
        let mut chunks = split(&msg, &signer, 9, "ab", limits).unwrap();
        chunks.reverse();
        assert_eq!(verify_and_reassemble(&chunks, &keys, limits).unwrap(), msg);
    }

    #[test]
    fn duplicate_index_rejected() {
        let (signer, keys) = test_signer();
        let limits = ChunkerLimits {
            chunk_size: 8,
            ..ChunkerLimits::default()
        };
        let msg = vec![1u8; 24];
        let mut chunks = split(&msg, &signer, 1, "ab", limits).unwrap();
        chunks[2] = chunks[1].clone();
        assert!(matches!(
            verify_and_reassemble(&chunks, &keys, limits),
            Err(ChannelError::Malformed(_))
        ));
    }

    #[test]
    fn missing_chunk_rejected() {
        let (signer, keys) = test_signer();
        let limits = ChunkerLimits {
            chunk_size: 8,
            ..ChunkerLimits::default()
        };
        let msg = vec![1u8; 24];
        let mut chunks = split(&msg, &signer, 1, "ab", limits).unwrap();
        chunks.pop();
        assert!(matches!(
            verify_and_reassemble(&chunks, &keys, limits),
            Err(ChannelError::Malformed(_))
        ));
    }

    #[test]
    fn unauthorised_author_rejected() {
        let (signer, _) = test_signer();
        let limits = ChunkerLimits::default();
        let msg = vec![1u8; 100];
        let chunks = split(&msg, &signer, 1, "ab", limits).unwrap();

        let stranger = generate_signing_keypair().unwrap();
        let foreign = vec![b64_encode(&stranger.public)];
        assert_eq!(
            verify_and_reassemble(&chunks, &foreign, limits),
            Err(ChannelError::UnknownAuthor)
        );
    }

    #[test]
    fn tampered_payload_fails_signature() {
        let (signer, keys) = test_signer();
        let limits = ChunkerLimits::default();
        let msg = vec![1u8; 100];
        let mut chunks = split(&msg, &signer, 1, "ab", limits).unwrap();
        chunks[0].encrypted_payload[0] ^= 0x01;
        chunks[0].size = chunks[0].encrypted_payload.len() as u64;
        assert_eq!(
            verify_and_reassemble(&chunks, &keys, limits),
            Err(ChannelError::BadSignature)
        );
    }

    #[test]
    fn cumulative_cap_is_exact() {
        let (signer, keys) = test_signer();
        let limits = ChunkerLimits {
            chunk_size: 10,
            max_message_size: 30,
            max_chunk_payload_size: 20,
        };
        let at_cap = vec![0u8; 30];
        let chunks = split(&at_cap, &signer, 1, "ab", limits).unwrap();
        assert!(verify_and_reassemble(&chunks, &keys, limits).is_ok());

        let over = vec![0u8; 31];
        assert_eq!(
            split(&over, &signer, 1, "ab", limits).unwrap_err(),
            ChannelError::PolicyViolation
        );
    }
}
