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

//! Epoch-keyed payload encryption and chunk signatures.
//!
//! The payload key is derived from the channel secret with the epoch baked
//! into the KDF label, so catch-up on a past epoch only needs the historical
//! epoch number. Chunk signatures cover the encrypted bytes and are checked
//! against the manifest's authorised key set.

use crate::channel::ChannelError;
use crate::core::crypto::{aead, kdf, keys, sign};
use crate::core::types::{
    b64_decode, decode_canonical_limited, encode_canonical, Chunk, ChunkPayload,
};

/// Encrypt a canonical payload under the epoch key for `key_epoch`.
pub fn encrypt_payload(
    payload: &ChunkPayload,
    key_material: &[u8],
    key_epoch: u64,
) -> Result<Vec<u8>, ChannelError> {
    let plain = encode_canonical(payload)?;
    let label = kdf::channel_payload_label(key_epoch);
    let key = kdf::derive_key(key_material, &[label.as_bytes()])?;
    Ok(aead::seal(&key, &plain)?)
}

/// Decrypt and decode a payload sealed by `encrypt_payload` for the same
/// epoch. `max_size` caps the decoded plaintext.
pub fn decrypt_payload(
    wire: &[u8],
    key_material: &[u8],
    key_epoch: u64,
    max_size: usize,
) -> Result<ChunkPayload, ChannelError> {
    let label = kdf::channel_payload_label(key_epoch);
    let key = kdf::derive_key(key_material, &[label.as_bytes()])?;
    let plain = aead::open(&key, wire)?;
    // Canonical framing overhead on top of the raw content bytes.
    Ok(decode_canonical_limited(&plain, max_size.saturating_add(1024))?)
}

/// Detached signature over an encrypted chunk payload.
pub fn sign_chunk(encrypted_payload: &[u8], seed: &[u8; 32]) -> Result<Vec<u8>, ChannelError> {
    Ok(sign::sign(seed, encrypted_payload)?)
}

/// Verify one chunk against the authorised key set.
///
/// The author must be listed (otherwise `UnknownAuthor`) and the signature
/// must verify over the encrypted payload (otherwise `BadSignature`).
pub fn verify_chunk(chunk: &Chunk, authorised_keys: &[String]) -> Result<(), ChannelError> {
    if !authorised_keys.iter().any(|k| k == &chunk.author_pubkey) {
        return Err(ChannelError::UnknownAuthor);
    }
    let author = keys::decode_public_key_b64(&chunk.author_pubkey)?;
    let sig = b64_decode(&chunk.signature)?;
    if !sign::verify(&author, &chunk.encrypted_payload, &sig) {
        return Err(ChannelError::BadSignature);
    }
    Ok(())
}
