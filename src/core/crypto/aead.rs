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

//! AES-256-GCM with `nonce(12) || ciphertext || tag(16)` wire framing.
//!
//! No associated data at this layer; envelope metadata integrity comes from
//! the outer detached signatures.

use ring::aead;
use ring::rand::{SecureRandom, SystemRandom};

use crate::core::crypto::CryptoError;

/// Nonce length (96-bit, freshly random per seal).
pub const NONCE_LEN: usize = 12;
/// GCM tag length appended to the ciphertext.
pub const TAG_LEN: usize = 16;
/// Symmetric key length.
pub const KEY_LEN: usize = 32;

/// Encrypt `plaintext`, returning `nonce || ciphertext || tag`.
pub fn seal(key: &[u8; KEY_LEN], plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let rng = SystemRandom::new();
    let mut nonce_bytes = [0u8; NONCE_LEN];
    rng.fill(&mut nonce_bytes).map_err(|_| CryptoError::Internal)?;
    let nonce = aead::Nonce::assume_unique_for_key(nonce_bytes);

    let unbound =
        aead::UnboundKey::new(&aead::AES_256_GCM, key).map_err(|_| CryptoError::Internal)?;
    let less_safe = aead::LessSafeKey::new(unbound);

    // ciphertext buffer = plaintext + tag
    let mut in_out = plaintext.to_vec();
    less_safe
        .seal_in_place_append_tag(nonce, aead::Aad::empty(), &mut in_out)
        .map_err(|_| CryptoError::Internal)?;

    let mut out = Vec::with_capacity(NONCE_LEN + in_out.len());
    out.extend_from_slice(&nonce_bytes);
    out.extend_from_slice(&in_out);
    Ok(out)
}

/// Decrypt a `nonce || ciphertext || tag` frame.
pub fn open(key: &[u8; KEY_LEN], wire: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if wire.len() < NONCE_LEN + TAG_LEN {
        return Err(CryptoError::BadEncoding);
    }
    let mut nonce_bytes = [0u8; NONCE_LEN];
    nonce_bytes.copy_from_slice(&wire[..NONCE_LEN]);
    let nonce = aead::Nonce::assume_unique_for_key(nonce_bytes);

    let unbound =
        aead::UnboundKey::new(&aead::AES_256_GCM, key).map_err(|_| CryptoError::Internal)?;
    let less_safe = aead::LessSafeKey::new(unbound);

    let mut in_out = wire[NONCE_LEN..].to_vec();
    let plain = less_safe
        .open_in_place(nonce, aead::Aad::empty(), &mut in_out)
        .map_err(|_| CryptoError::AuthFailed)?;
    Ok(plain.to_vec())
}

/// The 12-byte nonce of a sealed frame (used for replay bookkeeping).
pub fn nonce_of(wire: &[u8]) -> Result<[u8; NONCE_LEN], CryptoError> {
    if wire.len() < NONCE_LEN + TAG_LEN {
        return Err(CryptoError::BadEncoding);
    }
    let mut out = [0u8; NONCE_LEN];
    out.copy_from_slice(&wire[..NONCE_LEN]);
    Ok(out)
}
