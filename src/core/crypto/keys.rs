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

//! Keypair generation and identity derivation.
//!
//! Signing keys are Ed25519 (32-byte seed); agreement keys are X25519
//! (32-byte static secret). Secrets live only in memory and are zeroized
//! on drop. The channel identity IS the SHA-256 of the owner signing
//! public key.

use ring::digest;
use ring::rand::{SecureRandom, SystemRandom};
use x25519_dalek::{PublicKey, StaticSecret};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::core::crypto::{sign, CryptoError};
use crate::core::types::b64_decode;

/// Public key length for both curves.
pub const PUBLIC_KEY_LEN: usize = 32;
/// Secret length for both curves (Ed25519 seed / X25519 scalar).
pub const SECRET_KEY_LEN: usize = 32;

/// 32 bytes of secret key material, zeroized on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecretKey32(pub [u8; SECRET_KEY_LEN]);

impl SecretKey32 {
    /// Borrow the raw bytes.
    pub fn as_bytes(&self) -> &[u8; SECRET_KEY_LEN] {
        &self.0
    }
}

impl std::fmt::Debug for SecretKey32 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SecretKey32(..)")
    }
}

/// Ed25519 signing keypair.
pub struct SigningKeypair {
    /// 32-byte seed.
    pub secret: SecretKey32,
    /// 32-byte public key.
    pub public: [u8; PUBLIC_KEY_LEN],
}

/// X25519 agreement keypair.
pub struct AgreementKeypair {
    /// 32-byte static secret.
    pub secret: SecretKey32,
    /// 32-byte public key.
    pub public: [u8; PUBLIC_KEY_LEN],
}

/// Generate a fresh Ed25519 signing keypair.
pub fn generate_signing_keypair() -> Result<SigningKeypair, CryptoError> {
    let rng = SystemRandom::new();
    let mut seed = [0u8; SECRET_KEY_LEN];
    rng.fill(&mut seed).map_err(|_| CryptoError::Internal)?;
    let public = sign::derive_public(&seed)?;
    Ok(SigningKeypair {
        secret: SecretKey32(seed),
        public,
    })
}

/// Generate a fresh X25519 agreement keypair.
pub fn generate_agreement_keypair() -> AgreementKeypair {
    let secret = StaticSecret::random_from_rng(rand::thread_rng());
    let public = PublicKey::from(&secret);
    AgreementKeypair {
        secret: SecretKey32(secret.to_bytes()),
        public: *public.as_bytes(),
    }
}

/// Derive the X25519 public key for a stored agreement secret.
pub fn agreement_public_from_secret(secret: &[u8; SECRET_KEY_LEN]) -> [u8; PUBLIC_KEY_LEN] {
    let s = StaticSecret::from(*secret);
    *PublicKey::from(&s).as_bytes()
}

/// Channel id: lowercase hex of the full SHA-256 of the owner signing
/// public key. Immutable across the channel's lifetime.
pub fn derive_channel_id(signing_public: &[u8]) -> String {
    let d = digest::digest(&digest::SHA256, signing_public);
    hex::encode(d.as_ref())
}

/// Re-derive the Ed25519 public key from a 32-byte seed.
pub fn signing_public_from_secret(
    seed: &[u8; SECRET_KEY_LEN],
) -> Result<[u8; PUBLIC_KEY_LEN], CryptoError> {
    sign::derive_public(seed)
}

/// Decode a base64 public key, insisting on exactly 32 bytes.
pub fn decode_public_key_b64(s: &str) -> Result<[u8; PUBLIC_KEY_LEN], CryptoError> {
    let bytes = b64_decode(s)?;
    if bytes.len() != PUBLIC_KEY_LEN {
        return Err(CryptoError::BadKey);
    }
    let mut out = [0u8; PUBLIC_KEY_LEN];
    out.copy_from_slice(&bytes);
    Ok(out)
}

/// Copy a 32-byte secret out of stored bytes, rejecting other lengths.
pub fn secret_from_slice(bytes: &[u8]) -> Result<SecretKey32, CryptoError> {
    if bytes.len() != SECRET_KEY_LEN {
        return Err(CryptoError::BadKey);
    }
    let mut out = [0u8; SECRET_KEY_LEN];
    out.copy_from_slice(bytes);
    Ok(SecretKey32(out))
}
