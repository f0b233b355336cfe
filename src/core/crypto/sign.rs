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

//! Detached Ed25519 signatures over canonical bytes.

use ring::signature::{Ed25519KeyPair, KeyPair, UnparsedPublicKey, ED25519};

use crate::core::crypto::CryptoError;

/// Detached signature length.
pub const SIGNATURE_LEN: usize = 64;

/// Sign `msg` with a 32-byte Ed25519 seed, returning the 64-byte detached
/// signature.
pub fn sign(seed: &[u8; 32], msg: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let kp = Ed25519KeyPair::from_seed_unchecked(seed).map_err(|_| CryptoError::BadKey)?;
    Ok(kp.sign(msg).as_ref().to_vec())
}

/// Verify a detached signature. Returns `false` for malformed keys or
/// signatures; callers convert that to an error.
pub fn verify(public: &[u8], msg: &[u8], sig: &[u8]) -> bool {
    if sig.len() != SIGNATURE_LEN {
        return false;
    }
    let pk = UnparsedPublicKey::new(&ED25519, public);
    pk.verify(msg, sig).is_ok()
}

/// Re-derive the public key from a 32-byte seed.
pub fn derive_public(seed: &[u8; 32]) -> Result<[u8; 32], CryptoError> {
    let kp = Ed25519KeyPair::from_seed_unchecked(seed).map_err(|_| CryptoError::BadKey)?;
    let pk = kp.public_key();
    let mut out = [0u8; 32];
    out.copy_from_slice(pk.as_ref());
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::crypto::keys::generate_signing_keypair;

    #[test]
    fn sign_verify_roundtrip() {
        let kp = generate_signing_keypair().unwrap();
        let sig = sign(kp.secret.as_bytes(), b"msg").unwrap();
        assert_eq!(sig.len(), SIGNATURE_LEN);
        assert!(verify(&kp.public, b"msg", &sig));
        assert!(!verify(&kp.public, b"other", &sig));
    }

    #[test]
    fn bad_key_verifies_false_not_panic() {
        let kp = generate_signing_keypair().unwrap();
        let sig = sign(kp.secret.as_bytes(), b"msg").unwrap();
        assert!(!verify(&[0u8; 31], b"msg", &sig));
        assert!(!verify(&kp.public, b"msg", &sig[..63]));
    }
}
