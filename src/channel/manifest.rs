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

//! Manifest signing and verification.
//!
//! The signing payload is a domain tag followed by the canonical encoding of
//! the manifest with `signature` cleared. The manifest is immutable after
//! signing; every lifecycle operation (admin add/remove, key rotation)
//! returns a re-signed copy.

use crate::channel::ChannelError;
use crate::core::crypto::{keys, sign};
use crate::core::types::{b64_decode, b64_encode, encode_canonical, AdminKey, Manifest};

const MANIFEST_DOMAIN: &[u8] = b"zajel-manifest-v1";

/// Signing payload: domain tag || canonical(manifest with signature cleared).
pub fn signing_bytes(manifest: &Manifest) -> Result<Vec<u8>, ChannelError> {
    let mut unsigned = manifest.clone();
    unsigned.signature = String::new();
    let body = encode_canonical(&unsigned)?;
    let mut out = Vec::with_capacity(MANIFEST_DOMAIN.len() + body.len());
    out.extend_from_slice(MANIFEST_DOMAIN);
    out.extend_from_slice(&body);
    Ok(out)
}

/// Re-issue the manifest signature with the owner's signing seed.
///
/// Rejects with `NotAuthorised` when the seed does not correspond to
/// `owner_key`.
pub fn sign_manifest(
    mut manifest: Manifest,
    owner_signing_seed: &[u8; 32],
) -> Result<Manifest, ChannelError> {
    let derived = sign::derive_public(owner_signing_seed)?;
    if b64_encode(&derived) != manifest.owner_key {
        return Err(ChannelError::NotAuthorised);
    }
    let bytes = signing_bytes(&manifest)?;
    let sig = sign::sign(owner_signing_seed, &bytes)?;
    manifest.signature = b64_encode(&sig);
    Ok(manifest)
}

/// Verify the manifest signature against `owner_key` and the channel-id
/// binding. Returns `false` on any decode or verification failure.
pub fn verify_manifest(manifest: &Manifest) -> bool {
    let Ok(owner_pk) = keys::decode_public_key_b64(&manifest.owner_key) else {
        return false;
    };
    if keys::derive_channel_id(&owner_pk) != manifest.channel_id {
        return false;
    }
    let Ok(sig) = b64_decode(&manifest.signature) else {
        return false;
    };
    let Ok(bytes) = signing_bytes(manifest) else {
        return false;
    };
    sign::verify(&owner_pk, &bytes, &sig)
}

/// The authorised chunk-signing keys: the owner key followed by every admin
/// key, in manifest order.
pub fn authorised_keys(manifest: &Manifest) -> Vec<String> {
    let mut out = Vec::with_capacity(1 + manifest.admin_keys.len());
    out.push(manifest.owner_key.clone());
    out.extend(manifest.admin_keys.iter().map(|a| a.key.clone()));
    out
}

/// Add an admin signing key and re-sign. Owner-only.
pub fn add_admin(
    manifest: Manifest,
    admin_key_b64: &str,
    label: &str,
    owner_signing_seed: &[u8; 32],
) -> Result<Manifest, ChannelError> {
    // Validate the key before it enters the authorised set.
    keys::decode_public_key_b64(admin_key_b64)?;
    let mut m = manifest;
    if m.admin_keys.iter().any(|a| a.key == admin_key_b64) {
        return sign_manifest(m, owner_signing_seed);
    }
    m.admin_keys.push(AdminKey {
        key: admin_key_b64.to_string(),
        label: label.to_string(),
    });
    sign_manifest(m, owner_signing_seed)
}

/// Remove an admin signing key and re-sign. Owner-only. Callers pair this
/// with a key rotation so a removed admin cannot read future epochs.
pub fn remove_admin(
    manifest: Manifest,
    admin_key_b64: &str,
    owner_signing_seed: &[u8; 32],
) -> Result<Manifest, ChannelError> {
    let mut m = manifest;
    m.admin_keys.retain(|a| a.key != admin_key_b64);
    sign_manifest(m, owner_signing_seed)
}

/// Rotate the channel agreement key: bump `key_epoch` and re-sign.
pub fn rotate_key(
    manifest: Manifest,
    new_encrypt_key_b64: &str,
    owner_signing_seed: &[u8; 32],
) -> Result<Manifest, ChannelError> {
    keys::decode_public_key_b64(new_encrypt_key_b64)?;
    let mut m = manifest;
    m.current_encrypt_key = new_encrypt_key_b64.to_string();
    m.key_epoch = m.key_epoch.saturating_add(1);
    sign_manifest(m, owner_signing_seed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::create_owner_channel;
    use crate::core::crypto::keys::generate_agreement_keypair;
    use crate::core::types::ChannelRules;

    fn test_rules() -> ChannelRules {
        ChannelRules {
            replies_enabled: true,
            polls_enabled: true,
            max_upstream_size: 4096,
            allowed_types: vec!["text".to_string()],
        }
    }

    #[test]
    fn signed_manifest_verifies() {
        let rec = create_owner_channel("News", "daily news", test_rules(), 1).unwrap();
        assert!(verify_manifest(&rec.manifest));
    }

    #[test]
    fn mutating_any_signed_field_breaks_verification() {
        let rec = create_owner_channel("News", "daily news", test_rules(), 1).unwrap();

        let mut m = rec.manifest.clone();
        m.name = "Not News".to_string();
        assert!(!verify_manifest(&m));

        let mut m = rec.manifest.clone();
        m.key_epoch += 1;
        assert!(!verify_manifest(&m));

        let mut m = rec.manifest.clone();
        m.rules.replies_enabled = false;
        assert!(!verify_manifest(&m));
    }

    #[test]
    fn channel_id_binding_is_checked() {
        let rec = create_owner_channel("News", "", test_rules(), 1).unwrap();
        let mut m = rec.manifest;
        m.channel_id = "00".repeat(32);
        assert!(!verify_manifest(&m));
    }

    #[test]
    fn rotation_bumps_epoch_and_keeps_validity() {
        let rec = create_owner_channel("News", "", test_rules(), 1).unwrap();
        let seed: [u8; 32] = rec
            .owner_signing_secret
            .as_ref()
            .unwrap()
            .as_slice()
            .try_into()
            .unwrap();
        let next = generate_agreement_keypair();
        let rotated = rotate_key(rec.manifest, &b64_encode(&next.public), &seed).unwrap();
        assert_eq!(rotated.key_epoch, 2);
        assert!(verify_manifest(&rotated));
    }

    #[test]
    fn foreign_seed_cannot_sign() {
        let rec = create_owner_channel("News", "", test_rules(), 1).unwrap();
        let other = crate::core::crypto::keys::generate_signing_keypair().unwrap();
        let res = sign_manifest(rec.manifest, other.secret.as_bytes());
        assert_eq!(res.unwrap_err(), ChannelError::NotAuthorised);
    }
}
