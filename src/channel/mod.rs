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

//! Broadcast-channel core: signed manifests, epoch-keyed payload encryption,
//! chunking, routing fingerprints, and the upstream return path.

pub mod chunker;
pub mod crypto;
pub mod link;
pub mod manifest;
pub mod routing;
pub mod upstream;

use thiserror::Error;

use crate::core::crypto::keys::{
    agreement_public_from_secret, generate_agreement_keypair, generate_signing_keypair,
    secret_from_slice, AgreementKeypair, SecretKey32, SigningKeypair,
};
use crate::core::crypto::{keys, sign, CryptoError};
use crate::core::types::{
    b64_encode, ChannelRecord, ChannelRole, ChannelRules, CodecError, Manifest,
};

/// Channel core errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChannelError {
    /// base64/hex/canonical decode failed.
    #[error("bad encoding")]
    BadEncoding,
    /// Key has the wrong length.
    #[error("bad key")]
    BadKey,
    /// Signature did not verify.
    #[error("bad signature")]
    BadSignature,
    /// AEAD tag did not verify.
    #[error("auth failed")]
    AuthFailed,
    /// Chunk author not listed among the manifest's authorised keys.
    #[error("author not authorised")]
    UnknownAuthor,
    /// Non-owner attempted an owner-only operation.
    #[error("not authorised")]
    NotAuthorised,
    /// Publish attempted without a signing secret.
    #[error("signing secret required")]
    RoleMismatch,
    /// Payload exceeds a size cap or uses a disallowed type.
    #[error("policy violation")]
    PolicyViolation,
    /// Chunk set failed a structural check; no partial content is surfaced.
    #[error("malformed chunk set: {0}")]
    Malformed(&'static str),
    /// Invariant violation.
    #[error("internal")]
    Internal,
}

impl From<CryptoError> for ChannelError {
    fn from(e: CryptoError) -> Self {
        match e {
            CryptoError::BadEncoding => ChannelError::BadEncoding,
            CryptoError::BadKey => ChannelError::BadKey,
            CryptoError::BadSignature => ChannelError::BadSignature,
            CryptoError::AuthFailed => ChannelError::AuthFailed,
            CryptoError::Internal => ChannelError::Internal,
        }
    }
}

impl From<CodecError> for ChannelError {
    fn from(_: CodecError) -> Self {
        ChannelError::BadEncoding
    }
}

/// In-memory key material for a channel, by role.
///
/// Signing-dependent operations exist only on the owner/admin variants, so
/// "publish without a signing secret" is unrepresentable rather than a
/// runtime check.
pub enum ChannelKeys {
    /// The channel creator: owner signing seed plus the channel agreement pair.
    Owner {
        /// Ed25519 owner signing keypair (its public key IS the channel identity).
        signing: SigningKeypair,
        /// X25519 channel agreement keypair.
        encryption: AgreementKeypair,
    },
    /// A delegated admin: own signing seed plus the shared channel agreement pair.
    Admin {
        /// Ed25519 admin signing keypair, listed in the manifest.
        signing: SigningKeypair,
        /// X25519 channel agreement keypair.
        encryption: AgreementKeypair,
    },
    /// A subscriber: only the shared channel decryption secret.
    Subscriber {
        /// X25519 channel agreement secret.
        encryption_secret: SecretKey32,
        /// X25519 channel public key.
        encryption_public: [u8; 32],
    },
}

impl ChannelKeys {
    /// Local role for this key set.
    pub fn role(&self) -> ChannelRole {
        match self {
            ChannelKeys::Owner { .. } => ChannelRole::Owner,
            ChannelKeys::Admin { .. } => ChannelRole::Admin,
            ChannelKeys::Subscriber { .. } => ChannelRole::Subscriber,
        }
    }

    /// The channel agreement secret (all roles hold it).
    pub fn encryption_secret(&self) -> &SecretKey32 {
        match self {
            ChannelKeys::Owner { encryption, .. } | ChannelKeys::Admin { encryption, .. } => {
                &encryption.secret
            }
            ChannelKeys::Subscriber {
                encryption_secret, ..
            } => encryption_secret,
        }
    }

    /// A chunk signer, present only for owner and admin key sets.
    pub fn chunk_signer(&self) -> Option<chunker::ChunkSigner> {
        match self {
            ChannelKeys::Owner { signing, .. } | ChannelKeys::Admin { signing, .. } => {
                Some(chunker::ChunkSigner {
                    seed: signing.secret.clone(),
                    author_pubkey: b64_encode(&signing.public),
                })
            }
            ChannelKeys::Subscriber { .. } => None,
        }
    }

    /// Rebuild key material from a storage record.
    pub fn from_record(rec: &ChannelRecord) -> Result<Self, ChannelError> {
        let encryption_secret = secret_from_slice(rec.encryption_secret.as_slice())?;
        match rec.role {
            ChannelRole::Owner => {
                let seed = rec
                    .owner_signing_secret
                    .as_ref()
                    .ok_or(ChannelError::RoleMismatch)?;
                let seed = secret_from_slice(seed.as_slice())?;
                let public = sign::derive_public(seed.as_bytes())?;
                Ok(ChannelKeys::Owner {
                    signing: SigningKeypair {
                        secret: seed,
                        public,
                    },
                    encryption: AgreementKeypair {
                        public: agreement_public_from_secret(encryption_secret.as_bytes()),
                        secret: encryption_secret,
                    },
                })
            }
            ChannelRole::Admin => {
                let seed = rec
                    .admin_signing_secret
                    .as_ref()
                    .ok_or(ChannelError::RoleMismatch)?;
                let seed = secret_from_slice(seed.as_slice())?;
                let public = sign::derive_public(seed.as_bytes())?;
                Ok(ChannelKeys::Admin {
                    signing: SigningKeypair {
                        secret: seed,
                        public,
                    },
                    encryption: AgreementKeypair {
                        public: agreement_public_from_secret(encryption_secret.as_bytes()),
                        secret: encryption_secret,
                    },
                })
            }
            ChannelRole::Subscriber => Ok(ChannelKeys::Subscriber {
                encryption_public: agreement_public_from_secret(encryption_secret.as_bytes()),
                encryption_secret,
            }),
        }
    }
}

/// Create a new channel: fresh owner identity, fresh agreement pair, signed
/// first manifest at `key_epoch = 1`.
pub fn create_owner_channel(
    name: &str,
    description: &str,
    rules: ChannelRules,
    now_ms: u64,
) -> Result<ChannelRecord, ChannelError> {
    let signing = generate_signing_keypair()?;
    let encryption = generate_agreement_keypair();
    let channel_id = keys::derive_channel_id(&signing.public);

    let unsigned = Manifest {
        channel_id: channel_id.clone(),
        name: name.to_string(),
        description: description.to_string(),
        owner_key: b64_encode(&signing.public),
        admin_keys: Vec::new(),
        current_encrypt_key: b64_encode(&encryption.public),
        key_epoch: 1,
        rules,
        signature: String::new(),
    };
    let signed = manifest::sign_manifest(unsigned, signing.secret.as_bytes())?;

    Ok(ChannelRecord {
        id: channel_id,
        role: ChannelRole::Owner,
        manifest: signed,
        encryption_secret: encryption.secret.as_bytes().to_vec().into(),
        encryption_public: encryption.public.to_vec(),
        owner_signing_secret: Some(signing.secret.as_bytes().to_vec().into()),
        admin_signing_secret: None,
        created_at_ms: now_ms,
    })
}

/// Import a channel as a subscriber from a verified manifest and the
/// out-of-band decryption secret.
pub fn subscriber_record(
    manifest: Manifest,
    encryption_secret: &[u8],
    now_ms: u64,
) -> Result<ChannelRecord, ChannelError> {
    if !manifest::verify_manifest(&manifest) {
        return Err(ChannelError::BadSignature);
    }
    let secret = secret_from_slice(encryption_secret)?;
    let public = agreement_public_from_secret(secret.as_bytes());
    Ok(ChannelRecord {
        id: manifest.channel_id.clone(),
        role: ChannelRole::Subscriber,
        manifest,
        encryption_secret: secret.as_bytes().to_vec().into(),
        encryption_public: public.to_vec(),
        owner_signing_secret: None,
        admin_signing_secret: None,
        created_at_ms: now_ms,
    })
}

/// Import a channel as an admin: the manifest must already list the admin's
/// signing public key.
pub fn admin_record(
    manifest: Manifest,
    admin_signing_seed: &[u8],
    encryption_secret: &[u8],
    now_ms: u64,
) -> Result<ChannelRecord, ChannelError> {
    if !manifest::verify_manifest(&manifest) {
        return Err(ChannelError::BadSignature);
    }
    let seed = secret_from_slice(admin_signing_seed)?;
    let public = sign::derive_public(seed.as_bytes())?;
    let public_b64 = b64_encode(&public);
    if !manifest.admin_keys.iter().any(|a| a.key == public_b64) {
        return Err(ChannelError::NotAuthorised);
    }
    let secret = secret_from_slice(encryption_secret)?;
    let enc_public = agreement_public_from_secret(secret.as_bytes());
    Ok(ChannelRecord {
        id: manifest.channel_id.clone(),
        role: ChannelRole::Admin,
        manifest,
        encryption_secret: secret.as_bytes().to_vec().into(),
        encryption_public: enc_public.to_vec(),
        owner_signing_secret: None,
        admin_signing_secret: Some(seed.as_bytes().to_vec().into()),
        created_at_ms: now_ms,
    })
}
