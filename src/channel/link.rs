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

//! Out-of-band channel invite links.
//!
//! A link carries the signed manifest plus the subscriber decryption secret,
//! URL-safe base64 over a JSON body. Admin signing secrets never enter a
//! link; admins are provisioned separately.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::{Deserialize, Serialize};

use crate::channel::{manifest, ChannelError};
use crate::core::crypto::keys::{secret_from_slice, SecretKey32};
use crate::core::types::{b64_decode, b64_encode, Manifest};

/// URI prefix for invite links.
pub const LINK_PREFIX: &str = "zajel://channel/";

#[derive(Serialize, Deserialize)]
struct LinkBody {
    manifest: Manifest,
    /// base64 of the 32-byte channel agreement secret.
    key: String,
}

/// Encode an invite link for a channel.
pub fn encode_link(manifest: &Manifest, encryption_secret: &[u8]) -> Result<String, ChannelError> {
    if encryption_secret.len() != 32 {
        return Err(ChannelError::BadKey);
    }
    let body = LinkBody {
        manifest: manifest.clone(),
        key: b64_encode(encryption_secret),
    };
    let json = serde_json::to_string(&body).map_err(|_| ChannelError::Internal)?;
    Ok(format!("{LINK_PREFIX}{}", URL_SAFE_NO_PAD.encode(json)))
}

/// Decode an invite link, re-verifying the manifest signature and the key
/// length.
pub fn decode_link(link: &str) -> Result<(Manifest, SecretKey32), ChannelError> {
    let encoded = link
        .strip_prefix(LINK_PREFIX)
        .ok_or(ChannelError::BadEncoding)?;
    let json = URL_SAFE_NO_PAD
        .decode(encoded)
        .map_err(|_| ChannelError::BadEncoding)?;
    let body: LinkBody =
        serde_json::from_slice(&json).map_err(|_| ChannelError::BadEncoding)?;
    if !manifest::verify_manifest(&body.manifest) {
        return Err(ChannelError::BadSignature);
    }
    let key_bytes = b64_decode(&body.key)?;
    let secret = secret_from_slice(&key_bytes)?;
    Ok((body.manifest, secret))
}
