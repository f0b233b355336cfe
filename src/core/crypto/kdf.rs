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

//! HKDF-SHA256 extract-then-expand with domain-separated info labels.
//!
//! Both ends of a channel or session feed the same inputs and must derive
//! the same 32-byte key.

use ring::hkdf;

use crate::core::crypto::CryptoError;

/// Derived key length.
pub const DERIVED_KEY_LEN: usize = 32;

/// Info label for upstream message keys.
pub const UPSTREAM_INFO: &[u8] = b"zajel_upstream_message";
/// Info label prefix for pairwise session keys; the peer id is appended
/// to the expansion input.
pub const SESSION_INFO: &[u8] = b"zajel_session";

/// Info label for the channel payload key of one epoch.
pub fn channel_payload_label(key_epoch: u64) -> String {
    format!("channel_payload_epoch:{key_epoch}")
}

struct OkmLen;

impl hkdf::KeyType for OkmLen {
    fn len(&self) -> usize {
        DERIVED_KEY_LEN
    }
}

/// Extract-then-expand `shared_secret` into a 32-byte key under the given
/// domain-separation info parts.
pub fn derive_key(
    shared_secret: &[u8],
    info: &[&[u8]],
) -> Result<[u8; DERIVED_KEY_LEN], CryptoError> {
    let salt = hkdf::Salt::new(hkdf::HKDF_SHA256, &[]);
    let prk = salt.extract(shared_secret);
    let okm = prk.expand(info, OkmLen).map_err(|_| CryptoError::Internal)?;
    let mut out = [0u8; DERIVED_KEY_LEN];
    okm.fill(&mut out).map_err(|_| CryptoError::Internal)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_inputs_same_key() {
        let a = derive_key(b"shared", &[UPSTREAM_INFO]).unwrap();
        let b = derive_key(b"shared", &[UPSTREAM_INFO]).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn labels_separate_domains() {
        let a = derive_key(b"shared", &[UPSTREAM_INFO]).unwrap();
        let b = derive_key(b"shared", &[SESSION_INFO, b"peer-1"]).unwrap();
        let c = derive_key(b"shared", &[channel_payload_label(1).as_bytes()]).unwrap();
        let d = derive_key(b"shared", &[channel_payload_label(2).as_bytes()]).unwrap();
        assert_ne!(a, b);
        assert_ne!(c, d);
    }
}
