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

//! Out-of-band key verification: fingerprints and safety numbers for humans
//! to compare over a second channel.

use crate::core::crypto::fingerprint;
use crate::core::crypto::keys::decode_public_key_b64;
use crate::session::pairwise::SessionManager;
use crate::session::SessionError;

/// Fingerprint of this process's agreement public key.
pub fn own_fingerprint(manager: &SessionManager) -> Result<String, SessionError> {
    Ok(fingerprint::public_key_fingerprint(manager.own_public())?)
}

/// Fingerprint of a peer key received as base64.
pub fn peer_fingerprint(peer_public_b64: &str) -> Result<String, SessionError> {
    let key = decode_public_key_b64(peer_public_b64)?;
    Ok(fingerprint::public_key_fingerprint(&key)?)
}

/// Mutual safety number between this process and a peer key. Both sides
/// compute the same 60-digit string.
pub fn safety_number_with(
    manager: &SessionManager,
    peer_public_b64: &str,
) -> Result<String, SessionError> {
    let peer = decode_public_key_b64(peer_public_b64)?;
    Ok(fingerprint::safety_number(manager.own_public(), &peer)?)
}

/// Display form of a safety number: four lines of three 5-digit groups.
pub fn display_safety_number(digits: &str) -> String {
    fingerprint::format_safety_number(digits)
}

/// Compare two independently computed safety numbers.
pub fn safety_numbers_match(ours: &str, theirs: &str) -> bool {
    ours == theirs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::crypto::keys::generate_agreement_keypair;

    #[test]
    fn both_sides_agree_on_the_safety_number() {
        let alice = SessionManager::new(generate_agreement_keypair());
        let bob = SessionManager::new(generate_agreement_keypair());

        let ours = safety_number_with(&alice, &bob.own_public_b64()).unwrap();
        let theirs = safety_number_with(&bob, &alice.own_public_b64()).unwrap();
        assert!(safety_numbers_match(&ours, &theirs));
        assert_eq!(ours.len(), 60);
    }

    #[test]
    fn wrong_length_keys_are_rejected() {
        let short = crate::core::types::b64_encode(&[0u8; 31]);
        assert_eq!(peer_fingerprint(&short).unwrap_err(), SessionError::BadKey);
    }
}
