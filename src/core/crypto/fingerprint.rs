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

//! Key fingerprints and pair-derived safety numbers for out-of-band
//! verification.
//!
//! Both peers of a pair compute the same safety number regardless of which
//! side runs the derivation: the two public keys are sorted before hashing.

use ring::digest;
use subtle::ConstantTimeEq;

use crate::core::crypto::keys::PUBLIC_KEY_LEN;
use crate::core::crypto::CryptoError;

/// Decimal digits in a safety number.
pub const SAFETY_NUMBER_DIGITS: usize = 60;
const SAFETY_NUMBER_GROUPS: usize = 12;

/// Uppercase-hex SHA-256 fingerprint of a 32-byte public key, displayed in
/// space-separated groups of four characters.
pub fn public_key_fingerprint(public: &[u8]) -> Result<String, CryptoError> {
    if public.len() != PUBLIC_KEY_LEN {
        return Err(CryptoError::BadKey);
    }
    let d = digest::digest(&digest::SHA256, public);
    let hex_upper = hex::encode_upper(d.as_ref());
    let grouped: Vec<&str> = hex_upper
        .as_bytes()
        .chunks(4)
        .map(|c| std::str::from_utf8(c).unwrap_or(""))
        .collect();
    Ok(grouped.join(" "))
}

/// 60-digit safety number for a key pair: sort the two public keys,
/// concatenate, SHA-256, then emit 12 zero-padded 5-digit groups from the
/// first 12 big-endian u16 pairs.
pub fn safety_number(a_pub: &[u8], b_pub: &[u8]) -> Result<String, CryptoError> {
    if a_pub.len() != PUBLIC_KEY_LEN || b_pub.len() != PUBLIC_KEY_LEN {
        return Err(CryptoError::BadKey);
    }
    let (lo, hi) = if a_pub <= b_pub { (a_pub, b_pub) } else { (b_pub, a_pub) };
    let mut joined = Vec::with_capacity(PUBLIC_KEY_LEN * 2);
    joined.extend_from_slice(lo);
    joined.extend_from_slice(hi);
    let d = digest::digest(&digest::SHA256, &joined);
    let h = d.as_ref();

    let mut out = String::with_capacity(SAFETY_NUMBER_DIGITS);
    for i in 0..SAFETY_NUMBER_GROUPS {
        let v = u16::from_be_bytes([h[2 * i], h[2 * i + 1]]) as u32 % 100_000;
        out.push_str(&format!("{v:05}"));
    }
    Ok(out)
}

/// Format a 60-digit safety number as four lines of three 5-digit groups.
pub fn format_safety_number(digits: &str) -> String {
    let groups: Vec<&str> = digits
        .as_bytes()
        .chunks(5)
        .map(|c| std::str::from_utf8(c).unwrap_or(""))
        .collect();
    groups
        .chunks(3)
        .map(|line| line.join(" "))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Constant-time byte comparison. Returns `false` when lengths differ.
pub fn constant_time_equal(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}
