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

//! Rotating routing fingerprints.
//!
//! The relay never sees the channel secret; it sees a 16-byte keyed hash
//! that every member derives identically for the same epoch and that
//! rotates when the epoch does.

use ring::hmac;

use crate::core::types::EpochDuration;

/// Truncated HMAC output length.
pub const FINGERPRINT_LEN: usize = 16;

/// Epoch number for a wall-clock instant: `floor(unix_ms / period_ms)`.
pub fn epoch_number(unix_ms: u64, duration: EpochDuration) -> u64 {
    unix_ms / duration.period_ms()
}

/// Epoch label fed to the keyed hash: `epoch:<hourly|daily>:<n>`.
pub fn epoch_label(duration: EpochDuration, epoch: u64) -> String {
    format!("epoch:{}:{}", duration.name(), epoch)
}

/// First 16 bytes of HMAC-SHA256(channel_secret, label).
pub fn routing_fingerprint(channel_secret: &[u8], label: &str) -> [u8; FINGERPRINT_LEN] {
    let key = hmac::Key::new(hmac::HMAC_SHA256, channel_secret);
    let tag = hmac::sign(&key, label.as_bytes());
    let mut out = [0u8; FINGERPRINT_LEN];
    out.copy_from_slice(&tag.as_ref()[..FINGERPRINT_LEN]);
    out
}

/// Routing fingerprint for a specific epoch, as 32 lowercase hex chars.
pub fn fingerprint_for_epoch(
    channel_secret: &[u8],
    epoch: u64,
    duration: EpochDuration,
) -> String {
    hex::encode(routing_fingerprint(
        channel_secret,
        &epoch_label(duration, epoch),
    ))
}

/// Routing fingerprint for the epoch containing `unix_ms`.
pub fn current_fingerprint(
    channel_secret: &[u8],
    duration: EpochDuration,
    unix_ms: u64,
) -> String {
    fingerprint_for_epoch(channel_secret, epoch_number(unix_ms, duration), duration)
}

/// Inclusive epoch range covering `[from_ms, to_ms]`, for catch-up fetches.
pub fn epoch_range(
    from_ms: u64,
    to_ms: u64,
    duration: EpochDuration,
) -> std::ops::RangeInclusive<u64> {
    epoch_number(from_ms, duration)..=epoch_number(to_ms.max(from_ms), duration)
}
