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

//! Replay filters: a bounded seen-nonce set and a 64-bit sliding sequence
//! window.
//!
//! The nonce set is capacity-bounded; overflow evicts the oldest half, so a
//! sufficiently old nonce may no longer be rejected. That bounds memory, it
//! does not leak plaintext.

use std::collections::{HashSet, VecDeque};

use crate::session::ReplayCause;

/// Default nonce history capacity per peer.
pub const MAX_NONCE_HISTORY: usize = 10_000;
/// Sliding window width in sequence numbers.
pub const WINDOW_WIDTH: u32 = 64;

/// Bounded set of recently seen nonces (hex-encoded), insertion-ordered for
/// eviction.
pub struct NonceHistory {
    seen: HashSet<String>,
    order: VecDeque<String>,
    capacity: usize,
}

impl NonceHistory {
    /// Empty history with the given capacity.
    pub fn new(capacity: usize) -> Self {
        Self {
            seen: HashSet::new(),
            order: VecDeque::new(),
            capacity: capacity.max(2),
        }
    }

    /// Whether this nonce was already observed.
    pub fn contains(&self, nonce: &[u8]) -> bool {
        self.seen.contains(&hex::encode(nonce))
    }

    /// Record a nonce. At capacity, the oldest half is evicted first.
    pub fn insert(&mut self, nonce: &[u8]) {
        if self.seen.len() >= self.capacity {
            for _ in 0..self.capacity / 2 {
                if let Some(old) = self.order.pop_front() {
                    self.seen.remove(&old);
                }
            }
        }
        let key = hex::encode(nonce);
        if self.seen.insert(key.clone()) {
            self.order.push_back(key);
        }
    }

    /// Check-and-record in one step.
    pub fn observe(&mut self, nonce: &[u8]) -> Result<(), ReplayCause> {
        if self.contains(nonce) {
            return Err(ReplayCause::DuplicateNonce);
        }
        self.insert(nonce);
        Ok(())
    }

    /// Number of tracked nonces.
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    /// Whether the history is empty.
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

/// 64-bit sliding window over sequence numbers.
///
/// Accepts any forward jump (shifting the window), out-of-order arrivals
/// within the window whose bit is clear, and rejects everything else.
#[derive(Clone, Copy, Debug, Default)]
pub struct SlidingWindow {
    highest: u64,
    bitmap: u64,
}

impl SlidingWindow {
    /// Fresh window; the first accepted sequence seeds it.
    pub fn new() -> Self {
        Self::default()
    }

    /// Highest sequence accepted so far.
    pub fn highest(&self) -> u64 {
        self.highest
    }

    /// Accept or reject a sequence number, updating the window on accept.
    pub fn check(&mut self, seq: u64) -> Result<(), ReplayCause> {
        if seq > self.highest {
            let delta = seq - self.highest;
            self.bitmap = if delta >= WINDOW_WIDTH as u64 {
                1
            } else {
                (self.bitmap << delta) | 1
            };
            self.highest = seq;
            return Ok(());
        }

        let offset = self.highest - seq;
        if offset >= WINDOW_WIDTH as u64 {
            return Err(ReplayCause::StaleSequence);
        }
        let bit = 1u64 << offset;
        if self.bitmap & bit != 0 {
            return Err(ReplayCause::DuplicateSequence);
        }
        self.bitmap |= bit;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nonce_history_rejects_repeats() {
        let mut history = NonceHistory::new(16);
        assert_eq!(history.observe(b"n-1"), Ok(()));
        assert_eq!(history.observe(b"n-1"), Err(ReplayCause::DuplicateNonce));
        assert_eq!(history.observe(b"n-2"), Ok(()));
    }

    #[test]
    fn overflow_evicts_the_oldest_half() {
        let capacity = 10;
        let mut history = NonceHistory::new(capacity);
        for i in 0..capacity as u64 {
            history.insert(&i.to_be_bytes());
        }
        assert_eq!(history.len(), capacity);

        // One more insert triggers eviction of the oldest half.
        history.insert(&100u64.to_be_bytes());
        assert_eq!(history.len(), capacity / 2 + 1);
        // The very first nonce is forgotten, recent ones are not.
        assert!(!history.contains(&0u64.to_be_bytes()));
        assert!(history.contains(&9u64.to_be_bytes()));
        assert!(history.contains(&100u64.to_be_bytes()));
    }

    #[test]
    fn window_accepts_forward_and_in_window_out_of_order() {
        let mut w = SlidingWindow::new();
        assert_eq!(w.check(5), Ok(()));
        assert_eq!(w.check(3), Ok(()));
        assert_eq!(w.check(5), Err(ReplayCause::DuplicateSequence));
        assert_eq!(w.check(3), Err(ReplayCause::DuplicateSequence));
        assert_eq!(w.check(70), Ok(()));
        assert_eq!(w.highest(), 70);
    }

    #[test]
    fn window_boundary_behaviour() {
        let mut w = SlidingWindow::new();
        let n = 100u64;
        assert_eq!(w.check(n), Ok(()));
        // A jump of exactly the window width is a forward accept.
        assert_eq!(w.check(n + 64), Ok(()));
        // n - 64 relative to the new highest is 128 behind: too old.
        assert_eq!(w.check(n - 64), Err(ReplayCause::StaleSequence));
        // 63 behind the highest is the last in-window slot.
        assert_eq!(w.check(n + 1), Ok(()));
    }

    #[test]
    fn large_jump_resets_the_bitmap() {
        let mut w = SlidingWindow::new();
        assert_eq!(w.check(1), Ok(()));
        assert_eq!(w.check(2), Ok(()));
        assert_eq!(w.check(1000), Ok(()));
        // Everything before the jump is now stale.
        assert_eq!(w.check(900), Err(ReplayCause::StaleSequence));
        assert_eq!(w.check(999), Ok(()));
    }
}
