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

//! Per-node relay health and per-routing-fingerprint fetch history.
//!
//! This implementation is deterministic and integer-only where it can be;
//! callers pass `now_ms` explicitly so behaviour is reproducible in tests.

use std::collections::{BTreeMap, VecDeque};

use crate::core::types::FetchResult;

/// Recent-failure ring capacity per node.
const RECENT_FAILURE_RING: usize = 32;
/// Per-fingerprint history capacity.
const HISTORY_CAP: usize = 64;

/// Health state for one relay node.
#[derive(Clone, Debug)]
pub struct NodeHealth {
    /// Node URL (identity).
    pub url: String,
    /// Lifetime successful fetches.
    pub success_count: u64,
    /// Lifetime failed fetches.
    pub failure_count: u64,
    /// Set on `Blocked` results or repeated recent failures; cleared on
    /// success or cooldown.
    pub suspected_blocking: bool,
    /// Last success, ms since UNIX epoch.
    pub last_success_ms: Option<u64>,
    /// Last failure, ms since UNIX epoch.
    pub last_failure_ms: Option<u64>,
    // Timestamps of recent failures, newest last. Cleared on success so a
    // "consecutive failures" count never picks up stale history.
    recent_failures: VecDeque<u64>,
}

impl NodeHealth {
    fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            success_count: 0,
            failure_count: 0,
            suspected_blocking: false,
            last_success_ms: None,
            last_failure_ms: None,
            recent_failures: VecDeque::new(),
        }
    }

    /// Lifetime success rate; 1.0 before any attempt.
    pub fn success_rate(&self) -> f64 {
        let attempts = self.success_count + self.failure_count;
        if attempts == 0 {
            return 1.0;
        }
        self.success_count as f64 / attempts as f64
    }

    /// Failures since the last success that fall within `window_ms` of `now_ms`.
    pub fn recent_failure_count(&self, now_ms: u64, window_ms: u64) -> u32 {
        let cutoff = now_ms.saturating_sub(window_ms);
        self.recent_failures
            .iter()
            .filter(|&&t| t >= cutoff)
            .count() as u32
    }

    fn note_failure(&mut self, now_ms: u64) {
        self.failure_count = self.failure_count.saturating_add(1);
        self.last_failure_ms = Some(now_ms);
        if self.recent_failures.len() >= RECENT_FAILURE_RING {
            self.recent_failures.pop_front();
        }
        self.recent_failures.push_back(now_ms);
    }

    fn note_success(&mut self, now_ms: u64) {
        self.success_count = self.success_count.saturating_add(1);
        self.last_success_ms = Some(now_ms);
        self.suspected_blocking = false;
        self.recent_failures.clear();
    }
}

/// Mutable relay-health collection: one instance per process, owned by the
/// health/censorship/fallback triple.
#[derive(Default)]
pub struct RelayHealth {
    nodes: BTreeMap<String, NodeHealth>,
    // history[routing_hash] = (node_url, result), oldest first, bounded.
    history: BTreeMap<String, VecDeque<(String, FetchResult)>>,
}

impl RelayHealth {
    /// Empty health state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a node so selection can consider it before its first fetch.
    pub fn register_node(&mut self, url: &str) {
        self.nodes
            .entry(url.to_string())
            .or_insert_with(|| NodeHealth::new(url));
    }

    /// Record one fetch result.
    ///
    /// `Success`/`Empty` clear suspicion and the recent-failure ring;
    /// `Blocked` sets the suspected flag; `NetworkError` only counts the
    /// failure. When `routing_hash` is known the result also enters the
    /// per-fingerprint history used by censorship detection.
    pub fn record(
        &mut self,
        routing_hash: Option<&str>,
        url: &str,
        result: FetchResult,
        now_ms: u64,
    ) {
        let node = self
            .nodes
            .entry(url.to_string())
            .or_insert_with(|| NodeHealth::new(url));
        match result {
            FetchResult::Success | FetchResult::Empty => node.note_success(now_ms),
            FetchResult::Blocked => {
                node.note_failure(now_ms);
                node.suspected_blocking = true;
            }
            FetchResult::NetworkError => node.note_failure(now_ms),
        }

        if let Some(hash) = routing_hash {
            let entries = self.history.entry(hash.to_string()).or_default();
            if entries.len() >= HISTORY_CAP {
                entries.pop_front();
            }
            entries.push_back((url.to_string(), result));
        }
    }

    /// Mark a node suspected (repeated recent failures).
    pub fn mark_suspected(&mut self, url: &str) {
        if let Some(node) = self.nodes.get_mut(url) {
            node.suspected_blocking = true;
        }
    }

    /// Clear a node's suspicion (cooldown retry).
    pub fn clear_suspicion(&mut self, url: &str) {
        if let Some(node) = self.nodes.get_mut(url) {
            node.suspected_blocking = false;
            node.recent_failures.clear();
        }
    }

    /// Health of one node.
    pub fn node(&self, url: &str) -> Option<&NodeHealth> {
        self.nodes.get(url)
    }

    /// All known nodes, keyed by URL.
    pub fn nodes(&self) -> impl Iterator<Item = &NodeHealth> {
        self.nodes.values()
    }

    /// Lifetime success rate of one node; 1.0 for unknown nodes.
    pub fn success_rate(&self, url: &str) -> f64 {
        self.nodes.get(url).map(|n| n.success_rate()).unwrap_or(1.0)
    }

    /// Iterate the fetch history for a routing fingerprint, oldest first.
    pub fn history_iter(
        &self,
        routing_hash: &str,
    ) -> impl Iterator<Item = &(String, FetchResult)> {
        self.history.get(routing_hash).into_iter().flatten()
    }

    /// Nodes currently suspected of blocking.
    pub fn suspected_count(&self) -> usize {
        self.nodes.values().filter(|n| n.suspected_blocking).count()
    }

    /// Reset all node counters and flags (epoch boundary).
    pub fn reset_health(&mut self) {
        for node in self.nodes.values_mut() {
            *node = NodeHealth::new(&node.url.clone());
        }
    }

    /// Drop all per-fingerprint history (epoch boundary).
    pub fn clear_history(&mut self) {
        self.history.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_rate_defaults_to_one() {
        let mut health = RelayHealth::new();
        health.register_node("https://n1");
        assert_eq!(health.success_rate("https://n1"), 1.0);
        assert_eq!(health.success_rate("https://unknown"), 1.0);
    }

    #[test]
    fn blocked_sets_suspicion_and_success_clears_it() {
        let mut health = RelayHealth::new();
        health.record(Some("h"), "n1", FetchResult::Blocked, 1_000);
        assert!(health.node("n1").unwrap().suspected_blocking);

        health.record(Some("h"), "n1", FetchResult::Success, 2_000);
        let node = health.node("n1").unwrap();
        assert!(!node.suspected_blocking);
        assert_eq!(node.last_success_ms, Some(2_000));
        assert_eq!(node.recent_failure_count(2_000, 300_000), 0);
    }

    #[test]
    fn network_error_counts_but_does_not_suspect() {
        let mut health = RelayHealth::new();
        health.record(None, "n1", FetchResult::NetworkError, 1_000);
        let node = health.node("n1").unwrap();
        assert_eq!(node.failure_count, 1);
        assert!(!node.suspected_blocking);
    }

    #[test]
    fn recent_failures_respect_the_window() {
        let mut health = RelayHealth::new();
        health.record(None, "n1", FetchResult::NetworkError, 1_000);
        health.record(None, "n1", FetchResult::NetworkError, 400_000);
        let node = health.node("n1").unwrap();
        // 5-minute window at t=500_000 excludes the first failure.
        assert_eq!(node.recent_failure_count(500_000, 300_000), 1);
        assert_eq!(node.recent_failure_count(401_000, 600_000), 2);
    }

    #[test]
    fn history_is_bounded_per_fingerprint() {
        let mut health = RelayHealth::new();
        for i in 0..(HISTORY_CAP + 10) {
            health.record(Some("h"), "n1", FetchResult::Success, i as u64);
        }
        assert_eq!(health.history_iter("h").count(), HISTORY_CAP);
    }

    #[test]
    fn reset_and_clear_wipe_state() {
        let mut health = RelayHealth::new();
        health.record(Some("h"), "n1", FetchResult::Blocked, 1_000);
        health.reset_health();
        health.clear_history();
        let node = health.node("n1").unwrap();
        assert_eq!(node.failure_count, 0);
        assert!(!node.suspected_blocking);
        assert_eq!(health.history_iter("h").count(), 0);
    }
}
