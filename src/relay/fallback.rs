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

//! Active relay node selection and failover.

use std::sync::Arc;
use tracing::{info, warn};

use crate::core::types::{FetchResult, ZajelConfig};
use crate::monitoring::metrics::Metrics;
use crate::relay::censorship;
use crate::relay::health::RelayHealth;
use crate::relay::RelayError;

/// Recent failures before a node is suspected.
pub const MAX_CONSECUTIVE_FAILURES: u32 = 3;
/// Cooldown before a suspected node may be re-adopted.
pub const UNHEALTHY_COOLDOWN_MS: u64 = 600_000;
/// Window within which failures count as "recent".
pub const RECENT_FAILURE_WINDOW_MS: u64 = 300_000;

/// Chooses and maintains the active relay node over one `RelayHealth`
/// collection.
pub struct RelaySelector {
    active: Option<String>,
    max_consecutive_failures: u32,
    unhealthy_cooldown_ms: u64,
    recent_failure_window_ms: u64,
    metrics: Option<Arc<Metrics>>,
}

impl Default for RelaySelector {
    fn default() -> Self {
        Self {
            active: None,
            max_consecutive_failures: MAX_CONSECUTIVE_FAILURES,
            unhealthy_cooldown_ms: UNHEALTHY_COOLDOWN_MS,
            recent_failure_window_ms: RECENT_FAILURE_WINDOW_MS,
            metrics: None,
        }
    }
}

impl RelaySelector {
    /// Selector with the built-in thresholds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Selector with thresholds from the runtime config.
    pub fn from_config(cfg: &ZajelConfig) -> Self {
        Self {
            max_consecutive_failures: cfg.max_consecutive_failures,
            unhealthy_cooldown_ms: cfg.unhealthy_cooldown_ms,
            ..Self::default()
        }
    }

    /// Attach metrics for failover accounting.
    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Currently active node, if any.
    pub fn active_node(&self) -> Option<&str> {
        self.active.as_deref()
    }

    /// Adopt a node explicitly (startup, manual override).
    pub fn set_active(&mut self, url: &str) {
        self.active = Some(url.to_string());
    }

    /// All known nodes in preference order: non-suspected first, each group
    /// sorted by success rate descending (URL as the deterministic
    /// tie-break).
    pub fn fallback_order(&self, health: &RelayHealth) -> Vec<String> {
        let mut nodes: Vec<_> = health
            .nodes()
            .map(|n| (n.suspected_blocking, n.success_rate(), n.url.clone()))
            .collect();
        nodes.sort_by(|a, b| {
            a.0.cmp(&b.0)
                .then(b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal))
                .then(a.2.cmp(&b.2))
        });
        nodes.into_iter().map(|(_, _, url)| url).collect()
    }

    /// Best node right now: the head of the fallback order.
    pub fn best_node(&self, health: &RelayHealth) -> Option<String> {
        self.fallback_order(health).into_iter().next()
    }

    /// Record a fetch result and run failover policy. Returns the new
    /// active node when a switch happened.
    pub fn on_fetch_result(
        &mut self,
        health: &mut RelayHealth,
        url: &str,
        routing_hash: Option<&str>,
        result: FetchResult,
        now_ms: u64,
    ) -> Option<String> {
        health.record(routing_hash, url, result, now_ms);

        let failed = matches!(result, FetchResult::NetworkError | FetchResult::Blocked);
        if failed {
            let recent = health
                .node(url)
                .map(|n| n.recent_failure_count(now_ms, self.recent_failure_window_ms))
                .unwrap_or(0);
            if recent >= self.max_consecutive_failures {
                health.mark_suspected(url);
            }
        }
        self.update_suspected_gauge(health);

        if !failed || self.active.as_deref() != Some(url) {
            return None;
        }

        match self.fallback_to_alternative(health, url, routing_hash, now_ms) {
            Ok(next) => {
                info!(from = url, to = %next, "relay failover");
                if let Some(m) = &self.metrics {
                    m.relay_failover_total.inc();
                }
                self.active = Some(next.clone());
                Some(next)
            }
            Err(RelayError::NodeUnavailable) => {
                warn!(node = url, "no relay alternative available");
                None
            }
        }
    }

    /// Pick an alternative to `exclude` for the given routing fingerprint.
    ///
    /// Nodes with no block history for the fingerprint are preferred. When
    /// no alternative exists and the excluded node has cooled down, its
    /// suspicion is cleared and it is re-adopted.
    pub fn fallback_to_alternative(
        &self,
        health: &mut RelayHealth,
        exclude: &str,
        routing_hash: Option<&str>,
        now_ms: u64,
    ) -> Result<String, RelayError> {
        let blocking: Vec<String> = routing_hash
            .map(|h| censorship::nodes_blocking(health, h))
            .unwrap_or_default();

        let ordered = self.fallback_order(health);
        let candidates: Vec<&String> = ordered.iter().filter(|u| u.as_str() != exclude).collect();

        // Prefer nodes with no block history for this fingerprint.
        if let Some(url) = candidates.iter().find(|u| !blocking.contains(u)) {
            return Ok((*url).clone());
        }
        if let Some(url) = candidates.first() {
            return Ok((*url).clone());
        }

        // No alternative: cooldown retry on the excluded node.
        if let Some(node) = health.node(exclude) {
            let cooled = node
                .last_failure_ms
                .map(|t| now_ms.saturating_sub(t) >= self.unhealthy_cooldown_ms)
                .unwrap_or(true);
            if cooled {
                health.clear_suspicion(exclude);
                return Ok(exclude.to_string());
            }
        }
        Err(RelayError::NodeUnavailable)
    }

    fn update_suspected_gauge(&self, health: &RelayHealth) {
        if let Some(m) = &self.metrics {
            m.relay_suspected_nodes.set(health.suspected_count() as i64);
        }
    }
}
