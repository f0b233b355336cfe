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
#![warn(missing_docs)]

use prometheus::{IntCounter, IntGauge, Registry};
use thiserror::Error;

/// Metrics errors.
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("prometheus")]
    Prom,
}

/// Metrics container.
#[derive(Clone)]
pub struct Metrics {
    /// Registry.
    pub registry: Registry,

    /// Messages fully reassembled and decrypted.
    pub messages_reassembled_total: IntCounter,
    /// Chunk sets rejected during reassembly.
    pub reassembly_failed_total: IntCounter,

    /// Upstream messages dropped because the pending queue was full.
    pub upstream_dropped_total: IntCounter,

    /// Session frames dropped by replay protection.
    pub replay_dropped_total: IntCounter,
    /// AEAD authentication failures.
    pub auth_failed_total: IntCounter,

    /// Active relay node switches.
    pub relay_failover_total: IntCounter,
    /// Relay nodes currently suspected of blocking.
    pub relay_suspected_nodes: IntGauge,
}

impl Metrics {
    /// Create and register metrics.
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let messages_reassembled_total = IntCounter::new(
            "zajel_messages_reassembled_total",
            "Messages fully reassembled and decrypted",
        )
        .map_err(|_| MetricsError::Prom)?;
        let reassembly_failed_total = IntCounter::new(
            "zajel_reassembly_failed_total",
            "Chunk sets rejected during reassembly",
        )
        .map_err(|_| MetricsError::Prom)?;
        let upstream_dropped_total = IntCounter::new(
            "zajel_upstream_dropped_total",
            "Upstream messages dropped on a full pending queue",
        )
        .map_err(|_| MetricsError::Prom)?;
        let replay_dropped_total = IntCounter::new(
            "zajel_replay_dropped_total",
            "Session frames dropped by replay protection",
        )
        .map_err(|_| MetricsError::Prom)?;
        let auth_failed_total =
            IntCounter::new("zajel_auth_failed_total", "AEAD authentication failures")
                .map_err(|_| MetricsError::Prom)?;
        let relay_failover_total =
            IntCounter::new("zajel_relay_failover_total", "Active relay node switches")
                .map_err(|_| MetricsError::Prom)?;
        let relay_suspected_nodes = IntGauge::new(
            "zajel_relay_suspected_nodes",
            "Relay nodes currently suspected of blocking",
        )
        .map_err(|_| MetricsError::Prom)?;

        registry
            .register(Box::new(messages_reassembled_total.clone()))
            .map_err(|_| MetricsError::Prom)?;
        registry
            .register(Box::new(reassembly_failed_total.clone()))
            .map_err(|_| MetricsError::Prom)?;
        registry
            .register(Box::new(upstream_dropped_total.clone()))
            .map_err(|_| MetricsError::Prom)?;
        registry
            .register(Box::new(replay_dropped_total.clone()))
            .map_err(|_| MetricsError::Prom)?;
        registry
            .register(Box::new(auth_failed_total.clone()))
            .map_err(|_| MetricsError::Prom)?;
        registry
            .register(Box::new(relay_failover_total.clone()))
            .map_err(|_| MetricsError::Prom)?;
        registry
            .register(Box::new(relay_suspected_nodes.clone()))
            .map_err(|_| MetricsError::Prom)?;

        Ok(Self {
            registry,
            messages_reassembled_total,
            reassembly_failed_total,
            upstream_dropped_total,
            replay_dropped_total,
            auth_failed_total,
            relay_failover_total,
            relay_suspected_nodes,
        })
    }
}
