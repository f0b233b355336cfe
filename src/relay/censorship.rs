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

//! Censorship classification.
//!
//! The point of this component is to tell targeted blocking apart from
//! ordinary network failure: a node that blocks one routing fingerprint
//! while serving everything else is evidence of censorship, a node that
//! fails everywhere is just down.

use std::collections::BTreeMap;

use crate::core::types::FetchResult;
use crate::relay::health::RelayHealth;

/// Minimum records per node/fingerprint pair before we classify.
const MIN_RECORDS: usize = 2;
/// Blocked-share threshold above which a node is considered blocking.
const BLOCKED_SHARE: f64 = 0.5;
/// A node must be generally healthy for its blocks to count as targeted.
const MIN_NODE_SUCCESS_RATE: f64 = 0.3;

/// Classification of the observed failures for one routing fingerprint.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CensorshipVerdict {
    /// Nothing suspicious.
    None,
    /// Exactly one healthy node is blocking this fingerprint.
    RoutingHashBlocked {
        /// The blocking node.
        nodes: Vec<String>,
    },
    /// Two or more healthy nodes are blocking this fingerprint.
    WidespreadBlocking {
        /// The blocking nodes.
        nodes: Vec<String>,
    },
    /// Every record is a network error: the nodes are unreachable, not
    /// censoring.
    NodeUnreachable,
}

/// Nodes whose history shows them blocking `routing_hash` while otherwise
/// healthy.
pub fn nodes_blocking(health: &RelayHealth, routing_hash: &str) -> Vec<String> {
    let mut tallies: BTreeMap<&str, (usize, usize)> = BTreeMap::new();
    for (url, result) in health.history_iter(routing_hash) {
        let entry = tallies.entry(url.as_str()).or_insert((0, 0));
        entry.1 += 1;
        if *result == FetchResult::Blocked {
            entry.0 += 1;
        }
    }

    tallies
        .into_iter()
        .filter(|(url, (blocked, total))| {
            *total >= MIN_RECORDS
                && *blocked as f64 / *total as f64 > BLOCKED_SHARE
                && health.success_rate(url) > MIN_NODE_SUCCESS_RATE
        })
        .map(|(url, _)| url.to_string())
        .collect()
}

/// Classify the history for one routing fingerprint.
pub fn detect(health: &RelayHealth, routing_hash: &str) -> CensorshipVerdict {
    let blocking = nodes_blocking(health, routing_hash);
    match blocking.len() {
        0 => {
            let mut records = 0usize;
            let mut all_network_errors = true;
            for (_, result) in health.history_iter(routing_hash) {
                records += 1;
                if *result != FetchResult::NetworkError {
                    all_network_errors = false;
                }
            }
            if records >= MIN_RECORDS && all_network_errors {
                CensorshipVerdict::NodeUnreachable
            } else {
                CensorshipVerdict::None
            }
        }
        1 => CensorshipVerdict::RoutingHashBlocked { nodes: blocking },
        _ => CensorshipVerdict::WidespreadBlocking { nodes: blocking },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn healthy_blocker_is_targeted_censorship() {
        let mut health = RelayHealth::new();
        // N1 blocks h three times but serves many other fingerprints.
        for i in 0..3 {
            health.record(Some("h"), "n1", FetchResult::Blocked, i);
        }
        for i in 0..27 {
            health.record(Some("other"), "n1", FetchResult::Success, 100 + i);
        }
        health.record(Some("h"), "n2", FetchResult::Success, 1);
        health.record(Some("h"), "n2", FetchResult::Success, 2);

        assert_eq!(
            detect(&health, "h"),
            CensorshipVerdict::RoutingHashBlocked {
                nodes: vec!["n1".to_string()]
            }
        );
    }

    #[test]
    fn generally_failing_node_is_not_a_censor() {
        let mut health = RelayHealth::new();
        // n1 blocks h, but n1 fails everywhere: success rate too low.
        for i in 0..3 {
            health.record(Some("h"), "n1", FetchResult::Blocked, i);
        }
        for i in 0..20 {
            health.record(Some("other"), "n1", FetchResult::NetworkError, 100 + i);
        }
        assert_eq!(detect(&health, "h"), CensorshipVerdict::None);
    }

    #[test]
    fn all_network_errors_is_unreachable() {
        let mut health = RelayHealth::new();
        health.record(Some("h"), "n1", FetchResult::NetworkError, 1);
        health.record(Some("h"), "n2", FetchResult::NetworkError, 2);
        assert_eq!(detect(&health, "h"), CensorshipVerdict::NodeUnreachable);
    }

    #[test]
    fn two_blockers_is_widespread() {
        let mut health = RelayHealth::new();
        for url in ["n1", "n2"] {
            health.record(Some("h"), url, FetchResult::Blocked, 1);
            health.record(Some("h"), url, FetchResult::Blocked, 2);
            for i in 0..10 {
                health.record(Some("other"), url, FetchResult::Success, 100 + i);
            }
        }
        assert_eq!(
            detect(&health, "h"),
            CensorshipVerdict::WidespreadBlocking {
                nodes: vec!["n1".to_string(), "n2".to_string()]
            }
        );
    }

    #[test]
    fn single_record_is_inconclusive() {
        let mut health = RelayHealth::new();
        health.record(Some("h"), "n1", FetchResult::Blocked, 1);
        assert_eq!(detect(&health, "h"), CensorshipVerdict::None);
    }
}
