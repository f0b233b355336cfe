// Copyright (c) 2026 Zajel
// Licensed under the Apache License, Version 2.0

#![forbid(unsafe_code)]

//! Relay health, censorship classification, and failover scenarios.

use zajel::core::types::FetchResult;
use zajel::relay::censorship::{detect, CensorshipVerdict};
use zajel::relay::fallback::{RelaySelector, UNHEALTHY_COOLDOWN_MS};
use zajel::relay::health::RelayHealth;
use zajel::relay::RelayError;

const N1: &str = "https://relay-1.example";
const N2: &str = "https://relay-2.example";

#[test]
fn healthy_node_blocking_one_hash_is_targeted_censorship() {
    let mut health = RelayHealth::new();

    // N1 blocks routing hash `h` three times...
    for t in 0..3 {
        health.record(Some("h"), N1, FetchResult::Blocked, t);
    }
    // ...while serving many other fingerprints (overall rate ~0.9).
    for t in 0..27 {
        health.record(Some("other"), N1, FetchResult::Success, 100 + t);
    }
    // N2 serves `h` fine.
    health.record(Some("h"), N2, FetchResult::Success, 1);
    health.record(Some("h"), N2, FetchResult::Success, 2);

    assert_eq!(
        detect(&health, "h"),
        CensorshipVerdict::RoutingHashBlocked {
            nodes: vec![N1.to_string()]
        }
    );
}

#[test]
fn three_failures_suspect_the_active_node_and_fail_over() {
    let mut health = RelayHealth::new();
    health.register_node(N1);
    health.register_node(N2);

    let mut selector = RelaySelector::new();
    selector.set_active(N1);

    // First failure already moves the active node off N1 (N2 is healthy).
    let switched =
        selector.on_fetch_result(&mut health, N1, Some("h"), FetchResult::NetworkError, 1_000);
    assert_eq!(switched.as_deref(), Some(N2));

    // Two more recent failures push N1 over the threshold.
    selector.on_fetch_result(&mut health, N1, Some("h"), FetchResult::NetworkError, 2_000);
    selector.on_fetch_result(&mut health, N1, Some("h"), FetchResult::NetworkError, 3_000);
    assert!(health.node(N1).unwrap().suspected_blocking);

    // Fallback away from N1 prefers N2: no block history for `h`.
    let pick = selector
        .fallback_to_alternative(&mut health, N1, Some("h"), 4_000)
        .unwrap();
    assert_eq!(pick, N2);
}

#[test]
fn cooldown_retry_readopts_the_last_node_standing() {
    let mut health = RelayHealth::new();
    health.register_node(N1);

    let selector = RelaySelector::new();
    health.record(None, N1, FetchResult::NetworkError, 10_000);
    health.mark_suspected(N1);

    // Within the cooldown there is nothing to fall back to.
    assert_eq!(
        selector.fallback_to_alternative(&mut health, N1, None, 20_000),
        Err(RelayError::NodeUnavailable)
    );

    // After the cooldown the node is un-suspected and re-adopted.
    let later = 10_000 + UNHEALTHY_COOLDOWN_MS;
    assert_eq!(
        selector.fallback_to_alternative(&mut health, N1, None, later),
        Ok(N1.to_string())
    );
    assert!(!health.node(N1).unwrap().suspected_blocking);
}

#[test]
fn success_recovers_a_suspected_node() {
    let mut health = RelayHealth::new();
    for t in 0..3 {
        health.record(Some("h"), N1, FetchResult::Blocked, t);
    }
    assert!(health.node(N1).unwrap().suspected_blocking);

    health.record(Some("h2"), N1, FetchResult::Success, 100);
    assert!(!health.node(N1).unwrap().suspected_blocking);

    let selector = RelaySelector::new();
    assert_eq!(selector.best_node(&health), Some(N1.to_string()));
}

#[test]
fn epoch_boundary_clears_history_but_detection_needs_data() {
    let mut health = RelayHealth::new();
    for t in 0..3 {
        health.record(Some("h"), N1, FetchResult::Blocked, t);
    }
    for t in 0..20 {
        health.record(Some("other"), N1, FetchResult::Success, 10 + t);
    }
    assert_ne!(detect(&health, "h"), CensorshipVerdict::None);

    health.clear_history();
    assert_eq!(detect(&health, "h"), CensorshipVerdict::None);
}
