// Copyright (c) 2026 Zajel
// Licensed under the Apache License, Version 2.0

#![forbid(unsafe_code)]

//! Pairwise session scenarios: replay rejection, expiry, verification.

use zajel::core::crypto::keys::generate_agreement_keypair;
use zajel::core::types::b64_encode;
use zajel::session::pairwise::{SessionManager, SESSION_EXPIRY_MS};
use zajel::session::{verify, ReplayCause, SessionError};

fn established_pair() -> (SessionManager, SessionManager) {
    let mut alice = SessionManager::new(generate_agreement_keypair());
    let mut bob = SessionManager::new(generate_agreement_keypair());
    alice
        .establish_session("pair", &bob.own_public_b64(), 0)
        .unwrap();
    bob.establish_session("pair", &alice.own_public_b64(), 0)
        .unwrap();
    (alice, bob)
}

#[test]
fn second_decrypt_of_the_same_ciphertext_is_a_replay() {
    let (mut alice, mut bob) = established_pair();

    let c = alice.encrypt("pair", b"m", 1).unwrap();
    assert_eq!(bob.decrypt("pair", &c, 2).unwrap(), b"m");
    assert_eq!(
        bob.decrypt("pair", &c, 3).unwrap_err(),
        SessionError::Replay(ReplayCause::DuplicateNonce)
    );
}

#[test]
fn fresh_nonces_mean_distinct_ciphertexts() {
    let (mut alice, mut bob) = established_pair();
    let c1 = alice.encrypt("pair", b"m", 1).unwrap();
    let c2 = alice.encrypt("pair", b"m", 1).unwrap();
    assert_ne!(c1, c2);
    assert_eq!(bob.decrypt("pair", &c1, 2).unwrap(), b"m");
    assert_eq!(bob.decrypt("pair", &c2, 2).unwrap(), b"m");
}

#[test]
fn session_expiry_cuts_off_traffic() {
    let (mut alice, mut bob) = established_pair();
    let c = alice.encrypt("pair", b"m", 1).unwrap();

    let late = SESSION_EXPIRY_MS + 1;
    assert_eq!(
        alice.encrypt("pair", b"m", late).unwrap_err(),
        SessionError::Expired
    );
    assert_eq!(
        bob.decrypt("pair", &c, late).unwrap_err(),
        SessionError::Expired
    );

    // Re-establishing resets the clock and the replay state.
    let bob_pub = bob.own_public_b64();
    alice.establish_session("pair", &bob_pub, late).unwrap();
    assert!(alice.encrypt("pair", b"m", late + 1).is_ok());
}

#[test]
fn sliding_window_accepts_jumps_and_rejects_stale() {
    let (mut alice, mut bob) = established_pair();

    // Burn sequences 1..=70 on the sender side; deliver only some.
    let mut frames = Vec::new();
    for _ in 0..70 {
        frames.push(alice.encrypt_sequenced("pair", b"x", 1).unwrap());
    }
    // Deliver seq 70 first: the window jumps forward.
    assert!(bob.decrypt_sequenced("pair", &frames[69], 2).is_ok());
    // Seq 69 is still inside the 64-wide window.
    assert!(bob.decrypt_sequenced("pair", &frames[68], 2).is_ok());
    // Seq 1 fell out of the window long ago.
    assert_eq!(
        bob.decrypt_sequenced("pair", &frames[0], 2).unwrap_err(),
        SessionError::Replay(ReplayCause::StaleSequence)
    );
}

#[test]
fn safety_numbers_and_fingerprints_line_up() {
    let (alice, bob) = established_pair();

    let ours = verify::safety_number_with(&alice, &bob.own_public_b64()).unwrap();
    let theirs = verify::safety_number_with(&bob, &alice.own_public_b64()).unwrap();
    assert!(verify::safety_numbers_match(&ours, &theirs));
    assert_eq!(ours.len(), 60);

    let display = verify::display_safety_number(&ours);
    assert_eq!(display.lines().count(), 4);

    let own = verify::own_fingerprint(&alice).unwrap();
    let seen_by_bob = verify::peer_fingerprint(&alice.own_public_b64()).unwrap();
    assert_eq!(own, seen_by_bob);
}

#[test]
fn swapped_data_path_key_is_detected() {
    let (alice, bob) = established_pair();

    assert!(alice.verify_peer_key("pair", &bob.own_public_b64()));
    // A MITM presenting its own key over the data channel does not match the
    // key pinned at signaling time.
    let mitm = generate_agreement_keypair();
    assert!(!alice.verify_peer_key("pair", &b64_encode(&mitm.public)));
}
