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

//! Zajel - peer-to-peer end-to-end-encrypted messaging core.
//!
//! This crate provides:
//! - Broadcast channels: signed manifests, epoch-keyed payload encryption,
//!   hardened chunking/reassembly, and rotating routing fingerprints that
//!   hide channel identity from untrusted relays
//! - An upstream return path (replies, votes, reactions) encrypted to the
//!   channel owner with per-message ephemeral keys
//! - Pairwise sessions over static X25519 keys with nonce and sliding-window
//!   replay protection, expiry, and safety-number verification
//! - Relay health tracking with censorship detection and fallback selection
//! - Sled-backed persistence and Prometheus metrics

/// Broadcast-channel core (manifests, chunking, routing, upstream).
pub mod channel;
/// Core primitives (types, canonical codec, cryptography).
pub mod core;
/// Observability (metrics, structured logging helpers).
pub mod monitoring;
/// Relay control plane (health, censorship detection, fallback).
pub mod relay;
/// Pairwise session core (sessions, replay guards, verification).
pub mod session;
/// Persistence seam and sled implementation.
pub mod storage;
