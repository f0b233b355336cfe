// Copyright (c) 2026 Zajel
// Licensed under the Apache-2.0 License.

#![forbid(unsafe_code)]

//! Relay control plane: node health, censorship detection, and fallback
//! selection. The relay transport itself is an external collaborator behind
//! the `client::RelayClient` seam.

pub mod censorship;
pub mod client;
pub mod fallback;
pub mod health;

use thiserror::Error;

/// Relay selection errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RelayError {
    /// Every registered node is exhausted for this operation.
    #[error("no relay node available")]
    NodeUnavailable,
}
