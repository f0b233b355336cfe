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

//! The relay transport seam.
//!
//! The core never opens sockets; an external client implements this trait.
//! Timeouts live in the client and come back as `NetworkError`.

use crate::channel::upstream::OutboundUpstream;
use crate::core::types::{Chunk, FetchResult};

/// Chunks returned by one fetch, with its health classification.
#[derive(Clone, Debug)]
pub struct FetchOutcome {
    /// Chunks for the requested routing fingerprint (empty on failure).
    pub chunks: Vec<Chunk>,
    /// How the fetch went, for relay-health accounting.
    pub result: FetchResult,
}

/// External relay transport.
pub trait RelayClient: Send + Sync {
    /// Publish one chunk (fire-and-forget).
    fn announce(&self, chunk: &Chunk, channel_id: &str);

    /// Fetch chunks stored under a routing fingerprint from one node.
    fn fetch(&self, node_url: &str, routing_hash: &str) -> FetchOutcome;

    /// Forward an upstream envelope (with its transport-level ephemeral
    /// agreement public key) toward the channel owner.
    fn send_upstream(&self, node_url: &str, msg: &OutboundUpstream);
}
