// Copyright (c) 2026 Zajel
// Licensed under the Apache-2.0 License.

#![forbid(unsafe_code)]

//! Channel/chunk persistence seam and its sled-backed implementation.

pub mod sled_store;

use thiserror::Error;

use crate::core::types::{ChannelRecord, Chunk};

/// Storage errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("db open")]
    DbOpen,
    #[error("db io")]
    DbIo,
    /// Stored bytes failed to decode.
    #[error("codec")]
    Codec,
}

/// Narrow persistence interface the cores consume. Channel records own the
/// secret material; implementations must not copy it elsewhere.
pub trait ChannelStore {
    /// Insert or replace a channel record.
    fn save_channel(&self, record: &ChannelRecord) -> Result<(), StoreError>;
    /// Fetch one channel.
    fn get_channel(&self, id: &str) -> Result<Option<ChannelRecord>, StoreError>;
    /// All stored channels.
    fn get_all_channels(&self) -> Result<Vec<ChannelRecord>, StoreError>;
    /// Remove a channel and its chunks.
    fn delete_channel(&self, id: &str) -> Result<(), StoreError>;

    /// Persist one chunk for a channel.
    fn save_chunk(&self, channel_id: &str, chunk: &Chunk) -> Result<(), StoreError>;
    /// All chunks stored for one message sequence, in index order.
    fn get_chunks_by_sequence(
        &self,
        channel_id: &str,
        sequence: u64,
    ) -> Result<Vec<Chunk>, StoreError>;
    /// Highest stored sequence for a channel; 0 when none. Publishers use
    /// `get_latest_sequence + 1` as the next sequence.
    fn get_latest_sequence(&self, channel_id: &str) -> Result<u64, StoreError>;
}
