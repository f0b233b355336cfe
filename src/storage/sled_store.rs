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

//! Persistent channel/chunk store using sled.
//!
//! Key layout:
//! - `channel/<id>` -> canonical `ChannelRecord`
//! - `chunk/<id>/<seq be64>/<index be32>` -> canonical `Chunk`
//!
//! Big-endian sequence bytes make `scan_prefix` iterate in sequence order,
//! so the latest sequence is the last key under a channel's chunk prefix.

use crate::core::types::{
    decode_canonical_limited, encode_canonical, ChannelRecord, Chunk,
};
use crate::storage::{ChannelStore, StoreError};

// Decode caps: a record is small; a chunk payload is capped at 128 KiB plus
// framing.
const MAX_RECORD_BYTES: usize = 1 << 20;
const MAX_CHUNK_BYTES: usize = (128 << 10) + 4096;

/// Sled-backed store.
#[derive(Clone)]
pub struct SledStore {
    db: sled::Db,
}

fn channel_key(id: &str) -> Vec<u8> {
    let mut k = Vec::with_capacity(8 + id.len());
    k.extend_from_slice(b"channel/");
    k.extend_from_slice(id.as_bytes());
    k
}

fn chunk_prefix(channel_id: &str) -> Vec<u8> {
    let mut k = Vec::with_capacity(6 + channel_id.len() + 1);
    k.extend_from_slice(b"chunk/");
    k.extend_from_slice(channel_id.as_bytes());
    k.push(b'/');
    k
}

fn chunk_key(channel_id: &str, sequence: u64, index: u32) -> Vec<u8> {
    let mut k = chunk_prefix(channel_id);
    k.extend_from_slice(&sequence.to_be_bytes());
    k.push(b'/');
    k.extend_from_slice(&index.to_be_bytes());
    k
}

impl SledStore {
    /// Open (or create) the store at `path`.
    pub fn open(path: &str) -> Result<Self, StoreError> {
        let db = sled::open(path).map_err(|_| StoreError::DbOpen)?;
        Ok(Self { db })
    }

    /// In-memory store for tests.
    pub fn open_temporary() -> Result<Self, StoreError> {
        let db = sled::Config::new()
            .temporary(true)
            .open()
            .map_err(|_| StoreError::DbOpen)?;
        Ok(Self { db })
    }
}

impl ChannelStore for SledStore {
    fn save_channel(&self, record: &ChannelRecord) -> Result<(), StoreError> {
        let bytes = encode_canonical(record).map_err(|_| StoreError::Codec)?;
        self.db
            .insert(channel_key(&record.id), bytes)
            .map_err(|_| StoreError::DbIo)?;
        Ok(())
    }

    fn get_channel(&self, id: &str) -> Result<Option<ChannelRecord>, StoreError> {
        let Some(bytes) = self.db.get(channel_key(id)).map_err(|_| StoreError::DbIo)? else {
            return Ok(None);
        };
        let record =
            decode_canonical_limited(&bytes, MAX_RECORD_BYTES).map_err(|_| StoreError::Codec)?;
        Ok(Some(record))
    }

    fn get_all_channels(&self) -> Result<Vec<ChannelRecord>, StoreError> {
        let mut out = Vec::new();
        for item in self.db.scan_prefix(b"channel/") {
            let (_, bytes) = item.map_err(|_| StoreError::DbIo)?;
            let record = decode_canonical_limited(&bytes, MAX_RECORD_BYTES)
                .map_err(|_| StoreError::Codec)?;
            out.push(record);
        }
        Ok(out)
    }

    fn delete_channel(&self, id: &str) -> Result<(), StoreError> {
        self.db
            .remove(channel_key(id))
            .map_err(|_| StoreError::DbIo)?;
        // Chunks go with the channel.
        let mut stale = Vec::new();
        for item in self.db.scan_prefix(chunk_prefix(id)) {
            let (key, _) = item.map_err(|_| StoreError::DbIo)?;
            stale.push(key);
        }
        for key in stale {
            self.db.remove(key).map_err(|_| StoreError::DbIo)?;
        }
        Ok(())
    }

    fn save_chunk(&self, channel_id: &str, chunk: &Chunk) -> Result<(), StoreError> {
        let bytes = encode_canonical(chunk).map_err(|_| StoreError::Codec)?;
        self.db
            .insert(
                chunk_key(channel_id, chunk.sequence, chunk.chunk_index),
                bytes,
            )
            .map_err(|_| StoreError::DbIo)?;
        Ok(())
    }

    fn get_chunks_by_sequence(
        &self,
        channel_id: &str,
        sequence: u64,
    ) -> Result<Vec<Chunk>, StoreError> {
        let mut prefix = chunk_prefix(channel_id);
        prefix.extend_from_slice(&sequence.to_be_bytes());
        prefix.push(b'/');

        let mut out = Vec::new();
        for item in self.db.scan_prefix(prefix) {
            let (_, bytes) = item.map_err(|_| StoreError::DbIo)?;
            let chunk = decode_canonical_limited(&bytes, MAX_CHUNK_BYTES)
                .map_err(|_| StoreError::Codec)?;
            out.push(chunk);
        }
        Ok(out)
    }

    fn get_latest_sequence(&self, channel_id: &str) -> Result<u64, StoreError> {
        let prefix = chunk_prefix(channel_id);
        let Some(item) = self.db.scan_prefix(&prefix).last() else {
            return Ok(0);
        };
        let (key, _) = item.map_err(|_| StoreError::DbIo)?;
        let seq_bytes = key
            .get(prefix.len()..prefix.len() + 8)
            .ok_or(StoreError::Codec)?;
        let mut buf = [0u8; 8];
        buf.copy_from_slice(seq_bytes);
        Ok(u64::from_be_bytes(buf))
    }
}
