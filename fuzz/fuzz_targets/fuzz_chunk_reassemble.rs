// Copyright (c) 2026 Zajel
// Licensed under the Apache-2.0 License.

#![no_main]
#![forbid(unsafe_code)]

use libfuzzer_sys::fuzz_target;

use zajel::channel::chunker::{verify_and_reassemble, ChunkerLimits};
use zajel::core::types::{decode_canonical_limited, Chunk};

fuzz_target!(|data: &[u8]| {
    // Chunk sets come off the relay wire; structural validation must reject
    // anything malformed without panicking.
    if let Ok(chunks) = decode_canonical_limited::<Vec<Chunk>>(data, 1 << 20) {
        let authorised = vec!["AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA=".to_string()];
        let _ = verify_and_reassemble(&chunks, &authorised, ChunkerLimits::default());
    }
});
