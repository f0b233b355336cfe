// Copyright (c) 2026 Zajel
// Licensed under the Apache-2.0 License.

#![no_main]
#![forbid(unsafe_code)]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Invite links are pasted by users; decoding must never panic.
    if let Ok(s) = std::str::from_utf8(data) {
        let _ = zajel::channel::link::decode_link(s);
    }
});
