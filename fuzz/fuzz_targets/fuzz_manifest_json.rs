// Copyright (c) 2026 Zajel
// Licensed under the Apache-2.0 License.

#![no_main]
#![forbid(unsafe_code)]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Manifest JSON arrives from untrusted transports; parsing and
    // verification must never panic.
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(manifest) = zajel::core::types::from_json::<zajel::core::types::Manifest>(s) {
            let _ = zajel::channel::manifest::verify_manifest(&manifest);
        }
    }
});
