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

//! Generate a channel owner identity: signing seed, agreement secret, and
//! the derived channel id.

use anyhow::Result;
use std::path::PathBuf;

use zajel::core::crypto::{fingerprint, keys};

fn write_secret(path: &PathBuf, bytes: &[u8]) -> Result<()> {
    std::fs::write(path, bytes)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let _ = std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600));
    }
    Ok(())
}

fn main() -> Result<()> {
    let out_dir = std::env::args().nth(1).unwrap_or_else(|| "data".to_string());
    let dir = PathBuf::from(out_dir);
    std::fs::create_dir_all(&dir)?;

    let signing = keys::generate_signing_keypair()?;
    let agreement = keys::generate_agreement_keypair();

    write_secret(&dir.join("owner_signing.key"), signing.secret.as_bytes())?;
    write_secret(&dir.join("channel_agreement.key"), agreement.secret.as_bytes())?;

    println!("channel_id: {}", keys::derive_channel_id(&signing.public));
    println!("owner_key: {}", zajel::core::types::b64_encode(&signing.public));
    println!(
        "encrypt_key: {}",
        zajel::core::types::b64_encode(&agreement.public)
    );
    println!(
        "fingerprint: {}",
        fingerprint::public_key_fingerprint(&signing.public)?
    );
    Ok(())
}
