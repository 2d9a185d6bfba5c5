// Copyright 2024 Kevin Ludwig
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Shared plumbing for the `psys-*` offline utilities: opening an image
//! through the sector-I/O stack, and the `-B`/`--boot` size/path
//! parsing every front-end needs in some form.

use std::path::Path;
use std::rc::Rc;

use psys_ds::{DataStoragePtr, Result};
use psys_ds_std::FileBackingStore;

/// Installs a stderr logger at `info` (or `debug` under `-v`), the
/// level every front-end in this repository runs at by default.
pub fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).try_init();
}

/// Opens a host file and composes the interleave-guessing sector-I/O
/// stack on top of it, ready for [`psys_fs_psystem::Volume::meta_read`].
pub fn open_image<P: AsRef<Path>>(path: P, read_only: bool) -> Result<DataStoragePtr> {
    let backing: DataStoragePtr = Rc::new(FileBackingStore::open(path, read_only)?);
    psys_ds_image::open_stack(backing)
}

/// Parses a `psys-mkfs -B` size argument: a number followed by an
/// optional `b`/`kb`/`mb`/`gb` suffix (case-insensitive), defaulting to
/// kilobytes when no suffix is given.
pub fn parse_size_kb(text: &str) -> std::result::Result<u64, String> {
    let lower = text.to_ascii_lowercase();
    let (digits, multiplier) = if let Some(n) = lower.strip_suffix("gb") {
        (n, 1024 * 1024)
    } else if let Some(n) = lower.strip_suffix("mb") {
        (n, 1024)
    } else if let Some(n) = lower.strip_suffix("kb") {
        (n, 1)
    } else if let Some(n) = lower.strip_suffix('b') {
        (n, 1)
    } else {
        (lower.as_str(), 1)
    };
    let value: u64 = digits.trim().parse().map_err(|_| format!("not a number: {text:?}"))?;
    Ok(value * multiplier)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bare_number_as_kilobytes() {
        assert_eq!(parse_size_kb("140"), Ok(140));
    }

    #[test]
    fn parses_suffixed_sizes() {
        assert_eq!(parse_size_kb("800kb"), Ok(800));
        assert_eq!(parse_size_kb("1mb"), Ok(1024));
        assert_eq!(parse_size_kb("1gb"), Ok(1024 * 1024));
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_size_kb("not-a-size").is_err());
    }
}
