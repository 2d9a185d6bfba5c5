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

pub use psys_err::{Error, Result};

/// Largest disk image this crate will open, in kilobytes. Matches the
/// advisory limit the upstream tools impose on raw p-System images.
pub const MAX_DISK_SIZE_KB: u64 = 16380;

/// Byte-addressable read/write access to the medium backing a disk
/// image: a host file, a memory map, or a layer composed on top of one
/// of those (interleave filter, offset shim, compressed-image reader).
pub trait DataStorage {
    /// Reads `buffer.len()` bytes starting at `offset`.
    fn read(&self, offset: u64, buffer: &mut [u8]) -> Result<()>;

    /// Writes `buffer` starting at `offset`.
    fn write(&self, offset: u64, buffer: &[u8]) -> Result<()>;

    /// Writes `len` zero bytes starting at `offset`.
    fn write_zero(&self, offset: u64, len: u64) -> Result<()> {
        let zeros = [0u8; 512];
        let mut remaining = len;
        let mut at = offset;
        while remaining > 0 {
            let chunk = remaining.min(zeros.len() as u64) as usize;
            self.write(at, &zeros[..chunk])?;
            at += chunk as u64;
            remaining -= chunk as u64;
        }
        Ok(())
    }

    /// Flushes any buffered writes to the medium.
    fn sync(&self) -> Result<()>;

    /// Total addressable size of the medium, in bytes.
    fn size_in_bytes(&self) -> u64;

    /// Whether mutating operations are rejected.
    fn is_read_only(&self) -> bool;

    /// Smallest sector-size hint seen so far from a layer above this
    /// one. Layers forward hints downward; the backing store records
    /// the smallest it has been told about. Defaults to 512, the block
    /// size every p-System volume is built from.
    fn sector_size_hint(&self) -> u32 {
        512
    }

    /// Pushes a sector-size hint down from a layer above. `hint` must
    /// be a power of two no greater than 512.
    fn set_sector_size_hint(&self, hint: u32) {
        let _ = hint;
    }

    /// Copies a byte range within this storage, choosing forward or
    /// backward iteration so that overlapping source and destination
    /// ranges do not corrupt each other.
    fn relocate_bytes(&self, to: u64, from: u64, len: u64) -> Result<()> {
        if to == from || len == 0 {
            return Ok(());
        }
        let mut buf = vec![0u8; 4096];
        if to < from {
            let mut done = 0u64;
            while done < len {
                let chunk = (len - done).min(buf.len() as u64) as usize;
                self.read(from + done, &mut buf[..chunk])?;
                self.write(to + done, &buf[..chunk])?;
                done += chunk as u64;
            }
        } else {
            let mut remaining = len;
            while remaining > 0 {
                let chunk = remaining.min(buf.len() as u64) as usize;
                remaining -= chunk as u64;
                self.read(from + remaining, &mut buf[..chunk])?;
                self.write(to + remaining, &buf[..chunk])?;
            }
        }
        Ok(())
    }
}

pub type DataStoragePtr = std::rc::Rc<dyn DataStorage>;
