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

pub mod guess;
pub mod imd;
pub mod sector_io;
pub mod td0;

use std::rc::Rc;

use psys_ds::{DataStorage, Error, Result};

/// A read-only backing store over an in-memory byte buffer, used to
/// present a decoded `TD0`/`IMD` image as an ordinary [`DataStorage`]
/// for the rest of the sector-I/O stack and the volume engine.
pub struct FlatImage {
    bytes: Vec<u8>,
}

impl FlatImage {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// Decodes a compressed container, sniffing the format from its
    /// magic bytes.
    pub fn from_compressed(input: &[u8]) -> Result<Self> {
        if input.starts_with(b"IMD ") {
            Ok(Self::new(imd::decode(input)?))
        } else if input.starts_with(b"TD") || input.starts_with(b"td") {
            Ok(Self::new(td0::decode(input)?))
        } else {
            Err(Error::MalformedImage("unrecognized compressed image container".into()))
        }
    }
}

impl DataStorage for FlatImage {
    fn read(&self, offset: u64, buffer: &mut [u8]) -> Result<()> {
        let offset = offset as usize;
        let end = offset + buffer.len();
        let slice = self
            .bytes
            .get(offset..end)
            .ok_or(Error::Invalid)?;
        buffer.copy_from_slice(slice);
        Ok(())
    }

    fn write(&self, _offset: u64, _buffer: &[u8]) -> Result<()> {
        Err(Error::ReadOnly)
    }

    fn sync(&self) -> Result<()> {
        Ok(())
    }

    fn size_in_bytes(&self) -> u64 {
        self.bytes.len() as u64
    }

    fn is_read_only(&self) -> bool {
        true
    }
}

/// Composes the full open-time sector-I/O stack for a disk image: runs
/// the interleave guesser over `deeper` to produce a [`DataStorage`]
/// addressed in plain bytes, ready for the volume engine.
pub fn open_stack(deeper: Rc<dyn DataStorage>) -> Result<Rc<dyn DataStorage>> {
    guess::guess_interleaving(deeper)
}
