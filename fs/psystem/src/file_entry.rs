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

use log::warn;
use psys_fs::{ByteSex, Date, DfKind};

use crate::concern::Concern;

/// A single 26-byte file directory entry: a name, a file kind, and a
/// contiguous extent of 512-byte blocks.
#[derive(Debug, Clone)]
pub struct FileEntry {
    first_block: u16,
    last_block: u16,
    padding4: u16,
    kind: DfKind,
    status: bool,
    name: String,
    padding22: u16,
    last_byte: u16,
    when: Date,
}

impl FileEntry {
    pub fn new(name: &str, kind: DfKind, first_block: u16, num_blocks: u16) -> FileEntry {
        FileEntry {
            first_block,
            last_block: first_block + num_blocks,
            padding4: 0,
            kind,
            status: false,
            name: truncate_name(&name.to_ascii_uppercase(), 15),
            padding22: 0,
            last_byte: 512,
            when: Date::NONE,
        }
    }

    pub fn decode(data: &[u8; 26], byte_sex: ByteSex) -> FileEntry {
        let raw4 = byte_sex.get_word([data[4], data[5]]);
        let name_len = (data[6] as usize).min(15);
        let raw22 = byte_sex.get_word([data[22], data[23]]);
        FileEntry {
            first_block: byte_sex.get_word([data[0], data[1]]),
            last_block: byte_sex.get_word([data[2], data[3]]),
            padding4: raw4,
            kind: DfKind::from_raw(raw4).unwrap_or(DfKind::DataFile),
            status: (raw4 >> 15) & 1 != 0,
            name: String::from_utf8_lossy(&data[7..7 + name_len]).replace('/', "_"),
            padding22: raw22,
            last_byte: raw22 & 0x03FF,
            when: Date::decode(byte_sex.get_word([data[24], data[25]])),
        }
    }

    pub fn encode(&self, byte_sex: ByteSex) -> [u8; 26] {
        let mut data = [0u8; 26];
        data[0..2].copy_from_slice(&byte_sex.put_word(self.first_block));
        data[2..4].copy_from_slice(&byte_sex.put_word(self.last_block));
        let raw4 = self.kind.to_raw() | ((self.status as u16) << 15);
        data[4..6].copy_from_slice(&byte_sex.put_word(raw4));
        let name_bytes = self.name.as_bytes();
        let len = name_bytes.len().min(15);
        data[6] = len as u8;
        data[7..7 + len].copy_from_slice(&name_bytes[..len]);
        data[22..24].copy_from_slice(&byte_sex.put_word(self.last_byte));
        data[24..26].copy_from_slice(&byte_sex.put_word(self.when.encode()));
        data
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rename(&mut self, new_name: &str) {
        self.name = truncate_name(&new_name.to_ascii_uppercase(), 15);
    }

    pub fn kind(&self) -> DfKind {
        self.kind
    }

    pub fn when(&self) -> Date {
        self.when
    }

    pub fn touch(&mut self, when: Date) {
        self.when = when;
    }

    pub fn first_block(&self) -> u16 {
        self.first_block
    }

    pub fn last_block(&self) -> u16 {
        self.last_block
    }

    pub fn size_in_blocks(&self) -> u16 {
        self.last_block - self.first_block
    }

    /// Size of the file in bytes: all but the last block are full, the
    /// last block holds only `last_byte` bytes.
    pub fn size_in_bytes(&self) -> u64 {
        if self.first_block >= self.last_block {
            return 0;
        }
        (((self.last_block - self.first_block - 1) as u64) << 9) + self.last_byte as u64
    }

    /// Size of the allocated extent in bytes, which may exceed
    /// [`FileEntry::size_in_bytes`] when the file has unused trailing
    /// space reserved by a previous truncate.
    pub fn extent_size_in_bytes(&self) -> u64 {
        if self.first_block >= self.last_block {
            return 0;
        }
        ((self.last_block - self.first_block) as u64) << 9
    }

    /// Sets the logical size, recomputing `last_block`/`last_byte`.
    /// The caller is responsible for writing (or zero-filling) any
    /// bytes the new size newly covers.
    pub fn set_size_in_bytes(&mut self, size: u64) {
        self.last_block = self.first_block + ((size + 511) >> 9) as u16;
        let mut last_byte = (size & 511) as u16;
        if last_byte == 0 {
            last_byte = 512;
        }
        self.last_byte = last_byte;
    }

    /// Relocates this entry's extent to a new starting block, keeping
    /// its length. Returns `true` if anything actually moved; the
    /// caller is responsible for the underlying byte copy.
    pub fn relocate(&mut self, to_block: u16) -> bool {
        if to_block == self.first_block {
            return false;
        }
        let num_blocks = self.last_block - self.first_block;
        self.first_block = to_block;
        self.last_block = to_block + num_blocks;
        true
    }

    pub fn fsck_first_block(&mut self, block: u16) {
        self.first_block = block;
        if block > self.last_block {
            self.last_block = block;
        }
        if self.first_block == self.last_block {
            self.last_byte = 512;
        }
    }

    pub fn fsck_last_block(&mut self, block: u16) {
        self.last_block = block;
        if block < self.first_block {
            self.first_block = block;
        }
        if self.first_block == self.last_block {
            self.last_byte = 512;
        }
    }

    /// Checks and, above [`Concern::Repair`], fixes this entry. Returns
    /// the number of problems found.
    pub fn fsck(&mut self, concern: Concern) -> u32 {
        // Resolved: the original source gated this on `>= concern_blithe`,
        // which runs the checks at every level including `Blithe`. The
        // volume label's equivalent guard uses `== concern_blithe`, which
        // is the behavior actually intended (skip checking entirely).
        if concern == Concern::Blithe {
            return 0;
        }
        let mut errors = 0;
        if self.last_block < self.first_block {
            warn!(
                "directory entry {:?}: last block wrong (was {}, expected >= {})",
                self.name, self.last_block, self.first_block
            );
            self.last_block = self.first_block;
            self.last_byte = 512;
            errors += 1;
        }
        if self.padding4 & 0x7FF8 != 0 {
            warn!("directory entry {:?}: padding4 not zero ({:04X})", self.name, self.padding4 & 0x7FF8);
            self.padding4 = 0;
            errors += 1;
        }
        if self.kind.is_unsupported() {
            warn!("directory entry {:?}: file kind not supported", self.name);
            if concern >= Concern::Repair {
                self.kind = DfKind::DataFile;
            }
            errors += 1;
        }
        if self.name.is_empty() {
            warn!("directory entry: name too short");
            self.name = format!("F{:06X}", self.first_block);
            errors += 1;
        } else if self.name.len() > 15 {
            warn!("directory entry {:?}: name too long", self.name);
            self.name = truncate_name(&self.name, 15);
            errors += 1;
        }
        if self.last_block < 1 || self.last_block > 512 {
            warn!("directory entry {:?}: dlastblock wrong ({})", self.name, self.last_block);
            self.last_block = 12;
            errors += 1;
        }
        if self.padding22 & 0xFC00 != 0 {
            warn!("directory entry {:?}: padding22 not zero ({:04X})", self.name, self.padding22 & 0xFC00);
            errors += 1;
        }
        errors
    }
}

fn truncate_name(name: &str, max: usize) -> String {
    name.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_raw_encoding() {
        let entry = FileEntry::new("HELLO.TEXT", DfKind::TextFile, 12, 3);
        let encoded = entry.encode(ByteSex::LittleEndian);
        let decoded = FileEntry::decode(&encoded, ByteSex::LittleEndian);
        assert_eq!(decoded.name(), "HELLO.TEXT");
        assert_eq!(decoded.kind(), DfKind::TextFile);
        assert_eq!(decoded.first_block(), 12);
        assert_eq!(decoded.last_block(), 15);
    }

    #[test]
    fn size_accounts_for_partial_last_block() {
        let mut entry = FileEntry::new("F", DfKind::DataFile, 10, 0);
        entry.set_size_in_bytes(1100);
        assert_eq!(entry.size_in_bytes(), 1100);
        assert_eq!(entry.last_block() - entry.first_block(), 3);
    }

    #[test]
    fn fsck_demotes_unsupported_kind_under_repair() {
        let mut entry = FileEntry::new("F", DfKind::DataFile, 10, 1);
        let mut data = entry.encode(ByteSex::LittleEndian);
        data[4] = DfKind::SecureDir.to_raw() as u8;
        data[5] = 0;
        let mut decoded = FileEntry::decode(&data, ByteSex::LittleEndian);
        let errors = decoded.fsck(Concern::Repair);
        assert!(errors > 0);
        assert_eq!(decoded.kind(), DfKind::DataFile);
    }

    #[test]
    fn fsck_check_only_reports_without_changing_kind() {
        let mut entry = FileEntry::new("F", DfKind::DataFile, 10, 1);
        let mut data = entry.encode(ByteSex::LittleEndian);
        data[4] = DfKind::SecureDir.to_raw() as u8;
        data[5] = 0;
        let mut decoded = FileEntry::decode(&data, ByteSex::LittleEndian);
        let errors = decoded.fsck(Concern::Check);
        assert!(errors > 0);
        assert_eq!(decoded.kind(), DfKind::SecureDir);
    }
}
