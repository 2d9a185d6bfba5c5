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
use psys_fs::{ByteSex, Date};

use crate::concern::Concern;

/// The 26-byte volume label: the first directory entry, describing the
/// volume itself rather than a file on it.
#[derive(Debug, Clone)]
pub struct VolumeLabel {
    first_block: u16,
    last_block: u16,
    padding4: u16,
    name: String,
    eov_block: u16,
    num_files: u16,
    load_time: u16,
    when: Date,
    padding22: u16,
    padding24: u16,
    max_dir_ents: usize,
}

impl VolumeLabel {
    /// Builds a brand new volume label for `mkfs`, with `last_block`
    /// set to 10 when `twin` requests a redundant copy of the
    /// directory, 6 otherwise.
    pub fn new(name: &str, eov_block: u16, twin: bool) -> VolumeLabel {
        let mut label = VolumeLabel {
            first_block: 0,
            last_block: if twin { 10 } else { 6 },
            padding4: 0,
            name: truncate_name(name, 7),
            eov_block,
            num_files: 0,
            load_time: 0,
            when: Date::NONE,
            padding22: 0,
            padding24: 0,
            max_dir_ents: 0,
        };
        label.calc_max_dir_ents();
        label
    }

    pub fn decode(data: &[u8; 26], byte_sex: ByteSex) -> VolumeLabel {
        let name_len = (data[6] as usize).min(7);
        let mut label = VolumeLabel {
            first_block: byte_sex.get_word([data[0], data[1]]),
            last_block: byte_sex.get_word([data[2], data[3]]),
            padding4: byte_sex.get_word([data[4], data[5]]),
            name: String::from_utf8_lossy(&data[7..7 + name_len]).replace('/', "_"),
            eov_block: byte_sex.get_word([data[14], data[15]]),
            num_files: byte_sex.get_word([data[16], data[17]]),
            load_time: byte_sex.get_word([data[18], data[19]]),
            when: Date::decode(byte_sex.get_word([data[20], data[21]])),
            padding22: byte_sex.get_word([data[22], data[23]]),
            padding24: byte_sex.get_word([data[24], data[25]]),
            max_dir_ents: 0,
        };
        label.calc_max_dir_ents();
        label
    }

    pub fn encode(&self, byte_sex: ByteSex) -> [u8; 26] {
        let mut data = [0u8; 26];
        data[0..2].copy_from_slice(&byte_sex.put_word(self.first_block));
        data[2..4].copy_from_slice(&byte_sex.put_word(self.last_block));
        data[4..6].copy_from_slice(&byte_sex.put_word(self.padding4));
        let name_bytes = self.name.as_bytes();
        let len = name_bytes.len().min(7);
        data[6] = len as u8;
        data[7..7 + len].copy_from_slice(&name_bytes[..len]);
        data[14..16].copy_from_slice(&byte_sex.put_word(self.eov_block));
        data[16..18].copy_from_slice(&byte_sex.put_word(self.num_files));
        data[18..20].copy_from_slice(&byte_sex.put_word(self.load_time));
        data[20..22].copy_from_slice(&byte_sex.put_word(self.when.encode()));
        data[22..24].copy_from_slice(&byte_sex.put_word(self.padding22));
        data[24..26].copy_from_slice(&byte_sex.put_word(self.padding24));
        data
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn first_block(&self) -> u16 {
        self.first_block
    }

    pub fn last_block(&self) -> u16 {
        self.last_block
    }

    pub fn eov_block(&self) -> u16 {
        self.eov_block
    }

    pub fn size_in_blocks(&self) -> u16 {
        self.last_block - self.first_block
    }

    pub fn num_files(&self) -> usize {
        self.num_files as usize
    }

    pub fn set_num_files(&mut self, n: usize) {
        debug_assert!(n <= self.max_dir_ents);
        self.num_files = n as u16;
    }

    pub fn maximum_directory_entries(&self) -> usize {
        self.max_dir_ents
    }

    pub fn update_timestamp(&mut self, when: Date) {
        self.when = when;
    }

    pub fn when(&self) -> Date {
        self.when
    }

    /// Relocates the directory itself to a new starting block,
    /// returning `true` if anything actually moved.
    pub fn relocate(&mut self, to_block: u16) -> bool {
        if to_block == self.first_block {
            return false;
        }
        let num_blocks = self.last_block - self.first_block;
        self.first_block = to_block;
        self.last_block = to_block + num_blocks;
        true
    }

    /// Checks and, above [`Concern::Repair`], fixes the volume label.
    /// Returns the number of problems found.
    pub fn fsck(&mut self, concern: Concern) -> u32 {
        if concern == Concern::Blithe {
            return 0;
        }
        let mut errors = 0;
        if self.first_block != 0 {
            warn!("volume label: first block not zero ({})", self.first_block);
            if concern >= Concern::Repair {
                self.first_block = 0;
            }
            errors += 1;
        }
        if self.last_block != 6 && self.last_block != 10 {
            warn!("volume label: last block not six ({})", self.last_block);
            if concern >= Concern::Repair {
                self.last_block = 6;
            }
            errors += 1;
        }
        if self.padding4 != 0 {
            warn!("volume label: padding4 not zero ({:04X})", self.padding4);
            if concern >= Concern::Repair {
                self.padding4 = 0;
            }
            errors += 1;
        }
        if self.name.is_empty() {
            warn!("volume label: name too short");
            self.name = "NO-NAME".to_string();
            errors += 1;
        } else if self.name.len() > 7 {
            warn!("volume label: name too long");
            self.name = truncate_name(&self.name, 7);
            errors += 1;
        }
        self.calc_max_dir_ents();
        errors
    }

    /// Recomputes the maximum number of directory entries from the
    /// current first/last block span; the `-1` reserves room for the
    /// volume label's own slot.
    fn calc_max_dir_ents(&mut self) {
        let num_blocks = self.last_block as i32 - self.first_block as i32 - 2;
        if num_blocks <= 0 {
            self.max_dir_ents = 0;
            return;
        }
        let available_bytes = (num_blocks as usize) << 9;
        self.max_dir_ents = (available_bytes / 26).saturating_sub(1);
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
        let label = VolumeLabel::new("MYDISK", 280, false);
        let encoded = label.encode(ByteSex::LittleEndian);
        let decoded = VolumeLabel::decode(&encoded, ByteSex::LittleEndian);
        assert_eq!(decoded.name(), "MYDISK");
        assert_eq!(decoded.last_block(), 6);
        assert_eq!(decoded.eov_block(), 280);
    }

    #[test]
    fn twin_volume_uses_block_ten() {
        let label = VolumeLabel::new("TWIN", 400, true);
        assert_eq!(label.last_block(), 10);
    }

    #[test]
    fn fsck_repairs_bad_last_block() {
        let mut label = VolumeLabel::new("OK", 280, false);
        let mut data = label.encode(ByteSex::LittleEndian);
        data[2] = 99;
        data[3] = 0;
        let mut decoded = VolumeLabel::decode(&data, ByteSex::LittleEndian);
        let errors = decoded.fsck(Concern::Repair);
        assert!(errors > 0);
        assert_eq!(decoded.last_block(), 6);
    }

    #[test]
    fn blithe_concern_skips_all_checks() {
        let mut label = VolumeLabel::new("OK", 280, false);
        let mut data = label.encode(ByteSex::LittleEndian);
        data[2] = 99;
        let mut decoded = VolumeLabel::decode(&data, ByteSex::LittleEndian);
        assert_eq!(decoded.fsck(Concern::Blithe), 0);
    }
}
