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

use log::debug;
use psys_ds::{DataStoragePtr, Error, Result};
use psys_fs::{ByteSex, Date, DfKind, StatFs};

use crate::concern::Concern;
use crate::file_entry::FileEntry;
use crate::volume_label::VolumeLabel;

/// Byte offset of the primary directory.
const DIRECTORY_OFFSET: u64 = 0x400;
/// Size of the fixed 2048-byte directory buffer (26-byte label plus up
/// to 78 file entries).
const DIRECTORY_BYTES: u64 = 2048;
const ENTRY_SIZE: u64 = 26;
const BLOCK_SIZE: u64 = 512;

fn block_addr(block: u16) -> u64 {
    (block as u64) << 9
}

/// How directory entries should be ordered by [`Volume::print_listing`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortBy {
    Block,
    Size,
    Date,
    Name,
    Kind,
}

/// The volume engine: the single-segment directory (volume label plus
/// a flat list of file entries) and the contiguous-extent invariant
/// that governs every mutation.
pub struct Volume {
    deeper: DataStoragePtr,
    byte_sex: ByteSex,
    volume_label: VolumeLabel,
    files: Vec<FileEntry>,
    text_on_the_fly: bool,
}

impl Volume {
    /// Creates a brand-new, empty little-endian volume on `deeper`,
    /// which must already be sized for the image.
    pub fn mkfs(deeper: DataStoragePtr, name: &str, twin: bool) -> Volume {
        Volume::mkfs_with_byte_sex(deeper, name, twin, ByteSex::LittleEndian)
    }

    /// As [`Volume::mkfs`], but with an explicit byte-sex (for targets
    /// whose native word order is big-endian).
    pub fn mkfs_with_byte_sex(deeper: DataStoragePtr, name: &str, twin: bool, byte_sex: ByteSex) -> Volume {
        let eov_block = (deeper.size_in_bytes() >> 9) as u16;
        let volume_label = VolumeLabel::new(name, eov_block, twin);
        Volume { deeper, byte_sex, volume_label, files: Vec::new(), text_on_the_fly: false }
    }

    /// Reads the volume meta-data (the directory) from the medium.
    /// Returns the number of problems found (and, above
    /// [`Concern::Repair`], fixed).
    pub fn meta_read(deeper: DataStoragePtr, concern: Concern) -> Result<(Volume, u32)> {
        let mut buffer = [0u8; DIRECTORY_BYTES as usize];
        deeper.read(DIRECTORY_OFFSET, &mut buffer)?;

        // The byte-sex is detected from the label's `last_block` field,
        // which should be small (6 or 10): whichever interpretation
        // yields a non-zero high byte is the wrong one.
        let byte_sex = ByteSex::detect(buffer[2]);

        let mut label_bytes = [0u8; 26];
        label_bytes.copy_from_slice(&buffer[0..26]);
        let mut volume_label = VolumeLabel::decode(&label_bytes, byte_sex);
        let mut number_of_errors = volume_label.fsck(concern);

        let max_files = volume_label.num_files();
        let mut files = Vec::with_capacity(max_files);
        let mut offset = 26usize;
        for _ in 0..max_files {
            let mut entry_bytes = [0u8; 26];
            entry_bytes.copy_from_slice(&buffer[offset..offset + 26]);
            if entry_bytes[6] == 0 {
                debug!("directory entry slot empty before expected count");
                volume_label.set_num_files(files.len());
                number_of_errors += 1;
                break;
            }
            let mut entry = FileEntry::decode(&entry_bytes, byte_sex);
            number_of_errors += entry.fsck(concern);
            files.push(entry);
            offset += 26;
        }

        if concern >= Concern::Check && !files.is_empty() {
            let mut out_of_order = false;
            for window in files.windows(2) {
                if window[0].last_block() > window[1].first_block() {
                    out_of_order = true;
                    break;
                }
            }
            if out_of_order {
                number_of_errors += 1;
                files.sort_by_key(|f| f.first_block());
            }

            let mut block_num = volume_label.last_block();
            for file in files.iter_mut() {
                if file.first_block() < block_num {
                    number_of_errors += 1;
                    if concern >= Concern::Repair {
                        file.fsck_first_block(block_num);
                    }
                }
                block_num = file.last_block();
            }

            let eov = volume_label.eov_block();
            for file in files.iter_mut() {
                if file.last_block() > eov {
                    number_of_errors += 1;
                    if concern >= Concern::Repair {
                        file.fsck_last_block(eov);
                    }
                }
            }
        }

        let mut volume = Volume { deeper, byte_sex, volume_label, files, text_on_the_fly: false };
        if concern >= Concern::Repair && number_of_errors > 0 {
            volume.meta_sync()?;
        }
        Ok((volume, number_of_errors))
    }

    pub fn convert_text_on_the_fly(&mut self, enabled: bool) {
        self.text_on_the_fly = enabled;
    }

    pub fn text_on_the_fly(&self) -> bool {
        self.text_on_the_fly
    }

    pub fn volume_name(&self) -> &str {
        self.volume_label.name()
    }

    /// Writes the directory (volume label plus every file entry) back
    /// to the medium, duplicating it at the twin offset when the
    /// volume has one.
    pub fn meta_sync(&mut self) -> Result<()> {
        if self.deeper.is_read_only() {
            return Err(Error::ReadOnly);
        }
        let mut buffer = [0u8; DIRECTORY_BYTES as usize];
        self.volume_label.set_num_files(self.files.len());
        buffer[0..26].copy_from_slice(&self.volume_label.encode(self.byte_sex));
        let mut offset = 26usize;
        for file in &self.files {
            buffer[offset..offset + 26].copy_from_slice(&file.encode(self.byte_sex));
            offset += 26;
        }
        self.deeper.write(DIRECTORY_OFFSET, &buffer)?;
        if self.volume_label.last_block() == 10 {
            self.deeper.write(DIRECTORY_OFFSET + DIRECTORY_BYTES, &buffer)?;
        }
        self.deeper.sync()
    }

    /// Looks up a file by name; `"/"` refers to the volume itself and
    /// has no file index.
    pub fn find(&self, name: &str) -> Option<usize> {
        let name = name.strip_prefix('/').unwrap_or(name);
        self.files.iter().position(|f| f.name().eq_ignore_ascii_case(name))
    }

    pub fn nth(&self, n: usize) -> Option<&FileEntry> {
        self.files.get(n)
    }

    pub fn file(&self, index: usize) -> Option<&FileEntry> {
        self.files.get(index)
    }

    pub fn touch_file(&mut self, index: usize, when: Date) -> Result<()> {
        if self.deeper.is_read_only() {
            return Err(Error::ReadOnly);
        }
        let entry = self.files.get_mut(index).ok_or(Error::NotFound)?;
        entry.touch(when);
        self.meta_sync()
    }

    pub fn file_names(&self) -> Vec<String> {
        self.files.iter().map(|f| f.name().to_string()).collect()
    }

    pub fn has_room_for_new_file(&self) -> bool {
        self.files.len() < self.volume_label.maximum_directory_entries()
    }

    /// Creates a new, empty file with a kind guessed from its
    /// extension, placed immediately after the current end of data.
    pub fn mknod(&mut self, name: &str) -> Result<usize> {
        if self.deeper.is_read_only() {
            return Err(Error::ReadOnly);
        }
        if !self.has_room_for_new_file() {
            return Err(Error::NoSpace);
        }
        let kind = DfKind::from_extension(name);
        let start_block = self.volume_label.eov_block().min(self.first_empty_block());
        let entry = FileEntry::new(name, kind, start_block, 0);
        self.add_new_file(entry)
    }

    pub fn add_new_file(&mut self, entry: FileEntry) -> Result<usize> {
        if self.deeper.is_read_only() {
            return Err(Error::ReadOnly);
        }
        if !self.has_room_for_new_file() {
            return Err(Error::NoSpace);
        }
        self.volume_label.update_timestamp(Date::NONE);
        self.files.push(entry);
        self.meta_sync()?;
        Ok(self.files.len() - 1)
    }

    pub fn delete_existing_file(&mut self, index: usize) -> Result<()> {
        if self.deeper.is_read_only() {
            return Err(Error::ReadOnly);
        }
        if index >= self.files.len() {
            return Err(Error::NotFound);
        }
        self.files.remove(index);
        self.volume_label.update_timestamp(Date::NONE);
        self.meta_sync()
    }

    pub fn rename(&mut self, index: usize, new_name: &str) -> Result<()> {
        if self.deeper.is_read_only() {
            return Err(Error::ReadOnly);
        }
        let new_name = new_name.strip_prefix('/').unwrap_or(new_name);
        if new_name.contains('/') {
            return Err(Error::Invalid);
        }
        if let Some(existing) = self.find(new_name) {
            if existing == index {
                return Err(Error::Invalid);
            }
            self.delete_existing_file(existing)?;
        }
        let entry = self.files.get_mut(index).ok_or(Error::NotFound)?;
        entry.rename(new_name);
        self.meta_sync()
    }

    pub fn first_empty_block(&self) -> u16 {
        self.files.last().map(|f| f.last_block()).unwrap_or_else(|| self.volume_label.last_block())
    }

    /// Moves every file below `index` down and every file above it up,
    /// leaving the largest possible gap immediately after `index`.
    /// Returns the resulting gap size in blocks.
    pub fn move_gap_after(&mut self, index: usize) -> Result<u16> {
        if self.deeper.is_read_only() {
            return Err(Error::ReadOnly);
        }
        if index >= self.files.len() {
            return Err(Error::NotFound);
        }
        let mut low_block = self.volume_label.last_block();
        let mut changed = false;

        for j in 0..=index {
            changed |= self.relocate_file(j, low_block)?;
            low_block = self.files[j].last_block();
        }

        let mut high_block = self.volume_label.eov_block();
        for k in (index + 1..self.files.len()).rev() {
            let target = high_block - self.files[k].size_in_blocks();
            changed |= self.relocate_file(k, target)?;
            high_block = self.files[k].first_block();
        }

        if changed {
            self.meta_sync()?;
        }
        Ok(high_block - low_block)
    }

    pub fn sizeof_gap_after(&self, index: usize) -> Result<u16> {
        if index >= self.files.len() {
            return Err(Error::NotFound);
        }
        let low_block = self.files[index].last_block();
        let high_block = if index + 1 == self.files.len() {
            self.volume_label.eov_block()
        } else {
            self.files[index + 1].first_block()
        };
        Ok(high_block - low_block)
    }

    /// Moves every file's bytes on the medium and updates its entry to
    /// match. Returns whether anything actually moved.
    fn relocate_file(&mut self, index: usize, to_block: u16) -> Result<bool> {
        let entry = &self.files[index];
        if to_block == entry.first_block() {
            return Ok(false);
        }
        let num_blocks = entry.size_in_blocks();
        self.deeper.relocate_bytes(block_addr(to_block), block_addr(entry.first_block()), (num_blocks as u64) << 9)?;
        self.files[index].relocate(to_block);
        Ok(true)
    }

    /// Moves every file toward the start of the disk, maximizing the
    /// gap at the end.
    pub fn crunch(&mut self) -> Result<u16> {
        if self.files.is_empty() {
            return Ok(0);
        }
        self.move_gap_after(self.files.len() - 1)
    }

    fn calc_used_blocks(&self) -> u32 {
        let mut blocks = self.volume_label.size_in_blocks() as u32;
        for file in &self.files {
            blocks += file.size_in_blocks() as u32;
        }
        blocks
    }

    pub fn statfs(&self) -> StatFs {
        let blocks_total = self.volume_label.eov_block() as u64;
        let blocks_free = blocks_total - self.calc_used_blocks() as u64;
        StatFs {
            block_size: 512,
            blocks_total,
            blocks_free,
            files_total: self.volume_label.maximum_directory_entries() as u64,
            files_free: (self.volume_label.maximum_directory_entries() - self.files.len()) as u64,
            read_only: self.deeper.is_read_only(),
        }
    }

    /// Zeroes every block not accounted for by the directory or a
    /// file's allocated extent.
    pub fn wipe_unused(&self) -> Result<()> {
        if self.deeper.is_read_only() {
            return Err(Error::ReadOnly);
        }
        let mut curblock = self.volume_label.size_in_blocks();
        for file in &self.files {
            let first_block = file.first_block();
            if curblock < first_block {
                let gap_bytes = ((first_block - curblock) as u64) << 9;
                self.deeper.write_zero(block_addr(curblock), gap_bytes)?;
                curblock = first_block;
            }
            let partial = (file.size_in_bytes() & 511) as u64;
            if partial != 0 {
                let blknum = curblock + file.size_in_blocks() - 1;
                let addr = block_addr(blknum) + partial;
                self.deeper.write_zero(addr, 512 - partial)?;
            }
            curblock += file.size_in_blocks();
        }
        let high_block = self.volume_label.eov_block();
        if curblock < high_block {
            self.deeper.write_zero(block_addr(curblock), ((high_block - curblock) as u64) << 9)?;
        }
        Ok(())
    }

    pub fn set_boot_blocks(&self, boot_code: &[u8]) -> Result<()> {
        if self.deeper.is_read_only() {
            return Err(Error::ReadOnly);
        }
        let len = boot_code.len().min(4 * 512);
        self.deeper.write(0, &boot_code[..len])
    }

    pub fn get_boot_blocks(&self) -> Result<Vec<u8>> {
        let mut buffer = vec![0u8; 4 * 512];
        self.deeper.read(0, &mut buffer)?;
        Ok(buffer)
    }

    pub fn check_for_system_files(&self) -> bool {
        ["SYSTEM.COMPILER", "SYSTEM.EDITOR", "SYSTEM.FILER", "SYSTEM.PASCAL"]
            .iter()
            .all(|name| self.find(name).is_some())
    }

    pub fn print_listing(&self, verbose: bool, sort_by: SortBy) -> String {
        let mut order: Vec<usize> = (0..self.files.len()).collect();
        match sort_by {
            SortBy::Block => order.sort_by_key(|&i| self.files[i].first_block()),
            SortBy::Size => order.sort_by_key(|&i| self.files[i].size_in_bytes()),
            SortBy::Date => order.sort_by_key(|&i| self.files[i].when().encode()),
            SortBy::Name => order.sort_by(|&a, &b| self.files[a].name().cmp(self.files[b].name())),
            SortBy::Kind => order.sort_by_key(|&i| self.files[i].kind().to_raw()),
        }
        let mut out = String::new();
        out.push_str(&format!("{}:\n", self.volume_label.name()));
        for i in order {
            let file = &self.files[i];
            if verbose {
                out.push_str(&format!(
                    "{:<15} {:4} {:3} {:6} {:?}\n",
                    file.name(),
                    file.first_block(),
                    file.last_block(),
                    file.size_in_bytes(),
                    file.kind(),
                ));
            } else {
                out.push_str(&format!("{:<15} {:6}\n", file.name(), file.size_in_bytes()));
            }
        }
        out
    }

    // --- per-file operations ---

    pub fn read_file(&self, index: usize, offset: u64, buf: &mut [u8]) -> Result<usize> {
        let entry = self.files.get(index).ok_or(Error::NotFound)?;
        let size = entry.size_in_bytes();
        if offset >= size {
            return Ok(0);
        }
        let nbytes = buf.len().min((size - offset) as usize);
        self.deeper.read(block_addr(entry.first_block()) + offset, &mut buf[..nbytes])?;
        Ok(nbytes)
    }

    pub fn write_file(&mut self, index: usize, offset: u64, data: &[u8]) -> Result<usize> {
        if self.deeper.is_read_only() {
            return Err(Error::ReadOnly);
        }
        if data.is_empty() {
            return Ok(0);
        }
        let nbytes = data.len() as u64;
        let cur_size = self.files[index].size_in_bytes();
        let cur_extent = self.files[index].extent_size_in_bytes();

        if offset + nbytes <= cur_size {
            let base = block_addr(self.files[index].first_block());
            self.deeper.write(base + offset, data)?;
            self.files[index].touch(Date::NONE);
            self.meta_sync()?;
            return Ok(data.len());
        }

        if offset + nbytes <= cur_extent {
            let base = block_addr(self.files[index].first_block());
            if offset <= cur_size {
                self.deeper.write(base + offset, data)?;
            } else {
                // pad the gap between the previous end-of-file and the
                // write offset via a read-modify-write of the block.
                let block_start = offset & !511;
                let mut block_buf = [0u8; 512];
                self.deeper.read(base + block_start, &mut block_buf)?;
                let within = (offset - block_start) as usize;
                block_buf[within..within + data.len()].copy_from_slice(data);
                self.deeper.write(base + block_start, &block_buf)?;
            }
            self.files[index].set_size_in_bytes(offset + nbytes);
            self.files[index].touch(Date::NONE);
            self.meta_sync()?;
            return Ok(data.len());
        }

        // Growing the file extent: make room, then write.
        let mut gap = self.sizeof_gap_after(index)?;
        let first_block = self.files[index].first_block();
        let last_block = self.files[index].last_block();
        if offset + nbytes > (((last_block + gap - first_block) as u64) << 9) {
            gap = self.move_gap_after(index)?;
            let first_block = self.files[index].first_block();
            let last_block = self.files[index].last_block();
            if offset + nbytes > (((last_block + gap - first_block) as u64) << 9) {
                return Err(Error::NoSpace);
            }
        }

        let base = block_addr(self.files[index].first_block());
        let cur_size = self.files[index].size_in_bytes();
        if offset > cur_size {
            self.deeper.write_zero(base + cur_size, offset - cur_size)?;
        }
        self.deeper.write(base + offset, data)?;
        self.files[index].set_size_in_bytes(offset + nbytes);
        self.files[index].touch(Date::NONE);
        self.meta_sync()?;
        Ok(data.len())
    }

    pub fn truncate_file(&mut self, index: usize, size: u64) -> Result<()> {
        if self.deeper.is_read_only() {
            return Err(Error::ReadOnly);
        }
        let mut gap = self.sizeof_gap_after(index)?;
        let first_block = self.files[index].first_block();
        let last_block = self.files[index].last_block();
        if size > (((last_block + gap - first_block) as u64) << 9) {
            gap = self.move_gap_after(index)?;
            let first_block = self.files[index].first_block();
            let last_block = self.files[index].last_block();
            if size > (((last_block + gap - first_block) as u64) << 9) {
                return Err(Error::NoSpace);
            }
        }

        let cur_size = self.files[index].size_in_bytes();
        if size > cur_size {
            let base = block_addr(self.files[index].first_block());
            self.deeper.write_zero(base + cur_size, size - cur_size)?;
        }
        self.files[index].set_size_in_bytes(size);
        self.files[index].touch(Date::NONE);
        self.meta_sync()
    }

    pub fn relocate_file_public(&mut self, index: usize, to_block: u16) -> Result<bool> {
        self.relocate_file(index, to_block)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use psys_ds::DataStorage;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct MemStore(RefCell<Vec<u8>>);

    impl DataStorage for MemStore {
        fn read(&self, offset: u64, buffer: &mut [u8]) -> Result<()> {
            let data = self.0.borrow();
            let start = offset as usize;
            buffer.copy_from_slice(&data[start..start + buffer.len()]);
            Ok(())
        }
        fn write(&self, offset: u64, buffer: &[u8]) -> Result<()> {
            let mut data = self.0.borrow_mut();
            let start = offset as usize;
            data[start..start + buffer.len()].copy_from_slice(buffer);
            Ok(())
        }
        fn sync(&self) -> Result<()> {
            Ok(())
        }
        fn size_in_bytes(&self) -> u64 {
            self.0.borrow().len() as u64
        }
        fn is_read_only(&self) -> bool {
            false
        }
    }

    fn new_volume(size_kb: usize) -> Volume {
        let store = Rc::new(MemStore(RefCell::new(vec![0u8; size_kb * 1024])));
        Volume::mkfs(store, "TESTVOL", false)
    }

    #[test]
    fn mkfs_produces_empty_volume_with_room() {
        let vol = new_volume(140);
        assert_eq!(vol.volume_name(), "TESTVOL");
        assert!(vol.has_room_for_new_file());
        assert_eq!(vol.file_names().len(), 0);
    }

    #[test]
    fn mknod_then_write_then_read_round_trips() {
        let mut vol = new_volume(140);
        let idx = vol.mknod("HELLO.TEXT").unwrap();
        vol.write_file(idx, 0, b"hello world").unwrap();
        let mut buf = [0u8; 11];
        let n = vol.read_file(idx, 0, &mut buf).unwrap();
        assert_eq!(n, 11);
        assert_eq!(&buf, b"hello world");
    }

    #[test]
    fn truncate_grows_and_zero_fills() {
        let mut vol = new_volume(140);
        let idx = vol.mknod("A.DATA").unwrap();
        vol.truncate_file(idx, 1000).unwrap();
        assert_eq!(vol.file(idx).unwrap().size_in_bytes(), 1000);
        let mut buf = [0xFFu8; 16];
        vol.read_file(idx, 500, &mut buf).unwrap();
        assert_eq!(buf, [0u8; 16]);
    }

    #[test]
    fn meta_sync_round_trips_through_meta_read() {
        let store = Rc::new(MemStore(RefCell::new(vec![0u8; 140 * 1024])));
        let mut vol = Volume::mkfs(store.clone(), "RTRIP", false);
        let idx = vol.mknod("A.TEXT").unwrap();
        vol.write_file(idx, 0, b"data").unwrap();

        let (reopened, errors) = Volume::meta_read(store, Concern::Check).unwrap();
        assert_eq!(errors, 0);
        assert_eq!(reopened.volume_name(), "RTRIP");
        assert_eq!(reopened.file_names(), vec!["A.TEXT".to_string()]);
    }

    #[test]
    fn delete_existing_file_frees_the_slot() {
        let mut vol = new_volume(140);
        let idx = vol.mknod("A.DATA").unwrap();
        assert_eq!(vol.file_names().len(), 1);
        vol.delete_existing_file(idx).unwrap();
        assert_eq!(vol.file_names().len(), 0);
    }

    #[test]
    fn crunch_moves_files_toward_the_start() {
        let mut vol = new_volume(140);
        let a = vol.mknod("A.DATA").unwrap();
        vol.truncate_file(a, 2000).unwrap();
        let b = vol.mknod("B.DATA").unwrap();
        vol.truncate_file(b, 1000).unwrap();
        vol.delete_existing_file(a).unwrap();
        let gap_before = vol.sizeof_gap_after(0).unwrap();
        vol.crunch().unwrap();
        let gap_after = vol.sizeof_gap_after(0).unwrap();
        assert!(gap_after >= gap_before);
    }
}
