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

use std::{
    fs::{File, OpenOptions},
    os::unix::fs::FileExt,
    path::Path,
    sync::atomic::{AtomicU32, Ordering},
};

use psys_ds::{DataStorage, Error, Result};

/// Above this size a memory map is rejected in favor of `pread`/`pwrite`,
/// per the backing-store contract.
const MMAP_SIZE_LIMIT: u64 = 16 * 1024 * 1024;

/// `pread`/`pwrite`-style backing store over a host file.
pub struct FileBackingStore {
    file: File,
    size: u64,
    read_only: bool,
    sector_size_hint: AtomicU32,
}

impl FileBackingStore {
    pub fn open<P: AsRef<Path>>(path: P, read_only: bool) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(!read_only)
            .open(path)?;
        let size = file.metadata()?.len();
        Ok(Self {
            file,
            size,
            read_only,
            sector_size_hint: AtomicU32::new(512),
        })
    }

    pub fn create<P: AsRef<Path>>(path: P, size_in_bytes: u64) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        file.set_len(size_in_bytes)?;
        Ok(Self {
            file,
            size: size_in_bytes,
            read_only: false,
            sector_size_hint: AtomicU32::new(512),
        })
    }
}

impl DataStorage for FileBackingStore {
    fn read(&self, offset: u64, buffer: &mut [u8]) -> Result<()> {
        if offset + buffer.len() as u64 > self.size {
            return Err(Error::Invalid);
        }
        self.file.read_exact_at(buffer, offset)?;
        Ok(())
    }

    fn write(&self, offset: u64, buffer: &[u8]) -> Result<()> {
        if self.read_only {
            return Err(Error::ReadOnly);
        }
        if offset + buffer.len() as u64 > self.size {
            return Err(Error::NoSpace);
        }
        self.file.write_all_at(buffer, offset)?;
        Ok(())
    }

    fn sync(&self) -> Result<()> {
        self.file.sync_all()?;
        Ok(())
    }

    fn size_in_bytes(&self) -> u64 {
        self.size
    }

    fn is_read_only(&self) -> bool {
        self.read_only
    }

    fn sector_size_hint(&self) -> u32 {
        self.sector_size_hint.load(Ordering::Relaxed)
    }

    fn set_sector_size_hint(&self, hint: u32) {
        let mut current = self.sector_size_hint.load(Ordering::Relaxed);
        while hint < current {
            match self.sector_size_hint.compare_exchange_weak(
                current,
                hint,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(observed) => current = observed,
            }
        }
    }
}

/// Memory-mapped backing store, preferred for images small enough that
/// the whole medium can live in the address space at once.
pub struct MmapBackingStore {
    map: memmap::Mmap,
    #[allow(dead_code)]
    file: File,
    read_only: bool,
    sector_size_hint: AtomicU32,
}

impl MmapBackingStore {
    pub fn open<P: AsRef<Path>>(path: P, read_only: bool) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(!read_only)
            .open(path)?;
        let size = file.metadata()?.len();
        if size >= MMAP_SIZE_LIMIT {
            return Err(Error::Invalid);
        }
        let map = unsafe { memmap::Mmap::map(&file)? };
        Ok(Self {
            map,
            file,
            read_only,
            sector_size_hint: AtomicU32::new(512),
        })
    }
}

impl DataStorage for MmapBackingStore {
    fn read(&self, offset: u64, buffer: &mut [u8]) -> Result<()> {
        let offset = offset as usize;
        let end = offset + buffer.len();
        if end > self.map.len() {
            return Err(Error::Invalid);
        }
        buffer.copy_from_slice(&self.map[offset..end]);
        Ok(())
    }

    fn write(&self, _offset: u64, _buffer: &[u8]) -> Result<()> {
        // memmap's safe `Mmap` type is read-only; a mutation-capable
        // backing store over this medium uses `FileBackingStore` instead.
        Err(Error::ReadOnly)
    }

    fn sync(&self) -> Result<()> {
        Ok(())
    }

    fn size_in_bytes(&self) -> u64 {
        self.map.len() as u64
    }

    fn is_read_only(&self) -> bool {
        self.read_only
    }

    fn sector_size_hint(&self) -> u32 {
        self.sector_size_hint.load(Ordering::Relaxed)
    }

    fn set_sector_size_hint(&self, hint: u32) {
        self.sector_size_hint.store(hint, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn file_backing_store_rejects_writes_past_size() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(&[0u8; 1024]).unwrap();
        let store = FileBackingStore::open(tmp.path(), false).unwrap();
        let mut buf = [0u8; 8];
        assert!(store.read(1020, &mut buf).is_err());
        assert!(store.write(1020, &[1, 2, 3, 4, 5, 6, 7, 8]).is_err());
    }

    #[test]
    fn file_backing_store_read_write_round_trips() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let store = FileBackingStore::create(tmp.path(), 2048).unwrap();
        store.write(100, b"hello").unwrap();
        let mut buf = [0u8; 5];
        store.read(100, &mut buf).unwrap();
        assert_eq!(&buf, b"hello");
    }

    #[test]
    fn read_only_file_backing_store_rejects_writes() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(&[0u8; 512]).unwrap();
        let store = FileBackingStore::open(tmp.path(), true).unwrap();
        assert!(matches!(store.write(0, &[1]), Err(Error::ReadOnly)));
    }
}
