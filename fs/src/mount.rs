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

/// File attributes reported by `getattr`, independent of any host
/// `struct stat` representation.
#[derive(Debug, Clone, Copy, Default)]
pub struct Attr {
    pub is_directory: bool,
    pub read_only: bool,
    pub size: u64,
    pub mtime_unix: i64,
}

/// Filesystem-wide statistics reported by `statfs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatFs {
    pub block_size: u32,
    pub blocks_total: u64,
    pub blocks_free: u64,
    pub files_total: u64,
    pub files_free: u64,
    pub read_only: bool,
}

/// The operation set a host filesystem-in-userspace layer calls into.
/// Every mutating method returns `0` on success or a negative errno;
/// every path is relative to the volume root (a bare name, or `/` for
/// the volume label itself, per [`crate::dfkind`]'s single-level
/// layout). Operations this filesystem has no equivalent for return
/// `-ENOSYS`; operations on a name that is not present return
/// `-ENOENT`; mutation on a read-only mount returns `-EROFS`.
pub trait MountBridge {
    fn getattr(&self, path: &str) -> Result<Attr, i32>;
    fn readlink(&self, path: &str) -> Result<String, i32> {
        let _ = path;
        Err(-libc_enosys())
    }
    fn mknod(&mut self, path: &str, mode: u32) -> Result<(), i32>;
    fn mkdir(&mut self, path: &str, mode: u32) -> Result<(), i32> {
        let _ = (path, mode);
        Err(-libc_enosys())
    }
    fn unlink(&mut self, path: &str) -> Result<(), i32>;
    fn rmdir(&mut self, path: &str) -> Result<(), i32> {
        let _ = path;
        Err(-libc_enosys())
    }
    fn symlink(&mut self, path: &str, target: &str) -> Result<(), i32> {
        let _ = (path, target);
        Err(-libc_enosys())
    }
    fn rename(&mut self, from: &str, to: &str) -> Result<(), i32>;
    fn link(&mut self, path: &str, other: &str) -> Result<(), i32> {
        let _ = (path, other);
        Err(-libc_enosys())
    }
    fn chmod(&mut self, path: &str, mode: u32) -> Result<(), i32>;
    fn chown(&mut self, path: &str, uid: u32, gid: u32) -> Result<(), i32>;
    fn truncate(&mut self, path: &str, size: u64) -> Result<(), i32>;
    fn utime_ns(&mut self, path: &str, atime_ns: i64, mtime_ns: i64) -> Result<(), i32>;
    fn open(&self, path: &str) -> Result<(), i32>;
    fn read(&self, path: &str, offset: u64, buf: &mut [u8]) -> Result<usize, i32>;
    fn write(&mut self, path: &str, offset: u64, buf: &[u8]) -> Result<usize, i32>;
    fn statfs(&self) -> Result<StatFs, i32>;
    fn flush(&self, path: &str) -> Result<(), i32> {
        let _ = path;
        Ok(())
    }
    fn release(&mut self, path: &str) -> Result<(), i32> {
        let _ = path;
        Ok(())
    }
    fn fsync(&self, path: &str) -> Result<(), i32> {
        let _ = path;
        Ok(())
    }
    fn setxattr(&mut self, path: &str, name: &str, value: &[u8]) -> Result<(), i32> {
        let _ = (path, name, value);
        Err(-libc_enosys())
    }
    fn getxattr(&self, path: &str, name: &str) -> Result<Vec<u8>, i32> {
        let _ = (path, name);
        Err(-libc_enosys())
    }
    fn listxattr(&self, path: &str) -> Result<Vec<String>, i32> {
        let _ = path;
        Err(-libc_enosys())
    }
    fn removexattr(&mut self, path: &str, name: &str) -> Result<(), i32> {
        let _ = (path, name);
        Err(-libc_enosys())
    }
    fn opendir(&self, path: &str) -> Result<(), i32>;
    fn readdir(&self, path: &str) -> Result<Vec<String>, i32>;
    fn releasedir(&self, path: &str) -> Result<(), i32> {
        let _ = path;
        Ok(())
    }
    fn fsyncdir(&self, path: &str) -> Result<(), i32> {
        let _ = path;
        Ok(())
    }
}

fn libc_enosys() -> i32 {
    38
}
