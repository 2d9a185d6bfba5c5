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

use psys_fs::{Attr, MountBridge, StatFs};

use crate::directory::Volume;

const ENOENT: i32 = 2;
const ENOSYS: i32 = 38;

fn to_errno(err: psys_ds::Error) -> i32 {
    err.to_errno()
}

impl MountBridge for Volume {
    fn getattr(&self, path: &str) -> Result<Attr, i32> {
        if path == "/" {
            return Ok(Attr { is_directory: true, read_only: false, size: 0, mtime_unix: 0 });
        }
        let index = self.find(path).ok_or(-ENOENT)?;
        let file = self.file(index).unwrap();
        Ok(Attr {
            is_directory: false,
            read_only: false,
            size: file.size_in_bytes(),
            mtime_unix: file.when().to_unix_approx().unwrap_or(0),
        })
    }

    fn mknod(&mut self, path: &str, _mode: u32) -> Result<(), i32> {
        self.mknod(path).map(|_| ()).map_err(to_errno)
    }

    fn unlink(&mut self, path: &str) -> Result<(), i32> {
        let index = self.find(path).ok_or(-ENOENT)?;
        self.delete_existing_file(index).map_err(to_errno)
    }

    fn rename(&mut self, from: &str, to: &str) -> Result<(), i32> {
        let index = self.find(from).ok_or(-ENOENT)?;
        self.rename(index, to).map_err(to_errno)
    }

    fn chmod(&mut self, path: &str, mode: u32) -> Result<(), i32> {
        if self.find(path).is_none() {
            return Err(-ENOENT);
        }
        if mode & 0o7777 == 0o666 {
            Ok(())
        } else {
            Err(psys_ds::Error::Invalid.to_errno())
        }
    }

    fn chown(&mut self, path: &str, _uid: u32, _gid: u32) -> Result<(), i32> {
        if self.find(path).is_none() {
            return Err(-ENOENT);
        }
        Ok(())
    }

    fn truncate(&mut self, path: &str, size: u64) -> Result<(), i32> {
        let index = self.find(path).ok_or(-ENOENT)?;
        self.truncate_file(index, size).map_err(to_errno)
    }

    fn utime_ns(&mut self, path: &str, _atime_ns: i64, mtime_ns: i64) -> Result<(), i32> {
        let index = self.find(path).ok_or(-ENOENT)?;
        let when = psys_fs::Date::from_unix_approx(mtime_ns / 1_000_000_000);
        self.touch_file(index, when).map_err(to_errno)
    }

    fn open(&self, path: &str) -> Result<(), i32> {
        self.find(path).map(|_| ()).ok_or(-ENOENT)
    }

    fn read(&self, path: &str, offset: u64, buf: &mut [u8]) -> Result<usize, i32> {
        let index = self.find(path).ok_or(-ENOENT)?;
        self.read_file(index, offset, buf).map_err(to_errno)
    }

    fn write(&mut self, path: &str, offset: u64, buf: &[u8]) -> Result<usize, i32> {
        let index = self.find(path).ok_or(-ENOENT)?;
        self.write_file(index, offset, buf).map_err(to_errno)
    }

    fn statfs(&self) -> Result<StatFs, i32> {
        Ok(self.statfs())
    }

    fn opendir(&self, path: &str) -> Result<(), i32> {
        if path == "/" {
            Ok(())
        } else {
            Err(-ENOSYS)
        }
    }

    fn readdir(&self, path: &str) -> Result<Vec<String>, i32> {
        if path != "/" {
            return Err(-ENOSYS);
        }
        Ok(self.file_names())
    }
}
