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

pub mod byte_sex;
pub mod date;
pub mod dfkind;
pub mod mount;
pub mod mtype;

pub use byte_sex::ByteSex;
pub use date::Date;
pub use dfkind::DfKind;
pub use mount::{Attr, MountBridge, StatFs};
pub use mtype::MachineType;

/// Byte offset of the primary directory within a volume.
pub const DIRECTORY_OFFSET: u64 = 1024;
/// Byte offset of the duplicate ("twin") directory, present only when
/// a volume's `last_block` is 10 rather than 6.
pub const TWIN_DIRECTORY_OFFSET: u64 = 3072;
/// Block size in bytes; every on-disk extent is a whole number of
/// these.
pub const BLOCK_SIZE_BYTES: u64 = 512;
/// Maximum length of a volume or file name, in characters.
pub const MAX_NAME_LEN: usize = 7;
