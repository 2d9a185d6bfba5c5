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

/// The file-kind tag carried in the low bits of a file entry's status
/// word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DfKind {
    Untyped,
    XdskFile,
    CodeFile,
    TextFile,
    InfoFile,
    DataFile,
    GrafFile,
    FotoFile,
    SecureDir,
}

impl DfKind {
    pub fn from_raw(value: u16) -> Option<DfKind> {
        match value & 0x0F {
            0 => Some(DfKind::Untyped),
            1 => Some(DfKind::XdskFile),
            2 => Some(DfKind::CodeFile),
            3 => Some(DfKind::TextFile),
            4 => Some(DfKind::InfoFile),
            5 => Some(DfKind::DataFile),
            6 => Some(DfKind::GrafFile),
            7 => Some(DfKind::FotoFile),
            8 => Some(DfKind::SecureDir),
            _ => None,
        }
    }

    pub fn to_raw(self) -> u16 {
        match self {
            DfKind::Untyped => 0,
            DfKind::XdskFile => 1,
            DfKind::CodeFile => 2,
            DfKind::TextFile => 3,
            DfKind::InfoFile => 4,
            DfKind::DataFile => 5,
            DfKind::GrafFile => 6,
            DfKind::FotoFile => 7,
            DfKind::SecureDir => 8,
        }
    }

    /// Whether text I/O should be filtered through the text codec for
    /// entries of this kind.
    pub fn is_text(self) -> bool {
        matches!(self, DfKind::TextFile)
    }

    /// `fsck` under repair demotes kinds this filesystem does not
    /// support writing to `datafile`.
    pub fn is_unsupported(self) -> bool {
        matches!(self, DfKind::SecureDir | DfKind::Untyped)
    }

    /// Guesses a kind from a `NAME.EXT`-style filename, the same way
    /// `mknod` derives one for a newly created entry.
    pub fn from_extension(name: &str) -> DfKind {
        let ext = name.rsplit('.').next().unwrap_or("").to_ascii_uppercase();
        match ext.as_str() {
            "TEXT" | "PAS" | "PASCAL" => DfKind::TextFile,
            "CODE" => DfKind::CodeFile,
            "DATA" => DfKind::DataFile,
            "INFO" => DfKind::InfoFile,
            "GRAF" => DfKind::GrafFile,
            "FOTO" => DfKind::FotoFile,
            _ => DfKind::DataFile,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_round_trips() {
        for kind in [
            DfKind::Untyped,
            DfKind::XdskFile,
            DfKind::CodeFile,
            DfKind::TextFile,
            DfKind::InfoFile,
            DfKind::DataFile,
            DfKind::GrafFile,
            DfKind::FotoFile,
            DfKind::SecureDir,
        ] {
            assert_eq!(DfKind::from_raw(kind.to_raw()), Some(kind));
        }
    }

    #[test]
    fn extension_guess_matches_common_cases() {
        assert_eq!(DfKind::from_extension("A.TEXT"), DfKind::TextFile);
        assert_eq!(DfKind::from_extension("A.CODE"), DfKind::CodeFile);
        assert_eq!(DfKind::from_extension("A.UNKNOWN"), DfKind::DataFile);
    }
}
