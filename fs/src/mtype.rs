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

use crate::byte_sex::ByteSex;

/// The target machine a volume (or its boot code) was built for. Used
/// only to pick a default byte-sex and a default mkfs image size; it
/// has no on-disk representation of its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MachineType {
    Undefined,
    PCodeBigEndian,
    PCodeLittleEndian,
    Pdp11,
    I8080,
    Z80,
    Ga440,
    M6502,
    M6800,
    Ti9900,
}

impl MachineType {
    pub fn name(self) -> &'static str {
        match self {
            MachineType::Undefined => "Undefined",
            MachineType::PCodeBigEndian => "P-Code BE",
            MachineType::PCodeLittleEndian => "P-Code LE",
            MachineType::Pdp11 => "PDP11",
            MachineType::I8080 => "8080",
            MachineType::Z80 => "Z80",
            MachineType::Ga440 => "GA440",
            MachineType::M6502 => "6502",
            MachineType::M6800 => "6800",
            MachineType::Ti9900 => "TI9900",
        }
    }

    /// The byte-sex a volume built for this machine defaults to. There
    /// is no way to know for `Undefined`; the p-System was first
    /// developed on little-endian machines, so that is the fallback.
    pub fn byte_sex(self) -> ByteSex {
        match self {
            MachineType::PCodeBigEndian | MachineType::Ga440 | MachineType::M6800 | MachineType::Ti9900 => {
                ByteSex::BigEndian
            }
            _ => ByteSex::LittleEndian,
        }
    }

    /// Default mkfs image size in kilobytes for this machine: 140 KiB
    /// for the 6502, 800 KiB for the PDP-11, 256 KiB otherwise.
    pub fn default_image_size_kb(self) -> u64 {
        match self {
            MachineType::M6502 => 140,
            MachineType::Pdp11 => 800,
            _ => 256,
        }
    }

    fn alias_table() -> &'static [(&'static str, MachineType)] {
        &[
            ("6502", MachineType::M6502),
            ("65c02", MachineType::M6502),
            ("65c02s", MachineType::M6502),
            ("65c02s-wdc", MachineType::M6502),
            ("6800", MachineType::M6800),
            ("6809", MachineType::M6800),
            ("8080", MachineType::I8080),
            ("8085", MachineType::I8080),
            ("apple", MachineType::M6502),
            ("ga-16", MachineType::Ga440),
            ("ga-16/440", MachineType::Ga440),
            ("ga-440", MachineType::Ga440),
            ("klebsch", MachineType::M6502),
            ("lsi-11", MachineType::Pdp11),
            ("p-code be", MachineType::PCodeBigEndian),
            ("p-code le", MachineType::PCodeLittleEndian),
            ("p-code-be", MachineType::PCodeBigEndian),
            ("p-code-le", MachineType::PCodeLittleEndian),
            ("pdp-11", MachineType::Pdp11),
            ("terak", MachineType::Pdp11),
            ("ti-99-4", MachineType::Ti9900),
            ("ti-99/4", MachineType::Ti9900),
            ("ti-990", MachineType::Ti9900),
            ("ti-9900", MachineType::Ti9900),
            ("ti9900", MachineType::Ti9900),
            ("tms9900", MachineType::Ti9900),
            ("z-80", MachineType::Z80),
            ("z80", MachineType::Z80),
            ("zilog-z80", MachineType::Z80),
        ]
    }

    pub fn from_name(name: &str) -> MachineType {
        let lower = name.to_ascii_lowercase();
        Self::alias_table()
            .iter()
            .find(|(alias, _)| *alias == lower)
            .map(|(_, mtype)| *mtype)
            .unwrap_or(MachineType::Undefined)
    }

    /// Best-effort fuzzy lookup for near-miss spellings, matching on
    /// shared-character overlap against the alias table.
    pub fn from_name_fuzzy(name: &str) -> MachineType {
        let lower = name.to_ascii_lowercase();
        let mut best: Option<(f64, MachineType)> = None;
        for (alias, mtype) in Self::alias_table() {
            let score = similarity(&lower, alias);
            if score > 0.6 && best.map(|(s, _)| score > s).unwrap_or(true) {
                best = Some((score, *mtype));
            }
        }
        best.map(|(_, mtype)| mtype).unwrap_or(MachineType::Undefined)
    }
}

/// A crude character-overlap similarity ratio in `[0, 1]`, used only
/// for fuzzy machine-name matching; not a full edit-distance metric.
fn similarity(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let a_bytes: Vec<u8> = a.bytes().collect();
    let mut b_bytes: Vec<u8> = b.bytes().collect();
    let mut matches = 0;
    for &byte in &a_bytes {
        if let Some(pos) = b_bytes.iter().position(|&b| b == byte) {
            b_bytes.remove(pos);
            matches += 1;
        }
    }
    (2 * matches) as f64 / (a_bytes.len() + b.len()) as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_aliases_resolve() {
        assert_eq!(MachineType::from_name("apple"), MachineType::M6502);
        assert_eq!(MachineType::from_name("terak"), MachineType::Pdp11);
        assert_eq!(MachineType::from_name("z80"), MachineType::Z80);
    }

    #[test]
    fn unknown_name_is_undefined() {
        assert_eq!(MachineType::from_name("not-a-machine"), MachineType::Undefined);
    }

    #[test]
    fn default_sizes_match_known_machines() {
        assert_eq!(MachineType::M6502.default_image_size_kb(), 140);
        assert_eq!(MachineType::Pdp11.default_image_size_kb(), 800);
        assert_eq!(MachineType::Z80.default_image_size_kb(), 256);
    }
}
