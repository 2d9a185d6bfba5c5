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

/// Endianness of 16-bit fields on a p-System volume. Every volume
/// picks one at creation time and sticks with it; it is auto-detected
/// on open rather than stored explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteSex {
    LittleEndian,
    BigEndian,
}

impl ByteSex {
    /// Decodes two bytes into a 16-bit word under this byte-sex.
    pub fn get_word(self, data: [u8; 2]) -> u16 {
        match self {
            ByteSex::LittleEndian => u16::from_le_bytes(data),
            ByteSex::BigEndian => u16::from_be_bytes(data),
        }
    }

    /// Encodes a 16-bit word into two bytes under this byte-sex.
    pub fn put_word(self, value: u16) -> [u8; 2] {
        match self {
            ByteSex::LittleEndian => value.to_le_bytes(),
            ByteSex::BigEndian => value.to_be_bytes(),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ByteSex::LittleEndian => "little-endian",
            ByteSex::BigEndian => "big-endian",
        }
    }

    /// Auto-detects byte order from the third byte of a volume label
    /// (the low byte of `last_block` under little-endian, or the high
    /// byte's zero under big-endian). Valid `last_block` values (6 or
    /// 10) are small enough that this single byte disambiguates them.
    pub fn detect(label_byte_2: u8) -> ByteSex {
        if label_byte_2 != 0 {
            ByteSex::LittleEndian
        } else {
            ByteSex::BigEndian
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_little_endian_from_label() {
        // bytes: 00 00 | 06 00 -- last_block = 6 little-endian
        assert_eq!(ByteSex::detect(0x06), ByteSex::LittleEndian);
    }

    #[test]
    fn detects_big_endian_from_label() {
        // bytes: 00 00 | 00 06 -- last_block = 6 big-endian
        assert_eq!(ByteSex::detect(0x00), ByteSex::BigEndian);
    }

    #[test]
    fn word_round_trips_under_both_byte_orders() {
        for bs in [ByteSex::LittleEndian, ByteSex::BigEndian] {
            for w in [0u16, 1, 6, 10, 0xFFFF, 0x1234] {
                assert_eq!(bs.get_word(bs.put_word(w)), w);
            }
        }
    }
}
