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

use psys_ds::{Error, Result};

const MAGIC: &[u8] = b"IMD ";
const COMMENT_TERMINATOR: u8 = 0x1A;

/// Decodes an ImageDisk (`.imd`) container into a flat byte image.
pub fn decode(input: &[u8]) -> Result<Vec<u8>> {
    if input.len() < MAGIC.len() || &input[..MAGIC.len()] != MAGIC {
        return Err(Error::MalformedImage("missing IMD magic".into()));
    }
    let comment_end = input
        .iter()
        .position(|&b| b == COMMENT_TERMINATOR)
        .ok_or_else(|| Error::MalformedImage("unterminated IMD comment".into()))?;
    let mut pos = comment_end + 1;
    let mut out = Vec::new();

    while pos < input.len() {
        let track_header = read_bytes(input, pos, 5)?;
        pos += 5;
        let _mode = track_header[0];
        let _cylinder = track_header[1];
        let head_flags = track_header[2];
        let sector_count = track_header[3] as usize;
        let size_code = track_header[4];
        let sector_size = 128usize
            .checked_shl(size_code as u32)
            .ok_or_else(|| Error::MalformedImage("IMD sector size code out of range".into()))?;

        let sector_map = read_bytes(input, pos, sector_count)?.to_vec();
        pos += sector_count;
        if head_flags & 0x80 != 0 {
            pos += sector_count; // cylinder map, unused beyond skipping
        }
        if head_flags & 0x40 != 0 {
            pos += sector_count; // head map, unused beyond skipping
        }

        let mut track_data = vec![0u8; sector_count * sector_size];
        for &raw_number in &sector_map {
            let record_type = *read_bytes(input, pos, 1)?.first().unwrap();
            pos += 1;
            let target = ((raw_number as usize).wrapping_sub(1)) % sector_count.max(1);
            let dest = &mut track_data[target * sector_size..(target + 1) * sector_size];
            match record_type {
                0 => {
                    // Sector data unavailable: leave as zero.
                }
                1 => {
                    dest.copy_from_slice(read_bytes(input, pos, sector_size)?);
                    pos += sector_size;
                }
                2 => {
                    let fill = *read_bytes(input, pos, 1)?.first().unwrap();
                    pos += 1;
                    dest.fill(fill);
                }
                other => {
                    return Err(Error::MalformedImage(format!(
                        "unknown IMD sector record type {other}"
                    )))
                }
            }
        }
        out.extend_from_slice(&track_data);
    }

    Ok(out)
}

fn read_bytes(input: &[u8], pos: usize, len: usize) -> Result<&[u8]> {
    input
        .get(pos..pos + len)
        .ok_or_else(|| Error::MalformedImage("truncated IMD input".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_raw_sector_track_decodes() {
        let mut input = Vec::new();
        input.extend_from_slice(MAGIC);
        input.extend_from_slice(b"test comment");
        input.push(COMMENT_TERMINATOR);
        // track: mode=0, cyl=0, head=0, sector_count=1, size_code=0 (128 bytes)
        input.extend_from_slice(&[0, 0, 0, 1, 0]);
        input.push(1); // sector numbering map: sector 1
        input.push(1); // record type: raw
        input.extend_from_slice(&[0xAB; 128]);

        let out = decode(&input).unwrap();
        assert_eq!(out.len(), 128);
        assert!(out.iter().all(|&b| b == 0xAB));
    }

    #[test]
    fn unavailable_sector_fills_zero() {
        let mut input = Vec::new();
        input.extend_from_slice(MAGIC);
        input.push(COMMENT_TERMINATOR);
        input.extend_from_slice(&[0, 0, 0, 1, 0]);
        input.push(1);
        input.push(0); // unavailable
        let out = decode(&input).unwrap();
        assert_eq!(out, vec![0u8; 128]);
    }

    #[test]
    fn rejects_missing_magic() {
        assert!(decode(b"nope").is_err());
    }
}
