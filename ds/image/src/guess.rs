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

use std::rc::Rc;

use psys_ds::{DataStorage, Error, Result};

use crate::sector_io::{AppleSectorIo, OffsetShim, PdpSectorIo};

const VOLUME_LABEL_OFFSET: u64 = 1024;

/// Tests whether 16 bytes read as a p-System volume label signature:
/// `first_block == 0` under either byte order, `last_block` in `{6,
/// 10}` under either byte order, and a name length in `[1, 7]`.
fn has_valid_signature(data: &[u8; 16]) -> bool {
    let le_first = u16::from_le_bytes([data[0], data[1]]);
    let be_first = u16::from_be_bytes([data[0], data[1]]);
    if le_first != 0 && be_first != 0 {
        return false;
    }
    let le_last = u16::from_le_bytes([data[2], data[3]]);
    let be_last = u16::from_be_bytes([data[2], data[3]]);
    let last_ok = matches!(le_last, 6 | 10) || matches!(be_last, 6 | 10);
    if !last_ok {
        return false;
    }
    let name_len = data[6];
    (1..=7).contains(&name_len)
}

fn probe(candidate: &dyn DataStorage) -> bool {
    let mut buf = [0u8; 16];
    if candidate.read(VOLUME_LABEL_OFFSET, &mut buf).is_err() {
        return false;
    }
    has_valid_signature(&buf)
}

/// Composes a sector-I/O stack on top of `deeper` by probing, in order:
/// raw, Apple-16, PDP offset-only, PDP offset+map, PDP map alone, then
/// a brute-force byte offset `n * 256` for `n` in `1..127`.
pub fn guess_interleaving(deeper: Rc<dyn DataStorage>) -> Result<Rc<dyn DataStorage>> {
    if probe(deeper.as_ref()) {
        return Ok(deeper);
    }

    let apple = Rc::new(AppleSectorIo::new(deeper.clone()));
    if probe(apple.as_ref()) {
        return Ok(apple);
    }

    let pdp_offset_only = Rc::new(OffsetShim::new(deeper.clone(), OffsetShim::PDP_FIRST_TRACK_BYTES));
    if probe(pdp_offset_only.as_ref()) {
        return Ok(pdp_offset_only);
    }

    let pdp_offset_and_map = Rc::new(PdpSectorIo::new(Rc::new(OffsetShim::new(
        deeper.clone(),
        OffsetShim::PDP_FIRST_TRACK_BYTES,
    ))));
    if probe(pdp_offset_and_map.as_ref()) {
        return Ok(pdp_offset_and_map);
    }

    let pdp_map_alone = Rc::new(PdpSectorIo::new(deeper.clone()));
    if probe(pdp_map_alone.as_ref()) {
        return Ok(pdp_map_alone);
    }

    for n in 1..127u64 {
        let shim = Rc::new(OffsetShim::new(deeper.clone(), n * 256));
        if probe(shim.as_ref()) {
            return Ok(shim);
        }
    }

    Err(Error::InterleaveUnknown)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sector_io::AppleSectorIo;
    use psys_ds::DataStorage;
    use std::cell::RefCell;

    struct MemStore(RefCell<Vec<u8>>);

    impl DataStorage for MemStore {
        fn read(&self, offset: u64, buffer: &mut [u8]) -> Result<()> {
            let data = self.0.borrow();
            if offset as usize + buffer.len() > data.len() {
                return Err(Error::Invalid);
            }
            buffer.copy_from_slice(&data[offset as usize..offset as usize + buffer.len()]);
            Ok(())
        }
        fn write(&self, offset: u64, buffer: &[u8]) -> Result<()> {
            let mut data = self.0.borrow_mut();
            data[offset as usize..offset as usize + buffer.len()].copy_from_slice(buffer);
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

    fn sample_label() -> Vec<u8> {
        // first_block=0, last_block=6 (LE), name length 4 "TEST".
        let mut label = vec![0u8; 26];
        label[2] = 6;
        label[6] = 4;
        label[7..11].copy_from_slice(b"TEST");
        label
    }

    #[test]
    fn raw_image_is_recognized_directly() {
        let mut bytes = vec![0u8; 4096];
        bytes[1024..1050].copy_from_slice(&sample_label());
        let store: Rc<dyn DataStorage> = Rc::new(MemStore(RefCell::new(bytes)));
        let result = guess_interleaving(store).unwrap();
        let mut buf = [0u8; 16];
        result.read(1024, &mut buf).unwrap();
        assert!(has_valid_signature(&buf));
    }

    #[test]
    fn apple_interleaved_image_is_recognized() {
        let raw = Rc::new(MemStore(RefCell::new(vec![0u8; 4096])));
        let apple = AppleSectorIo::new(raw.clone());
        apple.write(1024, &sample_label()).unwrap();
        let deeper: Rc<dyn DataStorage> = raw;
        let result = guess_interleaving(deeper).unwrap();
        let mut buf = [0u8; 16];
        result.read(1024, &mut buf).unwrap();
        assert!(has_valid_signature(&buf));
    }

    #[test]
    fn unrecognizable_image_is_an_error() {
        let store: Rc<dyn DataStorage> = Rc::new(MemStore(RefCell::new(vec![0xFFu8; 4096])));
        assert!(matches!(guess_interleaving(store), Err(Error::InterleaveUnknown)));
    }
}
