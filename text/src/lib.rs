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

//! Translates between host line-oriented text and the 1KB,
//! DLE-compressed blocks the p-System text editor writes to disk.

const DLE: u8 = 0x10;

fn is_text_character(c: u8) -> bool {
    (0x20..=0x7E).contains(&c) || matches!(c, b'\t' | b'\n' | 0x0B | 0x0C | b'\r') || c == DLE
}

/// Whether the first (up to) 16 bytes of a buffer already look like
/// decoded text, ignoring any trailing NUL padding. A disk-native text
/// file starts with a 1KB binary header the editor uses for its own
/// bookkeeping; a buffer that has already had that header stripped (or
/// was never written by the editor at all) looks like text from byte
/// zero.
fn looks_like_text(data: &[u8]) -> bool {
    let mut len = data.len();
    while len > 0 && data[len - 1] == 0 {
        len -= 1;
    }
    data[..len.min(16)].iter().all(|&c| is_text_character(c))
}

/// Streaming decoder from disk-native p-System text to host text:
/// NUL discard, CR/LF normalized to LF, leading-indentation DLE runs
/// expanded to spaces (or tabs, if requested), and the 1KB editor
/// header skipped when present.
pub struct Decoder {
    column: u32,
    non_white: bool,
    skip_remaining: u32,
    dle_seen: bool,
    use_tabs: bool,
    seen_any_input: bool,
    out: Vec<u8>,
}

impl Decoder {
    pub fn new(use_tabs: bool) -> Decoder {
        Decoder { column: 0, non_white: false, skip_remaining: 1024, dle_seen: false, use_tabs, seen_any_input: false, out: Vec::new() }
    }

    pub fn push(&mut self, mut data: &[u8]) {
        if !self.seen_any_input {
            self.seen_any_input = true;
            if looks_like_text(data) {
                self.skip_remaining = 0;
            }
        }
        while !data.is_empty() && self.skip_remaining > 0 {
            data = &data[1..];
            self.skip_remaining -= 1;
        }

        let mut iter = data.iter().copied();
        while let Some(c) = iter.next() {
            if self.dle_seen {
                self.dle_seen = false;
                if c < 32 {
                    // A DLE followed by a control byte encodes a
                    // literal DLE character; the control byte itself
                    // is reprocessed as an ordinary character below.
                    self.emit_char(DLE);
                    if c == 0 {
                        continue;
                    }
                } else {
                    let run = (c - 32) as u32;
                    if self.non_white {
                        for _ in 0..run {
                            self.out.push(b' ');
                        }
                    }
                    self.column += run;
                    continue;
                }
            }
            match c {
                0 => {}
                b'\r' | b'\n' => {
                    self.out.push(b'\n');
                    self.column = 0;
                    self.non_white = false;
                }
                DLE => self.dle_seen = true,
                _ => self.emit_char(c),
            }
        }
    }

    fn emit_char(&mut self, c: u8) {
        if !self.non_white {
            let mut ocol = 0u32;
            if self.use_tabs {
                loop {
                    if ocol + 1 == self.column {
                        break;
                    }
                    let ocol2 = (ocol + 8) & !7;
                    if ocol2 > self.column {
                        break;
                    }
                    self.out.push(b'\t');
                    ocol = ocol2;
                }
            }
            while ocol < self.column {
                self.out.push(b' ');
                ocol += 1;
            }
            self.non_white = true;
        }
        self.out.push(c);
        self.column += 1;
    }

    pub fn finish(self) -> Vec<u8> {
        self.out
    }
}

/// One-shot decode of a complete p-System text file into host text.
pub fn decode(data: &[u8]) -> Vec<u8> {
    let mut decoder = Decoder::new(false);
    decoder.push(data);
    decoder.finish()
}

/// Streaming encoder from host text to disk-native p-System text:
/// leading indentation runs compressed into DLE pairs, lines
/// terminated with CR, and literal DLE bytes in the input escaped.
pub struct Encoder {
    use_dle: bool,
    nul_guarantee: bool,
    line: Vec<u8>,
    out: Vec<u8>,
}

impl Encoder {
    pub fn new(use_dle: bool, nul_guarantee: bool) -> Encoder {
        Encoder { use_dle, nul_guarantee, line: Vec::new(), out: Vec::new() }
    }

    pub fn push(&mut self, data: &[u8]) {
        for &c in data {
            match c {
                b'\n' => self.write_line(),
                b'\r' => {}
                _ => self.line.push(c),
            }
        }
    }

    fn write_line(&mut self) {
        let expanded = expand_tabs(&self.line);
        let leading = expanded.iter().take_while(|&&c| c == b' ').count() as u32;
        if self.use_dle && leading > 0 {
            let mut remaining = leading;
            while remaining > 0 {
                let chunk = remaining.min(223);
                self.out.push(DLE);
                self.out.push(32 + chunk as u8);
                remaining -= chunk;
            }
            for &c in &expanded[leading as usize..] {
                self.push_literal(c);
            }
        } else {
            for &c in &expanded {
                self.push_literal(c);
            }
        }
        self.out.push(b'\r');
        self.line.clear();
    }

    fn push_literal(&mut self, c: u8) {
        if c == DLE {
            self.out.push(DLE);
            self.out.push(0);
        } else {
            self.out.push(c);
        }
    }

    pub fn finish(mut self) -> Vec<u8> {
        if !self.line.is_empty() {
            self.write_line();
        }
        if self.nul_guarantee && self.out.last() != Some(&0) {
            self.out.push(0);
        }
        self.out
    }
}

fn expand_tabs(line: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(line.len());
    let mut column = 0u32;
    for &c in line {
        if c == b'\t' {
            let next_stop = (column + 8) & !7;
            for _ in column..next_stop {
                out.push(b' ');
            }
            column = next_stop;
        } else {
            out.push(c);
            column += 1;
        }
    }
    out
}

/// One-shot encode of a complete host text buffer into p-System text.
pub fn encode(data: &[u8]) -> Vec<u8> {
    let mut encoder = Encoder::new(true, true);
    encoder.push(data);
    encoder.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_strips_header_when_buffer_looks_binary() {
        let mut header = vec![0xFFu8; 1024];
        header.extend_from_slice(b"hello\r");
        let out = decode(&header);
        assert_eq!(out, b"hello\n");
    }

    #[test]
    fn decode_skips_header_detection_when_buffer_already_looks_like_text() {
        let out = decode(b"hello\r");
        assert_eq!(out, b"hello\n");
    }

    #[test]
    fn decode_expands_dle_leading_indentation() {
        // DLE, 32+4 spaces, then "hi", then CR
        let data = [DLE, 36, b'h', b'i', b'\r'];
        let out = decode(&data);
        assert_eq!(out, b"    hi\n");
    }

    #[test]
    fn decode_ignores_nul_padding() {
        let data = [b'h', b'i', b'\r', 0, 0, 0];
        let out = decode(&data);
        assert_eq!(out, b"hi\n");
    }

    #[test]
    fn encode_then_decode_round_trips_indented_text() {
        let host = b"    indented line\nplain line\n";
        let encoded = encode(host);
        let decoded = decode(&encoded);
        assert_eq!(decoded, host);
    }

    #[test]
    fn encode_escapes_literal_dle_bytes() {
        let host = [b'a', DLE, b'b', b'\n'];
        let encoded = encode(&host);
        let decoded = decode(&encoded);
        assert_eq!(decoded, host);
    }

    #[test]
    fn encode_guarantees_trailing_nul() {
        let encoded = encode(b"hi\n");
        assert_eq!(*encoded.last().unwrap(), 0);
    }
}
