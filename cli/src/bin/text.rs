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

use std::path::PathBuf;

use clap::Parser;
use psys_text::{Decoder, Encoder};

#[derive(Parser)]
#[command(name = "psys-text", about = "Convert between host text and p-System editor text blocks")]
struct Args {
    input: PathBuf,
    output: PathBuf,

    /// Encode host text into a p-System text block.
    #[arg(short = 'e', conflicts_with = "decode")]
    encode: bool,

    /// Decode a p-System text block into host text.
    #[arg(short = 'd', conflicts_with = "encode")]
    decode: bool,

    /// When decoding, emit spaces only, never reconstruct tabs.
    #[arg(long = "no-tabs")]
    no_tabs: bool,

    /// When encoding, omit the 1KB trailing-NUL guarantee.
    #[arg(long = "no-nul")]
    no_nul: bool,

    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let args = Args::parse();
    psys_cli::init_logging(args.verbose);

    if let Err(err) = run(args) {
        log::error!("{err}");
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<(), String> {
    if !args.encode && !args.decode {
        return Err("one of -e or -d is required".to_string());
    }
    let input = std::fs::read(&args.input).map_err(|e| e.to_string())?;

    let output = if args.decode {
        let mut decoder = Decoder::new(!args.no_tabs);
        decoder.push(&input);
        decoder.finish()
    } else {
        let mut encoder = Encoder::new(true, !args.no_nul);
        encoder.push(&input);
        encoder.finish()
    };

    std::fs::write(&args.output, output).map_err(|e| e.to_string())?;
    log::info!("wrote {}", args.output.display());
    Ok(())
}
