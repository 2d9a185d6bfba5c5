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
use std::rc::Rc;

use clap::Parser;
use psys_ds::{DataStorage, DataStoragePtr};
use psys_ds_image::{guess, sector_io::{AppleSectorIo, PdpSectorIo}};
use psys_ds_std::FileBackingStore;

#[derive(Parser)]
#[command(name = "psys-interleave", about = "Convert between raw and sector-interleaved disk images")]
struct Args {
    input: PathBuf,
    output: PathBuf,

    /// Encode the raw input into interleaved form.
    #[arg(short = 'e', conflicts_with = "decode")]
    encode: bool,

    /// Decode an interleaved input into raw form.
    #[arg(short = 'd', conflicts_with = "encode")]
    decode: bool,

    /// Interleave to apply: none, apple, pdp, or guess (decode only).
    #[arg(short = 'T', long = "type", value_parser = ["none", "apple", "pdp", "guess"], default_value = "guess")]
    interleave_type: String,

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

    let size = std::fs::metadata(&args.input).map_err(|e| e.to_string())?.len();
    let raw_in: DataStoragePtr = Rc::new(FileBackingStore::open(&args.input, true).map_err(|e| e.to_string())?);

    let output: DataStoragePtr = Rc::new(FileBackingStore::create(&args.output, size).map_err(|e| e.to_string())?);

    if args.decode {
        let interleaved: DataStoragePtr = match args.interleave_type.as_str() {
            "apple" => Rc::new(AppleSectorIo::new(raw_in)),
            "pdp" => Rc::new(PdpSectorIo::new(raw_in)),
            "guess" => guess::guess_interleaving(raw_in).map_err(|e| e.to_string())?,
            _ => raw_in,
        };
        copy_all(interleaved.as_ref(), output.as_ref(), size).map_err(|e| e.to_string())?;
    } else {
        let interleaved: DataStoragePtr = match args.interleave_type.as_str() {
            "apple" => Rc::new(AppleSectorIo::new(output.clone())),
            "pdp" => Rc::new(PdpSectorIo::new(output.clone())),
            other => return Err(format!("-e requires an explicit -T (got {other:?})")),
        };
        copy_all(raw_in.as_ref(), interleaved.as_ref(), size).map_err(|e| e.to_string())?;
    }

    log::info!("wrote {}", args.output.display());
    Ok(())
}

fn copy_all(from: &dyn DataStorage, to: &dyn DataStorage, size: u64) -> psys_ds::Result<()> {
    let mut buf = vec![0u8; 4096];
    let mut offset = 0u64;
    while offset < size {
        let chunk = buf.len().min((size - offset) as usize);
        from.read(offset, &mut buf[..chunk])?;
        to.write(offset, &buf[..chunk])?;
        offset += chunk as u64;
    }
    Ok(())
}
