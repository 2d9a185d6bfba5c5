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
use psys_fs_psystem::{Concern, Volume};

#[derive(Parser)]
#[command(name = "psys-fsck", about = "Check (and optionally repair) a UCSD p-System disk image")]
struct Args {
    /// Path of the image to check.
    image: PathBuf,

    /// Apply repairs instead of only reporting problems.
    #[arg(long)]
    fix: bool,

    /// Open the image read-only even when `--fix` is given (useful to
    /// preview what would be repaired).
    #[arg(long = "read-only")]
    read_only: bool,

    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let args = Args::parse();
    psys_cli::init_logging(args.verbose);

    match run(args) {
        Ok(0) => {}
        Ok(_) => std::process::exit(1),
        Err(err) => {
            log::error!("{err}");
            std::process::exit(2);
        }
    }
}

fn run(args: Args) -> Result<u32, String> {
    let concern = if args.fix && !args.read_only { Concern::Repair } else { Concern::Check };
    let read_only = args.read_only || !args.fix;
    let deeper = psys_cli::open_image(&args.image, read_only).map_err(|e| e.to_string())?;

    let (volume, errors) = Volume::meta_read(deeper, concern).map_err(|e| e.to_string())?;
    if errors == 0 {
        log::info!("{}: no problems found", volume.volume_name());
    } else if concern == Concern::Repair {
        log::warn!("{}: repaired {errors} problem(s)", volume.volume_name());
    } else {
        log::warn!("{}: found {errors} problem(s) (use --fix to repair)", volume.volume_name());
    }
    Ok(errors)
}
