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
use psys_ds::DataStoragePtr;
use psys_ds_image::sector_io::{AppleSectorIo, PdpSectorIo};
use psys_ds_std::FileBackingStore;
use psys_fs::MachineType;
use psys_fs_psystem::Volume;

#[derive(Parser)]
#[command(name = "psys-mkfs", about = "Create a new UCSD p-System disk image")]
struct Args {
    /// Path of the image to create.
    image: PathBuf,

    /// Image size, e.g. `140kb`, `800kb`, `1mb`. Defaults to the target
    /// machine's conventional size.
    #[arg(short = 'B', long = "size")]
    size: Option<String>,

    /// Volume label, 1-7 characters.
    #[arg(short = 'L', long = "label", default_value = "NO-NAME")]
    label: String,

    /// Duplicate the directory meta-data at the twin offset.
    #[arg(long)]
    twin: bool,

    /// Sector interleave to write: none, apple, or pdp.
    #[arg(short = 'I', long = "interleave", value_parser = ["none", "apple", "pdp"], default_value = "none")]
    interleave: String,

    /// Target machine, used to pick a default byte-sex and size.
    #[arg(short = 'A', long = "machine", default_value = "apple")]
    machine: String,

    /// Boot code to install in the first four blocks.
    #[arg(short = 'b', long = "bootfile")]
    bootfile: Option<PathBuf>,

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
    let machine = MachineType::from_name_fuzzy(&args.machine);
    let size_kb = match &args.size {
        Some(s) => psys_cli::parse_size_kb(s)?,
        None => machine.default_image_size_kb(),
    };

    let backing: DataStoragePtr =
        Rc::new(FileBackingStore::create(&args.image, size_kb * 1024).map_err(|e| e.to_string())?);

    let deeper: DataStoragePtr = match args.interleave.as_str() {
        "apple" => Rc::new(AppleSectorIo::new(backing)),
        "pdp" => Rc::new(PdpSectorIo::new(backing)),
        _ => backing,
    };

    let mut volume = Volume::mkfs_with_byte_sex(deeper, &args.label, args.twin, machine.byte_sex());

    if let Some(bootfile) = &args.bootfile {
        let boot_code = std::fs::read(bootfile).map_err(|e| e.to_string())?;
        volume.set_boot_blocks(&boot_code).map_err(|e| e.to_string())?;
    }

    volume.meta_sync().map_err(|e| e.to_string())?;
    log::info!("created {} ({} KiB, {})", args.image.display(), size_kb, machine.name());
    Ok(())
}
