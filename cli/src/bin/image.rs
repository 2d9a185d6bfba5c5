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
use psys_fs::DfKind;
use psys_fs_psystem::{Concern, SortBy, Volume};

#[derive(Parser)]
#[command(name = "psys-image", about = "List and transfer files in a UCSD p-System disk image")]
struct Args {
    /// Path of the disk image.
    #[arg(short = 'f', long = "file")]
    image: PathBuf,

    /// List the volume's directory.
    #[arg(short = 'l')]
    list: bool,

    /// Extract a file (or, with `--boot`, the boot blocks) from the
    /// image.
    #[arg(short = 'g')]
    get: bool,

    /// Store a file (or, with `--boot`, the boot blocks) into the
    /// image.
    #[arg(short = 'p')]
    put: bool,

    /// Delete a file from the image.
    #[arg(short = 'r', value_name = "NAME")]
    remove: Option<String>,

    /// p-System file name, for `-g`/`-p`.
    name: Option<String>,

    /// Host-side path, for `-g`/`-p`.
    #[arg(long = "host")]
    host: Option<PathBuf>,

    /// Operate on the boot blocks instead of a named file; the path is
    /// the host-side file.
    #[arg(long = "boot")]
    boot: Option<PathBuf>,

    /// Maximize the free gap by moving every file toward the start.
    #[arg(long)]
    crunch: bool,

    /// Zero every block not owned by the directory or a file.
    #[arg(long = "wipe-unused")]
    wipe_unused: bool,

    /// Report whether the volume has all four `SYSTEM.*` files.
    #[arg(long = "system-volume")]
    system_volume: bool,

    /// Run `-g`/`-p` transfers of text files through the text codec.
    #[arg(long)]
    text: bool,

    /// Sort order for `-l`.
    #[arg(long, value_parser = ["block", "name", "date", "size", "kind"], default_value = "block")]
    sort: String,

    /// Verbose listing (kind, block range, size).
    #[arg(short = 'A', long = "all")]
    all: bool,

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

fn sort_by(name: &str) -> SortBy {
    match name {
        "name" => SortBy::Name,
        "date" => SortBy::Date,
        "size" => SortBy::Size,
        "kind" => SortBy::Kind,
        _ => SortBy::Block,
    }
}

fn run(args: Args) -> Result<(), String> {
    let mutating = args.put || args.remove.is_some() || args.crunch || args.wipe_unused;
    let deeper = psys_cli::open_image(&args.image, !mutating).map_err(|e| e.to_string())?;
    let (mut volume, errors) = Volume::meta_read(deeper, Concern::Check).map_err(|e| e.to_string())?;
    if errors > 0 {
        log::warn!("{}: {errors} problem(s) found (run psys-fsck to repair)", volume.volume_name());
    }

    if args.list {
        print!("{}", volume.print_listing(args.all, sort_by(&args.sort)));
    }

    if args.system_volume {
        if volume.check_for_system_files() {
            log::info!("{}: has all SYSTEM.* files", volume.volume_name());
        } else {
            log::warn!("{}: missing one or more SYSTEM.* files", volume.volume_name());
            return Err("not a system volume".to_string());
        }
    }

    if args.get {
        if let Some(boot_path) = &args.boot {
            let boot_code = volume.get_boot_blocks().map_err(|e| e.to_string())?;
            std::fs::write(boot_path, boot_code).map_err(|e| e.to_string())?;
        } else {
            let name = args.name.as_deref().ok_or("-g requires a file name")?;
            let host = args.host.as_ref().ok_or("-g requires --host")?;
            let index = volume.find(name).ok_or_else(|| format!("no such file: {name}"))?;
            let size = volume.file(index).unwrap().size_in_bytes();
            let mut buf = vec![0u8; size as usize];
            volume.read_file(index, 0, &mut buf).map_err(|e| e.to_string())?;
            if args.text && volume.file(index).unwrap().kind() == DfKind::TextFile {
                buf = psys_text::decode(&buf);
            }
            std::fs::write(host, buf).map_err(|e| e.to_string())?;
        }
    }

    if args.put {
        if let Some(boot_path) = &args.boot {
            let boot_code = std::fs::read(boot_path).map_err(|e| e.to_string())?;
            volume.set_boot_blocks(&boot_code).map_err(|e| e.to_string())?;
        } else {
            let name = args.name.as_deref().ok_or("-p requires a file name")?;
            let host = args.host.as_ref().ok_or("-p requires --host")?;
            let mut data = std::fs::read(host).map_err(|e| e.to_string())?;
            let index = match volume.find(name) {
                Some(i) => i,
                None => volume.mknod(name).map_err(|e| e.to_string())?,
            };
            if args.text && volume.file(index).unwrap().kind() == DfKind::TextFile {
                data = psys_text::encode(&data);
            }
            volume.truncate_file(index, 0).map_err(|e| e.to_string())?;
            volume.write_file(index, 0, &data).map_err(|e| e.to_string())?;
        }
    }

    if let Some(name) = &args.remove {
        let index = volume.find(name).ok_or_else(|| format!("no such file: {name}"))?;
        volume.delete_existing_file(index).map_err(|e| e.to_string())?;
    }

    if args.crunch {
        volume.crunch().map_err(|e| e.to_string())?;
    }

    if args.wipe_unused {
        volume.wipe_unused().map_err(|e| e.to_string())?;
    }

    Ok(())
}
