//! Verb dispatch, argument parsing, and user-facing messages.
//!
//! `ionicfs_core` returns `Result` only; this is the one place allowed to
//! print to stdout/stderr and set the process exit code (the interactive
//! format interview is the one exception, since prompting is inherent to
//! that verb rather than being a way of reporting a result).

use ionicfs_core::directory::create_directory;
use ionicfs_core::file::{copy_file, read_file, remove_directory, remove_file};
use ionicfs_core::format::{boot, format_disk_interactive, read_boot_file};
use ionicfs_core::session::Image;
use ionicfs_core::superblock::version_display;
use ionicfs_core::time::{format_local, now_unix};
use ionicfs_core::{Error, Result};
use std::path::{Path, PathBuf};
use std::process::exit;

fn print_banner() {
    println!("IonicFS Tooling");
    println!("Created by Max Van den Eynde for the Avery project.");
    println!("Version: {}", version_display());
    println!("Copyright (c) 2025 Max Van den Eynde");
}

fn print_help(prog: &str) {
    println!("Usage: {prog} <command> [options]");
    println!("Commands:");
    println!("  format <disk_path>");
    println!("  info <disk_path>");
    println!("  list <disk_path> [partition_index]");
    println!("  mkdir <disk_path> <dir_name> [partition_index]");
    println!("  copy <disk_path> <file_name> <dest_path> [partition_index]");
    println!("  read <disk_path> <file_name> [partition_index]");
    println!("  read -hex <disk_path> <file_name> [partition_index]");
    println!("  rm <disk_path> <file_name> [partition_index]");
    println!("  rm-dir <disk_path> <dir_name> [partition_index]");
    println!("  boot <disk_path> <boot_file_path>");
    println!("  version");
    println!("  help");
}

fn parse_partition_index(args: &[String], at: usize) -> Result<usize> {
    match args.get(at) {
        None => Ok(0),
        Some(s) => s
            .parse()
            .map_err(|_| Error::ArgError(format!("invalid partition index: {s}"))),
    }
}

fn require(args: &[String], index: usize, what: &str) -> Result<String> {
    args.get(index)
        .cloned()
        .ok_or_else(|| Error::ArgError(format!("missing argument: {what}")))
}

fn cmd_format(args: &[String]) -> Result<()> {
    let disk_path = PathBuf::from(require(args, 0, "disk_path")?);
    let mut image = Image::open(&disk_path)?;
    format_disk_interactive(image.file_mut(), now_unix())
}

fn cmd_info(args: &[String]) -> Result<()> {
    let disk_path = PathBuf::from(require(args, 0, "disk_path")?);
    let mut image = Image::open(&disk_path)?;
    let info = image.load_superblock()?;

    println!("Drive Information:");
    println!("Disk Size: {} bytes", info.disk_size);
    println!("Total Regions: {}", info.total_regions);
    println!("Using IonicFS Version: {}", info.version);
    for partition in &info.partitions {
        if partition.usable() {
            println!(
                "Partition Name: {}, Region: {}, Size: {} sectors",
                partition.name_str(),
                partition.region.0,
                partition.size
            );
        }
    }
    Ok(())
}

fn cmd_list(args: &[String]) -> Result<()> {
    let disk_path = PathBuf::from(require(args, 0, "disk_path")?);
    let partition_index = parse_partition_index(args, 1)?;
    let mut image = Image::open(&disk_path)?;
    let info = image.load_superblock()?;
    let partition = info.partition(partition_index)?;
    if !partition.usable() {
        return Err(Error::NotFound);
    }

    let dir = ionicfs_core::directory::parse_directory(image.file_mut(), partition.region)?;
    for warning in &dir.warnings {
        eprintln!("warning: {warning}");
    }
    if dir.entries.is_empty() {
        println!("No entries found in the directory.");
        return Ok(());
    }

    println!("Files at ROOT MODULE. Partition {partition_index}:");
    for entry in &dir.entries {
        let name = String::from_utf8_lossy(&entry.name);
        let suffix = if entry.is_directory { "/" } else { "" };
        println!(
            "{name}{suffix} (Last Accessed: {}, Last Modified: {}, Created: {}, Region: {:x}, Is Directory: {})",
            format_local(entry.last_accessed),
            format_local(entry.last_modified),
            format_local(entry.created),
            entry.region.0,
            if entry.is_directory { "Yes" } else { "No" },
        );
    }
    Ok(())
}

fn cmd_mkdir(args: &[String]) -> Result<()> {
    let disk_path = PathBuf::from(require(args, 0, "disk_path")?);
    let dir_name = require(args, 1, "dir_name")?;
    let partition_index = parse_partition_index(args, 2)?;
    let mut image = Image::open(&disk_path)?;
    let info = image.load_superblock()?;
    create_directory(image.file_mut(), &info, partition_index, &dir_name, now_unix())?;
    Ok(())
}

fn cmd_copy(args: &[String]) -> Result<()> {
    let disk_path = PathBuf::from(require(args, 0, "disk_path")?);
    let source_path = require(args, 1, "file_name")?;
    let dest_path = require(args, 2, "dest_path")?;
    let partition_index = parse_partition_index(args, 3)?;

    let data = std::fs::read(&source_path).map_err(Error::Io)?;
    let mut image = Image::open(&disk_path)?;
    let info = image.load_superblock()?;
    copy_file(image.file_mut(), &info, partition_index, &data, &dest_path, now_unix())?;
    Ok(())
}

fn cmd_read(args: &[String], hex: bool) -> Result<()> {
    let disk_path = PathBuf::from(require(args, 0, "disk_path")?);
    let file_name = require(args, 1, "file_name")?;
    let partition_index = parse_partition_index(args, 2)?;
    let mut image = Image::open(&disk_path)?;
    let info = image.load_superblock()?;
    let partition = info.partition(partition_index)?;
    let data = read_file(image.file_mut(), partition, &file_name)?;
    if data.is_empty() {
        return Err(Error::NotFound);
    }

    if hex {
        let rendered: Vec<String> = data.iter().map(|b| format!("{b:x}")).collect();
        println!("{}", rendered.join(" "));
    } else {
        use std::io::Write;
        std::io::stdout().write_all(&data).map_err(Error::Io)?;
    }
    eprintln!("File read successfully.");
    eprintln!("File size: {} bytes.", data.len());
    Ok(())
}

fn cmd_rm(args: &[String]) -> Result<()> {
    let disk_path = PathBuf::from(require(args, 0, "disk_path")?);
    let file_name = require(args, 1, "file_name")?;
    let partition_index = parse_partition_index(args, 2)?;
    let mut image = Image::open(&disk_path)?;
    let info = image.load_superblock()?;
    let partition = info.partition(partition_index)?.clone();
    remove_file(image.file_mut(), &partition, &file_name)
}

fn cmd_rm_dir(args: &[String]) -> Result<()> {
    let disk_path = PathBuf::from(require(args, 0, "disk_path")?);
    let dir_name = require(args, 1, "dir_name")?;
    let partition_index = parse_partition_index(args, 2)?;
    let mut image = Image::open(&disk_path)?;
    let info = image.load_superblock()?;
    remove_directory(image.file_mut(), &info, partition_index, &dir_name)
}

fn cmd_boot(args: &[String]) -> Result<()> {
    let disk_path = PathBuf::from(require(args, 0, "disk_path")?);
    let boot_path = require(args, 1, "boot_file_path")?;
    let boot_code = read_boot_file(Path::new(&boot_path))?;
    let mut image = Image::open(&disk_path)?;
    boot(image.file_mut(), &boot_code)
}

fn run(prog: &str, verb: &str, rest: &[String]) -> Result<()> {
    match verb {
        "format" => cmd_format(rest),
        "info" => cmd_info(rest),
        "list" => cmd_list(rest),
        "mkdir" => cmd_mkdir(rest),
        "copy" => cmd_copy(rest),
        "read" => {
            if rest.first().map(String::as_str) == Some("-hex") {
                cmd_read(&rest[1..], true)
            } else {
                cmd_read(rest, false)
            }
        }
        "rm" => cmd_rm(rest),
        "rm-dir" => cmd_rm_dir(rest),
        "boot" => cmd_boot(rest),
        _ => {
            eprintln!("Unknown command: {verb}");
            eprintln!("Usage: {prog} <disk_path>");
            exit(1);
        }
    }
}

pub fn main() {
    let mut args = std::env::args();
    let prog = args.next().unwrap_or_else(|| "ionicfs".to_string());
    let rest: Vec<String> = args.collect();

    let Some(verb) = rest.first() else {
        print_banner();
        return;
    };

    match verb.as_str() {
        "help" => {
            print_help(&prog);
            return;
        }
        "version" => {
            print_banner();
            return;
        }
        _ => {}
    }

    if rest.len() < 2 {
        eprintln!("Usage: {prog} <disk_path>");
        exit(1);
    }

    if let Err(e) = run(&prog, verb, &rest[1..]) {
        eprintln!("Error: {e}");
        exit(1);
    }
}
