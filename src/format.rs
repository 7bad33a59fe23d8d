//! Format engine: lays out a fresh superblock and partition table on a disk
//! image, either from an interactive interview or from a precomputed plan,
//! and writes a boot sector.

use crate::chain::RegionKind;
use crate::directory::write_entry;
use crate::error::{Error, Result};
use crate::prompt::{prompt, prompt_yes_no, trim};
use crate::region::{REGION_SIZE, RegionNum, write_region};
use crate::superblock::{BOOT_CODE_LEN, NUM_PARTITIONS, Partition, format_superblock};
use std::fs::File;
use std::io::{Read, Write};

/// The first partition always starts immediately after the superblock,
/// region 1 — even though the superblock's encoded form spills six bytes
/// into the start of region 1 (see `superblock.rs`). The partition-0 root
/// directory region overwrites that spillover, which is harmless:
/// `load_superblock` only reads the version string up to its first `0x00`,
/// never past it.
pub const FIRST_PARTITION_START: u32 = 1;

/// Maximum size, in bytes, of a boot sector image `boot` will accept.
pub const MAX_BOOT_CODE_LEN: usize = BOOT_CODE_LEN;

/// A partition size as entered by the user: either an absolute region count
/// or a percentage of the disk's usable regions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeSpec {
    Regions(u32),
    Percent(u32),
}

/// Parses a size specifier: a bare integer (region count) or an integer
/// followed by `%` (percentage of the usable disk).
pub fn parse_size_spec(input: &str) -> Result<SizeSpec> {
    let input = trim(input);
    if let Some(digits) = input.strip_suffix('%') {
        let pct: u32 = digits
            .parse()
            .map_err(|_| Error::ArgError(format!("invalid percentage: {input}")))?;
        if pct > 100 {
            return Err(Error::ArgError(format!("percentage out of range: {pct}")));
        }
        Ok(SizeSpec::Percent(pct))
    } else {
        let regions: u32 = input
            .parse()
            .map_err(|_| Error::ArgError(format!("invalid region count: {input}")))?;
        Ok(SizeSpec::Regions(regions))
    }
}

/// Computes the four partition records (unused slots as `Partition::empty`)
/// from a list of 1-4 names and a matching list of sizes in regions,
/// starting at [`FIRST_PARTITION_START`]. Fails if the cumulative size
/// exceeds `usable_regions = total_regions - FIRST_PARTITION_START`.
pub fn plan_partitions(
    total_regions: u64,
    names: &[String],
    sizes: &[u32],
) -> Result<[Partition; NUM_PARTITIONS]> {
    if names.is_empty() || names.len() > NUM_PARTITIONS || names.len() != sizes.len() {
        return Err(Error::ArgError("invalid partition plan".into()));
    }

    let mut partitions: [Partition; NUM_PARTITIONS] = std::array::from_fn(|_| Partition::empty());
    let mut region = FIRST_PARTITION_START;
    for (i, (name, &size)) in names.iter().zip(sizes.iter()).enumerate() {
        let end = region as u64 + size as u64;
        if end > total_regions {
            return Err(Error::ArgError(format!(
                "partition {name} size exceeds disk size"
            )));
        }
        partitions[i] = Partition::named(name, RegionNum(region), size);
        region += size;
    }
    Ok(partitions)
}

/// Resolves a [`SizeSpec`] against the usable region count, the way the
/// original interview does for manually entered sizes.
fn resolve_size(spec: SizeSpec, usable_regions: u64) -> u32 {
    match spec {
        SizeSpec::Regions(n) => n,
        SizeSpec::Percent(pct) => ((usable_regions * pct as u64) / 100) as u32,
    }
}

/// Runs the interactive partition interview and formats `image` accordingly:
/// asks for 1-4 partition names, then either a proportional split or a
/// manually entered size per partition, confirms, and writes the layout.
pub fn format_disk_interactive(image: &mut File, now: u64) -> Result<()> {
    let disk_size = crate::disk::disk_size_bytes(image)?;
    let total_regions = disk_size / REGION_SIZE;
    println!("Disk size: {disk_size} bytes");
    println!("Total regions: {total_regions}");

    let first = prompt("Enter the name of the first partition: ")?;
    if trim(&first).is_empty() {
        return Err(Error::ArgError("partition name cannot be empty".into()));
    }
    let mut names = vec![first];
    for i in 1..NUM_PARTITIONS {
        let name = prompt(&format!(
            "Enter the name of partition {} (empty will be unused): ",
            i + 1
        ))?;
        if trim(&name).is_empty() {
            continue;
        }
        names.push(name);
    }
    for name in &names {
        if name.len() > 17 {
            return Err(Error::ArgError(format!("partition name is too long: {name}")));
        }
    }

    let usable_regions = total_regions.saturating_sub(FIRST_PARTITION_START as u64);
    let used_partitions = names.len() as u64;
    let even_share = (usable_regions / used_partitions) as u32;
    println!("Each partition will be assigned {even_share} sectors.");

    let accept_even_split = prompt_yes_no(
        "Are you sure you want to format the disk with these partitions?",
    )?;

    let sizes = if accept_even_split {
        vec![even_share; names.len()]
    } else {
        let mut sizes = Vec::with_capacity(names.len());
        for name in &names {
            let answer = prompt(&format!(
                "Indicate the partition {} size in sectors, or in percentages ending with % (e.g. 50%): ",
                trim(name)
            ))?;
            let spec = parse_size_spec(&answer)?;
            sizes.push(resolve_size(spec, usable_regions));
        }
        sizes
    };

    let partitions = plan_partitions(total_regions, &names, &sizes)?;
    format_disk(image, &partitions, now, |partition, pct| {
        print!("\rFormatting partition {}: {pct}% done.", trim(&partition.name_str()));
        let _ = std::io::stdout().flush();
        if pct == 100 {
            println!();
            println!("Partition {} formatted successfully.", trim(&partition.name_str()));
        }
    })
}

/// Writes the superblock and initializes each usable partition's regions:
/// a directory root (with a `.` self-entry) at the partition's first
/// region, and zeroed `EMPTY` regions for the rest. `on_progress` is called
/// with each usable partition and a 0-100 percent-done milestone (every
/// 25%, plus a final 100).
pub fn format_disk(
    image: &mut File,
    partitions: &[Partition; NUM_PARTITIONS],
    now: u64,
    mut on_progress: impl FnMut(&Partition, u8),
) -> Result<()> {
    format_superblock(image, partitions, &[0u8; BOOT_CODE_LEN])?;

    for partition in partitions {
        if !partition.usable() {
            continue;
        }

        let mut root = [0u8; REGION_SIZE as usize];
        root[0] = RegionKind::Directory.tag();
        write_region(image, partition.region, &root)?;
        write_entry(
            image,
            partition.region.byte_offset().checked_add(1).unwrap(),
            RegionKind::Directory,
            now,
            b".",
            partition.region,
        )?;

        let empty = [0u8; REGION_SIZE as usize];
        let span = partition.size as u64 - 1;
        for offset in 0..span {
            let region = partition.region.checked_add(1 + offset as u32).unwrap();
            write_region(image, region, &empty)?;
            let pct = (100 * (offset + 1) / span.max(1)) as u8;
            if pct % 25 == 0 {
                on_progress(partition, pct);
            }
        }
        on_progress(partition, 100);
    }
    Ok(())
}

/// Writes `boot_code` (at most [`MAX_BOOT_CODE_LEN`] bytes, and at least one)
/// over the boot area at the start of `image`.
pub fn boot(image: &mut File, boot_code: &[u8]) -> Result<()> {
    if boot_code.is_empty() {
        return Err(Error::ArgError("boot file is empty".into()));
    }
    if boot_code.len() > MAX_BOOT_CODE_LEN {
        return Err(Error::NoSpace);
    }
    crate::region::write_at(image, crate::region::ByteOffset(0), boot_code)
}

/// Reads a boot source file for use with [`boot`].
pub fn read_boot_file(path: &std::path::Path) -> Result<Vec<u8>> {
    let mut file = File::open(path).map_err(Error::Io)?;
    let mut buf = Vec::new();
    file.read_to_end(&mut buf).map_err(Error::Io)?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::parse_directory;
    use crate::region::{read_region, test_image};
    use crate::superblock::load_superblock;

    #[test]
    fn plan_partitions_lays_out_sequential_regions() {
        let names = vec!["system".to_string(), "data".to_string()];
        let sizes = vec![512u32, 1024u32];
        let partitions = plan_partitions(2048, &names, &sizes).unwrap();
        assert_eq!(partitions[0].region, RegionNum(1));
        assert_eq!(partitions[0].size, 512);
        assert_eq!(partitions[1].region, RegionNum(513));
        assert_eq!(partitions[1].size, 1024);
        assert!(!partitions[2].usable());
        assert!(!partitions[3].usable());
    }

    #[test]
    fn plan_partitions_rejects_oversized_plan() {
        let names = vec!["system".to_string()];
        let sizes = vec![3000u32];
        let err = plan_partitions(2048, &names, &sizes).unwrap_err();
        assert!(matches!(err, Error::ArgError(_)));
    }

    #[test]
    fn parse_size_spec_handles_percent_and_regions() {
        assert_eq!(parse_size_spec("512").unwrap(), SizeSpec::Regions(512));
        assert_eq!(parse_size_spec("50%").unwrap(), SizeSpec::Percent(50));
        assert!(parse_size_spec("101%").is_err());
        assert!(parse_size_spec("nope").is_err());
    }

    #[test]
    fn format_disk_writes_root_and_zeroes_rest() {
        let mut f = test_image("format_disk_writes_root_and_zeroes_rest");
        f.set_len(2048 * REGION_SIZE).unwrap();
        let names = vec!["system".to_string(), "data".to_string()];
        let sizes = vec![512u32, 1024u32];
        let partitions = plan_partitions(2048, &names, &sizes).unwrap();

        let mut milestones = Vec::new();
        format_disk(&mut f, &partitions, 1_000, |_, pct| milestones.push(pct)).unwrap();

        let info = load_superblock(&mut f).unwrap();
        assert_eq!(info.partitions[0].name_str(), "system");
        assert_eq!(info.partitions[0].region, RegionNum(1));
        assert_eq!(info.partitions[1].name_str(), "data");
        assert_eq!(info.partitions[1].region, RegionNum(513));
        assert_eq!(info.version, "001");

        let root = read_region(&mut f, RegionNum(1)).unwrap();
        assert_eq!(root[0], RegionKind::Directory.tag());
        let dir = parse_directory(&mut f, RegionNum(1)).unwrap();
        assert_eq!(dir.entries.len(), 1);
        assert_eq!(dir.entries[0].name, b".");

        let empty = read_region(&mut f, RegionNum(2)).unwrap();
        assert_eq!(empty[0], RegionKind::Empty.tag());
        let last = read_region(&mut f, RegionNum(512)).unwrap();
        assert_eq!(last[0], RegionKind::Empty.tag());

        assert!(milestones.contains(&100));
    }

    #[test]
    fn boot_rejects_oversized_code() {
        let mut f = test_image("boot_rejects_oversized_code");
        f.set_len(REGION_SIZE).unwrap();
        let err = boot(&mut f, &[0u8; MAX_BOOT_CODE_LEN + 1]).unwrap_err();
        assert!(matches!(err, Error::NoSpace));
    }

    #[test]
    fn boot_writes_boot_area() {
        let mut f = test_image("boot_writes_boot_area");
        f.set_len(REGION_SIZE * 4).unwrap();
        boot(&mut f, b"BOOTCODE").unwrap();
        let mut buf = [0u8; 8];
        crate::region::read_at(&mut f, crate::region::ByteOffset(0), &mut buf).unwrap();
        assert_eq!(&buf, b"BOOTCODE");
    }
}
