//! File engine: copying a host file in, reading one back out, and removing
//! files and directories (recursively, for the latter).

use crate::alloc::find_free_region;
use crate::chain::{RegionKind, next_region, set_next_region};
use crate::directory::{entry_size, eliminate_entry, find_free_directory_entry, parse_directory, write_entry};
use crate::error::{Error, Result};
use crate::path::{split_path, traverse_directory};
use crate::region::{REGION_SIZE, RegionNum, read_region, write_region};
use crate::superblock::{DriveInformation, Partition};
use std::fs::File;

/// Bytes of file payload a single region carries (512 minus the 1-byte type
/// tag and the 4-byte continuation pointer).
pub const FILE_PAYLOAD_LEN: usize = 507;

/// Copies `data` into a new file named by the final component of
/// `dest_path`, creating its directory entry in `dest_path`'s parent.
/// Returns the first region of the new file's chain.
pub fn copy_file(
    image: &mut File,
    info: &DriveInformation,
    partition_index: usize,
    data: &[u8],
    dest_path: &str,
    now: u64,
) -> Result<RegionNum> {
    let partition = info.partition(partition_index)?;
    if !partition.usable() {
        return Err(Error::NotFound);
    }
    if data.is_empty() {
        return Err(Error::ArgError("source file is empty".into()));
    }

    let (parent_path, name) = split_path(dest_path);
    if name.is_empty() {
        return Err(Error::PathInvalid("destination name is empty".into()));
    }
    let parent_region = traverse_directory(image, parent_path, partition)?;

    let parent_dir = parse_directory(image, parent_region)?;
    if parent_dir.entries.iter().any(|e| e.name == name.as_bytes()) {
        return Err(Error::AlreadyExists);
    }

    let needed_regions = data.len().div_ceil(FILE_PAYLOAD_LEN);
    let mut regions = Vec::with_capacity(needed_regions);
    for _ in 0..needed_regions {
        let region = find_free_region(image, partition_index, &regions)?;
        regions.push(region);
    }

    for (i, &region) in regions.iter().enumerate() {
        let mut buf = [0u8; REGION_SIZE as usize];
        buf[0] = RegionKind::File.tag();
        let start = i * FILE_PAYLOAD_LEN;
        let end = (start + FILE_PAYLOAD_LEN).min(data.len());
        buf[1..1 + (end - start)].copy_from_slice(&data[start..end]);
        let next = regions.get(i + 1).copied().unwrap_or(RegionNum(0));
        set_next_region(&mut buf, next);
        write_region(image, region, &buf)?;
    }

    let entry_offset = find_free_directory_entry(
        image,
        partition_index,
        parent_region,
        entry_size(name.len()),
    )?;
    write_entry(image, entry_offset, RegionKind::File, now, name.as_bytes(), regions[0])?;

    Ok(regions[0])
}

/// Reads a file's full chain back into memory: `k` regions of up to 507
/// bytes each, concatenated in chain order. The final region's zero padding
/// (if `data.len()` isn't a multiple of 507) is included, since no file
/// length is stored on disk.
pub fn read_file(image: &mut File, partition: &Partition, file_path: &str) -> Result<Vec<u8>> {
    let (parent_path, name) = split_path(file_path);
    let parent_region = traverse_directory(image, parent_path, partition)?;
    let dir = parse_directory(image, parent_region)?;
    let entry = dir
        .entries
        .iter()
        .find(|e| !e.is_directory && e.name == name.as_bytes())
        .ok_or(Error::NotFound)?;

    let mut data = Vec::new();
    let mut current = entry.region;
    loop {
        let buf = read_region(image, current)?;
        if buf[0] != RegionKind::File.tag() {
            return Err(Error::Corruption(format!(
                "region {} is not a file region",
                current.0
            )));
        }
        data.extend_from_slice(&buf[1..1 + FILE_PAYLOAD_LEN]);
        let next = next_region(&buf);
        if next.0 == 0 {
            break;
        }
        current = next;
    }
    Ok(data)
}

/// Removes the directory entry named by the final component of `file_path`
/// and tombstones every region in the file's chain.
pub fn remove_file(image: &mut File, partition: &Partition, file_path: &str) -> Result<()> {
    let (parent_path, name) = split_path(file_path);
    let parent_region = traverse_directory(image, parent_path, partition)?;
    let dir = parse_directory(image, parent_region)?;
    let entry = dir
        .entries
        .iter()
        .find(|e| !e.is_directory && e.name == name.as_bytes())
        .ok_or(Error::NotFound)?;
    let region = entry.region;

    eliminate_entry(image, parent_region, name.as_bytes())?;
    tombstone_chain(image, region)
}

/// Removes a directory and everything under it: every file and
/// subdirectory's regions are tombstoned before the directory's own entry
/// is eliminated from its parent.
pub fn remove_directory(
    image: &mut File,
    info: &DriveInformation,
    partition_index: usize,
    dir_path: &str,
) -> Result<()> {
    let partition = info.partition(partition_index)?;
    if !partition.usable() {
        return Err(Error::NotFound);
    }

    let (parent_path, name) = split_path(dir_path);
    if name.is_empty() {
        return Err(Error::PathInvalid("directory name is empty".into()));
    }
    let parent_region = traverse_directory(image, parent_path, partition)?;
    let dir = parse_directory(image, parent_region)?;
    let entry = dir
        .entries
        .iter()
        .find(|e| e.is_directory && e.name == name.as_bytes())
        .ok_or(Error::NotFound)?;
    let target_region = entry.region;

    remove_recursive(image, target_region)?;
    eliminate_entry(image, parent_region, name.as_bytes())?;
    Ok(())
}

/// Tombstones every region the named directory and its contents occupy,
/// recursing into subdirectories first. The `.` self-entry is skipped
/// (it points back at the directory already being torn down).
fn remove_recursive(image: &mut File, region: RegionNum) -> Result<()> {
    let dir = parse_directory(image, region)?;
    for entry in &dir.entries {
        if entry.name == b"." {
            continue;
        }
        if entry.is_directory {
            remove_recursive(image, entry.region)?;
        } else {
            tombstone_chain(image, entry.region)?;
        }
    }
    tombstone_chain(image, region)
}

/// Walks a region chain from `start`, marking each region `DELETED` as it
/// goes. Works for both directory and file chains since the continuation
/// pointer lives at the same offset in either.
fn tombstone_chain(image: &mut File, start: RegionNum) -> Result<()> {
    let mut current = start;
    loop {
        let mut buf = read_region(image, current)?;
        let next = next_region(&buf);
        buf[0] = RegionKind::Deleted.tag();
        write_region(image, current, &buf)?;
        if next.0 == 0 {
            break;
        }
        current = next;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::create_directory;
    use crate::region::test_image;

    fn info_with_partition(region: RegionNum, size: u32) -> DriveInformation {
        DriveInformation {
            partitions: [
                Partition::named("system", region, size),
                Partition::empty(),
                Partition::empty(),
                Partition::empty(),
            ],
            boot_code: [0u8; crate::superblock::BOOT_CODE_LEN],
            disk_size: 0,
            total_regions: 0,
            version: "001".to_string(),
        }
    }

    fn make_root(f: &mut File, region: RegionNum) {
        let mut buf = [0u8; REGION_SIZE as usize];
        buf[0] = RegionKind::Directory.tag();
        write_region(f, region, &buf).unwrap();
    }

    #[test]
    fn copy_then_read_round_trips_small_file() {
        let mut f = test_image("copy_then_read_round_trips_small_file");
        f.set_len(64 * REGION_SIZE).unwrap();
        let info = info_with_partition(RegionNum(2), 30);
        make_root(&mut f, RegionNum(2));

        let data = b"hello, ionicfs";
        copy_file(&mut f, &info, 0, data, "hello.txt", 1_000).unwrap();

        let readback = read_file(&mut f, &info.partitions[0], "hello.txt").unwrap();
        assert_eq!(&readback[..data.len()], data);
        assert_eq!(readback.len(), FILE_PAYLOAD_LEN);
    }

    #[test]
    fn copy_spans_multiple_regions() {
        let mut f = test_image("copy_spans_multiple_regions");
        f.set_len(64 * REGION_SIZE).unwrap();
        let info = info_with_partition(RegionNum(2), 30);
        make_root(&mut f, RegionNum(2));

        let data = vec![0xABu8; FILE_PAYLOAD_LEN + 10];
        copy_file(&mut f, &info, 0, &data, "big.bin", 1_000).unwrap();

        let readback = read_file(&mut f, &info.partitions[0], "big.bin").unwrap();
        assert_eq!(readback.len(), FILE_PAYLOAD_LEN * 2);
        assert_eq!(&readback[..data.len()], data.as_slice());
    }

    #[test]
    fn copy_rejects_duplicate_name() {
        let mut f = test_image("copy_rejects_duplicate_name");
        f.set_len(64 * REGION_SIZE).unwrap();
        let info = info_with_partition(RegionNum(2), 30);
        make_root(&mut f, RegionNum(2));

        copy_file(&mut f, &info, 0, b"one", "x.txt", 1_000).unwrap();
        let err = copy_file(&mut f, &info, 0, b"two", "x.txt", 1_000).unwrap_err();
        assert!(matches!(err, Error::AlreadyExists));
    }

    #[test]
    fn copy_rejects_empty_source() {
        let mut f = test_image("copy_rejects_empty_source");
        f.set_len(64 * REGION_SIZE).unwrap();
        let info = info_with_partition(RegionNum(2), 30);
        make_root(&mut f, RegionNum(2));

        let err = copy_file(&mut f, &info, 0, b"", "x.txt", 1_000).unwrap_err();
        assert!(matches!(err, Error::ArgError(_)));
    }

    #[test]
    fn remove_file_tombstones_chain_and_entry() {
        let mut f = test_image("remove_file_tombstones_chain_and_entry");
        f.set_len(64 * REGION_SIZE).unwrap();
        let info = info_with_partition(RegionNum(2), 30);
        make_root(&mut f, RegionNum(2));

        let data = vec![0xCDu8; FILE_PAYLOAD_LEN + 1];
        let first_region = copy_file(&mut f, &info, 0, &data, "x.bin", 1_000).unwrap();

        remove_file(&mut f, &info.partitions[0], "x.bin").unwrap();

        let dir = parse_directory(&mut f, RegionNum(2)).unwrap();
        assert!(dir.entries.is_empty());

        let buf = read_region(&mut f, first_region).unwrap();
        assert_eq!(buf[0], RegionKind::Deleted.tag());
    }

    #[test]
    fn remove_directory_tombstones_nested_contents() {
        let mut f = test_image("remove_directory_tombstones_nested_contents");
        f.set_len(64 * REGION_SIZE).unwrap();
        let info = info_with_partition(RegionNum(2), 40);
        make_root(&mut f, RegionNum(2));

        let sub = create_directory(&mut f, &info, 0, "docs", 1_000).unwrap();
        let data = b"inside docs";
        let file_region = copy_file(&mut f, &info, 0, data, "docs/a.txt", 1_000).unwrap();

        remove_directory(&mut f, &info, 0, "docs").unwrap();

        let root_dir = parse_directory(&mut f, RegionNum(2)).unwrap();
        assert!(root_dir.entries.is_empty());

        let sub_buf = read_region(&mut f, sub).unwrap();
        assert_eq!(sub_buf[0], RegionKind::Deleted.tag());
        let file_buf = read_region(&mut f, file_region).unwrap();
        assert_eq!(file_buf[0], RegionKind::Deleted.tag());
    }

    #[test]
    fn read_missing_file_is_not_found() {
        let mut f = test_image("read_missing_file_is_not_found");
        f.set_len(64 * REGION_SIZE).unwrap();
        let info = info_with_partition(RegionNum(2), 30);
        make_root(&mut f, RegionNum(2));

        let err = read_file(&mut f, &info.partitions[0], "missing.txt").unwrap_err();
        assert!(matches!(err, Error::NotFound));
    }
}
