//! Directory codec: packs and unpacks entries inside directory-type
//! regions, grows a directory's chain when it runs out of room, and creates
//! new subdirectories.

use crate::alloc::find_free_region;
use crate::chain::{NEXT_OFFSET, RegionKind, next_region, set_next_region};
use crate::error::{Error, Result};
use crate::path::{split_path, traverse_directory};
use crate::region::{ByteOffset, RegionNum, read_region, write_at, write_region};
use crate::superblock::{DriveInformation, Partition};
use std::fs::File;

/// Offset at which a region's directory payload stops being searched for
/// entries; the continuation pointer lives at [`NEXT_OFFSET`] right after.
const PAYLOAD_END: usize = NEXT_OFFSET;
/// Bytes every live entry's fixed-size header occupies, not counting the
/// name and its terminator: 1 (type) + 8*3 (timestamps).
const ENTRY_HEADER_LEN: usize = 1 + 24;

/// One decoded entry inside a directory region.
#[derive(Debug, Clone)]
pub struct DirectoryEntry {
    pub name: Vec<u8>,
    pub last_accessed: u64,
    pub last_modified: u64,
    pub created: u64,
    pub region: RegionNum,
    pub is_directory: bool,
}

/// A directory's entries, as decoded from its (possibly multi-region)
/// chain.
#[derive(Debug, Clone)]
pub struct Directory {
    pub region: RegionNum,
    pub entries: Vec<DirectoryEntry>,
    /// Unknown entry-type bytes encountered while parsing; spec.md directs
    /// readers to warn and skip rather than fail outright. `ionicfs_core`
    /// never prints, so it hands these back for a caller (the `list`
    /// command) to report.
    pub warnings: Vec<String>,
}

/// Walks the directory chain starting at `start`, decoding every live
/// entry.
pub fn parse_directory(image: &mut File, start: RegionNum) -> Result<Directory> {
    let mut entries = Vec::new();
    let mut warnings = Vec::new();
    let mut current = start;
    loop {
        let buf = read_region(image, current)?;
        if buf[0] != RegionKind::Directory.tag() {
            return Err(Error::Corruption(format!(
                "region {} is not a directory region (type {:#04x})",
                current.0, buf[0]
            )));
        }

        let mut offset = 1usize;
        loop {
            if offset + ENTRY_HEADER_LEN > PAYLOAD_END {
                break;
            }
            let entry_type = buf[offset];
            match entry_type {
                0x00 => break,
                0x01 => offset += 1,
                0x02 | 0x03 => {
                    let is_directory = entry_type == 0x02;
                    let mut o = offset + 1;
                    let last_accessed = u64::from_le_bytes(buf[o..o + 8].try_into().unwrap());
                    o += 8;
                    let last_modified = u64::from_le_bytes(buf[o..o + 8].try_into().unwrap());
                    o += 8;
                    let created = u64::from_le_bytes(buf[o..o + 8].try_into().unwrap());
                    o += 8;

                    let name_start = o;
                    while o < PAYLOAD_END && buf[o] != 0 {
                        o += 1;
                    }
                    if o >= PAYLOAD_END {
                        return Err(Error::Corruption(
                            "directory entry name runs past region boundary".into(),
                        ));
                    }
                    let name = buf[name_start..o].to_vec();
                    o += 1; // name terminator

                    if o + 4 > PAYLOAD_END {
                        return Err(Error::Corruption(
                            "directory entry has no room for a region number".into(),
                        ));
                    }
                    let region = RegionNum(u32::from_le_bytes(buf[o..o + 4].try_into().unwrap()));
                    o += 4;

                    entries.push(DirectoryEntry {
                        name,
                        last_accessed,
                        last_modified,
                        created,
                        region,
                        is_directory,
                    });
                    offset = o;
                }
                other => {
                    warnings.push(format!(
                        "unknown entry type {other:#04x} at offset {offset} in region {}",
                        current.0
                    ));
                    offset += 1;
                }
            }
        }

        let next = next_region(&buf);
        if next.0 == 0 {
            break;
        }
        current = next;
    }
    Ok(Directory { region: start, entries, warnings })
}

/// Writes a directory entry's fixed-layout record (type, three identical
/// timestamps, name, terminator, region) at an absolute byte offset.
pub fn write_entry(
    image: &mut File,
    offset: ByteOffset,
    kind: RegionKind,
    now: u64,
    name: &[u8],
    region: RegionNum,
) -> Result<()> {
    let mut buf = Vec::with_capacity(1 + 24 + name.len() + 1 + 4);
    buf.push(kind.tag());
    buf.extend_from_slice(&now.to_le_bytes());
    buf.extend_from_slice(&now.to_le_bytes());
    buf.extend_from_slice(&now.to_le_bytes());
    buf.extend_from_slice(name);
    buf.push(0);
    buf.extend_from_slice(&region.0.to_le_bytes());
    write_at(image, offset, &buf)
}

/// Returns the entry size (bytes on disk) for a name of the given length.
pub fn entry_size(name_len: usize) -> usize {
    1 + 24 + name_len + 1 + 4
}

/// Finds a byte offset inside the directory chain starting at `start` where
/// an entry of at least `size_at_least` bytes can be written: the first
/// `EMPTY`/`DELETED` slot with enough room before the chain pointer at
/// offset 508. If the chain has no such slot, a new directory region is
/// allocated from `partition_index`, linked onto the chain, and its first
/// byte (offset 1) is returned.
pub fn find_free_directory_entry(
    image: &mut File,
    partition_index: usize,
    start: RegionNum,
    size_at_least: usize,
) -> Result<ByteOffset> {
    let mut current = start;
    loop {
        let buf = read_region(image, current)?;
        if buf[0] != RegionKind::Directory.tag() {
            return Err(Error::Corruption(format!(
                "region {} is not a directory region",
                current.0
            )));
        }

        let mut offset = 1usize;
        let mut free_slot = None;
        while offset < PAYLOAD_END {
            let entry_type = buf[offset];
            match entry_type {
                0x00 | 0x01 => {
                    free_slot = Some(offset);
                    break;
                }
                _ => {
                    let mut o = offset + ENTRY_HEADER_LEN;
                    while o < PAYLOAD_END && buf[o] != 0 {
                        o += 1;
                    }
                    offset = o + 1 + 4;
                }
            }
        }

        if let Some(slot) = free_slot {
            if slot + 1 + size_at_least <= PAYLOAD_END {
                return Ok(current.byte_offset().checked_add(slot as u64).unwrap());
            }
        }

        let next = next_region(&buf);
        if next.0 != 0 {
            current = next;
            continue;
        }

        let new_region = find_free_region(image, partition_index, &[])?;
        let mut patched = buf;
        set_next_region(&mut patched, new_region);
        write_region(image, current, &patched)?;

        let mut fresh = [0u8; crate::region::REGION_SIZE as usize];
        fresh[0] = RegionKind::Directory.tag();
        write_region(image, new_region, &fresh)?;

        return Ok(new_region.byte_offset().checked_add(1).unwrap());
    }
}

/// Tombstones the single entry named `name` in the directory chain starting
/// at `region`. Returns whether an entry was found and tombstoned.
pub fn eliminate_entry(image: &mut File, region: RegionNum, name: &[u8]) -> Result<bool> {
    let mut current = region;
    loop {
        let mut buf = read_region(image, current)?;
        if buf[0] != RegionKind::Directory.tag() {
            return Err(Error::Corruption(format!(
                "region {} is not a directory region",
                current.0
            )));
        }

        let mut offset = 1usize;
        while offset < PAYLOAD_END {
            let tag_offset = offset;
            let entry_type = buf[offset];
            match entry_type {
                0x00 => break,
                0x01 => offset += 1,
                _ => {
                    let name_start = offset + ENTRY_HEADER_LEN;
                    let mut o = name_start;
                    while o < PAYLOAD_END && buf[o] != 0 {
                        o += 1;
                    }
                    if &buf[name_start..o] == name {
                        buf[tag_offset] = RegionKind::Deleted.tag();
                        write_region(image, current, &buf)?;
                        return Ok(true);
                    }
                    offset = o + 1 + 4;
                }
            }
        }

        let next = next_region(&buf);
        if next.0 == 0 {
            return Ok(false);
        }
        current = next;
    }
}

/// Creates a subdirectory named by the final component of `dir_path`
/// (resolved against its parent within `partition_index`), writing the
/// directory's own self-entry `"."` as its first entry.
pub fn create_directory(
    image: &mut File,
    info: &DriveInformation,
    partition_index: usize,
    dir_path: &str,
    now: u64,
) -> Result<RegionNum> {
    let partition = info.partition(partition_index)?;
    if !partition.usable() {
        return Err(Error::NotFound);
    }

    let (parent_path, name) = split_path(dir_path);
    if name.is_empty() {
        return Err(Error::PathInvalid("directory name is empty".into()));
    }
    let parent_region = traverse_directory(image, parent_path, partition)?;

    let parent_dir = parse_directory(image, parent_region)?;
    if parent_dir.entries.iter().any(|e| e.name == name.as_bytes()) {
        return Err(Error::AlreadyExists);
    }

    let entry_offset = find_free_directory_entry(
        image,
        partition_index,
        parent_region,
        entry_size(name.len()),
    )?;
    let new_region = find_free_region(image, partition_index, &[])?;
    write_entry(image, entry_offset, RegionKind::Directory, now, name.as_bytes(), new_region)?;

    let mut fresh = [0u8; crate::region::REGION_SIZE as usize];
    fresh[0] = RegionKind::Directory.tag();
    write_region(image, new_region, &fresh)?;
    write_entry(
        image,
        new_region.byte_offset().checked_add(1).unwrap(),
        RegionKind::Directory,
        now,
        b".",
        new_region,
    )?;

    Ok(new_region)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::region::{REGION_SIZE, test_image};

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

    #[test]
    fn create_directory_writes_self_entry() {
        let mut f = test_image("create_directory_writes_self_entry");
        f.set_len(64 * REGION_SIZE).unwrap();
        let info = info_with_partition(RegionNum(2), 20);

        let mut root = [0u8; REGION_SIZE as usize];
        root[0] = RegionKind::Directory.tag();
        write_region(&mut f, RegionNum(2), &root).unwrap();

        let region = create_directory(&mut f, &info, 0, "docs", 1_000).unwrap();
        assert_ne!(region, RegionNum(2));

        let root_dir = parse_directory(&mut f, RegionNum(2)).unwrap();
        assert_eq!(root_dir.entries.len(), 1);
        assert_eq!(root_dir.entries[0].name, b"docs");
        assert!(root_dir.entries[0].is_directory);
        assert_eq!(root_dir.entries[0].region, region);

        let new_dir = parse_directory(&mut f, region).unwrap();
        assert_eq!(new_dir.entries.len(), 1);
        assert_eq!(new_dir.entries[0].name, b".");
        assert_eq!(new_dir.entries[0].region, region);
    }

    #[test]
    fn create_directory_rejects_duplicate_name() {
        let mut f = test_image("create_directory_rejects_duplicate_name");
        f.set_len(64 * REGION_SIZE).unwrap();
        let info = info_with_partition(RegionNum(2), 20);

        let mut root = [0u8; REGION_SIZE as usize];
        root[0] = RegionKind::Directory.tag();
        write_region(&mut f, RegionNum(2), &root).unwrap();

        create_directory(&mut f, &info, 0, "docs", 1_000).unwrap();
        let err = create_directory(&mut f, &info, 0, "docs", 1_000).unwrap_err();
        assert!(matches!(err, Error::AlreadyExists));
    }

    #[test]
    fn eliminate_entry_tombstones_matching_name() {
        let mut f = test_image("eliminate_entry_tombstones_matching_name");
        f.set_len(64 * REGION_SIZE).unwrap();
        let info = info_with_partition(RegionNum(2), 20);

        let mut root = [0u8; REGION_SIZE as usize];
        root[0] = RegionKind::Directory.tag();
        write_region(&mut f, RegionNum(2), &root).unwrap();
        create_directory(&mut f, &info, 0, "docs", 1_000).unwrap();

        assert!(eliminate_entry(&mut f, RegionNum(2), b"docs").unwrap());
        let root_dir = parse_directory(&mut f, RegionNum(2)).unwrap();
        assert!(root_dir.entries.is_empty());

        assert!(!eliminate_entry(&mut f, RegionNum(2), b"docs").unwrap());
    }

    #[test]
    fn find_free_directory_entry_grows_chain_when_full() {
        let mut f = test_image("find_free_directory_entry_grows_chain_when_full");
        f.set_len(64 * REGION_SIZE).unwrap();

        let mut root = [0u8; REGION_SIZE as usize];
        root[0] = RegionKind::Directory.tag();
        write_region(&mut f, RegionNum(2), &root).unwrap();

        // Fill the root region with a single oversized tombstone-free entry
        // so there's no room left for another: 450 bytes of name leaves only
        // 27 bytes free, less than entry_size(3) = 33.
        let name = vec![b'x'; 450];
        write_entry(&mut f, RegionNum(2).byte_offset().checked_add(1).unwrap(), RegionKind::File, 1, &name, RegionNum(5)).unwrap();

        let offset = find_free_directory_entry(&mut f, 0, RegionNum(2), entry_size(3)).unwrap();
        // Root region couldn't fit it; a new region must have been linked.
        assert_ne!(offset.0 / REGION_SIZE, RegionNum(2).byte_offset().0 / REGION_SIZE);
    }
}
