//! Region allocator: linear first-byte scan for a reusable region within a
//! partition.

use crate::error::{Error, Result};
use crate::region::{RegionNum, read_at};
use crate::superblock::{Partition, load_superblock};
use std::fs::File;

/// Scans `partition`'s owned range for the first region whose type byte is
/// `EMPTY` or `DELETED` and is not in `excluded`.
pub fn find_free_region_in(
    image: &mut File,
    partition: &Partition,
    excluded: &[RegionNum],
) -> Result<RegionNum> {
    for raw in partition.range() {
        let region = RegionNum(raw);
        if excluded.contains(&region) {
            continue;
        }
        let mut byte = [0u8; 1];
        read_at(image, region.byte_offset(), &mut byte)?;
        if byte[0] == crate::chain::RegionKind::Empty.tag()
            || byte[0] == crate::chain::RegionKind::Deleted.tag()
        {
            return Ok(region);
        }
    }
    Err(Error::NoSpace)
}

/// Like [`find_free_region_in`], but loads the partition table fresh first.
/// Used by call sites that only have a partition index on hand (directory
/// growth, mostly) rather than an already-loaded [`Partition`].
pub fn find_free_region(
    image: &mut File,
    partition_index: usize,
    excluded: &[RegionNum],
) -> Result<RegionNum> {
    let info = load_superblock(image)?;
    let partition = info.partition(partition_index)?.clone();
    find_free_region_in(image, &partition, excluded)
}
