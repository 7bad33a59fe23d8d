//! The superblock: boot code, partition table, magic, and version.
//!
//! The encoded form is 518 bytes — 400 (boot code) + 4×26 (partition
//! records) + 5 (magic) + 9 (version) — six bytes past the end of region 0.
//! `format_disk` (in `format.rs`) starts the first partition at region 1
//! anyway; its root directory region overwrites those six spillover bytes,
//! which is harmless since `load_superblock` only reads the version string
//! up to its first `0x00`.

use crate::error::{Error, Result};
use crate::region::{ByteOffset, RegionNum, read_at, write_at};
use std::fs::File;

pub const BOOT_CODE_LEN: usize = 400;
pub const PARTITION_RECORD_LEN: usize = 26;
pub const PARTITION_NAME_LEN: usize = 18;
pub const NUM_PARTITIONS: usize = 4;
pub const MAGIC: &[u8; 5] = b"IONFS";
pub const VERSION_LEN: usize = 9;
pub const VERSION: &str = "001";

const MAGIC_OFFSET: u64 = (BOOT_CODE_LEN + NUM_PARTITIONS * PARTITION_RECORD_LEN) as u64;
const VERSION_OFFSET: u64 = MAGIC_OFFSET + MAGIC.len() as u64;
pub const SUPERBLOCK_ENCODED_LEN: u64 = VERSION_OFFSET + VERSION_LEN as u64;

/// One of the four partition slots recorded in the superblock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    pub name: [u8; PARTITION_NAME_LEN],
    pub region: RegionNum,
    pub size: u32,
}

impl Partition {
    pub fn empty() -> Self {
        Self {
            name: [0u8; PARTITION_NAME_LEN],
            region: RegionNum(0),
            size: 0,
        }
    }

    /// A partition with `size == 0` occupies no regions and is considered an
    /// unused slot.
    pub fn usable(&self) -> bool {
        self.size > 0
    }

    /// Builds a partition record from a host name string, space-padding and
    /// truncating to 17 significant bytes with a final `0x00`.
    pub fn named(name: &str, region: RegionNum, size: u32) -> Self {
        let mut bytes = [b' '; PARTITION_NAME_LEN];
        let src = name.as_bytes();
        let n = src.len().min(PARTITION_NAME_LEN - 1);
        bytes[..n].copy_from_slice(&src[..n]);
        bytes[PARTITION_NAME_LEN - 1] = 0;
        Self {
            name: bytes,
            region,
            size,
        }
    }

    /// The name with trailing padding/NUL stripped, as a display string.
    pub fn name_str(&self) -> String {
        let end = self.name.iter().position(|&b| b == 0).unwrap_or(self.name.len());
        String::from_utf8_lossy(&self.name[..end]).trim_end().to_string()
    }

    /// Half-open region range owned by this partition.
    pub fn range(&self) -> std::ops::Range<u32> {
        self.region.0..self.region.0 + self.size
    }

    /// Whether `region` lies within this partition's owned range.
    pub fn contains(&self, region: RegionNum) -> bool {
        self.range().contains(&region.0)
    }

    fn encode(&self) -> [u8; PARTITION_RECORD_LEN] {
        let mut buf = [0u8; PARTITION_RECORD_LEN];
        buf[..PARTITION_NAME_LEN].copy_from_slice(&self.name);
        buf[18..22].copy_from_slice(&self.region.0.to_le_bytes());
        buf[22..26].copy_from_slice(&self.size.to_le_bytes());
        buf
    }

    fn decode(buf: &[u8; PARTITION_RECORD_LEN]) -> Self {
        let mut name = [0u8; PARTITION_NAME_LEN];
        name.copy_from_slice(&buf[..PARTITION_NAME_LEN]);
        let region = RegionNum(u32::from_le_bytes(buf[18..22].try_into().unwrap()));
        let size = u32::from_le_bytes(buf[22..26].try_into().unwrap());
        Self { name, region, size }
    }
}

/// The parsed contents of region 0 (plus, logically, the six bytes it
/// spills into region 1).
#[derive(Debug, Clone)]
pub struct DriveInformation {
    pub partitions: [Partition; NUM_PARTITIONS],
    pub boot_code: [u8; BOOT_CODE_LEN],
    pub disk_size: u64,
    pub total_regions: u64,
    pub version: String,
}

impl DriveInformation {
    pub fn partition(&self, index: usize) -> Result<&Partition> {
        self.partitions
            .get(index)
            .ok_or_else(|| Error::ArgError(format!("invalid partition index {index}")))
    }
}

/// Writes the superblock: boot code, partition table, magic, and version.
/// `boot_code` is copied verbatim (callers zero-fill it on a fresh format).
pub fn format_superblock(
    image: &mut File,
    partitions: &[Partition; NUM_PARTITIONS],
    boot_code: &[u8; BOOT_CODE_LEN],
) -> Result<()> {
    write_at(image, ByteOffset(0), boot_code)?;
    for (i, part) in partitions.iter().enumerate() {
        let offset = ByteOffset((BOOT_CODE_LEN + i * PARTITION_RECORD_LEN) as u64);
        write_at(image, offset, &part.encode())?;
    }
    write_at(image, ByteOffset(MAGIC_OFFSET), MAGIC)?;
    let mut version = [0u8; VERSION_LEN];
    version[..VERSION.len()].copy_from_slice(VERSION.as_bytes());
    write_at(image, ByteOffset(VERSION_OFFSET), &version)?;
    Ok(())
}

/// Reads back the superblock written by [`format_superblock`], plus the
/// disk's size taken from the image file's length.
pub fn load_superblock(image: &mut File) -> Result<DriveInformation> {
    let disk_size = crate::disk::disk_size_bytes(image)?;
    let mut boot_code = [0u8; BOOT_CODE_LEN];
    read_at(image, ByteOffset(0), &mut boot_code)?;

    let mut partitions: [Partition; NUM_PARTITIONS] =
        std::array::from_fn(|_| Partition::empty());
    for (i, part) in partitions.iter_mut().enumerate() {
        let offset = ByteOffset((BOOT_CODE_LEN + i * PARTITION_RECORD_LEN) as u64);
        let mut buf = [0u8; PARTITION_RECORD_LEN];
        read_at(image, offset, &mut buf)?;
        *part = Partition::decode(&buf);
    }

    let mut magic = [0u8; 5];
    read_at(image, ByteOffset(MAGIC_OFFSET), &mut magic)?;
    if &magic != MAGIC {
        return Err(Error::BadSuperblock);
    }

    let mut version_buf = [0u8; VERSION_LEN];
    read_at(image, ByteOffset(VERSION_OFFSET), &mut version_buf)?;
    let end = version_buf.iter().position(|&b| b == 0).unwrap_or(VERSION_LEN);
    let version = String::from_utf8_lossy(&version_buf[..end]).into_owned();

    Ok(DriveInformation {
        partitions,
        boot_code,
        disk_size,
        total_regions: disk_size / crate::region::REGION_SIZE,
        version,
    })
}

/// Renders [`VERSION`] the way the original tool's `getVersion()` does:
/// `"001"` becomes `"0.0.1"`.
pub fn version_display() -> String {
    let bytes = VERSION.as_bytes();
    format!("{}.{}.{}", bytes[0] as char, bytes[1] as char, bytes[2] as char)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::region::test_image;

    #[test]
    fn round_trip() {
        let mut f = test_image("superblock_round_trip");
        f.set_len(2048 * 512).unwrap();
        let parts = [
            Partition::named("system", RegionNum(1), 512),
            Partition::named("data", RegionNum(513), 1024),
            Partition::empty(),
            Partition::empty(),
        ];
        format_superblock(&mut f, &parts, &[0u8; BOOT_CODE_LEN]).unwrap();

        let info = load_superblock(&mut f).unwrap();
        assert_eq!(info.disk_size, 2048 * 512);
        assert_eq!(info.total_regions, 2048);
        assert_eq!(info.version, "001");
        assert_eq!(info.partitions[0].name_str(), "system");
        assert_eq!(info.partitions[0].region, RegionNum(1));
        assert_eq!(info.partitions[0].size, 512);
        assert!(info.partitions[0].usable());
        assert_eq!(info.partitions[1].name_str(), "data");
        assert!(!info.partitions[2].usable());
        assert!(!info.partitions[3].usable());
    }

    #[test]
    fn bad_magic_is_bad_superblock() {
        let mut f = test_image("superblock_bad_magic");
        f.set_len(4096).unwrap();
        let err = load_superblock(&mut f).unwrap_err();
        assert!(matches!(err, Error::BadSuperblock));
    }

    #[test]
    fn encoded_len_is_518() {
        assert_eq!(SUPERBLOCK_ENCODED_LEN, 518);
    }
}
