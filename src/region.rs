//! Region-level I/O: the bottom layer every other module builds on.
//!
//! A region is a fixed 512-byte slot in the image file, addressed by its
//! region number. This module is the only place that turns a region number
//! into a byte offset (`region * 512`), and the only place that performs the
//! exact-512-byte reads and writes every higher layer assumes.

use crate::error::{Error, Result};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};

/// Size in bytes of a region.
pub const REGION_SIZE: u64 = 512;

/// A region number, distinct from a byte offset.
///
/// The on-disk format stores region numbers as little-endian `u32`; keeping
/// them in a dedicated type instead of a bare `u32` keeps region arithmetic
/// (`RegionNum + count`) from ever being mixed up with byte arithmetic
/// (`ByteOffset + count`), which is the bug class the original
/// implementation fell into by using `uint32_t` for both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RegionNum(pub u32);

impl RegionNum {
    /// The byte offset of the start of this region in the image file.
    pub fn byte_offset(self) -> ByteOffset {
        ByteOffset(self.0 as u64 * REGION_SIZE)
    }

    pub fn checked_add(self, n: u32) -> Option<RegionNum> {
        self.0.checked_add(n).map(RegionNum)
    }
}

impl From<u32> for RegionNum {
    fn from(n: u32) -> Self {
        RegionNum(n)
    }
}

/// An absolute byte offset into the image file.
///
/// Returned by [`crate::directory::find_free_directory_entry`], which
/// locates a byte within a region rather than a region as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ByteOffset(pub u64);

impl ByteOffset {
    pub fn checked_add(self, n: u64) -> Option<ByteOffset> {
        self.0.checked_add(n).map(ByteOffset)
    }
}

/// Reads the 512 bytes of `region` from `image`.
pub fn read_region(image: &mut File, region: RegionNum) -> Result<[u8; REGION_SIZE as usize]> {
    let mut buf = [0u8; REGION_SIZE as usize];
    image.seek(SeekFrom::Start(region.byte_offset().0))?;
    image.read_exact(&mut buf).map_err(io_to_engine_error)?;
    Ok(buf)
}

/// Writes `buf` as the full 512 bytes of `region` in `image`.
pub fn write_region(image: &mut File, region: RegionNum, buf: &[u8; REGION_SIZE as usize]) -> Result<()> {
    image.seek(SeekFrom::Start(region.byte_offset().0))?;
    image.write_all(buf)?;
    Ok(())
}

/// Reads `buf.len()` bytes starting at `offset`.
pub fn read_at(image: &mut File, offset: ByteOffset, buf: &mut [u8]) -> Result<()> {
    image.seek(SeekFrom::Start(offset.0))?;
    image.read_exact(buf).map_err(io_to_engine_error)?;
    Ok(())
}

/// Writes `buf` starting at `offset`.
pub fn write_at(image: &mut File, offset: ByteOffset, buf: &[u8]) -> Result<()> {
    image.seek(SeekFrom::Start(offset.0))?;
    image.write_all(buf)?;
    Ok(())
}

/// A short read past the end of the image means the region doesn't exist;
/// callers care about that distinction so it surfaces as `Corruption`
/// instead of a generic `Io`.
fn io_to_engine_error(e: std::io::Error) -> Error {
    if e.kind() == std::io::ErrorKind::UnexpectedEof {
        Error::Corruption("unexpected end of image".into())
    } else {
        Error::Io(e)
    }
}

#[cfg(test)]
pub(crate) fn test_image(tag: &str) -> File {
    use std::fs::OpenOptions;
    use std::sync::atomic::{AtomicU32, Ordering};
    static COUNTER: AtomicU32 = AtomicU32::new(0);
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    let path = std::env::temp_dir().join(format!(
        "ionicfs_test_{}_{tag}_{n}",
        std::process::id()
    ));
    OpenOptions::new()
        .create(true)
        .truncate(true)
        .read(true)
        .write(true)
        .open(path)
        .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let mut f = test_image("round_trip");
        f.set_len(4096).unwrap();
        let mut buf = [0u8; REGION_SIZE as usize];
        buf[0] = 0x03;
        buf[10] = 0xAB;
        write_region(&mut f, RegionNum(2), &buf).unwrap();
        let read_back = read_region(&mut f, RegionNum(2)).unwrap();
        assert_eq!(buf, read_back);
        // region 0 and 1 remain untouched (still zero)
        let other = read_region(&mut f, RegionNum(0)).unwrap();
        assert_eq!(other, [0u8; REGION_SIZE as usize]);
    }

    #[test]
    fn byte_offset_is_region_times_512() {
        assert_eq!(RegionNum(0).byte_offset().0, 0);
        assert_eq!(RegionNum(1).byte_offset().0, 512);
        assert_eq!(RegionNum(2048).byte_offset().0, 2048 * 512);
    }
}
