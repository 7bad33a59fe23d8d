//! Disk sizing.
//!
//! `spec.md` only ever talks about a disk image as a regular file, but the
//! teacher's own `utils::disk::get_disk_size` also handles the case where
//! the path given is a block or character device (`BLKGETSIZE64`), whose
//! `metadata().len()` is meaningless. Kept here so pointing `ionicfs` at
//! `/dev/sdX` directly works the same way `fdisk`/`mkfs` already do.

use libc::ioctl;
use std::ffi::c_long;
use std::fs::File;
use std::io;
use std::os::fd::AsRawFd;
use std::os::unix::fs::FileTypeExt;

macro_rules! ioc {
    ($a:expr, $b:expr, $c:expr, $d:expr) => {
        (($a) << 30) | (($b) << 8) | ($c) | (($d) << 16)
    };
}

macro_rules! ior {
    ($a:expr, $b:expr, $c:ty) => {
        ioc!(2, $a, $b, std::mem::size_of::<$c>() as c_long)
    };
}

/// ioctl command: get the size of a block device, in bytes.
const BLKGETSIZE64: c_long = ior!(0x12, 114, u64);

/// Returns the size of `image` in bytes.
pub fn disk_size_bytes(image: &File) -> io::Result<u64> {
    let metadata = image.metadata()?;
    let file_type = metadata.file_type();
    if file_type.is_block_device() || file_type.is_char_device() {
        let mut size: u64 = 0;
        let ret = unsafe { ioctl(image.as_raw_fd(), BLKGETSIZE64 as _, &mut size) };
        if ret < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(size)
    } else {
        Ok(metadata.len())
    }
}
