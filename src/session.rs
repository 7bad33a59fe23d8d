//! Command-scoped image session.
//!
//! The original tool reopens a `std::fstream` inside nearly every function
//! and treats the freshly loaded `DriveInformation` as if it were a
//! long-lived global. `Image` scopes the open file handle to a single
//! command invocation instead; every mutation still reloads the superblock
//! just before using it (invariant 7: `DriveInformation` is read-only after
//! load, never cached across a write).

use crate::error::{Error, Result};
use crate::superblock::{DriveInformation, load_superblock};
use std::fs::{File, OpenOptions};
use std::path::Path;

/// An open disk image, held for the duration of one command.
pub struct Image {
    file: File,
}

impl Image {
    /// Opens `path` for reading and writing, validating it's a regular
    /// file (or block/character device) with nonzero length before
    /// returning.
    pub fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::PathInvalid(format!("{} does not exist", path.display())));
        }
        if path.is_dir() {
            return Err(Error::PathInvalid(format!("{} is a directory", path.display())));
        }
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(Error::Io)?;
        if file.metadata().map_err(Error::Io)?.len() == 0 {
            return Err(Error::PathInvalid(format!("{} is empty", path.display())));
        }
        Ok(Self { file })
    }

    /// Mutable access to the underlying file; every region/superblock
    /// function operates on this.
    pub fn file_mut(&mut self) -> &mut File {
        &mut self.file
    }

    /// Reloads the superblock. Never cached: call this again after any
    /// mutation before reasoning about partition layout.
    pub fn load_superblock(&mut self) -> Result<DriveInformation> {
        load_superblock(&mut self.file)
    }
}
