//! Path resolution: splitting a slash-delimited path and walking directory
//! entries by name, one token at a time, from a partition's root.

use crate::directory::parse_directory;
use crate::error::{Error, Result};
use crate::region::RegionNum;
use crate::superblock::Partition;
use std::fs::File;

/// Resolves `path` to the region of the directory it names, starting from
/// `partition`'s root directory.
///
/// A leading `"./"` is stripped, the remainder is split on `/` into
/// non-empty tokens, and `"."` tokens are skipped. Each remaining token is
/// looked up by name among the current directory's entries; the entry must
/// be a subdirectory and its region must lie within `partition`'s owned
/// range, or resolution fails with [`Error::NotFound`] /
/// [`Error::Corruption`] respectively.
pub fn traverse_directory(image: &mut File, path: &str, partition: &Partition) -> Result<RegionNum> {
    let path = path.strip_prefix("./").unwrap_or(path);
    let mut current = partition.region;
    for token in path.split('/').filter(|t| !t.is_empty()) {
        if token == "." {
            continue;
        }
        let dir = parse_directory(image, current)?;
        let entry = dir
            .entries
            .iter()
            .find(|e| e.is_directory && e.name == token.as_bytes())
            .ok_or(Error::NotFound)?;
        if !partition.contains(entry.region) {
            return Err(Error::Corruption(format!(
                "region {} lies outside partition range",
                entry.region.0
            )));
        }
        current = entry.region;
    }
    Ok(current)
}

/// Splits a destination/source path into its parent directory path and its
/// final component, the way `std::path::Path::parent`/`file_name` would,
/// but operating on the filesystem's own `/`-delimited names rather than
/// host paths.
pub fn split_path(path: &str) -> (&str, &str) {
    let trimmed = path.trim_end_matches('/');
    match trimmed.rsplit_once('/') {
        Some((parent, name)) => (parent, name),
        None => ("", trimmed),
    }
}
