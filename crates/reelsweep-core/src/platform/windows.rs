use std::fs::{Metadata, OpenOptions};
use std::path::Path;

use super::Ownership;

// NTFS ACLs are left alone: renames keep them.
pub fn ownership(_metadata: &Metadata) -> Option<Ownership> {
    None
}

pub fn set_ownership(_path: &Path, _owner: Ownership) -> std::io::Result<()> {
    Ok(())
}

// File ids are not exposed on stable; size and mtime are the closest match.
pub fn same_file(a: &Metadata, b: &Metadata) -> bool {
    a.len() == b.len() && a.modified().ok() == b.modified().ok() && a.created().ok() == b.created().ok()
}

pub fn private_file_options() -> OpenOptions {
    let mut options = OpenOptions::new();
    options.write(true).create(true);
    options
}
