use std::fs::{Metadata, OpenOptions};
use std::os::unix::fs::{MetadataExt, OpenOptionsExt};
use std::path::Path;

use super::Ownership;

pub fn ownership(metadata: &Metadata) -> Option<Ownership> {
    Some(Ownership {
        uid: metadata.uid(),
        gid: metadata.gid(),
    })
}

pub fn set_ownership(path: &Path, owner: Ownership) -> std::io::Result<()> {
    std::os::unix::fs::chown(path, Some(owner.uid), Some(owner.gid))
}

pub fn same_file(a: &Metadata, b: &Metadata) -> bool {
    a.dev() == b.dev() && a.ino() == b.ino()
}

pub fn private_file_options() -> OpenOptions {
    let mut options = OpenOptions::new();
    options.write(true).create(true).mode(0o600);
    options
}
