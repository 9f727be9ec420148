#[cfg(unix)]
mod unix;
#[cfg(windows)]
mod windows;

use std::fs::{Metadata, OpenOptions};
use std::path::{Component, Path};

#[cfg(unix)]
use unix as imp;
#[cfg(windows)]
use windows as imp;

/// Owner and group of a file, captured before a move so they can be put back afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ownership {
    pub uid: u32,
    pub gid: u32,
}

impl Ownership {
    pub fn is_root(&self) -> bool {
        self.uid == 0 && self.gid == 0
    }
}

pub fn ownership(metadata: &Metadata) -> Option<Ownership> {
    imp::ownership(metadata)
}

pub fn set_ownership(path: &Path, owner: Ownership) -> std::io::Result<()> {
    imp::set_ownership(path, owner)
}

/// Write-only options for files only the current user may read (0600 on unix).
pub fn private_file_options() -> OpenOptions {
    imp::private_file_options()
}

/// True when both metadata describe the same underlying file (hardlinks included).
pub fn same_file(a: &Metadata, b: &Metadata) -> bool {
    imp::same_file(a, b)
}

/// Number of named components, ignoring the root and any drive prefix.
pub fn path_depth(path: &Path) -> usize {
    path.components()
        .filter(|c| matches!(c, Component::Normal(_)))
        .count()
}
