use glob::Pattern;
use std::fs::Metadata;
use std::path::Path;
use tracing::{error, warn};
use walkdir::WalkDir;

use super::CancelToken;
use crate::error::Error;
use crate::media::is_video_file;

pub fn compile_ignore_patterns(globs: &[String]) -> Vec<Pattern> {
    globs
        .iter()
        .filter_map(|glob| match Pattern::new(glob) {
            Ok(p) => Some(p),
            Err(e) => {
                error!("Invalid glob pattern '{}': {}", glob, e);
                None
            }
        })
        .collect()
}

fn is_ignored(path: &Path, ignore_patterns: &[Pattern]) -> bool {
    ignore_patterns
        .iter()
        .any(|pattern| pattern.matches_path(path))
}

/// Walks one library root on the calling thread and calls `visit` for every video file.
///
/// The root itself must be readable. Unreadable entries below it are logged and skipped.
/// Symlinks are not followed.
pub fn walk_library<F>(
    root: &Path,
    ignore_patterns: &[Pattern],
    cancel: &CancelToken,
    mut visit: F,
) -> Result<(), Error>
where
    F: FnMut(&Path, &Metadata),
{
    std::fs::metadata(root).map_err(|source| Error::LibraryInaccessible {
        path: root.to_path_buf(),
        source,
    })?;

    let walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !is_ignored(entry.path(), ignore_patterns));

    for entry in walker {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let entry = match entry {
            Ok(entry) => entry,
            Err(err) if err.depth() == 0 => {
                return Err(Error::LibraryInaccessible {
                    path: root.to_path_buf(),
                    source: err.into(),
                })
            }
            Err(err) => {
                warn!("Skipping unreadable entry under {}: {}", root.display(), err);
                continue;
            }
        };

        if !entry.file_type().is_file() || !is_video_file(entry.path()) {
            continue;
        }

        match entry.metadata() {
            Ok(metadata) => visit(entry.path(), &metadata),
            Err(err) => warn!("Error reading metadata for {}: {}", entry.path().display(), err),
        }
    }

    Ok(())
}

/// Video files under `roots`, for sizing progress bars.
pub fn count_video_files(roots: &[&Path], ignore_patterns: &[Pattern]) -> usize {
    let cancel = CancelToken::new();
    let mut count = 0;
    for root in roots {
        if let Err(err) = walk_library(root, ignore_patterns, &cancel, |_, _| count += 1) {
            warn!("Could not count files in {}: {}", root.display(), err);
        }
    }
    count
}
