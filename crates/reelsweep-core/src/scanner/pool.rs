use glob::Pattern;
use rayon::ThreadPoolBuilder;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};
use tracing::debug;

use super::walk::{compile_ignore_patterns, walk_library};
use super::CancelToken;
use crate::compliance::LibraryFile;
use crate::duplicates::{DuplicateGroup, GroupMap};
use crate::error::{Error, Result};
use crate::media::{MediaFile, MediaKind};
use crate::progress::ProgressTracker;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Fixed-size worker pool over a queue of library roots.
///
/// Each worker takes one root at a time and walks it on its own thread. The first error
/// or cancellation seen by any worker wins and is returned after every worker has exited.
pub struct LibraryScanner {
    workers: usize,
    ignore_patterns: Vec<Pattern>,
    cancel: CancelToken,
}

impl LibraryScanner {
    pub fn new(workers: usize, ignore_globs: &[String]) -> Self {
        Self {
            workers: workers.max(1),
            ignore_patterns: compile_ignore_patterns(ignore_globs),
            cancel: CancelToken::new(),
        }
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    fn run<F>(&self, roots: &[PathBuf], work: F) -> Result<()>
    where
        F: Fn(&Path) -> Result<()> + Sync,
    {
        if roots.is_empty() {
            return Ok(());
        }

        let workers = self.workers.min(roots.len());
        let queue: Mutex<VecDeque<PathBuf>> = Mutex::new(roots.iter().cloned().collect());
        let first_error: OnceLock<Error> = OnceLock::new();

        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("reelsweep-scan-{i}"))
            .build()
            .map_err(|e| Error::Other(format!("failed to start scan workers: {e}")))?;

        pool.scope(|scope| {
            for _ in 0..workers {
                scope.spawn(|_| loop {
                    if first_error.get().is_some() {
                        break;
                    }
                    if self.cancel.is_cancelled() {
                        let _ = first_error.set(Error::Cancelled);
                        break;
                    }
                    let Some(root) = lock(&queue).pop_front() else {
                        break;
                    };
                    debug!("Walking {}", root.display());
                    if let Err(err) = work(&root) {
                        let _ = first_error.set(err);
                        break;
                    }
                });
            }
        });

        match first_error.into_inner() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Groups every video file under `roots` and returns the groups holding duplicates.
    ///
    /// Each walk fills a private map that is merged into the shared one when the root is
    /// finished, so the shared lock is taken once per root.
    pub fn scan_duplicates(
        &self,
        kind: MediaKind,
        roots: &[PathBuf],
        progress: Option<&ProgressTracker>,
    ) -> Result<Vec<DuplicateGroup>> {
        let shared = Mutex::new(GroupMap::new());
        let processed = AtomicUsize::new(0);

        self.run(roots, |root| {
            let mut local = GroupMap::new();
            walk_library(root, &self.ignore_patterns, &self.cancel, |path, metadata| {
                match kind {
                    MediaKind::Movie => local.add_movie(MediaFile::movie(path, metadata.len()), root),
                    MediaKind::Tv => {
                        local.add_episode(MediaFile::episode(path, metadata.len()), root);
                    }
                }
                let done = processed.fetch_add(1, Ordering::Relaxed) + 1;
                if let Some(progress) = progress {
                    progress.update(done, &path.to_string_lossy());
                }
            })?;
            lock(&shared).merge(local);
            Ok(())
        })?;

        let map = shared.into_inner().unwrap_or_else(PoisonError::into_inner);
        Ok(map.into_duplicates())
    }

    /// Every video file under `roots`, sorted by root then path.
    pub fn library_files(&self, roots: &[PathBuf]) -> Result<Vec<LibraryFile>> {
        let shared: Mutex<Vec<LibraryFile>> = Mutex::new(Vec::new());

        self.run(roots, |root| {
            let mut local = Vec::new();
            walk_library(root, &self.ignore_patterns, &self.cancel, |path, _| {
                local.push(LibraryFile {
                    root: root.to_path_buf(),
                    path: path.to_path_buf(),
                })
            })?;
            lock(&shared).extend(local);
            Ok(())
        })?;

        let mut files = shared.into_inner().unwrap_or_else(PoisonError::into_inner);
        files.sort();
        Ok(files)
    }
}
