use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::warn;

use crate::config::SafetyConfig;
use crate::error::SafetyError;
use crate::platform;

/// Lexically cleans `path`: drops `.` components and rejects `..` and relative paths.
pub fn clean_path(path: &Path) -> Result<PathBuf, SafetyError> {
    if !path.is_absolute() {
        return Err(SafetyError::NotAbsolute(path.to_path_buf()));
    }
    let mut cleaned = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => return Err(SafetyError::Traversal(path.to_path_buf())),
            other => cleaned.push(other.as_os_str()),
        }
    }
    Ok(cleaned)
}

/// Resolves symlinks in the longest existing prefix of `path` and re-appends the rest.
///
/// Works for destinations that do not exist yet.
pub fn resolve_symlinks(path: &Path) -> PathBuf {
    let mut existing = path;
    let mut missing: Vec<&std::ffi::OsStr> = Vec::new();
    loop {
        if let Ok(resolved) = fs::canonicalize(existing) {
            let mut result = resolved;
            for part in missing.iter().rev() {
                result.push(part);
            }
            return result;
        }
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                missing.push(name);
                existing = parent;
            }
            _ => return path.to_path_buf(),
        }
    }
}

/// Checks `target` sits strictly inside one of `roots`, comparing resolved paths.
pub fn validate_path_in_library(target: &Path, roots: &[PathBuf]) -> Result<PathBuf, SafetyError> {
    let resolved = resolve_symlinks(&clean_path(target)?);
    roots
        .iter()
        .map(|root| resolve_symlinks(root))
        .find(|root| resolved.starts_with(root) && resolved != *root)
        .ok_or(SafetyError::OutsideLibrary(target.to_path_buf()))
}

/// Last check before any mutating filesystem call.
#[derive(Debug, Clone)]
pub struct SafetyGate {
    protected_paths: Vec<PathBuf>,
    protected_roots: Vec<PathBuf>,
    min_depth: usize,
    libraries: Vec<PathBuf>,
}

impl SafetyGate {
    pub fn new(config: &SafetyConfig) -> Self {
        Self {
            protected_paths: with_resolved(&config.protected_paths),
            protected_roots: with_resolved(&config.protected_roots),
            min_depth: config.min_depth,
            libraries: Vec::new(),
        }
    }

    /// Restricts mutations to paths inside these library roots, which must be writable.
    pub fn with_libraries<I, P>(mut self, libraries: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.libraries = libraries.into_iter().map(Into::into).collect();
        self
    }

    pub fn min_depth(&self) -> usize {
        self.min_depth
    }

    /// Returns the symlink-resolved path when every check passes.
    pub fn check(&self, path: &Path) -> Result<PathBuf, SafetyError> {
        let cleaned = clean_path(path)?;
        let resolved = resolve_symlinks(&cleaned);

        for candidate in [&resolved, &cleaned] {
            if let Some(protected) = self
                .protected_paths
                .iter()
                .find(|p| candidate.starts_with(p))
            {
                warn!(
                    "Blocked operation on protected path {} ({})",
                    path.display(),
                    protected.display()
                );
                return Err(SafetyError::Protected {
                    path: path.to_path_buf(),
                    protected: protected.clone(),
                });
            }
        }

        if let Some(root) = self.protected_roots.iter().find(|r| **r == resolved) {
            return Err(SafetyError::Protected {
                path: path.to_path_buf(),
                protected: root.clone(),
            });
        }

        let depth = platform::path_depth(&resolved);
        if depth < self.min_depth {
            return Err(SafetyError::TooShallow {
                path: path.to_path_buf(),
                depth,
                min_depth: self.min_depth,
            });
        }

        if !self.libraries.is_empty() {
            let library = validate_path_in_library(&resolved, &self.libraries)?;
            let writable = fs::metadata(&library)
                .map(|m| !m.permissions().readonly())
                .unwrap_or(false);
            if !writable {
                return Err(SafetyError::NotWritable(library));
            }
        }

        Ok(resolved)
    }
}

/// Each configured path plus its canonical form when that differs.
fn with_resolved(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut all = Vec::with_capacity(paths.len());
    for path in paths {
        all.push(path.clone());
        if let Ok(resolved) = fs::canonicalize(path) {
            if resolved != *path {
                all.push(resolved);
            }
        }
    }
    all
}
