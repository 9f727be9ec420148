use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::{BatchError, Error, Result};
use crate::executor::{Operation, OperationType};
use crate::media::is_video_file;
use crate::platform;
use crate::safety::SafetyGate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackupStatus {
    InProgress,
    Completed,
    Reverted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    pub path: PathBuf,
    pub size: u64,
    pub modified: Option<DateTime<Utc>>,
}

/// Library file state plus the operations applied since it was captured.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupSnapshot {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub library_type: String,
    pub library_paths: Vec<PathBuf>,
    pub files: Vec<FileEntry>,
    pub operations: Vec<Operation>,
    pub status: BackupStatus,
}

impl BackupSnapshot {
    pub fn total_size(&self) -> u64 {
        self.files.iter().map(|f| f.size).sum()
    }
}

#[derive(Debug, Default, Clone, Serialize)]
pub struct IntegrityReport {
    pub checked: usize,
    pub missing: Vec<PathBuf>,
    pub size_changed: Vec<PathBuf>,
}

impl IntegrityReport {
    pub fn is_intact(&self) -> bool {
        self.missing.is_empty() && self.size_changed.is_empty()
    }
}

#[derive(Debug, Default, Clone, Serialize)]
pub struct RevertReport {
    pub reverted: usize,
    /// Deletions, whose content was never kept.
    pub not_revertible: usize,
    pub failed: usize,
    pub errors: Vec<BatchError>,
}

/// Snapshot store: one JSON file per snapshot id under a fixed directory.
#[derive(Debug, Clone)]
pub struct BackupManager {
    dir: PathBuf,
}

impl BackupManager {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, id: &str) -> Result<PathBuf> {
        if id.is_empty() || id.contains(['/', '\\']) || id.contains("..") {
            return Err(Error::Backup(format!("invalid backup id: {id}")));
        }
        Ok(self.dir.join(format!("{id}.json")))
    }

    fn next_id(&self, library_type: &str, now: DateTime<Utc>) -> Result<String> {
        let base = format!("{}_{}", library_type, now.format("%Y%m%d_%H%M%S"));
        let mut id = base.clone();
        let mut n = 2;
        while self.path_for(&id)?.exists() {
            id = format!("{base}_{n}");
            n += 1;
        }
        Ok(id)
    }

    /// Captures every video file under `paths` and persists the snapshot.
    pub fn create(&self, library_type: &str, paths: &[PathBuf]) -> Result<BackupSnapshot> {
        fs::create_dir_all(&self.dir)?;
        let now = Utc::now();
        let id = self.next_id(library_type, now)?;

        let mut files = Vec::new();
        for root in paths {
            for entry in WalkDir::new(root).sort_by_file_name() {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(e) => {
                        warn!("Skipping {} while capturing backup: {}", root.display(), e);
                        continue;
                    }
                };
                if !entry.file_type().is_file() || !is_video_file(entry.path()) {
                    continue;
                }
                match entry.metadata() {
                    Ok(meta) => files.push(FileEntry {
                        path: entry.path().to_path_buf(),
                        size: meta.len(),
                        modified: meta.modified().ok().map(DateTime::<Utc>::from),
                    }),
                    Err(e) => warn!("Error reading metadata for {}: {}", entry.path().display(), e),
                }
            }
        }

        let snapshot = BackupSnapshot {
            id,
            created_at: now,
            library_type: library_type.to_string(),
            library_paths: paths.to_vec(),
            files,
            operations: Vec::new(),
            status: BackupStatus::InProgress,
        };
        self.save(&snapshot)?;
        info!(
            "Created backup {} with {} files",
            snapshot.id,
            snapshot.files.len()
        );
        Ok(snapshot)
    }

    pub fn save(&self, snapshot: &BackupSnapshot) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(&snapshot.id)?;
        let json = serde_json::to_vec_pretty(snapshot)?;
        let mut file = platform::private_file_options().truncate(true).open(&path)?;
        file.write_all(&json)?;
        debug!("Saved backup {}", path.display());
        Ok(())
    }

    pub fn load(&self, id: &str) -> Result<BackupSnapshot> {
        let path = self.path_for(id)?;
        let bytes = fs::read(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Error::Backup(format!("backup not found: {id}")),
            _ => Error::Io(e),
        })?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// All readable snapshots, newest first.
    pub fn list(&self) -> Result<Vec<BackupSnapshot>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut snapshots = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let parsed = fs::read(&path)
                .map_err(Error::from)
                .and_then(|bytes| serde_json::from_slice::<BackupSnapshot>(&bytes).map_err(Error::from));
            match parsed {
                Ok(snapshot) => snapshots.push(snapshot),
                Err(e) => warn!("Ignoring unreadable backup {}: {}", path.display(), e),
            }
        }
        snapshots.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        Ok(snapshots)
    }

    pub fn delete(&self, id: &str) -> Result<()> {
        let path = self.path_for(id)?;
        fs::remove_file(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Error::Backup(format!("backup not found: {id}")),
            _ => Error::Io(e),
        })?;
        info!("Deleted backup {}", id);
        Ok(())
    }

    /// Re-stats every captured file.
    pub fn verify_integrity(&self, snapshot: &BackupSnapshot) -> IntegrityReport {
        let mut report = IntegrityReport {
            checked: snapshot.files.len(),
            ..IntegrityReport::default()
        };
        for entry in &snapshot.files {
            match fs::metadata(&entry.path) {
                Ok(meta) if meta.len() != entry.size => report.size_changed.push(entry.path.clone()),
                Ok(_) => {}
                Err(_) => report.missing.push(entry.path.clone()),
            }
        }
        report
    }

    pub fn record_operation(&self, snapshot: &mut BackupSnapshot, operation: Operation) -> Result<()> {
        snapshot.operations.push(operation);
        self.save(snapshot)
    }

    pub fn complete(&self, snapshot: &mut BackupSnapshot) -> Result<()> {
        snapshot.status = BackupStatus::Completed;
        self.save(snapshot)
    }

    /// Undoes the snapshot's completed moves and renames, newest first.
    ///
    /// A source that was dropped because its destination already linked to it is linked
    /// back, leaving the destination untouched.
    ///
    /// Deletions are counted as not revertible. A failed reversal is recorded and the
    /// rest are still attempted.
    pub fn revert(&self, snapshot: &mut BackupSnapshot, gate: &SafetyGate) -> Result<RevertReport> {
        if snapshot.status == BackupStatus::Reverted {
            return Err(Error::Backup(format!("backup {} was already reverted", snapshot.id)));
        }

        let mut report = RevertReport::default();
        for operation in snapshot.operations.iter().rev().filter(|op| op.completed) {
            let destination = match (operation.op_type, &operation.destination) {
                (OperationType::Delete, _) => {
                    report.not_revertible += 1;
                    continue;
                }
                (_, Some(destination)) => destination,
                (_, None) => {
                    report.failed += 1;
                    report.errors.push(BatchError::new(
                        &operation.source,
                        "operation has no destination",
                    ));
                    continue;
                }
            };
            let reverted = match operation.op_type {
                OperationType::Unlink => restore_link(&operation.source, destination, gate),
                _ => revert_move(&operation.source, destination, gate),
            };
            match reverted {
                Ok(()) => report.reverted += 1,
                Err(e) => {
                    warn!(
                        "Failed to revert {} -> {}: {}",
                        destination.display(),
                        operation.source.display(),
                        e
                    );
                    report.failed += 1;
                    report.errors.push(BatchError::new(destination, e));
                }
            }
        }

        snapshot.status = BackupStatus::Reverted;
        self.save(snapshot)?;
        info!(
            "Reverted backup {}: {} restored, {} failed, {} not revertible",
            snapshot.id, report.reverted, report.failed, report.not_revertible
        );
        Ok(report)
    }
}

fn prepare_original(original: &Path, current: &Path, gate: &SafetyGate) -> Result<()> {
    gate.check(original)?;
    gate.check(current)?;
    if original.exists() {
        return Err(Error::Other(format!(
            "original path is occupied: {}",
            original.display()
        )));
    }
    if let Some(parent) = original.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

/// Links `original` back to the file it was a hardlink of. `linked_to` stays in place.
fn restore_link(original: &Path, linked_to: &Path, gate: &SafetyGate) -> Result<()> {
    prepare_original(original, linked_to, gate)?;
    fs::hard_link(linked_to, original)?;
    Ok(())
}

fn revert_move(original: &Path, moved_to: &Path, gate: &SafetyGate) -> Result<()> {
    prepare_original(original, moved_to, gate)?;
    fs::rename(moved_to, original)?;

    if let Some(dir) = moved_to.parent() {
        let empty = fs::read_dir(dir)
            .map(|mut entries| entries.next().is_none())
            .unwrap_or(false);
        if empty && gate.check(dir).is_ok() {
            if let Err(e) = fs::remove_dir(dir) {
                debug!("Left empty directory {}: {}", dir.display(), e);
            }
        }
    }
    Ok(())
}
