use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, error, info, warn};

use crate::backup::{BackupManager, BackupSnapshot};
use crate::compliance::{ComplianceIssue, SuggestedAction};
use crate::config::SafetyConfig;
use crate::error::{BatchError, Error, Result};
use crate::platform::{self, Ownership};
use crate::progress::{ProgressTracker, Severity};
use crate::safety::SafetyGate;

const BYTES_PER_GB: u64 = 1024 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationType {
    Delete,
    Rename,
    Move,
    /// Source removed because the destination was already a hardlink to it.
    Unlink,
}

impl OperationType {
    pub fn as_str(self) -> &'static str {
        match self {
            OperationType::Delete => "delete",
            OperationType::Rename => "rename",
            OperationType::Move => "move",
            OperationType::Unlink => "unlink",
        }
    }
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "delete" => Ok(OperationType::Delete),
            "rename" => Ok(OperationType::Rename),
            "move" => Ok(OperationType::Move),
            "unlink" => Ok(OperationType::Unlink),
            other => Err(Error::Other(format!("unknown operation type: {other}"))),
        }
    }
}

/// One filesystem mutation. Never changed after it is written to a log or snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    #[serde(rename = "type")]
    pub op_type: OperationType,
    pub source: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<PathBuf>,
    pub timestamp: DateTime<Utc>,
    pub completed: bool,
}

impl Operation {
    pub fn new(op_type: OperationType, source: &Path, destination: Option<&Path>) -> Self {
        Self {
            op_type,
            source: source.to_path_buf(),
            destination: destination.map(Path::to_path_buf),
            timestamp: Utc::now(),
            completed: false,
        }
    }

    /// `timestamp|type|source|destination`
    pub fn log_line(&self) -> String {
        format!(
            "{}|{}|{}|{}",
            self.timestamp.to_rfc3339(),
            self.op_type,
            self.source.display(),
            self.destination
                .as_deref()
                .map(|d| d.display().to_string())
                .unwrap_or_default()
        )
    }

    pub fn parse_log_line(line: &str) -> Result<Self> {
        let parts: Vec<&str> = line.splitn(4, '|').collect();
        let [timestamp, op_type, source, destination] = parts[..] else {
            return Err(Error::Other(format!("malformed operation log line: {line}")));
        };
        let timestamp = DateTime::parse_from_rfc3339(timestamp)
            .map_err(|e| Error::Other(format!("bad timestamp in operation log: {e}")))?
            .with_timezone(&Utc);
        Ok(Self {
            op_type: op_type.parse()?,
            source: PathBuf::from(source),
            destination: (!destination.is_empty()).then(|| PathBuf::from(destination)),
            timestamp,
            completed: true,
        })
    }
}

pub fn append_operation_log(log_path: &Path, operation: &Operation) -> Result<()> {
    if let Some(parent) = log_path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = platform::private_file_options().append(true).open(log_path)?;
    writeln!(file, "{}", operation.log_line())?;
    Ok(())
}

/// Every operation in the log, oldest first. A missing log reads as empty.
pub fn read_operation_log(log_path: &Path) -> Result<Vec<Operation>> {
    let contents = match fs::read_to_string(log_path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };
    contents
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(Operation::parse_log_line)
        .collect()
}

#[derive(Debug, Default, Clone, Serialize)]
pub struct ExecutionReport {
    pub dry_run: bool,
    pub deleted: usize,
    pub renamed: usize,
    pub moved: usize,
    pub bytes_freed: u64,
    pub errors: Vec<BatchError>,
    /// Snapshot the run was recorded into, absent on dry runs.
    pub backup_id: Option<String>,
}

impl ExecutionReport {
    pub fn succeeded(&self) -> usize {
        self.deleted + self.renamed + self.moved
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Applied {
    Moved,
    Unlinked,
}

/// Applies deletions and renames one at a time, in order.
///
/// Dry runs take exactly the same decisions and only skip the mutating calls.
pub struct Executor {
    gate: SafetyGate,
    dry_run: bool,
    max_delete_bytes: u64,
    operation_log: Option<PathBuf>,
    recording: Option<(BackupManager, BackupSnapshot)>,
}

impl Executor {
    pub fn new(config: &SafetyConfig) -> Self {
        Self {
            gate: SafetyGate::new(config),
            dry_run: config.dry_run,
            max_delete_bytes: config.max_delete_gb.saturating_mul(BYTES_PER_GB),
            operation_log: None,
            recording: None,
        }
    }

    pub fn with_gate(mut self, gate: SafetyGate) -> Self {
        self.gate = gate;
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_operation_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.operation_log = Some(path.into());
        self
    }

    /// Records every operation into `snapshot` as it happens.
    pub fn with_snapshot(mut self, manager: BackupManager, snapshot: BackupSnapshot) -> Self {
        self.recording = Some((manager, snapshot));
        self
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Marks the recorded snapshot completed and hands it back.
    pub fn finish(self) -> Result<Option<BackupSnapshot>> {
        match self.recording {
            Some((manager, mut snapshot)) => {
                manager.complete(&mut snapshot)?;
                Ok(Some(snapshot))
            }
            None => Ok(None),
        }
    }

    fn record(&mut self, mut operation: Operation, completed: bool) {
        operation.completed = completed;
        if self.dry_run {
            return;
        }
        if completed {
            if let Some(log_path) = &self.operation_log {
                if let Err(e) = append_operation_log(log_path, &operation) {
                    error!("Failed to write operation log {}: {}", log_path.display(), e);
                }
            }
        }
        if let Some((manager, snapshot)) = self.recording.as_mut() {
            if let Err(e) = manager.record_operation(snapshot, operation) {
                error!("Failed to record operation in backup {}: {}", snapshot.id, e);
            }
        }
    }

    /// Deletes one file and returns its size.
    pub fn delete_file(&mut self, path: &Path) -> Result<u64> {
        self.gate.check(path)?;
        let size = fs::symlink_metadata(path)?.len();
        let operation = Operation::new(OperationType::Delete, path, None);

        if self.dry_run {
            info!("[dry run] would delete {}", path.display());
        } else if let Err(e) = fs::remove_file(path) {
            self.record(operation, false);
            return Err(e.into());
        } else {
            debug!("Deleted {}", path.display());
        }

        self.record(operation, true);
        Ok(size)
    }

    /// Renames or moves `source` to `destination`, creating missing directories.
    ///
    /// An existing destination that is the same file as `source` (a hardlink) makes the
    /// source redundant, so it is removed instead. Any other existing destination fails.
    pub fn move_file(
        &mut self,
        source: &Path,
        destination: &Path,
        op_type: OperationType,
    ) -> Result<()> {
        self.gate.check(source)?;
        self.gate.check(destination)?;
        let mut operation = Operation::new(op_type, source, Some(destination));
        match self.apply_move(source, destination) {
            Ok(applied) => {
                if applied == Applied::Unlinked {
                    operation.op_type = OperationType::Unlink;
                }
                self.record(operation, true);
                Ok(())
            }
            Err(e) => {
                self.record(operation, false);
                Err(e)
            }
        }
    }

    fn apply_move(&self, source: &Path, destination: &Path) -> Result<Applied> {
        let source_meta = fs::metadata(source)?;
        let hardlinked = match fs::metadata(destination) {
            Ok(dest_meta) if platform::same_file(&source_meta, &dest_meta) => true,
            Ok(_) => {
                return Err(Error::Other(format!(
                    "target file already exists: {}",
                    destination.display()
                )))
            }
            Err(_) => false,
        };
        let applied = if hardlinked {
            Applied::Unlinked
        } else {
            Applied::Moved
        };

        if self.dry_run {
            info!(
                "[dry run] would move {} -> {}",
                source.display(),
                destination.display()
            );
            return Ok(applied);
        }

        if hardlinked {
            info!(
                "{} is already linked at {}, removing the duplicate",
                source.display(),
                destination.display()
            );
            fs::remove_file(source)?;
        } else {
            let owner = platform::ownership(&source_meta);
            if let Some(dest_dir) = destination.parent() {
                self.create_dirs(dest_dir)?;
            }
            fs::rename(source, destination)?;
            if let Some(owner) = owner.filter(|o| !o.is_root()) {
                if let Err(e) = platform::set_ownership(destination, owner) {
                    warn!("Could not restore ownership of {}: {}", destination.display(), e);
                }
            }
        }

        if let Some(source_dir) = source.parent() {
            if self.remove_if_empty(source_dir) {
                if let Some(grandparent) = source_dir.parent() {
                    self.remove_if_empty(grandparent);
                }
            }
        }
        Ok(applied)
    }

    /// Creates `dir` and its missing ancestors, handing new ones to the owner of the
    /// nearest existing ancestor.
    fn create_dirs(&self, dir: &Path) -> Result<()> {
        let mut missing = Vec::new();
        let mut existing = dir;
        while !existing.exists() {
            missing.push(existing.to_path_buf());
            match existing.parent() {
                Some(parent) => existing = parent,
                None => break,
            }
        }
        if missing.is_empty() {
            return Ok(());
        }

        fs::create_dir_all(dir)?;
        let owner: Option<Ownership> = fs::metadata(existing)
            .ok()
            .and_then(|m| platform::ownership(&m));
        if let Some(owner) = owner {
            for created in missing.iter().rev() {
                if let Err(e) = platform::set_ownership(created, owner) {
                    warn!("Could not set ownership of {}: {}", created.display(), e);
                }
            }
        }
        Ok(())
    }

    /// Removes `dir` when it is empty and the gate allows it.
    fn remove_if_empty(&self, dir: &Path) -> bool {
        let empty = fs::read_dir(dir)
            .map(|mut entries| entries.next().is_none())
            .unwrap_or(false);
        if !empty || self.gate.check(dir).is_err() {
            return false;
        }
        match fs::remove_dir(dir) {
            Ok(()) => {
                debug!("Removed empty directory {}", dir.display());
                true
            }
            Err(e) => {
                warn!("Could not remove empty directory {}: {}", dir.display(), e);
                false
            }
        }
    }

    /// Fails when the files in `deletions` add up to more than the configured ceiling.
    pub fn check_delete_ceiling(&self, deletions: &[PathBuf]) -> Result<()> {
        let requested: u64 = deletions
            .iter()
            .filter_map(|p| fs::symlink_metadata(p).ok())
            .map(|m| m.len())
            .sum();
        if requested > self.max_delete_bytes {
            return Err(Error::SizeLimitExceeded {
                requested_gb: requested / BYTES_PER_GB,
                limit_gb: self.max_delete_bytes / BYTES_PER_GB,
            });
        }
        Ok(())
    }

    /// Deletes `deletions`, then applies `issues`.
    ///
    /// The total size of `deletions` is checked against the ceiling before anything is
    /// touched. Items that fail are collected into the report and the batch carries on.
    pub fn execute_plan(
        &mut self,
        deletions: &[PathBuf],
        issues: &[ComplianceIssue],
        progress: Option<&ProgressTracker>,
    ) -> Result<ExecutionReport> {
        self.check_delete_ceiling(deletions)?;

        let total = deletions.len() + issues.len();
        if let Some(progress) = progress {
            progress.start(total, "Applying changes");
        }
        let mut report = ExecutionReport {
            dry_run: self.dry_run,
            ..ExecutionReport::default()
        };

        for (i, path) in deletions.iter().enumerate() {
            match self.delete_file(path) {
                Ok(size) => {
                    report.deleted += 1;
                    report.bytes_freed += size;
                }
                Err(e) => {
                    error!("Failed to delete {}: {}", path.display(), e);
                    if let Some(progress) = progress {
                        progress
                            .log_error(Some(&e), &format!("Failed to delete {}", path.display()));
                    }
                    report.errors.push(BatchError::new(path, e));
                }
            }
            if let Some(progress) = progress {
                progress.update(i + 1, &path.to_string_lossy());
            }
        }

        for (i, issue) in issues.iter().enumerate() {
            let op_type = match issue.action {
                SuggestedAction::Rename => OperationType::Rename,
                SuggestedAction::Reorganize => OperationType::Move,
                SuggestedAction::ManualReview => {
                    report.errors.push(BatchError::new(
                        &issue.path,
                        format!(
                            "skipped (needs manual review): {} - {}",
                            issue.path.display(),
                            issue.problem
                        ),
                    ));
                    continue;
                }
            };
            match self.move_file(&issue.path, &issue.suggested_path, op_type) {
                Ok(()) if op_type == OperationType::Rename => report.renamed += 1,
                Ok(()) => report.moved += 1,
                Err(e) => {
                    error!("Failed to {} {}: {}", op_type, issue.path.display(), e);
                    if let Some(progress) = progress {
                        progress.log_error(
                            Some(&e),
                            &format!("Failed to {} {}", op_type, issue.path.display()),
                        );
                    }
                    report.errors.push(BatchError::new(&issue.path, e));
                }
            }
            if let Some(progress) = progress {
                progress.update(deletions.len() + i + 1, &issue.path.to_string_lossy());
            }
        }

        let summary = format!(
            "{} deleted, {} renamed, {} moved, {} errors",
            report.deleted,
            report.renamed,
            report.moved,
            report.errors.len()
        );
        info!("Execution finished: {}", summary);
        if let Some(progress) = progress {
            if report.errors.is_empty() {
                progress.complete(&summary);
            } else {
                progress.send_immediate(Severity::Warn, &summary);
            }
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn safety(dir: &Path) -> SafetyConfig {
        SafetyConfig {
            protected_paths: vec![dir.join("protected")],
            protected_roots: vec![PathBuf::from("/")],
            min_depth: 2,
            ..SafetyConfig::default()
        }
    }

    #[test]
    fn test_log_line_round_trip() {
        let op = Operation::new(
            OperationType::Move,
            Path::new("/mnt/media/movies/a.mkv"),
            Some(Path::new("/mnt/media/movies/A (2001)/A (2001).mkv")),
        );
        let parsed = Operation::parse_log_line(&op.log_line()).unwrap();
        assert_eq!(parsed.op_type, OperationType::Move);
        assert_eq!(parsed.destination, op.destination);
        assert!(Operation::parse_log_line("garbage").is_err());
    }

    #[test]
    fn test_delete_logs_operation() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("lib/Heat (1995)/Heat.mkv");
        fs::create_dir_all(file.parent().unwrap()).unwrap();
        fs::write(&file, b"12345").unwrap();
        let log = dir.path().join("data/operations.log");

        let mut executor = Executor::new(&safety(dir.path())).with_operation_log(&log);
        assert_eq!(executor.delete_file(&file).unwrap(), 5);
        assert!(!file.exists());

        let ops = read_operation_log(&log).unwrap();
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].op_type, OperationType::Delete);
        assert_eq!(ops[0].destination, None);
    }

    #[test]
    fn test_dry_run_touches_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("lib/Heat.1995.mkv");
        fs::create_dir_all(file.parent().unwrap()).unwrap();
        fs::write(&file, b"x").unwrap();
        let target = dir.path().join("lib/Heat (1995)/Heat (1995).mkv");
        let log = dir.path().join("operations.log");

        let mut executor = Executor::new(&safety(dir.path()))
            .with_dry_run(true)
            .with_operation_log(&log);
        executor.move_file(&file, &target, OperationType::Move).unwrap();
        executor.delete_file(&file).unwrap();
        assert!(file.exists());
        assert!(!target.exists());
        assert!(!log.exists());
    }

    #[test]
    fn test_move_creates_dirs_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let lib = dir.path().join("lib");
        let source = lib.join("Heat.1995.1080p-GRP/heat.mkv");
        fs::create_dir_all(source.parent().unwrap()).unwrap();
        fs::write(&source, b"x").unwrap();
        let target = lib.join("Heat (1995)/Heat (1995).mkv");

        let mut executor = Executor::new(&safety(dir.path()));
        executor.move_file(&source, &target, OperationType::Move).unwrap();
        assert!(target.exists());
        assert!(!source.parent().unwrap().exists());
        assert!(lib.exists());
    }

    #[test]
    fn test_existing_target_is_a_collision() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("lib/a/one.mkv");
        let target = dir.path().join("lib/b/two.mkv");
        for p in [&source, &target] {
            fs::create_dir_all(p.parent().unwrap()).unwrap();
            fs::write(p, b"x").unwrap();
        }
        let mut executor = Executor::new(&safety(dir.path()));
        let err = executor
            .move_file(&source, &target, OperationType::Move)
            .unwrap_err();
        assert!(err.to_string().contains("target file already exists"));
        assert!(source.exists());
    }

    #[test]
    fn test_hardlinked_target_removes_source() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("lib/a/one.mkv");
        let target = dir.path().join("lib/b/two.mkv");
        fs::create_dir_all(source.parent().unwrap()).unwrap();
        fs::create_dir_all(target.parent().unwrap()).unwrap();
        fs::write(&source, b"x").unwrap();
        fs::hard_link(&source, &target).unwrap();

        let log = dir.path().join("data/operations.log");
        let mut executor = Executor::new(&safety(dir.path())).with_operation_log(&log);
        executor.move_file(&source, &target, OperationType::Move).unwrap();
        assert!(!source.exists());
        assert!(target.exists());
        let ops = read_operation_log(&log).unwrap();
        assert_eq!(ops[0].op_type, OperationType::Unlink);
    }

    #[test]
    fn test_size_ceiling_aborts_before_mutation() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("lib/a.mkv");
        fs::create_dir_all(file.parent().unwrap()).unwrap();
        fs::write(&file, b"x").unwrap();

        let mut config = safety(dir.path());
        config.max_delete_gb = 0;
        let mut executor = Executor::new(&config);
        let err = executor.execute_plan(&[file.clone()], &[], None).unwrap_err();
        assert!(matches!(err, Error::SizeLimitExceeded { .. }));
        assert!(file.exists());
    }

    #[test]
    fn test_protected_failure_does_not_stop_batch() {
        let dir = tempfile::tempdir().unwrap();
        let blocked = dir.path().join("protected/keep.mkv");
        let allowed = dir.path().join("lib/gone.mkv");
        for p in [&blocked, &allowed] {
            fs::create_dir_all(p.parent().unwrap()).unwrap();
            fs::write(p, b"x").unwrap();
        }

        let mut executor = Executor::new(&safety(dir.path()));
        let report = executor
            .execute_plan(&[blocked.clone(), allowed.clone()], &[], None)
            .unwrap();
        assert_eq!(report.deleted, 1);
        assert_eq!(report.errors.len(), 1);
        assert!(blocked.exists());
        assert!(!allowed.exists());
    }

    #[test]
    fn test_manual_review_issues_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lib/x.mkv");
        let issue = ComplianceIssue {
            path: path.clone(),
            kind: crate::media::MediaKind::Movie,
            problem: "COLLISION".to_string(),
            suggested_path: dir.path().join("lib/X/x.mkv"),
            action: SuggestedAction::ManualReview,
        };
        let mut executor = Executor::new(&safety(dir.path()));
        let report = executor.execute_plan(&[], &[issue], None).unwrap();
        assert_eq!(report.succeeded(), 0);
        assert!(report.errors[0].message.starts_with("skipped (needs manual review)"));
    }
}
