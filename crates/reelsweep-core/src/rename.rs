use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::backup::BackupManager;
use crate::config::{AppConfig, SafetyConfig};
use crate::error::{Error, Result};
use crate::executor::{Executor, OperationType};
use crate::media::is_video_file;
use crate::progress::ProgressTracker;
use crate::safety::{clean_path, resolve_symlinks, SafetyGate};
use crate::validation::validate_library_paths;

const INVALID_TITLE_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];
const MAX_TITLE_LEN: usize = 200;

lazy_static! {
    static ref SHOW_FOLDER: Regex = Regex::new(r"^(.+?)\s*\((\d{4})\)$").unwrap();
    static ref EPISODE_CODE: Regex = Regex::new(r"(?i)S\d{2}E\d{2}").unwrap();
}

pub fn validate_show_title(title: &str) -> Result<()> {
    if title.trim().is_empty() {
        return Err(Error::Validation("title cannot be empty".to_string()));
    }
    if title.contains(INVALID_TITLE_CHARS) {
        return Err(Error::Validation(
            "title contains invalid characters: < > : \" / \\ | ? *".to_string(),
        ));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(Error::Validation(format!(
            "title is too long (max {MAX_TITLE_LEN} characters)"
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RenamePreview {
    pub matching_folders: Vec<PathBuf>,
    pub target_paths: Vec<PathBuf>,
    pub episode_counts: Vec<usize>,
    pub total_episodes: usize,
    pub collision_warnings: Vec<String>,
    pub empty_folder_warnings: Vec<String>,
    pub can_proceed: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct RenameResult {
    pub old_path: PathBuf,
    pub new_path: PathBuf,
    pub is_folder: bool,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TvRenameOutcome {
    pub results: Vec<RenameResult>,
    /// Snapshot holding the renames, absent on dry runs.
    pub backup_id: Option<String>,
}

impl TvRenameOutcome {
    pub fn failures(&self) -> usize {
        self.results.iter().filter(|r| !r.success).count()
    }
}

struct ShowFolder {
    path: PathBuf,
    target: PathBuf,
}

/// Resolves `base` and finds the `Old Title (Year)` folders directly inside it.
fn matching_folders(
    base: &Path,
    old_title: &str,
    new_title: &str,
    gate: &SafetyGate,
) -> Result<(PathBuf, Vec<ShowFolder>)> {
    validate_show_title(new_title)?;
    let old_key = old_title.trim().to_lowercase();
    if old_key == new_title.trim().to_lowercase() {
        return Err(Error::Validation("old and new titles are the same".to_string()));
    }

    let base = resolve_symlinks(&clean_path(base)?);
    gate.check(&base)?;
    let meta = fs::metadata(&base)
        .map_err(|e| Error::Validation(format!("base path does not exist: {}: {e}", base.display())))?;
    if !meta.is_dir() {
        return Err(Error::Validation(format!(
            "base path is not a directory: {}",
            base.display()
        )));
    }

    let mut folders = Vec::new();
    let mut entries: Vec<_> = fs::read_dir(&base)?.filter_map(|e| e.ok()).collect();
    entries.sort_by_key(|e| e.file_name());
    for entry in entries {
        if !entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        let Some(caps) = SHOW_FOLDER.captures(&name) else {
            continue;
        };
        if caps[1].trim().to_lowercase() != old_key {
            continue;
        }
        folders.push(ShowFolder {
            path: entry.path(),
            target: base.join(format!("{} ({})", new_title.trim(), &caps[2])),
        });
    }

    if folders.is_empty() {
        return Err(Error::Validation(format!(
            "no folders matching '{}' found in {}",
            old_title,
            base.display()
        )));
    }
    Ok((base, folders))
}

fn episode_files(folder: &Path) -> Vec<PathBuf> {
    WalkDir::new(folder)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && is_video_file(e.path()))
        .filter(|e| EPISODE_CODE.is_match(&e.file_name().to_string_lossy()))
        .map(|e| e.into_path())
        .collect()
}

/// `Old.Show.S01E02.720p.mkv` becomes `New Show S01E02.720p.mkv`.
fn renamed_episode(file: &Path, old_title: &str, new_title: &str) -> Option<PathBuf> {
    let name = file.file_name()?.to_string_lossy().into_owned();
    let stem = file.file_stem()?.to_string_lossy().into_owned();
    let ext = file.extension().map(|e| e.to_string_lossy().into_owned());

    if !stem.to_lowercase().contains(&old_title.trim().to_lowercase()) {
        return None;
    }
    let code = EPISODE_CODE.find(&stem)?;
    let mut new_name = format!("{} {}{}", new_title.trim(), code.as_str(), &stem[code.end()..]);
    if let Some(ext) = ext {
        new_name.push('.');
        new_name.push_str(&ext);
    }
    if new_name == name {
        return None;
    }
    Some(file.with_file_name(new_name))
}

/// Lists what renaming `old_title` to `new_title` under `base` would touch.
pub fn preview_tv_rename(
    base: &Path,
    old_title: &str,
    new_title: &str,
    safety: &SafetyConfig,
) -> Result<RenamePreview> {
    let gate = SafetyGate::new(safety);
    let (_, folders) = matching_folders(base, old_title, new_title, &gate)?;

    let mut preview = RenamePreview::default();
    let mut claimed: Vec<&Path> = Vec::new();
    for folder in &folders {
        let episodes = episode_files(&folder.path).len();
        if episodes == 0 {
            preview.empty_folder_warnings.push(format!(
                "Folder contains no episode files: {}",
                folder.path.display()
            ));
        }
        if folder.target.exists() && folder.target != folder.path {
            preview.collision_warnings.push(format!(
                "Target path already exists: {}",
                folder.target.display()
            ));
        }
        if claimed.contains(&folder.target.as_path()) {
            preview.collision_warnings.push(format!(
                "Multiple folders would rename to same path: {}",
                folder.target.display()
            ));
        }
        claimed.push(&folder.target);

        preview.matching_folders.push(folder.path.clone());
        preview.target_paths.push(folder.target.clone());
        preview.episode_counts.push(episodes);
        preview.total_episodes += episodes;
    }
    preview.can_proceed = preview.collision_warnings.is_empty();
    Ok(preview)
}

/// Renames matching show folders and the episode files inside them.
///
/// Every rename goes through the executor. Live runs record into a `rename_` snapshot
/// so the whole rename can be reverted.
pub fn apply_tv_rename(
    base: &Path,
    old_title: &str,
    new_title: &str,
    config: &AppConfig,
    dry_run: bool,
    progress: Option<&ProgressTracker>,
) -> Result<TvRenameOutcome> {
    let dry_run = dry_run || config.safety.dry_run;
    let (base, folders) =
        matching_folders(base, old_title, new_title, &SafetyGate::new(&config.safety))?;
    validate_library_paths(&[base.to_string_lossy().into_owned()], true)?;

    let gate = SafetyGate::new(&config.safety).with_libraries([base.clone()]);
    let mut executor = Executor::new(&config.safety)
        .with_gate(gate)
        .with_dry_run(dry_run)
        .with_operation_log(config.operation_log_path());
    if !dry_run {
        let manager = BackupManager::new(config.backup_dir());
        let sources: Vec<PathBuf> = folders.iter().map(|f| f.path.clone()).collect();
        let snapshot = manager.create("rename", &sources)?;
        executor = executor.with_snapshot(manager, snapshot);
    }

    if let Some(progress) = progress {
        progress.start(
            folders.len(),
            &format!("Starting rename: {old_title} -> {new_title}"),
        );
    }

    let mut outcome = TvRenameOutcome::default();
    for (i, folder) in folders.iter().enumerate() {
        if folder.target.exists() && folder.target != folder.path {
            warn!("Target path already exists: {}", folder.target.display());
            outcome.results.push(RenameResult {
                old_path: folder.path.clone(),
                new_path: folder.target.clone(),
                is_folder: true,
                success: false,
                error: Some("target path already exists".to_string()),
            });
            continue;
        }

        for file in episode_files(&folder.path) {
            let Some(renamed) = renamed_episode(&file, old_title, new_title) else {
                continue;
            };
            let result = executor.move_file(&file, &renamed, OperationType::Rename);
            outcome.results.push(RenameResult {
                old_path: file,
                new_path: renamed,
                is_folder: false,
                success: result.is_ok(),
                error: result.err().map(|e| e.to_string()),
            });
        }

        let result = executor.move_file(&folder.path, &folder.target, OperationType::Rename);
        if let (Err(e), Some(progress)) = (&result, progress) {
            progress.log_error(
                Some(e),
                &format!("Failed to rename folder: {}", folder.path.display()),
            );
        }
        outcome.results.push(RenameResult {
            old_path: folder.path.clone(),
            new_path: folder.target.clone(),
            is_folder: true,
            success: result.is_ok(),
            error: result.err().map(|e| e.to_string()),
        });

        if let Some(progress) = progress {
            progress.update(i + 1, &folder.path.to_string_lossy());
        }
    }

    outcome.backup_id = executor.finish()?.map(|snapshot| snapshot.id);
    info!(
        "Rename {} -> {}: {} operations, {} failed",
        old_title,
        new_title,
        outcome.results.len(),
        outcome.failures()
    );
    if let Some(progress) = progress {
        progress.complete(&format!(
            "Rename complete: {} operations",
            outcome.results.len()
        ));
    }
    Ok(outcome)
}
