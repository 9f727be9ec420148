use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::media::quick_count_videos;

const WRITE_PROBE: &str = ".reelsweep_write_test";
const SAMPLE_LIMIT: usize = 10;

#[derive(Debug, Clone, Serialize)]
pub struct PathValidation {
    pub path: String,
    pub error: String,
}

/// Outcome of the pre-flight check run before any scan or cleanup.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationReport {
    pub total_paths: usize,
    pub accessible_paths: Vec<PathBuf>,
    pub inaccessible: Vec<PathValidation>,
    pub warnings: Vec<String>,
    pub can_proceed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

fn check_path(path: &str, require_writable: bool) -> std::result::Result<PathBuf, String> {
    let resolved = fs::canonicalize(path).map_err(|e| format!("cannot resolve path: {e}"))?;
    let meta = fs::metadata(&resolved).map_err(|e| format!("cannot access path: {e}"))?;
    if !meta.is_dir() {
        return Err("path is not a directory".to_string());
    }
    fs::read_dir(&resolved).map_err(|e| format!("path is not readable: {e}"))?;
    if require_writable {
        probe_writable(&resolved).map_err(|e| format!("path is not writable: {e}"))?;
    }
    Ok(resolved)
}

fn probe_writable(dir: &Path) -> std::io::Result<()> {
    let probe = dir.join(WRITE_PROBE);
    fs::write(&probe, b"")?;
    fs::remove_file(&probe)
}

/// Checks every library path before work starts. Usable paths come back resolved.
///
/// Fails when no paths are given or none of them are usable.
pub fn validate_library_paths(paths: &[String], require_writable: bool) -> Result<ValidationReport> {
    if paths.is_empty() {
        return Err(Error::Validation("no library paths provided".to_string()));
    }

    let mut report = ValidationReport {
        total_paths: paths.len(),
        ..ValidationReport::default()
    };

    for path in paths {
        match check_path(path, require_writable) {
            Ok(resolved) => {
                let (count, _) = quick_count_videos(&resolved, SAMPLE_LIMIT);
                if count == 0 {
                    report
                        .warnings
                        .push(format!("Path contains no video files: {path}"));
                }
                debug!("Library {} is usable ({} sample videos)", path, count);
                report.accessible_paths.push(resolved);
            }
            Err(error) => {
                warn!("Library {} is not usable: {}", path, error);
                report.inaccessible.push(PathValidation {
                    path: path.clone(),
                    error,
                });
            }
        }
    }

    if report.accessible_paths.is_empty() {
        let message = format!(
            "no accessible paths found (checked {} paths)",
            report.total_paths
        );
        report.error_message = Some(message.clone());
        return Err(Error::Validation(message));
    }

    report.can_proceed = true;
    Ok(report)
}
