use config::{Config, ConfigError, Environment, File as ConfigFile};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Error;
use crate::progress::LogLevel;

pub const DEFAULT_MAX_DELETE_GB: u64 = 3000;

const SCAN_FREQUENCIES: &[&str] = &["daily", "weekly", "biweekly"];

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    /// Holds `backups/` and `operations.log`. Defaults to the platform data directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
    pub libraries: LibrariesConfig,
    pub daemon: DaemonConfig,
    pub metadata: MetadataConfig,
    pub scan: ScanConfig,
    pub safety: SafetyConfig,
    pub progress: ProgressConfig,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct LibrariesConfig {
    pub movies: LibraryPaths,
    pub tv: LibraryPaths,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct LibraryPaths {
    pub paths: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DaemonConfig {
    pub scan_frequency: String,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            scan_frequency: "weekly".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MetadataConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tvdb_api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub omdb_api_key: Option<String>,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            tvdb_api_key: None,
            omdb_api_key: None,
            timeout_secs: 10,
            max_retries: 3,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ScanConfig {
    /// 0 means one worker per logical CPU.
    pub workers: usize,
    pub ignore_patterns: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SafetyConfig {
    pub max_delete_gb: u64,
    /// Nothing at or below these paths is ever touched.
    pub protected_paths: Vec<PathBuf>,
    /// These exact paths are never touched, but their descendants may be.
    pub protected_roots: Vec<PathBuf>,
    pub min_depth: usize,
    pub dry_run: bool,
}

impl Default for SafetyConfig {
    fn default() -> Self {
        let protected_paths = [
            "/usr", "/etc", "/bin", "/sbin", "/boot", "/sys", "/proc", "/dev", "/run", "/lib",
            "/lib32", "/lib64", "/libx32", "/var", "/opt", "/srv", "/root",
            "C:\\Windows", "C:\\Program Files", "C:\\Program Files (x86)",
        ];
        let protected_roots = ["/", "/mnt", "/home", "/usr", "/etc", "/var", "/tmp", "/opt"];
        Self {
            max_delete_gb: DEFAULT_MAX_DELETE_GB,
            protected_paths: protected_paths.iter().map(PathBuf::from).collect(),
            protected_roots: protected_roots.iter().map(PathBuf::from).collect(),
            min_depth: 3,
            dry_run: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProgressConfig {
    pub log_level: LogLevel,
    pub min_interval_ms: u64,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Normal,
            min_interval_ms: 200,
        }
    }
}

impl AppConfig {
    pub fn movie_paths(&self) -> &[String] {
        &self.libraries.movies.paths
    }

    pub fn tv_paths(&self) -> &[String] {
        &self.libraries.tv.paths
    }

    pub fn all_library_paths(&self) -> Vec<String> {
        self.movie_paths()
            .iter()
            .chain(self.tv_paths())
            .cloned()
            .collect()
    }

    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(default_data_dir)
    }

    pub fn backup_dir(&self) -> PathBuf {
        self.data_dir().join("backups")
    }

    pub fn operation_log_path(&self) -> PathBuf {
        self.data_dir().join("operations.log")
    }

    pub fn worker_count(&self) -> usize {
        if self.scan.workers == 0 {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        } else {
            self.scan.workers
        }
    }

    pub fn validate(&self) -> Result<(), Error> {
        if !SCAN_FREQUENCIES.contains(&self.daemon.scan_frequency.as_str()) {
            return Err(Error::Validation(format!(
                "invalid scan frequency: {} (must be daily, weekly, or biweekly)",
                self.daemon.scan_frequency
            )));
        }
        if self.movie_paths().is_empty() && self.tv_paths().is_empty() {
            return Err(Error::Validation("no library paths configured".to_string()));
        }
        if let Some(shared) = self
            .movie_paths()
            .iter()
            .find(|path| self.tv_paths().contains(path))
        {
            return Err(Error::Validation(format!(
                "library path {shared} is configured as both a movie and a TV library"
            )));
        }
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String, Error> {
        toml::to_string_pretty(self).map_err(|e| Error::Other(e.to_string()))
    }
}

fn default_data_dir() -> PathBuf {
    ProjectDirs::from("", "", "reelsweep")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".reelsweep"))
}

/// `REELSWEEP_SAFETY__DRY_RUN=true` style overrides.
fn environment() -> Environment {
    Environment::with_prefix("REELSWEEP")
        .prefix_separator("_")
        .separator("__")
}

pub fn load_configuration() -> Result<AppConfig, ConfigError> {
    Config::builder()
        .add_source(ConfigFile::with_name("Config").required(false))
        .add_source(environment())
        .build()?
        .try_deserialize::<AppConfig>()
}

pub fn load_configuration_from(path: &Path) -> Result<AppConfig, ConfigError> {
    Config::builder()
        .add_source(ConfigFile::from(path))
        .add_source(environment())
        .build()?
        .try_deserialize::<AppConfig>()
}

/// Remove directories that are subdirectories of other directories in the list.
pub fn non_overlapping_directories(dirs: Vec<String>) -> Vec<String> {
    let mut result: Vec<String> = Vec::new();

    for dir in dirs {
        let dir_path = Path::new(&dir);
        if result.iter().any(|kept| dir_path.starts_with(kept)) {
            continue;
        }
        result.retain(|kept| !Path::new(kept).starts_with(dir_path));
        result.push(dir);
    }

    result
}
