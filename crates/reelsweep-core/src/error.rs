use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Safety check failed: {0}")]
    Safety(#[from] SafetyError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Verification error: {0}")]
    Verification(String),

    #[error("Total size to delete ({requested_gb} GB) exceeds limit ({limit_gb} GB)")]
    SizeLimitExceeded { requested_gb: u64, limit_gb: u64 },

    #[error("Library path not accessible: {path}: {source}")]
    LibraryInaccessible {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Backup error: {0}")]
    Backup(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Reasons the safety gate refuses to touch a path.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SafetyError {
    #[error("path must be absolute: {0}")]
    NotAbsolute(PathBuf),

    #[error("path contains a parent directory traversal: {0}")]
    Traversal(PathBuf),

    #[error("refusing to touch protected path {path} (matches {protected})")]
    Protected { path: PathBuf, protected: PathBuf },

    #[error("path too shallow ({depth} components, minimum {min_depth}): {path}")]
    TooShallow {
        path: PathBuf,
        depth: usize,
        min_depth: usize,
    },

    #[error("path is outside every configured library: {0}")]
    OutsideLibrary(PathBuf),

    #[error("library is not writable: {0}")]
    NotWritable(PathBuf),
}

/// A single failed item inside a batch. Batches keep going after one of these.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct BatchError {
    pub path: PathBuf,
    pub message: String,
}

impl BatchError {
    pub fn new(path: impl Into<PathBuf>, message: impl std::fmt::Display) -> Self {
        Self {
            path: path.into(),
            message: message.to_string(),
        }
    }
}

impl std::fmt::Display for BatchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path.display(), self.message)
    }
}
