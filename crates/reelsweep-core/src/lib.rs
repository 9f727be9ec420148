pub mod backup;
pub mod compliance;
pub mod config;
pub mod decisions;
pub mod duplicates;
pub mod engine;
pub mod error;
pub mod executor;
pub mod media;
pub mod normalize;
pub mod platform;
pub mod progress;
pub mod rename;
pub mod safety;
pub mod scanner;
pub mod titles;
pub mod validation;

pub use backup::{BackupManager, BackupSnapshot, BackupStatus};
pub use compliance::{ComplianceIssue, SuggestedAction};
pub use config::AppConfig;
pub use decisions::UserDecisions;
pub use duplicates::DuplicateGroup;
pub use engine::{ScanEngine, ScanResult};
pub use error::{BatchError, Error, Result, SafetyError};
pub use executor::{ExecutionReport, Executor, Operation, OperationType};
pub use media::{MediaFile, MediaKind};
pub use progress::{ProgressEvent, ProgressReporter, ProgressTracker, SilentReporter};
pub use safety::SafetyGate;
pub use scanner::CancelToken;
pub use titles::{TitleDecision, TitleResolution};
