use ahash::AHashSet;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::backup::BackupManager;
use crate::compliance::{self, ComplianceIssue};
use crate::config::{self, AppConfig};
use crate::duplicates::{self, DuplicateGroup};
use crate::error::{Error, Result};
use crate::executor::{ExecutionReport, Executor};
use crate::media::MediaKind;
use crate::progress::{ProgressReporter, ProgressTracker, SilentReporter};
use crate::safety::SafetyGate;
use crate::scanner::{CancelToken, LibraryScanner};
use crate::titles::providers;
use crate::titles::verify::{RetryPolicy, Verifier};
use crate::titles::TitleResolution;
use crate::validation::validate_library_paths;

pub const OP_SCANNING_MOVIES: &str = "scanning_movies";
pub const OP_SCANNING_TV: &str = "scanning_tv";
pub const OP_COMPLIANCE_MOVIES: &str = "compliance_movies";
pub const OP_COMPLIANCE_TV: &str = "compliance_tv";
pub const OP_CLEANING: &str = "cleaning";

/// Everything a full scan found. Serializes to a stable shape for reports and the UI.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanResult {
    pub movie_roots: Vec<PathBuf>,
    pub tv_roots: Vec<PathBuf>,
    pub movie_duplicates: Vec<DuplicateGroup>,
    pub tv_duplicates: Vec<DuplicateGroup>,
    pub compliance_issues: Vec<ComplianceIssue>,
    pub ambiguous_titles: Vec<TitleResolution>,
    pub total_duplicates: usize,
    pub total_files_to_delete: usize,
    pub space_to_free: u64,
    #[serde(skip)]
    pub scan_duration: Duration,
}

impl ScanResult {
    pub fn duplicate_groups(&self) -> impl Iterator<Item = &DuplicateGroup> {
        self.movie_duplicates.iter().chain(&self.tv_duplicates)
    }

    /// Every non-keeper file across movie and TV groups.
    pub fn delete_list(&self) -> Vec<PathBuf> {
        let mut list = duplicates::delete_list(&self.movie_duplicates);
        list.extend(duplicates::delete_list(&self.tv_duplicates));
        list
    }

    pub fn recompute_totals(&mut self) {
        self.total_duplicates = self.movie_duplicates.len() + self.tv_duplicates.len();
        self.total_files_to_delete = self.duplicate_groups().map(|g| g.deletions().len()).sum();
        self.space_to_free = duplicates::space_to_free(&self.movie_duplicates)
            + duplicates::space_to_free(&self.tv_duplicates);
    }

    /// Ambiguous shows nobody has settled yet.
    pub fn titles_needing_review(&self) -> Vec<&TitleResolution> {
        self.ambiguous_titles
            .iter()
            .filter(|r| r.needs_review())
            .collect()
    }
}

/// Runs the scan stages in order and applies their results.
pub struct ScanEngine {
    config: AppConfig,
    reporter: Arc<dyn ProgressReporter>,
    cancel: CancelToken,
    verifier: Option<Verifier>,
}

impl ScanEngine {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            reporter: Arc::new(SilentReporter),
            cancel: CancelToken::new(),
            verifier: None,
        }
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_verifier(mut self, verifier: Verifier) -> Self {
        self.verifier = Some(verifier);
        self
    }

    /// Builds a verifier from the configured metadata keys, if any are set.
    pub fn with_configured_verifier(mut self) -> Result<Self> {
        let (primary, secondary) = providers::from_config(&self.config.metadata)?;
        if primary.is_some() || secondary.is_some() {
            let retry = RetryPolicy {
                max_retries: self.config.metadata.max_retries,
                ..RetryPolicy::default()
            };
            self.verifier = Some(Verifier::new(primary, secondary).with_retry_policy(retry));
        } else {
            debug!("No metadata provider keys configured, ambiguous titles stay unverified");
        }
        Ok(self)
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    fn tracker(&self, operation: &str) -> ProgressTracker<'_> {
        ProgressTracker::new(self.reporter.as_ref(), operation)
            .with_min_interval(Duration::from_millis(self.config.progress.min_interval_ms))
            .with_log_level(self.config.progress.log_level)
    }

    fn check_cancelled(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            info!("Scan cancelled");
            return Err(Error::Cancelled);
        }
        Ok(())
    }

    fn scanner(&self) -> LibraryScanner {
        LibraryScanner::new(self.config.worker_count(), &self.config.scan.ignore_patterns)
            .with_cancel(self.cancel.clone())
    }

    /// Run the full pipeline:
    /// 1. Movie duplicates, keepers marked
    /// 2. TV duplicates
    /// 3. Movie compliance, skipping files slated for deletion
    /// 4. TV compliance, resolving and verifying show titles
    pub fn scan(&self) -> Result<ScanResult> {
        self.config.validate()?;
        let report = validate_library_paths(&self.config.all_library_paths(), false)?;
        for warning in &report.warnings {
            warn!("{}", warning);
        }
        if let Some(bad) = report.inaccessible.first() {
            return Err(Error::Validation(format!(
                "library path not accessible: {} ({})",
                bad.path, bad.error
            )));
        }

        let movie_roots: Vec<PathBuf> =
            config::non_overlapping_directories(self.config.movie_paths().to_vec())
                .into_iter()
                .map(PathBuf::from)
                .collect();
        let tv_roots: Vec<PathBuf> =
            config::non_overlapping_directories(self.config.tv_paths().to_vec())
                .into_iter()
                .map(PathBuf::from)
                .collect();
        info!("Movie libraries: {:?}", movie_roots);
        info!("TV libraries: {:?}", tv_roots);

        let scanner = self.scanner();
        let started = Instant::now();
        let mut result = ScanResult {
            movie_roots,
            tv_roots,
            ..ScanResult::default()
        };

        // Stage 1: movie duplicates
        if !result.movie_roots.is_empty() {
            let tracker = self.tracker(OP_SCANNING_MOVIES);
            tracker.stage_update("scanning", "Scanning movie libraries");
            let stage_start = Instant::now();
            result.movie_duplicates =
                scanner.scan_duplicates(MediaKind::Movie, &result.movie_roots, Some(&tracker))?;
            tracker.add_duplicates(result.movie_duplicates.len());
            tracker.complete(&format!(
                "Found {} movie duplicate groups",
                result.movie_duplicates.len()
            ));
            info!(
                "Movie duplicate scan completed in {:.2}s, {} groups",
                stage_start.elapsed().as_secs_f64(),
                result.movie_duplicates.len()
            );
        }
        self.check_cancelled()?;

        // Stage 2: TV duplicates
        if !result.tv_roots.is_empty() {
            let tracker = self.tracker(OP_SCANNING_TV);
            tracker.stage_update("scanning", "Scanning TV libraries");
            let stage_start = Instant::now();
            result.tv_duplicates =
                scanner.scan_duplicates(MediaKind::Tv, &result.tv_roots, Some(&tracker))?;
            tracker.add_duplicates(result.tv_duplicates.len());
            tracker.complete(&format!(
                "Found {} episode duplicate groups",
                result.tv_duplicates.len()
            ));
            info!(
                "TV duplicate scan completed in {:.2}s, {} groups",
                stage_start.elapsed().as_secs_f64(),
                result.tv_duplicates.len()
            );
        }
        self.check_cancelled()?;

        // Stage 3: movie compliance
        if !result.movie_roots.is_empty() {
            let tracker = self.tracker(OP_COMPLIANCE_MOVIES);
            tracker.stage_update("compliance", "Checking movie naming");
            let stage_start = Instant::now();
            let exclude: AHashSet<PathBuf> =
                duplicates::delete_list(&result.movie_duplicates).into_iter().collect();
            let files = scanner.library_files(&result.movie_roots)?;
            let issues = compliance::check_movies(&files, &exclude);
            tracker.add_compliance_issues(issues.len());
            tracker.complete(&format!("Found {} movie naming issues", issues.len()));
            info!(
                "Movie compliance completed in {:.2}s, {} issues",
                stage_start.elapsed().as_secs_f64(),
                issues.len()
            );
            result.compliance_issues.extend(issues);
        }
        self.check_cancelled()?;

        // Stage 4: TV compliance
        if !result.tv_roots.is_empty() {
            let tracker = self.tracker(OP_COMPLIANCE_TV);
            tracker.stage_update("compliance", "Checking TV naming");
            let stage_start = Instant::now();
            let exclude: AHashSet<PathBuf> =
                duplicates::delete_list(&result.tv_duplicates).into_iter().collect();
            let files = scanner.library_files(&result.tv_roots)?;
            let tv = compliance::check_episodes(&files, &exclude, self.verifier.as_ref());
            tracker.add_compliance_issues(tv.issues.len());
            tracker.complete(&format!(
                "Found {} TV naming issues, {} ambiguous shows",
                tv.issues.len(),
                tv.ambiguous.len()
            ));
            info!(
                "TV compliance completed in {:.2}s, {} issues, {} ambiguous shows",
                stage_start.elapsed().as_secs_f64(),
                tv.issues.len(),
                tv.ambiguous.len()
            );
            result.compliance_issues.extend(tv.issues);
            result.ambiguous_titles = tv.ambiguous;
        }
        self.check_cancelled()?;

        result.recompute_totals();
        result.scan_duration = started.elapsed();
        info!(
            "Scan completed in {:.2}s: {} duplicate groups, {} files to delete, {} bytes to free, {} naming issues",
            result.scan_duration.as_secs_f64(),
            result.total_duplicates,
            result.total_files_to_delete,
            result.space_to_free,
            result.compliance_issues.len()
        );
        Ok(result)
    }

    /// Deletes duplicates and fixes naming issues from `result`.
    ///
    /// Live runs require writable libraries and record everything into a `cleanup`
    /// snapshot first. Dry runs make the same decisions without touching anything.
    pub fn clean(&self, result: &ScanResult, dry_run: bool) -> Result<ExecutionReport> {
        let dry_run = dry_run || self.config.safety.dry_run;
        let roots: Vec<PathBuf> = result
            .movie_roots
            .iter()
            .chain(&result.tv_roots)
            .cloned()
            .collect();
        let root_strings: Vec<String> = roots
            .iter()
            .map(|r| r.to_string_lossy().into_owned())
            .collect();
        validate_library_paths(&root_strings, !dry_run)?;

        let deletions = result.delete_list();
        let gate = SafetyGate::new(&self.config.safety).with_libraries(roots.clone());
        let mut executor = Executor::new(&self.config.safety)
            .with_gate(gate)
            .with_dry_run(dry_run)
            .with_operation_log(self.config.operation_log_path());
        executor.check_delete_ceiling(&deletions)?;

        if !dry_run {
            let manager = BackupManager::new(self.config.backup_dir());
            let snapshot = manager.create("cleanup", &roots)?;
            info!("Recording cleanup into backup {}", snapshot.id);
            executor = executor.with_snapshot(manager, snapshot);
        }

        let tracker = self.tracker(OP_CLEANING);
        let started = Instant::now();
        let mut report =
            executor.execute_plan(&deletions, &result.compliance_issues, Some(&tracker))?;
        report.backup_id = executor.finish()?.map(|snapshot| snapshot.id);
        info!(
            "Cleanup completed in {:.2}s{}",
            started.elapsed().as_secs_f64(),
            if dry_run { " (dry run)" } else { "" }
        );
        Ok(report)
    }
}
