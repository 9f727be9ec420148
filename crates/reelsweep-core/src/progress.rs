use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::mpsc::Sender;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Debug,
    Info,
    Warn,
    Error,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Debug => "debug",
            Severity::Info => "info",
            Severity::Warn => "warn",
            Severity::Error => "error",
            Severity::Critical => "critical",
        };
        f.write_str(s)
    }
}

/// Which severities a tracker lets through.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Errors and critical messages only.
    Quiet,
    #[default]
    Normal,
    Verbose,
}

impl LogLevel {
    pub fn allows(self, severity: Severity) -> bool {
        match self {
            LogLevel::Quiet => severity >= Severity::Error,
            LogLevel::Normal => severity >= Severity::Info,
            LogLevel::Verbose => true,
        }
    }
}

impl FromStr for LogLevel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "quiet" => Ok(LogLevel::Quiet),
            "normal" => Ok(LogLevel::Normal),
            "verbose" => Ok(LogLevel::Verbose),
            other => Err(Error::Validation(format!("invalid log level: {other}"))),
        }
    }
}

/// One update on the progress stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// e.g. `scanning_movies`, `compliance_tv`, `cleaning`.
    pub operation: String,
    /// e.g. `counting_files`, `scanning`, `fixing`, `complete`.
    pub stage: String,
    pub current: usize,
    pub total: usize,
    pub percentage: f64,
    pub message: String,
    pub severity: Severity,
    pub duplicates_found: usize,
    pub compliance_issues: usize,
    pub files_processed: usize,
    pub errors_encountered: usize,
    pub errors: Vec<String>,
    pub elapsed_secs: u64,
    /// Set for error and critical events sent immediately; the client should interrupt the user.
    pub show_alert: bool,
    pub alert_type: Option<Severity>,
}

/// Sink for progress events.
///
/// The CLI renders them with indicatif; other front ends can forward them over a channel.
pub trait ProgressReporter: Send + Sync {
    fn on_progress(&self, _event: &ProgressEvent) {}
}

/// No-op progress reporter for silent operation.
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {}

/// Forwards every event to an mpsc receiver. Events are dropped once the receiver hangs up.
pub struct ChannelReporter {
    sender: Mutex<Sender<ProgressEvent>>,
}

impl ChannelReporter {
    pub fn new(sender: Sender<ProgressEvent>) -> Self {
        Self {
            sender: Mutex::new(sender),
        }
    }
}

impl ProgressReporter for ChannelReporter {
    fn on_progress(&self, event: &ProgressEvent) {
        if let Ok(sender) = self.sender.lock() {
            let _ = sender.send(event.clone());
        }
    }
}

#[derive(Debug, Default)]
struct TrackerState {
    total: usize,
    files_processed: usize,
    duplicates_found: usize,
    compliance_issues: usize,
    errors: Vec<String>,
    last_sent: Option<Instant>,
}

/// Builds progress events for one operation and hands them to a reporter.
///
/// Regular updates are throttled to `min_interval` and filtered by the log level.
/// Immediate sends (errors, criticals, completion) bypass both.
pub struct ProgressTracker<'a> {
    reporter: &'a dyn ProgressReporter,
    operation: String,
    started: Instant,
    min_interval: Duration,
    log_level: LogLevel,
    state: Mutex<TrackerState>,
}

impl<'a> ProgressTracker<'a> {
    pub fn new(reporter: &'a dyn ProgressReporter, operation: impl Into<String>) -> Self {
        Self {
            reporter,
            operation: operation.into(),
            started: Instant::now(),
            min_interval: Duration::ZERO,
            log_level: LogLevel::Normal,
            state: Mutex::new(TrackerState::default()),
        }
    }

    pub fn with_min_interval(mut self, min_interval: Duration) -> Self {
        self.min_interval = min_interval;
        self
    }

    pub fn with_log_level(mut self, log_level: LogLevel) -> Self {
        self.log_level = log_level;
        self
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut TrackerState) -> T) -> T {
        match self.state.lock() {
            Ok(mut state) => f(&mut state),
            Err(poisoned) => f(&mut poisoned.into_inner()),
        }
    }

    fn build(
        &self,
        state: &TrackerState,
        stage: &str,
        current: usize,
        message: &str,
        severity: Severity,
    ) -> ProgressEvent {
        let percentage = if state.total == 0 {
            0.0
        } else {
            current as f64 / state.total as f64 * 100.0
        };
        ProgressEvent {
            operation: self.operation.clone(),
            stage: stage.to_string(),
            current,
            total: state.total,
            percentage,
            message: message.to_string(),
            severity,
            duplicates_found: state.duplicates_found,
            compliance_issues: state.compliance_issues,
            files_processed: state.files_processed,
            errors_encountered: state.errors.len(),
            errors: state.errors.clone(),
            elapsed_secs: self.started.elapsed().as_secs(),
            show_alert: false,
            alert_type: None,
        }
    }

    /// Sends `event` unless the previous one went out less than `min_interval` ago.
    fn emit_throttled(&self, state: &mut TrackerState, event: ProgressEvent) {
        if !self.min_interval.is_zero() {
            if let Some(last) = state.last_sent {
                if last.elapsed() < self.min_interval {
                    return;
                }
            }
            state.last_sent = Some(Instant::now());
        }
        self.reporter.on_progress(&event);
    }

    pub fn start(&self, total: usize, message: &str) {
        self.with_state(|state| state.total = total);
        self.stage_update("counting_files", message);
    }

    pub fn update(&self, current: usize, message: &str) {
        self.with_state(|state| {
            state.files_processed = current;
            if !self.log_level.allows(Severity::Info) {
                return;
            }
            let event = self.build(state, "scanning", current, message, Severity::Info);
            self.emit_throttled(state, event);
        });
    }

    pub fn stage_update(&self, stage: &str, message: &str) {
        self.with_state(|state| {
            if !self.log_level.allows(Severity::Info) {
                return;
            }
            let event = self.build(state, stage, state.files_processed, message, Severity::Info);
            self.emit_throttled(state, event);
        });
    }

    /// Filtered and throttled send at an explicit severity.
    pub fn send(&self, severity: Severity, message: &str) {
        self.with_state(|state| {
            if !self.log_level.allows(severity) {
                return;
            }
            let event = self.build(state, "scanning", state.files_processed, message, severity);
            self.emit_throttled(state, event);
        });
    }

    /// Sends right away regardless of log level and throttling.
    pub fn send_immediate(&self, severity: Severity, message: &str) {
        let event = self.with_state(|state| {
            let mut event =
                self.build(state, "scanning", state.files_processed, message, severity);
            if severity >= Severity::Error {
                event.show_alert = true;
                event.alert_type = Some(severity);
            }
            event
        });
        self.reporter.on_progress(&event);
    }

    pub fn complete(&self, message: &str) {
        let event = self.with_state(|state| {
            let mut event = self.build(state, "complete", state.total, message, Severity::Info);
            event.percentage = 100.0;
            event
        });
        self.reporter.on_progress(&event);
    }

    fn record_error(&self, error: Option<&dyn fmt::Display>, message: &str) -> String {
        let full = match error {
            Some(err) => format!("{message}: {err}"),
            None => message.to_string(),
        };
        self.with_state(|state| state.errors.push(full.clone()));
        full
    }

    pub fn log_error(&self, error: Option<&dyn fmt::Display>, message: &str) {
        let full = self.record_error(error, message);
        self.send_immediate(Severity::Error, &full);
    }

    pub fn log_critical(&self, error: Option<&dyn fmt::Display>, message: &str) {
        let full = self.record_error(error, message);
        self.send_immediate(Severity::Critical, &full);
    }

    pub fn add_duplicates(&self, count: usize) {
        self.with_state(|state| state.duplicates_found += count);
    }

    pub fn add_compliance_issues(&self, count: usize) {
        self.with_state(|state| state.compliance_issues += count);
    }

    pub fn errors(&self) -> Vec<String> {
        self.with_state(|state| state.errors.clone())
    }
}
