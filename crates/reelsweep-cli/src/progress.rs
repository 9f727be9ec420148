use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use reelsweep_core::progress::Severity;
use reelsweep_core::{ProgressEvent, ProgressReporter};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

const TICK_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";

struct ActiveBar {
    operation: String,
    bar: ProgressBar,
}

/// Renders the progress stream with indicatif.
///
/// - Operations without a known total get a spinner
/// - Once a total arrives the spinner turns into a bar
/// - Alerts are printed above the bar so they are not overwritten
pub struct CliReporter {
    active: Mutex<Option<ActiveBar>>,
}

impl CliReporter {
    pub fn new() -> Self {
        Self {
            active: Mutex::new(None),
        }
    }

    fn spinner(message: &str) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
            pb.set_style(style.tick_chars(TICK_CHARS));
        }
        pb.set_message(message.to_string());
        pb.enable_steady_tick(Duration::from_millis(80));
        pb
    }

    fn bar(total: usize) -> ProgressBar {
        let pb = ProgressBar::new(total as u64);
        if let Ok(style) = ProgressStyle::with_template(
            "  {spinner:.cyan} [{bar:30.cyan/dim}] {pos}/{len} {wide_msg}",
        ) {
            pb.set_style(style.progress_chars("━╸─").tick_chars(TICK_CHARS));
        }
        pb.enable_steady_tick(Duration::from_millis(80));
        pb
    }

    fn alert(&self, active: Option<&ActiveBar>, event: &ProgressEvent) {
        let label = match event.severity {
            Severity::Critical => "CRITICAL".red().bold(),
            Severity::Error => "ERROR".red(),
            Severity::Warn => "WARN".yellow(),
            _ => "INFO".normal(),
        };
        let line = format!("  {} {}", label, event.message);
        match active {
            Some(active) => active.bar.println(line),
            None => eprintln!("{}", line),
        }
    }
}

impl Default for CliReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReporter for CliReporter {
    fn on_progress(&self, event: &ProgressEvent) {
        let mut guard = self.active.lock().unwrap_or_else(PoisonError::into_inner);

        if guard
            .as_ref()
            .map(|a| a.operation != event.operation)
            .unwrap_or(false)
        {
            if let Some(old) = guard.take() {
                old.bar.finish_and_clear();
            }
        }

        if event.severity >= Severity::Warn {
            self.alert(guard.as_ref(), event);
            return;
        }

        if event.stage == "complete" {
            if let Some(done) = guard.take() {
                done.bar.finish_and_clear();
            }
            eprintln!(
                "  {} {} ({}s)",
                "✓".green(),
                event.message,
                event.elapsed_secs
            );
            return;
        }

        let needs_bar = event.total > 0;
        if guard.is_none() {
            *guard = Some(ActiveBar {
                operation: event.operation.clone(),
                bar: if needs_bar {
                    Self::bar(event.total)
                } else {
                    Self::spinner(&event.message)
                },
            });
        }
        let Some(active) = guard.as_mut() else {
            return;
        };

        if needs_bar && active.bar.length().is_none() {
            active.bar.finish_and_clear();
            active.bar = Self::bar(event.total);
        }
        if needs_bar {
            if active.bar.length() != Some(event.total as u64) {
                active.bar.set_length(event.total as u64);
            }
            active.bar.set_position(event.current as u64);
        }
        active.bar.set_message(event.message.clone());
    }
}
