use std::fs::{File, OpenOptions};
use std::io::Write as _;
use std::path::Path;
use std::time::Duration;

use chrono::Local;
use indicatif::ProgressBar;

use crate::error::{Error, Result};
use crate::ui::{print_command_status, CommandStatus};

/// Process lifecycle. Transitions are one-way, non-retryable notifications:
/// `Started → Extracting → [Labeling] → Finished`, with `Labeling` only on
/// the combined extract-and-label entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Started,
    Extracting,
    Labeling,
    Finished,
}

impl Phase {
    pub fn message(&self) -> &'static str {
        match self {
            Phase::Started => "Started",
            Phase::Extracting => "Extracting shopping performance data",
            Phase::Labeling => "Setting up custom labels",
            Phase::Finished => "Last executed",
        }
    }
}

/// Receives coarse lifecycle and batch-progress notifications.
pub trait StatusReporter {
    fn transition(&mut self, phase: Phase);
    fn progress(&mut self, current: usize, total: usize);
}

/// Append-only `(timestamp, message)` line sink. Log-write failures never
/// interrupt the pipeline.
pub struct RunLog {
    out: Option<File>,
}

impl RunLog {
    pub fn open(path: &Path) -> Result<RunLog> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                Error::config(format!(
                    "cannot create log directory {}: {e}",
                    parent.display()
                ))
            })?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| Error::config(format!("cannot open log file {}: {e}", path.display())))?;
        Ok(RunLog { out: Some(file) })
    }

    pub fn disabled() -> RunLog {
        RunLog { out: None }
    }

    pub fn append(&mut self, message: &str) {
        if let Some(out) = self.out.as_mut() {
            let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");
            let _ = writeln!(out, "{timestamp} {message}");
            let _ = out.flush();
        }
    }
}

/// Terminal status reporter: a single overwritten status line plus the
/// append-only run log. The status line mirrors the current lifecycle phase
/// and, during batch writes, a percentage-complete string.
pub struct RunStatus {
    line: ProgressBar,
    log: RunLog,
}

impl RunStatus {
    pub fn new(log: RunLog) -> RunStatus {
        let line = ProgressBar::new_spinner();
        line.enable_steady_tick(Duration::from_millis(120));
        RunStatus { line, log }
    }

    /// Log-then-re-raise policy: record the failure with full message
    /// context and clear the status line before the error propagates.
    pub fn record_error(&mut self, err: &Error) {
        self.log.append(&format!("error: {err}"));
        self.line.finish_and_clear();
    }
}

impl StatusReporter for RunStatus {
    fn transition(&mut self, phase: Phase) {
        self.log.append(phase.message());
        match phase {
            Phase::Started | Phase::Extracting | Phase::Labeling => {
                self.line.set_message(phase.message());
            }
            Phase::Finished => {
                let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");
                self.line.finish_and_clear();
                print_command_status(
                    CommandStatus::Success,
                    &format!("{} on {timestamp}", phase.message()),
                );
            }
        }
    }

    fn progress(&mut self, current: usize, total: usize) {
        self.line.set_message(progress_message(current, total));
    }
}

fn progress_message(current: usize, total: usize) -> String {
    let percent = if total == 0 {
        100.0
    } else {
        current as f64 * 100.0 / total as f64
    };
    format!(
        "{}: {current}/{total} ({percent:.2}%)",
        Phase::Extracting.message()
    )
}

#[cfg(test)]
pub(crate) struct RecordingReporter {
    pub transitions: Vec<Phase>,
    pub progress: Vec<(usize, usize)>,
}

#[cfg(test)]
impl RecordingReporter {
    pub fn new() -> Self {
        RecordingReporter {
            transitions: Vec::new(),
            progress: Vec::new(),
        }
    }
}

#[cfg(test)]
impl StatusReporter for RecordingReporter {
    fn transition(&mut self, phase: Phase) {
        self.transitions.push(phase);
    }

    fn progress(&mut self, current: usize, total: usize) {
        self.progress.push((current, total));
    }
}
