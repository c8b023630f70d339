//! Terminal progress for jobs being polled
//!
//! Wraps an indicatif spinner in an update callback for the poller. The
//! spinner is hidden for machine-readable output.

use std::time::Duration;

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use shipdash_core::{OperationHandle, OperationState, OperationStatus, UpdateCallback};

pub struct JobProgress {
    pb: ProgressBar,
}

impl JobProgress {
    pub fn new(handle: &OperationHandle, visible: bool) -> Self {
        let pb = if visible {
            let pb = ProgressBar::new_spinner();
            pb.set_style(
                ProgressStyle::default_spinner()
                    .template("{spinner:.green} {msg} [{elapsed_precise}]")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            pb.enable_steady_tick(Duration::from_millis(120));
            pb
        } else {
            ProgressBar::hidden()
        };
        pb.set_message(format!("Waiting for job {}", handle));
        Self { pb }
    }

    /// Callback that mirrors every status onto the spinner
    pub fn callback(&self, handle: &OperationHandle) -> UpdateCallback {
        let pb = self.pb.clone();
        let handle = handle.clone();
        Box::new(move |status: OperationStatus| {
            if !status.is_recognized_state() {
                pb.println(format!(
                    "{} job {} reported unknown state '{}', still waiting",
                    "warning:".yellow().bold(),
                    handle,
                    status.reported_state
                ));
            }

            let line = format!("Job {}: {}", handle, format_status_line(&status));
            if status.is_terminal() {
                pb.finish_with_message(line);
            } else {
                pb.set_message(line);
            }
        })
    }

    /// Stop the spinner without a terminal status
    pub fn abandon(&self, message: impl Into<String>) {
        if !self.pb.is_finished() {
            self.pb.abandon_with_message(message.into());
        }
    }
}

/// Format a job state for display with status icons
pub fn format_state(status: &OperationStatus) -> String {
    let state = status.reported_state.as_str();
    match status.state {
        OperationState::Completed => format!("\u{2713} {}", state), // checkmark
        OperationState::Failed => format!("\u{2717} {}", state),    // x mark
        OperationState::Running => format!("\u{21bb} {}", state),   // arrow circle
        OperationState::Pending => format!("\u{2026} {}", state),   // ellipsis
    }
}

/// State, message and progress on one line
pub fn format_status_line(status: &OperationStatus) -> String {
    let mut line = format_state(status);
    if !status.message.is_empty() {
        line.push_str(" - ");
        line.push_str(&status.message);
    }
    if let Some(progress) = &status.progress {
        line.push_str(&format!(" ({})", progress));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_state_icons() {
        assert!(format_state(&OperationStatus::new("completed", "")).starts_with('\u{2713}'));
        assert!(format_state(&OperationStatus::new("failed", "")).starts_with('\u{2717}'));
        assert!(format_state(&OperationStatus::new("pending", "")).starts_with('\u{2026}'));
    }

    #[test]
    fn test_unknown_state_keeps_reported_text() {
        let line = format_state(&OperationStatus::new("fetching", ""));
        assert_eq!(line, "\u{21bb} fetching");
    }

    #[test]
    fn test_status_line_includes_message_and_progress() {
        let status = OperationStatus::new("running", "Saving demands").with_progress("40/100");
        assert_eq!(
            format_status_line(&status),
            "\u{21bb} running - Saving demands (40/100)"
        );
    }

    #[test]
    fn test_hidden_progress_accepts_updates() {
        let handle = OperationHandle::new("job-1");
        let progress = JobProgress::new(&handle, false);
        let callback = progress.callback(&handle);
        callback(OperationStatus::new("running", "working"));
        callback(OperationStatus::new("completed", "done"));
        progress.abandon("unused");
    }
}
