// Run Outcomes
// Maps raw engine exit codes onto user-facing results

use crate::config::DEFAULT_WARNING_EXIT_CODE;

use std::fmt;

/// Exit code used when the OS cannot report one
pub const SYNTHETIC_EXIT_CODE: i64 = -1;

/// How a job ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Engine exited with code 0
    Success,
    /// Engine finished but reported non-fatal output problems
    CompletedWithWarnings,
    /// Engine exited with any other code, or its output stream failed
    Failed(i64),
    /// The run was stopped by the caller
    Cancelled,
    /// The engine could not be started
    LaunchFailed,
}

impl RunOutcome {
    /// Short label for status displays
    pub fn status_text(&self) -> &'static str {
        match self {
            RunOutcome::Success => "Completed",
            RunOutcome::CompletedWithWarnings => "Completed with warnings",
            RunOutcome::Failed(_) => "Failed",
            RunOutcome::Cancelled => "Cancelled",
            RunOutcome::LaunchFailed => "Launch failed",
        }
    }

    /// Sentence appended to the run log
    pub fn message(&self) -> String {
        match self {
            RunOutcome::Success => "Simulation completed successfully".to_string(),
            RunOutcome::CompletedWithWarnings => {
                "Simulation completed with warnings (output errors)".to_string()
            }
            RunOutcome::Failed(code) => format!("Simulation failed with exit code {}", code),
            RunOutcome::Cancelled => "Simulation cancelled".to_string(),
            RunOutcome::LaunchFailed => "Simulation could not be started".to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, RunOutcome::Success | RunOutcome::CompletedWithWarnings)
    }
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.status_text())
    }
}

/// Classifies exit codes. The "warnings" codes depend on how the platform
/// encodes a `-1` exit status, so they are configurable.
#[derive(Debug, Clone)]
pub struct ExitClassifier {
    warning_codes: Vec<i64>,
}

impl ExitClassifier {
    pub fn new(warning_codes: Vec<i64>) -> Self {
        Self { warning_codes }
    }

    /// Classify a natural (not cancelled) exit
    pub fn classify(&self, code: i64) -> RunOutcome {
        if code == 0 {
            RunOutcome::Success
        } else if self.warning_codes.contains(&code) {
            RunOutcome::CompletedWithWarnings
        } else {
            RunOutcome::Failed(code)
        }
    }

    /// Classify the end of a session, taking cancellation and stream
    /// failures into account.
    pub fn classify_session(&self, code: i64, cancelled: bool, stream_failed: bool) -> RunOutcome {
        if cancelled {
            return RunOutcome::Cancelled;
        }
        match self.classify(code) {
            outcome @ RunOutcome::Failed(_) => outcome,
            _ if stream_failed => RunOutcome::Failed(code),
            outcome => outcome,
        }
    }
}

impl Default for ExitClassifier {
    fn default() -> Self {
        Self::new(vec![DEFAULT_WARNING_EXIT_CODE])
    }
}

/// Convert an OS exit status into the raw code the classifier sees.
///
/// Windows codes are widened as unsigned 32-bit values, so `-1` becomes
/// `4294967295`. A Unix process killed by a signal reports `-signal`.
pub fn raw_exit_code(status: std::process::ExitStatus) -> i64 {
    match status.code() {
        Some(code) if cfg!(windows) => i64::from(code as u32),
        Some(code) => i64::from(code),
        None => signal_exit_code(status),
    }
}

#[cfg(unix)]
fn signal_exit_code(status: std::process::ExitStatus) -> i64 {
    use std::os::unix::process::ExitStatusExt;
    status
        .signal()
        .map(|signal| -i64::from(signal))
        .unwrap_or(SYNTHETIC_EXIT_CODE)
}

#[cfg(not(unix))]
fn signal_exit_code(_status: std::process::ExitStatus) -> i64 {
    SYNTHETIC_EXIT_CODE
}
