// Run Events
// Events the run controller publishes to its observers

use crate::execution::controller::RunState;
use crate::execution::outcome::RunOutcome;
use crate::job::Job;

use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;

/// Sender for run events
pub type RunEventSender = mpsc::UnboundedSender<RunEvent>;

/// Receiver for run events
pub type RunEventReceiver = mpsc::UnboundedReceiver<RunEvent>;

/// Create a new run event channel
pub fn event_channel() -> (RunEventSender, RunEventReceiver) {
    mpsc::unbounded_channel()
}

/// Events emitted by the run controller, in the order they happened
#[derive(Debug, Clone, PartialEq)]
pub enum RunEvent {
    /// A job was appended to the queue
    JobQueued { job: Job, queue_len: usize },

    /// Pending jobs were dropped
    QueueCleared { removed: usize },

    /// A job was taken from the queue and handed to the engine
    JobStarted { job: Job, remaining: usize },

    /// The engine process was spawned
    EngineLaunched {
        job_name: String,
        command: String,
        working_dir: PathBuf,
    },

    /// One line of combined engine stdout/stderr, verbatim
    Output { job_name: String, line: String },

    /// Progress estimate derived from an output line
    Progress { job_name: String, percent: u8 },

    /// Controller moved to a new state
    StateChanged { state: RunState },

    /// Terminal result of a job; sent exactly once per session
    JobFinished {
        job: Job,
        outcome: RunOutcome,
        exit_code: Option<i64>,
        duration: Duration,
    },

    /// Jobs remain after a finished run; the caller may continue the queue
    ContinuationOffered { remaining: usize, next: Job },

    /// Log message (info, warning, error)
    Log {
        level: LogLevel,
        message: String,
        job_name: Option<String>,
    },
}

/// Log level for log events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl RunEvent {
    /// Create an output line event
    pub fn output(job_name: impl Into<String>, line: impl Into<String>) -> Self {
        Self::Output {
            job_name: job_name.into(),
            line: line.into(),
        }
    }

    /// Create a progress event
    pub fn progress(job_name: impl Into<String>, percent: u8) -> Self {
        Self::Progress {
            job_name: job_name.into(),
            percent,
        }
    }

    /// Create a debug log event
    pub fn debug(message: impl Into<String>, job_name: Option<String>) -> Self {
        Self::log(LogLevel::Debug, message, job_name)
    }

    /// Create an info log event
    pub fn info(message: impl Into<String>, job_name: Option<String>) -> Self {
        Self::log(LogLevel::Info, message, job_name)
    }

    /// Create a warning log event
    pub fn warning(message: impl Into<String>, job_name: Option<String>) -> Self {
        Self::log(LogLevel::Warning, message, job_name)
    }

    /// Create an error log event
    pub fn error(message: impl Into<String>, job_name: Option<String>) -> Self {
        Self::log(LogLevel::Error, message, job_name)
    }

    fn log(level: LogLevel, message: impl Into<String>, job_name: Option<String>) -> Self {
        Self::Log {
            level,
            message: message.into(),
            job_name,
        }
    }
}

/// Fan-out list of observers. Observers whose receiver was dropped are pruned
/// on the next send.
#[derive(Debug, Default)]
pub struct Subscribers {
    senders: Vec<RunEventSender>,
}

impl Subscribers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new observer and return its receiving end
    pub fn subscribe(&mut self) -> RunEventReceiver {
        let (tx, rx) = event_channel();
        self.senders.push(tx);
        rx
    }

    pub fn len(&self) -> usize {
        self.senders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.senders.is_empty()
    }

    /// Send to every live observer, dropping closed ones
    pub fn broadcast(&mut self, event: RunEvent) {
        self.senders.retain(|sender| sender.send(event.clone()).is_ok());
    }
}
