// Engine Sessions
// The seam between the run controller and whatever executes a job

use crate::job::Job;

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Notify};
use tokio_stream::wrappers::UnboundedReceiverStream;

/// Sender for engine events
pub type EngineEventSender = mpsc::UnboundedSender<EngineEvent>;

/// Receiver for engine events
pub type EngineEventReceiver = mpsc::UnboundedReceiver<EngineEvent>;

/// Events produced while one engine invocation is supervised.
///
/// A session ends with exactly one terminal event: `LaunchFailed` when no
/// process was started, `ProcessExited` otherwise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// The process was spawned
    Launched {
        command: String,
        working_dir: PathBuf,
        pid: Option<u32>,
    },
    /// One line of combined stdout/stderr
    OutputLine(String),
    /// Progress estimate derived from the preceding output line
    ProgressUpdate(u8),
    /// Reading the output stream failed; the process is being terminated
    ReadError(String),
    /// No process was started
    LaunchFailed(String),
    /// The process ended with this raw exit code
    ProcessExited(i64),
}

impl EngineEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, EngineEvent::LaunchFailed(_) | EngineEvent::ProcessExited(_))
    }
}

/// Cooperative stop flag shared between a session's owner and its reading loop
#[derive(Debug, Clone, Default)]
pub struct StopHandle {
    requested: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the reading loop to terminate the process. Does not wait.
    pub fn request_stop(&self) {
        self.requested.store(true, Ordering::SeqCst);
        self.notify.notify_one();
    }

    pub fn is_stop_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    /// Resolves once a stop has been requested
    pub async fn stopped(&self) {
        while !self.is_stop_requested() {
            self.notify.notified().await;
        }
    }
}

/// A running (or failed-to-launch) engine invocation
#[derive(Debug)]
pub struct EngineSession {
    pub events: EngineEventReceiver,
    pub stop: StopHandle,
}

impl EngineSession {
    /// Create a session and the sending half its worker reports through
    pub fn channel() -> (Self, EngineEventSender) {
        let (tx, rx) = mpsc::unbounded_channel();
        let session = Self {
            events: rx,
            stop: StopHandle::new(),
        };
        (session, tx)
    }

    pub fn request_stop(&self) {
        self.stop.request_stop();
    }

    /// Consume the session as a stream of events
    pub fn into_stream(self) -> UnboundedReceiverStream<EngineEvent> {
        UnboundedReceiverStream::new(self.events)
    }
}

/// Something that can execute a job.
///
/// `start` must return immediately; the work happens on a separate task that
/// reports through the session's event channel and honours its stop handle.
pub trait Engine: Send + Sync {
    fn start(&self, job: Job) -> EngineSession;
}
