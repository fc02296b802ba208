// Run Controller
// Queue-driven state machine that supervises at most one engine session

use crate::config::Options;
use crate::error::{RunnerError, RunnerResult};
use crate::execution::events::{RunEvent, RunEventReceiver, Subscribers};
use crate::execution::outcome::{ExitClassifier, RunOutcome, SYNTHETIC_EXIT_CODE};
use crate::job::{Job, JobQueue};
use crate::runners::engine::{Engine, EngineEvent, EngineEventReceiver, StopHandle};
use crate::runners::supervisor::ProcessSupervisor;

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::Instant;
use tracing::{debug, info};

/// Controller states
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Running,
    Stopping,
    Finished(RunOutcome),
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunState::Idle => f.write_str("Idle"),
            RunState::Running => f.write_str("Running"),
            RunState::Stopping => f.write_str("Stopping"),
            RunState::Finished(outcome) => write!(f, "Finished ({})", outcome),
        }
    }
}

/// Snapshot of the controller, published after every change
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerStatus {
    pub state: RunState,
    /// Job owned by the active session
    pub current_job: Option<Job>,
    /// Latest progress estimate of the active session (0-100)
    pub last_progress: u8,
    /// Pending jobs in execution order
    pub queued: Vec<Job>,
    /// Outcome of the most recently finished job
    pub last_outcome: Option<RunOutcome>,
    /// Jobs remain and the caller has not yet accepted or declined continuing
    pub continuation_offered: bool,
    /// Short text for status displays
    pub status_text: String,
}

impl ControllerStatus {
    fn idle() -> Self {
        Self {
            state: RunState::Idle,
            current_job: None,
            last_progress: 0,
            queued: Vec::new(),
            last_outcome: None,
            continuation_offered: false,
            status_text: "Ready".to_string(),
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, RunState::Running | RunState::Stopping)
    }
}

/// Live state of the job being executed
struct RunSession {
    job: Job,
    stop: StopHandle,
    events: EngineEventReceiver,
    last_progress: u8,
    started: Instant,
    stream_failed: bool,
}

#[derive(Debug)]
enum ControlCommand {
    Enqueue {
        file: PathBuf,
        reply: oneshot::Sender<RunnerResult<Job>>,
    },
    Start {
        reply: oneshot::Sender<RunnerResult<Job>>,
    },
    Stop {
        reply: oneshot::Sender<bool>,
    },
    ClearQueue {
        reply: oneshot::Sender<usize>,
    },
    Continue {
        reply: oneshot::Sender<RunnerResult<()>>,
    },
    Decline {
        reply: oneshot::Sender<()>,
    },
    Subscribe {
        reply: oneshot::Sender<RunEventReceiver>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

/// Owns the job queue and the single active session.
///
/// Runs as one task; every queue mutation and state transition happens on
/// that task, driven by commands from [`ControllerHandle`]s and by events
/// from the engine.
pub struct RunController {
    options: Options,
    engine: Arc<dyn Engine>,
    classifier: ExitClassifier,
    queue: JobQueue,
    state: RunState,
    session: Option<RunSession>,
    subscribers: Subscribers,
    last_outcome: Option<RunOutcome>,
    continuation_offered: bool,
    pending_start: Option<Instant>,
    status_tx: watch::Sender<ControllerStatus>,
}

impl RunController {
    /// Create a controller that runs jobs on the given engine
    pub fn new(options: Options, engine: Arc<dyn Engine>) -> Self {
        let classifier = ExitClassifier::new(options.warning_exit_codes.clone());
        let (status_tx, _) = watch::channel(ControllerStatus::idle());
        Self {
            options,
            engine,
            classifier,
            queue: JobQueue::new(),
            state: RunState::Idle,
            session: None,
            subscribers: Subscribers::new(),
            last_outcome: None,
            continuation_offered: false,
            pending_start: None,
            status_tx,
        }
    }

    /// Create a controller that launches the configured engine as a child process
    pub fn with_process_engine(options: Options) -> Self {
        let engine = Arc::new(ProcessSupervisor::from_options(&options));
        Self::new(options, engine)
    }

    /// Register an observer before the controller is spawned
    pub fn subscribe(&mut self) -> RunEventReceiver {
        self.subscribers.subscribe()
    }

    /// Move the controller onto its own task and return a handle to it
    pub fn spawn(self) -> ControllerHandle {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let status = self.status_tx.subscribe();
        tokio::spawn(self.run(commands_rx));
        ControllerHandle {
            commands: commands_tx,
            status,
        }
    }

    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<ControlCommand>) {
        self.publish();
        loop {
            let pending_start = self.pending_start;
            tokio::select! {
                command = commands.recv() => match command {
                    Some(ControlCommand::Shutdown { reply }) => {
                        self.shutdown();
                        let _ = reply.send(());
                        break;
                    }
                    Some(command) => self.handle_command(command),
                    None => {
                        self.shutdown();
                        break;
                    }
                },

                event = next_engine_event(&mut self.session), if self.session.is_some() => {
                    self.handle_engine_event(event);
                }

                _ = tokio::time::sleep_until(pending_start.unwrap_or_else(Instant::now)),
                    if pending_start.is_some() =>
                {
                    self.pending_start = None;
                    if let Err(e) = self.start() {
                        self.emit(RunEvent::error(format!("Could not continue queue: {}", e), None));
                    }
                }
            }
        }
        debug!("run controller stopped");
    }

    fn handle_command(&mut self, command: ControlCommand) {
        match command {
            ControlCommand::Enqueue { file, reply } => {
                let _ = reply.send(self.enqueue(file));
            }
            ControlCommand::Start { reply } => {
                let _ = reply.send(self.start());
            }
            ControlCommand::Stop { reply } => {
                let _ = reply.send(self.stop());
            }
            ControlCommand::ClearQueue { reply } => {
                let _ = reply.send(self.clear_queue());
            }
            ControlCommand::Continue { reply } => {
                let _ = reply.send(self.continue_queue());
            }
            ControlCommand::Decline { reply } => {
                self.decline_continuation();
                let _ = reply.send(());
            }
            ControlCommand::Subscribe { reply } => {
                let _ = reply.send(self.subscribers.subscribe());
            }
            ControlCommand::Shutdown { reply } => {
                self.shutdown();
                let _ = reply.send(());
            }
        }
    }

    // =========================================================================
    // Queue operations
    // =========================================================================

    fn enqueue(&mut self, file: PathBuf) -> RunnerResult<Job> {
        let job = Job::resolve(file, &self.options.working_directory)?;
        self.queue.enqueue(job.clone());
        self.emit(RunEvent::JobQueued {
            job: job.clone(),
            queue_len: self.queue.len(),
        });
        self.emit(RunEvent::info(
            format!("Added to queue: {}", job.file_reference.display()),
            None,
        ));
        self.publish();
        Ok(job)
    }

    fn clear_queue(&mut self) -> usize {
        let removed = self.queue.clear();
        self.continuation_offered = false;
        self.pending_start = None;
        self.emit(RunEvent::QueueCleared { removed });
        self.emit(RunEvent::info("Queue cleared", None));
        self.publish();
        removed
    }

    // =========================================================================
    // State transitions
    // =========================================================================

    fn start(&mut self) -> RunnerResult<Job> {
        if self.session.is_some() {
            return Err(RunnerError::AlreadyRunning);
        }
        let job = self.queue.dequeue().ok_or(RunnerError::EmptyQueue)?;

        self.continuation_offered = false;
        self.pending_start = None;

        info!(job = %job.display_name, remaining = self.queue.len(), "starting simulation");
        let session = self.engine.start(job.clone());
        self.session = Some(RunSession {
            job: job.clone(),
            stop: session.stop,
            events: session.events,
            last_progress: 0,
            started: Instant::now(),
            stream_failed: false,
        });

        self.emit(RunEvent::JobStarted {
            job: job.clone(),
            remaining: self.queue.len(),
        });
        self.set_state(RunState::Running);
        Ok(job)
    }

    fn stop(&mut self) -> bool {
        if self.state != RunState::Running {
            return false;
        }
        let Some(session) = &self.session else {
            return false;
        };

        session.stop.request_stop();
        let job_name = session.job.display_name.clone();
        info!(job = %job_name, "stop requested");
        self.emit(RunEvent::warning("Stopping simulation...", Some(job_name)));
        self.set_state(RunState::Stopping);
        true
    }

    fn continue_queue(&mut self) -> RunnerResult<()> {
        if self.session.is_some() {
            return Err(RunnerError::AlreadyRunning);
        }
        if !self.continuation_offered {
            return Err(RunnerError::NoContinuationPending);
        }

        let delay = self.options.continue_delay();
        self.continuation_offered = false;
        self.pending_start = Some(Instant::now() + delay);
        self.emit(RunEvent::info(
            format!("Starting next simulation in {}", format_delay(delay)),
            None,
        ));
        self.publish();
        Ok(())
    }

    fn decline_continuation(&mut self) {
        if !self.continuation_offered {
            return;
        }
        self.continuation_offered = false;
        self.emit(RunEvent::info(
            format!(
                "Queue paused with {} simulation(s) pending",
                self.queue.len()
            ),
            None,
        ));
        self.publish();
    }

    fn shutdown(&mut self) {
        self.pending_start = None;
        if let Some(session) = &self.session {
            session.stop.request_stop();
        }
    }

    // =========================================================================
    // Engine events
    // =========================================================================

    fn handle_engine_event(&mut self, event: Option<EngineEvent>) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let job_name = session.job.display_name.clone();

        let Some(event) = event else {
            // worker ended without a terminal event
            let outcome = if self.state == RunState::Stopping {
                RunOutcome::Cancelled
            } else {
                RunOutcome::Failed(SYNTHETIC_EXIT_CODE)
            };
            self.finish(outcome, Some(SYNTHETIC_EXIT_CODE));
            return;
        };

        match event {
            EngineEvent::Launched {
                command,
                working_dir,
                ..
            } => {
                let file_name = session.job.file_name.display().to_string();
                self.emit(RunEvent::info(
                    format!("Starting simulation: {}", command),
                    Some(job_name.clone()),
                ));
                self.emit(RunEvent::info(
                    format!("Working directory: {}", working_dir.display()),
                    Some(job_name.clone()),
                ));
                self.emit(RunEvent::info(
                    format!("Simulation file: {}", file_name),
                    Some(job_name.clone()),
                ));
                self.emit(RunEvent::EngineLaunched {
                    job_name,
                    command,
                    working_dir,
                });
            }
            EngineEvent::OutputLine(line) => {
                self.emit(RunEvent::output(job_name, line));
            }
            EngineEvent::ProgressUpdate(percent) => {
                session.last_progress = percent;
                self.emit(RunEvent::progress(job_name, percent));
                self.publish();
            }
            EngineEvent::ReadError(message) => {
                session.stream_failed = true;
                self.emit(RunEvent::error(message, Some(job_name)));
            }
            EngineEvent::LaunchFailed(message) => {
                self.emit(RunEvent::error(message, Some(job_name)));
                self.finish(RunOutcome::LaunchFailed, None);
            }
            EngineEvent::ProcessExited(code) => {
                let cancelled = self.state == RunState::Stopping;
                let outcome =
                    self.classifier
                        .classify_session(code, cancelled, session.stream_failed);
                self.finish(outcome, Some(code));
            }
        }
    }

    /// Report the outcome, return to idle and offer to continue the queue
    fn finish(&mut self, outcome: RunOutcome, exit_code: Option<i64>) {
        let Some(session) = self.session.take() else {
            return;
        };
        let duration = session.started.elapsed();
        let job = session.job;

        info!(
            job = %job.display_name,
            outcome = %outcome,
            exit_code = ?exit_code,
            duration_ms = duration.as_millis() as u64,
            "simulation finished"
        );

        self.last_outcome = Some(outcome.clone());
        self.set_state(RunState::Finished(outcome.clone()));

        self.emit(RunEvent::JobFinished {
            job,
            outcome,
            exit_code,
            duration,
        });

        self.set_state(RunState::Idle);

        if let Some(next) = self.queue.peek().cloned() {
            self.continuation_offered = true;
            let remaining = self.queue.len();
            self.emit(RunEvent::ContinuationOffered { remaining, next });
            self.publish();
        }
    }

    // =========================================================================
    // Observers
    // =========================================================================

    fn set_state(&mut self, state: RunState) {
        self.state = state.clone();
        self.emit(RunEvent::StateChanged { state });
        self.publish();
    }

    fn emit(&mut self, event: RunEvent) {
        self.subscribers.broadcast(event);
    }

    fn snapshot(&self) -> ControllerStatus {
        let status_text = match (&self.state, &self.last_outcome) {
            (RunState::Running, _) => "Running".to_string(),
            (RunState::Stopping, _) => "Stopping".to_string(),
            (RunState::Finished(outcome), _) => outcome.status_text().to_string(),
            (RunState::Idle, Some(outcome)) => outcome.status_text().to_string(),
            (RunState::Idle, None) => "Ready".to_string(),
        };

        ControllerStatus {
            state: self.state.clone(),
            current_job: self.session.as_ref().map(|s| s.job.clone()),
            last_progress: self.session.as_ref().map_or(0, |s| s.last_progress),
            queued: self.queue.iter().cloned().collect(),
            last_outcome: self.last_outcome.clone(),
            continuation_offered: self.continuation_offered,
            status_text,
        }
    }

    fn publish(&self) {
        self.status_tx.send_replace(self.snapshot());
    }
}

async fn next_engine_event(session: &mut Option<RunSession>) -> Option<EngineEvent> {
    match session {
        Some(session) => session.events.recv().await,
        None => std::future::pending().await,
    }
}

fn format_delay(delay: Duration) -> String {
    if delay.as_millis() % 1000 == 0 {
        format!("{}s", delay.as_secs())
    } else {
        format!("{}ms", delay.as_millis())
    }
}

/// Cloneable handle used to drive a spawned [`RunController`]
#[derive(Debug, Clone)]
pub struct ControllerHandle {
    commands: mpsc::UnboundedSender<ControlCommand>,
    status: watch::Receiver<ControllerStatus>,
}

impl ControllerHandle {
    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> ControlCommand,
    ) -> RunnerResult<T> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(command(tx))
            .map_err(|_| RunnerError::ControllerClosed)?;
        rx.await.map_err(|_| RunnerError::ControllerClosed)
    }

    /// Append a simulation file to the queue, resolving its working directory now
    pub async fn enqueue(&self, file: impl Into<PathBuf>) -> RunnerResult<Job> {
        let file = file.into();
        self.request(|reply| ControlCommand::Enqueue { file, reply })
            .await?
    }

    /// Dequeue the next job and launch it
    pub async fn start(&self) -> RunnerResult<Job> {
        self.request(|reply| ControlCommand::Start { reply }).await?
    }

    /// Request cancellation of the running job. Returns `false` when nothing
    /// was running. Does not wait for the process to exit; see [`Self::wait_idle`].
    pub async fn stop(&self) -> RunnerResult<bool> {
        self.request(|reply| ControlCommand::Stop { reply }).await
    }

    /// Drop all pending jobs, returning how many were removed
    pub async fn clear_queue(&self) -> RunnerResult<usize> {
        self.request(|reply| ControlCommand::ClearQueue { reply })
            .await
    }

    /// Accept an offered continuation; the next job starts after the settle delay
    pub async fn continue_queue(&self) -> RunnerResult<()> {
        self.request(|reply| ControlCommand::Continue { reply })
            .await?
    }

    /// Decline an offered continuation, leaving the queue intact
    pub async fn decline_continuation(&self) -> RunnerResult<()> {
        self.request(|reply| ControlCommand::Decline { reply }).await
    }

    /// Register a new observer
    pub async fn subscribe(&self) -> RunnerResult<RunEventReceiver> {
        self.request(|reply| ControlCommand::Subscribe { reply })
            .await
    }

    /// Latest published status
    pub fn status(&self) -> ControllerStatus {
        self.status.borrow().clone()
    }

    /// Receiver that observes every status change
    pub fn watch_status(&self) -> watch::Receiver<ControllerStatus> {
        self.status.clone()
    }

    /// Wait until no session is active
    pub async fn wait_idle(&self) -> RunnerResult<ControllerStatus> {
        let mut status = self.status.clone();
        let idle = status
            .wait_for(|s| s.state == RunState::Idle)
            .await
            .map_err(|_| RunnerError::ControllerClosed)?;
        Ok(idle.clone())
    }

    /// Stop any active session and end the controller task
    pub async fn shutdown(&self) -> RunnerResult<()> {
        self.request(|reply| ControlCommand::Shutdown { reply })
            .await
    }
}
