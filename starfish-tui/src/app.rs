use crate::events::EventHandler;
use crate::ui;

use color_eyre::Result;
use ratatui::DefaultTerminal;

use std::path::PathBuf;
use std::time::Duration;

use runner_service::{
    ControllerHandle, ControllerStatus, Job, LogLevel, RunEvent, RunEventReceiver, RunOutcome,
};

/// Console lines kept in memory; older lines are dropped first
pub const MAX_OUTPUT_LINES: usize = 10_000;

// =============================================================================
// Application States
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppState {
    /// Queue, progress and live console
    Runner,
    /// Typing the path of a simulation file to queue
    AddFile,
    /// Scrollable, searchable console history
    ExecutionLog,
}

/// Controller calls requested by a key press, performed on the next loop turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingAction {
    Enqueue(PathBuf),
    Start,
    Stop,
    ClearQueue,
    Continue,
    Decline,
}

// =============================================================================
// Application
// =============================================================================

pub struct App {
    pub state: AppState,
    pub previous_states: Vec<AppState>,
    pub should_quit: bool,

    // Controller
    pub controller: ControllerHandle,
    pub event_receiver: RunEventReceiver,
    pub status: ControllerStatus,
    pub pending: Option<PendingAction>,

    // Console
    pub output_lines: Vec<OutputLine>,
    pub current_job: Option<String>,
    pub last_finished: Option<FinishedJob>,

    /// One-line message shown above the footer
    pub notice: Option<Notice>,

    // Add-file input
    pub input: String,

    // Log viewer state
    pub log_viewer: LogViewerState,
}

#[derive(Debug, Clone)]
pub struct OutputLine {
    pub text: String,
    pub kind: OutputKind,
    pub job_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputKind {
    Info,
    Output,
    Error,
    Success,
    Failure,
    Warning,
    JobHeader,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinishedJob {
    pub name: String,
    pub outcome: RunOutcome,
    pub duration: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub text: String,
    pub is_error: bool,
}

// =============================================================================
// Log Viewer State
// =============================================================================

#[derive(Debug, Clone, Default)]
pub struct LogViewerState {
    pub scroll_offset: usize,
    pub search_query: String,
    pub search_active: bool,
    pub search_matches: Vec<usize>,
    pub current_match: usize,
    pub filter_job: Option<String>,
}

impl LogViewerState {
    pub fn reset(&mut self) {
        self.scroll_offset = 0;
        self.search_query.clear();
        self.search_active = false;
        self.search_matches.clear();
        self.current_match = 0;
        self.filter_job = None;
    }
}

// =============================================================================
// App Implementation
// =============================================================================

impl App {
    pub fn new(controller: ControllerHandle, event_receiver: RunEventReceiver) -> Self {
        let status = controller.status();
        Self {
            state: AppState::Runner,
            previous_states: Vec::new(),
            should_quit: false,
            controller,
            event_receiver,
            status,
            pending: None,
            output_lines: Vec::new(),
            current_job: None,
            last_finished: None,
            notice: None,
            input: String::new(),
            log_viewer: LogViewerState::default(),
        }
    }

    pub async fn run(&mut self, mut terminal: DefaultTerminal) -> Result<()> {
        while !self.should_quit {
            terminal.draw(|frame| ui::render(self, frame))?;
            self.handle_events()?;

            // Handle pending controller call
            if let Some(action) = self.pending.take() {
                self.perform(action).await;
            }

            // Process run events
            self.process_run_events();
        }
        Ok(())
    }

    // =========================================================================
    // Navigation
    // =========================================================================

    pub fn push_state(&mut self, new_state: AppState) {
        let old = self.state.clone();
        self.previous_states.push(old);
        self.state = new_state;
    }

    pub fn go_back(&mut self) {
        if let Some(prev) = self.previous_states.pop() {
            self.state = prev;
        } else {
            self.should_quit = true;
        }
    }

    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    // =========================================================================
    // Runner actions
    // =========================================================================

    pub fn request(&mut self, action: PendingAction) {
        self.pending = Some(action);
    }

    /// Pausing a running engine is not supported; say so instead of silently ignoring the key
    pub fn explain_pause(&mut self) {
        let text = if self.status.is_active() {
            "Pause is not supported by the engine. Press x to stop the simulation instead."
        } else {
            "Nothing is running."
        };
        self.set_notice(text, false);
    }

    pub fn open_add_file(&mut self) {
        self.input.clear();
        self.push_state(AppState::AddFile);
    }

    pub fn input_push(&mut self, c: char) {
        self.input.push(c);
    }

    pub fn input_pop(&mut self) {
        self.input.pop();
    }

    pub fn confirm_add_file(&mut self) {
        let path = self.input.trim().to_string();
        self.input.clear();
        self.go_back();
        if !path.is_empty() {
            self.request(PendingAction::Enqueue(PathBuf::from(path)));
        }
    }

    pub fn cancel_add_file(&mut self) {
        self.input.clear();
        self.go_back();
    }

    async fn perform(&mut self, action: PendingAction) {
        let result = match action {
            PendingAction::Enqueue(path) => self.controller.enqueue(path).await.map(|_| ()),
            PendingAction::Start => self.controller.start().await.map(|_| ()),
            PendingAction::Stop => match self.controller.stop().await {
                Ok(false) => {
                    self.set_notice("No simulation is running.", false);
                    Ok(())
                }
                other => other.map(|_| ()),
            },
            PendingAction::ClearQueue => self.controller.clear_queue().await.map(|_| ()),
            PendingAction::Continue => self.controller.continue_queue().await,
            PendingAction::Decline => self.controller.decline_continuation().await,
        };

        if let Err(e) = result {
            self.set_notice(e.to_string(), true);
        }
        self.status = self.controller.status();
    }

    fn set_notice(&mut self, text: impl Into<String>, is_error: bool) {
        self.notice = Some(Notice {
            text: text.into(),
            is_error,
        });
    }

    // =========================================================================
    // Run events
    // =========================================================================

    pub fn process_run_events(&mut self) {
        while let Ok(event) = self.event_receiver.try_recv() {
            self.apply_event(event);
        }
        self.status = self.controller.status();
    }

    pub fn apply_event(&mut self, event: RunEvent) {
        match event {
            RunEvent::JobQueued { .. } | RunEvent::QueueCleared { .. } => {
                // reflected through the status snapshot
            }

            RunEvent::JobStarted { job, remaining } => {
                self.notice = None;
                self.current_job = Some(job.display_name.clone());
                self.push_line(
                    format!(
                        "=== {} ({} more queued) ===",
                        job.file_reference.display(),
                        remaining
                    ),
                    OutputKind::JobHeader,
                    Some(job.display_name),
                );
            }

            RunEvent::EngineLaunched { .. } => {}

            RunEvent::Output { job_name, line } => {
                self.push_line(line, OutputKind::Output, Some(job_name));
            }

            RunEvent::Progress { .. } | RunEvent::StateChanged { .. } => {}

            RunEvent::JobFinished {
                job,
                outcome,
                duration,
                ..
            } => {
                let kind = match outcome {
                    RunOutcome::Success => OutputKind::Success,
                    RunOutcome::CompletedWithWarnings | RunOutcome::Cancelled => {
                        OutputKind::Warning
                    }
                    RunOutcome::Failed(_) | RunOutcome::LaunchFailed => OutputKind::Failure,
                };
                self.push_line(
                    format!(
                        "{} in {}",
                        outcome.message(),
                        ui::components::format_duration(duration.as_secs_f64())
                    ),
                    kind,
                    Some(job.display_name.clone()),
                );
                self.current_job = None;
                self.last_finished = Some(FinishedJob {
                    name: job.display_name,
                    outcome,
                    duration,
                });
            }

            RunEvent::ContinuationOffered { remaining, next } => {
                self.push_line(
                    continuation_prompt(remaining, &next),
                    OutputKind::Info,
                    None,
                );
            }

            RunEvent::Log {
                level,
                message,
                job_name,
            } => {
                let kind = match level {
                    LogLevel::Error => OutputKind::Error,
                    LogLevel::Warning => OutputKind::Warning,
                    LogLevel::Info | LogLevel::Debug => OutputKind::Info,
                };
                self.push_line(message, kind, job_name);
            }
        }
    }

    fn push_line(&mut self, text: impl Into<String>, kind: OutputKind, job_name: Option<String>) {
        self.output_lines.push(OutputLine {
            text: text.into(),
            kind,
            job_name,
        });

        if self.output_lines.len() > MAX_OUTPUT_LINES {
            let excess = self.output_lines.len() - MAX_OUTPUT_LINES;
            self.output_lines.drain(..excess);
            self.log_viewer.scroll_offset = self.log_viewer.scroll_offset.saturating_sub(excess);
            if !self.log_viewer.search_query.is_empty() {
                self.update_search_matches();
            }
        }
    }

    // =========================================================================
    // Log Viewer
    // =========================================================================

    pub fn open_log_viewer(&mut self) {
        self.log_viewer.reset();
        self.log_viewer.scroll_offset = self.output_lines.len();
        self.push_state(AppState::ExecutionLog);
    }

    pub fn scroll_up(&mut self, lines: usize) {
        let max = self.max_scroll_offset();
        self.log_viewer.scroll_offset = self.log_viewer.scroll_offset.min(max).saturating_sub(lines);
    }

    pub fn scroll_down(&mut self, lines: usize) {
        let max = self.max_scroll_offset();
        self.log_viewer.scroll_offset = (self.log_viewer.scroll_offset + lines).min(max);
    }

    pub fn scroll_to_top(&mut self) {
        self.log_viewer.scroll_offset = 0;
    }

    pub fn scroll_to_bottom(&mut self) {
        self.log_viewer.scroll_offset = self.max_scroll_offset();
    }

    fn max_scroll_offset(&self) -> usize {
        self.filtered_output_lines().len().saturating_sub(1)
    }

    /// Show only lines of the job that produced the line at the top of the view
    pub fn toggle_job_filter(&mut self) {
        if self.log_viewer.filter_job.is_some() {
            self.log_viewer.filter_job = None;
        } else {
            let offset = self.log_viewer.scroll_offset;
            self.log_viewer.filter_job = self
                .filtered_output_lines()
                .get(offset)
                .and_then(|line| line.job_name.clone())
                .or_else(|| self.current_job.clone());
        }
        self.log_viewer.scroll_offset = 0;
        self.update_search_matches();
    }

    pub fn start_search(&mut self) {
        if self.state == AppState::ExecutionLog {
            self.log_viewer.search_active = true;
            self.log_viewer.search_query.clear();
            self.log_viewer.search_matches.clear();
            self.log_viewer.current_match = 0;
        }
    }

    pub fn search_push_char(&mut self, c: char) {
        if self.log_viewer.search_active {
            self.log_viewer.search_query.push(c);
            self.update_search_matches();
        }
    }

    pub fn search_pop_char(&mut self) {
        if self.log_viewer.search_active {
            self.log_viewer.search_query.pop();
            self.update_search_matches();
        }
    }

    pub fn cancel_search(&mut self) {
        self.log_viewer.search_active = false;
        self.log_viewer.search_query.clear();
        self.log_viewer.search_matches.clear();
        self.log_viewer.current_match = 0;
    }

    pub fn confirm_search(&mut self) {
        self.log_viewer.search_active = false;
        if !self.log_viewer.search_matches.is_empty() {
            self.log_viewer.scroll_offset =
                self.log_viewer.search_matches[self.log_viewer.current_match];
        }
    }

    pub fn next_search_match(&mut self) {
        if !self.log_viewer.search_matches.is_empty() {
            self.log_viewer.current_match =
                (self.log_viewer.current_match + 1) % self.log_viewer.search_matches.len();
            self.log_viewer.scroll_offset =
                self.log_viewer.search_matches[self.log_viewer.current_match];
        }
    }

    fn update_search_matches(&mut self) {
        let query = self.log_viewer.search_query.to_lowercase();
        let matches: Vec<usize> = if query.is_empty() {
            Vec::new()
        } else {
            self.filtered_output_lines()
                .iter()
                .enumerate()
                .filter(|(_, line)| line.text.to_lowercase().contains(&query))
                .map(|(i, _)| i)
                .collect()
        };
        self.log_viewer.search_matches = matches;
        self.log_viewer.current_match = 0;
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    /// Output lines for the log viewer, honouring the job filter
    pub fn filtered_output_lines(&self) -> Vec<&OutputLine> {
        self.output_lines
            .iter()
            .filter(|line| match (&self.log_viewer.filter_job, &line.job_name) {
                (Some(filter), Some(job)) => job == filter,
                (Some(_), None) => false,
                (None, _) => true,
            })
            .collect()
    }

    /// Progress of the running job as a ratio (0.0 to 1.0)
    pub fn execution_progress(&self) -> f64 {
        if self.status.is_active() {
            f64::from(self.status.last_progress) / 100.0
        } else if self
            .last_finished
            .as_ref()
            .is_some_and(|f| f.outcome.is_success())
        {
            1.0
        } else {
            0.0
        }
    }

    /// Question shown while a continuation is offered
    pub fn continuation_question(&self) -> Option<String> {
        if !self.status.continuation_offered {
            return None;
        }
        let next = self.status.queued.first()?;
        Some(continuation_prompt(self.status.queued.len(), next))
    }
}

fn continuation_prompt(remaining: usize, next: &Job) -> String {
    format!(
        "There are {} more simulation(s) in the queue (next: {}). Continue? [y/n]",
        remaining, next.display_name
    )
}
