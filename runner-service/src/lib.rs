// Runner Service Library
// Queue-driven supervision of external simulation engine processes

pub mod config;
pub mod error;
pub mod execution;
pub mod job;
pub mod progress;
pub mod runners;

// Re-export commonly used types
pub use config::{EngineConfig, Interpreter, Options};
pub use error::{RunnerError, RunnerResult};
pub use job::{Job, JobQueue};
pub use progress::{estimate_progress, percent_for_iteration};

// Re-export execution types
pub use execution::{
    ControllerHandle, ControllerStatus, ExitClassifier, LogLevel, RunController, RunEvent,
    RunEventReceiver, RunOutcome, RunState,
};

// Re-export runner types
pub use runners::{Engine, EngineEvent, EngineLocator, EngineSession, ProcessSupervisor, StopHandle};
