// Execution Module
// Run controller, its events and outcome classification

pub mod controller;
pub mod events;
pub mod outcome;

// Re-export key types
pub use controller::{ControllerHandle, ControllerStatus, RunController, RunState};
pub use events::{event_channel, LogLevel, RunEvent, RunEventReceiver, RunEventSender, Subscribers};
pub use outcome::{raw_exit_code, ExitClassifier, RunOutcome, SYNTHETIC_EXIT_CODE};
