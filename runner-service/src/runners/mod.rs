// Runners Module
// Locates the simulation engine and supervises its processes

pub mod engine;
pub mod locator;
pub mod supervisor;

// Re-export key types
pub use engine::{Engine, EngineEvent, EngineEventReceiver, EngineEventSender, EngineSession, StopHandle};
pub use locator::{EngineCommand, EngineLocator};
pub use supervisor::ProcessSupervisor;
