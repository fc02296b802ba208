// Runner Errors
// Error type shared by the queue, the engine locator and the run controller

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result alias used throughout the runner service
pub type RunnerResult<T> = Result<T, RunnerError>;

/// Errors reported by the runner service
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("No simulations in the queue")]
    EmptyQueue,

    #[error("A simulation is already running")]
    AlreadyRunning,

    #[error("No queue continuation is pending")]
    NoContinuationPending,

    #[error("{artifact} not found (searched {} locations)", .searched.len())]
    EngineNotFound {
        artifact: String,
        searched: Vec<PathBuf>,
    },

    #[error("Interpreter '{0}' not found on PATH")]
    InterpreterNotFound(String),

    #[error("Invalid simulation file reference: {}", .0.display())]
    InvalidJob(PathBuf),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to parse configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Run controller is no longer running")]
    ControllerClosed,
}

impl RunnerError {
    /// Multi-line description suitable for a console, listing searched paths
    pub fn detailed(&self) -> String {
        match self {
            RunnerError::EngineNotFound { artifact, searched } => {
                let mut message = format!(
                    "Error: {} not found!\nPlease ensure {} is in one of these locations:\n",
                    artifact, artifact
                );
                for path in searched {
                    message.push_str(&format!("- {}\n", path.display()));
                }
                message
            }
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_not_found_lists_locations() {
        let err = RunnerError::EngineNotFound {
            artifact: "StarfishCLI.jar".to_string(),
            searched: vec![PathBuf::from("a/StarfishCLI.jar"), PathBuf::from("b/StarfishCLI.jar")],
        };

        assert_eq!(err.to_string(), "StarfishCLI.jar not found (searched 2 locations)");
        let detailed = err.detailed();
        assert!(detailed.contains("- a/StarfishCLI.jar"));
        assert!(detailed.contains("- b/StarfishCLI.jar"));
    }

    #[test]
    fn test_usage_errors_display() {
        assert_eq!(RunnerError::EmptyQueue.to_string(), "No simulations in the queue");
        assert_eq!(
            RunnerError::AlreadyRunning.detailed(),
            "A simulation is already running"
        );
    }
}
