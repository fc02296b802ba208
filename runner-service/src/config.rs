// Runner Configuration
// Options read by the run controller and the engine locator

use crate::error::{RunnerError, RunnerResult};

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Exit code the engine reports when it finishes with output warnings.
///
/// The engine exits with `-1`; Windows reports that as an unsigned 32-bit
/// status, Unix truncates it to the low byte.
#[cfg(windows)]
pub const DEFAULT_WARNING_EXIT_CODE: i64 = 4_294_967_295;
#[cfg(not(windows))]
pub const DEFAULT_WARNING_EXIT_CODE: i64 = 255;

/// Runner options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Options {
    /// Directory relative simulation files are resolved against
    pub working_directory: PathBuf,
    /// Directory standing in for "the current directory" when searching for the engine
    pub launch_directory: PathBuf,
    /// How to find and invoke the engine
    pub engine: EngineConfig,
    /// Exit codes classified as "completed with warnings"
    pub warning_exit_codes: Vec<i64>,
    /// Settle delay before a continued queue starts its next job (milliseconds)
    pub continue_delay_ms: u64,
    /// Diagnostic log level
    pub log_level: LogLevel,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            working_directory: PathBuf::from("."),
            launch_directory: PathBuf::from("."),
            engine: EngineConfig::default(),
            warning_exit_codes: vec![DEFAULT_WARNING_EXIT_CODE],
            continue_delay_ms: 1000,
            log_level: LogLevel::Warning,
        }
    }
}

/// Engine artifact and launcher settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// File name searched for in the candidate directories
    pub artifact: String,
    /// Case-insensitive name fragment used by the fallback scan
    pub product_name: String,
    /// Program that runs the artifact; `None` executes the artifact directly
    pub interpreter: Option<Interpreter>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            artifact: "StarfishCLI.jar".to_string(),
            product_name: "starfish".to_string(),
            interpreter: Some(Interpreter {
                program: "java".to_string(),
                args: vec!["-jar".to_string()],
            }),
        }
    }
}

/// Launcher placed in front of the engine artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interpreter {
    /// Program name (looked up on PATH) or path
    pub program: String,
    /// Arguments placed between the program and the artifact
    #[serde(default)]
    pub args: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    #[default]
    Warning,
    Error,
}

impl LogLevel {
    /// Directive understood by `tracing` filters
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl Options {
    /// Parse options from YAML text
    pub fn from_yaml(content: &str) -> RunnerResult<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Load options from a YAML file
    pub fn load(path: &Path) -> RunnerResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            RunnerError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_yaml(&content)
    }

    /// Load the given file, or the default config file if it exists, or defaults
    pub fn load_or_default(path: Option<&Path>) -> RunnerResult<Self> {
        match path {
            Some(path) => Self::load(path),
            None => match Self::default_config_path() {
                Some(default_path) if default_path.is_file() => Self::load(&default_path),
                _ => Ok(Self::default()),
            },
        }
    }

    /// `<config dir>/starfish-runner/config.yaml`
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("starfish-runner").join("config.yaml"))
    }

    /// Anchor relative directories to an explicitly supplied base directory
    pub fn with_directories(mut self, base: &Path) -> Self {
        if self.working_directory.is_relative() {
            self.working_directory = base.join(&self.working_directory);
        }
        if self.launch_directory.is_relative() {
            self.launch_directory = base.join(&self.launch_directory);
        }
        self
    }

    /// Override the working directory
    pub fn with_working_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_directory = dir.into();
        self
    }

    pub fn continue_delay(&self) -> Duration {
        Duration::from_millis(self.continue_delay_ms)
    }
}
