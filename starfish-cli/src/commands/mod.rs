// CLI Commands
// One module per subcommand plus the options every runner command shares

pub mod estimate;
pub mod locate;
pub mod run;
pub mod tui;

use std::path::PathBuf;

use clap::Args;
use color_eyre::Result;

use runner_service::Options;

/// Configuration flags shared by commands that drive the runner
#[derive(Args, Debug, Default, Clone)]
pub struct ConfigArgs {
    /// Directory relative simulation files are resolved against
    #[arg(long, short = 'w', value_name = "DIR")]
    pub working_dir: Option<PathBuf>,

    /// Config file (defaults to the user config directory)
    #[arg(long, short = 'c', value_name = "FILE")]
    pub config: Option<PathBuf>,
}

impl ConfigArgs {
    /// Load options and anchor relative directories to the current directory
    pub fn load(&self) -> Result<Options> {
        let mut options = Options::load_or_default(self.config.as_deref())?;
        if let Some(dir) = &self.working_dir {
            options = options.with_working_directory(dir.clone());
        }
        let current_dir = std::env::current_dir()?;
        Ok(options.with_directories(&current_dir))
    }
}
