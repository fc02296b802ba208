use std::path::PathBuf;

use clap::Args;
use color_eyre::Result;

use runner_service::Options;

use super::ConfigArgs;

/// Open the interactive queue
#[derive(Args, Debug, Default)]
pub struct TuiArgs {
    /// Simulation files to queue on startup
    #[arg(value_name = "FILES")]
    pub files: Vec<PathBuf>,

    #[command(flatten)]
    pub config: ConfigArgs,
}

pub async fn execute(args: TuiArgs, options: Options) -> Result<()> {
    starfish_tui::run(options, args.files).await
}
