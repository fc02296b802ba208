use clap::Args;
use color_eyre::Result;
use tokio::io::{AsyncBufReadExt, BufReader};

use runner_service::estimate_progress;

/// Estimate progress for engine telemetry read from stdin
#[derive(Args, Debug)]
pub struct EstimateArgs {
    /// Also echo lines that carry no iteration count
    #[arg(long, short = 'a')]
    pub all: bool,
}

pub async fn execute(args: EstimateArgs) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        match estimate_progress(&line) {
            Some(percent) => println!("{:>3}%  {}", percent, line),
            None if args.all => println!("   -  {}", line),
            None => {}
        }
    }
    Ok(())
}
