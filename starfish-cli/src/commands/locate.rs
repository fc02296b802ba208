use crate::output;

use clap::Args;
use color_eyre::Result;

use runner_service::{EngineLocator, Options};

use super::ConfigArgs;

/// Show the engine search order and the engine that would be used
#[derive(Args, Debug)]
pub struct LocateArgs {
    #[command(flatten)]
    pub config: ConfigArgs,
}

pub fn execute(options: Options) -> Result<()> {
    let locator = EngineLocator::from_options(&options);

    output::header(&format!("Searching for {}", locator.engine().artifact));
    for (i, candidate) in locator.candidates().iter().enumerate() {
        let line = format!("{:>2}. {}", i + 1, candidate.display());
        if candidate.is_file() {
            output::check(&line);
        } else {
            output::dim(&format!("    {}", line));
        }
    }

    match locator.locate() {
        Ok(path) => {
            println!("{}", path.display());
            Ok(())
        }
        Err(e) => {
            output::error(&e.detailed());
            std::process::exit(1);
        }
    }
}
