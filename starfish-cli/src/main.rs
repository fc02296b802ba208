mod commands;
mod output;

use clap::{Parser, Subcommand};
use color_eyre::Result;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

use commands::estimate::EstimateArgs;
use commands::locate::LocateArgs;
use commands::run::RunArgs;
use commands::tui::TuiArgs;

/// Queue and supervise Starfish simulation runs
#[derive(Parser, Debug)]
#[command(name = "starfish-run", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Write diagnostic logs to this file
    #[arg(long, global = true, value_name = "FILE")]
    log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run simulation files one after another
    Run(RunArgs),
    /// Show where the engine is searched for and which one is used
    Locate(LocateArgs),
    /// Estimate progress for telemetry lines read from stdin
    Estimate(EstimateArgs),
    /// Open the interactive queue (default)
    Tui(TuiArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    let log_file = cli.log_file.as_deref();

    match cli.command.unwrap_or(Commands::Tui(TuiArgs::default())) {
        Commands::Run(args) => {
            let options = args.config.load()?;
            init_tracing(options.log_level.as_filter(), log_file, true)?;
            commands::run::execute(args, options).await
        }
        Commands::Locate(args) => {
            let options = args.config.load()?;
            init_tracing(options.log_level.as_filter(), log_file, true)?;
            commands::locate::execute(options)
        }
        Commands::Estimate(args) => {
            init_tracing("warn", log_file, true)?;
            commands::estimate::execute(args).await
        }
        Commands::Tui(args) => {
            let options = args.config.load()?;
            // the terminal belongs to the TUI; only log to a file
            init_tracing(options.log_level.as_filter(), log_file, false)?;
            commands::tui::execute(args, options).await
        }
    }
}

/// Install the tracing subscriber. `RUST_LOG` overrides the configured level.
fn init_tracing(level: &str, log_file: Option<&Path>, to_stderr: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    match log_file {
        Some(path) => {
            let file = std::fs::File::create(path)?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .init();
        }
        None if to_stderr => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
        None => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_run() {
        let cli = Cli::try_parse_from(["starfish-run", "run", "a.xml", "b.xml", "-y", "-w", "/sims"])
            .unwrap();
        match cli.command {
            Some(Commands::Run(args)) => {
                assert_eq!(args.files, vec![PathBuf::from("a.xml"), PathBuf::from("b.xml")]);
                assert!(args.yes);
                assert_eq!(args.config.working_dir, Some(PathBuf::from("/sims")));
            }
            other => panic!("expected run command, got {:?}", other),
        }
    }

    #[test]
    fn test_run_requires_files() {
        assert!(Cli::try_parse_from(["starfish-run", "run"]).is_err());
    }

    #[test]
    fn test_default_is_tui() {
        let cli = Cli::try_parse_from(["starfish-run", "--log-file", "runner.log"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.log_file, Some(PathBuf::from("runner.log")));
    }
}
