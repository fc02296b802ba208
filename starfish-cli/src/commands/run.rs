use crate::output;

use std::path::PathBuf;

use clap::Args;
use color_eyre::Result;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

use runner_service::{Job, LogLevel, RunController, RunEvent};

use super::ConfigArgs;

/// Run simulation files in order
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Simulation files, run in the order given
    #[arg(required = true, value_name = "FILES")]
    pub files: Vec<PathBuf>,

    /// Continue with the next file without asking
    #[arg(long, short = 'y')]
    pub yes: bool,

    #[command(flatten)]
    pub config: ConfigArgs,
}

pub async fn execute(args: RunArgs, options: runner_service::Options) -> Result<()> {
    let mut controller = RunController::with_process_engine(options);
    let mut events = controller.subscribe();
    let handle = controller.spawn();

    for file in &args.files {
        handle.enqueue(file.clone()).await?;
    }
    handle.start().await?;

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let mut failed = 0usize;
    let mut finished = 0usize;
    let mut remaining = args.files.len();

    loop {
        let event = tokio::select! {
            event = events.recv() => event,
            _ = tokio::signal::ctrl_c() => {
                output::warning("Interrupted, stopping simulation");
                remaining = 0;
                handle.clear_queue().await?;
                if handle.stop().await? {
                    continue;
                }
                // between jobs: nothing left to wait for
                break;
            }
        };
        let Some(event) = event else {
            break;
        };

        match event {
            RunEvent::JobStarted { job, remaining: left } => {
                remaining = left;
                println!();
                output::header(&format!(
                    "{} ({} more queued)",
                    job.file_reference.display(),
                    left
                ));
            }

            RunEvent::EngineLaunched {
                command,
                working_dir,
                ..
            } => {
                output::status("Launching", &command);
                output::dim(&format!("             in {}", working_dir.display()));
            }

            RunEvent::Output { line, .. } => output::engine_output(&line),

            RunEvent::Progress { job_name, percent } => output::progress(&job_name, percent),

            RunEvent::JobFinished {
                job,
                outcome,
                duration,
                ..
            } => {
                finished += 1;
                if output::finished(&job.display_name, &outcome, duration) {
                    failed += 1;
                }
                if remaining == 0 {
                    break;
                }
            }

            RunEvent::ContinuationOffered {
                remaining: left,
                next,
            } => {
                let accepted = args.yes || confirm_continue(&mut stdin, left, &next).await?;
                if accepted {
                    handle.continue_queue().await?;
                } else {
                    handle.decline_continuation().await?;
                    output::warning(&format!("{} simulation(s) left unrun", left));
                    break;
                }
            }

            RunEvent::Log { level, message, .. } => match level {
                LogLevel::Error => output::error(&message),
                LogLevel::Warning => output::warning(&message),
                LogLevel::Info => output::info(&message),
                LogLevel::Debug => output::dim(&message),
            },

            RunEvent::JobQueued { .. }
            | RunEvent::QueueCleared { .. }
            | RunEvent::StateChanged { .. } => {}
        }
    }

    handle.shutdown().await?;

    println!();
    if failed > 0 {
        output::failure(&format!("{} of {} simulation(s) did not succeed", failed, finished));
        std::process::exit(1);
    }
    output::success(&format!("{} simulation(s) finished", finished));
    Ok(())
}

/// Ask on stdin whether to start the next job. End of input declines.
async fn confirm_continue(stdin: &mut Lines<BufReader<Stdin>>, remaining: usize, next: &Job) -> Result<bool> {
    eprint!(
        "There are {} more simulation(s) in the queue; next is {}. Continue? [y/N] ",
        remaining, next.display_name
    );
    let answer = tokio::select! {
        line = stdin.next_line() => line?,
        _ = tokio::signal::ctrl_c() => None,
    };
    Ok(matches!(
        answer.as_deref().map(str::trim),
        Some("y") | Some("Y") | Some("yes")
    ))
}
