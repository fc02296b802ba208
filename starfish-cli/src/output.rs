// Terminal output for the CLI commands
// Runner chatter goes to stderr; engine lines go to stdout so they can be piped

use std::time::Duration;

use runner_service::RunOutcome;

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const RED: &str = "\x1b[1;31m";
const GREEN: &str = "\x1b[1;32m";
const YELLOW: &str = "\x1b[33m";
const BLUE: &str = "\x1b[1;34m";
const CYAN: &str = "\x1b[36m";

/// Cells in the progress bar
const BAR_WIDTH: usize = 24;

/// Right-aligned verb followed by a message, e.g. `   Launching java -jar ...`
pub fn status(action: &str, message: &str) {
    eprintln!("{BOLD}{CYAN}{:>12}{RESET} {}", action, message);
}

/// Start of a new simulation or section
pub fn header(message: &str) {
    eprintln!("{BOLD}==> {}{RESET}", message);
}

pub fn success(message: &str) {
    mark(GREEN, '\u{2713}', message);
}

pub fn failure(message: &str) {
    mark(RED, '\u{2717}', message);
}

pub fn warning(message: &str) {
    mark(YELLOW, '!', message);
}

pub fn info(message: &str) {
    mark(CYAN, 'i', message);
}

/// A location that was checked and exists
pub fn check(message: &str) {
    mark(GREEN, '*', message);
}

pub fn error(message: &str) {
    eprintln!("{RED}error:{RESET} {}", message);
}

pub fn dim(message: &str) {
    eprintln!("{DIM}{}{RESET}", message);
}

fn mark(color: &str, symbol: char, message: &str) {
    eprintln!("{color}  {}{RESET} {}", symbol, message);
}

/// One line of engine output
pub fn engine_output(line: &str) {
    println!("        | {}", line);
}

/// Progress estimate for the running simulation
pub fn progress(job_name: &str, percent: u8) {
    eprintln!(
        "{BLUE}{:>12}{RESET} {} {} {:>3}%",
        "Progress",
        progress_bar(percent),
        job_name,
        percent
    );
}

fn progress_bar(percent: u8) -> String {
    let filled = usize::from(percent.min(100)) * BAR_WIDTH / 100;
    format!("[{}{}]", "#".repeat(filled), ".".repeat(BAR_WIDTH - filled))
}

/// Report how a simulation ended. Returns `true` when it did not succeed.
pub fn finished(job_name: &str, outcome: &RunOutcome, duration: Duration) -> bool {
    let message = format!(
        "{}: {} ({})",
        job_name,
        outcome.message(),
        format_duration(duration)
    );
    match outcome {
        RunOutcome::Success => {
            success(&message);
            false
        }
        RunOutcome::CompletedWithWarnings => {
            warning(&message);
            false
        }
        _ => {
            failure(&message);
            true
        }
    }
}

fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs >= 60 {
        format!("{}m {:02}s", secs / 60, secs % 60)
    } else {
        format!("{:.2}s", duration.as_secs_f64())
    }
}
