// Process Supervisor
// Launches one engine process per job and turns its output into events

use crate::config::Options;
use crate::execution::outcome::{raw_exit_code, SYNTHETIC_EXIT_CODE};
use crate::job::Job;
use crate::progress::estimate_progress;
use crate::runners::engine::{Engine, EngineEvent, EngineEventSender, EngineSession, StopHandle};
use crate::runners::locator::{EngineCommand, EngineLocator};

use std::io::{self, BufRead, BufReader, PipeReader, Read};
use std::process::{ExitStatus, Stdio};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Runs the engine as a child process, one supervised task per job
#[derive(Debug, Clone)]
pub struct ProcessSupervisor {
    locator: EngineLocator,
}

impl ProcessSupervisor {
    pub fn new(locator: EngineLocator) -> Self {
        Self { locator }
    }

    pub fn from_options(options: &Options) -> Self {
        Self::new(EngineLocator::from_options(options))
    }

    pub fn locator(&self) -> &EngineLocator {
        &self.locator
    }
}

impl Engine for ProcessSupervisor {
    fn start(&self, job: Job) -> EngineSession {
        let (session, tx) = EngineSession::channel();
        let stop = session.stop.clone();
        let locator = self.locator.clone();

        tokio::spawn(async move {
            supervise(locator, job, tx, stop).await;
        });

        session
    }
}

/// Locate, spawn and monitor one engine invocation.
///
/// Always finishes with exactly one terminal event.
async fn supervise(locator: EngineLocator, job: Job, tx: EngineEventSender, stop: StopHandle) {
    let command = match locator.command_for(&job) {
        Ok(command) => command,
        Err(e) => {
            warn!(job = %job.display_name, error = %e, "engine launch failed");
            let _ = tx.send(EngineEvent::LaunchFailed(e.detailed()));
            return;
        }
    };

    let (mut child, output) = match spawn(&command) {
        Ok(spawned) => spawned,
        Err(e) => {
            warn!(job = %job.display_name, error = %e, "failed to spawn engine");
            let _ = tx.send(EngineEvent::LaunchFailed(format!(
                "Failed to spawn engine process '{}': {}",
                command.program.display(),
                e
            )));
            return;
        }
    };

    info!(
        job = %job.display_name,
        pid = ?child.id(),
        command = %command.display(),
        "engine started"
    );
    let _ = tx.send(EngineEvent::Launched {
        command: command.display(),
        working_dir: command.working_dir.clone(),
        pid: child.id(),
    });

    let (line_tx, mut line_rx) = mpsc::unbounded_channel();
    tokio::task::spawn_blocking(move || forward_lines(output, line_tx));

    loop {
        if stop.is_stop_requested() {
            terminate(&mut child);
            break;
        }

        tokio::select! {
            biased;

            _ = stop.stopped() => {
                terminate(&mut child);
                break;
            }

            line = line_rx.recv() => match line {
                Some(Ok(line)) => {
                    let progress = estimate_progress(&line);
                    let _ = tx.send(EngineEvent::OutputLine(line));
                    if let Some(percent) = progress {
                        let _ = tx.send(EngineEvent::ProgressUpdate(percent));
                    }
                }
                Some(Err(e)) => {
                    warn!(job = %job.display_name, error = %e, "failed to read engine output");
                    let _ = tx.send(EngineEvent::ReadError(format!(
                        "Error reading simulation output: {}",
                        e
                    )));
                    terminate(&mut child);
                    break;
                }
                // every write end is closed; the process may still be running
                None => break,
            }
        }
    }

    let code = match wait_or_stop(&mut child, &stop).await {
        Ok(status) => raw_exit_code(status),
        Err(e) => {
            warn!(job = %job.display_name, error = %e, "failed to collect engine exit status");
            SYNTHETIC_EXIT_CODE
        }
    };
    debug!(job = %job.display_name, code, "engine exited");
    let _ = tx.send(EngineEvent::ProcessExited(code));
}

/// Spawn the engine with stdout and stderr sharing one pipe, so lines keep
/// the order the process wrote them in.
fn spawn(command: &EngineCommand) -> io::Result<(Child, PipeReader)> {
    let (reader, writer) = io::pipe()?;
    let error_writer = writer.try_clone()?;

    // the command, and with it the parent's write ends, is dropped here
    let child = Command::new(&command.program)
        .args(&command.args)
        .current_dir(&command.working_dir)
        .stdin(Stdio::null())
        .stdout(writer)
        .stderr(error_writer)
        .kill_on_drop(true)
        .spawn()?;
    Ok((child, reader))
}

/// Wait for the process to exit, killing it if a stop arrives first
async fn wait_or_stop(child: &mut Child, stop: &StopHandle) -> io::Result<ExitStatus> {
    if !stop.is_stop_requested() {
        tokio::select! {
            status = child.wait() => return status,
            _ = stop.stopped() => {}
        }
    }
    terminate(child);
    child.wait().await
}

fn terminate(child: &mut Child) {
    if let Err(e) = child.start_kill() {
        // already exited
        debug!(error = %e, "engine kill request failed");
    }
}

/// Forward complete lines from the engine's output pipe.
///
/// Runs on a blocking thread. Lines are split on `\n`; a trailing `\r` is
/// dropped and invalid UTF-8 is replaced rather than treated as an error.
fn forward_lines<R: Read>(reader: R, tx: mpsc::UnboundedSender<io::Result<String>>) {
    for segment in BufReader::new(reader).split(b'\n') {
        match segment {
            Ok(bytes) => {
                let line = String::from_utf8_lossy(&bytes);
                let line = line.strip_suffix('\r').unwrap_or(&line).to_string();
                if tx.send(Ok(line)).is_err() {
                    break;
                }
            }
            Err(e) => {
                let _ = tx.send(Err(e));
                break;
            }
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use std::os::unix::fs::PermissionsExt;
    use std::path::Path;
    use std::time::Duration;
    use tempfile::TempDir;

    /// Write an executable shell script that stands in for the engine
    fn write_engine(dir: &Path, name: &str, body: &str) {
        let path = dir.join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    }

    fn supervisor(launch: &Path, work: &Path) -> ProcessSupervisor {
        let engine = EngineConfig {
            artifact: "engine.sh".to_string(),
            product_name: "engine".to_string(),
            interpreter: None,
        };
        ProcessSupervisor::new(EngineLocator::new(engine, launch, work))
    }

    async fn collect(mut session: EngineSession) -> Vec<EngineEvent> {
        let mut events = Vec::new();
        while let Some(event) =
            tokio::time::timeout(Duration::from_secs(10), session.events.recv())
                .await
                .expect("engine session timed out")
        {
            events.push(event);
        }
        events
    }

    fn output_lines(events: &[EngineEvent]) -> Vec<String> {
        events
            .iter()
            .filter_map(|e| match e {
                EngineEvent::OutputLine(line) => Some(line.clone()),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_streams_lines_progress_and_exit_code() {
        let temp = TempDir::new().unwrap();
        write_engine(
            temp.path(),
            "engine.sh",
            "echo \"running $1\"\necho 'it: 100   Ar+: 0'\necho 'it: 3000'\nexit 17",
        );
        let supervisor = supervisor(temp.path(), temp.path());
        let job = Job::resolve("case.xml", temp.path()).unwrap();

        let events = collect(supervisor.start(job)).await;

        assert!(matches!(events.first(), Some(EngineEvent::Launched { .. })));
        assert_eq!(
            &events[1..],
            &[
                EngineEvent::OutputLine("running case.xml".to_string()),
                EngineEvent::OutputLine("it: 100   Ar+: 0".to_string()),
                EngineEvent::ProgressUpdate(10),
                EngineEvent::OutputLine("it: 3000".to_string()),
                EngineEvent::ProgressUpdate(60),
                EngineEvent::ProcessExited(17),
            ]
        );
    }

    #[tokio::test]
    async fn test_runs_in_job_working_directory() {
        let temp = TempDir::new().unwrap();
        let sims = temp.path().join("sims");
        std::fs::create_dir_all(&sims).unwrap();
        write_engine(temp.path(), "engine.sh", "pwd\ntest -f \"$1\" && echo found");
        std::fs::write(sims.join("tube.xml"), "<sim/>").unwrap();

        let supervisor = supervisor(temp.path(), temp.path());
        let job = Job::resolve(sims.join("tube.xml"), temp.path()).unwrap();

        let events = collect(supervisor.start(job)).await;
        let lines = output_lines(&events);

        assert_eq!(
            Path::new(&lines[0]).canonicalize().unwrap(),
            sims.canonicalize().unwrap()
        );
        assert_eq!(lines[1], "found");
        assert_eq!(events.last(), Some(&EngineEvent::ProcessExited(0)));
    }

    #[tokio::test]
    async fn test_stderr_is_merged_into_output() {
        let temp = TempDir::new().unwrap();
        write_engine(temp.path(), "engine.sh", "echo 'bad input' >&2\nexit 0");
        let supervisor = supervisor(temp.path(), temp.path());
        let job = Job::resolve("case.xml", temp.path()).unwrap();

        let events = collect(supervisor.start(job)).await;

        assert_eq!(output_lines(&events), vec!["bad input"]);
        assert_eq!(events.last(), Some(&EngineEvent::ProcessExited(0)));
    }

    #[tokio::test]
    async fn test_interleaved_stdout_and_stderr_keep_order() {
        let temp = TempDir::new().unwrap();
        write_engine(
            temp.path(),
            "engine.sh",
            "i=0\nwhile [ $i -lt 200 ]; do\n  echo o$i\n  echo e$i >&2\n  i=$((i + 1))\ndone",
        );
        let supervisor = supervisor(temp.path(), temp.path());
        let job = Job::resolve("case.xml", temp.path()).unwrap();

        let events = collect(supervisor.start(job)).await;

        let expected: Vec<String> = (0..200)
            .flat_map(|i| [format!("o{}", i), format!("e{}", i)])
            .collect();
        assert_eq!(output_lines(&events), expected);
        assert_eq!(events.last(), Some(&EngineEvent::ProcessExited(0)));
    }

    #[tokio::test]
    async fn test_stop_after_output_closed() {
        let temp = TempDir::new().unwrap();
        write_engine(
            temp.path(),
            "engine.sh",
            "echo started\nexec >/dev/null 2>&1\nexec sleep 30",
        );
        let supervisor = supervisor(temp.path(), temp.path());
        let job = Job::resolve("case.xml", temp.path()).unwrap();

        let mut session = supervisor.start(job);
        loop {
            match session.events.recv().await {
                Some(EngineEvent::OutputLine(line)) if line == "started" => break,
                Some(_) => continue,
                None => panic!("session ended before output"),
            }
        }
        // give the script time to close its output
        tokio::time::sleep(Duration::from_millis(200)).await;
        session.request_stop();

        let events = tokio::time::timeout(Duration::from_secs(3), collect(session))
            .await
            .expect("stop was not honoured after output closed");
        let last = events.last().cloned();
        assert!(
            matches!(last, Some(EngineEvent::ProcessExited(code)) if code != 0),
            "unexpected terminal event {:?}",
            last
        );
    }

    #[tokio::test]
    async fn test_stop_terminates_process() {
        let temp = TempDir::new().unwrap();
        write_engine(temp.path(), "engine.sh", "echo started\nexec sleep 30");
        let supervisor = supervisor(temp.path(), temp.path());
        let job = Job::resolve("case.xml", temp.path()).unwrap();

        let mut session = supervisor.start(job);
        loop {
            match session.events.recv().await {
                Some(EngineEvent::OutputLine(line)) if line == "started" => break,
                Some(_) => continue,
                None => panic!("session ended before output"),
            }
        }
        session.request_stop();

        let events = collect(session).await;
        let last = events.last().cloned();
        assert!(
            matches!(last, Some(EngineEvent::ProcessExited(code)) if code != 0),
            "unexpected terminal event {:?}",
            last
        );
        assert_eq!(events.iter().filter(|e| e.is_terminal()).count(), 1);
    }

    #[tokio::test]
    async fn test_missing_engine_emits_launch_failed_only() {
        let temp = TempDir::new().unwrap();
        let supervisor = supervisor(temp.path(), temp.path());
        let job = Job::resolve("case.xml", temp.path()).unwrap();

        let events = collect(supervisor.start(job)).await;

        assert_eq!(events.len(), 1);
        match &events[0] {
            EngineEvent::LaunchFailed(message) => assert!(message.contains("engine.sh not found")),
            other => panic!("expected LaunchFailed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_selects_third_priority_location() {
        let temp = TempDir::new().unwrap();
        let launch = temp.path().join("app");
        let work = temp.path().join("work");
        std::fs::create_dir_all(launch.join("dist")).unwrap();
        std::fs::create_dir_all(&work).unwrap();
        write_engine(&launch.join("dist"), "engine.sh", "echo dist");
        write_engine(&work, "engine.sh", "echo work");

        let supervisor = supervisor(&launch, &work);
        let job = Job::resolve("case.xml", &work).unwrap();

        let events = collect(supervisor.start(job)).await;
        assert_eq!(output_lines(&events), vec!["dist"]);
    }

    #[tokio::test]
    async fn test_crlf_and_invalid_utf8_output() {
        let temp = TempDir::new().unwrap();
        write_engine(temp.path(), "engine.sh", "printf 'it: 500\\r\\n'\nprintf 'bad \\377 byte\\n'");
        let supervisor = supervisor(temp.path(), temp.path());
        let job = Job::resolve("case.xml", temp.path()).unwrap();

        let events = collect(supervisor.start(job)).await;
        let lines = output_lines(&events);

        assert_eq!(lines[0], "it: 500");
        assert!(events.contains(&EngineEvent::ProgressUpdate(50)));
        assert_eq!(lines[1], "bad \u{FFFD} byte");
        assert_eq!(events.last(), Some(&EngineEvent::ProcessExited(0)));
    }
}
