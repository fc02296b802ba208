// Engine Locator
// Finds the engine artifact and builds the command line that runs it

use crate::config::{EngineConfig, Options};
use crate::error::{RunnerError, RunnerResult};
use crate::job::Job;

use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Searches a fixed, ordered list of directories for the engine artifact
#[derive(Debug, Clone)]
pub struct EngineLocator {
    engine: EngineConfig,
    launch_dir: PathBuf,
    working_dir: PathBuf,
}

impl EngineLocator {
    pub fn new(engine: EngineConfig, launch_dir: impl Into<PathBuf>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            engine,
            launch_dir: launch_dir.into(),
            working_dir: working_dir.into(),
        }
    }

    pub fn from_options(options: &Options) -> Self {
        Self::new(
            options.engine.clone(),
            options.launch_directory.clone(),
            options.working_directory.clone(),
        )
    }

    pub fn engine(&self) -> &EngineConfig {
        &self.engine
    }

    /// Candidate artifact paths in priority order
    pub fn candidates(&self) -> Vec<PathBuf> {
        let artifact = &self.engine.artifact;
        let launch = &self.launch_dir;

        let mut candidates = vec![
            launch.join(artifact),
            launch.join("build").join(artifact),
            launch.join("dist").join(artifact),
            launch.join("target").join(artifact),
        ];
        if let Some(parent) = absolute_parent(launch) {
            candidates.push(parent.join(artifact));
        }
        candidates.push(launch.join("lib").join(artifact));

        let work = &self.working_dir;
        candidates.push(work.join(artifact));
        candidates.push(work.join("build").join(artifact));
        candidates.push(work.join("dist").join(artifact));

        candidates
    }

    /// Locate the artifact: first existing candidate wins, then a scan of the
    /// launch directory for a file whose name contains the product name.
    pub fn locate(&self) -> RunnerResult<PathBuf> {
        let candidates = self.candidates();
        for path in &candidates {
            debug!(candidate = %path.display(), "checking engine location");
            if path.is_file() {
                return Ok(path.clone());
            }
        }

        if let Some(path) = self.scan_launch_dir() {
            debug!(path = %path.display(), "engine found by name scan");
            return Ok(path);
        }

        Err(RunnerError::EngineNotFound {
            artifact: self.engine.artifact.clone(),
            searched: candidates,
        })
    }

    fn scan_launch_dir(&self) -> Option<PathBuf> {
        let needle = self.engine.product_name.to_lowercase();
        if needle.is_empty() {
            return None;
        }

        let mut matches: Vec<PathBuf> = fs::read_dir(&self.launch_dir)
            .ok()?
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .filter(|path| {
                path.file_name()
                    .map(|name| name.to_string_lossy().to_lowercase().contains(&needle))
                    .unwrap_or(false)
            })
            .collect();
        matches.sort();
        matches.into_iter().next()
    }

    /// Build the full command for a job: interpreter (if any), artifact, file name
    pub fn command_for(&self, job: &Job) -> RunnerResult<EngineCommand> {
        let artifact = self.locate()?;
        let artifact = absolutize(&artifact);

        let (program, mut args) = match &self.engine.interpreter {
            Some(interpreter) => {
                let program = find_program(&interpreter.program)
                    .ok_or_else(|| RunnerError::InterpreterNotFound(interpreter.program.clone()))?;
                let mut args = interpreter.args.clone();
                args.push(artifact.to_string_lossy().to_string());
                (program, args)
            }
            None => (artifact, Vec::new()),
        };
        args.push(job.file_name.to_string_lossy().to_string());

        Ok(EngineCommand {
            program,
            args,
            working_dir: job.working_directory.clone(),
        })
    }
}

/// A resolved engine invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub working_dir: PathBuf,
}

impl EngineCommand {
    /// Human readable command line
    pub fn display(&self) -> String {
        let mut parts = vec![self.program.to_string_lossy().to_string()];
        parts.extend(self.args.iter().cloned());
        parts.join(" ")
    }
}

/// Parent directory, resolving relative paths such as `.` first
fn absolute_parent(dir: &Path) -> Option<PathBuf> {
    let dir = dir.canonicalize().unwrap_or_else(|_| dir.to_path_buf());
    dir.parent().map(Path::to_path_buf)
}

/// The engine runs in the job's directory, so the artifact path must not be relative
fn absolutize(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

/// Find an interpreter either as a path or on PATH
fn find_program(program: &str) -> Option<PathBuf> {
    let path = PathBuf::from(program);
    if path.components().count() > 1 && path.is_file() {
        return Some(path);
    }
    which::which(program).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Interpreter;
    use std::fs;
    use tempfile::TempDir;

    fn engine(artifact: &str) -> EngineConfig {
        EngineConfig {
            artifact: artifact.to_string(),
            product_name: "starfish".to_string(),
            interpreter: None,
        }
    }

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"").unwrap();
    }

    fn setup() -> (TempDir, PathBuf, PathBuf) {
        let temp = TempDir::new().unwrap();
        let launch = temp.path().join("app");
        let work = temp.path().join("work");
        fs::create_dir_all(&launch).unwrap();
        fs::create_dir_all(&work).unwrap();
        (temp, launch, work)
    }

    #[test]
    fn test_candidate_order() {
        let (_temp, launch, work) = setup();
        let locator = EngineLocator::new(engine("StarfishCLI.jar"), &launch, &work);
        let parent = launch.canonicalize().unwrap().parent().unwrap().to_path_buf();

        assert_eq!(
            locator.candidates(),
            vec![
                launch.join("StarfishCLI.jar"),
                launch.join("build/StarfishCLI.jar"),
                launch.join("dist/StarfishCLI.jar"),
                launch.join("target/StarfishCLI.jar"),
                parent.join("StarfishCLI.jar"),
                launch.join("lib/StarfishCLI.jar"),
                work.join("StarfishCLI.jar"),
                work.join("build/StarfishCLI.jar"),
                work.join("dist/StarfishCLI.jar"),
            ]
        );
    }

    #[test]
    fn test_third_priority_location_is_selected() {
        let (_temp, launch, work) = setup();
        touch(&launch.join("dist/StarfishCLI.jar"));
        touch(&launch.join("lib/StarfishCLI.jar"));
        touch(&work.join("StarfishCLI.jar"));

        let locator = EngineLocator::new(engine("StarfishCLI.jar"), &launch, &work);
        assert_eq!(locator.locate().unwrap(), launch.join("dist/StarfishCLI.jar"));
    }

    #[test]
    fn test_working_directory_candidates() {
        let (_temp, launch, work) = setup();
        touch(&work.join("build/StarfishCLI.jar"));

        let locator = EngineLocator::new(engine("StarfishCLI.jar"), &launch, &work);
        assert_eq!(locator.locate().unwrap(), work.join("build/StarfishCLI.jar"));
    }

    #[test]
    fn test_directory_named_like_artifact_is_skipped() {
        let (_temp, launch, work) = setup();
        fs::create_dir_all(launch.join("StarfishCLI.jar")).unwrap();
        touch(&launch.join("target/StarfishCLI.jar"));

        let locator = EngineLocator::new(engine("StarfishCLI.jar"), &launch, &work);
        assert_eq!(locator.locate().unwrap(), launch.join("target/StarfishCLI.jar"));
    }

    #[test]
    fn test_fallback_scan_is_case_insensitive() {
        let (_temp, launch, work) = setup();
        touch(&launch.join("notes.txt"));
        touch(&launch.join("Starfish-2.1.jar"));
        touch(&launch.join("starfish-old.jar"));

        let locator = EngineLocator::new(engine("StarfishCLI.jar"), &launch, &work);
        assert_eq!(locator.locate().unwrap(), launch.join("Starfish-2.1.jar"));
    }

    #[test]
    fn test_not_found_reports_searched_paths() {
        let (_temp, launch, work) = setup();
        touch(&launch.join("readme.md"));

        let locator = EngineLocator::new(engine("StarfishCLI.jar"), &launch, &work);
        match locator.locate() {
            Err(RunnerError::EngineNotFound { artifact, searched }) => {
                assert_eq!(artifact, "StarfishCLI.jar");
                assert_eq!(searched, locator.candidates());
            }
            other => panic!("expected EngineNotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_command_without_interpreter() {
        let (_temp, launch, work) = setup();
        touch(&launch.join("StarfishCLI.jar"));
        let locator = EngineLocator::new(engine("StarfishCLI.jar"), &launch, &work);
        let job = Job::resolve("case.xml", &work).unwrap();

        let command = locator.command_for(&job).unwrap();
        assert_eq!(
            command.program,
            launch.join("StarfishCLI.jar").canonicalize().unwrap()
        );
        assert_eq!(command.args, vec!["case.xml"]);
        assert_eq!(command.working_dir, work);
    }

    #[test]
    fn test_missing_interpreter_is_reported() {
        let (_temp, launch, work) = setup();
        touch(&launch.join("StarfishCLI.jar"));
        let mut config = engine("StarfishCLI.jar");
        config.interpreter = Some(Interpreter {
            program: "definitely-not-a-real-jvm-binary".to_string(),
            args: vec!["-jar".to_string()],
        });
        let locator = EngineLocator::new(config, &launch, &work);
        let job = Job::resolve("case.xml", &work).unwrap();

        assert!(matches!(
            locator.command_for(&job),
            Err(RunnerError::InterpreterNotFound(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_command_with_interpreter() {
        let (_temp, launch, work) = setup();
        touch(&launch.join("StarfishCLI.jar"));
        let mut config = engine("StarfishCLI.jar");
        config.interpreter = Some(Interpreter {
            program: "sh".to_string(),
            args: vec!["-x".to_string()],
        });
        let locator = EngineLocator::new(config, &launch, &work);
        let job = Job::resolve("case.xml", &work).unwrap();

        let command = locator.command_for(&job).unwrap();
        let artifact = launch.join("StarfishCLI.jar").canonicalize().unwrap();
        assert!(command.program.ends_with("sh"));
        assert_eq!(
            command.args,
            vec![
                "-x".to_string(),
                artifact.to_string_lossy().to_string(),
                "case.xml".to_string()
            ]
        );
        assert!(command.display().ends_with("case.xml"));
    }
}
