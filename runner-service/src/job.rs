// Simulation Jobs
// Job descriptors and the FIFO queue the run controller drains

use crate::error::{RunnerError, RunnerResult};

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

/// One request to run the engine against a simulation description file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    /// Path as supplied by the caller (absolute or relative)
    pub file_reference: PathBuf,
    /// Directory the engine process runs in
    pub working_directory: PathBuf,
    /// Argument handed to the engine, relative to `working_directory`
    pub file_name: PathBuf,
    /// Short name for status reporting
    pub display_name: String,
}

impl Job {
    /// Resolve a simulation file reference into a job.
    ///
    /// Absolute references run in their own parent directory and pass only the
    /// bare file name; relative references run in `configured_dir` and pass
    /// the reference unchanged. Resolution happens once, here.
    pub fn resolve(file_reference: impl Into<PathBuf>, configured_dir: &Path) -> RunnerResult<Self> {
        let file_reference = file_reference.into();
        let display_name = file_reference
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| RunnerError::InvalidJob(file_reference.clone()))?;

        let (working_directory, file_name) = if file_reference.is_absolute() {
            let parent = file_reference
                .parent()
                .ok_or_else(|| RunnerError::InvalidJob(file_reference.clone()))?;
            (parent.to_path_buf(), PathBuf::from(&display_name))
        } else {
            (configured_dir.to_path_buf(), file_reference.clone())
        };

        Ok(Self {
            file_reference,
            working_directory,
            file_name,
            display_name,
        })
    }
}

/// Pending jobs in execution order.
///
/// Strict FIFO: jobs are appended at the tail and removed only from the head.
/// Duplicate file references are allowed.
#[derive(Debug, Clone, Default)]
pub struct JobQueue {
    jobs: VecDeque<Job>,
}

impl JobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a job at the tail
    pub fn enqueue(&mut self, job: Job) {
        self.jobs.push_back(job);
    }

    /// Remove and return the head, if any
    pub fn dequeue(&mut self) -> Option<Job> {
        self.jobs.pop_front()
    }

    /// Remove every pending job, returning how many were dropped
    pub fn clear(&mut self) -> usize {
        let removed = self.jobs.len();
        self.jobs.clear();
        removed
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// The job that would run next
    pub fn peek(&self) -> Option<&Job> {
        self.jobs.front()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Job> {
        self.jobs.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(name: &str) -> Job {
        Job::resolve(name, Path::new("/sims")).unwrap()
    }

    #[test]
    fn test_resolve_relative_reference() {
        let job = Job::resolve("cases/box.xml", Path::new("/work")).unwrap();

        assert_eq!(job.working_directory, PathBuf::from("/work"));
        assert_eq!(job.file_name, PathBuf::from("cases/box.xml"));
        assert_eq!(job.display_name, "box.xml");
    }

    #[cfg(unix)]
    #[test]
    fn test_resolve_absolute_reference() {
        let job = Job::resolve("/data/runs/tube.xml", Path::new("/work")).unwrap();

        assert_eq!(job.working_directory, PathBuf::from("/data/runs"));
        assert_eq!(job.file_name, PathBuf::from("tube.xml"));
        assert_eq!(job.display_name, "tube.xml");
        assert_eq!(job.file_reference, PathBuf::from("/data/runs/tube.xml"));
    }

    #[test]
    fn test_resolve_rejects_reference_without_file_name() {
        assert!(matches!(
            Job::resolve("..", Path::new("/work")),
            Err(RunnerError::InvalidJob(_))
        ));
        assert!(matches!(
            Job::resolve("", Path::new("/work")),
            Err(RunnerError::InvalidJob(_))
        ));
    }

    #[test]
    fn test_queue_is_fifo() {
        let mut queue = JobQueue::new();
        for name in ["a.xml", "b.xml", "c.xml"] {
            queue.enqueue(job(name));
        }

        assert_eq!(queue.peek().map(|j| j.display_name.as_str()), Some("a.xml"));
        let order: Vec<String> = std::iter::from_fn(|| queue.dequeue())
            .map(|j| j.display_name)
            .collect();
        assert_eq!(order, vec!["a.xml", "b.xml", "c.xml"]);
        assert!(queue.dequeue().is_none());
    }

    #[test]
    fn test_queue_len_tracks_enqueues_and_dequeues() {
        let mut queue = JobQueue::new();
        for i in 0..5 {
            queue.enqueue(job(&format!("run{}.xml", i)));
        }
        queue.dequeue();
        queue.dequeue();
        assert_eq!(queue.len(), 3);

        for _ in 0..10 {
            queue.dequeue();
        }
        assert_eq!(queue.len(), 0);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_queue_allows_duplicates_and_clear() {
        let mut queue = JobQueue::new();
        queue.enqueue(job("same.xml"));
        queue.enqueue(job("same.xml"));
        assert_eq!(queue.len(), 2);

        assert_eq!(queue.clear(), 2);
        assert!(queue.is_empty());
        assert_eq!(queue.clear(), 0);
    }
}
