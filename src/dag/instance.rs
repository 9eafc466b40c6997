// src/dag/instance.rs

//! Per-(job, sample) runtime record.

use std::path::PathBuf;

use crate::fs::{FileSystem, WorkLayout};
use crate::types::{ExecutionType, JobStatus};

/// Key of a job instance: `(job id, sample id)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceKey {
    pub job: String,
    pub sample: String,
}

impl InstanceKey {
    pub fn new(job: impl Into<String>, sample: impl Into<String>) -> Self {
        Self {
            job: job.into(),
            sample: sample.into(),
        }
    }
}

impl std::fmt::Display for InstanceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{},{}", self.job, self.sample)
    }
}

#[derive(Debug, Clone)]
pub struct JobInstance {
    pub key: InstanceKey,
    /// Execution pool id and its kind, copied from the job spec.
    pub execution: String,
    pub execution_kind: ExecutionType,
    /// Command with every placeholder resolved.
    pub command: String,
    pub script: PathBuf,
    /// Absolute paths of required inputs.
    pub infiles: Vec<PathBuf>,
    /// Upstream job ids; the same sample's instances must complete first.
    pub injobs: Vec<String>,
    pub start_file: PathBuf,
    pub complete_file: PathBuf,
    pub cpu_file: PathBuf,
    pub(crate) status: JobStatus,
}

impl JobInstance {
    pub fn job(&self) -> &str {
        &self.key.job
    }

    pub fn sample(&self) -> &str {
        &self.key.sample
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    pub fn handle_file(&self) -> PathBuf {
        WorkLayout::handle_file(&self.script)
    }

    /// Whether submission evidence (the handle file) exists on disk.
    pub fn has_submission_evidence(&self, fs: &dyn FileSystem) -> bool {
        fs.exists(&self.handle_file())
    }

    /// Completion evidence: all three marker files present and non-empty.
    pub fn markers_valid(&self, fs: &dyn FileSystem) -> bool {
        [&self.start_file, &self.complete_file, &self.cpu_file]
            .into_iter()
            .all(|p| fs.is_non_empty(p))
    }

    pub fn infiles_present(&self, fs: &dyn FileSystem) -> bool {
        self.infiles.iter().all(|p| fs.is_non_empty(p))
    }
}
