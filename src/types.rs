use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::Deserialize;

/// Kind of substrate an execution pool runs its jobs on.
///
/// The config file spells these `local`, `queue` and `queue-shared-node`;
/// the legacy names `sh`, `qsub` and `qsub-pe` are accepted as aliases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ExecutionType {
    /// Processes spawned on this machine; capacity counted in cores.
    Local,
    /// One batch job per parallel command; capacity counted in cores.
    Queue,
    /// Batch jobs packed onto shared nodes; capacity counted in whole nodes.
    QueueSharedNode,
}

impl ExecutionType {
    pub fn is_queue(self) -> bool {
        matches!(self, ExecutionType::Queue | ExecutionType::QueueSharedNode)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ExecutionType::Local => "local",
            ExecutionType::Queue => "queue",
            ExecutionType::QueueSharedNode => "queue-shared-node",
        }
    }
}

impl fmt::Display for ExecutionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExecutionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "local" | "sh" => Ok(ExecutionType::Local),
            "queue" | "qsub" => Ok(ExecutionType::Queue),
            "queue-shared-node" | "qsub-pe" => Ok(ExecutionType::QueueSharedNode),
            other => Err(format!(
                "invalid execution type: {other} (expected \"local\", \"queue\" or \"queue-shared-node\")"
            )),
        }
    }
}

/// Batch queueing system used for status queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "UPPERCASE")]
pub enum QueueSystem {
    #[value(name = "SGE")]
    Sge,
    #[value(name = "PBS")]
    Pbs,
}

impl Default for QueueSystem {
    fn default() -> Self {
        QueueSystem::Sge
    }
}

/// Lifecycle of a single (job, sample) instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobStatus {
    /// Inputs or upstream jobs are not ready yet.
    Wait,
    /// Inputs present and upstream jobs completed; eligible for dispatch.
    Ready,
    /// Handed to a backend (or recovered from a handle file).
    Submitted,
    Completed,
    Error,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Error)
    }

    /// Single-character cell used by the snapshot grid.
    pub fn symbol(self) -> char {
        match self {
            JobStatus::Wait => '.',
            JobStatus::Ready => 'r',
            JobStatus::Submitted => '-',
            JobStatus::Completed => '+',
            JobStatus::Error => '!',
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Wait => "wait",
            JobStatus::Ready => "ready",
            JobStatus::Submitted => "submitted",
            JobStatus::Completed => "completed",
            JobStatus::Error => "error",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
