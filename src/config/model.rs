// src/config/model.rs

use std::time::Duration;

use serde::Deserialize;

use crate::types::{ExecutionType, QueueSystem};

/// Top-level workflow file as read from TOML.
///
/// ```toml
/// [config]
/// queue_system = "SGE"
///
/// [[execution]]
/// id = "local"
/// type = "local"
/// cores_per_node = 4
///
/// [[job]]
/// id = "qc"
/// execution = "local"
/// command = 'fastqc \DATA.0 -o \SELF'
///
/// [[job]]
/// id = "assemble"
/// execution = "local"
/// command = 'spades -1 \INJOBS.0/R1.fq -o \SELF \CMDOPTS.0'
/// injobs = ["qc"]
/// cmd_opts = ["--careful"]
/// ```
///
/// Executions and jobs are arrays of tables so that declaration order is
/// kept; jobs are dispatched in that order.
#[derive(Debug, Clone, Deserialize)]
pub struct RawWorkflowFile {
    #[serde(default)]
    pub config: ConfigSection,

    #[serde(default)]
    pub execution: Vec<RawExecution>,

    #[serde(default)]
    pub job: Vec<RawJob>,
}

/// `[config]` section: scheduler-wide knobs.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// Queueing system consulted for batch status. CLI `-Q` overrides it.
    #[serde(default)]
    pub queue_system: QueueSystem,

    /// Sleep after an iteration that dispatched something.
    #[serde(default = "default_sleep_min_secs")]
    pub sleep_min_secs: u64,

    /// Upper bound for the doubling backoff.
    #[serde(default = "default_sleep_max_secs")]
    pub sleep_max_secs: u64,

    /// Timeout applied to every external command (submit, status query).
    #[serde(default = "default_call_timeout_secs")]
    pub call_timeout_secs: u64,

    /// Consecutive failed status queries tolerated before the run aborts.
    #[serde(default = "default_status_query_retries")]
    pub status_query_retries: u32,

    /// Directory (relative to the work dir) holding rendered scripts.
    #[serde(default = "default_scripts_dir")]
    pub scripts_dir: String,
}

fn default_sleep_min_secs() -> u64 {
    15
}

fn default_sleep_max_secs() -> u64 {
    120
}

fn default_call_timeout_secs() -> u64 {
    60
}

fn default_status_query_retries() -> u32 {
    5
}

fn default_scripts_dir() -> String {
    "WF-sh".to_string()
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            queue_system: QueueSystem::default(),
            sleep_min_secs: default_sleep_min_secs(),
            sleep_max_secs: default_sleep_max_secs(),
            call_timeout_secs: default_call_timeout_secs(),
            status_query_retries: default_status_query_retries(),
            scripts_dir: default_scripts_dir(),
        }
    }
}

impl ConfigSection {
    pub fn sleep_min(&self) -> Duration {
        Duration::from_secs(self.sleep_min_secs)
    }

    pub fn sleep_max(&self) -> Duration {
        Duration::from_secs(self.sleep_max_secs)
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }
}

/// `[[execution]]` entry as written in the file.
#[derive(Debug, Clone, Deserialize)]
pub struct RawExecution {
    pub id: String,

    /// `local`, `queue` or `queue-shared-node`; parsed during validation so an
    /// unknown value gets a dedicated error.
    #[serde(rename = "type")]
    pub kind: String,

    pub cores_per_node: u32,

    #[serde(default = "default_number_nodes")]
    pub number_nodes: u32,

    /// Script preamble (shebang, scheduler directives).
    #[serde(default = "default_template")]
    pub template: String,

    #[serde(default = "default_submit_command")]
    pub submit_command: String,

    #[serde(default = "default_name_opt")]
    pub name_opt: String,

    #[serde(default = "default_stdout_opt")]
    pub stdout_opt: String,

    #[serde(default = "default_stderr_opt")]
    pub stderr_opt: String,

    /// Parallel environment named in the `#$ -pe` directive of shared-node
    /// scripts.
    #[serde(default = "default_parallel_env")]
    pub parallel_env: String,
}

fn default_number_nodes() -> u32 {
    1
}

fn default_template() -> String {
    "#!/bin/bash".to_string()
}

fn default_submit_command() -> String {
    "qsub".to_string()
}

fn default_name_opt() -> String {
    "-N".to_string()
}

fn default_stdout_opt() -> String {
    "-o".to_string()
}

fn default_stderr_opt() -> String {
    "-e".to_string()
}

fn default_parallel_env() -> String {
    "orte".to_string()
}

/// `[[job]]` entry as written in the file.
#[derive(Debug, Clone, Deserialize)]
pub struct RawJob {
    pub id: String,

    /// Command template with `\SAMPLE`, `\SELF`, `\DATA.n`, `\INJOBS.n` and
    /// `\CMDOPTS.n` placeholders.
    pub command: String,

    /// Id of the `[[execution]]` this job runs on.
    pub execution: String,

    #[serde(default = "default_one")]
    pub cores_per_cmd: u32,

    /// Number of parallel copies of the command per sample.
    #[serde(default = "default_one")]
    pub no_parallel: u32,

    #[serde(default)]
    pub injobs: Vec<String>,

    /// Sample-relative files that must be non-empty before the job is ready.
    #[serde(default)]
    pub infiles: Vec<String>,

    /// Job-relative outputs that must be non-empty for the script to write
    /// its completion marker.
    #[serde(default)]
    pub non_zero_files: Vec<String>,

    /// Default option values for `\CMDOPTS.n`.
    #[serde(default)]
    pub cmd_opts: Vec<String>,
}

fn default_one() -> u32 {
    1
}

/// Validated execution pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionSpec {
    pub id: String,
    pub kind: ExecutionType,
    pub cores_per_node: u32,
    pub number_nodes: u32,
    pub template: String,
    pub submit_command: String,
    pub name_opt: String,
    pub stdout_opt: String,
    pub stderr_opt: String,
    pub parallel_env: String,
}

impl ExecutionSpec {
    /// Declared ceiling, in the pool's unit (cores, or nodes for shared-node).
    pub fn capacity(&self) -> u32 {
        match self.kind {
            ExecutionType::Local => self.cores_per_node,
            ExecutionType::Queue => self.cores_per_node.saturating_mul(self.number_nodes),
            ExecutionType::QueueSharedNode => self.number_nodes,
        }
    }

    /// What one instance of `job` consumes while submitted, in the pool's unit.
    pub fn cost_of(&self, job: &JobSpec) -> u32 {
        match self.kind {
            ExecutionType::Local | ExecutionType::Queue => job.cores_total(),
            ExecutionType::QueueSharedNode => self.nodes_for(job),
        }
    }

    /// `ceil(cores_per_cmd * no_parallel / cores_per_node)`.
    pub fn nodes_for(&self, job: &JobSpec) -> u32 {
        job.cores_total().div_ceil(self.cores_per_node.max(1))
    }
}

impl From<(RawExecution, ExecutionType)> for ExecutionSpec {
    fn from((raw, kind): (RawExecution, ExecutionType)) -> Self {
        Self {
            id: raw.id,
            kind,
            cores_per_node: raw.cores_per_node,
            number_nodes: raw.number_nodes,
            template: raw.template,
            submit_command: raw.submit_command,
            name_opt: raw.name_opt,
            stdout_opt: raw.stdout_opt,
            stderr_opt: raw.stderr_opt,
            parallel_env: raw.parallel_env,
        }
    }
}

/// Validated job type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSpec {
    pub id: String,
    pub command: String,
    pub execution: String,
    pub cores_per_cmd: u32,
    pub no_parallel: u32,
    pub injobs: Vec<String>,
    pub infiles: Vec<String>,
    pub non_zero_files: Vec<String>,
    pub cmd_opts: Vec<String>,
    /// Topological level (leaf jobs are 1), filled in by the leveler.
    pub job_level: u32,
}

impl JobSpec {
    pub fn cores_total(&self) -> u32 {
        self.cores_per_cmd.saturating_mul(self.no_parallel)
    }
}

impl From<RawJob> for JobSpec {
    fn from(raw: RawJob) -> Self {
        Self {
            id: raw.id,
            command: raw.command,
            execution: raw.execution,
            cores_per_cmd: raw.cores_per_cmd,
            no_parallel: raw.no_parallel,
            injobs: raw.injobs,
            infiles: raw.infiles,
            non_zero_files: raw.non_zero_files,
            cmd_opts: raw.cmd_opts,
            job_level: 0,
        }
    }
}

/// A validated workflow: every reference resolves, the job graph is acyclic,
/// and every job fits in its execution pool.
///
/// Only constructible through `TryFrom<RawWorkflowFile>` (see `validate.rs`).
#[derive(Debug, Clone)]
pub struct WorkflowSpec {
    pub config: ConfigSection,
    executions: Vec<ExecutionSpec>,
    jobs: Vec<JobSpec>,
}

impl WorkflowSpec {
    pub(crate) fn new_unchecked(
        config: ConfigSection,
        executions: Vec<ExecutionSpec>,
        jobs: Vec<JobSpec>,
    ) -> Self {
        Self {
            config,
            executions,
            jobs,
        }
    }

    /// Jobs in declaration order.
    pub fn jobs(&self) -> &[JobSpec] {
        &self.jobs
    }

    pub fn executions(&self) -> &[ExecutionSpec] {
        &self.executions
    }

    pub fn job(&self, id: &str) -> Option<&JobSpec> {
        self.jobs.iter().find(|j| j.id == id)
    }

    pub fn execution(&self, id: &str) -> Option<&ExecutionSpec> {
        self.executions.iter().find(|e| e.id == id)
    }

    /// Execution pool of a job. Always present on a validated spec.
    pub fn execution_of(&self, job: &JobSpec) -> Option<&ExecutionSpec> {
        self.execution(&job.execution)
    }

    /// Replace the default `cmd_opts` of jobs named in `overrides`.
    pub fn apply_cmd_opts(&mut self, overrides: &crate::config::params::CmdOpts) {
        for job in self.jobs.iter_mut() {
            if let Some(opts) = overrides.get(&job.id) {
                job.cmd_opts = opts.clone();
            }
        }
    }
}
