// src/dag/table.rs

use std::collections::{HashMap, HashSet};
use std::fmt;

use tracing::{debug, info, warn};

use crate::config::model::WorkflowSpec;
use crate::config::samples::Sample;
use crate::dag::instance::{InstanceKey, JobInstance};
use crate::dag::state::{inputs_satisfied, transition_allowed};
use crate::dag::template::{render_command, TemplateContext};
use crate::fs::{FileSystem, WorkLayout};
use crate::types::JobStatus;

/// The job instance table: one [`JobInstance`] per (job, sample) pair of the
/// active job set.
///
/// Built once at startup and then mutated only by the dispatcher. Iteration
/// is job-major, jobs in declaration order and samples in the order they
/// were listed, which is also the dispatch order.
#[derive(Debug, Clone)]
pub struct JobTable {
    jobs: Vec<String>,
    samples: Vec<String>,
    instances: Vec<JobInstance>,
    index: HashMap<InstanceKey, usize>,
}

impl JobTable {
    /// Materialize `jobs × samples`.
    ///
    /// `active` restricts the table to a job subset (already closed over its
    /// upstream dependencies); `None` means every job.
    pub fn materialize(
        spec: &WorkflowSpec,
        samples: &[Sample],
        layout: &WorkLayout,
        active: Option<&HashSet<String>>,
    ) -> Self {
        let mut jobs = Vec::new();
        let mut instances = Vec::new();
        let mut index = HashMap::new();

        for job in spec.jobs() {
            if active.is_some_and(|set| !set.contains(&job.id)) {
                continue;
            }
            let Some(exec) = spec.execution_of(job) else {
                warn!(job = %job.id, "job without execution in validated workflow; skipping");
                continue;
            };
            jobs.push(job.id.clone());

            for sample in samples {
                let ctx = TemplateContext {
                    sample: &sample.id,
                    job: &job.id,
                    data: &sample.data,
                    injobs: &job.injobs,
                    cmd_opts: &job.cmd_opts,
                };
                let sample_dir = layout.sample_dir(&sample.id);

                let instance = JobInstance {
                    key: InstanceKey::new(&job.id, &sample.id),
                    execution: exec.id.clone(),
                    execution_kind: exec.kind,
                    command: render_command(&job.command, &ctx),
                    script: layout.script_file(&job.id, &sample.id),
                    infiles: job.infiles.iter().map(|f| sample_dir.join(f)).collect(),
                    injobs: job.injobs.clone(),
                    start_file: layout.start_file(&sample.id, &job.id),
                    complete_file: layout.complete_file(&sample.id, &job.id),
                    cpu_file: layout.cpu_file(&sample.id, &job.id),
                    status: JobStatus::Wait,
                };

                index.insert(instance.key.clone(), instances.len());
                instances.push(instance);
            }
        }

        debug!(
            jobs = jobs.len(),
            samples = samples.len(),
            instances = instances.len(),
            "job table materialized"
        );

        Self {
            jobs,
            samples: samples.iter().map(|s| s.id.clone()).collect(),
            instances,
            index,
        }
    }

    /// Active job ids in declaration order.
    pub fn jobs(&self) -> &[String] {
        &self.jobs
    }

    pub fn samples(&self) -> &[String] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &JobInstance> {
        self.instances.iter()
    }

    /// Instances of one job, in sample order.
    pub fn instances_of<'a>(&'a self, job: &'a str) -> impl Iterator<Item = &'a JobInstance> + 'a {
        self.instances.iter().filter(move |i| i.job() == job)
    }

    pub fn keys(&self) -> Vec<InstanceKey> {
        self.instances.iter().map(|i| i.key.clone()).collect()
    }

    pub fn get(&self, job: &str, sample: &str) -> Option<&JobInstance> {
        let key = InstanceKey::new(job, sample);
        self.index.get(&key).map(|&i| &self.instances[i])
    }

    pub fn instance(&self, key: &InstanceKey) -> Option<&JobInstance> {
        self.index.get(key).map(|&i| &self.instances[i])
    }

    pub fn status_of(&self, job: &str, sample: &str) -> Option<JobStatus> {
        self.get(job, sample).map(|i| i.status)
    }

    /// Apply a state transition. Illegal transitions are logged and ignored,
    /// which keeps states monotonic whatever the caller does.
    ///
    /// Returns `true` if the status changed.
    pub fn transition(&mut self, key: &InstanceKey, to: JobStatus) -> bool {
        let Some(&idx) = self.index.get(key) else {
            warn!(instance = %key, "transition for unknown instance; ignoring");
            return false;
        };
        let info = &mut self.instances[idx];
        let from = info.status;

        if !transition_allowed(from, to) {
            if from != to {
                warn!(
                    job = %info.key.job,
                    sample = %info.key.sample,
                    from = %from,
                    to = %to,
                    "illegal status transition; ignoring"
                );
            }
            return false;
        }

        info.status = to;
        match to {
            JobStatus::Error => warn!(
                job = %info.key.job,
                sample = %info.key.sample,
                "no live handle and completion markers missing; marking error"
            ),
            _ => info!(
                job = %info.key.job,
                sample = %info.key.sample,
                "change status {from} -> {to}"
            ),
        }
        true
    }

    /// Promote every `wait` instance whose inputs are satisfied to `ready`.
    ///
    /// Decisions are taken against a consistent view of the table before any
    /// instance is mutated, so promotion never cascades within one call.
    pub fn promote_ready(&mut self, fs: &dyn FileSystem) -> Vec<InstanceKey> {
        let candidates: Vec<InstanceKey> = self
            .instances
            .iter()
            .filter(|info| info.status == JobStatus::Wait && inputs_satisfied(self, info, fs))
            .map(|info| info.key.clone())
            .collect();

        for key in candidates.iter() {
            self.transition(key, JobStatus::Ready);
        }
        candidates
    }

    pub fn all_completed(&self) -> bool {
        self.instances
            .iter()
            .all(|i| i.status == JobStatus::Completed)
    }

    pub fn counts(&self) -> StatusCounts {
        let mut counts = StatusCounts::default();
        for info in self.instances.iter() {
            counts.add(info.status);
        }
        counts
    }
}

/// Number of instances per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub wait: usize,
    pub ready: usize,
    pub submitted: usize,
    pub completed: usize,
    pub error: usize,
}

impl StatusCounts {
    pub fn add(&mut self, status: JobStatus) {
        match status {
            JobStatus::Wait => self.wait += 1,
            JobStatus::Ready => self.ready += 1,
            JobStatus::Submitted => self.submitted += 1,
            JobStatus::Completed => self.completed += 1,
            JobStatus::Error => self.error += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.wait + self.ready + self.submitted + self.completed + self.error
    }
}

impl fmt::Display for StatusCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "total={} wait={} ready={} submitted={} completed={} error={}",
            self.total(),
            self.wait,
            self.ready,
            self.submitted,
            self.completed,
            self.error
        )
    }
}
