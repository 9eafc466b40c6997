// src/engine/dispatcher.rs

//! One iteration of the dispatch loop.
//!
//! The dispatcher owns the job table and is its only mutator. An iteration
//! runs in a fixed order:
//!
//! 1. reset the resource ledger
//! 2. one batch status query, if a queue pool instance is submitted or has a
//!    handle file on disk
//! 3. probe every non-terminal instance and charge what is still running
//! 4. stop if every instance is completed
//! 5. promote `wait` instances whose inputs are satisfied
//! 6. dispatch ready work to local pools, then shared-node pools, then plain
//!    queue pools, first-fit against remaining capacity
//!
//! Sleeping between iterations belongs to [`Runtime`](super::runtime::Runtime).

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::model::WorkflowSpec;
use crate::dag::instance::InstanceKey;
use crate::dag::table::JobTable;
use crate::engine::ledger::ResourceLedger;
use crate::engine::IterationReport;
use crate::errors::{Result, WorkflowError};
use crate::exec::backend::{Liveness, SubmitRequest};
use crate::exec::handle::{read_handle_file, write_handle_file};
use crate::exec::status::{QueueSnapshot, StatusPoller};
use crate::exec::BackendMap;
use crate::fs::FileSystem;
use crate::types::{ExecutionType, JobStatus};

/// Pools are filled in this order each iteration.
const DISPATCH_ORDER: [ExecutionType; 3] = [
    ExecutionType::Local,
    ExecutionType::QueueSharedNode,
    ExecutionType::Queue,
];

/// What probing decided for one instance.
#[derive(Debug)]
struct ProbeDecision {
    key: InstanceKey,
    /// Found a handle file while not yet `submitted`.
    recovered: bool,
    liveness: Liveness,
    markers_valid: bool,
    execution: String,
    cost: u32,
}

pub struct Dispatcher {
    spec: WorkflowSpec,
    table: JobTable,
    backends: BackendMap,
    fs: Arc<dyn FileSystem>,
    ledger: ResourceLedger,
    status: Option<StatusPoller>,
    snapshot: QueueSnapshot,
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("table", &self.table)
            .field("ledger", &self.ledger)
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    pub fn new(
        spec: WorkflowSpec,
        table: JobTable,
        backends: BackendMap,
        fs: Arc<dyn FileSystem>,
    ) -> Self {
        let ledger = ResourceLedger::from_backends(&backends);
        Self {
            spec,
            table,
            backends,
            fs,
            ledger,
            status: None,
            snapshot: QueueSnapshot::empty(),
        }
    }

    pub fn with_status_poller(mut self, poller: StatusPoller) -> Self {
        self.status = Some(poller);
        self
    }

    pub fn table(&self) -> &JobTable {
        &self.table
    }

    pub fn into_table(self) -> JobTable {
        self.table
    }

    pub fn ledger(&self) -> &ResourceLedger {
        &self.ledger
    }

    /// Snapshot taken by the most recent observation.
    pub fn snapshot(&self) -> &QueueSnapshot {
        &self.snapshot
    }

    /// Steps 1-3: refresh queue state, probe instances, rebuild the ledger.
    /// Never submits anything.
    pub async fn observe(&mut self) -> Result<()> {
        self.ledger.reset();
        self.snapshot = self.query_status().await?;

        let decisions = self.probe_all()?;
        for decision in decisions {
            self.apply_probe(decision);
        }
        Ok(())
    }

    /// Run one full iteration.
    pub async fn iterate(&mut self) -> Result<IterationReport> {
        self.observe().await?;

        if self.table.all_completed() {
            return Ok(self.report(0));
        }

        let promoted = self.table.promote_ready(self.fs.as_ref());
        if !promoted.is_empty() {
            debug!(count = promoted.len(), "instances became ready");
        }

        let mut dispatched = 0;
        for kind in DISPATCH_ORDER {
            dispatched += self.dispatch_pass(kind).await?;
        }

        Ok(self.report(dispatched))
    }

    fn report(&self, dispatched: usize) -> IterationReport {
        let counts = self.table.counts();
        let all_completed = self.table.all_completed();
        IterationReport {
            dispatched,
            counts,
            all_completed,
            stalled: !all_completed && counts.ready == 0 && counts.submitted == 0,
        }
    }

    /// Only instances that may hold a queue handle read the snapshot.
    fn needs_status_query(&self) -> bool {
        self.table.iter().any(|i| {
            i.execution_kind.is_queue()
                && match i.status() {
                    JobStatus::Submitted => true,
                    JobStatus::Wait | JobStatus::Ready => i.has_submission_evidence(self.fs.as_ref()),
                    JobStatus::Completed | JobStatus::Error => false,
                }
        })
    }

    async fn query_status(&mut self) -> Result<QueueSnapshot> {
        if !self.needs_status_query() {
            return Ok(QueueSnapshot::empty());
        }
        match self.status.as_mut() {
            Some(poller) => poller.poll().await,
            None => {
                warn!("queue pools in use but no status source configured");
                Ok(QueueSnapshot::Unavailable)
            }
        }
    }

    fn cost_of(&self, job: &str) -> Result<(String, u32)> {
        let spec = self
            .spec
            .job(job)
            .ok_or_else(|| WorkflowError::JobNotFound(job.to_string()))?;
        let exec = self.spec.execution_of(spec).ok_or_else(|| {
            WorkflowError::ConfigError(format!("job '{job}' has no execution pool"))
        })?;
        Ok((exec.id.clone(), exec.cost_of(spec)))
    }

    fn probe_all(&mut self) -> Result<Vec<ProbeDecision>> {
        let mut decisions = Vec::new();

        for info in self.table.iter() {
            if info.status().is_terminal() {
                continue;
            }

            let handles = match (info.status(), read_handle_file(self.fs.as_ref(), &info.handle_file())?) {
                (_, Some(handles)) => handles,
                // Handle file removed under a running instance.
                (JobStatus::Submitted, None) => Vec::new(),
                (_, None) => continue,
            };

            let (execution, cost) = self.cost_of(info.job())?;
            let liveness = if handles.is_empty() {
                Liveness::Finished
            } else {
                let backend = self.backends.get_mut(&execution).ok_or_else(|| {
                    WorkflowError::ConfigError(format!("no backend for execution '{execution}'"))
                })?;
                backend.probe(&handles, &self.snapshot)
            };

            decisions.push(ProbeDecision {
                key: info.key.clone(),
                recovered: info.status() != JobStatus::Submitted,
                liveness,
                markers_valid: info.markers_valid(self.fs.as_ref()),
                execution,
                cost,
            });
        }

        Ok(decisions)
    }

    fn apply_probe(&mut self, decision: ProbeDecision) {
        if decision.recovered {
            info!(
                job = %decision.key.job,
                sample = %decision.key.sample,
                "handle file found; treating instance as submitted"
            );
            self.table.transition(&decision.key, JobStatus::Submitted);
        }

        match decision.liveness {
            Liveness::Alive | Liveness::Unknown => {
                self.ledger.charge(&decision.execution, decision.cost);
            }
            Liveness::Finished if decision.markers_valid => {
                self.table.transition(&decision.key, JobStatus::Completed);
            }
            Liveness::Finished => {
                self.table.transition(&decision.key, JobStatus::Error);
            }
        }
    }

    /// Greedy first-fit over ready instances of pools of `kind`.
    async fn dispatch_pass(&mut self, kind: ExecutionType) -> Result<usize> {
        let candidates: Vec<InstanceKey> = self
            .table
            .iter()
            .filter(|i| i.status() == JobStatus::Ready && i.execution_kind == kind)
            .map(|i| i.key.clone())
            .collect();

        let mut dispatched = 0;
        for key in candidates {
            let Some(info) = self.table.instance(&key) else {
                continue;
            };
            let (execution, cost) = self.cost_of(&key.job)?;
            let no_parallel = self.spec.job(&key.job).map_or(1, |j| j.no_parallel);
            let request = SubmitRequest {
                job: key.job.clone(),
                sample: key.sample.clone(),
                script: info.script.clone(),
                no_parallel,
            };
            let handle_file = info.handle_file();

            if !self.ledger.try_reserve(&execution, cost) {
                debug!(
                    job = %key.job,
                    sample = %key.sample,
                    execution = %execution,
                    cost,
                    remaining = self.ledger.remaining(&execution),
                    "not enough capacity; deferring"
                );
                continue;
            }

            let backend = self.backends.get_mut(&execution).ok_or_else(|| {
                WorkflowError::ConfigError(format!("no backend for execution '{execution}'"))
            })?;
            let outcome = backend.submit(&request).await;

            if let Some(reason) = outcome.failure.as_deref() {
                warn!(
                    job = %key.job,
                    sample = %key.sample,
                    execution = %execution,
                    started = outcome.handles.len(),
                    reason,
                    "submission failed"
                );
            }
            if outcome.handles.is_empty() {
                self.ledger.release(&execution, cost);
                continue;
            }

            write_handle_file(self.fs.as_ref(), &handle_file, &outcome.handles)?;
            let handles: Vec<&str> = outcome.handles.iter().map(|h| h.as_str()).collect();
            info!(
                job = %key.job,
                sample = %key.sample,
                execution = %execution,
                handles = ?handles,
                "instance submitted"
            );
            self.table.transition(&key, JobStatus::Submitted);
            dispatched += 1;
        }

        Ok(dispatched)
    }
}
