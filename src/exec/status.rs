// src/exec/status.rs

//! Batch status query.
//!
//! The queue is asked once per loop iteration which jobs it still knows
//! about; every queue probe in that iteration reads the cached answer.

use std::collections::HashSet;
use std::sync::LazyLock;
use std::time::Duration;

use anyhow::{bail, Result};
use regex::Regex;
use tracing::{debug, warn};

use crate::errors::WorkflowError;
use crate::exec::backend::BackendFuture;
use crate::exec::command::run_with_timeout;
use crate::exec::handle::JobHandle;
use crate::types::QueueSystem;

static SGE_JOB_NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<JB_job_number>\s*(\d+)\s*</JB_job_number>").expect("job number regex is valid")
});

static LEADING_DIGITS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)").expect("leading digits regex is valid"));

/// Job ids known to the batch system at one instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueSnapshot {
    /// The query failed or timed out this iteration.
    Unavailable,
    Jobs(HashSet<String>),
}

impl QueueSnapshot {
    pub fn from_ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        QueueSnapshot::Jobs(ids.into_iter().map(Into::into).collect())
    }

    /// No queue backends in use; nothing to look up.
    pub fn empty() -> Self {
        QueueSnapshot::Jobs(HashSet::new())
    }

    pub fn is_available(&self) -> bool {
        matches!(self, QueueSnapshot::Jobs(_))
    }

    /// `None` when the snapshot is unavailable.
    pub fn contains(&self, handle: &JobHandle) -> Option<bool> {
        match self {
            QueueSnapshot::Unavailable => None,
            QueueSnapshot::Jobs(ids) => Some(ids.contains(handle.as_str())),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            QueueSnapshot::Unavailable => 0,
            QueueSnapshot::Jobs(ids) => ids.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Source of raw queue state.
pub trait StatusSource: Send {
    fn query(&mut self) -> BackendFuture<'_, Result<HashSet<String>>>;
}

/// `qstat` backed source.
#[derive(Debug, Clone)]
pub struct QstatSource {
    system: QueueSystem,
    timeout: Duration,
}

impl QstatSource {
    pub fn new(system: QueueSystem, timeout: Duration) -> Self {
        Self { system, timeout }
    }
}

impl StatusSource for QstatSource {
    fn query(&mut self) -> BackendFuture<'_, Result<HashSet<String>>> {
        Box::pin(async move {
            let args: &[&str] = match self.system {
                QueueSystem::Sge => &["-f", "-xml"],
                QueueSystem::Pbs => &[],
            };
            let output = run_with_timeout("qstat", args, self.timeout).await?;
            if !output.success() {
                bail!(
                    "qstat exited with {}: {}",
                    output.status,
                    output.stderr.trim()
                );
            }
            Ok(match self.system {
                QueueSystem::Sge => parse_sge_xml(&output.stdout),
                QueueSystem::Pbs => parse_pbs_text(&output.stdout),
            })
        })
    }
}

/// Job ids from `qstat -f -xml` output.
pub fn parse_sge_xml(xml: &str) -> HashSet<String> {
    SGE_JOB_NUMBER
        .captures_iter(xml)
        .map(|c| c[1].to_string())
        .collect()
}

/// Job ids from plain PBS `qstat` output: the leading digits of the first
/// column. Header and separator rows have none and drop out.
pub fn parse_pbs_text(text: &str) -> HashSet<String> {
    text.lines()
        .filter_map(|line| line.split_whitespace().next())
        .filter_map(|first| LEADING_DIGITS.captures(first))
        .map(|c| c[1].to_string())
        .collect()
}

/// Wraps a [`StatusSource`] with the consecutive-failure budget.
pub struct StatusPoller {
    source: Box<dyn StatusSource>,
    max_failures: u32,
    failures: u32,
}

impl std::fmt::Debug for StatusPoller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatusPoller")
            .field("max_failures", &self.max_failures)
            .field("failures", &self.failures)
            .finish_non_exhaustive()
    }
}

impl StatusPoller {
    pub fn new(source: Box<dyn StatusSource>, max_failures: u32) -> Self {
        Self {
            source,
            max_failures,
            failures: 0,
        }
    }

    /// Query once. A failure yields [`QueueSnapshot::Unavailable`] until more
    /// than `max_failures` happen in a row, which aborts the run.
    pub async fn poll(&mut self) -> crate::errors::Result<QueueSnapshot> {
        match self.source.query().await {
            Ok(ids) => {
                self.failures = 0;
                debug!(jobs = ids.len(), "batch status query ok");
                Ok(QueueSnapshot::Jobs(ids))
            }
            Err(err) => {
                self.failures += 1;
                if self.failures > self.max_failures {
                    return Err(WorkflowError::StatusQuery {
                        attempts: self.failures,
                        reason: format!("{err:#}"),
                    });
                }
                warn!(
                    attempt = self.failures,
                    max = self.max_failures,
                    error = %err,
                    "batch status query failed; queue probes inconclusive this round"
                );
                Ok(QueueSnapshot::Unavailable)
            }
        }
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.failures
    }
}
