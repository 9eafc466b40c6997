// src/exec/backend.rs

//! Pluggable execution backend abstraction.
//!
//! The dispatcher talks to an `ExecutionBackend` per execution pool instead
//! of spawning processes or calling `qsub` itself. Production code uses
//! [`LocalBackend`](super::local::LocalBackend) and
//! [`QueueBackend`](super::queue::QueueBackend); tests provide a fake that
//! records submissions and reports scripted liveness.

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;

use crate::config::model::ExecutionSpec;
use crate::exec::handle::JobHandle;
use crate::exec::status::QueueSnapshot;

/// Boxed future returned by backend operations.
pub type BackendFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// One instance handed to a backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitRequest {
    pub job: String,
    pub sample: String,
    pub script: PathBuf,
    /// How many copies of the script to start.
    pub no_parallel: u32,
}

/// What a submission produced. `handles` may be non-empty even when
/// `failure` is set: whatever started must still be tracked.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmitOutcome {
    pub handles: Vec<JobHandle>,
    pub failure: Option<String>,
}

impl SubmitOutcome {
    pub fn ok(handles: Vec<JobHandle>) -> Self {
        Self {
            handles,
            failure: None,
        }
    }

    pub fn failed(handles: Vec<JobHandle>, reason: impl Into<String>) -> Self {
        Self {
            handles,
            failure: Some(reason.into()),
        }
    }
}

/// Result of probing an instance's handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Liveness {
    /// At least one handle is running or queued.
    Alive,
    /// None of the handles is known to be running.
    Finished,
    /// Could not tell this iteration (status query unavailable).
    Unknown,
}

/// Trait abstracting how instances are started and watched.
pub trait ExecutionBackend: Send {
    fn spec(&self) -> &ExecutionSpec;

    /// Start `req.no_parallel` copies of the script.
    fn submit<'a>(&'a mut self, req: &'a SubmitRequest) -> BackendFuture<'a, SubmitOutcome>;

    /// Whether any of `handles` is still alive. Queue backends answer from
    /// `snapshot`; the local backend looks at the processes themselves.
    fn probe(&mut self, handles: &[JobHandle], snapshot: &QueueSnapshot) -> Liveness;

    /// Capacity in the pool's unit (cores, or nodes for shared-node pools).
    fn capacity(&self) -> u32 {
        self.spec().capacity()
    }
}

/// Combine per-handle answers: any alive wins, then any unknown.
pub fn fold_liveness<I: IntoIterator<Item = Liveness>>(answers: I) -> Liveness {
    let mut result = Liveness::Finished;
    for answer in answers {
        match answer {
            Liveness::Alive => return Liveness::Alive,
            Liveness::Unknown => result = Liveness::Unknown,
            Liveness::Finished => {}
        }
    }
    result
}
