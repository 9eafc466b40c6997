// src/exec/mod.rs

//! Execution backends and the external calls they make.
//!
//! - [`backend`] defines the `ExecutionBackend` trait used by the dispatcher.
//! - [`local`] runs scripts as child processes.
//! - [`queue`] submits scripts to a batch queue.
//! - [`status`] fetches and parses batch queue state once per iteration.
//! - [`script`] renders and writes the per-instance shell scripts.
//! - [`handle`] reads and writes handle files.

use std::collections::HashMap;
use std::time::Duration;

use crate::config::model::WorkflowSpec;
use crate::types::ExecutionType;

pub mod backend;
pub mod command;
pub mod handle;
pub mod local;
pub mod queue;
pub mod script;
pub mod status;

pub use backend::{ExecutionBackend, Liveness, SubmitOutcome, SubmitRequest};
pub use handle::JobHandle;
pub use local::LocalBackend;
pub use queue::QueueBackend;
pub use status::{QstatSource, QueueSnapshot, StatusPoller, StatusSource};

/// Backends keyed by execution id.
pub type BackendMap = HashMap<String, Box<dyn ExecutionBackend>>;

/// Build the production backend for every execution pool.
pub fn build_backends(spec: &WorkflowSpec, call_timeout: Duration) -> BackendMap {
    spec.executions()
        .iter()
        .map(|exec| {
            let backend: Box<dyn ExecutionBackend> = match exec.kind {
                ExecutionType::Local => Box::new(LocalBackend::new(exec.clone())),
                ExecutionType::Queue | ExecutionType::QueueSharedNode => {
                    Box::new(QueueBackend::new(exec.clone(), call_timeout))
                }
            };
            (exec.id.clone(), backend)
        })
        .collect()
}
