// src/engine/mod.rs

//! Orchestration engine.
//!
//! - [`dispatcher`] runs one poll/promote/dispatch iteration over the job
//!   table and is the only code that changes instance state.
//! - [`ledger`] tracks per-pool resource use within an iteration.
//! - [`backoff`] computes the sleep between iterations.
//! - [`runtime`] is the async loop around the dispatcher.

use std::time::Duration;

use crate::config::model::ConfigSection;
use crate::dag::table::StatusCounts;

pub mod backoff;
pub mod dispatcher;
pub mod ledger;
pub mod runtime;

pub use backoff::Backoff;
pub use dispatcher::Dispatcher;
pub use ledger::ResourceLedger;
pub use runtime::Runtime;

/// Options for the outer loop.
#[derive(Debug, Clone, Copy)]
pub struct LoopOptions {
    pub sleep_min: Duration,
    pub sleep_max: Duration,
    /// Fail instead of polling forever when nothing can make progress.
    pub exit_when_stalled: bool,
}

impl LoopOptions {
    pub fn from_config(config: &ConfigSection, exit_when_stalled: bool) -> Self {
        Self {
            sleep_min: config.sleep_min(),
            sleep_max: config.sleep_max(),
            exit_when_stalled,
        }
    }
}

/// Summary of one dispatcher iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IterationReport {
    pub dispatched: usize,
    pub counts: StatusCounts,
    pub all_completed: bool,
    /// Nothing is ready or running, yet not everything completed.
    pub stalled: bool,
}
