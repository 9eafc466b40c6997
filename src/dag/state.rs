// src/dag/state.rs

//! Instance state machine rules.
//!
//! ```text
//! wait ──► ready ──► submitted ──► completed
//!   │                  ▲    └────► error
//!   └──────────────────┘  (handle file found on restart)
//! ```
//!
//! `completed` and `error` are terminal, and nothing ever moves backwards.

use tracing::warn;

use crate::dag::instance::JobInstance;
use crate::dag::table::JobTable;
use crate::fs::FileSystem;
use crate::types::JobStatus;

/// Whether `from -> to` is a legal transition.
pub fn transition_allowed(from: JobStatus, to: JobStatus) -> bool {
    use JobStatus::*;
    matches!(
        (from, to),
        (Wait, Ready)
            | (Ready, Submitted)
            | (Wait, Submitted)
            | (Submitted, Completed)
            | (Submitted, Error)
    )
}

/// Readiness rule for a `wait` instance: every infile present and non-empty,
/// and every upstream instance of the same sample completed.
pub fn inputs_satisfied(table: &JobTable, info: &JobInstance, fs: &dyn FileSystem) -> bool {
    for dep in info.injobs.iter() {
        match table.status_of(dep, info.sample()) {
            Some(JobStatus::Completed) => {}
            Some(_) => return false,
            None => {
                warn!(
                    job = %info.job(),
                    sample = %info.sample(),
                    dep = %dep,
                    "upstream instance missing from job table"
                );
                return false;
            }
        }
    }

    info.infiles_present(fs)
}
