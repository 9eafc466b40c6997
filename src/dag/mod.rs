// src/dag/mod.rs

//! Job graph and per-sample instance tracking.
//!
//! - [`graph`] holds the `injobs` adjacency and subset closure.
//! - [`level`] assigns topological levels to job types.
//! - [`template`] renders command templates for one (job, sample).
//! - [`instance`] and [`table`] hold the runtime record of every instance.
//! - [`state`] defines the legal status transitions and readiness rule.
//! - [`cascade`] plans dependency-cascading deletion.

pub mod cascade;
pub mod graph;
pub mod instance;
pub mod level;
pub mod state;
pub mod table;
pub mod template;

pub use cascade::{DeleteSelector, SampleDeletion};
pub use graph::DagGraph;
pub use instance::{InstanceKey, JobInstance};
pub use level::{assign_levels, compute_levels};
pub use table::{JobTable, StatusCounts};
