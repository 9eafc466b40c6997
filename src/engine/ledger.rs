// src/engine/ledger.rs

//! Per-iteration resource accounting.

use std::collections::HashMap;

use tracing::warn;

use crate::exec::BackendMap;

/// Live consumption per execution pool, rebuilt from scratch every iteration.
///
/// Units follow the pool: cores for local and plain queue pools, nodes for
/// shared-node pools.
#[derive(Debug, Clone, Default)]
pub struct ResourceLedger {
    limits: HashMap<String, u32>,
    used: HashMap<String, u32>,
}

impl ResourceLedger {
    /// Limits are whatever each pool's backend reports as its capacity.
    pub fn from_backends(backends: &BackendMap) -> Self {
        let limits = backends
            .iter()
            .map(|(id, backend)| (id.clone(), backend.capacity()))
            .collect();
        Self {
            limits,
            used: HashMap::new(),
        }
    }

    pub fn reset(&mut self) {
        self.used.clear();
    }

    pub fn limit(&self, execution: &str) -> u32 {
        self.limits.get(execution).copied().unwrap_or(0)
    }

    pub fn used(&self, execution: &str) -> u32 {
        self.used.get(execution).copied().unwrap_or(0)
    }

    pub fn remaining(&self, execution: &str) -> u32 {
        self.limit(execution).saturating_sub(self.used(execution))
    }

    /// Record the cost of something already running. Never refused: work a
    /// previous process started still occupies the pool.
    pub fn charge(&mut self, execution: &str, cost: u32) {
        let limit = self.limit(execution);
        let used = self.used.entry(execution.to_string()).or_insert(0);
        *used = used.saturating_add(cost);
        let used = *used;
        if used > limit {
            warn!(execution, used, limit, "running work exceeds pool capacity");
        }
    }

    /// Reserve `cost` if it fits in the remaining capacity.
    pub fn try_reserve(&mut self, execution: &str, cost: u32) -> bool {
        if cost > self.remaining(execution) {
            return false;
        }
        *self.used.entry(execution.to_string()).or_insert(0) += cost;
        true
    }

    /// Undo a reservation whose submission produced nothing.
    pub fn release(&mut self, execution: &str, cost: u32) {
        if let Some(used) = self.used.get_mut(execution) {
            *used = used.saturating_sub(cost);
        }
    }
}
