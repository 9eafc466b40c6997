// src/exec/local.rs

//! Local process pool backend.

use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::process::Stdio;

use anyhow::{Context, Result};
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

use crate::config::model::ExecutionSpec;
use crate::exec::backend::{
    fold_liveness, BackendFuture, ExecutionBackend, Liveness, SubmitOutcome, SubmitRequest,
};
use crate::exec::handle::JobHandle;
use crate::exec::status::QueueSnapshot;
use crate::fs::WorkLayout;

/// Runs scripts as `/bin/bash <script>` children of this process.
///
/// Children started here are kept so they can be reaped; pids read back from
/// a handle file written by an earlier process are probed with `kill(pid, 0)`.
/// Once reaped, a child's pid may be reused by the OS, so it is never
/// signal-probed again.
#[derive(Debug)]
pub struct LocalBackend {
    spec: ExecutionSpec,
    children: HashMap<JobHandle, Child>,
    reaped: HashSet<JobHandle>,
}

impl LocalBackend {
    pub fn new(spec: ExecutionSpec) -> Self {
        Self {
            spec,
            children: HashMap::new(),
            reaped: HashSet::new(),
        }
    }

    /// Whether `handle` is a child of this backend that has already exited.
    pub fn has_reaped(&self, handle: &JobHandle) -> bool {
        self.reaped.contains(handle)
    }

    fn spawn_one(req: &SubmitRequest, index: u32) -> Result<Child> {
        let stdout_path = WorkLayout::stdout_file(&req.script, index);
        let stderr_path = WorkLayout::stderr_file(&req.script, index);
        let stdout = File::create(&stdout_path)
            .with_context(|| format!("creating {:?}", stdout_path))?;
        let stderr = File::create(&stderr_path)
            .with_context(|| format!("creating {:?}", stderr_path))?;

        Command::new("/bin/bash")
            .arg(&req.script)
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout))
            .stderr(Stdio::from(stderr))
            .spawn()
            .with_context(|| format!("spawning {:?}", req.script))
    }

    fn probe_one(&mut self, handle: &JobHandle) -> Liveness {
        if self.reaped.contains(handle) {
            return Liveness::Finished;
        }
        if let Some(child) = self.children.get_mut(handle) {
            return match child.try_wait() {
                Ok(Some(status)) => {
                    debug!(pid = %handle, %status, "local process exited");
                    self.children.remove(handle);
                    self.reaped.insert(handle.clone());
                    Liveness::Finished
                }
                Ok(None) => Liveness::Alive,
                Err(err) => {
                    warn!(pid = %handle, error = %err, "could not poll local process");
                    Liveness::Unknown
                }
            };
        }
        probe_foreign_pid(handle)
    }
}

impl ExecutionBackend for LocalBackend {
    fn spec(&self) -> &ExecutionSpec {
        &self.spec
    }

    fn submit<'a>(&'a mut self, req: &'a SubmitRequest) -> BackendFuture<'a, SubmitOutcome> {
        Box::pin(async move {
            let mut handles = Vec::new();

            for index in 0..req.no_parallel {
                match Self::spawn_one(req, index) {
                    Ok(child) => {
                        let Some(pid) = child.id() else {
                            return SubmitOutcome::failed(handles, "child exited before its pid was read");
                        };
                        let handle = JobHandle::from(pid);
                        info!(
                            job = %req.job,
                            sample = %req.sample,
                            pid,
                            "started local process"
                        );
                        self.children.insert(handle.clone(), child);
                        handles.push(handle);
                    }
                    Err(err) => return SubmitOutcome::failed(handles, format!("{err:#}")),
                }
            }

            SubmitOutcome::ok(handles)
        })
    }

    fn probe(&mut self, handles: &[JobHandle], _snapshot: &QueueSnapshot) -> Liveness {
        let answers: Vec<Liveness> = handles.iter().map(|h| self.probe_one(h)).collect();
        fold_liveness(answers)
    }
}

/// Signal-0 probe of a pid this process did not spawn.
#[cfg(unix)]
fn probe_foreign_pid(handle: &JobHandle) -> Liveness {
    let pid = match handle.as_str().parse::<libc::pid_t>() {
        Ok(pid) if pid > 0 => pid,
        _ => {
            warn!(handle = %handle, "handle is not a pid; treating as finished");
            return Liveness::Finished;
        }
    };

    // SAFETY: signal 0 performs error checking only; no signal is delivered.
    let ret = unsafe { libc::kill(pid, 0) };
    if ret == 0 {
        return Liveness::Alive;
    }
    match std::io::Error::last_os_error().raw_os_error() {
        Some(libc::EPERM) => Liveness::Alive,
        Some(libc::ESRCH) => Liveness::Finished,
        other => {
            warn!(pid, errno = ?other, "unexpected error probing pid");
            Liveness::Unknown
        }
    }
}

#[cfg(not(unix))]
fn probe_foreign_pid(handle: &JobHandle) -> Liveness {
    warn!(handle = %handle, "cannot probe foreign pids on this platform");
    Liveness::Unknown
}
