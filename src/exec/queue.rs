// src/exec/queue.rs

//! Batch queue backend (`qsub`), with or without node sharing.

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use tracing::{debug, info};

use crate::config::model::ExecutionSpec;
use crate::exec::backend::{
    fold_liveness, BackendFuture, ExecutionBackend, Liveness, SubmitOutcome, SubmitRequest,
};
use crate::exec::command::run_with_timeout;
use crate::exec::handle::JobHandle;
use crate::exec::status::QueueSnapshot;
use crate::fs::WorkLayout;

static FIRST_DIGITS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+").expect("digits regex is valid"));

/// Submits scripts with the execution's `submit_command` and answers probes
/// from the per-iteration [`QueueSnapshot`].
///
/// Shared-node pools differ only in their capacity unit and the `-pe`
/// directive in the script, so both kinds use this type.
#[derive(Debug, Clone)]
pub struct QueueBackend {
    spec: ExecutionSpec,
    timeout: Duration,
}

impl QueueBackend {
    pub fn new(spec: ExecutionSpec, timeout: Duration) -> Self {
        Self { spec, timeout }
    }

    /// Arguments for one submission of copy `index`.
    pub fn submit_args(&self, req: &SubmitRequest, index: u32) -> Vec<String> {
        let stdout = WorkLayout::stdout_file(&req.script, index);
        let stderr = WorkLayout::stderr_file(&req.script, index);
        vec![
            self.spec.name_opt.clone(),
            req.job.clone(),
            self.spec.stderr_opt.clone(),
            stderr.display().to_string(),
            self.spec.stdout_opt.clone(),
            stdout.display().to_string(),
            req.script.display().to_string(),
        ]
    }
}

/// The batch job id is the first run of digits in the submit output, e.g.
/// `Your job 4242 ("align") has been submitted`.
pub fn parse_submit_output(output: &str) -> Option<JobHandle> {
    FIRST_DIGITS
        .find(output)
        .map(|m| JobHandle::new(m.as_str()))
}

impl ExecutionBackend for QueueBackend {
    fn spec(&self) -> &ExecutionSpec {
        &self.spec
    }

    fn submit<'a>(&'a mut self, req: &'a SubmitRequest) -> BackendFuture<'a, SubmitOutcome> {
        Box::pin(async move {
            let mut handles = Vec::new();

            for index in 0..req.no_parallel {
                let args = self.submit_args(req, index);
                let output =
                    match run_with_timeout(&self.spec.submit_command, &args, self.timeout).await {
                        Ok(output) => output,
                        Err(err) => return SubmitOutcome::failed(handles, format!("{err:#}")),
                    };

                if !output.success() {
                    return SubmitOutcome::failed(
                        handles,
                        format!(
                            "{} exited with {}: {}",
                            self.spec.submit_command,
                            output.status,
                            output.stderr.trim()
                        ),
                    );
                }

                match parse_submit_output(&output.stdout) {
                    Some(handle) => {
                        info!(
                            job = %req.job,
                            sample = %req.sample,
                            execution = %self.spec.id,
                            handle = %handle,
                            "submitted to queue"
                        );
                        handles.push(handle);
                    }
                    None => {
                        return SubmitOutcome::failed(
                            handles,
                            format!("no job id in submit output {:?}", output.stdout.trim()),
                        );
                    }
                }
            }

            SubmitOutcome::ok(handles)
        })
    }

    fn probe(&mut self, handles: &[JobHandle], snapshot: &QueueSnapshot) -> Liveness {
        fold_liveness(handles.iter().map(|h| match snapshot.contains(h) {
            Some(true) => Liveness::Alive,
            Some(false) => Liveness::Finished,
            None => {
                debug!(handle = %h, execution = %self.spec.id, "queue state unknown this round");
                Liveness::Unknown
            }
        }))
    }
}
