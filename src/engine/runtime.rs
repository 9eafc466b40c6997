// src/engine/runtime.rs

use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::errors::{Result, WorkflowError};

use super::backoff::Backoff;
use super::dispatcher::Dispatcher;
use super::LoopOptions;

/// Drives the [`Dispatcher`] until every instance completes.
///
/// This is the async shell around the dispatcher: it owns the sleep between
/// iterations and listens for shutdown requests while sleeping.
#[derive(Debug)]
pub struct Runtime {
    dispatcher: Dispatcher,
    backoff: Backoff,
    options: LoopOptions,
    shutdown_rx: mpsc::Receiver<()>,
}

impl Runtime {
    pub fn new(dispatcher: Dispatcher, options: LoopOptions, shutdown_rx: mpsc::Receiver<()>) -> Self {
        Self {
            dispatcher,
            backoff: Backoff::new(options.sleep_min, options.sleep_max),
            options,
            shutdown_rx,
        }
    }

    /// Main loop. Returns the dispatcher so the caller can report on the
    /// final table.
    pub async fn run(mut self) -> Result<Dispatcher> {
        info!("dispatch loop started");
        let mut stall_logged = false;

        loop {
            let report = self.dispatcher.iterate().await?;
            info!("{}", report.counts);

            if report.all_completed {
                info!("all jobs completed");
                break;
            }

            if report.stalled {
                let reason = format!(
                    "{} waiting and {} failed instance(s); nothing is ready or running",
                    report.counts.wait, report.counts.error
                );
                if self.options.exit_when_stalled {
                    return Err(WorkflowError::Stalled(reason));
                }
                if !stall_logged {
                    warn!("{reason}; still polling for input files");
                    stall_logged = true;
                }
            } else {
                stall_logged = false;
            }

            let pause = self.backoff.next_sleep(report.dispatched);
            tokio::select! {
                _ = tokio::time::sleep(pause) => {}
                Some(()) = self.shutdown_rx.recv() => {
                    info!("shutdown requested; handle files allow resuming later");
                    return Err(WorkflowError::Interrupted);
                }
            }
        }

        Ok(self.dispatcher)
    }
}
