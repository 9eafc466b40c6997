// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod report;
pub mod types;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::cli::{CliArgs, Task};
use crate::config::loader::load_and_validate;
use crate::config::model::WorkflowSpec;
use crate::config::params::{check_known_jobs, load_parameter_file, parse_parameter_names, CmdOpts};
use crate::config::samples::{ensure_sample_dirs, load_sample_file, parse_sample_names};
use crate::dag::cascade::{plan_deletion, render_delete_script, DeleteSelector};
use crate::dag::{DagGraph, JobTable};
use crate::engine::{Dispatcher, LoopOptions, Runtime};
use crate::errors::{Result, WorkflowError};
use crate::exec::script::write_scripts;
use crate::exec::{build_backends, QstatSource, StatusPoller};
use crate::fs::{FileSystem, RealFileSystem, WorkLayout};

/// Everything materialized before a task or the dispatch loop runs.
#[derive(Debug)]
pub struct Prepared {
    pub spec: WorkflowSpec,
    pub layout: WorkLayout,
    pub table: JobTable,
}

/// Load and validate all inputs, then create sample directories and write
/// job scripts.
///
/// Nothing touches the work directory until the workflow, samples,
/// parameters and job subset have all been validated.
pub fn prepare(args: &CliArgs, fs: &dyn FileSystem) -> Result<Prepared> {
    let mut spec = load_and_validate(&args.input)?;
    if let Some(system) = args.queue_system {
        spec.config.queue_system = system;
    }

    let samples = match (&args.sample_file, &args.sample_name) {
        (Some(path), _) => load_sample_file(fs, path)?,
        (None, Some(names)) => parse_sample_names(names)?,
        (None, None) => {
            return Err(WorkflowError::SampleError("no input sample".to_string()));
        }
    };

    let opts: CmdOpts = match (&args.parameter_file, &args.parameter_name) {
        (Some(path), _) => load_parameter_file(fs, path)?,
        (None, Some(names)) => parse_parameter_names(names),
        (None, None) => CmdOpts::new(),
    };
    check_known_jobs(&opts, &spec)?;
    spec.apply_cmd_opts(&opts);

    let active = if args.jobs.is_empty() {
        None
    } else {
        let graph = DagGraph::from_jobs(spec.jobs());
        let closure = graph.upstream_closure(args.jobs.as_slice())?;
        info!(requested = ?args.jobs, active = closure.len(), "running job subset");
        Some(closure)
    };

    let root = fs
        .canonicalize(&args.work_dir)
        .with_context(|| format!("resolving work dir {:?}", args.work_dir))?;
    let layout = WorkLayout::new(root, &spec.config.scripts_dir);

    ensure_sample_dirs(fs, &layout, &samples)?;
    let table = JobTable::materialize(&spec, &samples, &layout, active.as_ref());
    write_scripts(&table, &spec, &layout, fs)?;

    Ok(Prepared {
        spec,
        layout,
        table,
    })
}

/// Production dispatcher: real backends plus `qstat` status polling.
pub fn build_dispatcher(prepared: Prepared, fs: Arc<dyn FileSystem>) -> Dispatcher {
    let config = &prepared.spec.config;
    let backends = build_backends(&prepared.spec, config.call_timeout());
    let poller = StatusPoller::new(
        Box::new(QstatSource::new(config.queue_system, config.call_timeout())),
        config.status_query_retries,
    );
    Dispatcher::new(prepared.spec, prepared.table, backends, fs).with_status_poller(poller)
}

/// High-level entry point used by `main.rs`.
pub async fn run(args: CliArgs) -> Result<()> {
    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let prepared = prepare(&args, fs.as_ref())?;

    match args.task {
        Some(Task::WriteSh) => {
            info!("scripts written; nothing else to do");
            Ok(())
        }
        Some(Task::ListJobs) => {
            print!("{}", report::render_job_list(&prepared.spec, prepared.table.jobs()));
            Ok(())
        }
        Some(Task::LogCpu) => report::write_cpu_reports(
            &prepared.table,
            &prepared.spec,
            &prepared.layout,
            fs.as_ref(),
        ),
        Some(Task::Snapshot) => {
            let mut dispatcher = build_dispatcher(prepared, fs.clone());
            dispatcher.observe().await?;
            print!("{}", report::render_snapshot(dispatcher.table()));
            Ok(())
        }
        Some(Task::DeleteJobs) => {
            let selector: DeleteSelector = args
                .second_parameter
                .as_deref()
                .ok_or_else(|| {
                    WorkflowError::ConfigError(
                        "delete-jobs needs -Z jobids:a,b or -Z run_after:<file>".to_string(),
                    )
                })?
                .parse()?;
            let path = delete_jobs(&prepared, fs.as_ref(), &selector)?;
            println!(
                "Nothing has been deleted yet; run {} to delete files",
                path.display()
            );
            Ok(())
        }
        None => run_loop(prepared, fs, args.exit_when_stalled).await,
    }
}

/// Plan a cascade deletion and write the cleanup script into the work dir.
pub fn delete_jobs(
    prepared: &Prepared,
    fs: &dyn FileSystem,
    selector: &DeleteSelector,
) -> Result<PathBuf> {
    let graph = DagGraph::from_jobs(prepared.spec.jobs());
    let plan = plan_deletion(&graph, &prepared.table, &prepared.layout, fs, selector)?;
    for deletion in plan.iter() {
        println!(
            "#jobs to be deleted for {}: {}",
            deletion.sample,
            deletion.job_ids().join(",")
        );
    }

    let path = prepared
        .layout
        .root()
        .join(format!("WF-delete-{}.sh", std::process::id()));
    fs.write(&path, render_delete_script(&plan).as_bytes())
        .with_context(|| format!("writing delete script {:?}", path))?;
    Ok(path)
}

async fn run_loop(prepared: Prepared, fs: Arc<dyn FileSystem>, exit_when_stalled: bool) -> Result<()> {
    let options = LoopOptions::from_config(&prepared.spec.config, exit_when_stalled);
    let spec = prepared.spec.clone();
    let layout = prepared.layout.clone();
    let dispatcher = build_dispatcher(prepared, fs.clone());

    // Ctrl-C -> stop sleeping and exit.
    let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>(1);
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            eprintln!("failed to listen for Ctrl+C: {e}");
            return;
        }
        let _ = shutdown_tx.send(()).await;
    });

    let runtime = Runtime::new(dispatcher, options, shutdown_rx);
    let dispatcher = runtime.run().await?;

    debug!("writing CPU reports");
    report::write_cpu_reports(dispatcher.table(), &spec, &layout, fs.as_ref())
}
