// tests/runtime.rs

use std::sync::Arc;
use std::time::Duration;

use ngwf::config::WorkflowSpec;
use ngwf::dag::JobTable;
use ngwf::engine::{Dispatcher, LoopOptions, Runtime};
use ngwf::errors::WorkflowError;
use ngwf::fs::mock::MockFileSystem;
use ngwf::fs::WorkLayout;
use ngwf::types::JobStatus;
use ngwf_test_utils::builders::{
    samples, work_layout, write_file, write_markers, ExecutionBuilder, JobBuilder,
    WorkflowBuilder,
};
use ngwf_test_utils::fake_backend::{fake_backends, FakeController};
use ngwf_test_utils::with_timeout;
use tokio::sync::mpsc;

fn fast_options(exit_when_stalled: bool) -> LoopOptions {
    LoopOptions {
        sleep_min: Duration::from_millis(1),
        sleep_max: Duration::from_millis(5),
        exit_when_stalled,
    }
}

fn setup(spec: WorkflowSpec, sample_ids: &[&str]) -> (Dispatcher, MockFileSystem, WorkLayout, FakeController) {
    ngwf_test_utils::init_tracing();
    let fs = MockFileSystem::new();
    let layout = work_layout();
    let table = JobTable::materialize(&spec, &samples(sample_ids), &layout, None);
    let (backends, mut controllers) = fake_backends(&spec);
    let controller = controllers.remove("local").expect("local pool");
    let dispatcher = Dispatcher::new(spec, table, backends, Arc::new(fs.clone()));
    (dispatcher, fs, layout, controller)
}

fn pipeline() -> WorkflowSpec {
    WorkflowBuilder::new()
        .with_execution(ExecutionBuilder::local("local", 2))
        .with_job(JobBuilder::new("fetch", "local"))
        .with_job(JobBuilder::new("align", "local").after("fetch"))
        .with_job(JobBuilder::new("call", "local").after("align"))
        .build()
}

#[tokio::test]
async fn test_runtime_runs_until_all_completed() {
    let (dispatcher, fs, layout, controller) = setup(pipeline(), &["S1", "S2"]);
    controller.set_auto_finish(true);
    for sample in ["S1", "S2"] {
        for job in ["fetch", "align", "call"] {
            write_markers(&fs, &layout, sample, job);
        }
    }

    let (_shutdown_tx, shutdown_rx) = mpsc::channel(1);
    let runtime = Runtime::new(dispatcher, fast_options(false), shutdown_rx);
    let dispatcher = with_timeout(runtime.run()).await.expect("run should succeed");

    assert!(dispatcher.table().all_completed());
    assert_eq!(controller.submissions().len(), 6);
    // Each level was dispatched only after the previous one completed.
    let keys = controller.submitted_keys();
    let pos = |k: &str| keys.iter().position(|x| x == k).unwrap();
    assert!(pos("fetch,S1") < pos("align,S1"));
    assert!(pos("align,S2") < pos("call,S2"));
}

#[tokio::test]
async fn test_runtime_with_exit_when_stalled_reports_stall() {
    let spec = WorkflowBuilder::new()
        .with_execution(ExecutionBuilder::local("local", 2))
        .with_job(JobBuilder::new("qc", "local").infile("reads.fq"))
        .build();
    let (dispatcher, _fs, _layout, controller) = setup(spec, &["S1"]);

    let (_shutdown_tx, shutdown_rx) = mpsc::channel(1);
    let runtime = Runtime::new(dispatcher, fast_options(true), shutdown_rx);

    match with_timeout(runtime.run()).await {
        Err(WorkflowError::Stalled(reason)) => assert!(reason.contains("1 waiting")),
        other => panic!("expected Stalled, got {other:?}"),
    }
    assert!(controller.submissions().is_empty());
}

#[tokio::test]
async fn test_runtime_keeps_polling_until_input_appears() {
    let spec = WorkflowBuilder::new()
        .with_execution(ExecutionBuilder::local("local", 2))
        .with_job(JobBuilder::new("qc", "local").infile("reads.fq"))
        .build();
    let (dispatcher, fs, layout, controller) = setup(spec, &["S1"]);
    controller.set_auto_finish(true);
    write_markers(&fs, &layout, "S1", "qc");

    let late_fs = fs.clone();
    let reads = layout.sample_dir("S1").join("reads.fq");
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(30)).await;
        write_file(&late_fs, &reads, "@r1\nACGT\n");
    });

    let (_shutdown_tx, shutdown_rx) = mpsc::channel(1);
    let runtime = Runtime::new(dispatcher, fast_options(false), shutdown_rx);
    let dispatcher = with_timeout(runtime.run()).await.expect("run should succeed");

    assert_eq!(
        dispatcher.table().status_of("qc", "S1"),
        Some(JobStatus::Completed)
    );
}

#[tokio::test]
async fn test_shutdown_request_interrupts_the_loop() {
    let (dispatcher, _fs, _layout, controller) = setup(pipeline(), &["S1"]);

    let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
    shutdown_tx.send(()).await.unwrap();
    let runtime = Runtime::new(
        dispatcher,
        LoopOptions {
            sleep_min: Duration::from_secs(30),
            sleep_max: Duration::from_secs(60),
            exit_when_stalled: false,
        },
        shutdown_rx,
    );

    let result = with_timeout(runtime.run()).await;
    assert!(matches!(result, Err(WorkflowError::Interrupted)));
    // The first iteration still dispatched before the request was seen.
    assert_eq!(controller.submitted_keys(), vec!["fetch,S1"]);
}

#[test]
fn test_backoff_doubles_when_idle_and_resets_on_dispatch() {
    use ngwf::engine::Backoff;

    let mut backoff = Backoff::new(Duration::from_secs(15), Duration::from_secs(120));
    assert_eq!(backoff.current(), Duration::from_secs(15));

    let idle: Vec<u64> = (0..5).map(|_| backoff.next_sleep(0).as_secs()).collect();
    assert_eq!(idle, vec![30, 60, 120, 120, 120]);

    assert_eq!(backoff.next_sleep(3), Duration::from_secs(15));
    assert_eq!(backoff.next_sleep(0), Duration::from_secs(30));
}

#[test]
fn test_loop_options_follow_config() {
    let spec = WorkflowBuilder::new()
        .with_config(|c| {
            c.sleep_min_secs = 2;
            c.sleep_max_secs = 8;
        })
        .with_execution(ExecutionBuilder::local("local", 1))
        .with_job(JobBuilder::new("a", "local"))
        .build();

    let options = LoopOptions::from_config(&spec.config, true);
    assert_eq!(options.sleep_min, Duration::from_secs(2));
    assert_eq!(options.sleep_max, Duration::from_secs(8));
    assert!(options.exit_when_stalled);
}
