// tests/config_validation.rs

use std::io::Write;

use ngwf::config::{load_and_validate, parse_and_validate};
use ngwf::errors::WorkflowError;
use ngwf::types::{ExecutionType, QueueSystem};
use ngwf_test_utils::builders::{ExecutionBuilder, JobBuilder, WorkflowBuilder};
use tempfile::NamedTempFile;

const TWO_STAGE: &str = r#"
[config]
queue_system = "PBS"
sleep_min_secs = 5

[[execution]]
id = "local"
type = "local"
cores_per_node = 4

[[execution]]
id = "cluster"
type = "qsub-pe"
cores_per_node = 16
number_nodes = 2

[[job]]
id = "qc"
execution = "local"
command = 'fastqc \DATA.0'

[[job]]
id = "assemble"
execution = "cluster"
command = 'spades -o \SELF \CMDOPTS.0'
cores_per_cmd = 16
no_parallel = 2
injobs = ["qc"]
cmd_opts = ["--careful"]
"#;

#[test]
fn test_valid_workflow_loads_with_defaults_and_levels() {
    let spec = parse_and_validate(TWO_STAGE).expect("workflow should validate");

    assert_eq!(spec.config.queue_system, QueueSystem::Pbs);
    assert_eq!(spec.config.sleep_min_secs, 5);
    assert_eq!(spec.config.sleep_max_secs, 120);
    assert_eq!(spec.config.scripts_dir, "WF-sh");

    let ids: Vec<&str> = spec.jobs().iter().map(|j| j.id.as_str()).collect();
    assert_eq!(ids, vec!["qc", "assemble"]);

    assert_eq!(spec.job("qc").unwrap().job_level, 1);
    assert_eq!(spec.job("assemble").unwrap().job_level, 2);

    let cluster = spec.execution("cluster").unwrap();
    assert_eq!(cluster.kind, ExecutionType::QueueSharedNode);
    assert_eq!(cluster.capacity(), 2);
    assert_eq!(cluster.cost_of(spec.job("assemble").unwrap()), 2);
}

#[test]
fn test_load_and_validate_from_file() {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{TWO_STAGE}").unwrap();

    let spec = load_and_validate(file.path()).expect("file should validate");
    assert_eq!(spec.jobs().len(), 2);
}

#[test]
fn test_cores_per_cmd_above_cores_per_node_is_rejected() {
    let result = WorkflowBuilder::new()
        .with_execution(ExecutionBuilder::local("local", 4))
        .with_job(JobBuilder::new("big", "local").cores(8))
        .try_build();

    match result {
        Err(WorkflowError::InsufficientCores(msg)) => {
            assert!(msg.contains("big"));
            assert!(msg.contains('8'));
        }
        other => panic!("expected InsufficientCores, got {other:?}"),
    }
}

#[test]
fn test_local_job_whose_total_cores_exceed_pool_is_rejected() {
    let result = WorkflowBuilder::new()
        .with_execution(ExecutionBuilder::local("local", 4))
        .with_job(JobBuilder::new("wide", "local").cores(2).parallel(3))
        .try_build();

    assert!(matches!(result, Err(WorkflowError::InsufficientCores(_))));
}

#[test]
fn test_shared_node_job_needing_too_many_nodes_is_rejected() {
    let result = WorkflowBuilder::new()
        .with_execution(ExecutionBuilder::shared_node("pe", 8, 2))
        .with_job(JobBuilder::new("mpi", "pe").cores(8).parallel(3))
        .try_build();

    match result {
        Err(WorkflowError::InsufficientNodes(msg)) => assert!(msg.contains("3 nodes")),
        other => panic!("expected InsufficientNodes, got {other:?}"),
    }
}

#[test]
fn test_unknown_execution_type_is_rejected() {
    let result = WorkflowBuilder::new()
        .with_execution(ExecutionBuilder::new("grid", "slurm", 4))
        .with_job(JobBuilder::new("a", "grid"))
        .try_build();

    match result {
        Err(WorkflowError::UnknownExecutionType { execution, kind }) => {
            assert_eq!(execution, "grid");
            assert_eq!(kind, "slurm");
        }
        other => panic!("expected UnknownExecutionType, got {other:?}"),
    }
}

#[test]
fn test_legacy_execution_type_names_are_accepted() {
    let spec = WorkflowBuilder::new()
        .with_execution(ExecutionBuilder::new("a", "sh", 2))
        .with_execution(ExecutionBuilder::new("b", "qsub", 2))
        .with_job(JobBuilder::new("x", "a"))
        .with_job(JobBuilder::new("y", "b"))
        .build();

    assert_eq!(spec.execution("a").unwrap().kind, ExecutionType::Local);
    assert_eq!(spec.execution("b").unwrap().kind, ExecutionType::Queue);
}

#[test]
fn test_cycle_is_reported_as_dag_cycle() {
    let result = WorkflowBuilder::new()
        .with_execution(ExecutionBuilder::local("local", 4))
        .with_job(JobBuilder::new("a", "local").after("b"))
        .with_job(JobBuilder::new("b", "local").after("a"))
        .try_build();

    match result {
        Err(WorkflowError::DagCycle(msg)) => assert!(msg.contains("cycle")),
        other => panic!("expected DagCycle, got {other:?}"),
    }
}

#[test]
fn test_unknown_dependency_and_execution_are_config_errors() {
    let unknown_dep = WorkflowBuilder::new()
        .with_execution(ExecutionBuilder::local("local", 4))
        .with_job(JobBuilder::new("a", "local").after("ghost"))
        .try_build();
    assert!(matches!(unknown_dep, Err(WorkflowError::ConfigError(msg)) if msg.contains("ghost")));

    let unknown_exec = WorkflowBuilder::new()
        .with_execution(ExecutionBuilder::local("local", 4))
        .with_job(JobBuilder::new("a", "nowhere"))
        .try_build();
    assert!(matches!(unknown_exec, Err(WorkflowError::ConfigError(msg)) if msg.contains("nowhere")));
}

#[test]
fn test_self_dependency_and_duplicates_are_rejected() {
    let self_dep = WorkflowBuilder::new()
        .with_execution(ExecutionBuilder::local("local", 4))
        .with_job(JobBuilder::new("a", "local").after("a"))
        .try_build();
    assert!(matches!(self_dep, Err(WorkflowError::ConfigError(_))));

    let duplicate = WorkflowBuilder::new()
        .with_execution(ExecutionBuilder::local("local", 4))
        .with_job(JobBuilder::new("a", "local"))
        .with_job(JobBuilder::new("a", "local"))
        .try_build();
    assert!(matches!(duplicate, Err(WorkflowError::ConfigError(msg)) if msg.contains("more than once")));
}

#[test]
fn test_global_config_sanity() {
    let result = WorkflowBuilder::new()
        .with_config(|c| {
            c.sleep_min_secs = 30;
            c.sleep_max_secs = 10;
        })
        .with_execution(ExecutionBuilder::local("local", 4))
        .with_job(JobBuilder::new("a", "local"))
        .try_build();
    assert!(matches!(result, Err(WorkflowError::ConfigError(msg)) if msg.contains("sleep_max_secs")));

    let empty = parse_and_validate("[config]\n");
    assert!(matches!(empty, Err(WorkflowError::ConfigError(_))));
}

#[test]
fn test_malformed_toml_is_a_toml_error() {
    let result = parse_and_validate("[[job]]\nid = ");
    assert!(matches!(result, Err(WorkflowError::TomlError(_))));
}
