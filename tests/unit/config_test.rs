//! Tests for configuration validation and loading

use prometheus_job_runner::config::runner::{parse_resources, RESOURCES_ENV, WORKERS_ENV};
use prometheus_job_runner::config::{RunnerConfig, WorkerPoolConfig};

#[test]
fn test_worker_pool_config_defaults() {
    let config = WorkerPoolConfig::default();
    assert!(config.worker_count >= 1);
    assert_eq!(config.thread_name_prefix, "job-runner");
    assert_eq!(config.stack_size, None);
    assert!(config.validate().is_ok());
}

#[test]
fn test_worker_pool_config_validation() {
    let zero_workers = WorkerPoolConfig::new().with_worker_count(0);
    assert!(zero_workers.validate().is_ok());

    let blank_prefix = WorkerPoolConfig::new().with_thread_name_prefix("  ");
    assert!(blank_prefix.validate().is_err());

    let zero_stack = WorkerPoolConfig::new().with_stack_size(0);
    assert!(zero_stack.validate().is_err());
}

#[test]
fn test_runner_config_validation() {
    let valid = RunnerConfig::new([("cpu", 4), ("gpu", 0)], 2);
    assert!(valid.validate().is_ok());
    assert_eq!(valid.workers.worker_count, 2);

    let empty_name = RunnerConfig::new([("", 1)], 2);
    assert!(empty_name.validate().is_err());

    let bad_workers = RunnerConfig::new([("cpu", 1)], 1)
        .with_workers(WorkerPoolConfig::new().with_thread_name_prefix(""));
    let err = bad_workers.validate().unwrap_err();
    assert!(err.starts_with("workers invalid"));
}

#[test]
fn test_runner_config_from_json() {
    let config = RunnerConfig::from_json_str(
        r#"{
            "resources": { "cpu": 2, "disk": 1 },
            "workers": { "worker_count": 3, "thread_name_prefix": "batch" }
        }"#,
    )
    .unwrap();
    assert_eq!(config.resources["cpu"], 2);
    assert_eq!(config.resources["disk"], 1);
    assert_eq!(config.workers.worker_count, 3);
    assert_eq!(config.workers.thread_name_prefix, "batch");
    assert_eq!(config.workers.stack_size, None);
}

#[test]
fn test_runner_config_from_json_defaults_workers() {
    let config = RunnerConfig::from_json_str(r#"{ "resources": { "cpu": 1 } }"#).unwrap();
    assert_eq!(config.workers, WorkerPoolConfig::default());
}

#[test]
fn test_runner_config_from_json_rejects_invalid() {
    assert!(RunnerConfig::from_json_str("not json").is_err());
    assert!(RunnerConfig::from_json_str(r#"{ "resources": { "": 1 } }"#).is_err());
    assert!(RunnerConfig::from_json_str(r#"{ "resources": { "cpu": -1 } }"#).is_err());
}

#[test]
fn test_parse_resources() {
    let parsed = parse_resources(" cpu=4, gpu = 1 ,,disk=0").unwrap();
    assert_eq!(parsed.len(), 3);
    assert_eq!(parsed["cpu"], 4);
    assert_eq!(parsed["gpu"], 1);
    assert_eq!(parsed["disk"], 0);

    assert!(parse_resources("").unwrap().is_empty());
}

#[test]
fn test_parse_resources_errors_name_segment() {
    let missing_eq = parse_resources("cpu4").unwrap_err();
    assert!(missing_eq.contains(RESOURCES_ENV));
    assert!(missing_eq.contains("cpu4"));

    let bad_count = parse_resources("cpu=many").unwrap_err();
    assert!(bad_count.contains("cpu=many"));
}

#[test]
fn test_env_variable_names() {
    assert_eq!(WORKERS_ENV, "JOB_RUNNER_WORKERS");
    assert_eq!(RESOURCES_ENV, "JOB_RUNNER_RESOURCES");
}
