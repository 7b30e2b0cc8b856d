//! Tests for error types

use prometheus_job_runner::core::{AppResult, InvocationError, RunnerError};

#[test]
fn test_invalid_config_error() {
    let err = RunnerError::InvalidConfig("resource names must not be empty".to_string());
    assert_eq!(
        format!("{}", err),
        "invalid configuration: resource names must not be empty"
    );
}

#[test]
fn test_insufficient_resources_error() {
    let err = RunnerError::InsufficientResources {
        job: 3,
        resource: "gpu".to_string(),
    };
    assert_eq!(format!("{}", err), "insufficient resources for job 3: `gpu` exhausted");
}

#[test]
fn test_spawn_error_from_io() {
    let io = std::io::Error::new(std::io::ErrorKind::WouldBlock, "no threads left");
    let err: RunnerError = io.into();
    assert!(matches!(err, RunnerError::Spawn(_)));
    assert_eq!(format!("{}", err), "failed to spawn thread: no threads left");
}

#[test]
fn test_shut_down_error() {
    assert_eq!(format!("{}", RunnerError::ShutDown), "runner has been shut down");
}

#[test]
fn test_invocation_errors() {
    assert_eq!(
        format!("{}", InvocationError::Panicked("boom".to_string())),
        "invocation failed: boom"
    );
    assert_eq!(format!("{}", InvocationError::Timeout), "invocation timed out");
    assert_eq!(
        format!("{}", InvocationError::Interrupted),
        "invocation interrupted before completion"
    );
    assert_eq!(format!("{}", InvocationError::ShutDown), "pool has been shut down");
}

#[test]
fn test_app_result_wraps_runner_error() {
    fn fails() -> AppResult<()> {
        Err(RunnerError::ShutDown)?;
        Ok(())
    }
    let err = fails().unwrap_err();
    assert!(err.downcast_ref::<RunnerError>().is_some());
}
