//! Job runner configuration: the resource table and the worker pool.

use std::collections::HashMap;
use std::env;

use serde::{Deserialize, Serialize};

use super::pool::WorkerPoolConfig;

/// Environment variable holding the initial worker count.
pub const WORKERS_ENV: &str = "JOB_RUNNER_WORKERS";
/// Environment variable holding resources as `name=count,name=count`.
pub const RESOURCES_ENV: &str = "JOB_RUNNER_RESOURCES";

/// Root configuration for a [`JobRunner`](crate::core::JobRunner).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Initial capacity per resource name.
    pub resources: HashMap<String, u32>,
    /// Worker pool settings.
    #[serde(default)]
    pub workers: WorkerPoolConfig,
}

impl RunnerConfig {
    /// Create a configuration from a resource table and an initial worker count.
    pub fn new<I, S>(resources: I, worker_count: usize) -> Self
    where
        I: IntoIterator<Item = (S, u32)>,
        S: Into<String>,
    {
        Self {
            resources: resources
                .into_iter()
                .map(|(name, count)| (name.into(), count))
                .collect(),
            workers: WorkerPoolConfig::new().with_worker_count(worker_count),
        }
    }

    /// Replace the worker pool settings.
    #[must_use]
    pub fn with_workers(mut self, workers: WorkerPoolConfig) -> Self {
        self.workers = workers;
        self
    }

    /// Validate resource names and pool settings.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid entry.
    pub fn validate(&self) -> Result<(), String> {
        if self.resources.keys().any(|name| name.trim().is_empty()) {
            return Err("resource names must not be empty".into());
        }
        self.workers
            .validate()
            .map_err(|e| format!("workers invalid: {e}"))
    }

    /// Parse runner configuration from a JSON string and validate.
    ///
    /// # Errors
    ///
    /// Returns a parse or validation error message.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Build configuration from the environment, loading a `.env` file if present.
    ///
    /// Reads [`WORKERS_ENV`] and [`RESOURCES_ENV`]; unset variables keep defaults.
    ///
    /// # Errors
    ///
    /// Returns a message if a variable is malformed or the result is invalid.
    pub fn from_env() -> Result<Self, String> {
        let _ = dotenvy::dotenv();
        let mut cfg = Self::default();
        if let Ok(raw) = env::var(WORKERS_ENV) {
            cfg.workers.worker_count = raw
                .trim()
                .parse()
                .map_err(|e| format!("{WORKERS_ENV}: {e}"))?;
        }
        if let Ok(raw) = env::var(RESOURCES_ENV) {
            cfg.resources = parse_resources(&raw)?;
        }
        cfg.validate()?;
        Ok(cfg)
    }
}

/// Parse `name=count,name=count` into a resource map. Empty segments are skipped.
///
/// # Errors
///
/// Returns a message naming the malformed segment.
pub fn parse_resources(raw: &str) -> Result<HashMap<String, u32>, String> {
    raw.split(',')
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            let (name, count) = segment
                .split_once('=')
                .ok_or_else(|| format!("{RESOURCES_ENV}: expected name=count, got `{segment}`"))?;
            let count = count
                .trim()
                .parse()
                .map_err(|e| format!("{RESOURCES_ENV}: `{segment}`: {e}"))?;
            Ok((name.trim().to_owned(), count))
        })
        .collect()
}
