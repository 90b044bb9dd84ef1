//! Commit runner configuration (defaults, JSON, environment).

use serde::{Deserialize, Serialize};

use crate::types::WalletError;

pub const ENV_WORKERS: &str = "EXAWALLET_COMMIT_WORKERS";
pub const ENV_MAX_BLOCKING: &str = "EXAWALLET_COMMIT_MAX_BLOCKING";
pub const ENV_THREAD_NAME: &str = "EXAWALLET_COMMIT_THREAD_NAME";
/// Whole config as JSON; the per-field variables above override it.
pub const ENV_CONFIG: &str = "EXAWALLET_COMMIT_CONFIG";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Async worker threads of the commit runtime
    pub worker_threads: usize,
    /// Upper bound on concurrently running native commits
    pub max_blocking_threads: usize,
    pub thread_name: String,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            worker_threads: 2,
            max_blocking_threads: 16,
            thread_name: "exawallet-commit".to_string(),
        }
    }
}

impl RunnerConfig {
    pub fn from_json(s: &str) -> Result<Self, WalletError> {
        let cfg: RunnerConfig = serde_json::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Defaults (or `EXAWALLET_COMMIT_CONFIG` JSON) overridden by the
    /// per-field `EXAWALLET_COMMIT_*` environment variables.
    pub fn from_env() -> Result<Self, WalletError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, WalletError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = match lookup(ENV_CONFIG) {
            Some(json) => Self::from_json(&json)?,
            None => Self::default(),
        };
        if let Some(v) = lookup(ENV_WORKERS) {
            cfg.worker_threads = parse_count(ENV_WORKERS, &v)?;
        }
        if let Some(v) = lookup(ENV_MAX_BLOCKING) {
            cfg.max_blocking_threads = parse_count(ENV_MAX_BLOCKING, &v)?;
        }
        if let Some(v) = lookup(ENV_THREAD_NAME) {
            cfg.thread_name = v;
        }
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), WalletError> {
        if self.worker_threads == 0 {
            return Err(WalletError::InvalidArgument("worker_threads must be at least 1".into()));
        }
        if self.max_blocking_threads == 0 {
            return Err(WalletError::InvalidArgument("max_blocking_threads must be at least 1".into()));
        }
        if self.thread_name.trim().is_empty() {
            return Err(WalletError::InvalidArgument("thread_name is empty".into()));
        }
        Ok(())
    }
}

fn parse_count(key: &str, raw: &str) -> Result<usize, WalletError> {
    raw.trim()
        .parse::<usize>()
        .map_err(|e| WalletError::InvalidArgument(format!("{key}={raw:?}: {e}")))
}
