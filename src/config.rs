//! Configuration types.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;

/// Store key the workload snapshot is saved under.
pub const DEFAULT_WORKLOAD_KEY: &str = "multiworker_workload";

/// Runner configuration.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Number of background worker slots.
    pub max_workers: usize,
    /// Upper bound on a single idle-detector wait before it re-checks.
    pub idle_wait: Duration,
    /// How often a blocked `ask` wakes to re-check the response slot.
    pub liveness_poll: Duration,
    /// Give up on an unanswered question after this long (`None` = wait forever).
    pub answer_timeout: Option<Duration>,
    /// Minimum number of `repository_load` tasks kept in the workload.
    pub min_repository_loads: usize,
    /// Path of the libSQL database holding the workload snapshot.
    pub db_path: PathBuf,
    /// Store key for the workload snapshot.
    pub workload_key: String,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            max_workers: 5,
            idle_wait: Duration::from_secs(60),
            liveness_poll: Duration::from_secs(10),
            answer_timeout: None,
            min_repository_loads: 3,
            db_path: PathBuf::from("./data/taskloom.db"),
            workload_key: DEFAULT_WORKLOAD_KEY.to_string(),
        }
    }
}

impl RunnerConfig {
    /// Build a config from `TASKLOOM_*` environment variables, falling back
    /// to defaults for anything unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let max_workers = parse_or(&lookup, "TASKLOOM_MAX_WORKERS", defaults.max_workers)?;
        if max_workers == 0 {
            return Err(ConfigError::InvalidValue {
                key: "TASKLOOM_MAX_WORKERS".to_string(),
                message: "must be at least 1".to_string(),
            });
        }

        let idle_wait = parse_or(
            &lookup,
            "TASKLOOM_IDLE_WAIT_SECS",
            defaults.idle_wait.as_secs(),
        )?;
        let liveness_poll = parse_or(
            &lookup,
            "TASKLOOM_LIVENESS_SECS",
            defaults.liveness_poll.as_secs(),
        )?;
        let answer_timeout = match lookup("TASKLOOM_ANSWER_TIMEOUT_SECS") {
            Some(raw) if !raw.trim().is_empty() => Some(Duration::from_secs(parse_value(
                "TASKLOOM_ANSWER_TIMEOUT_SECS",
                &raw,
            )?)),
            _ => None,
        };

        Ok(Self {
            max_workers,
            idle_wait: Duration::from_secs(idle_wait),
            liveness_poll: Duration::from_secs(liveness_poll.max(1)),
            answer_timeout,
            min_repository_loads: parse_or(
                &lookup,
                "TASKLOOM_MIN_REPOSITORY_LOADS",
                defaults.min_repository_loads,
            )?,
            db_path: lookup("TASKLOOM_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.db_path),
            workload_key: lookup("TASKLOOM_WORKLOAD_KEY").unwrap_or(defaults.workload_key),
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => parse_value(key, &raw),
        None => Ok(default),
    }
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e: T::Err| ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("{raw:?}: {e}"),
        })
}
