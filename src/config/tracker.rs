//! Tracker configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::infra::activity_log::layout::{self, DEFAULT_RECORD_SIZE};

/// Default bound on concurrently executing queries.
pub const DEFAULT_MAX_CONCURRENT: i64 = 20;
/// Default number of activity log slots.
pub const DEFAULT_LOG_CAPACITY: usize = 1024;

/// Environment variable holding the concurrency bound.
pub const ENV_MAX_CONCURRENT: &str = "QUERY_TRACKER_MAX_CONCURRENT";
/// Environment variable holding the activity log path.
pub const ENV_ACTIVE_QUERY_LOG: &str = "QUERY_TRACKER_ACTIVE_QUERY_LOG";
/// Environment variable holding the activity log capacity.
pub const ENV_LOG_CAPACITY: &str = "QUERY_TRACKER_LOG_CAPACITY";
/// Environment variable holding the activity log record size.
pub const ENV_RECORD_SIZE: &str = "QUERY_TRACKER_RECORD_SIZE";
/// Environment variable toggling leftover reporting at startup.
pub const ENV_RECOVER_ON_START: &str = "QUERY_TRACKER_RECOVER_ON_START";

/// Admission and activity log settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Maximum concurrently admitted queries; `-1` for no bound.
    pub max_concurrent: i64,
    /// Activity log file. `None` disables the log.
    pub active_query_log: Option<PathBuf>,
    /// Number of activity log slots.
    pub log_capacity: usize,
    /// Size of one activity log record in bytes.
    pub record_size: usize,
    /// Report entries left by a previous process before reopening the log.
    pub recover_on_start: bool,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            active_query_log: None,
            log_capacity: DEFAULT_LOG_CAPACITY,
            record_size: DEFAULT_RECORD_SIZE,
            recover_on_start: true,
        }
    }
}

impl TrackerConfig {
    /// Validate configuration values.
    ///
    /// A log capacity below a bounded concurrency limit is allowed but logged,
    /// since admitted queries beyond the capacity would go unrecorded.
    ///
    /// # Errors
    ///
    /// Returns a message naming the offending field.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_concurrent < -1 {
            return Err("max_concurrent must be -1 (unbounded) or non-negative".into());
        }
        if self.active_query_log.is_none() {
            return Ok(());
        }
        if !layout::is_valid_capacity(self.log_capacity) {
            return Err(format!(
                "log_capacity must be between 1 and {}",
                layout::MAX_CAPACITY
            ));
        }
        if !layout::is_valid_record_size(self.record_size) {
            return Err(format!(
                "record_size must be a multiple of 8 between {} and {}",
                layout::MIN_RECORD_SIZE,
                layout::MAX_RECORD_SIZE
            ));
        }
        if let Ok(limit) = usize::try_from(self.max_concurrent) {
            if self.log_capacity < limit {
                tracing::warn!(
                    log_capacity = self.log_capacity,
                    max_concurrent = limit,
                    "activity log capacity is below the concurrency bound; some queries will not be recorded"
                );
            }
        }
        Ok(())
    }

    /// Parse tracker configuration from a JSON string and validate.
    ///
    /// # Errors
    ///
    /// Returns a message for malformed JSON or invalid values.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Build configuration from the process environment, loading a `.env`
    /// file first if one is present. Unset variables keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns a message for unparsable or invalid values.
    pub fn from_env() -> Result<Self, String> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup using the
    /// `QUERY_TRACKER_*` variable names.
    ///
    /// # Errors
    ///
    /// Returns a message for unparsable or invalid values.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();
        if let Some(v) = lookup(ENV_MAX_CONCURRENT) {
            cfg.max_concurrent = parse_var(ENV_MAX_CONCURRENT, &v)?;
        }
        if let Some(v) = lookup(ENV_ACTIVE_QUERY_LOG) {
            let v = v.trim();
            cfg.active_query_log = (!v.is_empty()).then(|| PathBuf::from(v));
        }
        if let Some(v) = lookup(ENV_LOG_CAPACITY) {
            cfg.log_capacity = parse_var(ENV_LOG_CAPACITY, &v)?;
        }
        if let Some(v) = lookup(ENV_RECORD_SIZE) {
            cfg.record_size = parse_var(ENV_RECORD_SIZE, &v)?;
        }
        if let Some(v) = lookup(ENV_RECOVER_ON_START) {
            cfg.recover_on_start = parse_var(ENV_RECOVER_ON_START, &v)?;
        }
        cfg.validate()?;
        Ok(cfg)
    }
}

fn parse_var<T>(key: &str, value: &str) -> Result<T, String>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| format!("{key}={value:?}: {e}"))
}
