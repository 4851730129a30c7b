//! # Controller Configuration
//!
//! Controller-level settings loaded from environment variables.

use super::{env_var_opt, env_var_or_default, env_var_or_default_str, parse_duration};
use crate::constants::{
    DEFAULT_FINALIZER_NAME, DEFAULT_MAX_CONCURRENT_RECONCILES, DEFAULT_RECONCILE_BACKOFF_MAX_SECS,
    DEFAULT_RECONCILE_BACKOFF_START_SECS, DEFAULT_RELIST_INTERVAL, DEFAULT_WATCH_BACKOFF_MAX_MS,
    DEFAULT_WATCH_BACKOFF_START_MS, DEFAULT_WATCH_RESTART_DELAY_AFTER_END_SECS,
    DEFAULT_WATCH_RESTART_DELAY_SECS,
};
use anyhow::{Context, Result};
use std::time::Duration;

/// Controller-level configuration
///
/// All settings have sensible defaults and can be overridden via environment variables.
/// Environment variables are populated from a ConfigMap using `envFrom` in the deployment.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Periodic re-check interval for converged buckets
    /// Drift introduced directly in the store is detected at this cadence
    pub relist_interval: Duration,
    /// Maximum concurrent reconciliations per resource kind
    pub max_concurrent_reconciles: u16,
    /// Public endpoint of the object store, used to build the access URL in status
    /// Empty means no URL is published
    pub external_endpoint: String,
    /// Finalizer that blocks deletion until the remote bucket is gone
    pub finalizer_name: String,
    /// First retry delay after a failed reconcile (seconds)
    pub reconcile_backoff_start_secs: u64,
    /// Upper bound for the retry delay after repeated failures (seconds)
    pub reconcile_backoff_max_secs: u64,
    /// Exponential backoff starting value for watch restarts (milliseconds)
    pub watch_backoff_start_ms: u64,
    /// Exponential backoff maximum value for watch restarts (milliseconds)
    pub watch_backoff_max_ms: u64,
    /// Watch stream restart delay after unknown errors (seconds)
    pub watch_restart_delay_secs: u64,
    /// Watch stream restart delay after stream ends (seconds)
    pub watch_restart_delay_after_end_secs: u64,
    /// Global log level (ERROR, WARN, INFO, DEBUG, TRACE)
    pub log_level: String,
    /// Log format (json, text)
    pub log_format: String,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            relist_interval: Duration::from_secs(60 * 60 * 60),
            max_concurrent_reconciles: DEFAULT_MAX_CONCURRENT_RECONCILES,
            external_endpoint: String::new(),
            finalizer_name: DEFAULT_FINALIZER_NAME.to_string(),
            reconcile_backoff_start_secs: DEFAULT_RECONCILE_BACKOFF_START_SECS,
            reconcile_backoff_max_secs: DEFAULT_RECONCILE_BACKOFF_MAX_SECS,
            watch_backoff_start_ms: DEFAULT_WATCH_BACKOFF_START_MS,
            watch_backoff_max_ms: DEFAULT_WATCH_BACKOFF_MAX_MS,
            watch_restart_delay_secs: DEFAULT_WATCH_RESTART_DELAY_SECS,
            watch_restart_delay_after_end_secs: DEFAULT_WATCH_RESTART_DELAY_AFTER_END_SECS,
            log_level: "INFO".to_string(),
            log_format: "json".to_string(),
        }
    }
}

impl ControllerConfig {
    /// Load configuration from environment variables with defaults
    ///
    /// Fails only when `RELIST_INTERVAL` is set to something unparseable; a
    /// silently ignored typo there would change the drift-check cadence.
    pub fn from_env() -> Result<Self> {
        let relist_raw = env_var_or_default_str("RELIST_INTERVAL", DEFAULT_RELIST_INTERVAL);
        let relist_interval = parse_duration(&relist_raw)
            .with_context(|| format!("Invalid RELIST_INTERVAL '{relist_raw}'"))?;

        let max_concurrent_reconciles = env_var_or_default(
            "MAX_CONCURRENT_RECONCILES",
            DEFAULT_MAX_CONCURRENT_RECONCILES,
        )
        .max(1);

        Ok(Self {
            relist_interval,
            max_concurrent_reconciles,
            external_endpoint: env_var_opt("EXTERNAL_ENDPOINT").unwrap_or_default(),
            finalizer_name: env_var_or_default_str("FINALIZER_NAME", DEFAULT_FINALIZER_NAME),
            reconcile_backoff_start_secs: env_var_or_default(
                "RECONCILE_BACKOFF_START_SECS",
                DEFAULT_RECONCILE_BACKOFF_START_SECS,
            ),
            reconcile_backoff_max_secs: env_var_or_default(
                "RECONCILE_BACKOFF_MAX_SECS",
                DEFAULT_RECONCILE_BACKOFF_MAX_SECS,
            ),
            watch_backoff_start_ms: env_var_or_default(
                "WATCH_BACKOFF_START_MS",
                DEFAULT_WATCH_BACKOFF_START_MS,
            ),
            watch_backoff_max_ms: env_var_or_default(
                "WATCH_BACKOFF_MAX_MS",
                DEFAULT_WATCH_BACKOFF_MAX_MS,
            ),
            watch_restart_delay_secs: env_var_or_default(
                "WATCH_RESTART_DELAY_SECS",
                DEFAULT_WATCH_RESTART_DELAY_SECS,
            ),
            watch_restart_delay_after_end_secs: env_var_or_default(
                "WATCH_RESTART_DELAY_AFTER_END_SECS",
                DEFAULT_WATCH_RESTART_DELAY_AFTER_END_SECS,
            ),
            log_level: env_var_or_default_str("LOG_LEVEL", "INFO"),
            log_format: env_var_or_default_str("LOG_FORMAT", "json"),
        })
    }

    /// Get watch restart delay duration
    pub fn watch_restart_delay_duration(&self) -> Duration {
        Duration::from_secs(self.watch_restart_delay_secs)
    }

    /// Get watch restart delay after end duration
    pub fn watch_restart_delay_after_end_duration(&self) -> Duration {
        Duration::from_secs(self.watch_restart_delay_after_end_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_relist_interval_is_sixty_hours() {
        let config = ControllerConfig::default();
        assert_eq!(config.relist_interval, Duration::from_secs(216_000));
        assert_eq!(config.max_concurrent_reconciles, 1);
        assert!(config.external_endpoint.is_empty());
    }

    #[test]
    fn test_default_relist_matches_constant() {
        let parsed = parse_duration(DEFAULT_RELIST_INTERVAL).unwrap();
        assert_eq!(parsed, ControllerConfig::default().relist_interval);
    }
}
