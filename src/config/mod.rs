//! # Configuration
//!
//! Process-level configuration loaded from environment variables.
//!
//! - `controller` - reconcile cadence, concurrency, finalizer and logging settings
//! - `server` - metrics/probe HTTP server settings
//! - `store` - connection settings for the S3-compatible bucket store
//! - `duration` - parsing of `<number><unit>` duration strings

pub mod controller;
pub mod duration;
pub mod server;
pub mod store;

pub use controller::ControllerConfig;
pub use duration::parse_duration;
pub use server::ServerConfig;
pub use store::StoreConfig;

/// Read environment variable or return default value
pub(crate) fn env_var_or_default<T: std::str::FromStr>(key: &str, default: T) -> T
where
    <T as std::str::FromStr>::Err: std::fmt::Debug,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Read environment variable as boolean or return default
pub(crate) fn env_var_or_default_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|v| {
            let v_lower = v.to_lowercase();
            v_lower == "true" || v_lower == "1" || v_lower == "yes" || v_lower == "on"
        })
        .unwrap_or(default)
}

/// Read environment variable as string or return default
pub(crate) fn env_var_or_default_str(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Read an optional, non-empty environment variable
pub(crate) fn env_var_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
