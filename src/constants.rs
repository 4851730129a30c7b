//! # Constants
//!
//! Shared constants used throughout the controller.
//!
//! These values represent reasonable defaults and can be overridden via
//! configuration or environment variables where applicable.

/// API group shared by the `Bucket` and `ClusterBucket` resources
pub const API_GROUP: &str = "objectstore.octopilot.io";

/// Field manager name used for server-side patches
pub const FIELD_MANAGER: &str = "bucket-controller";

/// Default finalizer that guards remote bucket cleanup
pub const DEFAULT_FINALIZER_NAME: &str = "objectstore.octopilot.io/bucket-cleanup";

/// Annotation stamped by `bucketctl reconcile` to force an immediate reconcile
pub const RECONCILE_ANNOTATION: &str = "objectstore.octopilot.io/reconcile";

/// Default periodic re-check interval for converged buckets
pub const DEFAULT_RELIST_INTERVAL: &str = "60h";

/// Default maximum number of buckets reconciled at the same time
pub const DEFAULT_MAX_CONCURRENT_RECONCILES: u16 = 1;

/// Default HTTP server port for metrics and health probes
pub const DEFAULT_METRICS_PORT: u16 = 5000;

/// Default HTTP server startup timeout (how long to wait for server to be ready)
pub const DEFAULT_SERVER_STARTUP_TIMEOUT_SECS: u64 = 10;

/// Default HTTP server readiness poll interval
pub const DEFAULT_SERVER_POLL_INTERVAL_MS: u64 = 50;

/// Default first retry delay after a failed reconcile (seconds)
pub const DEFAULT_RECONCILE_BACKOFF_START_SECS: u64 = 5;

/// Default upper bound for the reconcile retry delay (seconds)
pub const DEFAULT_RECONCILE_BACKOFF_MAX_SECS: u64 = 300;

/// Default exponential backoff starting value for watch restarts (milliseconds)
pub const DEFAULT_WATCH_BACKOFF_START_MS: u64 = 1000;

/// Default exponential backoff maximum value for watch restarts (milliseconds)
pub const DEFAULT_WATCH_BACKOFF_MAX_MS: u64 = 30_000;

/// Default delay before restarting watch stream after unknown errors (seconds)
pub const DEFAULT_WATCH_RESTART_DELAY_SECS: u64 = 5;

/// Default delay before restarting watch stream after it ends (seconds)
pub const DEFAULT_WATCH_RESTART_DELAY_AFTER_END_SECS: u64 = 1;

/// Region used when neither the resource nor the store config names one
pub const DEFAULT_STORE_REGION: &str = "us-east-1";

/// Maximum length of an S3 bucket name
pub const MAX_BUCKET_NAME_LEN: usize = 63;

/// Length of the random suffix appended to remote bucket names
pub const BUCKET_NAME_SUFFIX_LEN: usize = 8;
