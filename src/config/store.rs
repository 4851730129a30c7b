//! # Store Configuration
//!
//! Connection settings for the S3-compatible bucket store.

use super::{env_var_opt, env_var_or_default_bool, env_var_or_default_str};
use crate::constants::DEFAULT_STORE_REGION;

/// Bucket store connection configuration
///
/// Built once at process start; the resulting client is shared by every reconcile.
#[derive(Clone, Default)]
pub struct StoreConfig {
    /// Internal S3 endpoint (e.g. `http://minio.storage.svc:9000`)
    /// When unset the AWS SDK resolves the regional AWS endpoint
    pub endpoint: Option<String>,
    /// Region used when a resource does not specify one
    pub region: String,
    /// Static access key ID; when unset the default AWS credential chain is used
    pub access_key_id: Option<String>,
    /// Static secret access key
    pub secret_access_key: Option<String>,
    /// Prefix prepended to every generated remote bucket name
    pub bucket_name_prefix: String,
    /// Use path-style addressing (required by most MinIO deployments)
    pub force_path_style: bool,
}

impl std::fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreConfig")
            .field("endpoint", &self.endpoint)
            .field("region", &self.region)
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &self.secret_access_key.as_ref().map(|_| "***"))
            .field("bucket_name_prefix", &self.bucket_name_prefix)
            .field("force_path_style", &self.force_path_style)
            .finish()
    }
}

impl StoreConfig {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        Self {
            endpoint: env_var_opt("STORE_ENDPOINT"),
            region: env_var_or_default_str("STORE_REGION", DEFAULT_STORE_REGION),
            access_key_id: env_var_opt("STORE_ACCESS_KEY_ID"),
            secret_access_key: env_var_opt("STORE_SECRET_ACCESS_KEY"),
            bucket_name_prefix: env_var_or_default_str("BUCKET_NAME_PREFIX", ""),
            force_path_style: env_var_or_default_bool("STORE_FORCE_PATH_STYLE", true),
        }
    }

    /// Static credentials, if both halves are configured
    pub fn static_credentials(&self) -> Option<(&str, &str)> {
        match (&self.access_key_id, &self.secret_access_key) {
            (Some(id), Some(secret)) => Some((id.as_str(), secret.as_str())),
            _ => None,
        }
    }
}
