//! # Provider Modules
//!
//! Bucket store abstraction and its S3 implementation.
//!
//! The reconciler only talks to [`BucketStore`]; the S3 client is an
//! implementation detail of [`s3::S3BucketStore`].

use crate::crd::{BucketPolicy, BucketRegion};
use async_trait::async_trait;

#[cfg(test)]
use mockall::automock;

/// Store operations, used for error context and metric labels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOperation {
    CreateBucket,
    BucketExists,
    ComparePolicy,
    SetPolicy,
    DeleteBucket,
}

impl StoreOperation {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreOperation::CreateBucket => "create_bucket",
            StoreOperation::BucketExists => "bucket_exists",
            StoreOperation::ComparePolicy => "compare_bucket_policy",
            StoreOperation::SetPolicy => "set_bucket_policy",
            StoreOperation::DeleteBucket => "delete_bucket",
        }
    }
}

impl std::fmt::Display for StoreOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure reported by the bucket store
#[derive(Debug, thiserror::Error)]
#[error("{operation} failed for bucket '{bucket}': {source}")]
pub struct StoreError {
    pub operation: StoreOperation,
    pub bucket: String,
    #[source]
    pub source: Box<dyn std::error::Error + Send + Sync>,
}

impl StoreError {
    pub fn new(
        operation: StoreOperation,
        bucket: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self {
            operation,
            bucket: bucket.into(),
            source: source.into(),
        }
    }
}

/// Remote bucket store
///
/// Every call is a remote round-trip; the reconciler never caches results.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait BucketStore: Send + Sync {
    /// Create a bucket for the resource `namespace/name` and return the
    /// generated remote name. `namespace` is empty for cluster-scoped resources.
    async fn create_bucket(
        &self,
        namespace: &str,
        name: &str,
        region: Option<BucketRegion>,
    ) -> Result<String, StoreError>;

    /// Whether the remote bucket currently exists
    async fn bucket_exists(&self, bucket: &str) -> Result<bool, StoreError>;

    /// Whether the bucket's current policy is semantically equal to `policy`
    async fn compare_bucket_policy(
        &self,
        bucket: &str,
        policy: BucketPolicy,
    ) -> Result<bool, StoreError>;

    /// Apply `policy`; [`BucketPolicy::None`] removes any existing policy
    async fn set_bucket_policy(&self, bucket: &str, policy: BucketPolicy)
        -> Result<(), StoreError>;

    /// Remove the bucket and its contents. A missing bucket is not an error.
    async fn delete_bucket(&self, bucket: &str) -> Result<(), StoreError>;
}

// Common utilities shared across store implementations
pub mod common;

// Store implementations
pub mod s3;

pub use s3::S3BucketStore;
