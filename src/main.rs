//! # Bucket Controller
//!
//! A Kubernetes controller that manages buckets in an S3-compatible object store.
//!
//! ## Overview
//!
//! For every `Bucket` (namespaced) and `ClusterBucket` (cluster-scoped) resource it:
//!
//! 1. **Creates the remote bucket** - under a generated, collision-resistant name
//! 2. **Applies the access policy** - `none`, `readonly`, `writeonly` or `readwrite`
//! 3. **Detects drift** - re-checks existence and policy on every relist
//! 4. **Cleans up** - empties and deletes the bucket before releasing its finalizer
//!
//! Metrics and health probes are served on `METRICS_PORT` (default 5000).

use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    bucket_controller::runtime::run().await
}
