//! # CRD Generator
//!
//! Generates Kubernetes CustomResourceDefinition (CRD) YAML from Rust type definitions.
//!
//! ## Usage
//!
//! ```bash
//! # Generate CRD YAML
//! cargo run --bin crdgen > config/crd/buckets.yaml
//!
//! # Generate and apply directly
//! cargo run --bin crdgen | kubectl apply -f -
//! ```
//!
//! Both `Bucket` and `ClusterBucket` are emitted as one multi-document stream.

use anyhow::{Context, Result};
use bucket_controller::crd::{Bucket, ClusterBucket};
use kube::core::CustomResourceExt;

fn main() -> Result<()> {
    let bucket = serde_yaml::to_string(&Bucket::crd()).context("Failed to serialize Bucket CRD")?;
    let cluster_bucket = serde_yaml::to_string(&ClusterBucket::crd())
        .context("Failed to serialize ClusterBucket CRD")?;

    print!("{bucket}---\n{cluster_bucket}");
    Ok(())
}
