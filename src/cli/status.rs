//! # Status Command
//!
//! Command to show detailed status of a `Bucket` or `ClusterBucket`.

use super::ResourceType;
use anyhow::{Context, Result};
use bucket_controller::crd::{Bucket, BucketObject, ClusterBucket};
use kube::{api::Api, Client, ResourceExt};

/// Show detailed status of a resource
pub async fn status_command(
    client: Client,
    resource_type: ResourceType,
    name: String,
    namespace: Option<String>,
) -> Result<()> {
    match resource_type {
        ResourceType::Bucket => {
            let ns = namespace.as_deref().unwrap_or("default");
            print_status(&Api::<Bucket>::namespaced(client, ns), &name).await
        }
        ResourceType::ClusterBucket => {
            print_status(&Api::<ClusterBucket>::all(client), &name).await
        }
    }
}

async fn print_status<K: BucketObject>(api: &Api<K>, name: &str) -> Result<()> {
    let kind = K::kind(&());
    let obj = api
        .get(name)
        .await
        .with_context(|| format!("Failed to get {kind} '{name}'"))?;

    println!("Status for {kind} '{}'", obj.name_any());
    println!();
    println!("Resource Information:");
    if let Some(ns) = obj.namespace() {
        println!("  Namespace: {ns}");
    }
    if let Some(generation) = obj.meta().generation {
        println!("  Generation: {generation}");
    }
    println!("  Finalizers: {}", obj.finalizers().join(", "));
    if obj.meta().deletion_timestamp.is_some() {
        println!("  Deleting: true");
    }

    println!();
    println!("Spec:");
    println!("  Policy: {}", obj.policy().as_str());
    println!(
        "  Region: {}",
        obj.region().map_or("(store default)", |r| r.as_str())
    );

    let Some(status) = obj.bucket_status() else {
        println!();
        println!("Status: No status available (resource may not have been reconciled yet)");
        return Ok(());
    };

    println!();
    println!("Status:");
    if let Some(phase) = &status.phase {
        println!("  Phase: {}", phase.as_str());
    }
    if let Some(reason) = &status.reason {
        println!("  Reason: {}", reason.as_str());
    }
    if let Some(message) = &status.message {
        println!("  Message: {message}");
    }
    if let Some(remote) = status.remote_name() {
        println!("  Remote Bucket: {remote}");
    }
    if let Some(url) = &status.url {
        println!("  URL: {url}");
    }
    if let Some(observed_generation) = status.observed_generation {
        println!("  Observed Generation: {observed_generation}");
    }
    if let Some(heartbeat) = &status.last_heartbeat_time {
        println!("  Last Heartbeat: {heartbeat}");
    }

    Ok(())
}
