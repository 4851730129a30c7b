//! # List Command
//!
//! Command to list `Bucket` and `ClusterBucket` resources.

use super::ResourceType;
use anyhow::{Context, Result};
use bucket_controller::crd::{Bucket, BucketObject, ClusterBucket};
use kube::{api::Api, api::ListParams, Client, ResourceExt};

/// List resources of the requested type, or of both types
pub async fn list_command(
    client: Client,
    resource_type: Option<ResourceType>,
    namespace: Option<String>,
) -> Result<()> {
    println!(
        "{:<30} {:<20} {:<8} {:<30} {:<40} URL",
        "NAME", "NAMESPACE", "PHASE", "REASON", "REMOTE BUCKET"
    );
    println!("{}", "-".repeat(140));

    if !matches!(resource_type, Some(ResourceType::ClusterBucket)) {
        let api: Api<Bucket> = match &namespace {
            Some(ns) => Api::namespaced(client.clone(), ns),
            None => Api::all(client.clone()),
        };
        print_rows(&api).await?;
    }

    if !matches!(resource_type, Some(ResourceType::Bucket)) {
        print_rows(&Api::<ClusterBucket>::all(client)).await?;
    }

    Ok(())
}

async fn print_rows<K: BucketObject>(api: &Api<K>) -> Result<()> {
    let kind = K::kind(&());
    let items = api
        .list(&ListParams::default())
        .await
        .with_context(|| format!("Failed to list {kind} resources"))?;

    for item in items {
        let name = item.name_any();
        let ns = item.namespace().unwrap_or_else(|| "-".to_string());
        let status = item.bucket_status();
        let phase = status
            .and_then(|s| s.phase.as_ref())
            .map_or("-", |p| p.as_str());
        let reason = status
            .and_then(|s| s.reason.as_ref())
            .map_or("-", |r| r.as_str());
        let remote = status.and_then(|s| s.remote_name()).unwrap_or("-");
        let url = status.and_then(|s| s.url.as_deref()).unwrap_or("-");

        println!("{name:<30} {ns:<20} {phase:<8} {reason:<30} {remote:<40} {url}");
    }

    Ok(())
}
