//! # Reconcile Command
//!
//! Command to trigger reconciliation for a `Bucket` or `ClusterBucket`.

use super::ResourceType;
use anyhow::{Context, Result};
use bucket_controller::constants::RECONCILE_ANNOTATION;
use bucket_controller::crd::{Bucket, BucketObject, ClusterBucket};
use kube::{api::Api, api::Patch, api::PatchParams, Client};
use serde_json::json;

/// Trigger reconciliation by stamping the reconcile annotation
///
/// The controller reconciles immediately on seeing the annotation and
/// removes it afterwards.
pub async fn reconcile_command(
    client: Client,
    resource_type: ResourceType,
    name: String,
    namespace: Option<String>,
) -> Result<()> {
    match resource_type {
        ResourceType::Bucket => {
            let ns = namespace.as_deref().unwrap_or("default");
            trigger(&Api::<Bucket>::namespaced(client, ns), &name).await
        }
        ResourceType::ClusterBucket => trigger(&Api::<ClusterBucket>::all(client), &name).await,
    }
}

async fn trigger<K: BucketObject>(api: &Api<K>, name: &str) -> Result<()> {
    let kind = K::kind(&());
    println!("Triggering reconciliation for {kind} '{name}'...");

    let timestamp = chrono::Utc::now().to_rfc3339();
    let patch = json!({
        "metadata": {
            "annotations": {
                RECONCILE_ANNOTATION: timestamp
            }
        }
    });

    api.patch(name, &PatchParams::default(), &Patch::Merge(&patch))
        .await
        .with_context(|| format!("Failed to trigger reconciliation for {kind} '{name}'"))?;

    println!("Reconciliation triggered successfully");
    println!("   Annotation: {RECONCILE_ANNOTATION}={timestamp}");
    println!("\nThe controller will reconcile this resource shortly.");

    Ok(())
}
