//! # Runtime
//!
//! Process wiring for the controller binary.
//!
//! - `initialization` - configuration, logging, metrics server, clients and reconcilers
//! - `watch_loop` - per-kind watch loop and shutdown signal handling
//! - `error_policy` - reconcile error backoff and watch stream error classification

pub mod error_policy;
pub mod initialization;
pub mod watch_loop;

use crate::crd::{Bucket, ClusterBucket};
use anyhow::Result;
use kube::api::Api;
use tracing::info;

/// Run the controller until a shutdown signal is received
///
/// Both kinds are watched concurrently and share one bucket store client.
pub async fn run() -> Result<()> {
    let init = initialization::initialize().await?;

    tokio::spawn(watch_loop::wait_for_shutdown(init.server_state.clone()));

    let buckets = watch_loop::run_watch_loop(
        Api::<Bucket>::all(init.client.clone()),
        init.bucket_reconciler.clone(),
        init.server_state.clone(),
        init.controller_config.clone(),
    );
    let cluster_buckets = watch_loop::run_watch_loop(
        Api::<ClusterBucket>::all(init.client.clone()),
        init.cluster_bucket_reconciler.clone(),
        init.server_state.clone(),
        init.controller_config.clone(),
    );

    tokio::try_join!(buckets, cluster_buckets)?;

    info!("Bucket controller stopped");
    Ok(())
}
