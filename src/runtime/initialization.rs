//! # Initialization
//!
//! Controller initialization logic including rustls setup, logging, metrics,
//! server startup, bucket store and Kubernetes client setup.

use crate::config::{ControllerConfig, ServerConfig, StoreConfig};
use crate::controller::reconciler::Reconciler;
use crate::controller::resource::KubeResourceStore;
use crate::crd::{Bucket, BucketObject, ClusterBucket};
use crate::observability;
use crate::provider::{BucketStore, S3BucketStore};
use crate::server::{start_server, ServerState};
use anyhow::{Context, Result};
use kube::{api::Api, api::ListParams, Client, ResourceExt};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Initialization result containing all necessary components for the controller
pub struct InitializationResult {
    /// Kubernetes client
    pub client: Client,
    /// Reconciler for namespaced `Bucket` resources
    pub bucket_reconciler: Arc<Reconciler<Bucket>>,
    /// Reconciler for `ClusterBucket` resources
    pub cluster_bucket_reconciler: Arc<Reconciler<ClusterBucket>>,
    /// Server state for health checks
    pub server_state: Arc<ServerState>,
    pub controller_config: ControllerConfig,
}

impl std::fmt::Debug for InitializationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InitializationResult")
            .field("server_ready", &self.server_state.is_ready())
            .field("controller_config", &self.controller_config)
            .finish_non_exhaustive()
    }
}

/// Initialize the controller runtime
///
/// This function handles:
/// - rustls crypto provider setup
/// - Configuration loading and logging setup
/// - Metrics registration
/// - HTTP server startup
/// - Kubernetes client and bucket store creation
/// - Reconciler setup for both resource kinds
pub async fn initialize() -> Result<InitializationResult> {
    // Must run before any TLS connection is opened
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        return Err(anyhow::anyhow!("Failed to install rustls crypto provider"));
    }

    let controller_config =
        ControllerConfig::from_env().context("Failed to load controller configuration")?;
    let server_config = ServerConfig::from_env();
    let store_config = StoreConfig::from_env();

    observability::init_logging(&controller_config.log_level, &controller_config.log_format)
        .context("Failed to initialize logging")?;

    info!("Starting Bucket Controller");
    info!(
        "Build info: timestamp={}, datetime={}, git_hash={}",
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_DATETIME"),
        env!("BUILD_GIT_HASH")
    );
    info!("Controller configuration: {:?}", controller_config);
    info!("Bucket store configuration: {:?}", store_config);

    observability::metrics::register_metrics()?;

    let server_state = Arc::new(ServerState::default());

    let server_state_clone = server_state.clone();
    let server_port = server_config.metrics_port;
    let server_handle = tokio::spawn(async move {
        if let Err(e) = start_server(server_port, server_state_clone).await {
            error!("HTTP server error: {}", e);
        }
    });

    wait_for_server_ready(&server_state, &server_handle, &server_config).await?;

    let client = Client::try_default()
        .await
        .context("Failed to create Kubernetes client")?;

    // One store client shared by both kinds
    let store: Arc<dyn BucketStore> = Arc::new(
        S3BucketStore::new(&store_config)
            .await
            .context("Failed to create bucket store client")?,
    );

    let bucket_reconciler = Arc::new(Reconciler::<Bucket>::new(
        Arc::new(KubeResourceStore::new(client.clone())),
        store.clone(),
        &controller_config,
    ));
    let cluster_bucket_reconciler = Arc::new(Reconciler::<ClusterBucket>::new(
        Arc::new(KubeResourceStore::new(client.clone())),
        store,
        &controller_config,
    ));

    summarize_existing_resources::<Bucket>(&Api::all(client.clone())).await;
    summarize_existing_resources::<ClusterBucket>(&Api::all(client.clone())).await;

    info!("Controller initialized, starting watch loops...");

    Ok(InitializationResult {
        client,
        bucket_reconciler,
        cluster_bucket_reconciler,
        server_state,
        controller_config,
    })
}

/// Wait for the HTTP server to become ready
async fn wait_for_server_ready(
    server_state: &Arc<ServerState>,
    server_handle: &tokio::task::JoinHandle<()>,
    server_config: &ServerConfig,
) -> Result<()> {
    let startup_timeout = server_config.startup_timeout();
    let poll_interval = server_config.poll_interval();
    let start_time = std::time::Instant::now();

    loop {
        if server_handle.is_finished() {
            return Err(anyhow::anyhow!("HTTP server failed to start"));
        }

        if server_state.is_ready() {
            info!("HTTP server is ready and accepting connections");
            break;
        }

        if start_time.elapsed() > startup_timeout {
            return Err(anyhow::anyhow!(
                "HTTP server failed to become ready within {} seconds",
                startup_timeout.as_secs()
            ));
        }

        tokio::time::sleep(poll_interval).await;
    }

    Ok(())
}

/// Log a startup summary of the resources a kind already has
///
/// The initial watch list reconciles them; this only checks that the CRD is
/// installed and queryable so a missing CRD is visible before the watch starts.
async fn summarize_existing_resources<K: BucketObject>(api: &Api<K>) {
    let kind = Reconciler::<K>::kind();
    let startup_span = tracing::span!(
        tracing::Level::INFO,
        "controller.startup.existing_resources",
        resource.kind = kind.as_str()
    );
    let _guard = startup_span.enter();

    match api.list(&ListParams::default()).await {
        Ok(list) => {
            info!(
                "CRD is queryable, found {} existing {} resources",
                list.items.len(),
                kind
            );

            let mut by_namespace: BTreeMap<String, Vec<String>> = BTreeMap::new();
            for item in &list.items {
                by_namespace
                    .entry(item.namespace().unwrap_or_else(|| "<cluster>".to_string()))
                    .or_default()
                    .push(item.name_any());
            }

            for (namespace, mut names) in by_namespace {
                names.sort();
                let shown = if names.len() <= 3 {
                    names.join(", ")
                } else {
                    format!("{}, ... ({} total)", names[..3].join(", "), names.len())
                };
                info!("  {}: {}", namespace, shown);
            }
        }
        Err(e) => {
            warn!(
                "Failed to list {} resources, is the CRD installed? Error: {}",
                kind, e
            );
            warn!("The watch will keep retrying until the CRD becomes available");
        }
    }
}
