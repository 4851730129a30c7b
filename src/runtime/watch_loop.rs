//! # Watch Loop
//!
//! Controller watch loop that monitors `Bucket` / `ClusterBucket` resources and
//! triggers reconciliation when changes are detected.

use crate::config::ControllerConfig;
use crate::constants::RECONCILE_ANNOTATION;
use crate::controller::reconciler::{Reconciler, ReconcilerError};
use crate::crd::{BucketObject, BucketPhase, ObjectKey};
use crate::runtime::error_policy::{handle_reconciliation_error, handle_watch_stream_error};
use crate::server::ServerState;
use futures::StreamExt;
use kube::api::{Api, Patch, PatchParams};
use kube::{Client, ResourceExt};
use kube_runtime::{controller, controller::Action, watcher, Controller};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn, Instrument};

/// Tolerance applied when deciding whether the relist interval has elapsed
const RELIST_TOLERANCE_SECS: i64 = 2;

/// Run the controller watch loop for one resource kind
///
/// Restarts the watch when the stream ends and exits once shutdown has been
/// requested (readiness flipped off).
pub async fn run_watch_loop<K: BucketObject>(
    api: Api<K>,
    reconciler: Arc<Reconciler<K>>,
    server_state: Arc<ServerState>,
    config: ControllerConfig,
) -> Result<(), anyhow::Error> {
    let kind = Reconciler::<K>::kind();
    let client = api.clone().into_client();
    let backoff_duration_ms = Arc::new(AtomicU64::new(config.watch_backoff_start_ms));

    loop {
        if !server_state.is_ready() {
            info!("Shutdown requested, exiting {} watch loop", kind);
            break;
        }

        let watch_span = tracing::span!(
            tracing::Level::INFO,
            "controller.watch",
            operation = "watch_loop",
            resource.kind = kind.as_str()
        );
        info!(
            "Starting {} watch loop (concurrency: {})...",
            kind, config.max_concurrent_reconciles
        );

        let relist_interval = config.relist_interval;
        let backoff_start_ms = config.watch_backoff_start_ms;
        let backoff_max_ms = config.watch_backoff_max_ms;
        let restart_delay = config.watch_restart_delay_duration();
        let backoff = backoff_duration_ms.clone();
        let reconcile_client = client.clone();
        let filter_kind = kind.clone();

        Controller::new(api.clone(), watcher::Config::default().any_semantic())
            .with_config(
                controller::Config::default().concurrency(config.max_concurrent_reconciles),
            )
            .shutdown_on_signal()
            .run(
                move |obj, ctx| {
                    reconcile_object(obj, ctx, reconcile_client.clone(), relist_interval)
                },
                |obj, error, ctx| handle_reconciliation_error(obj, error, ctx),
                reconciler.clone(),
            )
            .filter_map(move |x| {
                let backoff = backoff.clone();
                let kind = filter_kind.clone();
                async move {
                    match &x {
                        Ok(_) => {
                            backoff.store(backoff_start_ms, Ordering::Relaxed);
                            debug!("watch.event.success");
                            Some(x)
                        }
                        Err(e) => {
                            let error_string = format!("{e:?}");
                            handle_watch_stream_error(
                                &kind,
                                &error_string,
                                &backoff,
                                backoff_max_ms,
                                restart_delay,
                            )
                            .await
                            .map(|()| x)
                        }
                    }
                }
            })
            .for_each(|_| futures::future::ready(()))
            .instrument(watch_span)
            .await;

        if !server_state.is_ready() {
            info!("Shutdown requested, exiting {} watch loop", kind);
            break;
        }

        let delay = config.watch_restart_delay_after_end_duration();
        warn!(
            "{} watch stream ended, restarting in {} seconds...",
            kind,
            delay.as_secs()
        );
        tokio::time::sleep(delay).await;
    }

    info!("{} controller stopped gracefully", kind);
    Ok(())
}

/// Wait for SIGINT or SIGTERM and mark the server not ready
pub async fn wait_for_shutdown(server_state: Arc<ServerState>) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for SIGINT: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Received shutdown signal, initiating graceful shutdown...");
    server_state.set_ready(false);
    info!("Marked server as not ready, waiting for in-flight reconciliations to complete...");
}

/// Whether `obj` carries the manual reconcile annotation
pub fn has_manual_trigger<K: BucketObject>(obj: &K) -> bool {
    obj.annotations().contains_key(RECONCILE_ANNOTATION)
}

/// Time left before a converged resource is due for its periodic re-check
///
/// Returns `None` when the watch event must be reconciled now: a spec change,
/// a pending deletion, a manual trigger, a resource not yet `Ready`, or an
/// elapsed relist interval. Status-only events of a converged resource
/// return the remaining interval so they do not loop on our own writes.
pub fn time_until_relist<K: BucketObject>(obj: &K, relist_interval: Duration) -> Option<Duration> {
    if obj.meta().deletion_timestamp.is_some() || has_manual_trigger(obj) {
        return None;
    }

    let status = obj.bucket_status()?;
    if status.phase != Some(BucketPhase::Ready) {
        return None;
    }

    let generation = obj.meta().generation?;
    if status.observed_generation != Some(generation) {
        return None;
    }

    let heartbeat = status.last_heartbeat_time.as_deref()?;
    let heartbeat = chrono::DateTime::parse_from_rfc3339(heartbeat)
        .ok()?
        .with_timezone(&chrono::Utc);
    let interval = chrono::Duration::from_std(relist_interval).ok()?;
    let due = heartbeat + interval - chrono::Duration::seconds(RELIST_TOLERANCE_SECS);
    let remaining = (due - chrono::Utc::now()).to_std().ok()?;

    if remaining.is_zero() {
        None
    } else {
        Some(remaining)
    }
}

async fn reconcile_object<K: BucketObject>(
    obj: Arc<K>,
    ctx: Arc<Reconciler<K>>,
    client: Client,
    relist_interval: Duration,
) -> Result<Action, ReconcilerError> {
    if obj.meta().name.is_none() {
        return Err(ReconcilerError::MissingName);
    }
    let key = ObjectKey::from_object(obj.as_ref());

    let reconcile_span = tracing::span!(
        tracing::Level::INFO,
        "controller.watch.reconcile",
        resource.name = key.name.as_str(),
        resource.namespace = key.namespace_or_empty(),
        resource.generation = obj.meta().generation.unwrap_or(0),
        event.r#type = "watch_triggered"
    );

    async move {
        if let Some(remaining) = time_until_relist(obj.as_ref(), relist_interval) {
            debug!(
                "Skipping {} - only status changed, next re-check in {}s",
                key,
                remaining.as_secs()
            );
            return Ok(Action::requeue(remaining));
        }

        let manual = has_manual_trigger(obj.as_ref());
        if manual {
            info!("Manual reconciliation requested for {} via {}", key, RECONCILE_ANNOTATION);
        }

        let action = ctx.reconcile(&key).await?;

        if manual {
            clear_manual_trigger::<K>(client, &key).await;
        }

        Ok(action)
    }
    .instrument(reconcile_span)
    .await
}

/// Drop the manual trigger annotation after it has been honoured
async fn clear_manual_trigger<K: BucketObject>(client: Client, key: &ObjectKey) {
    let api = K::api(client, key.namespace.as_deref());
    let patch = serde_json::json!({
        "metadata": {
            "annotations": {
                RECONCILE_ANNOTATION: null
            }
        }
    });

    match api
        .patch(&key.name, &PatchParams::default(), &Patch::Merge(&patch))
        .await
    {
        Ok(_) => debug!("Cleared manual reconcile annotation on {}", key),
        Err(kube::Error::Api(e)) if e.code == 404 => {
            debug!("{} is gone, no annotation to clear", key);
        }
        Err(e) => warn!("Failed to clear manual reconcile annotation on {}: {}", key, e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::{Bucket, BucketPolicy, BucketReason, BucketSpec, BucketStatus};
    use std::collections::BTreeMap;

    const RELIST: Duration = Duration::from_secs(3600);

    fn ready_bucket(heartbeat: chrono::DateTime<chrono::Utc>) -> Bucket {
        let mut bucket = Bucket::new(
            "assets",
            BucketSpec {
                region: None,
                policy: BucketPolicy::None,
            },
        );
        bucket.metadata.namespace = Some("default".to_string());
        bucket.metadata.generation = Some(2);
        bucket.status = Some(BucketStatus {
            phase: Some(BucketPhase::Ready),
            reason: Some(BucketReason::BucketPolicyUpdated),
            message: None,
            remote_name: Some("default-assets-1a2b3c4d".to_string()),
            url: None,
            last_heartbeat_time: Some(heartbeat.to_rfc3339()),
            observed_generation: Some(2),
        });
        bucket
    }

    #[test]
    fn test_status_only_event_is_deferred_until_relist() {
        let bucket = ready_bucket(chrono::Utc::now());
        let remaining = time_until_relist(&bucket, RELIST).expect("should be deferred");
        assert!(remaining <= RELIST);
        assert!(remaining > RELIST - Duration::from_secs(60));
    }

    #[test]
    fn test_elapsed_relist_interval_reconciles() {
        let bucket = ready_bucket(chrono::Utc::now() - chrono::Duration::hours(2));
        assert!(time_until_relist(&bucket, RELIST).is_none());
    }

    #[test]
    fn test_spec_change_reconciles() {
        let mut bucket = ready_bucket(chrono::Utc::now());
        bucket.metadata.generation = Some(3);
        assert!(time_until_relist(&bucket, RELIST).is_none());
    }

    #[test]
    fn test_not_ready_reconciles() {
        let mut bucket = ready_bucket(chrono::Utc::now());
        if let Some(status) = bucket.status.as_mut() {
            status.phase = Some(BucketPhase::Failed);
        }
        assert!(time_until_relist(&bucket, RELIST).is_none());

        bucket.status = None;
        assert!(time_until_relist(&bucket, RELIST).is_none());
    }

    #[test]
    fn test_manual_trigger_reconciles() {
        let mut bucket = ready_bucket(chrono::Utc::now());
        bucket.metadata.annotations = Some(BTreeMap::from([(
            RECONCILE_ANNOTATION.to_string(),
            "2026-01-01T00:00:00Z".to_string(),
        )]));
        assert!(has_manual_trigger(&bucket));
        assert!(time_until_relist(&bucket, RELIST).is_none());
    }

    #[test]
    fn test_pending_deletion_reconciles() {
        let mut bucket = ready_bucket(chrono::Utc::now());
        bucket.metadata.deletion_timestamp =
            Some(serde_json::from_value(serde_json::json!("2026-01-01T00:00:00Z")).unwrap());
        assert!(time_until_relist(&bucket, RELIST).is_none());
    }
}
