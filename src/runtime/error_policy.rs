//! # Error Policy
//!
//! Error handling and backoff logic for the controller watch loop.
//! This module handles reconciliation errors and watch stream errors.

use crate::controller::reconciler::{Reconciler, ReconcilerError};
use crate::crd::{BucketObject, ObjectKey};
use crate::observability;
use kube_runtime::controller::Action;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Handle reconciliation errors with exponential backoff
///
/// Backoff state is tracked per resource so one failing bucket never delays
/// the retries of another. A successful reconcile resets it.
pub fn handle_reconciliation_error<K: BucketObject>(
    obj: Arc<K>,
    error: &ReconcilerError,
    ctx: Arc<Reconciler<K>>,
) -> Action {
    let key = ObjectKey::from_object(obj.as_ref());
    let kind = Reconciler::<K>::kind();

    let error_span = tracing::span!(
        tracing::Level::ERROR,
        "controller.watch.reconciliation_error",
        resource.kind = kind.as_str(),
        resource.name = key.name.as_str(),
        resource.namespace = key.namespace_or_empty(),
        error = %error
    );
    let _error_guard = error_span.enter();

    error!("Reconciliation error for {} {}: {}", kind, key, error);
    observability::metrics::increment_reconciliation_errors(&kind);

    let (delay, error_count) = ctx.next_error_backoff(&key);
    let next_trigger_time = chrono::Utc::now()
        + chrono::Duration::from_std(delay).unwrap_or_else(|_| chrono::Duration::seconds(60));

    info!(
        "Retrying {} in {}s (error count: {}, next attempt at {})",
        key,
        delay.as_secs(),
        error_count,
        next_trigger_time.to_rfc3339()
    );

    observability::metrics::increment_requeues_total("error-backoff");
    Action::requeue(delay)
}

/// Classification of a watch stream error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchErrorKind {
    Unauthorized,
    Expired,
    TooManyRequests,
    NotFound,
    Other,
}

impl WatchErrorKind {
    /// Classify an error by its rendered form
    ///
    /// 404 is checked before 401: a plain-text 404 body surfaces as a serde
    /// error whose chain also mentions `WatchFailed`.
    pub fn classify(error_string: &str) -> Self {
        let is_not_found = error_string.contains("ObjectNotFound")
            || error_string.contains("404")
            || error_string.contains("not found");
        let is_401 = error_string.contains("401") || error_string.contains("Unauthorized");
        let is_410 = error_string.contains("410")
            || error_string.contains("too old resource version")
            || error_string.contains("Expired")
            || error_string.contains("Gone");
        let is_429 = error_string.contains("429")
            || error_string.contains("storage is (re)initializing")
            || error_string.contains("TooManyRequests");

        if is_401 && !is_not_found {
            WatchErrorKind::Unauthorized
        } else if is_410 {
            WatchErrorKind::Expired
        } else if is_429 {
            WatchErrorKind::TooManyRequests
        } else if is_not_found {
            WatchErrorKind::NotFound
        } else {
            WatchErrorKind::Other
        }
    }
}

/// Handle watch stream errors with appropriate classification and backoff
///
/// Returns `None` to filter out the error (allow restart) or `Some(())` to continue.
pub async fn handle_watch_stream_error(
    kind: &str,
    error_string: &str,
    backoff: &Arc<AtomicU64>,
    max_backoff_ms: u64,
    watch_restart_delay: Duration,
) -> Option<()> {
    let error_span = tracing::span!(
        tracing::Level::WARN,
        "controller.watch.error",
        resource.kind = kind,
        error = %error_string
    );
    let _error_guard = error_span.enter();

    match WatchErrorKind::classify(error_string) {
        WatchErrorKind::Unauthorized => {
            error!(
                "Watch on {} failed with 401 Unauthorized - RBAC may have been revoked or token expired",
                kind
            );
            error!("Check that the controller ServiceAccount can still list and watch {}:", kind);
            error!(
                "   kubectl auth can-i watch {}s.objectstore.octopilot.io --as=system:serviceaccount:<namespace>:bucket-controller",
                kind.to_ascii_lowercase()
            );
            warn!(
                "Waiting {}s before retrying watch (RBAC may need time to propagate)...",
                watch_restart_delay.as_secs()
            );
            tokio::time::sleep(watch_restart_delay).await;
            None
        }
        WatchErrorKind::Expired => {
            warn!(
                "Watch resource version for {} expired (410), watch will restart",
                kind
            );
            None
        }
        WatchErrorKind::TooManyRequests => {
            let current_backoff = backoff.load(Ordering::Relaxed);
            warn!(
                "API server storage reinitializing (429), backing off for {}ms before restart...",
                current_backoff
            );
            tokio::time::sleep(Duration::from_millis(current_backoff)).await;
            let new_backoff = current_backoff.saturating_mul(2).min(max_backoff_ms);
            backoff.store(new_backoff, Ordering::Relaxed);
            None
        }
        WatchErrorKind::NotFound => {
            warn!(
                "{} not found (404) - normal for a deleted resource, otherwise check the CRD is installed. Error: {}",
                kind, error_string
            );
            Some(())
        }
        WatchErrorKind::Other => {
            error!("Controller stream error for {}: {}", kind, error_string);
            tokio::time::sleep(watch_restart_delay).await;
            None
        }
    }
}
