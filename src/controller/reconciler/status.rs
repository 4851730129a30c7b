//! # Status
//!
//! Status construction and persistence, plus requeue/backoff bookkeeping.
//!
//! Every status write goes through [`Reconciler::write_status`], which
//! returns the stored object so later steps decide on fresh state.

use super::types::{Reconciler, ReconcilerError};
use crate::controller::backoff::BackoffState;
use crate::crd::{BucketObject, BucketPhase, BucketReason, BucketStatus, ObjectKey};
use crate::observability::metrics;
use crate::provider::StoreError;
use kube_runtime::controller::Action;
use std::time::Duration;
use tracing::{debug, info, warn};

fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}

impl<K: BucketObject> Reconciler<K> {
    /// Access URL for a remote bucket, if an external endpoint is configured
    pub(crate) fn access_url(&self, bucket: &str) -> Option<String> {
        let endpoint = self.external_endpoint.trim_end_matches('/');
        if endpoint.is_empty() {
            None
        } else {
            Some(format!("{endpoint}/{bucket}"))
        }
    }

    /// Status describing a bucket that exists in the store
    pub(crate) fn converged_status(
        &self,
        obj: &K,
        bucket: &str,
        phase: BucketPhase,
        reason: BucketReason,
    ) -> BucketStatus {
        BucketStatus {
            phase: Some(phase),
            reason: Some(reason),
            message: None,
            remote_name: Some(bucket.to_string()),
            url: self.access_url(bucket),
            last_heartbeat_time: Some(now_rfc3339()),
            observed_generation: obj.meta().generation,
        }
    }

    /// Existing status with only the heartbeat and observed generation refreshed
    pub(crate) fn heartbeat_status(&self, obj: &K) -> BucketStatus {
        let mut status = obj.bucket_status().cloned().unwrap_or_default();
        status.last_heartbeat_time = Some(now_rfc3339());
        status.observed_generation = obj.meta().generation;
        status
    }

    /// Persist `status` and return the stored object
    pub(crate) async fn write_status(
        &self,
        mut obj: K,
        status: BucketStatus,
    ) -> Result<K, ReconcilerError> {
        debug!(
            phase = ?status.phase,
            reason = ?status.reason,
            "Writing status"
        );
        obj.set_bucket_status(status);
        Ok(self.resources.update_status(&obj).await?)
    }

    /// Best-effort `Failed` status after a store error
    ///
    /// The original error is what the caller returns; a failure here is only
    /// logged. `clear_remote` drops the recorded bucket when it is known not
    /// to exist anymore.
    pub(crate) async fn record_failure(
        &self,
        obj: K,
        reason: BucketReason,
        error: &StoreError,
        clear_remote: bool,
    ) {
        let key = ObjectKey::from_object(&obj);
        let mut status = obj.bucket_status().cloned().unwrap_or_default();
        status.phase = Some(BucketPhase::Failed);
        status.reason = Some(reason);
        status.message = Some(error.to_string());
        status.observed_generation = obj.meta().generation;
        if clear_remote {
            status.remote_name = None;
            status.url = None;
        }

        if let Err(e) = self.write_status(obj, status).await {
            warn!(
                "Failed to record {} status for {}: {}",
                reason.as_str(),
                key,
                e
            );
        }
    }

    /// Requeue decision after a successful pass
    pub(crate) fn requeue_after_success(&self) -> Action {
        metrics::increment_requeues_total("relist");
        Action::requeue(self.relist_interval)
    }

    /// Next retry delay for a failing resource and its consecutive error count
    pub fn next_error_backoff(&self, key: &ObjectKey) -> (Duration, u32) {
        match self.backoff_states.lock() {
            Ok(mut states) => {
                let state = states.entry(key.clone()).or_insert_with(|| {
                    BackoffState::new(self.backoff_start_secs, self.backoff_max_secs)
                });
                state.increment_error();
                (state.backoff.next_backoff(), state.error_count)
            }
            Err(e) => {
                warn!("Failed to lock backoff_states: {}, using default backoff", e);
                (Duration::from_secs(self.backoff_start_secs.max(1)), 0)
            }
        }
    }

    /// Reset the backoff after success; returns whether the resource was backing off
    pub fn reset_backoff(&self, key: &ObjectKey) -> bool {
        let was_in_backoff = match self.backoff_states.lock() {
            Ok(mut states) => states
                .remove(key)
                .is_some_and(|state| state.error_count > 0),
            Err(_) => false,
        };
        if was_in_backoff {
            info!("Backoff reset for {}, returning to relist schedule", key);
        }
        was_in_backoff
    }
}
