//! # Reconciler
//!
//! Drives a remote bucket toward the state declared by a `Bucket` or
//! `ClusterBucket` resource.
//!
//! ## Module Structure
//!
//! - `types.rs` - `Reconciler` and `ReconcilerError`
//! - `convergence.rs` - create / drift-check / policy update
//! - `deletion.rs` - remote cleanup and finalizer release
//! - `status.rs` - status writes, requeue and backoff bookkeeping
//!
//! ## Dispatch
//!
//! 1. Fetch the resource by key; gone ⇒ nothing to do, no requeue
//! 2. [`Lifecycle::Active`] ⇒ convergence path
//! 3. [`Lifecycle::CleanupPending`] ⇒ deletion path
//! 4. [`Lifecycle::Released`] ⇒ nothing left for this controller
//!
//! Success requeues after the relist interval. Errors are returned to the
//! runtime, whose error policy applies a per-resource exponential backoff.

mod convergence;
mod deletion;
mod status;
mod types;

#[cfg(test)]
mod tests;

pub use types::{Reconciler, ReconcilerError};

use crate::controller::finalizer::Lifecycle;
use crate::crd::{BucketObject, ObjectKey};
use crate::observability::metrics;
use kube_runtime::controller::Action;
use std::time::Instant;
use tracing::{debug, info_span, Instrument};

impl<K: BucketObject> Reconciler<K> {
    /// Reconcile the resource identified by `key`
    pub async fn reconcile(&self, key: &ObjectKey) -> Result<Action, ReconcilerError> {
        let kind = Self::kind();
        let span = info_span!(
            "controller.reconcile",
            resource.kind = kind.as_str(),
            resource.name = key.name.as_str(),
            resource.namespace = key.namespace_or_empty()
        );
        let start = Instant::now();

        let result = async {
            let Some(obj) = self.resources.get(key).await? else {
                debug!("Resource {} not found, nothing to reconcile", key);
                return Ok(Action::await_change());
            };

            match Lifecycle::of(&obj, &self.finalizer) {
                Lifecycle::Active => self.converge(obj).await,
                Lifecycle::CleanupPending => self.cleanup(obj).await,
                Lifecycle::Released => {
                    debug!("Resource {} is being deleted and already released", key);
                    Ok(Action::await_change())
                }
            }
        }
        .instrument(span)
        .await;

        metrics::increment_reconciliations(&kind);
        metrics::observe_reconciliation_duration(&kind, start.elapsed().as_secs_f64());

        if result.is_ok() {
            self.reset_backoff(key);
        }
        result
    }
}
