//! # Deletion
//!
//! Cleanup path for resources whose deletion is pending on our finalizer.

use super::types::{Reconciler, ReconcilerError};
use crate::controller::resource::ResourceError;
use crate::crd::{BucketObject, BucketReason, ObjectKey};
use crate::observability::metrics;
use kube_runtime::controller::Action;
use tracing::{debug, info, warn};

impl<K: BucketObject> Reconciler<K> {
    pub(crate) async fn cleanup(&self, mut obj: K) -> Result<Action, ReconcilerError> {
        let key = ObjectKey::from_object(&obj);
        let remote = obj
            .bucket_status()
            .and_then(|status| status.remote_name())
            .map(str::to_string);

        match remote {
            Some(bucket) => {
                if let Err(e) = self.store.delete_bucket(&bucket).await {
                    warn!("Failed to delete bucket {} for {}: {}", bucket, key, e);
                    self.record_failure(obj, BucketReason::BucketDeletionFailure, &e, false)
                        .await;
                    return Err(e.into());
                }
                info!("Deleted remote bucket {} for {}", bucket, key);
                metrics::increment_buckets_deleted();
            }
            None => {
                debug!("No remote bucket recorded for {}, skipping remote delete", key);
            }
        }

        self.finalizer.remove(&mut obj);
        match self.resources.update(&obj).await {
            Ok(_) | Err(ResourceError::NotFound(_)) => {
                info!("Removed finalizer {} from {}", self.finalizer.name(), key);
            }
            Err(e) => return Err(e.into()),
        }

        Ok(self.requeue_after_success())
    }
}
