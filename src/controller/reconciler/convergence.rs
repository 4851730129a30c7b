//! # Convergence
//!
//! Create/update path for resources that are not being deleted.
//!
//! Order of persisted steps: finalizer, remote name (`Pending`), policy
//! (`Ready`). A restart between any two steps resumes from the next one.

use super::types::{Reconciler, ReconcilerError};
use crate::crd::{BucketObject, BucketPhase, BucketReason, ObjectKey};
use crate::observability::metrics;
use kube_runtime::controller::Action;
use tracing::{debug, info, warn};

impl<K: BucketObject> Reconciler<K> {
    pub(crate) async fn converge(&self, mut obj: K) -> Result<Action, ReconcilerError> {
        if self.finalizer.add(&mut obj) {
            obj = self.resources.update(&obj).await?;
            info!("Added finalizer {}", self.finalizer.name());
        }

        let remote = obj
            .bucket_status()
            .and_then(|status| status.remote_name())
            .map(str::to_string);

        match remote {
            None => {
                self.create_bucket(obj, false).await?;
            }
            Some(bucket) => {
                self.verify_bucket(obj, &bucket).await?;
            }
        }

        Ok(self.requeue_after_success())
    }

    /// Create the remote bucket, record it, then apply the policy
    ///
    /// `replacing` is set when a recorded bucket vanished from the store; a
    /// failed re-creation then clears the stale remote name.
    async fn create_bucket(&self, obj: K, replacing: bool) -> Result<K, ReconcilerError> {
        let key = ObjectKey::from_object(&obj);

        let bucket = match self
            .store
            .create_bucket(key.namespace_or_empty(), &key.name, obj.region())
            .await
        {
            Ok(bucket) => bucket,
            Err(e) => {
                warn!("Failed to create bucket for {}: {}", key, e);
                self.record_failure(obj, BucketReason::BucketCreationFailure, &e, replacing)
                    .await;
                return Err(e.into());
            }
        };

        info!("Created remote bucket {} for {}", bucket, key);
        metrics::increment_buckets_created();

        let status =
            self.converged_status(&obj, &bucket, BucketPhase::Pending, BucketReason::BucketCreated);
        let obj = self.write_status(obj, status).await?;

        self.apply_policy(obj, &bucket).await
    }

    async fn apply_policy(&self, obj: K, bucket: &str) -> Result<K, ReconcilerError> {
        let policy = obj.policy();

        if let Err(e) = self.store.set_bucket_policy(bucket, policy).await {
            warn!("Failed to set policy '{}' on bucket {}: {}", policy, bucket, e);
            self.record_failure(obj, BucketReason::BucketPolicyUpdateFailed, &e, false)
                .await;
            return Err(e.into());
        }

        info!("Bucket {} policy set to '{}'", bucket, policy);
        let status = self.converged_status(
            &obj,
            bucket,
            BucketPhase::Ready,
            BucketReason::BucketPolicyUpdated,
        );
        self.write_status(obj, status).await
    }

    /// Drift check for a bucket the status already records
    async fn verify_bucket(&self, obj: K, bucket: &str) -> Result<K, ReconcilerError> {
        let exists = match self.store.bucket_exists(bucket).await {
            Ok(exists) => exists,
            Err(e) => {
                self.record_failure(obj, BucketReason::BucketVerificationFailure, &e, false)
                    .await;
                return Err(e.into());
            }
        };

        if !exists {
            warn!("Remote bucket {} no longer exists, re-creating", bucket);
            return self.create_bucket(obj, true).await;
        }

        let policy = obj.policy();
        let matches = match self.store.compare_bucket_policy(bucket, policy).await {
            Ok(matches) => matches,
            Err(e) => {
                self.record_failure(obj, BucketReason::BucketPolicyVerificationFailed, &e, false)
                    .await;
                return Err(e.into());
            }
        };

        if !matches {
            info!("Policy of bucket {} drifted from '{}', updating", bucket, policy);
            return self.apply_policy(obj, bucket).await;
        }

        let was_ready = obj
            .bucket_status()
            .is_some_and(|status| status.phase == Some(BucketPhase::Ready));

        let status = if was_ready {
            debug!("Bucket {} is in sync", bucket);
            self.heartbeat_status(&obj)
        } else {
            // In sync again after an earlier failure
            self.converged_status(
                &obj,
                bucket,
                BucketPhase::Ready,
                BucketReason::BucketPolicyUpdated,
            )
        };
        self.write_status(obj, status).await
    }
}
