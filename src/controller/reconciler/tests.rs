use super::*;
use crate::config::ControllerConfig;
use crate::controller::resource::{ResourceError, ResourceStore};
use crate::crd::{
    Bucket, BucketPhase, BucketPolicy, BucketReason, BucketRegion, BucketSpec, BucketStatus,
    ClusterBucket, ClusterBucketSpec,
};
use crate::provider::{MockBucketStore, StoreError, StoreOperation};
use async_trait::async_trait;
use kube::ResourceExt;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const FINALIZER: &str = "objectstore.octopilot.io/bucket-cleanup";
const REMOTE: &str = "default-assets-1a2b3c4d";
const SIXTY_HOURS: Duration = Duration::from_secs(60 * 60 * 60);

/// In-memory API server: keeps deleted objects while finalizers remain
struct FakeResources<K> {
    objects: Mutex<HashMap<ObjectKey, K>>,
    fail_status_writes: AtomicBool,
}

impl<K: BucketObject> FakeResources<K> {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            objects: Mutex::new(HashMap::new()),
            fail_status_writes: AtomicBool::new(false),
        })
    }

    fn insert(&self, mut obj: K) -> ObjectKey {
        obj.meta_mut().generation.get_or_insert(1);
        let key = ObjectKey::from_object(&obj);
        self.objects.lock().unwrap().insert(key.clone(), obj);
        key
    }

    fn snapshot(&self, key: &ObjectKey) -> Option<K> {
        self.objects.lock().unwrap().get(key).cloned()
    }

    fn edit_spec(&self, key: &ObjectKey, edit: impl FnOnce(&mut K)) {
        let mut objects = self.objects.lock().unwrap();
        let obj = objects.get_mut(key).unwrap();
        edit(obj);
        let generation = obj.meta().generation.unwrap_or(0);
        obj.meta_mut().generation = Some(generation + 1);
    }

    fn request_delete(&self, key: &ObjectKey) {
        let mut objects = self.objects.lock().unwrap();
        let has_finalizers = objects
            .get(key)
            .is_some_and(|obj| !obj.finalizers().is_empty());
        if has_finalizers {
            let obj = objects.get_mut(key).unwrap();
            obj.meta_mut().deletion_timestamp =
                Some(serde_json::from_value(serde_json::json!("2024-01-01T00:00:00Z")).unwrap());
        } else {
            objects.remove(key);
        }
    }
}

fn api_failure() -> ResourceError {
    let response: kube::error::ErrorResponse = serde_json::from_value(serde_json::json!({
        "status": "Failure",
        "message": "etcdserver: request timed out",
        "reason": "InternalError",
        "code": 500
    }))
    .unwrap();
    ResourceError::Kube(kube::Error::Api(response))
}

#[async_trait]
impl<K: BucketObject> ResourceStore<K> for FakeResources<K> {
    async fn get(&self, key: &ObjectKey) -> Result<Option<K>, ResourceError> {
        Ok(self.snapshot(key))
    }

    async fn update(&self, obj: &K) -> Result<K, ResourceError> {
        let key = ObjectKey::from_object(obj);
        let mut objects = self.objects.lock().unwrap();
        let stored = objects
            .get_mut(&key)
            .ok_or_else(|| ResourceError::NotFound(key.clone()))?;
        stored.meta_mut().finalizers = obj.meta().finalizers.clone();

        let purge = stored.meta().deletion_timestamp.is_some() && stored.finalizers().is_empty();
        let result = stored.clone();
        if purge {
            objects.remove(&key);
        }
        Ok(result)
    }

    async fn update_status(&self, obj: &K) -> Result<K, ResourceError> {
        if self.fail_status_writes.load(Ordering::Relaxed) {
            return Err(api_failure());
        }
        let key = ObjectKey::from_object(obj);
        let mut objects = self.objects.lock().unwrap();
        let stored = objects
            .get_mut(&key)
            .ok_or_else(|| ResourceError::NotFound(key.clone()))?;
        if let Some(status) = obj.bucket_status() {
            stored.set_bucket_status(status.clone());
        }
        Ok(stored.clone())
    }
}

fn config() -> ControllerConfig {
    ControllerConfig {
        external_endpoint: "https://s3.example.com/".to_string(),
        finalizer_name: FINALIZER.to_string(),
        ..ControllerConfig::default()
    }
}

fn reconciler<K: BucketObject>(
    resources: &Arc<FakeResources<K>>,
    store: MockBucketStore,
) -> Reconciler<K> {
    Reconciler::new(resources.clone(), Arc::new(store), &config())
}

fn bucket(policy: BucketPolicy, region: Option<BucketRegion>) -> Bucket {
    let mut obj = Bucket::new("assets", BucketSpec { region, policy });
    obj.metadata.namespace = Some("default".to_string());
    obj
}

/// Resource already converged on `REMOTE` with the given policy
fn converged_bucket(policy: BucketPolicy) -> Bucket {
    let mut obj = bucket(policy, None);
    obj.finalizers_mut().push(FINALIZER.to_string());
    obj.status = Some(BucketStatus {
        phase: Some(BucketPhase::Ready),
        reason: Some(BucketReason::BucketPolicyUpdated),
        remote_name: Some(REMOTE.to_string()),
        ..Default::default()
    });
    obj
}

fn store_failure(operation: StoreOperation) -> StoreError {
    StoreError::new(operation, REMOTE, "connection reset by peer")
}

fn status_of<K: BucketObject>(resources: &FakeResources<K>, key: &ObjectKey) -> BucketStatus {
    resources
        .snapshot(key)
        .and_then(|obj| obj.bucket_status().cloned())
        .unwrap()
}

#[tokio::test]
async fn test_create_update_delete_scenario() {
    let resources = FakeResources::new();
    let key = resources.insert(bucket(BucketPolicy::ReadOnly, Some(BucketRegion::ApNortheast1)));

    // Create
    let mut store = MockBucketStore::new();
    store
        .expect_create_bucket()
        .withf(|namespace, name, region| {
            namespace == "default" && name == "assets" && *region == Some(BucketRegion::ApNortheast1)
        })
        .times(1)
        .returning(|_, _, _| Ok(REMOTE.to_string()));
    store
        .expect_set_bucket_policy()
        .withf(|bucket, policy| bucket == REMOTE && *policy == BucketPolicy::ReadOnly)
        .times(1)
        .returning(|_, _| Ok(()));

    let action = reconciler(&resources, store).reconcile(&key).await.unwrap();
    assert_eq!(action, Action::requeue(SIXTY_HOURS));

    let obj = resources.snapshot(&key).unwrap();
    assert!(obj.finalizers().contains(&FINALIZER.to_string()));
    let status = status_of(&resources, &key);
    assert_eq!(status.phase, Some(BucketPhase::Ready));
    assert_eq!(status.reason, Some(BucketReason::BucketPolicyUpdated));
    assert_eq!(status.remote_name(), Some(REMOTE));
    assert_eq!(
        status.url.as_deref(),
        Some("https://s3.example.com/default-assets-1a2b3c4d")
    );
    assert!(status.last_heartbeat_time.is_some());
    assert_eq!(status.observed_generation, Some(1));

    // Update policy to none
    resources.edit_spec(&key, |obj| obj.spec.policy = BucketPolicy::None);

    let mut store = MockBucketStore::new();
    store
        .expect_bucket_exists()
        .withf(|bucket| bucket == REMOTE)
        .times(1)
        .returning(|_| Ok(true));
    store
        .expect_compare_bucket_policy()
        .withf(|bucket, policy| bucket == REMOTE && *policy == BucketPolicy::None)
        .times(1)
        .returning(|_, _| Ok(false));
    store
        .expect_set_bucket_policy()
        .withf(|bucket, policy| bucket == REMOTE && *policy == BucketPolicy::None)
        .times(1)
        .returning(|_, _| Ok(()));

    let action = reconciler(&resources, store).reconcile(&key).await.unwrap();
    assert_eq!(action, Action::requeue(SIXTY_HOURS));
    let status = status_of(&resources, &key);
    assert_eq!(status.phase, Some(BucketPhase::Ready));
    assert_eq!(status.reason, Some(BucketReason::BucketPolicyUpdated));
    assert_eq!(status.observed_generation, Some(2));

    // Delete
    resources.request_delete(&key);

    let mut store = MockBucketStore::new();
    store
        .expect_delete_bucket()
        .withf(|bucket| bucket == REMOTE)
        .times(1)
        .returning(|_| Ok(()));

    reconciler(&resources, store).reconcile(&key).await.unwrap();
    assert!(resources.snapshot(&key).is_none());

    // Gone: no store calls, no requeue
    let action = reconciler(&resources, MockBucketStore::new())
        .reconcile(&key)
        .await
        .unwrap();
    assert_eq!(action, Action::await_change());
}

#[tokio::test]
async fn test_converged_resource_only_checks() {
    let resources = FakeResources::new();
    let key = resources.insert(converged_bucket(BucketPolicy::ReadWrite));

    let mut store = MockBucketStore::new();
    store.expect_bucket_exists().times(2).returning(|_| Ok(true));
    store
        .expect_compare_bucket_policy()
        .times(2)
        .returning(|_, _| Ok(true));
    let reconciler = reconciler(&resources, store);

    reconciler.reconcile(&key).await.unwrap();
    let first_heartbeat = status_of(&resources, &key).last_heartbeat_time;
    assert!(first_heartbeat.is_some());

    reconciler.reconcile(&key).await.unwrap();
    let status = status_of(&resources, &key);
    assert_eq!(status.phase, Some(BucketPhase::Ready));
    assert_eq!(status.reason, Some(BucketReason::BucketPolicyUpdated));
    assert_eq!(status.remote_name(), Some(REMOTE));
}

#[tokio::test]
async fn test_finalizer_is_persisted_before_bucket_creation() {
    let resources = FakeResources::new();
    let key = resources.insert(bucket(BucketPolicy::None, None));

    let observed = resources.clone();
    let observed_key = key.clone();
    let mut store = MockBucketStore::new();
    store
        .expect_create_bucket()
        .times(1)
        .returning(move |_, _, _| {
            let stored = observed.snapshot(&observed_key).unwrap();
            assert!(stored.finalizers().contains(&FINALIZER.to_string()));
            Ok(REMOTE.to_string())
        });
    store
        .expect_set_bucket_policy()
        .times(1)
        .returning(|_, _| Ok(()));

    reconciler(&resources, store).reconcile(&key).await.unwrap();
}

#[tokio::test]
async fn test_restart_after_finalizer_still_creates_bucket() {
    let resources = FakeResources::new();
    let mut obj = bucket(BucketPolicy::WriteOnly, None);
    obj.finalizers_mut().push(FINALIZER.to_string());
    let key = resources.insert(obj);

    let mut store = MockBucketStore::new();
    store
        .expect_create_bucket()
        .withf(|_, _, region| region.is_none())
        .times(1)
        .returning(|_, _, _| Ok(REMOTE.to_string()));
    store
        .expect_set_bucket_policy()
        .withf(|_, policy| *policy == BucketPolicy::WriteOnly)
        .times(1)
        .returning(|_, _| Ok(()));

    reconciler(&resources, store).reconcile(&key).await.unwrap();
    assert_eq!(status_of(&resources, &key).remote_name(), Some(REMOTE));
}

#[tokio::test]
async fn test_create_failure_marks_failed_without_remote_name() {
    let resources = FakeResources::new();
    let key = resources.insert(bucket(BucketPolicy::ReadOnly, None));

    let mut store = MockBucketStore::new();
    store
        .expect_create_bucket()
        .times(1)
        .returning(|_, _, _| Err(store_failure(StoreOperation::CreateBucket)));

    let err = reconciler(&resources, store)
        .reconcile(&key)
        .await
        .unwrap_err();
    assert!(matches!(err, ReconcilerError::Store(_)));

    let obj = resources.snapshot(&key).unwrap();
    assert!(obj.finalizers().contains(&FINALIZER.to_string()));
    let status = status_of(&resources, &key);
    assert_eq!(status.phase, Some(BucketPhase::Failed));
    assert_eq!(status.reason, Some(BucketReason::BucketCreationFailure));
    assert!(status.remote_name().is_none());
    assert!(status.message.unwrap().contains("connection reset by peer"));
}

#[tokio::test]
async fn test_policy_failure_after_create_keeps_remote_name() {
    let resources = FakeResources::new();
    let key = resources.insert(bucket(BucketPolicy::ReadOnly, None));

    let mut store = MockBucketStore::new();
    store
        .expect_create_bucket()
        .times(1)
        .returning(|_, _, _| Ok(REMOTE.to_string()));
    store
        .expect_set_bucket_policy()
        .times(1)
        .returning(|_, _| Err(store_failure(StoreOperation::SetPolicy)));

    assert!(reconciler(&resources, store).reconcile(&key).await.is_err());
    let status = status_of(&resources, &key);
    assert_eq!(status.phase, Some(BucketPhase::Failed));
    assert_eq!(status.reason, Some(BucketReason::BucketPolicyUpdateFailed));
    assert_eq!(status.remote_name(), Some(REMOTE));

    // Retry converges through the drift check, never creating a second bucket
    let mut store = MockBucketStore::new();
    store.expect_bucket_exists().times(1).returning(|_| Ok(true));
    store
        .expect_compare_bucket_policy()
        .times(1)
        .returning(|_, _| Ok(false));
    store
        .expect_set_bucket_policy()
        .times(1)
        .returning(|_, _| Ok(()));

    reconciler(&resources, store).reconcile(&key).await.unwrap();
    let status = status_of(&resources, &key);
    assert_eq!(status.phase, Some(BucketPhase::Ready));
    assert!(status.message.is_none());
}

#[tokio::test]
async fn test_matching_policy_recovers_from_failed_phase() {
    let resources = FakeResources::new();
    let mut obj = converged_bucket(BucketPolicy::ReadOnly);
    if let Some(status) = obj.status.as_mut() {
        status.phase = Some(BucketPhase::Failed);
        status.reason = Some(BucketReason::BucketVerificationFailure);
        status.message = Some("timeout".to_string());
    }
    let key = resources.insert(obj);

    let mut store = MockBucketStore::new();
    store.expect_bucket_exists().times(1).returning(|_| Ok(true));
    store
        .expect_compare_bucket_policy()
        .times(1)
        .returning(|_, _| Ok(true));

    reconciler(&resources, store).reconcile(&key).await.unwrap();
    let status = status_of(&resources, &key);
    assert_eq!(status.phase, Some(BucketPhase::Ready));
    assert!(status.message.is_none());
}

#[tokio::test]
async fn test_vanished_bucket_is_recreated() {
    let resources = FakeResources::new();
    let key = resources.insert(converged_bucket(BucketPolicy::ReadOnly));

    let mut store = MockBucketStore::new();
    store
        .expect_bucket_exists()
        .times(1)
        .returning(|_| Ok(false));
    store
        .expect_create_bucket()
        .times(1)
        .returning(|_, _, _| Ok("default-assets-99999999".to_string()));
    store
        .expect_set_bucket_policy()
        .withf(|bucket, _| bucket == "default-assets-99999999")
        .times(1)
        .returning(|_, _| Ok(()));

    reconciler(&resources, store).reconcile(&key).await.unwrap();
    let status = status_of(&resources, &key);
    assert_eq!(status.remote_name(), Some("default-assets-99999999"));
    assert_eq!(status.phase, Some(BucketPhase::Ready));
}

#[tokio::test]
async fn test_failed_recreation_clears_stale_remote_name() {
    let resources = FakeResources::new();
    let key = resources.insert(converged_bucket(BucketPolicy::ReadOnly));

    let mut store = MockBucketStore::new();
    store
        .expect_bucket_exists()
        .times(1)
        .returning(|_| Ok(false));
    store
        .expect_create_bucket()
        .times(1)
        .returning(|_, _, _| Err(store_failure(StoreOperation::CreateBucket)));

    assert!(reconciler(&resources, store).reconcile(&key).await.is_err());
    let status = status_of(&resources, &key);
    assert_eq!(status.reason, Some(BucketReason::BucketCreationFailure));
    assert!(status.remote_name().is_none());
    assert!(status.url.is_none());
}

#[tokio::test]
async fn test_exists_failure_is_verification_failure() {
    let resources = FakeResources::new();
    let key = resources.insert(converged_bucket(BucketPolicy::ReadOnly));

    let mut store = MockBucketStore::new();
    store
        .expect_bucket_exists()
        .times(1)
        .returning(|_| Err(store_failure(StoreOperation::BucketExists)));

    assert!(reconciler(&resources, store).reconcile(&key).await.is_err());
    let status = status_of(&resources, &key);
    assert_eq!(status.phase, Some(BucketPhase::Failed));
    assert_eq!(status.reason, Some(BucketReason::BucketVerificationFailure));
    assert_eq!(status.remote_name(), Some(REMOTE));
}

#[tokio::test]
async fn test_compare_failure_is_policy_verification_failure() {
    let resources = FakeResources::new();
    let key = resources.insert(converged_bucket(BucketPolicy::ReadOnly));

    let mut store = MockBucketStore::new();
    store.expect_bucket_exists().times(1).returning(|_| Ok(true));
    store
        .expect_compare_bucket_policy()
        .times(1)
        .returning(|_, _| Err(store_failure(StoreOperation::ComparePolicy)));

    assert!(reconciler(&resources, store).reconcile(&key).await.is_err());
    assert_eq!(
        status_of(&resources, &key).reason,
        Some(BucketReason::BucketPolicyVerificationFailed)
    );
}

#[tokio::test]
async fn test_delete_failure_keeps_finalizer() {
    let resources = FakeResources::new();
    let key = resources.insert(converged_bucket(BucketPolicy::ReadOnly));
    resources.request_delete(&key);

    let mut store = MockBucketStore::new();
    store
        .expect_delete_bucket()
        .times(1)
        .returning(|_| Err(store_failure(StoreOperation::DeleteBucket)));

    assert!(reconciler(&resources, store).reconcile(&key).await.is_err());
    let obj = resources.snapshot(&key).unwrap();
    assert!(obj.finalizers().contains(&FINALIZER.to_string()));
    let status = status_of(&resources, &key);
    assert_eq!(status.phase, Some(BucketPhase::Failed));
    assert_eq!(status.reason, Some(BucketReason::BucketDeletionFailure));

    // Next attempt succeeds and releases the resource
    let mut store = MockBucketStore::new();
    store.expect_delete_bucket().times(1).returning(|_| Ok(()));
    reconciler(&resources, store).reconcile(&key).await.unwrap();
    assert!(resources.snapshot(&key).is_none());
}

#[tokio::test]
async fn test_delete_without_remote_name_skips_store() {
    let resources = FakeResources::new();
    let mut obj = bucket(BucketPolicy::ReadOnly, None);
    obj.finalizers_mut().push(FINALIZER.to_string());
    let key = resources.insert(obj);
    resources.request_delete(&key);

    reconciler(&resources, MockBucketStore::new())
        .reconcile(&key)
        .await
        .unwrap();
    assert!(resources.snapshot(&key).is_none());
}

#[tokio::test]
async fn test_released_resource_is_left_alone() {
    let resources = FakeResources::new();
    let mut obj = converged_bucket(BucketPolicy::ReadOnly);
    obj.finalizers_mut().push("someone-else/cleanup".to_string());
    let key = resources.insert(obj);
    resources.request_delete(&key);

    // Our finalizer went away elsewhere; a foreign one keeps the object alive
    let mut obj = resources.snapshot(&key).unwrap();
    obj.finalizers_mut().retain(|f| f != FINALIZER);
    resources.update(&obj).await.unwrap();

    let action = reconciler(&resources, MockBucketStore::new())
        .reconcile(&key)
        .await
        .unwrap();
    assert_eq!(action, Action::await_change());
}

#[tokio::test]
async fn test_cluster_bucket_uses_empty_namespace() {
    let resources = FakeResources::new();
    let key = resources.insert(ClusterBucket::new(
        "shared",
        ClusterBucketSpec {
            region: Some(BucketRegion::EuWest1),
            policy: BucketPolicy::ReadWrite,
        },
    ));
    assert!(key.namespace.is_none());

    let mut store = MockBucketStore::new();
    store
        .expect_create_bucket()
        .withf(|namespace, name, region| {
            namespace.is_empty() && name == "shared" && *region == Some(BucketRegion::EuWest1)
        })
        .times(1)
        .returning(|_, _, _| Ok("shared-1a2b3c4d".to_string()));
    store
        .expect_set_bucket_policy()
        .withf(|_, policy| *policy == BucketPolicy::ReadWrite)
        .times(1)
        .returning(|_, _| Ok(()));

    let action = reconciler(&resources, store).reconcile(&key).await.unwrap();
    assert_eq!(action, Action::requeue(SIXTY_HOURS));
    assert_eq!(
        status_of(&resources, &key).phase,
        Some(BucketPhase::Ready)
    );
}

#[tokio::test]
async fn test_status_write_failure_is_returned() {
    let resources = FakeResources::new();
    let key = resources.insert(converged_bucket(BucketPolicy::ReadOnly));
    resources.fail_status_writes.store(true, Ordering::Relaxed);

    let mut store = MockBucketStore::new();
    store.expect_bucket_exists().times(1).returning(|_| Ok(true));
    store
        .expect_compare_bucket_policy()
        .times(1)
        .returning(|_, _| Ok(true));

    let err = reconciler(&resources, store)
        .reconcile(&key)
        .await
        .unwrap_err();
    assert!(matches!(err, ReconcilerError::Resource(_)));
}

#[tokio::test]
async fn test_no_url_without_external_endpoint() {
    let resources = FakeResources::new();
    let key = resources.insert(bucket(BucketPolicy::None, None));

    let mut store = MockBucketStore::new();
    store
        .expect_create_bucket()
        .returning(|_, _, _| Ok(REMOTE.to_string()));
    store.expect_set_bucket_policy().returning(|_, _| Ok(()));

    let config = ControllerConfig {
        finalizer_name: FINALIZER.to_string(),
        ..ControllerConfig::default()
    };
    let reconciler = Reconciler::new(resources.clone(), Arc::new(store), &config);
    reconciler.reconcile(&key).await.unwrap();

    assert!(status_of(&resources, &key).url.is_none());
}

#[test]
fn test_error_backoff_grows_and_resets() {
    let resources = FakeResources::<Bucket>::new();
    let reconciler = reconciler(&resources, MockBucketStore::new());
    let key = ObjectKey::new(Some("default"), "assets");
    let other = ObjectKey::new(Some("default"), "other");

    assert_eq!(reconciler.next_error_backoff(&key), (Duration::from_secs(5), 1));
    assert_eq!(reconciler.next_error_backoff(&key), (Duration::from_secs(10), 2));
    assert_eq!(reconciler.next_error_backoff(&other), (Duration::from_secs(5), 1));

    assert!(reconciler.reset_backoff(&key));
    assert!(!reconciler.reset_backoff(&key));
    assert_eq!(reconciler.next_error_backoff(&key), (Duration::from_secs(5), 1));
}
