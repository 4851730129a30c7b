//! # Resource Store
//!
//! Read and write access to bucket resources in the Kubernetes API.
//!
//! The reconciler always fetches a fresh copy by key and writes metadata and
//! status separately, so a stale object from the watch cache is never
//! written back.

use crate::constants::FIELD_MANAGER;
use crate::crd::{BucketObject, ObjectKey};
use async_trait::async_trait;
use kube::api::{Patch, PatchParams};
use kube::{Client, ResourceExt};
use serde_json::json;
use std::marker::PhantomData;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),
    #[error("Resource {0} not found")]
    NotFound(ObjectKey),
}

/// Access to the resources a reconciler manages
#[async_trait]
pub trait ResourceStore<K: BucketObject>: Send + Sync {
    /// Fetch the current object; `None` once it is gone
    async fn get(&self, key: &ObjectKey) -> Result<Option<K>, ResourceError>;

    /// Persist metadata changes (finalizers) and return the stored object
    async fn update(&self, obj: &K) -> Result<K, ResourceError>;

    /// Persist the status subresource and return the stored object
    async fn update_status(&self, obj: &K) -> Result<K, ResourceError>;
}

/// [`ResourceStore`] backed by the Kubernetes API server
pub struct KubeResourceStore<K> {
    client: Client,
    _kind: PhantomData<fn() -> K>,
}

impl<K> KubeResourceStore<K> {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            _kind: PhantomData,
        }
    }
}

impl<K> std::fmt::Debug for KubeResourceStore<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeResourceStore").finish_non_exhaustive()
    }
}

fn not_found_as<T>(key: &ObjectKey, err: kube::Error) -> Result<T, ResourceError> {
    match err {
        kube::Error::Api(e) if e.code == 404 => Err(ResourceError::NotFound(key.clone())),
        e => Err(ResourceError::Kube(e)),
    }
}

#[async_trait]
impl<K: BucketObject> ResourceStore<K> for KubeResourceStore<K> {
    async fn get(&self, key: &ObjectKey) -> Result<Option<K>, ResourceError> {
        let api = K::api(self.client.clone(), key.namespace.as_deref());
        Ok(api.get_opt(&key.name).await?)
    }

    async fn update(&self, obj: &K) -> Result<K, ResourceError> {
        let key = ObjectKey::from_object(obj);
        let api = K::api(self.client.clone(), key.namespace.as_deref());
        let patch = json!({
            "metadata": {
                "finalizers": obj.finalizers(),
            }
        });

        match api
            .patch(&key.name, &PatchParams::default(), &Patch::Merge(&patch))
            .await
        {
            Ok(stored) => Ok(stored),
            Err(e) => not_found_as(&key, e),
        }
    }

    async fn update_status(&self, obj: &K) -> Result<K, ResourceError> {
        let key = ObjectKey::from_object(obj);
        let api = K::api(self.client.clone(), key.namespace.as_deref());
        let patch = json!({ "status": obj.bucket_status() });

        match api
            .patch_status(
                &key.name,
                &PatchParams::apply(FIELD_MANAGER),
                &Patch::Merge(&patch),
            )
            .await
        {
            Ok(stored) => Ok(stored),
            Err(e) => not_found_as(&key, e),
        }
    }
}
