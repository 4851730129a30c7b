//! # Types
//!
//! Core types for the reconciler.

use crate::config::ControllerConfig;
use crate::controller::backoff::BackoffState;
use crate::controller::finalizer::Finalizer;
use crate::controller::resource::{ResourceError, ResourceStore};
use crate::crd::{BucketObject, ObjectKey};
use crate::provider::{BucketStore, StoreError};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReconcilerError {
    #[error("Bucket store operation failed: {0}")]
    Store(#[from] StoreError),
    #[error("Resource persistence failed: {0}")]
    Resource(#[from] ResourceError),
    #[error("Resource has no name")]
    MissingName,
}

/// Reconciler for one resource kind
///
/// Holds only injected collaborators and configuration; the store client is
/// built once at startup and shared by the reconcilers of every kind.
pub struct Reconciler<K: BucketObject> {
    pub resources: Arc<dyn ResourceStore<K>>,
    pub store: Arc<dyn BucketStore>,
    pub finalizer: Finalizer,
    /// Requeue interval after a successful reconcile
    pub relist_interval: Duration,
    /// Public endpoint used to build the access URL in status
    pub external_endpoint: String,
    pub backoff_start_secs: u64,
    pub backoff_max_secs: u64,
    // Backoff state per resource, owned by the error policy and reset on success
    pub backoff_states: Arc<Mutex<HashMap<ObjectKey, BackoffState>>>,
}

impl<K: BucketObject> std::fmt::Debug for Reconciler<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("kind", &Self::kind())
            .field("finalizer", &self.finalizer.name())
            .field("relist_interval", &self.relist_interval)
            .finish_non_exhaustive()
    }
}

impl<K: BucketObject> Reconciler<K> {
    pub fn new(
        resources: Arc<dyn ResourceStore<K>>,
        store: Arc<dyn BucketStore>,
        config: &ControllerConfig,
    ) -> Self {
        Self {
            resources,
            store,
            finalizer: Finalizer::new(config.finalizer_name.clone()),
            relist_interval: config.relist_interval,
            external_endpoint: config.external_endpoint.clone(),
            backoff_start_secs: config.reconcile_backoff_start_secs,
            backoff_max_secs: config.reconcile_backoff_max_secs,
            backoff_states: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Kind name used in logs and metric labels
    pub fn kind() -> String {
        K::kind(&()).to_string()
    }
}
