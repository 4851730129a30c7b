//! # Finalizer
//!
//! The finalizer guards remote bucket cleanup: the API server keeps a
//! deleted resource around until the reconciler removes it.

use kube::{Resource, ResourceExt};

/// Named finalizer marker on resource metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finalizer {
    name: String,
}

impl Finalizer {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the marker is present on `obj`
    pub fn is_present<K: Resource>(&self, obj: &K) -> bool {
        obj.finalizers().iter().any(|f| f == &self.name)
    }

    /// Add the marker; returns `false` if it was already present
    pub fn add<K: Resource>(&self, obj: &mut K) -> bool {
        if self.is_present(obj) {
            return false;
        }
        obj.finalizers_mut().push(self.name.clone());
        true
    }

    /// Remove the marker; returns `false` if it was not present
    pub fn remove<K: Resource>(&self, obj: &mut K) -> bool {
        let finalizers = obj.finalizers_mut();
        let before = finalizers.len();
        finalizers.retain(|f| f != &self.name);
        before != finalizers.len()
    }
}

/// Where a resource is in its lifecycle relative to the finalizer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    /// Not being deleted
    Active,
    /// Deletion requested and our finalizer is still present
    CleanupPending,
    /// Deletion requested and our finalizer is already gone
    Released,
}

impl Lifecycle {
    pub fn of<K: Resource>(obj: &K, finalizer: &Finalizer) -> Self {
        if obj.meta().deletion_timestamp.is_none() {
            Lifecycle::Active
        } else if finalizer.is_present(obj) {
            Lifecycle::CleanupPending
        } else {
            Lifecycle::Released
        }
    }
}
