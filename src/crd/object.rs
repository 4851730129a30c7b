//! # Bucket Objects
//!
//! Common view over `Bucket` and `ClusterBucket`.

use super::{Bucket, BucketPolicy, BucketRegion, BucketStatus, ClusterBucket};
use kube::{Api, Client, Resource, ResourceExt};
use serde::{de::DeserializeOwned, Serialize};

/// A resource describing one remote bucket
///
/// Implemented by both CRD kinds so the reconciler, the resource store and
/// the watch loop are written once.
pub trait BucketObject:
    Resource<DynamicType = ()> + Clone + std::fmt::Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Desired region, if any
    fn region(&self) -> Option<BucketRegion>;

    /// Desired access policy
    fn policy(&self) -> BucketPolicy;

    /// Current status, if the reconciler has written one
    fn bucket_status(&self) -> Option<&BucketStatus>;

    /// Replace the status held by this object
    fn set_bucket_status(&mut self, status: BucketStatus);

    /// API handle scoped the way this kind is scoped
    fn api(client: Client, namespace: Option<&str>) -> Api<Self>;
}

impl BucketObject for Bucket {
    fn region(&self) -> Option<BucketRegion> {
        self.spec.region
    }

    fn policy(&self) -> BucketPolicy {
        self.spec.policy
    }

    fn bucket_status(&self) -> Option<&BucketStatus> {
        self.status.as_ref()
    }

    fn set_bucket_status(&mut self, status: BucketStatus) {
        self.status = Some(status);
    }

    fn api(client: Client, namespace: Option<&str>) -> Api<Self> {
        Api::namespaced(client, namespace.unwrap_or("default"))
    }
}

impl BucketObject for ClusterBucket {
    fn region(&self) -> Option<BucketRegion> {
        self.spec.region
    }

    fn policy(&self) -> BucketPolicy {
        self.spec.policy
    }

    fn bucket_status(&self) -> Option<&BucketStatus> {
        self.status.as_ref()
    }

    fn set_bucket_status(&mut self, status: BucketStatus) {
        self.status = Some(status);
    }

    fn api(client: Client, _namespace: Option<&str>) -> Api<Self> {
        Api::all(client)
    }
}

/// Identity of a bucket resource: namespace + name
///
/// An absent namespace identifies a `ClusterBucket`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectKey {
    pub namespace: Option<String>,
    pub name: String,
}

impl ObjectKey {
    pub fn new(namespace: Option<&str>, name: &str) -> Self {
        Self {
            namespace: namespace.filter(|ns| !ns.is_empty()).map(str::to_string),
            name: name.to_string(),
        }
    }

    /// Key for an object already held in memory
    pub fn from_object<K: Resource>(obj: &K) -> Self {
        Self::new(obj.namespace().as_deref(), &obj.name_any())
    }

    /// Namespace as the bucket store expects it: empty for cluster-scoped buckets
    pub fn namespace_or_empty(&self) -> &str {
        self.namespace.as_deref().unwrap_or("")
    }
}

impl std::fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{ns}/{}", self.name),
            None => f.write_str(&self.name),
        }
    }
}
