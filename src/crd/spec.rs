//! # Bucket Specification
//!
//! Desired state for `Bucket` (namespaced) and `ClusterBucket` (cluster-scoped).
//! Both kinds carry the same fields and share the `BucketStatus` subresource.

use super::BucketStatus;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Bucket Custom Resource Definition
///
/// # Example
///
/// ```yaml
/// apiVersion: objectstore.octopilot.io/v1beta1
/// kind: Bucket
/// metadata:
///   name: assets
///   namespace: default
/// spec:
///   region: ap-northeast-1
///   policy: readonly
/// ```
#[derive(CustomResource, Debug, Clone, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    kind = "Bucket",
    group = "objectstore.octopilot.io",
    version = "v1beta1",
    namespaced,
    status = "BucketStatus",
    shortname = "bkt",
    printcolumn = r#"{"name":"Phase", "type":"string", "jsonPath":".status.phase"}"#,
    printcolumn = r#"{"name":"Reason", "type":"string", "jsonPath":".status.reason"}"#,
    printcolumn = r#"{"name":"Remote", "type":"string", "jsonPath":".status.remoteName"}"#,
    printcolumn = r#"{"name":"Age", "type":"date", "jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct BucketSpec {
    /// Region the bucket is created in. Only honoured at creation time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<BucketRegion>,
    /// Anonymous access policy applied to the bucket
    #[serde(default)]
    pub policy: BucketPolicy,
}

/// ClusterBucket Custom Resource Definition
///
/// Cluster-scoped variant of [`Bucket`]; its identity has no namespace.
#[derive(CustomResource, Debug, Clone, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    kind = "ClusterBucket",
    group = "objectstore.octopilot.io",
    version = "v1beta1",
    status = "BucketStatus",
    shortname = "cbkt",
    printcolumn = r#"{"name":"Phase", "type":"string", "jsonPath":".status.phase"}"#,
    printcolumn = r#"{"name":"Reason", "type":"string", "jsonPath":".status.reason"}"#,
    printcolumn = r#"{"name":"Remote", "type":"string", "jsonPath":".status.remoteName"}"#,
    printcolumn = r#"{"name":"Age", "type":"date", "jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ClusterBucketSpec {
    /// Region the bucket is created in. Only honoured at creation time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<BucketRegion>,
    /// Anonymous access policy applied to the bucket
    #[serde(default)]
    pub policy: BucketPolicy,
}

/// Anonymous access policy for a bucket
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq, Hash)]
pub enum BucketPolicy {
    /// No anonymous access
    #[default]
    #[serde(rename = "none")]
    None,
    /// Anonymous list and download
    #[serde(rename = "readonly")]
    ReadOnly,
    /// Anonymous upload and delete
    #[serde(rename = "writeonly")]
    WriteOnly,
    /// Anonymous read and write
    #[serde(rename = "readwrite")]
    ReadWrite,
}

impl BucketPolicy {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            BucketPolicy::None => "none",
            BucketPolicy::ReadOnly => "readonly",
            BucketPolicy::WriteOnly => "writeonly",
            BucketPolicy::ReadWrite => "readwrite",
        }
    }
}

impl std::fmt::Display for BucketPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Regions a bucket may be created in
#[derive(Debug, Clone, Copy, Deserialize, Serialize, JsonSchema, PartialEq, Eq, Hash)]
pub enum BucketRegion {
    #[serde(rename = "us-east-1")]
    UsEast1,
    #[serde(rename = "us-west-1")]
    UsWest1,
    #[serde(rename = "us-west-2")]
    UsWest2,
    #[serde(rename = "eu-east-1")]
    EuEast1,
    #[serde(rename = "eu-west-1")]
    EuWest1,
    #[serde(rename = "eu-central-1")]
    EuCentral1,
    #[serde(rename = "ap-south-1")]
    ApSouth1,
    #[serde(rename = "ap-southeast-1")]
    ApSoutheast1,
    #[serde(rename = "ap-southeast-2")]
    ApSoutheast2,
    #[serde(rename = "ap-northeast-1")]
    ApNortheast1,
    #[serde(rename = "sa-east-1")]
    SaEast1,
    #[serde(rename = "cn-north-1")]
    CnNorth1,
}

impl BucketRegion {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            BucketRegion::UsEast1 => "us-east-1",
            BucketRegion::UsWest1 => "us-west-1",
            BucketRegion::UsWest2 => "us-west-2",
            BucketRegion::EuEast1 => "eu-east-1",
            BucketRegion::EuWest1 => "eu-west-1",
            BucketRegion::EuCentral1 => "eu-central-1",
            BucketRegion::ApSouth1 => "ap-south-1",
            BucketRegion::ApSoutheast1 => "ap-southeast-1",
            BucketRegion::ApSoutheast2 => "ap-southeast-2",
            BucketRegion::ApNortheast1 => "ap-northeast-1",
            BucketRegion::SaEast1 => "sa-east-1",
            BucketRegion::CnNorth1 => "cn-north-1",
        }
    }
}

impl std::fmt::Display for BucketRegion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
