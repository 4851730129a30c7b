//! # Bucket Status
//!
//! Observed state written exclusively by the reconciler.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Status of a `Bucket` or `ClusterBucket`
///
/// Absent fields serialize as `null` so a merge patch of the whole status
/// clears values from a previous write.
#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BucketStatus {
    /// Coarse convergence state
    #[serde(default)]
    pub phase: Option<BucketPhase>,
    /// Fine-grained cause of the current phase
    #[serde(default)]
    pub reason: Option<BucketReason>,
    /// Human-readable detail, typically the last error
    #[serde(default)]
    pub message: Option<String>,
    /// Name of the bucket in the remote store
    /// Only ever set after the store confirmed the bucket was created
    #[serde(default)]
    pub remote_name: Option<String>,
    /// Access URL composed from the external endpoint and the remote name
    #[serde(default)]
    pub url: Option<String>,
    /// Last time the reconciler verified the bucket (RFC3339)
    #[serde(default)]
    pub last_heartbeat_time: Option<String>,
    /// Generation of the spec this status was computed from
    #[serde(default)]
    pub observed_generation: Option<i64>,
}

impl BucketStatus {
    /// Remote bucket identifier, treating an empty string as absent
    #[must_use]
    pub fn remote_name(&self) -> Option<&str> {
        self.remote_name.as_deref().filter(|name| !name.is_empty())
    }
}

/// Coarse convergence state
#[derive(Debug, Clone, Copy, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub enum BucketPhase {
    /// Remote bucket exists, policy not yet applied
    Pending,
    /// Remote bucket exists with the desired policy
    Ready,
    /// Last store operation failed; the controller keeps retrying
    Failed,
}

impl BucketPhase {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            BucketPhase::Pending => "Pending",
            BucketPhase::Ready => "Ready",
            BucketPhase::Failed => "Failed",
        }
    }
}

/// Fine-grained cause code for the current phase
#[derive(Debug, Clone, Copy, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub enum BucketReason {
    BucketCreated,
    BucketPolicyUpdated,
    BucketCreationFailure,
    BucketVerificationFailure,
    BucketPolicyVerificationFailed,
    BucketPolicyUpdateFailed,
    BucketDeletionFailure,
}

impl BucketReason {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            BucketReason::BucketCreated => "BucketCreated",
            BucketReason::BucketPolicyUpdated => "BucketPolicyUpdated",
            BucketReason::BucketCreationFailure => "BucketCreationFailure",
            BucketReason::BucketVerificationFailure => "BucketVerificationFailure",
            BucketReason::BucketPolicyVerificationFailed => "BucketPolicyVerificationFailed",
            BucketReason::BucketPolicyUpdateFailed => "BucketPolicyUpdateFailed",
            BucketReason::BucketDeletionFailure => "BucketDeletionFailure",
        }
    }
}
