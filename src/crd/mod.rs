//! # Custom Resource Definitions
//!
//! CRD types for the bucket controller.
//!
//! ## Module Structure
//!
//! - `spec.rs` - `Bucket` / `ClusterBucket` kinds, policy and region enumerations
//! - `status.rs` - Status subresource shared by both kinds
//! - `object.rs` - `BucketObject`, the seam that lets one reconciler drive both kinds

mod object;
mod spec;
mod status;

pub use object::{BucketObject, ObjectKey};
pub use spec::{Bucket, BucketPolicy, BucketRegion, BucketSpec, ClusterBucket, ClusterBucketSpec};
pub use status::{BucketPhase, BucketReason, BucketStatus};
