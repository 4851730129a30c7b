//! # Prelude
//!
//! Re-exports commonly used types and traits for convenience.
//!
//! ```rust
//! use bucket_controller::prelude::*;
//! ```
//!
//! This brings into scope:
//! - All CRD types (`Bucket`, `ClusterBucket`, `BucketStatus`, etc.)
//! - The bucket store trait and its S3 implementation
//! - Reconciler and resource persistence types
//! - Config types

pub use crate::crd::*;

pub use crate::provider::{BucketStore, S3BucketStore, StoreError, StoreOperation};

pub use crate::controller::finalizer::{Finalizer, Lifecycle};
pub use crate::controller::reconciler::{Reconciler, ReconcilerError};
pub use crate::controller::resource::{KubeResourceStore, ResourceError, ResourceStore};

pub use crate::config::{ControllerConfig, ServerConfig, StoreConfig};
