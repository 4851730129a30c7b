//! Bucket Controller Library
//!
//! Reconciles `Bucket` and `ClusterBucket` resources against an S3-compatible
//! object store: creates the remote bucket, keeps its access policy in line
//! with the declared one and deletes it behind a finalizer.
//!
//! ## Quick Start
//!
//! ```rust
//! use bucket_controller::prelude::*;
//! ```
//!
//! This brings commonly used types and traits into scope. For more specific imports,
//! use the individual modules.

pub mod config;
pub mod constants;
pub mod controller;
pub mod crd;
pub mod observability;
pub mod prelude;
pub mod provider;
pub mod runtime;
pub mod server;
