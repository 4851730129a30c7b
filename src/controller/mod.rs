//! # Controller
//!
//! Core controller modules for the bucket controller.
//!
//! - `backoff`: exponential backoff for failed reconciliations
//! - `finalizer`: finalizer marker and lifecycle state
//! - `resource`: resource persistence (`ResourceStore`) and its Kubernetes implementation
//! - `reconciler`: core reconciliation logic

pub mod backoff;
pub mod finalizer;
pub mod reconciler;
pub mod resource;
