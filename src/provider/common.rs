//! # Common Provider Utilities
//!
//! Remote bucket naming and metric recording shared by store implementations.

use crate::constants::{BUCKET_NAME_SUFFIX_LEN, MAX_BUCKET_NAME_LEN};
use crate::observability::metrics;
use crate::provider::StoreOperation;
use std::time::Instant;

/// Build a unique remote bucket name for a resource
///
/// Format: `<prefix><namespace>-<name>-<suffix>` (the namespace part is
/// omitted for cluster-scoped resources). The result is sanitized to the
/// S3 naming rules and never exceeds 63 characters; the random suffix is
/// always preserved so two resources never share a bucket.
#[must_use]
pub fn generate_bucket_name(prefix: &str, namespace: &str, name: &str) -> String {
    let suffix = random_suffix();
    compose_bucket_name(prefix, namespace, name, &suffix)
}

fn random_suffix() -> String {
    uuid::Uuid::new_v4()
        .simple()
        .to_string()
        .chars()
        .take(BUCKET_NAME_SUFFIX_LEN)
        .collect()
}

pub(crate) fn compose_bucket_name(prefix: &str, namespace: &str, name: &str, suffix: &str) -> String {
    let base = if namespace.is_empty() {
        format!("{prefix}{name}")
    } else {
        format!("{prefix}{namespace}-{name}")
    };

    let mut stem = sanitize_bucket_name(&base);
    let max_stem = MAX_BUCKET_NAME_LEN - suffix.len() - 1;
    if stem.len() > max_stem {
        stem.truncate(max_stem);
        stem = stem.trim_end_matches(['-', '.']).to_string();
    }

    if stem.is_empty() {
        format!("bucket-{suffix}")
    } else {
        format!("{stem}-{suffix}")
    }
}

/// Sanitize a name to S3 bucket naming rules
///
/// Lowercases, replaces anything outside `[a-z0-9-]` with `-`, collapses
/// repeated dashes and trims leading/trailing dashes.
#[must_use]
pub fn sanitize_bucket_name(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| match c.to_ascii_lowercase() {
            c if c.is_ascii_lowercase() || c.is_ascii_digit() => c,
            _ => '-',
        })
        .collect();

    let mut result = String::with_capacity(sanitized.len());
    let mut prev_was_dash = false;

    for c in sanitized.chars() {
        if c == '-' {
            if !prev_was_dash {
                result.push(c);
                prev_was_dash = true;
            }
        } else {
            result.push(c);
            prev_was_dash = false;
        }
    }

    result.trim_matches('-').to_string()
}

/// Record metrics for a store operation
pub fn record_store_metrics(operation: StoreOperation, success: bool, start_time: Instant) {
    metrics::record_store_operation(
        operation.as_str(),
        success,
        start_time.elapsed().as_secs_f64(),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compose_namespaced_name() {
        assert_eq!(
            compose_bucket_name("", "default", "assets", "1a2b3c4d"),
            "default-assets-1a2b3c4d"
        );
    }

    #[test]
    fn test_compose_cluster_scoped_name_has_no_namespace() {
        assert_eq!(
            compose_bucket_name("dev-", "", "shared", "1a2b3c4d"),
            "dev-shared-1a2b3c4d"
        );
    }

    #[test]
    fn test_long_names_are_truncated_but_keep_suffix() {
        let long_name = "a".repeat(100);
        let name = compose_bucket_name("", "team-storage", &long_name, "1a2b3c4d");
        assert_eq!(name.len(), MAX_BUCKET_NAME_LEN);
        assert!(name.ends_with("-1a2b3c4d"));
    }

    #[test]
    fn test_sanitize_replaces_invalid_characters() {
        assert_eq!(sanitize_bucket_name("My_App.Data"), "my-app-data");
        assert_eq!(sanitize_bucket_name("--a--b--"), "a-b");
    }

    #[test]
    fn test_generated_names_are_unique() {
        let first = generate_bucket_name("", "default", "assets");
        let second = generate_bucket_name("", "default", "assets");
        assert_ne!(first, second);
        assert!(first.starts_with("default-assets-"));
        assert_eq!(first.len(), "default-assets-".len() + BUCKET_NAME_SUFFIX_LEN);
    }
}
