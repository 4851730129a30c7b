//! # Bucket Policy Documents
//!
//! Canned anonymous-access policies and semantic comparison of S3 policy JSON.
//!
//! Stores reformat policies on write (statement order, single values vs
//! arrays, principal shape), so equality is checked on a normalized set of
//! `(effect, principal, action, resource, condition)` grants rather than on text.

use crate::crd::BucketPolicy;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

const POLICY_VERSION: &str = "2012-10-17";

const READ_BUCKET_ACTIONS: &[&str] = &["s3:GetBucketLocation", "s3:ListBucket"];
const READ_OBJECT_ACTIONS: &[&str] = &["s3:GetObject"];
const WRITE_BUCKET_ACTIONS: &[&str] = &["s3:GetBucketLocation", "s3:ListBucketMultipartUploads"];
const WRITE_OBJECT_ACTIONS: &[&str] = &[
    "s3:AbortMultipartUpload",
    "s3:DeleteObject",
    "s3:ListMultipartUploadParts",
    "s3:PutObject",
];

/// A single value or a list of values, as IAM JSON allows both
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    fn values(&self) -> Vec<&str> {
        match self {
            OneOrMany::One(value) => vec![value.as_str()],
            OneOrMany::Many(values) => values.iter().map(String::as_str).collect(),
        }
    }
}

/// `"*"` or `{"AWS": ...}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Principal {
    Wildcard(String),
    Map(BTreeMap<String, OneOrMany>),
}

impl Principal {
    fn anonymous() -> Self {
        Principal::Map(BTreeMap::from([(
            "AWS".to_string(),
            OneOrMany::Many(vec!["*".to_string()]),
        )]))
    }

    /// `type:value` pairs; a bare `"*"` is the same grant as `{"AWS": "*"}`
    fn normalized(&self) -> Vec<String> {
        match self {
            Principal::Wildcard(value) => vec![format!("AWS:{value}")],
            Principal::Map(map) => map
                .iter()
                .flat_map(|(kind, values)| {
                    values
                        .values()
                        .into_iter()
                        .map(move |value| format!("{kind}:{value}"))
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Statement {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sid: Option<String>,
    pub effect: String,
    pub principal: Principal,
    pub action: OneOrMany,
    pub resource: OneOrMany,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Value>,
}

/// S3 bucket policy document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyDocument {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub statement: Vec<Statement>,
}

type Grant = (String, String, String, String, String);

impl PolicyDocument {
    /// Canned document for `policy`, or `None` when no policy should be attached
    #[must_use]
    pub fn canned(bucket: &str, policy: BucketPolicy) -> Option<Self> {
        let (bucket_actions, object_actions): (Vec<&str>, Vec<&str>) = match policy {
            BucketPolicy::None => return None,
            BucketPolicy::ReadOnly => (READ_BUCKET_ACTIONS.to_vec(), READ_OBJECT_ACTIONS.to_vec()),
            BucketPolicy::WriteOnly => {
                (WRITE_BUCKET_ACTIONS.to_vec(), WRITE_OBJECT_ACTIONS.to_vec())
            }
            BucketPolicy::ReadWrite => {
                let bucket_actions: BTreeSet<&str> = READ_BUCKET_ACTIONS
                    .iter()
                    .chain(WRITE_BUCKET_ACTIONS)
                    .copied()
                    .collect();
                let object_actions: BTreeSet<&str> = READ_OBJECT_ACTIONS
                    .iter()
                    .chain(WRITE_OBJECT_ACTIONS)
                    .copied()
                    .collect();
                (
                    bucket_actions.into_iter().collect(),
                    object_actions.into_iter().collect(),
                )
            }
        };

        Some(Self {
            version: POLICY_VERSION.to_string(),
            statement: vec![
                allow_statement(bucket_actions, format!("arn:aws:s3:::{bucket}")),
                allow_statement(object_actions, format!("arn:aws:s3:::{bucket}/*")),
            ],
        })
    }

    /// Parse a policy as returned by the store
    pub fn parse(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// Render the document as the JSON string sent to the store
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    fn grants(&self) -> BTreeSet<Grant> {
        let mut grants = BTreeSet::new();
        for statement in &self.statement {
            let condition = statement
                .condition
                .as_ref()
                .map(Value::to_string)
                .unwrap_or_default();
            for principal in statement.principal.normalized() {
                for action in statement.action.values() {
                    for resource in statement.resource.values() {
                        grants.insert((
                            statement.effect.clone(),
                            principal.clone(),
                            action.to_string(),
                            resource.to_string(),
                            condition.clone(),
                        ));
                    }
                }
            }
        }
        grants
    }

    /// Semantic equality ignoring ordering, value shape and statement ids
    #[must_use]
    pub fn equivalent(&self, other: &PolicyDocument) -> bool {
        self.grants() == other.grants()
    }
}

fn allow_statement(actions: Vec<&str>, resource: String) -> Statement {
    Statement {
        sid: None,
        effect: "Allow".to_string(),
        principal: Principal::anonymous(),
        action: OneOrMany::Many(actions.into_iter().map(str::to_string).collect()),
        resource: OneOrMany::Many(vec![resource]),
        condition: None,
    }
}

/// Whether the store's current policy text matches the desired canned policy
///
/// `current` is `None` when the bucket has no policy attached. An
/// unparseable current policy never matches.
#[must_use]
pub fn policy_matches(bucket: &str, current: Option<&str>, desired: BucketPolicy) -> bool {
    let current = match current.map(str::trim) {
        None | Some("") => None,
        Some(raw) => match PolicyDocument::parse(raw) {
            Ok(doc) => Some(doc),
            Err(_) => return false,
        },
    };

    match (current, PolicyDocument::canned(bucket, desired)) {
        (None, None) => true,
        (Some(current), None) => current.statement.is_empty(),
        (None, Some(_)) => false,
        (Some(current), Some(desired)) => current.equivalent(&desired),
    }
}
