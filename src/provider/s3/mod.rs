//! # S3 Bucket Store
//!
//! [`BucketStore`] backed by the AWS S3 SDK. Works against AWS S3 and any
//! S3-compatible endpoint (MinIO, Ceph RGW) through `STORE_ENDPOINT`.
//!
//! Credentials come from `STORE_ACCESS_KEY_ID`/`STORE_SECRET_ACCESS_KEY` when
//! both are set, otherwise from the default AWS credential chain (IRSA, env,
//! instance profile).

pub mod policy;

use crate::config::StoreConfig;
use crate::constants::DEFAULT_STORE_REGION;
use crate::crd::{BucketPolicy, BucketRegion};
use crate::provider::common::{generate_bucket_name, record_store_metrics};
use crate::provider::{BucketStore, StoreError, StoreOperation};
use anyhow::Result;
use async_trait::async_trait;
use aws_credential_types::Credentials;
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::types::{
    BucketLocationConstraint, CreateBucketConfiguration, Delete, ObjectIdentifier,
};
use aws_sdk_s3::Client as S3Client;
use policy::{policy_matches, PolicyDocument};
use std::time::Instant;
use tracing::{debug, info, info_span, Instrument};

const CREDENTIALS_PROVIDER_NAME: &str = "bucket-controller";

/// S3 implementation of [`BucketStore`]
pub struct S3BucketStore {
    client: S3Client,
    default_region: String,
    name_prefix: String,
}

impl std::fmt::Debug for S3BucketStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3BucketStore")
            .field("default_region", &self.default_region)
            .field("name_prefix", &self.name_prefix)
            .finish_non_exhaustive()
    }
}

impl S3BucketStore {
    /// Build the S3 client once from the store configuration
    #[allow(
        clippy::missing_errors_doc,
        reason = "Error documentation is provided in doc comments"
    )]
    pub async fn new(config: &StoreConfig) -> Result<Self> {
        let region = if config.region.is_empty() {
            DEFAULT_STORE_REGION.to_string()
        } else {
            config.region.clone()
        };

        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(region.clone()));

        if let Some((access_key_id, secret_access_key)) = config.static_credentials() {
            info!("Using static credentials for bucket store");
            loader = loader.credentials_provider(Credentials::new(
                access_key_id,
                secret_access_key,
                None,
                None,
                CREDENTIALS_PROVIDER_NAME,
            ));
        } else {
            info!("No static credentials configured, using default AWS credential chain");
        }

        let sdk_config = loader.load().await;

        let mut builder =
            aws_sdk_s3::config::Builder::from(&sdk_config).force_path_style(config.force_path_style);
        if let Some(endpoint) = &config.endpoint {
            info!("Using bucket store endpoint: {}", endpoint);
            builder = builder.endpoint_url(endpoint);
        }

        Ok(Self {
            client: S3Client::from_conf(builder.build()),
            default_region: region,
            name_prefix: config.bucket_name_prefix.clone(),
        })
    }

    /// Delete every object so the bucket itself can be removed
    ///
    /// Returns `Ok(false)` if the bucket no longer exists.
    async fn empty_bucket(&self, bucket: &str) -> Result<bool, StoreError> {
        loop {
            let listing = match self
                .client
                .list_objects_v2()
                .bucket(bucket)
                .max_keys(1000)
                .send()
                .await
            {
                Ok(listing) => listing,
                Err(e) if is_no_such_bucket(&e) => return Ok(false),
                Err(e) => return Err(store_error(StoreOperation::DeleteBucket, bucket, e)),
            };

            let objects = listing.contents();
            if objects.is_empty() {
                return Ok(true);
            }

            debug!("Deleting {} objects from bucket {}", objects.len(), bucket);
            let identifiers = objects
                .iter()
                .filter_map(|object| object.key())
                .map(|key| ObjectIdentifier::builder().key(key).build())
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| StoreError::new(StoreOperation::DeleteBucket, bucket, e))?;
            let batch = Delete::builder()
                .set_objects(Some(identifiers))
                .quiet(true)
                .build()
                .map_err(|e| StoreError::new(StoreOperation::DeleteBucket, bucket, e))?;

            let response = self
                .client
                .delete_objects()
                .bucket(bucket)
                .delete(batch)
                .send()
                .await
                .map_err(|e| store_error(StoreOperation::DeleteBucket, bucket, e))?;

            if let Some(failed) = response.errors().first() {
                return Err(StoreError::new(
                    StoreOperation::DeleteBucket,
                    bucket,
                    format!(
                        "failed to delete object '{}': {}",
                        failed.key().unwrap_or_default(),
                        failed.message().unwrap_or_default()
                    ),
                ));
            }
        }
    }
}

#[async_trait]
impl BucketStore for S3BucketStore {
    async fn create_bucket(
        &self,
        namespace: &str,
        name: &str,
        region: Option<BucketRegion>,
    ) -> Result<String, StoreError> {
        let bucket = generate_bucket_name(&self.name_prefix, namespace, name);
        let region = region.map_or_else(|| self.default_region.clone(), |r| r.as_str().to_string());
        let span = info_span!(
            "s3.bucket.create",
            bucket.name = bucket.as_str(),
            region = region.as_str()
        );
        let start = Instant::now();

        async move {
            let mut request = self.client.create_bucket().bucket(&bucket);

            // us-east-1 is the implicit location and must not be sent as a constraint
            if region != DEFAULT_STORE_REGION {
                let constraint = BucketLocationConstraint::from(region.as_str());
                let configuration = CreateBucketConfiguration::builder()
                    .location_constraint(constraint)
                    .build();
                request = request.create_bucket_configuration(configuration);
            }

            match request.send().await {
                Ok(_) => {
                    info!("Created bucket {} in region {}", bucket, region);
                    record_store_metrics(StoreOperation::CreateBucket, true, start);
                    Ok(bucket)
                }
                Err(e) if service_code(&e) == Some("BucketAlreadyOwnedByYou") => {
                    debug!("Bucket {} already owned by this account", bucket);
                    record_store_metrics(StoreOperation::CreateBucket, true, start);
                    Ok(bucket)
                }
                Err(e) => {
                    record_store_metrics(StoreOperation::CreateBucket, false, start);
                    Err(store_error(StoreOperation::CreateBucket, &bucket, e))
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn bucket_exists(&self, bucket: &str) -> Result<bool, StoreError> {
        let start = Instant::now();
        match self.client.head_bucket().bucket(bucket).send().await {
            Ok(_) => {
                record_store_metrics(StoreOperation::BucketExists, true, start);
                Ok(true)
            }
            Err(e)
                if e.as_service_error().is_some_and(|s| s.is_not_found())
                    || is_no_such_bucket(&e) =>
            {
                record_store_metrics(StoreOperation::BucketExists, true, start);
                Ok(false)
            }
            Err(e) => {
                record_store_metrics(StoreOperation::BucketExists, false, start);
                Err(store_error(StoreOperation::BucketExists, bucket, e))
            }
        }
    }

    async fn compare_bucket_policy(
        &self,
        bucket: &str,
        policy: BucketPolicy,
    ) -> Result<bool, StoreError> {
        let start = Instant::now();
        let current = match self.client.get_bucket_policy().bucket(bucket).send().await {
            Ok(output) => output.policy().map(ToString::to_string),
            Err(e) if service_code(&e) == Some("NoSuchBucketPolicy") => None,
            Err(e) => {
                record_store_metrics(StoreOperation::ComparePolicy, false, start);
                return Err(store_error(StoreOperation::ComparePolicy, bucket, e));
            }
        };

        record_store_metrics(StoreOperation::ComparePolicy, true, start);
        let matches = policy_matches(bucket, current.as_deref(), policy);
        debug!(
            "Policy of bucket {} {} desired '{}'",
            bucket,
            if matches { "matches" } else { "differs from" },
            policy
        );
        Ok(matches)
    }

    async fn set_bucket_policy(
        &self,
        bucket: &str,
        policy: BucketPolicy,
    ) -> Result<(), StoreError> {
        let span = info_span!(
            "s3.bucket.set_policy",
            bucket.name = bucket,
            policy = policy.as_str()
        );
        let start = Instant::now();

        async move {
            let result = match PolicyDocument::canned(bucket, policy) {
                None => self
                    .client
                    .delete_bucket_policy()
                    .bucket(bucket)
                    .send()
                    .await
                    .map(|_| ())
                    .or_else(|e| {
                        if service_code(&e) == Some("NoSuchBucketPolicy") {
                            Ok(())
                        } else {
                            Err(store_error(StoreOperation::SetPolicy, bucket, e))
                        }
                    }),
                Some(document) => {
                    let body = document
                        .to_json()
                        .map_err(|e| StoreError::new(StoreOperation::SetPolicy, bucket, e))?;
                    self.client
                        .put_bucket_policy()
                        .bucket(bucket)
                        .policy(body)
                        .send()
                        .await
                        .map(|_| ())
                        .map_err(|e| store_error(StoreOperation::SetPolicy, bucket, e))
                }
            };

            record_store_metrics(StoreOperation::SetPolicy, result.is_ok(), start);
            if result.is_ok() {
                info!("Applied policy '{}' to bucket {}", policy, bucket);
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn delete_bucket(&self, bucket: &str) -> Result<(), StoreError> {
        let span = info_span!("s3.bucket.delete", bucket.name = bucket);
        let start = Instant::now();

        async move {
            let result: Result<(), StoreError> = async {
                if !self.empty_bucket(bucket).await? {
                    debug!("Bucket {} already gone", bucket);
                    return Ok(());
                }

                match self.client.delete_bucket().bucket(bucket).send().await {
                    Ok(_) => {
                        info!("Deleted bucket {}", bucket);
                        Ok(())
                    }
                    Err(e) if is_no_such_bucket(&e) => Ok(()),
                    Err(e) => Err(store_error(StoreOperation::DeleteBucket, bucket, e)),
                }
            }
            .await;

            record_store_metrics(StoreOperation::DeleteBucket, result.is_ok(), start);
            result
        }
        .instrument(span)
        .await
    }
}

fn service_code<E, R>(err: &SdkError<E, R>) -> Option<&str>
where
    E: ProvideErrorMetadata,
{
    err.as_service_error().and_then(|e| e.code())
}

fn is_no_such_bucket<E, R>(err: &SdkError<E, R>) -> bool
where
    E: ProvideErrorMetadata,
{
    service_code(err) == Some("NoSuchBucket")
}

fn store_error<E>(operation: StoreOperation, bucket: &str, err: E) -> StoreError
where
    E: std::error::Error + Send + Sync + 'static,
{
    StoreError::new(
        operation,
        bucket,
        anyhow::anyhow!("{}", DisplayErrorContext(&err)),
    )
}
