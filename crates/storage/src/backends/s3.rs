//! S3-compatible storage backend using AWS SDK.

use crate::error::{StorageError, StorageResult};
use crate::traits::{
    ObjectMeta, ObjectStore, ObjectSummary, RestoreStatus, RetrievalTier, StorageClass,
};
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_credential_types::provider::ProvideCredentials;
use aws_credential_types::provider::error::CredentialsError;
use aws_credential_types::provider::future::ProvideCredentials as ProvideCredentialsFuture;
use aws_sdk_s3::Client;
use aws_sdk_s3::error::ProvideErrorMetadata;
use aws_sdk_s3::types::{
    BucketLocationConstraint, CreateBucketConfiguration, GlacierJobParameters, MetadataDirective,
    RestoreRequest, Tier,
};
use aws_smithy_http_client::Builder as SmithyHttpClientBuilder;
use deepfreeze_core::config::ObjectStoreConfig;
use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::instrument;

/// Region used when none is configured. Buckets in this region are created
/// without a location constraint.
const DEFAULT_REGION: &str = "us-east-1";

/// Marker included in lazy-credentials initialization errors so we can map them
/// to actionable storage config errors instead of generic S3 transport failures.
const CREDENTIALS_INIT_ERROR_MARKER: &str = "deepfreeze-s3-lazy-credentials-init";
const CREDENTIALS_RESOLVE_ERROR_MARKER: &str = "deepfreeze-s3-lazy-credentials-resolve";

/// Lazily initializes the AWS default credentials chain on first signed request.
///
/// This avoids constructor-time side effects (notably TLS/native-root initialization)
/// in environments where no root certificates are available.
#[derive(Debug)]
struct LazyDefaultCredentialsProvider {
    region: String,
    chain: OnceCell<aws_config::default_provider::credentials::DefaultCredentialsChain>,
}

impl LazyDefaultCredentialsProvider {
    fn new(region: String) -> Self {
        Self {
            region,
            chain: OnceCell::new(),
        }
    }

    async fn build_chain(
        &self,
    ) -> Result<aws_config::default_provider::credentials::DefaultCredentialsChain, CredentialsError>
    {
        let region = aws_config::Region::new(self.region.clone());

        tokio::task::spawn(async move {
            aws_config::default_provider::credentials::DefaultCredentialsChain::builder()
                .region(region)
                .build()
                .await
        })
        .await
        .map_err(|join_err| {
            CredentialsError::provider_error(format!(
                "{CREDENTIALS_INIT_ERROR_MARKER}: failed to initialize AWS default credential chain: {join_err}"
            ))
        })
    }

    async fn chain(
        &self,
    ) -> Result<&aws_config::default_provider::credentials::DefaultCredentialsChain, CredentialsError>
    {
        self.chain
            .get_or_try_init(|| async { self.build_chain().await })
            .await
    }

    async fn credentials(&self) -> aws_credential_types::provider::Result {
        let chain = self.chain().await?;
        chain.provide_credentials().await.map_err(|err| {
            CredentialsError::provider_error(format!(
                "{CREDENTIALS_RESOLVE_ERROR_MARKER}: default AWS credentials resolution failed: {err}"
            ))
        })
    }
}

impl ProvideCredentials for LazyDefaultCredentialsProvider {
    fn provide_credentials<'a>(&'a self) -> ProvideCredentialsFuture<'a>
    where
        Self: 'a,
    {
        ProvideCredentialsFuture::new(self.credentials())
    }
}

fn map_s3_operation_error<E>(err: aws_sdk_s3::error::SdkError<E>) -> StorageError
where
    E: std::error::Error + Send + Sync + 'static,
{
    let err_text = err.to_string();
    if err_text.contains(CREDENTIALS_INIT_ERROR_MARKER)
        || err_text.contains(CREDENTIALS_RESOLVE_ERROR_MARKER)
    {
        return StorageError::Config(
            "S3 credential initialization failed. Configure AWS credentials explicitly or ensure ambient AWS credentials and trust roots are available."
                .to_string(),
        );
    }

    StorageError::S3(Box::new(err))
}

fn is_status<E>(err: &aws_sdk_s3::error::SdkError<E>, status: u16) -> bool {
    matches!(
        err,
        aws_sdk_s3::error::SdkError::ServiceError(service_err)
            if service_err.raw().status().as_u16() == status
    )
}

/// Add `http://` to bare `host:port` endpoints.
fn normalize_endpoint(endpoint_url: &str) -> String {
    let endpoint_lower = endpoint_url.to_lowercase();
    if endpoint_lower.starts_with("http://") || endpoint_lower.starts_with("https://") {
        endpoint_url.to_string()
    } else {
        format!("http://{}", endpoint_url)
    }
}

/// S3-compatible object store using AWS SDK.
pub struct S3Backend {
    client: Client,
    /// Normalized endpoint, or the canonical AWS endpoint for the region.
    endpoint: String,
    region: String,
}

impl std::fmt::Debug for S3Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3Backend")
            .field("endpoint", &self.endpoint)
            .field("region", &self.region)
            .finish_non_exhaustive()
    }
}

impl S3Backend {
    /// Create a new S3 backend.
    ///
    /// # Arguments
    /// * `force_path_style` - Use path-style URLs (`endpoint/bucket/key`) instead of
    ///   virtual-hosted style (`bucket.endpoint/key`). Required for MinIO and some
    ///   S3-compatible services.
    pub fn new(
        endpoint: Option<String>,
        region: Option<String>,
        access_key_id: Option<String>,
        secret_access_key: Option<String>,
        force_path_style: bool,
    ) -> StorageResult<Self> {
        if access_key_id.is_some() ^ secret_access_key.is_some() {
            return Err(StorageError::Config(
                "s3 config requires both access_key_id and secret_access_key when either is set"
                    .to_string(),
            ));
        }

        let resolved_region = region.unwrap_or_else(|| DEFAULT_REGION.to_string());
        let mut s3_config_builder = aws_sdk_s3::config::Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(aws_config::Region::new(resolved_region.clone()));

        if let (Some(key_id), Some(secret)) = (access_key_id, secret_access_key) {
            let credentials = aws_sdk_s3::config::Credentials::new(
                key_id,
                secret,
                None, // session token
                None, // expiration
                "deepfreeze-config",
            );
            s3_config_builder = s3_config_builder.credentials_provider(credentials);
        } else {
            s3_config_builder = s3_config_builder
                .credentials_provider(LazyDefaultCredentialsProvider::new(resolved_region.clone()));
        }

        let normalized_endpoint = endpoint.as_deref().map(normalize_endpoint);

        if let Some(endpoint_url) = &normalized_endpoint {
            s3_config_builder = s3_config_builder.endpoint_url(endpoint_url);

            // Plain HTTP endpoints (local MinIO) get an HTTP-only client so SDK
            // initialization doesn't depend on native trust roots.
            if endpoint_url.to_ascii_lowercase().starts_with("http://") {
                s3_config_builder =
                    s3_config_builder.http_client(SmithyHttpClientBuilder::new().build_http());
            }
        }

        if force_path_style {
            s3_config_builder = s3_config_builder.force_path_style(true);
        }

        let client = Client::from_conf(s3_config_builder.build());

        let stored_endpoint = match normalized_endpoint {
            Some(url) => url,
            None => format!("s3.{}.amazonaws.com", resolved_region),
        };

        Ok(Self {
            client,
            endpoint: stored_endpoint,
            region: resolved_region,
        })
    }

    /// Create a backend from the `[object_store]` configuration section.
    pub fn from_config(config: &ObjectStoreConfig) -> StorageResult<Self> {
        config.validate().map_err(StorageError::Config)?;
        Self::new(
            config.endpoint.clone(),
            config.region.clone(),
            config.access_key_id.clone(),
            config.secret_access_key.clone(),
            config.force_path_style,
        )
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    /// `CopySource` value for copying an object onto itself.
    ///
    /// The key portion is URL-encoded; the bucket name and separator are not.
    fn copy_source(bucket: &str, key: &str) -> String {
        let encoded_key = utf8_percent_encode(key, NON_ALPHANUMERIC).to_string();
        format!("{}/{}", bucket, encoded_key)
    }
}

#[async_trait]
impl ObjectStore for S3Backend {
    fn backend_name(&self) -> &'static str {
        "s3"
    }

    #[instrument(skip(self), fields(backend = "s3"))]
    async fn create_bucket(&self, bucket: &str) -> StorageResult<()> {
        let mut request = self.client.create_bucket().bucket(bucket);
        if self.region != DEFAULT_REGION {
            request = request.create_bucket_configuration(
                CreateBucketConfiguration::builder()
                    .location_constraint(BucketLocationConstraint::from(self.region.as_str()))
                    .build(),
            );
        }

        match request.send().await {
            Ok(_) => {
                tracing::info!(bucket = %bucket, region = %self.region, "created bucket");
                Ok(())
            }
            Err(err) => {
                if let Some(service_err) = err.as_service_error() {
                    if service_err.is_bucket_already_owned_by_you() {
                        tracing::info!(bucket = %bucket, "bucket already exists and is owned by us");
                        return Ok(());
                    }
                    if service_err.is_bucket_already_exists() {
                        return Err(StorageError::BucketAlreadyExists(bucket.to_string()));
                    }
                }
                Err(map_s3_operation_error(err))
            }
        }
    }

    #[instrument(skip(self), fields(backend = "s3"))]
    async fn bucket_exists(&self, bucket: &str) -> StorageResult<bool> {
        match self.client.head_bucket().bucket(bucket).send().await {
            Ok(_) => Ok(true),
            Err(err) if is_status(&err, 404) => Ok(false),
            Err(err) => Err(map_s3_operation_error(err)),
        }
    }

    #[instrument(skip(self), fields(backend = "s3"))]
    async fn delete_bucket(&self, bucket: &str) -> StorageResult<()> {
        match self.client.delete_bucket().bucket(bucket).send().await {
            Ok(_) => Ok(()),
            Err(err) if is_status(&err, 404) => Err(StorageError::BucketNotFound(bucket.to_string())),
            Err(err) if err.code() == Some("BucketNotEmpty") => {
                Err(StorageError::BucketNotEmpty(bucket.to_string()))
            }
            Err(err) => Err(map_s3_operation_error(err)),
        }
    }

    #[instrument(skip(self), fields(backend = "s3"))]
    async fn list_buckets(&self, prefix: &str) -> StorageResult<Vec<String>> {
        let output = self
            .client
            .list_buckets()
            .send()
            .await
            .map_err(map_s3_operation_error)?;

        let mut names: Vec<String> = output
            .buckets()
            .iter()
            .filter_map(|bucket| bucket.name())
            .filter(|name| name.starts_with(prefix))
            .map(str::to_string)
            .collect();
        names.sort();
        Ok(names)
    }

    #[instrument(skip(self), fields(backend = "s3"))]
    async fn list_objects(&self, bucket: &str, prefix: &str) -> StorageResult<Vec<ObjectSummary>> {
        let mut results = Vec::new();
        let mut continuation_token: Option<String> = None;

        loop {
            let mut request = self.client.list_objects_v2().bucket(bucket).prefix(prefix);

            if let Some(token) = continuation_token.take() {
                request = request.continuation_token(token);
            }

            let output = match request.send().await {
                Ok(output) => output,
                Err(err) if is_status(&err, 404) => {
                    return Err(StorageError::BucketNotFound(bucket.to_string()));
                }
                Err(err) => return Err(map_s3_operation_error(err)),
            };

            for obj in output.contents() {
                if let Some(key) = obj.key() {
                    results.push(ObjectSummary {
                        key: key.to_string(),
                        size: obj.size().unwrap_or(0).max(0) as u64,
                        storage_class: StorageClass::parse(
                            obj.storage_class().map(|c| c.as_str()).unwrap_or_default(),
                        ),
                    });
                }
            }

            if output.is_truncated() == Some(true) {
                continuation_token = output.next_continuation_token().map(|s| s.to_string());
            } else {
                break;
            }
        }

        tracing::debug!(bucket = %bucket, prefix = %prefix, count = results.len(), "listed objects");
        Ok(results)
    }

    #[instrument(skip(self), fields(backend = "s3"))]
    async fn head_object(&self, bucket: &str, key: &str) -> StorageResult<ObjectMeta> {
        let output = match self.client.head_object().bucket(bucket).key(key).send().await {
            Ok(output) => output,
            Err(err) if is_status(&err, 404) => {
                return Err(StorageError::NotFound(format!("{bucket}/{key}")));
            }
            Err(err) => return Err(map_s3_operation_error(err)),
        };

        Ok(ObjectMeta {
            size: output.content_length().unwrap_or(0).max(0) as u64,
            storage_class: StorageClass::parse(
                output.storage_class().map(|c| c.as_str()).unwrap_or_default(),
            ),
            restore: RestoreStatus::from_restore_header(output.restore()),
        })
    }

    #[instrument(skip(self), fields(backend = "s3"))]
    async fn restore_object(
        &self,
        bucket: &str,
        key: &str,
        days: u32,
        tier: RetrievalTier,
    ) -> StorageResult<()> {
        let job = GlacierJobParameters::builder()
            .tier(Tier::from(tier.as_str()))
            .build()
            .map_err(|e| StorageError::S3(Box::new(e)))?;
        let request = RestoreRequest::builder()
            .days(i32::try_from(days).unwrap_or(i32::MAX))
            .glacier_job_parameters(job)
            .build();

        match self
            .client
            .restore_object()
            .bucket(bucket)
            .key(key)
            .restore_request(request)
            .send()
            .await
        {
            Ok(_) => Ok(()),
            Err(err) if err.code() == Some("RestoreAlreadyInProgress") => {
                tracing::debug!(bucket = %bucket, key = %key, "restore already in progress");
                Ok(())
            }
            Err(err) if is_status(&err, 404) => {
                Err(StorageError::NotFound(format!("{bucket}/{key}")))
            }
            Err(err) => Err(map_s3_operation_error(err)),
        }
    }

    #[instrument(skip(self), fields(backend = "s3", class = %class))]
    async fn copy_object_with_storage_class(
        &self,
        bucket: &str,
        key: &str,
        class: &StorageClass,
    ) -> StorageResult<()> {
        match self
            .client
            .copy_object()
            .bucket(bucket)
            .key(key)
            .copy_source(Self::copy_source(bucket, key))
            .storage_class(aws_sdk_s3::types::StorageClass::from(class.as_str()))
            .metadata_directive(MetadataDirective::Copy)
            .send()
            .await
        {
            Ok(_) => Ok(()),
            Err(err) if is_status(&err, 404) => {
                Err(StorageError::NotFound(format!("{bucket}/{key}")))
            }
            Err(err) => Err(map_s3_operation_error(err)),
        }
    }

    #[instrument(skip(self), fields(backend = "s3"))]
    async fn health_check(&self) -> StorageResult<()> {
        const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(10);

        let probe = async {
            self.client
                .list_buckets()
                .send()
                .await
                .map(|_| ())
                .map_err(map_s3_operation_error)
        };

        tokio::time::timeout(HEALTH_CHECK_TIMEOUT, probe)
            .await
            .map_err(|_| {
                StorageError::Io(std::io::Error::new(
                    std::io::ErrorKind::TimedOut,
                    "S3 health check timed out after 10 seconds",
                ))
            })?
    }
}
