//! Object storage for lesson audio
//!
//! Provides a persistent audio store backed by Cloudflare R2 / AWS S3, keyed
//! by deterministic object names so repeated runs never duplicate uploads.

use crate::config::Settings;
use async_trait::async_trait;
use aws_credential_types::Credentials;
use aws_sdk_s3::error::SdkError;
use aws_sdk_s3::operation::head_object::HeadObjectError;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use aws_types::region::Region;
use thiserror::Error;
use tracing::info;

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StorageError {
    /// Error querying object metadata in S3
    #[error("S3 head error: {0}")]
    S3Head(Box<SdkError<HeadObjectError>>),
    /// Error putting object into S3
    #[error("S3 put error: {0}")]
    S3Put(String),
    /// Configuration error (missing credentials, etc.)
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Returns the deterministic object name for a lesson number
#[must_use]
pub fn object_name(id: u32) -> String {
    format!("Lesson_{id}.mp3")
}

/// Interface for the audio object store
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AudioStore: Send + Sync {
    /// Look up an object by its deterministic name, returning its identifier
    /// when it exists
    async fn find_by_name(&self, name: &str) -> Result<Option<String>, StorageError>;
    /// Upload a payload under the given name, returning the new identifier
    async fn upload(&self, name: &str, bytes: Vec<u8>) -> Result<String, StorageError>;
    /// Build the stable retrieval link for an object identifier
    fn public_url(&self, identifier: &str) -> String;
}

/// R2-backed audio store implementation
pub struct R2Storage {
    client: Client,
    bucket: String,
    prefix: Option<String>,
    public_base_url: String,
}

impl R2Storage {
    /// Create a new R2 storage instance scoped to the configured bucket and
    /// key prefix.
    ///
    /// # Errors
    ///
    /// Returns an error if R2 configuration is missing.
    pub async fn new(settings: &Settings) -> Result<Self, StorageError> {
        let endpoint_url = settings
            .r2_endpoint_url
            .as_ref()
            .ok_or_else(|| StorageError::Config("R2_ENDPOINT_URL is missing".into()))?;
        let access_key = settings
            .r2_access_key_id
            .as_ref()
            .ok_or_else(|| StorageError::Config("R2_ACCESS_KEY_ID is missing".into()))?;
        let secret_key = settings
            .r2_secret_access_key
            .as_ref()
            .ok_or_else(|| StorageError::Config("R2_SECRET_ACCESS_KEY is missing".into()))?;
        let bucket = settings
            .r2_bucket_name
            .as_ref()
            .ok_or_else(|| StorageError::Config("R2_BUCKET_NAME is missing".into()))?;
        let public_base_url = settings
            .r2_public_base_url
            .as_ref()
            .ok_or_else(|| StorageError::Config("R2_PUBLIC_BASE_URL is missing".into()))?;

        let credentials = Credentials::new(access_key, secret_key, None, None, "r2-storage");

        let sdk_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .credentials_provider(credentials)
            .region(Region::new("auto"))
            .load()
            .await;

        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .endpoint_url(endpoint_url)
            .force_path_style(true)
            .build();

        let client = Client::from_conf(s3_config);

        Ok(Self {
            client,
            bucket: bucket.clone(),
            prefix: settings.r2_prefix.clone(),
            public_base_url: public_base_url.clone(),
        })
    }

    /// Full object key for a deterministic name within the configured prefix
    fn object_key(&self, name: &str) -> String {
        self.prefix
            .as_ref()
            .map_or_else(|| name.to_string(), |prefix| format!("{prefix}/{name}"))
    }
}

#[async_trait]
impl AudioStore for R2Storage {
    /// Check whether an object with the deterministic name already exists
    async fn find_by_name(&self, name: &str) -> Result<Option<String>, StorageError> {
        let key = self.object_key(name);
        let result = self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(&key)
            .send()
            .await;

        match result {
            Ok(_) => Ok(Some(key)),
            Err(SdkError::ServiceError(err)) if err.err().is_not_found() => Ok(None),
            Err(e) => Err(StorageError::S3Head(Box::new(e))),
        }
    }

    /// Upload an audio payload under the deterministic name
    async fn upload(&self, name: &str, bytes: Vec<u8>) -> Result<String, StorageError> {
        let key = self.object_key(name);
        let size = bytes.len();

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(ByteStream::from(bytes))
            .content_type("audio/mpeg")
            .send()
            .await
            .map_err(|e| StorageError::S3Put(e.to_string()))?;

        info!(%key, size, "Uploaded audio object");
        Ok(key)
    }

    /// Retrieval link served to the web player
    fn public_url(&self, identifier: &str) -> String {
        format!(
            "{}/{identifier}",
            self.public_base_url.trim_end_matches('/')
        )
    }
}
