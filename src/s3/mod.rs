//! Object storage
//!
//! `ObjectStore` is the narrow put-only interface the upload pipeline needs.
//! `S3Client` implements it with the AWS SDK; any S3-compatible service works
//! through a custom endpoint.
//!
//! Retrieval URLs are not returned by the store. They are built from the
//! bucket, region and key with [`object_url`], all known before the put.
//!
//! # Example
//!
//! ```no_run
//! use tubely_ingest::s3::{object_url, ObjectStore, S3Client, S3ClientConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = S3ClientConfig {
//!     bucket: "tubely-videos".to_string(),
//!     region: "us-east-2".to_string(),
//!     endpoint: None,
//!     access_key: None,
//!     secret_key: None,
//! };
//! let client = S3Client::new(config).await?;
//!
//! let file = tokio::fs::File::open("clip.mp4").await?;
//! client
//!     .put_object("tubely-videos", "landscape/abc.mp4", file, "video/mp4")
//!     .await?;
//! println!("{}", object_url("tubely-videos", "us-east-2", "landscape/abc.mp4"));
//! # Ok(())
//! # }
//! ```

use crate::config::S3Config;
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::error::{DisplayErrorContext, SdkError};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use thiserror::Error;

/// Object store errors
#[derive(Error, Debug)]
pub enum ObjectStoreError {
    #[error("Object store unavailable: {0}")]
    Unavailable(String),

    #[error("Put failed: {0}")]
    PutFailed(String),
}

/// Put-only object storage
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Stream `body` from its current position into `bucket` under `key`
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: tokio::fs::File,
        content_type: &str,
    ) -> Result<(), ObjectStoreError>;
}

/// Public retrieval URL for an object
pub fn object_url(bucket: &str, region: &str, key: &str) -> String {
    format!("https://{}.s3.{}.amazonaws.com/{}", bucket, region, key)
}

/// S3 client configuration
#[derive(Debug, Clone)]
pub struct S3ClientConfig {
    pub bucket: String,
    pub region: String,
    pub endpoint: Option<String>,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
}

impl From<&S3Config> for S3ClientConfig {
    fn from(config: &S3Config) -> Self {
        Self {
            bucket: config.bucket.clone(),
            region: config.region.clone(),
            endpoint: config.endpoint.clone(),
            access_key: config.access_key.clone(),
            secret_key: config.secret_key.clone(),
        }
    }
}

/// AWS SDK backed object store
#[derive(Clone)]
pub struct S3Client {
    client: Client,
}

impl S3Client {
    /// Create a new S3 client
    ///
    /// Static credentials are used when both keys are configured; otherwise
    /// the SDK default provider chain applies.
    pub async fn new(config: S3ClientConfig) -> Result<Self, ObjectStoreError> {
        let region = Region::new(config.region.clone());
        let mut loader = aws_config::defaults(BehaviorVersion::latest()).region(region.clone());

        match (&config.access_key, &config.secret_key) {
            (Some(access_key), Some(secret_key)) => {
                let credentials = Credentials::new(
                    access_key.clone(),
                    secret_key.clone(),
                    None,
                    None,
                    "tubely-static",
                );
                loader = loader.credentials_provider(credentials);
            }
            (None, None) => {}
            _ => {
                return Err(ObjectStoreError::Unavailable(
                    "access_key and secret_key must be configured together".into(),
                ))
            }
        }

        let shared_config = loader.load().await;
        let mut builder = aws_sdk_s3::config::Builder::from(&shared_config).region(region);
        if let Some(ref endpoint) = config.endpoint {
            builder = builder
                .endpoint_url(endpoint.trim_end_matches('/'))
                .force_path_style(true);
        }

        Ok(Self {
            client: Client::from_conf(builder.build()),
        })
    }
}

#[async_trait]
impl ObjectStore for S3Client {
    #[tracing::instrument(
        name = "s3.put_object",
        skip(self, body),
        fields(
            s3.bucket = %bucket,
            s3.key = %key,
            http.content_type = %content_type
        ),
        err
    )]
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: tokio::fs::File,
        content_type: &str,
    ) -> Result<(), ObjectStoreError> {
        let body = ByteStream::read_from()
            .file(body)
            .build()
            .await
            .map_err(|e| ObjectStoreError::Unavailable(e.to_string()))?;

        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(body)
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| {
                let message = DisplayErrorContext(&e).to_string();
                match e {
                    SdkError::DispatchFailure(_) | SdkError::TimeoutError(_) => {
                        ObjectStoreError::Unavailable(message)
                    }
                    _ => ObjectStoreError::PutFailed(message),
                }
            })?;

        tracing::info!("PutObject completed");
        Ok(())
    }
}
