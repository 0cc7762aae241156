//! S3-compatible object storage client.
//!
//! Works against any S3 API endpoint (Cloudflare R2, MinIO, AWS S3). Uploads
//! are bounded by a per-call timeout and wrapped in bounded retry with
//! exponential backoff; a timeout surfaces as the retryable
//! [`StorageError::Timeout`].

use std::time::Duration;

use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::{Builder, Region};
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use tracing::{debug, info};

use crate::error::{StorageError, StorageResult};
use crate::retry::{retry_async, RetryConfig};

/// Configuration for the object store client.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// S3 API endpoint URL
    pub endpoint_url: String,
    /// Access key ID
    pub access_key_id: String,
    /// Secret access key
    pub secret_access_key: String,
    /// Bucket name
    pub bucket_name: String,
    /// Region ("auto" for R2)
    pub region: String,
    /// Public base URL for stored objects, if the bucket is fronted by a CDN
    pub public_base_url: Option<String>,
    /// Per-call upload timeout
    pub upload_timeout: Duration,
    /// Retries around the upload call
    pub upload_retries: u32,
}

impl StorageConfig {
    /// Create config from environment variables.
    pub fn from_env() -> StorageResult<Self> {
        Ok(Self {
            endpoint_url: std::env::var("STORAGE_ENDPOINT_URL")
                .map_err(|_| StorageError::config_error("STORAGE_ENDPOINT_URL not set"))?,
            access_key_id: std::env::var("STORAGE_ACCESS_KEY_ID")
                .map_err(|_| StorageError::config_error("STORAGE_ACCESS_KEY_ID not set"))?,
            secret_access_key: std::env::var("STORAGE_SECRET_ACCESS_KEY")
                .map_err(|_| StorageError::config_error("STORAGE_SECRET_ACCESS_KEY not set"))?,
            bucket_name: std::env::var("STORAGE_BUCKET_NAME")
                .map_err(|_| StorageError::config_error("STORAGE_BUCKET_NAME not set"))?,
            region: std::env::var("STORAGE_REGION").unwrap_or_else(|_| "auto".to_string()),
            public_base_url: std::env::var("STORAGE_PUBLIC_BASE_URL").ok(),
            upload_timeout: Duration::from_secs(
                std::env::var("STORAGE_UPLOAD_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(60),
            ),
            upload_retries: std::env::var("STORAGE_UPLOAD_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(3),
        })
    }
}

/// Object storage client for video binaries.
#[derive(Clone)]
pub struct ObjectStore {
    client: Client,
    bucket: String,
    public_base_url: Option<String>,
    upload_timeout: Duration,
    upload_retries: u32,
}

impl ObjectStore {
    /// Create a new client from configuration.
    pub fn new(config: StorageConfig) -> Self {
        let credentials = Credentials::new(
            &config.access_key_id,
            &config.secret_access_key,
            None,
            None,
            "pulsestream",
        );

        let sdk_config = Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .endpoint_url(&config.endpoint_url)
            .region(Region::new(config.region))
            .credentials_provider(credentials)
            .force_path_style(true)
            .build();

        Self {
            client: Client::from_conf(sdk_config),
            bucket: config.bucket_name,
            public_base_url: config.public_base_url,
            upload_timeout: config.upload_timeout,
            upload_retries: config.upload_retries,
        }
    }

    /// Create from environment variables.
    pub fn from_env() -> StorageResult<Self> {
        Ok(Self::new(StorageConfig::from_env()?))
    }

    /// Upload bytes with timeout, bounded retry, and backoff.
    pub async fn upload_bytes(
        &self,
        data: Vec<u8>,
        key: &str,
        content_type: &str,
    ) -> StorageResult<()> {
        debug!("Uploading {} bytes to {}", data.len(), key);

        let retry = RetryConfig::new("storage_upload").with_max_retries(self.upload_retries);

        retry_async(&retry, StorageError::is_retryable, || {
            self.put_object_once(data.clone(), key, content_type)
        })
        .await?;

        info!("Uploaded {} bytes to {}", data.len(), key);
        Ok(())
    }

    async fn put_object_once(
        &self,
        data: Vec<u8>,
        key: &str,
        content_type: &str,
    ) -> StorageResult<()> {
        let put = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(data))
            .content_type(content_type)
            .send();

        match tokio::time::timeout(self.upload_timeout, put).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(StorageError::upload_failed(e.to_string())),
            Err(_) => Err(StorageError::Timeout(self.upload_timeout)),
        }
    }

    /// Delete an object. Deleting a missing object is not an error.
    pub async fn delete_object(&self, key: &str) -> StorageResult<()> {
        debug!("Deleting {}", key);

        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| StorageError::delete_failed(e.to_string()))?;

        Ok(())
    }

    /// Check if an object exists.
    pub async fn exists(&self, key: &str) -> StorageResult<bool> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(e) => {
                if e.to_string().contains("NotFound") || e.to_string().contains("NoSuchKey") {
                    Ok(false)
                } else {
                    Err(StorageError::AwsSdk(e.to_string()))
                }
            }
        }
    }

    /// Generate a presigned GET URL.
    pub async fn presign_get(&self, key: &str, expires_in: Duration) -> StorageResult<String> {
        let presign_config = PresigningConfig::expires_in(expires_in)
            .map_err(|e| StorageError::PresignFailed(e.to_string()))?;

        let presigned = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(presign_config)
            .await
            .map_err(|e| StorageError::PresignFailed(e.to_string()))?;

        Ok(presigned.uri().to_string())
    }

    /// Resolvable URL for a stored object.
    ///
    /// Uses the CDN base when configured, otherwise the raw endpoint path.
    pub fn object_url(&self, key: &str) -> String {
        match &self.public_base_url {
            Some(base) => format!("{}/{}", base.trim_end_matches('/'), key),
            None => format!("s3://{}/{}", self.bucket, key),
        }
    }

    /// Check connectivity by performing a head-bucket operation.
    pub async fn check_connectivity(&self) -> StorageResult<()> {
        self.client
            .head_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .map_err(|e| StorageError::AwsSdk(format!("storage connectivity check failed: {}", e)))?;
        Ok(())
    }
}

/// Object key for a video binary: `videos/<video_id>/<filename>`.
pub fn video_object_key(video_id: &str, filename: &str) -> String {
    // Strip any path components from the client-supplied filename.
    let name = filename.rsplit(['/', '\\']).next().unwrap_or(filename);
    format!("videos/{}/{}", video_id, name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_key_strips_path_components() {
        assert_eq!(
            video_object_key("abc", "../../etc/clip.mp4"),
            "videos/abc/clip.mp4"
        );
        assert_eq!(video_object_key("abc", "clip.mp4"), "videos/abc/clip.mp4");
    }
}
