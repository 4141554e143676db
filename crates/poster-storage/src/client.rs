//! S3-compatible object store client.

use std::time::Duration;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::{Builder, Region};
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::ObjectCannedAcl;
use aws_sdk_s3::Client;
use tracing::{debug, info};

use crate::error::{StorageError, StorageResult};

/// Remote object store operations used by the asset tiers.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn upload(&self, key: &str, data: Vec<u8>, content_type: &str) -> StorageResult<()>;

    /// Grant anonymous read access to an uploaded object.
    async fn make_public(&self, key: &str) -> StorageResult<()>;

    /// URL of a public object.
    fn public_url(&self, key: &str) -> String;

    /// Temporary signed GET URL.
    async fn presign_get(&self, key: &str, expires_in: Duration) -> StorageResult<String>;

    /// Download an object. Missing keys are `NotFound`.
    async fn download(&self, key: &str) -> StorageResult<Vec<u8>>;

    fn name(&self) -> &'static str;
}

/// Configuration for an S3-compatible bucket.
#[derive(Debug, Clone)]
pub struct S3Config {
    /// S3 API endpoint; `None` uses AWS
    pub endpoint_url: Option<String>,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub bucket_name: String,
    /// Region ("auto" for R2, "us-east-1" for MinIO and GCS interop)
    pub region: String,
    /// Public URL prefix for objects, e.g. a CDN domain
    pub public_base_url: Option<String>,
}

impl S3Config {
    /// Create config from environment variables.
    pub fn from_env() -> StorageResult<Self> {
        let optional = |key: &str| std::env::var(key).ok().filter(|v| !v.trim().is_empty());

        Ok(Self {
            endpoint_url: optional("S3_ENDPOINT_URL"),
            access_key_id: optional("S3_ACCESS_KEY_ID")
                .ok_or_else(|| StorageError::config_error("S3_ACCESS_KEY_ID not set"))?,
            secret_access_key: optional("S3_SECRET_ACCESS_KEY")
                .ok_or_else(|| StorageError::config_error("S3_SECRET_ACCESS_KEY not set"))?,
            bucket_name: optional("S3_BUCKET_NAME")
                .ok_or_else(|| StorageError::config_error("S3_BUCKET_NAME not set"))?,
            region: optional("S3_REGION").unwrap_or_else(|| "auto".to_string()),
            public_base_url: optional("S3_PUBLIC_BASE_URL"),
        })
    }

    /// URL under which a public object is served.
    pub fn public_url(&self, key: &str) -> String {
        match (&self.public_base_url, &self.endpoint_url) {
            (Some(base), _) => format!("{}/{}", base.trim_end_matches('/'), key),
            (None, Some(endpoint)) => {
                format!("{}/{}/{}", endpoint.trim_end_matches('/'), self.bucket_name, key)
            }
            (None, None) => format!(
                "https://{}.s3.{}.amazonaws.com/{}",
                self.bucket_name, self.region, key
            ),
        }
    }
}

/// Object store client built on `aws-sdk-s3`.
#[derive(Clone)]
pub struct S3Client {
    client: Client,
    config: S3Config,
}

impl S3Client {
    pub async fn new(config: S3Config) -> StorageResult<Self> {
        let credentials = Credentials::new(
            &config.access_key_id,
            &config.secret_access_key,
            None,
            None,
            "poster-storage",
        );

        let mut builder = Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .credentials_provider(credentials);
        if let Some(endpoint) = &config.endpoint_url {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        Ok(Self {
            client: Client::from_conf(builder.build()),
            config,
        })
    }

    pub fn bucket(&self) -> &str {
        &self.config.bucket_name
    }
}

#[async_trait]
impl ObjectStore for S3Client {
    async fn upload(&self, key: &str, data: Vec<u8>, content_type: &str) -> StorageResult<()> {
        debug!("Uploading {} bytes to {}", data.len(), key);

        self.client
            .put_object()
            .bucket(self.bucket())
            .key(key)
            .body(ByteStream::from(data))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| StorageError::upload_failed(e.to_string()))?;

        info!("Uploaded {}", key);
        Ok(())
    }

    async fn make_public(&self, key: &str) -> StorageResult<()> {
        self.client
            .put_object_acl()
            .bucket(self.bucket())
            .key(key)
            .acl(ObjectCannedAcl::PublicRead)
            .send()
            .await
            .map_err(|e| StorageError::AclFailed(e.to_string()))?;
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        self.config.public_url(key)
    }

    async fn presign_get(&self, key: &str, expires_in: Duration) -> StorageResult<String> {
        let presign_config = PresigningConfig::expires_in(expires_in)
            .map_err(|e| StorageError::PresignFailed(e.to_string()))?;

        let presigned = self
            .client
            .get_object()
            .bucket(self.bucket())
            .key(key)
            .presigned(presign_config)
            .await
            .map_err(|e| StorageError::PresignFailed(e.to_string()))?;

        Ok(presigned.uri().to_string())
    }

    async fn download(&self, key: &str) -> StorageResult<Vec<u8>> {
        debug!("Downloading {}", key);

        let response = self
            .client
            .get_object()
            .bucket(self.bucket())
            .key(key)
            .send()
            .await
            .map_err(|e| {
                if e.to_string().contains("NoSuchKey") {
                    StorageError::not_found(key)
                } else {
                    StorageError::DownloadFailed(e.to_string())
                }
            })?;

        let bytes = response
            .body
            .collect()
            .await
            .map_err(|e| StorageError::DownloadFailed(e.to_string()))?
            .into_bytes()
            .to_vec();

        Ok(bytes)
    }

    fn name(&self) -> &'static str {
        "s3"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> S3Config {
        S3Config {
            endpoint_url: None,
            access_key_id: "key".to_string(),
            secret_access_key: "secret".to_string(),
            bucket_name: "posters".to_string(),
            region: "us-east-1".to_string(),
            public_base_url: None,
        }
    }

    #[test]
    fn test_public_url_variants() {
        let key = "generated/abc.png";
        assert_eq!(
            config().public_url(key),
            "https://posters.s3.us-east-1.amazonaws.com/generated/abc.png"
        );

        let path_style = S3Config {
            endpoint_url: Some("https://storage.googleapis.com/".to_string()),
            ..config()
        };
        assert_eq!(
            path_style.public_url(key),
            "https://storage.googleapis.com/posters/generated/abc.png"
        );

        let cdn = S3Config {
            public_base_url: Some("https://cdn.example.com".to_string()),
            ..path_style
        };
        assert_eq!(cdn.public_url(key), "https://cdn.example.com/generated/abc.png");
    }

    #[tokio::test]
    async fn test_client_builds_without_network() {
        let client = S3Client::new(config()).await.unwrap();
        assert_eq!(client.bucket(), "posters");
        assert_eq!(client.name(), "s3");
    }
}
