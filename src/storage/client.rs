use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::error::AppError;

/// Trait for blob storage operations.
///
/// Abstracted as a trait so the media pipeline can run against S3, the local
/// filesystem, or a mock in tests.
#[async_trait]
pub trait StorageClient: Send + Sync {
    /// Store content under the given key and return its public URL.
    async fn put_object(
        &self,
        key: &str,
        content: Vec<u8>,
        content_type: &str,
    ) -> Result<String, AppError>;

    /// Retrieve content by key. Returns `None` if the object doesn't exist.
    async fn get_object(&self, key: &str) -> Result<Option<Vec<u8>>, AppError>;

    /// Remove the object. Deleting a missing object succeeds.
    async fn delete_object(&self, key: &str) -> Result<(), AppError>;
}

fn join_url(base: &str, key: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), key)
}

/// S3 implementation of StorageClient.
pub struct S3StorageClient {
    client: aws_sdk_s3::Client,
    bucket: String,
    public_url: String,
}

impl S3StorageClient {
    /// Build a client from the ambient AWS configuration.
    ///
    /// `endpoint` overrides the S3 endpoint (MinIO, LocalStack).
    pub async fn connect(
        bucket: String,
        endpoint: Option<&str>,
        public_url: String,
    ) -> Result<Self, AppError> {
        if bucket.is_empty() {
            return Err(AppError::Storage("S3_BUCKET not set".into()));
        }

        let mut config_loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
        if let Some(endpoint) = endpoint {
            config_loader = config_loader.endpoint_url(endpoint);
        }

        let sdk_config = config_loader.load().await;
        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(endpoint.is_some())
            .build();

        Ok(Self::new(
            aws_sdk_s3::Client::from_conf(s3_config),
            bucket,
            public_url,
        ))
    }

    /// Create with explicit values (useful for testing / DI).
    pub fn new(client: aws_sdk_s3::Client, bucket: String, public_url: String) -> Self {
        Self {
            client,
            bucket,
            public_url,
        }
    }
}

#[async_trait]
impl StorageClient for S3StorageClient {
    async fn put_object(
        &self,
        key: &str,
        content: Vec<u8>,
        content_type: &str,
    ) -> Result<String, AppError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(content.into())
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("Failed to put object '{}': {}", key, e)))?;

        Ok(join_url(&self.public_url, key))
    }

    async fn get_object(&self, key: &str) -> Result<Option<Vec<u8>>, AppError> {
        match self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(output) => {
                let bytes = output
                    .body
                    .collect()
                    .await
                    .map_err(|e| AppError::Storage(format!("Failed to read body: {}", e)))?;
                Ok(Some(bytes.into_bytes().to_vec()))
            }
            Err(e) => {
                let service_err = e.into_service_error();
                if service_err.is_no_such_key() {
                    Ok(None)
                } else {
                    Err(AppError::Storage(format!(
                        "Failed to get object '{}': {}",
                        key, service_err
                    )))
                }
            }
        }
    }

    async fn delete_object(&self, key: &str) -> Result<(), AppError> {
        // S3 reports success for missing keys.
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                AppError::StorageDelete(format!("Failed to delete object '{}': {}", key, e))
            })?;

        Ok(())
    }
}

/// Filesystem implementation of StorageClient.
///
/// Objects live under `root`; URLs are `base_url/key`.
pub struct LocalStorageClient {
    root: PathBuf,
    base_url: String,
}

impl LocalStorageClient {
    pub async fn new(root: impl Into<PathBuf>, base_url: String) -> Result<Self, AppError> {
        let root = root.into();
        fs::create_dir_all(&root).await.map_err(|e| {
            AppError::Storage(format!(
                "Failed to create storage directory {}: {}",
                root.display(),
                e
            ))
        })?;

        Ok(Self { root, base_url })
    }

    /// Map a key to a path inside `root`, rejecting traversal.
    fn key_to_path(&self, key: &str) -> Result<PathBuf, AppError> {
        if key.is_empty() || key.contains("..") || key.starts_with('/') || key.contains('\\') {
            return Err(AppError::BadRequest(format!("Invalid storage key '{}'", key)));
        }
        Ok(self.root.join(key))
    }

    async fn ensure_parent_dir(path: &Path) -> Result<(), AppError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::Storage(format!("Failed to create {}: {}", parent.display(), e)))?;
        }
        Ok(())
    }
}

#[async_trait]
impl StorageClient for LocalStorageClient {
    async fn put_object(
        &self,
        key: &str,
        content: Vec<u8>,
        _content_type: &str,
    ) -> Result<String, AppError> {
        let path = self.key_to_path(key)?;
        Self::ensure_parent_dir(&path).await?;

        let size = content.len();
        let mut file = fs::File::create(&path).await.map_err(|e| {
            AppError::Storage(format!("Failed to create file {}: {}", path.display(), e))
        })?;
        file.write_all(&content).await.map_err(|e| {
            AppError::Storage(format!("Failed to write file {}: {}", path.display(), e))
        })?;
        file.sync_all().await.map_err(|e| {
            AppError::Storage(format!("Failed to sync file {}: {}", path.display(), e))
        })?;

        tracing::debug!(key, size_bytes = size, "Stored object on local disk");
        Ok(join_url(&self.base_url, key))
    }

    async fn get_object(&self, key: &str) -> Result<Option<Vec<u8>>, AppError> {
        let path = self.key_to_path(key)?;
        match fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Storage(format!(
                "Failed to read file {}: {}",
                path.display(),
                e
            ))),
        }
    }

    async fn delete_object(&self, key: &str) -> Result<(), AppError> {
        let path = self.key_to_path(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::StorageDelete(format!(
                "Failed to delete file {}: {}",
                path.display(),
                e
            ))),
        }
    }
}
