//! Object storage interface for delivered rasters (MinIO/S3 compatible).

use std::sync::Arc;

use bytes::Bytes;
use object_store::{aws::AmazonS3Builder, path::Path, ObjectStore};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::io::AsyncWrite;
use tracing::{debug, instrument};

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors raised by the object storage layer.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("failed to create object store client: {0}")]
    Client(String),

    #[error("object write failed for {path}: {message}")]
    Write { path: String, message: String },

    #[error("object read failed for {path}: {message}")]
    Read { path: String, message: String },

    #[error("object delete failed for {path}: {message}")]
    Delete { path: String, message: String },
}

/// Configuration for object storage connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectStorageConfig {
    /// S3/MinIO endpoint URL
    pub endpoint: String,
    /// Bucket name
    pub bucket: String,
    /// Access key ID
    pub access_key_id: String,
    /// Secret access key
    pub secret_access_key: String,
    /// AWS region (use "us-east-1" for MinIO)
    pub region: String,
    /// Allow HTTP (for local MinIO)
    pub allow_http: bool,
    /// Base URL under which delivered objects are publicly addressable,
    /// without the bucket segment
    pub public_base_url: String,
}

impl Default for ObjectStorageConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://minio:9000".to_string(),
            bucket: "raster-delivery".to_string(),
            access_key_id: "minioadmin".to_string(),
            secret_access_key: "minioadmin".to_string(),
            region: "us-east-1".to_string(),
            allow_http: true,
            public_base_url: "https://s3.amazonaws.com".to_string(),
        }
    }
}

/// Object storage client for transcoded rasters.
pub struct ObjectStorage {
    store: Arc<dyn ObjectStore>,
    bucket: String,
    public_base_url: String,
}

impl ObjectStorage {
    /// Create a new object storage client from config.
    pub fn new(config: &ObjectStorageConfig) -> StorageResult<Self> {
        let mut builder = AmazonS3Builder::new()
            .with_endpoint(&config.endpoint)
            .with_bucket_name(&config.bucket)
            .with_access_key_id(&config.access_key_id)
            .with_secret_access_key(&config.secret_access_key)
            .with_region(&config.region);

        if config.allow_http {
            builder = builder.with_allow_http(true);
        }

        let store = builder
            .build()
            .map_err(|e| StorageError::Client(e.to_string()))?;

        Ok(Self {
            store: Arc::new(store),
            bucket: config.bucket.clone(),
            public_base_url: config.public_base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Wrap an already-built store. Tests use this with
    /// `object_store::memory::InMemory`.
    pub fn with_store(
        store: Arc<dyn ObjectStore>,
        bucket: impl Into<String>,
        public_base_url: impl Into<String>,
    ) -> Self {
        Self {
            store,
            bucket: bucket.into(),
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Write bytes to a path in the bucket.
    #[instrument(skip(self, data), fields(bucket = %self.bucket, path = %path))]
    pub async fn put(&self, path: &str, data: Bytes) -> StorageResult<()> {
        let location = Path::from(path);
        debug!(size = data.len(), "Writing object");

        self.store
            .put(&location, data)
            .await
            .map_err(|e| StorageError::Write {
                path: path.to_string(),
                message: e.to_string(),
            })?;

        Ok(())
    }

    /// Open a chunked writer to a path. The returned writer streams parts to
    /// the store as they are written; call `shutdown` to complete the upload.
    #[instrument(skip(self), fields(bucket = %self.bucket, path = %path))]
    pub async fn put_stream(
        &self,
        path: &str,
    ) -> StorageResult<Box<dyn AsyncWrite + Send + Unpin>> {
        let location = Path::from(path);
        debug!("Opening multipart writer");

        let (_id, writer) =
            self.store
                .put_multipart(&location)
                .await
                .map_err(|e| StorageError::Write {
                    path: path.to_string(),
                    message: e.to_string(),
                })?;

        Ok(writer)
    }

    /// Read bytes from a path.
    #[instrument(skip(self), fields(bucket = %self.bucket, path = %path))]
    pub async fn get(&self, path: &str) -> StorageResult<Bytes> {
        let location = Path::from(path);

        let result = self
            .store
            .get(&location)
            .await
            .map_err(|e| StorageError::Read {
                path: path.to_string(),
                message: e.to_string(),
            })?;

        let bytes = result.bytes().await.map_err(|e| StorageError::Read {
            path: path.to_string(),
            message: e.to_string(),
        })?;

        debug!(size = bytes.len(), "Read object");
        Ok(bytes)
    }

    /// Check if an object exists.
    pub async fn exists(&self, path: &str) -> StorageResult<bool> {
        let location = Path::from(path);

        match self.store.head(&location).await {
            Ok(_) => Ok(true),
            Err(object_store::Error::NotFound { .. }) => Ok(false),
            Err(e) => Err(StorageError::Read {
                path: path.to_string(),
                message: e.to_string(),
            }),
        }
    }

    /// Delete an object.
    #[instrument(skip(self), fields(bucket = %self.bucket, path = %path))]
    pub async fn delete(&self, path: &str) -> StorageResult<()> {
        let location = Path::from(path);

        self.store
            .delete(&location)
            .await
            .map_err(|e| StorageError::Delete {
                path: path.to_string(),
                message: e.to_string(),
            })?;

        Ok(())
    }

    /// Public URL of an object key, for redirect responses.
    pub fn object_url(&self, key: &str) -> String {
        format!("{}/{}/{}", self.public_base_url, self.bucket, key)
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

#[cfg(test)]
mod tests {
    use object_store::memory::InMemory;
    use tokio::io::AsyncWriteExt;

    use super::*;

    fn memory_storage() -> ObjectStorage {
        ObjectStorage::with_store(
            Arc::new(InMemory::new()),
            "test-bucket",
            "https://s3.amazonaws.com",
        )
    }

    #[test]
    fn object_url_includes_bucket_and_key() {
        let storage = memory_storage();
        assert_eq!(
            storage.object_url("abc/file-band1.tif"),
            "https://s3.amazonaws.com/test-bucket/abc/file-band1.tif"
        );
    }

    #[test]
    fn object_url_tolerates_trailing_slash_in_base() {
        let storage = ObjectStorage::with_store(
            Arc::new(InMemory::new()),
            "b",
            "https://store.example.com/",
        );
        assert_eq!(
            storage.object_url("k.tif"),
            "https://store.example.com/b/k.tif"
        );
    }

    #[tokio::test]
    async fn put_then_get_roundtrip() {
        let storage = memory_storage();
        storage
            .put("a/b.tif", Bytes::from_static(b"tiff bytes"))
            .await
            .unwrap();
        assert!(storage.exists("a/b.tif").await.unwrap());
        assert_eq!(
            storage.get("a/b.tif").await.unwrap(),
            Bytes::from_static(b"tiff bytes")
        );
    }

    #[tokio::test]
    async fn put_stream_assembles_chunks() {
        let storage = memory_storage();
        let mut writer = storage.put_stream("streamed.tif").await.unwrap();
        writer.write_all(b"part one ").await.unwrap();
        writer.write_all(b"part two").await.unwrap();
        writer.shutdown().await.unwrap();

        assert_eq!(
            storage.get("streamed.tif").await.unwrap(),
            Bytes::from_static(b"part one part two")
        );
    }

    #[tokio::test]
    async fn exists_is_false_for_missing_object() {
        let storage = memory_storage();
        assert!(!storage.exists("nope.tif").await.unwrap());
    }

    #[tokio::test]
    async fn delete_removes_object() {
        let storage = memory_storage();
        storage
            .put("x.tif", Bytes::from_static(b"x"))
            .await
            .unwrap();
        storage.delete("x.tif").await.unwrap();
        assert!(!storage.exists("x.tif").await.unwrap());
    }
}
