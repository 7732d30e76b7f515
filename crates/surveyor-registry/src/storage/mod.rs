//! Object storage gateway: short-lived signed URLs, proxied reads, and deletes.

pub mod memory;
pub mod router;
pub mod s3;

use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use uuid::Uuid;

use crate::forms::files::FileSlot;

pub use memory::InMemoryObjectStorage;
pub use router::file_router;
pub use s3::S3ObjectStorage;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("object storage is not configured")]
    NotConfigured,
    #[error("object not found: {0}")]
    NotFound(String),
    #[error("object storage request failed: {0}")]
    Backend(String),
    #[error("file write failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Bytes fetched from storage along with the content type recorded at upload.
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub bytes: Bytes,
    pub content_type: Option<String>,
}

#[async_trait]
pub trait ObjectStorage: Send + Sync + Debug {
    /// URL the client can PUT the object to until `ttl` elapses.
    async fn presign_put(
        &self,
        key: &str,
        content_type: &str,
        ttl: Duration,
    ) -> Result<String, StorageError>;

    /// URL the client can GET the object from until `ttl` elapses.
    async fn presign_get(&self, key: &str, ttl: Duration) -> Result<String, StorageError>;

    async fn get_object(&self, key: &str) -> Result<StoredObject, StorageError>;

    async fn delete_object(&self, key: &str) -> Result<(), StorageError>;
}

/// Process-wide handle; built once at startup.
pub type SharedStorage = Arc<dyn ObjectStorage>;

/// Stand-in used when no bucket is configured; every call reports the gap.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnconfiguredStorage;

#[async_trait]
impl ObjectStorage for UnconfiguredStorage {
    async fn presign_put(
        &self,
        _key: &str,
        _content_type: &str,
        _ttl: Duration,
    ) -> Result<String, StorageError> {
        Err(StorageError::NotConfigured)
    }

    async fn presign_get(&self, _key: &str, _ttl: Duration) -> Result<String, StorageError> {
        Err(StorageError::NotConfigured)
    }

    async fn get_object(&self, _key: &str) -> Result<StoredObject, StorageError> {
        Err(StorageError::NotConfigured)
    }

    async fn delete_object(&self, _key: &str) -> Result<(), StorageError> {
        Err(StorageError::NotConfigured)
    }
}

/// Server-assigned key for a client upload, e.g. `photos/<uuid>.png`.
pub fn object_key_for(slot: FileSlot, content_type: &str) -> String {
    let extension = match content_type.parse::<mime::Mime>() {
        Ok(mime) if mime.essence_str() == mime::IMAGE_JPEG.essence_str() => "jpg",
        Ok(mime) => mime_guess::get_mime_extensions(&mime)
            .and_then(|extensions| extensions.first())
            .copied()
            .unwrap_or("bin"),
        Err(_) => "bin",
    };
    format!("{}/{}.{}", slot.key_prefix(), Uuid::new_v4(), extension)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_keys_are_prefixed_by_slot() {
        let photo = object_key_for(FileSlot::Photo, "image/png");
        assert!(photo.starts_with("photos/"));
        assert!(photo.ends_with(".png"));

        let cv = object_key_for(FileSlot::Cv, "application/pdf");
        assert!(cv.starts_with("cvs/"));
        assert!(cv.ends_with(".pdf"));

        assert_ne!(
            object_key_for(FileSlot::Cv, "application/pdf"),
            cv,
            "keys never repeat"
        );
    }

    #[test]
    fn unknown_content_types_fall_back_to_bin() {
        let key = object_key_for(FileSlot::Photo, "not a mime");
        assert!(key.ends_with(".bin"));
    }

    #[tokio::test]
    async fn unconfigured_storage_reports_not_configured() {
        let storage = UnconfiguredStorage;
        assert!(matches!(
            storage.delete_object("photos/a.png").await,
            Err(StorageError::NotConfigured)
        ));
    }
}
