use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use super::{ObjectStorage, StorageError, StoredObject};

/// Bucket held in process memory, for tests and local runs without S3.
/// Signed URLs use a `memory://` scheme and are not reachable over HTTP.
#[derive(Debug, Default, Clone)]
pub struct InMemoryObjectStorage {
    objects: Arc<Mutex<BTreeMap<String, StoredObject>>>,
    deleted: Arc<Mutex<Vec<String>>>,
}

impl InMemoryObjectStorage {
    pub fn insert(&self, key: &str, bytes: impl Into<Bytes>, content_type: Option<&str>) {
        let mut guard = self.objects.lock().expect("storage mutex poisoned");
        guard.insert(
            key.to_string(),
            StoredObject {
                bytes: bytes.into(),
                content_type: content_type.map(str::to_string),
            },
        );
    }

    pub fn contains(&self, key: &str) -> bool {
        self.objects
            .lock()
            .expect("storage mutex poisoned")
            .contains_key(key)
    }

    /// Keys passed to `delete_object`, including ones that did not exist.
    pub fn deleted_keys(&self) -> Vec<String> {
        self.deleted.lock().expect("storage mutex poisoned").clone()
    }
}

#[async_trait]
impl ObjectStorage for InMemoryObjectStorage {
    async fn presign_put(
        &self,
        key: &str,
        content_type: &str,
        ttl: Duration,
    ) -> Result<String, StorageError> {
        Ok(format!(
            "memory://upload/{key}?content-type={content_type}&expires={}",
            ttl.as_secs()
        ))
    }

    async fn presign_get(&self, key: &str, ttl: Duration) -> Result<String, StorageError> {
        Ok(format!("memory://download/{key}?expires={}", ttl.as_secs()))
    }

    async fn get_object(&self, key: &str) -> Result<StoredObject, StorageError> {
        let guard = self.objects.lock().expect("storage mutex poisoned");
        guard
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    async fn delete_object(&self, key: &str) -> Result<(), StorageError> {
        self.deleted
            .lock()
            .expect("storage mutex poisoned")
            .push(key.to_string());
        let mut guard = self.objects.lock().expect("storage mutex poisoned");
        guard
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }
}
