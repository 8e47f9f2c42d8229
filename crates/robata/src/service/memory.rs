use std::collections::BTreeMap;
use async_trait::async_trait;
use tokio::sync::Mutex;
use super::core_trait::ObjectStore;
use super::location::ObjectLocation;
use super::types::StoreError;

/// An [`ObjectStore`] held entirely in memory.
///
/// Useful for tests and for dry runs against a fake service.
#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    objects: Mutex<BTreeMap<ObjectLocation, Vec<u8>>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored objects.
    pub async fn len(&self) -> usize {
        self.objects.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.lock().await.is_empty()
    }

    /// Locations of all stored objects, in order.
    pub async fn locations(&self) -> Vec<ObjectLocation> {
        self.objects.lock().await.keys().cloned().collect()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put(&self, location: &ObjectLocation, bytes: Vec<u8>) -> Result<(), StoreError> {
        self.objects.lock().await.insert(location.clone(), bytes);
        Ok(())
    }

    async fn get(&self, location: &ObjectLocation) -> Result<Vec<u8>, StoreError> {
        self.objects
            .lock()
            .await
            .get(location)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(location.to_string()))
    }

    async fn delete(&self, location: &ObjectLocation) -> Result<(), StoreError> {
        self.objects.lock().await.remove(location);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_get_delete() {
        let store = MemoryObjectStore::new();
        let loc = ObjectLocation::new("bucket", "input/a.jsonl");

        store.put(&loc, b"line\n".to_vec()).await.unwrap();
        assert_eq!(store.get(&loc).await.unwrap(), b"line\n".to_vec());
        assert_eq!(store.len().await, 1);

        store.delete(&loc).await.unwrap();
        assert!(store.is_empty().await);
        assert!(store.get(&loc).await.unwrap_err().is_not_found());

        // deleting twice is fine
        store.delete(&loc).await.unwrap();
    }
}
