use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use async_trait::async_trait;
use super::core_trait::ObjectStore;
use super::location::ObjectLocation;
use super::types::StoreError;

/// An [`ObjectStore`] backed by a local directory.
///
/// Objects live at `<root>/<bucket>/<key>`. Keeping a local copy of the
/// submission artifact next to the job handle makes a batch inspectable after
/// the fact.
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Maps a location onto the filesystem, refusing anything that would
    /// escape the root.
    pub fn path_for(&self, location: &ObjectLocation) -> Result<PathBuf, StoreError> {
        let relative = Path::new(&location.bucket).join(&location.key);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        if location.bucket.is_empty() || location.key.is_empty() || escapes {
            return Err(StoreError::Other(format!("unsupported location {location}")));
        }
        Ok(self.root.join(relative))
    }
}

fn io_error(location: &ObjectLocation, source: std::io::Error) -> StoreError {
    if source.kind() == ErrorKind::NotFound {
        StoreError::NotFound(location.to_string())
    } else {
        StoreError::Io {
            location: location.to_string(),
            source,
        }
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn put(&self, location: &ObjectLocation, bytes: Vec<u8>) -> Result<(), StoreError> {
        let path = self.path_for(location)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| io_error(location, e))?;
        }
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| io_error(location, e))
    }

    async fn get(&self, location: &ObjectLocation) -> Result<Vec<u8>, StoreError> {
        let path = self.path_for(location)?;
        tokio::fs::read(&path).await.map_err(|e| io_error(location, e))
    }

    async fn delete(&self, location: &ObjectLocation) -> Result<(), StoreError> {
        let path = self.path_for(location)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error(location, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_round_trip_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalObjectStore::new(dir.path());
        let loc = ObjectLocation::new("bucket", "input/job.jsonl");

        store.put(&loc, b"{}\n".to_vec()).await.unwrap();
        assert!(dir.path().join("bucket/input/job.jsonl").exists());
        assert_eq!(store.get(&loc).await.unwrap(), b"{}\n".to_vec());

        store.delete(&loc).await.unwrap();
        assert!(store.get(&loc).await.unwrap_err().is_not_found());
        store.delete(&loc).await.unwrap();
    }

    #[tokio::test]
    async fn test_rejects_escaping_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalObjectStore::new(dir.path());
        let loc = ObjectLocation::new("bucket", "../outside");
        assert!(matches!(store.put(&loc, vec![]).await, Err(StoreError::Other(_))));
        assert!(store.path_for(&ObjectLocation::new("bucket", "")).is_err());
    }
}
