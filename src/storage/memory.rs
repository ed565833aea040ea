//! In-memory object store.
//!
//! Keeps objects and their tag sets in a map and records every call, so
//! tests can assert on the exact sequence of side effects. Individual
//! operations can be made to fail.

use crate::core::{ObjectLocation, StorageError, TagSet};
use crate::storage::traits::ObjectStore;

use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::RwLock;

/// Object store operation, used for call logs and failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOperation {
    /// `download`
    Download,
    /// `tag`
    Tag,
    /// `copy`
    Copy,
    /// `delete`
    Delete,
    /// `upload`
    Upload,
}

/// One recorded call against the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreCall {
    /// Which operation.
    pub operation: StoreOperation,
    /// Object addressed (the source, for copies).
    pub location: ObjectLocation,
}

#[derive(Debug, Clone, Default)]
struct StoredObject {
    data: Vec<u8>,
    tags: TagSet,
}

/// Object store that lives entirely in process memory.
///
/// # Examples
///
/// ```rust
/// use scanroute::core::ObjectLocation;
/// use scanroute::storage::InMemoryObjectStore;
///
/// let store = InMemoryObjectStore::new();
/// let location = ObjectLocation::new("uploads", "docs/report.pdf");
/// store.put(&location, b"%PDF-1.7".to_vec());
/// assert!(store.contains(&location));
/// ```
#[derive(Debug, Default)]
pub struct InMemoryObjectStore {
    objects: RwLock<BTreeMap<ObjectLocation, StoredObject>>,
    calls: RwLock<Vec<StoreCall>>,
    failing: RwLock<HashSet<StoreOperation>>,
}

impl InMemoryObjectStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces an object. Not recorded as a call.
    pub fn put(&self, location: &ObjectLocation, data: Vec<u8>) {
        self.objects
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(
                location.clone(),
                StoredObject {
                    data,
                    tags: TagSet::new(),
                },
            );
    }

    /// Makes every future call of `operation` fail.
    pub fn fail_on(&self, operation: StoreOperation) {
        self.failing
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(operation);
    }

    /// Returns `true` if an object exists at `location`.
    pub fn contains(&self, location: &ObjectLocation) -> bool {
        self.objects
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .contains_key(location)
    }

    /// Returns the object's content.
    pub fn get(&self, location: &ObjectLocation) -> Option<Vec<u8>> {
        self.objects
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(location)
            .map(|object| object.data.clone())
    }

    /// Returns the object's tag set.
    pub fn tags(&self, location: &ObjectLocation) -> Option<TagSet> {
        self.objects
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(location)
            .map(|object| object.tags.clone())
    }

    /// Returns every object location currently stored.
    pub fn locations(&self) -> Vec<ObjectLocation> {
        self.objects
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .keys()
            .cloned()
            .collect()
    }

    /// Returns every call made so far, in order.
    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Returns the operations called so far, in order.
    pub fn operations(&self) -> Vec<StoreOperation> {
        self.calls().into_iter().map(|call| call.operation).collect()
    }

    fn record(&self, operation: StoreOperation, location: &ObjectLocation) -> bool {
        self.calls
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(StoreCall {
                operation,
                location: location.clone(),
            });
        self.failing
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .contains(&operation)
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn download(&self, location: &ObjectLocation, dest: &Path) -> Result<u64, StorageError> {
        if self.record(StoreOperation::Download, location) {
            return Err(StorageError::download(location, "injected failure"));
        }
        let data = self.get(location).ok_or_else(|| StorageError::NotFound {
            location: location.clone(),
        })?;
        tokio::fs::write(dest, &data).await?;
        Ok(data.len() as u64)
    }

    async fn tag(&self, location: &ObjectLocation, tags: &TagSet) -> Result<(), StorageError> {
        if self.record(StoreOperation::Tag, location) {
            return Err(StorageError::tag(location, "injected failure"));
        }
        let mut objects = self
            .objects
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let object = objects
            .get_mut(location)
            .ok_or_else(|| StorageError::NotFound {
                location: location.clone(),
            })?;
        object.tags = tags.clone();
        Ok(())
    }

    async fn copy(
        &self,
        source: &ObjectLocation,
        destination_bucket: &str,
    ) -> Result<ObjectLocation, StorageError> {
        let destination = source.in_bucket(destination_bucket);
        if self.record(StoreOperation::Copy, source) {
            return Err(StorageError::copy(source, &destination, "injected failure"));
        }
        let mut objects = self
            .objects
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let object = objects
            .get(source)
            .cloned()
            .ok_or_else(|| StorageError::NotFound {
                location: source.clone(),
            })?;
        objects.insert(destination.clone(), object);
        Ok(destination)
    }

    async fn delete(&self, location: &ObjectLocation) -> Result<(), StorageError> {
        if self.record(StoreOperation::Delete, location) {
            return Err(StorageError::delete(location, "injected failure"));
        }
        self.objects
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(location);
        Ok(())
    }

    async fn upload(&self, source: &Path, location: &ObjectLocation) -> Result<(), StorageError> {
        if self.record(StoreOperation::Upload, location) {
            return Err(StorageError::upload(location, "injected failure"));
        }
        let data = tokio::fs::read(source).await?;
        self.put(location, data);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Verdict;

    #[tokio::test]
    async fn test_download_writes_file() {
        let store = InMemoryObjectStore::new();
        let location = ObjectLocation::new("uploads", "a.txt");
        store.put(&location, b"hello".to_vec());

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("a.txt");
        let bytes = store.download(&location, &dest).await.unwrap();

        assert_eq!(bytes, 5);
        assert_eq!(std::fs::read(&dest).unwrap(), b"hello");
    }

    #[tokio::test]
    async fn test_download_missing_object() {
        let store = InMemoryObjectStore::new();
        let dir = tempfile::tempdir().unwrap();
        let result = store
            .download(&ObjectLocation::new("uploads", "gone"), &dir.path().join("gone"))
            .await;
        assert!(matches!(result, Err(StorageError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_copy_keeps_key_and_tags() {
        let store = InMemoryObjectStore::new();
        let source = ObjectLocation::new("uploads", "docs/report.pdf");
        store.put(&source, b"pdf".to_vec());
        store.tag(&source, &Verdict::Clean.tags()).await.unwrap();

        let destination = store.copy(&source, "clean").await.unwrap();
        assert_eq!(destination, ObjectLocation::new("clean", "docs/report.pdf"));
        assert_eq!(store.tags(&destination), Some(Verdict::Clean.tags()));
        assert!(store.contains(&source));
    }

    #[tokio::test]
    async fn test_injected_failure_is_recorded() {
        let store = InMemoryObjectStore::new();
        let location = ObjectLocation::new("uploads", "a.txt");
        store.put(&location, Vec::new());
        store.fail_on(StoreOperation::Delete);

        assert!(store.delete(&location).await.is_err());
        assert!(store.contains(&location));
        assert_eq!(store.operations(), vec![StoreOperation::Delete]);
    }
}
