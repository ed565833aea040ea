//! Object store trait definition.

use crate::core::{ObjectLocation, StorageError, TagSet};

use async_trait::async_trait;
use std::fmt::Debug;
use std::path::Path;

/// Bucket/key-addressed blob store.
///
/// Every call is a single request with no retries; failures surface as
/// [`StorageError`] and the caller decides whether they are fatal.
///
/// # Example Implementation
///
/// ```rust,ignore
/// use scanroute::core::{ObjectLocation, StorageError, TagSet};
/// use scanroute::storage::ObjectStore;
/// use async_trait::async_trait;
/// use std::path::Path;
///
/// #[derive(Debug)]
/// struct MyStore;
///
/// #[async_trait]
/// impl ObjectStore for MyStore {
///     async fn download(&self, location: &ObjectLocation, dest: &Path) -> Result<u64, StorageError> {
///         todo!()
///     }
///
///     async fn tag(&self, location: &ObjectLocation, tags: &TagSet) -> Result<(), StorageError> {
///         todo!()
///     }
///
///     async fn copy(&self, source: &ObjectLocation, destination_bucket: &str) -> Result<ObjectLocation, StorageError> {
///         todo!()
///     }
///
///     async fn delete(&self, location: &ObjectLocation) -> Result<(), StorageError> {
///         todo!()
///     }
///
///     async fn upload(&self, source: &Path, location: &ObjectLocation) -> Result<(), StorageError> {
///         todo!()
///     }
/// }
/// ```
#[async_trait]
pub trait ObjectStore: Send + Sync + Debug {
    /// Writes the object's content to `dest`, returning the byte count.
    async fn download(&self, location: &ObjectLocation, dest: &Path) -> Result<u64, StorageError>;

    /// Replaces the object's tag set.
    ///
    /// Tagging never rewrites object content.
    async fn tag(&self, location: &ObjectLocation, tags: &TagSet) -> Result<(), StorageError>;

    /// Copies the object to the same key in `destination_bucket`.
    async fn copy(
        &self,
        source: &ObjectLocation,
        destination_bucket: &str,
    ) -> Result<ObjectLocation, StorageError>;

    /// Deletes the object.
    async fn delete(&self, location: &ObjectLocation) -> Result<(), StorageError>;

    /// Uploads a local file to `location`.
    async fn upload(&self, source: &Path, location: &ObjectLocation) -> Result<(), StorageError>;
}

/// An arc-wrapped store for shared ownership.
pub type ArcObjectStore = std::sync::Arc<dyn ObjectStore>;
