//! Publishes a local signature directory to durable storage.

use crate::core::{ObjectLocation, StorageError};
use crate::storage::ArcObjectStore;

use std::path::Path;
use walkdir::WalkDir;

/// Uploads every file under a signature directory to a bucket.
///
/// Files keep their path relative to the source directory, below a fixed
/// key prefix: `<dir>/daily.cvd` becomes `<prefix>/daily.cvd`.
#[derive(Debug, Clone)]
pub struct DefinitionsPublisher {
    store: ArcObjectStore,
    bucket: String,
    prefix: String,
}

impl DefinitionsPublisher {
    /// Creates a publisher targeting `bucket` under `prefix`.
    pub fn new(store: ArcObjectStore, bucket: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            store,
            bucket: bucket.into(),
            prefix: prefix.into().trim_matches('/').to_string(),
        }
    }

    /// Returns the destination bucket.
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Returns the object key for a path relative to the source directory.
    fn key_for(&self, relative: &Path) -> String {
        let relative = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/");
        if self.prefix.is_empty() {
            relative
        } else {
            format!("{}/{}", self.prefix, relative)
        }
    }

    /// Uploads every regular file below `source_dir`, returning the count.
    ///
    /// Stops at the first failed upload.
    pub async fn publish(&self, source_dir: &Path) -> Result<usize, StorageError> {
        tracing::info!(
            bucket = %self.bucket,
            source_dir = %source_dir.display(),
            "Uploading definitions"
        );

        let mut uploaded = 0;
        for entry in WalkDir::new(source_dir).follow_links(false) {
            let entry = entry.map_err(|e| {
                StorageError::Io(
                    e.into_io_error()
                        .unwrap_or_else(|| std::io::Error::new(std::io::ErrorKind::Other, "walk failed")),
                )
            })?;
            if !entry.file_type().is_file() {
                continue;
            }

            let relative = entry
                .path()
                .strip_prefix(source_dir)
                .unwrap_or_else(|_| entry.path());
            let location = ObjectLocation::new(&self.bucket, self.key_for(relative));
            self.store.upload(entry.path(), &location).await?;
            tracing::info!(
                path = %entry.path().display(),
                location = %location,
                "Uploaded definition file"
            );
            uploaded += 1;
        }

        crate::audit::emit_definitions_published(&self.bucket, &self.prefix, uploaded);
        Ok(uploaded)
    }
}
