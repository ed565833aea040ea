//! Scoped on-disk copy of the object under scan.

use crate::core::ObjectLocation;

use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// File name used when the object key has no usable base name.
const FALLBACK_FILE_NAME: &str = "object";

/// Temporary local copy of one object, owned by one invocation.
///
/// The file lives in a private directory under the work directory. The
/// directory is removed by [`cleanup`](LocalArtifact::cleanup), or on drop
/// if cleanup was never reached.
#[derive(Debug)]
pub struct LocalArtifact {
    dir: Option<TempDir>,
    path: PathBuf,
}

impl LocalArtifact {
    /// Reserves a path for `location` under `work_dir`. Nothing is written yet.
    pub fn create(work_dir: &Path, location: &ObjectLocation) -> io::Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix("scanroute-")
            .tempdir_in(work_dir)?;
        let file_name = location.file_name().unwrap_or(FALLBACK_FILE_NAME);
        let path = dir.path().join(file_name);
        Ok(Self {
            dir: Some(dir),
            path,
        })
    }

    /// Path the object is (or will be) stored at.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Removes the artifact and its directory.
    pub fn cleanup(mut self) -> io::Result<()> {
        match self.dir.take() {
            Some(dir) => dir.close(),
            None => Ok(()),
        }
    }
}
