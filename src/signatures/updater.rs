//! Scheduled definitions update: refresh strictly, then publish.

use crate::core::{Acknowledgement, UpdateError};
use crate::signatures::{ArcRefresher, DefinitionsPublisher};

use std::path::{Path, PathBuf};

/// Refreshes the local signature directory and publishes it.
///
/// Unlike the refresh that precedes every scan, any refresh failure here
/// is an error.
#[derive(Debug)]
pub struct DefinitionsUpdater {
    refresher: ArcRefresher,
    publisher: Option<DefinitionsPublisher>,
    source_dir: PathBuf,
}

impl DefinitionsUpdater {
    /// Creates an updater. Without a publisher every run fails with
    /// [`UpdateError::NotConfigured`] before touching anything.
    pub fn new(
        refresher: ArcRefresher,
        publisher: Option<DefinitionsPublisher>,
        source_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            refresher,
            publisher,
            source_dir: source_dir.into(),
        }
    }

    /// Directory that is refreshed and published.
    pub fn source_dir(&self) -> &Path {
        &self.source_dir
    }

    /// Runs one update and returns the number of files published.
    pub async fn update(&self) -> Result<usize, UpdateError> {
        let publisher = self.publisher.as_ref().ok_or(UpdateError::NotConfigured)?;

        tokio::fs::create_dir_all(&self.source_dir)
            .await
            .map_err(UpdateError::SourceDir)?;

        let signature_files = self.refresher.refresh().await.into_result()?;
        tracing::info!(signature_files, "Signature refresh completed");

        let uploaded = publisher.publish(&self.source_dir).await?;
        tracing::info!(
            bucket = %publisher.bucket(),
            uploaded,
            "Definitions updated successfully"
        );
        Ok(uploaded)
    }

    /// Runs one update and maps the result to the scheduler response.
    ///
    /// Returns `None` when no bucket is configured.
    pub async fn run(&self) -> Option<Acknowledgement> {
        match self.update().await {
            Ok(_) => Some(Acknowledgement::update_completed()),
            Err(UpdateError::NotConfigured) => {
                tracing::error!("Definitions bucket is not set, nothing to update");
                None
            }
            Err(e) => {
                tracing::error!(error = %e, "Definitions update failed");
                Some(Acknowledgement::update_failed())
            }
        }
    }
}
