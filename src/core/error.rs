//! Error types for the scanroute library.
//!
//! Each external collaborator gets its own error type so the pipeline can
//! decide, per stage, whether a failure ends the invocation or is only
//! logged. The library never panics; all errors are returned as `Result`
//! values.

use crate::core::types::ObjectLocation;
use crate::pipeline::PipelineState;

use std::time::Duration;
use thiserror::Error;

/// A trigger event could not be turned into a [`ScanRequest`](crate::core::ScanRequest).
///
/// This is the only failure that happens before any side effect.
#[derive(Debug, Error)]
pub enum EventParseError {
    /// The payload did not have the shape of an object-created notification.
    #[error("malformed event payload: {0}")]
    Malformed(#[from] serde_json::Error),

    /// The payload contained no notification records.
    #[error("event contains no records")]
    NoRecords,

    /// A required field was absent or empty.
    #[error("event record is missing '{field}'")]
    MissingField {
        /// Dotted path of the missing field.
        field: &'static str,
    },
}

impl EventParseError {
    /// Creates a `MissingField` error.
    pub fn missing(field: &'static str) -> Self {
        Self::MissingField { field }
    }
}

/// Failure of an object store operation.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The object could not be fetched to local disk.
    #[error("failed to download {location}: {reason}")]
    Download {
        /// Object that was being downloaded.
        location: ObjectLocation,
        /// Backend-specific reason.
        reason: String,
    },

    /// The object's tag set could not be replaced.
    #[error("failed to tag {location}: {reason}")]
    Tag {
        /// Object that was being tagged.
        location: ObjectLocation,
        /// Backend-specific reason.
        reason: String,
    },

    /// Server-side copy failed.
    #[error("failed to copy {source_location} to {destination}: {reason}")]
    Copy {
        /// Object being copied.
        source_location: ObjectLocation,
        /// Intended destination.
        destination: ObjectLocation,
        /// Backend-specific reason.
        reason: String,
    },

    /// The object could not be deleted.
    #[error("failed to delete {location}: {reason}")]
    Delete {
        /// Object that was being deleted.
        location: ObjectLocation,
        /// Backend-specific reason.
        reason: String,
    },

    /// A local file could not be uploaded.
    #[error("failed to upload to {location}: {reason}")]
    Upload {
        /// Target of the upload.
        location: ObjectLocation,
        /// Backend-specific reason.
        reason: String,
    },

    /// The referenced object does not exist.
    #[error("object not found: {location}")]
    NotFound {
        /// Missing object.
        location: ObjectLocation,
    },

    /// Local I/O failed while moving bytes to or from the store.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StorageError {
    /// Creates a `Download` error.
    pub fn download(location: &ObjectLocation, reason: impl Into<String>) -> Self {
        Self::Download {
            location: location.clone(),
            reason: reason.into(),
        }
    }

    /// Creates a `Tag` error.
    pub fn tag(location: &ObjectLocation, reason: impl Into<String>) -> Self {
        Self::Tag {
            location: location.clone(),
            reason: reason.into(),
        }
    }

    /// Creates a `Copy` error.
    pub fn copy(
        source: &ObjectLocation,
        destination: &ObjectLocation,
        reason: impl Into<String>,
    ) -> Self {
        Self::Copy {
            source_location: source.clone(),
            destination: destination.clone(),
            reason: reason.into(),
        }
    }

    /// Creates a `Delete` error.
    pub fn delete(location: &ObjectLocation, reason: impl Into<String>) -> Self {
        Self::Delete {
            location: location.clone(),
            reason: reason.into(),
        }
    }

    /// Creates an `Upload` error.
    pub fn upload(location: &ObjectLocation, reason: impl Into<String>) -> Self {
        Self::Upload {
            location: location.clone(),
            reason: reason.into(),
        }
    }

    /// Returns the object the failed operation was addressing, if any.
    pub fn location(&self) -> Option<&ObjectLocation> {
        match self {
            Self::Download { location, .. }
            | Self::Tag { location, .. }
            | Self::Delete { location, .. }
            | Self::Upload { location, .. }
            | Self::NotFound { location } => Some(location),
            Self::Copy {
                source_location, ..
            } => Some(source_location),
            Self::Io(_) => None,
        }
    }
}

/// The scanner could not be run against the local artifact.
///
/// A scanner that runs but reports an error is *not* a classification
/// error; its report simply lacks the infection marker.
#[derive(Debug, Error)]
pub enum ClassificationError {
    /// The scanner process could not be started.
    #[error("failed to launch scanner '{engine}': {source}")]
    Spawn {
        /// Name of the scanner.
        engine: String,
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
    },

    /// The scanner did not finish within its time limit.
    #[error("scanner '{engine}' timed out after {elapsed:?}")]
    Timeout {
        /// Name of the scanner.
        engine: String,
        /// Configured limit.
        elapsed: Duration,
    },

    /// The scanner failed in some other way.
    #[error("scanner '{engine}' failed: {reason}")]
    Failed {
        /// Name of the scanner.
        engine: String,
        /// Human-readable reason.
        reason: String,
    },
}

impl ClassificationError {
    /// Creates a `Failed` error.
    pub fn failed(engine: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Failed {
            engine: engine.into(),
            reason: reason.into(),
        }
    }

    /// Returns the engine name.
    pub fn engine(&self) -> &str {
        match self {
            Self::Spawn { engine, .. } | Self::Timeout { engine, .. } | Self::Failed { engine, .. } => {
                engine
            }
        }
    }
}

/// Publishing a notification failed.
#[derive(Debug, Error)]
pub enum MessagingError {
    /// The topic rejected or did not receive the message.
    #[error("failed to publish to topic '{topic}': {reason}")]
    Publish {
        /// Topic identifier.
        topic: String,
        /// Backend-specific reason.
        reason: String,
    },
}

impl MessagingError {
    /// Creates a `Publish` error.
    pub fn publish(topic: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Publish {
            topic: topic.into(),
            reason: reason.into(),
        }
    }
}

/// A signature update attempt did not succeed.
///
/// The scan pipeline never sees this type; it only observes a
/// [`RefreshOutcome`](crate::signatures::RefreshOutcome). Strict callers such
/// as the scheduled definitions update convert the outcome into this error.
#[derive(Debug, Error)]
pub enum RefreshError {
    /// The updater configuration file could not be written.
    #[error("failed to write updater configuration: {0}")]
    Config(#[source] std::io::Error),

    /// The updater process could not be started.
    #[error("failed to launch signature updater: {0}")]
    Spawn(#[source] std::io::Error),

    /// The updater exceeded its wall-clock budget.
    #[error("signature update timed out after {0:?}")]
    Timeout(Duration),

    /// The updater exited unsuccessfully.
    #[error("signature updater exited with {status}: {stderr}")]
    Failed {
        /// Exit status description.
        status: String,
        /// Captured standard error.
        stderr: String,
    },

    /// A refresh attempt was reported as failed.
    #[error("signature update failed: {0}")]
    Unsuccessful(String),

    /// The refresh was deliberately not attempted.
    #[error("signature refresh is disabled")]
    Disabled,
}

/// The scheduled definitions update did not complete.
#[derive(Debug, Error)]
pub enum UpdateError {
    /// No destination bucket is configured.
    #[error("definitions bucket is not configured")]
    NotConfigured,

    /// The local signature directory could not be prepared.
    #[error("failed to prepare signature directory: {0}")]
    SourceDir(#[source] std::io::Error),

    /// The signature refresh did not succeed.
    #[error(transparent)]
    Refresh(#[from] RefreshError),

    /// Uploading the signature files failed.
    #[error(transparent)]
    Publish(#[from] StorageError),
}

/// A pipeline could not be assembled.
#[derive(Debug, Error)]
pub enum BuildError {
    /// A required collaborator was not supplied to the builder.
    #[error("pipeline requires a {0}")]
    MissingComponent(&'static str),

    /// The working directory is unusable.
    #[error("invalid work directory: {0}")]
    WorkDir(#[source] std::io::Error),

    /// Configuration could not be loaded or is inconsistent.
    #[error("configuration error: {0}")]
    Configuration(String),
}

/// Underlying cause of a fatal pipeline failure.
#[derive(Debug, Error)]
pub enum PipelineFailure {
    /// Object store failure (download, tag, copy, delete).
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Scanner invocation failure.
    #[error(transparent)]
    Classification(#[from] ClassificationError),

    /// The local artifact could not be prepared.
    #[error("failed to prepare local artifact: {0}")]
    Artifact(#[source] std::io::Error),
}

/// A fatal failure inside one pipeline invocation.
///
/// Carries the last state the invocation reached so the log line says how
/// far the object got before the failure.
#[derive(Debug, Error)]
#[error("scan pipeline failed after reaching {reached}: {failure}")]
pub struct PipelineError {
    /// Last state successfully reached.
    pub reached: PipelineState,
    /// What went wrong.
    #[source]
    pub failure: PipelineFailure,
}

impl PipelineError {
    /// Creates a new pipeline error.
    pub fn new(reached: PipelineState, failure: impl Into<PipelineFailure>) -> Self {
        Self {
            reached,
            failure: failure.into(),
        }
    }

    /// Returns the name of the stage that was being attempted.
    pub fn stage(&self) -> &'static str {
        self.reached
            .next()
            .map(PipelineState::stage_name)
            .unwrap_or("cleanup")
    }

    /// Returns `true` if an object store call failed.
    pub fn is_storage(&self) -> bool {
        matches!(self.failure, PipelineFailure::Storage(_))
    }

    /// Returns `true` if the scanner could not be run.
    pub fn is_classification(&self) -> bool {
        matches!(self.failure, PipelineFailure::Classification(_))
    }
}
