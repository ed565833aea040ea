//! Core types and traits for the scanroute library.
//!
//! This module provides the fundamental building blocks used throughout
//! the library:
//!
//! - [`types`] - Requests, verdicts, routing outcomes, notification messages
//! - [`event`] - Trigger event parsing and key decoding
//! - [`traits`] - The `Scanner` trait
//! - [`error`] - Structured error types
//! - [`hasher`] - BLAKE3 artifact fingerprints

pub mod error;
pub mod event;
pub mod hasher;
pub mod traits;
pub mod types;

// Re-export commonly used types at the core level
pub use error::{
    BuildError, ClassificationError, EventParseError, MessagingError, PipelineError,
    PipelineFailure, RefreshError, StorageError, UpdateError,
};
pub use event::decode_object_key;
pub use hasher::{FileHasher, Fingerprint};
pub use traits::{ArcScanner, Scanner};
pub use types::{
    Acknowledgement, NotificationMessage, ObjectLocation, RoutingOutcome, ScanReport, ScanRequest,
    TagSet, Verdict, AV_STATUS_TAG, INFECTED_MARKER,
};
