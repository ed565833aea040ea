//! # Scanroute
//!
//! Event-driven malware scanning for objects landing in a bucket.
//!
//! ## Overview
//!
//! For every object-created event, scanroute:
//!
//! - refreshes the local signature database (best-effort, time-bounded)
//! - downloads the object to a private temporary file
//! - scans it once with `clamscan` and derives a `clean`/`infected` verdict
//! - tags the original object with `av-status=<verdict>`
//! - moves it to the clean or quarantine bucket, when one is configured
//! - publishes a notification to the topic for that verdict, when one is configured
//! - removes the temporary file, whatever happened before
//!
//! The trigger is always acknowledged. Failures are logged with the bucket,
//! key and stage they happened at, never raised to the caller.
//!
//! A second entry point refreshes the signature database on a schedule and
//! publishes it to a bucket.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use scanroute::prelude::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Arc::new(InMemoryObjectStore::new());
//!     store.put(&ObjectLocation::new("uploads", "report.pdf"), b"%PDF".to_vec());
//!
//!     let pipeline = ScanPipeline::builder()
//!         .with_store(store.clone())
//!         .with_scanner(Arc::new(MockScanner::new_clean()))
//!         .with_notifier(Arc::new(RecordingNotifier::new()))
//!         .with_refresher(Arc::new(StaticRefresher::skipped()))
//!         .with_routes(RoutingTable::new(Some("clean".into()), Some("quarantine".into())))
//!         .build()?;
//!
//!     let summary = pipeline.run(&ScanRequest::new("uploads", "report.pdf")).await?;
//!     assert_eq!(summary.verdict, Verdict::Clean);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - **Core**: requests, verdicts, event parsing, errors, the `Scanner` trait
//! - **Backends**: `clamscan` and a mock scanner
//! - **Signatures**: per-scan refresh and the scheduled definitions update
//! - **Storage**: the `ObjectStore` trait, S3 and in-memory stores
//! - **Notify**: the `Notifier` trait, SNS and a recording notifier
//! - **Pipeline**: the state machine tying the above together
//! - **Audit**: structured audit events under `scanroute::audit`
//! - **Config**, **Telemetry**, **Bootstrap**: process wiring for the binary

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod audit;
pub mod backends;
pub mod bootstrap;
pub mod config;
pub mod core;
pub mod notify;
pub mod pipeline;
pub mod signatures;
pub mod storage;
pub mod telemetry;

// Re-export commonly used types at the crate root
pub use crate::config::Configuration;
pub use crate::core::{
    Acknowledgement, NotificationMessage, ObjectLocation, PipelineError, RoutingOutcome,
    ScanReport, ScanRequest, Scanner, Verdict,
};
pub use crate::pipeline::{PipelineState, ScanPipeline, ScanSummary};

/// Prelude module for convenient imports.
///
/// ```rust
/// use scanroute::prelude::*;
/// ```
pub mod prelude {
    pub use crate::backends::{ClamAvConfig, ClamAvScanner, MockScanner};
    pub use crate::core::{
        Acknowledgement, NotificationMessage, ObjectLocation, PipelineError, RoutingOutcome,
        ScanReport, ScanRequest, Scanner, Verdict,
    };
    pub use crate::notify::{Notifier, RecordingNotifier, SnsNotifier};
    pub use crate::pipeline::{
        NotificationStatus, PipelineState, RoutingTable, ScanPipeline, ScanSummary, TopicTable,
    };
    pub use crate::signatures::{
        FreshclamRefresher, RefreshOutcome, SignatureRefresher, StaticRefresher,
    };
    pub use crate::storage::{InMemoryObjectStore, ObjectStore, S3ObjectStore};
}
