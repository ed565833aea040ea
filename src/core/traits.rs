//! Core traits for the scanroute library.
//!
//! This module defines the `Scanner` trait that all scanning backends
//! must implement.

use crate::core::error::ClassificationError;
use crate::core::types::{ScanReport, Verdict};

use async_trait::async_trait;
use std::fmt::Debug;
use std::path::Path;

/// A signature-based content scanner.
///
/// Scanners are one-shot: each call runs the engine once against a local
/// file and returns its raw report. Verdict derivation is shared by all
/// engines and lives in [`Verdict::from_report`].
///
/// # Implementation Notes
///
/// - Implementations must be `Send + Sync` so one instance can serve
///   concurrent invocations.
/// - An engine that runs and reports its own error should return `Ok` with
///   that report. `Err` is reserved for failing to run the engine at all.
/// - Implementations never retry.
///
/// # Example Implementation
///
/// ```rust,ignore
/// use scanroute::core::{ClassificationError, ScanReport, Scanner};
/// use async_trait::async_trait;
/// use std::path::Path;
///
/// #[derive(Debug)]
/// struct EchoScanner;
///
/// #[async_trait]
/// impl Scanner for EchoScanner {
///     fn name(&self) -> &str {
///         "echo"
///     }
///
///     async fn scan(&self, path: &Path) -> Result<ScanReport, ClassificationError> {
///         Ok(ScanReport::new("echo", format!("{}: OK", path.display())))
///     }
/// }
/// ```
#[async_trait]
pub trait Scanner: Send + Sync + Debug {
    /// Returns the name of this scanner engine.
    fn name(&self) -> &str;

    /// Runs the engine against the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns `ClassificationError` when the engine could not be run or
    /// did not finish in time.
    async fn scan(&self, path: &Path) -> Result<ScanReport, ClassificationError>;

    /// Scans `path` and derives its verdict.
    async fn classify(&self, path: &Path) -> Result<(Verdict, ScanReport), ClassificationError> {
        let report = self.scan(path).await?;
        Ok((report.verdict(), report))
    }
}

/// An arc-wrapped scanner for shared ownership.
pub type ArcScanner = std::sync::Arc<dyn Scanner>;
