//! Mock scanner for testing.
//!
//! This module provides a configurable mock scanner that can be used
//! in tests to simulate scanner reports and failures without requiring a
//! real scanning engine.

use crate::core::{ClassificationError, ScanReport, Scanner, INFECTED_MARKER};

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

#[derive(Debug, Clone)]
enum MockBehavior {
    Report(String),
    Fail(String),
}

/// A mock scanner for testing purposes.
///
/// # Examples
///
/// ```rust
/// use scanroute::backends::MockScanner;
///
/// // Reports every file as clean
/// let scanner = MockScanner::new_clean();
///
/// // Reports every file as infected
/// let scanner = MockScanner::new_infected();
///
/// // Cannot run at all
/// let scanner = MockScanner::new_failing("binary missing");
/// ```
#[derive(Debug)]
pub struct MockScanner {
    /// Name of this scanner instance.
    name: String,
    /// What every scan returns.
    behavior: MockBehavior,
    /// Counter for scan operations.
    scan_count: AtomicU64,
    /// Paths passed to `scan`, and whether each existed at that moment.
    scanned: RwLock<Vec<(PathBuf, bool)>>,
}

impl MockScanner {
    /// Creates a mock scanner that returns the given report text.
    pub fn with_report(report: impl Into<String>) -> Self {
        Self {
            name: "mock".to_string(),
            behavior: MockBehavior::Report(report.into()),
            scan_count: AtomicU64::new(0),
            scanned: RwLock::new(Vec::new()),
        }
    }

    /// Creates a mock scanner that always reports clean.
    pub fn new_clean() -> Self {
        Self::with_report("----------- SCAN SUMMARY -----------\nInfected files: 0\n")
    }

    /// Creates a mock scanner that always reports one infected file.
    pub fn new_infected() -> Self {
        Self::with_report(format!(
            "artifact: Eicar-Signature FOUND\n----------- SCAN SUMMARY -----------\n{INFECTED_MARKER}\n"
        ))
    }

    /// Creates a mock scanner that can never be run.
    pub fn new_failing(reason: impl Into<String>) -> Self {
        Self {
            behavior: MockBehavior::Fail(reason.into()),
            ..Self::with_report("")
        }
    }

    /// Sets the name of this scanner.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Returns the number of scans performed.
    pub fn scan_count(&self) -> u64 {
        self.scan_count.load(Ordering::Relaxed)
    }

    /// Returns every scanned path and whether it existed when scanned.
    pub fn scanned_paths(&self) -> Vec<(PathBuf, bool)> {
        self.scanned
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl Default for MockScanner {
    fn default() -> Self {
        Self::new_clean()
    }
}

#[async_trait]
impl Scanner for MockScanner {
    fn name(&self) -> &str {
        &self.name
    }

    async fn scan(&self, path: &Path) -> Result<ScanReport, ClassificationError> {
        self.scan_count.fetch_add(1, Ordering::Relaxed);
        self.scanned
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push((path.to_path_buf(), path.exists()));

        match &self.behavior {
            MockBehavior::Report(output) => Ok(ScanReport::new(self.name.clone(), output.clone())),
            MockBehavior::Fail(reason) => Err(ClassificationError::failed(&self.name, reason.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Verdict;

    #[tokio::test]
    async fn test_mock_scanner_clean() {
        let scanner = MockScanner::new_clean();
        let (verdict, _) = scanner.classify(Path::new("/tmp/a")).await.unwrap();
        assert_eq!(verdict, Verdict::Clean);
        assert_eq!(scanner.scan_count(), 1);
    }

    #[tokio::test]
    async fn test_mock_scanner_infected() {
        let scanner = MockScanner::new_infected().with_name("eicar");
        let (verdict, report) = scanner.classify(Path::new("/tmp/a")).await.unwrap();
        assert_eq!(verdict, Verdict::Infected);
        assert_eq!(report.engine, "eicar");
    }

    #[tokio::test]
    async fn test_mock_scanner_failure_records_path() {
        let scanner = MockScanner::new_failing("no binary");
        let err = scanner.scan(Path::new("/nonexistent/x")).await.unwrap_err();
        assert!(err.to_string().contains("no binary"));
        assert_eq!(
            scanner.scanned_paths(),
            vec![(PathBuf::from("/nonexistent/x"), false)]
        );
    }
}
