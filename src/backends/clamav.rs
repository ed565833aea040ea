//! ClamAV scanning backend.
//!
//! This module provides a scanner that runs the `clamscan` command-line
//! scanner once per file against a local signature directory.
//!
//! # Requirements
//!
//! - `clamscan` installed (default `/usr/bin/clamscan`)
//! - A signature directory populated by a
//!   [`SignatureRefresher`](crate::signatures::SignatureRefresher) or baked
//!   into the image

use crate::core::{ClassificationError, ScanReport, Scanner};

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;

/// Name reported by this backend.
const ENGINE: &str = "clamscan";

/// `clamscan` exit status for "some error occurred".
const EXIT_ERROR: i32 = 2;

/// ClamAV scanner configuration.
#[derive(Debug, Clone)]
pub struct ClamAvConfig {
    /// Path to the `clamscan` binary.
    pub binary: PathBuf,

    /// Signature database directory passed as `--database`.
    pub database_dir: PathBuf,

    /// Upper bound on one scan.
    pub scan_timeout: Duration,
}

impl Default for ClamAvConfig {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("/usr/bin/clamscan"),
            database_dir: PathBuf::from("/tmp"),
            scan_timeout: Duration::from_secs(300),
        }
    }
}

impl ClamAvConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the scanner binary.
    pub fn with_binary(mut self, binary: impl Into<PathBuf>) -> Self {
        self.binary = binary.into();
        self
    }

    /// Sets the signature database directory.
    pub fn with_database_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.database_dir = dir.into();
        self
    }

    /// Sets the scan timeout.
    pub fn with_scan_timeout(mut self, timeout: Duration) -> Self {
        self.scan_timeout = timeout;
        self
    }
}

/// ClamAV scanner implementation.
///
/// Runs `clamscan --database=<dir> --verbose <file>` and captures its
/// report. The process exit code does not influence the verdict.
///
/// # Example
///
/// ```rust,ignore
/// use scanroute::backends::{ClamAvConfig, ClamAvScanner};
///
/// let scanner = ClamAvScanner::new(ClamAvConfig::new().with_database_dir("/tmp"));
/// let (verdict, report) = scanner.classify(path).await?;
/// ```
#[derive(Debug)]
pub struct ClamAvScanner {
    config: ClamAvConfig,
}

impl ClamAvScanner {
    /// Creates a new ClamAV scanner with the given configuration.
    pub fn new(config: ClamAvConfig) -> Self {
        Self { config }
    }

    /// Creates a ClamAV scanner with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(ClamAvConfig::default())
    }

    /// Returns the configuration.
    pub fn config(&self) -> &ClamAvConfig {
        &self.config
    }

    fn command(&self, path: &Path) -> Command {
        let mut command = Command::new(&self.config.binary);
        command
            .arg(format!("--database={}", self.config.database_dir.display()))
            .arg("--verbose")
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        command
    }
}

#[async_trait]
impl Scanner for ClamAvScanner {
    fn name(&self) -> &str {
        ENGINE
    }

    async fn scan(&self, path: &Path) -> Result<ScanReport, ClassificationError> {
        let start = Instant::now();
        tracing::info!(path = %path.display(), "Starting ClamAV scan");

        let child = self
            .command(path)
            .spawn()
            .map_err(|source| ClassificationError::Spawn {
                engine: ENGINE.to_string(),
                source,
            })?;

        let output = match tokio::time::timeout(self.config.scan_timeout, child.wait_with_output())
            .await
        {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => return Err(ClassificationError::failed(ENGINE, e.to_string())),
            Err(_) => {
                return Err(ClassificationError::Timeout {
                    engine: ENGINE.to_string(),
                    elapsed: self.config.scan_timeout,
                })
            }
        };

        let report = ScanReport {
            engine: ENGINE.to_string(),
            output: String::from_utf8_lossy(&output.stdout).into_owned(),
            diagnostics: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code: output.status.code(),
            duration: start.elapsed(),
        };

        tracing::info!(
            exit_code = ?report.exit_code,
            duration_ms = report.duration.as_millis() as u64,
            "ClamAV scan output:\n{}",
            report.output
        );
        if report.exit_code == Some(EXIT_ERROR) {
            // The report still decides the verdict; without the marker it is clean.
            tracing::warn!(
                stderr = %report.diagnostics.trim(),
                "clamscan reported an error, verdict falls back to report contents"
            );
        }

        Ok(report)
    }
}
