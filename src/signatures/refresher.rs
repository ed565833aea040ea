//! Best-effort signature database refresh.

use crate::core::RefreshError;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// File extensions of ClamAV signature databases.
const SIGNATURE_EXTENSIONS: &[&str] = &["cvd", "cld", "cud"];

/// What a refresh attempt achieved.
///
/// Refreshers report their outcome as a value rather than an error: the
/// scan pipeline reads it, logs anything other than `Updated`, and carries
/// on with whatever signatures are on disk.
#[must_use = "a refresh outcome should be inspected or explicitly ignored"]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RefreshOutcome {
    /// The updater ran to completion.
    Updated {
        /// Signature files present afterwards.
        signature_files: usize,
    },
    /// The updater did not finish within its budget.
    TimedOut {
        /// The budget.
        #[serde(with = "humantime_serde")]
        after: Duration,
    },
    /// The updater could not be run or exited unsuccessfully.
    Failed {
        /// Human-readable reason.
        reason: String,
    },
    /// No refresh was attempted.
    Skipped,
}

impl RefreshOutcome {
    /// Returns `true` for `Updated`.
    pub fn is_updated(&self) -> bool {
        matches!(self, Self::Updated { .. })
    }

    /// Converts the outcome into a result for callers that require success.
    pub fn into_result(self) -> Result<usize, RefreshError> {
        match self {
            Self::Updated { signature_files } => Ok(signature_files),
            Self::TimedOut { after } => Err(RefreshError::Timeout(after)),
            Self::Failed { reason } => Err(RefreshError::Unsuccessful(reason)),
            Self::Skipped => Err(RefreshError::Disabled),
        }
    }
}

impl From<RefreshError> for RefreshOutcome {
    fn from(err: RefreshError) -> Self {
        match err {
            RefreshError::Timeout(after) => Self::TimedOut { after },
            RefreshError::Disabled => Self::Skipped,
            other => Self::Failed {
                reason: other.to_string(),
            },
        }
    }
}

/// Updates the local signature database.
#[async_trait]
pub trait SignatureRefresher: Send + Sync + Debug {
    /// Attempts one bounded update. Never fails; see [`RefreshOutcome`].
    async fn refresh(&self) -> RefreshOutcome;
}

/// An arc-wrapped refresher for shared ownership.
pub type ArcRefresher = std::sync::Arc<dyn SignatureRefresher>;

/// Settings for [`FreshclamRefresher`].
#[derive(Debug, Clone)]
pub struct FreshclamConfig {
    /// Path to the `freshclam` binary.
    pub binary: PathBuf,
    /// Where the generated configuration file is written.
    pub config_path: PathBuf,
    /// Directory signatures are downloaded into.
    pub database_dir: PathBuf,
    /// Updater log file.
    pub log_path: PathBuf,
    /// Mirror host.
    pub database_mirror: String,
    /// DNS record consulted for the current database version.
    pub dns_database_info: String,
    /// Wall-clock budget for one update.
    pub timeout: Duration,
}

impl Default for FreshclamConfig {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("/usr/bin/freshclam"),
            config_path: PathBuf::from("/tmp/freshclam.conf"),
            database_dir: PathBuf::from("/tmp"),
            log_path: PathBuf::from("/tmp/freshclam.log"),
            database_mirror: "database.clamav.net".to_string(),
            dns_database_info: "current.cvd.clamav.net".to_string(),
            timeout: Duration::from_secs(120),
        }
    }
}

impl FreshclamConfig {
    /// Renders the minimal `freshclam.conf`.
    pub fn render(&self) -> String {
        format!(
            "DatabaseMirror {}\nDatabaseDirectory {}\nUpdateLogFile {}\nLogVerbose yes\nDNSDatabaseInfo {}\n",
            self.database_mirror,
            self.database_dir.display(),
            self.log_path.display(),
            self.dns_database_info,
        )
    }
}

/// Refreshes signatures by running `freshclam` once.
#[derive(Debug, Clone)]
pub struct FreshclamRefresher {
    config: FreshclamConfig,
}

impl FreshclamRefresher {
    /// Creates a refresher.
    pub fn new(config: FreshclamConfig) -> Self {
        Self { config }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &FreshclamConfig {
        &self.config
    }

    async fn run(&self) -> Result<usize, RefreshError> {
        tokio::fs::write(&self.config.config_path, self.config.render())
            .await
            .map_err(RefreshError::Config)?;

        let child = Command::new(&self.config.binary)
            .arg(format!("--config-file={}", self.config.config_path.display()))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(RefreshError::Spawn)?;

        let output = tokio::time::timeout(self.config.timeout, child.wait_with_output())
            .await
            .map_err(|_| RefreshError::Timeout(self.config.timeout))?
            .map_err(RefreshError::Spawn)?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        tracing::info!("FreshClam output: {}", stdout.trim());
        if !stderr.trim().is_empty() {
            tracing::warn!("FreshClam warnings: {}", stderr.trim());
        }

        if !output.status.success() {
            return Err(RefreshError::Failed {
                status: output.status.to_string(),
                stderr: stderr.trim().to_string(),
            });
        }

        Ok(count_signature_files(&self.config.database_dir))
    }
}

#[async_trait]
impl SignatureRefresher for FreshclamRefresher {
    async fn refresh(&self) -> RefreshOutcome {
        tracing::info!(
            database_dir = %self.config.database_dir.display(),
            "Updating ClamAV virus definitions"
        );
        let outcome = match self.run().await {
            Ok(signature_files) => RefreshOutcome::Updated { signature_files },
            Err(e) => RefreshOutcome::from(e),
        };
        tracing::info!(
            signature_files = count_signature_files(&self.config.database_dir),
            "Signature files present after refresh"
        );
        outcome
    }
}

/// Counts signature database files directly inside `dir`.
pub fn count_signature_files(dir: &Path) -> usize {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return 0;
    };
    entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            entry
                .path()
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| SIGNATURE_EXTENSIONS.contains(&ext))
                .unwrap_or(false)
        })
        .count()
}

/// Refresher that returns a fixed outcome without doing anything.
///
/// Useful in tests and when signatures are baked into the image.
#[derive(Debug, Clone)]
pub struct StaticRefresher {
    outcome: RefreshOutcome,
}

impl StaticRefresher {
    /// Always returns `outcome`.
    pub fn new(outcome: RefreshOutcome) -> Self {
        Self { outcome }
    }

    /// Always reports `Skipped`.
    pub fn skipped() -> Self {
        Self::new(RefreshOutcome::Skipped)
    }
}

#[async_trait]
impl SignatureRefresher for StaticRefresher {
    async fn refresh(&self) -> RefreshOutcome {
        self.outcome.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_in(dir: &Path) -> FreshclamConfig {
        FreshclamConfig {
            config_path: dir.join("freshclam.conf"),
            database_dir: dir.to_path_buf(),
            log_path: dir.join("freshclam.log"),
            ..FreshclamConfig::default()
        }
    }

    #[test]
    fn test_render_config() {
        let rendered = FreshclamConfig::default().render();
        assert_eq!(
            rendered,
            "DatabaseMirror database.clamav.net\n\
             DatabaseDirectory /tmp\n\
             UpdateLogFile /tmp/freshclam.log\n\
             LogVerbose yes\n\
             DNSDatabaseInfo current.cvd.clamav.net\n"
        );
    }

    #[test]
    fn test_count_signature_files() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["main.cvd", "daily.cld", "bytecode.cvd", "freshclam.log", "notes"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        assert_eq!(count_signature_files(dir.path()), 3);
        assert_eq!(count_signature_files(Path::new("/nonexistent/scanroute")), 0);
    }

    #[tokio::test]
    async fn test_missing_binary_is_reported_not_raised() {
        let dir = tempfile::tempdir().unwrap();
        let refresher = FreshclamRefresher::new(FreshclamConfig {
            binary: PathBuf::from("/nonexistent/scanroute/freshclam"),
            ..config_in(dir.path())
        });

        let outcome = refresher.refresh().await;
        assert!(matches!(outcome, RefreshOutcome::Failed { .. }));
        // The configuration file is written before the updater is launched.
        let written = std::fs::read_to_string(dir.path().join("freshclam.conf")).unwrap();
        assert!(written.contains("LogVerbose yes"));
    }

    #[tokio::test]
    async fn test_unwritable_config_is_reported() {
        let refresher = FreshclamRefresher::new(FreshclamConfig {
            config_path: PathBuf::from("/nonexistent/scanroute/freshclam.conf"),
            ..FreshclamConfig::default()
        });
        let err = refresher.refresh().await.into_result().unwrap_err();
        assert!(err.to_string().contains("configuration"));
    }

    #[test]
    fn test_outcome_into_result() {
        assert_eq!(
            RefreshOutcome::Updated { signature_files: 3 }
                .into_result()
                .unwrap(),
            3
        );
        assert!(matches!(
            RefreshOutcome::TimedOut {
                after: Duration::from_secs(120)
            }
            .into_result(),
            Err(RefreshError::Timeout(_))
        ));
        assert!(matches!(
            RefreshOutcome::Skipped.into_result(),
            Err(RefreshError::Disabled)
        ));
    }

    #[tokio::test]
    async fn test_static_refresher() {
        let refresher = StaticRefresher::new(RefreshOutcome::TimedOut {
            after: Duration::from_secs(1),
        });
        assert!(!refresher.refresh().await.is_updated());
    }
}
