//! Layered configuration.
//!
//! Sources, lowest precedence first:
//!
//! 1. built-in defaults
//! 2. `scanroute.toml` in the working directory, or the file given with `--config`
//! 3. `SCANROUTE__`-prefixed environment variables, `__` separating sections
//!    (`SCANROUTE__SCANNER__SCAN_TIMEOUT=10m`)
//! 4. the deployment variables `CLEAN_BUCKET`, `QUARANTINE_BUCKET`,
//!    `CLEAN_TOPIC_ARN`, `INFECTED_TOPIC_ARN` and `CLAMAV_DEFS_BUCKET`
//!
//! Configuration is read once at startup. An empty bucket or topic is the
//! same as an unset one.

use crate::backends::ClamAvConfig;
use crate::pipeline::{RoutingTable, TopicTable};
use crate::signatures::FreshclamConfig;
use crate::storage::S3StoreConfig;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "scanroute.toml";

/// Prefix of nested environment overrides.
pub const ENV_PREFIX: &str = "SCANROUTE__";

/// Flat deployment variables for destinations and topics.
const ROUTING_ENV_VARS: &[&str] = &[
    "CLEAN_BUCKET",
    "QUARANTINE_BUCKET",
    "CLEAN_TOPIC_ARN",
    "INFECTED_TOPIC_ARN",
];

/// Flat deployment variable naming the definitions bucket.
const DEFINITIONS_BUCKET_ENV_VAR: &str = "CLAMAV_DEFS_BUCKET";

/// Scanner and signature updater settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    /// `clamscan` binary.
    pub clamscan_path: PathBuf,
    /// `freshclam` binary.
    pub freshclam_path: PathBuf,
    /// Signature database directory.
    pub database_dir: PathBuf,
    /// Where the generated `freshclam.conf` is written.
    pub freshclam_config_path: PathBuf,
    /// Updater log file.
    pub freshclam_log_path: PathBuf,
    /// Signature mirror host.
    pub database_mirror: String,
    /// DNS record for the current database version.
    pub dns_database_info: String,
    /// Upper bound on one signature refresh.
    #[serde(with = "humantime_serde")]
    pub refresh_timeout: Duration,
    /// Upper bound on one scan.
    #[serde(with = "humantime_serde")]
    pub scan_timeout: Duration,
    /// Parent directory of local artifacts; the system temp dir if unset.
    pub work_dir: Option<PathBuf>,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        let freshclam = FreshclamConfig::default();
        let clamav = ClamAvConfig::default();
        Self {
            clamscan_path: clamav.binary,
            freshclam_path: freshclam.binary,
            database_dir: freshclam.database_dir,
            freshclam_config_path: freshclam.config_path,
            freshclam_log_path: freshclam.log_path,
            database_mirror: freshclam.database_mirror,
            dns_database_info: freshclam.dns_database_info,
            refresh_timeout: freshclam.timeout,
            scan_timeout: clamav.scan_timeout,
            work_dir: None,
        }
    }
}

impl ScannerConfig {
    /// Settings for the `clamscan` backend.
    pub fn clamav(&self) -> ClamAvConfig {
        ClamAvConfig::new()
            .with_binary(&self.clamscan_path)
            .with_database_dir(&self.database_dir)
            .with_scan_timeout(self.scan_timeout)
    }

    /// Settings for the `freshclam` refresher.
    pub fn freshclam(&self) -> FreshclamConfig {
        FreshclamConfig {
            binary: self.freshclam_path.clone(),
            config_path: self.freshclam_config_path.clone(),
            database_dir: self.database_dir.clone(),
            log_path: self.freshclam_log_path.clone(),
            database_mirror: self.database_mirror.clone(),
            dns_database_info: self.dns_database_info.clone(),
            timeout: self.refresh_timeout,
        }
    }

    /// Resolved artifact directory.
    pub fn work_dir(&self) -> PathBuf {
        self.work_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

/// Scheduled definitions update settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefinitionsConfig {
    /// Bucket the signature directory is published to.
    pub bucket: Option<String>,
    /// Local directory that is published.
    pub source_dir: PathBuf,
    /// Key prefix inside the bucket.
    pub prefix: String,
}

impl Default for DefinitionsConfig {
    fn default() -> Self {
        Self {
            bucket: None,
            source_dir: PathBuf::from("/tmp/clamav"),
            prefix: "clamav".to_string(),
        }
    }
}

/// Object store client settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Custom endpoint for S3-compatible stores.
    pub endpoint_url: Option<String>,
    /// Region override; the AWS default chain is used when unset.
    pub region: Option<String>,
    /// Use path-style addressing.
    pub force_path_style: bool,
}

impl StorageConfig {
    /// Settings for the S3 store.
    pub fn s3(&self) -> S3StoreConfig {
        S3StoreConfig {
            endpoint_url: self.endpoint_url.clone(),
            force_path_style: self.force_path_style,
        }
    }
}

/// Complete process configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Configuration {
    /// Destination for clean objects.
    pub clean_bucket: Option<String>,
    /// Destination for infected objects.
    pub quarantine_bucket: Option<String>,
    /// Topic announcing clean verdicts.
    pub clean_topic_arn: Option<String>,
    /// Topic announcing infected verdicts.
    pub infected_topic_arn: Option<String>,
    /// Scanner settings.
    pub scanner: ScannerConfig,
    /// Definitions update settings.
    pub definitions: DefinitionsConfig,
    /// Object store settings.
    pub storage: StorageConfig,
}

impl Configuration {
    /// Loads configuration from `scanroute.toml` and the environment.
    pub fn load() -> Result<Self, Box<figment::Error>> {
        Self::load_from(None)
    }

    /// Loads configuration, reading `path` instead of `scanroute.toml` when given.
    pub fn load_from(path: Option<&Path>) -> Result<Self, Box<figment::Error>> {
        let config: Self = Self::figment(path).extract().map_err(Box::new)?;
        Ok(config.normalized())
    }

    /// Returns the provider stack without extracting it.
    pub fn figment(path: Option<&Path>) -> Figment {
        let file = path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

        Figment::from(Serialized::defaults(Configuration::default()))
            .merge(Toml::file(file))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .merge(Env::raw().only(ROUTING_ENV_VARS))
            .merge(
                Env::raw()
                    .only(&[DEFINITIONS_BUCKET_ENV_VAR])
                    .map(|_| "definitions.bucket".into()),
            )
    }

    fn normalized(mut self) -> Self {
        fn blank_to_none(value: &mut Option<String>) {
            if value.as_deref().is_some_and(|v| v.trim().is_empty()) {
                *value = None;
            }
        }
        blank_to_none(&mut self.clean_bucket);
        blank_to_none(&mut self.quarantine_bucket);
        blank_to_none(&mut self.clean_topic_arn);
        blank_to_none(&mut self.infected_topic_arn);
        blank_to_none(&mut self.definitions.bucket);
        blank_to_none(&mut self.storage.endpoint_url);
        blank_to_none(&mut self.storage.region);
        self
    }

    /// Destination buckets per verdict.
    pub fn routing_table(&self) -> RoutingTable {
        RoutingTable::new(self.clean_bucket.clone(), self.quarantine_bucket.clone())
    }

    /// Notification topics per verdict.
    pub fn topic_table(&self) -> TopicTable {
        TopicTable::new(self.clean_topic_arn.clone(), self.infected_topic_arn.clone())
    }
}
