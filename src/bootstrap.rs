//! Wires production collaborators from configuration.
//!
//! AWS clients are created once per process and shared by every
//! invocation the resulting pipeline serves.

use crate::backends::ClamAvScanner;
use crate::config::{Configuration, StorageConfig};
use crate::core::BuildError;
use crate::notify::SnsNotifier;
use crate::pipeline::ScanPipeline;
use crate::signatures::{DefinitionsPublisher, DefinitionsUpdater, FreshclamRefresher};
use crate::storage::{ArcObjectStore, S3ObjectStore};

use aws_config::{BehaviorVersion, Region, SdkConfig};
use std::sync::Arc;

/// Loads the shared AWS configuration, honouring a region override.
pub async fn load_sdk_config(storage: &StorageConfig) -> SdkConfig {
    let mut loader = aws_config::defaults(BehaviorVersion::latest());
    if let Some(region) = &storage.region {
        loader = loader.region(Region::new(region.clone()));
    }
    loader.load().await
}

fn object_store(sdk: &SdkConfig, storage: &StorageConfig) -> ArcObjectStore {
    Arc::new(S3ObjectStore::from_sdk_config(sdk, &storage.s3()))
}

/// Builds the scan pipeline backed by S3, SNS, `clamscan` and `freshclam`.
pub async fn build_pipeline(config: &Configuration) -> Result<ScanPipeline, BuildError> {
    let sdk = load_sdk_config(&config.storage).await;

    tracing::info!(
        clean_bucket = ?config.clean_bucket,
        quarantine_bucket = ?config.quarantine_bucket,
        clean_topic = ?config.clean_topic_arn,
        infected_topic = ?config.infected_topic_arn,
        "Building scan pipeline"
    );

    ScanPipeline::builder()
        .with_store(object_store(&sdk, &config.storage))
        .with_scanner(Arc::new(ClamAvScanner::new(config.scanner.clamav())))
        .with_notifier(Arc::new(SnsNotifier::from_sdk_config(&sdk)))
        .with_refresher(Arc::new(FreshclamRefresher::new(config.scanner.freshclam())))
        .with_routes(config.routing_table())
        .with_topics(config.topic_table())
        .with_work_dir(config.scanner.work_dir())
        .build()
}

/// Builds the scheduled definitions updater.
///
/// Signatures are downloaded straight into `definitions.source_dir`, which
/// is then published. No AWS client is created when no bucket is set.
pub async fn build_definitions_updater(config: &Configuration) -> DefinitionsUpdater {
    let mut freshclam = config.scanner.freshclam();
    freshclam.database_dir = config.definitions.source_dir.clone();
    let refresher = Arc::new(FreshclamRefresher::new(freshclam));

    let publisher = match &config.definitions.bucket {
        Some(bucket) => {
            let sdk = load_sdk_config(&config.storage).await;
            Some(DefinitionsPublisher::new(
                object_store(&sdk, &config.storage),
                bucket.clone(),
                config.definitions.prefix.clone(),
            ))
        }
        None => None,
    };

    DefinitionsUpdater::new(refresher, publisher, config.definitions.source_dir.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Acknowledgement;

    #[tokio::test]
    async fn test_updater_without_bucket_does_nothing() {
        let parent = tempfile::tempdir().unwrap();
        let mut config = Configuration::default();
        config.definitions.source_dir = parent.path().join("clamav");

        let updater = build_definitions_updater(&config).await;
        let ack: Option<Acknowledgement> = updater.run().await;
        assert_eq!(ack, None);
        assert!(!updater.source_dir().exists());
    }
}
