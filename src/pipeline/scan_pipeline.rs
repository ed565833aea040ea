//! The scan-and-route pipeline.

use crate::core::{
    Acknowledgement, ArcScanner, BuildError, FileHasher, Fingerprint, NotificationMessage,
    PipelineError, PipelineFailure, RoutingOutcome, ScanReport, ScanRequest, Verdict,
};
use crate::notify::ArcNotifier;
use crate::pipeline::artifact::LocalArtifact;
use crate::pipeline::routing::{route_object, RoutingTable, TopicTable};
use crate::pipeline::state::{PipelineState, StateTracker};
use crate::signatures::{ArcRefresher, RefreshOutcome};
use crate::storage::ArcObjectStore;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::Instrument;
use uuid::Uuid;

/// What happened to the notification of one invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum NotificationStatus {
    /// Published to `topic`.
    Published {
        /// Topic identifier.
        topic: String,
    },
    /// No topic is configured for the verdict.
    Skipped,
    /// Publishing failed; the message is lost.
    Failed {
        /// Topic identifier.
        topic: String,
        /// Reason reported by the notifier.
        reason: String,
    },
}

/// Result of one successful invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanSummary {
    /// Identifier of the invocation, also on every log line it produced.
    pub invocation_id: Uuid,
    /// What was scanned.
    pub request: ScanRequest,
    /// The verdict.
    pub verdict: Verdict,
    /// Raw scanner report.
    pub report: ScanReport,
    /// Fingerprint of the scanned bytes, if hashing succeeded.
    pub fingerprint: Option<Fingerprint>,
    /// Where the object ended up.
    pub routing: RoutingOutcome,
    /// What happened to the notification.
    pub notification: NotificationStatus,
    /// Outcome of the signature refresh that preceded the scan.
    pub refresh: RefreshOutcome,
    /// Final state; always `CleanedUp`.
    pub final_state: PipelineState,
    /// Wall-clock time of the invocation.
    #[serde(with = "humantime_serde")]
    pub duration: Duration,
    /// When the invocation finished.
    pub scanned_at: DateTime<Utc>,
}

/// Everything produced before cleanup.
struct StageResults {
    verdict: Verdict,
    report: ScanReport,
    fingerprint: Option<Fingerprint>,
    routing: RoutingOutcome,
    notification: NotificationStatus,
}

/// Builder for [`ScanPipeline`].
#[derive(Default)]
pub struct ScanPipelineBuilder {
    store: Option<ArcObjectStore>,
    scanner: Option<ArcScanner>,
    notifier: Option<ArcNotifier>,
    refresher: Option<ArcRefresher>,
    routes: RoutingTable,
    topics: TopicTable,
    work_dir: Option<PathBuf>,
}

impl ScanPipelineBuilder {
    /// Creates a builder with no collaborators and no destinations.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the object store.
    pub fn with_store(mut self, store: ArcObjectStore) -> Self {
        self.store = Some(store);
        self
    }

    /// Sets the scanner.
    pub fn with_scanner(mut self, scanner: ArcScanner) -> Self {
        self.scanner = Some(scanner);
        self
    }

    /// Sets the notifier.
    pub fn with_notifier(mut self, notifier: ArcNotifier) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Sets the signature refresher.
    pub fn with_refresher(mut self, refresher: ArcRefresher) -> Self {
        self.refresher = Some(refresher);
        self
    }

    /// Sets the destination buckets.
    pub fn with_routes(mut self, routes: RoutingTable) -> Self {
        self.routes = routes;
        self
    }

    /// Sets the notification topics.
    pub fn with_topics(mut self, topics: TopicTable) -> Self {
        self.topics = topics;
        self
    }

    /// Sets the directory local artifacts are created under.
    ///
    /// Defaults to the system temporary directory.
    pub fn with_work_dir(mut self, work_dir: impl Into<PathBuf>) -> Self {
        self.work_dir = Some(work_dir.into());
        self
    }

    /// Builds the pipeline.
    ///
    /// # Errors
    ///
    /// Fails if a collaborator is missing or the work directory is not a
    /// directory.
    pub fn build(self) -> Result<ScanPipeline, BuildError> {
        let store = self.store.ok_or(BuildError::MissingComponent("object store"))?;
        let scanner = self.scanner.ok_or(BuildError::MissingComponent("scanner"))?;
        let notifier = self
            .notifier
            .ok_or(BuildError::MissingComponent("notifier"))?;
        let refresher = self
            .refresher
            .ok_or(BuildError::MissingComponent("signature refresher"))?;

        let work_dir = self.work_dir.unwrap_or_else(std::env::temp_dir);
        let metadata = std::fs::metadata(&work_dir).map_err(BuildError::WorkDir)?;
        if !metadata.is_dir() {
            return Err(BuildError::WorkDir(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("{} is not a directory", work_dir.display()),
            )));
        }

        Ok(ScanPipeline {
            store,
            scanner,
            notifier,
            refresher,
            routes: self.routes,
            topics: self.topics,
            work_dir,
            hasher: FileHasher::new(),
        })
    }
}

/// Refresh, download, classify, tag, route, notify, clean up.
///
/// One pipeline serves any number of invocations; invocations share no
/// mutable state. Each runs its stages strictly in order.
///
/// # Example
///
/// ```rust,no_run
/// use scanroute::prelude::*;
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pipeline = ScanPipeline::builder()
///     .with_store(Arc::new(InMemoryObjectStore::new()))
///     .with_scanner(Arc::new(MockScanner::new_clean()))
///     .with_notifier(Arc::new(RecordingNotifier::new()))
///     .with_refresher(Arc::new(StaticRefresher::skipped()))
///     .with_routes(RoutingTable::new(Some("clean".into()), Some("quarantine".into())))
///     .build()?;
///
/// let event = serde_json::json!({
///     "Records": [{ "s3": { "bucket": { "name": "uploads" }, "object": { "key": "a.txt" } } }]
/// });
/// let ack = pipeline.process_event(&event).await;
/// assert_eq!(ack.status_code, 200);
/// # Ok(())
/// # }
/// ```
pub struct ScanPipeline {
    store: ArcObjectStore,
    scanner: ArcScanner,
    notifier: ArcNotifier,
    refresher: ArcRefresher,
    routes: RoutingTable,
    topics: TopicTable,
    work_dir: PathBuf,
    hasher: FileHasher,
}

impl ScanPipeline {
    /// Creates a new builder.
    pub fn builder() -> ScanPipelineBuilder {
        ScanPipelineBuilder::new()
    }

    /// Returns the destination buckets.
    pub fn routes(&self) -> &RoutingTable {
        &self.routes
    }

    /// Returns the notification topics.
    pub fn topics(&self) -> &TopicTable {
        &self.topics
    }

    /// Handles one trigger event and always acknowledges it.
    ///
    /// Failures are logged with bucket, key, and stage, then swallowed, so
    /// the trigger never redelivers an event whose object may already have
    /// been tagged or moved.
    pub async fn process_event(&self, event: &Value) -> Acknowledgement {
        let request = match ScanRequest::from_event(event) {
            Ok(request) => request,
            Err(e) => {
                tracing::error!(stage = "parse", error = %e, "Rejected trigger event");
                return Acknowledgement::scan_complete();
            }
        };

        match self.run(&request).await {
            Ok(summary) => {
                tracing::info!(
                    bucket = %request.bucket(),
                    key = %request.key(),
                    verdict = %summary.verdict,
                    duration_ms = summary.duration.as_millis() as u64,
                    "File scan complete"
                );
            }
            Err(e) => {
                tracing::error!(
                    bucket = %request.bucket(),
                    key = %request.key(),
                    stage = e.stage(),
                    error = %e,
                    "Scan invocation failed"
                );
            }
        }

        Acknowledgement::scan_complete()
    }

    /// Runs every stage for `request` and reports the outcome.
    ///
    /// The local artifact is removed before this returns, on success and
    /// on every error.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError` when download, classification, tagging, or
    /// routing fails. Refresh and notification failures are recorded in
    /// the summary instead.
    pub async fn run(&self, request: &ScanRequest) -> Result<ScanSummary, PipelineError> {
        let invocation_id = Uuid::new_v4();
        let span = tracing::info_span!(
            "scan_invocation",
            %invocation_id,
            bucket = %request.bucket(),
            key = %request.key()
        );
        self.run_invocation(invocation_id, request)
            .instrument(span)
            .await
    }

    async fn run_invocation(
        &self,
        invocation_id: Uuid,
        request: &ScanRequest,
    ) -> Result<ScanSummary, PipelineError> {
        let started = Instant::now();
        let mut tracker = StateTracker::new();

        let refresh = self.refresh_signatures().await;
        tracker.advance();

        let result = match LocalArtifact::create(&self.work_dir, request.source()) {
            Ok(artifact) => {
                let result = self.process_artifact(request, &artifact, &mut tracker).await;
                let path = artifact.path().to_path_buf();
                match artifact.cleanup() {
                    Ok(()) => tracing::debug!(path = %path.display(), "Removed local artifact"),
                    Err(e) => tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "Failed to remove local artifact"
                    ),
                }
                result
            }
            Err(e) => Err(PipelineError::new(
                tracker.current(),
                PipelineFailure::Artifact(e),
            )),
        };
        tracker.finish();

        match result {
            Ok(stages) => Ok(ScanSummary {
                invocation_id,
                request: request.clone(),
                verdict: stages.verdict,
                report: stages.report,
                fingerprint: stages.fingerprint,
                routing: stages.routing,
                notification: stages.notification,
                refresh,
                final_state: tracker.current(),
                duration: started.elapsed(),
                scanned_at: Utc::now(),
            }),
            Err(e) => {
                crate::audit::emit_invocation_failed(request, &e);
                Err(e)
            }
        }
    }

    async fn refresh_signatures(&self) -> RefreshOutcome {
        let outcome = self.refresher.refresh().await;
        match &outcome {
            RefreshOutcome::Updated { signature_files } => {
                tracing::info!(signature_files, "Signature definitions updated");
            }
            RefreshOutcome::TimedOut { after } => {
                tracing::warn!(
                    timeout_secs = after.as_secs(),
                    "Signature update timed out, scanning with existing definitions"
                );
            }
            RefreshOutcome::Failed { reason } => {
                tracing::warn!(
                    reason = %reason,
                    "Signature update failed, scanning with existing definitions"
                );
            }
            RefreshOutcome::Skipped => {
                tracing::debug!("Signature update skipped");
            }
        }
        outcome
    }

    async fn process_artifact(
        &self,
        request: &ScanRequest,
        artifact: &LocalArtifact,
        tracker: &mut StateTracker,
    ) -> Result<StageResults, PipelineError> {
        let source = request.source();

        let bytes = self
            .store
            .download(source, artifact.path())
            .await
            .map_err(|e| PipelineError::new(tracker.current(), e))?;
        tracker.advance();
        tracing::info!(
            bytes,
            path = %artifact.path().display(),
            "Downloaded object"
        );

        let fingerprint = match self.hasher.hash_file_async(artifact.path()).await {
            Ok(fingerprint) => Some(fingerprint),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to fingerprint local artifact");
                None
            }
        };

        tracing::info!(engine = self.scanner.name(), "Scanning file");
        let (verdict, report) = self
            .scanner
            .classify(artifact.path())
            .await
            .map_err(|e| PipelineError::new(tracker.current(), e))?;
        tracker.advance();
        tracing::info!(verdict = %verdict, engine = %report.engine, "Scan completed");
        crate::audit::emit_scan_completed(request, verdict, &report, fingerprint.as_ref());

        let tags = verdict.tags();
        self.store
            .tag(source, &tags)
            .await
            .map_err(|e| PipelineError::new(tracker.current(), e))?;
        tracker.advance();
        crate::audit::emit_object_tagged(source, verdict);

        let routing = route_object(&*self.store, source, verdict, &self.routes)
            .await
            .map_err(|e| PipelineError::new(tracker.current(), e))?;
        tracker.advance();
        crate::audit::emit_object_routed(source, verdict, &routing);

        let message = NotificationMessage::compose(request, verdict, &routing);
        let notification = self.notify(verdict, &message).await;
        tracker.advance();

        Ok(StageResults {
            verdict,
            report,
            fingerprint,
            routing,
            notification,
        })
    }

    async fn notify(&self, verdict: Verdict, message: &NotificationMessage) -> NotificationStatus {
        let Some(topic) = self.topics.topic_for(verdict) else {
            tracing::info!(verdict = %verdict, "No topic configured, skipping notification");
            return NotificationStatus::Skipped;
        };

        match self.notifier.publish(topic, message).await {
            Ok(()) => {
                crate::audit::emit_notification_published(topic, verdict, &message.subject);
                NotificationStatus::Published {
                    topic: topic.to_string(),
                }
            }
            Err(e) => {
                tracing::warn!(
                    topic = %topic,
                    error = %e,
                    "Notification publish failed, message dropped"
                );
                NotificationStatus::Failed {
                    topic: topic.to_string(),
                    reason: e.to_string(),
                }
            }
        }
    }
}

impl std::fmt::Debug for ScanPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanPipeline")
            .field("scanner", &self.scanner.name())
            .field("routes", &self.routes)
            .field("topics", &self.topics)
            .field("work_dir", &self.work_dir)
            .finish()
    }
}
