//! End-to-end scenarios for the scan-and-route pipeline, run against the
//! in-memory store, the recording notifier and the mock scanner.

use scanroute::backends::MockScanner;
use scanroute::core::{Acknowledgement, ObjectLocation, RoutingOutcome, Verdict, AV_STATUS_TAG};
use scanroute::notify::RecordingNotifier;
use scanroute::pipeline::{NotificationStatus, PipelineState, RoutingTable, ScanPipeline, TopicTable};
use scanroute::signatures::{RefreshOutcome, StaticRefresher};
use scanroute::storage::{InMemoryObjectStore, StoreOperation};

use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

struct Harness {
    store: Arc<InMemoryObjectStore>,
    scanner: Arc<MockScanner>,
    notifier: Arc<RecordingNotifier>,
    work: TempDir,
    pipeline: ScanPipeline,
}

struct Setup {
    scanner: MockScanner,
    notifier: RecordingNotifier,
    refresh: RefreshOutcome,
    routes: RoutingTable,
    topics: TopicTable,
}

impl Default for Setup {
    fn default() -> Self {
        Self {
            scanner: MockScanner::new_clean(),
            notifier: RecordingNotifier::new(),
            refresh: RefreshOutcome::Updated { signature_files: 3 },
            routes: RoutingTable::new(Some("clean".into()), Some("quarantine".into())),
            topics: TopicTable::new(Some("arn:clean".into()), Some("arn:infected".into())),
        }
    }
}

impl Setup {
    fn build(self) -> Harness {
        let store = Arc::new(InMemoryObjectStore::new());
        let scanner = Arc::new(self.scanner);
        let notifier = Arc::new(self.notifier);
        let work = tempfile::tempdir().unwrap();

        let pipeline = ScanPipeline::builder()
            .with_store(store.clone())
            .with_scanner(scanner.clone())
            .with_notifier(notifier.clone())
            .with_refresher(Arc::new(StaticRefresher::new(self.refresh)))
            .with_routes(self.routes)
            .with_topics(self.topics)
            .with_work_dir(work.path())
            .build()
            .unwrap();

        Harness {
            store,
            scanner,
            notifier,
            work,
            pipeline,
        }
    }
}

fn event(bucket: &str, key: &str) -> Value {
    json!({
        "Records": [{
            "eventSource": "aws:s3",
            "eventName": "ObjectCreated:Put",
            "s3": {
                "bucket": { "name": bucket },
                "object": { "key": key, "size": 8 }
            }
        }]
    })
}

fn work_dir_is_empty(dir: &Path) -> bool {
    std::fs::read_dir(dir).unwrap().next().is_none()
}

fn source() -> ObjectLocation {
    ObjectLocation::new("uploads", "docs/report.pdf")
}

#[tokio::test]
async fn clean_object_is_tagged_moved_and_announced() {
    let h = Setup {
        topics: TopicTable::new(Some("arn:clean".into()), None),
        routes: RoutingTable::new(Some("clean".into()), None),
        ..Setup::default()
    }
    .build();
    h.store.put(&source(), b"%PDF-1.7".to_vec());

    let ack = h.pipeline.process_event(&event("uploads", "docs/report.pdf")).await;
    assert_eq!(ack, Acknowledgement::scan_complete());

    let destination = ObjectLocation::new("clean", "docs/report.pdf");
    assert!(h.store.contains(&destination));
    assert!(!h.store.contains(&source()));
    assert_eq!(
        h.store
            .tags(&destination)
            .and_then(|t| t.get(AV_STATUS_TAG).cloned())
            .as_deref(),
        Some("clean")
    );
    assert_eq!(
        h.store.operations(),
        vec![
            StoreOperation::Download,
            StoreOperation::Tag,
            StoreOperation::Copy,
            StoreOperation::Delete
        ]
    );
    assert_eq!(h.store.calls()[1].location, source());

    let published = h.notifier.published();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].topic, "arn:clean");
    assert_eq!(published[0].message.subject, "File Scan Result: CLEAN");
    assert_eq!(
        published[0].message.body,
        "Scan of s3://uploads/docs/report.pdf is clean. File moved to clean bucket: clean"
    );
}

#[tokio::test]
async fn infected_object_is_quarantined_and_announced() {
    let h = Setup {
        scanner: MockScanner::new_infected(),
        routes: RoutingTable::new(None, Some("quarantine".into())),
        topics: TopicTable::new(None, Some("arn:infected".into())),
        ..Setup::default()
    }
    .build();
    h.store.put(&source(), b"X5O!P%@AP".to_vec());

    let summary = h
        .pipeline
        .run(&scanroute::ScanRequest::new("uploads", "docs/report.pdf"))
        .await
        .unwrap();

    assert_eq!(summary.verdict, Verdict::Infected);
    let destination = ObjectLocation::new("quarantine", "docs/report.pdf");
    assert_eq!(
        summary.routing,
        RoutingOutcome::Moved {
            destination: destination.clone()
        }
    );
    assert!(h.store.contains(&destination));
    assert!(!h.store.contains(&source()));
    assert_eq!(h.store.tags(&destination), Some(Verdict::Infected.tags()));

    let published = h.notifier.published();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].topic, "arn:infected");
    assert_eq!(published[0].message.subject, "File Scan Result: INFECTED");
    assert_eq!(
        summary.notification,
        NotificationStatus::Published {
            topic: "arn:infected".into()
        }
    );
}

#[tokio::test]
async fn missing_object_ends_quietly_without_side_effects() {
    let h = Setup::default().build();

    let ack = h.pipeline.process_event(&event("uploads", "docs/report.pdf")).await;

    assert_eq!(ack, Acknowledgement::scan_complete());
    assert_eq!(h.store.operations(), vec![StoreOperation::Download]);
    assert_eq!(h.scanner.scan_count(), 0);
    assert!(h.notifier.published().is_empty());
    assert!(work_dir_is_empty(h.work.path()));
}

#[tokio::test]
async fn malformed_events_make_no_calls() {
    let h = Setup::default().build();
    let malformed = [
        json!({}),
        json!({ "Records": [] }),
        json!({ "Records": [{ "s3": { "object": { "key": "a.txt" } } }] }),
        json!({ "Records": [{ "s3": { "bucket": { "name": "uploads" } } }] }),
        json!({ "Records": [{ "s3": { "bucket": { "name": "uploads" }, "object": { "key": "" } } }] }),
        json!("not an event"),
    ];

    for payload in &malformed {
        let ack = h.pipeline.process_event(payload).await;
        assert_eq!(ack, Acknowledgement::scan_complete());
    }

    assert!(h.store.calls().is_empty());
    assert!(h.notifier.published().is_empty());
    assert_eq!(h.scanner.scan_count(), 0);
}

#[tokio::test]
async fn encoded_key_is_decoded_before_use() {
    let h = Setup::default().build();
    let location = ObjectLocation::new("uploads", "my docs/q1 report (final).pdf");
    h.store.put(&location, b"pdf".to_vec());

    h.pipeline
        .process_event(&event("uploads", "my+docs/q1%20report+%28final%29.pdf"))
        .await;

    assert_eq!(h.store.calls()[0].location, location);
    assert!(h.store.contains(&location.in_bucket("clean")));
    let scanned = h.scanner.scanned_paths();
    assert_eq!(
        scanned[0].0.file_name().unwrap(),
        "q1 report (final).pdf"
    );
}

#[tokio::test]
async fn unset_destination_leaves_object_in_place() {
    let h = Setup {
        scanner: MockScanner::new_infected(),
        routes: RoutingTable::new(Some("clean".into()), None),
        ..Setup::default()
    }
    .build();
    h.store.put(&source(), b"bad".to_vec());

    let summary = h
        .pipeline
        .run(&scanroute::ScanRequest::new("uploads", "docs/report.pdf"))
        .await
        .unwrap();

    assert_eq!(summary.routing, RoutingOutcome::LeftInPlace);
    assert!(h.store.contains(&source()));
    assert_eq!(h.store.tags(&source()), Some(Verdict::Infected.tags()));
    assert_eq!(
        h.store.operations(),
        vec![StoreOperation::Download, StoreOperation::Tag]
    );

    let published = h.notifier.published();
    assert_eq!(published.len(), 1);
    assert_eq!(
        published[0].message.body,
        "Scan of s3://uploads/docs/report.pdf is infected."
    );
}

#[tokio::test]
async fn unset_topic_skips_notification() {
    let h = Setup {
        topics: TopicTable::new(None, Some("arn:infected".into())),
        ..Setup::default()
    }
    .build();
    h.store.put(&source(), b"ok".to_vec());

    let summary = h
        .pipeline
        .run(&scanroute::ScanRequest::new("uploads", "docs/report.pdf"))
        .await
        .unwrap();

    assert_eq!(summary.notification, NotificationStatus::Skipped);
    assert!(h.notifier.published().is_empty());
    assert!(summary.routing.is_moved());
}

#[tokio::test]
async fn artifact_exists_during_scan_and_is_gone_afterwards() {
    let h = Setup::default().build();
    h.store.put(&source(), b"content".to_vec());

    let summary = h
        .pipeline
        .run(&scanroute::ScanRequest::new("uploads", "docs/report.pdf"))
        .await
        .unwrap();

    let scanned = h.scanner.scanned_paths();
    assert_eq!(scanned.len(), 1);
    let (path, existed) = &scanned[0];
    assert!(existed);
    assert!(path.starts_with(h.work.path()));
    assert!(!path.exists());
    assert!(work_dir_is_empty(h.work.path()));
    assert_eq!(summary.final_state, PipelineState::CleanedUp);
    assert_eq!(summary.fingerprint.map(|f| f.size), Some(7));
}

#[tokio::test]
async fn scanner_failure_is_fatal_and_cleans_up() {
    let h = Setup {
        scanner: MockScanner::new_failing("clamscan not installed"),
        ..Setup::default()
    }
    .build();
    h.store.put(&source(), b"content".to_vec());

    let err = h
        .pipeline
        .run(&scanroute::ScanRequest::new("uploads", "docs/report.pdf"))
        .await
        .unwrap_err();

    assert!(err.is_classification());
    assert_eq!(err.reached, PipelineState::Downloaded);
    assert_eq!(err.stage(), "classify");
    assert_eq!(h.store.operations(), vec![StoreOperation::Download]);
    assert!(h.store.contains(&source()));
    assert!(h.notifier.published().is_empty());
    assert!(work_dir_is_empty(h.work.path()));
}

#[tokio::test]
async fn tag_failure_prevents_routing_and_notification() {
    let h = Setup::default().build();
    h.store.put(&source(), b"content".to_vec());
    h.store.fail_on(StoreOperation::Tag);

    let ack = h.pipeline.process_event(&event("uploads", "docs/report.pdf")).await;

    assert_eq!(ack, Acknowledgement::scan_complete());
    assert_eq!(
        h.store.operations(),
        vec![StoreOperation::Download, StoreOperation::Tag]
    );
    assert!(h.store.contains(&source()));
    assert!(h.notifier.published().is_empty());
    assert!(work_dir_is_empty(h.work.path()));
}

#[tokio::test]
async fn copy_failure_keeps_tag_on_source() {
    let h = Setup::default().build();
    h.store.put(&source(), b"content".to_vec());
    h.store.fail_on(StoreOperation::Copy);

    let err = h
        .pipeline
        .run(&scanroute::ScanRequest::new("uploads", "docs/report.pdf"))
        .await
        .unwrap_err();

    assert!(err.is_storage());
    assert_eq!(err.stage(), "route");
    assert!(h.store.contains(&source()));
    assert_eq!(h.store.tags(&source()), Some(Verdict::Clean.tags()));
    assert!(!h.store.contains(&ObjectLocation::new("clean", "docs/report.pdf")));
    assert!(h.notifier.published().is_empty());
    assert!(work_dir_is_empty(h.work.path()));
}

#[tokio::test]
async fn delete_failure_leaves_object_in_both_buckets() {
    let h = Setup::default().build();
    h.store.put(&source(), b"content".to_vec());
    h.store.fail_on(StoreOperation::Delete);

    let err = h
        .pipeline
        .run(&scanroute::ScanRequest::new("uploads", "docs/report.pdf"))
        .await
        .unwrap_err();

    assert_eq!(err.reached, PipelineState::Tagged);
    assert!(h.store.contains(&source()));
    assert!(h.store.contains(&ObjectLocation::new("clean", "docs/report.pdf")));
    assert!(h.notifier.published().is_empty());
}

#[tokio::test]
async fn notification_failure_does_not_undo_routing() {
    let h = Setup {
        notifier: RecordingNotifier::new_failing(),
        ..Setup::default()
    }
    .build();
    h.store.put(&source(), b"content".to_vec());

    let summary = h
        .pipeline
        .run(&scanroute::ScanRequest::new("uploads", "docs/report.pdf"))
        .await
        .unwrap();

    assert!(matches!(
        summary.notification,
        NotificationStatus::Failed { ref topic, .. } if topic == "arn:clean"
    ));
    assert!(summary.routing.is_moved());
    assert!(h.store.contains(&ObjectLocation::new("clean", "docs/report.pdf")));
    assert_eq!(summary.final_state, PipelineState::CleanedUp);
}

#[tokio::test]
async fn refresh_timeout_does_not_block_scan() {
    let h = Setup {
        refresh: RefreshOutcome::TimedOut {
            after: Duration::from_secs(120),
        },
        ..Setup::default()
    }
    .build();
    h.store.put(&source(), b"content".to_vec());

    let summary = h
        .pipeline
        .run(&scanroute::ScanRequest::new("uploads", "docs/report.pdf"))
        .await
        .unwrap();

    assert!(!summary.refresh.is_updated());
    assert_eq!(h.scanner.scan_count(), 1);
    assert!(summary.routing.is_moved());
}

#[tokio::test]
async fn destination_equal_to_source_is_not_moved() {
    let h = Setup {
        routes: RoutingTable::new(Some("uploads".into()), Some("quarantine".into())),
        ..Setup::default()
    }
    .build();
    h.store.put(&source(), b"content".to_vec());

    let summary = h
        .pipeline
        .run(&scanroute::ScanRequest::new("uploads", "docs/report.pdf"))
        .await
        .unwrap();

    assert_eq!(summary.routing, RoutingOutcome::LeftInPlace);
    assert!(h.store.contains(&source()));
    assert_eq!(
        h.store.operations(),
        vec![StoreOperation::Download, StoreOperation::Tag]
    );
}

#[tokio::test]
async fn scanner_error_output_counts_as_clean() {
    let h = Setup {
        scanner: MockScanner::with_report("ERROR: Can't open file or directory\nInfected files: 0"),
        ..Setup::default()
    }
    .build();
    h.store.put(&source(), b"content".to_vec());

    let summary = h
        .pipeline
        .run(&scanroute::ScanRequest::new("uploads", "docs/report.pdf"))
        .await
        .unwrap();

    assert_eq!(summary.verdict, Verdict::Clean);
    assert!(h.store.contains(&ObjectLocation::new("clean", "docs/report.pdf")));
}
