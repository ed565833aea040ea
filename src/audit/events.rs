//! Audit event types and emission functions.

use crate::core::{
    Fingerprint, ObjectLocation, PipelineError, RoutingOutcome, ScanReport, ScanRequest, Verdict,
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Target every audit event is emitted under.
pub const AUDIT_TARGET: &str = "scanroute::audit";

/// Base trait for audit events.
pub trait AuditEvent: Serialize {
    /// Returns the event type name.
    fn event_type(&self) -> &'static str;

    /// Returns the timestamp of the event.
    fn timestamp(&self) -> DateTime<Utc>;
}

/// Audit record of one verdict.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanAuditEvent {
    /// Timestamp of the event.
    pub timestamp: DateTime<Utc>,

    /// Object that was scanned.
    pub location: ObjectLocation,

    /// The verdict.
    pub verdict: Verdict,

    /// Engine that produced the report.
    pub engine: String,

    /// Scanner exit code, if it exited normally.
    pub exit_code: Option<i32>,

    /// Scan duration in milliseconds.
    pub duration_ms: u64,

    /// BLAKE3 hash of the scanned bytes.
    pub file_hash_blake3: Option<String>,

    /// Size of the scanned bytes.
    pub file_size: Option<u64>,
}

impl ScanAuditEvent {
    /// Builds the event for a finished scan.
    pub fn new(
        request: &ScanRequest,
        verdict: Verdict,
        report: &ScanReport,
        fingerprint: Option<&Fingerprint>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            location: request.source().clone(),
            verdict,
            engine: report.engine.clone(),
            exit_code: report.exit_code,
            duration_ms: report.duration.as_millis() as u64,
            file_hash_blake3: fingerprint.map(|f| f.blake3.clone()),
            file_size: fingerprint.map(|f| f.size),
        }
    }
}

impl AuditEvent for ScanAuditEvent {
    fn event_type(&self) -> &'static str {
        "scan_completed"
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// Emits an audit event for a completed scan.
pub fn emit_scan_completed(
    request: &ScanRequest,
    verdict: Verdict,
    report: &ScanReport,
    fingerprint: Option<&Fingerprint>,
) {
    let event = ScanAuditEvent::new(request, verdict, report, fingerprint);
    tracing::info!(
        target: "scanroute::audit",
        event_type = event.event_type(),
        timestamp = %event.timestamp,
        bucket = %event.location.bucket,
        key = %event.location.key,
        verdict = %event.verdict,
        engine = %event.engine,
        exit_code = ?event.exit_code,
        duration_ms = event.duration_ms,
        file_hash_blake3 = ?event.file_hash_blake3,
        file_size = ?event.file_size,
        "Scan completed"
    );
}

/// Emits an audit event for the verdict tag being written.
pub fn emit_object_tagged(location: &ObjectLocation, verdict: Verdict) {
    tracing::info!(
        target: "scanroute::audit",
        event_type = "object_tagged",
        timestamp = %Utc::now(),
        bucket = %location.bucket,
        key = %location.key,
        tag_key = crate::core::AV_STATUS_TAG,
        tag_value = %verdict,
        "Object tagged"
    );
}

/// Emits an audit event for the routing decision.
pub fn emit_object_routed(source: &ObjectLocation, verdict: Verdict, routing: &RoutingOutcome) {
    let (action, destination) = match routing {
        RoutingOutcome::Moved { destination } => ("moved", Some(destination.to_string())),
        RoutingOutcome::LeftInPlace => ("left_in_place", None),
    };

    tracing::info!(
        target: "scanroute::audit",
        event_type = "object_routed",
        timestamp = %Utc::now(),
        bucket = %source.bucket,
        key = %source.key,
        verdict = %verdict,
        action = action,
        destination = ?destination,
        "Object routed"
    );
}

/// Emits an audit event for a published notification.
pub fn emit_notification_published(topic: &str, verdict: Verdict, subject: &str) {
    tracing::info!(
        target: "scanroute::audit",
        event_type = "notification_published",
        timestamp = %Utc::now(),
        topic = %topic,
        verdict = %verdict,
        subject = %subject,
        "Notification published"
    );
}

/// Emits an audit event for an invocation that ended in a fatal error.
pub fn emit_invocation_failed(request: &ScanRequest, error: &PipelineError) {
    tracing::warn!(
        target: "scanroute::audit",
        event_type = "invocation_failed",
        timestamp = %Utc::now(),
        bucket = %request.bucket(),
        key = %request.key(),
        reached = %error.reached,
        stage = error.stage(),
        error = %error.failure,
        "Scan invocation failed"
    );
}

/// Emits an audit event for a definitions upload.
pub fn emit_definitions_published(bucket: &str, prefix: &str, file_count: usize) {
    tracing::info!(
        target: "scanroute::audit",
        event_type = "definitions_published",
        timestamp = %Utc::now(),
        bucket = %bucket,
        prefix = %prefix,
        file_count,
        "Definitions published"
    );
}
