//! Structured audit logging.
//!
//! Audit events are ordinary `tracing` events under the
//! `scanroute::audit` target, so any subscriber (JSON logs, a file
//! appender, a log shipper) can select them with a target filter.

mod events;

pub use events::{
    emit_definitions_published, emit_invocation_failed, emit_notification_published,
    emit_object_routed, emit_object_tagged, emit_scan_completed, AuditEvent, ScanAuditEvent,
    AUDIT_TARGET,
};
