//! Core types used throughout the scanroute library.
//!
//! This module defines the values that flow through one pipeline
//! invocation: where the object lives, what the scanner said about it,
//! where it went, and what was announced.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// Tag key written to the original object with the verdict as value.
pub const AV_STATUS_TAG: &str = "av-status";

/// Marker in a scanner report that means the single scanned file is infected.
pub const INFECTED_MARKER: &str = "Infected files: 1";

/// Object tag set: tag key to tag value.
pub type TagSet = BTreeMap<String, String>;

/// Bucket/key address of an object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectLocation {
    /// Bucket name.
    pub bucket: String,
    /// Object key, already decoded.
    pub key: String,
}

impl ObjectLocation {
    /// Creates a new location.
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    /// Returns the same key in another bucket.
    pub fn in_bucket(&self, bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: self.key.clone(),
        }
    }

    /// Returns the last path segment of the key, if it has one.
    pub fn file_name(&self) -> Option<&str> {
        self.key
            .rsplit('/')
            .next()
            .filter(|name| !name.is_empty() && *name != "." && *name != "..")
    }
}

impl fmt::Display for ObjectLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s3://{}/{}", self.bucket, self.key)
    }
}

/// One request to scan one object, derived from a trigger event.
///
/// Immutable once created; discarded when the invocation ends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanRequest {
    source: ObjectLocation,
}

impl ScanRequest {
    /// Creates a request for the given bucket and decoded key.
    pub fn new(source_bucket: impl Into<String>, object_key: impl Into<String>) -> Self {
        Self {
            source: ObjectLocation::new(source_bucket, object_key),
        }
    }

    /// Returns the source bucket.
    pub fn bucket(&self) -> &str {
        &self.source.bucket
    }

    /// Returns the decoded object key.
    pub fn key(&self) -> &str {
        &self.source.key
    }

    /// Returns the object's original location.
    pub fn source(&self) -> &ObjectLocation {
        &self.source
    }
}

/// Classification outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    /// No infection marker in the scanner report.
    Clean,
    /// The scanner reported exactly one infected file.
    Infected,
}

impl Verdict {
    /// Derives a verdict from raw scanner output.
    ///
    /// Anything without the infection marker is clean, including empty
    /// output and reports of scanner errors.
    pub fn from_report(report: &str) -> Self {
        if report.contains(INFECTED_MARKER) {
            Self::Infected
        } else {
            Self::Clean
        }
    }

    /// Returns the lowercase tag value.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Clean => "clean",
            Self::Infected => "infected",
        }
    }

    /// Returns the tag set written to the original object.
    pub fn tags(&self) -> TagSet {
        let mut tags = TagSet::new();
        tags.insert(AV_STATUS_TAG.to_string(), self.as_str().to_string());
        tags
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw output of one scanner run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanReport {
    /// Name of the engine that produced the report.
    pub engine: String,
    /// Captured standard output.
    pub output: String,
    /// Captured standard error.
    pub diagnostics: String,
    /// Process exit code, if the process exited normally.
    pub exit_code: Option<i32>,
    /// Wall-clock time of the run.
    #[serde(with = "humantime_serde")]
    pub duration: Duration,
}

impl ScanReport {
    /// Creates a report with only output text.
    pub fn new(engine: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            engine: engine.into(),
            output: output.into(),
            diagnostics: String::new(),
            exit_code: Some(0),
            duration: Duration::ZERO,
        }
    }

    /// Returns the verdict for this report.
    pub fn verdict(&self) -> Verdict {
        Verdict::from_report(&self.output)
    }
}

/// Where routing left the object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RoutingOutcome {
    /// The object was copied to a destination bucket and removed from the source.
    Moved {
        /// New location of the object.
        destination: ObjectLocation,
    },
    /// No destination was configured; the object is still at its source.
    LeftInPlace,
}

impl RoutingOutcome {
    /// Returns the destination bucket if a move happened.
    pub fn destination_bucket(&self) -> Option<&str> {
        match self {
            Self::Moved { destination } => Some(&destination.bucket),
            Self::LeftInPlace => None,
        }
    }

    /// Returns `true` if the object was moved.
    pub fn is_moved(&self) -> bool {
        matches!(self, Self::Moved { .. })
    }
}

/// Subject and body announced after a scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationMessage {
    /// Message subject.
    pub subject: String,
    /// Message body.
    pub body: String,
}

impl NotificationMessage {
    /// Creates a message from raw parts.
    pub fn new(subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            body: body.into(),
        }
    }

    /// Builds the message for a finished scan.
    pub fn compose(request: &ScanRequest, verdict: Verdict, routing: &RoutingOutcome) -> Self {
        let subject = format!("File Scan Result: {}", verdict.as_str().to_uppercase());
        let mut body = format!("Scan of {} is {}.", request.source(), verdict);

        if let Some(bucket) = routing.destination_bucket() {
            let label = match verdict {
                Verdict::Clean => "clean",
                Verdict::Infected => "quarantine",
            };
            body.push_str(&format!(" File moved to {} bucket: {}", label, bucket));
        }

        Self { subject, body }
    }
}

/// Fixed response returned to the trigger for every processed event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Acknowledgement {
    /// HTTP-style status code; always 200 for scan events.
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    /// Human-readable body.
    pub body: String,
}

impl Acknowledgement {
    /// The acknowledgement for a processed scan event.
    pub fn scan_complete() -> Self {
        Self {
            status_code: 200,
            body: "File scan complete!".to_string(),
        }
    }

    /// The response for a successful definitions update.
    pub fn update_completed() -> Self {
        Self {
            status_code: 200,
            body: "Update completed.".to_string(),
        }
    }

    /// The response for a failed definitions update.
    pub fn update_failed() -> Self {
        Self {
            status_code: 500,
            body: "Update failed.".to_string(),
        }
    }
}
