//! Trigger event parsing.
//!
//! Object-created notifications arrive as JSON of the form
//! `{"Records": [{"s3": {"bucket": {"name": ..}, "object": {"key": ..}}}]}`.
//! Keys are form-encoded by the store and must be decoded before use.

use crate::core::error::EventParseError;
use crate::core::types::ScanRequest;

use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
struct EventPayload {
    #[serde(rename = "Records", default)]
    records: Vec<EventRecord>,
}

#[derive(Debug, Deserialize)]
struct EventRecord {
    s3: Option<StoreEntity>,
}

#[derive(Debug, Deserialize)]
struct StoreEntity {
    bucket: Option<BucketEntity>,
    object: Option<ObjectEntity>,
}

#[derive(Debug, Deserialize)]
struct BucketEntity {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ObjectEntity {
    key: Option<String>,
}

impl ScanRequest {
    /// Builds a request from the first record of a trigger event.
    ///
    /// Only the first record is used; one invocation scans one object.
    pub fn from_event(payload: &Value) -> Result<Self, EventParseError> {
        let payload = EventPayload::deserialize(payload)?;

        if payload.records.len() > 1 {
            tracing::debug!(
                records = payload.records.len(),
                "Event carries several records, scanning the first"
            );
        }

        let record = payload
            .records
            .into_iter()
            .next()
            .ok_or(EventParseError::NoRecords)?;
        let entity = record.s3.ok_or(EventParseError::missing("s3"))?;

        let bucket = entity
            .bucket
            .and_then(|b| b.name)
            .filter(|name| !name.is_empty())
            .ok_or(EventParseError::missing("s3.bucket.name"))?;

        let raw_key = entity
            .object
            .and_then(|o| o.key)
            .ok_or(EventParseError::missing("s3.object.key"))?;
        let key = decode_object_key(&raw_key);
        if key.is_empty() {
            return Err(EventParseError::missing("s3.object.key"));
        }

        Ok(Self::new(bucket, key))
    }
}

/// Decodes a form-encoded object key.
///
/// `+` becomes a space, then percent escapes are decoded. Byte sequences
/// that are not valid UTF-8 are replaced with U+FFFD.
pub fn decode_object_key(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    let bytes = urlencoding::decode_binary(spaced.as_bytes());
    String::from_utf8_lossy(&bytes).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(bucket: &str, key: &str) -> Value {
        json!({
            "Records": [{
                "eventName": "ObjectCreated:Put",
                "s3": {
                    "bucket": { "name": bucket, "arn": format!("arn:aws:s3:::{bucket}") },
                    "object": { "key": key, "size": 1024 }
                }
            }]
        })
    }

    #[test]
    fn test_parse_valid_event() {
        let request = ScanRequest::from_event(&event("uploads", "docs/report.pdf")).unwrap();
        assert_eq!(request.bucket(), "uploads");
        assert_eq!(request.key(), "docs/report.pdf");
    }

    #[test]
    fn test_parse_decodes_key() {
        let request =
            ScanRequest::from_event(&event("uploads", "my+docs/Q1%2Breport%20final.pdf")).unwrap();
        assert_eq!(request.key(), "my docs/Q1+report final.pdf");
    }

    #[test]
    fn test_parse_missing_bucket() {
        let payload = json!({ "Records": [{ "s3": { "object": { "key": "a.txt" } } }] });
        let err = ScanRequest::from_event(&payload).unwrap_err();
        assert!(matches!(
            err,
            EventParseError::MissingField { field: "s3.bucket.name" }
        ));
    }

    #[test]
    fn test_parse_missing_key() {
        let payload = json!({ "Records": [{ "s3": { "bucket": { "name": "uploads" } } }] });
        let err = ScanRequest::from_event(&payload).unwrap_err();
        assert!(matches!(
            err,
            EventParseError::MissingField { field: "s3.object.key" }
        ));
    }

    #[test]
    fn test_parse_no_records() {
        assert!(matches!(
            ScanRequest::from_event(&json!({ "Records": [] })),
            Err(EventParseError::NoRecords)
        ));
        assert!(matches!(
            ScanRequest::from_event(&json!({})),
            Err(EventParseError::NoRecords)
        ));
    }

    #[test]
    fn test_parse_wrong_shape() {
        let payload = json!({ "Records": "not-a-list" });
        assert!(matches!(
            ScanRequest::from_event(&payload),
            Err(EventParseError::Malformed(_))
        ));
    }

    #[test]
    fn test_decode_invalid_utf8_is_replaced() {
        assert_eq!(decode_object_key("bad%FFname"), "bad\u{FFFD}name");
        assert_eq!(decode_object_key("plain.txt"), "plain.txt");
    }
}
