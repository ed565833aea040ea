//! Verdict-driven destinations and the copy-then-delete move.

use crate::core::{ObjectLocation, RoutingOutcome, StorageError, Verdict};
use crate::storage::ObjectStore;

use serde::{Deserialize, Serialize};

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Destination bucket per verdict. Either may be unset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingTable {
    clean_bucket: Option<String>,
    quarantine_bucket: Option<String>,
}

impl RoutingTable {
    /// Creates a table. Empty names are treated as unset.
    pub fn new(clean_bucket: Option<String>, quarantine_bucket: Option<String>) -> Self {
        Self {
            clean_bucket: non_empty(clean_bucket),
            quarantine_bucket: non_empty(quarantine_bucket),
        }
    }

    /// A table that leaves every object in place.
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Returns the bucket objects with `verdict` are moved to.
    pub fn destination_for(&self, verdict: Verdict) -> Option<&str> {
        match verdict {
            Verdict::Clean => self.clean_bucket.as_deref(),
            Verdict::Infected => self.quarantine_bucket.as_deref(),
        }
    }
}

/// Notification topic per verdict. Either may be unset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicTable {
    clean_topic: Option<String>,
    infected_topic: Option<String>,
}

impl TopicTable {
    /// Creates a table. Empty identifiers are treated as unset.
    pub fn new(clean_topic: Option<String>, infected_topic: Option<String>) -> Self {
        Self {
            clean_topic: non_empty(clean_topic),
            infected_topic: non_empty(infected_topic),
        }
    }

    /// Returns the topic announcements for `verdict` go to.
    pub fn topic_for(&self, verdict: Verdict) -> Option<&str> {
        match verdict {
            Verdict::Clean => self.clean_topic.as_deref(),
            Verdict::Infected => self.infected_topic.as_deref(),
        }
    }
}

/// Moves `source` to the bucket configured for `verdict`.
///
/// The move is a copy followed by a delete of the source. If the delete
/// fails the object exists in both buckets and the error is returned.
pub async fn route_object<S>(
    store: &S,
    source: &ObjectLocation,
    verdict: Verdict,
    table: &RoutingTable,
) -> Result<RoutingOutcome, StorageError>
where
    S: ObjectStore + ?Sized,
{
    let Some(bucket) = table.destination_for(verdict) else {
        tracing::info!(
            verdict = %verdict,
            location = %source,
            "No destination bucket configured, leaving object in place"
        );
        return Ok(RoutingOutcome::LeftInPlace);
    };

    if bucket == source.bucket {
        tracing::warn!(
            verdict = %verdict,
            location = %source,
            "Destination bucket is the source bucket, leaving object in place"
        );
        return Ok(RoutingOutcome::LeftInPlace);
    }

    let destination = store.copy(source, bucket).await?;
    tracing::info!(source = %source, destination = %destination, "Copied object");

    if let Err(e) = store.delete(source).await {
        tracing::error!(
            source = %source,
            destination = %destination,
            error = %e,
            "Source delete failed after copy, object now exists in both buckets"
        );
        return Err(e);
    }

    tracing::info!(
        verdict = %verdict,
        destination_bucket = %bucket,
        "Moved object"
    );
    Ok(RoutingOutcome::Moved { destination })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{InMemoryObjectStore, StoreOperation};

    fn table() -> RoutingTable {
        RoutingTable::new(Some("clean".into()), Some("quarantine".into()))
    }

    #[test]
    fn test_destination_for() {
        let table = table();
        assert_eq!(table.destination_for(Verdict::Clean), Some("clean"));
        assert_eq!(table.destination_for(Verdict::Infected), Some("quarantine"));

        let partial = RoutingTable::new(Some(String::new()), Some("quarantine".into()));
        assert_eq!(partial.destination_for(Verdict::Clean), None);
        assert_eq!(RoutingTable::disabled().destination_for(Verdict::Infected), None);
    }

    #[test]
    fn test_topic_for() {
        let topics = TopicTable::new(Some("arn:clean".into()), None);
        assert_eq!(topics.topic_for(Verdict::Clean), Some("arn:clean"));
        assert_eq!(topics.topic_for(Verdict::Infected), None);
    }

    #[tokio::test]
    async fn test_route_moves_object() {
        let store = InMemoryObjectStore::new();
        let source = ObjectLocation::new("uploads", "docs/report.pdf");
        store.put(&source, b"pdf".to_vec());

        let outcome = route_object(&store, &source, Verdict::Infected, &table())
            .await
            .unwrap();

        let destination = ObjectLocation::new("quarantine", "docs/report.pdf");
        assert_eq!(
            outcome,
            RoutingOutcome::Moved {
                destination: destination.clone()
            }
        );
        assert!(store.contains(&destination));
        assert!(!store.contains(&source));
        assert_eq!(
            store.operations(),
            vec![StoreOperation::Copy, StoreOperation::Delete]
        );
    }

    #[tokio::test]
    async fn test_route_unset_destination_makes_no_calls() {
        let store = InMemoryObjectStore::new();
        let source = ObjectLocation::new("uploads", "a.txt");
        store.put(&source, Vec::new());

        let outcome = route_object(&store, &source, Verdict::Clean, &RoutingTable::disabled())
            .await
            .unwrap();
        assert_eq!(outcome, RoutingOutcome::LeftInPlace);
        assert!(store.calls().is_empty());
    }

    #[tokio::test]
    async fn test_route_same_bucket_is_skipped() {
        let store = InMemoryObjectStore::new();
        let source = ObjectLocation::new("clean", "a.txt");
        store.put(&source, Vec::new());

        let outcome = route_object(&store, &source, Verdict::Clean, &table())
            .await
            .unwrap();
        assert_eq!(outcome, RoutingOutcome::LeftInPlace);
        assert!(store.contains(&source));
        assert!(store.calls().is_empty());
    }

    #[tokio::test]
    async fn test_route_delete_failure_leaves_both_copies() {
        let store = InMemoryObjectStore::new();
        let source = ObjectLocation::new("uploads", "a.txt");
        store.put(&source, Vec::new());
        store.fail_on(StoreOperation::Delete);

        let result = route_object(&store, &source, Verdict::Clean, &table()).await;
        assert!(matches!(result, Err(StorageError::Delete { .. })));
        assert!(store.contains(&source));
        assert!(store.contains(&ObjectLocation::new("clean", "a.txt")));
    }
}
