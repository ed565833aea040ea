//! Recording notifier for tests and dry runs.

use crate::core::{MessagingError, NotificationMessage};
use crate::notify::Notifier;

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

/// A message captured by [`RecordingNotifier`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedMessage {
    /// Topic it was published to.
    pub topic: String,
    /// The message itself.
    pub message: NotificationMessage,
}

/// Notifier that keeps every published message in memory.
///
/// Can be switched into a failing mode to exercise the publish-failure
/// path; failed attempts are not recorded.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    published: RwLock<Vec<PublishedMessage>>,
    failing: AtomicBool,
}

impl RecordingNotifier {
    /// Creates an empty notifier.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a notifier whose every publish fails.
    pub fn new_failing() -> Self {
        let notifier = Self::new();
        notifier.failing.store(true, Ordering::Relaxed);
        notifier
    }

    /// Returns every successfully published message, in order.
    pub fn published(&self) -> Vec<PublishedMessage> {
        self.published
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn publish(
        &self,
        topic: &str,
        message: &NotificationMessage,
    ) -> Result<(), MessagingError> {
        if self.failing.load(Ordering::Relaxed) {
            return Err(MessagingError::publish(topic, "injected failure"));
        }
        self.published
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(PublishedMessage {
                topic: topic.to_string(),
                message: message.clone(),
            });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_records_messages() {
        let notifier = RecordingNotifier::new();
        let message = NotificationMessage::new("File Scan Result: CLEAN", "body");
        notifier.publish("arn:clean", &message).await.unwrap();

        let published = notifier.published();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].topic, "arn:clean");
        assert_eq!(published[0].message, message);
    }

    #[tokio::test]
    async fn test_failing_mode() {
        let notifier = RecordingNotifier::new_failing();
        let result = notifier
            .publish("arn:infected", &NotificationMessage::new("s", "b"))
            .await;
        assert!(matches!(result, Err(MessagingError::Publish { .. })));
        assert!(notifier.published().is_empty());
    }
}
