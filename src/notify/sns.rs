//! Amazon SNS notifier.

use crate::core::{MessagingError, NotificationMessage};
use crate::notify::Notifier;

use async_trait::async_trait;
use aws_sdk_sns::error::DisplayErrorContext;
use aws_sdk_sns::Client;

/// Publishes notifications to SNS topics identified by ARN.
#[derive(Debug, Clone)]
pub struct SnsNotifier {
    client: Client,
}

impl SnsNotifier {
    /// Wraps an existing client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Builds a client from shared AWS configuration.
    pub fn from_sdk_config(shared: &aws_config::SdkConfig) -> Self {
        Self::new(Client::new(shared))
    }
}

#[async_trait]
impl Notifier for SnsNotifier {
    async fn publish(
        &self,
        topic: &str,
        message: &NotificationMessage,
    ) -> Result<(), MessagingError> {
        let output = self
            .client
            .publish()
            .topic_arn(topic)
            .subject(&message.subject)
            .message(&message.body)
            .send()
            .await
            .map_err(|e| MessagingError::publish(topic, DisplayErrorContext(&e).to_string()))?;

        tracing::info!(
            topic = %topic,
            message_id = ?output.message_id(),
            "Published message to SNS topic"
        );
        Ok(())
    }
}
