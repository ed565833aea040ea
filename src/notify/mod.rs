//! Notification adapters.
//!
//! A [`Notifier`] publishes one subject/body pair to a named topic. The
//! pipeline logs publish failures and never retries them.

mod memory;
mod sns;

pub use memory::{PublishedMessage, RecordingNotifier};
pub use sns::SnsNotifier;

use crate::core::{MessagingError, NotificationMessage};

use async_trait::async_trait;
use std::fmt::Debug;

/// Publishes messages to named topics.
#[async_trait]
pub trait Notifier: Send + Sync + Debug {
    /// Publishes `message` to `topic`.
    async fn publish(&self, topic: &str, message: &NotificationMessage)
        -> Result<(), MessagingError>;
}

/// An arc-wrapped notifier for shared ownership.
pub type ArcNotifier = std::sync::Arc<dyn Notifier>;
