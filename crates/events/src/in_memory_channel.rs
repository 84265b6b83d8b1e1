//! In-memory event channel for tests/dev.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::channel::{ChannelError, EventChannel, Subscription};

/// A message as it was handed to the channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedMessage {
    pub topic: String,
    pub content_type: String,
    pub payload: Vec<u8>,
}

impl PublishedMessage {
    /// Decode the payload as JSON.
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.payload)
    }
}

/// In-memory pub/sub channel.
///
/// - No IO
/// - Best-effort fan-out to live subscribers
/// - Counts publish attempts so tests can assert on them
#[derive(Debug, Default)]
pub struct InMemoryEventChannel {
    subscribers: Mutex<Vec<mpsc::UnboundedSender<PublishedMessage>>>,
    attempts: AtomicUsize,
    failing: bool,
}

impl InMemoryEventChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// A channel whose every publish fails (after being counted) and whose
    /// ping reports it closed.
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    /// Number of `publish` calls observed so far, successful or not.
    pub fn publish_attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn subscribe(&self) -> Subscription<PublishedMessage> {
        let (tx, rx) = mpsc::unbounded_channel();

        // A poisoned lock still yields a subscription; it just never receives.
        if let Ok(mut subs) = self.subscribers.lock() {
            subs.push(tx);
        }

        Subscription::new(rx)
    }
}

#[async_trait]
impl EventChannel for InMemoryEventChannel {
    async fn publish(&self, topic: &str, content_type: &str, payload: Vec<u8>) -> Result<(), ChannelError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);

        if self.failing {
            return Err(ChannelError::Publish("in-memory channel configured to fail".to_string()));
        }

        let message = PublishedMessage {
            topic: topic.to_string(),
            content_type: content_type.to_string(),
            payload,
        };

        let mut subs = self
            .subscribers
            .lock()
            .map_err(|_| ChannelError::Publish("lock poisoned".to_string()))?;

        // Drop any dead subscribers while publishing.
        subs.retain(|tx| tx.send(message.clone()).is_ok());

        Ok(())
    }

    async fn ping(&self) -> Result<(), ChannelError> {
        if self.failing {
            return Err(ChannelError::Closed);
        }
        Ok(())
    }
}
