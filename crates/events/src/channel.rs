//! Event channel abstraction (mechanics only).
//!
//! An `EventChannel` is the outbound side of a message broker: it accepts an
//! already-serialized payload for a topic and hands it to the transport.
//!
//! ## Delivery Guarantees
//!
//! None beyond best-effort. A channel may drop a message on transient broker
//! errors, and callers in this workspace never retry. Consumers that depend on
//! user events for correctness must reconcile against the store.
//!
//! ## Thread Safety
//!
//! The trait requires `Send + Sync`; a single channel is shared by every
//! request and by detached publish tasks.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::mpsc::error::TryRecvError;

/// Content type of JSON-encoded user events.
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Channel operation error.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ChannelError {
    #[error("transport unavailable: {0}")]
    Connect(String),

    #[error("publish failed: {0}")]
    Publish(String),

    #[error("publish timed out after {0:?}")]
    Timeout(Duration),

    #[error("channel closed")]
    Closed,
}

/// Outbound message channel (pub/sub abstraction).
#[async_trait]
pub trait EventChannel: Send + Sync {
    /// Hand `payload` to the transport under `topic`.
    async fn publish(&self, topic: &str, content_type: &str, payload: Vec<u8>) -> Result<(), ChannelError>;

    /// Liveness of the underlying transport.
    async fn ping(&self) -> Result<(), ChannelError> {
        Ok(())
    }
}

#[async_trait]
impl<C> EventChannel for Arc<C>
where
    C: EventChannel + ?Sized,
{
    async fn publish(&self, topic: &str, content_type: &str, payload: Vec<u8>) -> Result<(), ChannelError> {
        (**self).publish(topic, content_type, payload).await
    }

    async fn ping(&self) -> Result<(), ChannelError> {
        (**self).ping().await
    }
}

/// A subscription to the messages flowing through a channel.
///
/// Each subscription gets a copy of every message published after it was
/// created (broadcast semantics). Intended for single-consumer use.
#[derive(Debug)]
pub struct Subscription<M> {
    receiver: UnboundedReceiver<M>,
}

impl<M> Subscription<M> {
    pub fn new(receiver: UnboundedReceiver<M>) -> Self {
        Self { receiver }
    }

    /// Try to receive a message without waiting.
    pub fn try_recv(&mut self) -> Result<M, TryRecvError> {
        self.receiver.try_recv()
    }

    /// Wait for up to `timeout` for the next message.
    pub async fn recv_timeout(&mut self, timeout: Duration) -> Option<M> {
        tokio::time::timeout(timeout, self.receiver.recv()).await.ok().flatten()
    }
}
