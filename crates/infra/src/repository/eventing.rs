//! Repository decorator that announces successful writes.
//!
//! Publish happens only after the wrapped operation succeeded, and never
//! changes its outcome: the event is handed to a detached task bounded by the
//! publish timeout, so the caller gets its result without waiting on the
//! broker. Publish failures are logged and dropped.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, error, warn};

use userhub_core::{User, UserFilter, UserId, UserInput, UserPage};
use userhub_events::{ChannelError, EventChannel, JSON_CONTENT_TYPE, UserEvent};

use super::{RepositoryError, UserRepository};

/// Topic user events are published under unless configured otherwise.
pub const DEFAULT_EVENT_TOPIC: &str = "users";

/// Upper bound on a single detached publish.
pub const DEFAULT_PUBLISH_TIMEOUT: Duration = Duration::from_secs(2);

/// Adapter that publishes a [`UserEvent`] after each successful write.
pub struct EventingUserRepository<R, C: ?Sized = dyn EventChannel> {
    inner: R,
    channel: Arc<C>,
    topic: Arc<str>,
    publish_timeout: Duration,
}

impl<R, C: ?Sized> EventingUserRepository<R, C> {
    pub fn new(inner: R, channel: Arc<C>) -> Self {
        Self {
            inner,
            channel,
            topic: Arc::from(DEFAULT_EVENT_TOPIC),
            publish_timeout: DEFAULT_PUBLISH_TIMEOUT,
        }
    }

    pub fn with_topic(mut self, topic: impl AsRef<str>) -> Self {
        self.topic = Arc::from(topic.as_ref());
        self
    }

    pub fn with_publish_timeout(mut self, publish_timeout: Duration) -> Self {
        self.publish_timeout = publish_timeout;
        self
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }
}

impl<R, C> EventingUserRepository<R, C>
where
    C: EventChannel + ?Sized + 'static,
{
    /// Serialize `event` and hand it to a detached publish task.
    fn emit(&self, event: UserEvent) {
        let payload = match serde_json::to_vec(&event) {
            Ok(payload) => payload,
            Err(e) => {
                error!(operation = %event.operation, user_id = %event.user_id, error = %e, "failed to encode user event");
                return;
            }
        };

        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            warn!(operation = %event.operation, "no async runtime, user event dropped");
            return;
        };

        let channel = Arc::clone(&self.channel);
        let topic = Arc::clone(&self.topic);
        let publish_timeout = self.publish_timeout;
        let operation = event.operation;
        let user_id = event.user_id;

        handle.spawn(async move {
            let publish = channel.publish(&topic, JSON_CONTENT_TYPE, payload);
            let outcome = match tokio::time::timeout(publish_timeout, publish).await {
                Ok(outcome) => outcome,
                Err(_) => Err(ChannelError::Timeout(publish_timeout)),
            };

            match outcome {
                Ok(()) => debug!(%operation, %user_id, topic = %topic, "user event published"),
                Err(e) => warn!(%operation, %user_id, error = %e, "failed to publish user event"),
            }
        });
    }
}

#[async_trait]
impl<R, C> UserRepository for EventingUserRepository<R, C>
where
    R: UserRepository,
    C: EventChannel + ?Sized + 'static,
{
    async fn create(&self, input: UserInput) -> Result<User, RepositoryError> {
        let user = self.inner.create(input).await?;
        self.emit(UserEvent::created(&user));
        Ok(user)
    }

    async fn update(&self, id: UserId, input: UserInput) -> Result<User, RepositoryError> {
        let user = self.inner.update(id, input).await?;
        self.emit(UserEvent::updated(&user));
        Ok(user)
    }

    async fn find(&self, filter: &UserFilter, page_token: &str, limit: i64) -> Result<UserPage, RepositoryError> {
        self.inner.find(filter, page_token, limit).await
    }

    async fn remove(&self, id: UserId) -> Result<u64, RepositoryError> {
        let removed = self.inner.remove(id).await?;
        self.emit(UserEvent::deleted(id));
        Ok(removed)
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        self.inner.ping().await
    }
}
