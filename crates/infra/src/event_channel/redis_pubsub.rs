//! Redis pub/sub-backed event channel (optional).
//!
//! Note: Redis pub/sub is not durable (messages are dropped when no subscriber
//! is listening). That matches the best-effort contract of user events.
//!
//! Each message is a JSON frame carrying the content type next to the payload,
//! since Redis pub/sub has no message properties:
//!
//! ```json
//! {"content_type": "application/json", "payload": {"operation": "create_user", ...}}
//! ```
//!
//! A payload that is not valid JSON is carried as a string.

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::MultiplexedConnection;
use serde_json::{Value as JsonValue, json};
use tokio::sync::Mutex;
use tracing::debug;

use userhub_events::{ChannelError, EventChannel};

/// Redis pub/sub channel; the topic is the Redis channel name.
pub struct RedisEventChannel {
    client: redis::Client,
    connection: Mutex<Cached<MultiplexedConnection>>,
}

/// A lazily opened value tagged with the generation that opened it.
#[derive(Debug)]
struct Cached<T> {
    generation: u64,
    value: Option<T>,
}

impl<T: Clone> Cached<T> {
    fn new() -> Self {
        Self {
            generation: 0,
            value: None,
        }
    }

    fn get(&self) -> Option<(u64, T)> {
        self.value.clone().map(|v| (self.generation, v))
    }

    fn put(&mut self, value: T) -> u64 {
        self.generation += 1;
        self.value = Some(value);
        self.generation
    }

    /// Drop the value only if it is still the one from `generation`.
    fn invalidate(&mut self, generation: u64) -> bool {
        if self.generation == generation && self.value.is_some() {
            self.value = None;
            true
        } else {
            false
        }
    }
}

impl RedisEventChannel {
    /// Parse `redis_url`; the connection is opened on first use.
    pub fn new(redis_url: impl AsRef<str>) -> Result<Self, ChannelError> {
        let client = redis::Client::open(redis_url.as_ref())
            .map_err(|e| ChannelError::Connect(e.to_string()))?;
        Ok(Self {
            client,
            connection: Mutex::new(Cached::new()),
        })
    }

    async fn connection(&self) -> Result<(u64, MultiplexedConnection), ChannelError> {
        let mut slot = self.connection.lock().await;
        if let Some(cached) = slot.get() {
            return Ok(cached);
        }

        let conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| ChannelError::Connect(e.to_string()))?;
        let generation = slot.put(conn.clone());
        debug!(generation, "redis connection established");
        Ok((generation, conn))
    }

    /// Forget the connection opened as `generation` so the next call
    /// reconnects. A newer connection opened meanwhile is kept.
    async fn reset(&self, generation: u64) {
        if self.connection.lock().await.invalidate(generation) {
            debug!(generation, "redis connection dropped");
        }
    }
}

impl std::fmt::Debug for RedisEventChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisEventChannel")
            .field("client", &self.client)
            .finish_non_exhaustive()
    }
}

/// Wrap a payload in the wire frame.
pub fn frame(content_type: &str, payload: &[u8]) -> String {
    let body = serde_json::from_slice::<JsonValue>(payload)
        .unwrap_or_else(|_| JsonValue::String(String::from_utf8_lossy(payload).into_owned()));

    json!({
        "content_type": content_type,
        "payload": body,
    })
    .to_string()
}

#[async_trait]
impl EventChannel for RedisEventChannel {
    async fn publish(&self, topic: &str, content_type: &str, payload: Vec<u8>) -> Result<(), ChannelError> {
        let message = frame(content_type, &payload);
        let (generation, mut conn) = self.connection().await?;

        let result: redis::RedisResult<i64> = conn.publish(topic, message).await;
        match result {
            Ok(receivers) => {
                debug!(topic, receivers, "published to redis");
                Ok(())
            }
            Err(e) => {
                self.reset(generation).await;
                Err(ChannelError::Publish(e.to_string()))
            }
        }
    }

    async fn ping(&self) -> Result<(), ChannelError> {
        let (generation, mut conn) = self.connection().await?;
        let result: redis::RedisResult<String> = redis::cmd("PING").query_async(&mut conn).await;
        match result {
            Ok(_) => Ok(()),
            Err(e) => {
                self.reset(generation).await;
                Err(ChannelError::Connect(e.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_payload_is_embedded_as_json() {
        let framed = frame("application/json", br#"{"operation":"delete_user"}"#);
        let value: JsonValue = serde_json::from_str(&framed).unwrap();

        assert_eq!(value["content_type"], "application/json");
        assert_eq!(value["payload"]["operation"], "delete_user");
    }

    #[test]
    fn opaque_payload_is_embedded_as_string() {
        let framed = frame("text/plain", b"hello");
        let value: JsonValue = serde_json::from_str(&framed).unwrap();
        assert_eq!(value["payload"], "hello");
    }

    #[test]
    fn stale_failure_keeps_a_newer_connection() {
        let mut cached = Cached::new();
        let first = cached.put("first");
        assert!(cached.invalidate(first));

        let second = cached.put("second");
        assert!(!cached.invalidate(first));
        assert_eq!(cached.get(), Some((second, "second")));

        assert!(cached.invalidate(second));
        assert_eq!(cached.get(), None);
    }

    #[test]
    fn invalid_url_is_a_connect_error() {
        let err = RedisEventChannel::new("not a url").unwrap_err();
        assert!(matches!(err, ChannelError::Connect(_)));
    }
}
