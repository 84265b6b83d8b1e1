//! Dependency health checks backing the liveness endpoint.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::warn;

use userhub_events::EventChannel;

use crate::repository::UserRepository;

/// Upper bound on a single dependency check.
pub const CHECK_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HealthError {
    #[error("{dependency} check failed: {message}")]
    Unhealthy {
        dependency: &'static str,
        message: String,
    },

    #[error("{0} check timed out")]
    Timeout(&'static str),
}

/// A probe of one external dependency.
#[async_trait]
pub trait ConnectionTester: Send + Sync {
    fn name(&self) -> &'static str;

    async fn test_connection(&self) -> Result<(), HealthError>;
}

/// Probes the user store through its `ping`.
pub struct StoreTester<R: ?Sized> {
    repository: Arc<R>,
}

impl<R: ?Sized> StoreTester<R> {
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }
}

#[async_trait]
impl<R> ConnectionTester for StoreTester<R>
where
    R: UserRepository + ?Sized,
{
    fn name(&self) -> &'static str {
        "store"
    }

    async fn test_connection(&self) -> Result<(), HealthError> {
        self.repository.ping().await.map_err(|e| HealthError::Unhealthy {
            dependency: self.name(),
            message: e.to_string(),
        })
    }
}

/// Probes the event channel through its `ping`.
pub struct ChannelTester<C: ?Sized> {
    channel: Arc<C>,
}

impl<C: ?Sized> ChannelTester<C> {
    pub fn new(channel: Arc<C>) -> Self {
        Self { channel }
    }
}

#[async_trait]
impl<C> ConnectionTester for ChannelTester<C>
where
    C: EventChannel + ?Sized,
{
    fn name(&self) -> &'static str {
        "event_channel"
    }

    async fn test_connection(&self) -> Result<(), HealthError> {
        self.channel.ping().await.map_err(|e| HealthError::Unhealthy {
            dependency: self.name(),
            message: e.to_string(),
        })
    }
}

/// Runs testers in order and stops at the first failure.
#[derive(Default)]
pub struct ChainedTester {
    testers: Vec<Arc<dyn ConnectionTester>>,
    check_timeout: Option<Duration>,
}

impl ChainedTester {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, tester: impl ConnectionTester + 'static) -> Self {
        self.testers.push(Arc::new(tester));
        self
    }

    pub fn with_check_timeout(mut self, check_timeout: Duration) -> Self {
        self.check_timeout = Some(check_timeout);
        self
    }

    pub fn len(&self) -> usize {
        self.testers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.testers.is_empty()
    }
}

#[async_trait]
impl ConnectionTester for ChainedTester {
    fn name(&self) -> &'static str {
        "chained"
    }

    async fn test_connection(&self) -> Result<(), HealthError> {
        let check_timeout = self.check_timeout.unwrap_or(CHECK_TIMEOUT);

        for tester in &self.testers {
            let outcome = match tokio::time::timeout(check_timeout, tester.test_connection()).await {
                Ok(outcome) => outcome,
                Err(_) => Err(HealthError::Timeout(tester.name())),
            };

            if let Err(e) = outcome {
                warn!(dependency = tester.name(), error = %e, "health check failed");
                return Err(e);
            }
        }
        Ok(())
    }
}
