//! Service wiring: store, event channel and health checks.
//!
//! Backends are chosen from configuration: Postgres when a database URL is
//! set, otherwise the in-memory repository; Redis when a Redis URL is set,
//! otherwise the in-memory channel. Either way the store is wrapped in the
//! event-emitting decorator.

use std::sync::Arc;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use tracing::info;

use userhub_events::{EventChannel, InMemoryEventChannel};
use userhub_infra::event_channel::RedisEventChannel;
use userhub_infra::{
    ChainedTester, ChannelTester, ConnectionTester, EventingUserRepository, InMemoryUserRepository,
    PostgresUserRepository, StoreTester, UserRepository, schema,
};

use crate::config::AppConfig;

#[derive(Clone)]
pub struct AppServices {
    users: Arc<dyn UserRepository>,
    health: Arc<dyn ConnectionTester>,
}

impl AppServices {
    /// Wire `store` and `channel` the way the server runs them.
    pub fn from_parts(store: Arc<dyn UserRepository>, channel: Arc<dyn EventChannel>, config: &AppConfig) -> Self {
        let health = ChainedTester::new()
            .with(StoreTester::new(Arc::clone(&store)))
            .with(ChannelTester::new(Arc::clone(&channel)));

        let users = EventingUserRepository::new(store, channel)
            .with_topic(&config.event_topic)
            .with_publish_timeout(config.publish_timeout);

        Self {
            users: Arc::new(users),
            health: Arc::new(health),
        }
    }

    pub fn users(&self) -> &dyn UserRepository {
        self.users.as_ref()
    }

    pub fn health(&self) -> &dyn ConnectionTester {
        self.health.as_ref()
    }
}

pub async fn build_services(config: &AppConfig) -> anyhow::Result<AppServices> {
    let channel: Arc<dyn EventChannel> = match &config.redis_url {
        Some(url) => {
            info!(topic = %config.event_topic, "using redis event channel");
            Arc::new(RedisEventChannel::new(url).context("invalid redis url")?)
        }
        None => {
            info!("USERHUB_REDIS_URL not set; using in-memory event channel");
            Arc::new(InMemoryEventChannel::new())
        }
    };

    let store: Arc<dyn UserRepository> = match &config.database_url {
        Some(url) => {
            let pool = PgPoolOptions::new()
                .max_connections(config.db_max_connections)
                .acquire_timeout(config.store_timeout)
                .connect(url)
                .await
                .context("failed to connect to postgres")?;

            schema::ensure_schema(&pool)
                .await
                .context("failed to bootstrap users schema")?;

            info!(max_connections = config.db_max_connections, "using postgres user repository");
            Arc::new(PostgresUserRepository::new(pool).with_timeout(config.store_timeout))
        }
        None => {
            info!("USERHUB_DATABASE_URL not set; using in-memory user repository");
            Arc::new(InMemoryUserRepository::new())
        }
    };

    Ok(AppServices::from_parts(store, channel, config))
}
