//! Infrastructure layer: repositories, event channels, health checks.

pub mod event_channel;
pub mod health;
pub mod repository;
pub mod schema;

pub use health::{ChainedTester, ChannelTester, ConnectionTester, HealthError, StoreTester};
pub use repository::{
    EventingUserRepository, InMemoryUserRepository, PostgresUserRepository, RepositoryError,
    UserQuery, UserRepository,
};
