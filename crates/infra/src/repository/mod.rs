//! User persistence boundary.
//!
//! `UserRepository` is the single capability set for user records. It is
//! implemented by the stores (`PostgresUserRepository`,
//! `InMemoryUserRepository`) and by `EventingUserRepository`, which wraps any
//! other implementation and adds best-effort event notification.
//!
//! ## Error Contract
//!
//! | Operation | Failure | Error |
//! |-----------|---------|-------|
//! | `create`  | store returned no row | `NotPersisted` |
//! | `update`  | no row with that id | `NotFound` |
//! | `find`    | malformed page token | `Validation(InvalidCursor)` |
//! | `remove`  | no row with that id | *not an error*, returns `0` |
//! | any       | connection / constraint / driver failure | `Store` |
//! | any       | store did not answer in time | `Timeout` |
//! | any       | row could not be decoded | `MalformedRow` |

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use userhub_core::{DomainError, User, UserFilter, UserId, UserInput, UserPage};

pub mod eventing;
pub mod in_memory;
pub mod postgres;
pub mod query;

pub use eventing::EventingUserRepository;
pub use in_memory::InMemoryUserRepository;
pub use postgres::PostgresUserRepository;
pub use query::UserQuery;

/// Repository operation error.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RepositoryError {
    /// Caller input could not be used (e.g. malformed page token).
    #[error(transparent)]
    Validation(#[from] DomainError),

    #[error("user not found")]
    NotFound,

    #[error("user was not persisted")]
    NotPersisted,

    #[error("store error in {operation}: {message}")]
    Store {
        operation: &'static str,
        message: String,
    },

    #[error("store timed out in {0}")]
    Timeout(&'static str),

    /// The store returned a row that does not match the users schema.
    #[error("malformed row in {operation}: {message}")]
    MalformedRow {
        operation: &'static str,
        message: String,
    },
}

impl RepositoryError {
    pub fn store(operation: &'static str, message: impl Into<String>) -> Self {
        Self::Store {
            operation,
            message: message.into(),
        }
    }
}

/// Create/update/find/remove of user records.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Persist a new user; the store assigns the id and both timestamps.
    async fn create(&self, input: UserInput) -> Result<User, RepositoryError>;

    /// Overwrite every mutable field of `id` and refresh `updated_at`.
    async fn update(&self, id: UserId, input: UserInput) -> Result<User, RepositoryError>;

    /// One page of users matching `filter`, ordered by id ascending.
    ///
    /// `page_token` is empty for the first page; `limit` outside
    /// `[1, MAX_PAGE_SIZE]` means "the maximum".
    async fn find(&self, filter: &UserFilter, page_token: &str, limit: i64) -> Result<UserPage, RepositoryError>;

    /// Delete by id; returns the number of rows removed (0 or 1).
    async fn remove(&self, id: UserId) -> Result<u64, RepositoryError>;

    /// Liveness of the backing store.
    async fn ping(&self) -> Result<(), RepositoryError>;
}

#[async_trait]
impl<R> UserRepository for Arc<R>
where
    R: UserRepository + ?Sized,
{
    async fn create(&self, input: UserInput) -> Result<User, RepositoryError> {
        (**self).create(input).await
    }

    async fn update(&self, id: UserId, input: UserInput) -> Result<User, RepositoryError> {
        (**self).update(id, input).await
    }

    async fn find(&self, filter: &UserFilter, page_token: &str, limit: i64) -> Result<UserPage, RepositoryError> {
        (**self).find(filter, page_token, limit).await
    }

    async fn remove(&self, id: UserId) -> Result<u64, RepositoryError> {
        (**self).remove(id).await
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        (**self).ping().await
    }
}
