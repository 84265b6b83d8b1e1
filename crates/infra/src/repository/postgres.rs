//! Postgres-backed user repository.
//!
//! ## Error Mapping
//!
//! SQLx errors are mapped to `RepositoryError` as follows:
//!
//! | SQLx Error | PostgreSQL Error Code | RepositoryError | Scenario |
//! |------------|----------------------|-----------------|----------|
//! | Database (unique violation) | `23505` | `Store` | Duplicate id (should not occur, ids are server-generated) |
//! | Database (check / not-null violation) | `23514`, `23502` | `Store` | Schema constraint rejected the values |
//! | Database (other) | Any other | `Store` | Other database errors |
//! | PoolTimedOut | N/A | `Timeout` | No connection became available in time |
//! | PoolClosed | N/A | `Store` | Connection pool was closed |
//! | ColumnDecode / ColumnNotFound | N/A | `MalformedRow` | Row shape does not match `User` |
//! | Other | N/A | `Store` | Network errors, connection failures, etc. |
//!
//! Every operation is additionally bounded by the repository's operation
//! timeout; an elapsed bound becomes `Timeout` and the query future is dropped.
//!
//! ## Thread Safety
//!
//! `PostgresUserRepository` is `Send + Sync` and cheap to clone; all
//! connections come from the shared SQLx pool.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgPool, Row};
use tracing::{Span, error, instrument};
use uuid::Uuid;

use userhub_core::{User, UserFilter, UserId, UserInput, UserPage, paginate};

use super::query::UserQuery;
use super::{RepositoryError, UserRepository};

/// Upper bound on a single store operation unless configured otherwise.
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(5);

/// User repository over the `u1.users` table.
#[derive(Debug, Clone)]
pub struct PostgresUserRepository {
    pool: PgPool,
    op_timeout: Duration,
}

impl PostgresUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            op_timeout: DEFAULT_STORE_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, op_timeout: Duration) -> Self {
        self.op_timeout = op_timeout;
        self
    }

    async fn bounded<T, F>(&self, operation: &'static str, fut: F) -> Result<T, RepositoryError>
    where
        F: Future<Output = Result<T, RepositoryError>> + Send,
    {
        match tokio::time::timeout(self.op_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(RepositoryError::Timeout(operation)),
        }
    }

    fn decode(operation: &'static str, row: &PgRow) -> Result<User, RepositoryError> {
        UserRow::from_row(row).map(User::from).map_err(|e| {
            error!(operation, error = %e, "malformed user row");
            RepositoryError::MalformedRow {
                operation,
                message: e.to_string(),
            }
        })
    }
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    #[instrument(skip(self, input), fields(user_id), err)]
    async fn create(&self, input: UserInput) -> Result<User, RepositoryError> {
        self.bounded("create", async {
            let row = sqlx::query(
                r#"
                INSERT INTO u1.users (first_name, last_name, nickname, password, email, country)
                VALUES ($1, $2, $3, $4, $5, $6)
                RETURNING id, first_name, last_name, nickname, email, country, created_at, updated_at
                "#,
            )
            .bind(&input.first_name)
            .bind(&input.last_name)
            .bind(&input.nickname)
            .bind(&input.password)
            .bind(&input.email)
            .bind(&input.country)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("create", e))?;

            let row = row.ok_or(RepositoryError::NotPersisted)?;
            let user = Self::decode("create", &row)?;
            Span::current().record("user_id", tracing::field::display(user.id));
            Ok(user)
        })
        .await
    }

    #[instrument(skip(self, input), fields(user_id = %id), err)]
    async fn update(&self, id: UserId, input: UserInput) -> Result<User, RepositoryError> {
        self.bounded("update", async {
            let row = sqlx::query(
                r#"
                UPDATE u1.users
                SET first_name = $2,
                    last_name = $3,
                    nickname = $4,
                    password = $5,
                    email = $6,
                    country = $7,
                    updated_at = now()
                WHERE id = $1
                RETURNING id, first_name, last_name, nickname, email, country, created_at, updated_at
                "#,
            )
            .bind(id.as_uuid())
            .bind(&input.first_name)
            .bind(&input.last_name)
            .bind(&input.nickname)
            .bind(&input.password)
            .bind(&input.email)
            .bind(&input.country)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("update", e))?;

            let row = row.ok_or(RepositoryError::NotFound)?;
            Self::decode("update", &row)
        })
        .await
    }

    #[instrument(skip(self, filter, page_token), fields(row_count), err)]
    async fn find(&self, filter: &UserFilter, page_token: &str, limit: i64) -> Result<UserPage, RepositoryError> {
        let query = UserQuery::for_page(filter, page_token, limit)?;

        self.bounded("find", async {
            let mut builder = query.to_sql();
            let rows = builder
                .build()
                .fetch_all(&self.pool)
                .await
                .map_err(|e| map_sqlx_error("find", e))?;

            Span::current().record("row_count", rows.len());

            let users = rows
                .iter()
                .map(|row| Self::decode("find", row))
                .collect::<Result<Vec<_>, _>>()?;

            Ok(paginate(users, query.limit()))
        })
        .await
    }

    #[instrument(skip(self), fields(user_id = %id), err)]
    async fn remove(&self, id: UserId) -> Result<u64, RepositoryError> {
        self.bounded("remove", async {
            let result = sqlx::query("DELETE FROM u1.users WHERE id = $1")
                .bind(id.as_uuid())
                .execute(&self.pool)
                .await
                .map_err(|e| map_sqlx_error("remove", e))?;

            Ok(result.rows_affected())
        })
        .await
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        self.bounded("ping", async {
            sqlx::query("SELECT 1")
                .execute(&self.pool)
                .await
                .map_err(|e| map_sqlx_error("ping", e))?;
            Ok(())
        })
        .await
    }
}

/// Map SQLx errors to repository errors.
fn map_sqlx_error(operation: &'static str, err: sqlx::Error) -> RepositoryError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = match db_err.code() {
                Some(code) => match code.as_ref() {
                    "23505" => format!("duplicate user: {}", db_err.message()),
                    "23502" | "23514" => format!("constraint violated: {}", db_err.message()),
                    _ => format!("database error: {}", db_err.message()),
                },
                None => format!("database error: {}", db_err.message()),
            };
            RepositoryError::store(operation, msg)
        }
        sqlx::Error::PoolTimedOut => RepositoryError::Timeout(operation),
        sqlx::Error::PoolClosed => RepositoryError::store(operation, "connection pool closed"),
        e @ (sqlx::Error::ColumnDecode { .. } | sqlx::Error::ColumnNotFound(_) | sqlx::Error::Decode(_)) => {
            error!(operation, error = %e, "malformed user row");
            RepositoryError::MalformedRow {
                operation,
                message: e.to_string(),
            }
        }
        e => RepositoryError::store(operation, format!("sqlx error: {e}")),
    }
}

/// Raw `u1.users` row as returned by the read queries.
#[derive(Debug)]
struct UserRow {
    id: Uuid,
    first_name: String,
    last_name: String,
    nickname: String,
    email: String,
    country: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for UserRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(UserRow {
            id: row.try_get("id")?,
            first_name: row.try_get("first_name")?,
            last_name: row.try_get("last_name")?,
            nickname: row.try_get("nickname")?,
            email: row.try_get("email")?,
            country: row.try_get("country")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: UserId::from_uuid(row.id),
            first_name: row.first_name,
            last_name: row.last_name,
            nickname: row.nickname,
            email: row.email,
            country: row.country,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}
