//! Bootstrap of the `u1.users` table.
//!
//! Create-if-missing only; there is no migration history.

use sqlx::PgPool;
use tracing::info;

/// DDL for the users table (idempotent).
pub const USERS_SCHEMA: &str = include_str!("../sql/users.sql");

/// Create the schema, table and indexes when they do not exist yet.
pub async fn ensure_schema(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::raw_sql(USERS_SCHEMA).execute(pool).await?;
    info!("users schema ready");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ddl_is_idempotent() {
        let statements = USERS_SCHEMA
            .split(';')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>();

        assert!(!statements.is_empty());
        for stmt in statements {
            assert!(stmt.contains("IF NOT EXISTS"), "not idempotent: {stmt}");
        }
    }
}
