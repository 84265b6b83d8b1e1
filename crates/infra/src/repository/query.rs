//! Dynamic-filter keyset query for `find`.
//!
//! A `UserQuery` is built from a sparse [`UserFilter`], an inclusive lower
//! bound on the id, and a page size. It renders into a parameterized
//! `SELECT` by appending clauses from a fixed set of optional predicates; no
//! caller-supplied text is ever spliced into the SQL. The same predicate set is
//! evaluated in memory by [`UserQuery::matches`], so every backend agrees on
//! which rows a filter selects.
//!
//! Rendered shape:
//!
//! ```text
//! SELECT <columns> FROM u1.users
//! WHERE id >= $1 [AND first_name = $n] ... [AND id >= $n]
//! ORDER BY id ASC
//! LIMIT $n            -- page size + 1
//! ```
//!
//! `ORDER BY id ASC` must never change: the page token is an id and the next
//! page starts at it, which is only correct under a stable total order.

use sqlx::{Postgres, QueryBuilder};

use userhub_core::{DomainError, User, UserFilter, UserId, clamp_limit, cursor};

/// Table holding user records.
pub const USERS_TABLE: &str = "u1.users";

/// Columns of the read model, in `User` field order.
pub const USER_COLUMNS: &str = "id, first_name, last_name, nickname, email, country, created_at, updated_at";

/// Columns a filter may constrain by equality.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Column {
    FirstName,
    LastName,
    Nickname,
    Country,
    Email,
}

impl Column {
    const ALL: [Column; 5] = [
        Column::FirstName,
        Column::LastName,
        Column::Nickname,
        Column::Country,
        Column::Email,
    ];

    fn as_sql(self) -> &'static str {
        match self {
            Column::FirstName => "first_name",
            Column::LastName => "last_name",
            Column::Nickname => "nickname",
            Column::Country => "country",
            Column::Email => "email",
        }
    }

    fn filter_value(self, filter: &UserFilter) -> Option<&str> {
        match self {
            Column::FirstName => filter.first_name(),
            Column::LastName => filter.last_name(),
            Column::Nickname => filter.nickname(),
            Column::Country => filter.country(),
            Column::Email => filter.email(),
        }
    }

    fn user_value(self, user: &User) -> &str {
        match self {
            Column::FirstName => &user.first_name,
            Column::LastName => &user.last_name,
            Column::Nickname => &user.nickname,
            Column::Country => &user.country,
            Column::Email => &user.email,
        }
    }
}

/// A bounded, deterministically ordered user lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserQuery {
    filter: UserFilter,
    lower_bound: UserId,
    limit: usize,
}

impl UserQuery {
    /// `limit` is the page size (already clamped); one extra row is fetched.
    pub fn new(filter: UserFilter, lower_bound: UserId, limit: usize) -> Self {
        Self {
            filter,
            lower_bound,
            limit,
        }
    }

    /// Plan the query for one `find` call: clamp the page size and decode the
    /// page token into the lower bound.
    pub fn for_page(filter: &UserFilter, page_token: &str, requested_limit: i64) -> Result<Self, DomainError> {
        let lower_bound = cursor::decode(page_token)?;
        Ok(Self::new(filter.clone(), lower_bound, clamp_limit(requested_limit)))
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Rows to request from the store: one more than the page size, so a
    /// following page can be detected without a second query.
    pub fn fetch_size(&self) -> usize {
        self.limit + 1
    }

    pub fn lower_bound(&self) -> UserId {
        self.lower_bound
    }

    pub fn filter(&self) -> &UserFilter {
        &self.filter
    }

    fn equalities(&self) -> impl Iterator<Item = (Column, &str)> + '_ {
        Column::ALL
            .into_iter()
            .filter_map(|col| col.filter_value(&self.filter).map(|v| (col, v)))
    }

    /// Render into a Postgres query builder with every value bound.
    pub fn to_sql(&self) -> QueryBuilder<'static, Postgres> {
        let mut builder = QueryBuilder::new(format!("SELECT {USER_COLUMNS} FROM {USERS_TABLE}"));

        builder.push(" WHERE id >= ").push_bind(*self.lower_bound.as_uuid());

        for (column, value) in self.equalities() {
            builder
                .push(" AND ")
                .push(column.as_sql())
                .push(" = ")
                .push_bind(value.to_owned());
        }

        if let Some(id) = self.filter.id() {
            builder.push(" AND id >= ").push_bind(*id.as_uuid());
        }

        builder
            .push(" ORDER BY id ASC LIMIT ")
            .push_bind(self.fetch_size() as i64);

        builder
    }

    /// Whether `user` satisfies every predicate (ignores the row limit).
    pub fn matches(&self, user: &User) -> bool {
        if user.id < self.lower_bound {
            return false;
        }
        if let Some(id) = self.filter.id() {
            if user.id < id {
                return false;
            }
        }
        self.equalities()
            .all(|(column, value)| column.user_value(user) == value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    const SELECT: &str = "SELECT id, first_name, last_name, nickname, email, country, created_at, updated_at FROM u1.users";

    fn user(country: &str, email: &str) -> User {
        User {
            id: UserId::new(),
            first_name: "John".into(),
            last_name: "Doe".into(),
            nickname: "jd".into(),
            email: email.into(),
            country: country.into(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn empty_filter_only_bounds_and_orders() {
        let query = UserQuery::new(UserFilter::new(), UserId::MIN, 10);
        let sql = query.to_sql();

        assert_eq!(
            sql.sql(),
            format!("{SELECT} WHERE id >= $1 ORDER BY id ASC LIMIT $2")
        );
        assert_eq!(query.fetch_size(), 11);
    }

    #[test]
    fn populated_fields_become_bound_equalities_in_fixed_order() {
        let filter = UserFilter::new()
            .with_email("j@x.com")
            .with_first_name("John")
            .with_nickname("")
            .with_country("US");
        let query = UserQuery::new(filter, UserId::MIN, 5);

        assert_eq!(
            query.to_sql().sql(),
            format!(
                "{SELECT} WHERE id >= $1 AND first_name = $2 AND country = $3 AND email = $4 \
                 ORDER BY id ASC LIMIT $5"
            )
        );
    }

    #[test]
    fn filter_id_adds_a_second_lower_bound() {
        let query = UserQuery::new(UserFilter::new().with_id(UserId::new()), UserId::MIN, 1);
        assert_eq!(
            query.to_sql().sql(),
            format!("{SELECT} WHERE id >= $1 AND id >= $2 ORDER BY id ASC LIMIT $3")
        );
    }

    #[test]
    fn values_are_never_spliced_into_the_sql() {
        let hostile = "x' OR '1'='1";
        let query = UserQuery::new(UserFilter::new().with_last_name(hostile), UserId::MIN, 1);
        assert!(!query.to_sql().sql().contains(hostile));
    }

    #[test]
    fn for_page_clamps_and_decodes() {
        let bound = UserId::new();
        let token = cursor::encode(bound);

        let query = UserQuery::for_page(&UserFilter::new(), &token, 0).unwrap();
        assert_eq!(query.lower_bound(), bound);
        assert_eq!(query.limit(), userhub_core::MAX_PAGE_SIZE);

        let query = UserQuery::for_page(&UserFilter::new(), "", 3).unwrap();
        assert_eq!(query.lower_bound(), UserId::MIN);
        assert_eq!(query.limit(), 3);

        let err = UserQuery::for_page(&UserFilter::new(), "***", 3).unwrap_err();
        assert!(matches!(err, DomainError::InvalidCursor(_)));
    }

    #[test]
    fn matches_agrees_with_the_rendered_predicates() {
        let us = user("US", "a@x.com");
        let uk = user("UK", "a@x.com");

        let any = UserQuery::new(UserFilter::new(), UserId::MIN, 10);
        assert!(any.matches(&us) && any.matches(&uk));

        let only_us = UserQuery::new(UserFilter::new().with_country("US"), UserId::MIN, 10);
        assert!(only_us.matches(&us));
        assert!(!only_us.matches(&uk));

        let above = UserQuery::new(UserFilter::new(), us.id, 10);
        assert!(above.matches(&us), "lower bound is inclusive");
    }
}
