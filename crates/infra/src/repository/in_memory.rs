//! In-memory user repository for tests and local runs.

use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;

use userhub_core::{User, UserFilter, UserId, UserInput, UserPage, paginate};

use super::query::UserQuery;
use super::{RepositoryError, UserRepository};

#[derive(Debug, Clone)]
struct StoredUser {
    user: User,
    password: String,
}

/// In-memory user repository.
///
/// Intended for tests/dev. Rows are kept ordered by id, so `find` walks them
/// in the same order the SQL query returns them.
#[derive(Debug, Default)]
pub struct InMemoryUserRepository {
    users: RwLock<BTreeMap<UserId, StoredUser>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored password of `id`; never part of any read model.
    pub fn password_of(&self, id: UserId) -> Option<String> {
        self.users
            .read()
            .ok()
            .and_then(|users| users.get(&id).map(|stored| stored.password.clone()))
    }

    pub fn len(&self) -> usize {
        self.users.read().map(|users| users.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn poisoned(operation: &'static str) -> RepositoryError {
        RepositoryError::store(operation, "lock poisoned")
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn create(&self, input: UserInput) -> Result<User, RepositoryError> {
        let mut users = self.users.write().map_err(|_| Self::poisoned("create"))?;

        let now = Utc::now();
        let user = User {
            id: UserId::new(),
            first_name: input.first_name,
            last_name: input.last_name,
            nickname: input.nickname,
            email: input.email,
            country: input.country,
            created_at: now,
            updated_at: now,
        };

        users.insert(
            user.id,
            StoredUser {
                user: user.clone(),
                password: input.password,
            },
        );

        Ok(user)
    }

    async fn update(&self, id: UserId, input: UserInput) -> Result<User, RepositoryError> {
        let mut users = self.users.write().map_err(|_| Self::poisoned("update"))?;
        let stored = users.get_mut(&id).ok_or(RepositoryError::NotFound)?;

        stored.user.first_name = input.first_name;
        stored.user.last_name = input.last_name;
        stored.user.nickname = input.nickname;
        stored.user.email = input.email;
        stored.user.country = input.country;
        stored.user.updated_at = Utc::now();
        stored.password = input.password;

        Ok(stored.user.clone())
    }

    async fn find(&self, filter: &UserFilter, page_token: &str, limit: i64) -> Result<UserPage, RepositoryError> {
        let query = UserQuery::for_page(filter, page_token, limit)?;
        let users = self.users.read().map_err(|_| Self::poisoned("find"))?;

        let rows = users
            .range(query.lower_bound()..)
            .map(|(_, stored)| &stored.user)
            .filter(|user| query.matches(user))
            .take(query.fetch_size())
            .cloned()
            .collect::<Vec<_>>();

        Ok(paginate(rows, query.limit()))
    }

    async fn remove(&self, id: UserId) -> Result<u64, RepositoryError> {
        let mut users = self.users.write().map_err(|_| Self::poisoned("remove"))?;
        Ok(u64::from(users.remove(&id).is_some()))
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        self.users.read().map(|_| ()).map_err(|_| Self::poisoned("ping"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use userhub_core::{DomainError, cursor};

    fn input(first: &str, country: &str) -> UserInput {
        UserInput {
            first_name: first.into(),
            last_name: "Doe".into(),
            nickname: first.to_lowercase(),
            password: "hunter2".into(),
            email: format!("{}@example.com", first.to_lowercase()),
            country: country.into(),
        }
    }

    async fn seeded(repo: &InMemoryUserRepository, n: usize) -> Vec<User> {
        let mut users = Vec::with_capacity(n);
        for i in 0..n {
            let country = if i % 2 == 0 { "US" } else { "UK" };
            users.push(repo.create(input(&format!("User{i}"), country)).await.unwrap());
        }
        users.sort_by_key(|u| u.id);
        users
    }

    #[tokio::test]
    async fn create_assigns_id_and_equal_timestamps() {
        let repo = InMemoryUserRepository::new();
        let user = repo.create(input("Ada", "UK")).await.unwrap();

        assert!(!user.id.is_min());
        assert_eq!(user.created_at, user.updated_at);
        assert_eq!(repo.password_of(user.id).as_deref(), Some("hunter2"));
    }

    #[tokio::test]
    async fn pages_walk_every_row_exactly_once_in_id_order() {
        let repo = InMemoryUserRepository::new();
        let all = seeded(&repo, 7).await;

        let mut seen = Vec::new();
        let mut token = String::new();
        loop {
            let page = repo.find(&UserFilter::new(), &token, 3).await.unwrap();
            assert!(page.users.len() <= 3);
            seen.extend(page.users.iter().map(|u| u.id));
            if !page.has_more() {
                break;
            }
            token = page.page_token;
        }

        assert_eq!(seen, all.iter().map(|u| u.id).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn limit_one_returns_first_match_and_points_at_second() {
        let repo = InMemoryUserRepository::new();
        let all = seeded(&repo, 6).await;
        let us = all.iter().filter(|u| u.country == "US").collect::<Vec<_>>();

        let filter = UserFilter::new().with_country("US");
        let page = repo.find(&filter, "", 1).await.unwrap();

        assert_eq!(page.users, vec![us[0].clone()]);
        assert_eq!(cursor::decode(&page.page_token).unwrap(), us[1].id);

        let next = repo.find(&filter, &page.page_token, 1).await.unwrap();
        assert_eq!(next.users, vec![us[1].clone()]);
    }

    #[tokio::test]
    async fn filter_selects_only_matching_rows() {
        let repo = InMemoryUserRepository::new();
        seeded(&repo, 5).await;

        let page = repo
            .find(&UserFilter::new().with_country("UK"), "", 0)
            .await
            .unwrap();
        assert_eq!(page.users.len(), 2);
        assert!(page.users.iter().all(|u| u.country == "UK"));
        assert!(!page.has_more());

        let none = repo
            .find(&UserFilter::new().with_country("FR"), "", 10)
            .await
            .unwrap();
        assert!(none.users.is_empty());
        assert!(none.page_token.is_empty());
    }

    #[tokio::test]
    async fn exact_fit_has_no_next_token() {
        let repo = InMemoryUserRepository::new();
        seeded(&repo, 4).await;

        let page = repo.find(&UserFilter::new(), "", 4).await.unwrap();
        assert_eq!(page.users.len(), 4);
        assert!(!page.has_more());
    }

    #[tokio::test]
    async fn update_overwrites_fields_and_refreshes_updated_at() {
        let repo = InMemoryUserRepository::new();
        let user = repo.create(input("Ada", "UK")).await.unwrap();

        let mut changed = input("Ada", "FR");
        changed.password = "new-secret".into();
        let updated = repo.update(user.id, changed).await.unwrap();

        assert_eq!(updated.id, user.id);
        assert_eq!(updated.country, "FR");
        assert_eq!(updated.created_at, user.created_at);
        assert!(updated.updated_at >= user.updated_at);
        assert_eq!(repo.password_of(user.id).as_deref(), Some("new-secret"));
    }

    #[tokio::test]
    async fn update_of_unknown_id_is_not_found() {
        let repo = InMemoryUserRepository::new();
        let err = repo.update(UserId::new(), input("Ada", "UK")).await.unwrap_err();
        assert_eq!(err, RepositoryError::NotFound);
    }

    #[tokio::test]
    async fn remove_reports_rows_affected() {
        let repo = InMemoryUserRepository::new();
        let user = repo.create(input("Ada", "UK")).await.unwrap();

        assert_eq!(repo.remove(user.id).await.unwrap(), 1);
        assert_eq!(repo.remove(user.id).await.unwrap(), 0);
        assert!(repo.is_empty());
    }

    #[tokio::test]
    async fn malformed_token_is_a_validation_error() {
        let repo = InMemoryUserRepository::new();
        let err = repo.find(&UserFilter::new(), "%%%", 10).await.unwrap_err();
        assert!(matches!(
            err,
            RepositoryError::Validation(DomainError::InvalidCursor(_))
        ));
    }
}
