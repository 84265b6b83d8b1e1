//! User read model, write input, and search filter.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::UserId;

/// A persisted user, as returned by the store.
///
/// There is no password here: the password only exists on
/// [`UserInput`], so read responses and event snapshots cannot carry it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub first_name: String,
    pub last_name: String,
    pub nickname: String,
    pub email: String,
    pub country: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Mutable user fields supplied by a caller on create/update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct UserInput {
    pub first_name: String,
    pub last_name: String,
    pub nickname: String,
    pub password: String,
    pub email: String,
    pub country: String,
}

/// Sparse search template for `find`.
///
/// `None` and `Some("")` both mean "no constraint on this column". `id`, when
/// set, adds an extra inclusive lower bound on the identifier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserFilter {
    pub id: Option<UserId>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub nickname: Option<String>,
    pub email: Option<String>,
    pub country: Option<String>,
}

impl UserFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_first_name(mut self, value: impl Into<String>) -> Self {
        self.first_name = Some(value.into());
        self
    }

    pub fn with_last_name(mut self, value: impl Into<String>) -> Self {
        self.last_name = Some(value.into());
        self
    }

    pub fn with_nickname(mut self, value: impl Into<String>) -> Self {
        self.nickname = Some(value.into());
        self
    }

    pub fn with_email(mut self, value: impl Into<String>) -> Self {
        self.email = Some(value.into());
        self
    }

    pub fn with_country(mut self, value: impl Into<String>) -> Self {
        self.country = Some(value.into());
        self
    }

    pub fn with_id(mut self, id: UserId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn first_name(&self) -> Option<&str> {
        non_empty(&self.first_name)
    }

    pub fn last_name(&self) -> Option<&str> {
        non_empty(&self.last_name)
    }

    pub fn nickname(&self) -> Option<&str> {
        non_empty(&self.nickname)
    }

    pub fn email(&self) -> Option<&str> {
        non_empty(&self.email)
    }

    pub fn country(&self) -> Option<&str> {
        non_empty(&self.country)
    }

    /// Extra identifier bound; the nil id constrains nothing and is ignored.
    pub fn id(&self) -> Option<UserId> {
        self.id.filter(|id| !id.is_min())
    }

    /// True when no field constrains the result set.
    pub fn is_empty(&self) -> bool {
        self.id().is_none()
            && self.first_name().is_none()
            && self.last_name().is_none()
            && self.nickname().is_none()
            && self.email().is_none()
            && self.country().is_none()
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_strings_do_not_constrain() {
        let filter = UserFilter::new().with_country("").with_email("");
        assert!(filter.is_empty());
        assert_eq!(filter.country(), None);

        let filter = filter.with_country("UK");
        assert!(!filter.is_empty());
        assert_eq!(filter.country(), Some("UK"));
    }

    #[test]
    fn user_json_never_has_a_password() {
        let user = User {
            id: UserId::new(),
            first_name: "Alice".into(),
            last_name: "Bob".into(),
            nickname: "AB123".into(),
            email: "alice@bob.com".into(),
            country: "UK".into(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password").is_none());
        assert_eq!(json["id"], user.id.to_string());
        assert_eq!(json["nickname"], "AB123");
    }

    #[test]
    fn input_fields_default_to_empty() {
        let input: UserInput = serde_json::from_str(r#"{"first_name":"John","password":"secret"}"#).unwrap();
        assert_eq!(input.first_name, "John");
        assert_eq!(input.password, "secret");
        assert_eq!(input.country, "");
    }
}
