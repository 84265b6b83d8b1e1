use serde::{Deserialize, Serialize};

use userhub_core::{User, UserId};

/// Which mutation a [`UserEvent`] reports.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UserOperation {
    #[serde(rename = "create_user")]
    Create,
    #[serde(rename = "update_user")]
    Update,
    #[serde(rename = "delete_user")]
    Delete,
}

impl UserOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserOperation::Create => "create_user",
            UserOperation::Update => "update_user",
            UserOperation::Delete => "delete_user",
        }
    }
}

impl core::fmt::Display for UserOperation {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Notification describing a completed user mutation.
///
/// Carries the post-operation snapshot for create/update; a delete only
/// carries the identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserEvent {
    pub operation: UserOperation,
    pub user_id: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
}

impl UserEvent {
    pub fn created(user: &User) -> Self {
        Self {
            operation: UserOperation::Create,
            user_id: user.id,
            user: Some(user.clone()),
        }
    }

    pub fn updated(user: &User) -> Self {
        Self {
            operation: UserOperation::Update,
            user_id: user.id,
            user: Some(user.clone()),
        }
    }

    pub fn deleted(user_id: UserId) -> Self {
        Self {
            operation: UserOperation::Delete,
            user_id,
            user: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn user() -> User {
        User {
            id: UserId::new(),
            first_name: "John".into(),
            last_name: "Smith".into(),
            nickname: "js".into(),
            email: "j@x.com".into(),
            country: "US".into(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn create_event_carries_the_snapshot() {
        let user = user();
        let json = serde_json::to_value(UserEvent::created(&user)).unwrap();

        assert_eq!(json["operation"], "create_user");
        assert_eq!(json["user_id"], user.id.to_string());
        assert_eq!(json["user"]["email"], "j@x.com");
        assert!(json["user"].get("password").is_none());
    }

    #[test]
    fn delete_event_omits_the_snapshot() {
        let id = UserId::new();
        let json = serde_json::to_value(UserEvent::deleted(id)).unwrap();

        assert_eq!(json["operation"], "delete_user");
        assert_eq!(json["user_id"], id.to_string());
        assert!(json.get("user").is_none());
    }

    #[test]
    fn events_read_back() {
        let event = UserEvent::updated(&user());
        let bytes = serde_json::to_vec(&event).unwrap();
        let parsed: UserEvent = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(parsed, event);
    }
}
