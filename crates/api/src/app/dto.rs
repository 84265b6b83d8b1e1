use serde::{Deserialize, Serialize};

use userhub_core::{DomainError, UserFilter, UserId, UserInput};

/// Query string of `GET /api/users`.
///
/// `limit` is kept as text so a non-integer value can be rejected with a
/// validation error instead of a generic extractor failure.
#[derive(Debug, Default, Deserialize)]
pub struct FindUsersQuery {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub nickname: Option<String>,
    pub country: Option<String>,
    pub email: Option<String>,
    pub page_token: Option<String>,
    pub limit: Option<String>,
}

impl FindUsersQuery {
    pub fn filter(&self) -> UserFilter {
        UserFilter {
            id: None,
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            nickname: self.nickname.clone(),
            email: self.email.clone(),
            country: self.country.clone(),
        }
    }

    pub fn page_token(&self) -> &str {
        self.page_token.as_deref().unwrap_or_default()
    }

    /// Requested page size; absent means "default" (0 is clamped later).
    pub fn limit(&self) -> Result<i64, DomainError> {
        match &self.limit {
            None => Ok(0),
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| DomainError::validation(format!("limit must be an integer, got {raw:?}"))),
        }
    }
}

/// Body of `PUT /api/users`: the full set of mutable fields plus the target id.
#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub id: UserId,
    #[serde(flatten)]
    pub input: UserInput,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RemoveUserResponse {
    pub rows_affected: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_limit_means_default() {
        assert_eq!(FindUsersQuery::default().limit().unwrap(), 0);
    }

    #[test]
    fn non_integer_limit_is_a_validation_error() {
        let query = FindUsersQuery {
            limit: Some("ten".into()),
            ..Default::default()
        };
        assert!(matches!(query.limit(), Err(DomainError::Validation(_))));

        let empty = FindUsersQuery {
            limit: Some(String::new()),
            ..Default::default()
        };
        assert!(empty.limit().is_err());
    }

    #[test]
    fn update_body_flattens_input_fields() {
        let id = UserId::new();
        let body = serde_json::json!({
            "id": id.to_string(),
            "first_name": "Ada",
            "password": "secret",
        });

        let req: UpdateUserRequest = serde_json::from_value(body).unwrap();
        assert_eq!(req.id, id);
        assert_eq!(req.input.first_name, "Ada");
        assert_eq!(req.input.password, "secret");
        assert!(req.input.country.is_empty());
    }
}
