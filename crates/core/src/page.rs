//! Keyset pagination: page-size clamping and next-token derivation.

use serde::{Deserialize, Serialize};

use crate::cursor;
use crate::user::User;

/// Upper bound (and default) for the number of users returned per page.
pub const MAX_PAGE_SIZE: usize = 100;

/// One page of `find` results.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPage {
    pub users: Vec<User>,
    /// Token for the next page; empty when there are no more results.
    pub page_token: String,
}

impl UserPage {
    pub fn has_more(&self) -> bool {
        !self.page_token.is_empty()
    }
}

/// Normalize a caller-supplied page size.
///
/// Anything outside `[1, MAX_PAGE_SIZE]` (including zero and negatives) means
/// "use the default", which is the maximum.
pub fn clamp_limit(requested: i64) -> usize {
    match usize::try_from(requested) {
        Ok(n) if (1..=MAX_PAGE_SIZE).contains(&n) => n,
        _ => MAX_PAGE_SIZE,
    }
}

/// Trim an over-fetched batch (`limit + 1` rows) into a page.
///
/// When there are more rows than `limit`, the token points at the first row of
/// the *next* page, which the following query uses as its inclusive lower
/// bound. `limit` must already be clamped.
pub fn paginate(mut rows: Vec<User>, limit: usize) -> UserPage {
    if rows.len() > limit {
        let page_token = cursor::encode(rows[limit].id);
        rows.truncate(limit);
        return UserPage {
            users: rows,
            page_token,
        };
    }

    UserPage {
        users: rows,
        page_token: String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::UserId;
    use chrono::Utc;
    use proptest::prelude::*;

    fn users(n: usize) -> Vec<User> {
        let mut ids: Vec<UserId> = (0..n).map(|_| UserId::new()).collect();
        ids.sort();
        ids.into_iter()
            .map(|id| User {
                id,
                first_name: "John".into(),
                last_name: "Doe".into(),
                nickname: "jd".into(),
                email: "j@x.com".into(),
                country: "US".into(),
                created_at: Utc::now(),
                updated_at: Utc::now(),
            })
            .collect()
    }

    #[test]
    fn clamp_limit_defaults_out_of_range_values() {
        assert_eq!(clamp_limit(0), MAX_PAGE_SIZE);
        assert_eq!(clamp_limit(-5), MAX_PAGE_SIZE);
        assert_eq!(clamp_limit(101), MAX_PAGE_SIZE);
        assert_eq!(clamp_limit(i64::MAX), MAX_PAGE_SIZE);
        assert_eq!(clamp_limit(1), 1);
        assert_eq!(clamp_limit(100), 100);
        assert_eq!(clamp_limit(42), 42);
    }

    #[test]
    fn overflow_row_becomes_the_next_token() {
        let rows = users(3);
        let third = rows[2].id;

        let page = paginate(rows, 2);
        assert_eq!(page.users.len(), 2);
        assert!(page.has_more());
        assert_eq!(cursor::decode(&page.page_token).unwrap(), third);
    }

    #[test]
    fn short_batch_ends_the_result_set() {
        let page = paginate(users(2), 2);
        assert_eq!(page.users.len(), 2);
        assert_eq!(page.page_token, "");

        let page = paginate(Vec::new(), 10);
        assert!(page.users.is_empty());
        assert!(!page.has_more());
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 64,
            ..ProptestConfig::default()
        })]

        /// Property: a page never exceeds `limit`, and a token is emitted
        /// exactly when rows were left over.
        #[test]
        fn page_size_and_token_follow_the_batch(n in 0usize..40, limit in 1usize..20) {
            let rows = users(n);
            let ids: Vec<UserId> = rows.iter().map(|u| u.id).collect();

            let page = paginate(rows, limit);

            if n > limit {
                prop_assert_eq!(page.users.len(), limit);
                prop_assert_eq!(cursor::decode(&page.page_token).unwrap(), ids[limit]);
            } else {
                prop_assert_eq!(page.users.len(), n);
                prop_assert!(page.page_token.is_empty());
            }
            let returned: Vec<UserId> = page.users.iter().map(|u| u.id).collect();
            prop_assert_eq!(&returned[..], &ids[..returned.len()]);
        }
    }
}
