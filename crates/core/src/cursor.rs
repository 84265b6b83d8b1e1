//! Page token codec.
//!
//! A page token is the base64 (standard alphabet, padded) encoding of a user
//! identifier's canonical text form. The empty string is the "no bound" token:
//! it decodes to [`UserId::MIN`] on input and marks the end of the result set
//! on output.

use base64::{Engine as _, engine::general_purpose::STANDARD};

use crate::error::DomainError;
use crate::id::UserId;

/// Encode an identifier as an opaque, URL/query-string friendly page token.
pub fn encode(id: UserId) -> String {
    STANDARD.encode(id.to_string())
}

/// Decode a page token back into the inclusive keyset lower bound.
pub fn decode(token: &str) -> Result<UserId, DomainError> {
    if token.is_empty() {
        return Ok(UserId::MIN);
    }

    let bytes = STANDARD
        .decode(token)
        .map_err(|e| DomainError::invalid_cursor(format!("not base64: {e}")))?;
    let text = String::from_utf8(bytes)
        .map_err(|_| DomainError::invalid_cursor("payload is not utf-8"))?;

    text.parse::<UserId>()
        .map_err(|e| DomainError::invalid_cursor(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use uuid::Uuid;

    #[test]
    fn empty_token_is_the_minimum_bound() {
        assert_eq!(decode("").unwrap(), UserId::MIN);
    }

    #[test]
    fn token_is_base64_of_the_canonical_text() {
        let id: UserId = "0b5b1a58-8b9e-4c57-a3f0-4c1a2b0f9d11".parse().unwrap();
        let token = encode(id);
        assert_eq!(token, "MGI1YjFhNTgtOGI5ZS00YzU3LWEzZjAtNGMxYTJiMGY5ZDEx");
        assert_eq!(decode(&token).unwrap(), id);
    }

    #[test]
    fn malformed_tokens_are_rejected() {
        // not base64 at all
        assert!(matches!(decode("%%%"), Err(DomainError::InvalidCursor(_))));
        // valid base64, not a uuid
        let token = STANDARD.encode("hello");
        assert!(matches!(decode(&token), Err(DomainError::InvalidCursor(_))));
        // valid base64, not utf-8
        let token = STANDARD.encode([0xff, 0xfe, 0xfd]);
        assert!(matches!(decode(&token), Err(DomainError::InvalidCursor(_))));
    }

    proptest! {
        #[test]
        fn decode_inverts_encode(bytes in any::<[u8; 16]>()) {
            let id = UserId::from_uuid(Uuid::from_bytes(bytes));
            prop_assert_eq!(decode(&encode(id)).unwrap(), id);
        }
    }
}
