use subtle::ConstantTimeEq;
use uuid::Uuid;

use crate::{config::ApiKey, error_code::ErrorCode};

#[derive(Debug, thiserror::Error)]
pub(crate) enum AuthError {
    #[error("No bearer token provided")]
    MissingToken,

    #[error("Provided token did not match any known key")]
    InvalidToken,
}

impl AuthError {
    pub(crate) const fn error_code(&self) -> ErrorCode {
        ErrorCode::UNAUTHENTICATED
    }
}

/// Resolves a bearer token to the user it belongs to
pub(crate) trait Authenticate: Send + Sync {
    fn authenticate(&self, token: &str) -> Result<Uuid, AuthError>;
}

#[derive(Clone)]
pub(crate) struct ApiKeys {
    keys: Vec<ApiKey>,
}

impl std::fmt::Debug for ApiKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiKeys")
            .field("count", &self.keys.len())
            .finish()
    }
}

impl ApiKeys {
    pub(crate) fn new(keys: Vec<ApiKey>) -> Self {
        ApiKeys { keys }
    }
}

fn secure_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    a.as_bytes().ct_eq(b.as_bytes()).into()
}

impl Authenticate for ApiKeys {
    fn authenticate(&self, token: &str) -> Result<Uuid, AuthError> {
        if token.is_empty() {
            return Err(AuthError::MissingToken);
        }

        // every key is compared so the match position isn't observable
        self.keys
            .iter()
            .fold(None, |found, api_key| {
                if secure_compare(&api_key.key, token) {
                    found.or(Some(api_key.user_id))
                } else {
                    found
                }
            })
            .ok_or(AuthError::InvalidToken)
    }
}

#[cfg(test)]
mod tests {
    use super::{ApiKeys, AuthError, Authenticate};
    use crate::config::ApiKey;

    fn keys() -> (ApiKeys, uuid::Uuid) {
        let user_id = uuid::Uuid::new_v4();

        let keys = ApiKeys::new(vec![
            ApiKey {
                user_id: uuid::Uuid::new_v4(),
                key: String::from("someone-else"),
            },
            ApiKey {
                user_id,
                key: String::from("secret"),
            },
        ]);

        (keys, user_id)
    }

    #[test]
    fn known_token() {
        let (keys, user_id) = keys();

        assert_eq!(keys.authenticate("secret").expect("Authenticated"), user_id);
    }

    #[test]
    fn unknown_token() {
        let (keys, _) = keys();

        assert!(matches!(
            keys.authenticate("secrets"),
            Err(AuthError::InvalidToken)
        ));
        assert!(matches!(
            keys.authenticate("Secret"),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn empty_token() {
        let (keys, _) = keys();

        assert!(matches!(keys.authenticate(""), Err(AuthError::MissingToken)));
    }
}
