//! The backend operations the session core depends on.

use crate::error::AuthResult;
use crate::identity::UserRecord;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Login form payload.
#[derive(Clone, Serialize)]
pub struct Credentials {
    pub username: String,
    pub mot_de_passe: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            mot_de_passe: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("mot_de_passe", &"[redacted]")
            .finish()
    }
}

/// Login response. Older backends send `token` instead of `accessToken`.
#[derive(Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

impl LoginResponse {
    /// The bearer token, `accessToken` first.
    pub fn bearer(&self) -> Option<&str> {
        [self.access_token.as_deref(), self.token.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|t| !t.is_empty())
    }
}

impl fmt::Debug for LoginResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginResponse")
            .field("has_token", &self.bearer().is_some())
            .field("token_type", &self.token_type)
            .field("role", &self.role)
            .finish()
    }
}

/// Remote authentication operations.
///
/// `current_user` must report a refused token as
/// [`AuthError::Unauthorized`](crate::AuthError::Unauthorized); any other
/// error is treated as a failure to reach a verdict.
#[async_trait]
pub trait AuthBackend: Send + Sync {
    /// Exchange credentials for a bearer token.
    async fn login(&self, credentials: &Credentials) -> AuthResult<LoginResponse>;

    /// Fetch the user that `token` belongs to.
    async fn current_user(&self, token: &str) -> AuthResult<UserRecord>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_serialize_with_backend_field_names() {
        let json = serde_json::to_value(Credentials::new("doc1", "x")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"username": "doc1", "mot_de_passe": "x"})
        );
    }

    #[test]
    fn test_credentials_debug_hides_password() {
        let debug = format!("{:?}", Credentials::new("doc1", "hunter2"));
        assert!(debug.contains("doc1"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn test_bearer_prefers_access_token() {
        let response: LoginResponse = serde_json::from_str(
            r#"{"accessToken": "abc.def.ghi", "token": "legacy", "role": "MEDECIN"}"#,
        )
        .unwrap();
        assert_eq!(response.bearer(), Some("abc.def.ghi"));

        let legacy: LoginResponse = serde_json::from_str(r#"{"token": "legacy"}"#).unwrap();
        assert_eq!(legacy.bearer(), Some("legacy"));

        let empty: LoginResponse = serde_json::from_str(r#"{"accessToken": ""}"#).unwrap();
        assert_eq!(empty.bearer(), None);
    }
}
