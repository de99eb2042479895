//! Authentication error types.

use thiserror::Error;

/// Authentication error type.
#[derive(Error, Debug)]
pub enum AuthError {
    /// Login refused the username/password pair
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    /// Backend refused the bearer token (invalid, expired, revoked)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Backend answered with a non-success status other than a token refusal
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    /// Backend answered 2xx with a body that is not what was asked for
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Login succeeded but the response carried no token
    #[error("Login response did not contain a token")]
    MissingToken,

    /// Token claims could not be decoded
    #[error("Token decode failed: {0}")]
    TokenDecode(String),

    /// A logout happened while the login was in flight
    #[error("Login superseded by a logout")]
    Superseded,

    /// Invalid state transition in the session FSM
    #[error("Invalid session state transition: {0}")]
    InvalidStateTransition(String),

    /// Storage error
    #[error("Storage error: {0}")]
    Storage(#[from] cabinet_storage::StorageError),

    /// HTTP request error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parse error
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] cabinet_config_and_utils::CoreError),
}

impl AuthError {
    /// Returns true if the backend explicitly refused the presented token.
    ///
    /// This is the only signal that forces a logout during resolution; every
    /// other failure leaves the token in place.
    pub fn is_rejection(&self) -> bool {
        matches!(self, AuthError::Unauthorized(_))
    }

    /// Returns true if this error is transient and the operation can be retried.
    ///
    /// Transient errors include:
    /// - Connection failures and timeouts
    /// - HTTP errors with 5xx status codes
    pub fn is_transient(&self) -> bool {
        match self {
            AuthError::Api { status, .. } => (500..600).contains(status),
            AuthError::Http(e) => {
                if e.is_connect() || e.is_timeout() {
                    return true;
                }
                e.status().map(|s| s.is_server_error()).unwrap_or(false)
            }
            _ => false,
        }
    }
}

/// Result type alias using AuthError.
pub type AuthResult<T> = Result<T, AuthError>;
