//! REST request layer shared by every backend call.

use crate::backend::{AuthBackend, Credentials, LoginResponse};
use crate::error::{AuthError, AuthResult};
use crate::identity::UserRecord;
use async_trait::async_trait;
use cabinet_config_and_utils::Config;
use cabinet_storage::TokenStore;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};
use url::Url;

pub const LOGIN_PATH: &str = "/api/users/login";
pub const CURRENT_USER_PATH: &str = "/api/users/me";

/// Which bearer token a request carries.
#[derive(Debug, Clone, Copy)]
pub enum Bearer<'a> {
    /// Whatever the attached [`TokenStore`] holds, if anything.
    Stored,
    /// Exactly this token.
    Token(&'a str),
    /// No `Authorization` header.
    Anonymous,
}

/// JSON client for the practice backend.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    tokens: Option<TokenStore>,
}

impl ApiClient {
    pub fn new(base_url: Url) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
            tokens: None,
        }
    }

    /// Attach the token of `store` to [`Bearer::Stored`] requests.
    pub fn with_token_store(mut self, store: TokenStore) -> Self {
        self.tokens = Some(store);
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `path` appended to the base URL, keeping any base path prefix.
    pub fn endpoint(&self, path: &str) -> AuthResult<Url> {
        let base = self.base_url.as_str().trim_end_matches('/');
        let path = path.trim_start_matches('/');
        Ok(Url::parse(&format!("{}/{}", base, path))?)
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> AuthResult<Option<T>> {
        self.send::<(), T>(Method::GET, path, None, Bearer::Stored)
            .await
    }

    pub async fn post<B, T>(&self, path: &str, body: &B) -> AuthResult<Option<T>>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        self.send(Method::POST, path, Some(body), Bearer::Stored)
            .await
    }

    /// Send one request and decode its JSON body.
    ///
    /// Returns `None` for `204 No Content` and empty bodies. 401 and 403 map
    /// to [`AuthError::Unauthorized`], other non-2xx statuses to
    /// [`AuthError::Api`] with the backend's message when it sent one.
    pub async fn send<B, T>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        bearer: Bearer<'_>,
    ) -> AuthResult<Option<T>>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let url = self.endpoint(path)?;
        let mut request = self.http.request(method.clone(), url);

        let token = match bearer {
            Bearer::Stored => self.tokens.as_ref().and_then(TokenStore::read),
            Bearer::Token(token) => Some(token.to_string()),
            Bearer::Anonymous => None,
        };
        if let Some(token) = &token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        debug!(%method, path, authenticated = token.is_some(), "API request");
        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::NO_CONTENT {
            return Ok(None);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = error_message(status, &body);

            return Err(match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                    debug!(path, status = status.as_u16(), "API request refused");
                    AuthError::Unauthorized(message)
                }
                _ => {
                    warn!(path, status = status.as_u16(), message = %message, "API error");
                    AuthError::Api {
                        status: status.as_u16(),
                        message,
                    }
                }
            });
        }

        let bytes = response.bytes().await?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }

        Ok(Some(serde_json::from_slice(&bytes)?))
    }
}

/// Message of a failed response: the JSON `message` or `error` field, else the
/// status line.
fn error_message(status: StatusCode, body: &str) -> String {
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(value) => ["message", "error"]
            .iter()
            .filter_map(|field| value.get(field).and_then(|v| v.as_str()))
            .find(|m| !m.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("HTTP error {}", status.as_u16())),
        Err(_) => format!(
            "{} ({})",
            status.canonical_reason().unwrap_or("Server error"),
            status.as_u16()
        ),
    }
}

/// [`AuthBackend`] over HTTP.
#[derive(Clone)]
pub struct HttpAuthBackend {
    api: ApiClient,
}

impl HttpAuthBackend {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Backend at the configured base URL, sending `store`'s token on
    /// [`Bearer::Stored`] requests.
    pub fn from_config(config: &Config, store: TokenStore) -> AuthResult<Self> {
        let api = ApiClient::new(config.api_base_url()?).with_token_store(store);
        Ok(Self::new(api))
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }
}

#[async_trait]
impl AuthBackend for HttpAuthBackend {
    async fn login(&self, credentials: &Credentials) -> AuthResult<LoginResponse> {
        // A stale stored token must not be sent along with credentials.
        let response = self
            .api
            .send::<Credentials, LoginResponse>(
                Method::POST,
                LOGIN_PATH,
                Some(credentials),
                Bearer::Anonymous,
            )
            .await
            .map_err(|e| match e {
                AuthError::Unauthorized(message) => AuthError::InvalidCredentials(message),
                other => other,
            })?;

        response.ok_or(AuthError::MissingToken)
    }

    async fn current_user(&self, token: &str) -> AuthResult<UserRecord> {
        self.api
            .send::<(), UserRecord>(Method::GET, CURRENT_USER_PATH, None, Bearer::Token(token))
            .await?
            .ok_or_else(|| AuthError::InvalidResponse("empty current-user response".to_string()))
    }
}
