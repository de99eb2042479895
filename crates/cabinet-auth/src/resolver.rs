//! Session resolution: stored token to identity.
//!
//! One backend attempt per call. An explicit refusal of the token logs the
//! session out; any other failure falls back to the token's own claims so a
//! flaky network does not force a logout.

use crate::backend::AuthBackend;
use crate::identity::{Identity, TokenClaims};
use cabinet_storage::TokenStore;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Outcome of one resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Authenticated(Identity),
    /// No token was stored.
    Anonymous,
    /// The token was refused or has expired.
    Expired,
    /// The token could be neither verified nor decoded.
    Undecodable,
}

impl Resolution {
    pub fn identity(&self) -> Option<&Identity> {
        match self {
            Resolution::Authenticated(identity) => Some(identity),
            _ => None,
        }
    }

    /// Whether the resolved token must be removed from the store.
    pub fn clears_token(&self) -> bool {
        matches!(self, Resolution::Expired | Resolution::Undecodable)
    }

    pub fn into_identity(self) -> Option<Identity> {
        match self {
            Resolution::Authenticated(identity) => Some(identity),
            _ => None,
        }
    }
}

/// Turns the stored token into a [`Resolution`].
#[derive(Clone)]
pub struct SessionResolver {
    store: TokenStore,
    backend: Arc<dyn AuthBackend>,
}

impl SessionResolver {
    pub fn new(store: TokenStore, backend: Arc<dyn AuthBackend>) -> Self {
        Self { store, backend }
    }

    pub fn store(&self) -> &TokenStore {
        &self.store
    }

    /// Resolve whatever token is stored right now.
    pub async fn resolve_current(&self) -> Resolution {
        let token = self.store.read();
        self.resolve(token.as_deref()).await
    }

    /// Resolve `token`, clearing it from the store when it is refused,
    /// expired or undecodable.
    ///
    /// Tokens are only ever cleared if still equal to `token`, so a slow
    /// resolution cannot remove a token written after it started.
    pub async fn resolve(&self, token: Option<&str>) -> Resolution {
        let resolution = self.inspect(token).await;
        if let Some(token) = token {
            if resolution.clears_token() {
                self.discard(token);
            }
        }
        resolution
    }

    /// Like [`resolve`](Self::resolve) but never touches the store; the caller
    /// owns the [`discard`](Self::discard).
    pub(crate) async fn inspect(&self, token: Option<&str>) -> Resolution {
        let Some(token) = token.filter(|t| !t.is_empty()) else {
            debug!("no stored token");
            return Resolution::Anonymous;
        };

        match self.backend.current_user(token).await {
            Ok(user) => {
                let identity = Identity::authoritative(user);
                debug!(user_id = ?identity.user.id, role = %identity.role, "resolved identity");
                Resolution::Authenticated(identity)
            }
            Err(e) if e.is_rejection() => {
                info!(error = %e, "token refused");
                Resolution::Expired
            }
            Err(e) => {
                warn!(error = %e, transient = e.is_transient(), "current user unavailable, decoding token");
                fall_back(token)
            }
        }
    }

    /// Remove `token` if it is still the stored one.
    pub(crate) fn discard(&self, token: &str) {
        match self.store.clear_if(token) {
            Ok(true) => info!("session token cleared"),
            Ok(false) => debug!("token replaced since resolution started, kept"),
            Err(e) => warn!(error = %e, "failed to clear token"),
        }
    }
}

fn fall_back(token: &str) -> Resolution {
    match TokenClaims::decode(token) {
        Ok(claims) if claims.is_expired() => {
            info!(expired_at = ?claims.expires_at(), "decoded token has expired");
            Resolution::Expired
        }
        Ok(claims) => {
            let identity = claims.into_identity();
            info!(user_id = ?identity.user.id, role = %identity.role, "using decoded identity");
            Resolution::Authenticated(identity)
        }
        Err(e) => {
            warn!(error = %e, "token undecodable");
            Resolution::Undecodable
        }
    }
}
