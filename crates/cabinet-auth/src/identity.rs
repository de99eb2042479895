//! User identity records and best-effort token claim decoding.

use crate::error::{AuthError, AuthResult};
use crate::role::Role;
use base64::engine::general_purpose::{STANDARD_NO_PAD, URL_SAFE_NO_PAD};
use base64::Engine as _;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// User record as returned by the current-user endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub nom: Option<String>,
    #[serde(default)]
    pub prenom: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub telephone: Option<String>,
    /// Role as reported by the backend, unnormalized.
    #[serde(default)]
    pub usertype: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub date_naissance: Option<String>,
    #[serde(default)]
    pub date_creation: Option<String>,
    #[serde(default)]
    pub specialite: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub photo_url: Option<String>,
}

impl UserRecord {
    /// Raw role string: `usertype`, else `role`.
    pub fn raw_role(&self) -> Option<&str> {
        let present = |r: &&str| !r.trim().is_empty();
        self.usertype
            .as_deref()
            .filter(present)
            .or_else(|| self.role.as_deref().filter(present))
    }

    /// "Prenom Nom" when either is known, else the username.
    pub fn display_name(&self) -> String {
        let parts: Vec<&str> = [self.prenom.as_deref(), self.nom.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect();

        if parts.is_empty() {
            self.username.clone()
        } else {
            parts.join(" ")
        }
    }
}

/// How an identity was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trust {
    /// Returned by the backend for the presented token.
    Authoritative,
    /// Reconstructed locally from the token's claims. Never verified.
    Decoded,
}

/// The resolved user of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user: UserRecord,
    /// Normalized from `user`, never set independently.
    pub role: Role,
    pub trust: Trust,
}

impl Identity {
    pub fn authoritative(user: UserRecord) -> Self {
        Self::with_trust(user, Trust::Authoritative)
    }

    pub fn decoded(user: UserRecord) -> Self {
        Self::with_trust(user, Trust::Decoded)
    }

    fn with_trust(user: UserRecord, trust: Trust) -> Self {
        let role = Role::from(user.raw_role());
        Self { user, role, trust }
    }

    pub fn is_authoritative(&self) -> bool {
        self.trust == Trust::Authoritative
    }
}

/// Claims carried in the payload segment of a bearer token.
#[derive(Debug, Clone)]
pub struct TokenClaims {
    claims: Map<String, Value>,
}

impl TokenClaims {
    /// Decode the payload segment of `token`.
    ///
    /// Accepts base64url and standard alphabets, padded or not. The signature
    /// is not checked.
    pub fn decode(token: &str) -> AuthResult<Self> {
        let payload = token
            .split('.')
            .nth(1)
            .map(|segment| segment.trim().trim_end_matches('='))
            .filter(|segment| !segment.is_empty())
            .ok_or_else(|| AuthError::TokenDecode("token has no payload segment".to_string()))?;

        let bytes = URL_SAFE_NO_PAD
            .decode(payload)
            .or_else(|_| STANDARD_NO_PAD.decode(payload))
            .map_err(|e| AuthError::TokenDecode(format!("payload is not base64: {}", e)))?;

        match serde_json::from_slice::<Value>(&bytes) {
            Ok(Value::Object(claims)) => Ok(Self { claims }),
            Ok(_) => Err(AuthError::TokenDecode(
                "payload is not a JSON object".to_string(),
            )),
            Err(e) => Err(AuthError::TokenDecode(format!(
                "payload is not JSON: {}",
                e
            ))),
        }
    }

    /// Expiry time from the `exp` claim, if present and numeric.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        let exp = self.claims.get("exp")?;
        let secs = exp.as_i64().or_else(|| exp.as_f64().map(|f| f as i64))?;
        DateTime::from_timestamp(secs, 0)
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at().is_some_and(|exp| exp <= now)
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Best-effort user record from the claims.
    pub fn to_user(&self) -> UserRecord {
        let id = self
            .claims
            .get("sub")
            .and_then(as_integer)
            .or_else(|| self.claims.get("id").and_then(as_integer));

        let username = self
            .string("username")
            .or_else(|| self.string("sub"))
            .unwrap_or_default();

        let nom = self
            .string("nom")
            .or_else(|| self.string("firstname"))
            .or_else(|| self.string("lastname"));

        let usertype = self
            .string("usertype")
            .or_else(|| self.string("role"))
            .or_else(|| self.first_of("roles"));

        UserRecord {
            id,
            username,
            nom,
            prenom: self.string("prenom"),
            email: self.string("email"),
            usertype,
            ..UserRecord::default()
        }
    }

    pub fn into_identity(self) -> Identity {
        Identity::decoded(self.to_user())
    }

    fn string(&self, name: &str) -> Option<String> {
        match self.claims.get(name)? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Array(_) => self.first_of(name),
            _ => None,
        }
    }

    fn first_of(&self, name: &str) -> Option<String> {
        match self.claims.get(name)? {
            Value::Array(items) => items
                .iter()
                .filter_map(Value::as_str)
                .find(|s| !s.is_empty())
                .map(str::to_string),
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            _ => None,
        }
    }
}

fn as_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
