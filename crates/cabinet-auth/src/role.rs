//! User roles.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Coarse permission class of a user.
///
/// Backend strings are normalized here once; the rest of the crate compares
/// variants, never raw strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Doctor.
    Medecin,
    Assistant,
    Patient,
    /// Missing or unrecognized role. Never satisfies a role requirement.
    Unknown,
}

impl Role {
    /// Normalize a backend role string: trimmed, case-insensitive, with an
    /// optional `ROLE_` prefix.
    pub fn parse(raw: &str) -> Self {
        let upper = raw.trim().to_ascii_uppercase();
        let name = upper.strip_prefix("ROLE_").unwrap_or(&upper);
        match name {
            "MEDECIN" => Role::Medecin,
            "ASSISTANT" => Role::Assistant,
            "PATIENT" => Role::Patient,
            _ => Role::Unknown,
        }
    }

    /// Upper-case wire form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Medecin => "MEDECIN",
            Role::Assistant => "ASSISTANT",
            Role::Patient => "PATIENT",
            Role::Unknown => "UNKNOWN",
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Role::Unknown)
    }
}

impl From<Option<&str>> for Role {
    fn from(raw: Option<&str>) -> Self {
        raw.map(Role::parse).unwrap_or(Role::Unknown)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Role {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Role {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Role::parse(&raw))
    }
}
