//! Caller identity for administrative routes.
//!
//! Requests carry `Authorization: Bearer <token>`. An [`Authenticator`] maps
//! the token to a [`Caller`]; the HTTP layer then decides whether the role is
//! allowed. [`StaticTokenAuthenticator`] reads its tokens from configuration
//! in the form `token=user_id:role[,token=user_id:role...]`.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Errors parsing a token table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("malformed token entry '{0}': expected token=user_id:role")]
    MalformedEntry(String),

    #[error("unknown role '{0}': expected member, admin or super_admin")]
    UnknownRole(String),
}

/// Authorization level of a caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Member,
    Admin,
    SuperAdmin,
}

impl Role {
    /// True for roles allowed to upload and edit content.
    #[must_use]
    pub fn is_admin(self) -> bool {
        matches!(self, Self::Admin | Self::SuperAdmin)
    }

    /// True only for the role allowed to publish and remove issues.
    #[must_use]
    pub fn is_super_admin(self) -> bool {
        self == Self::SuperAdmin
    }
}

impl FromStr for Role {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "member" | "user" => Ok(Self::Member),
            "admin" => Ok(Self::Admin),
            "super_admin" | "superadmin" => Ok(Self::SuperAdmin),
            other => Err(AuthError::UnknownRole(other.to_string())),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Member => "member",
            Self::Admin => "admin",
            Self::SuperAdmin => "super_admin",
        };
        write!(f, "{label}")
    }
}

/// An authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub user_id: String,
    pub role: Role,
}

/// Resolves bearer tokens to callers.
pub trait Authenticator: Send + Sync {
    /// Returns the caller owning `token`, if any.
    fn authenticate(&self, token: &str) -> Option<Caller>;
}

/// Fixed token table.
#[derive(Clone, Default)]
pub struct StaticTokenAuthenticator {
    tokens: HashMap<String, Caller>,
}

impl fmt::Debug for StaticTokenAuthenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticTokenAuthenticator")
            .field("tokens", &self.tokens.len())
            .finish()
    }
}

impl StaticTokenAuthenticator {
    /// Parses `token=user_id:role` entries separated by commas. Blank entries
    /// are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError`] for an entry missing `=` or `:`, an empty part,
    /// or an unknown role.
    pub fn parse(table: &str) -> Result<Self, AuthError> {
        let mut tokens = HashMap::new();
        for entry in table.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let malformed = || AuthError::MalformedEntry(redact(entry));
            let (token, identity) = entry.split_once('=').ok_or_else(malformed)?;
            let (user_id, role) = identity.rsplit_once(':').ok_or_else(malformed)?;
            let (token, user_id) = (token.trim(), user_id.trim());
            if token.is_empty() || user_id.is_empty() {
                return Err(malformed());
            }
            tokens.insert(
                token.to_string(),
                Caller {
                    user_id: user_id.to_string(),
                    role: role.parse()?,
                },
            );
        }
        Ok(Self { tokens })
    }

    /// Number of configured tokens.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl Authenticator for StaticTokenAuthenticator {
    fn authenticate(&self, token: &str) -> Option<Caller> {
        self.tokens.get(token).cloned()
    }
}

/// Keeps the identity part of an entry, hiding the token.
fn redact(entry: &str) -> String {
    entry
        .split_once('=')
        .map_or_else(|| "<redacted>".to_string(), |(_, rest)| format!("***={rest}"))
}
