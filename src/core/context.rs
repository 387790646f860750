use std::sync::Arc;

use time::OffsetDateTime;

use crate::core::security::{self, SecurityError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Student,
    Admin,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Admin => "admin",
        }
    }

    fn from_claim(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "admin" | "administrator" | "superuser" => Some(Role::Admin),
            "student" | "user" | "candidate" => Some(Role::Student),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Identity {
    pub subject: String,
    pub role: Role,
    pub display_name: Option<String>,
    pub expires_at: Option<OffsetDateTime>,
}

/// Authenticated caller, handed explicitly to whatever needs it.
#[derive(Debug, Clone)]
pub struct SessionContext {
    inner: Arc<InnerContext>,
}

#[derive(Debug)]
struct InnerContext {
    token: String,
    identity: Identity,
}

impl SessionContext {
    /// Builds a context from a login token. `login_role` is the role implied by
    /// the endpoint that issued the token and is used when the token has none.
    pub fn from_token(token: impl Into<String>, login_role: Role) -> Result<Self, SecurityError> {
        let token = token.into();
        let claims = security::decode_claims(&token)?;
        let role = claims.role.as_deref().and_then(Role::from_claim).unwrap_or(login_role);
        let expires_at = claims.expires_at()?;

        let identity =
            Identity { subject: claims.sub, role, display_name: claims.name, expires_at };
        Ok(Self::new(token, identity))
    }

    pub fn new(token: String, identity: Identity) -> Self {
        Self { inner: Arc::new(InnerContext { token, identity }) }
    }

    pub fn token(&self) -> &str {
        &self.inner.token
    }

    pub fn identity(&self) -> &Identity {
        &self.inner.identity
    }

    pub fn is_admin(&self) -> bool {
        self.inner.identity.role == Role::Admin
    }

    pub fn is_expired(&self, now: OffsetDateTime) -> bool {
        self.inner.identity.expires_at.is_some_and(|expires_at| expires_at <= now)
    }
}
