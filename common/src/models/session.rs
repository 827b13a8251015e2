// common/src/models/session.rs
use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

use crate::auth::IdentityAssertion;

/// Visitor identity denormalized from a verified login assertion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisitorIdentity {
    pub user_id: String,
    pub username: Option<String>,
    pub first_name: Option<String>,
}

impl VisitorIdentity {
    /// Take the identity fields out of an assertion. Call only after the
    /// assertion verified, which guarantees `id` is present.
    pub fn from_assertion(assertion: &IdentityAssertion) -> Self {
        Self {
            user_id: assertion.user_id().unwrap_or_default().to_string(),
            username: assertion.username().map(str::to_string),
            first_name: assertion.first_name().map(str::to_string),
        }
    }

    /// Human-readable label for the operator, e.g. `Alice (@alice)`
    pub fn display_name(&self) -> String {
        let name = self
            .first_name
            .clone()
            .unwrap_or_else(|| format!("User {}", self.user_id));
        match &self.username {
            Some(username) => format!("{} (@{})", name, username),
            None => name,
        }
    }
}

/// Browser session that passed login verification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSession {
    /// Secure session token used for cookie-based tracking
    pub session_token: String,
    /// Timestamp when the session was created
    pub created_at: DateTime<Utc>,
    /// Timestamp of last client activity
    pub last_active: DateTime<Utc>,
    pub is_authenticated: bool,
    pub visitor: VisitorIdentity,
}

impl ChatSession {
    /// Create a session for a freshly verified visitor
    pub fn authenticated(session_token: String, visitor: VisitorIdentity) -> Self {
        let now = Utc::now();
        Self {
            session_token,
            created_at: now,
            last_active: now,
            is_authenticated: true,
            visitor,
        }
    }

    /// Update session activity timestamp
    pub fn update_activity(&mut self) {
        self.last_active = Utc::now();
    }

    /// Check if the session has been idle longer than the TTL
    pub fn is_expired(&self, ttl_seconds: i64) -> bool {
        let now = Utc::now();
        let age = now.signed_duration_since(self.last_active);
        age.num_seconds() > ttl_seconds
    }
}

/// Result of session lookups
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SessionResult {
    Success(ChatSession),
    NotFound,
    Expired,
}

impl SessionResult {
    /// The session, if it is live and authenticated
    pub fn authenticated(self) -> Option<ChatSession> {
        match self {
            SessionResult::Success(session) if session.is_authenticated => Some(session),
            _ => None,
        }
    }
}

/// Public view of a session for the check-auth endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisitorResponse {
    pub id: String,
    pub username: Option<String>,
    pub first_name: Option<String>,
    // Omit sensitive data like session_token
}

impl From<&ChatSession> for VisitorResponse {
    fn from(session: &ChatSession) -> Self {
        Self {
            id: session.visitor.user_id.clone(),
            username: session.visitor.username.clone(),
            first_name: session.visitor.first_name.clone(),
        }
    }
}
