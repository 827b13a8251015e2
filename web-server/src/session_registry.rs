// web-server/src/session_registry.rs
use actix::{Actor, AsyncContext, Context, Handler, Message, MessageResult};
use common::models::session::{ChatSession, SessionResult, VisitorIdentity};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use crate::utils::token::create_session_token;

// Default idle TTL in seconds (24 hours)
const DEFAULT_SESSION_TTL: i64 = 86400;

/// Actor message: Store a verified visitor under a fresh session token
#[derive(Message)]
#[rtype(result = "String")]
pub struct AuthenticateSession {
    /// Token from the request cookie, dropped when present
    pub previous_token: Option<String>,
    pub visitor: VisitorIdentity,
}

/// Actor message: Get a session by token, touching its activity timestamp
#[derive(Message)]
#[rtype(result = "SessionResult")]
pub struct GetSession {
    pub session_token: String,
}

/// Actor message: Clean up expired sessions
#[derive(Message)]
#[rtype(result = "usize")]
pub struct CleanupExpiredSessions;

/// Actor message: Number of live sessions
#[derive(Message)]
#[rtype(result = "usize")]
pub struct CountSessions;

/// In-memory store of authenticated chat sessions keyed by cookie token
pub struct SessionRegistryActor {
    sessions: Arc<DashMap<String, ChatSession>>,
    // Idle TTL in seconds
    session_ttl: i64,
    // Cleanup interval in seconds
    cleanup_interval: u64,
    expired_total: usize,
}

impl Default for SessionRegistryActor {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionRegistryActor {
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
            session_ttl: DEFAULT_SESSION_TTL,
            cleanup_interval: 3600,
            expired_total: 0,
        }
    }

    pub fn with_ttl(mut self, ttl_seconds: i64) -> Self {
        self.session_ttl = ttl_seconds;
        self
    }

    pub fn with_cleanup_interval(mut self, interval_seconds: u64) -> Self {
        self.cleanup_interval = interval_seconds.max(1);
        self
    }

    fn cleanup_sessions(&mut self) -> usize {
        let before = self.sessions.len();
        let ttl = self.session_ttl;
        self.sessions.retain(|_, session| !session.is_expired(ttl));

        let expired = before.saturating_sub(self.sessions.len());
        self.expired_total += expired;
        expired
    }
}

impl Actor for SessionRegistryActor {
    type Context = Context<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        tracing::info!("SessionRegistryActor started with TTL: {}s", self.session_ttl);

        ctx.run_interval(Duration::from_secs(self.cleanup_interval), |act, _ctx| {
            let expired_count = act.cleanup_sessions();
            if expired_count > 0 {
                tracing::info!("Cleaned up {} expired sessions", expired_count);
            }
        });
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        tracing::info!(
            "SessionRegistryActor stopped. {} live sessions, {} expired during lifetime",
            self.sessions.len(),
            self.expired_total
        );
    }
}

impl Handler<AuthenticateSession> for SessionRegistryActor {
    type Result = MessageResult<AuthenticateSession>;

    fn handle(&mut self, msg: AuthenticateSession, _ctx: &mut Self::Context) -> Self::Result {
        if let Some(previous) = msg.previous_token {
            self.sessions.remove(&previous);
        }

        let session_token = create_session_token();
        tracing::info!("Visitor {} authenticated", msg.visitor.user_id);

        self.sessions.insert(
            session_token.clone(),
            ChatSession::authenticated(session_token.clone(), msg.visitor),
        );

        MessageResult(session_token)
    }
}

impl Handler<GetSession> for SessionRegistryActor {
    type Result = MessageResult<GetSession>;

    fn handle(&mut self, msg: GetSession, _ctx: &mut Self::Context) -> Self::Result {
        let result = match self.sessions.get_mut(&msg.session_token) {
            None => SessionResult::NotFound,
            Some(mut entry) => {
                let session = entry.value_mut();
                if session.is_expired(self.session_ttl) {
                    SessionResult::Expired
                } else {
                    session.update_activity();
                    SessionResult::Success(session.clone())
                }
            },
        };

        if matches!(result, SessionResult::Expired) {
            self.sessions.remove(&msg.session_token);
            self.expired_total += 1;
            tracing::debug!("Dropped expired session on lookup");
        }
        MessageResult(result)
    }
}

impl Handler<CleanupExpiredSessions> for SessionRegistryActor {
    type Result = MessageResult<CleanupExpiredSessions>;

    fn handle(&mut self, _msg: CleanupExpiredSessions, _ctx: &mut Self::Context) -> Self::Result {
        let expired_count = self.cleanup_sessions();
        tracing::info!("Cleaned up {} expired sessions", expired_count);
        MessageResult(expired_count)
    }
}

impl Handler<CountSessions> for SessionRegistryActor {
    type Result = MessageResult<CountSessions>;

    fn handle(&mut self, _msg: CountSessions, _ctx: &mut Self::Context) -> Self::Result {
        MessageResult(self.sessions.len())
    }
}
