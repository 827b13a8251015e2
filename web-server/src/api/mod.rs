// web-server/src/api/mod.rs
pub mod auth;
pub mod chat;
pub mod webhook;

use actix::Addr;
use actix_web::{get, web, HttpRequest, HttpResponse};
use common::models::{ChatMessage, ChatSession, Sender};
use serde_json::json;

use crate::error::ApiError;
use crate::message_log::MessageLog;
use crate::session_registry::{CountSessions, GetSession, SessionRegistryActor};

// Cookie name for session tracking
pub const SESSION_COOKIE_NAME: &str = "livechat_session";

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(health)
        .service(auth::callback_redirect)
        .service(auth::callback_submit)
        .service(auth::check_auth)
        .service(chat::send_message)
        .service(chat::chat_history)
        .service(webhook::receive_update);
}

#[get("/health")]
pub async fn health(registry: web::Data<Addr<SessionRegistryActor>>) -> Result<HttpResponse, ApiError> {
    let sessions = registry.send(CountSessions).await?;
    Ok(HttpResponse::Ok().json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "sessions": sessions,
    })))
}

/// Session behind the request cookie, if it is live and authenticated
pub(crate) async fn current_session(
    req: &HttpRequest,
    registry: &Addr<SessionRegistryActor>,
) -> Result<Option<ChatSession>, ApiError> {
    let Some(cookie) = req.cookie(SESSION_COOKIE_NAME) else {
        return Ok(None);
    };

    let result = registry
        .send(GetSession { session_token: cookie.value().to_string() })
        .await?;
    Ok(result.authenticated())
}

pub(crate) async fn require_session(
    req: &HttpRequest,
    registry: &Addr<SessionRegistryActor>,
) -> Result<ChatSession, ApiError> {
    current_session(req, registry)
        .await?
        .ok_or(ApiError::Unauthenticated)
}

pub(crate) async fn append_message(
    log: &web::Data<MessageLog>,
    sender: Sender,
    content: String,
) -> Result<ChatMessage, ApiError> {
    let log = log.clone();
    let message = web::block(move || log.append(sender, &content)).await??;
    Ok(message)
}

pub(crate) async fn load_history(log: &web::Data<MessageLog>) -> Result<Vec<ChatMessage>, ApiError> {
    let log = log.clone();
    let history = web::block(move || log.history()).await??;
    Ok(history)
}
