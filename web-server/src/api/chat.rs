// web-server/src/api/chat.rs
use actix::Addr;
use actix_web::{get, post, web, HttpRequest, HttpResponse};
use common::models::Sender;
use common::{escape_html, BotGateway, Config};
use serde::Deserialize;
use serde_json::json;

use super::{append_message, load_history, require_session};
use crate::error::ApiError;
use crate::message_log::MessageLog;
use crate::session_registry::SessionRegistryActor;

/// Telegram rejects message text longer than this
pub const MAX_MESSAGE_BYTES: usize = 4096;

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub message: String,
}

/// Automatic reply stored after a visitor message is relayed
pub fn canned_reply(message: &str) -> &'static str {
    if message.trim() == "hi" {
        "Hello back!"
    } else {
        "Message received"
    }
}

/// Validate the request body and return the trimmed message
fn validate(body: &[u8]) -> Result<String, ApiError> {
    let request = serde_json::from_slice::<SendMessageRequest>(body)
        .map_err(|_| ApiError::Validation("The message field is required and must be a string.".to_string()))?;

    let message = request.message.trim();
    if message.is_empty() {
        return Err(ApiError::Validation("The message field is required.".to_string()));
    }
    if message.len() > MAX_MESSAGE_BYTES {
        return Err(ApiError::Validation(format!(
            "The message may not be greater than {} bytes.",
            MAX_MESSAGE_BYTES
        )));
    }
    Ok(message.to_string())
}

#[post("/send-message")]
pub async fn send_message(
    req: HttpRequest,
    body: web::Bytes,
    registry: web::Data<Addr<SessionRegistryActor>>,
    log: web::Data<MessageLog>,
    gateway: web::Data<dyn BotGateway>,
    config: web::Data<Config>,
) -> Result<HttpResponse, ApiError> {
    let session = require_session(&req, &registry).await?;
    let message = validate(&body)?;

    let client_entry = append_message(&log, Sender::Client, message.clone()).await?;

    if config.bot.token.is_empty() || config.bot.default_chat_id.is_none() {
        return Err(ApiError::Configuration("Telegram integration is not configured".to_string()));
    }

    let operator_text = format!(
        "<b>{}</b>\n{}",
        escape_html(&session.visitor.display_name()),
        escape_html(&message)
    );
    if !gateway.send_message(&operator_text, None).await {
        tracing::error!(visitor = %session.visitor.user_id, "Failed to relay visitor message to operator");
        return Err(ApiError::Upstream("Failed to send message to Telegram".to_string()));
    }

    let reply = canned_reply(&message);
    let reply_entry = append_message(&log, Sender::Server, reply.to_string()).await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": reply,
        "chat": [client_entry, reply_entry],
    })))
}

#[get("/chat-history")]
pub async fn chat_history(
    req: HttpRequest,
    registry: web::Data<Addr<SessionRegistryActor>>,
    log: web::Data<MessageLog>,
) -> Result<HttpResponse, ApiError> {
    require_session(&req, &registry).await?;
    let chat = load_history(&log).await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "chat": chat,
    })))
}
