// web-server/src/api/webhook.rs
use actix_web::{post, web, HttpRequest, HttpResponse};
use common::models::Sender;
use common::{BotGateway, Config};
use serde::Deserialize;
use serde_json::json;

use super::append_message;
use crate::error::ApiError;
use crate::message_log::MessageLog;
use crate::utils::token::constant_time_eq;

pub const SECRET_HEADER: &str = "X-Telegram-Bot-Api-Secret-Token";

const ECHO_REPLY: &str = "Message received";

/// The slice of a Bot API update this server consumes
#[derive(Debug, Deserialize)]
pub struct Update {
    #[serde(default)]
    pub message: Option<IncomingMessage>,
}

#[derive(Debug, Deserialize)]
pub struct IncomingMessage {
    #[serde(default)]
    pub text: Option<String>,
    pub chat: IncomingChat,
}

#[derive(Debug, Deserialize)]
pub struct IncomingChat {
    pub id: i64,
}

#[post("/webhook")]
pub async fn receive_update(
    req: HttpRequest,
    body: web::Bytes,
    config: web::Data<Config>,
    log: web::Data<MessageLog>,
    gateway: web::Data<dyn BotGateway>,
) -> Result<HttpResponse, ApiError> {
    if let Some(expected) = config.bot.webhook_secret.as_deref() {
        let presented = req
            .headers()
            .get(SECRET_HEADER)
            .map(|value| value.as_bytes())
            .unwrap_or_default();
        if !constant_time_eq(presented, expected.as_bytes()) {
            tracing::warn!("Rejected webhook update with a bad secret token");
            return Err(ApiError::WebhookSecret);
        }
    }

    let update = serde_json::from_slice::<Update>(&body)
        .map_err(|e| ApiError::Validation(format!("Malformed update: {}", e)))?;

    let Some(IncomingMessage { text: Some(text), chat }) = update.message else {
        tracing::debug!("Ignoring update without message text");
        return Ok(HttpResponse::Ok().json(json!({ "success": true })));
    };

    append_message(&log, Sender::Remote, text).await?;
    tracing::info!(chat_id = chat.id, "Stored operator message");

    if config.bot.echo_replies && !gateway.send_message(ECHO_REPLY, Some(&chat.id.to_string())).await {
        // Telegram redelivers on non-2xx, so a failed echo is only logged
        tracing::warn!(chat_id = chat.id, "Failed to echo reply");
    }

    Ok(HttpResponse::Ok().json(json!({ "success": true })))
}
