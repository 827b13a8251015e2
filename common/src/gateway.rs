// common/src/gateway.rs
//! Outbound calls to the Telegram Bot API.
//!
//! Every operation is one best-effort HTTP attempt bounded by the configured
//! timeout. Failures are logged and collapse to `false` / `None`; nothing is
//! retried. Request URLs embed the bot token, so they are never logged and
//! transport errors are stripped of their URL before formatting.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

use crate::config::{BotConfig, BotToken};

/// Bot API operations the chat server and webhook tool depend on
#[async_trait]
pub trait BotGateway: Send + Sync {
    /// Send `text` to `chat_id`, or to the configured operator chat when `None`
    async fn send_message(&self, text: &str, chat_id: Option<&str>) -> bool;

    async fn set_webhook(&self, url: &str) -> bool;

    async fn delete_webhook(&self) -> bool;

    async fn get_webhook_info(&self) -> Option<WebhookInfo>;
}

/// Subset of the Bot API `WebhookInfo` object
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookInfo {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub pending_update_count: u64,
    #[serde(default)]
    pub last_error_message: Option<String>,
}

impl WebhookInfo {
    pub fn is_set(&self) -> bool {
        !self.url.is_empty()
    }
}

/// Response envelope shared by every Bot API method
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Telegram configuration missing: {0}")]
    NotConfigured(&'static str),

    #[error("transport error: {0}")]
    Transport(reqwest::Error),

    #[error("HTTP status {status}: {}", .description.as_deref().unwrap_or("no description"))]
    Status { status: u16, description: Option<String> },

    #[error("Bot API returned ok=false: {}", .0.as_deref().unwrap_or("no description"))]
    Rejected(Option<String>),

    #[error("unreadable Bot API response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        GatewayError::Transport(err.without_url())
    }
}

/// Bot API client backed by reqwest
#[derive(Clone)]
pub struct TelegramGateway {
    http: reqwest::Client,
    api_base: String,
    token: BotToken,
    default_chat_id: Option<String>,
    webhook_secret: Option<String>,
}

impl TelegramGateway {
    pub fn new(config: &BotConfig) -> Result<Self, GatewayError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        if config.token.is_empty() {
            tracing::error!("Telegram configuration incomplete: bot token missing");
        }
        if config.default_chat_id.is_none() {
            tracing::warn!("Telegram configuration incomplete: default chat id missing");
        }

        Ok(Self {
            http,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            token: config.token.clone(),
            default_chat_id: config.default_chat_id.clone(),
            webhook_secret: config.webhook_secret.clone(),
        })
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        body: serde_json::Value,
    ) -> Result<Option<T>, GatewayError> {
        if self.token.is_empty() {
            return Err(GatewayError::NotConfigured("bot token"));
        }

        let url = format!("{}/bot{}/{}", self.api_base, self.token.expose(), method);
        let response = self.http.post(url).json(&body).send().await?;

        let status = response.status();
        let text = response.text().await?;
        let parsed = serde_json::from_str::<ApiResponse<T>>(&text);

        if !status.is_success() {
            return Err(GatewayError::Status {
                status: status.as_u16(),
                description: parsed.ok().and_then(|r| r.description),
            });
        }

        let parsed = parsed?;
        if !parsed.ok {
            return Err(GatewayError::Rejected(parsed.description));
        }

        Ok(parsed.result)
    }

    async fn call_logged<T: DeserializeOwned>(
        &self,
        method: &str,
        body: serde_json::Value,
    ) -> Result<Option<T>, GatewayError> {
        let result = self.call(method, body).await;
        match &result {
            Ok(_) => tracing::debug!(method, "Bot API call succeeded"),
            Err(GatewayError::NotConfigured(what)) => {
                tracing::error!(method, "Cannot call Bot API: Telegram configuration missing {}", what)
            },
            Err(e) => tracing::warn!(method, error = %e, "Bot API call failed"),
        }
        result
    }
}

#[async_trait]
impl BotGateway for TelegramGateway {
    async fn send_message(&self, text: &str, chat_id: Option<&str>) -> bool {
        let Some(chat_id) = chat_id.or(self.default_chat_id.as_deref()) else {
            tracing::error!("Cannot send message: no chat id given and no default chat id configured");
            return false;
        };

        let body = json!({
            "chat_id": chat_id,
            "text": text,
            "parse_mode": "HTML",
        });

        let sent = self
            .call_logged::<serde_json::Value>("sendMessage", body)
            .await
            .is_ok();
        if sent {
            tracing::info!("Telegram message sent successfully");
        }
        sent
    }

    async fn set_webhook(&self, url: &str) -> bool {
        if let Err(e) = url::Url::parse(url) {
            tracing::error!(error = %e, "Refusing to register an invalid webhook URL");
            return false;
        }

        let mut body = json!({ "url": url });
        if let Some(secret) = &self.webhook_secret {
            body["secret_token"] = json!(secret);
        }

        self.call_logged::<serde_json::Value>("setWebhook", body)
            .await
            .is_ok()
    }

    async fn delete_webhook(&self) -> bool {
        self.call_logged::<serde_json::Value>("deleteWebhook", json!({}))
            .await
            .is_ok()
    }

    async fn get_webhook_info(&self) -> Option<WebhookInfo> {
        match self.call_logged::<WebhookInfo>("getWebhookInfo", json!({})).await {
            Ok(info) => Some(info.unwrap_or_default()),
            Err(_) => None,
        }
    }
}
