// webhook-cli/src/setup.rs
use std::io::Write;

use anyhow::{bail, Context};
use common::{BotConfig, BotGateway, WebhookInfo};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookAction {
    /// Register the given URL, falling back to the configured one
    Set(Option<String>),
    Delete,
    Info,
}

pub struct WebhookSetup<'a> {
    gateway: &'a dyn BotGateway,
    config: &'a BotConfig,
}

impl<'a> WebhookSetup<'a> {
    pub fn new(gateway: &'a dyn BotGateway, config: &'a BotConfig) -> Self {
        Self { gateway, config }
    }

    pub async fn run(&self, action: WebhookAction, out: &mut impl Write) -> anyhow::Result<()> {
        if self.config.token.is_empty() {
            bail!("Telegram bot token is not configured (bot.token / TELEGRAM_BOT_TOKEN)");
        }

        match action {
            WebhookAction::Set(url) => self.set(url, out).await,
            WebhookAction::Delete => self.delete(out).await,
            WebhookAction::Info => {
                let info = self
                    .gateway
                    .get_webhook_info()
                    .await
                    .context("Failed to fetch webhook info")?;
                print_info(&info, out)
            },
        }
    }

    async fn set(&self, url: Option<String>, out: &mut impl Write) -> anyhow::Result<()> {
        let Some(url) = url.or_else(|| self.config.webhook_url.clone()) else {
            bail!("Webhook URL not provided and not configured in bot.webhook_url");
        };

        writeln!(out, "Setting Telegram webhook to: {}", url)?;

        if let Some(current) = self.gateway.get_webhook_info().await {
            if current.url == url {
                writeln!(out, "Webhook is already set to this URL")?;
                return Ok(());
            }
        }

        if !self.gateway.set_webhook(&url).await {
            bail!("Failed to set webhook");
        }
        writeln!(out, "Webhook set successfully")?;

        if let Some(info) = self.gateway.get_webhook_info().await {
            print_info(&info, out)?;
        }
        Ok(())
    }

    async fn delete(&self, out: &mut impl Write) -> anyhow::Result<()> {
        writeln!(out, "Attempting to delete Telegram webhook")?;

        if !self.gateway.delete_webhook().await {
            bail!("Failed to delete webhook");
        }
        writeln!(out, "Webhook deleted successfully")?;

        if let Some(info) = self.gateway.get_webhook_info().await {
            if !info.is_set() {
                writeln!(out, "Confirmed: No webhook URL is set")?;
            }
        }
        Ok(())
    }
}

fn print_info(info: &WebhookInfo, out: &mut impl Write) -> anyhow::Result<()> {
    writeln!(out, "Webhook Info:")?;
    writeln!(out, "URL: {}", if info.is_set() { info.url.as_str() } else { "Not set" })?;
    writeln!(out, "Pending updates: {}", info.pending_update_count)?;
    if let Some(error) = &info.last_error_message {
        writeln!(out, "Last error: {}", error)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use common::BotToken;
    use std::sync::Mutex;

    /// In-memory stand-in for the Bot API webhook state
    struct FakeGateway {
        url: Mutex<String>,
        accept: bool,
        set_calls: Mutex<usize>,
    }

    impl FakeGateway {
        fn with_url(url: &str) -> Self {
            Self { url: Mutex::new(url.to_string()), accept: true, set_calls: Mutex::new(0) }
        }
    }

    #[async_trait]
    impl BotGateway for FakeGateway {
        async fn send_message(&self, _text: &str, _chat_id: Option<&str>) -> bool {
            unreachable!("webhook setup never sends messages")
        }

        async fn set_webhook(&self, url: &str) -> bool {
            *self.set_calls.lock().unwrap() += 1;
            if self.accept {
                *self.url.lock().unwrap() = url.to_string();
            }
            self.accept
        }

        async fn delete_webhook(&self) -> bool {
            if self.accept {
                self.url.lock().unwrap().clear();
            }
            self.accept
        }

        async fn get_webhook_info(&self) -> Option<WebhookInfo> {
            Some(WebhookInfo {
                url: self.url.lock().unwrap().clone(),
                pending_update_count: 2,
                last_error_message: None,
            })
        }
    }

    fn config() -> BotConfig {
        BotConfig {
            token: BotToken::new("123:abc"),
            webhook_url: Some("https://configured.example.com/webhook".to_string()),
            ..BotConfig::default()
        }
    }

    async fn run(gateway: &FakeGateway, config: &BotConfig, action: WebhookAction) -> (anyhow::Result<()>, String) {
        let mut out = Vec::new();
        let result = WebhookSetup::new(gateway, config).run(action, &mut out).await;
        (result, String::from_utf8(out).unwrap())
    }

    #[tokio::test]
    async fn test_set_explicit_url() {
        let gateway = FakeGateway::with_url("");
        let (result, out) = run(&gateway, &config(), WebhookAction::Set(Some("https://new.example.com/webhook".into()))).await;

        assert!(result.is_ok());
        assert!(out.contains("Webhook set successfully"));
        assert!(out.contains("URL: https://new.example.com/webhook"));
        assert!(out.contains("Pending updates: 2"));
    }

    #[tokio::test]
    async fn test_set_falls_back_to_configured_url() {
        let gateway = FakeGateway::with_url("");
        let (result, _) = run(&gateway, &config(), WebhookAction::Set(None)).await;

        assert!(result.is_ok());
        assert_eq!(*gateway.url.lock().unwrap(), "https://configured.example.com/webhook");
    }

    #[tokio::test]
    async fn test_set_same_url_is_noop() {
        let gateway = FakeGateway::with_url("https://configured.example.com/webhook");
        let (result, out) = run(&gateway, &config(), WebhookAction::Set(None)).await;

        assert!(result.is_ok());
        assert!(out.contains("already set"));
        assert_eq!(*gateway.set_calls.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_set_without_any_url_fails() {
        let gateway = FakeGateway::with_url("");
        let config = BotConfig { webhook_url: None, ..config() };
        let (result, _) = run(&gateway, &config, WebhookAction::Set(None)).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_rejected_set_fails() {
        let gateway = FakeGateway { accept: false, ..FakeGateway::with_url("") };
        let (result, _) = run(&gateway, &config(), WebhookAction::Set(None)).await;
        assert_eq!(result.unwrap_err().to_string(), "Failed to set webhook");
    }

    #[tokio::test]
    async fn test_delete_confirms() {
        let gateway = FakeGateway::with_url("https://old.example.com/webhook");
        let (result, out) = run(&gateway, &config(), WebhookAction::Delete).await;

        assert!(result.is_ok());
        assert!(out.contains("Webhook deleted successfully"));
        assert!(out.contains("Confirmed: No webhook URL is set"));
    }

    #[tokio::test]
    async fn test_info_when_unset() {
        let gateway = FakeGateway::with_url("");
        let (result, out) = run(&gateway, &config(), WebhookAction::Info).await;

        assert!(result.is_ok());
        assert!(out.contains("URL: Not set"));
    }

    #[tokio::test]
    async fn test_missing_token_fails_before_calls() {
        let gateway = FakeGateway::with_url("");
        let config = BotConfig { token: BotToken::default(), ..config() };
        let (result, _) = run(&gateway, &config, WebhookAction::Set(None)).await;

        assert!(result.is_err());
        assert_eq!(*gateway.set_calls.lock().unwrap(), 0);
    }
}
