// common/src/config.rs
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::path::PathBuf;
use config::{Config as ConfigFile, File, Environment};

pub const DEFAULT_API_BASE: &str = "https://api.telegram.org";

// Conventional variable names, read beneath the config files and APP_* overrides
const PLAIN_ENV_KEYS: [(&str, &str); 13] = [
    ("web_server_addr", "WEB_SERVER_ADDR"),
    ("bot.token", "TELEGRAM_BOT_TOKEN"),
    ("bot.default_chat_id", "TELEGRAM_CHAT_ID"),
    ("bot.webhook_url", "TELEGRAM_WEBHOOK_URL"),
    ("bot.bot_name", "TELEGRAM_BOT_NAME"),
    ("bot.api_base", "TELEGRAM_API_BASE"),
    ("bot.webhook_secret", "TELEGRAM_WEBHOOK_SECRET"),
    ("bot.echo_replies", "TELEGRAM_ECHO_REPLIES"),
    ("database.path", "DATABASE_PATH"),
    ("session.ttl_seconds", "SESSION_TTL_SECONDS"),
    ("session.secure_cookie", "SESSION_SECURE_COOKIE"),
    ("static_files.path", "STATIC_FILES_PATH"),
    ("static_files.index", "STATIC_FILES_INDEX"),
];

/// Central configuration for the chat server and the webhook tool
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub web_server_addr: String,
    pub bot: BotConfig,
    pub database: DatabaseConfig,
    pub session: SessionConfig,

    // Static file serving configuration
    pub static_files: StaticFilesConfig,
}

/// Bot API token. Doubles as the verification secret, so it never prints.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BotToken(String);

impl BotToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for BotToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BotToken([redacted])")
    }
}

impl fmt::Display for BotToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[redacted]")
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    pub token: BotToken,
    /// Operator chat that receives visitor messages
    pub default_chat_id: Option<String>,
    pub webhook_url: Option<String>,
    /// Login widget bot name shown on the chat page
    pub bot_name: String,
    pub api_base: String,
    /// Shared secret Telegram echoes back in X-Telegram-Bot-Api-Secret-Token
    pub webhook_secret: Option<String>,
    pub echo_replies: bool,
    pub request_timeout_secs: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub ttl_seconds: i64,
    pub cleanup_interval_seconds: u64,
    pub secure_cookie: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct StaticFilesConfig {
    pub path: String,
    pub index: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            web_server_addr: "127.0.0.1:8081".to_string(),
            bot: BotConfig::default(),
            database: DatabaseConfig::default(),
            session: SessionConfig::default(),
            static_files: StaticFilesConfig::default(),
        }
    }
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            token: BotToken::default(),
            default_chat_id: None,
            webhook_url: None,
            bot_name: String::new(),
            api_base: DEFAULT_API_BASE.to_string(),
            webhook_secret: None,
            echo_replies: false,
            request_timeout_secs: 10,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "./livechat.db".to_string(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: 86400,
            cleanup_interval_seconds: 3600,
            secure_cookie: true,
        }
    }
}

impl Default for StaticFilesConfig {
    fn default() -> Self {
        Self {
            path: "./static".to_string(),
            index: "index.html".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from file and environment
    pub fn load() -> Result<Self, config::ConfigError> {
        // Get the run mode, defaulting to "development"
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        // Locate the config directory
        let config_dir = env::var("CONFIG_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                // Check if we're in the project root or a subcrate
                let mut path = PathBuf::from("./config");
                if !path.exists() {
                    path = PathBuf::from("../config");
                }
                path
            });

        tracing::info!("Loading configuration from {}", config_dir.display());
        tracing::info!("Using run mode: {}", run_mode);

        let mut builder = ConfigFile::builder();
        for (key, var) in PLAIN_ENV_KEYS {
            if let Some(value) = non_empty_var(var) {
                builder = builder.set_default(key, value)?;
            }
        }

        builder
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            .add_source(File::from(config_dir.join(format!("{}.toml", run_mode))).required(false))
            .add_source(File::from(config_dir.join("local.toml")).required(false))
            // APP_BOT__TOKEN, APP_DATABASE__PATH, ...
            .add_source(
                Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()
    }

    /// Load from files, falling back to plain environment variables
    pub fn from_env() -> Self {
        match Self::load() {
            Ok(config) => {
                tracing::info!("Configuration loaded from files and environment");
                config
            },
            Err(e) => {
                tracing::warn!("Failed to load configuration from files: {}", e);
                tracing::info!("Falling back to environment variables only");
                Self::from_plain_env()
            }
        }
    }

    fn from_plain_env() -> Self {
        let defaults = Self::default();

        let web_server_addr = env::var("WEB_SERVER_ADDR")
            .unwrap_or(defaults.web_server_addr);

        let bot = BotConfig {
            token: BotToken::new(env::var("TELEGRAM_BOT_TOKEN").unwrap_or_default()),
            default_chat_id: non_empty_var("TELEGRAM_CHAT_ID"),
            webhook_url: non_empty_var("TELEGRAM_WEBHOOK_URL"),
            bot_name: env::var("TELEGRAM_BOT_NAME").unwrap_or_default(),
            api_base: env::var("TELEGRAM_API_BASE")
                .unwrap_or_else(|_| DEFAULT_API_BASE.to_string()),
            webhook_secret: non_empty_var("TELEGRAM_WEBHOOK_SECRET"),
            echo_replies: env::var("TELEGRAM_ECHO_REPLIES")
                .map(|v| v.to_lowercase() == "true")
                .unwrap_or(false),
            request_timeout_secs: defaults.bot.request_timeout_secs,
        };

        let database = DatabaseConfig {
            path: env::var("DATABASE_PATH").unwrap_or(defaults.database.path),
        };

        let session = SessionConfig {
            ttl_seconds: env::var("SESSION_TTL_SECONDS")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(defaults.session.ttl_seconds),
            cleanup_interval_seconds: defaults.session.cleanup_interval_seconds,
            secure_cookie: env::var("SESSION_SECURE_COOKIE")
                .map(|v| v.to_lowercase() != "false")
                .unwrap_or(true),
        };

        let static_files = StaticFilesConfig {
            path: env::var("STATIC_FILES_PATH").unwrap_or(defaults.static_files.path),
            index: env::var("STATIC_FILES_INDEX").unwrap_or(defaults.static_files.index),
        };

        Self {
            web_server_addr,
            bot,
            database,
            session,
            static_files,
        }
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}
