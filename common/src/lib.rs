pub mod auth;
pub mod config;
pub mod gateway;
pub mod models;
pub mod utils;

pub use config::*;
pub use gateway::{BotGateway, GatewayError, TelegramGateway, WebhookInfo};
pub use utils::*;
