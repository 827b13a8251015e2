// common/src/models/message.rs
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who produced a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    /// The website visitor
    Client,
    /// Canned replies generated by this server
    Server,
    /// The operator, via the bot webhook
    Remote,
}

impl Sender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sender::Client => "client",
            Sender::Server => "server",
            Sender::Remote => "remote",
        }
    }
}

impl fmt::Display for Sender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Sender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "client" => Ok(Sender::Client),
            "server" => Ok(Sender::Server),
            "remote" => Ok(Sender::Remote),
            other => Err(format!("unknown sender: {}", other)),
        }
    }
}

/// Immutable entry of the message log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: i64,
    pub sender: Sender,
    pub content: String,
    pub created_at: DateTime<Utc>,
}
