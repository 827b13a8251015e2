// web-server/src/lib.rs
//! Chat widget server: login verification, session tracking, the message
//! log and the Bot API relay behind one actix-web app.

pub mod api;
pub mod error;
pub mod message_log;
pub mod session_registry;
pub mod static_files;
pub mod utils;

pub use error::ApiError;
pub use message_log::MessageLog;
pub use session_registry::SessionRegistryActor;
