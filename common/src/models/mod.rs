pub mod message;
pub mod session;

pub use message::{ChatMessage, Sender};
pub use session::{ChatSession, SessionResult, VisitorIdentity, VisitorResponse};
