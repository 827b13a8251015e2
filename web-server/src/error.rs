// web-server/src/error.rs
use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use common::auth::VerifyReason;
use serde_json::json;
use thiserror::Error;

use crate::message_log::MessageLogError;

/// Every failure a handler can surface. Converted at the HTTP boundary into
/// the `{success: false, message}` envelope.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Configuration(String),

    #[error("{0}")]
    Validation(String),

    #[error("Please authenticate with Telegram first")]
    Unauthenticated,

    #[error("{}", .0.message())]
    Auth(VerifyReason),

    #[error("Invalid webhook secret token")]
    WebhookSecret,

    #[error("{0}")]
    Upstream(String),

    // Detail is logged, never returned
    #[error("Internal server error")]
    Internal(String),
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Unauthenticated => StatusCode::FORBIDDEN,
            ApiError::Auth(_) | ApiError::WebhookSecret => StatusCode::UNAUTHORIZED,
            ApiError::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            ApiError::Internal(detail) => tracing::error!("Internal error: {}", detail),
            ApiError::Configuration(detail) => tracing::error!("Configuration error: {}", detail),
            _ => {},
        }

        let mut body = json!({
            "success": false,
            "message": self.to_string(),
        });
        if let ApiError::Auth(reason) = self {
            body["reason"] = json!(reason);
        }

        HttpResponse::build(self.status_code()).json(body)
    }
}

impl From<actix::MailboxError> for ApiError {
    fn from(err: actix::MailboxError) -> Self {
        ApiError::Internal(format!("session registry unavailable: {}", err))
    }
}

impl From<actix_web::error::BlockingError> for ApiError {
    fn from(err: actix_web::error::BlockingError) -> Self {
        ApiError::Internal(format!("blocking task failed: {}", err))
    }
}

impl From<MessageLogError> for ApiError {
    fn from(err: MessageLogError) -> Self {
        ApiError::Internal(format!("message log: {}", err))
    }
}
