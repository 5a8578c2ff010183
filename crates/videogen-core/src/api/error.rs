use reqwest::StatusCode;
use thiserror::Error;

use crate::models::ApiResponse;

#[derive(Error, Debug)]
pub enum ApiError {
    /// 401. Carries the server's message verbatim.
    #[error("{0}")]
    Unauthorized(String),

    /// 400/409/422: validation or business rule failure. Carries the server's message verbatim.
    #[error("{0}")]
    Rejected(String),

    /// A 2xx response whose envelope reports `success: false`
    #[error("{0}")]
    Declined(String),

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Rate limited - please wait before retrying")]
    RateLimited,

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Configuration error: {0}")]
    Config(String),

    /// A newer sign-in, sign-out or invalidation finished first
    #[error("Superseded by a newer session change")]
    Superseded,
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        }
    }

    /// Message to show for a failed response: the envelope's message when the
    /// body is an envelope, else the (truncated) raw body, else the status reason.
    fn message_from_body(status: StatusCode, body: &str) -> String {
        let reason = status.canonical_reason().unwrap_or("Request failed");
        match serde_json::from_str::<ApiResponse<serde_json::Value>>(body) {
            Ok(envelope) => envelope.failure_message(reason),
            Err(_) if body.trim().is_empty() => reason.to_string(),
            Err(_) => Self::truncate_body(body),
        }
    }

    pub fn from_status(status: StatusCode, body: &str) -> Self {
        let message = Self::message_from_body(status, body);
        match status.as_u16() {
            401 => ApiError::Unauthorized(message),
            403 => ApiError::AccessDenied(message),
            404 => ApiError::NotFound(message),
            429 => ApiError::RateLimited,
            400 | 409 | 422 => ApiError::Rejected(message),
            500..=599 => ApiError::ServerError(message),
            _ => ApiError::InvalidResponse(format!("Status {}: {}", status, message)),
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized(_))
    }

    /// Failures that say nothing about the validity of the session
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ApiError::NetworkError(_) | ApiError::ServerError(_) | ApiError::RateLimited
        )
    }
}
