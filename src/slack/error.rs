//! Messaging platform errors.

use thiserror::Error;

/// Error returned by messaging platform calls.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SlackError {
    /// The request did not complete (connect, timeout, body read).
    #[error("request failed: {0}")]
    Transport(String),

    /// Non-success HTTP status.
    #[error("HTTP error: {0}")]
    Http(u16),

    /// The platform asked us to slow down.
    #[error("rate limited, retry after {retry_after_secs}s")]
    RateLimited {
        /// Seconds to wait before the next request.
        retry_after_secs: u64,
    },

    /// The message does not exist (anymore).
    #[error("message not found")]
    MessageNotFound,

    /// The bot is not allowed to perform the call.
    #[error("not permitted: {0}")]
    Forbidden(String),

    /// Any other API error code.
    #[error("API error: {0}")]
    Api(String),

    /// The response body was not what the API documents.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl SlackError {
    /// Map an API error code (`{"ok": false, "error": code}`).
    pub fn from_code(code: &str) -> Self {
        match code {
            "message_not_found" => SlackError::MessageNotFound,
            "cant_delete_message" | "not_in_channel" | "missing_scope" | "not_authed"
            | "invalid_auth" | "account_inactive" | "token_revoked" => {
                SlackError::Forbidden(code.to_string())
            }
            "ratelimited" => SlackError::RateLimited { retry_after_secs: 1 },
            _ => SlackError::Api(code.to_string()),
        }
    }
}
