//! Error types for newsrelay.

use thiserror::Error;

use crate::slack::SlackError;

/// Common error type for newsrelay.
#[derive(Error, Debug)]
pub enum RelayError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    ///
    /// Raised at startup when the configuration is incomplete or malformed.
    #[error("configuration error: {0}")]
    Config(String),

    /// Feed fetch or parse error.
    #[error("feed error: {0}")]
    Feed(String),

    /// Messaging platform error.
    #[error("slack error: {0}")]
    Slack(#[from] SlackError),

    /// Persisted state could not be written.
    #[error("storage error: {0}")]
    Storage(String),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for newsrelay operations.
pub type Result<T> = std::result::Result<T, RelayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let err = RelayError::Config("slack.bot_token is not set".to_string());
        assert_eq!(
            err.to_string(),
            "configuration error: slack.bot_token is not set"
        );
    }

    #[test]
    fn test_feed_error_display() {
        let err = RelayError::Feed("feed payload is empty".to_string());
        assert_eq!(err.to_string(), "feed error: feed payload is empty");
    }

    #[test]
    fn test_slack_error_conversion() {
        let err: RelayError = SlackError::Api("channel_not_found".to_string()).into();
        assert!(matches!(err, RelayError::Slack(_)));
        assert!(err.to_string().contains("channel_not_found"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: RelayError = io_err.into();
        assert!(matches!(err, RelayError::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }
}
