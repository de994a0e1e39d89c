//! Failures of the model collaborator
//!
//! The response generator never surfaces these to the user; it logs the
//! [`LlmError::kind`] and answers with the fixed fallback reply.

use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LlmError {
    /// Provider answered 429; no further attempts within this turn
    #[error("model provider rate limited the turn, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },

    #[error("model provider returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("model provider unreachable: {0}")]
    Network(#[from] reqwest::Error),

    #[error("no model reply within {0:?}")]
    Timeout(Duration),

    /// The reply arrived but could not be read as a completion
    #[error("unreadable model reply: {0}")]
    Malformed(String),

    /// Client could not be built from the `llm` config section
    #[error("model client misconfigured: {0}")]
    Config(String),
}

impl LlmError {
    /// Short label for the `llm_error` log line
    pub fn kind(&self) -> &'static str {
        match self {
            LlmError::RateLimited { .. } => "rate_limited",
            LlmError::Api { .. } => "api",
            LlmError::Network(_) => "network",
            LlmError::Timeout(_) => "timeout",
            LlmError::Malformed(_) => "malformed",
            LlmError::Config(_) => "config",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_labels() {
        let rate_limited = LlmError::RateLimited {
            retry_after: Duration::from_secs(60),
        };
        assert_eq!(rate_limited.kind(), "rate_limited");
        assert_eq!(
            LlmError::Api {
                status: 529,
                message: "overloaded".to_string()
            }
            .kind(),
            "api"
        );
        assert_eq!(LlmError::Timeout(Duration::from_secs(30)).kind(), "timeout");
        assert_eq!(LlmError::Malformed("empty body".to_string()).kind(), "malformed");
        assert_eq!(LlmError::Config("ANTHROPIC_API_KEY not set".to_string()).kind(), "config");
    }

    #[test]
    fn test_messages_carry_detail() {
        let err = LlmError::Api {
            status: 400,
            message: "max_tokens too large".to_string(),
        };
        assert_eq!(err.to_string(), "model provider returned 400: max_tokens too large");
        assert!(LlmError::Timeout(Duration::from_secs(30)).to_string().contains("30s"));
    }
}
