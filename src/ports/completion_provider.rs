//! Completion Provider Port - the opaque text-in/text-out model call.
//!
//! The dialogue engine parses the returned text itself. Implementations do not
//! retry; the session applies a timeout and treats any error as a failed turn
//! that retries in place.

use async_trait::async_trait;

/// Errors from the completion call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompletionError {
    #[error("rate limited: retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u32 },

    #[error("provider unavailable: {0}")]
    Unavailable(String),

    #[error("authentication failed")]
    AuthenticationFailed,

    #[error("network error: {0}")]
    Network(String),

    #[error("invalid provider response: {0}")]
    InvalidResponse(String),

    #[error("completion timed out after {0}s")]
    Timeout(u64),
}

/// Port for the language-completion call.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completion_error_messages() {
        assert_eq!(
            CompletionError::RateLimited { retry_after_secs: 30 }.to_string(),
            "rate limited: retry after 30s"
        );
        assert_eq!(
            CompletionError::Timeout(20).to_string(),
            "completion timed out after 20s"
        );
    }
}
