//! Error taxonomy for the knowledge-base service.
//!
//! | Variant | Raised by | Retried |
//! |---------|-----------|---------|
//! | [`KbError::Config`] | dispatcher construction, provider setup | no |
//! | [`KbError::InvalidMode`] | mode parsing, before any I/O | no |
//! | [`KbError::Runtime`] | [`crate::bridge::block_on`] misuse | no |
//! | [`KbError::Backend`] | HTTP and graph-client failures | yes |
//! | [`KbError::Llm`] | completion model failures | yes |
//! | [`KbError::Io`] | diagram and markdown file access | yes |
//!
//! Async entry points return `Result<_, KbError>`. Blocking entry points
//! fold errors into the `status = error` envelopes from `kb_service_core`.

use kb_service_core::{InsertResponse, QueryResponse, UnknownMode};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, KbError>;

#[derive(Debug, Error)]
pub enum KbError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    InvalidMode(#[from] UnknownMode),

    #[error("{backend} backend error: {message}")]
    Backend {
        backend: &'static str,
        message: String,
    },

    #[error("runtime error: {0}")]
    Runtime(String),

    #[error("llm error: {0}")]
    Llm(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl KbError {
    pub fn backend(backend: &'static str, message: impl std::fmt::Display) -> Self {
        KbError::Backend {
            backend,
            message: message.to_string(),
        }
    }

    /// Whether another attempt could plausibly succeed.
    ///
    /// Configuration, mode and runtime-bridge errors are deterministic and
    /// fail fast.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            KbError::Config(_) | KbError::InvalidMode(_) | KbError::Runtime(_)
        )
    }
}

/// Fold a query result into the blocking [`QueryResponse`] envelope.
pub fn query_envelope(result: Result<String>) -> QueryResponse {
    match result {
        Ok(text) => QueryResponse::success(text),
        Err(e) => QueryResponse::error(e.to_string()),
    }
}

/// Fold a save result into the blocking [`InsertResponse`] envelope.
pub fn insert_envelope(result: Result<InsertResponse>) -> InsertResponse {
    result.unwrap_or_else(|e| InsertResponse::error(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use kb_service_core::RetrievalMode;

    #[test]
    fn test_retry_classification() {
        assert!(KbError::backend("light_rag", "connection refused").is_retryable());
        assert!(KbError::Llm("timeout".into()).is_retryable());
        assert!(!KbError::Config("missing key".into()).is_retryable());
        assert!(!KbError::Runtime("nested".into()).is_retryable());

        let mode_err = "semantic".parse::<RetrievalMode>().unwrap_err();
        assert!(!KbError::from(mode_err).is_retryable());
    }

    #[test]
    fn test_backend_message_names_backend() {
        let err = KbError::backend("graphiti", "search failed");
        assert_eq!(err.to_string(), "graphiti backend error: search failed");
    }

    #[test]
    fn test_envelopes() {
        let ok = query_envelope(Ok("answer".to_string()));
        assert!(ok.is_success());
        assert_eq!(ok.response, "answer");

        let err = query_envelope(Err(KbError::backend("light_rag", "503")));
        assert!(!err.is_success());
        assert_eq!(
            err.error_message.as_deref(),
            Some("light_rag backend error: 503")
        );

        let saved = insert_envelope(Err(KbError::Config("bad".into())));
        assert_eq!(saved.status, "error");
        assert_eq!(saved.message.as_deref(), Some("configuration error: bad"));
    }
}
