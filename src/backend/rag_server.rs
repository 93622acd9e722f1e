//! RAG-server backend.
//!
//! Talks to a LightRAG-compatible HTTP server:
//!
//! | Operation | Request | Result |
//! |-----------|---------|--------|
//! | query | `POST {url}/query` with a [`QueryRequest`] body | the `response` field, `""` if absent |
//! | insert | `POST {url}/documents/text` with `{ "text": ... }` | `status` / `message` passed through |
//! | save_async | same as insert | `id`, else `status`, else `"success"` |
//!
//! When an API key is configured every request carries
//! `Authorization: Bearer <key>`. Transport failures and HTTP status codes
//! of 400 and above become [`KbError::Backend`].

use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error};

use kb_service_core::{
    Domain, InsertResponse, InsertTextRequest, QueryOptions, QueryRequest, RequestDefaults,
    RetrievalMode,
};

use super::preview;
use crate::config::RagServerConfig;
use crate::error::{KbError, Result};

pub const NAME: &str = "light_rag";

pub struct RagServerBackend {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    default_mode: RetrievalMode,
    defaults: RequestDefaults,
}

impl RagServerBackend {
    pub fn new(config: &RagServerConfig) -> Result<Self> {
        let default_mode = config.default_mode.parse::<RetrievalMode>()?;

        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder
            .build()
            .map_err(|e| KbError::Config(format!("failed to build HTTP client: {e}")))?;

        debug!(url = %config.url, "initialized RAG server backend");

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            default_mode,
            defaults: config.request_defaults(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Mode is validated before any request is built.
    fn resolve_mode(&self, mode: Option<&str>) -> Result<RetrievalMode> {
        match mode {
            Some(m) => Ok(m.parse()?),
            None => Ok(self.default_mode),
        }
    }

    pub async fn query_async(
        &self,
        text: &str,
        mode: Option<&str>,
        options: &QueryOptions,
    ) -> Result<String> {
        let mode = self.resolve_mode(mode)?;
        let request = QueryRequest::from_options(text, mode, options, &self.defaults);
        debug!(?request, "querying RAG server");

        let data = self.post_json("/query", &request).await.map_err(|e| {
            error!(error = %e, "error querying RAG server");
            e
        })?;

        Ok(data
            .get("response")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string())
    }

    pub async fn insert(
        &self,
        text: &str,
        _name: Option<&str>,
        domain: Domain,
    ) -> Result<InsertResponse> {
        let data = self.insert_text(text, domain).await?;
        debug!(response = %data, "RAG server insert response");

        Ok(InsertResponse::reported(
            field_text(&data, "status").unwrap_or_else(|| "error".to_string()),
            field_text(&data, "message").unwrap_or_default(),
        ))
    }

    /// Insert text and return the server's document id, or its status when
    /// no id is reported.
    pub async fn save_async(
        &self,
        text: &str,
        _name: Option<&str>,
        domain: Domain,
    ) -> Result<String> {
        let data = self.insert_text(text, domain).await?;
        debug!(response = %data, "RAG server insert response");

        Ok(field_text(&data, "id")
            .or_else(|| field_text(&data, "status"))
            .unwrap_or_else(|| "success".to_string()))
    }

    // The server has no notion of episode names or domains; only the text is sent.
    async fn insert_text(&self, text: &str, domain: Domain) -> Result<Value> {
        debug!(%domain, preview = %preview(text), "saving text to RAG server");

        self.post_json(
            "/documents/text",
            &InsertTextRequest {
                text: text.to_string(),
            },
        )
        .await
        .map_err(|e| {
            error!(error = %e, "error saving to RAG server");
            e
        })
    }

    async fn post_json(&self, path: &str, body: &impl Serialize) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);

        let mut request = self.client.post(&url).json(body);
        if !self.api_key.is_empty() {
            request = request.bearer_auth(&self.api_key);
        }

        let response = request
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| KbError::backend(NAME, format!("POST {path} failed: {e}")))?;

        response
            .json::<Value>()
            .await
            .map_err(|e| KbError::backend(NAME, format!("invalid response from {path}: {e}")))
    }
}

/// A top-level JSON field as text; non-string values render as JSON.
fn field_text(data: &Value, key: &str) -> Option<String> {
    match data.get(key)? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn backend(mode: &str) -> RagServerBackend {
        RagServerBackend::new(&RagServerConfig {
            url: "http://localhost:9621/".to_string(),
            default_mode: mode.to_string(),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_new_rejects_bad_default_mode() {
        let err = RagServerBackend::new(&RagServerConfig {
            default_mode: "semantic".to_string(),
            ..Default::default()
        })
        .err()
        .unwrap();
        assert!(matches!(err, KbError::InvalidMode(_)));
    }

    #[test]
    fn test_resolve_mode() {
        let b = backend("hybrid");
        assert_eq!(b.base_url(), "http://localhost:9621");
        assert_eq!(b.resolve_mode(None).unwrap(), RetrievalMode::Hybrid);
        assert_eq!(b.resolve_mode(Some("mix")).unwrap(), RetrievalMode::Mix);
        assert!(matches!(
            b.resolve_mode(Some("deep")),
            Err(KbError::InvalidMode(_))
        ));
    }

    #[test]
    fn test_field_text() {
        let data = json!({"id": 42, "status": "success", "message": null});
        assert_eq!(field_text(&data, "id").as_deref(), Some("42"));
        assert_eq!(field_text(&data, "status").as_deref(), Some("success"));
        assert_eq!(field_text(&data, "message"), None);
        assert_eq!(field_text(&data, "missing"), None);
    }
}
