//! Knowledge-graph backends.
//!
//! [`Backend`] is a closed set of storage engines selected once, when the
//! dispatcher is built:
//!
//! | Variant | Name | Module |
//! |---------|------|--------|
//! | [`Backend::RagServer`] | `light_rag` | [`rag_server`] |
//! | [`Backend::Graph`] | `graphiti` | [`graph`] |
//!
//! Every variant exposes the same operations. The async forms return
//! `Result<_, KbError>`; the blocking forms run on the shared runtime from
//! [`crate::bridge`] and never fail, folding errors into `status = error`
//! envelopes instead.

pub mod graph;
pub mod graph_http;
pub mod providers;
pub mod rag_server;

use tracing::error;

use kb_service_core::{Domain, InsertResponse, QueryOptions, QueryResponse};

use crate::bridge;
use crate::config::Config;
use crate::error::{insert_envelope, query_envelope, KbError, Result};

pub use graph::{GraphBackend, GraphConnector};
pub use rag_server::RagServerBackend;

pub enum Backend {
    RagServer(RagServerBackend),
    Graph(GraphBackend),
}

impl Backend {
    /// Build the backend named by `config.backend` (case-insensitive).
    pub fn from_config(config: &Config) -> Result<Self> {
        match config.backend.trim().to_lowercase().as_str() {
            rag_server::NAME => Ok(Backend::RagServer(RagServerBackend::new(
                &config.rag_server,
            )?)),
            graph::NAME => Ok(Backend::Graph(GraphBackend::new(
                &config.graph,
                &config.api_keys,
            )?)),
            _ => Err(KbError::Config(format!(
                "unsupported knowledge graph backend: '{}' (expected {} or {})",
                config.backend,
                rag_server::NAME,
                graph::NAME
            ))),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Backend::RagServer(_) => rag_server::NAME,
            Backend::Graph(_) => graph::NAME,
        }
    }

    pub async fn query_async(
        &self,
        text: &str,
        mode: Option<&str>,
        options: &QueryOptions,
    ) -> Result<String> {
        match self {
            Backend::RagServer(b) => b.query_async(text, mode, options).await,
            Backend::Graph(b) => b.query_async(text, mode, options).await,
        }
    }

    pub async fn insert(
        &self,
        text: &str,
        name: Option<&str>,
        domain: Domain,
    ) -> Result<InsertResponse> {
        match self {
            Backend::RagServer(b) => b.insert(text, name, domain).await,
            Backend::Graph(b) => b.insert(text, name, domain).await,
        }
    }

    pub async fn save_async(
        &self,
        text: &str,
        name: Option<&str>,
        domain: Domain,
    ) -> Result<String> {
        match self {
            Backend::RagServer(b) => b.save_async(text, name, domain).await,
            Backend::Graph(b) => b.save_async(text, name, domain).await,
        }
    }

    /// Blocking query. Failures become an error [`QueryResponse`].
    pub fn query(
        &self,
        text: &str,
        mode: Option<&str>,
        options: &QueryOptions,
    ) -> QueryResponse {
        let result = bridge::block_on(self.query_async(text, mode, options)).and_then(|r| r);
        if let Err(e) = &result {
            error!(backend = self.name(), error = %e, "query failed");
        }
        query_envelope(result)
    }

    /// Blocking save. Failures become an error [`InsertResponse`].
    pub fn save(&self, text: &str, name: Option<&str>, domain: Domain) -> InsertResponse {
        let result = bridge::block_on(self.insert(text, name, domain)).and_then(|r| r);
        if let Err(e) = &result {
            error!(backend = self.name(), error = %e, "save failed");
        }
        insert_envelope(result)
    }
}

/// First 100 characters of `text`, for log lines.
pub(crate) fn preview(text: &str) -> &str {
    match text.char_indices().nth(100) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(backend: &str) -> Config {
        Config {
            backend: backend.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_select_backend_case_insensitive() {
        let b = Backend::from_config(&config("LIGHT_RAG")).unwrap();
        assert_eq!(b.name(), "light_rag");
        assert!(matches!(b, Backend::RagServer(_)));

        let b = Backend::from_config(&config("Graphiti")).unwrap();
        assert_eq!(b.name(), "graphiti");
        assert!(matches!(b, Backend::Graph(_)));
    }

    #[test]
    fn test_unknown_backend_is_config_error() {
        let err = Backend::from_config(&config("neo4j")).err().unwrap();
        assert!(matches!(err, KbError::Config(ref m) if m.contains("neo4j")));
    }

    #[test]
    fn test_preview_respects_char_boundaries() {
        let text = "é".repeat(150);
        assert_eq!(preview(&text).chars().count(), 100);
        assert_eq!(preview("short"), "short");
    }
}
