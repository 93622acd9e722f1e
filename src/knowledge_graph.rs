//! The dispatcher: one backend, a retry policy, and the features diagram.
//!
//! [`KnowledgeGraph`] selects its [`Backend`] once at construction and
//! forwards every operation to it. Query and save operations run under the
//! configured [`RetryPolicy`]; `save_async` makes a single attempt unless
//! `retry.retry_async_save` is set.
//!
//! | Operation | Form | Retried |
//! |-----------|------|---------|
//! | [`query`](KnowledgeGraph::query) | blocking, returns [`QueryResponse`] | yes |
//! | [`query_async`](KnowledgeGraph::query_async) | async, returns `Result<String>` | yes |
//! | [`query_response`](KnowledgeGraph::query_response) | async, returns [`QueryResponse`] | yes |
//! | [`save`](KnowledgeGraph::save) | blocking, returns [`InsertResponse`] | yes |
//! | [`save_response`](KnowledgeGraph::save_response) | async, returns [`InsertResponse`] | yes |
//! | [`save_async`](KnowledgeGraph::save_async) | async, returns `Result<String>` | only if configured |
//! | [`update_features_list`](KnowledgeGraph::update_features_list) | async | no |

use std::sync::Arc;

use tracing::{debug, error, info};

use kb_service_core::{Domain, FeatureUpdateResponse, InsertResponse, QueryOptions, QueryResponse};

use crate::backend::{preview, Backend};
use crate::bridge;
use crate::config::{Config, RetryConfig};
use crate::error::{insert_envelope, query_envelope, Result};
use crate::features::FeaturesDiagram;
use crate::llm::{CompletionModel, OpenAiChat};
use crate::retry::RetryPolicy;

pub struct KnowledgeGraph {
    backend: Backend,
    retry: RetryPolicy,
    retry_async_save: bool,
    features: FeaturesDiagram,
    llm: Arc<dyn CompletionModel>,
}

impl KnowledgeGraph {
    /// Build the dispatcher for `config.backend`.
    ///
    /// Fails with a configuration error for an unknown backend name, leaving
    /// nothing half-built.
    pub fn new(config: &Config) -> Result<Self> {
        let backend = Backend::from_config(config)?;
        let llm = Arc::new(OpenAiChat::new(
            &config.features,
            config.api_keys.openai.clone(),
        )?);

        Ok(Self::with_parts(
            backend,
            &config.retry,
            FeaturesDiagram::new(&config.features.path),
            llm,
        ))
    }

    pub fn with_parts(
        backend: Backend,
        retry: &RetryConfig,
        features: FeaturesDiagram,
        llm: Arc<dyn CompletionModel>,
    ) -> Self {
        info!(backend = backend.name(), "initialized knowledge graph");
        Self {
            backend,
            retry: RetryPolicy::from(retry),
            retry_async_save: retry.retry_async_save,
            features,
            llm,
        }
    }

    pub fn backend(&self) -> &Backend {
        &self.backend
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    // ============ Query ============

    pub async fn query_async(
        &self,
        text: &str,
        mode: Option<&str>,
        options: &QueryOptions,
    ) -> Result<String> {
        debug!(query = %preview(text), ?mode, "querying knowledge graph");
        let backend = &self.backend;
        self.retry
            .run("query", move || backend.query_async(text, mode, options))
            .await
    }

    pub async fn query_response(
        &self,
        text: &str,
        mode: Option<&str>,
        options: &QueryOptions,
    ) -> QueryResponse {
        let result = self.query_async(text, mode, options).await;
        if let Err(e) = &result {
            error!(backend = self.backend_name(), error = %e, "query failed");
        }
        query_envelope(result)
    }

    pub fn query(&self, text: &str, mode: Option<&str>, options: &QueryOptions) -> QueryResponse {
        match bridge::block_on(self.query_response(text, mode, options)) {
            Ok(response) => response,
            Err(e) => QueryResponse::error(e.to_string()),
        }
    }

    // ============ Save ============

    pub async fn save_response(
        &self,
        text: &str,
        name: Option<&str>,
        domain: Domain,
    ) -> InsertResponse {
        debug!(%domain, text = %preview(text), "saving to knowledge graph");
        let backend = &self.backend;
        let result = self
            .retry
            .run("save", move || backend.insert(text, name, domain))
            .await;
        if let Err(e) = &result {
            error!(backend = self.backend_name(), error = %e, "save failed");
        }
        insert_envelope(result)
    }

    pub fn save(&self, text: &str, name: Option<&str>, domain: Domain) -> InsertResponse {
        match bridge::block_on(self.save_response(text, name, domain)) {
            Ok(response) => response,
            Err(e) => InsertResponse::error(e.to_string()),
        }
    }

    /// Save and return the backend's identifier for the stored text.
    pub async fn save_async(
        &self,
        text: &str,
        name: Option<&str>,
        domain: Domain,
    ) -> Result<String> {
        debug!(%domain, text = %preview(text), "async saving to knowledge graph");
        let policy = if self.retry_async_save {
            self.retry
        } else {
            RetryPolicy::once()
        };
        let backend = &self.backend;
        policy
            .run("save_async", move || backend.save_async(text, name, domain))
            .await
    }

    // ============ Features diagram ============

    pub fn get_features_list(&self) -> String {
        self.features.read()
    }

    pub async fn update_features_list(
        &self,
        feature_name: &str,
        feature_description: &str,
        parent_node: Option<&str>,
    ) -> FeatureUpdateResponse {
        self.features
            .update(
                self.llm.as_ref(),
                feature_name,
                feature_description,
                parent_node,
            )
            .await
    }
}
