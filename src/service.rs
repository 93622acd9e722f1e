//! Knowledge-base service facade.
//!
//! Combines the [`KnowledgeGraph`] dispatcher with the [`MarkdownStore`]
//! behind a small API for agents and the HTTP server. All methods are
//! async and never panic; graph failures are reported in-band.

use serde::Deserialize;
use tracing::{error, info};

use kb_service_core::{Domain, FeatureUpdateResponse, QueryOptions};

use crate::backend::preview;
use crate::config::Config;
use crate::error::Result;
use crate::knowledge_graph::KnowledgeGraph;
use crate::markdown::{FeatureEntry, KnowledgeType, MarkdownStore};

/// A save request for [`KnowledgeBaseService::save_knowledge`].
#[derive(Debug, Clone, Deserialize)]
pub struct SaveKnowledge {
    pub text: String,
    /// Feature path used for the markdown directory and the graph entry name.
    #[serde(default = "default_feature")]
    pub feature: String,
    #[serde(default)]
    pub knowledge_type: KnowledgeType,
    /// Markdown file name (e.g. a ticket id) instead of the knowledge type.
    #[serde(default)]
    pub source_id: Option<String>,
    #[serde(default = "default_true")]
    pub save_to_markdown: bool,
    #[serde(default = "default_true")]
    pub save_to_graph: bool,
}

fn default_feature() -> String {
    "general".to_string()
}
fn default_true() -> bool {
    true
}

impl SaveKnowledge {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            feature: default_feature(),
            knowledge_type: KnowledgeType::default(),
            source_id: None,
            save_to_markdown: true,
            save_to_graph: true,
        }
    }
}

impl From<KnowledgeType> for Domain {
    fn from(kind: KnowledgeType) -> Self {
        match kind {
            KnowledgeType::Business => Domain::Business,
            KnowledgeType::Technical => Domain::Tech,
        }
    }
}

pub struct KnowledgeBaseService {
    graph: KnowledgeGraph,
    markdown: MarkdownStore,
}

impl KnowledgeBaseService {
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self::with_parts(
            KnowledgeGraph::new(config)?,
            MarkdownStore::new(&config.markdown.root),
        ))
    }

    pub fn with_parts(graph: KnowledgeGraph, markdown: MarkdownStore) -> Self {
        info!(backend = graph.backend_name(), "initialized knowledge base service");
        Self { graph, markdown }
    }

    pub fn graph(&self) -> &KnowledgeGraph {
        &self.graph
    }

    pub fn markdown(&self) -> &MarkdownStore {
        &self.markdown
    }

    /// Query with the backend's default mode. Errors come back as
    /// `"Error: <message>"` text.
    pub async fn query_knowledge(&self, text: &str) -> String {
        info!(query = %preview(text), "querying knowledge base");
        let response = self
            .graph
            .query_response(text, None, &QueryOptions::default())
            .await;

        if response.is_success() {
            response.response
        } else {
            let message = response.error_message.unwrap_or_default();
            error!(error = %message, "error querying knowledge base");
            format!("Error: {}", message)
        }
    }

    /// Save to the graph and, optionally, to markdown.
    ///
    /// Returns `false` only when the markdown write fails; a graph error is
    /// logged but does not fail the save.
    pub async fn save_knowledge(&self, request: &SaveKnowledge) -> bool {
        info!(
            feature = %request.feature,
            kind = %request.knowledge_type,
            text = %preview(&request.text),
            "saving knowledge"
        );

        if request.save_to_graph {
            let response = self
                .graph
                .save_response(
                    &request.text,
                    Some(&request.feature),
                    request.knowledge_type.into(),
                )
                .await;
            if !response.is_success() {
                error!(
                    status = %response.status,
                    message = response.message.as_deref().unwrap_or_default(),
                    "graph save did not succeed"
                );
            }
        }

        if request.save_to_markdown {
            if let Err(e) = self.markdown.save(
                &request.text,
                &request.feature,
                request.knowledge_type,
                request.source_id.as_deref(),
            ) {
                error!(error = %e, "error saving to markdown files");
                return false;
            }
        }

        true
    }

    pub fn get_features_list(&self) -> String {
        self.graph.get_features_list()
    }

    /// Update the diagram; on success also record the feature as knowledge
    /// so it becomes queryable.
    pub async fn update_features_list(
        &self,
        feature_name: &str,
        feature_description: &str,
        parent_node: Option<&str>,
    ) -> FeatureUpdateResponse {
        let response = self
            .graph
            .update_features_list(feature_name, feature_description, parent_node)
            .await;

        if !response.is_success() {
            error!(error = %response.message, "error updating features list");
            return response;
        }

        let summary = format!(
            "Feature Name: {}\nDescription: {}\nParent: {}",
            feature_name,
            feature_description,
            parent_node.unwrap_or("Root level")
        );
        let mut request = SaveKnowledge::new(summary);
        request.feature = feature_name.to_string();
        self.save_knowledge(&request).await;

        response
    }

    pub fn get_markdown_knowledge(
        &self,
        team: &str,
        feature: &str,
        kind: KnowledgeType,
    ) -> Result<String> {
        self.markdown.get(team, feature, kind)
    }

    pub fn list_markdown_features(&self, team: Option<&str>) -> Result<Vec<FeatureEntry>> {
        self.markdown.list_features(team)
    }

    pub fn delete_markdown_knowledge(
        &self,
        team: &str,
        feature: &str,
        kind: Option<KnowledgeType>,
    ) -> Result<bool> {
        self.markdown.delete(team, feature, kind)
    }
}
