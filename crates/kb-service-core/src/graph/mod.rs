//! Graph client contract for the temporal graph database.
//!
//! The [`GraphClient`] trait captures the three operations the graph
//! backend needs from the database side: preparing indices, running a
//! configured hybrid search, and ingesting an episode. Extraction of typed
//! entities from episode text happens behind this trait, in the graph
//! service.
//!
//! Implementations must be `Send + Sync` so a single client can be shared
//! across tasks once initialized.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entities::EntityType;
use crate::search_config::SearchConfig;

/// An entity node returned by graph search.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityNode {
    #[serde(default)]
    pub uuid: Option<String>,
    pub name: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub labels: Vec<String>,
    /// Free-form typed attributes extracted for this entity.
    #[serde(default)]
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

/// A relationship edge returned by graph search.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityEdge {
    #[serde(default)]
    pub uuid: Option<String>,
    pub name: String,
    /// Natural-language statement of the relationship.
    pub fact: String,
}

/// A community (cluster summary) node returned by graph search.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommunityNode {
    #[serde(default)]
    pub uuid: Option<String>,
    pub name: String,
    #[serde(default)]
    pub summary: Option<String>,
}

/// Results of one graph search, one collection per scope.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResults {
    #[serde(default)]
    pub nodes: Vec<EntityNode>,
    #[serde(default)]
    pub edges: Vec<EntityEdge>,
    #[serde(default)]
    pub communities: Vec<CommunityNode>,
}

impl SearchResults {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty() && self.communities.is_empty()
    }
}

/// How the episode body should be interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EpisodeType {
    Text,
    Message,
    Json,
}

/// A unit of unstructured text ingested into the graph.
#[derive(Debug, Clone, Serialize)]
pub struct Episode {
    pub name: String,
    pub episode_body: String,
    pub source: EpisodeType,
    pub source_description: String,
    pub reference_time: DateTime<Utc>,
    /// Entity types the extraction pipeline may populate from this episode.
    pub entity_types: Vec<EntityType>,
}

/// Summary of what an `add_episode` call produced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddEpisodeOutcome {
    pub episode_uuid: String,
    #[serde(default)]
    pub node_count: usize,
    #[serde(default)]
    pub edge_count: usize,
}

/// Operations the graph backend requires from the graph database.
#[async_trait]
pub trait GraphClient: Send + Sync {
    /// Create any indices and constraints the search and ingestion paths need.
    ///
    /// Must be idempotent; the backend calls it once per client lifetime.
    async fn build_indices_and_constraints(&self) -> Result<()>;

    /// Run one configured hybrid search.
    async fn search(&self, query: &str, config: &SearchConfig) -> Result<SearchResults>;

    /// Ingest an episode and return what was extracted from it.
    async fn add_episode(&self, episode: &Episode) -> Result<AddEpisodeOutcome>;
}
