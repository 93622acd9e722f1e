//! Graph-database backend.
//!
//! Queries run one configured hybrid search and flatten the nodes, edges and
//! communities it returns into text. Saves ingest the text as an episode
//! tagged with the scientific-paper entity catalogue.
//!
//! # Initialization
//!
//! The graph client is created lazily on first use: provider selection,
//! connection through a [`GraphConnector`], then index creation. The whole
//! sequence runs inside a [`OnceCell`], so concurrent first calls share one
//! initialization and a failed attempt leaves the cell empty for the next
//! call to retry from scratch.
//!
//! # Search modes
//!
//! | Mode | Recipe |
//! |------|--------|
//! | `deep` | combined hybrid search, RRF reranking |
//! | `broad` | combined hybrid search, MMR reranking |
//!
//! The mode is resolved before any I/O; an unknown mode never touches the
//! database.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Local, Utc};
use tokio::sync::OnceCell;
use tracing::{debug, error, info};

use kb_service_core::entities::scientific_paper_entity_types;
use kb_service_core::graph::{Episode, EpisodeType, GraphClient};
use kb_service_core::render::render_search_results;
use kb_service_core::{Domain, InsertResponse, QueryOptions, SearchConfig, SearchMode};

use super::graph_http::HttpGraphConnector;
use super::providers::ProviderSet;
use super::preview;
use crate::config::{ApiKeys, GraphConfig};
use crate::error::{KbError, Result};

pub const NAME: &str = "graphiti";

pub const EPISODE_SOURCE_DESCRIPTION: &str = "Scientific Paper Knowledge Entry";

/// Turns a provider set into a ready graph client.
#[async_trait]
pub trait GraphConnector: Send + Sync {
    async fn connect(
        &self,
        config: &GraphConfig,
        providers: &ProviderSet,
    ) -> anyhow::Result<Arc<dyn GraphClient>>;
}

pub struct GraphBackend {
    config: GraphConfig,
    api_keys: ApiKeys,
    default_mode: SearchMode,
    connector: Arc<dyn GraphConnector>,
    client: OnceCell<Arc<dyn GraphClient>>,
}

impl GraphBackend {
    /// A backend that connects through the HTTP graph service.
    pub fn new(config: &GraphConfig, api_keys: &ApiKeys) -> Result<Self> {
        Self::with_connector(config, api_keys, Arc::new(HttpGraphConnector))
    }

    pub fn with_connector(
        config: &GraphConfig,
        api_keys: &ApiKeys,
        connector: Arc<dyn GraphConnector>,
    ) -> Result<Self> {
        let default_mode = config.search_mode.parse::<SearchMode>()?;

        info!(uri = %config.uri, "initialized graph backend");

        Ok(Self {
            config: config.clone(),
            api_keys: api_keys.clone(),
            default_mode,
            connector,
            client: OnceCell::new(),
        })
    }

    pub fn is_initialized(&self) -> bool {
        self.client.initialized()
    }

    async fn client(&self) -> Result<&Arc<dyn GraphClient>> {
        self.client
            .get_or_try_init(|| async {
                let providers = ProviderSet::from_config(&self.config, &self.api_keys)?;
                info!(
                    provider = %providers.kind,
                    llm = %providers.llm.model,
                    embedder = %providers.embedder.model,
                    reranker = providers.reranker.is_some(),
                    "connecting graph client"
                );

                let client = self
                    .connector
                    .connect(&self.config, &providers)
                    .await
                    .map_err(|e| KbError::backend(NAME, format!("failed to connect: {e:#}")))?;

                client.build_indices_and_constraints().await.map_err(|e| {
                    KbError::backend(NAME, format!("failed to build indices: {e:#}"))
                })?;

                info!("graph client initialized");
                Ok(client)
            })
            .await
            .map_err(|e: KbError| {
                error!(error = %e, "error initializing graph client");
                e
            })
    }

    /// The search configuration for `mode` with limits applied.
    ///
    /// `options.top_k` and `options.reranker_min_score` override the
    /// configured values only when set and non-zero.
    pub fn search_config(
        &self,
        mode: Option<&str>,
        options: &QueryOptions,
    ) -> Result<SearchConfig> {
        let mode = match mode {
            Some(m) => m.parse::<SearchMode>()?,
            None => self.default_mode,
        };

        let limit = options
            .top_k
            .filter(|&k| k > 0)
            .unwrap_or(self.config.search_limit);
        let min_score = options
            .reranker_min_score
            .filter(|&s| s > 0.0)
            .unwrap_or(self.config.search_min_score);

        debug!(%mode, limit, min_score, "resolved graph search config");

        Ok(mode
            .config()
            .with_limit(limit)
            .with_reranker_min_score(min_score))
    }

    pub async fn query_async(
        &self,
        text: &str,
        mode: Option<&str>,
        options: &QueryOptions,
    ) -> Result<String> {
        let search_config = self.search_config(mode, options)?;
        let client = self.client().await?;

        let results = client.search(text, &search_config).await.map_err(|e| {
            error!(error = %e, "error querying graph");
            KbError::backend(NAME, format!("search failed: {e:#}"))
        })?;

        debug!(
            nodes = results.nodes.len(),
            edges = results.edges.len(),
            communities = results.communities.len(),
            "graph search returned"
        );

        Ok(render_search_results(&results))
    }

    /// Ingest `text` as one episode and return the episode name.
    pub async fn save_async(
        &self,
        text: &str,
        name: Option<&str>,
        domain: Domain,
    ) -> Result<String> {
        let client = self.client().await?;

        let episode_name = name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .unwrap_or_else(default_episode_name);

        debug!(%domain, episode = %episode_name, preview = %preview(text), "adding episode");

        let episode = Episode {
            name: episode_name.clone(),
            episode_body: text.to_string(),
            source: EpisodeType::Text,
            source_description: EPISODE_SOURCE_DESCRIPTION.to_string(),
            reference_time: Utc::now(),
            entity_types: scientific_paper_entity_types(),
        };

        let outcome = client.add_episode(&episode).await.map_err(|e| {
            error!(error = %e, episode = %episode_name, "error adding episode");
            KbError::backend(NAME, format!("failed to add episode: {e:#}"))
        })?;

        info!(
            episode = %episode_name,
            uuid = %outcome.episode_uuid,
            nodes = outcome.node_count,
            edges = outcome.edge_count,
            "added episode"
        );

        Ok(episode_name)
    }

    pub async fn insert(
        &self,
        text: &str,
        name: Option<&str>,
        domain: Domain,
    ) -> Result<InsertResponse> {
        let episode = self.save_async(text, name, domain).await?;
        Ok(InsertResponse::success(format!(
            "Saved text to the knowledge graph as episode {}",
            episode
        )))
    }
}

fn default_episode_name() -> String {
    format!("scientific_paper_{}", Local::now().format("%Y%m%d%H%M%S"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_episode_name_format() {
        let name = default_episode_name();
        let stamp = name.strip_prefix("scientific_paper_").unwrap();
        assert_eq!(stamp.len(), 14);
        assert!(stamp.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_bad_configured_mode_rejected() {
        let config = GraphConfig {
            search_mode: "wide".to_string(),
            ..Default::default()
        };
        let err = GraphBackend::new(&config, &ApiKeys::default()).err().unwrap();
        assert!(matches!(err, KbError::InvalidMode(_)));
    }

    #[test]
    fn test_search_config_overrides() {
        let backend = GraphBackend::new(&GraphConfig::default(), &ApiKeys::default()).unwrap();

        let cfg = backend.search_config(None, &QueryOptions::default()).unwrap();
        assert_eq!(
            cfg,
            SearchMode::Broad
                .config()
                .with_limit(50)
                .with_reranker_min_score(0.2)
        );

        let options = QueryOptions {
            top_k: Some(5),
            reranker_min_score: Some(0.7),
            ..Default::default()
        };
        let cfg = backend.search_config(Some("deep"), &options).unwrap();
        assert_eq!(cfg.limit, 5);
        assert!((cfg.reranker_min_score - 0.7).abs() < f64::EPSILON);
        assert_eq!(
            cfg,
            SearchMode::Deep
                .config()
                .with_limit(5)
                .with_reranker_min_score(0.7)
        );

        let zeros = QueryOptions {
            top_k: Some(0),
            reranker_min_score: Some(0.0),
            ..Default::default()
        };
        let cfg = backend.search_config(None, &zeros).unwrap();
        assert_eq!(cfg.limit, 50);
        assert!((cfg.reranker_min_score - 0.2).abs() < f64::EPSILON);
    }
}
