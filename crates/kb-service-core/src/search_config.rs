//! Hybrid search recipes for the graph backend.
//!
//! A [`SearchConfig`] tells the graph client which scopes to search (edges,
//! nodes, episodes, communities), which retrieval methods to combine per
//! scope, and how to rerank the merged candidates.
//!
//! Two recipes back the two supported [`SearchMode`]s:
//!
//! | Mode | Recipe | Reranker |
//! |------|--------|----------|
//! | `deep` | [`SearchConfig::combined_hybrid_rrf`] | reciprocal rank fusion |
//! | `broad` | [`SearchConfig::combined_hybrid_mmr`] | maximal marginal relevance |
//!
//! Both search every scope with BM25 + cosine similarity (episodes with
//! BM25 only). The caller overrides [`limit`](SearchConfig::limit) and
//! [`reranker_min_score`](SearchConfig::reranker_min_score) per query.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::models::UnknownMode;

pub const DEFAULT_SEARCH_LIMIT: usize = 10;

/// Graph search strategy selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    /// Precision-oriented: RRF-ranked combined hybrid search.
    Deep,
    /// Diversity-oriented: MMR-ranked combined hybrid search.
    Broad,
}

impl SearchMode {
    pub const ALL: &'static str = "deep, broad";

    pub fn as_str(&self) -> &'static str {
        match self {
            SearchMode::Deep => "deep",
            SearchMode::Broad => "broad",
        }
    }

    /// The recipe this mode selects, with default limits.
    pub fn config(&self) -> SearchConfig {
        match self {
            SearchMode::Deep => SearchConfig::combined_hybrid_rrf(),
            SearchMode::Broad => SearchConfig::combined_hybrid_mmr(),
        }
    }
}

impl fmt::Display for SearchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SearchMode {
    type Err = UnknownMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "deep" => Ok(SearchMode::Deep),
            "broad" => Ok(SearchMode::Broad),
            other => Err(UnknownMode {
                kind: "search",
                value: other.to_string(),
                expected: Self::ALL,
            }),
        }
    }
}

/// Candidate retrieval method within one scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMethod {
    Bm25,
    CosineSimilarity,
    Bfs,
}

/// Reranking strategy applied to merged candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reranker {
    Rrf,
    Mmr,
    CrossEncoder,
    NodeDistance,
    EpisodeMentions,
}

/// Search settings for a single scope (edges, nodes, episodes, or communities).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScopeConfig {
    pub search_methods: Vec<SearchMethod>,
    pub reranker: Reranker,
    /// Relevance/diversity trade-off; only meaningful for [`Reranker::Mmr`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mmr_lambda: Option<f64>,
}

impl ScopeConfig {
    fn hybrid(reranker: Reranker) -> Self {
        Self {
            search_methods: vec![SearchMethod::Bm25, SearchMethod::CosineSimilarity],
            mmr_lambda: (reranker == Reranker::Mmr).then_some(1.0),
            reranker,
        }
    }

    fn keyword(reranker: Reranker) -> Self {
        Self {
            search_methods: vec![SearchMethod::Bm25],
            mmr_lambda: None,
            reranker,
        }
    }
}

/// Complete search request configuration sent to the graph client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edge_config: Option<ScopeConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_config: Option<ScopeConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub episode_config: Option<ScopeConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub community_config: Option<ScopeConfig>,
    /// Maximum results per scope.
    pub limit: usize,
    /// Candidates scoring below this after reranking are dropped.
    pub reranker_min_score: f64,
}

impl SearchConfig {
    /// Hybrid search over all scopes, reranked with reciprocal rank fusion.
    pub fn combined_hybrid_rrf() -> Self {
        Self {
            edge_config: Some(ScopeConfig::hybrid(Reranker::Rrf)),
            node_config: Some(ScopeConfig::hybrid(Reranker::Rrf)),
            episode_config: Some(ScopeConfig::keyword(Reranker::Rrf)),
            community_config: Some(ScopeConfig::hybrid(Reranker::Rrf)),
            limit: DEFAULT_SEARCH_LIMIT,
            reranker_min_score: 0.0,
        }
    }

    /// Hybrid search over all scopes, reranked with maximal marginal relevance.
    ///
    /// Episodes keep RRF since MMR needs embeddings, which episodes lack.
    pub fn combined_hybrid_mmr() -> Self {
        Self {
            edge_config: Some(ScopeConfig::hybrid(Reranker::Mmr)),
            node_config: Some(ScopeConfig::hybrid(Reranker::Mmr)),
            episode_config: Some(ScopeConfig::keyword(Reranker::Rrf)),
            community_config: Some(ScopeConfig::hybrid(Reranker::Mmr)),
            limit: DEFAULT_SEARCH_LIMIT,
            reranker_min_score: 0.0,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_reranker_min_score(mut self, score: f64) -> Self {
        self.reranker_min_score = score;
        self
    }
}
