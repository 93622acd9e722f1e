//! In-memory [`GraphClient`] implementation for testing and offline use.
//!
//! Search returns a fixed, caller-provided [`SearchResults`] regardless of
//! the query; every call is recorded so tests can assert on what the
//! backend sent. Failures can be injected per operation.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

use anyhow::{bail, Result};
use async_trait::async_trait;

use super::{AddEpisodeOutcome, Episode, GraphClient, SearchResults};
use crate::search_config::SearchConfig;

/// In-memory graph client that serves canned search results.
pub struct InMemoryGraphClient {
    results: RwLock<SearchResults>,
    searches: RwLock<Vec<(String, SearchConfig)>>,
    episodes: RwLock<Vec<Episode>>,
    index_builds: AtomicUsize,
    failing_searches: AtomicUsize,
    failing_episodes: AtomicUsize,
}

impl InMemoryGraphClient {
    pub fn new() -> Self {
        Self::with_results(SearchResults::default())
    }

    pub fn with_results(results: SearchResults) -> Self {
        Self {
            results: RwLock::new(results),
            searches: RwLock::new(Vec::new()),
            episodes: RwLock::new(Vec::new()),
            index_builds: AtomicUsize::new(0),
            failing_searches: AtomicUsize::new(0),
            failing_episodes: AtomicUsize::new(0),
        }
    }

    /// Replace the results served by subsequent searches.
    pub fn set_results(&self, results: SearchResults) {
        *self.results.write().unwrap() = results;
    }

    /// Make the next `n` searches fail.
    pub fn fail_next_searches(&self, n: usize) {
        self.failing_searches.store(n, Ordering::SeqCst);
    }

    /// Make the next `n` episode ingestions fail.
    pub fn fail_next_episodes(&self, n: usize) {
        self.failing_episodes.store(n, Ordering::SeqCst);
    }

    /// All `(query, config)` pairs searched so far, oldest first.
    pub fn searches(&self) -> Vec<(String, SearchConfig)> {
        self.searches.read().unwrap().clone()
    }

    /// All episodes ingested so far, oldest first.
    pub fn episodes(&self) -> Vec<Episode> {
        self.episodes.read().unwrap().clone()
    }

    pub fn index_builds(&self) -> usize {
        self.index_builds.load(Ordering::SeqCst)
    }
}

impl Default for InMemoryGraphClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Decrement `counter` if positive; returns true when a failure should fire.
fn take_failure(counter: &AtomicUsize) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

#[async_trait]
impl GraphClient for InMemoryGraphClient {
    async fn build_indices_and_constraints(&self) -> Result<()> {
        self.index_builds.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn search(&self, query: &str, config: &SearchConfig) -> Result<SearchResults> {
        self.searches
            .write()
            .unwrap()
            .push((query.to_string(), config.clone()));

        if take_failure(&self.failing_searches) {
            bail!("injected search failure");
        }

        Ok(self.results.read().unwrap().clone())
    }

    async fn add_episode(&self, episode: &Episode) -> Result<AddEpisodeOutcome> {
        if take_failure(&self.failing_episodes) {
            bail!("injected episode failure");
        }

        self.episodes.write().unwrap().push(episode.clone());

        Ok(AddEpisodeOutcome {
            episode_uuid: uuid::Uuid::new_v4().to_string(),
            node_count: episode.entity_types.len(),
            edge_count: 0,
        })
    }
}
