//! HTTP client for the graph service that fronts the temporal graph database.
//!
//! The service owns the database driver and the extraction pipeline; this
//! client forwards the database coordinates and provider set with every
//! call and authenticates with the database credentials (HTTP basic auth).
//!
//! | Method | Path | Body | Response |
//! |--------|------|------|----------|
//! | `POST` | `/indices` | database + providers | ignored |
//! | `POST` | `/search` | database + providers + query + config | [`SearchResults`] |
//! | `POST` | `/episodes` | database + providers + episode | [`AddEpisodeOutcome`] |

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use kb_service_core::graph::{AddEpisodeOutcome, Episode, GraphClient, SearchResults};
use kb_service_core::SearchConfig;

use super::graph::GraphConnector;
use super::providers::{EmbedderSpec, LlmSpec, ProviderKind, ProviderSet, RerankerSpec};
use crate::config::GraphConfig;

/// Connects by building an [`HttpGraphClient`] for `graph.service_url`.
pub struct HttpGraphConnector;

#[async_trait]
impl GraphConnector for HttpGraphConnector {
    async fn connect(
        &self,
        config: &GraphConfig,
        providers: &ProviderSet,
    ) -> Result<Arc<dyn GraphClient>> {
        Ok(Arc::new(HttpGraphClient::new(config, providers)?))
    }
}

pub struct HttpGraphClient {
    client: reqwest::Client,
    base_url: String,
    uri: String,
    user: String,
    password: String,
    providers: ProviderSet,
}

impl HttpGraphClient {
    pub fn new(config: &GraphConfig, providers: &ProviderSet) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        Ok(Self {
            client: builder.build().context("Failed to build HTTP client")?,
            base_url: config.service_url.trim_end_matches('/').to_string(),
            uri: config.uri.clone(),
            user: config.user.clone(),
            password: config.password.clone(),
            providers: providers.clone(),
        })
    }

    fn target(&self) -> Target<'_> {
        Target {
            database: DatabaseRef { uri: &self.uri },
            providers: ProvidersRef {
                provider: self.providers.kind,
                api_key: self.providers.api_key.expose(),
                llm: &self.providers.llm,
                embedder: &self.providers.embedder,
                reranker: self.providers.reranker.as_ref(),
            },
        }
    }

    async fn post<B: Serialize, R: DeserializeOwned>(&self, path: &str, body: &B) -> Result<R> {
        let url = format!("{}{}", self.base_url, path);
        self.send(&url, body)
            .await?
            .json::<R>()
            .await
            .with_context(|| format!("Invalid response from {}", url))
    }

    /// POST `body` to `url`, failing on transport errors and non-2xx statuses.
    async fn send<B: Serialize>(&self, url: &str, body: &B) -> Result<reqwest::Response> {
        let response = self
            .client
            .post(url)
            .basic_auth(&self.user, Some(&self.password))
            .json(body)
            .send()
            .await
            .with_context(|| format!("POST {} failed", url))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            bail!("graph service error {}: {}", status, body_text);
        }
        Ok(response)
    }
}

#[derive(Serialize)]
struct DatabaseRef<'a> {
    uri: &'a str,
}

#[derive(Serialize)]
struct ProvidersRef<'a> {
    provider: ProviderKind,
    api_key: &'a str,
    llm: &'a LlmSpec,
    embedder: &'a EmbedderSpec,
    #[serde(skip_serializing_if = "Option::is_none")]
    reranker: Option<&'a RerankerSpec>,
}

#[derive(Serialize)]
struct Target<'a> {
    database: DatabaseRef<'a>,
    providers: ProvidersRef<'a>,
}

#[derive(Serialize)]
struct SearchBody<'a> {
    #[serde(flatten)]
    target: Target<'a>,
    query: &'a str,
    config: &'a SearchConfig,
}

#[derive(Serialize)]
struct EpisodeBody<'a> {
    #[serde(flatten)]
    target: Target<'a>,
    episode: &'a Episode,
}

#[async_trait]
impl GraphClient for HttpGraphClient {
    async fn build_indices_and_constraints(&self) -> Result<()> {
        let url = format!("{}/indices", self.base_url);
        self.send(&url, &self.target()).await?;
        Ok(())
    }

    async fn search(&self, query: &str, config: &SearchConfig) -> Result<SearchResults> {
        self.post(
            "/search",
            &SearchBody {
                target: self.target(),
                query,
                config,
            },
        )
        .await
    }

    async fn add_episode(&self, episode: &Episode) -> Result<AddEpisodeOutcome> {
        self.post(
            "/episodes",
            &EpisodeBody {
                target: self.target(),
                episode,
            },
        )
        .await
    }
}
