//! Configuration parsing and validation.
//!
//! Settings are read from a TOML file (default `./config/kb.toml`), then
//! overridden by environment variables, then validated. A missing file is
//! not an error: every field has a default, so a deployment can be driven
//! entirely from the environment.
//!
//! # Environment overrides
//!
//! | Variable | Field |
//! |----------|-------|
//! | `KNOWLEDGE_GRAPH_BACKEND` | `backend` |
//! | `LIGHT_RAG_SERVER_URL` | `rag_server.url` |
//! | `LIGHT_RAG_API_KEY` | `rag_server.api_key` |
//! | `TOP_K` | `rag_server.top_k` |
//! | `MAX_TOKEN_TEXT_CHUNK` | `rag_server.max_token_for_text_unit` |
//! | `MAX_TOKEN_RELATION_DESC` | `rag_server.max_token_for_global_context` |
//! | `MAX_TOKEN_ENTITY_DESC` | `rag_server.max_token_for_local_context` |
//! | `HISTORY_TURNS` | `rag_server.history_turns` |
//! | `GRAPH_SERVICE_URL` | `graph.service_url` |
//! | `NEO4J_URI` / `NEO4J_USER` / `NEO4J_PASSWORD` | `graph.uri` / `graph.user` / `graph.password` |
//! | `GRAPHITI_LLM_PROVIDER` | `graph.llm_provider` |
//! | `GRAPHITI_SEARCH_LIMIT` | `graph.search_limit` |
//! | `GRAPHITI_SEARCH_MIN_SCORE` | `graph.search_min_score` |
//! | `GRAPHITI_SEARCH_CONFIG` | `graph.search_mode` |
//! | `GRAPHITI_OPENAI_LLM_MODEL` etc. | `graph.*_model` |
//! | `FEATURES_LIST_PATH` | `features.path` |
//! | `DEFAULT_LLM_MODEL` | `features.llm_model` |
//! | `MARKDOWN_ROOT_PATH` | `markdown.root` |
//! | `LOG_LEVEL` | `logging.level` |
//!
//! API keys (`OPENAI_API_KEY`, `GOOGLE_API_KEY`) are only ever read from
//! the environment and never from the file.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use kb_service_core::{RequestDefaults, RetrievalMode, SearchMode};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// `light_rag` or `graphiti`; checked when the dispatcher is built.
    #[serde(default = "default_backend")]
    pub backend: String,
    #[serde(default)]
    pub rag_server: RagServerConfig,
    #[serde(default)]
    pub graph: GraphConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub features: FeaturesConfig,
    #[serde(default)]
    pub markdown: MarkdownConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(skip)]
    pub api_keys: ApiKeys,
}

fn default_backend() -> String {
    "light_rag".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            rag_server: RagServerConfig::default(),
            graph: GraphConfig::default(),
            retry: RetryConfig::default(),
            features: FeaturesConfig::default(),
            markdown: MarkdownConfig::default(),
            server: ServerConfig::default(),
            logging: LoggingConfig::default(),
            api_keys: ApiKeys::default(),
        }
    }
}

// ============ RAG server ============

#[derive(Debug, Deserialize, Clone)]
pub struct RagServerConfig {
    #[serde(default = "default_rag_url")]
    pub url: String,
    /// Bearer token; an empty string disables the header.
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_retrieval_mode")]
    pub default_mode: String,
    #[serde(default)]
    pub top_k: Option<usize>,
    #[serde(default)]
    pub max_token_for_text_unit: Option<usize>,
    #[serde(default)]
    pub max_token_for_global_context: Option<usize>,
    #[serde(default)]
    pub max_token_for_local_context: Option<usize>,
    #[serde(default)]
    pub history_turns: Option<usize>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

fn default_rag_url() -> String {
    "http://localhost:9621".to_string()
}
fn default_retrieval_mode() -> String {
    "local".to_string()
}

impl Default for RagServerConfig {
    fn default() -> Self {
        Self {
            url: default_rag_url(),
            api_key: String::new(),
            default_mode: default_retrieval_mode(),
            top_k: None,
            max_token_for_text_unit: None,
            max_token_for_global_context: None,
            max_token_for_local_context: None,
            history_turns: None,
            timeout_secs: None,
        }
    }
}

impl RagServerConfig {
    pub fn request_defaults(&self) -> RequestDefaults {
        RequestDefaults {
            top_k: self.top_k,
            max_token_for_text_unit: self.max_token_for_text_unit,
            max_token_for_global_context: self.max_token_for_global_context,
            max_token_for_local_context: self.max_token_for_local_context,
            history_turns: self.history_turns,
        }
    }
}

// ============ Graph database ============

#[derive(Debug, Deserialize, Clone)]
pub struct GraphConfig {
    /// Base URL of the graph service that fronts the database.
    #[serde(default = "default_graph_service_url")]
    pub service_url: String,
    #[serde(default = "default_graph_uri")]
    pub uri: String,
    #[serde(default = "default_graph_user")]
    pub user: String,
    #[serde(default = "default_graph_password")]
    pub password: String,
    /// `openai` or `gemini`; checked on first graph use.
    #[serde(default = "default_llm_provider")]
    pub llm_provider: String,
    #[serde(default = "default_search_limit")]
    pub search_limit: usize,
    #[serde(default = "default_search_min_score")]
    pub search_min_score: f64,
    #[serde(default = "default_search_mode")]
    pub search_mode: String,
    #[serde(default = "default_openai_llm_model")]
    pub openai_llm_model: String,
    #[serde(default = "default_openai_small_llm_model")]
    pub openai_small_llm_model: String,
    #[serde(default = "default_openai_embedding_model")]
    pub openai_embedding_model: String,
    #[serde(default = "default_gemini_llm_model")]
    pub gemini_llm_model: String,
    #[serde(default = "default_gemini_embedding_model")]
    pub gemini_embedding_model: String,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

fn default_graph_service_url() -> String {
    "http://localhost:8000".to_string()
}
fn default_graph_uri() -> String {
    "bolt://localhost:7687".to_string()
}
fn default_graph_user() -> String {
    "neo4j".to_string()
}
fn default_graph_password() -> String {
    "password".to_string()
}
fn default_llm_provider() -> String {
    "openai".to_string()
}
fn default_search_limit() -> usize {
    50
}
fn default_search_min_score() -> f64 {
    0.2
}
fn default_search_mode() -> String {
    "broad".to_string()
}
fn default_openai_llm_model() -> String {
    "gpt-4.1-mini".to_string()
}
fn default_openai_small_llm_model() -> String {
    "gpt-4.1-nano".to_string()
}
fn default_openai_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}
fn default_gemini_llm_model() -> String {
    "gemini-2.5-flash-latest".to_string()
}
fn default_gemini_embedding_model() -> String {
    "embedding-001".to_string()
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            service_url: default_graph_service_url(),
            uri: default_graph_uri(),
            user: default_graph_user(),
            password: default_graph_password(),
            llm_provider: default_llm_provider(),
            search_limit: default_search_limit(),
            search_min_score: default_search_min_score(),
            search_mode: default_search_mode(),
            openai_llm_model: default_openai_llm_model(),
            openai_small_llm_model: default_openai_small_llm_model(),
            openai_embedding_model: default_openai_embedding_model(),
            gemini_llm_model: default_gemini_llm_model(),
            gemini_embedding_model: default_gemini_embedding_model(),
            timeout_secs: None,
        }
    }
}

// ============ Retry ============

#[derive(Debug, Deserialize, Clone)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Fixed delay between attempts.
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
    /// Also retry `save_async`. Off by default.
    #[serde(default)]
    pub retry_async_save: bool,
}

fn default_max_attempts() -> u32 {
    3
}
fn default_delay_ms() -> u64 {
    2000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            delay_ms: default_delay_ms(),
            retry_async_save: false,
        }
    }
}

// ============ Features diagram ============

#[derive(Debug, Deserialize, Clone)]
pub struct FeaturesConfig {
    #[serde(default = "default_features_path")]
    pub path: PathBuf,
    #[serde(default = "default_llm_model")]
    pub llm_model: String,
    /// OpenAI-compatible API base, without the `/chat/completions` suffix.
    #[serde(default = "default_llm_base_url")]
    pub llm_base_url: String,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

fn default_features_path() -> PathBuf {
    PathBuf::from("inputs/mermaid_list_features.md")
}
fn default_llm_model() -> String {
    "gpt-4.1-mini".to_string()
}
fn default_llm_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

impl Default for FeaturesConfig {
    fn default() -> Self {
        Self {
            path: default_features_path(),
            llm_model: default_llm_model(),
            llm_base_url: default_llm_base_url(),
            timeout_secs: None,
        }
    }
}

// ============ Markdown / server / logging ============

#[derive(Debug, Deserialize, Clone)]
pub struct MarkdownConfig {
    #[serde(default = "default_markdown_root")]
    pub root: PathBuf,
}

fn default_markdown_root() -> PathBuf {
    PathBuf::from("kb_markdown_files")
}

impl Default for MarkdownConfig {
    fn default() -> Self {
        Self {
            root: default_markdown_root(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

fn default_bind() -> String {
    "127.0.0.1:7400".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Filter directive, e.g. `info` or `kb_service=debug,warn`.
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// ============ Secrets ============

/// A credential whose `Debug` output is redacted.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

#[derive(Debug, Clone, Default)]
pub struct ApiKeys {
    pub openai: Option<Secret>,
    pub google: Option<Secret>,
}

// ============ Loading ============

/// Load configuration from `path` and the process environment.
pub fn load_config(path: &Path) -> Result<Config> {
    load_config_with(path, |key| std::env::var(key).ok())
}

/// Like [`load_config`], with environment lookups served by `lookup`.
pub fn load_config_with(
    path: &Path,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<Config> {
    let mut config = if path.exists() {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str::<Config>(&content).with_context(|| "Failed to parse config file")?
    } else {
        Config::default()
    };

    apply_env(&mut config, &lookup)?;
    validate(&config)?;

    Ok(config)
}

fn apply_env(config: &mut Config, lookup: &impl Fn(&str) -> Option<String>) -> Result<()> {
    // Empty values count as unset.
    let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(v) = var("KNOWLEDGE_GRAPH_BACKEND") {
        config.backend = v;
    }

    let rag = &mut config.rag_server;
    if let Some(v) = var("LIGHT_RAG_SERVER_URL") {
        rag.url = v;
    }
    if let Some(v) = var("LIGHT_RAG_API_KEY") {
        rag.api_key = v;
    }
    set_parsed(&mut rag.top_k, var("TOP_K"), "TOP_K")?;
    set_parsed(
        &mut rag.max_token_for_text_unit,
        var("MAX_TOKEN_TEXT_CHUNK"),
        "MAX_TOKEN_TEXT_CHUNK",
    )?;
    set_parsed(
        &mut rag.max_token_for_global_context,
        var("MAX_TOKEN_RELATION_DESC"),
        "MAX_TOKEN_RELATION_DESC",
    )?;
    set_parsed(
        &mut rag.max_token_for_local_context,
        var("MAX_TOKEN_ENTITY_DESC"),
        "MAX_TOKEN_ENTITY_DESC",
    )?;
    set_parsed(&mut rag.history_turns, var("HISTORY_TURNS"), "HISTORY_TURNS")?;

    let graph = &mut config.graph;
    for (key, field) in [
        ("GRAPH_SERVICE_URL", &mut graph.service_url),
        ("NEO4J_URI", &mut graph.uri),
        ("NEO4J_USER", &mut graph.user),
        ("NEO4J_PASSWORD", &mut graph.password),
        ("GRAPHITI_LLM_PROVIDER", &mut graph.llm_provider),
        ("GRAPHITI_SEARCH_CONFIG", &mut graph.search_mode),
        ("GRAPHITI_OPENAI_LLM_MODEL", &mut graph.openai_llm_model),
        (
            "GRAPHITI_OPENAI_SMALL_LLM_MODEL",
            &mut graph.openai_small_llm_model,
        ),
        (
            "GRAPHITI_OPENAI_EMBEDDING_MODEL",
            &mut graph.openai_embedding_model,
        ),
        ("GRAPHITI_GEMINI_LLM_MODEL", &mut graph.gemini_llm_model),
        (
            "GRAPHITI_GEMINI_EMBEDDING_MODEL",
            &mut graph.gemini_embedding_model,
        ),
    ] {
        if let Some(v) = var(key) {
            *field = v;
        }
    }
    // Legacy spelling, only consulted when the current name is unset.
    if var("GRAPHITI_SEARCH_CONFIG").is_none() {
        if let Some(v) = var("GRAPHITY_SEARCH_CONFIG") {
            graph.search_mode = v;
        }
    }
    if let Some(v) = var("GRAPHITI_SEARCH_LIMIT") {
        graph.search_limit = parse_env("GRAPHITI_SEARCH_LIMIT", &v)?;
    }
    if let Some(v) = var("GRAPHITI_SEARCH_MIN_SCORE") {
        graph.search_min_score = parse_env("GRAPHITI_SEARCH_MIN_SCORE", &v)?;
    }

    if let Some(v) = var("FEATURES_LIST_PATH") {
        config.features.path = PathBuf::from(v);
    }
    if let Some(v) = var("DEFAULT_LLM_MODEL") {
        config.features.llm_model = v;
    }
    if let Some(v) = var("MARKDOWN_ROOT_PATH") {
        config.markdown.root = PathBuf::from(v);
    }
    if let Some(v) = var("LOG_LEVEL") {
        config.logging.level = v.to_lowercase();
    }

    config.api_keys = ApiKeys {
        openai: var("OPENAI_API_KEY").map(Secret::new),
        google: var("GOOGLE_API_KEY").map(Secret::new),
    };

    Ok(())
}

fn set_parsed<T: FromStr>(field: &mut Option<T>, value: Option<String>, key: &str) -> Result<()>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    if let Some(v) = value {
        *field = Some(parse_env(key, &v)?);
    }
    Ok(())
}

fn parse_env<T: FromStr>(key: &str, value: &str) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .trim()
        .parse()
        .with_context(|| format!("Invalid value for {}: '{}'", key, value))
}

fn validate(config: &Config) -> Result<()> {
    if config.retry.max_attempts < 1 {
        bail!("retry.max_attempts must be >= 1");
    }

    if config.graph.search_limit < 1 {
        bail!("graph.search_limit must be >= 1");
    }

    if !(0.0..=1.0).contains(&config.graph.search_min_score) {
        bail!("graph.search_min_score must be in [0.0, 1.0]");
    }

    RetrievalMode::from_str(&config.rag_server.default_mode)
        .with_context(|| "Invalid rag_server.default_mode")?;

    SearchMode::from_str(&config.graph.search_mode)
        .with_context(|| "Invalid graph.search_mode")?;

    if config.rag_server.url.trim().is_empty() {
        bail!("rag_server.url must not be empty");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn missing() -> PathBuf {
        PathBuf::from("/nonexistent/kb.toml")
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let cfg = load_config_with(&missing(), env(&[])).unwrap();

        assert_eq!(cfg.backend, "light_rag");
        assert_eq!(cfg.rag_server.url, "http://localhost:9621");
        assert_eq!(cfg.rag_server.default_mode, "local");
        assert_eq!(cfg.graph.search_limit, 50);
        assert!((cfg.graph.search_min_score - 0.2).abs() < f64::EPSILON);
        assert_eq!(cfg.graph.search_mode, "broad");
        assert_eq!(cfg.retry.max_attempts, 3);
        assert_eq!(cfg.retry.delay_ms, 2000);
        assert!(!cfg.retry.retry_async_save);
        assert!(cfg.api_keys.openai.is_none());
    }

    #[test]
    fn test_file_then_env_override() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
backend = "graphiti"

[rag_server]
top_k = 40

[graph]
search_limit = 20

[retry]
max_attempts = 5
delay_ms = 10
"#
        )
        .unwrap();

        let cfg = load_config_with(
            file.path(),
            env(&[
                ("GRAPHITI_SEARCH_LIMIT", "7"),
                ("MAX_TOKEN_TEXT_CHUNK", "4000"),
                ("OPENAI_API_KEY", "sk-test"),
                ("NEO4J_USER", ""),
            ]),
        )
        .unwrap();

        assert_eq!(cfg.backend, "graphiti");
        assert_eq!(cfg.rag_server.top_k, Some(40));
        assert_eq!(cfg.rag_server.max_token_for_text_unit, Some(4000));
        assert_eq!(cfg.graph.search_limit, 7);
        assert_eq!(cfg.graph.user, "neo4j");
        assert_eq!(cfg.retry.max_attempts, 5);
        assert_eq!(cfg.api_keys.openai.as_ref().unwrap().expose(), "sk-test");

        let defaults = cfg.rag_server.request_defaults();
        assert_eq!(defaults.top_k, Some(40));
        assert_eq!(defaults.history_turns, None);
    }

    #[test]
    fn test_search_mode_env_names() {
        let legacy = env(&[("GRAPHITY_SEARCH_CONFIG", "deep")]);
        let cfg = load_config_with(&missing(), legacy).unwrap();
        assert_eq!(cfg.graph.search_mode, "deep");

        let cfg = load_config_with(
            &missing(),
            env(&[
                ("GRAPHITY_SEARCH_CONFIG", "deep"),
                ("GRAPHITI_SEARCH_CONFIG", "broad"),
            ]),
        )
        .unwrap();
        assert_eq!(cfg.graph.search_mode, "broad");
    }

    #[test]
    fn test_invalid_env_number_rejected() {
        let err = load_config_with(&missing(), env(&[("TOP_K", "many")])).unwrap_err();
        assert!(err.to_string().contains("TOP_K"));
    }

    #[test]
    fn test_validation() {
        let err =
            load_config_with(&missing(), env(&[("GRAPHITI_SEARCH_MIN_SCORE", "1.5")])).unwrap_err();
        assert!(err.to_string().contains("search_min_score"));

        let err =
            load_config_with(&missing(), env(&[("GRAPHITI_SEARCH_CONFIG", "wide")])).unwrap_err();
        assert!(err.to_string().contains("graph.search_mode"));
    }

    #[test]
    fn test_secret_debug_is_redacted() {
        let keys = ApiKeys {
            openai: Some(Secret::new("sk-live-123")),
            google: None,
        };
        let shown = format!("{:?}", keys);
        assert!(!shown.contains("sk-live-123"));
        assert!(shown.contains("***"));
    }
}
