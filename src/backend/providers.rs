//! LLM, embedder and reranker selection for the graph backend.
//!
//! `graph.llm_provider` picks the provider family:
//!
//! | Provider | API key | LLM | Embedder | Reranker |
//! |----------|---------|-----|----------|----------|
//! | `openai` | `OPENAI_API_KEY` | `openai_llm_model` + `openai_small_llm_model` | `openai_embedding_model` | cross-encoder on the small model |
//! | `gemini` | `GOOGLE_API_KEY` | `gemini_llm_model` | `gemini_embedding_model` | none |
//!
//! Any other provider, or a missing key, is a configuration error.

use std::fmt;

use serde::Serialize;

use crate::config::{ApiKeys, GraphConfig, Secret};
use crate::error::{KbError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ProviderKind {
    #[serde(rename = "openai")]
    OpenAi,
    #[serde(rename = "gemini")]
    Gemini,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::Gemini => "gemini",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LlmSpec {
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub small_model: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmbedderSpec {
    pub model: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RerankerSpec {
    pub model: String,
}

/// Everything the graph database side needs to run extraction and search.
#[derive(Debug, Clone)]
pub struct ProviderSet {
    pub kind: ProviderKind,
    pub api_key: Secret,
    pub llm: LlmSpec,
    pub embedder: EmbedderSpec,
    pub reranker: Option<RerankerSpec>,
}

impl ProviderSet {
    pub fn from_config(config: &GraphConfig, keys: &ApiKeys) -> Result<Self> {
        match config.llm_provider.trim().to_lowercase().as_str() {
            "openai" => {
                let api_key = keys.openai.clone().ok_or_else(|| {
                    KbError::Config("OPENAI_API_KEY must be set for the openai provider".into())
                })?;
                Ok(Self {
                    kind: ProviderKind::OpenAi,
                    api_key,
                    llm: LlmSpec {
                        model: config.openai_llm_model.clone(),
                        small_model: Some(config.openai_small_llm_model.clone()),
                    },
                    embedder: EmbedderSpec {
                        model: config.openai_embedding_model.clone(),
                    },
                    reranker: Some(RerankerSpec {
                        model: config.openai_small_llm_model.clone(),
                    }),
                })
            }
            "gemini" => {
                let api_key = keys.google.clone().ok_or_else(|| {
                    KbError::Config("GOOGLE_API_KEY must be set for the gemini provider".into())
                })?;
                Ok(Self {
                    kind: ProviderKind::Gemini,
                    api_key,
                    llm: LlmSpec {
                        model: config.gemini_llm_model.clone(),
                        small_model: None,
                    },
                    embedder: EmbedderSpec {
                        model: config.gemini_embedding_model.clone(),
                    },
                    reranker: None,
                })
            }
            other => Err(KbError::Config(format!(
                "unsupported graph llm provider '{}' (expected openai or gemini)",
                other
            ))),
        }
    }
}
