//! # kb-service
//!
//! A knowledge-base orchestration layer for AI agents.
//!
//! One [`KnowledgeGraph`](knowledge_graph::KnowledgeGraph) dispatcher fronts
//! a pluggable backend: a remote RAG server (`light_rag`) or a graph
//! database reached through a graph service (`graphiti`). Queries and saves
//! run under a retry policy; graph search results are flattened into
//! LLM-friendly text; a mermaid feature-hierarchy diagram is maintained with
//! the help of a chat-completion model.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌────────────────────┐   ┌──────────────┐
//! │ CLI/HTTP │──▶│ KnowledgeBaseService│──▶│ MarkdownStore│
//! └──────────┘   └─────────┬──────────┘   └──────────────┘
//!                          ▼
//!                 ┌─────────────────┐
//!                 │ KnowledgeGraph  │  retry + features diagram
//!                 └───────┬─────────┘
//!                ┌────────┴────────┐
//!                ▼                 ▼
//!         ┌────────────┐    ┌─────────────┐
//!         │ RAG server │    │ Graph (lazy)│
//!         └────────────┘    └─────────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration with environment overrides |
//! | [`error`] | Crate error type |
//! | [`logging`] | `tracing` subscriber setup |
//! | [`bridge`] | Shared runtime for the blocking API |
//! | [`retry`] | Fixed-delay retry policy |
//! | [`backend`] | RAG-server and graph backends |
//! | [`llm`] | Chat-completion client |
//! | [`features`] | Mermaid feature diagram |
//! | [`knowledge_graph`] | Backend dispatcher |
//! | [`markdown`] | Markdown knowledge files |
//! | [`service`] | Agent-facing facade |
//! | [`server`] | HTTP API |

pub mod backend;
pub mod bridge;
pub mod config;
pub mod error;
pub mod features;
pub mod knowledge_graph;
pub mod llm;
pub mod logging;
pub mod markdown;
pub mod retry;
pub mod server;
pub mod service;

pub use error::{KbError, Result};
pub use knowledge_graph::KnowledgeGraph;
pub use service::KnowledgeBaseService;
