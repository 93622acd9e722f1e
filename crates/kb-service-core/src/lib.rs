//! # KB Service Core
//!
//! Shared, I/O-free logic for the knowledge-base service: request and
//! response schemas, the graph client contract, hybrid search recipes,
//! search-result rendering, the scientific-paper entity catalogue, and the
//! diagram prompt helpers.
//!
//! This crate contains no tokio, HTTP client, or filesystem code. Backends
//! that talk to the outside world live in the `kb-service` crate.

pub mod diagram;
pub mod entities;
pub mod graph;
pub mod models;
pub mod render;
pub mod search_config;

pub use models::{
    ConversationTurn, Domain, FeatureUpdateResponse, InsertResponse, InsertTextRequest,
    QueryOptions, QueryRequest, QueryResponse, RequestDefaults, ResponseStatus, RetrievalMode,
    UnknownMode,
};
pub use search_config::{SearchConfig, SearchMode};
