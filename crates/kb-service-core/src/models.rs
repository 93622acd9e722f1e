//! Request and response schemas shared by every backend.
//!
//! These types define the wire shape of the RAG-server API and the result
//! envelopes returned by the dispatcher:
//!
//! - [`QueryRequest`]: body of `POST /query` (only set fields serialized).
//! - [`QueryOptions`]: caller-supplied optional query parameters.
//! - [`QueryResponse`] / [`InsertResponse`]: status envelopes returned by
//!   the blocking entry points.
//! - [`FeatureUpdateResponse`]: result of a diagram update.
//!
//! The `success` / `error` constructors and deserialization of
//! [`QueryResponse`] guarantee that an `error` status carries a non-empty
//! message and a `success` status carries none. Fields stay public, so code
//! that mutates an envelope directly is responsible for keeping that pairing.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error returned when a mode string is not one of the accepted values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported {kind} mode '{value}' (expected one of: {expected})")]
pub struct UnknownMode {
    /// Which value family was being parsed (`"retrieval"`, `"search"`, `"domain"`).
    pub kind: &'static str,
    /// The rejected input.
    pub value: String,
    /// Comma-separated list of accepted values.
    pub expected: &'static str,
}

/// Retrieval strategy understood by the RAG server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RetrievalMode {
    #[default]
    Local,
    Global,
    Hybrid,
    Naive,
    Mix,
    Bypass,
}

impl RetrievalMode {
    pub const ALL: &'static str = "local, global, hybrid, naive, mix, bypass";

    pub fn as_str(&self) -> &'static str {
        match self {
            RetrievalMode::Local => "local",
            RetrievalMode::Global => "global",
            RetrievalMode::Hybrid => "hybrid",
            RetrievalMode::Naive => "naive",
            RetrievalMode::Mix => "mix",
            RetrievalMode::Bypass => "bypass",
        }
    }
}

impl fmt::Display for RetrievalMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RetrievalMode {
    type Err = UnknownMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "local" => Ok(RetrievalMode::Local),
            "global" => Ok(RetrievalMode::Global),
            "hybrid" => Ok(RetrievalMode::Hybrid),
            "naive" => Ok(RetrievalMode::Naive),
            "mix" => Ok(RetrievalMode::Mix),
            "bypass" => Ok(RetrievalMode::Bypass),
            other => Err(UnknownMode {
                kind: "retrieval",
                value: other.to_string(),
                expected: Self::ALL,
            }),
        }
    }
}

/// Knowledge domain tag attached to a save.
///
/// Neither backend stores it today; it is logged and passed through so
/// callers can keep a single save signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    Tech,
    #[default]
    Business,
}

impl Domain {
    pub const ALL: &'static str = "tech, business";

    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Tech => "tech",
            Domain::Business => "business",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Domain {
    type Err = UnknownMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tech" | "technical" => Ok(Domain::Tech),
            "business" => Ok(Domain::Business),
            other => Err(UnknownMode {
                kind: "domain",
                value: other.to_string(),
                expected: Self::ALL,
            }),
        }
    }
}

/// One prior turn of a conversation, oldest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    /// `"user"` or `"assistant"`.
    pub role: String,
    pub content: String,
}

impl ConversationTurn {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }
}

/// Optional query parameters supplied by the caller.
///
/// Every field is optional; unset fields fall back to [`RequestDefaults`]
/// (RAG server) or to the graph backend's configured search limits.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryOptions {
    /// Return only the retrieved context, without generating an answer.
    pub only_need_context: Option<bool>,
    /// Return only the generated prompt, without producing an answer.
    pub only_need_prompt: Option<bool>,
    /// Response format hint, e.g. `"Multiple Paragraphs"` or `"Bullet Points"`.
    pub response_type: Option<String>,
    /// Number of top items to retrieve.
    pub top_k: Option<usize>,
    pub max_token_for_text_unit: Option<usize>,
    pub max_token_for_global_context: Option<usize>,
    pub max_token_for_local_context: Option<usize>,
    pub conversation_history: Option<Vec<ConversationTurn>>,
    /// Number of history turns the server should consider.
    pub history_turns: Option<usize>,
    /// Minimum reranker score for graph search results.
    pub reranker_min_score: Option<f64>,
}

/// Fallback numeric limits applied when [`QueryOptions`] leaves them unset.
///
/// Populated from configuration (and through it, from the environment).
/// Limits that are `None` here are omitted from the request entirely.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestDefaults {
    pub top_k: Option<usize>,
    pub max_token_for_text_unit: Option<usize>,
    pub max_token_for_global_context: Option<usize>,
    pub max_token_for_local_context: Option<usize>,
    pub history_turns: Option<usize>,
}

/// Body of `POST /query` on the RAG server.
///
/// Serialization skips every unset field so the server applies its own
/// defaults for anything the caller did not specify.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryRequest {
    pub query: String,
    pub mode: RetrievalMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub only_need_context: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub only_need_prompt: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_token_for_text_unit: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_token_for_global_context: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_token_for_local_context: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_history: Option<Vec<ConversationTurn>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history_turns: Option<usize>,
}

impl QueryRequest {
    /// A bare request with only the query text and mode set.
    pub fn new(query: impl Into<String>, mode: RetrievalMode) -> Self {
        Self {
            query: query.into(),
            mode,
            only_need_context: None,
            only_need_prompt: None,
            response_type: None,
            top_k: None,
            max_token_for_text_unit: None,
            max_token_for_global_context: None,
            max_token_for_local_context: None,
            conversation_history: None,
            history_turns: None,
        }
    }

    /// Build a request from caller options, filling unset limits from `defaults`.
    pub fn from_options(
        query: impl Into<String>,
        mode: RetrievalMode,
        options: &QueryOptions,
        defaults: &RequestDefaults,
    ) -> Self {
        Self {
            query: query.into(),
            mode,
            only_need_context: options.only_need_context,
            only_need_prompt: options.only_need_prompt,
            response_type: options.response_type.clone(),
            top_k: options.top_k.or(defaults.top_k),
            max_token_for_text_unit: options
                .max_token_for_text_unit
                .or(defaults.max_token_for_text_unit),
            max_token_for_global_context: options
                .max_token_for_global_context
                .or(defaults.max_token_for_global_context),
            max_token_for_local_context: options
                .max_token_for_local_context
                .or(defaults.max_token_for_local_context),
            conversation_history: options.conversation_history.clone(),
            history_turns: options.history_turns.or(defaults.history_turns),
        }
    }
}

/// Outcome marker shared by the status envelopes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Success,
    Error,
}

impl ResponseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseStatus::Success => "success",
            ResponseStatus::Error => "error",
        }
    }
}

/// Result of a blocking query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawQueryResponse")]
pub struct QueryResponse {
    pub response: String,
    pub status: ResponseStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl QueryResponse {
    pub fn success(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
            status: ResponseStatus::Success,
            error_message: None,
        }
    }

    /// An error envelope. An empty message is replaced with `"unknown error"`.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            response: String::new(),
            status: ResponseStatus::Error,
            error_message: Some(non_empty(message.into())),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ResponseStatus::Success
    }
}

#[derive(Deserialize)]
struct RawQueryResponse {
    #[serde(default)]
    response: String,
    status: ResponseStatus,
    #[serde(default)]
    error_message: Option<String>,
}

impl TryFrom<RawQueryResponse> for QueryResponse {
    type Error = String;

    fn try_from(raw: RawQueryResponse) -> Result<Self, Self::Error> {
        let has_message = raw
            .error_message
            .as_deref()
            .is_some_and(|m| !m.trim().is_empty());
        match (raw.status, has_message) {
            (ResponseStatus::Error, false) => {
                Err("error response without an error_message".to_string())
            }
            (ResponseStatus::Success, true) => {
                Err("success response with an error_message".to_string())
            }
            _ => Ok(Self {
                response: raw.response,
                status: raw.status,
                error_message: raw.error_message,
            }),
        }
    }
}

/// Body of `POST /documents/text` on the RAG server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsertTextRequest {
    pub text: String,
}

/// Result of a blocking save.
///
/// `status` is kept as a string because the RAG server's own status values
/// (e.g. `"partial_success"`) are passed through verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsertResponse {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl InsertResponse {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: ResponseStatus::Success.as_str().to_string(),
            message: Some(message.into()),
        }
    }

    /// An error envelope. An empty message is replaced with `"unknown error"`.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: ResponseStatus::Error.as_str().to_string(),
            message: Some(non_empty(message.into())),
        }
    }

    /// Pass through a status/message pair reported by a remote service.
    pub fn reported(status: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            message: Some(message.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ResponseStatus::Success.as_str()
    }
}

/// Result of a diagram update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureUpdateResponse {
    pub status: ResponseStatus,
    pub message: String,
    /// The diagram written to disk; empty on error.
    pub updated_diagram: String,
}

impl FeatureUpdateResponse {
    pub fn success(message: impl Into<String>, updated_diagram: impl Into<String>) -> Self {
        Self {
            status: ResponseStatus::Success,
            message: message.into(),
            updated_diagram: updated_diagram.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: ResponseStatus::Error,
            message: non_empty(message.into()),
            updated_diagram: String::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ResponseStatus::Success
    }
}

fn non_empty(message: String) -> String {
    if message.trim().is_empty() {
        "unknown error".to_string()
    } else {
        message
    }
}
