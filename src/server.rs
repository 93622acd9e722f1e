//! HTTP API over the knowledge-base service.
//!
//! # Endpoints
//!
//! | Method | Path | Body | Response |
//! |--------|------|------|----------|
//! | `GET`  | `/health` | | `{ status, version, backend }` |
//! | `POST` | `/query` | `{ query, mode?, ...options }` | `QueryResponse` |
//! | `POST` | `/documents` | `{ text, name?, domain? }` | `InsertResponse` |
//! | `GET`  | `/features` | | `{ diagram }` |
//! | `POST` | `/features` | `{ feature_name, feature_description, parent_node? }` | `FeatureUpdateResponse` |
//!
//! Query and save failures are reported in-band through the response
//! envelope's `status` field. Request validation errors use the error
//! envelope:
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "query must not be empty" } }
//! ```
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use kb_service_core::{
    Domain, FeatureUpdateResponse, InsertResponse, QueryOptions, QueryResponse,
};

use crate::config::Config;
use crate::service::KnowledgeBaseService;

#[derive(Clone)]
struct AppState {
    service: Arc<KnowledgeBaseService>,
}

/// Build the service from `config` and serve until the process exits.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let service = Arc::new(KnowledgeBaseService::new(config)?);
    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    info!(bind = %config.server.bind, "knowledge base server listening");
    axum::serve(listener, router(service)).await?;
    Ok(())
}

/// The API routes, exposed for embedding and tests.
pub fn router(service: Arc<KnowledgeBaseService>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/query", post(handle_query))
        .route("/documents", post(handle_save))
        .route(
            "/features",
            get(handle_get_features).post(handle_update_features),
        )
        .layer(cors)
        .with_state(AppState { service })
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    backend: String,
}

async fn handle_health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        backend: state.service.graph().backend_name().to_string(),
    })
}

// ============ POST /query ============

#[derive(Deserialize)]
struct QueryBody {
    query: String,
    #[serde(default)]
    mode: Option<String>,
    #[serde(flatten)]
    options: QueryOptions,
}

async fn handle_query(
    State(state): State<AppState>,
    Json(body): Json<QueryBody>,
) -> Result<Json<QueryResponse>, AppError> {
    if body.query.trim().is_empty() {
        return Err(bad_request("query must not be empty"));
    }

    let response = state
        .service
        .graph()
        .query_response(&body.query, body.mode.as_deref(), &body.options)
        .await;
    Ok(Json(response))
}

// ============ POST /documents ============

#[derive(Deserialize)]
struct SaveBody {
    text: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    domain: Domain,
}

async fn handle_save(
    State(state): State<AppState>,
    Json(body): Json<SaveBody>,
) -> Result<Json<InsertResponse>, AppError> {
    if body.text.trim().is_empty() {
        return Err(bad_request("text must not be empty"));
    }

    let response = state
        .service
        .graph()
        .save_response(&body.text, body.name.as_deref(), body.domain)
        .await;
    Ok(Json(response))
}

// ============ /features ============

#[derive(Serialize)]
struct FeaturesListResponse {
    diagram: String,
}

async fn handle_get_features(State(state): State<AppState>) -> Json<FeaturesListResponse> {
    Json(FeaturesListResponse {
        diagram: state.service.get_features_list(),
    })
}

#[derive(Deserialize)]
struct FeatureUpdateBody {
    feature_name: String,
    feature_description: String,
    #[serde(default)]
    parent_node: Option<String>,
}

async fn handle_update_features(
    State(state): State<AppState>,
    Json(body): Json<FeatureUpdateBody>,
) -> Result<Json<FeatureUpdateResponse>, AppError> {
    if body.feature_name.trim().is_empty() {
        return Err(bad_request("feature_name must not be empty"));
    }

    let response = state
        .service
        .update_features_list(
            &body.feature_name,
            &body.feature_description,
            body.parent_node.as_deref(),
        )
        .await;
    Ok(Json(response))
}
