//! HTTP graph client against a local mock graph service.

use std::sync::{Arc, Mutex};

use axum::{
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use serde_json::{json, Value};

use kb_service::backend::graph_http::HttpGraphClient;
use kb_service::backend::providers::ProviderSet;
use kb_service::config::{ApiKeys, GraphConfig, Secret};
use kb_service_core::graph::GraphClient;
use kb_service_core::SearchMode;

type Seen = Arc<Mutex<Vec<(String, Option<String>, Value)>>>;

async fn start_mock(seen: Seen, indices_status: StatusCode) -> String {
    let on_indices = seen.clone();
    let on_search = seen;
    let app = Router::new()
        .route(
            "/indices",
            post(move |headers: HeaderMap, Json(body): Json<Value>| async move {
                record(&on_indices, "/indices", &headers, body);
                indices_status
            }),
        )
        .route(
            "/search",
            post(move |headers: HeaderMap, Json(body): Json<Value>| async move {
                record(&on_search, "/search", &headers, body);
                Json(json!({
                    "edges": [{ "name": "CITES", "fact": "BERT cites the transformer paper" }]
                }))
                .into_response()
            }),
        );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn record(seen: &Seen, path: &str, headers: &HeaderMap, body: Value) {
    let auth = headers
        .get("authorization")
        .map(|v| v.to_str().unwrap().to_string());
    seen.lock().unwrap().push((path.to_string(), auth, body));
}

fn client(url: &str) -> HttpGraphClient {
    let config = GraphConfig {
        service_url: url.to_string(),
        ..GraphConfig::default()
    };
    let keys = ApiKeys {
        openai: Some(Secret::new("sk-test")),
        google: None,
    };
    let providers = ProviderSet::from_config(&config, &keys).unwrap();
    HttpGraphClient::new(&config, &providers).unwrap()
}

#[tokio::test]
async fn test_indices_accepts_empty_no_content_reply() {
    let seen = Seen::default();
    let url = start_mock(seen.clone(), StatusCode::NO_CONTENT).await;

    client(&url).build_indices_and_constraints().await.unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].0, "/indices");
    assert!(seen[0].1.as_deref().unwrap().starts_with("Basic "));
    assert_eq!(seen[0].2["database"]["uri"], "bolt://localhost:7687");
    assert_eq!(seen[0].2["providers"]["api_key"], "sk-test");
}

#[tokio::test]
async fn test_indices_error_status_fails() {
    let url = start_mock(Seen::default(), StatusCode::INTERNAL_SERVER_ERROR).await;

    let err = client(&url)
        .build_indices_and_constraints()
        .await
        .unwrap_err();
    assert!(err.to_string().contains("500"), "{err}");
}

#[tokio::test]
async fn test_search_decodes_results() {
    let seen = Seen::default();
    let url = start_mock(seen.clone(), StatusCode::NO_CONTENT).await;

    let results = client(&url)
        .search("what cites transformers?", &SearchMode::Deep.config())
        .await
        .unwrap();

    assert!(results.nodes.is_empty());
    assert_eq!(results.edges[0].fact, "BERT cites the transformer paper");
    assert_eq!(seen.lock().unwrap()[0].2["query"], "what cites transformers?");
}
