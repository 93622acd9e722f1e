//! Feature diagram updates and the service facade, with a scripted model.

use std::fs;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tempfile::TempDir;

use kb_service::backend::providers::ProviderSet;
use kb_service::backend::{Backend, GraphBackend, GraphConnector};
use kb_service::config::{ApiKeys, GraphConfig, RetryConfig, Secret};
use kb_service::features::FeaturesDiagram;
use kb_service::llm::{ChatMessage, CompletionModel};
use kb_service::markdown::{KnowledgeType, MarkdownStore};
use kb_service::service::{KnowledgeBaseService, SaveKnowledge};
use kb_service::{KbError, KnowledgeGraph};
use kb_service_core::graph::memory::InMemoryGraphClient;
use kb_service_core::graph::{EntityNode, GraphClient, SearchResults};
use kb_service_core::ResponseStatus;

const CURRENT: &str = "```mermaid\ngraph TD\n  root[Platform]\n```";
const UPDATED: &str = "```mermaid\ngraph TD\n  root[Platform] --> search[Search]\n```";

struct ScriptedModel {
    reply: Result<String, String>,
    prompts: Mutex<Vec<Vec<ChatMessage>>>,
}

impl ScriptedModel {
    fn replying(reply: &str) -> Self {
        Self {
            reply: Ok(reply.to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    fn failing(message: &str) -> Self {
        Self {
            reply: Err(message.to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl CompletionModel for ScriptedModel {
    fn model_name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, messages: &[ChatMessage]) -> kb_service::Result<String> {
        self.prompts.lock().unwrap().push(messages.to_vec());
        self.reply.clone().map_err(KbError::Llm)
    }
}

fn diagram_file(tmp: &TempDir, content: &str) -> FeaturesDiagram {
    let path = tmp.path().join("features.md");
    fs::write(&path, content).unwrap();
    FeaturesDiagram::new(path)
}

#[tokio::test]
async fn test_update_overwrites_with_extracted_block() {
    let tmp = TempDir::new().unwrap();
    let diagram = diagram_file(&tmp, CURRENT);
    let model = ScriptedModel::replying(&format!("Here you go:\n{UPDATED}\nAnything else?"));

    let response = diagram
        .update(&model, "Search", "Full-text search over documents", Some("root"))
        .await;

    assert_eq!(response.status, ResponseStatus::Success);
    assert_eq!(
        response.message,
        "Successfully updated features list with feature: Search"
    );
    assert_eq!(response.updated_diagram, UPDATED);
    assert_eq!(fs::read_to_string(diagram.path()).unwrap(), UPDATED);

    let prompts = model.prompts.lock().unwrap();
    let messages = &prompts[0];
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role, "system");
    assert!(messages[1].content.contains(CURRENT));
    assert!(messages[1].content.contains("add a new feature under root"));
    assert!(messages[1].content.contains("- Feature name: Search"));
}

#[tokio::test]
async fn test_reply_without_block_leaves_file_unchanged() {
    let tmp = TempDir::new().unwrap();
    let diagram = diagram_file(&tmp, CURRENT);
    let model = ScriptedModel::replying("graph TD\n  root --> search");

    let response = diagram.update(&model, "Search", "desc", None).await;

    assert_eq!(response.status, ResponseStatus::Error);
    assert_eq!(
        response.message,
        "Failed to extract updated diagram from LLM response"
    );
    assert!(response.updated_diagram.is_empty());
    assert_eq!(fs::read_to_string(diagram.path()).unwrap(), CURRENT);
}

#[tokio::test]
async fn test_missing_file_skips_model() {
    let tmp = TempDir::new().unwrap();
    let diagram = FeaturesDiagram::new(tmp.path().join("absent.md"));
    let model = ScriptedModel::replying(UPDATED);

    assert!(diagram.read().is_empty());
    let response = diagram.update(&model, "Search", "desc", None).await;

    assert_eq!(response.status, ResponseStatus::Error);
    assert_eq!(response.message, "Failed to read current features list");
    assert_eq!(model.calls(), 0);
    assert!(!diagram.path().exists());
}

#[tokio::test]
async fn test_model_error_leaves_file_unchanged() {
    let tmp = TempDir::new().unwrap();
    let diagram = diagram_file(&tmp, CURRENT);
    let model = ScriptedModel::failing("rate limited");

    let response = diagram.update(&model, "Search", "desc", None).await;

    assert_eq!(response.status, ResponseStatus::Error);
    assert!(response.message.contains("rate limited"));
    assert_eq!(fs::read_to_string(diagram.path()).unwrap(), CURRENT);
}

// ============ Service facade ============

struct MemoryConnector(Arc<InMemoryGraphClient>);

#[async_trait]
impl GraphConnector for MemoryConnector {
    async fn connect(
        &self,
        _config: &GraphConfig,
        _providers: &ProviderSet,
    ) -> anyhow::Result<Arc<dyn GraphClient>> {
        let client: Arc<dyn GraphClient> = self.0.clone();
        Ok(client)
    }
}

fn service(
    tmp: &TempDir,
    client: Arc<InMemoryGraphClient>,
    model: Arc<ScriptedModel>,
) -> KnowledgeBaseService {
    let keys = ApiKeys {
        openai: Some(Secret::new("sk-test")),
        google: None,
    };
    let backend = GraphBackend::with_connector(
        &GraphConfig::default(),
        &keys,
        Arc::new(MemoryConnector(client)),
    )
    .unwrap();
    let retry = RetryConfig {
        max_attempts: 2,
        delay_ms: 10,
        retry_async_save: false,
    };
    let graph = KnowledgeGraph::with_parts(
        Backend::Graph(backend),
        &retry,
        diagram_file(tmp, CURRENT),
        model,
    );
    KnowledgeBaseService::with_parts(graph, MarkdownStore::new(tmp.path().join("kb")))
}

#[tokio::test]
async fn test_service_update_records_feature_summary() {
    let tmp = TempDir::new().unwrap();
    let client = Arc::new(InMemoryGraphClient::new());
    let model = Arc::new(ScriptedModel::replying(UPDATED));
    let service = service(&tmp, client.clone(), model);

    let response = service
        .update_features_list("Search", "Full-text search", None)
        .await;
    assert!(response.is_success());
    assert_eq!(service.get_features_list(), UPDATED);

    let episodes = client.episodes();
    assert_eq!(episodes.len(), 1);
    assert_eq!(episodes[0].name, "Search");
    assert_eq!(
        episodes[0].episode_body,
        "Feature Name: Search\nDescription: Full-text search\nParent: Root level"
    );

    let saved = fs::read_to_string(tmp.path().join("kb/search/business.md")).unwrap();
    assert!(saved.ends_with("Parent: Root level"));
}

#[tokio::test]
async fn test_service_update_failure_saves_nothing() {
    let tmp = TempDir::new().unwrap();
    let client = Arc::new(InMemoryGraphClient::new());
    let model = Arc::new(ScriptedModel::failing("offline"));
    let service = service(&tmp, client.clone(), model);

    let response = service
        .update_features_list("Search", "Full-text search", Some("root"))
        .await;
    assert!(!response.is_success());
    assert!(client.episodes().is_empty());
    assert!(!tmp.path().join("kb").exists());
}

#[tokio::test]
async fn test_service_query_and_save() {
    let tmp = TempDir::new().unwrap();
    let client = Arc::new(InMemoryGraphClient::with_results(SearchResults {
        nodes: vec![EntityNode {
            name: "Checkout".to_string(),
            summary: Some("Card payments".to_string()),
            ..Default::default()
        }],
        ..Default::default()
    }));
    let model = Arc::new(ScriptedModel::replying(UPDATED));
    let service = service(&tmp, client.clone(), model);

    let answer = service.query_knowledge("how do users pay?").await;
    assert!(answer.contains("1. Checkout: Card payments"));

    client.fail_next_searches(2);
    let answer = service.query_knowledge("how do users pay?").await;
    assert!(answer.starts_with("Error: "));

    let request = SaveKnowledge {
        feature: "Payments/Checkout".to_string(),
        knowledge_type: KnowledgeType::Technical,
        ..SaveKnowledge::new("Stripe handles card capture.")
    };
    assert!(service.save_knowledge(&request).await);
    assert_eq!(
        service
            .get_markdown_knowledge("Payments", "Checkout", KnowledgeType::Technical)
            .unwrap(),
        "Stripe handles card capture."
    );
    assert_eq!(client.episodes()[0].name, "Payments/Checkout");

    // Graph failures do not fail the save.
    client.fail_next_episodes(2);
    let request = SaveKnowledge {
        save_to_markdown: false,
        ..SaveKnowledge::new("lost in the graph")
    };
    assert!(service.save_knowledge(&request).await);

    let features = service.list_markdown_features(None).unwrap();
    assert_eq!(features.len(), 1);
    assert_eq!(features[0].team, "payments");
    assert!(service
        .delete_markdown_knowledge("Payments", "Checkout", None)
        .unwrap());
    assert!(service.list_markdown_features(None).unwrap().is_empty());
}
