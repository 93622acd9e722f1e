//! Feature-hierarchy diagram kept as a mermaid block in a markdown file.
//!
//! Reading never fails: a missing or unreadable file reads as an empty
//! diagram. Updating asks a [`CompletionModel`] to merge a feature into the
//! current diagram and overwrites the file with exactly the first fenced
//! mermaid block of the reply. On any failure the file is left untouched
//! and an error [`FeatureUpdateResponse`] is returned.

use std::path::{Path, PathBuf};

use tracing::{debug, error, info};

use kb_service_core::diagram::{build_update_prompt, extract_mermaid, SYSTEM_PROMPT};
use kb_service_core::FeatureUpdateResponse;

use crate::llm::{ChatMessage, CompletionModel};

pub struct FeaturesDiagram {
    path: PathBuf,
}

impl FeaturesDiagram {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn read(&self) -> String {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => {
                debug!(path = %self.path.display(), "read features list");
                content
            }
            Err(e) => {
                error!(path = %self.path.display(), error = %e, "failed to read features list");
                String::new()
            }
        }
    }

    pub async fn update(
        &self,
        llm: &dyn CompletionModel,
        feature_name: &str,
        feature_description: &str,
        parent_node: Option<&str>,
    ) -> FeatureUpdateResponse {
        let current = self.read();
        if current.trim().is_empty() {
            return FeatureUpdateResponse::error("Failed to read current features list");
        }

        let prompt = build_update_prompt(&current, feature_name, feature_description, parent_node);
        let messages = [ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(prompt)];

        debug!(model = llm.model_name(), "requesting diagram update");
        let reply = match llm.complete(&messages).await {
            Ok(reply) => reply,
            Err(e) => {
                error!(error = %e, "diagram update failed");
                return FeatureUpdateResponse::error(format!("Error updating features list: {e}"));
            }
        };

        let Some(diagram) = extract_mermaid(&reply) else {
            error!("no mermaid block in completion reply");
            return FeatureUpdateResponse::error(
                "Failed to extract updated diagram from LLM response",
            );
        };

        // The file may have been removed while the model was running.
        if !self.path.exists() {
            return FeatureUpdateResponse::error(format!(
                "Features list file not found at {}",
                self.path.display()
            ));
        }

        if let Err(e) = std::fs::write(&self.path, diagram) {
            error!(path = %self.path.display(), error = %e, "failed to write features list");
            return FeatureUpdateResponse::error(format!("Error updating features list: {e}"));
        }

        info!(path = %self.path.display(), feature = feature_name, "updated features list");
        FeatureUpdateResponse::success(
            format!("Successfully updated features list with feature: {feature_name}"),
            diagram,
        )
    }
}
