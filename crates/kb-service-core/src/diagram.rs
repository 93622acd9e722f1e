//! Prompt construction and response parsing for feature-diagram updates.
//!
//! The features list is a markdown file holding a fenced `mermaid` block.
//! An update asks an LLM to merge a new feature into the diagram and reply
//! with the complete regenerated block; [`extract_mermaid`] pulls that
//! block back out of the reply.

pub const MERMAID_START: &str = "```mermaid";
pub const FENCE_END: &str = "```";

pub const SYSTEM_PROMPT: &str = "You are a helpful assistant that specializes in updating \
mermaid diagrams. Your task is to update a mermaid diagram with a new feature or modify an \
existing one while maintaining the structure and style of the diagram.";

/// Build the user prompt asking for `feature_name` to be merged into `current_diagram`.
pub fn build_update_prompt(
    current_diagram: &str,
    feature_name: &str,
    feature_description: &str,
    parent_node: Option<&str>,
) -> String {
    let placement = match parent_node {
        Some(parent) => format!("add a new feature under {}", parent),
        None => "add a new feature".to_string(),
    };

    format!(
        "I need to update a mermaid diagram that represents a feature hierarchy. \
Here's the current diagram:

{current_diagram}

I want to {placement} with the following details:
- Feature name: {feature_name}
- Feature description: {feature_description}

Please update the mermaid diagram to include this new feature. Follow these guidelines:
1. Maintain the existing structure and style of the diagram
2. Use the same node ID naming convention as in the existing diagram
3. If a similar feature already exists, update it instead of adding a new one
4. Return ONLY the complete updated mermaid diagram, including the {MERMAID_START} and {FENCE_END} tags
5. Make sure the syntax is correct and the diagram will render properly

Updated mermaid diagram:
"
    )
}

/// Extract the first fenced mermaid block, fences included.
///
/// Returns `None` unless both the opening ```` ```mermaid ```` marker and a
/// closing ```` ``` ```` after it are present.
pub fn extract_mermaid(response: &str) -> Option<&str> {
    let start = response.find(MERMAID_START)?;
    let body_start = start + MERMAID_START.len();
    let end = response[body_start..].find(FENCE_END)? + body_start;
    Some(&response[start..end + FENCE_END.len()])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_strips_surrounding_prose() {
        let reply = "Sure! Here it is:\n```mermaid\ngraph TD\n  A-->B\n```\nLet me know.";
        assert_eq!(
            extract_mermaid(reply),
            Some("```mermaid\ngraph TD\n  A-->B\n```")
        );
    }

    #[test]
    fn test_extract_requires_both_markers() {
        assert_eq!(extract_mermaid("graph TD\n A-->B"), None);
        assert_eq!(extract_mermaid("```mermaid\ngraph TD\n A-->B"), None);
        assert_eq!(extract_mermaid("```\ngraph TD\n```"), None);
        assert_eq!(extract_mermaid(""), None);
    }

    #[test]
    fn test_extract_takes_first_block() {
        let reply = "```mermaid\nA\n```\n```mermaid\nB\n```";
        assert_eq!(extract_mermaid(reply), Some("```mermaid\nA\n```"));
    }

    #[test]
    fn test_prompt_mentions_parent() {
        let prompt = build_update_prompt("```mermaid\n```", "Search", "Hybrid search", Some("F1"));
        assert!(prompt.contains("add a new feature under F1"));
        assert!(prompt.contains("- Feature name: Search"));

        let root = build_update_prompt("d", "Search", "x", None);
        assert!(root.contains("I want to add a new feature with"));
    }
}
