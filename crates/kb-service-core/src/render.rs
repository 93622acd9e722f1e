//! Flatten graph search results into a single text response.
//!
//! Output is up to three sections in fixed order: entities, relationships,
//! communities. A section is emitted only when its collection is non-empty.
//! Each section opens with a `Found N relevant ...` header followed by one
//! line per item, numbered from 1. Sections are separated by a blank line.
//!
//! ```text
//! Found 1 relevant entities with format: <node name>: <node summary> | <attribute>: <value>
//! 1. Attention Is All You Need: Introduces the transformer | doi: 10.48550/arXiv.1706.03762
//!
//! Found 1 relevant relationships with format: <edge name>: <edge fact>
//! 1. AUTHORED_BY: Vaswani authored the transformer paper
//! ```

use serde_json::Value;

use crate::graph::{CommunityNode, EntityEdge, EntityNode, SearchResults};

/// Replacement text for entities and communities without a summary.
pub const MISSING_SUMMARY: &str = "No description available";

/// Render all non-empty result collections as text.
///
/// Returns an empty string when every collection is empty.
pub fn render_search_results(results: &SearchResults) -> String {
    let mut sections = Vec::with_capacity(3);

    if !results.nodes.is_empty() {
        sections.push(render_section(
            format!(
                "Found {} relevant entities with format: <node name>: <node summary> | <attribute>: <value>",
                results.nodes.len()
            ),
            results.nodes.iter().map(render_entity),
        ));
    }

    if !results.edges.is_empty() {
        sections.push(render_section(
            format!(
                "Found {} relevant relationships with format: <edge name>: <edge fact>",
                results.edges.len()
            ),
            results.edges.iter().map(render_edge),
        ));
    }

    if !results.communities.is_empty() {
        sections.push(render_section(
            format!(
                "Found {} relevant communities with format: <community name>: <community summary>",
                results.communities.len()
            ),
            results.communities.iter().map(render_community),
        ));
    }

    sections.join("\n\n")
}

fn render_section(header: String, items: impl Iterator<Item = String>) -> String {
    let mut lines = vec![header];
    lines.extend(
        items
            .enumerate()
            .map(|(i, item)| format!("{}. {}", i + 1, item)),
    );
    lines.join("\n")
}

fn render_entity(node: &EntityNode) -> String {
    let mut line = format!("{}: {}", node.name, summary_or_placeholder(&node.summary));
    for (key, value) in &node.attributes {
        if key == "description" {
            continue;
        }
        line.push_str(&format!(" | {}: {}", key, attribute_text(value)));
    }
    line
}

fn render_edge(edge: &EntityEdge) -> String {
    format!("{}: {}", edge.name, edge.fact)
}

fn render_community(community: &CommunityNode) -> String {
    format!(
        "{}: {}",
        community.name,
        summary_or_placeholder(&community.summary)
    )
}

fn summary_or_placeholder(summary: &Option<String>) -> &str {
    match summary.as_deref() {
        Some(s) if !s.trim().is_empty() => s,
        _ => MISSING_SUMMARY,
    }
}

/// Strings render without JSON quotes; everything else as compact JSON.
fn attribute_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn node(name: &str, summary: Option<&str>, attrs: Value) -> EntityNode {
        EntityNode {
            name: name.to_string(),
            summary: summary.map(str::to_string),
            attributes: attrs.as_object().cloned().unwrap_or_default(),
            ..Default::default()
        }
    }

    fn edge(name: &str, fact: &str) -> EntityEdge {
        EntityEdge {
            name: name.to_string(),
            fact: fact.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_empty_results_render_nothing() {
        assert_eq!(render_search_results(&SearchResults::default()), "");
    }

    #[test]
    fn test_entity_attributes_skip_description() {
        let results = SearchResults {
            nodes: vec![node(
                "BERT",
                Some("Bidirectional encoder"),
                json!({"description": "dup", "publication_year": 2018, "venue": "NAACL"}),
            )],
            ..Default::default()
        };

        let text = render_search_results(&results);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("Found 1 relevant entities"));
        assert_eq!(
            lines[1],
            "1. BERT: Bidirectional encoder | publication_year: 2018 | venue: NAACL"
        );
    }

    #[test]
    fn test_missing_summary_placeholder() {
        let results = SearchResults {
            nodes: vec![node("GPT", None, json!({}))],
            communities: vec![CommunityNode {
                name: "NLP".to_string(),
                summary: Some("  ".to_string()),
                ..Default::default()
            }],
            ..Default::default()
        };

        let text = render_search_results(&results);
        assert!(text.contains("1. GPT: No description available"));
        assert!(text.contains("1. NLP: No description available"));
    }

    #[test]
    fn test_section_order_and_numbering() {
        let results = SearchResults {
            nodes: vec![node("A", Some("a"), json!({})), node("B", Some("b"), json!({}))],
            edges: vec![edge("CITES", "A cites B")],
            communities: vec![CommunityNode {
                name: "C".to_string(),
                summary: Some("c".to_string()),
                ..Default::default()
            }],
        };

        let text = render_search_results(&results);
        let sections: Vec<&str> = text.split("\n\n").collect();
        assert_eq!(sections.len(), 3);
        assert!(sections[0].starts_with("Found 2 relevant entities"));
        assert!(sections[0].ends_with("1. A: a\n2. B: b"));
        assert!(sections[1].starts_with("Found 1 relevant relationships"));
        assert!(sections[1].ends_with("1. CITES: A cites B"));
        assert!(sections[2].starts_with("Found 1 relevant communities"));
    }

    #[test]
    fn test_only_non_empty_sections() {
        let results = SearchResults {
            edges: vec![edge("X", "x"), edge("Y", "y")],
            ..Default::default()
        };

        let text = render_search_results(&results);
        assert!(!text.contains("entities"));
        assert!(!text.contains("communities"));
        assert!(text.starts_with("Found 2 relevant relationships"));
        assert!(text.ends_with("2. Y: y"));
    }
}
