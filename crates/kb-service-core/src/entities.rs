//! Scientific-paper entity catalogue.
//!
//! Episodes added to the graph carry this catalogue so the graph service's
//! extraction pipeline can populate typed nodes from unstructured text.
//! Each [`EntityType`] serializes as a small JSON-schema-like object.

use serde::Serialize;

/// Value shape of an entity attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    String,
    Integer,
    StringList,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntityField {
    pub name: &'static str,
    pub kind: FieldKind,
    pub description: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntityType {
    pub name: &'static str,
    pub description: &'static str,
    pub fields: Vec<EntityField>,
}

fn field(name: &'static str, kind: FieldKind, description: &'static str) -> EntityField {
    EntityField {
        name,
        kind,
        description,
    }
}

/// The nine entity types attached to every scientific-paper episode.
pub fn scientific_paper_entity_types() -> Vec<EntityType> {
    use FieldKind::*;

    vec![
        EntityType {
            name: "ScientificPaper",
            description: "A scientific paper or publication.",
            fields: vec![
                field("title", String, "The title of the scientific paper."),
                field("abstract", String, "The abstract or summary of the paper."),
                field("publication_year", Integer, "The year the paper was published."),
                field("doi", String, "The Digital Object Identifier (DOI) of the paper."),
                field("authors", StringList, "Author names (link to Author nodes)."),
                field(
                    "affiliations",
                    StringList,
                    "Affiliations of the authors (link to Affiliation nodes).",
                ),
                field("keywords", StringList, "Keywords describing the paper's topics."),
                field(
                    "research_fields",
                    StringList,
                    "Research fields or domains relevant to the paper.",
                ),
                field(
                    "sections",
                    StringList,
                    "Section titles in the paper (link to PaperSection nodes).",
                ),
                field(
                    "references",
                    StringList,
                    "DOIs or titles of referenced papers (link to Reference nodes).",
                ),
                field(
                    "conference_or_journal",
                    String,
                    "The conference or journal where the paper was published.",
                ),
            ],
        },
        EntityType {
            name: "Author",
            description: "An author of a scientific paper.",
            fields: vec![
                field("name", String, "Full name of the author."),
                field("affiliation", String, "Affiliation of the author."),
                field("orcid", String, "ORCID identifier for the author."),
            ],
        },
        EntityType {
            name: "Affiliation",
            description: "An institution or organization affiliated with an author.",
            fields: vec![
                field("name", String, "Name of the institution or organization."),
                field("address", String, "Address of the institution."),
            ],
        },
        EntityType {
            name: "PaperSection",
            description: "A section within a paper (Introduction, Methods, Results, ...).",
            fields: vec![
                field("section_title", String, "Title of the section."),
                field("content", String, "Text content of the section."),
            ],
        },
        EntityType {
            name: "Citation",
            description: "A citation made by a paper to another work.",
            fields: vec![
                field("cited_paper_doi", String, "DOI of the cited paper."),
                field("context", String, "Textual context in which the citation appears."),
            ],
        },
        EntityType {
            name: "Reference",
            description: "A reference entry in a paper's bibliography.",
            fields: vec![
                field("title", String, "Title of the referenced work."),
                field("authors", StringList, "Authors of the referenced work."),
                field("doi", String, "DOI of the referenced work."),
                field("publication_year", Integer, "Year of publication."),
            ],
        },
        EntityType {
            name: "Keyword",
            description: "A keyword or topic associated with a paper.",
            fields: vec![field("keyword", String, "The keyword or topic.")],
        },
        EntityType {
            name: "ResearchField",
            description: "A research field or domain relevant to a paper.",
            fields: vec![
                field("field_name", String, "Name of the research field."),
                field("description", String, "Description of the research field."),
            ],
        },
        EntityType {
            name: "ConferenceOrJournal",
            description: "A conference or journal where a paper is published.",
            fields: vec![
                field("name", String, "Name of the conference or journal."),
                field("issn_or_isbn", String, "ISSN or ISBN identifier."),
                field("publisher", String, "Publisher of the conference or journal."),
            ],
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalogue_names_unique() {
        let types = scientific_paper_entity_types();
        assert_eq!(types.len(), 9);

        let mut names: Vec<&str> = types.iter().map(|t| t.name).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), 9);
        assert!(names.contains(&"ConferenceOrJournal"));
    }

    #[test]
    fn test_catalogue_serializes_field_kinds() {
        let json = serde_json::to_value(scientific_paper_entity_types()).unwrap();
        assert_eq!(json[0]["name"], "ScientificPaper");
        assert_eq!(json[0]["fields"][2]["kind"], "integer");
        assert_eq!(json[0]["fields"][4]["kind"], "string_list");
    }
}
