//! Markdown knowledge store.
//!
//! Knowledge is kept as plain markdown files under a root directory, one
//! directory per sanitized feature path:
//!
//! ```text
//! <root>/<team>/<feature>/business.md
//! <root>/<team>/<feature>/technical.md
//! <root>/<team>/<feature>/<source_id>.md
//! ```
//!
//! Each saved file starts with a small front-matter header (`feature`,
//! `type`, `last_updated`) which [`MarkdownStore::get`] strips again.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::Local;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use walkdir::WalkDir;

use kb_service_core::UnknownMode;

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum KnowledgeType {
    #[default]
    Business,
    Technical,
}

impl KnowledgeType {
    pub const ALL: &'static str = "business, technical";

    pub fn as_str(&self) -> &'static str {
        match self {
            KnowledgeType::Business => "business",
            KnowledgeType::Technical => "technical",
        }
    }

    fn file_name(&self) -> String {
        format!("{}.md", self.as_str())
    }
}

impl fmt::Display for KnowledgeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KnowledgeType {
    type Err = UnknownMode;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "business" => Ok(KnowledgeType::Business),
            "technical" => Ok(KnowledgeType::Technical),
            other => Err(UnknownMode {
                kind: "knowledge type",
                value: other.to_string(),
                expected: Self::ALL,
            }),
        }
    }
}

/// One `team/feature` directory and the knowledge types stored in it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeatureEntry {
    pub team: String,
    pub feature: String,
    pub knowledge_types: Vec<KnowledgeType>,
}

pub struct MarkdownStore {
    root: PathBuf,
}

impl MarkdownStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write `text` under the sanitized `feature_path` (`a/b/c` nests).
    ///
    /// The file is named after `source_id` when given, else after the
    /// knowledge type. Characters outside `[A-Za-z0-9_-]` are dropped from
    /// `source_id`, so it can never leave the feature directory. Returns the
    /// written path.
    pub fn save(
        &self,
        text: &str,
        feature_path: &str,
        kind: KnowledgeType,
        source_id: Option<&str>,
    ) -> Result<PathBuf> {
        let dir = feature_path
            .split('/')
            .map(sanitize_name)
            .fold(self.root.clone(), |acc, part| acc.join(part));
        std::fs::create_dir_all(&dir)?;

        let file_name = match source_id.map(file_stem).filter(|s| !s.is_empty()) {
            Some(id) => format!("{}.md", id),
            None => kind.file_name(),
        };
        let path = dir.join(file_name);

        let header = format!(
            "---\nfeature: {}\ntype: {}\nlast_updated: {}\n---\n\n",
            feature_path,
            kind,
            Local::now().format("%Y-%m-%dT%H:%M:%S%.6f")
        );
        std::fs::write(&path, header + text)?;

        info!(feature = feature_path, %kind, path = %path.display(), "saved markdown knowledge");
        Ok(path)
    }

    /// Body of `<team>/<feature>/<kind>.md`, header stripped; empty if absent.
    pub fn get(&self, team: &str, feature: &str, kind: KnowledgeType) -> Result<String> {
        let path = self.feature_dir(team, feature).join(kind.file_name());
        if !path.exists() {
            warn!(path = %path.display(), "markdown file not found");
            return Ok(String::new());
        }

        let content = std::fs::read_to_string(&path)?;
        Ok(strip_header(&content).to_string())
    }

    /// Delete one knowledge file, or the whole feature directory when `kind`
    /// is `None`, then prune emptied parent directories.
    ///
    /// Returns `false` when there was nothing to delete.
    pub fn delete(&self, team: &str, feature: &str, kind: Option<KnowledgeType>) -> Result<bool> {
        let feature_dir = self.feature_dir(team, feature);
        if !feature_dir.is_dir() {
            warn!(path = %feature_dir.display(), "feature directory not found");
            return Ok(false);
        }

        match kind {
            Some(kind) => {
                let path = feature_dir.join(kind.file_name());
                if !path.exists() {
                    warn!(path = %path.display(), "markdown file not found");
                    return Ok(false);
                }
                std::fs::remove_file(&path)?;
                info!(team, feature, %kind, "deleted markdown knowledge");
                remove_if_empty(&feature_dir)?;
            }
            None => {
                std::fs::remove_dir_all(&feature_dir)?;
                info!(team, feature, "deleted feature directory");
            }
        }

        remove_if_empty(&self.root.join(sanitize_name(team)))?;
        Ok(true)
    }

    /// List `team/feature` directories, optionally for a single team.
    pub fn list_features(&self, team: Option<&str>) -> Result<Vec<FeatureEntry>> {
        let team_dirs: Vec<PathBuf> = match team {
            Some(team) => {
                let dir = self.root.join(sanitize_name(team));
                if !dir.is_dir() {
                    warn!(path = %dir.display(), "team directory not found");
                    return Ok(Vec::new());
                }
                vec![dir]
            }
            None if !self.root.is_dir() => return Ok(Vec::new()),
            None => subdirectories(&self.root)?,
        };

        let mut features = Vec::new();
        for team_dir in team_dirs {
            let team_name = dir_name(&team_dir);
            for feature_dir in subdirectories(&team_dir)? {
                let knowledge_types = [KnowledgeType::Business, KnowledgeType::Technical]
                    .into_iter()
                    .filter(|k| feature_dir.join(k.file_name()).exists())
                    .collect();
                features.push(FeatureEntry {
                    team: team_name.clone(),
                    feature: dir_name(&feature_dir),
                    knowledge_types,
                });
            }
        }

        info!(count = features.len(), "listed markdown features");
        Ok(features)
    }

    fn feature_dir(&self, team: &str, feature: &str) -> PathBuf {
        self.root
            .join(sanitize_name(team))
            .join(sanitize_name(feature))
    }
}

/// Drop characters other than word characters, whitespace and `-`, trim,
/// lowercase, then collapse runs of whitespace and `-` into `_`.
pub fn sanitize_name(name: &str) -> String {
    let kept: String = name
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || *c == '-' || c.is_whitespace())
        .collect();

    let mut out = String::with_capacity(kept.len());
    let mut in_gap = false;
    for c in kept.trim().to_lowercase().chars() {
        if c == '-' || c.is_whitespace() {
            if !in_gap {
                out.push('_');
                in_gap = true;
            }
        } else {
            out.push(c);
            in_gap = false;
        }
    }
    out
}

/// Ticket-style ids keep their case; anything that could form a path is dropped.
fn file_stem(id: &str) -> String {
    id.chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect()
}

fn strip_header(content: &str) -> &str {
    if let Some(rest) = content.strip_prefix("---\n") {
        if let Some(end) = rest.find("---\n\n") {
            return &rest[end + "---\n\n".len()..];
        }
    }
    content
}

fn subdirectories(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut dirs = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(std::io::Error::from)?;
        if entry.file_type().is_dir() {
            dirs.push(entry.into_path());
        }
    }
    Ok(dirs)
}

fn remove_if_empty(dir: &Path) -> Result<()> {
    if dir.is_dir() && std::fs::read_dir(dir)?.next().is_none() {
        std::fs::remove_dir(dir)?;
        info!(path = %dir.display(), "removed empty directory");
    }
    Ok(())
}

fn dir_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
