//! Domain entity tagging
//!
//! The pipeline only needs [`EntityTagger::tag`]. Which tagger is active is
//! decided once at startup by [`build_tagger`].

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::EntitiesConfig;
use crate::models::{EntityKind, MatchedEntity};

/// Errors raised while loading reference data
#[derive(Error, Debug)]
pub enum TaggerError {
    #[error("Failed to read entity reference file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse entity reference file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Maps normalized text to matched domain entities
pub trait EntityTagger: Send + Sync {
    fn tag(&self, text: &str) -> Vec<MatchedEntity>;
}

/// Tagger that never matches anything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTagger;

impl EntityTagger for NoopTagger {
    fn tag(&self, _text: &str) -> Vec<MatchedEntity> {
        Vec::new()
    }
}

// ============================================================================
// Reference data
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonEntry {
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub organization: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationEntry {
    pub name: String,
    #[serde(default)]
    pub acronym: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicationEntry {
    pub name: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub publishing_body: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Reference dictionary of people, organizations and publications
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityReference {
    #[serde(default)]
    pub people: Vec<PersonEntry>,
    #[serde(default)]
    pub organizations: Vec<OrganizationEntry>,
    #[serde(default)]
    pub publications: Vec<PublicationEntry>,
}

impl EntityReference {
    pub fn from_file(path: &Path) -> Result<Self, TaggerError> {
        let content = std::fs::read_to_string(path).map_err(|source| TaggerError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| TaggerError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn len(&self) -> usize {
        self.people.len() + self.organizations.len() + self.publications.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ============================================================================
// Dictionary tagger
// ============================================================================

/// One searchable surface form
#[derive(Debug, Clone)]
struct Pattern {
    surface: String,
    kind: EntityKind,
    full_name: Option<String>,
    detail: Option<String>,
}

fn join_detail(parts: &[Option<&String>]) -> Option<String> {
    let joined = parts
        .iter()
        .flatten()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(", ");
    (!joined.is_empty()).then_some(joined)
}

/// Exact substring matcher over an [`EntityReference`].
///
/// People match by name then aliases, organizations by name or acronym and
/// publications by name or full name. Matches must sit on word boundaries and
/// a match inside a longer accepted match is dropped.
#[derive(Debug, Clone, Default)]
pub struct DictionaryTagger {
    patterns: Vec<Pattern>,
}

impl DictionaryTagger {
    pub fn new(reference: &EntityReference) -> Self {
        let mut patterns = Vec::new();

        for person in &reference.people {
            let detail = join_detail(&[person.title.as_ref(), person.organization.as_ref()]);
            for surface in std::iter::once(&person.name).chain(&person.aliases) {
                patterns.push(Pattern {
                    surface: surface.clone(),
                    kind: EntityKind::Person,
                    full_name: Some(person.name.clone()),
                    detail: detail.clone(),
                });
            }
        }

        for org in &reference.organizations {
            for surface in std::iter::once(&org.name).chain(org.acronym.as_ref()) {
                patterns.push(Pattern {
                    surface: surface.clone(),
                    kind: EntityKind::Organization,
                    full_name: Some(org.name.clone()),
                    detail: join_detail(&[org.description.as_ref()]),
                });
            }
        }

        for publication in &reference.publications {
            let full_name = publication
                .full_name
                .clone()
                .unwrap_or_else(|| publication.name.clone());
            for surface in std::iter::once(&publication.name).chain(publication.full_name.as_ref()) {
                patterns.push(Pattern {
                    surface: surface.clone(),
                    kind: EntityKind::Publication,
                    full_name: Some(full_name.clone()),
                    detail: join_detail(&[publication.publishing_body.as_ref()]),
                });
            }
        }

        patterns.retain(|p| !p.surface.trim().is_empty());
        Self { patterns }
    }

    pub fn from_file(path: &Path) -> Result<Self, TaggerError> {
        Ok(Self::new(&EntityReference::from_file(path)?))
    }

    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }
}

fn on_word_boundary(text: &str, start: usize, end: usize) -> bool {
    let before = text[..start].chars().next_back();
    let after = text[end..].chars().next();
    !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
}

impl EntityTagger for DictionaryTagger {
    fn tag(&self, text: &str) -> Vec<MatchedEntity> {
        // (start, end, pattern index); first-listed pattern wins on equal spans.
        let mut spans: Vec<(usize, usize, usize)> = Vec::new();
        for (idx, pattern) in self.patterns.iter().enumerate() {
            for (start, found) in text.match_indices(pattern.surface.as_str()) {
                let end = start + found.len();
                if on_word_boundary(text, start, end) {
                    spans.push((start, end, idx));
                }
            }
        }
        spans.sort_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(&a.1)).then(a.2.cmp(&b.2)));

        let mut accepted: Vec<(usize, usize, usize)> = Vec::new();
        for span in spans {
            let nested = accepted
                .iter()
                .any(|(start, end, _)| span.0 >= *start && span.1 <= *end);
            if !nested {
                accepted.push(span);
            }
        }

        let mut entities: Vec<MatchedEntity> = Vec::new();
        for (start, end, idx) in accepted {
            let pattern = &self.patterns[idx];
            let entity = MatchedEntity {
                text: text[start..end].to_string(),
                kind: pattern.kind,
                full_name: pattern.full_name.clone(),
                detail: pattern.detail.clone(),
            };
            if !entities.contains(&entity) {
                entities.push(entity);
            }
        }
        entities
    }
}

/// Choose the tagger variant for this process
pub fn build_tagger(config: &EntitiesConfig) -> Arc<dyn EntityTagger> {
    if !config.enabled {
        info!("Entity tagging disabled");
        return Arc::new(NoopTagger);
    }

    match EntityReference::from_file(&config.reference_file) {
        Ok(reference) => {
            info!(
                people = reference.people.len(),
                organizations = reference.organizations.len(),
                publications = reference.publications.len(),
                "Loaded entity reference data"
            );
            Arc::new(DictionaryTagger::new(&reference))
        }
        Err(e) => {
            warn!(error = %e, "Entity reference unavailable, tagging with an empty dictionary");
            Arc::new(DictionaryTagger::default())
        }
    }
}
