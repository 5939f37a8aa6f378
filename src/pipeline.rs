//! Single-resource check: fetch, extract, hash, diff and tag
//!
//! Both the scheduled cycle and the on-demand server go through
//! [`CheckPipeline::check`], so they cannot drift apart. The pipeline never
//! touches the State Store itself; callers pass the previous digest in and
//! decide what to persist.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::Config;
use crate::diff::is_changed;
use crate::entities::{build_tagger, EntityTagger};
use crate::error::Error;
use crate::fetcher::{fetch_resource, Fetch, ResourceFetcher};
use crate::hasher::{ContentHasher, HashAlgorithm};
use crate::metrics;
use crate::models::{
    ContentType, ExtractedContent, FetchOutcome, FetchResult, MatchedEntity, Resource,
};
use crate::parser::ContentExtractor;
use crate::utils::{longest_sentence, truncate_text};
use crate::utils::error::FetchError;

/// Longest summary returned with a check result
pub const SUMMARY_MAX_CHARS: usize = 300;

/// Result of a check that produced a digest
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckReport {
    pub resource: Resource,
    pub changed: bool,
    pub previous_digest: Option<String>,
    pub current_digest: String,
    pub algorithm: HashAlgorithm,
    pub title: Option<String>,
    pub content_type: ContentType,
    pub strategy: String,
    /// Populated only when the content changed
    pub entities: Vec<MatchedEntity>,
    pub summary: Option<String>,
    pub checked_at: DateTime<Utc>,
}

/// Result of a check that failed before a digest was computed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckFailure {
    pub resource: Resource,
    pub error: String,
    pub outcome: FetchOutcome,
    pub kind: &'static str,
    #[serde(skip)]
    pub transient: bool,
}

impl CheckFailure {
    fn from_fetch_error(resource: &Resource, err: &FetchError) -> Self {
        Self {
            resource: resource.clone(),
            error: err.to_string(),
            outcome: err.outcome(),
            kind: err.kind(),
            transient: err.is_transient(),
        }
    }
}

pub type CheckOutcome = Result<CheckReport, CheckFailure>;

/// Shared collaborators for checking resources
#[derive(Clone)]
pub struct CheckPipeline {
    fetcher: Arc<dyn Fetch>,
    extractor: Arc<ContentExtractor>,
    hasher: ContentHasher,
    tagger: Arc<dyn EntityTagger>,
}

impl CheckPipeline {
    pub fn new(
        fetcher: Arc<dyn Fetch>,
        extractor: Arc<ContentExtractor>,
        hasher: ContentHasher,
        tagger: Arc<dyn EntityTagger>,
    ) -> Self {
        Self {
            fetcher,
            extractor,
            hasher,
            tagger,
        }
    }

    /// Wire the default collaborators from configuration
    pub fn from_config(config: &Config) -> Result<Self, Error> {
        Self::from_config_until(config, CancellationToken::new())
    }

    /// Like [`from_config`](Self::from_config), with fetch retries abandoned
    /// once `cancel` fires
    pub fn from_config_until(config: &Config, cancel: CancellationToken) -> Result<Self, Error> {
        let fetcher = ResourceFetcher::new(&config.fetch)?.with_cancellation(cancel);
        let hasher = ContentHasher::from_config(&config.hashing)?;
        let extractor = ContentExtractor::new();
        debug!(strategies = ?extractor.strategy_names(), algorithm = %hasher.algorithm(), "Pipeline configured");

        Ok(Self::new(
            Arc::new(fetcher),
            Arc::new(extractor),
            hasher,
            build_tagger(&config.entities),
        ))
    }

    pub fn hasher(&self) -> &ContentHasher {
        &self.hasher
    }

    /// Check one resource against its previously stored digest
    pub async fn check(&self, resource: &Resource, previous_digest: Option<&str>) -> CheckOutcome {
        let fetched = match fetch_resource(self.fetcher.as_ref(), resource).await {
            Ok(fetched) => fetched,
            Err(e) => {
                warn!(resource = %resource, error = %e, kind = e.kind(), "Fetch failed");
                let failure = CheckFailure::from_fetch_error(resource, &e);
                metrics::record_fetch_failure(failure.outcome);
                return Err(failure);
            }
        };

        let content_type = fetched.content_type;
        let content = self.extract(fetched).await;
        let digest = self.hasher.digest(resource, &content.text);
        let changed = is_changed(previous_digest, &digest.hex);

        // Tagging is skipped for unchanged content
        let entities = if changed {
            self.tag(&content.text).await
        } else {
            Vec::new()
        };

        debug!(
            resource = %resource,
            changed,
            digest = %digest.hex,
            strategy = %content.strategy,
            entities = entities.len(),
            "Checked resource"
        );
        metrics::record_check(changed);

        Ok(CheckReport {
            resource: resource.clone(),
            changed,
            previous_digest: previous_digest.map(str::to_string),
            current_digest: digest.hex,
            algorithm: digest.algorithm,
            title: content.title,
            content_type,
            strategy: content.strategy,
            entities,
            summary: longest_sentence(&content.text)
                .map(|s| truncate_text(&s, SUMMARY_MAX_CHARS)),
            checked_at: digest.computed_at,
        })
    }

    async fn extract(&self, fetched: FetchResult) -> ExtractedContent {
        let extractor = Arc::clone(&self.extractor);
        let resource = fetched.resource.clone();

        tokio::task::spawn_blocking(move || extractor.extract_fetched(&fetched))
            .await
            .unwrap_or_else(|e| {
                warn!(resource = %resource, error = %e, "Extraction task failed");
                ExtractedContent::default()
            })
    }

    async fn tag(&self, text: &str) -> Vec<MatchedEntity> {
        let tagger = Arc::clone(&self.tagger);
        let text = text.to_string();

        tokio::task::spawn_blocking(move || tagger.tag(&text))
            .await
            .unwrap_or_else(|e| {
                warn!(error = %e, "Entity tagging task failed");
                Vec::new()
            })
    }
}
