//! Content type detection and text extraction
//!
//! [`ContentExtractor`] turns fetched bytes into normalized text. HTML runs
//! through an ordered cascade of [`ExtractionStrategy`] implementations; the
//! first one producing non-empty text wins and a panic in any strategy counts
//! as "no output". The cascade always ends with [`FallbackStrategy`], so HTML
//! extraction never fails. Other content types degrade to a decoded string or a
//! placeholder instead of an error.

pub mod decode;
pub mod detect;
pub mod html;
pub mod normalize;
pub mod selectors;
pub mod strategies;

pub use detect::detect_content_type;
pub use strategies::{
    ArticleStrategy, ExtractionStrategy, FallbackStrategy, MarkdownStrategy, Page,
    ReadabilityStrategy, StrategyOutput,
};

use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::{debug, warn};

use crate::models::{ContentMetadata, ContentType, ExtractedContent, FetchResult};

/// Placeholder used when a content type cannot be turned into text
pub fn placeholder_text(content_type: ContentType, size: usize) -> String {
    format!("[Content of type {content_type} ({size} bytes) - extraction not supported]")
}

/// Ordered extraction cascade
pub struct ContentExtractor {
    strategies: Vec<Box<dyn ExtractionStrategy>>,
    fallback: FallbackStrategy,
}

impl ContentExtractor {
    /// Article, readability and markdown stages, then the fallback
    pub fn new() -> Self {
        Self::with_strategies(vec![
            Box::new(ArticleStrategy),
            Box::new(ReadabilityStrategy::default()),
            Box::new(MarkdownStrategy),
        ])
    }

    /// Custom stages; the fallback stage is always appended
    pub fn with_strategies(strategies: Vec<Box<dyn ExtractionStrategy>>) -> Self {
        Self {
            strategies,
            fallback: FallbackStrategy,
        }
    }

    /// Stage names in the order they are tried
    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies
            .iter()
            .map(|s| s.name())
            .chain(std::iter::once(self.fallback.name()))
            .collect()
    }

    /// Extract text from fetched bytes, titling non-HTML content by file name
    pub fn extract_fetched(&self, fetched: &FetchResult) -> ExtractedContent {
        let mut content = self.extract(&fetched.bytes, fetched.content_type);
        if content.title.is_none() && fetched.content_type != ContentType::Html {
            content.title = Some(fetched.resource.file_name());
        }
        content
    }

    /// Extract text from raw bytes of a known content type. Never fails.
    pub fn extract(&self, bytes: &[u8], content_type: ContentType) -> ExtractedContent {
        match content_type {
            ContentType::Html => self.extract_html(&decode::decode_html(bytes)),
            ContentType::Text => ExtractedContent {
                title: None,
                text: decode::decode_text(bytes),
                metadata: file_metadata(content_type, bytes.len()),
                strategy: String::from("text"),
            },
            ContentType::Pdf => extract_pdf(bytes),
            ContentType::Doc | ContentType::Unknown => placeholder(content_type, bytes.len()),
        }
    }

    /// Run the HTML cascade
    pub fn extract_html(&self, html: &str) -> ExtractedContent {
        catch_unwind(AssertUnwindSafe(|| self.run_cascade(html))).unwrap_or_else(|_| {
            warn!("HTML parsing panicked; returning empty content");
            ExtractedContent {
                strategy: self.fallback.name().to_string(),
                ..ExtractedContent::default()
            }
        })
    }

    fn run_cascade(&self, html: &str) -> ExtractedContent {
        let page = Page::new(html);

        for strategy in &self.strategies {
            match catch_unwind(AssertUnwindSafe(|| strategy.extract(&page))) {
                Ok(output) if output.is_usable() => {
                    debug!(strategy = strategy.name(), "Extraction strategy produced text");
                    return finish(output, strategy.name(), &page);
                }
                Ok(_) => debug!(strategy = strategy.name(), "Extraction strategy produced no text"),
                Err(_) => warn!(strategy = strategy.name(), "Extraction strategy panicked"),
            }
        }

        let output = catch_unwind(AssertUnwindSafe(|| self.fallback.extract(&page)))
            .unwrap_or_else(|_| {
                warn!(strategy = self.fallback.name(), "Extraction strategy panicked");
                StrategyOutput::default()
            });
        finish(output, self.fallback.name(), &page)
    }
}

impl Default for ContentExtractor {
    fn default() -> Self {
        Self::new()
    }
}

/// Fill in title and metadata a strategy did not recover itself
fn finish(output: StrategyOutput, strategy: &str, page: &Page<'_>) -> ExtractedContent {
    let title = output
        .title
        .or_else(|| html::extract_title(&page.document));
    let metadata = if output.metadata == ContentMetadata::default() {
        html::extract_metadata(&page.document)
    } else {
        output.metadata
    };

    ExtractedContent {
        title,
        text: output.text,
        metadata,
        strategy: strategy.to_string(),
    }
}

fn file_metadata(content_type: ContentType, size: usize) -> ContentMetadata {
    ContentMetadata {
        file_type: Some(content_type.to_string()),
        size: Some(size),
        ..ContentMetadata::default()
    }
}

fn placeholder(content_type: ContentType, size: usize) -> ExtractedContent {
    ExtractedContent {
        title: None,
        text: placeholder_text(content_type, size),
        metadata: file_metadata(content_type, size),
        strategy: String::from("placeholder"),
    }
}

#[cfg(feature = "pdf")]
fn extract_pdf(bytes: &[u8]) -> ExtractedContent {
    let extracted = catch_unwind(AssertUnwindSafe(|| pdf_extract::extract_text_from_mem(bytes)));
    match extracted {
        Ok(Ok(text)) if normalize::has_text(&text) => ExtractedContent {
            title: None,
            text: normalize::normalize_text(&text),
            metadata: file_metadata(ContentType::Pdf, bytes.len()),
            strategy: String::from("pdf"),
        },
        Ok(Ok(_)) => placeholder(ContentType::Pdf, bytes.len()),
        Ok(Err(e)) => {
            debug!(error = %e, "PDF text extraction failed");
            placeholder(ContentType::Pdf, bytes.len())
        }
        Err(_) => {
            warn!("PDF text extraction panicked");
            placeholder(ContentType::Pdf, bytes.len())
        }
    }
}

#[cfg(not(feature = "pdf"))]
fn extract_pdf(bytes: &[u8]) -> ExtractedContent {
    placeholder(ContentType::Pdf, bytes.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hasher::{ContentHasher, HashAlgorithm};
    use crate::models::{FetchOutcome, Resource};

    struct PanickingStrategy;

    impl ExtractionStrategy for PanickingStrategy {
        fn name(&self) -> &'static str {
            "panicking"
        }

        fn extract(&self, _page: &Page<'_>) -> StrategyOutput {
            panic!("strategy blew up")
        }
    }

    struct EmptyStrategy;

    impl ExtractionStrategy for EmptyStrategy {
        fn name(&self) -> &'static str {
            "empty"
        }

        fn extract(&self, _page: &Page<'_>) -> StrategyOutput {
            StrategyOutput {
                text: "   \n ".to_string(),
                ..StrategyOutput::default()
            }
        }
    }

    #[test]
    fn test_default_cascade_order() {
        let extractor = ContentExtractor::new();
        assert_eq!(
            extractor.strategy_names(),
            vec!["article", "readability", "markdown", "fallback"]
        );
    }

    #[test]
    fn test_heading_only_page_yields_hello() {
        let extractor = ContentExtractor::new();
        let content = extractor.extract(
            b"<html><body><h1>Hello</h1></body></html>",
            ContentType::Html,
        );
        assert_eq!(content.text, "Hello");
    }

    #[test]
    fn test_panicking_and_empty_stages_fall_through() {
        let extractor = ContentExtractor::with_strategies(vec![
            Box::new(PanickingStrategy),
            Box::new(EmptyStrategy),
        ]);
        let content = extractor.extract(
            b"<html><head><title>T</title></head><body><p>Body text</p></body></html>",
            ContentType::Html,
        );
        assert_eq!(content.strategy, "fallback");
        assert!(content.text.contains("Body text"));
        assert_eq!(content.title.as_deref(), Some("T"));
    }

    #[test]
    fn test_escaped_and_literal_markup_hash_differently() {
        let extractor = ContentExtractor::new();
        let hasher = ContentHasher::new(HashAlgorithm::Sha256);

        let escaped = extractor.extract(
            b"<html><body><h1>Use &amp;lt;b&amp;gt; tags</h1></body></html>",
            ContentType::Html,
        );
        let literal = extractor.extract(
            b"<html><body><h1>Use &lt;b&gt; tags</h1></body></html>",
            ContentType::Html,
        );

        assert_eq!(escaped.text, "Use &lt;b&gt; tags");
        assert_eq!(literal.text, "Use <b> tags");
        assert_ne!(hasher.hash(&escaped.text), hasher.hash(&literal.text));
    }

    #[test]
    fn test_article_metadata_is_recovered() {
        let extractor = ContentExtractor::new();
        let html = br#"<html><head>
            <meta property="og:title" content="Quarterly outlook">
            <meta name="keywords" content="economy,outlook">
            </head><body><article><p>Growth is expected to slow.</p></article></body></html>"#;
        let content = extractor.extract(html, ContentType::Html);
        assert_eq!(content.strategy, "article");
        assert_eq!(content.title.as_deref(), Some("Quarterly outlook"));
        assert_eq!(content.metadata.keywords, vec!["economy", "outlook"]);
    }

    #[test]
    fn test_text_is_decoded_lossily() {
        let extractor = ContentExtractor::new();
        let content = extractor.extract(b"line one\n\xFFline two", ContentType::Text);
        assert_eq!(content.text, "line one\n\u{FFFD}line two");
        assert_eq!(content.metadata.file_type.as_deref(), Some("text"));
    }

    #[test]
    fn test_doc_and_unknown_get_placeholders() {
        let extractor = ContentExtractor::new();
        let content = extractor.extract(&[0xD0, 0xCF, 0x11, 0xE0], ContentType::Doc);
        assert_eq!(
            content.text,
            "[Content of type doc (4 bytes) - extraction not supported]"
        );
        assert_eq!(content.metadata.size, Some(4));

        let content = extractor.extract(&[1, 2, 3], ContentType::Unknown);
        assert!(content.text.contains("unknown"));
    }

    #[cfg(not(feature = "pdf"))]
    #[test]
    fn test_pdf_without_capability_is_placeholder() {
        let extractor = ContentExtractor::new();
        let content = extractor.extract(b"%PDF-1.4 rest", ContentType::Pdf);
        assert!(content.text.starts_with("[Content of type pdf"));
    }

    #[test]
    fn test_non_html_title_is_file_name() {
        let extractor = ContentExtractor::new();
        let fetched = FetchResult {
            resource: Resource::new("sftp://host/exports/data.csv"),
            bytes: b"a,b\n1,2\n".to_vec(),
            content_type: ContentType::Text,
            outcome: FetchOutcome::Success,
        };
        let content = extractor.extract_fetched(&fetched);
        assert_eq!(content.title.as_deref(), Some("data.csv"));
    }
}
