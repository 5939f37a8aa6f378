//! HTML extraction strategies, from highest precision to last resort
//!
//! 1. [`ArticleStrategy`]: known article containers with boilerplate removed
//! 2. [`ReadabilityStrategy`]: the densest cluster of paragraph-like blocks
//! 3. [`MarkdownStrategy`]: markup-to-text conversion with link, image and
//!    emphasis markup removed
//! 4. [`FallbackStrategy`]: the whole page minus page furniture

use regex::Regex;
use scraper::{ElementRef, Html};
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::LazyLock;

use super::html::{block_text, extract_metadata, extract_title};
use super::normalize::{decode_entities, has_text, normalize_text, split_phrases, strip_tags};
use super::selectors::{fallback_noise, readability_blocks, ArticleSelectors};
use crate::models::ContentMetadata;

/// A parsed page handed to every strategy
pub struct Page<'a> {
    pub raw: &'a str,
    pub document: Html,
}

impl<'a> Page<'a> {
    pub fn new(raw: &'a str) -> Self {
        Self {
            raw,
            document: Html::parse_document(raw),
        }
    }
}

/// Output of one strategy
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StrategyOutput {
    pub text: String,
    pub title: Option<String>,
    pub metadata: ContentMetadata,
}

impl StrategyOutput {
    fn text_only(text: String) -> Self {
        Self {
            text,
            ..Self::default()
        }
    }

    /// Usable means non-empty after trimming
    pub fn is_usable(&self) -> bool {
        has_text(&self.text)
    }
}

/// One step of the extraction cascade
pub trait ExtractionStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn extract(&self, page: &Page<'_>) -> StrategyOutput;
}

// ============================================================================
// Article extraction
// ============================================================================

/// Known article containers with comments, ads and navigation stripped
#[derive(Debug, Default, Clone, Copy)]
pub struct ArticleStrategy;

impl ExtractionStrategy for ArticleStrategy {
    fn name(&self) -> &'static str {
        "article"
    }

    fn extract(&self, page: &Page<'_>) -> StrategyOutput {
        let selectors = ArticleSelectors::new();

        for selector in selectors.content {
            if let Some(element) = page.document.select(selector).next() {
                let text = normalize_text(&block_text(element, selectors.noise));
                if has_text(&text) {
                    return StrategyOutput {
                        text,
                        title: extract_title(&page.document),
                        metadata: extract_metadata(&page.document),
                    };
                }
            }
        }

        StrategyOutput::default()
    }
}

// ============================================================================
// Readability-style extraction
// ============================================================================

/// Scores paragraph-like blocks into their ancestors and keeps the best one
#[derive(Debug, Clone, Copy)]
pub struct ReadabilityStrategy {
    /// Blocks shorter than this many characters are ignored
    pub min_block_chars: usize,
}

impl Default for ReadabilityStrategy {
    fn default() -> Self {
        Self { min_block_chars: 25 }
    }
}

impl ReadabilityStrategy {
    fn block_score(text: &str) -> f64 {
        let chars = text.chars().count();
        let commas = text.matches(',').count();
        1.0 + commas as f64 + (chars as f64 / 100.0).min(3.0)
    }
}

fn add_score<K: Copy + Eq + Hash>(
    candidates: &mut Vec<(K, f64)>,
    index: &mut HashMap<K, usize>,
    id: K,
    score: f64,
) {
    let slot = *index.entry(id).or_insert_with(|| {
        candidates.push((id, 0.0));
        candidates.len() - 1
    });
    candidates[slot].1 += score;
}

impl ExtractionStrategy for ReadabilityStrategy {
    fn name(&self) -> &'static str {
        "readability"
    }

    fn extract(&self, page: &Page<'_>) -> StrategyOutput {
        let noise = ArticleSelectors::new().noise;
        let document = &page.document;

        // Candidates in document order so ties resolve deterministically.
        let mut candidates = Vec::new();
        let mut index = HashMap::new();

        for block in document.select(readability_blocks()) {
            let in_noise = block
                .ancestors()
                .filter_map(ElementRef::wrap)
                .any(|ancestor| noise.iter().any(|s| s.matches(&ancestor)));
            if in_noise {
                continue;
            }

            let text = block.text().collect::<String>();
            let text = text.trim();
            if text.chars().count() < self.min_block_chars {
                continue;
            }

            let score = Self::block_score(text);
            if let Some(parent) = block.parent().and_then(ElementRef::wrap) {
                add_score(&mut candidates, &mut index, parent.id(), score);
                if let Some(grandparent) = parent.parent().and_then(ElementRef::wrap) {
                    add_score(&mut candidates, &mut index, grandparent.id(), score / 2.0);
                }
            }
        }

        let mut best: Option<(_, f64)> = None;
        for (id, score) in candidates {
            if best.map_or(true, |(_, top)| score > top) {
                best = Some((id, score));
            }
        }

        let Some(element) = best
            .and_then(|(id, _)| document.tree.get(id))
            .and_then(ElementRef::wrap)
        else {
            return StrategyOutput::default();
        };

        StrategyOutput {
            text: normalize_text(&block_text(element, noise)),
            title: extract_title(document),
            metadata: extract_metadata(document),
        }
    }
}

// ============================================================================
// Markup-to-text conversion
// ============================================================================

static MD_IMAGE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"!\[[^\]]*\]\([^)]*\)").unwrap());

static MD_LINK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[([^\]]*)\]\([^)]*\)").unwrap());

static MD_LINK_DEF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t]*\[[^\]]+\]:[ \t]*\S+.*$").unwrap());

static MD_HEADING: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^[ \t]{0,3}#{1,6}[ \t]*").unwrap());

static MD_RULE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^[ \t]*(=+|-{2,}|\*{3,})[ \t]*$").unwrap());

static MD_FENCE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^[ \t]*```.*$").unwrap());

static MD_QUOTE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^[ \t]*>[ \t]?").unwrap());

static MD_EMPHASIS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\*{1,3}|_{2,3}|~~|`").unwrap());

static MD_UNDERSCORE_EMPHASIS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(^|[^\w])_([^_\n]+)_([^\w]|$)").unwrap());

static MD_ESCAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\\([\\`*_{}\[\]()#+\-.!>|])").unwrap());

/// Remove markdown markup, keeping paragraph breaks and link text
pub fn strip_markdown(markdown: &str) -> String {
    let text = MD_IMAGE.replace_all(markdown, "");
    let text = MD_LINK.replace_all(&text, "$1");
    let text = MD_LINK_DEF.replace_all(&text, "");
    let text = MD_FENCE.replace_all(&text, "");
    let text = MD_RULE.replace_all(&text, "");
    let text = MD_HEADING.replace_all(&text, "");
    let text = MD_QUOTE.replace_all(&text, "");
    let text = MD_UNDERSCORE_EMPHASIS.replace_all(&text, "$1$2$3");
    let text = MD_EMPHASIS.replace_all(&text, "");
    let text = MD_ESCAPE.replace_all(&text, "$1");
    strip_tags(&text)
}

/// Converts the page to markdown, then drops the markup
#[derive(Debug, Default, Clone, Copy)]
pub struct MarkdownStrategy;

impl ExtractionStrategy for MarkdownStrategy {
    fn name(&self) -> &'static str {
        "markdown"
    }

    fn extract(&self, page: &Page<'_>) -> StrategyOutput {
        // The rewriter passes text through raw, so entities are decoded here
        // once, after tags are gone.
        let markdown = html2md::rewrite_html(page.raw, false);
        let text = decode_entities(&strip_markdown(&markdown));
        StrategyOutput::text_only(normalize_text(&text))
    }
}

// ============================================================================
// Fallback
// ============================================================================

/// Whole-page text minus script, style and page furniture.
///
/// Always returns a string, possibly empty.
#[derive(Debug, Default, Clone, Copy)]
pub struct FallbackStrategy;

impl ExtractionStrategy for FallbackStrategy {
    fn name(&self) -> &'static str {
        "fallback"
    }

    fn extract(&self, page: &Page<'_>) -> StrategyOutput {
        let flattened = block_text(page.document.root_element(), fallback_noise());
        StrategyOutput::text_only(normalize_text(&split_phrases(&flattened)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ARTICLE_PAGE: &str = r#"<html><head><title>Policy statement</title>
        <meta name="author" content="Press Office"></head>
        <body>
          <nav>Home | About | Contact</nav>
          <article>
            <h1>Policy statement</h1>
            <p>The committee decided to maintain the target range.</p>
            <div class="share">Share on social media</div>
            <table><tr><td>Rate</td><td>5.25%</td></tr></table>
            <div id="comments">First comment!</div>
          </article>
          <footer>Copyright</footer>
        </body></html>"#;

    #[test]
    fn test_article_strategy_strips_boilerplate_keeps_tables() {
        let page = Page::new(ARTICLE_PAGE);
        let out = ArticleStrategy.extract(&page);

        assert!(out.is_usable());
        assert!(out.text.contains("maintain the target range"));
        assert!(out.text.contains("Rate 5.25%"));
        assert!(!out.text.contains("Share on social"));
        assert!(!out.text.contains("First comment"));
        assert!(!out.text.contains("Home | About"));
        assert_eq!(out.title.as_deref(), Some("Policy statement"));
        assert_eq!(out.metadata.authors, vec!["Press Office"]);
    }

    #[test]
    fn test_article_strategy_without_container_is_unusable() {
        let page = Page::new("<html><body><h1>Hello</h1></body></html>");
        assert!(!ArticleStrategy.extract(&page).is_usable());
    }

    #[test]
    fn test_readability_picks_densest_block() {
        let html = r#"<html><body>
            <div id="sidebar"><p>Short link</p></div>
            <div id="story">
              <p>Inflation data released on Tuesday showed prices rising, again, in most regions.</p>
              <p>Analysts said the figures, while elevated, were broadly in line with forecasts.</p>
            </div>
        </body></html>"#;
        let page = Page::new(html);
        let out = ReadabilityStrategy::default().extract(&page);

        assert!(out.text.contains("Inflation data released"));
        assert!(out.text.contains("Analysts said"));
        assert!(!out.text.contains("Short link"));
    }

    #[test]
    fn test_readability_ignores_tiny_pages() {
        let page = Page::new("<html><body><h1>Hello</h1></body></html>");
        assert!(!ReadabilityStrategy::default().extract(&page).is_usable());
    }

    #[test]
    fn test_strip_markdown() {
        let md = "# Heading\n\nSome **bold** and _italic_ text with a [link](http://x.test).\n\n![logo](logo.png)\n\nsnake_case_name stays";
        let text = strip_markdown(md);
        assert!(text.contains("Heading"));
        assert!(!text.contains('#'));
        assert!(text.contains("Some bold and italic text with a link."));
        assert!(!text.contains("logo.png"));
        assert!(!text.contains("http://x.test"));
        assert!(text.contains("snake_case_name stays"));
    }

    #[test]
    fn test_strip_markdown_setext_heading() {
        let text = strip_markdown("Hello\n=====\n");
        assert_eq!(text.trim(), "Hello");
    }

    #[test]
    fn test_markdown_strategy_heading_only_page() {
        let page = Page::new("<html><body><h1>Hello</h1></body></html>");
        let out = MarkdownStrategy.extract(&page);
        assert_eq!(out.text, "Hello");
    }

    #[test]
    fn test_markdown_strategy_decodes_entities_once() {
        let escaped = Page::new("<html><body><h1>Use &amp;lt;b&amp;gt; tags</h1></body></html>");
        let literal = Page::new("<html><body><h1>Use &lt;b&gt; tags</h1></body></html>");

        assert_eq!(MarkdownStrategy.extract(&escaped).text, "Use &lt;b&gt; tags");
        assert_eq!(MarkdownStrategy.extract(&literal).text, "Use <b> tags");
    }

    #[test]
    fn test_article_strategy_keeps_decoded_text() {
        let page = Page::new("<html><body><article><p>Fish &amp;amp; chips</p></article></body></html>");
        assert_eq!(ArticleStrategy.extract(&page).text, "Fish &amp; chips");
    }

    #[test]
    fn test_fallback_strips_page_furniture() {
        let html = r#"<html><body>
            <header>Site header</header>
            <script>track()</script>
            <div>Main   content   here</div>
            <footer>Footer</footer>
        </body></html>"#;
        let page = Page::new(html);
        let out = FallbackStrategy.extract(&page);
        assert_eq!(out.text, "Main\ncontent\nhere");
    }

    #[test]
    fn test_fallback_on_garbage_returns_string() {
        let page = Page::new("<<<>>><div><p></span>\u{0}\u{7}");
        let out = FallbackStrategy.extract(&page);
        assert!(!out.text.contains('\u{0}'));
    }
}
