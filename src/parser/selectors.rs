//! CSS selectors used by the extraction strategies
//!
//! Content selectors are ordered from most to least specific. Metadata
//! selectors may name an attribute to read instead of the element text.

use lazy_static::lazy_static;
use scraper::Selector;

// Helper macro to parse selectors safely at compile time
macro_rules! parse_selector {
    ($s:expr) => {
        Selector::parse($s).expect(concat!("Invalid CSS selector: ", $s))
    };
}

macro_rules! meta_selector {
    ($s:expr, $attr:expr) => {
        MetaSelector {
            selector: parse_selector!($s),
            attr: Some($attr),
        }
    };
    ($s:expr) => {
        MetaSelector {
            selector: parse_selector!($s),
            attr: None,
        }
    };
}

/// Selector whose value is either an attribute or the element text
pub struct MetaSelector {
    pub selector: Selector,
    pub attr: Option<&'static str>,
}

lazy_static! {
    // Main article containers
    static ref ARTICLE_CONTENT: Vec<Selector> = vec![
        parse_selector!("[itemprop='articleBody']"),
        parse_selector!("article"),
        parse_selector!("[role='main']"),
        parse_selector!("main"),
        parse_selector!(".entry-content"),
        parse_selector!(".post-content"),
        parse_selector!(".article-body"),
        parse_selector!(".article-content"),
        parse_selector!("#article"),
        parse_selector!("#content"),
    ];

    static ref TITLE: Vec<MetaSelector> = vec![
        meta_selector!("meta[property='og:title']", "content"),
        meta_selector!("meta[name='twitter:title']", "content"),
        meta_selector!("title"),
        meta_selector!("h1"),
    ];

    static ref AUTHOR: Vec<MetaSelector> = vec![
        meta_selector!("meta[name='author']", "content"),
        meta_selector!("meta[property='article:author']", "content"),
        meta_selector!("[itemprop='author'] [itemprop='name']"),
        meta_selector!("[rel='author']"),
        meta_selector!(".byline"),
    ];

    static ref PUBLISH_DATE: Vec<MetaSelector> = vec![
        meta_selector!("meta[property='article:published_time']", "content"),
        meta_selector!("meta[itemprop='datePublished']", "content"),
        meta_selector!("meta[name='date']", "content"),
        meta_selector!("meta[name='pubdate']", "content"),
        meta_selector!("time[datetime]", "datetime"),
    ];

    static ref KEYWORDS: Vec<MetaSelector> = vec![
        meta_selector!("meta[name='keywords']", "content"),
        meta_selector!("meta[name='news_keywords']", "content"),
        meta_selector!("meta[property='article:tag']", "content"),
    ];

    // Boilerplate dropped by article extraction; tables are kept
    static ref ARTICLE_NOISE: Vec<Selector> = vec![
        parse_selector!("script"),
        parse_selector!("style"),
        parse_selector!("noscript"),
        parse_selector!("template"),
        parse_selector!("iframe"),
        parse_selector!("svg"),
        parse_selector!("form"),
        parse_selector!("button"),
        parse_selector!("nav"),
        parse_selector!("aside"),
        parse_selector!("figure"),
        parse_selector!("#comments"),
        parse_selector!(".comments"),
        parse_selector!("[class*='comment-']"),
        parse_selector!(".advert"),
        parse_selector!(".advertisement"),
        parse_selector!(".ad"),
        parse_selector!(".ads"),
        parse_selector!("[id^='ad-']"),
        parse_selector!(".share"),
        parse_selector!(".social"),
        parse_selector!(".related"),
        parse_selector!("[aria-hidden='true']"),
    ];

    // Page furniture dropped by the final fallback
    static ref FALLBACK_NOISE: Vec<Selector> = vec![
        parse_selector!("script"),
        parse_selector!("style"),
        parse_selector!("nav"),
        parse_selector!("header"),
        parse_selector!("footer"),
        parse_selector!("aside"),
    ];

    // Blocks scored by readability extraction
    static ref READABILITY_BLOCKS: Selector = parse_selector!("p, pre, td, blockquote, li");
}

/// Selectors for article-oriented extraction
pub struct ArticleSelectors {
    pub content: &'static [Selector],
    pub noise: &'static [Selector],
}

impl ArticleSelectors {
    pub fn new() -> Self {
        Self {
            content: &ARTICLE_CONTENT,
            noise: &ARTICLE_NOISE,
        }
    }
}

impl Default for ArticleSelectors {
    fn default() -> Self {
        Self::new()
    }
}

/// Selectors for document metadata
pub struct MetadataSelectors {
    pub title: &'static [MetaSelector],
    pub author: &'static [MetaSelector],
    pub publish_date: &'static [MetaSelector],
    pub keywords: &'static [MetaSelector],
}

impl MetadataSelectors {
    pub fn new() -> Self {
        Self {
            title: &TITLE,
            author: &AUTHOR,
            publish_date: &PUBLISH_DATE,
            keywords: &KEYWORDS,
        }
    }
}

impl Default for MetadataSelectors {
    fn default() -> Self {
        Self::new()
    }
}

/// Noise removed by the last-resort extraction
pub fn fallback_noise() -> &'static [Selector] {
    &FALLBACK_NOISE
}

/// Block elements scored by readability extraction
pub fn readability_blocks() -> &'static Selector {
    &READABILITY_BLOCKS
}
