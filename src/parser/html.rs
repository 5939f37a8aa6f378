//! HTML text flattening and metadata helpers shared by the strategies

use scraper::node::Node;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;

use super::normalize::has_text;
use super::selectors::{MetaSelector, MetadataSelectors};
use crate::models::ContentMetadata;

const BLOCK_TAGS: &[&str] = &[
    "address", "article", "blockquote", "br", "caption", "dd", "details", "div", "dl", "dt",
    "fieldset", "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6",
    "header", "hr", "li", "main", "nav", "ol", "p", "pre", "section", "summary", "table",
    "tbody", "tfoot", "thead", "title", "tr", "ul",
];

fn is_block(name: &str) -> bool {
    BLOCK_TAGS.contains(&name)
}

/// Flatten an element to text, skipping subtrees matched by `noise`.
///
/// Block elements start a new line and table cells are tab separated. The
/// walk is iterative, so deeply nested markup cannot exhaust the stack.
pub fn block_text(root: ElementRef<'_>, noise: &[Selector]) -> String {
    let noise_ids: HashSet<_> = noise
        .iter()
        .flat_map(|selector| root.select(selector))
        .map(|el| el.id())
        .collect();

    let mut out = String::new();
    for node in root.descendants() {
        let skipped = noise_ids.contains(&node.id())
            || node
                .ancestors()
                .take_while(|a| a.id() != root.id())
                .any(|a| noise_ids.contains(&a.id()));
        if skipped {
            continue;
        }

        match node.value() {
            Node::Text(text) => {
                let after_block = node
                    .prev_sibling()
                    .and_then(|s| s.value().as_element().map(|e| is_block(e.name())))
                    .unwrap_or(false);
                if after_block {
                    out.push('\n');
                }
                out.push_str(text);
            }
            Node::Element(element) => {
                let name = element.name();
                if is_block(name) {
                    out.push('\n');
                } else if matches!(name, "td" | "th")
                    && node.prev_sibling().is_some_and(|s| s.value().is_element())
                {
                    out.push('\t');
                }
            }
            _ => {}
        }
    }
    out
}

/// First non-empty value among `selectors`
pub fn first_value(document: &Html, selectors: &[MetaSelector]) -> Option<String> {
    selectors.iter().find_map(|meta| {
        document.select(&meta.selector).find_map(|element| {
            let value = match meta.attr {
                Some(attr) => element.value().attr(attr).map(str::to_string),
                None => Some(element.text().collect::<String>()),
            }?;
            let value = value.split_whitespace().collect::<Vec<_>>().join(" ");
            has_text(&value).then_some(value)
        })
    })
}

/// All distinct non-empty values among `selectors`, in document order
pub fn all_values(document: &Html, selectors: &[MetaSelector]) -> Vec<String> {
    let mut values: Vec<String> = Vec::new();
    for meta in selectors {
        for element in document.select(&meta.selector) {
            let value = match meta.attr {
                Some(attr) => element.value().attr(attr).map(str::to_string),
                None => Some(element.text().collect::<String>()),
            };
            let Some(value) = value else { continue };
            let value = value.split_whitespace().collect::<Vec<_>>().join(" ");
            if has_text(&value) && !values.contains(&value) {
                values.push(value);
            }
        }
    }
    values
}

/// Best-effort page title
pub fn extract_title(document: &Html) -> Option<String> {
    first_value(document, MetadataSelectors::new().title)
}

/// Authors, publish date and keywords found in the page head or body
pub fn extract_metadata(document: &Html) -> ContentMetadata {
    let selectors = MetadataSelectors::new();

    let keywords = all_values(document, selectors.keywords)
        .iter()
        .flat_map(|value| value.split(','))
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
        .fold(Vec::new(), |mut acc: Vec<String>, k| {
            if !acc.contains(&k) {
                acc.push(k);
            }
            acc
        });

    ContentMetadata {
        authors: all_values(document, selectors.author),
        publish_date: first_value(document, selectors.publish_date),
        keywords,
        file_type: None,
        size: None,
    }
}
