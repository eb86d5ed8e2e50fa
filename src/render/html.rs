// src/render/html.rs
// =============================================================================
// Pulls the visible text and the hyperlinks out of an HTML page.
//
// We use the `scraper` crate to parse the page and CSS selectors to find the
// <body> and every <a href>. Relative links are resolved against the page URL
// with the `url` crate, the same way a browser would.
// =============================================================================

use scraper::{ElementRef, Html, Selector};
use url::Url;

use super::PageContent;
use crate::error::FetchError;

// Elements whose contents never show up as page text
const HIDDEN_TAGS: &[&str] = &["script", "style", "noscript", "template"];

// Elements that start a new line of text, so their words never run together
const BLOCK_TAGS: &[&str] = &[
    "address", "article", "aside", "blockquote", "br", "dd", "div", "dl", "dt",
    "fieldset", "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4",
    "h5", "h6", "header", "hr", "li", "main", "nav", "ol", "p", "pre", "section",
    "table", "td", "th", "tr", "ul",
];

// Link targets that don't lead to another page
const SKIPPED_PREFIXES: &[&str] = &["javascript:", "mailto:", "tel:", "data:"];

/// Extracts body text and absolute link targets from `html`.
///
/// `base_url` is the URL the page was served from and is used to resolve
/// relative hrefs. Fails only when the document has no <body>.
pub fn extract_page(html: &str, base_url: &Url) -> Result<PageContent, FetchError> {
    let document = Html::parse_document(html);

    let body_selector = selector("body")?;
    let body = document
        .select(&body_selector)
        .next()
        .ok_or_else(|| FetchError::Render("page has no <body>".to_string()))?;

    let mut raw = String::new();
    collect_text(body, &mut raw);
    let text = raw.split_whitespace().collect::<Vec<_>>().join(" ");

    let link_selector = selector("a[href]")?;
    let links = document
        .select(&link_selector)
        .filter_map(|element| element.value().attr("href"))
        .filter_map(|href| resolve_url(base_url, href))
        .collect();

    Ok(PageContent { text, links })
}

fn selector(css: &str) -> Result<Selector, FetchError> {
    Selector::parse(css).map_err(|e| FetchError::Render(format!("bad selector '{css}': {e}")))
}

// Appends text nodes as-is, so inline markup like <b>Kay</b>ako stays one
// word. Block elements are padded with newlines instead.
fn collect_text(element: ElementRef, out: &mut String) {
    for child in element.children() {
        if let Some(child_element) = ElementRef::wrap(child) {
            let name = child_element.value().name();
            if HIDDEN_TAGS.contains(&name) {
                continue;
            }

            let is_block = BLOCK_TAGS.contains(&name);
            if is_block {
                out.push('\n');
            }
            collect_text(child_element, out);
            if is_block {
                out.push('\n');
            }
        } else if let Some(text) = child.value().as_text() {
            out.push_str(text);
        }
    }
}

// Resolves a possibly-relative href to an absolute URL
//
// Examples (base = "https://example.com/docs/"):
//   "/about"            -> Some("https://example.com/about")
//   "guide"             -> Some("https://example.com/docs/guide")
//   "https://other.com" -> Some("https://other.com/")
//   "mailto:hi@x.com"   -> None
fn resolve_url(base: &Url, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }

    let lowered = href.to_lowercase();
    if SKIPPED_PREFIXES.iter().any(|prefix| lowered.starts_with(prefix)) {
        return None;
    }

    base.join(href).ok().map(|url| url.to_string())
}
