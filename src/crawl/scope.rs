// src/crawl/scope.rs
// =============================================================================
// Decides which discovered links are worth crawling.
//
// A link is in scope when:
// 1. Its host is the target domain (a leading "www." is ignored on both sides)
//    and its scheme, if any, is http, https or ftp
// 2. Its path has at most two segments (keeps the crawl near the homepage)
// 3. It doesn't point at a document, image or media file
// 4. It has no "#fragment" (anchors are the same page again)
//
// The filter never fails: anything it can't parse is simply out of scope.
// =============================================================================

use url::Url;

// Deepest path we follow, e.g. /blog/some-post
const MAX_PATH_SEGMENTS: usize = 2;

// Files that carry no crawlable text
const ASSET_EXTENSIONS: &[&str] = &[
    "pdf", "doc", "docx", "xls", "xlsx", "ppt", "pptx",
    "jpg", "jpeg", "png", "gif", "bmp", "svg",
    "mp4", "mov", "avi", "mp3", "wav", "ogg",
];

const ALLOWED_SCHEMES: &[&str] = &["http", "https", "ftp"];

/// Same-site, near-homepage, text-only link filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeFilter {
    domain: String,
}

impl ScopeFilter {
    /// Creates a filter for `domain`, e.g. "example.com" or "www.example.com".
    pub fn new(domain: &str) -> Self {
        Self {
            domain: normalize_host(domain),
        }
    }

    /// Builds a filter whose target domain is the host of `seed_url`.
    ///
    /// Returns None if the seed has no host.
    pub fn for_seed(seed_url: &str) -> Option<Self> {
        let url = parse_candidate(seed_url.trim())?;
        let host = url.host_str()?;
        Some(Self::new(host))
    }

    /// The normalized target domain (lowercase, no "www.").
    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn is_in_scope(&self, candidate: &str) -> bool {
        let candidate = candidate.trim();

        // Rule 4 first: any fragment, even an empty one, rules the link out
        if candidate.is_empty() || candidate.contains('#') {
            return false;
        }

        let url = match parse_candidate(candidate) {
            Some(url) => url,
            None => return false,
        };

        if !ALLOWED_SCHEMES.contains(&url.scheme()) {
            return false;
        }

        match url.host_str() {
            Some(host) if normalize_host(host) == self.domain => {}
            _ => return false,
        }

        let segments: Vec<&str> = match url.path_segments() {
            Some(segments) => segments.filter(|s| !s.is_empty()).collect(),
            None => return false,
        };

        if segments.len() > MAX_PATH_SEGMENTS {
            return false;
        }

        match segments.last() {
            Some(last) => !is_asset(last),
            None => true,
        }
    }
}

// Parses a candidate link, reading a scheme-less "example.com/about" as http.
fn parse_candidate(candidate: &str) -> Option<Url> {
    match Url::parse(candidate) {
        Ok(url) => Some(url),
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            Url::parse(&format!("http://{candidate}")).ok()
        }
        Err(_) => None,
    }
}

fn normalize_host(host: &str) -> String {
    let host = host.trim().trim_end_matches('.').to_lowercase();
    match host.strip_prefix("www.") {
        Some(rest) => rest.to_string(),
        None => host,
    }
}

fn is_asset(segment: &str) -> bool {
    match segment.rsplit_once('.') {
        Some((_, extension)) => {
            let extension = extension.to_lowercase();
            ASSET_EXTENSIONS.contains(&extension.as_str())
        }
        None => false,
    }
}
