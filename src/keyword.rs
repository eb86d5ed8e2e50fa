// src/keyword.rs
// Case-insensitive keyword counting over the aggregated crawl text.

/// Counts non-overlapping, case-insensitive occurrences of `keyword` in `text`.
///
/// An empty keyword matches nothing.
pub fn count_occurrences(text: &str, keyword: &str) -> usize {
    let keyword = keyword.trim();
    if keyword.is_empty() || text.is_empty() {
        return 0;
    }

    text.to_lowercase().matches(&keyword.to_lowercase()).count()
}
