//! Regex-based anchor link extraction (spec non-goal: no generic HTML
//! parser). Grounded in `original_source/favicon.py`'s `link_regex` and
//! `crawler.py`'s `PageNode.load`.

use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};

use crate::host::get_host;

/// Matches `<a ... href=LINK ...>` anchors. `LINK` is optionally
/// scheme-prefixed, one-or-more dot-separated alphanumeric/hyphen labels,
/// and may carry a `/...` or `?...` tail terminated by a quote or space.
///
/// The `regex` crate doesn't support lookbehind, so the `.html` exclusion
/// (skip local anchors) is applied as a post-filter in
/// `extract_candidate_links` rather than baked into the pattern.
///
/// Known limitation (preserved for fidelity): this anchors on `<a ` with a
/// literal trailing space, so it misses `<a\thref=...>`.
pub static RAW_LINK_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    RegexBuilder::new(
        r#"<a [^>]*href=['"]?(?P<link>(https?://)?([a-z0-9-]+\.){1,}[a-z0-9]+((\?|/)[^'" ]*)?)['" ]"#,
    )
    .case_insensitive(true)
    .build()
    .expect("static raw link regex is valid")
});

/// Extracts the ordered list of candidate outbound links from page text.
pub fn extract_candidate_links(text: &str) -> Vec<String> {
    RAW_LINK_REGEX
        .captures_iter(text)
        .filter_map(|caps| caps.name("link").map(|m| m.as_str().to_string()))
        .filter(|link| !link.to_lowercase().ends_with(".html"))
        .collect()
}

/// Filters out links on the page's own host and de-duplicates, preserving
/// first-seen order.
pub fn filter_same_host_and_dedup(links: Vec<String>, page_host: &str) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let page_host_lower = page_host.to_lowercase();

    links
        .into_iter()
        .filter(|link| {
            let link_lower = link.to_lowercase();
            !link_lower.starts_with(&page_host_lower)
        })
        .filter(|link| seen.insert(link.clone()))
        .collect()
}

/// Convenience wrapper: extract, filter same-host, de-duplicate.
pub fn extract_links(text: &str, page_url: &str) -> Vec<String> {
    let candidates = extract_candidate_links(text);
    match get_host(page_url) {
        Some(host) => filter_same_host_and_dedup(candidates, &host),
        None => candidates,
    }
}
