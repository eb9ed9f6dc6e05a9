//! Host extraction, URL normalization, and the phrase-match regex builder.
//! Grounded in `original_source/crawler/host.py` and `site_utils.py`.

use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};

/// Matches a leading `scheme://host` where host is one-or-more
/// dot-separated alphanumeric/hyphen labels (case-insensitive).
pub static HOST_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    RegexBuilder::new(r"^https?://([a-z0-9-]+\.){1,}[a-z0-9]+")
        .case_insensitive(true)
        .build()
        .expect("static host regex is valid")
});

/// Extracts the `scheme://host` prefix of a normalized absolute URL.
/// Panics only if called on a URL that doesn't start with the host
/// pattern at all — callers should normalize first.
pub fn get_host(url: &str) -> Option<String> {
    HOST_REGEX.find(url).map(|m| m.as_str().to_string())
}

/// Host with any leading scheme stripped; used as the favicon cache key.
pub fn host_key(host: &str) -> String {
    match host.find("//") {
        Some(idx) => host[idx + 2..].to_string(),
        None => host.to_string(),
    }
}

/// Strips a leading `//`, and prepends `http://` when no scheme is present.
pub fn normalize_url(url: &str) -> String {
    let url = url.strip_prefix("//").unwrap_or(url);

    if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        format!("http://{}", url)
    }
}

/// Resolves a possibly-relative icon/href target against a page's host:
/// `//x` -> `http://x`, `/x` -> `host + /x`, anything else passed through.
pub fn resolve_relative(target: &str, host: &str) -> String {
    if let Some(rest) = target.strip_prefix("//") {
        format!("http://{}", rest)
    } else if let Some(rest) = target.strip_prefix('/') {
        format!("{}/{}", host.trim_end_matches('/'), rest)
    } else {
        target.to_string()
    }
}

/// Builds a case-insensitive regex matching `phrase`, delimited on both
/// sides by a quote, paren, whitespace, or (on the trailing side) a
/// sentence-terminating/clause punctuation mark.
pub fn make_phrase_regex(phrase: &str) -> Result<Regex, regex::Error> {
    let escaped = regex::escape(phrase);
    let pattern = format!(r#"['"( ]{}[.,?!)'" ]"#, escaped);
    RegexBuilder::new(&pattern).case_insensitive(true).build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_extraction() {
        assert_eq!(
            get_host("http://example.com/foo/bar").as_deref(),
            Some("http://example.com")
        );
        assert_eq!(
            get_host("https://www.example.co/x").as_deref(),
            Some("https://www.example.co")
        );
        assert_eq!(get_host("not-a-url"), None);
    }

    #[test]
    fn host_key_strips_scheme() {
        assert_eq!(host_key("http://example.com"), "example.com");
        assert_eq!(host_key("https://www.a.test"), "www.a.test");
        assert_eq!(host_key("example.com"), "example.com");
    }

    #[test]
    fn normalize_variants() {
        assert_eq!(normalize_url("//example.com/x"), "http://example.com/x");
        assert_eq!(normalize_url("example.com/x"), "http://example.com/x");
        assert_eq!(
            normalize_url("https://example.com/x"),
            "https://example.com/x"
        );
    }

    #[test]
    fn resolve_relative_variants() {
        assert_eq!(
            resolve_relative("//cdn.test/icon.ico", "http://a.test"),
            "http://cdn.test/icon.ico"
        );
        assert_eq!(
            resolve_relative("/icon.ico", "http://a.test"),
            "http://a.test/icon.ico"
        );
        assert_eq!(
            resolve_relative("http://other.test/icon.ico", "http://a.test"),
            "http://other.test/icon.ico"
        );
    }

    #[test]
    fn phrase_regex_word_bounded() {
        let re = make_phrase_regex("error").unwrap();
        assert!(re.is_match("An error, yes"));
        assert!(re.is_match("(error)"));
        assert!(!re.is_match("errorHandler"));
        assert!(!re.is_match("errorHandlerless"));
    }
}
