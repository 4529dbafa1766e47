//! Documentation link extraction from raw HTML.
//!
//! Deliberately regex-based rather than a real HTML parse: several
//! independent textual patterns are unioned and their candidates pushed
//! through one normalization pipeline. Attributes match in either quote
//! style, case-insensitively. Good enough to find sub-pages on a docs
//! site, cheap enough to run on every root-page fetch.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

static HREF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)href=["']([^"']+)["']"#).unwrap());
static ANCHOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)<a[^>]+href=["']([^"']+)["'][^>]*>"#).unwrap());
static DATA_HREF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)data-href=["']([^"']+)["']"#).unwrap());
static CSS_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)url\(["']?([^"')]+)["']?\)"#).unwrap());

/// Trailing suffix that reads as a file extension, e.g. `.html` or `.woff2`.
static FILE_SUFFIX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\.[a-z0-9]+$").unwrap());

/// Extract candidate documentation links from `html`, resolved against
/// `base_url` (no trailing slash).
///
/// Candidates on a different host are dropped, fragments are stripped, and
/// trailing slashes are normalized to exactly one unless the path ends in a
/// file-extension-like suffix. The result is deduplicated in first-seen
/// order, which makes the output deterministic for a given input.
pub fn extract_links(html: &str, base_url: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for pattern in [&HREF, &ANCHOR, &DATA_HREF, &CSS_URL] {
        for caps in pattern.captures_iter(html) {
            if let Some(url) = normalize(&caps[1], base_url) {
                if seen.insert(url.clone()) {
                    links.push(url);
                }
            }
        }
    }

    links
}

fn normalize(raw: &str, base: &str) -> Option<String> {
    let link = raw.trim();
    if link.is_empty() || link == "#" {
        return None;
    }
    if link.starts_with("mailto:") || link.starts_with("tel:") {
        return None;
    }

    let mut url = if link.starts_with("http://") || link.starts_with("https://") {
        if !same_host(link, base) {
            return None;
        }
        link.to_string()
    } else if let Some(rest) = link.strip_prefix('/') {
        format!("{}/{}", origin(base)?, rest)
    } else if let Some(rest) = link.strip_prefix("./") {
        format!("{base}/{rest}")
    } else {
        format!("{base}/{link}")
    };

    if let Some(pos) = url.find('#') {
        url.truncate(pos);
    }

    // Collapse trailing slashes, then re-append exactly one for page-like
    // paths so equivalent spellings land on one key.
    let mut url = url.trim_end_matches('/').to_string();
    if !FILE_SUFFIX.is_match(&url) {
        url.push('/');
    }

    Some(url)
}

/// `host[:port]` part of an absolute http(s) URL.
fn authority(url: &str) -> Option<&str> {
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))?;
    let end = rest
        .find(|c| c == '/' || c == '?' || c == '#')
        .unwrap_or(rest.len());
    let auth = &rest[..end];
    (!auth.is_empty()).then_some(auth)
}

fn same_host(link: &str, base: &str) -> bool {
    match (authority(link), authority(base)) {
        (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
        _ => false,
    }
}

/// `scheme://host[:port]` of `base`, without a trailing slash.
fn origin(base: &str) -> Option<&str> {
    let auth = authority(base)?;
    let scheme_len = base.find("://")? + 3;
    Some(&base[..scheme_len + auth.len()])
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://x.io";

    #[test]
    fn root_relative_link_resolves_with_trailing_slash() {
        let links = extract_links(r#"<a href="/docs/start">Start</a>"#, BASE);
        assert_eq!(links, vec!["https://x.io/docs/start/"]);
    }

    #[test]
    fn cross_host_links_are_dropped() {
        let links = extract_links(r#"<a href="https://other.io/x">x</a>"#, BASE);
        assert!(links.is_empty());
    }

    #[test]
    fn bare_fragment_is_dropped() {
        let links = extract_links(r##"<a href="#">top</a>"##, BASE);
        assert!(links.is_empty());
    }

    #[test]
    fn mailto_and_tel_are_dropped() {
        let html = r#"<a href="mailto:team@x.io">mail</a><a href="tel:+123">call</a>"#;
        assert!(extract_links(html, BASE).is_empty());
    }

    #[test]
    fn same_host_absolute_is_kept() {
        let links = extract_links(r#"<a href="https://x.io/api/config.html">api</a>"#, BASE);
        assert_eq!(links, vec!["https://x.io/api/config.html"]);
    }

    #[test]
    fn single_quoted_href_is_matched() {
        let links = extract_links(r#"<a href='/docs/start'>Start</a>"#, BASE);
        assert_eq!(links, vec!["https://x.io/docs/start/"]);
    }

    #[test]
    fn attribute_case_is_ignored() {
        let html = r#"<A HREF="/api/">api</A><style>.hero{background:URL('/hero.jpg')}</style>"#;
        let links = extract_links(html, BASE);
        assert_eq!(links, vec!["https://x.io/api/", "https://x.io/hero.jpg"]);
    }

    #[test]
    fn dot_relative_resolves_against_base() {
        let links = extract_links(
            r#"<a href="./modules">mod</a>"#,
            "https://x.io/docs/harmony",
        );
        assert_eq!(links, vec!["https://x.io/docs/harmony/modules/"]);
    }

    #[test]
    fn fragment_is_stripped_before_slash_normalization() {
        let links = extract_links(r#"<a href="/docs/install#quick">i</a>"#, BASE);
        assert_eq!(links, vec!["https://x.io/docs/install/"]);
    }

    #[test]
    fn repeated_trailing_slashes_collapse_to_one() {
        let links = extract_links(r#"<a href="/docs///">d</a>"#, BASE);
        assert_eq!(links, vec!["https://x.io/docs/"]);
    }

    #[test]
    fn css_url_references_are_found() {
        let links = extract_links(r#"<style>body{background:url('/assets/bg.png')}</style>"#, BASE);
        assert_eq!(links, vec!["https://x.io/assets/bg.png"]);
    }

    #[test]
    fn duplicates_across_patterns_collapse() {
        // data-href is matched by both the plain and the data patterns.
        let html = r#"<a data-href="/guide">g</a><a href="/guide">g</a>"#;
        let links = extract_links(html, BASE);
        assert_eq!(links, vec!["https://x.io/guide/"]);
    }

    #[test]
    fn first_seen_order_is_preserved() {
        let html = r#"<a href="/b">b</a><a href="/a">a</a><a href="/b">again</a>"#;
        let links = extract_links(html, BASE);
        assert_eq!(links, vec!["https://x.io/b/", "https://x.io/a/"]);
    }
}
