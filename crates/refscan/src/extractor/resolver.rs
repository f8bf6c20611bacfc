//! Relative locator resolution as the embed hosts actually use it.
//!
//! This is deliberately not RFC 3986 resolution. Four cases exist and only a single leading
//! `../` is consumed; generic relative-URL semantics produce different URLs for real pages.

use std::sync::LazyLock;

use regex::Regex;

use crate::media::BaseContext;

static SCHEME_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z][a-zA-Z0-9+.\-]*://").unwrap());

impl BaseContext {
    /// Builds the base for a fetched document: the document URL without query, fragment and
    /// final path segment (`https://host/e/abc` becomes `https://host/e`).
    pub fn from_document_url(document_url: &str) -> Self {
        let url = strip_query(document_url);
        let origin = origin_of(url);
        let path = url[origin.len()..].trim_end_matches('/');

        match path.rsplit_once('/') {
            Some((parent, _)) => BaseContext::new(format!("{origin}{parent}")),
            None => BaseContext::new(origin),
        }
    }

    /// `scheme://host[:port]` of the base URL.
    pub fn origin(&self) -> String {
        origin_of(strip_query(self.base_url())).to_string()
    }
}

/// Resolves a decoded locator against the document base.
pub fn resolve(locator: &str, base: &BaseContext) -> String {
    let locator = unescape_slashes(locator.trim());
    let base_url = strip_query(base.base_url());

    if SCHEME_REGEX.is_match(&locator) {
        return locator;
    }

    // protocol-relative
    if locator.starts_with("//") {
        let scheme = base_url.split_once("://").map_or("https", |(s, _)| s);
        return format!("{scheme}:{locator}");
    }

    if let Some(rest) = locator.strip_prefix("../") {
        let origin = origin_of(base_url);
        let path = base_url[origin.len()..].trim_end_matches('/');
        let parent = path.rsplit_once('/').map_or("", |(parent, _)| parent);
        return format!("{origin}{parent}/{rest}");
    }

    if locator.starts_with('/') {
        return format!("{}{}", origin_of(base_url), locator);
    }

    if base_url.ends_with('/') {
        format!("{base_url}{locator}")
    } else {
        format!("{base_url}/{locator}")
    }
}

/// Replaces JSON/JS escaped slashes (`\/`) with plain ones.
pub fn unescape_slashes(locator: &str) -> String {
    locator.replace("\\/", "/")
}

fn strip_query(url: &str) -> &str {
    url.split(['?', '#']).next().unwrap_or(url)
}

fn origin_of(url: &str) -> &str {
    match url.find("://") {
        Some(i) => {
            let start = i + 3;
            let end = url[start..].find('/').map_or(url.len(), |j| start + j);
            &url[..end]
        }
        None => url.split('/').next().unwrap_or(url),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base(url: &str) -> BaseContext {
        BaseContext::new(url)
    }

    #[test]
    fn test_absolute_locator_is_identity() {
        let b = base("https://vidlax.xyz/e/abc");
        for locator in [
            "https://cdn.example.com/hls/master.m3u8",
            "http://1.2.3.4:8080/a/b.m3u8?token=xyz",
            "https://other.host/subs/en.vtt",
        ] {
            assert_eq!(resolve(locator, &b), locator);
        }
    }

    #[test]
    fn test_absolute_locator_unescapes_slashes() {
        let b = base("https://vidlax.xyz/e/abc");
        assert_eq!(
            resolve(r"https:\/\/cdn.example.com\/hls\/index.m3u8", &b),
            "https://cdn.example.com/hls/index.m3u8"
        );
    }

    #[test]
    fn test_root_relative_uses_origin_only() {
        for b in [
            "https://h.example",
            "https://h.example/",
            "https://h.example/a",
            "https://h.example/a/b/c/d/e?x=1",
        ] {
            assert_eq!(
                resolve("/upload/1/master.m3u8", &base(b)),
                "https://h.example/upload/1/master.m3u8"
            );
        }
        assert_eq!(
            resolve("/x.vtt", &base("http://h.example:8080/a/b")),
            "http://h.example:8080/x.vtt"
        );
    }

    #[test]
    fn test_parent_relative_drops_exactly_one_segment() {
        assert_eq!(resolve("../x", &base("https://h/a/b/c")), "https://h/a/b/x");
        // only one hop is consumed, the second stays in the path
        assert_eq!(
            resolve("../../x", &base("https://h/a/b/c")),
            "https://h/a/b/../x"
        );
        assert_eq!(resolve("../x", &base("https://h/a")), "https://h/x");
        assert_eq!(resolve("../x", &base("https://h")), "https://h/x");
    }

    #[test]
    fn test_plain_relative_appends_to_base() {
        assert_eq!(
            resolve("sub/en.vtt", &base("https://h/e/")),
            "https://h/e/sub/en.vtt"
        );
        assert_eq!(
            resolve("sub/en.vtt", &base("https://h/e")),
            "https://h/e/sub/en.vtt"
        );
    }

    #[test]
    fn test_protocol_relative_takes_base_scheme() {
        assert_eq!(
            resolve("//cdn.h/a.m3u8", &base("http://h/e/abc")),
            "http://cdn.h/a.m3u8"
        );
    }

    #[test]
    fn test_document_base_drops_final_segment() {
        assert_eq!(
            BaseContext::from_document_url("https://vidlax.xyz/e/abc").base_url(),
            "https://vidlax.xyz/e"
        );
        assert_eq!(
            BaseContext::from_document_url("https://vidlax.xyz/e/abc/?autoplay=1").base_url(),
            "https://vidlax.xyz/e"
        );
        assert_eq!(
            BaseContext::from_document_url("https://vidlax.xyz").base_url(),
            "https://vidlax.xyz"
        );
    }

    #[test]
    fn test_origin() {
        assert_eq!(
            base("https://vctplay.site/video/abc?x=1").origin(),
            "https://vctplay.site"
        );
    }
}
