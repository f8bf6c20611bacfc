use std::sync::LazyLock;

use regex::Regex;

use super::{Located, LocatorScanner, ScanPass};
use crate::media::{MediaReference, ReferenceKind};

// also matches JSON-escaped slashes (`https:\/\/host\/a.m3u8`)
static MANIFEST_URL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"https?:(?:\\?/){2}[^\s"'<>]+?(?:\.m3u8|/master\.txt)(?:\?[^\s"'<>\\]*)?"#)
        .unwrap()
});

/// Absolute manifest URLs appearing anywhere in the document.
pub struct ManifestUrlScanner;

impl LocatorScanner for ManifestUrlScanner {
    fn name(&self) -> &'static str {
        "manifest-url"
    }

    fn scan_pass(&self, text: &str) -> ScanPass {
        let located = MANIFEST_URL_REGEX
            .find_iter(text)
            .map(|m| {
                Located::new(
                    m.start(),
                    MediaReference::plain(ReferenceKind::Manifest, m.as_str()),
                )
            })
            .collect();
        ScanPass {
            located,
            rejected: Vec::new(),
        }
    }
}
