use std::sync::LazyLock;

use regex::Regex;

use super::{Located, LocatorScanner, Rejected, ScanPass};
use crate::extractor::decoder::{decode_base64_manifest, decode_base64_text};
use crate::media::{LocatorEncoding, MediaReference, ReferenceKind};

static DECODE_CALL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\b(?:atob|base64_decode|b64decode|decode)\s*\(\s*["']([A-Za-z0-9+/]+={0,2})["']"#)
        .unwrap()
});

// Any quoted literal of 20+ base64 characters. This net is intentionally loose and leans on the
// decode filter to throw away false positives; short encoded paths outside a decode call are
// missed.
static LONG_LITERAL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"["']([A-Za-z0-9+/]{20,}={0,2})["']"#).unwrap());

/// Base64 literals that decode to a manifest locator.
///
/// A literal handed to a decode call that is not valid base64 text is rejected. Loose long
/// literals that fail are just ignored.
pub struct Base64LiteralScanner;

impl LocatorScanner for Base64LiteralScanner {
    fn name(&self) -> &'static str {
        "base64-literal"
    }

    fn scan_pass(&self, text: &str) -> ScanPass {
        let mut pass = ScanPass::default();

        for (regex, in_decode_call) in [(&DECODE_CALL_REGEX, true), (&LONG_LITERAL_REGEX, false)] {
            for caps in regex.captures_iter(text) {
                let Some(literal) = caps.get(1) else {
                    continue;
                };
                if decode_base64_manifest(literal.as_str()).is_some() {
                    pass.located.push(Located::new(
                        literal.start(),
                        MediaReference::new(
                            ReferenceKind::Manifest,
                            literal.as_str(),
                            LocatorEncoding::Base64,
                            None,
                        ),
                    ));
                } else if in_decode_call && decode_base64_text(literal.as_str()).is_none() {
                    pass.rejected.push(Rejected::new(
                        literal.start(),
                        LocatorEncoding::Base64,
                        literal.as_str(),
                    ));
                }
            }
        }

        // both patterns usually hit the same literal
        pass.located.sort_by_key(|l| l.offset);
        pass.located.dedup_by(|a, b| a.offset == b.offset);
        pass
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine;

    fn encode(text: &str) -> String {
        base64::engine::general_purpose::STANDARD.encode(text)
    }

    #[test]
    fn test_decode_call_and_long_literal() {
        let short = encode("/a.m3u8");
        let long = encode("https://cdn.example.com/hls/master.m3u8");
        let text = format!(r#"var u = atob("{short}"); var v = '{long}';"#);

        let found = Base64LiteralScanner.scan(&text);
        let raws: Vec<_> = found.iter().map(|l| l.reference.raw_locator.clone()).collect();
        assert_eq!(raws, vec![short, long]);
        assert!(found.iter().all(|l| l.reference.kind == ReferenceKind::Manifest));
    }

    #[test]
    fn test_rejects_literals_without_manifest() {
        let text = format!(
            r#"var token = "{}"; var id = "aGVsbG8gd29ybGQgaGVsbG8gd29ybGQ=";"#,
            encode("this is not a playlist at all")
        );
        assert_eq!(Base64LiteralScanner.scan_pass(&text), ScanPass::default());
    }

    #[test]
    fn test_broken_decode_call_is_rejected() {
        // invalid utf-8 once decoded, and a length that is not a multiple of four
        let text = r#"var a = atob("//79"); var b = atob("abcde");"#;
        let pass = Base64LiteralScanner.scan_pass(text);
        assert!(pass.located.is_empty());
        let fragments: Vec<_> = pass.rejected.iter().map(|r| r.fragment.as_str()).collect();
        assert_eq!(fragments, vec!["//79", "abcde"]);
    }
}
