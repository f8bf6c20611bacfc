use std::sync::LazyLock;

use regex::Regex;

use super::{Located, LocatorScanner, Rejected, ScanPass};
use crate::extractor::decoder::decode_hex_escaped;
use crate::media::{LocatorEncoding, MediaReference, ReferenceKind};

static PLAIN_VALUE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"["']?\b(?:file|source|src)["']?\s*[:=]\s*["']([^"'\s]+)["']"#).unwrap()
});

static HEX_VALUE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"["']?\b(?:file|source|src)["']?\s*[:=]\s*["']((?:\\x[0-9a-fA-F]{2})+)["']"#)
        .unwrap()
});

/// `file`/`source`/`src` key-value pairs whose value points at a manifest or subtitle.
///
/// The hex variant decodes the value to classify it but keeps the escaped text as the raw
/// locator. Hex values that do not decode are rejected; values that decode to something other
/// than media are ignored.
pub struct FileKeyScanner {
    encoding: LocatorEncoding,
}

impl FileKeyScanner {
    pub fn plain() -> Self {
        Self {
            encoding: LocatorEncoding::PlainText,
        }
    }

    pub fn hex() -> Self {
        Self {
            encoding: LocatorEncoding::HexEscaped,
        }
    }

    /// `Err` when the value is undecodable, `Ok(None)` when it is not a media locator.
    fn classify(&self, value: &str) -> Result<Option<ReferenceKind>, ()> {
        match self.encoding {
            LocatorEncoding::HexEscaped => decode_hex_escaped(value)
                .map(|decoded| ReferenceKind::from_locator(&decoded))
                .ok_or(()),
            _ => Ok(ReferenceKind::from_locator(value)),
        }
    }
}

impl LocatorScanner for FileKeyScanner {
    fn name(&self) -> &'static str {
        match self.encoding {
            LocatorEncoding::HexEscaped => "file-key-hex",
            _ => "file-key",
        }
    }

    fn scan_pass(&self, text: &str) -> ScanPass {
        let regex = match self.encoding {
            LocatorEncoding::HexEscaped => &HEX_VALUE_REGEX,
            _ => &PLAIN_VALUE_REGEX,
        };

        let mut pass = ScanPass::default();
        for caps in regex.captures_iter(text) {
            let (Some(whole), Some(value)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            match self.classify(value.as_str()) {
                Ok(Some(kind)) => pass.located.push(Located::new(
                    whole.start(),
                    MediaReference::new(kind, value.as_str(), self.encoding, None),
                )),
                Ok(None) => {}
                Err(()) => pass.rejected.push(Rejected::new(
                    whole.start(),
                    self.encoding,
                    value.as_str(),
                )),
            }
        }
        pass
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::decoder::encode_hex_escaped;

    #[test]
    fn test_plain_values() {
        let text = r#"jwplayer().setup({ file: "/hls/abc/master.m3u8", image: "/p.jpg" });
            var s = {"src":"../upload/5/subtitles/tr.vtt"};
            source = 'https://cdn.example.com/a.mp4';"#;
        let found = FileKeyScanner::plain().scan(text);
        let pairs: Vec<_> = found
            .iter()
            .map(|l| (l.reference.kind, l.reference.raw_locator.as_str()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                (ReferenceKind::Manifest, "/hls/abc/master.m3u8"),
                (ReferenceKind::Subtitle, "../upload/5/subtitles/tr.vtt"),
            ]
        );
    }

    #[test]
    fn test_hex_values() {
        let encoded = encode_hex_escaped("/upload/1/subtitles/en.vtt");
        let text = format!(r#"var conf = {{"file":"{encoded}"}};"#);
        let found = FileKeyScanner::hex().scan(&text);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].reference.kind, ReferenceKind::Subtitle);
        assert_eq!(found[0].reference.encoding, LocatorEncoding::HexEscaped);
        assert_eq!(found[0].reference.raw_locator, encoded);
    }

    #[test]
    fn test_undecodable_hex_is_rejected() {
        // decodes to invalid utf-8
        let text = r#"file: "\xff\xfe\xfd""#;
        let pass = FileKeyScanner::hex().scan_pass(text);
        assert!(pass.located.is_empty());
        assert_eq!(pass.rejected.len(), 1);
        assert_eq!(pass.rejected[0].fragment, r"\xff\xfe\xfd");
        assert_eq!(pass.rejected[0].encoding, LocatorEncoding::HexEscaped);
    }

    #[test]
    fn test_hex_non_media_is_ignored() {
        let encoded = encode_hex_escaped("/images/poster.jpg");
        let text = format!(r#"var conf = {{"src":"{encoded}"}};"#);
        assert_eq!(FileKeyScanner::hex().scan_pass(&text), ScanPass::default());
    }
}
