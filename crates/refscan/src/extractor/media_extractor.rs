use serde::Serialize;
use tracing::debug;

use super::aggregate::ReferenceSet;
use super::decoder::DecoderChain;
use super::error::{ExtractorError, FailureReason};
use super::resolver::resolve;
use super::scanners::{LocatorScanner, ScanPass, default_scanners, scan_document};
use crate::media::{BaseContext, MediaReference, ResolvedReference};

/// Locates, decodes and resolves manifest and subtitle references in one document.
///
/// Every scanner runs as its own pass and all passes are merged, in order, into one
/// [`ReferenceSet`]. Pass order only matters for which label survives on duplicates.
pub struct MediaReferenceExtractor {
    scanners: Vec<Box<dyn LocatorScanner>>,
    decoders: DecoderChain,
}

impl Default for MediaReferenceExtractor {
    fn default() -> Self {
        Self::new(default_scanners(), DecoderChain::default())
    }
}

/// Result of analysing one document.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DocumentExtraction {
    pub references: ReferenceSet,
    pub candidates: usize,
    pub decode_failures: usize,
}

impl DocumentExtraction {
    /// Empty results become an error carrying the reason: candidates that all failed to decode
    /// are reported as a decode failure, no candidates at all as not-found.
    pub fn into_result(self) -> Result<Vec<ResolvedReference>, ExtractorError> {
        if !self.references.is_empty() {
            return Ok(self.references.into_vec());
        }
        if self.decode_failures > 0 {
            Err(ExtractorError::Decode(format!(
                "{} candidate(s) failed to decode",
                self.decode_failures
            )))
        } else {
            Err(ExtractorError::NoReferencesFound)
        }
    }

    pub fn empty_reason(&self) -> Option<FailureReason> {
        match (self.references.is_empty(), self.decode_failures) {
            (false, _) => None,
            (true, 0) => Some(FailureReason::NotFound),
            (true, _) => Some(FailureReason::Decode),
        }
    }
}

impl MediaReferenceExtractor {
    pub fn new(scanners: Vec<Box<dyn LocatorScanner>>, decoders: DecoderChain) -> Self {
        Self { scanners, decoders }
    }

    /// Candidates in document order, before decoding.
    pub fn candidates(&self, text: &str) -> Vec<MediaReference> {
        scan_document(text, &self.scanners)
    }

    pub fn extract(&self, text: &str, base: &BaseContext) -> DocumentExtraction {
        let mut extraction = DocumentExtraction::default();

        for scanner in &self.scanners {
            let ScanPass { located, rejected } = scanner.scan_pass(text);
            let mut pass = ReferenceSet::new();
            let mut failures = rejected.len();

            for fragment in &rejected {
                debug!(
                    "pass {}: rejected {} fragment at {}: {}",
                    scanner.name(),
                    fragment.encoding,
                    fragment.offset,
                    fragment.fragment
                );
            }

            for candidate in &located {
                match self.decoders.decode(&candidate.reference) {
                    Some(decoded) => {
                        pass.insert(ResolvedReference::new(
                            candidate.reference.kind,
                            resolve(&decoded, base),
                            candidate.reference.label.clone(),
                        ));
                    }
                    None => failures += 1,
                }
            }

            debug!(
                "pass {}: {} candidate(s), {} resolved, {} decode failure(s)",
                scanner.name(),
                located.len(),
                pass.len(),
                failures
            );

            extraction.candidates += located.len();
            extraction.decode_failures += failures;
            extraction.references.merge(pass);
        }

        extraction
    }

    /// Extracts from a fetched page, resolving against the page's directory.
    pub fn extract_document(&self, text: &str, document_url: &str) -> DocumentExtraction {
        self.extract(text, &BaseContext::from_document_url(document_url))
    }

    /// Runs several documents (for example the inline scripts and the full page) against the same
    /// base and merges them in the given order.
    pub fn extract_all<'a, I>(&self, texts: I, base: &BaseContext) -> DocumentExtraction
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut merged = DocumentExtraction::default();
        for text in texts {
            let extraction = self.extract(text, base);
            merged.candidates += extraction.candidates;
            merged.decode_failures += extraction.decode_failures;
            merged.references.merge(extraction.references);
        }
        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::decoder::encode_hex_escaped;
    use crate::media::ReferenceKind;
    use base64::Engine;

    #[test]
    fn test_track_list_end_to_end() {
        let text = r#"<script>var p = jwplayer("v").setup({ tracks: [{"file":"../upload/5/subtitles/tr.vtt","label":"TR"}] });</script>"#;
        let refs = MediaReferenceExtractor::default()
            .extract_document(text, "https://vidlax.xyz/e/abc")
            .into_result()
            .unwrap();

        assert_eq!(
            refs,
            vec![ResolvedReference::new(
                ReferenceKind::Subtitle,
                "https://vidlax.xyz/upload/5/subtitles/tr.vtt",
                Some("TR".to_string()),
            )]
        );
    }

    #[test]
    fn test_mixed_encodings_are_merged() {
        let hex = encode_hex_escaped("/upload/9/subtitles/en.vtt");
        let b64 = base64::engine::general_purpose::STANDARD.encode("/upload/9/hls/master.m3u8");
        let text = format!(
            r#"var a = {{"file":"{hex}"}};
            var b = atob("{b64}");
            var c = "https://cdn.vidlax.xyz/upload/9/hls/master.m3u8";
            var d = {{ src: "/upload/9/hls/master.m3u8" }};"#
        );

        let extraction =
            MediaReferenceExtractor::default().extract_document(&text, "https://vidlax.xyz/e/9");
        let urls: Vec<_> = extraction
            .references
            .iter()
            .map(|r| (r.kind, r.absolute_url.as_str()))
            .collect();

        assert_eq!(
            urls,
            vec![
                (
                    ReferenceKind::Manifest,
                    "https://cdn.vidlax.xyz/upload/9/hls/master.m3u8"
                ),
                (
                    ReferenceKind::Manifest,
                    "https://vidlax.xyz/upload/9/hls/master.m3u8"
                ),
                (
                    ReferenceKind::Subtitle,
                    "https://vidlax.xyz/upload/9/subtitles/en.vtt"
                ),
            ]
        );
        assert_eq!(extraction.decode_failures, 0);
    }

    #[test]
    fn test_empty_document_is_not_found() {
        let extraction = MediaReferenceExtractor::default()
            .extract_document("<html><body>nothing</body></html>", "https://h/e/1");
        assert_eq!(extraction.empty_reason(), Some(FailureReason::NotFound));
        assert!(matches!(
            extraction.into_result(),
            Err(ExtractorError::NoReferencesFound)
        ));
    }

    #[test]
    fn test_malformed_fragments_report_decode() {
        let text = r#"<script>
            var a = { file: "\xff\xfe\xfd" };
            var b = { tracks: [{file: oops, ] };
            var c = atob("//79");
        </script>"#;
        let extraction =
            MediaReferenceExtractor::default().extract_document(text, "https://vidlax.xyz/e/1");
        assert!(extraction.references.is_empty());
        assert_eq!(extraction.decode_failures, 3);
        assert_eq!(extraction.empty_reason(), Some(FailureReason::Decode));
        assert!(matches!(
            extraction.into_result(),
            Err(ExtractorError::Decode(_))
        ));
    }

    #[test]
    fn test_extract_all_merges_sources() {
        let base = BaseContext::new("https://h/e");
        let extraction = MediaReferenceExtractor::default().extract_all(
            [
                r#"file: "/a/master.m3u8""#,
                r#"tracks: [{"file":"/a/master.m3u8"},{"file":"/a/tr.vtt","label":"TR"}]"#,
            ],
            &base,
        );
        assert_eq!(extraction.references.len(), 2);
        // the plain key pass and the track-list pass both see the second document
        assert_eq!(extraction.candidates, 5);
    }
}
