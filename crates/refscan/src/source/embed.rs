use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use super::document::DocumentSource;
use crate::extractor::{
    DocumentExtraction, ExtractorError, FailureReason, MediaReferenceExtractor, VideoInfo,
};
use crate::media::ResolvedReference;

/// Per-item result: either a non-empty reference list or an explicit empty marker with a reason.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum ItemResult {
    Found { references: Vec<ResolvedReference> },
    Empty { reason: FailureReason, detail: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemOutcome {
    pub url: String,
    #[serde(flatten)]
    pub result: ItemResult,
}

impl ItemOutcome {
    pub fn found(url: impl Into<String>, references: Vec<ResolvedReference>) -> Self {
        Self {
            url: url.into(),
            result: ItemResult::Found { references },
        }
    }

    pub fn empty(url: impl Into<String>, reason: FailureReason, detail: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            result: ItemResult::Empty {
                reason,
                detail: detail.into(),
            },
        }
    }

    pub fn from_error(url: impl Into<String>, error: &ExtractorError) -> Self {
        Self::empty(url, error.reason(), error.to_string())
    }

    pub fn is_success(&self) -> bool {
        matches!(self.result, ItemResult::Found { .. })
    }

    pub fn references(&self) -> &[ResolvedReference] {
        match &self.result {
            ItemResult::Found { references } => references,
            ItemResult::Empty { .. } => &[],
        }
    }

    pub fn reason(&self) -> Option<FailureReason> {
        match &self.result {
            ItemResult::Found { .. } => None,
            ItemResult::Empty { reason, .. } => Some(*reason),
        }
    }
}

/// An embed page after extraction.
#[derive(Debug, Clone, Serialize)]
pub struct EmbedPage {
    pub url: String,
    pub extraction: DocumentExtraction,
    pub video_info: VideoInfo,
}

/// Fetches embed player pages and runs the reference extractor on them.
pub struct EmbedExtractor {
    source: Arc<dyn DocumentSource>,
    extractor: MediaReferenceExtractor,
}

impl EmbedExtractor {
    pub fn new(source: Arc<dyn DocumentSource>) -> Self {
        Self::with_extractor(source, MediaReferenceExtractor::default())
    }

    pub fn with_extractor(source: Arc<dyn DocumentSource>, extractor: MediaReferenceExtractor) -> Self {
        Self { source, extractor }
    }

    /// Fetches `url` and analyses it without judging the result. Only fetch errors fail.
    pub async fn fetch_embed(
        &self,
        url: &str,
        referer: Option<&str>,
    ) -> Result<EmbedPage, ExtractorError> {
        let document = self.source.fetch(url, referer).await?;
        let extraction = self.extractor.extract_document(&document.body, &document.url);
        debug!(
            "{}: {} candidate(s), {} reference(s)",
            document.url,
            extraction.candidates,
            extraction.references.len()
        );
        Ok(EmbedPage {
            video_info: VideoInfo::parse(&document.body),
            url: document.url,
            extraction,
        })
    }

    /// Fetches `url` and returns its references. Empty results are errors carrying the reason.
    pub async fn extract_references(
        &self,
        url: &str,
        referer: Option<&str>,
    ) -> Result<Vec<ResolvedReference>, ExtractorError> {
        self.fetch_embed(url, referer).await?.extraction.into_result()
    }

    /// Like [`extract_references`](Self::extract_references) but never fails; errors become an
    /// empty outcome with a reason tag.
    pub async fn extract(&self, url: &str, referer: Option<&str>) -> ItemOutcome {
        match self.extract_references(url, referer).await {
            Ok(references) => ItemOutcome::found(url, references),
            Err(e) => {
                warn!("{} [{}]: {}", url, e.reason(), e);
                ItemOutcome::from_error(url, &e)
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::media::ReferenceKind;
    use crate::source::Document;
    use async_trait::async_trait;
    use rustc_hash::FxHashMap;

    /// Serves canned pages; unknown URLs fail with a 404.
    pub(crate) struct StaticSource {
        pages: FxHashMap<String, String>,
    }

    impl StaticSource {
        pub(crate) fn new(pages: &[(&str, &str)]) -> Self {
            Self {
                pages: pages
                    .iter()
                    .map(|(url, body)| (url.to_string(), body.to_string()))
                    .collect(),
            }
        }
    }

    #[async_trait]
    impl DocumentSource for StaticSource {
        async fn fetch(&self, url: &str, _referer: Option<&str>) -> Result<Document, ExtractorError> {
            self.pages
                .get(url)
                .map(|body| Document::new(url, body.clone()))
                .ok_or_else(|| ExtractorError::HttpStatus {
                    status: 404,
                    url: url.to_string(),
                })
        }
    }

    #[tokio::test]
    async fn test_extract_embed_page() {
        let source = StaticSource::new(&[(
            "https://vidlax.xyz/e/abc",
            r#"<script>jwplayer("p").setup({file:"/upload/5/hls/master.m3u8",tracks:[{"file":"../upload/5/subtitles/tr.vtt","label":"TR"}]});</script>"#,
        )]);
        let embed = EmbedExtractor::new(Arc::new(source));

        let outcome = embed.extract("https://vidlax.xyz/e/abc", None).await;
        assert!(outcome.is_success());
        let refs = outcome.references();
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0].kind, ReferenceKind::Manifest);
        assert_eq!(refs[0].absolute_url, "https://vidlax.xyz/upload/5/hls/master.m3u8");
        assert_eq!(refs[1].label.as_deref(), Some("TR"));
    }

    #[tokio::test]
    async fn test_fetch_embed_keeps_video_info() {
        let source = StaticSource::new(&[(
            "https://vidlax.xyz/e/7",
            r#"<script>var jwSetup = {title: "Ezel", description: "Bölüm 7"}; jwplayer("p").setup({file: "/upload/7/master.m3u8"});</script>"#,
        )]);
        let embed = EmbedExtractor::new(Arc::new(source));

        let page = embed.fetch_embed("https://vidlax.xyz/e/7", None).await.unwrap();
        assert_eq!(page.video_info.display_title("?"), "Ezel - Bölüm 7");
        assert_eq!(page.extraction.references.len(), 1);
        assert_eq!(page.extraction.empty_reason(), None);
    }

    #[tokio::test]
    async fn test_failures_carry_reason() {
        let source = StaticSource::new(&[("https://h/e/empty", "<html></html>")]);
        let embed = EmbedExtractor::new(Arc::new(source));

        let missing = embed.extract("https://h/e/missing", None).await;
        assert_eq!(missing.reason(), Some(FailureReason::Fetch));

        let empty = embed.extract("https://h/e/empty", None).await;
        assert_eq!(empty.reason(), Some(FailureReason::NotFound));
        assert!(empty.references().is_empty());
    }

    #[test]
    fn test_outcome_serialization() {
        let outcome = ItemOutcome::empty("https://h/e/1", FailureReason::Fetch, "timed out");
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["url"], "https://h/e/1");
        assert_eq!(json["status"], "empty");
        assert_eq!(json["reason"], "fetch");
    }
}
