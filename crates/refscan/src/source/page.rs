use std::sync::{Arc, LazyLock};

use regex::Regex;
use rustc_hash::FxHashSet;
use scraper::{Html, Selector};
use serde::Serialize;
use tracing::{debug, warn};

use super::document::DocumentSource;
use super::embed::{EmbedExtractor, ItemOutcome, ItemResult};
use crate::extractor::{
    DocumentExtraction, ExtractorError, FailureReason, MediaReferenceExtractor, VideoInfo,
};
use crate::media::{BaseContext, ReferenceKind, ResolvedReference};

/// Hosts whose quoted URLs in page scripts are treated as embed players.
pub const DEFAULT_EMBED_HOSTS: &[&str] = &["vidlax.xyz"];

static SCRIPT: LazyLock<Selector> = LazyLock::new(|| Selector::parse("script").unwrap());
static VIDEO_URL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"videoUrl\s*=\s*["']([^"']+)["']"#).unwrap());
static QUOTED_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"["']([^"'\s]+)["']"#).unwrap());

/// Everything found for one episode or film page: its own scripts and markup plus every embed
/// player it points at.
#[derive(Debug, Clone, Serialize)]
pub struct PageExtraction {
    pub url: String,
    pub extraction: DocumentExtraction,
    /// One outcome per embed fetched, in page order.
    pub embeds: Vec<ItemOutcome>,
    pub video_info: VideoInfo,
}

impl PageExtraction {
    pub fn references(&self) -> impl Iterator<Item = &ResolvedReference> {
        self.extraction.references.iter()
    }

    /// Why the page produced nothing. Decode failures take precedence, then embeds that could
    /// not be fetched, then not-found.
    pub fn empty_reason(&self) -> Option<(FailureReason, String)> {
        if !self.extraction.references.is_empty() {
            return None;
        }
        if self.extraction.decode_failures > 0 {
            return Some((
                FailureReason::Decode,
                format!(
                    "{} candidate(s) failed to decode",
                    self.extraction.decode_failures
                ),
            ));
        }
        let fetch_failure = self.embeds.iter().find_map(|embed| match &embed.result {
            ItemResult::Empty {
                reason: FailureReason::Fetch,
                detail,
            } => Some(format!("embed {}: {}", embed.url, detail)),
            _ => None,
        });
        Some(match fetch_failure {
            Some(detail) => (FailureReason::Fetch, detail),
            None => (
                FailureReason::NotFound,
                ExtractorError::NoReferencesFound.to_string(),
            ),
        })
    }

    pub fn into_outcome(self) -> ItemOutcome {
        match self.empty_reason() {
            None => ItemOutcome::found(self.url, self.extraction.references.into_vec()),
            Some((reason, detail)) => ItemOutcome::empty(self.url, reason, detail),
        }
    }
}

/// Runs a page through the reference extractor, then follows its embed players.
///
/// Inline scripts are scanned first and the whole markup second, both against the page's
/// directory. Each embed is fetched with the page as referer and its references are merged
/// after the page's own.
pub struct PageExtractor {
    source: Arc<dyn DocumentSource>,
    embeds: EmbedExtractor,
    extractor: MediaReferenceExtractor,
    embed_hosts: Vec<String>,
}

impl PageExtractor {
    pub fn new(source: Arc<dyn DocumentSource>) -> Self {
        Self {
            embeds: EmbedExtractor::new(Arc::clone(&source)),
            source,
            extractor: MediaReferenceExtractor::default(),
            embed_hosts: DEFAULT_EMBED_HOSTS.iter().map(|h| h.to_string()).collect(),
        }
    }

    pub fn with_embed_hosts<I, S>(mut self, hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.embed_hosts = hosts.into_iter().map(Into::into).collect();
        self
    }

    pub async fn extract(
        &self,
        url: &str,
        referer: Option<&str>,
    ) -> Result<PageExtraction, ExtractorError> {
        let document = self.source.fetch(url, referer).await?;
        Ok(self.extract_document(&document.body, &document.url).await)
    }

    /// Same as [`extract`](Self::extract) for a page that is already loaded.
    pub async fn extract_document(&self, html: &str, page_url: &str) -> PageExtraction {
        let scripts = script_texts(html);
        let base = BaseContext::from_document_url(page_url);
        let mut extraction = self.extractor.extract_all(
            scripts.iter().map(String::as_str).chain([html]),
            &base,
        );
        debug!(
            "{}: {} script(s), {} reference(s) on the page",
            page_url,
            scripts.len(),
            extraction.references.len()
        );

        let mut video_info = VideoInfo::default();
        let mut embeds = Vec::new();
        for embed_url in embed_urls(&scripts, &self.embed_hosts, page_url) {
            match self.embeds.fetch_embed(&embed_url, Some(page_url)).await {
                Ok(page) => {
                    if video_info.title.is_none() && page.video_info.title.is_some() {
                        video_info = page.video_info;
                    }
                    let outcome = match page.extraction.clone().into_result() {
                        Ok(references) => ItemOutcome::found(&embed_url, references),
                        Err(e) => ItemOutcome::from_error(&embed_url, &e),
                    };
                    extraction.candidates += page.extraction.candidates;
                    extraction.decode_failures += page.extraction.decode_failures;
                    extraction.references.merge(page.extraction.references);
                    embeds.push(outcome);
                }
                Err(e) => {
                    warn!("embed {} [{}]: {}", embed_url, e.reason(), e);
                    embeds.push(ItemOutcome::from_error(&embed_url, &e));
                }
            }
        }

        if video_info.title.is_none() {
            let own = VideoInfo::parse(html);
            if !own.is_empty() {
                video_info = own;
            }
        }

        PageExtraction {
            url: page_url.to_string(),
            extraction,
            embeds,
            video_info,
        }
    }
}

/// Text of every non-empty inline `<script>`.
pub fn script_texts(html: &str) -> Vec<String> {
    Html::parse_document(html)
        .select(&SCRIPT)
        .map(|script| script.text().collect::<String>())
        .filter(|text| !text.trim().is_empty())
        .collect()
}

/// Embed player URLs named in page scripts: `videoUrl = "..."` assignments and quoted URLs on
/// one of `hosts`. JSON-escaped slashes are unescaped; non-HTTP values, direct media links and
/// the page itself are left out. Order is first appearance.
pub fn embed_urls(scripts: &[String], hosts: &[String], page_url: &str) -> Vec<String> {
    let mut seen = FxHashSet::default();
    let mut urls = Vec::new();

    for script in scripts {
        let assigned = VIDEO_URL_REGEX
            .captures_iter(script)
            .filter_map(|c| c.get(1).map(|m| m.as_str()));
        let quoted = QUOTED_REGEX
            .captures_iter(script)
            .filter_map(|c| c.get(1).map(|m| m.as_str()))
            .filter(|value| hosts.iter().any(|host| value.contains(host.as_str())));

        for raw in assigned.chain(quoted) {
            let url = raw.replace("\\/", "/");
            if !url.starts_with("http") {
                debug!("skipping non-http embed value {}", url);
                continue;
            }
            if url == page_url || ReferenceKind::from_locator(&url).is_some() {
                continue;
            }
            if seen.insert(url.clone()) {
                urls.push(url);
            }
        }
    }

    urls
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::embed::tests::StaticSource;

    const EPISODE: &str = "https://diziyiizle.com/dizi/ezel/sezon-1-bolum-3/";

    fn hosts() -> Vec<String> {
        DEFAULT_EMBED_HOSTS.iter().map(|h| h.to_string()).collect()
    }

    #[test]
    fn test_embed_urls_from_scripts() {
        let scripts = vec![
            r#"var videoUrl = "https:\/\/vidlax.xyz\/e\/a1"; var cfg = { src: "https://vidlax.xyz/e/b2" };"#
                .to_string(),
            r#"load('https://vidlax.xyz/e/a1'); var poster = "/img/p.jpg"; var videoUrl = "/local/embed";"#
                .to_string(),
            r#"var direct = "https://vidlax.xyz/upload/1/master.m3u8";"#.to_string(),
        ];
        assert_eq!(
            embed_urls(&scripts, &hosts(), EPISODE),
            vec!["https://vidlax.xyz/e/a1", "https://vidlax.xyz/e/b2"]
        );
    }

    #[test]
    fn test_script_texts_skip_external_scripts() {
        let html = r#"<html><head><script src="/app.js"></script><script> var a = 1; </script></head>
            <body><script type="application/ld+json">{"title":"x"}</script></body></html>"#;
        let scripts = script_texts(html);
        assert_eq!(scripts.len(), 2);
        assert!(scripts[0].contains("var a = 1;"));
    }

    #[tokio::test]
    async fn test_page_follows_embeds() {
        let page = r#"<html><body><div data-src="https://cdn.example/ezel/3/index.m3u8"></div>
            <script>var videoUrl = "https://vidlax.xyz/e/ezel3"; var bad = "https://vidlax.xyz/e/gone";</script>
            </body></html>"#;
        let source = StaticSource::new(&[
            (EPISODE, page),
            (
                "https://vidlax.xyz/e/ezel3",
                r#"<script>var jwSetup = {title: "Ezel", description: "1. Sezon 3. Bölüm"};
                jwplayer("p").setup({file: "/upload/3/master.m3u8", tracks: [{"file":"../upload/3/tr.vtt","label":"Türkçe"}]});</script>"#,
            ),
        ]);
        let pages = PageExtractor::new(Arc::new(source));

        let extraction = pages.extract(EPISODE, None).await.unwrap();
        let urls: Vec<_> = extraction.references().map(|r| r.absolute_url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://cdn.example/ezel/3/index.m3u8",
                "https://vidlax.xyz/upload/3/master.m3u8",
                "https://vidlax.xyz/upload/3/tr.vtt",
            ]
        );
        assert_eq!(
            extraction.video_info.display_title("Bölüm 3"),
            "Ezel - 1. Sezon 3. Bölüm"
        );

        let embed_reasons: Vec<_> = extraction.embeds.iter().map(|e| e.reason()).collect();
        assert_eq!(embed_reasons, vec![None, Some(FailureReason::Fetch)]);
        assert_eq!(extraction.empty_reason(), None);
    }

    #[tokio::test]
    async fn test_unreachable_embeds_report_fetch() {
        let page = r#"<script>var videoUrl = "https://vidlax.xyz/e/gone";</script>"#;
        let source = StaticSource::new(&[(EPISODE, page)]);
        let pages = PageExtractor::new(Arc::new(source));

        let outcome = pages.extract(EPISODE, None).await.unwrap().into_outcome();
        assert_eq!(outcome.reason(), Some(FailureReason::Fetch));
        assert_eq!(outcome.url, EPISODE);
    }

    #[tokio::test]
    async fn test_page_without_embeds_is_not_found() {
        let source = StaticSource::new(&[(EPISODE, "<html><script>var a = 1;</script></html>")]);
        let pages = PageExtractor::new(Arc::new(source)).with_embed_hosts(["other.example"]);

        let extraction = pages.extract(EPISODE, None).await.unwrap();
        assert!(extraction.embeds.is_empty());
        assert_eq!(
            extraction.empty_reason().map(|(reason, _)| reason),
            Some(FailureReason::NotFound)
        );
    }
}
