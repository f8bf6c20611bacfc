use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use super::archive::{FilmInfo, page_url, parse_archive, parse_page_count};
use super::detail::{
    PlayerSource, parse_film_page, parse_video_url_response, vctplay_manifest, video_url_form,
};
use crate::extractor::{ExtractorError, FailureReason};
use crate::playlist::StreamItem;
use crate::source::{DocumentSource, EmbedExtractor, run_bounded};

pub const DEFAULT_SITE_URL: &str = "https://www.setfilmizle.my";
const ARCHIVE_PATH: &str = "film/";
const AJAX_PATH: &str = "wp-admin/admin-ajax.php";

#[derive(Debug, Clone)]
pub struct CrawlConfig {
    pub site_url: String,
    pub max_pages: Option<u32>,
    pub max_concurrent: usize,
    pub item_timeout: Duration,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            site_url: DEFAULT_SITE_URL.to_string(),
            max_pages: None,
            max_concurrent: 10,
            item_timeout: Duration::from_secs(25),
        }
    }
}

impl CrawlConfig {
    pub fn archive_url(&self) -> String {
        format!("{}/{}", self.site_url.trim_end_matches('/'), ARCHIVE_PATH)
    }

    pub fn ajax_url(&self) -> String {
        format!("{}/{}", self.site_url.trim_end_matches('/'), AJAX_PATH)
    }
}

/// Embed URL returned for one player source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilmEmbed {
    pub label: String,
    pub embed_url: String,
}

/// Result for one film. `streams` may be non-empty even when `failure` is set, since every
/// source of a film is tried independently.
#[derive(Debug, Clone, Serialize)]
pub struct FilmOutcome {
    pub film: FilmInfo,
    pub streams: Vec<StreamItem>,
    pub failure: Option<FilmFailure>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilmFailure {
    pub reason: FailureReason,
    pub detail: String,
}

impl FilmFailure {
    fn from_error(error: &ExtractorError) -> Self {
        Self {
            reason: error.reason(),
            detail: error.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CrawlReport {
    pub pages_scanned: u32,
    pub outcomes: Vec<FilmOutcome>,
}

impl CrawlReport {
    pub fn films(&self) -> usize {
        self.outcomes.len()
    }

    pub fn streams(&self) -> impl Iterator<Item = &StreamItem> {
        self.outcomes.iter().flat_map(|o| o.streams.iter())
    }

    pub fn failures(&self) -> impl Iterator<Item = &FilmOutcome> {
        self.outcomes.iter().filter(|o| o.failure.is_some())
    }
}

/// Crawls the film archive, looks up every film's FastPlay embeds and turns them into streams.
pub struct SiteCrawler {
    source: Arc<dyn DocumentSource>,
    embeds: Arc<EmbedExtractor>,
    config: CrawlConfig,
}

impl SiteCrawler {
    pub fn new(source: Arc<dyn DocumentSource>, config: CrawlConfig) -> Self {
        let embeds = Arc::new(EmbedExtractor::new(Arc::clone(&source)));
        Self {
            source,
            embeds,
            config,
        }
    }

    /// Walks the archive pages. The first page must load; a later page that fails ends
    /// pagination and keeps what was collected so far.
    pub async fn list_films(&self) -> Result<(u32, Vec<FilmInfo>), ExtractorError> {
        let archive = self.config.archive_url();
        let first = self.source.fetch(&archive, None).await?;

        let mut max_page = parse_page_count(&first.body);
        if max_page == 0 {
            warn!("could not determine the page count, only the first page is scanned");
            max_page = 1;
        }
        if let Some(limit) = self.config.max_pages {
            max_page = max_page.min(limit.max(1));
        }
        info!("{} archive page(s) to scan", max_page);

        let mut films = parse_archive(&first.body, &first.url);
        info!("page 1/{}: {} film(s)", max_page, films.len());
        let mut scanned = 1;

        for page in 2..=max_page {
            let url = page_url(&archive, page);
            match self.source.fetch(&url, Some(&archive)).await {
                Ok(document) => {
                    let on_page = parse_archive(&document.body, &document.url);
                    info!("page {}/{}: {} film(s)", page, max_page, on_page.len());
                    films.extend(on_page);
                    scanned = page;
                }
                Err(e) => {
                    warn!("could not load page {}, stopping pagination: {}", page, e);
                    break;
                }
            }
        }

        Ok((scanned, films))
    }

    /// Reads a film page and asks the site for the embed URL of every FastPlay source.
    pub async fn film_embeds(&self, film: &FilmInfo) -> Result<Vec<FilmEmbed>, ExtractorError> {
        let page = self.source.fetch(&film.link, Some(&film.link)).await?;
        let film_page = parse_film_page(&page.body)?;
        debug!("{}: {} FastPlay source(s)", film.title, film_page.sources.len());

        let mut embeds = Vec::with_capacity(film_page.sources.len());
        for source in &film_page.sources {
            if let Some(embed_url) = self
                .lookup_embed(&film_page.nonce, source, &film.link)
                .await?
            {
                embeds.push(FilmEmbed {
                    label: source.label.clone(),
                    embed_url,
                });
            }
        }
        Ok(embeds)
    }

    async fn lookup_embed(
        &self,
        nonce: &str,
        source: &PlayerSource,
        referer: &str,
    ) -> Result<Option<String>, ExtractorError> {
        let form = video_url_form(nonce, source);
        let response = self
            .source
            .post_ajax(&self.config.ajax_url(), &form, Some(referer))
            .await?;
        parse_video_url_response(&response.body)
    }

    /// Turns an embed URL into a playable stream. vctplay embeds map directly to their manifest;
    /// anything else is fetched and scanned for a manifest reference.
    pub async fn resolve_stream(
        &self,
        film: &FilmInfo,
        embed: &FilmEmbed,
    ) -> Result<StreamItem, ExtractorError> {
        let (stream_url, subtitle_url) = match vctplay_manifest(&embed.embed_url) {
            Some(manifest) => (manifest, None),
            None => {
                let references = self
                    .embeds
                    .extract_references(&embed.embed_url, Some(&film.link))
                    .await?;
                let manifest = references
                    .iter()
                    .find(|r| r.is_manifest())
                    .map(|r| r.absolute_url.clone())
                    .ok_or(ExtractorError::NoReferencesFound)?;
                let subtitle = references
                    .iter()
                    .find(|r| r.is_subtitle())
                    .map(|r| r.absolute_url.clone());
                (manifest, subtitle)
            }
        };

        Ok(StreamItem {
            title: film.title.clone(),
            logo: film.logo.clone(),
            label: embed.label.clone(),
            stream_url,
            subtitle_url,
        })
    }

    async fn process_film(&self, film: FilmInfo) -> FilmOutcome {
        let embeds = match self.film_embeds(&film).await {
            Ok(embeds) => embeds,
            Err(e) => {
                warn!("'{}' [{}]: {}", film.title, e.reason(), e);
                return FilmOutcome {
                    failure: Some(FilmFailure::from_error(&e)),
                    film,
                    streams: Vec::new(),
                };
            }
        };

        let mut streams = Vec::new();
        let mut failure = None;
        for embed in &embeds {
            match self.resolve_stream(&film, embed).await {
                Ok(stream) => streams.push(stream),
                Err(e) => {
                    warn!("skipping embed {} of '{}': {}", embed.embed_url, film.title, e);
                    failure.get_or_insert_with(|| FilmFailure::from_error(&e));
                }
            }
        }

        if embeds.is_empty() {
            failure = Some(FilmFailure {
                reason: FailureReason::NotFound,
                detail: "no FastPlay embed".to_string(),
            });
        }

        FilmOutcome {
            film,
            streams,
            failure,
        }
    }

    /// Processes films on the bounded worker pool. Every film yields an outcome, including
    /// films that timed out.
    pub async fn process_films<P>(
        self: &Arc<Self>,
        films: Vec<FilmInfo>,
        on_done: P,
    ) -> Vec<FilmOutcome>
    where
        P: FnMut(&FilmOutcome),
    {
        let crawler = Arc::clone(self);
        let item_timeout = self.config.item_timeout;

        run_bounded(
            films,
            self.config.max_concurrent,
            move |film: FilmInfo| {
                let crawler = Arc::clone(&crawler);
                async move {
                    let fallback = film.clone();
                    match timeout(item_timeout, crawler.process_film(film)).await {
                        Ok(outcome) => outcome,
                        Err(_) => {
                            warn!("'{}' timed out", fallback.title);
                            FilmOutcome {
                                film: fallback,
                                streams: Vec::new(),
                                failure: Some(FilmFailure::from_error(&ExtractorError::timeout(
                                    item_timeout,
                                ))),
                            }
                        }
                    }
                }
            },
            on_done,
        )
        .await
        .into_iter()
        .map(|(_, outcome)| outcome)
        .collect()
    }

    /// Full run: archive listing, then film processing.
    pub async fn crawl<P>(self: &Arc<Self>, on_done: P) -> Result<CrawlReport, ExtractorError>
    where
        P: FnMut(&FilmOutcome),
    {
        let (pages_scanned, films) = self.list_films().await?;
        info!("{} film(s) found on {} page(s)", films.len(), pages_scanned);

        let outcomes = self.process_films(films, on_done).await;
        Ok(CrawlReport {
            pages_scanned,
            outcomes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playlist::{PlaylistBuilder, StreamHeaders};
    use crate::source::Document;
    use async_trait::async_trait;
    use rustc_hash::FxHashMap;

    const SITE: &str = "https://www.setfilmizle.my";

    fn archive_page(films: &[(&str, &str)], last_page: u32) -> String {
        let articles: String = films
            .iter()
            .map(|(slug, title)| {
                format!(
                    r#"<article class="item dortlu movies"><div class="poster"><a href="/film/{slug}/"><img data-src="https://img.example/{slug}.jpg"></a></div><h2><a href="/film/{slug}/">{title}</a></h2></article>"#
                )
            })
            .collect();
        format!(r#"<html><body>{articles}<span class="last-page" data-page="{last_page}">Son</span></body></html>"#)
    }

    fn film_page(post_id: &str, part_keys: &[&str]) -> String {
        let buttons: String = part_keys
            .iter()
            .map(|key| {
                format!(
                    r#"<a data-player-name="FastPlay" data-post-id="{post_id}" data-part-key="{key}">x</a>"#
                )
            })
            .collect();
        format!(r#"<div id="playex" data-nonce="n0nce"></div><nav class="player">{buttons}</nav>"#)
    }

    /// Serves a two-page archive with three films. Page 3 is advertised but missing.
    struct FakeSite {
        pages: FxHashMap<String, String>,
    }

    impl FakeSite {
        fn new() -> Self {
            let mut pages = FxHashMap::default();
            pages.insert(
                format!("{SITE}/film/"),
                archive_page(&[("dune", "Dune, Part Two"), ("heat", "Heat")], 3),
            );
            pages.insert(
                format!("{SITE}/film/page/2/"),
                archive_page(&[("nonce-less", "Broken")], 3),
            );
            pages.insert(format!("{SITE}/film/dune/"), film_page("1", &["dublaj", ""]));
            pages.insert(format!("{SITE}/film/heat/"), film_page("2", &[""]));
            pages.insert(format!("{SITE}/film/nonce-less/"), "<html></html>".to_string());
            pages.insert(
                "https://vidlax.xyz/e/heat".to_string(),
                r#"file: "/upload/2/master.m3u8", tracks: [{"file":"../upload/2/tr.vtt","label":"TR"}]"#
                    .to_string(),
            );
            Self { pages }
        }
    }

    #[async_trait]
    impl DocumentSource for FakeSite {
        async fn fetch(&self, url: &str, _referer: Option<&str>) -> Result<Document, ExtractorError> {
            self.pages
                .get(url)
                .map(|body| Document::new(url, body.clone()))
                .ok_or_else(|| ExtractorError::HttpStatus {
                    status: 404,
                    url: url.to_string(),
                })
        }

        async fn post_ajax(
            &self,
            url: &str,
            form: &[(&str, &str)],
            _referer: Option<&str>,
        ) -> Result<Document, ExtractorError> {
            assert_eq!(url, format!("{SITE}/wp-admin/admin-ajax.php"));
            let field = |name: &str| {
                form.iter()
                    .find(|(k, _)| *k == name)
                    .map(|(_, v)| v.to_string())
                    .unwrap_or_default()
            };
            assert_eq!(field("nonce"), "n0nce");
            let embed = match (field("post_id").as_str(), field("part_key").as_str()) {
                ("1", "dublaj") => "https://vctplay.site/video/dune-tr",
                ("1", _) => "https://vctplay.site/video/dune-sub",
                _ => "https://vidlax.xyz/e/heat",
            };
            Ok(Document::new(
                url,
                format!(r#"{{"success":true,"data":{{"url":"{embed}"}}}}"#),
            ))
        }
    }

    fn crawler() -> Arc<SiteCrawler> {
        Arc::new(SiteCrawler::new(
            Arc::new(FakeSite::new()),
            CrawlConfig {
                site_url: SITE.to_string(),
                max_concurrent: 2,
                ..Default::default()
            },
        ))
    }

    #[tokio::test]
    async fn test_list_films_stops_on_missing_page() {
        let (pages, films) = crawler().list_films().await.unwrap();
        assert_eq!(pages, 2);
        let titles: Vec<_> = films.iter().map(|f| f.title.as_str()).collect();
        assert_eq!(titles, vec!["Dune, Part Two", "Heat", "Broken"]);
        assert_eq!(films[0].link, "https://www.setfilmizle.my/film/dune/");
    }

    #[tokio::test]
    async fn test_crawl_builds_streams() {
        let mut seen = 0;
        let report = crawler().crawl(|_| seen += 1).await.unwrap();
        assert_eq!(seen, 3);
        assert_eq!(report.films(), 3);

        let streams: Vec<_> = report
            .streams()
            .map(|s| (s.label.as_str(), s.stream_url.as_str()))
            .collect();
        assert_eq!(
            streams,
            vec![
                ("Türkçe Dublaj", "https://vctplay.site/manifests/dune-tr/master.txt"),
                ("Türkçe Altyazılı", "https://vctplay.site/manifests/dune-sub/master.txt"),
                ("Türkçe Altyazılı", "https://vidlax.xyz/upload/2/master.m3u8"),
            ]
        );

        let heat = &report.outcomes[1];
        assert_eq!(
            heat.streams[0].subtitle_url.as_deref(),
            Some("https://vidlax.xyz/upload/2/tr.vtt")
        );

        let failures: Vec<_> = report.failures().collect();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].film.title, "Broken");
        assert_eq!(
            failures[0].failure.as_ref().map(|f| f.reason),
            Some(FailureReason::Decode)
        );

        let mut playlist = PlaylistBuilder::new(StreamHeaders {
            referer: "https://vctplay.site/".to_string(),
            user_agent: "ua".to_string(),
        });
        for stream in report.streams() {
            playlist.add(stream.clone());
        }
        assert_eq!(playlist.len(), 3);
        assert!(playlist.render().contains(",Dune Part Two | Türkçe Dublaj\n"));
    }

    #[tokio::test]
    async fn test_max_pages_limit() {
        let crawler = Arc::new(SiteCrawler::new(
            Arc::new(FakeSite::new()),
            CrawlConfig {
                site_url: format!("{SITE}/"),
                max_pages: Some(1),
                ..Default::default()
            },
        ));
        let (pages, films) = crawler.list_films().await.unwrap();
        assert_eq!(pages, 1);
        assert_eq!(films.len(), 2);
    }

    #[tokio::test]
    async fn test_first_page_failure_is_fatal() {
        let crawler = Arc::new(SiteCrawler::new(
            Arc::new(FakeSite::new()),
            CrawlConfig {
                site_url: "https://elsewhere.example".to_string(),
                ..Default::default()
            },
        ));
        assert!(matches!(
            crawler.list_films().await,
            Err(ExtractorError::HttpStatus { status: 404, .. })
        ));
    }
}
