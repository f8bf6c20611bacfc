use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use super::listing::parse_series_links;
use super::series::{EpisodeLink, SeriesPage, parse_series_page};
use crate::extractor::{ExtractorError, FailureReason};
use crate::playlist::{EpisodeItem, SubtitleTrack};
use crate::source::{DocumentSource, PageExtractor, run_bounded};

pub const DEFAULT_SITE_URL: &str = "https://diziyiizle.com";
const LISTING_QUERY: &str = "?post_type=series";

#[derive(Debug, Clone)]
pub struct SeriesCrawlConfig {
    pub site_url: String,
    pub max_series: Option<usize>,
    pub max_concurrent: usize,
    /// Budget for one episode page and all of its embeds.
    pub episode_timeout: Duration,
}

impl Default for SeriesCrawlConfig {
    fn default() -> Self {
        Self {
            site_url: DEFAULT_SITE_URL.to_string(),
            max_series: None,
            max_concurrent: 4,
            episode_timeout: Duration::from_secs(60),
        }
    }
}

impl SeriesCrawlConfig {
    pub fn site_root(&self) -> &str {
        self.site_url.trim_end_matches('/')
    }

    pub fn listing_url(&self) -> String {
        format!("{}/{}", self.site_root(), LISTING_QUERY)
    }
}

/// Why an episode, or a whole series, produced no entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EpisodeFailure {
    pub url: String,
    pub reason: FailureReason,
    pub detail: String,
}

/// Result for one series. A series whose page failed to load has `failure` set and no
/// episodes; otherwise every episode either yields entries or an [`EpisodeFailure`].
#[derive(Debug, Clone, Serialize)]
pub struct SeriesOutcome {
    pub series_url: String,
    pub episodes: usize,
    pub entries: Vec<EpisodeItem>,
    pub failed_episodes: Vec<EpisodeFailure>,
    pub failure: Option<EpisodeFailure>,
}

impl SeriesOutcome {
    fn failed(series_url: String, error: &ExtractorError) -> Self {
        Self {
            failure: Some(EpisodeFailure {
                url: series_url.clone(),
                reason: error.reason(),
                detail: error.to_string(),
            }),
            series_url,
            episodes: 0,
            entries: Vec::new(),
            failed_episodes: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SeriesReport {
    pub outcomes: Vec<SeriesOutcome>,
}

impl SeriesReport {
    pub fn series(&self) -> usize {
        self.outcomes.len()
    }

    /// Every entry, series by series.
    pub fn entries(&self) -> Vec<EpisodeItem> {
        self.outcomes
            .iter()
            .flat_map(|o| o.entries.iter().cloned())
            .collect()
    }

    pub fn failures(&self) -> impl Iterator<Item = &SeriesOutcome> {
        self.outcomes.iter().filter(|o| o.failure.is_some())
    }

    pub fn failed_episodes(&self) -> impl Iterator<Item = &EpisodeFailure> {
        self.outcomes.iter().flat_map(|o| o.failed_episodes.iter())
    }
}

/// Crawls the series catalog: listing, series pages, then every episode page through the
/// [`PageExtractor`] pipeline.
pub struct SeriesCrawler {
    source: Arc<dyn DocumentSource>,
    pages: PageExtractor,
    config: SeriesCrawlConfig,
}

impl SeriesCrawler {
    pub fn new(source: Arc<dyn DocumentSource>, config: SeriesCrawlConfig) -> Self {
        Self {
            pages: PageExtractor::new(Arc::clone(&source)),
            source,
            config,
        }
    }

    pub fn with_pages(mut self, pages: PageExtractor) -> Self {
        self.pages = pages;
        self
    }

    /// Series URLs from the catalog listing, capped at `max_series`.
    pub async fn list_series(&self) -> Result<Vec<String>, ExtractorError> {
        let referer = format!("{}/", self.config.site_root());
        let listing = self
            .source
            .fetch(&self.config.listing_url(), Some(&referer))
            .await?;
        let mut series = parse_series_links(&listing.body, self.config.site_root());
        if let Some(limit) = self.config.max_series {
            series.truncate(limit);
        }
        info!("{} series listed", series.len());
        Ok(series)
    }

    pub async fn series_page(&self, series_url: &str) -> Result<SeriesPage, ExtractorError> {
        let referer = format!("{}/", self.config.site_root());
        let document = self.source.fetch(series_url, Some(&referer)).await?;
        Ok(parse_series_page(
            &document.body,
            series_url,
            self.config.site_root(),
        ))
    }

    /// One entry per manifest found for the episode, each carrying every subtitle found.
    pub async fn episode_entries(
        &self,
        series_url: &str,
        series: &SeriesPage,
        link: &EpisodeLink,
        number: usize,
    ) -> Result<Vec<EpisodeItem>, EpisodeFailure> {
        let page = self
            .pages
            .extract(&link.url, Some(series_url))
            .await
            .map_err(|e| EpisodeFailure {
                url: link.url.clone(),
                reason: e.reason(),
                detail: e.to_string(),
            })?;

        let subtitles: Vec<SubtitleTrack> = page
            .extraction
            .references
            .subtitles()
            .map(|r| SubtitleTrack {
                url: r.absolute_url.clone(),
                label: r.label.clone(),
            })
            .collect();

        let fallback = link
            .title
            .clone()
            .unwrap_or_else(|| format!("Bölüm {number}"));
        let title = page.video_info.display_title(&fallback);

        let entries: Vec<EpisodeItem> = page
            .extraction
            .references
            .manifests()
            .map(|manifest| EpisodeItem {
                title: title.clone(),
                stream_url: manifest.absolute_url.clone(),
                episode_url: link.url.clone(),
                series_url: series_url.to_string(),
                poster: series.poster.clone(),
                backdrop: series.backdrop.clone(),
                group: series.group.clone(),
                subtitles: subtitles.clone(),
            })
            .collect();

        if entries.is_empty() {
            let (reason, detail) = page.empty_reason().unwrap_or_else(|| {
                (
                    FailureReason::NotFound,
                    "only subtitles, no manifest".to_string(),
                )
            });
            return Err(EpisodeFailure {
                url: link.url.clone(),
                reason,
                detail,
            });
        }
        debug!("{}: {} manifest(s)", link.url, entries.len());
        Ok(entries)
    }

    /// Loads the series page and walks its episodes in order, each under the episode timeout.
    pub async fn process_series(&self, series_url: String) -> SeriesOutcome {
        let series = match self.series_page(&series_url).await {
            Ok(series) => series,
            Err(e) => {
                warn!("series {} [{}]: {}", series_url, e.reason(), e);
                return SeriesOutcome::failed(series_url, &e);
            }
        };
        info!("{}: {} episode(s)", series_url, series.episodes.len());

        let mut outcome = SeriesOutcome {
            series_url,
            episodes: series.episodes.len(),
            entries: Vec::new(),
            failed_episodes: Vec::new(),
            failure: None,
        };

        let episode_timeout = self.config.episode_timeout;
        for (index, link) in series.episodes.iter().enumerate() {
            let lookup = self.episode_entries(&outcome.series_url, &series, link, index + 1);
            let result = match timeout(episode_timeout, lookup).await {
                Ok(result) => result,
                Err(_) => {
                    let e = ExtractorError::timeout(episode_timeout);
                    Err(EpisodeFailure {
                        url: link.url.clone(),
                        reason: e.reason(),
                        detail: e.to_string(),
                    })
                }
            };
            match result {
                Ok(entries) => outcome.entries.extend(entries),
                Err(failure) => {
                    warn!(
                        "episode {} [{}]: {}",
                        failure.url, failure.reason, failure.detail
                    );
                    outcome.failed_episodes.push(failure);
                }
            }
        }

        if series.episodes.is_empty() {
            outcome.failure = Some(EpisodeFailure {
                url: outcome.series_url.clone(),
                reason: FailureReason::NotFound,
                detail: "no episode links".to_string(),
            });
        }
        outcome
    }

    /// Processes series on the bounded worker pool; episodes within a series run in order.
    pub async fn process_all<P>(
        self: &Arc<Self>,
        series: Vec<String>,
        on_done: P,
    ) -> Vec<SeriesOutcome>
    where
        P: FnMut(&SeriesOutcome),
    {
        let crawler = Arc::clone(self);
        run_bounded(
            series,
            self.config.max_concurrent,
            move |series_url: String| {
                let crawler = Arc::clone(&crawler);
                async move { crawler.process_series(series_url).await }
            },
            on_done,
        )
        .await
        .into_iter()
        .map(|(_, outcome)| outcome)
        .collect()
    }

    /// Full run: listing, then every series.
    pub async fn crawl<P>(self: &Arc<Self>, on_done: P) -> Result<SeriesReport, ExtractorError>
    where
        P: FnMut(&SeriesOutcome),
    {
        let series = self.list_series().await?;
        let outcomes = self.process_all(series, on_done).await;
        Ok(SeriesReport { outcomes })
    }
}
