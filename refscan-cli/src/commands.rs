use crate::{
    cli::OutputFormat,
    config::AppConfig,
    error::{CliError, Result},
    output::{OutputManager, write_output},
};
use indicatif::{ProgressBar, ProgressStyle};
use refscan_parser::{
    extractor::{
        DEFAULT_UA, MediaReferenceExtractor, ProxyConfig, create_client, hls_extractor::HlsProbe,
    },
    media::BaseContext,
    playlist::{
        PlaylistBuilder, StreamHeaders, generated_at, render_master_playlist, write_playlist,
        write_series_playlists,
    },
    sites::diziyiizle::{SeriesCrawlConfig, SeriesCrawler, SeriesReport},
    sites::setfilmizle::{CrawlConfig, CrawlReport, SiteCrawler},
    source::{
        BatchRunner, DocumentSource, EmbedExtractor, HttpDocumentSource, ItemOutcome,
        PageExtractor,
    },
};
use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};
use tracing::{info, warn};

/// Film lookups make several requests each, so a film gets this many request budgets.
const REQUESTS_PER_FILM: u32 = 4;

pub struct CommandExecutor {
    config: AppConfig,
    source: Arc<HttpDocumentSource>,
    output: OutputManager,
}

impl CommandExecutor {
    pub fn new(config: AppConfig) -> Result<Self> {
        let proxy_config = config.proxy.as_ref().map(|url| ProxyConfig {
            url: url.clone(),
            username: config.proxy_username.clone(),
            password: config.proxy_password.clone(),
        });

        let client = create_client(
            proxy_config,
            Duration::from_secs(config.request_timeout),
            config.user_agent.as_deref().unwrap_or(DEFAULT_UA),
        )?;
        let source = HttpDocumentSource::new(client, Duration::from_secs(config.request_timeout))
            .with_retries(config.retries);

        Ok(Self {
            output: OutputManager::new(config.colored_output),
            source: Arc::new(source),
            config,
        })
    }

    pub fn default_output_format(&self) -> OutputFormat {
        OutputFormat::from_config(&self.config.output_format)
    }

    pub fn scan(
        &self,
        input: &Path,
        base_url: Option<&str>,
        page_url: Option<&str>,
        candidates: bool,
        output_format: &OutputFormat,
        output_file: Option<&Path>,
    ) -> Result<()> {
        let text = if input == Path::new("-") {
            std::io::read_to_string(std::io::stdin())?
        } else {
            std::fs::read_to_string(input)?
        };

        if candidates {
            let found = MediaReferenceExtractor::default().candidates(&text);
            let output = self.output.format_candidates(
                &input.display().to_string(),
                &found,
                output_format,
            )?;
            return write_output(&output, output_file);
        }

        let (label, base) = match (base_url, page_url) {
            (Some(base), _) => (base, BaseContext::new(base)),
            (None, Some(page)) => (page, BaseContext::from_document_url(page)),
            (None, None) => {
                return Err(CliError::invalid_input(
                    "either --base-url or --page-url is required",
                ));
            }
        };

        let extraction = MediaReferenceExtractor::default().extract(&text, &base);
        info!(
            "{} candidate(s), {} decode failure(s)",
            extraction.candidates, extraction.decode_failures
        );
        let outcome = match extraction.into_result() {
            Ok(references) => ItemOutcome::found(label, references),
            Err(e) => ItemOutcome::from_error(label, &e),
        };

        self.emit_outcome(&outcome, output_format, output_file)
    }

    pub async fn extract(
        &self,
        url: &str,
        referer: Option<&str>,
        output_format: &OutputFormat,
        output_file: Option<&Path>,
    ) -> Result<()> {
        let pb = self.create_spinner("Extracting...");
        let embeds = EmbedExtractor::new(self.document_source());
        let outcome = embeds.extract(url, referer).await;
        pb.finish_and_clear();

        self.emit_outcome(&outcome, output_format, output_file)
    }

    pub async fn page(
        &self,
        url: &str,
        referer: Option<&str>,
        output_format: &OutputFormat,
        output_file: Option<&Path>,
    ) -> Result<()> {
        let pb = self.create_spinner("Extracting page and embeds...");
        let result = PageExtractor::new(self.document_source())
            .extract(url, referer)
            .await;
        pb.finish_and_clear();
        let page = result?;
        info!(
            "{} embed(s), {} candidate(s), {} decode failure(s)",
            page.embeds.len(),
            page.extraction.candidates,
            page.extraction.decode_failures
        );

        let output = self.output.format_page(&page, output_format)?;
        write_output(&output, output_file)?;

        match page.empty_reason() {
            None => Ok(()),
            Some((reason, _)) => Err(CliError::no_references(reason, page.url)),
        }
    }

    pub async fn batch_process(
        &self,
        input_file: &Path,
        output_dir: Option<&Path>,
        output_format: &OutputFormat,
        max_concurrent: Option<usize>,
        referer: Option<String>,
    ) -> Result<()> {
        let content = std::fs::read_to_string(input_file)?;
        let urls: Vec<String> = content
            .lines()
            .filter_map(|line| {
                let line = line.trim();
                if line.is_empty() || line.starts_with('#') {
                    None
                } else {
                    Some(line.to_string())
                }
            })
            .collect();

        if urls.is_empty() {
            return Err(CliError::invalid_input("No valid URLs found in input file"));
        }

        let pb = self.create_progress_bar(urls.len() as u64);
        let hook_pb = pb.clone();
        let runner = BatchRunner::new(Arc::new(EmbedExtractor::new(self.document_source())))
            .max_concurrent(max_concurrent.unwrap_or(self.config.max_concurrent))
            .item_timeout(self.item_timeout())
            .referer(referer)
            .on_progress(move |outcome| {
                hook_pb.set_message(outcome.url.clone());
                hook_pb.inc(1);
            });

        let report = runner.run(urls).await;
        pb.finish_with_message("Batch processing completed");

        let output = self.output.format_batch(&report, output_format)?;
        let file_name = match output_format {
            OutputFormat::Json | OutputFormat::JsonCompact => "batch_results.json",
            OutputFormat::Csv => "batch_results.csv",
            OutputFormat::Pretty | OutputFormat::Table => "batch_summary.txt",
        };
        let output_file = output_dir.map(|dir| dir.join(file_name));
        write_output(&output, output_file.as_deref())
    }

    pub async fn crawl(
        &self,
        site: Option<String>,
        max_pages: Option<u32>,
        output_file: Option<PathBuf>,
        max_concurrent: Option<usize>,
    ) -> Result<()> {
        let config = CrawlConfig {
            site_url: site.unwrap_or_else(|| self.config.site_base_url.clone()),
            max_pages,
            max_concurrent: max_concurrent.unwrap_or(self.config.max_concurrent),
            item_timeout: self.item_timeout() * REQUESTS_PER_FILM,
        };
        let crawler = Arc::new(SiteCrawler::new(self.document_source(), config));

        let spinner = self.create_spinner("Scanning archive pages...");
        let listing = crawler.list_films().await;
        spinner.finish_and_clear();
        let (pages_scanned, films) = listing?;

        if films.is_empty() {
            warn!("no films found, nothing to write");
            return Ok(());
        }
        info!("{} film(s) found on {} page(s)", films.len(), pages_scanned);

        let pb = self.create_progress_bar(films.len() as u64);
        let outcomes = crawler
            .process_films(films, |outcome| {
                pb.set_message(outcome.film.title.clone());
                pb.inc(1);
            })
            .await;
        pb.finish_with_message("Film lookups completed");

        let report = CrawlReport {
            pages_scanned,
            outcomes,
        };

        let mut playlist = PlaylistBuilder::new(StreamHeaders {
            referer: self.config.m3u_referer.clone(),
            user_agent: self.config.m3u_user_agent.clone(),
        });
        for stream in report.streams() {
            playlist.add(stream.clone());
        }

        let path = output_file.unwrap_or_else(|| self.config.output_file.clone());
        playlist.write_to(&path)?;

        let summary = self.output.format_crawl(&report, &playlist, &path);
        write_output(&summary, None)
    }

    pub async fn series(
        &self,
        site: Option<String>,
        max_series: Option<usize>,
        output_dir: Option<PathBuf>,
        master_file: Option<PathBuf>,
        max_concurrent: Option<usize>,
    ) -> Result<()> {
        let config = SeriesCrawlConfig {
            site_url: site.unwrap_or_else(|| self.config.series_site_url.clone()),
            max_series,
            max_concurrent: max_concurrent.unwrap_or(self.config.max_concurrent),
            episode_timeout: Duration::from_secs(self.config.episode_timeout),
        };
        let crawler = Arc::new(SeriesCrawler::new(self.document_source(), config));

        let spinner = self.create_spinner("Reading series listing...");
        let listing = crawler.list_series().await;
        spinner.finish_and_clear();
        let series = listing?;

        if series.is_empty() {
            warn!("no series found, nothing to write");
            return Ok(());
        }

        let pb = self.create_progress_bar(series.len() as u64);
        let outcomes = crawler
            .process_all(series, |outcome| {
                pb.set_message(outcome.series_url.clone());
                pb.inc(1);
            })
            .await;
        pb.finish_with_message("Series processed");

        let report = SeriesReport { outcomes };
        let entries = report.entries();
        if entries.is_empty() {
            warn!("no episode produced a manifest, nothing to write");
            return Ok(());
        }

        let stamp = generated_at();
        let dir = output_dir.unwrap_or_else(|| self.config.series_output_dir.clone());
        let written = write_series_playlists(&dir, &entries, &stamp)?;

        let master = master_file.unwrap_or_else(|| self.config.master_playlist_file.clone());
        info!("writing {} entries to {}", entries.len(), master.display());
        write_playlist(&master, &render_master_playlist(&entries, &stamp))?;

        let summary = self.output.format_series(&report, &written, &master);
        write_output(&summary, None)
    }

    pub async fn probe(
        &self,
        url: &str,
        referer: Option<&str>,
        output_format: &OutputFormat,
    ) -> Result<()> {
        let pb = self.create_spinner("Fetching manifest...");
        let result = HlsProbe::new(self.source.client().clone())
            .probe(url, referer)
            .await;
        pb.finish_and_clear();

        let output = self.output.format_probe(url, &result?, output_format)?;
        write_output(&output, None)
    }

    fn emit_outcome(
        &self,
        outcome: &ItemOutcome,
        output_format: &OutputFormat,
        output_file: Option<&Path>,
    ) -> Result<()> {
        let output = self.output.format_outcome(outcome, output_format)?;
        write_output(&output, output_file)?;

        match outcome.reason() {
            None => Ok(()),
            Some(reason) => Err(CliError::no_references(reason, outcome.url.clone())),
        }
    }

    fn document_source(&self) -> Arc<dyn DocumentSource> {
        self.source.clone()
    }

    /// Time one item may take: every attempt plus the backoff between attempts.
    fn item_timeout(&self) -> Duration {
        let attempts = u64::from(self.config.retries) + 1;
        let backoff = (1u64 << self.config.retries.min(16)) - 1;
        Duration::from_secs(self.config.request_timeout * attempts + backoff)
    }

    fn create_spinner(&self, message: &str) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        pb.enable_steady_tick(Duration::from_millis(500));
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ "),
        );
        pb.set_message(message.to_string());
        pb
    }

    fn create_progress_bar(&self, len: u64) -> ProgressBar {
        let pb = ProgressBar::new(len);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("█▉▊▋▌▍▎▏  "),
        );
        pb
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn executor(retries: u32) -> CommandExecutor {
        CommandExecutor::new(AppConfig {
            retries,
            request_timeout: 25,
            colored_output: false,
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_item_timeout_covers_retries() {
        assert_eq!(executor(0).item_timeout(), Duration::from_secs(25));
        // 3 attempts plus 1s and 2s of backoff
        assert_eq!(executor(2).item_timeout(), Duration::from_secs(78));
    }

    #[test]
    fn test_scan_local_document() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("embed.html");
        std::fs::write(
            &input,
            r#"<script>tracks: [{"file":"../upload/5/subtitles/tr.vtt","label":"TR"}]</script>"#,
        )
        .unwrap();
        let output = dir.path().join("refs.json");

        executor(0)
            .scan(
                &input,
                None,
                Some("https://vidlax.xyz/e/abc"),
                false,
                &OutputFormat::Json,
                Some(&output),
            )
            .unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(json["status"], "found");
        assert_eq!(
            json["references"][0]["absolute_url"],
            "https://vidlax.xyz/upload/5/subtitles/tr.vtt"
        );
        assert_eq!(json["references"][0]["label"], "TR");
    }

    #[test]
    fn test_scan_lists_candidates_without_a_base() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("embed.html");
        std::fs::write(
            &input,
            r#"<script>player.setup({file: "/upload/5/hls/master.m3u8", tracks: [{file: "../tr.vtt", label: "TR"}]});</script>"#,
        )
        .unwrap();
        let output = dir.path().join("candidates.json");

        executor(0)
            .scan(&input, None, None, true, &OutputFormat::Json, Some(&output))
            .unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
        let raw: Vec<_> = json
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["raw_locator"].as_str().unwrap().to_string())
            .collect();
        assert!(raw.contains(&"/upload/5/hls/master.m3u8".to_string()));
        assert!(raw.contains(&"../tr.vtt".to_string()));
    }

    #[test]
    fn test_scan_requires_a_base() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("embed.html");
        std::fs::write(&input, "").unwrap();

        let err = executor(0)
            .scan(&input, None, None, false, &OutputFormat::Pretty, None)
            .unwrap_err();
        assert!(matches!(err, CliError::InvalidInput(_)));
    }

    #[test]
    fn test_scan_empty_document_reports_reason() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("embed.html");
        std::fs::write(&input, "<html></html>").unwrap();
        let output = dir.path().join("refs.txt");

        let err = executor(0)
            .scan(
                &input,
                Some("https://h/e"),
                None,
                false,
                &OutputFormat::Pretty,
                Some(&output),
            )
            .unwrap_err();
        assert!(matches!(
            err,
            CliError::NoReferences {
                reason: refscan_parser::extractor::FailureReason::NotFound,
                ..
            }
        ));
        assert!(std::fs::read_to_string(output).unwrap().contains("not-found"));
    }
}
