use crate::{cli::OutputFormat, error::Result};
#[cfg(feature = "colored-output")]
use colored::*;
use refscan_parser::extractor::hls_extractor::ManifestSummary;
use refscan_parser::media::{MediaReference, ResolvedReference};
use refscan_parser::playlist::PlaylistBuilder;
use refscan_parser::sites::diziyiizle::SeriesReport;
use refscan_parser::sites::setfilmizle::CrawlReport;
use refscan_parser::source::{BatchReport, ItemOutcome, ItemResult, PageExtraction};
use serde::Serialize;
use std::borrow::Cow;
use std::io::Write;
use std::path::{Path, PathBuf};
#[cfg(feature = "table-output")]
use tabled::{Table, Tabled, settings::Style};

pub struct OutputManager {
    colored: bool,
}

impl OutputManager {
    pub fn new(colored: bool) -> Self {
        Self { colored }
    }

    pub fn format_outcome(&self, outcome: &ItemOutcome, format: &OutputFormat) -> Result<String> {
        match format {
            OutputFormat::Pretty => Ok(self.format_outcome_pretty(outcome)),
            OutputFormat::Json => Self::to_json(outcome, true),
            OutputFormat::JsonCompact => Self::to_json(outcome, false),
            #[cfg(feature = "table-output")]
            OutputFormat::Table => Ok(Self::format_table(outcome.references())),
            #[cfg(not(feature = "table-output"))]
            OutputFormat::Table => Ok(self.format_outcome_pretty(outcome)),
            OutputFormat::Csv => Ok(Self::format_csv(std::slice::from_ref(outcome))),
        }
    }

    /// Undecoded candidates as the scanners found them.
    pub fn format_candidates(
        &self,
        source: &str,
        candidates: &[MediaReference],
        format: &OutputFormat,
    ) -> Result<String> {
        match format {
            OutputFormat::Json => Self::to_json(candidates, true),
            OutputFormat::JsonCompact => Self::to_json(candidates, false),
            OutputFormat::Csv => {
                let mut output = String::from("kind,encoding,label,raw_locator\n");
                for c in candidates {
                    output.push_str(&format!(
                        "{},{},\"{}\",\"{}\"\n",
                        c.kind,
                        c.encoding,
                        Self::escape_csv(c.label.as_deref().unwrap_or_default()),
                        Self::escape_csv(&c.raw_locator)
                    ));
                }
                Ok(output)
            }
            OutputFormat::Pretty | OutputFormat::Table => {
                let mut output = String::new();
                output.push_str(&self.colorize("Candidates:", &Color::Green, true));
                output.push(' ');
                output.push_str(&self.colorize(source, &Color::Blue, false));
                output.push('\n');
                for c in candidates {
                    let label = c
                        .label
                        .as_deref()
                        .map(|l| format!(" [{l}]"))
                        .unwrap_or_default();
                    output.push_str(&format!(
                        "  {:<9}{:<11}{} {}\n",
                        self.colorize(c.kind.as_str(), &Color::Yellow, false),
                        c.encoding.as_str(),
                        self.colorize(&label, &Color::Cyan, false),
                        c.raw_locator
                    ));
                }
                if candidates.is_empty() {
                    output.push_str(&format!(
                        "  {}\n",
                        self.colorize("none", &Color::Yellow, false)
                    ));
                }
                Ok(output)
            }
        }
    }

    pub fn format_page(&self, page: &PageExtraction, format: &OutputFormat) -> Result<String> {
        match format {
            OutputFormat::Json => Self::to_json(page, true),
            OutputFormat::JsonCompact => Self::to_json(page, false),
            OutputFormat::Pretty => Ok(self.format_page_pretty(page)),
            OutputFormat::Table | OutputFormat::Csv => {
                self.format_outcome(&page.clone().into_outcome(), format)
            }
        }
    }

    pub fn format_batch(&self, report: &BatchReport, format: &OutputFormat) -> Result<String> {
        match format {
            OutputFormat::Json => Self::to_json(report, true),
            OutputFormat::JsonCompact => Self::to_json(report, false),
            OutputFormat::Csv => Ok(Self::format_csv(&report.outcomes)),
            OutputFormat::Pretty | OutputFormat::Table => Ok(self.format_batch_summary(report)),
        }
    }

    pub fn format_probe(
        &self,
        url: &str,
        summary: &ManifestSummary,
        format: &OutputFormat,
    ) -> Result<String> {
        match format {
            OutputFormat::Json => Self::to_json(summary, true),
            OutputFormat::JsonCompact => Self::to_json(summary, false),
            _ => Ok(self.format_probe_pretty(url, summary)),
        }
    }

    pub fn format_crawl(
        &self,
        report: &CrawlReport,
        playlist: &PlaylistBuilder,
        path: &Path,
    ) -> String {
        let mut output = String::new();
        output.push_str(&self.colorize("Crawl Summary:", &Color::Green, true));
        output.push('\n');
        output.push_str(&self.field("Pages", &report.pages_scanned.to_string()));
        output.push_str(&self.field("Films", &report.films().to_string()));
        output.push_str(&self.field("Streams", &playlist.len().to_string()));
        output.push_str(&self.field("Failed films", &report.failures().count().to_string()));
        for (group, count) in playlist.group_counts() {
            output.push_str(&format!(
                "    {}: {}\n",
                self.colorize(group, &Color::Yellow, false),
                count
            ));
        }
        output.push_str(&format!(
            "  {}: {}\n",
            self.colorize("Playlist", &Color::Yellow, false),
            self.colorize(&path.display().to_string(), &Color::Blue, false)
        ));
        output
    }

    pub fn format_series(
        &self,
        report: &SeriesReport,
        written: &[PathBuf],
        master: &Path,
    ) -> String {
        let mut output = String::new();
        output.push_str(&self.colorize("Series Summary:", &Color::Green, true));
        output.push('\n');
        output.push_str(&self.field("Series", &report.series().to_string()));
        output.push_str(&self.field("Entries", &report.entries().len().to_string()));
        output.push_str(&self.field("Failed series", &report.failures().count().to_string()));
        output.push_str(&self.field(
            "Failed episodes",
            &report.failed_episodes().count().to_string(),
        ));
        output.push_str(&self.field("Series playlists", &written.len().to_string()));
        output.push_str(&format!(
            "  {}: {}\n",
            self.colorize("Master playlist", &Color::Yellow, false),
            self.colorize(&master.display().to_string(), &Color::Blue, false)
        ));
        output
    }

    fn format_page_pretty(&self, page: &PageExtraction) -> String {
        let mut output = self.format_outcome_pretty(&page.clone().into_outcome());
        if let Some(title) = &page.video_info.title {
            output.push_str(&self.field("Title", &page.video_info.display_title(title)));
        }
        for embed in &page.embeds {
            let status = match embed.reason() {
                None => format!("{} reference(s)", embed.references().len()),
                Some(reason) => reason.to_string(),
            };
            output.push_str(&format!(
                "  {} {} ({})\n",
                self.colorize("embed", &Color::Yellow, false),
                self.colorize(&embed.url, &Color::Blue, false),
                status
            ));
        }
        output
    }

    fn format_outcome_pretty(&self, outcome: &ItemOutcome) -> String {
        let mut output = String::new();
        output.push_str(&self.colorize("References:", &Color::Green, true));
        output.push(' ');
        output.push_str(&self.colorize(&outcome.url, &Color::Blue, false));
        output.push('\n');

        match &outcome.result {
            ItemResult::Found { references } => {
                for reference in references {
                    output.push_str(&self.reference_line(reference));
                }
            }
            ItemResult::Empty { reason, detail } => {
                output.push_str(&format!(
                    "  {} ({}): {}\n",
                    self.colorize("none", &Color::Yellow, false),
                    reason,
                    detail
                ));
            }
        }
        output
    }

    fn reference_line(&self, reference: &ResolvedReference) -> String {
        let label = reference
            .label
            .as_deref()
            .map(|l| format!(" [{l}]"))
            .unwrap_or_default();
        format!(
            "  {:<9}{} {}\n",
            self.colorize(reference.kind.as_str(), &Color::Yellow, false),
            self.colorize(&label, &Color::Cyan, false),
            self.colorize(&reference.absolute_url, &Color::Blue, false)
        )
    }

    fn format_batch_summary(&self, report: &BatchReport) -> String {
        let mut summary = String::new();
        summary.push_str("=== Batch Processing Summary ===\n\n");

        let successful = report.succeeded().count();
        summary.push_str(&format!("Total URLs: {}\n", report.len()));
        summary.push_str(&format!("Successful: {successful}\n"));
        summary.push_str(&format!("Failed: {}\n\n", report.len() - successful));

        for (index, outcome) in report.outcomes.iter().enumerate() {
            match &outcome.result {
                ItemResult::Found { references } => {
                    summary.push_str(&format!(
                        "[{}] ✓ SUCCESS: {} ({} reference(s))\n",
                        index + 1,
                        outcome.url,
                        references.len()
                    ));
                    for reference in references {
                        summary.push_str(&self.reference_line(reference));
                    }
                }
                ItemResult::Empty { reason, detail } => {
                    summary.push_str(&format!(
                        "[{}] ✗ {}: {} ({})\n",
                        index + 1,
                        reason,
                        outcome.url,
                        detail
                    ));
                }
            }
        }
        summary
    }

    fn format_probe_pretty(&self, url: &str, summary: &ManifestSummary) -> String {
        let mut output = String::new();
        match summary {
            ManifestSummary::Master {
                variants,
                subtitles,
            } => {
                output.push_str(&self.colorize("Master Playlist:", &Color::Green, true));
                output.push(' ');
                output.push_str(&self.colorize(url, &Color::Blue, false));
                output.push('\n');
                for variant in variants {
                    output.push_str(&format!(
                        "  {} {} kbps {} {}\n",
                        self.colorize(
                            variant.resolution.as_deref().unwrap_or("-"),
                            &Color::Yellow,
                            false
                        ),
                        variant.bitrate,
                        variant.codecs,
                        self.colorize(&variant.url, &Color::Blue, false)
                    ));
                }
                for subtitle in subtitles {
                    output.push_str(&format!(
                        "  {} {} ({}) {}\n",
                        self.colorize("subtitle", &Color::Yellow, false),
                        subtitle.name,
                        subtitle.language.as_deref().unwrap_or("-"),
                        self.colorize(&subtitle.url, &Color::Blue, false)
                    ));
                }
            }
            ManifestSummary::Media {
                segments,
                target_duration,
                total_duration,
                ended,
            } => {
                output.push_str(&self.colorize("Media Playlist:", &Color::Green, true));
                output.push(' ');
                output.push_str(&self.colorize(url, &Color::Blue, false));
                output.push('\n');
                output.push_str(&self.field("Segments", &segments.to_string()));
                output.push_str(&self.field("Target duration", &format!("{target_duration}s")));
                output.push_str(&self.field("Total duration", &format!("{total_duration:.1}s")));
                output.push_str(&self.field("Ended", &ended.to_string()));
            }
        }
        output
    }

    fn field(&self, name: &str, value: &str) -> String {
        format!(
            "  {}: {}\n",
            self.colorize(name, &Color::Yellow, false),
            self.colorize(value, &Color::Cyan, false)
        )
    }

    fn to_json<T: Serialize + ?Sized>(value: &T, pretty: bool) -> Result<String> {
        let result = if pretty {
            serde_json::to_string_pretty(value)?
        } else {
            serde_json::to_string(value)?
        };
        Ok(result)
    }

    #[cfg(feature = "table-output")]
    fn format_table(references: &[ResolvedReference]) -> String {
        #[derive(Tabled)]
        struct TableRow<'a> {
            kind: &'a str,
            label: Cow<'a, str>,
            url: &'a str,
        }

        let rows = references.iter().map(|r| TableRow {
            kind: r.kind.as_str(),
            label: r
                .label
                .as_deref()
                .map(Cow::Borrowed)
                .unwrap_or(Cow::Borrowed("-")),
            url: &r.absolute_url,
        });

        Table::new(rows).with(Style::modern()).to_string()
    }

    /// One row per reference; failed items get a single row with the reason.
    fn format_csv(outcomes: &[ItemOutcome]) -> String {
        let mut output = String::from("url,status,kind,label,absolute_url,reason\n");
        for outcome in outcomes {
            match &outcome.result {
                ItemResult::Found { references } => {
                    for r in references {
                        output.push_str(&format!(
                            "\"{}\",found,{},\"{}\",\"{}\",\n",
                            Self::escape_csv(&outcome.url),
                            r.kind,
                            Self::escape_csv(r.label.as_deref().unwrap_or_default()),
                            Self::escape_csv(&r.absolute_url)
                        ));
                    }
                }
                ItemResult::Empty { reason, .. } => {
                    output.push_str(&format!(
                        "\"{}\",empty,,,,{}\n",
                        Self::escape_csv(&outcome.url),
                        reason
                    ));
                }
            }
        }
        output
    }

    fn escape_csv(s: &str) -> Cow<'_, str> {
        if s.contains('"') {
            Cow::Owned(s.replace('"', "\"\""))
        } else {
            Cow::Borrowed(s)
        }
    }

    fn colorize(&self, text: &str, color: &Color, bold: bool) -> String {
        #[cfg(feature = "colored-output")]
        {
            if self.colored {
                let colored_text = match color {
                    Color::Green => text.green(),
                    Color::Yellow => text.yellow(),
                    Color::Blue => text.blue(),
                    Color::Cyan => text.cyan(),
                };
                if bold {
                    colored_text.bold().to_string()
                } else {
                    colored_text.to_string()
                }
            } else {
                text.to_string()
            }
        }

        #[cfg(not(feature = "colored-output"))]
        {
            let _ = (self.colored, color, bold);
            text.to_string()
        }
    }
}

enum Color {
    Green,
    Yellow,
    Blue,
    Cyan,
}

pub fn write_output(content: &str, output_file: Option<&Path>) -> Result<()> {
    match output_file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, content)?;
        }
        None => {
            print!("{content}");
            std::io::stdout().flush()?;
        }
    }
    Ok(())
}
