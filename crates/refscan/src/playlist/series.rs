use std::fmt::Write as _;
use std::io;
use std::path::{Path, PathBuf};

use chrono::Local;
use rustc_hash::FxHashMap;
use serde::Serialize;
use tracing::info;

use super::m3u::write_playlist;

pub const DEFAULT_SERIES_GROUP: &str = "Dizi";
pub const DEFAULT_SUBTITLE_TITLE: &str = "Altyazı";
pub const DEFAULT_SUBTITLE_LANGUAGE: &str = "tr";
pub const MASTER_PLAYLIST_FILE: &str = "master_all_series_playlist.m3u";
const SERIES_FILE_PREFIX: &str = "individual";

/// A subtitle attached to an episode, emitted as `#EXTVLCSUB` lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubtitleTrack {
    pub url: String,
    pub label: Option<String>,
}

/// One playable manifest of a series episode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EpisodeItem {
    pub title: String,
    pub stream_url: String,
    pub episode_url: String,
    pub series_url: String,
    pub poster: Option<String>,
    pub backdrop: Option<String>,
    pub group: Option<String>,
    pub subtitles: Vec<SubtitleTrack>,
}

impl EpisodeItem {
    fn logo(&self) -> Option<&str> {
        [self.poster.as_deref(), self.backdrop.as_deref()]
            .into_iter()
            .flatten()
            .find(|logo| !logo.is_empty())
    }

    /// Renders the entry; `group` becomes the `group-title` attribute when given.
    pub fn render(&self, group: Option<&str>) -> String {
        let mut attrs = String::new();
        if let Some(logo) = self.logo() {
            let _ = write!(attrs, " tvg-logo=\"{logo}\"");
        }
        if let Some(group) = group {
            let _ = write!(attrs, " group-title=\"{group}\"");
        }

        let mut out = String::new();
        let _ = writeln!(out, "#EXTINF:-1{attrs},{}", self.title);
        for subtitle in &self.subtitles {
            let _ = writeln!(out, "#EXTVLCSUB:{}", subtitle.url);
            let _ = writeln!(
                out,
                "#EXTVLCSUB-TITLE:{}",
                subtitle.label.as_deref().unwrap_or(DEFAULT_SUBTITLE_TITLE)
            );
            let _ = writeln!(
                out,
                "#EXTVLCSUB-LANGUAGE:{}",
                subtitle.label.as_deref().unwrap_or(DEFAULT_SUBTITLE_LANGUAGE)
            );
        }
        let _ = writeln!(out, "{}\n", self.stream_url);
        out
    }
}

/// Local time in the format used by playlist headers.
pub fn generated_at() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Last path segment of a series URL, e.g. `kurulus-osman`.
pub fn series_slug(series_url: &str) -> &str {
    series_url
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default()
}

/// `individual_kurulus_osman.m3u` for `.../dizi/kurulus-osman/`.
pub fn series_file_name(series_url: &str) -> String {
    format!(
        "{SERIES_FILE_PREFIX}_{}.m3u",
        series_slug(series_url).replace('-', "_")
    )
}

fn display_name(series_url: &str) -> String {
    series_slug(series_url).replace('-', " ").to_uppercase()
}

/// Groups items by series, keeping the order series first appear in.
fn group_by_series(items: &[EpisodeItem]) -> Vec<(&str, Vec<&EpisodeItem>)> {
    let mut index: FxHashMap<&str, usize> = FxHashMap::default();
    let mut groups: Vec<(&str, Vec<&EpisodeItem>)> = Vec::new();
    for item in items {
        let key = item.series_url.trim_end_matches('/');
        let position = *index.entry(key).or_insert_with(|| {
            groups.push((key, Vec::new()));
            groups.len() - 1
        });
        groups[position].1.push(item);
    }
    groups
}

fn write_artwork_comments(out: &mut String, first: Option<&EpisodeItem>) {
    if let Some(first) = first {
        if let Some(poster) = first.poster.as_deref().filter(|p| !p.is_empty()) {
            let _ = writeln!(out, "# Poster: {poster}");
        }
        if let Some(backdrop) = first.backdrop.as_deref().filter(|b| !b.is_empty()) {
            let _ = writeln!(out, "# Backdrop: {backdrop}");
        }
    }
}

/// Playlist of one series. Entries carry a `group-title` only when the site named a platform.
pub fn render_series_playlist(
    series_url: &str,
    items: &[&EpisodeItem],
    generated_at: &str,
) -> String {
    let mut out = String::from("#EXTM3U\n");
    let _ = writeln!(out, "# {} - TÜM BÖLÜMLER", display_name(series_url));
    let _ = writeln!(out, "# Oluşturma Tarihi: {generated_at}");
    let _ = writeln!(out, "# Toplam Bölüm: {}", items.len());
    let _ = writeln!(out, "# Dizi URL: {series_url}");
    let first = items.first().copied();
    write_artwork_comments(&mut out, first);
    if let Some(group) = first.and_then(|item| item.group.as_deref()) {
        let _ = writeln!(out, "# Grup: {group}");
    }
    out.push('\n');

    for item in items {
        out.push_str(&item.render(item.group.as_deref()));
    }
    out
}

/// Playlist of every series, one `#EXTGRP` section per series. Entries always carry a
/// `group-title`, [`DEFAULT_SERIES_GROUP`] when the site named none.
pub fn render_master_playlist(items: &[EpisodeItem], generated_at: &str) -> String {
    let mut out = String::from("#EXTM3U\n");
    let _ = writeln!(out, "# TÜM DİZİLER - MASTER PLAYLIST");
    let _ = writeln!(out, "# Oluşturma Tarihi: {generated_at}");
    let _ = writeln!(out, "# Toplam Bölüm: {}\n", items.len());

    for (series_url, episodes) in group_by_series(items) {
        let first = episodes.first().copied();
        let group = first
            .and_then(|item| item.group.as_deref())
            .unwrap_or(DEFAULT_SERIES_GROUP);

        let _ = writeln!(
            out,
            "\n# === {} === ({} bölüm)",
            display_name(series_url),
            episodes.len()
        );
        let _ = writeln!(out, "#EXTGRP:{group}");
        write_artwork_comments(&mut out, first);

        for item in &episodes {
            let group = item.group.as_deref().unwrap_or(DEFAULT_SERIES_GROUP);
            out.push_str(&item.render(Some(group)));
        }
    }
    out
}

/// Writes one playlist per series into `dir` and returns the paths written.
pub fn write_series_playlists(
    dir: &Path,
    items: &[EpisodeItem],
    generated_at: &str,
) -> io::Result<Vec<PathBuf>> {
    let mut written = Vec::new();
    for (series_url, episodes) in group_by_series(items) {
        let path = dir.join(series_file_name(series_url));
        info!(
            "writing {} episode(s) of {} to {}",
            episodes.len(),
            series_slug(series_url),
            path.display()
        );
        write_playlist(
            &path,
            &render_series_playlist(series_url, &episodes, generated_at),
        )?;
        written.push(path);
    }
    Ok(written)
}
