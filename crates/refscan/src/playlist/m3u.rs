use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

pub const GROUP_ALL: &str = "Tüm Filmler";
pub const GROUP_DUBBED: &str = "Türkçe Dublaj";
pub const GROUP_SUBTITLED: &str = "Türkçe Altyazılı";

/// Headers the player has to send when opening a stream, emitted as `#EXTVLCOPT` lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamHeaders {
    pub referer: String,
    pub user_agent: String,
}

/// One playable stream of a title, before grouping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StreamItem {
    pub title: String,
    pub logo: String,
    pub label: String,
    pub stream_url: String,
    pub subtitle_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlaylistEntry {
    pub group: String,
    pub logo: String,
    pub title: String,
    pub label: String,
    pub stream_url: String,
    pub subtitle_url: Option<String>,
}

impl PlaylistEntry {
    pub fn new(group: &str, item: &StreamItem) -> Self {
        Self {
            group: group.to_string(),
            logo: item.logo.clone(),
            title: item.title.clone(),
            label: item.label.clone(),
            stream_url: item.stream_url.clone(),
            subtitle_url: item.subtitle_url.clone(),
        }
    }

    /// Renders the entry. Commas are dropped from the title since they end the `#EXTINF`
    /// attribute list.
    pub fn render(&self, headers: &StreamHeaders) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "#EXTINF:-1 group-title=\"{}\" tvg-logo=\"{}\",{} | {}",
            self.group,
            self.logo,
            self.title.replace(',', ""),
            self.label
        );
        let _ = writeln!(out, "#EXTVLCOPT:http-referrer={}", headers.referer);
        let _ = writeln!(out, "#EXTVLCOPT:http-user-agent={}", headers.user_agent);
        if let Some(subtitle) = &self.subtitle_url {
            let _ = writeln!(out, "#EXTVLCOPT:sub-file={subtitle}");
        }
        let _ = writeln!(out, "{}", self.stream_url);
        out
    }
}

/// Collects streams into the three playlist groups.
///
/// Every stream goes into [`GROUP_ALL`] and into exactly one of the language groups.
#[derive(Debug, Clone)]
pub struct PlaylistBuilder {
    headers: StreamHeaders,
    all: Vec<PlaylistEntry>,
    dubbed: Vec<PlaylistEntry>,
    subtitled: Vec<PlaylistEntry>,
}

impl PlaylistBuilder {
    pub fn new(headers: StreamHeaders) -> Self {
        Self {
            headers,
            all: Vec::new(),
            dubbed: Vec::new(),
            subtitled: Vec::new(),
        }
    }

    pub fn add(&mut self, item: StreamItem) {
        self.all.push(PlaylistEntry::new(GROUP_ALL, &item));
        if item.label.contains("Dublaj") {
            self.dubbed.push(PlaylistEntry::new(GROUP_DUBBED, &item));
        } else {
            self.subtitled.push(PlaylistEntry::new(GROUP_SUBTITLED, &item));
        }
    }

    /// Number of streams added.
    pub fn len(&self) -> usize {
        self.all.len()
    }

    pub fn is_empty(&self) -> bool {
        self.all.is_empty()
    }

    /// `(group, entry count)` in the order the groups are written.
    pub fn group_counts(&self) -> [(&'static str, usize); 3] {
        [
            (GROUP_ALL, self.all.len()),
            (GROUP_DUBBED, self.dubbed.len()),
            (GROUP_SUBTITLED, self.subtitled.len()),
        ]
    }

    pub fn entries(&self) -> impl Iterator<Item = &PlaylistEntry> {
        self.all
            .iter()
            .chain(self.dubbed.iter())
            .chain(self.subtitled.iter())
    }

    pub fn render(&self) -> String {
        let mut out = String::from("#EXTM3U\n");
        for entry in self.entries() {
            out.push_str(&entry.render(&self.headers));
        }
        out
    }

    pub fn write_to(&self, path: &Path) -> io::Result<()> {
        for (group, count) in self.group_counts() {
            info!("writing {} entries to group '{}'", count, group);
        }
        write_playlist(path, &self.render())
    }
}

/// Writes a rendered playlist in one call, creating missing parent directories.
pub fn write_playlist(path: &Path, content: &str) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, content)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers() -> StreamHeaders {
        StreamHeaders {
            referer: "https://vctplay.site/".to_string(),
            user_agent: "Gecko) Chrome/140.0.7339.207 Mobile Safari/537.36".to_string(),
        }
    }

    fn item(title: &str, label: &str, url: &str) -> StreamItem {
        StreamItem {
            title: title.to_string(),
            logo: "https://img.example/p.jpg".to_string(),
            label: label.to_string(),
            stream_url: url.to_string(),
            subtitle_url: None,
        }
    }

    #[test]
    fn test_entry_format() {
        let entry = PlaylistEntry::new(
            GROUP_ALL,
            &item(
                "Dune, Part Two",
                "Türkçe Dublaj",
                "https://vctplay.site/manifests/abc/master.txt",
            ),
        );
        assert_eq!(
            entry.render(&headers()),
            "#EXTINF:-1 group-title=\"Tüm Filmler\" tvg-logo=\"https://img.example/p.jpg\",Dune Part Two | Türkçe Dublaj\n\
             #EXTVLCOPT:http-referrer=https://vctplay.site/\n\
             #EXTVLCOPT:http-user-agent=Gecko) Chrome/140.0.7339.207 Mobile Safari/537.36\n\
             https://vctplay.site/manifests/abc/master.txt\n"
        );
    }

    #[test]
    fn test_subtitle_option_line() {
        let mut with_sub = item("X", "Türkçe Altyazılı", "https://h/m.m3u8");
        with_sub.subtitle_url = Some("https://h/tr.vtt".to_string());
        let rendered = PlaylistEntry::new(GROUP_SUBTITLED, &with_sub).render(&headers());
        let lines: Vec<_> = rendered.lines().collect();
        assert_eq!(lines[3], "#EXTVLCOPT:sub-file=https://h/tr.vtt");
        assert_eq!(lines[4], "https://h/m.m3u8");
    }

    #[test]
    fn test_grouping_order() {
        let mut builder = PlaylistBuilder::new(headers());
        builder.add(item("A", "Türkçe Altyazılı", "https://h/a"));
        builder.add(item("B", "Türkçe Dublaj", "https://h/b"));

        assert_eq!(
            builder.group_counts(),
            [(GROUP_ALL, 2), (GROUP_DUBBED, 1), (GROUP_SUBTITLED, 1)]
        );

        let rendered = builder.render();
        assert!(rendered.starts_with("#EXTM3U\n"));
        let urls: Vec<_> = rendered.lines().filter(|l| l.starts_with("https://h/")).collect();
        assert_eq!(urls, vec!["https://h/a", "https://h/b", "https://h/b", "https://h/a"]);
    }

    #[test]
    fn test_write_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("setfilmizlefilm.m3u");

        let mut builder = PlaylistBuilder::new(headers());
        builder.add(item("A", "Türkçe Dublaj", "https://h/a"));
        builder.write_to(&path).unwrap();

        let written = fs::read_to_string(&path).unwrap();
        assert_eq!(written, builder.render());
        assert_eq!(written.matches("#EXTINF").count(), 2);
    }

    #[test]
    fn test_empty_playlist_is_header_only() {
        let builder = PlaylistBuilder::new(headers());
        assert!(builder.is_empty());
        assert_eq!(builder.render(), "#EXTM3U\n");
    }
}
