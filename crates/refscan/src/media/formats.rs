use std::fmt::Display;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Path fragments that mark a streaming manifest.
pub const MANIFEST_SUFFIXES: &[&str] = &[".m3u8", "master.txt", "/master"];

/// Path fragments that mark a subtitle track.
pub const SUBTITLE_SUFFIXES: &[&str] = &[".vtt", ".srt", ".ass"];

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum ReferenceKind {
    Manifest,
    Subtitle,
}

impl ReferenceKind {
    pub fn as_str(&self) -> &str {
        match self {
            ReferenceKind::Manifest => "manifest",
            ReferenceKind::Subtitle => "subtitle",
        }
    }

    /// Classifies a locator by the suffix it carries. Query strings and fragments are ignored.
    pub fn from_locator(locator: &str) -> Option<Self> {
        let path = locator
            .split(['?', '#'])
            .next()
            .unwrap_or(locator)
            .to_ascii_lowercase();

        if SUBTITLE_SUFFIXES.iter().any(|s| path.ends_with(s)) {
            Some(ReferenceKind::Subtitle)
        } else if MANIFEST_SUFFIXES.iter().any(|s| path.contains(s)) {
            Some(ReferenceKind::Manifest)
        } else {
            None
        }
    }
}

impl Display for ReferenceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ReferenceKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "manifest" | "hls" | "m3u8" => Ok(ReferenceKind::Manifest),
            "subtitle" | "subtitles" | "captions" => Ok(ReferenceKind::Subtitle),
            _ => Err(()),
        }
    }
}

/// How a locator was written in the source document.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum LocatorEncoding {
    PlainText,
    HexEscaped,
    Base64,
    JsonTrackObject,
}

impl LocatorEncoding {
    pub fn as_str(&self) -> &str {
        match self {
            LocatorEncoding::PlainText => "plain",
            LocatorEncoding::HexEscaped => "hex",
            LocatorEncoding::Base64 => "base64",
            LocatorEncoding::JsonTrackObject => "json-track",
        }
    }
}

impl Display for LocatorEncoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Returns true when the text mentions a manifest suffix anywhere.
pub fn contains_manifest_suffix(text: &str) -> bool {
    let lower = text.to_ascii_lowercase();
    MANIFEST_SUFFIXES.iter().any(|s| lower.contains(s))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_locator() {
        assert_eq!(
            ReferenceKind::from_locator("https://cdn.example/hls/index.m3u8?token=1"),
            Some(ReferenceKind::Manifest)
        );
        assert_eq!(
            ReferenceKind::from_locator("/manifests/abc/master.txt"),
            Some(ReferenceKind::Manifest)
        );
        assert_eq!(
            ReferenceKind::from_locator("../upload/5/subtitles/tr.vtt"),
            Some(ReferenceKind::Subtitle)
        );
        assert_eq!(ReferenceKind::from_locator("/static/player.js"), None);
    }

    #[test]
    fn test_kind_round_trips_through_str() {
        for kind in [ReferenceKind::Manifest, ReferenceKind::Subtitle] {
            assert_eq!(kind.as_str().parse::<ReferenceKind>(), Ok(kind));
        }
        assert!("poster".parse::<ReferenceKind>().is_err());
    }
}
