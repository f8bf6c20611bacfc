use m3u8_rs::{AlternativeMediaType, MasterPlaylist, MediaPlaylist, Playlist};
use reqwest::Client;
use reqwest::header::{HeaderMap, HeaderValue, REFERER};
use serde::Serialize;
use tracing::debug;
use url::Url;

use super::error::ExtractorError;

/// One variant stream of a master playlist.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariantInfo {
    pub url: String,
    /// kbps
    pub bitrate: u64,
    pub resolution: Option<String>,
    pub codecs: String,
    pub fps: f64,
}

/// A subtitle rendition advertised by a master playlist.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenditionInfo {
    pub url: String,
    pub name: String,
    pub language: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ManifestSummary {
    Master {
        variants: Vec<VariantInfo>,
        subtitles: Vec<RenditionInfo>,
    },
    Media {
        segments: usize,
        target_duration: u64,
        total_duration: f64,
        ended: bool,
    },
}

impl ManifestSummary {
    pub fn is_master(&self) -> bool {
        matches!(self, ManifestSummary::Master { .. })
    }
}

/// Fetches a manifest and reports what kind of playlist it is.
///
/// Used to check that an extracted manifest reference actually serves a playlist.
#[derive(Debug, Clone)]
pub struct HlsProbe {
    client: Client,
}

impl HlsProbe {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub async fn probe(
        &self,
        manifest_url: &str,
        referer: Option<&str>,
    ) -> Result<ManifestSummary, ExtractorError> {
        let base_url = Url::parse(manifest_url)
            .map_err(|e| ExtractorError::InvalidUrl(format!("{manifest_url}: {e}")))?;

        let mut headers = HeaderMap::new();
        if let Some(referer) = referer {
            if let Ok(value) = HeaderValue::from_str(referer) {
                headers.insert(REFERER, value);
            }
        }

        let response = self
            .client
            .get(manifest_url)
            .headers(headers)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ExtractorError::HttpStatus {
                status: status.as_u16(),
                url: manifest_url.to_string(),
            });
        }

        let body = response.bytes().await?;
        debug!("probed {} ({} bytes)", manifest_url, body.len());
        parse_manifest(&body, &base_url)
    }
}

/// Parses playlist bytes, resolving variant and rendition URIs against `base_url`.
pub fn parse_manifest(bytes: &[u8], base_url: &Url) -> Result<ManifestSummary, ExtractorError> {
    let playlist = m3u8_rs::parse_playlist_res(bytes)
        .map_err(|e| ExtractorError::HlsPlaylistError(e.to_string()))?;

    Ok(match playlist {
        Playlist::MasterPlaylist(pl) => summarize_master(pl, base_url),
        Playlist::MediaPlaylist(pl) => summarize_media(pl),
    })
}

fn summarize_master(playlist: MasterPlaylist, base_url: &Url) -> ManifestSummary {
    let join = |uri: &str| {
        base_url
            .join(uri)
            .map(|u| u.to_string())
            .unwrap_or_else(|_| uri.to_string())
    };

    let variants = playlist
        .variants
        .iter()
        .filter(|variant| !variant.is_i_frame)
        .map(|variant| VariantInfo {
            url: join(&variant.uri),
            bitrate: variant.bandwidth / 1000,
            resolution: variant
                .resolution
                .as_ref()
                .map(|r| format!("{}x{}", r.width, r.height)),
            codecs: variant.codecs.clone().unwrap_or_default(),
            fps: variant.frame_rate.unwrap_or(0.0),
        })
        .collect();

    let subtitles = playlist
        .alternatives
        .iter()
        .filter(|media| media.media_type == AlternativeMediaType::Subtitles)
        .filter_map(|media| {
            Some(RenditionInfo {
                url: join(media.uri.as_deref()?),
                name: media.name.clone(),
                language: media.language.clone(),
            })
        })
        .collect();

    ManifestSummary::Master {
        variants,
        subtitles,
    }
}

fn summarize_media(playlist: MediaPlaylist) -> ManifestSummary {
    ManifestSummary::Media {
        segments: playlist.segments.len(),
        target_duration: playlist.target_duration as u64,
        total_duration: playlist
            .segments
            .iter()
            .map(|s| f64::from(s.duration))
            .sum(),
        ended: playlist.end_list,
    }
}
