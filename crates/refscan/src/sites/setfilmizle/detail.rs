use std::sync::LazyLock;

use scraper::{Html, Selector};
use serde::Serialize;

use crate::extractor::ExtractorError;

static PLAYEX: LazyLock<Selector> = LazyLock::new(|| Selector::parse("div#playex").unwrap());
static PLAYER_BUTTONS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("nav.player a, .idTabs.sourceslist a").unwrap());

pub const LABEL_DUBBED: &str = "Türkçe Dublaj";
pub const LABEL_SUBTITLED: &str = "Türkçe Altyazılı";

const FASTPLAY: &str = "fastplay";

/// A FastPlay source button on a film page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlayerSource {
    pub post_id: String,
    pub part_key: String,
    pub label: String,
}

/// What a film page provides for the embed lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilmPage {
    pub nonce: String,
    pub sources: Vec<PlayerSource>,
}

pub fn language_label(part_key: &str) -> &'static str {
    if part_key.to_lowercase().contains("dublaj") {
        LABEL_DUBBED
    } else {
        LABEL_SUBTITLED
    }
}

/// Reads the security nonce and the FastPlay buttons of a film page.
pub fn parse_film_page(html: &str) -> Result<FilmPage, ExtractorError> {
    let document = Html::parse_document(html);

    let nonce = document
        .select(&PLAYEX)
        .next()
        .and_then(|div| div.value().attr("data-nonce"))
        .filter(|n| !n.trim().is_empty())
        .ok_or_else(|| ExtractorError::Parse("nonce not found".to_string()))?
        .to_string();

    let sources = document
        .select(&PLAYER_BUTTONS)
        .filter(|button| {
            button
                .value()
                .attr("data-player-name")
                .is_some_and(|name| name.eq_ignore_ascii_case(FASTPLAY))
        })
        .filter_map(|button| {
            let post_id = button.value().attr("data-post-id")?.to_string();
            let part_key = button
                .value()
                .attr("data-part-key")
                .unwrap_or_default()
                .to_string();
            Some(PlayerSource {
                label: language_label(&part_key).to_string(),
                post_id,
                part_key,
            })
        })
        .collect();

    Ok(FilmPage { nonce, sources })
}

/// Form fields of the `get_video_url` AJAX call.
pub fn video_url_form<'a>(nonce: &'a str, source: &'a PlayerSource) -> [(&'static str, &'a str); 5] {
    [
        ("action", "get_video_url"),
        ("nonce", nonce),
        ("post_id", source.post_id.as_str()),
        ("player_name", "FastPlay"),
        ("part_key", source.part_key.as_str()),
    ]
}

/// Pulls `data.url` out of the AJAX response.
pub fn parse_video_url_response(body: &str) -> Result<Option<String>, ExtractorError> {
    let value: serde_json::Value = serde_json::from_str(body)?;
    Ok(value
        .get("data")
        .and_then(|data| data.get("url"))
        .and_then(|url| url.as_str())
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .map(str::to_string))
}

/// `https://vctplay.site/video/ID` serves its manifest at `https://vctplay.site/manifests/ID/master.txt`.
pub fn vctplay_manifest(embed_url: &str) -> Option<String> {
    embed_url
        .contains("vctplay.site/video/")
        .then(|| format!("{}/master.txt", embed_url.replacen("/video/", "/manifests/", 1)))
}
