use std::sync::LazyLock;

use rustc_hash::FxHashSet;
use scraper::{ElementRef, Html, Selector};
use serde::Serialize;

use super::listing::site_link;

fn selectors(patterns: &[&str]) -> Vec<Selector> {
    patterns
        .iter()
        .map(|pattern| Selector::parse(pattern).unwrap())
        .collect()
}

static POSTER: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    selectors(&[r#"img[src*="series_poster_"]"#, "div.overflow-hidden img"])
});
static BACKDROP: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    selectors(&[
        r#"img[src*="series_backdrop_"]"#,
        "div.absolute.inset-0 img",
        "div.relative img",
    ])
});
static OG_IMAGE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"meta[property="og:image"]"#).unwrap());
static HEADING: LazyLock<Selector> = LazyLock::new(|| Selector::parse("h4").unwrap());
static SPAN: LazyLock<Selector> = LazyLock::new(|| Selector::parse("span").unwrap());
static PLATFORM_FALLBACK: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    selectors(&["div.flex.flex-wrap.gap-2 span", r#"a[href*="/platform/"]"#])
});
static EPISODE_LINKS: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    selectors(&[r#"a[href*="/sezon-"][href*="-bolum/"]"#, r#"a[href*="-bolum/"]"#])
});

/// An episode link on a series page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EpisodeLink {
    pub url: String,
    pub title: Option<String>,
}

/// Artwork, platform group and episode links of a series page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SeriesPage {
    pub poster: Option<String>,
    pub backdrop: Option<String>,
    pub group: Option<String>,
    pub episodes: Vec<EpisodeLink>,
}

pub fn parse_series_page(html: &str, series_url: &str, site_url: &str) -> SeriesPage {
    let document = Html::parse_document(html);

    let mut poster = first_image(&document, &POSTER);
    let mut backdrop = first_image(&document, &BACKDROP);

    if poster.as_deref().is_none_or(is_inline_image) {
        let og_image = document
            .select(&OG_IMAGE)
            .filter_map(|meta| meta.value().attr("content"))
            .map(str::trim)
            .find(|content| !content.is_empty() && !is_inline_image(content));
        if let Some(og_image) = og_image {
            poster = Some(og_image.to_string());
        }
    }
    if backdrop.is_none() {
        backdrop = poster.clone();
    }

    SeriesPage {
        poster,
        backdrop,
        group: platform_group(&document),
        episodes: episode_links(&document, series_url, site_url),
    }
}

fn is_inline_image(src: &str) -> bool {
    src.starts_with("data:image")
}

fn first_image(document: &Html, candidates: &[Selector]) -> Option<String> {
    candidates.iter().find_map(|selector| {
        document
            .select(selector)
            .filter_map(|img| img.value().attr("src"))
            .map(str::trim)
            .find(|src| !src.is_empty())
            .map(str::to_string)
    })
}

fn collapsed_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Platform the series airs on: the span after the "Platform" heading, or the first platform
/// badge or link.
fn platform_group(document: &Html) -> Option<String> {
    let from_heading = document
        .select(&HEADING)
        .filter(|h4| h4.text().any(|t| t.contains("Platform")))
        .find_map(|h4| {
            let sibling = h4.next_siblings().find_map(ElementRef::wrap)?;
            let span = sibling.select(&SPAN).next()?;
            Some(collapsed_text(span)).filter(|text| !text.is_empty())
        });

    from_heading.or_else(|| {
        PLATFORM_FALLBACK.iter().find_map(|selector| {
            document
                .select(selector)
                .map(collapsed_text)
                .find(|text| !text.is_empty())
        })
    })
}

/// Episode links in document order. Season-style links are preferred; pages without them fall
/// back to any `-bolum/` link.
fn episode_links(document: &Html, series_url: &str, site_url: &str) -> Vec<EpisodeLink> {
    for selector in EPISODE_LINKS.iter() {
        let mut seen = FxHashSet::default();
        let links: Vec<EpisodeLink> = document
            .select(selector)
            .filter_map(|link| {
                let href = link.value().attr("href")?.trim();
                if !href.contains("bolum") {
                    return None;
                }
                let url = site_link(href, site_url, series_url);
                if !seen.insert(url.clone()) {
                    return None;
                }
                let title = Some(collapsed_text(link)).filter(|t| !t.is_empty());
                Some(EpisodeLink { url, title })
            })
            .collect();
        if !links.is_empty() {
            return links;
        }
    }
    Vec::new()
}
