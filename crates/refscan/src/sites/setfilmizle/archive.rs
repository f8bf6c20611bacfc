use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use serde::Serialize;
use url::Url;

static ARTICLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("article.item.dortlu.movies").unwrap());
static TITLE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("h2 a").unwrap());
static POSTER_LINK: LazyLock<Selector> = LazyLock::new(|| Selector::parse(".poster a").unwrap());
static POSTER_IMAGE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".poster img").unwrap());
static LAST_PAGE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("span.last-page[data-page]").unwrap());
static PAGE_NUMBER: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("span.page-number").unwrap());

/// A film listed on an archive page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilmInfo {
    pub title: String,
    pub link: String,
    pub logo: String,
}

/// Collects the films of one archive page. Articles missing a title, link or poster are skipped;
/// links and posters are made absolute against `page_url`.
pub fn parse_archive(html: &str, page_url: &str) -> Vec<FilmInfo> {
    let document = Html::parse_document(html);
    let base = Url::parse(page_url).ok();

    document
        .select(&ARTICLE)
        .filter_map(|article| parse_article(article, base.as_ref()))
        .collect()
}

fn parse_article(article: ElementRef<'_>, base: Option<&Url>) -> Option<FilmInfo> {
    let title = article.select(&TITLE).next()?;
    let link = article.select(&POSTER_LINK).next()?;
    let image = article.select(&POSTER_IMAGE).next()?;

    let title = title.text().collect::<String>().trim().to_string();
    let href = link.value().attr("href")?;
    let logo = image
        .value()
        .attr("data-src")
        .filter(|s| !s.trim().is_empty())
        .or_else(|| image.value().attr("src"))
        .unwrap_or_default();

    Some(FilmInfo {
        title,
        link: absolutize(href, base),
        logo: absolutize(logo, base),
    })
}

fn absolutize(href: &str, base: Option<&Url>) -> String {
    let href = href.trim();
    if href.is_empty() {
        return String::new();
    }
    base.and_then(|b| b.join(href).ok())
        .map(|u| u.to_string())
        .unwrap_or_else(|| href.to_string())
}

/// Number of archive pages: the `data-page` of the last-page marker, else the highest numbered
/// page link, else 0 when the pagination could not be read.
pub fn parse_page_count(html: &str) -> u32 {
    let document = Html::parse_document(html);

    if let Some(last) = document
        .select(&LAST_PAGE)
        .filter_map(|e| e.value().attr("data-page"))
        .find_map(|p| p.trim().parse::<u32>().ok())
    {
        return last;
    }

    document
        .select(&PAGE_NUMBER)
        .filter_map(|e| e.text().collect::<String>().trim().parse::<u32>().ok())
        .max()
        .unwrap_or(0)
}

/// URL of archive page `page` (1-based).
pub fn page_url(archive_url: &str, page: u32) -> String {
    if page <= 1 {
        return archive_url.to_string();
    }
    let archive = archive_url.trim_end_matches('/');
    format!("{archive}/page/{page}/")
}
