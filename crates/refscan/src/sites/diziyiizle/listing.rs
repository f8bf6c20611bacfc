use std::sync::LazyLock;

use rustc_hash::FxHashSet;
use scraper::{Html, Selector};

static SERIES_LINKS: LazyLock<[Selector; 3]> = LazyLock::new(|| {
    [
        Selector::parse(r#"a[href*="/dizi/"]"#).unwrap(),
        Selector::parse(r#"a[href*="/series/"]"#).unwrap(),
        Selector::parse(r#"a[href*="/show/"]"#).unwrap(),
    ]
});

/// Makes a site link absolute: root-relative hrefs hang off the site, absolute ones are kept and
/// anything else is joined onto `parent`.
pub(crate) fn site_link(href: &str, site_url: &str, parent: &str) -> String {
    if href.starts_with('/') {
        format!("{}{}", site_url.trim_end_matches('/'), href)
    } else if href.starts_with("http") {
        href.to_string()
    } else {
        format!(
            "{}/{}",
            parent.trim_end_matches('/'),
            href.trim_start_matches('/')
        )
    }
}

/// Series page URLs on a listing page, in selector order and then document order.
///
/// Episode links, anchors and the bare category link are skipped. Query strings and trailing
/// slashes are dropped so each series appears once.
pub fn parse_series_links(html: &str, site_url: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let site = site_url.trim_end_matches('/');
    let category = format!("{site}/dizi");

    let mut seen = FxHashSet::default();
    let mut series = Vec::new();
    for selector in SERIES_LINKS.iter() {
        for link in document.select(selector) {
            let Some(href) = link.value().attr("href").map(str::trim) else {
                continue;
            };
            if href.contains("bolum") || href.contains('#') || href == "/dizi/" {
                continue;
            }

            let url = site_link(href, site, site);
            let url = url
                .split('?')
                .next()
                .unwrap_or_default()
                .trim_end_matches('/')
                .to_string();
            if url == category {
                continue;
            }
            if seen.insert(url.clone()) {
                series.push(url);
            }
        }
    }
    series
}
