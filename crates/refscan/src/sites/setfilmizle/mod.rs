//! Crawler for the setfilmizle film catalog.
//!
//! Archive pages list films; each film page carries a nonce and FastPlay source buttons, and an
//! AJAX call per source returns the embed URL that ends up in the playlist.

pub mod archive;
pub mod crawler;
pub mod detail;

pub use archive::{FilmInfo, page_url, parse_archive, parse_page_count};
pub use crawler::{
    CrawlConfig, CrawlReport, DEFAULT_SITE_URL, FilmEmbed, FilmFailure, FilmOutcome, SiteCrawler,
};
pub use detail::{
    FilmPage, LABEL_DUBBED, LABEL_SUBTITLED, PlayerSource, language_label, parse_film_page,
    parse_video_url_response, vctplay_manifest,
};
