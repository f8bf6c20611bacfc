//! Crawler for the diziyiizle series catalog.
//!
//! The listing links to series pages; each series page carries artwork, a platform and episode
//! links. Episode pages embed vidlax players whose manifests and subtitles become playlist
//! entries.

pub mod crawler;
pub mod listing;
pub mod series;

pub use crawler::{
    DEFAULT_SITE_URL, EpisodeFailure, SeriesCrawlConfig, SeriesCrawler, SeriesOutcome,
    SeriesReport,
};
pub use listing::parse_series_links;
pub use series::{EpisodeLink, SeriesPage, parse_series_page};
