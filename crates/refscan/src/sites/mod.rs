//! Site-specific crawlers that feed embed URLs into the reference extractor.

pub mod diziyiizle;
pub mod setfilmizle;
