pub mod extractor;
pub mod media;
pub mod playlist;
pub mod sites;
pub mod source;
