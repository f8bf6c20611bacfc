pub mod aggregate;
pub mod decoder;
mod default;
pub mod error;
pub mod hls_extractor;
pub mod media_extractor;
pub mod resolver;
pub mod scanners;
pub mod video_info;

pub use aggregate::ReferenceSet;
pub use default::{DEFAULT_UA, ProxyConfig, create_client, default_client};
pub use error::{ExtractorError, FailureReason};
pub use media_extractor::{DocumentExtraction, MediaReferenceExtractor};
pub use resolver::resolve;
pub use video_info::VideoInfo;
