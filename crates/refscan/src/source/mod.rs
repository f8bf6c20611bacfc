pub mod batch;
pub mod document;
pub mod embed;
pub mod page;
pub mod pool;

pub use batch::{BatchReport, BatchRunner};
pub use document::{Document, DocumentSource, HttpDocumentSource};
pub use embed::{EmbedExtractor, EmbedPage, ItemOutcome, ItemResult};
pub use page::{DEFAULT_EMBED_HOSTS, PageExtraction, PageExtractor};
pub use pool::run_bounded;
