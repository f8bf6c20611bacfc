mod base64_literal;
mod file_key;
mod manifest_url;
mod track_list;

pub use base64_literal::Base64LiteralScanner;
pub use file_key::FileKeyScanner;
pub use manifest_url::ManifestUrlScanner;
pub use track_list::TrackListScanner;

use rustc_hash::FxHashSet;

use crate::media::{LocatorEncoding, MediaReference, ReferenceKind};

/// A candidate together with the byte offset of its match in the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Located {
    pub offset: usize,
    pub reference: MediaReference,
}

impl Located {
    pub fn new(offset: usize, reference: MediaReference) -> Self {
        Self { offset, reference }
    }
}

/// A fragment that has the shape of a reference but did not decode (bad hex, broken base64,
/// a track list that is not JSON-like).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejected {
    pub offset: usize,
    pub encoding: LocatorEncoding,
    pub fragment: String,
}

impl Rejected {
    pub fn new(offset: usize, encoding: LocatorEncoding, fragment: impl Into<String>) -> Self {
        Self {
            offset,
            encoding,
            fragment: fragment.into(),
        }
    }
}

/// Everything one scanner found in a document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanPass {
    pub located: Vec<Located>,
    pub rejected: Vec<Rejected>,
}

/// One syntactic shape of embedded media reference.
///
/// Scanners do no I/O and never fail. Fragments that look like a reference but do not decode
/// are reported as [`Rejected`] so callers can tell a malformed page from an empty one.
pub trait LocatorScanner: Send + Sync {
    fn name(&self) -> &'static str;

    fn scan_pass(&self, text: &str) -> ScanPass;

    fn scan(&self, text: &str) -> Vec<Located> {
        self.scan_pass(text).located
    }
}

/// The scanners in the order their passes are merged: plain URLs, plain key/value, hex key/value,
/// base64 literals, structured track lists.
pub fn default_scanners() -> Vec<Box<dyn LocatorScanner>> {
    vec![
        Box::new(ManifestUrlScanner),
        Box::new(FileKeyScanner::plain()),
        Box::new(FileKeyScanner::hex()),
        Box::new(Base64LiteralScanner),
        Box::new(TrackListScanner),
    ]
}

/// Runs every scanner over the document and returns the candidates ordered by their first match
/// in the text. Candidates with the same kind and raw text are reported once.
pub fn scan_document(text: &str, scanners: &[Box<dyn LocatorScanner>]) -> Vec<MediaReference> {
    let mut located: Vec<Located> = scanners.iter().flat_map(|s| s.scan(text)).collect();
    // stable, so equal offsets keep scanner order
    located.sort_by_key(|l| l.offset);

    let mut seen: FxHashSet<(ReferenceKind, String)> = FxHashSet::default();
    located
        .into_iter()
        .filter(|l| seen.insert((l.reference.kind, l.reference.raw_locator.clone())))
        .map(|l| l.reference)
        .collect()
}
