use crate::media::{LocatorEncoding, ReferenceKind};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A candidate locator found while scanning one document.
///
/// `raw_locator` is kept exactly as it appeared in the source (still hex-escaped or base64
/// encoded); decoding happens later so the scanner never has to fail.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct MediaReference {
    pub kind: ReferenceKind,
    pub raw_locator: String,
    pub encoding: LocatorEncoding,
    pub label: Option<String>,
}

impl MediaReference {
    pub fn new(
        kind: ReferenceKind,
        raw_locator: impl Into<String>,
        encoding: LocatorEncoding,
        label: Option<String>,
    ) -> Self {
        Self {
            kind,
            raw_locator: raw_locator.into(),
            encoding,
            label,
        }
    }

    pub fn plain(kind: ReferenceKind, raw_locator: impl Into<String>) -> Self {
        Self::new(kind, raw_locator, LocatorEncoding::PlainText, None)
    }
}

/// A reference after decoding and resolution against its document's base URL.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ResolvedReference {
    pub kind: ReferenceKind,
    pub absolute_url: String,
    pub label: Option<String>,
}

impl ResolvedReference {
    pub fn new(kind: ReferenceKind, absolute_url: impl Into<String>, label: Option<String>) -> Self {
        Self {
            kind,
            absolute_url: absolute_url.into(),
            label,
        }
    }

    pub fn is_manifest(&self) -> bool {
        self.kind == ReferenceKind::Manifest
    }

    pub fn is_subtitle(&self) -> bool {
        self.kind == ReferenceKind::Subtitle
    }
}

impl fmt::Display for ResolvedReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.label {
            Some(label) => write!(f, "{} [{}] {}", self.kind, label, self.absolute_url),
            None => write!(f, "{} {}", self.kind, self.absolute_url),
        }
    }
}

/// The document URL relative locators are resolved against. One per analysed document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseContext {
    base_url: String,
}

impl BaseContext {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}
