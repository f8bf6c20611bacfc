use std::sync::LazyLock;

use base64::Engine;
use regex::Regex;
use tracing::debug;

use crate::media::{LocatorEncoding, MediaReference, formats::contains_manifest_suffix};

static BARE_KEY_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"([\[{,]\s*)([A-Za-z_]\w*)\s*:"#).unwrap());

static TRAILING_COMMA_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#",\s*([\]}])"#).unwrap());

/// Turns a raw locator of one encoding into plain text.
///
/// Decoders never fail loudly: a locator that cannot be decoded yields `None` and the caller
/// moves on to the next candidate.
pub trait LocatorDecoder: Send + Sync {
    fn encoding(&self) -> LocatorEncoding;

    fn decode(&self, raw: &str) -> Option<String>;
}

pub struct PlainDecoder;

impl LocatorDecoder for PlainDecoder {
    fn encoding(&self) -> LocatorEncoding {
        LocatorEncoding::PlainText
    }

    fn decode(&self, raw: &str) -> Option<String> {
        Some(raw.to_string())
    }
}

pub struct HexDecoder;

impl LocatorDecoder for HexDecoder {
    fn encoding(&self) -> LocatorEncoding {
        LocatorEncoding::HexEscaped
    }

    fn decode(&self, raw: &str) -> Option<String> {
        decode_hex_escaped(raw)
    }
}

pub struct Base64Decoder;

impl LocatorDecoder for Base64Decoder {
    fn encoding(&self) -> LocatorEncoding {
        LocatorEncoding::Base64
    }

    fn decode(&self, raw: &str) -> Option<String> {
        decode_base64_manifest(raw)
    }
}

/// Track-list entries are parsed as a whole by [`parse_track_list`]; the per-entry locator is
/// already plain once the list has been accepted.
pub struct TrackObjectDecoder;

impl LocatorDecoder for TrackObjectDecoder {
    fn encoding(&self) -> LocatorEncoding {
        LocatorEncoding::JsonTrackObject
    }

    fn decode(&self, raw: &str) -> Option<String> {
        let raw = raw.trim();
        (!raw.is_empty()).then(|| raw.to_string())
    }
}

/// Prioritized list of decoders, tried in order for each candidate.
pub struct DecoderChain {
    decoders: Vec<Box<dyn LocatorDecoder>>,
}

impl Default for DecoderChain {
    fn default() -> Self {
        Self::new(vec![
            Box::new(PlainDecoder),
            Box::new(HexDecoder),
            Box::new(Base64Decoder),
            Box::new(TrackObjectDecoder),
        ])
    }
}

impl DecoderChain {
    pub fn new(decoders: Vec<Box<dyn LocatorDecoder>>) -> Self {
        Self { decoders }
    }

    pub fn decode(&self, reference: &MediaReference) -> Option<String> {
        let decoded = self
            .decoders
            .iter()
            .filter(|d| d.encoding() == reference.encoding)
            .find_map(|d| d.decode(&reference.raw_locator));

        if decoded.is_none() {
            debug!(
                "dropping {} locator that failed to decode: {}",
                reference.encoding, reference.raw_locator
            );
        }
        decoded
    }
}

/// Decodes `\x2f\x75...` style strings. Odd length, bad digits and invalid UTF-8 all yield `None`.
pub fn decode_hex_escaped(raw: &str) -> Option<String> {
    let digits = raw.replace("\\x", "").replace("\\X", "");
    if digits.is_empty() {
        return None;
    }
    let bytes = hex::decode(digits).ok()?;
    String::from_utf8(bytes).ok()
}

/// Inverse of [`decode_hex_escaped`].
pub fn encode_hex_escaped(text: &str) -> String {
    text.bytes().map(|b| format!("\\x{b:02x}")).collect()
}

/// Decodes a base64 literal to UTF-8 text. Lengths that are not a multiple of four are refused.
pub fn decode_base64_text(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() || raw.len() % 4 != 0 {
        return None;
    }

    let bytes = base64::engine::general_purpose::STANDARD.decode(raw).ok()?;
    String::from_utf8(bytes).ok()
}

/// Decodes a base64 literal, accepting it only when it turns into UTF-8 text that mentions a
/// manifest. Any long quoted literal is a candidate, so most inputs here are not base64 at all.
pub fn decode_base64_manifest(raw: &str) -> Option<String> {
    let text = decode_base64_text(raw)?;
    contains_manifest_suffix(&text).then(|| text.trim().to_string())
}

/// One entry of a player's track list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackObject {
    pub file: String,
    pub label: Option<String>,
    pub kind: Option<String>,
}

/// Normalizes a JS-ish track list to JSON: single quotes become double quotes, bare field names
/// get quoted and trailing commas are removed.
pub fn normalize_track_list(fragment: &str) -> String {
    let quoted = fragment.replace('\'', "\"");
    let keyed = BARE_KEY_REGEX.replace_all(&quoted, r#"$1"$2":"#);
    TRAILING_COMMA_REGEX.replace_all(&keyed, "$1").into_owned()
}

/// Parses a track list fragment. Entries without a `file`/`src` string are skipped; a fragment
/// that is not a list of objects after normalization yields `None`.
pub fn parse_track_list(fragment: &str) -> Option<Vec<TrackObject>> {
    let normalized = normalize_track_list(fragment);
    let value: serde_json::Value = match serde_json::from_str(&normalized) {
        Ok(value) => value,
        Err(e) => {
            debug!("skipping malformed track list: {}", e);
            return None;
        }
    };

    let entries = value.as_array()?;
    let tracks = entries
        .iter()
        .filter_map(|entry| {
            let file = entry
                .get("file")
                .or_else(|| entry.get("src"))
                .and_then(|v| v.as_str())?;
            let label = entry
                .get("label")
                .and_then(|v| v.as_str())
                .filter(|l| !l.trim().is_empty())
                .map(|l| l.trim().to_string());
            let kind = entry
                .get("kind")
                .and_then(|v| v.as_str())
                .map(str::to_string);

            Some(TrackObject {
                file: file.to_string(),
                label,
                kind,
            })
        })
        .collect();

    Some(tracks)
}
