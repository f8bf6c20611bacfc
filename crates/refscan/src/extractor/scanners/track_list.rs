use std::sync::LazyLock;

use regex::Regex;

use super::{Located, LocatorScanner, Rejected, ScanPass};
use crate::extractor::decoder::parse_track_list;
use crate::media::{LocatorEncoding, MediaReference, ReferenceKind};

static TRACK_LIST_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)["']?\b(tracks|subtitles|captions)["']?\s*[:=]\s*(\[.*?\])"#).unwrap()
});

/// Player configuration track lists, e.g. `tracks: [{file: "...", label: "TR"}]`.
pub struct TrackListScanner;

impl TrackListScanner {
    fn kind_of(list_key: &str, file: &str, track_kind: Option<&str>) -> Option<ReferenceKind> {
        match track_kind.map(str::to_ascii_lowercase).as_deref() {
            // preview sprites are vtt files too
            Some("thumbnails") | Some("chapters") => return None,
            Some("captions") | Some("subtitles") => return Some(ReferenceKind::Subtitle),
            _ => {}
        }

        ReferenceKind::from_locator(file).or_else(|| {
            matches!(list_key, "subtitles" | "captions").then_some(ReferenceKind::Subtitle)
        })
    }
}

impl LocatorScanner for TrackListScanner {
    fn name(&self) -> &'static str {
        "track-list"
    }

    fn scan_pass(&self, text: &str) -> ScanPass {
        let mut pass = ScanPass::default();

        for caps in TRACK_LIST_REGEX.captures_iter(text) {
            let (Some(whole), Some(key), Some(list)) = (caps.get(0), caps.get(1), caps.get(2))
            else {
                continue;
            };

            let Some(tracks) = parse_track_list(list.as_str()) else {
                pass.rejected.push(Rejected::new(
                    whole.start(),
                    LocatorEncoding::JsonTrackObject,
                    list.as_str(),
                ));
                continue;
            };

            for track in tracks {
                let Some(kind) = Self::kind_of(key.as_str(), &track.file, track.kind.as_deref())
                else {
                    continue;
                };
                pass.located.push(Located::new(
                    whole.start(),
                    MediaReference::new(
                        kind,
                        track.file,
                        LocatorEncoding::JsonTrackObject,
                        track.label,
                    ),
                ));
            }
        }

        pass
    }
}
