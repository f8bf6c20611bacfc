use rustc_hash::FxHashMap;
use serde::{Serialize, Serializer};

use crate::media::{ReferenceKind, ResolvedReference};

/// Insertion-ordered set of resolved references keyed by `(kind, absolute_url)`.
///
/// The first label seen for a key is kept. An unlabelled entry adopts the label of a later
/// duplicate, since a missing label is not a conflicting one.
#[derive(Debug, Clone, Default)]
pub struct ReferenceSet {
    entries: Vec<ResolvedReference>,
    index: FxHashMap<(ReferenceKind, String), usize>,
}

impl ReferenceSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true when the reference was not present yet.
    pub fn insert(&mut self, reference: ResolvedReference) -> bool {
        let key = (reference.kind, reference.absolute_url.clone());
        match self.index.get(&key) {
            Some(&position) => {
                let existing = &mut self.entries[position];
                if existing.label.is_none() && reference.label.is_some() {
                    existing.label = reference.label;
                }
                false
            }
            None => {
                self.index.insert(key, self.entries.len());
                self.entries.push(reference);
                true
            }
        }
    }

    /// Folds another set in; entries already present keep their position and label.
    pub fn merge(&mut self, other: ReferenceSet) {
        for reference in other.entries {
            self.insert(reference);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResolvedReference> {
        self.entries.iter()
    }

    pub fn manifests(&self) -> impl Iterator<Item = &ResolvedReference> {
        self.entries.iter().filter(|r| r.is_manifest())
    }

    pub fn subtitles(&self) -> impl Iterator<Item = &ResolvedReference> {
        self.entries.iter().filter(|r| r.is_subtitle())
    }

    pub fn into_vec(self) -> Vec<ResolvedReference> {
        self.entries
    }
}

impl Extend<ResolvedReference> for ReferenceSet {
    fn extend<T: IntoIterator<Item = ResolvedReference>>(&mut self, iter: T) {
        for reference in iter {
            self.insert(reference);
        }
    }
}

impl FromIterator<ResolvedReference> for ReferenceSet {
    fn from_iter<T: IntoIterator<Item = ResolvedReference>>(iter: T) -> Self {
        let mut set = ReferenceSet::new();
        set.extend(iter);
        set
    }
}

impl IntoIterator for ReferenceSet {
    type Item = ResolvedReference;
    type IntoIter = std::vec::IntoIter<ResolvedReference>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl Serialize for ReferenceSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.entries.serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subtitle(url: &str, label: Option<&str>) -> ResolvedReference {
        ResolvedReference::new(ReferenceKind::Subtitle, url, label.map(str::to_string))
    }

    #[test]
    fn test_first_label_wins() {
        let mut set = ReferenceSet::new();
        assert!(set.insert(subtitle("https://h/tr.vtt", Some("TR"))));
        assert!(!set.insert(subtitle("https://h/tr.vtt", Some("Turkish"))));

        assert_eq!(set.len(), 1);
        assert_eq!(set.iter().next().unwrap().label.as_deref(), Some("TR"));
    }

    #[test]
    fn test_first_label_survives_later_unlabelled_duplicate() {
        let mut set = ReferenceSet::new();
        set.insert(subtitle("https://h/tr.vtt", Some("TR")));
        assert!(!set.insert(subtitle("https://h/tr.vtt", None)));

        let mut merged: ReferenceSet = [subtitle("https://h/tr.vtt", Some("TR"))]
            .into_iter()
            .collect();
        merged.merge([subtitle("https://h/tr.vtt", None)].into_iter().collect());

        for set in [set, merged] {
            assert_eq!(set.len(), 1);
            assert_eq!(set.iter().next().unwrap().label.as_deref(), Some("TR"));
        }
    }

    #[test]
    fn test_missing_label_is_filled() {
        let mut set = ReferenceSet::new();
        set.insert(subtitle("https://h/tr.vtt", None));
        set.insert(subtitle("https://h/tr.vtt", Some("TR")));
        set.insert(subtitle("https://h/tr.vtt", Some("Turkish")));

        assert_eq!(set.len(), 1);
        assert_eq!(set.iter().next().unwrap().label.as_deref(), Some("TR"));
    }

    #[test]
    fn test_kind_is_part_of_the_key() {
        let set: ReferenceSet = [
            ResolvedReference::new(ReferenceKind::Manifest, "https://h/x", None),
            ResolvedReference::new(ReferenceKind::Subtitle, "https://h/x", None),
        ]
        .into_iter()
        .collect();

        assert_eq!(set.len(), 2);
        assert_eq!(set.manifests().count(), 1);
        assert_eq!(set.subtitles().count(), 1);
    }

    #[test]
    fn test_merge_keeps_order() {
        let mut first: ReferenceSet = [subtitle("https://h/a.vtt", None)].into_iter().collect();
        let second: ReferenceSet = [
            subtitle("https://h/b.vtt", None),
            subtitle("https://h/a.vtt", Some("A")),
        ]
        .into_iter()
        .collect();

        first.merge(second);
        let urls: Vec<_> = first.iter().map(|r| r.absolute_url.as_str()).collect();
        assert_eq!(urls, vec!["https://h/a.vtt", "https://h/b.vtt"]);
    }
}
