//! Tag sets and the fixed tag reduction / normalization tables.

use serde::{Deserialize, Serialize};

/// Tags that win over every other tag when an annotation is reduced to a
/// single label, in priority order.
const PRIORITY_TAGS: &[&str] = &["figure", "animal"];

/// Known misspellings and their corrections.
const TAG_CORRECTIONS: &[(&str, &str)] = &[
    ("samrai", "samurai"),
    ("samuari", "samurai"),
    ("stading", "standing"),
];

/// An insertion-ordered set of distinct, non-empty tags.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TagSet {
    tags: Vec<String>,
}

impl TagSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a tag unless it is empty or already present.
    ///
    /// Returns true if the tag was added.
    pub fn insert(&mut self, tag: impl Into<String>) -> bool {
        let tag = tag.into();
        if tag.is_empty() || self.contains(&tag) {
            return false;
        }
        self.tags.push(tag);
        true
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.tags.iter().any(|existing| existing == tag)
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.tags.iter().map(String::as_str)
    }

    pub fn first(&self) -> Option<&str> {
        self.tags.first().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for TagSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = TagSet::new();
        for tag in iter {
            set.insert(tag);
        }
        set
    }
}

/// Reduces a tag set to one label: `figure`, else `animal`, else the first tag.
pub fn reduce_tags(tags: &TagSet) -> Option<&str> {
    for priority in PRIORITY_TAGS {
        if let Some(tag) = tags.iter().find(|tag| tag == priority) {
            return Some(tag);
        }
    }
    tags.first()
}

/// Applies the fixed misspelling table; unknown tags pass through unchanged.
pub fn normalize_tag(tag: &str) -> &str {
    TAG_CORRECTIONS
        .iter()
        .find(|(wrong, _)| *wrong == tag)
        .map(|(_, right)| *right)
        .unwrap_or(tag)
}

/// How an annotation's tags become VOC `<object>` entries.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectMode {
    /// One object per normalized tag, each repeating the annotation's box.
    /// Suited to detectors that expect exactly one label per object.
    #[default]
    PerTag,
    /// One object per annotation, labelled with the reduced tag.
    Reduced,
}

/// Labels emitted for one annotation under the given mode.
///
/// Labels are normalized and de-duplicated after normalization, so two
/// spellings of the same tag never produce two identical objects.
pub fn object_labels(tags: &TagSet, mode: ObjectMode) -> Vec<&str> {
    match mode {
        ObjectMode::PerTag => {
            let mut labels: Vec<&str> = Vec::with_capacity(tags.len());
            for label in tags.iter().map(normalize_tag) {
                if !labels.contains(&label) {
                    labels.push(label);
                }
            }
            labels
        }
        ObjectMode::Reduced => reduce_tags(tags).map(normalize_tag).into_iter().collect(),
    }
}
