//! In-memory tables accumulated during a run.
//!
//! A [`RunContext`] is built at the start of a run, handed by reference to
//! ingestion, and then read (never mutated) by the output writers. Images are
//! kept in first-seen order because the training list and the label map IDs
//! both depend on that order.

use std::collections::HashMap;

use super::bbox::{BBoxXYXY, Xywh};
use super::ids::ImageKey;
use super::space::{Full, Resized};
use super::tags::{object_labels, ObjectMode, TagSet};

/// One resized image materialized on disk.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageRecord {
    pub image_id: ImageKey,
    pub resized_width: u32,
    pub resized_height: u32,
}

impl ImageRecord {
    pub fn new(image_id: ImageKey, resized_width: u32, resized_height: u32) -> Self {
        Self {
            image_id,
            resized_width,
            resized_height,
        }
    }
}

/// One source annotation, with its box already in resized space.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnnotationRecord {
    pub tags: TagSet,
    pub bbox: BBoxXYXY<Resized>,
    /// The selector region as written in the source annotation.
    pub region: Xywh<Full>,
}

/// An image together with the annotations that reference it.
#[derive(Clone, Debug)]
pub struct ImageEntry {
    pub record: ImageRecord,
    pub annotations: Vec<AnnotationRecord>,
}

/// Process-scoped tables for a conversion run.
#[derive(Clone, Debug, Default)]
pub struct RunContext {
    entries: Vec<ImageEntry>,
    index: HashMap<ImageKey, usize>,
}

impl RunContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the record for an image that has already been materialized.
    pub fn image(&self, image_id: &ImageKey) -> Option<&ImageRecord> {
        self.index.get(image_id).map(|&idx| &self.entries[idx].record)
    }

    /// Registers a newly materialized image.
    ///
    /// Dimensions are fixed on first registration; registering the same ID
    /// again keeps the original record and returns it.
    pub fn insert_image(&mut self, record: ImageRecord) -> &ImageRecord {
        let idx = match self.index.get(&record.image_id) {
            Some(&idx) => idx,
            None => {
                let idx = self.entries.len();
                self.index.insert(record.image_id.clone(), idx);
                self.entries.push(ImageEntry {
                    record,
                    annotations: Vec::new(),
                });
                idx
            }
        };
        &self.entries[idx].record
    }

    /// Appends an annotation to a registered image.
    ///
    /// Returns false (and drops the annotation) if the image is unknown.
    pub fn push_annotation(&mut self, image_id: &ImageKey, annotation: AnnotationRecord) -> bool {
        match self.index.get(image_id) {
            Some(&idx) => {
                self.entries[idx].annotations.push(annotation);
                true
            }
            None => false,
        }
    }

    /// Images with their annotations, in first-seen order.
    pub fn entries(&self) -> &[ImageEntry] {
        &self.entries
    }

    pub fn image_count(&self) -> usize {
        self.entries.len()
    }

    pub fn annotation_count(&self) -> usize {
        self.entries.iter().map(|entry| entry.annotations.len()).sum()
    }
}

/// Distinct normalized labels with stable 1-based IDs in first-encounter order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LabelCatalog {
    labels: Vec<String>,
    ids: HashMap<String, u32>,
}

impl LabelCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the catalog by walking images, annotations and labels in the
    /// same order the XML writer emits them.
    pub fn from_context(context: &RunContext, mode: ObjectMode) -> Self {
        let mut catalog = Self::new();
        for entry in context.entries() {
            for annotation in &entry.annotations {
                for label in object_labels(&annotation.tags, mode) {
                    catalog.intern(label);
                }
            }
        }
        catalog
    }

    /// Returns the ID for `label`, assigning the next one on first encounter.
    pub fn intern(&mut self, label: &str) -> u32 {
        if let Some(&id) = self.ids.get(label) {
            return id;
        }
        self.labels.push(label.to_string());
        let id = self.labels.len() as u32;
        self.ids.insert(label.to_string(), id);
        id
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// `(id, label)` pairs in ID order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &str)> {
        self.labels
            .iter()
            .enumerate()
            .map(|(idx, label)| (idx as u32 + 1, label.as_str()))
    }
}
