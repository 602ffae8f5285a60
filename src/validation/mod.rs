//! Consistency checks over the tables accumulated by a conversion run.
//!
//! Upstream annotation data is never silently repaired. Boxes that end up
//! unordered or outside their resized image are written as-is and reported
//! here, so the caller can decide whether the training set is usable.

mod report;

pub use report::{IssueCode, IssueContext, Severity, ValidationIssue, ValidationReport};

use crate::ir::{ImageEntry, RunContext};

/// Options for validation behavior.
#[derive(Clone, Debug, Default)]
pub struct ValidateOptions {
    /// If true, any issue fails the run. Otherwise issues are only reported.
    pub strict: bool,
}

impl ValidateOptions {
    /// Whether `report` should fail the run under these options.
    pub fn fails(&self, report: &ValidationReport) -> bool {
        self.strict && !report.is_clean()
    }
}

/// Validates a run context and returns a report of all issues found.
///
/// Checks, per image:
/// - resized dimensions are positive
/// - at least one annotation references it
///
/// and per annotation:
/// - the tag set is non-empty
/// - the box is ordered and has non-negative corners
/// - the box lies within the resized image
pub fn validate_context(context: &RunContext) -> ValidationReport {
    let mut report = ValidationReport::new();

    for entry in context.entries() {
        validate_image(entry, &mut report);
        validate_annotations(entry, &mut report);
    }

    report
}

fn validate_image(entry: &ImageEntry, report: &mut ValidationReport) {
    let record = &entry.record;
    let id = record.image_id.to_string();

    if record.resized_width == 0 || record.resized_height == 0 {
        report.add(ValidationIssue::error(
            IssueCode::InvalidImageDimensions,
            format!(
                "Invalid dimensions {}x{} (must be positive)",
                record.resized_width, record.resized_height
            ),
            IssueContext::Image { id: id.clone() },
        ));
    }

    if entry.annotations.is_empty() {
        report.add(ValidationIssue::warning(
            IssueCode::ImageWithoutAnnotations,
            "Image was saved but no annotation references it",
            IssueContext::Image { id },
        ));
    }
}

fn validate_annotations(entry: &ImageEntry, report: &mut ValidationReport) {
    let record = &entry.record;

    for (index, annotation) in entry.annotations.iter().enumerate() {
        let context = || IssueContext::Annotation {
            image_id: record.image_id.to_string(),
            index,
        };

        if annotation.tags.is_empty() {
            report.add(ValidationIssue::warning(
                IssueCode::EmptyTagSet,
                format!(
                    "Region {} has no tags and produces no objects",
                    annotation.region
                ),
                context(),
            ));
        }

        let bbox = &annotation.bbox;

        // Check ordering (min <= max) and sign
        if !bbox.is_ordered() || !bbox.min.is_non_negative() {
            report.add(ValidationIssue::error(
                IssueCode::InvalidBoxOrdering,
                format!(
                    "Invalid box: min ({}, {}) should be non-negative and <= max ({}, {})",
                    bbox.xmin(),
                    bbox.ymin(),
                    bbox.xmax(),
                    bbox.ymax()
                ),
                context(),
            ));
            continue; // Bounds are meaningless for a malformed box
        }

        if !bbox.is_within(record.resized_width, record.resized_height) {
            report.add(ValidationIssue::error(
                IssueCode::BoxOutOfBounds,
                format!(
                    "Bounding box ({}, {}, {}, {}) extends outside image bounds (0, 0, {}, {})",
                    bbox.xmin(),
                    bbox.ymin(),
                    bbox.xmax(),
                    bbox.ymax(),
                    record.resized_width,
                    record.resized_height
                ),
                context(),
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{AnnotationRecord, BBoxXYXY, ImageKey, ImageRecord, TagSet, Xywh};

    fn context_with(bbox: BBoxXYXY<crate::ir::Resized>, tags: &[&str]) -> RunContext {
        let mut context = RunContext::new();
        let key = ImageKey::derive("page1.tif");
        context.insert_image(ImageRecord::new(key.clone(), 640, 480));
        context.push_annotation(
            &key,
            AnnotationRecord {
                tags: tags.iter().copied().collect::<TagSet>(),
                bbox,
                region: Xywh::new(0, 0, 1, 1),
            },
        );
        context
    }

    #[test]
    fn test_valid_context() {
        let context = context_with(BBoxXYXY::from_xyxy(10, 20, 100, 200), &["figure"]);
        let report = validate_context(&context);
        assert!(
            report.is_clean(),
            "Expected no issues, got: {:?}",
            report.issues
        );
    }

    #[test]
    fn test_box_touching_edges_is_within() {
        let context = context_with(BBoxXYXY::from_xyxy(0, 0, 640, 480), &["figure"]);
        assert!(validate_context(&context).is_clean());
    }

    #[test]
    fn test_box_out_of_bounds() {
        let context = context_with(BBoxXYXY::from_xyxy(600, 400, 800, 600), &["figure"]);
        let report = validate_context(&context);
        assert_eq!(report.with_code(IssueCode::BoxOutOfBounds).count(), 1);
    }

    #[test]
    fn test_only_strict_mode_fails() {
        let context = context_with(BBoxXYXY::from_xyxy(100, 20, 10, 200), &["figure"]);
        let report = validate_context(&context);
        assert!(!ValidateOptions::default().fails(&report));
        assert!(ValidateOptions { strict: true }.fails(&report));
    }

    #[test]
    fn test_box_invalid_ordering() {
        // xmax < xmin
        let context = context_with(BBoxXYXY::from_xyxy(100, 20, 10, 200), &["figure"]);
        let report = validate_context(&context);
        assert_eq!(report.error_count(), 1);
        assert!(report
            .issues
            .iter()
            .any(|i| i.code == IssueCode::InvalidBoxOrdering));
    }

    #[test]
    fn test_empty_tag_set_is_warning() {
        let context = context_with(BBoxXYXY::from_xyxy(1, 1, 2, 2), &[]);
        let report = validate_context(&context);
        assert_eq!(report.warning_count(), 1);
        assert!(report.is_ok());
        assert!(!ValidateOptions::default().fails(&report));
        assert!(ValidateOptions { strict: true }.fails(&report));
    }

    #[test]
    fn test_image_without_annotations_and_zero_size() {
        let mut context = RunContext::new();
        context.insert_image(ImageRecord::new(ImageKey::derive("blank"), 0, 480));

        let report = validate_context(&context);
        assert_eq!(report.error_count(), 1);
        assert_eq!(report.warning_count(), 1);
        assert!(report
            .issues
            .iter()
            .any(|i| i.code == IssueCode::ImageWithoutAnnotations));
    }
}
