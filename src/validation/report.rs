//! Issues found in a run's tables, and how they are printed.

use std::fmt;

/// Every issue found by [`validate_context`](super::validate_context), in
/// the order the images and annotations were ingested.
#[derive(Clone, Debug, Default)]
pub struct ValidationReport {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, issue: ValidationIssue) {
        self.issues.push(issue);
    }

    pub fn error_count(&self) -> usize {
        self.count(Severity::Error)
    }

    pub fn warning_count(&self) -> usize {
        self.count(Severity::Warning)
    }

    /// No errors; warnings are allowed.
    pub fn is_ok(&self) -> bool {
        self.error_count() == 0
    }

    /// No issues of any severity.
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn with_code(&self, code: IssueCode) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(move |issue| issue.code == code)
    }

    fn count(&self, severity: Severity) -> usize {
        self.issues
            .iter()
            .filter(|issue| issue.severity == severity)
            .count()
    }
}

/// Errors are listed before warnings; ingestion order is kept within each.
impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_clean() {
            return writeln!(f, "Training set is consistent");
        }

        writeln!(
            f,
            "Training set has {} error(s) and {} warning(s):",
            self.error_count(),
            self.warning_count()
        )?;
        for severity in [Severity::Error, Severity::Warning] {
            for issue in self.issues.iter().filter(|i| i.severity == severity) {
                writeln!(f, "  {issue}")?;
            }
        }
        Ok(())
    }
}

#[derive(Clone, Debug)]
pub struct ValidationIssue {
    pub severity: Severity,
    pub code: IssueCode,
    pub message: String,
    pub context: IssueContext,
}

impl ValidationIssue {
    pub fn error(code: IssueCode, message: impl Into<String>, context: IssueContext) -> Self {
        Self {
            severity: Severity::Error,
            code,
            message: message.into(),
            context,
        }
    }

    pub fn warning(code: IssueCode, message: impl Into<String>, context: IssueContext) -> Self {
        Self {
            severity: Severity::Warning,
            code,
            message: message.into(),
            context,
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(
            f,
            "{tag}[{:?}] {}: {}",
            self.code, self.context, self.message
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    /// The training set is usable but probably not what was intended.
    Warning,
    /// The training set contains data a trainer will misread.
    Error,
}

/// Stable identifiers for each kind of issue.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum IssueCode {
    /// A materialized image has a zero dimension.
    InvalidImageDimensions,
    /// An image was saved but no annotation references it.
    ImageWithoutAnnotations,
    /// An annotation has no tags, so it produces no objects.
    EmptyTagSet,
    /// A box has `min > max` or a negative corner.
    InvalidBoxOrdering,
    /// A box extends outside its resized image.
    BoxOutOfBounds,
}

/// Where an issue was found.
#[derive(Clone, Debug)]
pub enum IssueContext {
    Image { id: String },
    /// `index` counts the image's annotations in ingestion order.
    Annotation { image_id: String, index: usize },
}

impl fmt::Display for IssueContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IssueContext::Image { id } => write!(f, "{id}"),
            IssueContext::Annotation { image_id, index } => {
                write!(f, "{image_id} annotation {index}")
            }
        }
    }
}
