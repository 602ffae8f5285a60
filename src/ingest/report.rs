//! Run summary for annotation ingestion.

use serde::Serialize;
use std::fmt;

/// Counts accumulated while walking annotation lists.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct IngestSummary {
    /// Annotation lists successfully fetched and parsed.
    pub lists: usize,
    /// Annotation lists that could not be fetched or parsed.
    pub failed_lists: usize,
    /// Resources seen across all lists.
    pub annotations_seen: usize,
    pub converted: usize,
    /// Resources that failed and were skipped.
    pub skipped: usize,
    /// Resources that are not `oa:Annotation`.
    pub ignored: usize,
    /// Annotations whose manifest is not on the allow-list.
    pub discarded: usize,
    pub images_fetched: usize,
    pub clips_saved: usize,
}

impl fmt::Display for IngestSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} list(s), {} annotation(s) seen: {} converted, {} skipped, {} not annotations, {} outside allow-list; {} image(s) fetched, {} clip(s) saved",
            self.lists,
            self.annotations_seen,
            self.converted,
            self.skipped,
            self.ignored,
            self.discarded,
            self.images_fetched,
            self.clips_saved
        )?;
        if self.failed_lists > 0 {
            write!(f, "; {} list(s) failed", self.failed_lists)?;
        }
        Ok(())
    }
}
