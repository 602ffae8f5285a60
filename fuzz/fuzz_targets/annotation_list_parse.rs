//! Fuzz target for annotation list parsing.
//!
//! Feeds arbitrary bytes to the annotation list parser and walks every
//! resource the way ingestion does, checking for panics.

#![no_main]

use iiif_trainset::iiif::{parse_annotation_list, AnnotationTarget};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Cap input size to avoid excessive memory usage.
    if data.len() > 10 * 1024 * 1024 {
        return;
    }

    let Ok(list) = parse_annotation_list(data, "fuzz") else {
        return;
    };
    for resource in &list.resources {
        let _ = resource.tag_values().count();
        if let Some(AnnotationTarget::Region(region)) = resource.on.first() {
            let _ = region.fragment();
            let _ = region.within.as_ref().map(|within| within.url());
        }
    }
});
