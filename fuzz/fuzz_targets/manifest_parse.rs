//! Fuzz target for manifest parsing and canvas indexing.

#![no_main]

use iiif_trainset::iiif::{parse_manifest, ManifestEntry};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() > 10 * 1024 * 1024 {
        return;
    }

    if let Ok(manifest) = parse_manifest(data, "fuzz") {
        let entry = ManifestEntry::from_manifest(&manifest);
        for (canvas_id, _) in entry.canvases() {
            let _ = entry.primary_image(canvas_id);
        }
    }
});
