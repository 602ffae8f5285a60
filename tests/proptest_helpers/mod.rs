#![allow(dead_code)]

use iiif_trainset::ir::{BBoxXYXY, Full};
use proptest::prelude::*;
use proptest::test_runner::{Config as ProptestConfig, FileFailurePersistence};

pub fn proptest_config() -> ProptestConfig {
    let cases = std::env::var("PROPTEST_CASES")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(64);

    let mut config = ProptestConfig::with_failure_persistence(FileFailurePersistence::WithSource(
        "proptest-regressions",
    ));
    config.cases = cases;
    config.max_shrink_iters = 1024;
    config
}

/// Full-resolution image dimensions as IIIF servers report them.
pub fn arb_full_dims() -> impl Strategy<Value = (u32, u32)> {
    (1u32..=12_000, 1u32..=12_000)
}

/// A full-size image and resized dimensions no larger than it.
pub fn arb_full_and_resized() -> impl Strategy<Value = ((u32, u32), (u32, u32))> {
    arb_full_dims().prop_flat_map(|(w, h)| (Just((w, h)), (1..=w, 1..=h)))
}

/// An ordered box lying inside a `width` x `height` image.
pub fn arb_box_within(width: u32, height: u32) -> impl Strategy<Value = BBoxXYXY<Full>> {
    (0..=i64::from(width), 0..=i64::from(height))
        .prop_flat_map(move |(x0, y0)| {
            (
                Just(x0),
                Just(y0),
                x0..=i64::from(width),
                y0..=i64::from(height),
            )
        })
        .prop_map(|(x0, y0, x1, y1)| BBoxXYXY::from_xyxy(x0, y0, x1, y1))
}

/// A canvas or image-service ID: host path plus a last segment with an
/// optional stack of known extensions.
pub fn arb_raw_image_id() -> impl Strategy<Value = String> {
    let ext = prop_oneof![
        Just(""),
        Just(".json"),
        Just(".tif"),
        Just(".TIF"),
        Just(".tif.json"),
        Just(".jpg"),
        Just(".png"),
        Just(".jpeg"),
    ];
    ("[a-z0-9_]{1,16}", ext, any::<bool>()).prop_map(|(stem, ext, slash)| {
        let tail = if slash { "/" } else { "" };
        format!("https://iiif.example.org/iiif/{stem}{ext}{tail}")
    })
}

pub fn arb_tag() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("samrai".to_string()),
        Just("samuari".to_string()),
        Just("stading".to_string()),
        Just("figure".to_string()),
        Just("animal".to_string()),
        "[a-z]{1,10}",
    ]
}
