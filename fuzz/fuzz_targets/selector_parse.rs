//! Fuzz target for `xywh=` fragment selectors.
//!
//! Parsed regions are pushed through the resize path with arbitrary image
//! sizes, which must never panic on overflowing or degenerate input.

#![no_main]

use iiif_trainset::ir::{parse_xywh, resize_box};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() < 8 {
        return;
    }
    let (dims, text) = data.split_at(8);
    let full_w = u16::from_le_bytes([dims[0], dims[1]]) as u32;
    let full_h = u16::from_le_bytes([dims[2], dims[3]]) as u32;
    let resized_w = u16::from_le_bytes([dims[4], dims[5]]) as u32;
    let resized_h = u16::from_le_bytes([dims[6], dims[7]]) as u32;

    let Ok(text) = std::str::from_utf8(text) else {
        return;
    };
    if let Ok(region) = parse_xywh(text) {
        let _ = resize_box(&region.to_xyxy(), full_w, full_h, resized_w, resized_h);
    }
});
