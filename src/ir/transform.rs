//! Coordinate transforms between full-resolution and resized pixel space.
//!
//! Truncation toward zero is the rounding policy throughout. Downstream
//! containment checks assume it, so nothing here may round.

use super::bbox::{BBoxXYXY, Xywh};
use super::space::{Full, Resized};
use crate::error::TrainsetError;

/// Per-axis ratio between resized and full-resolution image dimensions.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScaleRatio {
    pub width: f64,
    pub height: f64,
}

impl ScaleRatio {
    /// Ratio that maps full-resolution coordinates into resized space.
    pub fn full_to_resized(full_w: u32, full_h: u32, resized_w: u32, resized_h: u32) -> Self {
        Self {
            width: f64::from(resized_w) / f64::from(full_w),
            height: f64::from(resized_h) / f64::from(full_h),
        }
    }

    /// Ratio that maps resized coordinates back into full-resolution space.
    pub fn resized_to_full(full_w: u32, full_h: u32, resized_w: u32, resized_h: u32) -> Self {
        Self {
            width: f64::from(full_w) / f64::from(resized_w),
            height: f64::from(full_h) / f64::from(resized_h),
        }
    }
}

/// Parses an `xywh=X,Y,W,H` fragment selector value.
///
/// The `xywh=` prefix is optional and the `pixel:` unit is accepted; percent
/// regions are not supported.
pub fn parse_xywh(value: &str) -> Result<Xywh<Full>, TrainsetError> {
    let raw = value.trim();
    let raw = raw.strip_prefix("xywh=").unwrap_or(raw);
    let raw = raw.strip_prefix("pixel:").unwrap_or(raw);

    if raw.starts_with("percent:") {
        return Err(TrainsetError::annotation(
            None,
            format!("percent selector '{value}' is not supported"),
        ));
    }

    let parts: Vec<&str> = raw.split(',').map(str::trim).collect();
    if parts.len() != 4 {
        return Err(TrainsetError::annotation(
            None,
            format!("selector '{value}' does not have four components"),
        ));
    }

    let mut numbers = [0i64; 4];
    for (slot, part) in numbers.iter_mut().zip(&parts) {
        *slot = parse_component(part).ok_or_else(|| {
            TrainsetError::annotation(
                None,
                format!("selector '{value}' has non-numeric component '{part}'"),
            )
        })?;
    }

    Ok(Xywh::new(numbers[0], numbers[1], numbers[2], numbers[3]))
}

/// Accepts integers, and decimals that some annotation tools emit, which are
/// truncated like every other coordinate.
fn parse_component(part: &str) -> Option<i64> {
    if let Ok(value) = part.parse::<i64>() {
        return Some(value);
    }
    part.parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .map(|value| value.trunc() as i64)
}

/// Scales a full-resolution box into resized space.
///
/// Each coordinate is multiplied by `resized_dim / full_dim` on its axis and
/// truncated toward zero.
pub fn resize_box(
    box_full: &BBoxXYXY<Full>,
    full_w: u32,
    full_h: u32,
    resized_w: u32,
    resized_h: u32,
) -> BBoxXYXY<Resized> {
    let ratio = ScaleRatio::full_to_resized(full_w, full_h, resized_w, resized_h);
    BBoxXYXY::from_xyxy(
        scale(box_full.xmin(), ratio.width),
        scale(box_full.ymin(), ratio.height),
        scale(box_full.xmax(), ratio.width),
        scale(box_full.ymax(), ratio.height),
    )
}

/// Scales a resized-space region back to full resolution, component by
/// component (width and height are scaled, not recomputed from corners).
pub fn region_to_full(region: &Xywh<Resized>, ratio: ScaleRatio) -> Xywh<Full> {
    Xywh::new(
        scale(region.x, ratio.width),
        scale(region.y, ratio.height),
        scale(region.w, ratio.width),
        scale(region.h, ratio.height),
    )
}

#[inline]
fn scale(value: i64, ratio: f64) -> i64 {
    (value as f64 * ratio).trunc() as i64
}
