//! Bounding box types: canonical XYXY boxes and IIIF-style XYWH regions.

use std::fmt;
use std::marker::PhantomData;

use super::coord::Coord;

/// An axis-aligned bounding box in XYXY format (xmin, ymin, xmax, ymax).
///
/// The `TSpace` parameter should be either [`Full`](super::Full) or
/// [`Resized`](super::Resized).
///
/// Note: This type does NOT enforce that min <= max or that the box lies
/// inside its image. Upstream annotation data can be wrong, and the
/// validation pass reports those boxes rather than having them rejected
/// (or silently clamped) at construction time.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct BBoxXYXY<TSpace> {
    pub min: Coord<TSpace>,
    pub max: Coord<TSpace>,
}

impl<TSpace> BBoxXYXY<TSpace> {
    /// Creates a new bounding box from explicit coordinates.
    #[inline]
    pub fn from_xyxy(xmin: i64, ymin: i64, xmax: i64, ymax: i64) -> Self {
        Self {
            min: Coord::new(xmin, ymin),
            max: Coord::new(xmax, ymax),
        }
    }

    #[inline]
    pub fn xmin(&self) -> i64 {
        self.min.x
    }

    #[inline]
    pub fn ymin(&self) -> i64 {
        self.min.y
    }

    #[inline]
    pub fn xmax(&self) -> i64 {
        self.max.x
    }

    #[inline]
    pub fn ymax(&self) -> i64 {
        self.max.y
    }

    /// Returns the width of the bounding box.
    ///
    /// May be negative if the box is malformed (xmax < xmin).
    #[inline]
    pub fn width(&self) -> i64 {
        self.max.x.saturating_sub(self.min.x)
    }

    /// Returns the height of the bounding box.
    ///
    /// May be negative if the box is malformed (ymax < ymin).
    #[inline]
    pub fn height(&self) -> i64 {
        self.max.y.saturating_sub(self.min.y)
    }

    /// Returns true if the box is properly ordered (min <= max for both axes).
    #[inline]
    pub fn is_ordered(&self) -> bool {
        self.min.x <= self.max.x && self.min.y <= self.max.y
    }

    /// Returns true if the box lies inside `[0, width] x [0, height]`.
    pub fn is_within(&self, width: u32, height: u32) -> bool {
        self.min.is_non_negative()
            && self.max.is_non_negative()
            && self.max.x <= i64::from(width)
            && self.max.y <= i64::from(height)
            && self.min.x <= i64::from(width)
            && self.min.y <= i64::from(height)
    }

    /// Converts to XYWH format.
    #[inline]
    pub fn to_xywh(&self) -> Xywh<TSpace> {
        Xywh::new(self.xmin(), self.ymin(), self.width(), self.height())
    }
}

impl<TSpace> fmt::Debug for BBoxXYXY<TSpace> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BBoxXYXY")
            .field("xmin", &self.min.x)
            .field("ymin", &self.min.y)
            .field("xmax", &self.max.x)
            .field("ymax", &self.max.y)
            .finish()
    }
}

impl<TSpace> Default for BBoxXYXY<TSpace> {
    fn default() -> Self {
        Self::from_xyxy(0, 0, 0, 0)
    }
}

/// A region in XYWH format (x, y, width, height), where (x, y) is the
/// top-left corner.
///
/// This is the shape of IIIF `xywh=` fragment selectors and of Image API
/// region parameters. [`fmt::Display`] renders `X,Y,W,H`, which is the form
/// used inside URLs, selector values and clipping file names.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Xywh<TSpace> {
    pub x: i64,
    pub y: i64,
    pub w: i64,
    pub h: i64,
    _space: PhantomData<TSpace>,
}

impl<TSpace> Xywh<TSpace> {
    #[inline]
    pub fn new(x: i64, y: i64, w: i64, h: i64) -> Self {
        Self {
            x,
            y,
            w,
            h,
            _space: PhantomData,
        }
    }

    /// Converts to the canonical XYXY box `(x, y, x + w, y + h)`.
    #[inline]
    pub fn to_xyxy(&self) -> BBoxXYXY<TSpace> {
        // Selector values come from untrusted documents.
        BBoxXYXY::from_xyxy(
            self.x,
            self.y,
            self.x.saturating_add(self.w),
            self.y.saturating_add(self.h),
        )
    }
}

impl<TSpace> fmt::Display for Xywh<TSpace> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{},{}", self.x, self.y, self.w, self.h)
    }
}

impl<TSpace> fmt::Debug for Xywh<TSpace> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Xywh")
            .field("x", &self.x)
            .field("y", &self.y)
            .field("w", &self.w)
            .field("h", &self.h)
            .finish()
    }
}
