//! Coordinate space marker types.
//!
//! These are zero-sized types (ZSTs) used as type parameters to distinguish
//! between the full-resolution pixel space of a remote image and the pixel
//! space of its locally saved, resized copy.

use std::fmt;

/// Marker for pixel coordinates of the full-resolution remote image.
///
/// Selector regions (`xywh=...`) in IIIF annotations are expressed in this
/// space, whether or not the full image is ever downloaded.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub enum Full {}

/// Marker for pixel coordinates of the locally saved resized image.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resized {}

impl fmt::Debug for Full {
    fn fmt(&self, _: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {} // This is unreachable since Full has no variants
    }
}

impl fmt::Debug for Resized {
    fn fmt(&self, _: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {} // This is unreachable since Resized has no variants
    }
}
