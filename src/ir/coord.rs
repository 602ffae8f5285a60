//! Typed integer pixel coordinates using PhantomData for compile-time safety.

use std::marker::PhantomData;

/// A 2D pixel coordinate with a type-level marker for the coordinate space.
///
/// The `TSpace` parameter should be either [`Full`](super::Full) or
/// [`Resized`](super::Resized), so that a point in the full-resolution image
/// cannot be handed to code expecting a point in the resized copy.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Coord<TSpace> {
    pub x: i64,
    pub y: i64,
    _space: PhantomData<TSpace>,
}

impl<TSpace> Coord<TSpace> {
    /// Creates a new coordinate with the given x and y values.
    #[inline]
    pub fn new(x: i64, y: i64) -> Self {
        Self {
            x,
            y,
            _space: PhantomData,
        }
    }

    /// Returns true if both components are non-negative.
    #[inline]
    pub fn is_non_negative(&self) -> bool {
        self.x >= 0 && self.y >= 0
    }
}

impl<TSpace> std::fmt::Debug for Coord<TSpace> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coord")
            .field("x", &self.x)
            .field("y", &self.y)
            .finish()
    }
}

impl<TSpace> Default for Coord<TSpace> {
    fn default() -> Self {
        Self::new(0, 0)
    }
}
