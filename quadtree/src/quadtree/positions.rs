use common::shapes::Point;
use std::sync::Arc;

/// Read-only, index-addressed view of entity positions owned by the caller.
///
/// The tree reads `position(index)` while inserting and subdividing and keeps nothing.
/// Indices must be in range for the source; out-of-range reads are a caller bug and
/// panic in the slice-backed implementations.
pub trait PositionSource {
    fn position(&self, index: u32) -> Point;
}

impl PositionSource for [Point] {
    #[inline(always)]
    fn position(&self, index: u32) -> Point {
        self[index as usize]
    }
}

impl PositionSource for Vec<Point> {
    #[inline(always)]
    fn position(&self, index: u32) -> Point {
        self[index as usize]
    }
}

impl PositionSource for [(f32, f32)] {
    #[inline(always)]
    fn position(&self, index: u32) -> Point {
        self[index as usize].into()
    }
}

impl PositionSource for Vec<(f32, f32)> {
    #[inline(always)]
    fn position(&self, index: u32) -> Point {
        self[index as usize].into()
    }
}

impl<T: PositionSource + ?Sized> PositionSource for &T {
    #[inline(always)]
    fn position(&self, index: u32) -> Point {
        (**self).position(index)
    }
}

impl<T: PositionSource + ?Sized> PositionSource for Arc<T> {
    #[inline(always)]
    fn position(&self, index: u32) -> Point {
        (**self).position(index)
    }
}
