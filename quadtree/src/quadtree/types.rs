use crate::error::{QuadtreeError, QuadtreeResult};
use common::shapes::{Circle, Point, Rectangle};

#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct RectExtent {
    pub(crate) min_x: f32,
    pub(crate) min_y: f32,
    pub(crate) max_x: f32,
    pub(crate) max_y: f32,
}

impl RectExtent {
    #[inline(always)]
    pub(crate) fn from_rect(rect: &Rectangle) -> QuadtreeResult<Self> {
        validate_rect_dims(rect.width, rect.height)?;
        let half_w = rect.width * 0.5;
        let half_h = rect.height * 0.5;
        Self::from_min_max(
            rect.x - half_w,
            rect.y - half_h,
            rect.x + half_w,
            rect.y + half_h,
        )
    }

    #[inline(always)]
    pub(crate) fn from_circle(circle: &Circle) -> QuadtreeResult<Self> {
        validate_circle_radius(circle.radius)?;
        Self::from_min_max(
            circle.x - circle.radius,
            circle.y - circle.radius,
            circle.x + circle.radius,
            circle.y + circle.radius,
        )
    }

    #[inline(always)]
    pub(crate) fn from_min_max(
        min_x: f32,
        min_y: f32,
        max_x: f32,
        max_y: f32,
    ) -> QuadtreeResult<Self> {
        validate_rect_extent_bounds(min_x, min_y, max_x, max_y)?;
        Ok(Self {
            min_x,
            min_y,
            max_x,
            max_y,
        })
    }

    #[inline(always)]
    pub(crate) fn from_center_half(center: Point, half: Point) -> Self {
        Self {
            min_x: center.x - half.x,
            min_y: center.y - half.y,
            max_x: center.x + half.x,
            max_y: center.y + half.y,
        }
    }
}

/// How a cell's bounds relate to a query box.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Overlap {
    Disjoint,
    Partial,
    Contained,
}

/// Classifies `cell` against `query`. Sharing only an edge or a corner is disjoint.
#[inline(always)]
pub(crate) fn classify(cell: RectExtent, query: RectExtent) -> Overlap {
    if cell.max_x <= query.min_x
        || cell.min_x >= query.max_x
        || cell.max_y <= query.min_y
        || cell.min_y >= query.max_y
    {
        return Overlap::Disjoint;
    }
    if query.min_x <= cell.min_x
        && query.max_x >= cell.max_x
        && query.min_y <= cell.min_y
        && query.max_y >= cell.max_y
    {
        Overlap::Contained
    } else {
        Overlap::Partial
    }
}

pub(crate) fn validate_rect_dims(width: f32, height: f32) -> QuadtreeResult<()> {
    if !(width.is_finite() && height.is_finite()) || width < 0.0 || height < 0.0 {
        return Err(QuadtreeError::InvalidRectangleDims { width, height });
    }
    Ok(())
}

pub(crate) fn validate_circle_radius(radius: f32) -> QuadtreeResult<()> {
    if !(radius.is_finite() && radius >= 0.0) {
        return Err(QuadtreeError::InvalidCircleRadius { radius });
    }
    Ok(())
}

pub(crate) fn validate_rect_extent_bounds(
    min_x: f32,
    min_y: f32,
    max_x: f32,
    max_y: f32,
) -> QuadtreeResult<()> {
    if !(min_x.is_finite() && min_y.is_finite() && max_x.is_finite() && max_y.is_finite())
        || min_x > max_x
        || min_y > max_y
    {
        return Err(QuadtreeError::InvalidRectExtent {
            min_x,
            min_y,
            max_x,
            max_y,
        });
    }
    Ok(())
}
