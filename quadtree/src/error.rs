use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum QuadtreeError {
    #[error(
        "world bounds must be finite with positive width/height (x: {x}, y: {y}, width: {width}, height: {height})"
    )]
    InvalidWorldBounds {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
    },
    #[error("node capacity must be at least 1 (node_capacity: {node_capacity})")]
    InvalidNodeCapacity { node_capacity: usize },
    #[error("max depth must be at least 1 (max_depth: {max_depth})")]
    InvalidMaxDepth { max_depth: usize },
    #[error(
        "rectangle width/height must be finite and non-negative (width: {width}, height: {height})"
    )]
    InvalidRectangleDims { width: f32, height: f32 },
    #[error("circle radius must be finite and non-negative (radius: {radius})")]
    InvalidCircleRadius { radius: f32 },
    #[error(
        "rectangle extents must be finite with min <= max (min_x: {min_x}, min_y: {min_y}, max_x: {max_x}, max_y: {max_y})"
    )]
    InvalidRectExtent {
        min_x: f32,
        min_y: f32,
        max_x: f32,
        max_y: f32,
    },
    #[error("failed to spawn rebuild worker: {reason}")]
    RebuildWorkerSpawn { reason: String },
    #[error("rebuild worker panicked before completing")]
    RebuildWorkerPanicked,
    #[error("no tree available: a previous rebuild worker was lost")]
    TreeUnavailable,
}

pub type QuadtreeResult<T> = Result<T, QuadtreeError>;
