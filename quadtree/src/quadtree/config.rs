use super::key::MAX_KEY_DEPTH;
use crate::error::{QuadtreeError, QuadtreeResult};

#[derive(Debug, Clone)]
pub struct Config {
    /// Entities expected per rebuild; sizes the tables and membership slab once.
    pub max_entities: usize,
    /// Entities a cell takes before it subdivides.
    pub node_capacity: usize,
    /// Deepest cell depth (root is 0). Cells at this depth never subdivide.
    pub max_depth: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            max_entities: 10_000,
            node_capacity: 5,
            max_depth: 8,
        }
    }
}

impl Config {
    pub fn validate(&self) -> QuadtreeResult<()> {
        if self.node_capacity == 0 {
            return Err(QuadtreeError::InvalidNodeCapacity {
                node_capacity: self.node_capacity,
            });
        }
        if self.max_depth == 0 {
            return Err(QuadtreeError::InvalidMaxDepth {
                max_depth: self.max_depth,
            });
        }
        Ok(())
    }

    /// Whether `max_depth` needs more key bits than a `u32` cell key has.
    pub fn exceeds_key_budget(&self) -> bool {
        self.max_depth > MAX_KEY_DEPTH
    }

    /// Copy with `max_depth` limited to what the key can address.
    pub fn clamped_depth(&self) -> Self {
        Config {
            max_depth: self.max_depth.min(MAX_KEY_DEPTH),
            ..self.clone()
        }
    }
}
