//! Sparse quadtree over point entities, addressed entirely by packed cell keys.
//!
//! No node objects exist. A cell is a [`CellKey`]; its depth and bounds are decoded
//! from the key on demand, and the only stored state is a population entry and a
//! membership chain per touched cell (see [`CellTables`]). The tree is rebuilt from
//! scratch every tick: [`QuadTree::clear`] followed by one [`QuadTree::insert`] per
//! live entity, or [`QuadTree::rebuild`] to do both.

mod config;
mod debug;
mod insert;
mod key;
mod positions;
mod query;
mod rebuild;
mod tables;
mod types;

pub use config::Config;
pub use debug::{CellInfo, TreeStats};
pub use key::{CellGeometry, CellKey, Quadrant, MAX_KEY_DEPTH};
pub use positions::PositionSource;
pub use rebuild::{PendingRebuild, RebuildDriver};
pub use tables::{CellTables, DetachedMembers, Members, Population};

use crate::error::{QuadtreeError, QuadtreeResult};
use common::shapes::Rectangle;

pub struct QuadTree {
    geometry: CellGeometry,
    tables: CellTables,
    node_capacity: u32,
    max_depth: usize,
    subdivisions: u32,
}

impl QuadTree {
    pub fn new(bounding_box: Rectangle) -> QuadtreeResult<Self> {
        Self::new_with_config(bounding_box, Config::default())
    }

    pub fn new_with_config(bounding_box: Rectangle, config: Config) -> QuadtreeResult<Self> {
        validate_world(&bounding_box)?;
        config.validate()?;
        if config.exceeds_key_budget() {
            tracing::warn!(
                max_depth = config.max_depth,
                key_budget = MAX_KEY_DEPTH,
                "max_depth exceeds what a 32-bit cell key can address; deep cells will alias"
            );
        }
        let node_capacity = u32::try_from(config.node_capacity).unwrap_or(u32::MAX);
        Ok(Self {
            geometry: CellGeometry::new(bounding_box, config.max_depth),
            tables: CellTables::with_capacity(config.max_entities),
            node_capacity,
            max_depth: config.max_depth,
            subdivisions: 0,
        })
    }

    pub fn geometry(&self) -> &CellGeometry {
        &self.geometry
    }

    pub fn bounds(&self) -> Rectangle {
        self.geometry.world()
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn node_capacity(&self) -> u32 {
        self.node_capacity
    }

    /// Population entry of `key`, `None` when the cell was never touched this rebuild.
    pub fn population(&self, key: CellKey) -> Option<Population> {
        self.tables.get(key)
    }

    pub fn members(&self, key: CellKey) -> Members<'_> {
        self.tables.members(key)
    }

    /// Number of entities stored.
    pub fn len(&self) -> usize {
        self.tables.member_len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn validate_world(bounds: &Rectangle) -> QuadtreeResult<()> {
    let finite = bounds.x.is_finite()
        && bounds.y.is_finite()
        && bounds.width.is_finite()
        && bounds.height.is_finite();
    if !finite || bounds.width <= 0.0 || bounds.height <= 0.0 {
        return Err(QuadtreeError::InvalidWorldBounds {
            x: bounds.x,
            y: bounds.y,
            width: bounds.width,
            height: bounds.height,
        });
    }
    Ok(())
}
