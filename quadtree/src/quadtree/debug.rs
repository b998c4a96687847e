use super::*;

/// A populated cell decoded for overlays.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellInfo {
    pub key: CellKey,
    pub depth: usize,
    pub population: Population,
    pub bounds: Rectangle,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TreeStats {
    pub entities: usize,
    pub populated_cells: usize,
    pub leaf_cells: usize,
    pub internal_cells: usize,
    /// Subdivisions performed since the last clear.
    pub subdivisions: u32,
    pub deepest_depth: usize,
}

impl QuadTree {
    /// Every cell with a population entry, in no particular order. Read-only.
    pub fn populated_cells(&self) -> impl Iterator<Item = CellInfo> + '_ {
        self.tables.iter().map(move |(key, population)| {
            let depth = self.geometry.depth_of(key);
            let half = self.geometry.half_extent(depth);
            CellInfo {
                key,
                depth,
                population,
                bounds: Rectangle::from_center_half(
                    self.geometry.center_of(key, depth),
                    half.x,
                    half.y,
                ),
            }
        })
    }

    // Retrieve all populated cell bounding boxes
    pub fn all_node_bounding_boxes(&self, bounding_boxes: &mut Vec<Rectangle>) {
        bounding_boxes.extend(self.populated_cells().map(|cell| cell.bounds));
    }

    pub fn stats(&self) -> TreeStats {
        let mut stats = TreeStats {
            entities: self.tables.member_len(),
            populated_cells: self.tables.populated_len(),
            subdivisions: self.subdivisions,
            ..TreeStats::default()
        };
        for (key, population) in self.tables.iter() {
            match population {
                Population::Leaf(_) => stats.leaf_cells += 1,
                Population::Internal => stats.internal_cells += 1,
            }
            stats.deepest_depth = stats.deepest_depth.max(self.geometry.depth_of(key));
        }
        stats
    }
}
