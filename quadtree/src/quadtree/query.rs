use super::types::{classify, Overlap, RectExtent};
use super::*;
use common::shapes::{Circle, Point};
use smallvec::SmallVec;

#[derive(Clone, Copy)]
struct NodeQueryInfo {
    key: CellKey,
    depth: usize,
    center: Point,
    contained: bool,
}

// Depth-first with four children per pop keeps at most 3 * max_depth + 1 frames.
type NodeStack = SmallVec<[NodeQueryInfo; 64]>;

impl QuadTree {
    /// Broad-phase region query: every entity whose cell overlaps `area`.
    ///
    /// Leaf memberships are returned whole, so results may include entities outside
    /// `area`; filter exactly if needed. Each entity appears at most once.
    ///
    /// `area` is treated as open: a cell that only touches its boundary is skipped, so
    /// an entity lying exactly on the edge of `area` may be missing even though
    /// [`Rectangle::contains_point`] accepts it. Entities strictly inside are always
    /// returned. Pad the box when boundary points matter.
    pub fn query(&self, area: &Rectangle) -> QuadtreeResult<Vec<u32>> {
        let mut found = Vec::new();
        self.query_into(area, &mut found)?;
        Ok(found)
    }

    /// Appends the broad-phase result for `area` to `found`.
    pub fn query_into(&self, area: &Rectangle, found: &mut Vec<u32>) -> QuadtreeResult<()> {
        let extent = RectExtent::from_rect(area)?;
        self.query_extent_with(extent, |index| found.push(index));
        Ok(())
    }

    pub fn query_rect_extent(
        &self,
        min_x: f32,
        min_y: f32,
        max_x: f32,
        max_y: f32,
        found: &mut Vec<u32>,
    ) -> QuadtreeResult<()> {
        let extent = RectExtent::from_min_max(min_x, min_y, max_x, max_y)?;
        self.query_extent_with(extent, |index| found.push(index));
        Ok(())
    }

    /// Broad phase over the bounding box of `circle`; candidates still need a distance test.
    pub fn query_circle(&self, circle: &Circle, found: &mut Vec<u32>) -> QuadtreeResult<()> {
        let extent = RectExtent::from_circle(circle)?;
        self.query_extent_with(extent, |index| found.push(index));
        Ok(())
    }

    pub fn query_with<F>(&self, area: &Rectangle, f: F) -> QuadtreeResult<()>
    where
        F: FnMut(u32),
    {
        let extent = RectExtent::from_rect(area)?;
        self.query_extent_with(extent, f);
        Ok(())
    }

    fn query_extent_with<F>(&self, query: RectExtent, mut f: F)
    where
        F: FnMut(u32),
    {
        let mut stack = NodeStack::new();
        stack.push(NodeQueryInfo {
            key: CellKey::ROOT,
            depth: 0,
            center: self.geometry.world_center(),
            contained: false,
        });

        while let Some(info) = stack.pop() {
            let child_depth = info.depth + 1;
            if child_depth > self.max_depth {
                continue;
            }
            let half = self.geometry.half_extent(child_depth);
            for quadrant in Quadrant::ALL {
                let child = info.key.child(quadrant);
                let Some(population) = self.tables.get(child) else {
                    continue;
                };

                // Below a contained cell every descendant is contained too
                let (center, overlap) = if info.contained {
                    (info.center, Overlap::Contained)
                } else {
                    let center = self.geometry.child_center(info.center, child_depth, quadrant);
                    let cell = RectExtent::from_center_half(center, half);
                    (center, classify(cell, query))
                };

                match (population, overlap) {
                    (_, Overlap::Disjoint) => {}
                    (Population::Leaf(_), _) => self.tables.members(child).for_each(&mut f),
                    (Population::Internal, overlap) => stack.push(NodeQueryInfo {
                        key: child,
                        depth: child_depth,
                        center,
                        contained: overlap == Overlap::Contained,
                    }),
                }
            }
        }
    }
}
