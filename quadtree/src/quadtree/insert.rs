use super::*;
use common::shapes::Point;

impl QuadTree {
    /// Deposits `index` into exactly one leaf, subdividing full cells on the way down.
    ///
    /// `positions` must resolve every index already in the tree: subdividing a cell
    /// re-reads the positions of the entities it held. Insertion never fails. Cells at
    /// `max_depth` accept entities past `node_capacity` without bound.
    pub fn insert<P>(&mut self, index: u32, position: Point, positions: &P)
    where
        P: PositionSource + ?Sized,
    {
        let mut current = CellKey::ROOT;
        let mut center = self.geometry.world_center();

        for depth in 1..self.max_depth {
            let quadrant = Quadrant::of(center, position);
            let child = current.child(quadrant);
            match self.tables.ensure(child) {
                Population::Leaf(count) if count < self.node_capacity => {
                    self.deposit(child, index);
                    return;
                }
                Population::Leaf(_) => self.subdivide(child, depth, positions),
                Population::Internal => {}
            }
            current = child;
            center = self.geometry.child_center(center, depth, quadrant);
        }

        // Deepest level: capacity is not enforced
        let child = current.child(Quadrant::of(center, position));
        self.deposit(child, index);
    }

    #[inline(always)]
    fn deposit(&mut self, key: CellKey, index: u32) {
        self.tables.add_member(key, index);
        self.tables.increment(key);
    }

    /// Marks `key` (at `depth`) internal and pushes its entities one level down.
    ///
    /// A child left full stays a leaf until a later insert reaches it.
    fn subdivide<P>(&mut self, key: CellKey, depth: usize, positions: &P)
    where
        P: PositionSource + ?Sized,
    {
        let detached = self.tables.mark_internal(key);
        let center = self.geometry.center_of(key, depth);
        let moved = self.tables.relink(detached, |entity| {
            key.child(Quadrant::of(center, positions.position(entity)))
        });
        self.subdivisions += 1;
        tracing::trace!(key = key.raw(), depth, moved, "subdivided cell");
    }
}
