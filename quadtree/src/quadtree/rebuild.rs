use super::*;
use std::mem;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

impl QuadTree {
    /// Drops every cell. Table and slab capacity is kept for the next rebuild.
    pub fn clear(&mut self) {
        self.tables.clear_all();
        self.subdivisions = 0;
    }

    /// Clears the tree and inserts each index in `live` at `positions.position(index)`.
    ///
    /// The order of `live` changes chain layout only, never which entities a query returns.
    pub fn rebuild<P, I>(&mut self, positions: &P, live: I)
    where
        P: PositionSource + ?Sized,
        I: IntoIterator<Item = u32>,
    {
        let _span = tracing::debug_span!("quadtree_rebuild").entered();
        self.clear();
        for index in live {
            self.insert(index, positions.position(index), positions);
        }
        tracing::debug!(
            entities = self.tables.member_len(),
            cells = self.tables.populated_len(),
            subdivisions = self.subdivisions,
            "rebuilt"
        );
    }

    /// Moves the tree onto a worker thread that runs [`QuadTree::rebuild`].
    ///
    /// The tree is unreachable until [`PendingRebuild::wait`] hands it back, so no query
    /// can observe a half-built table.
    pub fn spawn_rebuild<P>(
        mut self,
        positions: Arc<P>,
        live: Vec<u32>,
    ) -> QuadtreeResult<PendingRebuild>
    where
        P: PositionSource + Send + Sync + ?Sized + 'static,
    {
        let handle = thread::Builder::new()
            .name("quadtree-rebuild".into())
            .spawn(move || {
                self.rebuild(&*positions, live);
                self
            })
            .map_err(|err| QuadtreeError::RebuildWorkerSpawn {
                reason: err.to_string(),
            })?;
        Ok(PendingRebuild { handle })
    }
}

/// A rebuild running on its worker thread.
pub struct PendingRebuild {
    handle: JoinHandle<QuadTree>,
}

impl PendingRebuild {
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Blocks until the worker is done and returns the rebuilt tree.
    pub fn wait(self) -> QuadtreeResult<QuadTree> {
        self.handle
            .join()
            .map_err(|_| QuadtreeError::RebuildWorkerPanicked)
    }
}

enum DriverState {
    Ready(QuadTree),
    Building(PendingRebuild),
    Lost,
}

/// Owns the tree across ticks and enforces that queries only see completed rebuilds.
///
/// At most one rebuild is in flight. Starting another, or asking for the tree through
/// [`RebuildDriver::complete`], first waits for the running one.
pub struct RebuildDriver {
    state: DriverState,
}

impl RebuildDriver {
    pub fn new(tree: QuadTree) -> Self {
        Self {
            state: DriverState::Ready(tree),
        }
    }

    pub fn is_building(&self) -> bool {
        matches!(self.state, DriverState::Building(_))
    }

    /// Rebuilds on the calling thread.
    pub fn rebuild_inline<P, I>(&mut self, positions: &P, live: I) -> QuadtreeResult<&QuadTree>
    where
        P: PositionSource + ?Sized,
        I: IntoIterator<Item = u32>,
    {
        let tree = self.complete_mut()?;
        tree.rebuild(positions, live);
        Ok(&*tree)
    }

    /// Starts a rebuild on a worker thread and returns immediately.
    pub fn rebuild_in_background<P>(
        &mut self,
        positions: Arc<P>,
        live: Vec<u32>,
    ) -> QuadtreeResult<()>
    where
        P: PositionSource + Send + Sync + ?Sized + 'static,
    {
        self.complete_mut()?;
        let DriverState::Ready(tree) = mem::replace(&mut self.state, DriverState::Lost) else {
            return Err(QuadtreeError::TreeUnavailable);
        };
        self.state = DriverState::Building(tree.spawn_rebuild(positions, live)?);
        Ok(())
    }

    /// Completion fence: waits for any running rebuild, then lends out the tree.
    pub fn complete(&mut self) -> QuadtreeResult<&QuadTree> {
        self.complete_mut().map(|tree| &*tree)
    }

    pub fn into_tree(mut self) -> QuadtreeResult<QuadTree> {
        self.complete_mut()?;
        match mem::replace(&mut self.state, DriverState::Lost) {
            DriverState::Ready(tree) => Ok(tree),
            _ => Err(QuadtreeError::TreeUnavailable),
        }
    }

    fn complete_mut(&mut self) -> QuadtreeResult<&mut QuadTree> {
        if matches!(self.state, DriverState::Building(_)) {
            // A failed join leaves the driver in `Lost`
            let state = mem::replace(&mut self.state, DriverState::Lost);
            if let DriverState::Building(pending) = state {
                self.state = DriverState::Ready(pending.wait()?);
            }
        }
        match &mut self.state {
            DriverState::Ready(tree) => Ok(tree),
            _ => Err(QuadtreeError::TreeUnavailable),
        }
    }
}
