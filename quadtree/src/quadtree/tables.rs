use super::key::CellKey;
use fxhash::FxHashMap;

/// Occupancy of a touched cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Population {
    /// Holds its entities directly.
    Leaf(u32),
    /// Subdivided; entities live in its children.
    Internal,
}

impl Population {
    /// Raw count reserved for internal cells.
    pub const SENTINEL: u32 = u32::MAX;

    #[inline(always)]
    pub fn from_raw(raw: u32) -> Self {
        if raw == Self::SENTINEL {
            Population::Internal
        } else {
            Population::Leaf(raw)
        }
    }

    #[inline(always)]
    pub fn raw(self) -> u32 {
        match self {
            Population::Leaf(count) => count,
            Population::Internal => Self::SENTINEL,
        }
    }

    #[inline(always)]
    pub fn is_internal(self) -> bool {
        matches!(self, Population::Internal)
    }
}

const NIL: u32 = 0;

#[derive(Clone, Copy, Default)]
struct MemberLink {
    entity: u32,
    next: u32,
}

/// A membership chain cut loose from its cell, waiting to be relinked.
#[must_use]
pub struct DetachedMembers {
    head: u32,
}

impl DetachedMembers {
    pub fn is_empty(&self) -> bool {
        self.head == NIL
    }
}

/// Population and membership tables keyed by [`CellKey`].
///
/// Memberships are singly linked chains through one slab of links whose slot 0 is a
/// nil sentinel. The slab is sized for the configured entity capacity up front and
/// relinking during subdivision reuses slots, so a rebuild never allocates unless
/// the caller inserts more entities than configured.
pub struct CellTables {
    population: FxHashMap<CellKey, Population>,
    heads: FxHashMap<CellKey, u32>,
    links: Vec<MemberLink>,
    member_capacity: usize,
    overflow_reported: bool,
}

impl CellTables {
    pub fn with_capacity(max_entities: usize) -> Self {
        let mut links = Vec::with_capacity(max_entities.saturating_add(1));
        links.push(MemberLink::default());
        Self {
            population: FxHashMap::with_capacity_and_hasher(max_entities, Default::default()),
            heads: FxHashMap::with_capacity_and_hasher(max_entities, Default::default()),
            links,
            member_capacity: max_entities,
            overflow_reported: false,
        }
    }

    #[inline(always)]
    pub fn get(&self, key: CellKey) -> Option<Population> {
        self.population.get(&key).copied()
    }

    /// Population count with absent cells reading as zero and internal cells as the sentinel.
    #[inline(always)]
    pub fn count(&self, key: CellKey) -> u32 {
        self.get(key).map_or(0, Population::raw)
    }

    /// Creates an empty leaf entry for `key` when absent and returns the current population.
    #[inline(always)]
    pub fn ensure(&mut self, key: CellKey) -> Population {
        *self.population.entry(key).or_insert(Population::Leaf(0))
    }

    #[inline(always)]
    pub fn increment(&mut self, key: CellKey) {
        let population = self.population.entry(key).or_insert(Population::Leaf(0));
        match population {
            Population::Leaf(count) => *count += 1,
            Population::Internal => {
                debug_assert!(false, "increment on internal cell {:?}", key);
            }
        }
    }

    #[inline(always)]
    pub fn is_internal(&self, key: CellKey) -> bool {
        self.get(key).is_some_and(Population::is_internal)
    }

    /// Marks `key` internal and hands back whatever it held.
    pub fn mark_internal(&mut self, key: CellKey) -> DetachedMembers {
        self.population.insert(key, Population::Internal);
        self.remove_all_members(key)
    }

    pub fn members(&self, key: CellKey) -> Members<'_> {
        Members {
            links: &self.links,
            slot: self.heads.get(&key).copied().unwrap_or(NIL),
        }
    }

    pub fn add_member(&mut self, key: CellKey, entity: u32) {
        if self.links.len() > self.member_capacity && !self.overflow_reported {
            self.overflow_reported = true;
            tracing::debug!(
                capacity = self.member_capacity,
                "membership slab grew past configured entity capacity"
            );
        }
        let slot = self.links.len() as u32;
        let head = self.heads.entry(key).or_insert(NIL);
        self.links.push(MemberLink {
            entity,
            next: *head,
        });
        *head = slot;
    }

    pub fn remove_all_members(&mut self, key: CellKey) -> DetachedMembers {
        DetachedMembers {
            head: self.heads.remove(&key).unwrap_or(NIL),
        }
    }

    /// Relinks every detached entity into the cell chosen by `route`, bumping its
    /// population. Returns how many entities moved.
    pub fn relink<F>(&mut self, detached: DetachedMembers, mut route: F) -> usize
    where
        F: FnMut(u32) -> CellKey,
    {
        let mut slot = detached.head;
        let mut moved = 0;
        while slot != NIL {
            let MemberLink { entity, next } = self.links[slot as usize];
            let key = route(entity);
            let head = self.heads.entry(key).or_insert(NIL);
            self.links[slot as usize].next = *head;
            *head = slot;
            self.increment(key);
            slot = next;
            moved += 1;
        }
        moved
    }

    /// Forgets every cell while keeping map and slab capacity.
    pub fn clear_all(&mut self) {
        self.population.clear();
        self.heads.clear();
        self.links.truncate(1);
        self.overflow_reported = false;
    }

    pub fn populated_len(&self) -> usize {
        self.population.len()
    }

    pub fn member_len(&self) -> usize {
        self.links.len() - 1
    }

    pub fn iter(&self) -> impl Iterator<Item = (CellKey, Population)> + '_ {
        self.population.iter().map(|(&key, &population)| (key, population))
    }
}

/// Entities of one cell, most recently added first.
#[derive(Clone)]
pub struct Members<'a> {
    links: &'a [MemberLink],
    slot: u32,
}

impl Iterator for Members<'_> {
    type Item = u32;

    #[inline(always)]
    fn next(&mut self) -> Option<u32> {
        if self.slot == NIL {
            return None;
        }
        let link = self.links[self.slot as usize];
        self.slot = link.next;
        Some(link.entity)
    }
}
