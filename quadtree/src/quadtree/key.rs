use common::shapes::{Point, Rectangle};

/// Deepest level a 32-bit key can address: ten 3-bit groups fill 30 bits.
pub const MAX_KEY_DEPTH: usize = 10;

pub(crate) const PRESENT_BIT: u32 = 0b100;
pub(crate) const QUADRANT_MASK: u32 = 0b011;
pub(crate) const GROUP_BITS: u32 = 3;

const fn depth_masks() -> [u32; MAX_KEY_DEPTH + 1] {
    let mut masks = [0u32; MAX_KEY_DEPTH + 1];
    let mut depth = 1;
    while depth <= MAX_KEY_DEPTH {
        masks[depth] = PRESENT_BIT << (GROUP_BITS * (depth as u32 - 1));
        depth += 1;
    }
    masks
}

/// Marker bit of the innermost group for each depth; index 0 is the root and has none.
pub(crate) const DEPTH_MASKS: [u32; MAX_KEY_DEPTH + 1] = depth_masks();

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Quadrant {
    BottomLeft = 0b00,
    BottomRight = 0b01,
    TopLeft = 0b10,
    TopRight = 0b11,
}

impl Quadrant {
    pub const ALL: [Quadrant; 4] = [
        Quadrant::BottomLeft,
        Quadrant::BottomRight,
        Quadrant::TopLeft,
        Quadrant::TopRight,
    ];

    #[inline(always)]
    pub fn from_bits(bits: u32) -> Self {
        match bits & QUADRANT_MASK {
            0b00 => Quadrant::BottomLeft,
            0b01 => Quadrant::BottomRight,
            0b10 => Quadrant::TopLeft,
            _ => Quadrant::TopRight,
        }
    }

    /// Quadrant of `point` relative to `center`. Points on a center line go left/bottom.
    #[inline(always)]
    pub fn of(center: Point, point: Point) -> Self {
        let right = (point.x > center.x) as u32;
        let top = (point.y > center.y) as u32;
        Self::from_bits(right | (top << 1))
    }

    #[inline(always)]
    pub fn bits(self) -> u32 {
        self as u32
    }

    #[inline(always)]
    pub fn is_right(self) -> bool {
        self.bits() & 0b01 != 0
    }

    #[inline(always)]
    pub fn is_top(self) -> bool {
        self.bits() & 0b10 != 0
    }
}

/// Identity of a cell: its whole path from the root packed three bits per level.
///
/// Each level contributes a marker bit ([`PRESENT_BIT`]) and two quadrant bits, so
/// `child = (parent << 3) | 0b100 | quadrant`. The root is the key `0` and never has
/// a table entry of its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct CellKey(u32);

impl CellKey {
    pub const ROOT: CellKey = CellKey(0);

    #[inline(always)]
    pub const fn from_raw(raw: u32) -> Self {
        CellKey(raw)
    }

    #[inline(always)]
    pub const fn raw(self) -> u32 {
        self.0
    }

    #[inline(always)]
    pub fn is_root(self) -> bool {
        self.0 == 0
    }

    #[inline(always)]
    pub fn child(self, quadrant: Quadrant) -> CellKey {
        CellKey((self.0 << GROUP_BITS) | PRESENT_BIT | quadrant.bits())
    }

    /// The root is its own parent.
    #[inline(always)]
    pub fn parent(self) -> CellKey {
        CellKey(self.0 >> GROUP_BITS)
    }

    /// Quadrant taken at the last step of the path, `None` for the root.
    pub fn quadrant(self) -> Option<Quadrant> {
        if self.is_root() {
            None
        } else {
            Some(Quadrant::from_bits(self.0))
        }
    }

    pub fn depth(self) -> usize {
        depth_within(self.0, MAX_KEY_DEPTH)
    }

    /// Quadrants from the root-adjacent level down to this cell.
    pub fn path(self) -> impl Iterator<Item = Quadrant> {
        let depth = self.depth();
        let raw = self.0;
        (1..=depth).map(move |level| {
            let shift = GROUP_BITS * (depth - level) as u32;
            Quadrant::from_bits(raw >> shift)
        })
    }

    pub fn from_path<I>(path: I) -> CellKey
    where
        I: IntoIterator<Item = Quadrant>,
    {
        path.into_iter().fold(CellKey::ROOT, |key, quadrant| key.child(quadrant))
    }
}

/// Scans the marker masks from `deepest` (capped at [`MAX_KEY_DEPTH`]) towards the root.
#[inline(always)]
pub(crate) fn depth_within(raw: u32, deepest: usize) -> usize {
    let mut depth = deepest.min(MAX_KEY_DEPTH);
    while depth > 0 {
        if raw & DEPTH_MASKS[depth] != 0 {
            return depth;
        }
        depth -= 1;
    }
    0
}

/// Decodes keys into cell geometry for a fixed world rectangle.
///
/// Half extents are precomputed per depth: `half_extents[d]` is the half size of every
/// cell at depth `d`, halving from the world half extent at depth 0.
#[derive(Debug, Clone)]
pub struct CellGeometry {
    center: Point,
    half_extents: Vec<Point>,
    max_depth: usize,
}

impl CellGeometry {
    pub fn new(world: Rectangle, max_depth: usize) -> Self {
        let mut half_extents = Vec::with_capacity(max_depth + 1);
        let mut half = Point::new(world.width * 0.5, world.height * 0.5);
        for _ in 0..=max_depth {
            half_extents.push(half);
            half = Point::new(half.x * 0.5, half.y * 0.5);
        }
        Self {
            center: world.center(),
            half_extents,
            max_depth,
        }
    }

    #[inline(always)]
    pub fn world_center(&self) -> Point {
        self.center
    }

    pub fn world(&self) -> Rectangle {
        let half = self.half_extents[0];
        Rectangle::from_center_half(self.center, half.x, half.y)
    }

    #[inline(always)]
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    #[inline(always)]
    pub fn half_extent(&self, depth: usize) -> Point {
        self.half_extents[depth]
    }

    #[inline(always)]
    pub fn depth_of(&self, key: CellKey) -> usize {
        depth_within(key.raw(), self.max_depth)
    }

    /// Center of the child in `quadrant`, one level below a cell centered at `parent_center`.
    #[inline(always)]
    pub fn child_center(
        &self,
        parent_center: Point,
        child_depth: usize,
        quadrant: Quadrant,
    ) -> Point {
        let half = self.half_extents[child_depth];
        Point::new(
            if quadrant.is_right() {
                parent_center.x + half.x
            } else {
                parent_center.x - half.x
            },
            if quadrant.is_top() {
                parent_center.y + half.y
            } else {
                parent_center.y - half.y
            },
        )
    }

    /// Center of the cell `key` known to sit at `depth`, decoded outermost group first.
    pub fn center_of(&self, key: CellKey, depth: usize) -> Point {
        let mut center = self.center;
        for level in 1..=depth {
            let shift = GROUP_BITS * (depth - level) as u32;
            let group = key.raw().checked_shr(shift).unwrap_or(0);
            center = self.child_center(center, level, Quadrant::from_bits(group));
        }
        center
    }

    /// `(center, half_extent)` of `key`.
    pub fn bounds_of(&self, key: CellKey) -> (Point, Point) {
        let depth = self.depth_of(key);
        (self.center_of(key, depth), self.half_extents[depth])
    }

    pub fn rectangle_of(&self, key: CellKey) -> Rectangle {
        let (center, half) = self.bounds_of(key);
        Rectangle::from_center_half(center, half.x, half.y)
    }

    /// Child of `key` (at `depth`) that `point` falls into.
    pub fn child_of(&self, key: CellKey, depth: usize, point: Point) -> CellKey {
        let center = self.center_of(key, depth);
        key.child(Quadrant::of(center, point))
    }
}
