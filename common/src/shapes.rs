use rand::Rng;

#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const ZERO: Point = Point { x: 0.0, y: 0.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance_sq(&self, other: Point) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    pub fn length(&self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    /// Unit vector in the same direction, or zero for the zero vector.
    pub fn normalized(&self) -> Point {
        let length = self.length();
        if length > 0.0 {
            Point::new(self.x / length, self.y / length)
        } else {
            Point::ZERO
        }
    }
}

impl From<(f32, f32)> for Point {
    fn from((x, y): (f32, f32)) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Copy, Clone)]
pub struct Circle {
    pub x: f32,
    pub y: f32,
    pub radius: f32,
}

impl Circle {
    pub fn new(x: f32, y: f32, radius: f32) -> Self {
        Self { x, y, radius }
    }

    pub fn center(&self) -> Point {
        Point::new(self.x, self.y)
    }

    // Exact test, used to narrow broad-phase candidates
    pub fn contains_point(&self, point: Point) -> bool {
        self.center().distance_sq(point) < self.radius * self.radius
    }
}

/// Axis-aligned rectangle stored as center and full size, y pointing up.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Rectangle {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rectangle {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn from_center_half(center: Point, half_width: f32, half_height: f32) -> Self {
        Self {
            x: center.x,
            y: center.y,
            width: half_width * 2.0,
            height: half_height * 2.0,
        }
    }

    pub fn from_min_max(min_x: f32, min_y: f32, max_x: f32, max_y: f32) -> Self {
        Self {
            x: (min_x + max_x) * 0.5,
            y: (min_y + max_y) * 0.5,
            width: max_x - min_x,
            height: max_y - min_y,
        }
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn height(&self) -> f32 {
        self.height
    }

    pub fn center(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn left(&self) -> f32 {
        self.x - self.width / 2.0
    }

    pub fn right(&self) -> f32 {
        self.x + self.width / 2.0
    }

    pub fn bottom(&self) -> f32 {
        self.y - self.height / 2.0
    }

    pub fn top(&self) -> f32 {
        self.y + self.height / 2.0
    }

    pub fn contains_point(&self, x: f32, y: f32) -> bool {
        x >= self.left() && x <= self.right() && y >= self.bottom() && y <= self.top()
    }

    pub fn contains_rectangle(&self, inner: &Rectangle) -> bool {
        self.left() <= inner.left()
            && self.right() >= inner.right()
            && self.bottom() <= inner.bottom()
            && self.top() >= inner.top()
    }

    /// Positive-area overlap: rectangles that only share an edge or corner do not intersect.
    pub fn intersects(&self, other: &Rectangle) -> bool {
        self.left() < other.right()
            && self.right() > other.left()
            && self.bottom() < other.top()
            && self.top() > other.bottom()
    }

    pub fn expand_to_include(&mut self, other: &Rectangle) {
        let left = f32::min(self.left(), other.left());
        let right = f32::max(self.right(), other.right());
        let bottom = f32::min(self.bottom(), other.bottom());
        let top = f32::max(self.top(), other.top());
        self.x = (left + right) / 2.0;
        self.y = (bottom + top) / 2.0;
        self.width = right - left;
        self.height = top - bottom;
    }

    pub fn random_point_inside<R: Rng>(&self, rng: &mut R) -> Point {
        Point::new(
            self._safe_randf32(rng, self.left(), self.right()),
            self._safe_randf32(rng, self.bottom(), self.top()),
        )
    }

    /// Point on the circle of `radius` around the rectangle center, at `angle` radians.
    pub fn point_on_ring(&self, radius: f32, angle: f32) -> Point {
        Point::new(self.x + angle.cos() * radius, self.y + angle.sin() * radius)
    }

    fn _safe_randf32<R: Rng>(&self, rng: &mut R, min: f32, max: f32) -> f32 {
        if min >= max {
            return min;
        }
        rng.gen_range(min..max)
    }
}
