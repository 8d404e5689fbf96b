/// Width and height in physical pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Size {
    /// Width in pixels.
    pub width: i32,
    /// Height in pixels.
    pub height: i32,
}

impl Size {
    /// Build a size.
    pub const fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }
}

/// A top-left coordinate in screen space.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Point {
    /// X coordinate of the top-left corner.
    pub x: i32,
    /// Y coordinate of the top-left corner.
    pub y: i32,
}

impl Point {
    /// Build a point.
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// A positioned window frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Rect {
    /// Top-left corner.
    pub origin: Point,
    /// Frame size.
    pub size: Size,
}

impl Rect {
    /// Build a frame from its corner and size.
    pub const fn new(origin: Point, size: Size) -> Self {
        Self { origin, size }
    }

    /// Exclusive right edge.
    pub fn right(&self) -> i32 {
        self.origin.x + self.size.width
    }

    /// Exclusive bottom edge.
    pub fn bottom(&self) -> i32 {
        self.origin.y + self.size.height
    }

    /// Whether `p` falls inside the frame.
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.origin.x && p.x < self.right() && p.y >= self.origin.y && p.y < self.bottom()
    }
}
