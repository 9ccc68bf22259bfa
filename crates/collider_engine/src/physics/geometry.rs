//! Primitive 2D shapes and intersection math
//!
//! Provides the axis-aligned [`Rect`] used as every collider's bounds and the
//! [`Edge`] segment that serves both as an obstacle boundary and as a cast
//! ray.

use serde::{Deserialize, Serialize};

use crate::foundation::math::{offset_by_angle, Angle, Point2, Vec2};

/// Half-length of the crossbars laid across endpoints when a ray and an edge are parallel
const PARALLEL_CROSSBAR_LENGTH: f32 = 0.0001;

/// Which side of a rectangle an edge belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RectSide {
    /// The edge at `top`
    Top,
    /// The edge at `bottom`
    Bottom,
    /// The edge at `left`
    Left,
    /// The edge at `right`
    Right,
}

impl RectSide {
    /// Every side, in the same order as [`Rect::edges`]
    pub const ALL: [RectSide; 4] = [Self::Top, Self::Bottom, Self::Left, Self::Right];

    /// True for the top and bottom sides
    pub fn is_horizontal(self) -> bool {
        matches!(self, Self::Top | Self::Bottom)
    }

    /// Unit vector pointing out of the rectangle through this side
    pub fn outward_normal(self) -> Vec2 {
        match self {
            Self::Top => Vec2::new(0.0, -1.0),
            Self::Bottom => Vec2::new(0.0, 1.0),
            Self::Left => Vec2::new(-1.0, 0.0),
            Self::Right => Vec2::new(1.0, 0.0),
        }
    }

    /// True when something moving along `travel` would enter the
    /// rectangle through this side
    pub fn faces(self, travel: &Vec2) -> bool {
        self.outward_normal().dot(travel) < 0.0
    }
}

/// An axis-aligned rectangle
///
/// Width and height are expected to be non-negative; this is not enforced.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    /// X coordinate of the left side
    pub left: f32,
    /// Y coordinate of the top side
    pub top: f32,
    /// Horizontal size
    pub width: f32,
    /// Vertical size
    pub height: f32,
}

impl Rect {
    /// Creates a new rectangle
    pub const fn new(left: f32, top: f32, width: f32, height: f32) -> Self {
        Self { left, top, width, height }
    }

    /// X coordinate of the right side
    pub fn right(&self) -> f32 {
        self.left + self.width
    }

    /// Y coordinate of the bottom side
    pub fn bottom(&self) -> f32 {
        self.top + self.height
    }

    /// Center point
    pub fn center(&self) -> Point2 {
        Point2::new(self.left + self.width / 2.0, self.top + self.height / 2.0)
    }

    /// Length of the diagonal
    pub fn hypotenuse(&self) -> f32 {
        self.width.hypot(self.height)
    }

    /// Top-left corner
    pub fn top_left(&self) -> Point2 {
        Point2::new(self.left, self.top)
    }

    /// The four corners: top-left, top-right, bottom-left, bottom-right
    pub fn corners(&self) -> [Point2; 4] {
        [
            Point2::new(self.left, self.top),
            Point2::new(self.right(), self.top),
            Point2::new(self.left, self.bottom()),
            Point2::new(self.right(), self.bottom()),
        ]
    }

    /// Edge along the top side, left to right
    pub fn top_edge(&self) -> Edge {
        Edge::new(self.left, self.top, self.right(), self.top)
    }

    /// Edge along the bottom side, left to right
    pub fn bottom_edge(&self) -> Edge {
        Edge::new(self.left, self.bottom(), self.right(), self.bottom())
    }

    /// Edge along the left side, top to bottom
    pub fn left_edge(&self) -> Edge {
        Edge::new(self.left, self.top, self.left, self.bottom())
    }

    /// Edge along the right side, top to bottom
    pub fn right_edge(&self) -> Edge {
        Edge::new(self.right(), self.top, self.right(), self.bottom())
    }

    /// All four edges in `[top, bottom, left, right]` order
    pub fn edges(&self) -> [Edge; 4] {
        [self.top_edge(), self.bottom_edge(), self.left_edge(), self.right_edge()]
    }

    /// Each edge paired with its side
    pub fn sided_edges(&self) -> [(RectSide, Edge); 4] {
        let edges = self.edges();
        std::array::from_fn(|i| (RectSide::ALL[i], edges[i]))
    }

    /// Which side `edge` is, if it is exactly one of this rectangle's edges
    pub fn side_of(&self, edge: &Edge) -> Option<RectSide> {
        if *edge == self.top_edge() {
            Some(RectSide::Top)
        } else if *edge == self.bottom_edge() {
            Some(RectSide::Bottom)
        } else if *edge == self.left_edge() {
            Some(RectSide::Left)
        } else if *edge == self.right_edge() {
            Some(RectSide::Right)
        } else {
            None
        }
    }

    /// Same size, shifted by `(dx, dy)`
    #[must_use]
    pub fn offset(&self, dx: f32, dy: f32) -> Self {
        Self::new(self.left + dx, self.top + dy, self.width, self.height)
    }

    /// Same size, top-left corner at `(x, y)`
    #[must_use]
    pub fn move_to(&self, x: f32, y: f32) -> Self {
        Self::new(x, y, self.width, self.height)
    }

    /// Same size, moved `distance` units toward `angle`
    #[must_use]
    pub fn offset_by_angle(&self, angle: Angle, distance: f32) -> Self {
        let moved = offset_by_angle(self.top_left(), angle, distance);
        self.move_to(moved.x, moved.y)
    }

    /// True if the point is inside or on the boundary
    pub fn contains(&self, point: Point2) -> bool {
        point.x >= self.left && point.x <= self.right() && point.y >= self.top && point.y <= self.bottom()
    }

    /// True if the rectangles overlap or share boundary
    pub fn touches(&self, other: &Rect) -> bool {
        self.left <= other.right()
            && self.right() >= other.left
            && self.top <= other.bottom()
            && self.bottom() >= other.top
    }

    /// True if the rectangles share interior area
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.left < other.right()
            && self.right() > other.left
            && self.top < other.bottom()
            && self.bottom() > other.top
    }

    /// Gap between the closest points of two rectangles (0 when they touch)
    pub fn calculate_distance_to(&self, other: &Rect) -> f32 {
        let dx = (other.left - self.right()).max(self.left - other.right()).max(0.0);
        let dy = (other.top - self.bottom()).max(self.top - other.bottom()).max(0.0);
        dx.hypot(dy)
    }
}

/// A line segment from `(x1, y1)` to `(x2, y2)`
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Edge {
    /// Start x
    pub x1: f32,
    /// Start y
    pub y1: f32,
    /// End x
    pub x2: f32,
    /// End y
    pub y2: f32,
}

impl Edge {
    /// Creates a new segment
    pub const fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Creates a segment between two points
    pub fn from_points(from: Point2, to: Point2) -> Self {
        Self::new(from.x, from.y, to.x, to.y)
    }

    /// A ray of `length` units starting at `origin` and pointing toward `angle`
    pub fn ray(origin: Point2, angle: Angle, length: f32) -> Self {
        Self::from_points(origin, offset_by_angle(origin, angle, length))
    }

    /// Start point
    pub fn start(&self) -> Point2 {
        Point2::new(self.x1, self.y1)
    }

    /// End point
    pub fn end(&self) -> Point2 {
        Point2::new(self.x2, self.y2)
    }

    /// Vector from start to end
    pub fn direction(&self) -> Vec2 {
        Vec2::new(self.x2 - self.x1, self.y2 - self.y1)
    }

    /// Segment length
    pub fn length(&self) -> f32 {
        self.direction().magnitude()
    }

    /// True when both endpoints share a y coordinate
    pub fn is_horizontal(&self) -> bool {
        self.y1 == self.y2
    }

    /// True when both endpoints share an x coordinate
    pub fn is_vertical(&self) -> bool {
        self.x1 == self.x2
    }

    /// True when the two segments have no single crossing point
    pub fn is_parallel_to(&self, other: &Edge) -> bool {
        Self::determinant(self, other) == 0.0
    }

    /// Where this segment meets `other`, if anywhere
    ///
    /// When the two are not parallel this is the usual parametric solution.
    /// Parallel segments have a zero determinant; in that case short crossbar
    /// segments are laid perpendicular across each endpoint and tested
    /// against the other segment, and the contact closest to this segment's
    /// start wins. That catches collinear overlap, which the parametric form
    /// cannot see.
    pub fn intersection(&self, other: &Edge) -> Option<Point2> {
        if self.is_parallel_to(other) {
            self.parallel_intersection(other)
        } else {
            self.parametric_intersection(other)
        }
    }

    fn determinant(a: &Edge, b: &Edge) -> f32 {
        (a.x1 - a.x2) * (b.y1 - b.y2) - (a.y1 - a.y2) * (b.x1 - b.x2)
    }

    fn parametric_intersection(&self, other: &Edge) -> Option<Point2> {
        let den = Self::determinant(self, other);
        if den == 0.0 {
            return None;
        }

        let Edge { x1, y1, x2, y2 } = *self;
        let Edge { x1: x3, y1: y3, x2: x4, y2: y4 } = *other;

        let t = ((x1 - x3) * (y3 - y4) - (y1 - y3) * (x3 - x4)) / den;
        let u = -((x1 - x2) * (y1 - y3) - (y1 - y2) * (x1 - x3)) / den;

        if (0.0..=1.0).contains(&t) && (0.0..=1.0).contains(&u) {
            Some(Point2::new(x1 + t * (x2 - x1), y1 + t * (y2 - y1)))
        } else {
            None
        }
    }

    fn parallel_intersection(&self, other: &Edge) -> Option<Point2> {
        // Parallel segments share a direction; take it from whichever is not a point
        let direction = if self.length() > 0.0 {
            self.direction()
        } else if other.length() > 0.0 {
            other.direction()
        } else {
            return (self.start() == other.start()).then(|| self.start());
        };
        let normal = Vec2::new(-direction.y, direction.x).normalize() * PARALLEL_CROSSBAR_LENGTH;
        let crossbar = |at: Point2| Edge::from_points(at - normal, at + normal);

        let origin = self.start();
        let mut best: Option<(f32, Point2)> = None;
        let mut consider = |point: Point2| {
            let distance = nalgebra::distance(&origin, &point);
            if best.map_or(true, |(closest, _)| distance < closest) {
                best = Some((distance, point));
            }
        };

        // Other's endpoints lying on this segment
        for endpoint in [other.start(), other.end()] {
            if let Some(point) = self.parametric_intersection(&crossbar(endpoint)) {
                consider(point);
            }
        }
        // This segment's endpoints lying on the other
        for endpoint in [self.start(), self.end()] {
            if other.parametric_intersection(&crossbar(endpoint)).is_some() {
                consider(endpoint);
            }
        }

        best.map(|(_, point)| point)
    }
}
