// src/geometry.rs
//
// Planar helpers shared by hit testing, pluck detection and
// proximity feedback. All coordinates are diagram units.

/// A point on the diagram surface.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    #[inline]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

impl From<(f32, f32)> for Point {
    fn from((x, y): (f32, f32)) -> Self {
        Self { x, y }
    }
}

/// Result of projecting a point onto a segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentHit {
    /// Closest point on the segment.
    pub point: Point,
    /// Distance from the query point to `point`.
    pub distance: f32,
    /// Parametric position of `point` along the segment, in `[0, 1]`.
    pub t: f32,
}

/// Which side of a directed line a point lies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
    On,
}

/// Euclidean distance.
#[inline]
pub fn distance(p1: Point, p2: Point) -> f32 {
    let dx = p1.x - p2.x;
    let dy = p1.y - p2.y;
    (dx * dx + dy * dy).sqrt()
}

/// Strict containment: a point on the rim is outside.
#[inline]
pub fn point_in_circle(p: Point, center: Point, radius: f32) -> bool {
    distance(p, center) < radius
}

/// Project `p` onto segment `a-b`, clamped to the segment's ends.
///
/// A zero-length segment degrades to the distance to `a`.
pub fn closest_point_on_segment(p: Point, a: Point, b: Point) -> SegmentHit {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let length_sq = dx * dx + dy * dy;

    if length_sq <= f32::EPSILON {
        return SegmentHit {
            point: a,
            distance: distance(p, a),
            t: 0.0,
        };
    }

    let t = (((p.x - a.x) * dx + (p.y - a.y) * dy) / length_sq).clamp(0.0, 1.0);
    let point = Point::new(a.x + t * dx, a.y + t * dy);

    SegmentHit {
        point,
        distance: distance(p, point),
        t,
    }
}

#[inline]
fn cross(a: Point, b: Point, p: Point) -> f32 {
    (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x)
}

/// Side of the infinite line through `a` and `b` that `p` falls on.
pub fn side_of_line(p: Point, a: Point, b: Point) -> Side {
    let c = cross(a, b, p);
    if c > f32::EPSILON {
        Side::Left
    } else if c < -f32::EPSILON {
        Side::Right
    } else {
        Side::On
    }
}

/// Whether segment `p-q` properly crosses segment `a-b`.
///
/// Touching at an endpoint does not count; collinear overlap does not count.
pub fn segments_intersect(p: Point, q: Point, a: Point, b: Point) -> bool {
    let d1 = side_of_line(p, a, b);
    let d2 = side_of_line(q, a, b);
    let d3 = side_of_line(a, p, q);
    let d4 = side_of_line(b, p, q);

    let opposite = |s1: Side, s2: Side| {
        matches!((s1, s2), (Side::Left, Side::Right) | (Side::Right, Side::Left))
    };

    opposite(d1, d2) && opposite(d3, d4)
}
