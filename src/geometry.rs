//! 2D geometry primitives for the array cross-section.
//!
//! Coordinates are in the plane perpendicular to the row axis: `x` runs
//! across the rows, `y` is height above the ground. Angles are in degrees.

use std::ops::{Add, Mul, Neg, Sub};

use geo::{ConvexHull, Coord, Intersects, Line, MultiPoint, Polygon};
use serde::{Deserialize, Serialize};

/// Point in the array cross-section plane.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: &Point) -> f64 {
        (*other - *self).length()
    }

    pub fn is_close(&self, other: &Point, tol: f64) -> bool {
        self.distance_to(other) <= tol
    }
}

/// Free vector in the cross-section plane.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vector {
    pub dx: f64,
    pub dy: f64,
}

impl Vector {
    pub fn new(dx: f64, dy: f64) -> Self {
        Self { dx, dy }
    }

    pub fn length(&self) -> f64 {
        self.dx.hypot(self.dy)
    }

    pub fn dot(&self, other: &Vector) -> f64 {
        self.dx * other.dx + self.dy * other.dy
    }

    /// z-component of the 3D cross product.
    pub fn cross(&self, other: &Vector) -> f64 {
        self.dx * other.dy - self.dy * other.dx
    }

    /// Unit vector, or `None` for a zero-length vector.
    pub fn normalize(&self) -> Option<Vector> {
        let len = self.length();
        if len > 0.0 && len.is_finite() {
            Some(Vector::new(self.dx / len, self.dy / len))
        } else {
            None
        }
    }
}

impl Sub for Point {
    type Output = Vector;

    fn sub(self, rhs: Point) -> Vector {
        Vector::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Add<Vector> for Point {
    type Output = Point;

    fn add(self, rhs: Vector) -> Point {
        Point::new(self.x + rhs.dx, self.y + rhs.dy)
    }
}

impl Mul<f64> for Vector {
    type Output = Vector;

    fn mul(self, rhs: f64) -> Vector {
        Vector::new(self.dx * rhs, self.dy * rhs)
    }
}

impl Neg for Vector {
    type Output = Vector;

    fn neg(self) -> Vector {
        Vector::new(-self.dx, -self.dy)
    }
}

/// Result of a segment/segment intersection query.
///
/// `Parallel` and `Colinear` are reported separately, but every caller in
/// this crate treats both as "no intersection".
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Intersection {
    Point(Point),
    Parallel,
    Colinear,
    None,
}

impl Intersection {
    pub fn point(&self) -> Option<Point> {
        match self {
            Intersection::Point(p) => Some(*p),
            _ => None,
        }
    }
}

/// Straight line segment from `start` to `end`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub start: Point,
    pub end: Point,
}

impl Segment {
    pub fn new(start: Point, end: Point) -> Self {
        Self { start, end }
    }

    pub fn length(&self) -> f64 {
        self.start.distance_to(&self.end)
    }

    pub fn vector(&self) -> Vector {
        self.end - self.start
    }

    pub fn centroid(&self) -> Point {
        Point::new(
            0.5 * (self.start.x + self.end.x),
            0.5 * (self.start.y + self.end.y),
        )
    }

    /// Unit normal obtained by rotating `start -> end` by +90°.
    pub fn normal(&self) -> Option<Vector> {
        let v = self.vector();
        Vector::new(-v.dy, v.dx).normalize()
    }

    /// Signed distance of the orthogonal projection of `point` from `start`,
    /// measured along `start -> end`.
    pub fn position_of(&self, point: &Point) -> f64 {
        match self.vector().normalize() {
            Some(dir) => (*point - self.start).dot(&dir),
            None => 0.0,
        }
    }

    /// Point located `distance` along `start -> end`.
    pub fn point_at(&self, distance: f64) -> Point {
        match self.vector().normalize() {
            Some(dir) => self.start + dir * distance,
            None => self.start,
        }
    }

    /// Distance from `point` to the infinite line carrying the segment.
    pub fn line_distance(&self, point: &Point) -> f64 {
        let v = self.vector();
        let len = v.length();
        if len == 0.0 {
            return self.start.distance_to(point);
        }
        v.cross(&(*point - self.start)).abs() / len
    }

    /// Whether `point` lies on the segment, endpoints included.
    pub fn contains(&self, point: &Point, tol: f64) -> bool {
        let len = self.length();
        if len <= tol {
            return self.start.is_close(point, tol);
        }
        let pos = self.position_of(point);
        pos >= -tol && pos <= len + tol && self.line_distance(point) <= tol
    }

    /// Whether both segments lie on the same infinite line.
    pub fn is_colinear_with(&self, other: &Segment, tol: f64) -> bool {
        self.line_distance(&other.start) <= tol && self.line_distance(&other.end) <= tol
    }

    pub fn intersection(&self, other: &Segment, tol: f64) -> Intersection {
        let r = self.vector();
        let s = other.vector();
        let r_len = r.length();
        let s_len = s.length();
        if r_len <= tol || s_len <= tol {
            // Degenerate segments never intersect anything for shading purposes
            return Intersection::None;
        }

        let denom = r.cross(&s);
        let qp = other.start - self.start;
        if (denom / (r_len * s_len)).abs() <= tol {
            if (qp.cross(&r) / r_len).abs() <= tol {
                return Intersection::Colinear;
            }
            return Intersection::Parallel;
        }

        let t = qp.cross(&s) / denom;
        let u = qp.cross(&r) / denom;
        let t_tol = tol / r_len;
        let u_tol = tol / s_len;
        if t >= -t_tol && t <= 1.0 + t_tol && u >= -u_tol && u <= 1.0 + u_tol {
            Intersection::Point(self.start + r * t)
        } else {
            Intersection::None
        }
    }
}

/// Projection of a point onto a line along a direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    pub point: Point,
    /// Ray parameter: `point = origin + ray_parameter * direction`.
    pub ray_parameter: f64,
}

/// Project `origin` along `direction` onto the infinite line carrying `line`.
///
/// Returns `None` when the direction is parallel to the line.
pub fn project_along(origin: Point, direction: Vector, line: &Segment, tol: f64) -> Option<Projection> {
    let e = line.vector();
    let d_len = direction.length();
    let e_len = e.length();
    if d_len <= 0.0 || e_len <= tol {
        return None;
    }
    let denom = direction.cross(&e);
    if (denom / (d_len * e_len)).abs() <= tol {
        return None;
    }
    let t = (line.start - origin).cross(&e) / denom;
    Some(Projection {
        point: origin + direction * t,
        ray_parameter: t,
    })
}

/// Signed rotation of a pv row around its axis (degrees).
///
/// Modules whose azimuth lies within 180° clockwise of the axis azimuth face
/// +x and get a negative rotation; the others face -x.
pub fn rotation_from_tilt_azimuth(surface_azimuth: f64, axis_azimuth: f64, tilt: f64) -> f64 {
    if tilt == 0.0 {
        return -0.0;
    }
    let facing_positive_x = (surface_azimuth - axis_azimuth).rem_euclid(360.0) < 180.0;
    if facing_positive_x {
        -tilt
    } else {
        tilt
    }
}

/// Endpoints of a pv row of given width centered on `center`.
///
/// The first endpoint sits at `rotation + 180°`, the second at `rotation`, so
/// the front normal `(-dy, dx)` of the resulting segment points towards the
/// module azimuth.
pub fn coords_from_center_tilt_width(
    center: Point,
    tilt: f64,
    width: f64,
    surface_azimuth: f64,
    axis_azimuth: f64,
) -> Segment {
    let radius = width / 2.0;
    let rotation = rotation_from_tilt_azimuth(surface_azimuth, axis_azimuth, tilt);
    let (sin_back, cos_back) = (rotation + 180.0).to_radians().sin_cos();
    let (sin_rot, cos_rot) = rotation.to_radians().sin_cos();
    Segment::new(
        Point::new(center.x + radius * cos_back, center.y + radius * sin_back),
        Point::new(center.x + radius * cos_rot, center.y + radius * sin_rot),
    )
}

/// Sun direction projected in the cross-section plane, pointing to the sun.
pub fn solar_2d_vector(solar_zenith: f64, solar_azimuth: f64, axis_azimuth: f64) -> Vector {
    let zenith = solar_zenith.to_radians();
    let relative_azimuth = (solar_azimuth - axis_azimuth).to_radians();
    Vector::new(zenith.sin() * relative_azimuth.sin(), zenith.cos())
}

impl From<Point> for Coord<f64> {
    fn from(point: Point) -> Self {
        Coord { x: point.x, y: point.y }
    }
}

impl From<Segment> for Line<f64> {
    fn from(segment: Segment) -> Self {
        Line::new(segment.start, segment.end)
    }
}

/// Convex hull of the endpoints of two segments.
pub fn segments_hull(a: &Segment, b: &Segment) -> Polygon<f64> {
    let corners: Vec<Coord<f64>> = [a.start, a.end, b.start, b.end].into_iter().map(Coord::from).collect();
    MultiPoint::from(corners).convex_hull()
}

/// Whether a segment touches or enters a polygon.
pub fn segment_intersects_polygon(segment: &Segment, polygon: &Polygon<f64>) -> bool {
    polygon.intersects(&Line::from(*segment))
}
