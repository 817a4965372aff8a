use super::*;
use approx::{abs_diff_eq, AbsDiffEq};
use serde::{Deserialize, Serialize};
use std::{
    fmt,
    ops::{Add, Mul, Neg, Sub},
};

pub type FloatSize = f64;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: FloatSize,
    pub y: FloatSize,
}

impl Point {
    pub const ORIGIN: Point = Point { x: 0.0, y: 0.0 };

    pub fn new(x: FloatSize, y: FloatSize) -> Self {
        Point { x, y }
    }

    /// A vector from (0, 0) to this point
    pub fn to_vector(self) -> Vector {
        Vector {
            x: self.x,
            y: self.y,
        }
    }

    pub fn add_vector(self, vector: Vector) -> Point {
        Point {
            x: self.x + vector.x,
            y: self.y + vector.y,
        }
    }

    pub fn distance(self, other: Point) -> FloatSize {
        Line::new(self, other).length()
    }

    /// Rotate this point counter-clockwise by `degrees` around `origin`
    pub fn rotated_around(self, origin: Point, degrees: FloatSize) -> Point {
        if degrees == 0.0 {
            return self;
        }
        let (s, c) = degrees.to_radians().sin_cos();
        let x = self.x - origin.x;
        let y = self.y - origin.y;
        Point {
            x: (x * c - y * s) + origin.x,
            y: (x * s + y * c) + origin.y,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl Sub for Point {
    type Output = Vector;

    fn sub(self, rhs: Point) -> Vector {
        Vector {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
        }
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "・({},{})", self.x, self.y)
    }
}

impl AbsDiffEq for Point {
    type Epsilon = f64;

    fn default_epsilon() -> Self::Epsilon {
        f64::EPSILON
    }

    fn abs_diff_eq(&self, other: &Self, epsilon: Self::Epsilon) -> bool {
        self.x.abs_diff_eq(&other.x, epsilon) && self.y.abs_diff_eq(&other.y, epsilon)
    }
}

impl Bounding for Point {
    fn bound_all<'a>(mut entries: impl Iterator<Item = &'a Self>) -> Option<BoundingBox> {
        let first = entries.next()?;
        let mut min_x = first.x;
        let mut min_y = first.y;
        let mut max_x = first.x;
        let mut max_y = first.y;
        for p in entries {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        Some(BoundingBox::from_corners(
            Point { x: min_x, y: min_y },
            Point { x: max_x, y: max_y },
        ))
    }
}

/// A direction with a magnitude, stored in cartesian form.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector {
    pub x: FloatSize,
    pub y: FloatSize,
}

impl Vector {
    pub const ZERO: Vector = Vector { x: 0.0, y: 0.0 };

    pub fn new(x: FloatSize, y: FloatSize) -> Self {
        Vector { x, y }
    }

    /// Build a vector from a `direction` in radians and a `magnitude`
    pub fn from_polar(direction: FloatSize, magnitude: FloatSize) -> Self {
        let (s, c) = direction.sin_cos();
        Vector {
            x: c * magnitude,
            y: s * magnitude,
        }
    }

    pub fn magnitude(&self) -> FloatSize {
        self.x.hypot(self.y)
    }

    /// Angle to the positive x axis in radians, in `(-π, π]`
    pub fn direction(&self) -> FloatSize {
        self.y.atan2(self.x)
    }

    pub fn dot(&self, other: &Vector) -> FloatSize {
        self.x * other.x + self.y * other.y
    }

    /// The same vector turned by 90° counter-clockwise
    pub fn perpendicular(&self) -> Vector {
        Vector {
            x: -self.y,
            y: self.x,
        }
    }

    /// Unit vector in the same direction, or `None` for a zero vector
    pub fn normalized(&self) -> Option<Vector> {
        let m = self.magnitude();
        if m > 0.0 && m.is_finite() {
            Some(Vector {
                x: self.x / m,
                y: self.y / m,
            })
        } else {
            None
        }
    }
}

impl Add for Vector {
    type Output = Vector;

    fn add(self, rhs: Vector) -> Vector {
        Vector {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
        }
    }
}

impl Neg for Vector {
    type Output = Vector;

    fn neg(self) -> Vector {
        Vector {
            x: -self.x,
            y: -self.y,
        }
    }
}

impl Mul<FloatSize> for Vector {
    type Output = Vector;

    fn mul(self, rhs: FloatSize) -> Vector {
        Vector {
            x: self.x * rhs,
            y: self.y * rhs,
        }
    }
}

impl fmt::Display for Vector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "→({},{})", self.x, self.y)
    }
}

impl AbsDiffEq for Vector {
    type Epsilon = f64;

    fn default_epsilon() -> Self::Epsilon {
        f64::EPSILON
    }

    fn abs_diff_eq(&self, other: &Self, epsilon: Self::Epsilon) -> bool {
        self.x.abs_diff_eq(&other.x, epsilon) && self.y.abs_diff_eq(&other.y, epsilon)
    }
}

/// A straight line between 2 points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Line {
    pub start: Point,
    pub end: Point,
}

impl Line {
    pub fn new(start: Point, end: Point) -> Self {
        Line { start, end }
    }

    pub fn length(&self) -> FloatSize {
        self.to_vector().magnitude()
    }

    pub fn center(&self) -> Point {
        Point {
            x: (self.start.x + self.end.x) / 2.0,
            y: (self.start.y + self.end.y) / 2.0,
        }
    }

    /// The vector leading from `start` to `end`
    pub fn to_vector(&self) -> Vector {
        self.end - self.start
    }
}

/// An axis-aligned box described by its center and extents.
///
/// `length` is the vertical extent and `width` the horizontal one.
/// `y` grows towards the "bottom", so `topmost <= bottommost`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub center: Point,
    pub length: FloatSize,
    pub width: FloatSize,
}

impl BoundingBox {
    pub fn new(center: Point, length: FloatSize, width: FloatSize) -> Self {
        BoundingBox {
            center,
            length,
            width,
        }
    }

    pub fn from_corners(low_corner: Point, high_corner: Point) -> Self {
        let r = BoundingBox {
            center: Point {
                x: (low_corner.x + high_corner.x) / 2.0,
                y: (low_corner.y + high_corner.y) / 2.0,
            },
            length: high_corner.y - low_corner.y,
            width: high_corner.x - low_corner.x,
        };
        if cfg!(test) {
            r.assert_legal();
        }
        r
    }

    /// Minimum bounding box of `points`
    ///
    /// Fewer than 3 points do not describe an area and yield `None`.
    pub fn mbb(points: &[Point]) -> Option<Self> {
        if points.len() < 3 {
            return None;
        }
        Point::bound_all(points.iter())
    }

    pub fn leftmost(&self) -> FloatSize {
        self.center.x - self.width / 2.0
    }

    pub fn rightmost(&self) -> FloatSize {
        self.center.x + self.width / 2.0
    }

    pub fn topmost(&self) -> FloatSize {
        self.center.y - self.length / 2.0
    }

    pub fn bottommost(&self) -> FloatSize {
        self.center.y + self.length / 2.0
    }

    /// The four corners, starting with the maximum corner and moving clockwise
    pub fn vertices(&self) -> [Point; 4] {
        let Point { x, y } = self.center;
        let hw = self.width / 2.0;
        let hl = self.length / 2.0;
        [
            Point::new(x + hw, y + hl),
            Point::new(x + hw, y - hl),
            Point::new(x - hw, y - hl),
            Point::new(x - hw, y + hl),
        ]
    }

    pub fn overlaps(&self, other: &BoundingBox) -> bool {
        !(self.leftmost() > other.rightmost()
            || self.rightmost() < other.leftmost()
            || self.topmost() > other.bottommost()
            || self.bottommost() < other.topmost())
    }

    /// The box shared by `self` and `other`, if they overlap at all
    ///
    /// Built from each box's own corner vertices, so touching boxes produce
    /// a zero-sized region rather than `None`.
    pub fn overlap_region(&self, other: &BoundingBox) -> Option<BoundingBox> {
        if !self.overlaps(other) {
            return None;
        }
        let a = self.vertices();
        let b = other.vertices();
        let x_min = a[2].x.max(b[2].x);
        let y_min = a[2].y.max(b[2].y);
        let x_max = a[0].x.min(b[0].x);
        let y_max = a[0].y.min(b[0].y);
        BoundingBox::mbb(&[
            Point::new(x_min, y_min),
            Point::new(x_max, y_min),
            Point::new(x_max, y_max),
        ])
    }

    /// The smallest box containing both boxes
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        let low = Point::new(
            self.leftmost().min(other.leftmost()),
            self.topmost().min(other.topmost()),
        );
        let high = Point::new(
            self.rightmost().max(other.rightmost()),
            self.bottommost().max(other.bottommost()),
        );
        BoundingBox::from_corners(low, high)
    }

    /// `true` if `other` lies inside this box, allowing `epsilon` of slack
    pub fn covers(&self, other: &BoundingBox, epsilon: FloatSize) -> bool {
        other.leftmost() >= self.leftmost() - epsilon
            && other.rightmost() <= self.rightmost() + epsilon
            && other.topmost() >= self.topmost() - epsilon
            && other.bottommost() <= self.bottommost() + epsilon
    }

    pub fn assert_legal(&self) {
        assert!(
            self.length >= 0.0 && self.width >= 0.0,
            "BoundingBox {} is illegal!",
            self
        );
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}|{}]",
            Point::new(self.leftmost(), self.topmost()),
            Point::new(self.rightmost(), self.bottommost())
        )
    }
}

impl HasArea for BoundingBox {
    fn area(&self) -> f64 {
        self.length * self.width
    }
}

impl HasPerimeter for BoundingBox {
    fn perimeter(&self) -> f64 {
        2.0 * (self.length + self.width)
    }
}

impl Intersecting for BoundingBox {
    type IntersectionShape = BoundingBox;

    fn intersects(&self, other: &BoundingBox) -> bool {
        self.overlaps(other)
    }

    fn intersection(&self, other: &BoundingBox) -> Option<Self::IntersectionShape> {
        self.overlap_region(other)
    }

    fn contains(&self, other: &BoundingBox) -> bool {
        self.covers(other, 0.0)
    }
}

impl Intersecting<Point> for BoundingBox {
    type IntersectionShape = Point;

    fn intersects(&self, other: &Point) -> bool {
        self.leftmost() <= other.x
            && other.x <= self.rightmost()
            && self.topmost() <= other.y
            && other.y <= self.bottommost()
    }

    fn intersection(&self, other: &Point) -> Option<Self::IntersectionShape> {
        if self.intersects(other) {
            Some(*other)
        } else {
            None
        }
    }

    fn contains(&self, other: &Point) -> bool {
        self.intersects(other)
    }
}

impl Bounding for BoundingBox {
    fn bound_all<'a>(mut entries: impl Iterator<Item = &'a Self>) -> Option<BoundingBox> {
        let first = entries.next()?;
        Some(entries.fold(*first, |acc, b| acc.union(b)))
    }
}

impl AbsDiffEq for BoundingBox {
    type Epsilon = f64;

    fn default_epsilon() -> Self::Epsilon {
        f64::EPSILON
    }

    fn abs_diff_eq(&self, other: &Self, epsilon: Self::Epsilon) -> bool {
        self.center.abs_diff_eq(&other.center, epsilon)
            && abs_diff_eq!(self.length, other.length, epsilon = epsilon)
            && abs_diff_eq!(self.width, other.width, epsilon = epsilon)
    }
}
