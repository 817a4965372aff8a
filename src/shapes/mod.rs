//! Shapes that can be stored in the index and tested by the narrow phase.
//!
//! The index only needs [Collidable]; the SAT detector works on the concrete
//! [Shape] enum, which additionally knows edge normals, radii and side lengths.

use crate::geometry::{
    planar::{FloatSize, Line, Point, Vector},
    HasArea,
    HasPerimeter,
};
use serde::{Deserialize, Serialize};
use snafu::prelude::*;
use std::f64::consts::PI;

/// Number of points sampled around a circle's circumference.
pub const CIRCLE_SAMPLES: usize = 8;

/// Upper bound on the sides of a regular polygon.
pub const MAX_SIDES: usize = 1024;

/// The geometric contract the index relies upon.
pub trait Collidable {
    /// Ordered outline of the shape
    fn vertices(&self) -> Vec<Point>;

    fn center(&self) -> Point;
}

pub type Result<T> = std::result::Result<T, ShapeError>;

#[derive(Debug, Snafu)]
pub enum ShapeError {
    #[snafu(display("{what} must be a positive finite number, got {value}"))]
    InvalidSize { what: &'static str, value: FloatSize },
    #[snafu(display("A regular polygon needs at least 3 sides, got {sides}"))]
    TooFewSides { sides: usize },
    #[snafu(display("A regular polygon may have at most {MAX_SIDES} sides, got {sides}"))]
    TooManySides { sides: usize },
    #[snafu(display("Shape coordinates must be finite, got {point}"))]
    NonFinite { point: Point },
}

fn ensure_positive(what: &'static str, value: FloatSize) -> Result<()> {
    ensure!(value > 0.0 && value.is_finite(), InvalidSizeSnafu { what, value });
    Ok(())
}

fn ensure_finite(point: Point) -> Result<()> {
    ensure!(point.is_finite(), NonFiniteSnafu { point });
    Ok(())
}

/// One perpendicular per edge, edges running from each vertex to the next
/// and from the last back to the first.
pub fn edge_normals(vertices: &[Point]) -> Vec<Vector> {
    if vertices.len() < 2 {
        return Vec::new();
    }
    vertices
        .iter()
        .zip(vertices.iter().cycle().skip(1))
        .map(|(start, end)| Line::new(*start, *end).to_vector().perpendicular())
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Circle {
    pub center: Point,
    pub radius: FloatSize,
    /// Degrees, shifts the sampled ring
    #[serde(default)]
    pub rotation: FloatSize,
}

impl Circle {
    pub fn new(center: Point, radius: FloatSize) -> Self {
        Circle {
            center,
            radius,
            rotation: 0.0,
        }
    }

    /// The point on the circumference at `angle` radians
    pub fn point_on_circle(&self, angle: FloatSize) -> Point {
        let (s, c) = angle.sin_cos();
        Point::new(self.radius * s + self.center.x, self.radius * c + self.center.y)
    }

    /// `true` if `p` is inside the circle or on its circumference
    pub fn contains_point(&self, p: Point) -> bool {
        self.center.distance(p) <= self.radius
    }

    fn vertices(&self) -> Vec<Point> {
        let offset = self.rotation.to_radians();
        (0..CIRCLE_SAMPLES)
            .map(|i| (i as FloatSize) * 2.0 * PI / (CIRCLE_SAMPLES as FloatSize) - offset)
            .map(|angle| self.point_on_circle(angle))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegularPolygon {
    pub center: Point,
    pub sides: usize,
    pub side_length: FloatSize,
    #[serde(default)]
    pub rotation: FloatSize,
}

impl RegularPolygon {
    pub fn new(center: Point, sides: usize, side_length: FloatSize) -> Self {
        RegularPolygon {
            center,
            sides,
            side_length,
            rotation: 0.0,
        }
    }

    pub fn eq_triangle(center: Point, side_length: FloatSize) -> Self {
        Self::new(center, 3, side_length)
    }

    pub fn square(center: Point, side_length: FloatSize) -> Self {
        Self::new(center, 4, side_length)
    }

    pub fn pentagon(center: Point, side_length: FloatSize) -> Self {
        Self::new(center, 5, side_length)
    }

    pub fn hexagon(center: Point, side_length: FloatSize) -> Self {
        Self::new(center, 6, side_length)
    }

    pub fn octagon(center: Point, side_length: FloatSize) -> Self {
        Self::new(center, 8, side_length)
    }

    fn central_angle(&self) -> FloatSize {
        PI / (self.sides as FloatSize)
    }

    pub fn circumradius(&self) -> FloatSize {
        self.side_length / (2.0 * self.central_angle().sin())
    }

    pub fn apothem(&self) -> FloatSize {
        self.side_length / (2.0 * self.central_angle().tan())
    }

    fn vertices(&self) -> Vec<Point> {
        let step = 360.0 / (self.sides as FloatSize);
        let start = step / 2.0 - self.rotation;
        let circumcircle = Circle::new(self.center, self.circumradius());
        (0..self.sides)
            .map(|i| (start + step * (i as FloatSize)).to_radians())
            .map(|angle| circumcircle.point_on_circle(angle))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rectangle {
    pub center: Point,
    /// Vertical extent before rotation
    pub length: FloatSize,
    /// Horizontal extent before rotation
    pub width: FloatSize,
    #[serde(default)]
    pub rotation: FloatSize,
}

impl Rectangle {
    pub fn new(center: Point, length: FloatSize, width: FloatSize) -> Self {
        Rectangle {
            center,
            length,
            width,
            rotation: 0.0,
        }
    }

    fn vertices(&self) -> Vec<Point> {
        let Point { x, y } = self.center;
        let hw = self.width / 2.0;
        let hl = self.length / 2.0;
        // starts from the top right and moves clockwise
        [
            Point::new(x + hw, y + hl),
            Point::new(x + hw, y - hl),
            Point::new(x - hw, y - hl),
            Point::new(x - hw, y + hl),
        ]
        .into_iter()
        .map(|p| p.rotated_around(self.center, self.rotation))
        .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Triangle {
    pub vertices: [Point; 3],
    #[serde(default)]
    pub rotation: FloatSize,
}

impl Triangle {
    pub fn new(a: Point, b: Point, c: Point) -> Self {
        Triangle {
            vertices: [a, b, c],
            rotation: 0.0,
        }
    }

    /// Intersection of the medians
    pub fn centroid(&self) -> Point {
        let [a, b, c] = self.vertices;
        Point::new((a.x + b.x + c.x) / 3.0, (a.y + b.y + c.y) / 3.0)
    }

    fn vertices(&self) -> Vec<Point> {
        let center = self.centroid();
        self.vertices
            .iter()
            .map(|p| p.rotated_around(center, self.rotation))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Shape {
    Circle(Circle),
    RegularPolygon(RegularPolygon),
    Rectangle(Rectangle),
    Triangle(Triangle),
}

impl Shape {
    pub fn circle(center: Point, radius: FloatSize) -> Self {
        Shape::Circle(Circle::new(center, radius))
    }

    pub fn regular_polygon(center: Point, sides: usize, side_length: FloatSize) -> Self {
        Shape::RegularPolygon(RegularPolygon::new(center, sides, side_length))
    }

    pub fn square(center: Point, side_length: FloatSize) -> Self {
        Shape::RegularPolygon(RegularPolygon::square(center, side_length))
    }

    pub fn rectangle(center: Point, length: FloatSize, width: FloatSize) -> Self {
        Shape::Rectangle(Rectangle::new(center, length, width))
    }

    pub fn triangle(a: Point, b: Point, c: Point) -> Self {
        Shape::Triangle(Triangle::new(a, b, c))
    }

    pub fn radius(&self) -> Option<FloatSize> {
        match self {
            Shape::Circle(c) => Some(c.radius),
            _ => None,
        }
    }

    /// Only regular polygons have a single side length
    pub fn side_length(&self) -> Option<FloatSize> {
        match self {
            Shape::RegularPolygon(p) => Some(p.side_length),
            _ => None,
        }
    }

    /// Edge perpendiculars; circles have no true edges and report none
    pub fn normals(&self) -> Vec<Vector> {
        match self {
            Shape::Circle(_) => Vec::new(),
            _ => edge_normals(&self.vertices()),
        }
    }

    pub fn rotation(&self) -> FloatSize {
        match self {
            Shape::Circle(c) => c.rotation,
            Shape::RegularPolygon(p) => p.rotation,
            Shape::Rectangle(r) => r.rotation,
            Shape::Triangle(t) => t.rotation,
        }
    }

    /// Set the absolute rotation in degrees
    pub fn set_rotation(&mut self, degrees: FloatSize) {
        match self {
            Shape::Circle(c) => c.rotation = degrees,
            Shape::RegularPolygon(p) => p.rotation = degrees,
            Shape::Rectangle(r) => r.rotation = degrees,
            Shape::Triangle(t) => t.rotation = degrees,
        }
    }

    pub fn rotate_by(&mut self, degrees: FloatSize) {
        let current = self.rotation();
        self.set_rotation((current + degrees) % 360.0);
    }

    pub fn move_to(&mut self, target: Point) {
        let offset = target - self.center();
        self.move_relative(offset);
    }

    pub fn move_relative(&mut self, offset: Vector) {
        match self {
            Shape::Circle(c) => c.center = c.center.add_vector(offset),
            Shape::RegularPolygon(p) => p.center = p.center.add_vector(offset),
            Shape::Rectangle(r) => r.center = r.center.add_vector(offset),
            Shape::Triangle(t) => {
                for v in t.vertices.iter_mut() {
                    *v = v.add_vector(offset);
                }
            }
        }
    }

    /// Check sizes and coordinates, so the shape produces a usable outline
    pub fn validate(&self) -> Result<()> {
        match self {
            Shape::Circle(c) => {
                ensure_finite(c.center)?;
                ensure_positive("radius", c.radius)
            }
            Shape::RegularPolygon(p) => {
                ensure_finite(p.center)?;
                ensure!(p.sides >= 3, TooFewSidesSnafu { sides: p.sides });
                ensure!(p.sides <= MAX_SIDES, TooManySidesSnafu { sides: p.sides });
                ensure_positive("side_length", p.side_length)
            }
            Shape::Rectangle(r) => {
                ensure_finite(r.center)?;
                ensure_positive("length", r.length)?;
                ensure_positive("width", r.width)
            }
            Shape::Triangle(t) => t.vertices.iter().try_for_each(|p| ensure_finite(*p)),
        }
    }
}

impl Collidable for Shape {
    fn vertices(&self) -> Vec<Point> {
        match self {
            Shape::Circle(c) => c.vertices(),
            Shape::RegularPolygon(p) => p.vertices(),
            Shape::Rectangle(r) => r.vertices(),
            Shape::Triangle(t) => t.vertices(),
        }
    }

    fn center(&self) -> Point {
        match self {
            Shape::Circle(c) => c.center,
            Shape::RegularPolygon(p) => p.center,
            Shape::Rectangle(r) => r.center,
            Shape::Triangle(t) => t.centroid(),
        }
    }
}

impl HasPerimeter for Shape {
    fn perimeter(&self) -> f64 {
        match self {
            Shape::Circle(c) => 2.0 * PI * c.radius,
            Shape::RegularPolygon(p) => (p.sides as FloatSize) * p.side_length,
            Shape::Rectangle(r) => 2.0 * (r.length + r.width),
            Shape::Triangle(t) => {
                let [a, b, c] = t.vertices;
                a.distance(b) + b.distance(c) + c.distance(a)
            }
        }
    }
}

impl HasArea for Shape {
    fn area(&self) -> f64 {
        match self {
            Shape::Circle(c) => PI * c.radius * c.radius,
            Shape::RegularPolygon(p) => self.perimeter() * p.apothem() / 2.0,
            Shape::Rectangle(r) => r.length * r.width,
            Shape::Triangle(t) => {
                let [a, b, c] = t.vertices;
                ((b - a).x * (c - a).y - (b - a).y * (c - a).x).abs() / 2.0
            }
        }
    }
}
