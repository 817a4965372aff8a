use crate::{
    geometry::planar::{FloatSize, Line, Point, Vector},
    shapes::{Circle, Collidable, Shape},
};
use approx::abs_diff_eq;
use serde::{Deserialize, Serialize};

/// Divisor applied to the penetration depth of the reported separation vector.
///
/// Keeps collision responses from overshooting.
pub const DEFAULT_DAMPING: FloatSize = 8.0;

/// Axes closer than this (after normalisation) are considered the same axis.
const AXIS_EPSILON: FloatSize = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SatConfig {
    pub damping: FloatSize,
}

impl Default for SatConfig {
    fn default() -> Self {
        SatConfig {
            damping: DEFAULT_DAMPING,
        }
    }
}

/// Interval covered by a shape's vertices when projected onto an axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    pub min: FloatSize,
    pub max: FloatSize,
}

impl Projection {
    /// Project `vertices` onto `axis` in a single pass, tracking only the extremes
    pub fn of(vertices: &[Point], axis: &Vector) -> Option<Projection> {
        vertices
            .iter()
            .map(|p| p.to_vector().dot(axis))
            .fold(None, |acc, dp| match acc {
                None => Some(Projection { min: dp, max: dp }),
                Some(Projection { min, max }) if dp < min => Some(Projection { min: dp, max }),
                Some(Projection { min, max }) if dp > max => Some(Projection { min, max: dp }),
                unchanged => unchanged,
            })
    }

    pub fn is_separated_from(&self, other: &Projection) -> bool {
        self.min >= other.max || self.max <= other.min
    }

    /// How far the intervals overlap, or `None` if they are separated
    pub fn penetration(&self, other: &Projection) -> Option<FloatSize> {
        if self.is_separated_from(other) {
            return None;
        }
        let differences = [
            self.min - other.min,
            self.min - other.max,
            self.max - self.min,
            self.max - other.max,
        ];
        Some(
            differences
                .into_iter()
                .map(FloatSize::abs)
                .fold(FloatSize::INFINITY, FloatSize::min),
        )
    }
}

/// Separating-axis collision test between two [Shape]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct SatDetector {
    config: SatConfig,
}

impl SatDetector {
    pub fn new(config: SatConfig) -> Self {
        SatDetector { config }
    }

    pub fn config(&self) -> &SatConfig {
        &self.config
    }

    /// Returns the separation vector if `a` and `b` collide
    pub fn detect(&self, a: &Shape, b: &Shape) -> Option<Vector> {
        let axes = match (a, b) {
            (Shape::Circle(ca), Shape::Circle(cb)) => return circle_circle(ca, cb),
            (Shape::Circle(circle), polygon) | (polygon, Shape::Circle(circle)) => {
                circle_polygon_axes(circle, polygon)?
            }
            _ => polygon_axes(a, b)?,
        };
        self.separation(a, b, &axes)
    }

    fn separation(&self, a: &Shape, b: &Shape, axes: &[Vector]) -> Option<Vector> {
        let a_vertices = a.vertices();
        let b_vertices = b.vertices();
        let mut smallest: Option<(FloatSize, Vector)> = None;
        for axis in axes {
            let a_projection = Projection::of(&a_vertices, axis)?;
            let b_projection = Projection::of(&b_vertices, axis)?;
            let Some(depth) = a_projection.penetration(&b_projection) else {
                log::trace!("Separated on axis {axis}");
                return None;
            };
            if smallest.map_or(true, |(current, _)| depth.abs() < current.abs()) {
                smallest = Some((depth, *axis));
            }
        }
        let (depth, axis) = smallest?;
        Some(Vector::from_polar(
            axis.direction(),
            depth / self.config.damping,
        ))
    }
}

/// [SatDetector::detect] with the default configuration
pub fn detect_collision(a: &Shape, b: &Shape) -> Option<Vector> {
    SatDetector::default().detect(a, b)
}

fn circle_circle(a: &Circle, b: &Circle) -> Option<Vector> {
    let line = Line::new(a.center, b.center);
    if line.length() <= a.radius + b.radius {
        // the full center distance, not the penetration depth
        Some(line.to_vector())
    } else {
        None
    }
}

fn circle_polygon_axes(circle: &Circle, polygon: &Shape) -> Option<Vec<Vector>> {
    let closest = polygon
        .vertices()
        .into_iter()
        .map(|p| Line::new(p, circle.center))
        .min_by(|l, r| l.length().total_cmp(&r.length()))?;
    let center_distance = circle.center.distance(polygon.center());
    if closest.length() > circle.radius && center_distance > circle.radius {
        return None;
    }
    let mut normals = polygon.normals();
    normals.push(closest.to_vector());
    Some(distinct_axes(normals))
}

fn polygon_axes(a: &Shape, b: &Shape) -> Option<Vec<Vector>> {
    if let (Some(side_a), Some(side_b)) = (a.side_length(), b.side_length()) {
        if a.center().distance(b.center()) > side_a + side_b {
            return None;
        }
    }
    let mut normals = a.normals();
    normals.extend(b.normals());
    Some(distinct_axes(normals))
}

/// Unit axes with opposite or repeated directions collapsed into one
fn distinct_axes(normals: Vec<Vector>) -> Vec<Vector> {
    let mut axes: Vec<Vector> = Vec::with_capacity(normals.len());
    for axis in normals.iter().filter_map(Vector::normalized) {
        let axis = if axis.x < 0.0 || (axis.x == 0.0 && axis.y < 0.0) {
            -axis
        } else {
            axis
        };
        if !axes
            .iter()
            .any(|known| abs_diff_eq!(*known, axis, epsilon = AXIS_EPSILON))
        {
            axes.push(axis);
        }
    }
    axes
}
