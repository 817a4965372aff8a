//! Scenes of named shapes described in JSON.
//!
//! A scene carries an optional tree extent, detector settings and the shapes
//! themselves. Loading validates every shape and rejects duplicate names, so
//! a loaded scene can always be indexed.

use crate::{
    collision::{SatConfig, SatDetector},
    geometry::{
        planar::{BoundingBox, FloatSize, Point, Vector},
        Bounding,
    },
    indices::r_tree::{in_memory::RTree, IndexError},
    shapes::{Collidable, Shape, ShapeError},
};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use snafu::prelude::*;
use std::{
    fmt,
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
    str::FromStr,
};

#[derive(Debug, Snafu)]
pub enum SceneError {
    #[snafu(display("Could not read scene file {}: {source}", path.display()))]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("Could not parse scene description: {source}"))]
    Parse { source: serde_json::Error },
    #[snafu(display("Shape '{name}' is invalid: {source}"))]
    InvalidShape { name: String, source: ShapeError },
    #[snafu(display("Shape name '{name}' is used more than once"))]
    DuplicateName { name: String },
    #[snafu(display("Damping must be a positive finite number, got {value}"))]
    InvalidDamping { value: FloatSize },
    #[snafu(display("Could not index the scene: {source}"))]
    Index { source: IndexError },
}

pub type Result<T, E = SceneError> = std::result::Result<T, E>;

fn ensure_damping(value: FloatSize) -> Result<()> {
    ensure!(value > 0.0 && value.is_finite(), InvalidDampingSnafu { value });
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneObject {
    pub name: String,
    pub shape: Shape,
}

impl Collidable for SceneObject {
    fn vertices(&self) -> Vec<Point> {
        self.shape.vertices()
    }

    fn center(&self) -> Point {
        self.shape.center()
    }
}

/// How shapes are put into the tree
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InsertionMode {
    #[default]
    Bulk,
    Sequential,
}

/// A colliding pair, names in ascending order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Collision {
    pub first: String,
    pub second: String,
    pub separation: Vector,
}

impl fmt::Display for Collision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <-> {}: {}", self.first, self.second, self.separation)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    /// Declared tree extent; derived from the shapes when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extent: Option<BoundingBox>,
    #[serde(default)]
    pub detector: SatConfig,
    pub shapes: Vec<SceneObject>,
}

impl Scene {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Scene> {
        let path = path.as_ref();
        let file = File::open(path).context(IoSnafu { path })?;
        let scene: Scene =
            serde_json::from_reader(BufReader::new(file)).context(ParseSnafu)?;
        scene.validate()?;
        log::info!(
            "Loaded scene with {} shapes from {}",
            scene.shapes.len(),
            path.display()
        );
        Ok(scene)
    }

    /// Checks the damping, every shape and the uniqueness of names
    pub fn validate(&self) -> Result<()> {
        ensure_damping(self.detector.damping)?;
        let mut names: FxHashSet<&str> = FxHashSet::default();
        for object in self.shapes.iter() {
            ensure!(
                names.insert(object.name.as_str()),
                DuplicateNameSnafu { name: &object.name }
            );
            object
                .shape
                .validate()
                .context(InvalidShapeSnafu { name: &object.name })?;
        }
        Ok(())
    }

    /// The declared extent, or the box around all shapes
    pub fn extent(&self) -> BoundingBox {
        if let Some(extent) = self.extent {
            return extent;
        }
        let boxes: Vec<BoundingBox> = self
            .shapes
            .iter()
            .filter_map(|object| BoundingBox::mbb(&object.vertices()))
            .collect();
        BoundingBox::bound_all(boxes.iter())
            .unwrap_or_else(|| BoundingBox::new(Point::ORIGIN, 0.0, 0.0))
    }

    /// Replaces the damping divisor, keeping the old one if `damping` is unusable
    pub fn set_damping(&mut self, damping: FloatSize) -> Result<()> {
        ensure_damping(damping)?;
        self.detector.damping = damping;
        Ok(())
    }

    pub fn detector(&self) -> SatDetector {
        SatDetector::new(self.detector)
    }

    pub fn build_tree(&self, mode: InsertionMode) -> Result<RTree<SceneObject>> {
        let extent = self.extent();
        let mut tree = RTree::new(extent.length, extent.width, extent.center);
        match mode {
            InsertionMode::Bulk => tree.bulk_insert(self.shapes.clone()).context(IndexSnafu)?,
            InsertionMode::Sequential => {
                for object in self.shapes.iter().cloned() {
                    tree.insert_shape(object).context(IndexSnafu)?;
                }
            }
        }
        Ok(tree)
    }

    /// Builds a tree of the scene and reports its collisions
    pub fn detect(&self, mode: InsertionMode) -> Result<Vec<Collision>> {
        let tree = self.build_tree(mode)?;
        Ok(report_collisions(&tree, &self.detector()))
    }
}

impl FromStr for Scene {
    type Err = SceneError;

    fn from_str(s: &str) -> Result<Self> {
        let scene: Scene = serde_json::from_str(s).context(ParseSnafu)?;
        scene.validate()?;
        Ok(scene)
    }
}

/// Every colliding pair in `tree` once, sorted by name
pub fn report_collisions(tree: &RTree<SceneObject>, detector: &SatDetector) -> Vec<Collision> {
    let mut collisions: Vec<Collision> = Vec::new();
    tree.detect_collisions(
        |a, b| detector.detect(&a.shape, &b.shape),
        |a, b, separation| {
            let (first, second, separation) = if a.name <= b.name {
                (a, b, separation)
            } else {
                (b, a, -separation)
            };
            collisions.push(Collision {
                first: first.name.clone(),
                second: second.name.clone(),
                separation,
            });
        },
    );
    // stable, so the first report of a pair survives
    collisions.sort_by(|l, r| (&l.first, &l.second).cmp(&(&r.first, &r.second)));
    collisions.dedup_by(|later, earlier| {
        later.first == earlier.first && later.second == earlier.second
    });
    log::info!(
        "Found {} collisions among {} shapes",
        collisions.len(),
        tree.len()
    );
    collisions
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::io::Write;

    const SAMPLE: &str = r#"{
        "extent": { "center": {"x": 0, "y": 0}, "length": 100, "width": 100 },
        "detector": { "damping": 8.0 },
        "shapes": [
            { "name": "a", "shape": { "type": "circle", "center": {"x": 0, "y": 0}, "radius": 5 } },
            { "name": "b", "shape": { "type": "regular_polygon", "center": {"x": 1, "y": 1}, "sides": 4, "side_length": 2 } },
            { "name": "c", "shape": { "type": "rectangle", "center": {"x": 1, "y": 1}, "length": 2, "width": 4, "rotation": 30 } },
            { "name": "d", "shape": { "type": "triangle", "vertices": [{"x": 0, "y": 0}, {"x": 1, "y": 0}, {"x": 0, "y": 1}] } },
            { "name": "far", "shape": { "type": "circle", "center": {"x": 40, "y": 40}, "radius": 1 } }
        ]
    }"#;

    fn names(collisions: &[Collision]) -> Vec<(&str, &str)> {
        collisions
            .iter()
            .map(|c| (c.first.as_str(), c.second.as_str()))
            .collect()
    }

    #[test]
    fn test_parse_sample() {
        let scene: Scene = SAMPLE.parse().expect("valid scene");
        assert_eq!(5, scene.shapes.len());
        assert_abs_diff_eq!(scene.extent().width, 100.0);
        assert_abs_diff_eq!(scene.detector.damping, 8.0);
        assert_eq!(Some(2.0), scene.shapes[1].shape.side_length());
        assert_abs_diff_eq!(scene.shapes[2].shape.rotation(), 30.0);
        assert_abs_diff_eq!(scene.shapes[3].shape.rotation(), 0.0);
    }

    #[test]
    fn test_detect_sample() {
        let scene: Scene = SAMPLE.parse().expect("valid scene");
        let collisions = scene.detect(InsertionMode::Bulk).expect("indexable");
        assert_eq!(
            vec![
                ("a", "b"),
                ("a", "c"),
                ("a", "d"),
                ("b", "c"),
                ("b", "d"),
                ("c", "d")
            ],
            names(&collisions)
        );
        let sequential = scene.detect(InsertionMode::Sequential).expect("indexable");
        assert_eq!(names(&collisions), names(&sequential));
    }

    #[test]
    fn test_separation_follows_name_order() {
        let scene: Scene = r#"{ "shapes": [
            { "name": "z", "shape": { "type": "circle", "center": {"x": 3, "y": 0}, "radius": 2 } },
            { "name": "y", "shape": { "type": "circle", "center": {"x": 0, "y": 0}, "radius": 2 } }
        ] }"#
            .parse()
            .expect("valid scene");
        let collisions = scene.detect(InsertionMode::Sequential).expect("indexable");
        assert_eq!(vec![("y", "z")], names(&collisions));
        // circle pairs report the full vector from first to second
        assert_abs_diff_eq!(collisions[0].separation, Vector::new(3.0, 0.0));
    }

    #[test]
    fn test_derived_extent() {
        let scene: Scene = r#"{ "shapes": [
            { "name": "left", "shape": { "type": "rectangle", "center": {"x": -10, "y": 0}, "length": 2, "width": 2 } },
            { "name": "right", "shape": { "type": "rectangle", "center": {"x": 10, "y": 4}, "length": 2, "width": 2 } }
        ] }"#
            .parse()
            .expect("valid scene");
        let extent = scene.extent();
        assert_abs_diff_eq!(extent.leftmost(), -11.0);
        assert_abs_diff_eq!(extent.rightmost(), 11.0);
        assert_abs_diff_eq!(extent.topmost(), -1.0);
        assert_abs_diff_eq!(extent.bottommost(), 5.0);
        assert!(scene.detect(InsertionMode::Bulk).expect("indexable").is_empty());

        let empty: Scene = r#"{ "shapes": [] }"#.parse().expect("valid scene");
        assert_abs_diff_eq!(empty.extent().width, 0.0);
        assert!(empty.detect(InsertionMode::Bulk).expect("indexable").is_empty());
    }

    #[test]
    fn test_rejects_bad_scenes() {
        let duplicate = r#"{ "shapes": [
            { "name": "a", "shape": { "type": "circle", "center": {"x": 0, "y": 0}, "radius": 1 } },
            { "name": "a", "shape": { "type": "circle", "center": {"x": 5, "y": 0}, "radius": 1 } }
        ] }"#;
        assert!(matches!(
            duplicate.parse::<Scene>(),
            Err(SceneError::DuplicateName { name }) if name == "a"
        ));
        let two_sides = r#"{ "shapes": [
            { "name": "line", "shape": { "type": "regular_polygon", "center": {"x": 0, "y": 0}, "sides": 2, "side_length": 1 } }
        ] }"#;
        assert!(matches!(
            two_sides.parse::<Scene>(),
            Err(SceneError::InvalidShape { name, source: ShapeError::TooFewSides { sides: 2 } }) if name == "line"
        ));
        let huge = r#"{ "shapes": [
            { "name": "disc", "shape": { "type": "regular_polygon", "center": {"x": 0, "y": 0}, "sides": 1000000000000, "side_length": 1 } }
        ] }"#;
        assert!(matches!(
            huge.parse::<Scene>(),
            Err(SceneError::InvalidShape { source: ShapeError::TooManySides { .. }, .. })
        ));
        let negative = r#"{ "shapes": [
            { "name": "dot", "shape": { "type": "circle", "center": {"x": 0, "y": 0}, "radius": -1 } }
        ] }"#;
        assert!(matches!(
            negative.parse::<Scene>(),
            Err(SceneError::InvalidShape { .. })
        ));
        assert!(matches!(
            "{ \"shapes\": [ { \"name\": \"x\" } ] }".parse::<Scene>(),
            Err(SceneError::Parse { .. })
        ));
        let no_damping = r#"{ "detector": { "damping": 0 }, "shapes": [
            { "name": "a", "shape": { "type": "circle", "center": {"x": 0, "y": 0}, "radius": 2 } }
        ] }"#;
        assert!(matches!(
            no_damping.parse::<Scene>(),
            Err(SceneError::InvalidDamping { value }) if value == 0.0
        ));
        let negative_damping = r#"{ "detector": { "damping": -2.5 }, "shapes": [] }"#;
        assert!(matches!(
            negative_damping.parse::<Scene>(),
            Err(SceneError::InvalidDamping { .. })
        ));
    }

    #[test]
    fn test_set_damping() {
        let mut scene: Scene = SAMPLE.parse().expect("valid scene");
        for bad in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                scene.set_damping(bad),
                Err(SceneError::InvalidDamping { .. })
            ));
        }
        assert_abs_diff_eq!(scene.detector.damping, 8.0);
        scene.set_damping(2.0).expect("positive damping");
        assert_abs_diff_eq!(scene.detector().config().damping, 2.0);
        let collisions = scene.detect(InsertionMode::Bulk).expect("indexable");
        assert!(!collisions.is_empty());
        for collision in collisions.iter() {
            assert!(collision.separation.x.is_finite() && collision.separation.y.is_finite());
        }
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temporary file");
        file.write_all(SAMPLE.as_bytes()).expect("write scene");
        let scene = Scene::from_file(file.path()).expect("valid scene");
        assert_eq!(5, scene.shapes.len());

        let missing = file.path().with_extension("missing");
        assert!(matches!(
            Scene::from_file(&missing),
            Err(SceneError::Io { path, .. }) if path == missing
        ));
    }

    #[test]
    fn test_stats_of_built_tree() {
        let scene: Scene = SAMPLE.parse().expect("valid scene");
        let tree = scene.build_tree(InsertionMode::Bulk).expect("indexable");
        tree.assert_invariants();
        let stats = tree.stats();
        assert_eq!(5, stats.shapes);
        assert!(stats.depth >= 2);
    }
}
