//! Formation geometry: planar vertex sets that drones occupy during a stage.

use serde::{Deserialize, Serialize};

/// A position in the shared horizontal frame, in meters
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Point2D {
    pub const ORIGIN: Point2D = Point2D { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Lift the point to the given altitude
    pub fn at_altitude(self, z: f64) -> Point3D {
        Point3D::new(self.x, self.y, z)
    }
}

impl From<[f64; 2]> for Point2D {
    fn from([x, y]: [f64; 2]) -> Self {
        Self { x, y }
    }
}

impl From<Point2D> for [f64; 2] {
    fn from(p: Point2D) -> Self {
        [p.x, p.y]
    }
}

/// A waypoint: horizontal position plus altitude, in meters
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point3D {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point3D {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Horizontal projection
    pub fn xy(&self) -> Point2D {
        Point2D::new(self.x, self.y)
    }

    pub fn distance_to(&self, other: &Point3D) -> f64 {
        let (dx, dy, dz) = (other.x - self.x, other.y - self.y, other.z - self.z);
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

/// Three ordered vertices. The order defines how agents rotate through them.
pub type Formation = [Point2D; 3];

/// Isosceles triangle of the given base and height, rotated about its own
/// frame by `orientation_deg` and translated by `center`.
pub fn triangle_formation(base: f64, height: f64, orientation_deg: f64, center: Point2D) -> Formation {
    let (sin, cos) = orientation_deg.to_radians().sin_cos();
    let (b, h) = (base, height);
    [
        Point2D::new(
            -h * cos / 2.0 - b * sin / 2.0 + center.x,
            b * cos / 2.0 - h * sin / 2.0 + center.y,
        ),
        Point2D::new(h * cos / 2.0 + center.x, h * sin / 2.0 + center.y),
        Point2D::new(
            -h * cos / 2.0 + b * sin / 2.0 + center.x,
            -b * cos / 2.0 - h * sin / 2.0 + center.y,
        ),
    ]
}

/// Three colinear points spaced `length / 2` apart along the rotated axis,
/// ordered `+length/2`, `0`, `-length/2`.
pub fn line_formation(length: f64, orientation_deg: f64, center: Point2D) -> Formation {
    let (sin, cos) = orientation_deg.to_radians().sin_cos();
    let half = length / 2.0;
    [
        Point2D::new(half * cos + center.x, half * sin + center.y),
        center,
        Point2D::new(-half * cos + center.x, -half * sin + center.y),
    ]
}

/// A formation described by its shape parameters, as it appears in config
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FormationSpec {
    Triangle {
        base: f64,
        height: f64,
        #[serde(default)]
        orientation: f64,
        #[serde(default)]
        center: Point2D,
    },
    Line {
        length: f64,
        #[serde(default)]
        orientation: f64,
        #[serde(default)]
        center: Point2D,
    },
}

impl FormationSpec {
    pub fn vertices(&self) -> Formation {
        match *self {
            FormationSpec::Triangle {
                base,
                height,
                orientation,
                center,
            } => triangle_formation(base, height, orientation, center),
            FormationSpec::Line {
                length,
                orientation,
                center,
            } => line_formation(length, orientation, center),
        }
    }
}
