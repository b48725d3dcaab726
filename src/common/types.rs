//! Common types used throughout highway_planner

use nalgebra::{Rotation2, Vector2};
use serde::{Deserialize, Serialize};

/// Segments shorter than this carry no usable heading [m]
pub const DEGENERATE_SEGMENT_LENGTH: f64 = 1e-9;

/// 2D point representation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Point2D {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point2D) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    /// Bearing from this point towards `other` [rad]
    pub fn bearing_to(&self, other: &Point2D) -> f64 {
        (other.y - self.y).atan2(other.x - self.x)
    }

    pub fn to_vector(&self) -> Vector2<f64> {
        Vector2::new(self.x, self.y)
    }
}

impl From<(f64, f64)> for Point2D {
    fn from(tuple: (f64, f64)) -> Self {
        Self { x: tuple.0, y: tuple.1 }
    }
}

impl From<Vector2<f64>> for Point2D {
    fn from(v: Vector2<f64>) -> Self {
        Self { x: v[0], y: v[1] }
    }
}

/// 2D pose (position + orientation)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose2D {
    pub x: f64,
    pub y: f64,
    pub yaw: f64,
}

impl Pose2D {
    pub fn new(x: f64, y: f64, yaw: f64) -> Self {
        Self { x, y, yaw }
    }

    pub fn position(&self) -> Point2D {
        Point2D::new(self.x, self.y)
    }

    /// Express a global point in the frame attached to this pose
    pub fn to_local(&self, p: &Point2D) -> Point2D {
        let shifted = p.to_vector() - self.position().to_vector();
        (Rotation2::new(-self.yaw) * shifted).into()
    }

    /// Inverse of [`Pose2D::to_local`]
    pub fn to_global(&self, p: &Point2D) -> Point2D {
        let rotated = Rotation2::new(self.yaw) * p.to_vector();
        (rotated + self.position().to_vector()).into()
    }
}

/// Frenet coordinates: arc length along the centerline and signed lateral offset
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrenetPoint {
    pub s: f64,
    pub d: f64,
}

impl FrenetPoint {
    pub fn new(s: f64, d: f64) -> Self {
        Self { s, d }
    }
}

/// Ego vehicle state for the current tick. `yaw` is in radians.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EgoState {
    pub x: f64,
    pub y: f64,
    pub yaw: f64,
    pub speed: f64,
    pub s: f64,
    pub d: f64,
}

impl EgoState {
    pub fn new(x: f64, y: f64, yaw: f64, speed: f64, s: f64, d: f64) -> Self {
        Self { x, y, yaw, speed, s, d }
    }

    pub fn pose(&self) -> Pose2D {
        Pose2D::new(self.x, self.y, self.yaw)
    }

    pub fn position(&self) -> Point2D {
        Point2D::new(self.x, self.y)
    }
}

/// Instantaneous state of a neighboring vehicle as reported by sensor fusion
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackedVehicle {
    pub id: i64,
    pub x: f64,
    pub y: f64,
    pub vx: f64,
    pub vy: f64,
    pub s: f64,
    pub d: f64,
}

impl TrackedVehicle {
    pub fn speed(&self) -> f64 {
        (self.vx.powi(2) + self.vy.powi(2)).sqrt()
    }

    /// Constant-velocity projection of `s` over `dt` seconds
    pub fn projected_s(&self, dt: f64) -> f64 {
        self.s + dt * self.speed()
    }
}

/// Fixed-cadence sequence of points, one per control tick
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Trajectory {
    pub points: Vec<Point2D>,
}

impl Trajectory {
    pub fn new() -> Self {
        Self { points: Vec::new() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self { points: Vec::with_capacity(capacity) }
    }

    pub fn from_points(points: Vec<Point2D>) -> Self {
        Self { points }
    }

    pub fn from_xy(x: &[f64], y: &[f64]) -> Self {
        let points = x.iter().zip(y.iter())
            .map(|(&x, &y)| Point2D::new(x, y))
            .collect();
        Self { points }
    }

    pub fn push(&mut self, point: Point2D) {
        self.points.push(point);
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn last(&self) -> Option<&Point2D> {
        self.points.last()
    }

    /// Heading of the final segment, if the last two points are distinct
    pub fn end_heading(&self) -> Option<f64> {
        let n = self.points.len();
        if n < 2 {
            return None;
        }
        let (prev, last) = (self.points[n - 2], self.points[n - 1]);
        if prev.distance(&last) < DEGENERATE_SEGMENT_LENGTH {
            return None;
        }
        Some(prev.bearing_to(&last))
    }

    pub fn x_coords(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.x).collect()
    }

    pub fn y_coords(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.y).collect()
    }

    pub fn total_length(&self) -> f64 {
        if self.points.len() < 2 {
            return 0.0;
        }
        self.points.windows(2)
            .map(|w| w[0].distance(&w[1]))
            .sum()
    }
}
