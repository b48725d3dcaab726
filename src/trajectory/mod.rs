//! Trajectory synthesis

pub mod cubic_spline;
pub mod generator;

pub use cubic_spline::CubicSpline;
pub use generator::{PlanSource, TrajectoryConfig, TrajectoryGenerator, TrajectoryPlan};
