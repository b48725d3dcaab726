//! highway_planner - motion planning core for highway driving
//!
//! This crate converts between Cartesian and Frenet coordinates on a closed
//! waypoint track, picks a lane from the surrounding traffic and synthesizes
//! smooth fixed-cadence trajectories that continue the previous plan.

// Core modules
pub mod common;
pub mod config;
pub mod utils;

// Planning layers
pub mod map;
pub mod behavior;
pub mod trajectory;
pub mod planner;

// Collaborator surfaces
pub mod telemetry;
pub mod simulation;

// Re-export common types for convenience
pub use common::{EgoState, FrenetPoint, Point2D, Pose2D, TrackedVehicle, Trajectory};
pub use common::LaneSelector;
pub use common::{PlannerError, PlannerResult};
pub use config::PlannerConfig;
pub use planner::{HighwayPlanner, PlannerState, TickInput, TickOutput};
