//! Behavior layer: traffic gaps and lane selection

pub mod planner;
pub mod lane_selector;

pub use planner::{BehaviorConfig, BehaviorDecision, BehaviorPlanner, LaneGapReport, NO_VEHICLE_GAP};
pub use lane_selector::{choose_lane, GreedyLaneSelector};
