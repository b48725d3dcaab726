//! Planner configuration
//!
//! Every section falls back to its defaults, so a YAML file only needs the
//! values that differ:
//!
//! ```yaml
//! road:
//!   max_s: 6945.554
//! behavior:
//!   speed_limit: 45.0
//! frenet:
//!   lateral_sign:
//!     mode: cross_product
//! ```

use std::fs;
use std::path::Path;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::behavior::BehaviorConfig;
use crate::common::{PlannerError, PlannerResult};
use crate::map::{FrenetConfig, RoadConfig};
use crate::trajectory::TrajectoryConfig;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    pub road: RoadConfig,
    pub behavior: BehaviorConfig,
    pub trajectory: TrajectoryConfig,
    pub frenet: FrenetConfig,
}

impl PlannerConfig {
    pub fn from_yaml_str(yaml: &str) -> PlannerResult<Self> {
        let config: PlannerConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> PlannerResult<Self> {
        let text = fs::read_to_string(path)?;
        PlannerConfig::from_yaml_str(&text)
    }

    pub fn validate(&self) -> PlannerResult<()> {
        let road = &self.road;
        if !(road.lane_width > 0.0) {
            return Err(PlannerError::invalid_parameter("road.lane_width must be positive"));
        }
        if road.num_lanes == 0 {
            return Err(PlannerError::invalid_parameter("road.num_lanes must be at least 1"));
        }
        if !(road.max_s > 0.0) {
            return Err(PlannerError::invalid_parameter("road.max_s must be positive"));
        }

        let behavior = &self.behavior;
        if !(behavior.speed_limit > 0.0) || !(behavior.speed_step > 0.0) {
            return Err(PlannerError::invalid_parameter(
                "behavior.speed_limit and behavior.speed_step must be positive",
            ));
        }
        if behavior.following_distance < 0.0
            || behavior.rear_gap_threshold < 0.0
            || behavior.front_gap_threshold < 0.0
        {
            return Err(PlannerError::invalid_parameter("behavior distances must not be negative"));
        }

        let trajectory = &self.trajectory;
        if trajectory.horizon == 0 {
            return Err(PlannerError::invalid_parameter("trajectory.horizon must be at least 1"));
        }
        if !(trajectory.tick_duration > 0.0)
            || !(trajectory.look_ahead > 0.0)
            || !(trajectory.speed_conversion > 0.0)
        {
            return Err(PlannerError::invalid_parameter(
                "trajectory.tick_duration, look_ahead and speed_conversion must be positive",
            ));
        }
        let offsets = &trajectory.anchor_offsets;
        if offsets.is_empty()
            || offsets[0] <= 0.0
            || !offsets.iter().tuple_windows().all(|(a, b)| b > a)
        {
            return Err(PlannerError::invalid_parameter(
                "trajectory.anchor_offsets must be positive and strictly increasing",
            ));
        }
        Ok(())
    }
}
