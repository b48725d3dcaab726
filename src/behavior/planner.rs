//! Gap analysis around the ego vehicle
//!
//! Every tracked vehicle is projected forward with constant speed to the
//! moment the ego vehicle reaches the end of its reused path prefix, then
//! bucketed into the ego lane or one of the adjacent lanes.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::common::TrackedVehicle;
use crate::map::RoadConfig;

/// Gap reported when no vehicle is found in a bucket [m]
pub const NO_VEHICLE_GAP: f64 = 1000.0;

/// Behavior thresholds and speed limits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BehaviorConfig {
    /// Same-lane vehicle closer than this ahead triggers slow down [m]
    pub following_distance: f64,
    /// Minimum clearance behind ego in the target lane [m]
    pub rear_gap_threshold: f64,
    /// Minimum clearance ahead of ego in the target lane [m]
    pub front_gap_threshold: f64,
    /// Reference speed ceiling [mph]
    pub speed_limit: f64,
    /// Reference speed change per tick [mph]
    pub speed_step: f64,
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            following_distance: 30.0,
            rear_gap_threshold: 5.0,
            front_gap_threshold: 35.0,
            speed_limit: 49.5,
            speed_step: 0.224,
        }
    }
}

/// Nearest front/rear gaps in the lanes left and right of ego
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LaneGapReport {
    pub front_left: f64,
    pub rear_left: f64,
    pub front_right: f64,
    pub rear_right: f64,
}

impl Default for LaneGapReport {
    fn default() -> Self {
        LaneGapReport {
            front_left: NO_VEHICLE_GAP,
            rear_left: NO_VEHICLE_GAP,
            front_right: NO_VEHICLE_GAP,
            rear_right: NO_VEHICLE_GAP,
        }
    }
}

impl LaneGapReport {
    pub fn new(front_left: f64, rear_left: f64, front_right: f64, rear_right: f64) -> Self {
        LaneGapReport { front_left, rear_left, front_right, rear_right }
    }
}

/// Outcome of one behavior assessment
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BehaviorDecision {
    pub gaps: LaneGapReport,
    /// A vehicle in the ego lane is ahead within the following distance
    pub too_close: bool,
    /// A lane change should be attempted this tick
    pub want_lane_change: bool,
    /// Nearest projected vehicle ahead in the ego lane
    pub front_gap: f64,
}

/// Keeps the smaller of the existing and the new gap, split by sign
fn record_gap(front: &mut f64, rear: &mut f64, gap: f64) {
    if gap > 0.0 {
        *front = front.min(gap);
    } else if gap < 0.0 {
        *rear = rear.min(-gap);
    }
}

#[derive(Debug, Clone)]
pub struct BehaviorPlanner {
    road: RoadConfig,
    config: BehaviorConfig,
    tick_duration: f64,
}

impl BehaviorPlanner {
    pub fn new(road: RoadConfig, config: BehaviorConfig, tick_duration: f64) -> Self {
        BehaviorPlanner { road, config, tick_duration }
    }

    pub fn config(&self) -> &BehaviorConfig {
        &self.config
    }

    /// Assess the traffic around `lane` at arc length `ego_s`.
    /// `unconsumed` is the number of previous-path points still ahead of the vehicle.
    pub fn assess(
        &self,
        lane: usize,
        ego_s: f64,
        vehicles: &[TrackedVehicle],
        unconsumed: usize,
    ) -> BehaviorDecision {
        let horizon = unconsumed as f64 * self.tick_duration;
        let left = lane.checked_sub(1);
        let right = Some(lane + 1).filter(|&l| self.road.is_valid_lane(l));

        let mut gaps = LaneGapReport::default();
        let mut front_gap = NO_VEHICLE_GAP;
        let mut too_close = false;

        for vehicle in vehicles {
            let gap = vehicle.projected_s(horizon) - ego_s;

            if let Some(l) = left {
                if self.road.in_lane(vehicle.d, l) {
                    record_gap(&mut gaps.front_left, &mut gaps.rear_left, gap);
                }
            }
            if let Some(r) = right {
                if self.road.in_lane(vehicle.d, r) {
                    record_gap(&mut gaps.front_right, &mut gaps.rear_right, gap);
                }
            }
            if self.road.in_lane(vehicle.d, lane) && gap > 0.0 {
                front_gap = front_gap.min(gap);
                if gap < self.config.following_distance {
                    too_close = true;
                }
            }
        }

        if too_close {
            debug!("vehicle {:.1} m ahead in lane {}, looking for a gap", front_gap, lane);
        }

        BehaviorDecision {
            gaps,
            too_close,
            want_lane_change: too_close,
            front_gap,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use proptest::prelude::*;

    fn vehicle(id: i64, s: f64, d: f64, speed: f64) -> TrackedVehicle {
        TrackedVehicle { id, x: 0.0, y: 0.0, vx: speed, vy: 0.0, s, d }
    }

    fn planner() -> BehaviorPlanner {
        BehaviorPlanner::new(RoadConfig::default(), BehaviorConfig::default(), 0.02)
    }

    #[test]
    fn test_empty_road_reports_sentinels() {
        let decision = planner().assess(1, 100.0, &[], 0);
        assert_eq!(decision.gaps, LaneGapReport::default());
        assert!(!decision.too_close);
        assert!(!decision.want_lane_change);
    }

    #[test]
    fn test_gaps_in_adjacent_lanes() {
        let cars = vec![
            vehicle(0, 150.0, 2.0, 0.0),  // left, ahead
            vehicle(1, 120.0, 1.5, 0.0),  // left, nearer ahead
            vehicle(2, 90.0, 3.0, 0.0),   // left, behind
            vehicle(3, 140.0, 10.0, 0.0), // right, ahead
            vehicle(4, 70.0, 9.0, 0.0),   // right, behind
        ];
        let decision = planner().assess(1, 100.0, &cars, 0);
        assert_abs_diff_eq!(decision.gaps.front_left, 20.0, epsilon = 1e-12);
        assert_abs_diff_eq!(decision.gaps.rear_left, 10.0, epsilon = 1e-12);
        assert_abs_diff_eq!(decision.gaps.front_right, 40.0, epsilon = 1e-12);
        assert_abs_diff_eq!(decision.gaps.rear_right, 30.0, epsilon = 1e-12);
        assert!(!decision.too_close);
    }

    #[test]
    fn test_edge_lane_reports_one_side() {
        let cars = vec![vehicle(0, 120.0, 6.0, 0.0), vehicle(1, 120.0, 10.0, 0.0)];
        let decision = planner().assess(0, 100.0, &cars, 0);
        assert_eq!(decision.gaps.front_left, NO_VEHICLE_GAP);
        assert_abs_diff_eq!(decision.gaps.front_right, 20.0, epsilon = 1e-12);
    }

    #[test]
    fn test_too_close_uses_projected_position() {
        // 40 m ahead and stationary: outside the following distance
        let far = vec![vehicle(0, 140.0, 6.0, 0.0)];
        assert!(!planner().assess(1, 100.0, &far, 0).too_close);

        // behind ego now, projected 10 m ahead after 45 points at 25 m/s
        let overtaking = vec![vehicle(0, 87.5, 6.0, 25.0)];
        let decision = planner().assess(1, 100.0, &overtaking, 45);
        assert!(decision.too_close);
        assert!(decision.want_lane_change);
        assert_abs_diff_eq!(decision.front_gap, 10.0, epsilon = 1e-9);
    }

    #[test]
    fn test_vehicle_at_same_s_is_neither_front_nor_rear() {
        let cars = vec![vehicle(0, 100.0, 2.0, 0.0), vehicle(1, 100.0, 6.0, 0.0)];
        let decision = planner().assess(1, 100.0, &cars, 0);
        assert_eq!(decision.gaps, LaneGapReport::default());
        assert!(!decision.too_close);
    }

    proptest! {
        #[test]
        fn prop_too_close_iff_same_lane_vehicle_within_following_distance(
            s in 0.0f64..200.0,
            d in 0.0f64..12.0,
            speed in 0.0f64..30.0,
            unconsumed in 0usize..50,
        ) {
            let car = vehicle(7, s, d, speed);
            let decision = planner().assess(1, 100.0, &[car], unconsumed);
            let gap = car.projected_s(unconsumed as f64 * 0.02) - 100.0;
            let expected = (4.0..8.0).contains(&d) && gap > 0.0 && gap < 30.0;
            prop_assert_eq!(decision.too_close, expected);
            prop_assert_eq!(decision.want_lane_change, decision.too_close);
        }
    }
}
