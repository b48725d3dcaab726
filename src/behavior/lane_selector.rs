//! Greedy threshold rule for picking the target lane

use crate::behavior::{BehaviorConfig, LaneGapReport};
use crate::common::LaneSelector;

/// One-shot lane choice: move to an adjacent lane whose rear and front gaps
/// both clear their thresholds. From an interior lane with both sides clear,
/// the side with the strictly larger front gap wins (ties go right).
#[derive(Debug, Clone, PartialEq)]
pub struct GreedyLaneSelector {
    num_lanes: usize,
    rear_gap_threshold: f64,
    front_gap_threshold: f64,
}

impl Default for GreedyLaneSelector {
    fn default() -> Self {
        GreedyLaneSelector::new(3, &BehaviorConfig::default())
    }
}

impl GreedyLaneSelector {
    pub fn new(num_lanes: usize, config: &BehaviorConfig) -> Self {
        GreedyLaneSelector {
            num_lanes,
            rear_gap_threshold: config.rear_gap_threshold,
            front_gap_threshold: config.front_gap_threshold,
        }
    }

    fn clear(&self, rear: f64, front: f64) -> bool {
        rear > self.rear_gap_threshold && front > self.front_gap_threshold
    }
}

impl LaneSelector for GreedyLaneSelector {
    fn select_lane(&self, current_lane: usize, gaps: &LaneGapReport) -> usize {
        if self.num_lanes < 2 || current_lane >= self.num_lanes {
            return current_lane;
        }
        let last = self.num_lanes - 1;
        let left_clear = self.clear(gaps.rear_left, gaps.front_left);
        let right_clear = self.clear(gaps.rear_right, gaps.front_right);

        if current_lane == 0 {
            if right_clear { 1 } else { 0 }
        } else if current_lane == last {
            if left_clear { current_lane - 1 } else { current_lane }
        } else if left_clear && right_clear {
            if gaps.front_left > gaps.front_right {
                current_lane - 1
            } else {
                current_lane + 1
            }
        } else if left_clear {
            current_lane - 1
        } else if right_clear {
            current_lane + 1
        } else {
            current_lane
        }
    }

    fn num_lanes(&self) -> usize {
        self.num_lanes
    }
}

/// Lane choice on the default three-lane road
pub fn choose_lane(current_lane: usize, gaps: &LaneGapReport) -> usize {
    GreedyLaneSelector::default().select_lane(current_lane, gaps)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_middle_lane_prefers_only_clear_side() {
        // left: rear 10 > 5, front 40 > 35; right: front 20 < 35
        let gaps = LaneGapReport::new(40.0, 10.0, 20.0, 10.0);
        assert_eq!(choose_lane(1, &gaps), 0);
    }

    #[test]
    fn test_middle_lane_both_clear_picks_larger_front_gap() {
        let gaps = LaneGapReport::new(50.0, 10.0, 80.0, 10.0);
        assert_eq!(choose_lane(1, &gaps), 2);
        let gaps = LaneGapReport::new(90.0, 10.0, 80.0, 10.0);
        assert_eq!(choose_lane(1, &gaps), 0);
        // equal front gaps go right
        let gaps = LaneGapReport::new(80.0, 10.0, 80.0, 10.0);
        assert_eq!(choose_lane(1, &gaps), 2);
    }

    #[test]
    fn test_edge_lanes() {
        let open = LaneGapReport::default();
        assert_eq!(choose_lane(0, &open), 1);
        assert_eq!(choose_lane(2, &open), 1);

        let blocked_rear = LaneGapReport::new(100.0, 4.0, 100.0, 4.0);
        assert_eq!(choose_lane(0, &blocked_rear), 0);
        assert_eq!(choose_lane(2, &blocked_rear), 2);
    }

    #[test]
    fn test_thresholds_are_strict() {
        let gaps = LaneGapReport::new(35.0, 5.0, 35.0, 5.0);
        assert_eq!(choose_lane(1, &gaps), 1);
    }

    #[test]
    fn test_wider_road_interior_lanes() {
        let selector = GreedyLaneSelector::new(5, &BehaviorConfig::default());
        let gaps = LaneGapReport::new(10.0, 10.0, 60.0, 10.0);
        assert_eq!(selector.select_lane(3, &gaps), 4);
        assert_eq!(selector.select_lane(4, &LaneGapReport::default()), 3);
    }

    #[test]
    fn test_single_lane_never_moves() {
        let selector = GreedyLaneSelector::new(1, &BehaviorConfig::default());
        assert_eq!(selector.select_lane(0, &LaneGapReport::default()), 0);
    }

    proptest! {
        #[test]
        fn prop_selected_lane_in_range(
            num_lanes in 1usize..6,
            lane_seed in 0usize..6,
            fl in 0.0f64..1000.0,
            rl in 0.0f64..1000.0,
            fr in 0.0f64..1000.0,
            rr in 0.0f64..1000.0,
        ) {
            let lane = lane_seed % num_lanes;
            let selector = GreedyLaneSelector::new(num_lanes, &BehaviorConfig::default());
            let next = selector.select_lane(lane, &LaneGapReport::new(fl, rl, fr, rr));
            prop_assert!(next < num_lanes);
            prop_assert!((next as i64 - lane as i64).abs() <= 1);
        }
    }
}
