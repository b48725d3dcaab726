//! Common traits defining the seams between planning layers

use crate::behavior::LaneGapReport;

/// Decides which lane the ego vehicle should occupy next.
///
/// Implementations see only the current lane and the adjacent-lane gap report,
/// so richer behavior planners can replace the greedy rule without touching
/// trajectory synthesis.
pub trait LaneSelector {
    /// Return the target lane; must lie in `[0, num_lanes - 1]`
    fn select_lane(&self, current_lane: usize, gaps: &LaneGapReport) -> usize;

    /// Number of lanes this selector plans over
    fn num_lanes(&self) -> usize;
}

#[cfg(test)]
mod tests {
    use super::*;

    // Test that the trait is object safe and usable behind a box
    struct KeepLane;

    impl LaneSelector for KeepLane {
        fn select_lane(&self, current_lane: usize, _gaps: &LaneGapReport) -> usize {
            current_lane
        }

        fn num_lanes(&self) -> usize {
            3
        }
    }

    #[test]
    fn test_lane_selector_trait_object() {
        let selector: Box<dyn LaneSelector> = Box::new(KeepLane);
        assert_eq!(selector.select_lane(2, &LaneGapReport::default()), 2);
        assert_eq!(selector.num_lanes(), 3);
    }
}
