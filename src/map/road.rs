//! Lane geometry of the track cross-section

use serde::{Deserialize, Serialize};

/// Static road layout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoadConfig {
    /// Lane width [m]
    pub lane_width: f64,
    /// Number of lanes, counted from the centerline outward
    pub num_lanes: usize,
    /// Total track length before s wraps to 0 [m]
    pub max_s: f64,
}

impl Default for RoadConfig {
    fn default() -> Self {
        Self {
            lane_width: 4.0,
            num_lanes: 3,
            max_s: 6945.554,
        }
    }
}

impl RoadConfig {
    /// Lateral offset of a lane's centerline
    pub fn lane_center(&self, lane: usize) -> f64 {
        self.lane_width / 2.0 + self.lane_width * lane as f64
    }

    /// Half-open membership band `[center - w/2, center + w/2)`
    pub fn in_lane(&self, d: f64, lane: usize) -> bool {
        let center = self.lane_center(lane);
        let half = self.lane_width / 2.0;
        d >= center - half && d < center + half
    }

    /// Lane containing the lateral offset, if any
    pub fn lane_of(&self, d: f64) -> Option<usize> {
        (0..self.num_lanes).find(|&lane| self.in_lane(d, lane))
    }

    pub fn is_valid_lane(&self, lane: usize) -> bool {
        lane < self.num_lanes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lane_centers() {
        let road = RoadConfig::default();
        assert_eq!(road.lane_center(0), 2.0);
        assert_eq!(road.lane_center(1), 6.0);
        assert_eq!(road.lane_center(2), 10.0);
    }

    #[test]
    fn test_lane_band_is_half_open() {
        let road = RoadConfig::default();
        assert!(road.in_lane(0.0, 0));
        assert!(!road.in_lane(4.0, 0));
        assert!(road.in_lane(4.0, 1));
        assert_eq!(road.lane_of(7.9), Some(1));
        assert_eq!(road.lane_of(8.0), Some(2));
        assert_eq!(road.lane_of(12.0), None);
        assert_eq!(road.lane_of(-0.5), None);
    }
}
