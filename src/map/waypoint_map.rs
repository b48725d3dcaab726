//! Immutable cyclic waypoint table describing the track centerline

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use itertools::Itertools;
use tracing::info;

use crate::common::{PlannerError, PlannerResult, Point2D};

/// Single centerline sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Waypoint {
    pub x: f64,
    pub y: f64,
    /// Cumulative arc length from the track start [m]
    pub s: f64,
    /// Unit normal pointing to increasing d
    pub dx: f64,
    pub dy: f64,
}

impl Waypoint {
    pub fn new(x: f64, y: f64, s: f64, dx: f64, dy: f64) -> Self {
        Waypoint { x, y, s, dx, dy }
    }

    pub fn position(&self) -> Point2D {
        Point2D::new(self.x, self.y)
    }

    /// Point at lateral offset `d` along this waypoint's normal
    pub fn offset(&self, d: f64) -> Point2D {
        Point2D::new(self.x + d * self.dx, self.y + d * self.dy)
    }
}

/// Ordered, cyclic sequence of waypoints. Built once, read-only afterwards.
#[derive(Debug, Clone)]
pub struct WaypointMap {
    waypoints: Vec<Waypoint>,
    /// Euclidean length of the polyline from waypoint 0 up to waypoint i
    cumulative: Vec<f64>,
    max_s: f64,
}

impl WaypointMap {
    pub fn new(waypoints: Vec<Waypoint>, max_s: f64) -> PlannerResult<Self> {
        if waypoints.len() < 2 {
            return Err(PlannerError::invalid_map(format!(
                "need at least 2 waypoints, got {}",
                waypoints.len()
            )));
        }
        if let Some(i) = waypoints.iter().position(|wp| {
            !(wp.x.is_finite() && wp.y.is_finite() && wp.s.is_finite())
        }) {
            return Err(PlannerError::invalid_map(format!("waypoint {} is not finite", i)));
        }
        if let Some((i, _)) = waypoints
            .iter()
            .tuple_windows()
            .enumerate()
            .find(|(_, (a, b))| b.s <= a.s)
        {
            return Err(PlannerError::invalid_map(format!(
                "s must be strictly increasing (waypoint {} -> {})",
                i,
                i + 1
            )));
        }
        let last_s = waypoints[waypoints.len() - 1].s;
        if !(max_s > last_s) {
            return Err(PlannerError::invalid_map(format!(
                "max_s {} must exceed the last waypoint s {}",
                max_s, last_s
            )));
        }

        let cumulative = std::iter::once(0.0)
            .chain(waypoints.iter().tuple_windows().scan(0.0, |acc, (a, b)| {
                *acc += a.position().distance(&b.position());
                Some(*acc)
            }))
            .collect();

        Ok(WaypointMap { waypoints, cumulative, max_s })
    }

    /// Parse a whitespace separated `x y s dx dy` table, one waypoint per line
    pub fn from_reader<R: BufRead>(reader: R, max_s: f64) -> PlannerResult<Self> {
        let mut waypoints = Vec::new();
        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let values: Vec<f64> = trimmed
                .split_whitespace()
                .take(5)
                .map(|tok| {
                    tok.parse::<f64>().map_err(|e| PlannerError::MapParse {
                        line: idx + 1,
                        reason: format!("'{}': {}", tok, e),
                    })
                })
                .collect::<PlannerResult<_>>()?;
            if values.len() < 5 {
                return Err(PlannerError::MapParse {
                    line: idx + 1,
                    reason: format!("expected 5 columns, found {}", values.len()),
                });
            }
            waypoints.push(Waypoint::new(values[0], values[1], values[2], values[3], values[4]));
        }
        WaypointMap::new(waypoints, max_s)
    }

    pub fn from_file<P: AsRef<Path>>(path: P, max_s: f64) -> PlannerResult<Self> {
        let file = File::open(path.as_ref())?;
        let map = WaypointMap::from_reader(BufReader::new(file), max_s)?;
        info!(
            "loaded {} waypoints from {} (max_s = {:.3})",
            map.len(),
            path.as_ref().display(),
            max_s
        );
        Ok(map)
    }

    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    /// Always false: construction rejects maps with fewer than two waypoints
    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    pub fn waypoints(&self) -> &[Waypoint] {
        &self.waypoints
    }

    pub fn get(&self, index: usize) -> &Waypoint {
        &self.waypoints[index]
    }

    pub fn position(&self, index: usize) -> Point2D {
        self.waypoints[index].position()
    }

    pub fn max_s(&self) -> f64 {
        self.max_s
    }

    /// Polyline length from waypoint 0 to `index`
    pub fn cumulative_length(&self, index: usize) -> f64 {
        self.cumulative[index]
    }

    pub fn next_index(&self, index: usize) -> usize {
        (index + 1) % self.waypoints.len()
    }

    pub fn prev_index(&self, index: usize) -> usize {
        if index == 0 {
            self.waypoints.len() - 1
        } else {
            index - 1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn straight_map() -> WaypointMap {
        let wps = vec![
            Waypoint::new(0.0, 0.0, 0.0, 0.0, 0.0),
            Waypoint::new(10.0, 0.0, 10.0, 0.0, 0.0),
            Waypoint::new(20.0, 0.0, 20.0, 0.0, 0.0),
        ];
        WaypointMap::new(wps, 30.0).unwrap()
    }

    #[test]
    fn test_empty_and_single_point_maps_are_rejected() {
        assert!(matches!(WaypointMap::new(vec![], 10.0), Err(PlannerError::InvalidMap(_))));
        let single = vec![Waypoint::new(0.0, 0.0, 0.0, 0.0, -1.0)];
        assert!(matches!(WaypointMap::new(single, 10.0), Err(PlannerError::InvalidMap(_))));
    }

    #[test]
    fn test_non_increasing_s_is_rejected() {
        let wps = vec![
            Waypoint::new(0.0, 0.0, 0.0, 0.0, 0.0),
            Waypoint::new(10.0, 0.0, 10.0, 0.0, 0.0),
            Waypoint::new(20.0, 0.0, 10.0, 0.0, 0.0),
        ];
        assert!(WaypointMap::new(wps, 30.0).is_err());
    }

    #[test]
    fn test_max_s_must_exceed_last_waypoint() {
        let wps = vec![
            Waypoint::new(0.0, 0.0, 0.0, 0.0, 0.0),
            Waypoint::new(10.0, 0.0, 10.0, 0.0, 0.0),
        ];
        assert!(WaypointMap::new(wps, 10.0).is_err());
    }

    #[test]
    fn test_cyclic_indices() {
        let map = straight_map();
        assert_eq!(map.next_index(2), 0);
        assert_eq!(map.prev_index(0), 2);
        assert_eq!(map.next_index(0), 1);
        assert_abs_diff_eq!(map.cumulative_length(2), 20.0, epsilon = 1e-12);
    }

    #[test]
    fn test_from_reader_parses_table() {
        let table = "784.6001 1135.571 0 -0.02359831 -0.9997216\n\
                     \n\
                     815.2679 1134.93 30.6744785308838 -0.01099479 -0.9999396\n";
        let map = WaypointMap::from_reader(table.as_bytes(), 6945.554).unwrap();
        assert_eq!(map.len(), 2);
        assert_abs_diff_eq!(map.get(1).s, 30.6744785308838, epsilon = 1e-9);
        assert_abs_diff_eq!(map.get(0).dy, -0.9997216, epsilon = 1e-9);
    }

    #[test]
    fn test_from_reader_reports_line_number() {
        let table = "0 0 0 0 -1\n10 0 10 0\n";
        match WaypointMap::from_reader(table.as_bytes(), 100.0) {
            Err(PlannerError::MapParse { line, .. }) => assert_eq!(line, 2),
            other => panic!("unexpected result: {:?}", other),
        }

        let table = "0 0 zero 0 -1\n";
        assert!(matches!(
            WaypointMap::from_reader(table.as_bytes(), 100.0),
            Err(PlannerError::MapParse { line: 1, .. })
        ));
    }

    #[test]
    fn test_waypoint_offset_follows_normal() {
        let wp = Waypoint::new(1.0, 2.0, 0.0, 0.0, -1.0);
        let p = wp.offset(6.0);
        assert_abs_diff_eq!(p.x, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(p.y, -4.0, epsilon = 1e-12);
    }
}
