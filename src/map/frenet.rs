//! Cartesian <-> Frenet coordinate transforms over a [`WaypointMap`]
//!
//! `s` is arc length along the waypoint polyline, `d` the signed lateral
//! offset. Positive `d` lies to the right of the direction of travel, the
//! side `to_cartesian` offsets towards.

use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, PI};

use nalgebra::Vector2;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::common::{FrenetPoint, Point2D};
use crate::map::WaypointMap;

/// How `to_frenet` decides the sign of `d`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum LateralSign {
    /// Negative when the query point is at least as close to a fixed
    /// reference point as its projection. Only meaningful for tracks that
    /// wrap around the reference point.
    ReferencePoint { x: f64, y: f64 },
    /// Negative when the query point is left of the segment direction
    CrossProduct,
}

impl Default for LateralSign {
    fn default() -> Self {
        LateralSign::ReferencePoint { x: 1000.0, y: 2000.0 }
    }
}

/// Frenet transform settings
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FrenetConfig {
    pub lateral_sign: LateralSign,
}

/// Pure coordinate transforms bound to one map
#[derive(Debug, Clone, Copy)]
pub struct CoordinateTransformer<'a> {
    map: &'a WaypointMap,
    sign: LateralSign,
}

impl<'a> CoordinateTransformer<'a> {
    pub fn new(map: &'a WaypointMap, config: &FrenetConfig) -> Self {
        CoordinateTransformer { map, sign: config.lateral_sign }
    }

    pub fn map(&self) -> &'a WaypointMap {
        self.map
    }

    /// Index of the waypoint nearest to (x, y); ties go to the lowest index
    pub fn closest_waypoint(&self, x: f64, y: f64) -> usize {
        let query = Point2D::new(x, y);
        self.map
            .waypoints()
            .iter()
            .enumerate()
            .min_by_key(|(_, wp)| OrderedFloat(query.distance(&wp.position())))
            .map(|(i, _)| i)
            .unwrap_or(0)
    }

    /// Closest waypoint, skipped forward by one if it lies more than 45 deg
    /// off the heading (i.e. it is behind the vehicle)
    pub fn next_waypoint(&self, x: f64, y: f64, heading: f64) -> usize {
        let closest = self.closest_waypoint(x, y);
        let bearing = Point2D::new(x, y).bearing_to(&self.map.position(closest));

        let mut angle = (heading - bearing).abs().rem_euclid(2.0 * PI);
        angle = angle.min(2.0 * PI - angle);

        if angle > FRAC_PI_4 {
            self.map.next_index(closest)
        } else {
            closest
        }
    }

    pub fn to_frenet(&self, x: f64, y: f64, heading: f64) -> FrenetPoint {
        let next_wp = self.next_waypoint(x, y, heading);
        let prev_wp = self.map.prev_index(next_wp);

        let origin = self.map.position(prev_wp).to_vector();
        let n = self.map.position(next_wp).to_vector() - origin;
        let rel = Vector2::new(x, y) - origin;

        // projection of rel onto the segment direction
        let n_sq = n.norm_squared();
        let proj_norm = if n_sq > 0.0 { rel.dot(&n) / n_sq } else { 0.0 };
        let proj = n * proj_norm;

        let mut d = (rel - proj).norm();
        let negative = match self.sign {
            LateralSign::ReferencePoint { x: rx, y: ry } => {
                let center = Vector2::new(rx, ry) - origin;
                (center - rel).norm() <= (center - proj).norm()
            }
            LateralSign::CrossProduct => n.perp(&rel) > 0.0,
        };
        if negative {
            d = -d;
        }

        let s = self.map.cumulative_length(prev_wp) + proj_norm * n_sq.sqrt();
        FrenetPoint::new(s, d)
    }

    pub fn to_cartesian(&self, s: f64, d: f64) -> Point2D {
        let wps = self.map.waypoints();
        let max_s = self.map.max_s();
        let s = s.rem_euclid(max_s);

        // ordered scan for the last waypoint strictly behind s
        let behind = wps.iter().take_while(|wp| wp.s < s).count();
        let (prev_wp, seg_s) = if behind == 0 {
            // before the first waypoint: on the closing segment
            let last = wps.len() - 1;
            (last, s + max_s - wps[last].s)
        } else {
            (behind - 1, s - wps[behind - 1].s)
        };
        let next_wp = self.map.next_index(prev_wp);

        let start = self.map.position(prev_wp);
        let heading = start.bearing_to(&self.map.position(next_wp));

        let seg_x = start.x + seg_s * heading.cos();
        let seg_y = start.y + seg_s * heading.sin();

        let perp_heading = heading - FRAC_PI_2;
        Point2D::new(seg_x + d * perp_heading.cos(), seg_y + d * perp_heading.sin())
    }
}
