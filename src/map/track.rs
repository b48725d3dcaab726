//! Synthetic closed tracks
//!
//! Both builders run counter-clockwise with normals pointing away from the
//! track centre, so lanes at positive `d` sit on the outside of the loop.

use std::f64::consts::PI;

use itertools::Itertools;

use crate::common::{PlannerError, PlannerResult, Point2D};
use crate::map::{Waypoint, WaypointMap};

/// Centerline sample before arc lengths are assigned
struct Sample {
    position: Point2D,
    normal: (f64, f64),
}

fn closed_track(samples: Vec<Sample>) -> PlannerResult<WaypointMap> {
    if samples.len() < 3 {
        return Err(PlannerError::invalid_parameter("a closed track needs at least 3 samples"));
    }

    let mut waypoints = Vec::with_capacity(samples.len());
    let mut s = 0.0;
    waypoints.push(Waypoint::new(
        samples[0].position.x,
        samples[0].position.y,
        s,
        samples[0].normal.0,
        samples[0].normal.1,
    ));
    for (a, b) in samples.iter().tuple_windows() {
        s += a.position.distance(&b.position);
        waypoints.push(Waypoint::new(b.position.x, b.position.y, s, b.normal.0, b.normal.1));
    }
    let closing = samples[samples.len() - 1].position.distance(&samples[0].position);

    WaypointMap::new(waypoints, s + closing)
}

/// Circle of `radius` around `center`, sampled with `num_waypoints` points
pub fn circular_track(
    center: Point2D,
    radius: f64,
    num_waypoints: usize,
) -> PlannerResult<WaypointMap> {
    if radius <= 0.0 {
        return Err(PlannerError::invalid_parameter("radius must be positive"));
    }
    let samples = (0..num_waypoints)
        .map(|i| {
            let theta = 2.0 * PI * i as f64 / num_waypoints as f64;
            Sample {
                position: Point2D::new(
                    center.x + radius * theta.cos(),
                    center.y + radius * theta.sin(),
                ),
                normal: (theta.cos(), theta.sin()),
            }
        })
        .collect();
    closed_track(samples)
}

/// Two straights of `straight_length` joined by half circles of `radius`,
/// sampled every `spacing` meters along the centerline
pub fn stadium_track(
    center: Point2D,
    straight_length: f64,
    radius: f64,
    spacing: f64,
) -> PlannerResult<WaypointMap> {
    if straight_length <= 0.0 || radius <= 0.0 || spacing <= 0.0 {
        return Err(PlannerError::invalid_parameter(
            "straight length, radius and spacing must be positive",
        ));
    }

    let half = straight_length / 2.0;
    let arc = PI * radius;
    let perimeter = 2.0 * straight_length + 2.0 * arc;
    let n = (perimeter / spacing).round().max(3.0) as usize;

    let sample_at = |u: f64| -> Sample {
        if u < straight_length {
            // bottom straight, heading +x
            Sample {
                position: Point2D::new(center.x - half + u, center.y - radius),
                normal: (0.0, -1.0),
            }
        } else if u < straight_length + arc {
            let a = -PI / 2.0 + (u - straight_length) / radius;
            Sample {
                position: Point2D::new(
                    center.x + half + radius * a.cos(),
                    center.y + radius * a.sin(),
                ),
                normal: (a.cos(), a.sin()),
            }
        } else if u < 2.0 * straight_length + arc {
            // top straight, heading -x
            let v = u - straight_length - arc;
            Sample {
                position: Point2D::new(center.x + half - v, center.y + radius),
                normal: (0.0, 1.0),
            }
        } else {
            let a = PI / 2.0 + (u - 2.0 * straight_length - arc) / radius;
            Sample {
                position: Point2D::new(
                    center.x - half + radius * a.cos(),
                    center.y + radius * a.sin(),
                ),
                normal: (a.cos(), a.sin()),
            }
        }
    };

    let samples = (0..n).map(|i| sample_at(perimeter * i as f64 / n as f64)).collect();
    closed_track(samples)
}
