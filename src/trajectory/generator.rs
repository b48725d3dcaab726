//! Spline-based trajectory synthesis
//!
//! The previous trajectory's unconsumed tail is kept verbatim. Two anchors
//! fix the heading at the seam, three more sit on the target lane centerline
//! further down the track. The anchors are moved into the frame of the
//! reference pose, a spline y = f(x) is fitted through them, and the curve is
//! sampled so that consecutive points are one tick apart at the reference
//! speed.

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::common::{
    EgoState, PlannerError, PlannerResult, Point2D, Pose2D, Trajectory, DEGENERATE_SEGMENT_LENGTH,
};
use crate::map::{CoordinateTransformer, RoadConfig};
use crate::trajectory::CubicSpline;

/// Trajectory timing and anchor placement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrajectoryConfig {
    /// Number of points in every emitted trajectory
    pub horizon: usize,
    /// Time between consecutive points [s]
    pub tick_duration: f64,
    /// Local x at which the chord used for spacing is measured [m]
    pub look_ahead: f64,
    /// Arc length offsets of the far anchors ahead of ego [m]
    pub anchor_offsets: Vec<f64>,
    /// Divides the reference speed to get m/s (mph -> m/s)
    pub speed_conversion: f64,
}

impl Default for TrajectoryConfig {
    fn default() -> Self {
        Self {
            horizon: 50,
            tick_duration: 0.02,
            look_ahead: 30.0,
            anchor_offsets: vec![30.0, 60.0, 90.0],
            speed_conversion: 2.24,
        }
    }
}

impl TrajectoryConfig {
    /// Distance covered in one tick at `speed` [m]
    pub fn step_length(&self, speed: f64) -> f64 {
        (self.tick_duration * speed / self.speed_conversion).max(0.0)
    }
}

/// How the points beyond the reused tail were produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanSource {
    /// Sampled from a spline through the anchors
    Spline,
    /// Straight extension along the last known heading
    HoldCourse,
    /// Tail already covers the horizon; nothing appended
    TailOnly,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrajectoryPlan {
    pub trajectory: Trajectory,
    pub source: PlanSource,
}

#[derive(Debug, Clone)]
pub struct TrajectoryGenerator {
    road: RoadConfig,
    config: TrajectoryConfig,
}

impl TrajectoryGenerator {
    pub fn new(road: RoadConfig, config: TrajectoryConfig) -> Self {
        TrajectoryGenerator { road, config }
    }

    pub fn config(&self) -> &TrajectoryConfig {
        &self.config
    }

    /// Build the next trajectory towards `lane` at `ref_speed`.
    ///
    /// `planning_s` is the arc length the far anchors are measured from:
    /// the end of the previous path when one exists, otherwise ego s.
    pub fn generate(
        &self,
        transformer: &CoordinateTransformer,
        lane: usize,
        ref_speed: f64,
        ego: &EgoState,
        planning_s: f64,
        previous: &[Point2D],
    ) -> TrajectoryPlan {
        if previous.len() >= self.config.horizon {
            return TrajectoryPlan {
                trajectory: Trajectory::from_points(previous.to_vec()),
                source: PlanSource::TailOnly,
            };
        }

        match self.fit_local_curve(transformer, lane, ego, planning_s, previous) {
            Ok((reference, spline)) => TrajectoryPlan {
                trajectory: self.sample(&reference, &spline, ref_speed, previous),
                source: PlanSource::Spline,
            },
            Err(err) => {
                warn!("holding course, no curve fitted: {}", err);
                TrajectoryPlan {
                    trajectory: self.hold_course(ego, ref_speed, previous),
                    source: PlanSource::HoldCourse,
                }
            }
        }
    }

    /// Reference pose and the two anchors that pin the heading at the seam
    fn seam_anchors(
        &self,
        ego: &EgoState,
        previous: &[Point2D],
    ) -> PlannerResult<(Pose2D, [Point2D; 2])> {
        if previous.len() < 2 {
            let behind = Point2D::new(ego.x - ego.yaw.cos(), ego.y - ego.yaw.sin());
            return Ok((ego.pose(), [behind, ego.position()]));
        }

        let last = previous[previous.len() - 1];
        let before = previous[previous.len() - 2];
        if before.distance(&last) < DEGENERATE_SEGMENT_LENGTH {
            return Err(PlannerError::NumericalError(
                "previous path ends in coincident points".to_string(),
            ));
        }
        Ok((Pose2D::new(last.x, last.y, before.bearing_to(&last)), [before, last]))
    }

    fn fit_local_curve(
        &self,
        transformer: &CoordinateTransformer,
        lane: usize,
        ego: &EgoState,
        planning_s: f64,
        previous: &[Point2D],
    ) -> PlannerResult<(Pose2D, CubicSpline)> {
        let (reference, seam) = self.seam_anchors(ego, previous)?;
        let d = self.road.lane_center(lane);

        let local: Vec<Point2D> = seam
            .iter()
            .copied()
            .chain(
                self.config
                    .anchor_offsets
                    .iter()
                    .map(|offset| transformer.to_cartesian(planning_s + offset, d)),
            )
            .map(|p| reference.to_local(&p))
            .collect();

        if !local.iter().tuple_windows().all(|(a, b)| b.x > a.x) {
            return Err(PlannerError::NumericalError(format!(
                "anchors not increasing in local x: {:?}",
                local.iter().map(|p| p.x).collect::<Vec<_>>()
            )));
        }

        let xs: Vec<f64> = local.iter().map(|p| p.x).collect();
        let ys: Vec<f64> = local.iter().map(|p| p.y).collect();
        let spline = CubicSpline::new(&xs, &ys)?;
        Ok((reference, spline))
    }

    fn sample(
        &self,
        reference: &Pose2D,
        spline: &CubicSpline,
        ref_speed: f64,
        previous: &[Point2D],
    ) -> Trajectory {
        let mut trajectory = Trajectory::with_capacity(self.config.horizon);
        trajectory.points.extend_from_slice(previous);

        let target_x = self.config.look_ahead;
        let target_y = spline.calc(target_x);
        let target_dist = target_x.hypot(target_y);

        let step = self.config.step_length(ref_speed);
        let inc = if step > 0.0 {
            let n = target_dist / step;
            target_x / n
        } else {
            0.0
        };

        let mut x_add_on = 0.0;
        while trajectory.len() < self.config.horizon {
            x_add_on += inc;
            let local = Point2D::new(x_add_on, spline.calc(x_add_on));
            trajectory.push(reference.to_global(&local));
        }
        trajectory
    }

    /// Extend the tail in a straight line along its last heading (ego yaw if
    /// the tail has none)
    fn hold_course(&self, ego: &EgoState, ref_speed: f64, previous: &[Point2D]) -> Trajectory {
        let mut trajectory = Trajectory::from_points(previous.to_vec());
        let heading = trajectory.end_heading().unwrap_or(ego.yaw);
        let step = self.config.step_length(ref_speed);

        let mut last = trajectory.last().copied().unwrap_or_else(|| ego.position());
        while trajectory.len() < self.config.horizon {
            last = Point2D::new(last.x + step * heading.cos(), last.y + step * heading.sin());
            trajectory.push(last);
        }
        trajectory
    }
}
