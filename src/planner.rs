//! Per-tick control step
//!
//! A tick is a pure function of the tick input and the session's
//! [`PlannerState`]; the updated state is handed back to the caller, who owns
//! it across ticks.

use tracing::debug;

use crate::behavior::{BehaviorDecision, BehaviorPlanner, GreedyLaneSelector};
use crate::common::{
    EgoState, FrenetPoint, LaneSelector, PlannerError, PlannerResult, Point2D, TrackedVehicle,
    Trajectory,
};
use crate::config::PlannerConfig;
use crate::map::{CoordinateTransformer, WaypointMap};
use crate::trajectory::{PlanSource, TrajectoryGenerator};

/// State that survives between ticks of one session
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlannerState {
    pub lane: usize,
    /// Reference speed [mph]
    pub ref_speed: f64,
}

impl Default for PlannerState {
    fn default() -> Self {
        PlannerState { lane: 1, ref_speed: 0.0 }
    }
}

impl PlannerState {
    pub fn new(lane: usize, ref_speed: f64) -> Self {
        PlannerState { lane, ref_speed }
    }
}

/// Everything the core needs from one telemetry message
#[derive(Debug, Clone, PartialEq)]
pub struct TickInput {
    pub ego: EgoState,
    /// Unconsumed tail of the previously sent trajectory
    pub previous_path: Vec<Point2D>,
    /// Frenet position of the previous path's last point
    pub end_path: FrenetPoint,
    pub vehicles: Vec<TrackedVehicle>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TickOutput {
    pub trajectory: Trajectory,
    pub state: PlannerState,
    pub decision: BehaviorDecision,
    pub source: PlanSource,
}

/// Largest accepted difference between the configured and the map's track length [m]
const TRACK_LENGTH_TOLERANCE: f64 = 1e-6;

/// Ramp the reference speed one step down when crowded, otherwise one step
/// up towards the limit; the result stays within `[0, limit]`
pub fn ramp_speed(current: f64, too_close: bool, step: f64, limit: f64) -> f64 {
    let next = if too_close {
        current - step
    } else if current < limit {
        current + step
    } else {
        current
    };
    next.clamp(0.0, limit)
}

/// Map plus the three planning layers, shared by every session on the track
pub struct HighwayPlanner<S: LaneSelector = GreedyLaneSelector> {
    map: WaypointMap,
    config: PlannerConfig,
    behavior: BehaviorPlanner,
    selector: S,
    generator: TrajectoryGenerator,
}

impl HighwayPlanner<GreedyLaneSelector> {
    pub fn new(map: WaypointMap, config: PlannerConfig) -> PlannerResult<Self> {
        let selector = GreedyLaneSelector::new(config.road.num_lanes, &config.behavior);
        HighwayPlanner::with_selector(map, config, selector)
    }
}

impl<S: LaneSelector> HighwayPlanner<S> {
    pub fn with_selector(
        map: WaypointMap,
        config: PlannerConfig,
        selector: S,
    ) -> PlannerResult<Self> {
        config.validate()?;
        if selector.num_lanes() != config.road.num_lanes {
            return Err(PlannerError::invalid_parameter(format!(
                "lane selector plans over {} lanes, road has {}",
                selector.num_lanes(),
                config.road.num_lanes
            )));
        }
        if (config.road.max_s - map.max_s()).abs() > TRACK_LENGTH_TOLERANCE {
            return Err(PlannerError::invalid_parameter(format!(
                "road.max_s {} does not match the map's track length {}",
                config.road.max_s,
                map.max_s()
            )));
        }
        let behavior = BehaviorPlanner::new(
            config.road.clone(),
            config.behavior.clone(),
            config.trajectory.tick_duration,
        );
        let generator = TrajectoryGenerator::new(config.road.clone(), config.trajectory.clone());
        Ok(HighwayPlanner { map, config, behavior, selector, generator })
    }

    pub fn map(&self) -> &WaypointMap {
        &self.map
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    pub fn transformer(&self) -> CoordinateTransformer<'_> {
        CoordinateTransformer::new(&self.map, &self.config.frenet)
    }

    /// Run one planning cycle
    pub fn tick(&self, state: PlannerState, input: &TickInput) -> TickOutput {
        let unconsumed = input.previous_path.len();
        // continue from where the vehicle will be once the reused prefix is driven
        let planning_s = if unconsumed > 0 { input.end_path.s } else { input.ego.s };

        let decision = self.behavior.assess(state.lane, planning_s, &input.vehicles, unconsumed);

        let mut lane = state.lane;
        if decision.want_lane_change {
            lane = self.selector.select_lane(state.lane, &decision.gaps);
            if lane != state.lane {
                debug!("lane change {} -> {} (gaps {:?})", state.lane, lane, decision.gaps);
            }
        }

        let behavior = &self.config.behavior;
        let ref_speed = ramp_speed(
            state.ref_speed,
            decision.too_close,
            behavior.speed_step,
            behavior.speed_limit,
        );

        let plan = self.generator.generate(
            &self.transformer(),
            lane,
            ref_speed,
            &input.ego,
            planning_s,
            &input.previous_path,
        );

        TickOutput {
            trajectory: plan.trajectory,
            state: PlannerState::new(lane, ref_speed),
            decision,
            source: plan.source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::{stadium_track, RoadConfig};
    use approx::assert_abs_diff_eq;

    fn track() -> WaypointMap {
        stadium_track(Point2D::new(1000.0, 2000.0), 1000.0, 300.0, 30.0).unwrap()
    }

    fn config_for(map: &WaypointMap) -> PlannerConfig {
        PlannerConfig {
            road: RoadConfig { max_s: map.max_s(), ..Default::default() },
            ..Default::default()
        }
    }

    fn planner() -> HighwayPlanner {
        let map = track();
        let config = config_for(&map);
        HighwayPlanner::new(map, config).unwrap()
    }

    fn input_at(
        planner: &HighwayPlanner,
        s: f64,
        lane: usize,
        vehicles: Vec<TrackedVehicle>,
    ) -> TickInput {
        let tf = planner.transformer();
        let d = planner.config().road.lane_center(lane);
        let p = tf.to_cartesian(s, d);
        TickInput {
            ego: EgoState::new(p.x, p.y, 0.0, 0.0, s, d),
            previous_path: Vec::new(),
            end_path: FrenetPoint::new(0.0, 0.0),
            vehicles,
        }
    }

    fn car_at(
        planner: &HighwayPlanner,
        id: i64,
        s: f64,
        lane: usize,
        speed: f64,
    ) -> TrackedVehicle {
        let d = planner.config().road.lane_center(lane);
        let p = planner.transformer().to_cartesian(s, d);
        TrackedVehicle { id, x: p.x, y: p.y, vx: speed, vy: 0.0, s, d }
    }

    #[test]
    fn test_ramp_speed() {
        assert_abs_diff_eq!(ramp_speed(0.0, false, 0.224, 49.5), 0.224, epsilon = 1e-12);
        assert_abs_diff_eq!(ramp_speed(49.4, false, 0.224, 49.5), 49.5, epsilon = 1e-12);
        assert_abs_diff_eq!(ramp_speed(49.5, false, 0.224, 49.5), 49.5, epsilon = 1e-12);
        assert_abs_diff_eq!(ramp_speed(10.0, true, 0.224, 49.5), 9.776, epsilon = 1e-12);
        assert_abs_diff_eq!(ramp_speed(0.1, true, 0.224, 49.5), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_selector_must_match_road() {
        let map = track();
        let config = config_for(&map);
        let selector = GreedyLaneSelector::new(2, &Default::default());
        assert!(matches!(
            HighwayPlanner::with_selector(map, config, selector),
            Err(PlannerError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_track_length_must_match_map() {
        let map = track();
        let config = PlannerConfig {
            road: RoadConfig { max_s: 100.0, ..Default::default() },
            ..Default::default()
        };
        assert!(matches!(
            HighwayPlanner::new(map, config),
            Err(PlannerError::InvalidParameter(_))
        ));

        // the default 6945.554 m belongs to a different track
        assert!(HighwayPlanner::new(track(), PlannerConfig::default()).is_err());

        let map = track();
        let config = config_for(&map);
        let planner = HighwayPlanner::new(map, config).unwrap();
        assert_eq!(planner.config().road.max_s, planner.map().max_s());
    }

    #[test]
    fn test_default_state() {
        let state = PlannerState::default();
        assert_eq!(state.lane, 1);
        assert_eq!(state.ref_speed, 0.0);
    }

    #[test]
    fn test_tick_on_empty_road_accelerates_in_lane() {
        let planner = planner();
        let input = input_at(&planner, 200.0, 1, Vec::new());

        let out = planner.tick(PlannerState::default(), &input);
        assert_eq!(out.state.lane, 1);
        assert_abs_diff_eq!(out.state.ref_speed, 0.224, epsilon = 1e-12);
        assert_eq!(out.trajectory.len(), 50);
        assert_eq!(out.source, PlanSource::Spline);
        assert!(!out.decision.too_close);
    }

    #[test]
    fn test_tick_blocked_changes_lane_and_slows() {
        let planner = planner();
        let slow_car = car_at(&planner, 1, 220.0, 1, 5.0);
        let input = input_at(&planner, 200.0, 1, vec![slow_car]);

        let out = planner.tick(PlannerState::new(1, 30.0), &input);
        assert!(out.decision.too_close);
        // both sides open: equal front gaps go right
        assert_eq!(out.state.lane, 2);
        assert_abs_diff_eq!(out.state.ref_speed, 29.776, epsilon = 1e-12);
    }

    #[test]
    fn test_tick_blocked_on_all_sides_keeps_lane() {
        let planner = planner();
        let cars = vec![
            car_at(&planner, 1, 220.0, 1, 5.0),
            car_at(&planner, 2, 202.0, 0, 5.0),
            car_at(&planner, 3, 198.0, 2, 5.0),
        ];
        let input = input_at(&planner, 200.0, 1, cars);

        let out = planner.tick(PlannerState::new(1, 30.0), &input);
        assert!(out.decision.too_close);
        assert_eq!(out.state.lane, 1);
    }

    #[test]
    fn test_tick_uses_end_path_s_when_tail_exists() {
        let planner = planner();
        let start = input_at(&planner, 200.0, 1, Vec::new());
        let first = planner.tick(PlannerState::new(1, 30.0), &start);

        // a car 35 m ahead of ego is within 30 m of the path end
        let tail: Vec<Point2D> = first.trajectory.points[10..].to_vec();
        let end = *tail.last().unwrap();
        let end_path = planner.transformer().to_frenet(end.x, end.y, 0.0);
        let parked = car_at(&planner, 1, 235.0, 1, 0.0);
        let mut input = input_at(&planner, 200.0, 1, vec![parked]);
        input.previous_path = tail.clone();
        input.end_path = end_path;

        let out = planner.tick(first.state, &input);
        assert!(end_path.s > 205.0);
        assert!(out.decision.too_close);
        assert_eq!(&out.trajectory.points[..tail.len()], &tail[..]);
        assert_eq!(out.trajectory.len(), 50);
    }
}
