//! Closed-loop highway simulation
//!
//! The ego vehicle drives the emitted trajectories point by point, consuming
//! a fixed number of points per planning tick, while traffic cruises along
//! lane centres at constant speed. Everything random is drawn from a seeded
//! generator, so a run is reproducible from its seed.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use tracing::debug;

use crate::behavior::{BehaviorDecision, NO_VEHICLE_GAP};
use crate::common::{
    EgoState, FrenetPoint, LaneSelector, PlannerError, PlannerResult, Point2D, TrackedVehicle,
    Trajectory,
};
use crate::planner::{HighwayPlanner, PlannerState, TickInput};
use crate::trajectory::PlanSource;

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationConfig {
    pub seed: u64,
    pub num_vehicles: usize,
    /// Trajectory points the ego drives between two planning ticks
    pub consume_per_tick: usize,
    /// Mean traffic speed [m/s]
    pub traffic_speed_mean: f64,
    /// Traffic speed standard deviation [m/s]
    pub traffic_speed_std: f64,
    /// Ego start position along the track [m]
    pub ego_start_s: f64,
    pub ego_start_lane: usize,
    /// No traffic is spawned closer than this to the ego start [m]
    pub spawn_clearance: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            num_vehicles: 12,
            consume_per_tick: 10,
            traffic_speed_mean: 18.0,
            traffic_speed_std: 3.0,
            ego_start_s: 100.0,
            ego_start_lane: 1,
            spawn_clearance: 40.0,
        }
    }
}

/// Traffic vehicle locked to a lane centre
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrafficVehicle {
    pub id: i64,
    pub s: f64,
    pub lane: usize,
    /// [m/s]
    pub speed: f64,
}

/// Summary of one planning tick
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationStep {
    pub tick: usize,
    pub lane: usize,
    pub ref_speed: f64,
    pub ego: EgoState,
    pub decision: BehaviorDecision,
    pub source: PlanSource,
    pub trajectory_len: usize,
    /// Nearest vehicle ahead in the ego lane, ignoring projection [m]
    pub nearest_gap: f64,
    /// Lane the ego actually occupies, `None` when off the road
    pub ego_lane: Option<usize>,
}

pub struct Simulation<S: LaneSelector> {
    planner: HighwayPlanner<S>,
    config: SimulationConfig,
    state: PlannerState,
    ego: EgoState,
    pending: Vec<Point2D>,
    last_trajectory: Trajectory,
    traffic: Vec<TrafficVehicle>,
    ego_history: Vec<Point2D>,
    tick: usize,
}

impl<S: LaneSelector> Simulation<S> {
    /// Spawn random traffic from `config.seed`
    pub fn new(planner: HighwayPlanner<S>, config: SimulationConfig) -> PlannerResult<Self> {
        let traffic = spawn_traffic(&planner, &config)?;
        Simulation::with_traffic(planner, config, traffic)
    }

    pub fn with_traffic(
        planner: HighwayPlanner<S>,
        config: SimulationConfig,
        traffic: Vec<TrafficVehicle>,
    ) -> PlannerResult<Self> {
        let road = &planner.config().road;
        if !road.is_valid_lane(config.ego_start_lane) {
            return Err(PlannerError::invalid_parameter(format!(
                "start lane {} outside a {}-lane road",
                config.ego_start_lane, road.num_lanes
            )));
        }
        if config.consume_per_tick == 0 {
            return Err(PlannerError::invalid_parameter("consume_per_tick must be at least 1"));
        }

        let d = road.lane_center(config.ego_start_lane);
        let tf = planner.transformer();
        let s = config.ego_start_s.rem_euclid(planner.map().max_s());
        let position = tf.to_cartesian(s, d);
        let yaw = position.bearing_to(&tf.to_cartesian(s + 1.0, d));
        let ego = EgoState::new(position.x, position.y, yaw, 0.0, s, d);
        let state = PlannerState::new(config.ego_start_lane, 0.0);

        Ok(Simulation {
            planner,
            config,
            state,
            ego,
            pending: Vec::new(),
            last_trajectory: Trajectory::new(),
            traffic,
            ego_history: vec![position],
            tick: 0,
        })
    }

    pub fn planner(&self) -> &HighwayPlanner<S> {
        &self.planner
    }

    pub fn state(&self) -> PlannerState {
        self.state
    }

    pub fn ego(&self) -> &EgoState {
        &self.ego
    }

    pub fn traffic(&self) -> &[TrafficVehicle] {
        &self.traffic
    }

    pub fn ego_history(&self) -> &[Point2D] {
        &self.ego_history
    }

    pub fn last_trajectory(&self) -> &Trajectory {
        &self.last_trajectory
    }

    /// Unconsumed points of the last trajectory
    pub fn pending(&self) -> &[Point2D] {
        &self.pending
    }

    /// Traffic as sensor fusion would report it, with `s` unwrapped to lie
    /// within half a lap of ego
    pub fn sensor_fusion(&self) -> Vec<TrackedVehicle> {
        let tf = self.planner.transformer();
        let road = &self.planner.config().road;
        let max_s = self.planner.map().max_s();

        self.traffic
            .iter()
            .map(|v| {
                let d = road.lane_center(v.lane);
                let position = tf.to_cartesian(v.s, d);
                let heading = position.bearing_to(&tf.to_cartesian(v.s + 1.0, d));
                TrackedVehicle {
                    id: v.id,
                    x: position.x,
                    y: position.y,
                    vx: v.speed * heading.cos(),
                    vy: v.speed * heading.sin(),
                    s: unwrap_near(v.s, self.ego.s, max_s),
                    d,
                }
            })
            .collect()
    }

    /// Plan once, then drive `consume_per_tick` points of the result
    pub fn step(&mut self) -> SimulationStep {
        let vehicles = self.sensor_fusion();
        let nearest_gap = nearest_gap_ahead(&self.planner, &self.ego, self.state.lane, &vehicles);

        let end_path = match self.pending.last() {
            Some(end) => {
                let f = self.planner.transformer().to_frenet(end.x, end.y, self.ego.yaw);
                let max_s = self.planner.map().max_s();
                FrenetPoint::new(unwrap_near(f.s, self.ego.s, max_s), f.d)
            }
            None => FrenetPoint::new(self.ego.s, self.ego.d),
        };
        let input = TickInput {
            ego: self.ego,
            previous_path: self.pending.clone(),
            end_path,
            vehicles,
        };

        let output = self.planner.tick(self.state, &input);
        self.state = output.state;

        let step = SimulationStep {
            tick: self.tick,
            lane: output.state.lane,
            ref_speed: output.state.ref_speed,
            ego: self.ego,
            decision: output.decision,
            source: output.source,
            trajectory_len: output.trajectory.len(),
            nearest_gap,
            ego_lane: self.planner.config().road.lane_of(self.ego.d),
        };

        self.pending = output.trajectory.points.clone();
        self.last_trajectory = output.trajectory;
        self.advance();
        self.tick += 1;
        step
    }

    /// Run `ticks` planning cycles
    pub fn run(&mut self, ticks: usize) -> Vec<SimulationStep> {
        (0..ticks).map(|_| self.step()).collect()
    }

    fn advance(&mut self) {
        let consumed = self.config.consume_per_tick.min(self.pending.len());
        let dt = self.planner.config().trajectory.tick_duration;
        let conversion = self.planner.config().trajectory.speed_conversion;

        let mut position = self.ego.position();
        let mut yaw = self.ego.yaw;
        let mut last_step = 0.0;
        for point in self.pending.drain(..consumed) {
            last_step = position.distance(&point);
            if last_step > 1e-6 {
                yaw = position.bearing_to(&point);
            }
            position = point;
            self.ego_history.push(point);
        }

        let frenet = self.planner.transformer().to_frenet(position.x, position.y, yaw);
        let speed = last_step / dt * conversion;
        self.ego = EgoState::new(position.x, position.y, yaw, speed, frenet.s, frenet.d);

        let max_s = self.planner.map().max_s();
        let elapsed = consumed as f64 * dt;
        for vehicle in &mut self.traffic {
            vehicle.s = (vehicle.s + vehicle.speed * elapsed).rem_euclid(max_s);
        }
        debug!(
            "tick {}: ego s {:.1} d {:.2} speed {:.1}",
            self.tick, self.ego.s, self.ego.d, self.ego.speed
        );
    }
}

/// `s` shifted by whole laps to lie within half a lap of `reference`
fn unwrap_near(s: f64, reference: f64, max_s: f64) -> f64 {
    reference + (s - reference + max_s / 2.0).rem_euclid(max_s) - max_s / 2.0
}

fn spawn_traffic<S: LaneSelector>(
    planner: &HighwayPlanner<S>,
    config: &SimulationConfig,
) -> PlannerResult<Vec<TrafficVehicle>> {
    let max_s = planner.map().max_s();
    let num_lanes = planner.config().road.num_lanes;
    if 2.0 * config.spawn_clearance >= max_s {
        return Err(PlannerError::invalid_parameter("spawn clearance leaves no room on the track"));
    }
    let speeds = Normal::new(config.traffic_speed_mean, config.traffic_speed_std)
        .map_err(|e| {
            PlannerError::invalid_parameter(format!("traffic speed distribution: {}", e))
        })?;

    let mut rng = StdRng::seed_from_u64(config.seed);
    let traffic = (0..config.num_vehicles)
        .map(|i| {
            let offset = rng.gen_range(config.spawn_clearance..max_s - config.spawn_clearance);
            TrafficVehicle {
                id: i as i64,
                s: (config.ego_start_s + offset).rem_euclid(max_s),
                lane: rng.gen_range(0..num_lanes),
                speed: speeds.sample(&mut rng).max(0.0),
            }
        })
        .collect();
    Ok(traffic)
}

fn nearest_gap_ahead<S: LaneSelector>(
    planner: &HighwayPlanner<S>,
    ego: &EgoState,
    lane: usize,
    vehicles: &[TrackedVehicle],
) -> f64 {
    let road = &planner.config().road;
    vehicles
        .iter()
        .filter(|v| road.in_lane(v.d, lane))
        .map(|v| v.s - ego.s)
        .filter(|&gap| gap > 0.0)
        .fold(NO_VEHICLE_GAP, f64::min)
}
