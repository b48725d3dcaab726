//! Simulator message codec
//!
//! The simulator talks socket.io-style text frames: `42` followed by a JSON
//! array `[event, data]`. Only `telemetry` events drive the planner; each one
//! is answered with a `control` event carrying the next trajectory.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::common::{
    EgoState, FrenetPoint, LaneSelector, PlannerError, PlannerResult, TrackedVehicle, Trajectory,
};
use crate::planner::{HighwayPlanner, PlannerState, TickInput, TickOutput};

/// Reply for a message frame without usable telemetry
pub const MANUAL_DIRECTIVE: &str = "42[\"manual\",{}]";

const MESSAGE_PREFIX: &str = "42";
const SENSOR_FUSION_COLUMNS: usize = 7;

/// Pull the JSON array out of a `42` frame.
///
/// Returns `None` for frames that are too short, lack the `42` prefix,
/// contain `null`, or have no bracketed payload.
pub fn extract_payload(frame: &str) -> Option<&str> {
    if frame.len() <= 2 || !frame.starts_with(MESSAGE_PREFIX) {
        return None;
    }
    if frame.contains("null") {
        return None;
    }
    let start = frame.find('[')?;
    let end = frame.rfind(']')?;
    if end < start {
        return None;
    }
    Some(&frame[start..=end])
}

/// One `telemetry` event as sent by the simulator. `yaw` is in degrees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryFrame {
    pub x: f64,
    pub y: f64,
    pub s: f64,
    pub d: f64,
    pub yaw: f64,
    pub speed: f64,
    #[serde(default)]
    pub previous_path_x: Vec<f64>,
    #[serde(default)]
    pub previous_path_y: Vec<f64>,
    #[serde(default)]
    pub end_path_s: f64,
    #[serde(default)]
    pub end_path_d: f64,
    /// Rows of `[id, x, y, vx, vy, s, d]`
    #[serde(default)]
    pub sensor_fusion: Vec<Vec<f64>>,
}

impl TelemetryFrame {
    pub fn into_tick_input(self) -> TickInput {
        let ego = EgoState::new(self.x, self.y, self.yaw.to_radians(), self.speed, self.s, self.d);

        if self.previous_path_x.len() != self.previous_path_y.len() {
            warn!(
                "previous path has {} x and {} y values, truncating",
                self.previous_path_x.len(),
                self.previous_path_y.len()
            );
        }
        let previous_path =
            Trajectory::from_xy(&self.previous_path_x, &self.previous_path_y).points;

        let vehicles = self
            .sensor_fusion
            .iter()
            .filter_map(|row| {
                if row.len() < SENSOR_FUSION_COLUMNS {
                    warn!("skipping sensor fusion row with {} columns", row.len());
                    return None;
                }
                Some(TrackedVehicle {
                    id: row[0] as i64,
                    x: row[1],
                    y: row[2],
                    vx: row[3],
                    vy: row[4],
                    s: row[5],
                    d: row[6],
                })
            })
            .collect();

        TickInput {
            ego,
            previous_path,
            end_path: FrenetPoint::new(self.end_path_s, self.end_path_d),
            vehicles,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SimulatorEvent {
    Telemetry(TelemetryFrame),
    /// Any other event name; carries no planner input
    Other(String),
}

/// Decode a `[event_name, data]` payload
pub fn decode_event(payload: &str) -> PlannerResult<SimulatorEvent> {
    let (name, data): (String, Value) = serde_json::from_str(payload)?;
    if name == "telemetry" {
        let frame: TelemetryFrame = serde_json::from_value(data)?;
        Ok(SimulatorEvent::Telemetry(frame))
    } else {
        Ok(SimulatorEvent::Other(name))
    }
}

#[derive(Debug, Serialize)]
struct ControlMessage {
    next_x: Vec<f64>,
    next_y: Vec<f64>,
}

/// `42["control",{"next_x":[..],"next_y":[..]}]`
pub fn encode_control(trajectory: &Trajectory) -> PlannerResult<String> {
    let message = ControlMessage {
        next_x: trajectory.x_coords(),
        next_y: trajectory.y_coords(),
    };
    let body = serde_json::to_string(&("control", message))?;
    Ok(format!("{}{}", MESSAGE_PREFIX, body))
}

/// Planner state of one connected vehicle plus the frame-level control flow
pub struct TelemetrySession<'a, S: LaneSelector> {
    planner: &'a HighwayPlanner<S>,
    state: PlannerState,
    last_output: Option<TickOutput>,
}

impl<'a, S: LaneSelector> TelemetrySession<'a, S> {
    pub fn new(planner: &'a HighwayPlanner<S>) -> Self {
        TelemetrySession::with_state(planner, PlannerState::default())
    }

    pub fn with_state(planner: &'a HighwayPlanner<S>, state: PlannerState) -> Self {
        TelemetrySession { planner, state, last_output: None }
    }

    pub fn state(&self) -> PlannerState {
        self.state
    }

    /// Result of the most recent planning tick
    pub fn last_output(&self) -> Option<&TickOutput> {
        self.last_output.as_ref()
    }

    /// Handle one inbound frame, returning the reply to send (if any)
    pub fn handle_frame(&mut self, frame: &str) -> Option<String> {
        if frame.len() <= 2 || !frame.starts_with(MESSAGE_PREFIX) {
            return None;
        }
        let payload = match extract_payload(frame) {
            Some(payload) => payload,
            None => return Some(MANUAL_DIRECTIVE.to_string()),
        };

        match self.plan(payload) {
            Ok(Some(reply)) => Some(reply),
            Ok(None) => None,
            Err(err) => {
                warn!("unusable telemetry frame: {}", err);
                Some(MANUAL_DIRECTIVE.to_string())
            }
        }
    }

    fn plan(&mut self, payload: &str) -> Result<Option<String>, PlannerError> {
        let frame = match decode_event(payload)? {
            SimulatorEvent::Telemetry(frame) => frame,
            SimulatorEvent::Other(name) => {
                debug!("ignoring event {}", name);
                return Ok(None);
            }
        };

        let input = frame.into_tick_input();
        let output = self.planner.tick(self.state, &input);
        let reply = encode_control(&output.trajectory)?;
        self.state = output.state;
        self.last_output = Some(output);
        Ok(Some(reply))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Point2D;
    use crate::config::PlannerConfig;
    use crate::map::{stadium_track, CoordinateTransformer, FrenetConfig, RoadConfig};
    use approx::assert_abs_diff_eq;
    use serde_json::json;

    fn planner() -> HighwayPlanner {
        let map = stadium_track(Point2D::new(1000.0, 2000.0), 1000.0, 300.0, 30.0).unwrap();
        let config = PlannerConfig {
            road: RoadConfig { max_s: map.max_s(), ..Default::default() },
            ..Default::default()
        };
        HighwayPlanner::new(map, config).unwrap()
    }

    fn telemetry_frame(planner: &HighwayPlanner, sensor_fusion: Value) -> String {
        let tf = CoordinateTransformer::new(planner.map(), &FrenetConfig::default());
        let p = tf.to_cartesian(200.0, 6.0);
        let data = json!({
            "x": p.x, "y": p.y, "s": 200.0, "d": 6.0, "yaw": 0.0, "speed": 0.0,
            "previous_path_x": [], "previous_path_y": [],
            "end_path_s": 0.0, "end_path_d": 0.0,
            "sensor_fusion": sensor_fusion,
        });
        format!("42{}", json!(["telemetry", data]))
    }

    #[test]
    fn test_extract_payload() {
        assert_eq!(
            extract_payload("42[\"telemetry\",{\"x\":1}]"),
            Some("[\"telemetry\",{\"x\":1}]")
        );
        assert_eq!(extract_payload("42[\"telemetry\",null]"), None);
        assert_eq!(extract_payload("42"), None);
        assert_eq!(extract_payload("2ping"), None);
        assert_eq!(extract_payload("43[\"x\"]"), None);
        assert_eq!(extract_payload("42 no brackets"), None);
    }

    #[test]
    fn test_decode_telemetry_event() {
        let payload = r#"["telemetry",{
            "x":909.48,"y":1128.67,"s":124.83,"d":6.16,"yaw":90.0,"speed":0,
            "previous_path_x":[1.0,2.0],"previous_path_y":[3.0,4.0],
            "end_path_s":130.0,"end_path_d":6.0,
            "sensor_fusion":[[0,1000,2000,3,4,150,2],[1,0,0]]}]"#;
        let frame = match decode_event(payload).unwrap() {
            SimulatorEvent::Telemetry(frame) => frame,
            other => panic!("unexpected event {:?}", other),
        };
        assert_eq!(frame.sensor_fusion.len(), 2);

        let input = frame.into_tick_input();
        assert_abs_diff_eq!(input.ego.yaw, std::f64::consts::FRAC_PI_2, epsilon = 1e-12);
        assert_eq!(input.previous_path, vec![Point2D::new(1.0, 3.0), Point2D::new(2.0, 4.0)]);
        assert_eq!(input.end_path, FrenetPoint::new(130.0, 6.0));
        // short row dropped
        assert_eq!(input.vehicles.len(), 1);
        assert_eq!(input.vehicles[0].id, 0);
        assert_abs_diff_eq!(input.vehicles[0].speed(), 5.0, epsilon = 1e-12);
    }

    #[test]
    fn test_decode_other_event_and_garbage() {
        assert_eq!(
            decode_event(r#"["ping",{}]"#).unwrap(),
            SimulatorEvent::Other("ping".to_string())
        );
        assert!(matches!(decode_event("[1,2"), Err(PlannerError::TelemetryError(_))));
        assert!(decode_event(r#"["telemetry",{"x":1.0}]"#).is_err());
    }

    #[test]
    fn test_mismatched_previous_path_is_truncated() {
        let payload = r#"["telemetry",{"x":0,"y":0,"s":0,"d":6,"yaw":0,"speed":0,
            "previous_path_x":[1.0,2.0,3.0],"previous_path_y":[4.0,5.0]}]"#;
        let frame = match decode_event(payload).unwrap() {
            SimulatorEvent::Telemetry(frame) => frame,
            other => panic!("unexpected event {:?}", other),
        };
        let input = frame.into_tick_input();
        assert_eq!(input.previous_path, vec![Point2D::new(1.0, 4.0), Point2D::new(2.0, 5.0)]);
        assert!(input.vehicles.is_empty());
    }

    #[test]
    fn test_encode_control() {
        let traj = Trajectory::from_xy(&[1.5, 2.25], &[-3.0, 4.5]);
        assert_eq!(
            encode_control(&traj).unwrap(),
            r#"42["control",{"next_x":[1.5,2.25],"next_y":[-3.0,4.5]}]"#
        );
    }

    #[test]
    fn test_session_replies_with_control() {
        let planner = planner();
        let mut session = TelemetrySession::new(&planner);
        let frame = telemetry_frame(&planner, json!([]));

        let reply = session.handle_frame(&frame).unwrap();
        assert!(reply.starts_with("42[\"control\","));
        let payload = extract_payload(&reply).unwrap();
        let (name, body): (String, Value) = serde_json::from_str(payload).unwrap();
        assert_eq!(name, "control");
        assert_eq!(body["next_x"].as_array().unwrap().len(), 50);
        assert_eq!(body["next_y"].as_array().unwrap().len(), 50);

        assert_eq!(session.state().lane, 1);
        assert_abs_diff_eq!(session.state().ref_speed, 0.224, epsilon = 1e-12);
        assert_eq!(session.last_output().unwrap().trajectory.len(), 50);
    }

    #[test]
    fn test_session_state_carries_over() {
        let planner = planner();
        let mut session = TelemetrySession::new(&planner);
        let frame = telemetry_frame(&planner, json!([]));
        for _ in 0..3 {
            session.handle_frame(&frame).unwrap();
        }
        assert_abs_diff_eq!(session.state().ref_speed, 3.0 * 0.224, epsilon = 1e-9);
    }

    #[test]
    fn test_session_manual_and_ignored_frames() {
        let planner = planner();
        let mut session = TelemetrySession::new(&planner);

        assert_eq!(session.handle_frame("0{\"sid\":\"abc\"}"), None);
        assert_eq!(session.handle_frame("42"), None);
        for frame in ["42[\"telemetry\",null]", "42[\"telemetry\",{\"x\":]"] {
            assert_eq!(session.handle_frame(frame).as_deref(), Some(MANUAL_DIRECTIVE));
        }
        assert_eq!(session.handle_frame("42[\"ping\",{}]"), None);
        assert_eq!(session.state(), PlannerState::default());
        assert!(session.last_output().is_none());
    }
}
