//! Track map and coordinate transforms

pub mod road;
pub mod waypoint_map;
pub mod frenet;
pub mod track;

pub use road::RoadConfig;
pub use waypoint_map::{Waypoint, WaypointMap};
pub use frenet::{CoordinateTransformer, FrenetConfig, LateralSign};
pub use track::{circular_track, stadium_track};
