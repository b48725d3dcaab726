//! Error types for highway_planner

use thiserror::Error;

/// Main error type for the planning core and its collaborators
#[derive(Debug, Error)]
pub enum PlannerError {
    /// Waypoint table cannot support any transform (empty, single point, bad s ordering)
    #[error("Invalid map: {0}")]
    InvalidMap(String),
    /// A line of the waypoint table could not be parsed
    #[error("Map parse error at line {line}: {reason}")]
    MapParse { line: usize, reason: String },
    /// Invalid parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
    /// Numerical computation failed (singular system, non-monotonic knots, etc.)
    #[error("Numerical error: {0}")]
    NumericalError(String),
    /// I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
    /// Telemetry frame could not be decoded or encoded
    #[error("Telemetry error: {0}")]
    TelemetryError(#[from] serde_json::Error),
    /// Configuration file could not be decoded
    #[error("Config error: {0}")]
    ConfigError(#[from] serde_yaml::Error),
    /// Visualization error
    #[error("Visualization error: {0}")]
    VisualizationError(String),
}

impl PlannerError {
    pub fn invalid_map(msg: impl Into<String>) -> Self {
        Self::InvalidMap(msg.into())
    }

    pub fn invalid_parameter(msg: impl Into<String>) -> Self {
        Self::InvalidParameter(msg.into())
    }
}

/// Result type alias for planner operations
pub type PlannerResult<T> = Result<T, PlannerError>;
