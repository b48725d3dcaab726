//! Visualization utilities for highway_planner
//!
//! Thin gnuplot wrapper for drawing the track, its lanes, surrounding
//! traffic and planned trajectories.

use gnuplot::{AutoOption, AxesCommon, Caption, Color, Figure, LineWidth, PointSize, PointSymbol};

use crate::common::{PlannerError, PlannerResult, Point2D, Pose2D, TrackedVehicle, Trajectory};
use crate::map::{RoadConfig, WaypointMap};

/// Color palette for consistent styling
pub mod colors {
    pub const BLACK: &str = "#000000";
    pub const RED: &str = "#FF0000";
    pub const BLUE: &str = "#0000FF";
    pub const CYAN: &str = "#00FFFF";
    pub const ORANGE: &str = "#FFA500";
    pub const GRAY: &str = "#808080";

    pub const ROAD_EDGE: &str = BLACK;
    pub const LANE_DIVIDER: &str = GRAY;
    pub const TRAJECTORY: &str = RED;
    pub const EGO: &str = CYAN;
    pub const EGO_HISTORY: &str = BLUE;
    pub const TRAFFIC: &str = ORANGE;
}

/// Style for path rendering
#[derive(Debug, Clone)]
pub struct PathStyle {
    pub color: String,
    pub line_width: f64,
    pub caption: String,
}

impl PathStyle {
    pub fn new(color: &str, caption: &str) -> Self {
        Self {
            color: color.to_string(),
            line_width: 2.0,
            caption: caption.to_string(),
        }
    }

    pub fn with_line_width(mut self, width: f64) -> Self {
        self.line_width = width;
        self
    }
}

impl Default for PathStyle {
    fn default() -> Self {
        Self {
            color: colors::TRAJECTORY.to_string(),
            line_width: 2.0,
            caption: "Trajectory".to_string(),
        }
    }
}

/// Style for point rendering
#[derive(Debug, Clone)]
pub struct PointStyle {
    pub color: String,
    pub size: f64,
    pub symbol: char,
    pub caption: String,
}

impl PointStyle {
    pub fn new(color: &str, caption: &str) -> Self {
        Self {
            color: color.to_string(),
            size: 1.0,
            symbol: 'O',
            caption: caption.to_string(),
        }
    }

    pub fn with_size(mut self, size: f64) -> Self {
        self.size = size;
        self
    }

    pub fn with_symbol(mut self, symbol: char) -> Self {
        self.symbol = symbol;
        self
    }
}

/// Lateral offsets of every lane boundary, innermost first
pub fn lane_boundaries(road: &RoadConfig) -> Vec<f64> {
    (0..=road.num_lanes).map(|i| i as f64 * road.lane_width).collect()
}

/// Closed polyline at lateral offset `d` from the reference line
pub fn offset_polyline(map: &WaypointMap, d: f64) -> Vec<Point2D> {
    let mut line: Vec<Point2D> = map.waypoints().iter().map(|wp| wp.offset(d)).collect();
    if let Some(&first) = line.first() {
        line.push(first);
    }
    line
}

pub struct Visualizer {
    figure: Figure,
    title: String,
    x_label: String,
    y_label: String,
    x_range: Option<(f64, f64)>,
    y_range: Option<(f64, f64)>,
    aspect_ratio: Option<f64>,
}

impl Visualizer {
    pub fn new() -> Self {
        Self {
            figure: Figure::new(),
            title: String::new(),
            x_label: "X [m]".to_string(),
            y_label: "Y [m]".to_string(),
            x_range: None,
            y_range: None,
            aspect_ratio: Some(1.0),
        }
    }

    pub fn set_title(&mut self, title: &str) -> &mut Self {
        self.title = title.to_string();
        self
    }

    pub fn set_x_range(&mut self, min: f64, max: f64) -> &mut Self {
        self.x_range = Some((min, max));
        self
    }

    pub fn set_y_range(&mut self, min: f64, max: f64) -> &mut Self {
        self.y_range = Some((min, max));
        self
    }

    /// Zoom onto a square window of half-size `radius` around `center`
    pub fn focus_on(&mut self, center: Point2D, radius: f64) -> &mut Self {
        self.set_x_range(center.x - radius, center.x + radius);
        self.set_y_range(center.y - radius, center.y + radius)
    }

    pub fn plot_path(&mut self, points: &[Point2D], style: &PathStyle) -> &mut Self {
        let x: Vec<f64> = points.iter().map(|p| p.x).collect();
        let y: Vec<f64> = points.iter().map(|p| p.y).collect();

        self.figure.axes2d()
            .lines(&x, &y, &[
                Caption(&style.caption),
                Color(&style.color),
                LineWidth(style.line_width),
            ]);
        self
    }

    pub fn plot_points(&mut self, points: &[Point2D], style: &PointStyle) -> &mut Self {
        let x: Vec<f64> = points.iter().map(|p| p.x).collect();
        let y: Vec<f64> = points.iter().map(|p| p.y).collect();

        self.figure.axes2d()
            .points(&x, &y, &[
                Caption(&style.caption),
                Color(&style.color),
                PointSymbol(style.symbol),
                PointSize(style.size),
            ]);
        self
    }

    /// Road edges and lane dividers
    pub fn plot_track(&mut self, map: &WaypointMap, road: &RoadConfig) -> &mut Self {
        let boundaries = lane_boundaries(road);
        let last = boundaries.len() - 1;
        for (i, &d) in boundaries.iter().enumerate() {
            let line = offset_polyline(map, d);
            let style = if i == 0 || i == last {
                let caption = if i == 0 { "Road edge" } else { "" };
                PathStyle::new(colors::ROAD_EDGE, caption).with_line_width(1.5)
            } else {
                let caption = if i == 1 { "Lane divider" } else { "" };
                PathStyle::new(colors::LANE_DIVIDER, caption).with_line_width(0.5)
            };
            self.plot_path(&line, &style);
        }
        self
    }

    pub fn plot_trajectory(&mut self, trajectory: &Trajectory, style: &PathStyle) -> &mut Self {
        self.plot_path(&trajectory.points, style)
    }

    pub fn plot_vehicles(&mut self, vehicles: &[TrackedVehicle]) -> &mut Self {
        let points: Vec<Point2D> = vehicles.iter().map(|v| Point2D::new(v.x, v.y)).collect();
        let style = PointStyle::new(colors::TRAFFIC, "Traffic").with_symbol('S').with_size(1.2);
        self.plot_points(&points, &style)
    }

    /// Ego position with a short heading indicator
    pub fn plot_ego(&mut self, pose: &Pose2D, size: f64) -> &mut Self {
        self.figure.axes2d()
            .points(&[pose.x], &[pose.y], &[
                Caption("Ego"),
                Color(colors::EGO),
                PointSymbol('O'),
                PointSize(size),
            ]);

        let arrow_len = size * 2.0;
        let end_x = pose.x + arrow_len * pose.yaw.cos();
        let end_y = pose.y + arrow_len * pose.yaw.sin();

        self.figure.axes2d()
            .lines(&[pose.x, end_x], &[pose.y, end_y], &[
                Color(colors::EGO),
                LineWidth(2.0),
            ]);
        self
    }

    pub fn save_png(&mut self, path: &str, width: u32, height: u32) -> PlannerResult<()> {
        self.apply_settings();
        self.figure
            .save_to_png(path, width, height)
            .map_err(|e| PlannerError::VisualizationError(e.to_string()))
    }

    fn apply_settings(&mut self) {
        let axes = self.figure.axes2d();

        if !self.title.is_empty() {
            axes.set_title(&self.title, &[]);
        }
        axes.set_x_label(&self.x_label, &[]);
        axes.set_y_label(&self.y_label, &[]);

        if let Some((min, max)) = self.x_range {
            axes.set_x_range(AutoOption::Fix(min), AutoOption::Fix(max));
        }
        if let Some((min, max)) = self.y_range {
            axes.set_y_range(AutoOption::Fix(min), AutoOption::Fix(max));
        }
        if let Some(ratio) = self.aspect_ratio {
            axes.set_aspect_ratio(AutoOption::Fix(ratio));
        }
    }
}

impl Default for Visualizer {
    fn default() -> Self {
        Self::new()
    }
}
