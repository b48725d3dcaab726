//! Closed-loop highway simulation
//!
//! Drives the planner against seeded random traffic and optionally saves a
//! plot of the final scene.

use std::io;
use std::path::PathBuf;

use clap::Parser;
use itertools::Itertools;
use tracing::{debug, error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use highway_planner::map::{stadium_track, WaypointMap};
use highway_planner::simulation::{Simulation, SimulationConfig};
use highway_planner::utils::{colors, PathStyle, Visualizer};
use highway_planner::{
    HighwayPlanner, LaneSelector, PlannerConfig, PlannerResult, Point2D, Trajectory,
};

#[derive(Parser, Debug)]
#[command(name = "highway-sim")]
#[command(about = "Run the highway planner against simulated traffic", long_about = None)]
struct Args {
    /// Planning ticks to simulate
    #[arg(short, long, default_value = "1000")]
    ticks: usize,

    /// Traffic seed
    #[arg(short, long, default_value = "42")]
    seed: u64,

    /// Number of traffic vehicles
    #[arg(long, default_value = "12")]
    vehicles: usize,

    /// Trajectory points driven per planning tick
    #[arg(long, default_value = "10")]
    consume: usize,

    /// Waypoint table with `x y s dx dy` rows (built-in stadium track if omitted)
    #[arg(short, long)]
    map: Option<PathBuf>,

    /// Track length of the waypoint table [m] (`road.max_s` from the config if omitted)
    #[arg(long)]
    max_s: Option<f64>,

    /// YAML planner configuration
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Save the final scene to this PNG file
    #[arg(long)]
    plot: Option<String>,

    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("failed to set tracing subscriber: {}", e);
    }
}

fn plot_scene<S: LaneSelector>(sim: &Simulation<S>, path: &str) -> PlannerResult<()> {
    let planner = sim.planner();
    let ego = sim.ego();

    let driven_style = PathStyle::new(colors::EGO_HISTORY, "Driven").with_line_width(1.0);
    let mut vis = Visualizer::new();
    vis.set_title("Highway planner")
        .focus_on(ego.position(), 150.0)
        .plot_track(planner.map(), &planner.config().road)
        .plot_path(sim.ego_history(), &driven_style)
        .plot_trajectory(sim.last_trajectory(), &PathStyle::default())
        .plot_vehicles(&sim.sensor_fusion())
        .plot_ego(&ego.pose(), 1.5);
    vis.save_png(path, 1000, 1000)?;
    info!("scene saved to {}", path);
    Ok(())
}

fn run(args: &Args) -> PlannerResult<()> {
    let mut config = match &args.config {
        Some(path) => PlannerConfig::from_file(path)?,
        None => PlannerConfig::default(),
    };
    let map = match &args.map {
        Some(path) => {
            config.road.max_s = args.max_s.unwrap_or(config.road.max_s);
            WaypointMap::from_file(path, config.road.max_s)?
        }
        None => {
            let map = stadium_track(Point2D::new(1000.0, 2000.0), 2000.0, 400.0, 30.0)?;
            config.road.max_s = map.max_s();
            map
        }
    };
    let planner = HighwayPlanner::new(map, config)?;

    let sim_config = SimulationConfig {
        seed: args.seed,
        num_vehicles: args.vehicles,
        consume_per_tick: args.consume,
        ..Default::default()
    };
    let mut sim = Simulation::new(planner, sim_config)?;

    let start = std::time::Instant::now();
    let steps = sim.run(args.ticks);
    let elapsed = start.elapsed();

    for step in steps.iter().filter(|s| s.tick % 50 == 0) {
        debug!(
            "tick {:5} | s {:8.1} | lane {} | speed {:5.2} | gap {:7.1}",
            step.tick, step.ego.s, step.lane, step.ref_speed, step.nearest_gap
        );
    }

    let lane_changes = steps.iter().tuple_windows().filter(|(a, b)| a.lane != b.lane).count();
    let slowdowns = steps.iter().filter(|s| s.decision.too_close).count();
    let off_lane = steps.iter().filter(|s| s.ego_lane.is_none()).count();
    let driven = Trajectory::from_points(sim.ego_history().to_vec()).total_length();
    let min_gap = steps.iter().map(|s| s.nearest_gap).fold(f64::INFINITY, f64::min);
    let mean_speed = if steps.is_empty() {
        0.0
    } else {
        steps.iter().map(|s| s.ref_speed).sum::<f64>() / steps.len() as f64
    };

    info!("{} ticks planned in {:.2?}, {:.1} m driven", steps.len(), elapsed, driven);
    info!(
        "lane changes: {} | ticks following: {} | ticks off lane: {}",
        lane_changes, slowdowns, off_lane
    );
    info!("mean ref speed: {:.2} | min gap ahead: {:.1} m", mean_speed, min_gap);

    if let Some(path) = &args.plot {
        plot_scene(&sim, path)?;
    }
    Ok(())
}

fn main() {
    let args = Args::parse();
    init_logging(args.verbose);

    if let Err(e) = run(&args) {
        error!("{}", e);
        std::process::exit(1);
    }
}
