//! Line-oriented simulator bridge
//!
//! Reads one simulator frame per line from stdin and writes the reply frame,
//! if any, to stdout. Logs go to stderr.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use highway_planner::map::{stadium_track, WaypointMap};
use highway_planner::telemetry::TelemetrySession;
use highway_planner::{HighwayPlanner, PlannerConfig, PlannerResult, Point2D};

#[derive(Parser, Debug)]
#[command(name = "highway-planner")]
#[command(
    about = "Plan highway trajectories for simulator telemetry read from stdin",
    long_about = None
)]
struct Args {
    /// Waypoint table with `x y s dx dy` rows (built-in stadium track if omitted)
    #[arg(short, long)]
    map: Option<PathBuf>,

    /// Track length of the waypoint table [m] (`road.max_s` from the config if omitted)
    #[arg(long)]
    max_s: Option<f64>,

    /// YAML planner configuration
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable debug logging
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
            info!(
                "no waypoint table given, using the built-in stadium track ({:.3} m)",
                map.max_s()
            );
            config.road.max_s = map.max_s();
            map
        }
    };

    let planner = HighwayPlanner::new(map, config)?;
    let mut session = TelemetrySession::new(&planner);

    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut out = stdout.lock();
    for line in stdin.lock().lines() {
        let line = line?;
        if let Some(reply) = session.handle_frame(line.trim_end()) {
            writeln!(out, "{}", reply)?;
            out.flush()?;
        }
    }
    info!("input closed, final state {:?}", session.state());
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
