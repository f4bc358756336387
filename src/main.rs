use std::path::PathBuf;

use clap::Parser;
use room_planner::dissection::DissectionLibrary;
use room_planner::graph::Graph;
use room_planner::objective::SpacingPolicy;
use room_planner::render;
use room_planner::solver::{SearchOptions, Solver};
use room_planner::types::{Boundary, FixedRoom, Frame, Point, Settings};
use tracing::Level;

#[derive(Parser)]
#[command(
    name = "room_planner",
    about = "Rectangular floor plan generator from a room adjacency graph"
)]
struct Cli {
    /// Room names, at most 7 (e.g. living kitchen bath)
    #[arg(long, num_args = 1.., required = true)]
    nodes: Vec<String>,

    /// Required adjacencies as a-b (e.g. living-kitchen)
    #[arg(long, num_args = 0..)]
    edges: Vec<String>,

    /// Target area per room, in node order
    #[arg(long, num_args = 1.., required = true)]
    areas: Vec<f64>,

    /// Boundary dimensions (WxH, e.g. 12x8)
    #[arg(long, value_parser = parse_dimensions)]
    boundary: (f64, f64),

    /// World position of the boundary's lower-left corner (X,Y)
    #[arg(long, default_value = "0,0", value_parser = parse_point)]
    origin: Point,

    /// Rotation of the boundary in degrees
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    angle: f64,

    /// Rooms pinned near a world point, as NAME@X,Y
    #[arg(long = "fixed", num_args = 1..)]
    fixed: Vec<String>,

    /// Relative weight of fixed room positions (default: 1)
    #[arg(long)]
    w_fixed: Option<f64>,

    /// Relative weight of room areas (default: 1)
    #[arg(long)]
    w_areas: Option<f64>,

    /// Relative weight of room proportions (default: 1)
    #[arg(long)]
    w_proportions: Option<f64>,

    /// Minimum row/column size (default: 1)
    #[arg(long)]
    min_size: Option<f64>,

    /// Total search time in seconds (default: 60)
    #[arg(long)]
    timeout: Option<f64>,

    /// Directory with dissections_{n}_rooms.json files
    #[arg(long)]
    dissections: Option<PathBuf>,

    /// Worker threads (default: one per core)
    #[arg(long)]
    threads: Option<usize>,

    /// Spacing reconstruction: normalize or remainder
    #[arg(long, default_value = "normalize")]
    spacing: SpacingPolicy,

    /// Show ASCII layout of the plan
    #[arg(long)]
    layout: bool,

    /// Log search progress to stderr
    #[arg(short, long)]
    verbose: bool,
}

fn parse_dimensions(s: &str) -> Result<(f64, f64), String> {
    let (w, h) = s
        .split_once('x')
        .ok_or_else(|| format!("invalid dimensions '{}', expected WxH", s))?;
    let width = w
        .parse::<f64>()
        .map_err(|_| format!("invalid width in '{}'", s))?;
    let height = h
        .parse::<f64>()
        .map_err(|_| format!("invalid height in '{}'", s))?;
    if width <= 0.0 || height <= 0.0 {
        return Err(format!("dimensions must be positive in '{}'", s));
    }
    Ok((width, height))
}

fn parse_point(s: &str) -> Result<Point, String> {
    let (x, y) = s
        .split_once(',')
        .ok_or_else(|| format!("invalid point '{}', expected X,Y", s))?;
    let x = x
        .trim()
        .parse::<f64>()
        .map_err(|_| format!("invalid x in '{}'", s))?;
    let y = y
        .trim()
        .parse::<f64>()
        .map_err(|_| format!("invalid y in '{}'", s))?;
    Ok(Point::new(x, y))
}

fn parse_fixed(s: &str) -> Result<FixedRoom, String> {
    let (room, point) = s
        .split_once('@')
        .ok_or_else(|| format!("invalid fixed room '{}', expected NAME@X,Y", s))?;
    if room.is_empty() {
        return Err(format!("missing room name in '{}'", s));
    }
    Ok(FixedRoom::new(room, parse_point(point)?))
}

fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("Error: {}", message);
    std::process::exit(1);
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::WARN })
        .init();

    let graph = Graph::requirement(&cli.nodes, &cli.edges, &cli.areas).unwrap_or_else(|e| fail(e));

    let fixed: Vec<FixedRoom> = cli
        .fixed
        .iter()
        .map(|f| parse_fixed(f))
        .collect::<Result<Vec<_>, _>>()
        .unwrap_or_else(|e| fail(e));

    let mut library = DissectionLibrary::bundled().unwrap_or_else(|e| fail(e));
    if let Some(dir) = &cli.dissections {
        library.load_dir(dir).unwrap_or_else(|e| fail(e));
    }

    let (width, height) = cli.boundary;
    let frame = Frame::new(cli.origin, cli.angle.to_radians());
    let boundary = Boundary::new(width, height).with_frame(frame);
    let settings = Settings {
        w_fixed_rooms: cli.w_fixed,
        w_areas: cli.w_areas,
        w_proportions: cli.w_proportions,
        min_size: cli.min_size,
        timeout: cli.timeout,
    };
    let options = SearchOptions {
        threads: cli.threads,
        spacing: cli.spacing,
        ..Default::default()
    };

    let plan = Solver::new(graph, boundary, fixed, settings)
        .with_options(options)
        .solve(&library)
        .unwrap_or_else(|e| fail(e));

    let transformed = frame != Frame::default();
    for room in &plan.rooms {
        let target = room
            .target_area
            .map(|t| format!(" (target {:.2})", t))
            .unwrap_or_default();
        println!("{}  area {:.2}{}", room, room.area(), target);
        if transformed {
            let corners: Vec<String> = room
                .world_corners(&frame)
                .iter()
                .map(Point::to_string)
                .collect();
            println!("  world: {}", corners.join(" "));
        }
    }
    if cli.layout {
        println!();
        print!("{}", render::render_plan(&plan));
    }
    println!();

    println!(
        "Summary: {} room{}, score {:.3}, {} candidate{}, {:.1}% area error",
        plan.room_count(),
        if plan.room_count() == 1 { "" } else { "s" },
        plan.score,
        plan.candidates,
        if plan.candidates == 1 { "" } else { "s" },
        plan.area_error_percent(),
    );
}
