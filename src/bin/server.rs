use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use room_planner::Error;
use room_planner::dissection::DissectionLibrary;
use room_planner::graph::Graph;
use room_planner::objective::SpacingPolicy;
use room_planner::solver::{SearchOptions, Solver};
use room_planner::types::{Boundary, FixedRoom, PlacedRoom, Point, Settings};
use serde::{Deserialize, Serialize};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

#[derive(Deserialize, Serialize)]
struct PlanRequest {
    nodes: Vec<String>,
    #[serde(default)]
    edges: Vec<String>,
    areas: Vec<f64>,
    boundary: Boundary,
    #[serde(default)]
    fixed_rooms: Vec<FixedRoom>,
    #[serde(default)]
    settings: Settings,
    #[serde(default)]
    spacing: SpacingPolicy,
}

#[derive(Serialize)]
struct PlanResponse {
    rooms: Vec<RoomResponse>,
    boundary: Boundary,
    row_widths: Vec<f64>,
    col_heights: Vec<f64>,
    score: f64,
    candidates: usize,
    area_error_percent: f64,
}

#[derive(Serialize)]
struct RoomResponse {
    #[serde(flatten)]
    room: PlacedRoom,
    world_corners: [Point; 4],
}

fn error_status(err: &Error) -> StatusCode {
    if err.is_validation() {
        StatusCode::BAD_REQUEST
    } else if matches!(err, Error::NoFeasibleLayout | Error::NoSolution) {
        StatusCode::UNPROCESSABLE_ENTITY
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

fn reject(err: Error) -> (StatusCode, String) {
    let status = error_status(&err);
    if status.is_server_error() {
        tracing::error!(error = %err, "plan request failed");
    } else {
        tracing::warn!(error = %err, "plan request rejected");
    }
    (status, err.to_string())
}

async fn plan(
    State(library): State<Arc<DissectionLibrary>>,
    Json(req): Json<PlanRequest>,
) -> Result<Json<PlanResponse>, (StatusCode, String)> {
    tracing::info!(
        body = serde_json::to_string(&req).unwrap_or_default(),
        "POST /plan"
    );

    let graph = Graph::requirement(&req.nodes, &req.edges, &req.areas).map_err(reject)?;
    let frame = req.boundary.frame;
    let options = SearchOptions {
        spacing: req.spacing,
        ..Default::default()
    };
    let solver = Solver::new(graph, req.boundary, req.fixed_rooms, req.settings).with_options(options);

    // The search is CPU bound and may run for the whole timeout.
    let result = tokio::task::spawn_blocking(move || solver.solve(&library))
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    let plan = result.map_err(reject)?;

    let area_error_percent = plan.area_error_percent();
    let response = PlanResponse {
        rooms: plan
            .rooms
            .into_iter()
            .map(|room| RoomResponse {
                world_corners: room.world_corners(&frame),
                room,
            })
            .collect(),
        boundary: plan.boundary,
        row_widths: plan.row_widths,
        col_heights: plan.col_heights,
        score: plan.score,
        candidates: plan.candidates,
        area_error_percent,
    };

    Ok(Json(response))
}

fn load_library() -> room_planner::Result<DissectionLibrary> {
    let mut library = DissectionLibrary::bundled()?;
    if let Ok(dir) = std::env::var("DISSECTIONS_DIR") {
        let loaded = library.load_dir(&PathBuf::from(&dir))?;
        tracing::info!(dir = %dir, loaded, "loaded dissection sets");
    }
    Ok(library)
}

#[tokio::main]
async fn main() {
    let _sentry = sentry::init(sentry::ClientOptions {
        dsn: std::env::var("SENTRY_DSN").ok().and_then(|dsn| dsn.parse().ok()),
        ..Default::default()
    });

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open("development.log")
        .expect("failed to open development.log");

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_target(false)
        .with_ansi(false)
        .with_max_level(Level::INFO)
        .init();

    let library = load_library().expect("failed to load dissection library");

    let port = std::env::var("PORT").unwrap_or_else(|_| "3001".to_string());
    let addr = format!("0.0.0.0:{port}");

    let app = Router::new()
        .route("/up", get(|| async { "ok" }))
        .route("/plan", post(plan))
        .with_state(Arc::new(library))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        );

    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();
    eprintln!("Listening on {addr}");
    axum::serve(listener, app).await.unwrap();
}
