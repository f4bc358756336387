use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::graph::Graph;

pub const DEFAULT_WEIGHT: f64 = 1.0;
pub const DEFAULT_MIN_SIZE: f64 = 1.0;
pub const DEFAULT_TIMEOUT_SECS: f64 = 60.0;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_squared(&self, other: &Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }
}

impl std::fmt::Display for Point {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.2}, {:.2})", self.x, self.y)
    }
}

/// Placement of the boundary in world space: the boundary's lower-left corner
/// sits at `origin` and its x axis is rotated by `angle` radians.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Frame {
    #[serde(default)]
    pub origin: Point,
    #[serde(default)]
    pub angle: f64,
}

impl Frame {
    pub fn new(origin: Point, angle: f64) -> Self {
        Self { origin, angle }
    }

    /// World space to boundary-local space.
    pub fn to_local(&self, p: Point) -> Point {
        let (sin, cos) = self.angle.sin_cos();
        let dx = p.x - self.origin.x;
        let dy = p.y - self.origin.y;
        Point::new(dx * cos + dy * sin, -dx * sin + dy * cos)
    }

    /// Boundary-local space back to world space.
    pub fn to_world(&self, p: Point) -> Point {
        let (sin, cos) = self.angle.sin_cos();
        Point::new(
            self.origin.x + p.x * cos - p.y * sin,
            self.origin.y + p.x * sin + p.y * cos,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Boundary {
    pub width: f64,
    pub height: f64,
    #[serde(default)]
    pub frame: Frame,
}

impl Boundary {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            frame: Frame::default(),
        }
    }

    pub fn with_frame(mut self, frame: Frame) -> Self {
        self.frame = frame;
        self
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    pub fn validate(&self) -> Result<()> {
        let ok = |v: f64| v.is_finite() && v > 0.0;
        if ok(self.width) && ok(self.height) {
            Ok(())
        } else {
            Err(Error::InvalidBoundary {
                width: self.width,
                height: self.height,
            })
        }
    }
}

impl std::fmt::Display for Boundary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// A room that should sit close to a point given in world coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixedRoom {
    pub room: String,
    pub point: Point,
}

impl FixedRoom {
    pub fn new(room: impl Into<String>, point: Point) -> Self {
        Self {
            room: room.into(),
            point,
        }
    }

    /// Pairs parallel lists of room labels and target points.
    pub fn zip(rooms: Vec<String>, points: Vec<Point>) -> Result<Vec<FixedRoom>> {
        if rooms.len() != points.len() {
            return Err(Error::FixedRoomCountMismatch {
                rooms: rooms.len(),
                points: points.len(),
            });
        }
        Ok(rooms
            .into_iter()
            .zip(points)
            .map(|(room, point)| FixedRoom { room, point })
            .collect())
    }
}

/// User-facing tuning knobs. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub w_fixed_rooms: Option<f64>,
    pub w_areas: Option<f64>,
    pub w_proportions: Option<f64>,
    pub min_size: Option<f64>,
    /// Total search budget in seconds.
    pub timeout: Option<f64>,
}

impl Settings {
    pub fn weights(&self) -> Weights {
        Weights::normalized(
            self.w_fixed_rooms.unwrap_or(DEFAULT_WEIGHT),
            self.w_areas.unwrap_or(DEFAULT_WEIGHT),
            self.w_proportions.unwrap_or(DEFAULT_WEIGHT),
        )
    }

    pub fn min_size(&self) -> f64 {
        self.min_size.unwrap_or(DEFAULT_MIN_SIZE)
    }

    /// Budgets too large to represent saturate at `Duration::MAX`.
    pub fn timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.timeout.unwrap_or(DEFAULT_TIMEOUT_SECS))
            .unwrap_or(Duration::MAX)
    }

    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("w_fixed_rooms", self.w_fixed_rooms),
            ("w_areas", self.w_areas),
            ("w_proportions", self.w_proportions),
            ("min_size", self.min_size),
        ] {
            if let Some(v) = value
                && (!v.is_finite() || v < 0.0)
            {
                return Err(Error::InvalidSettings(format!(
                    "{name} must be a non-negative number, got {v}"
                )));
            }
        }
        if let Some(t) = self.timeout
            && (!t.is_finite() || t <= 0.0 || Duration::try_from_secs_f64(t).is_err())
        {
            return Err(Error::InvalidSettings(format!(
                "timeout must be a positive number of seconds, got {t}"
            )));
        }
        Ok(())
    }
}

/// Objective weights, normalized to sum to 1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Weights {
    pub fixed_rooms: f64,
    pub areas: f64,
    pub proportions: f64,
}

impl Weights {
    pub fn normalized(fixed_rooms: f64, areas: f64, proportions: f64) -> Self {
        let total = fixed_rooms + areas + proportions;
        if total <= 0.0 || !total.is_finite() {
            return Self::normalized(DEFAULT_WEIGHT, DEFAULT_WEIGHT, DEFAULT_WEIGHT);
        }
        Self {
            fixed_rooms: fixed_rooms / total,
            areas: areas / total,
            proportions: proportions / total,
        }
    }
}

impl Default for Weights {
    fn default() -> Self {
        Self::normalized(DEFAULT_WEIGHT, DEFAULT_WEIGHT, DEFAULT_WEIGHT)
    }
}

/// One output rectangle in boundary-local coordinates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlacedRoom {
    pub label: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub target_area: Option<f64>,
}

impl PlacedRoom {
    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Corners in world space, counter-clockwise from the local origin corner.
    pub fn world_corners(&self, frame: &Frame) -> [Point; 4] {
        [
            Point::new(self.x, self.y),
            Point::new(self.x + self.width, self.y),
            Point::new(self.x + self.width, self.y + self.height),
            Point::new(self.x, self.y + self.height),
        ]
        .map(|p| frame.to_world(p))
    }
}

impl std::fmt::Display for PlacedRoom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {:.2}x{:.2} @ ({:.2}, {:.2})",
            self.label, self.width, self.height, self.x, self.y
        )
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Plan {
    pub rooms: Vec<PlacedRoom>,
    pub row_widths: Vec<f64>,
    pub col_heights: Vec<f64>,
    pub score: f64,
    pub candidates: usize,
    pub graph: Graph,
    pub boundary: Boundary,
}

impl Plan {
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn total_area(&self) -> f64 {
        self.rooms.iter().map(PlacedRoom::area).sum()
    }

    /// Mean absolute deviation of room areas from their targets, in percent.
    pub fn area_error_percent(&self) -> f64 {
        let deviations: Vec<f64> = self
            .rooms
            .iter()
            .filter_map(|r| {
                r.target_area
                    .filter(|t| *t > 0.0)
                    .map(|t| (r.area() - t).abs() / t)
            })
            .collect();
        if deviations.is_empty() {
            return 0.0;
        }
        deviations.iter().sum::<f64>() / deviations.len() as f64 * 100.0
    }
}
