use serde::{Deserialize, Serialize};

use crate::graph::Graph;
use crate::types::{Boundary, Point, Weights};

/// Penalty per unit a row or column falls short of the minimum size.
const MIN_SIZE_PENALTY: f64 = 10.0;
/// Scale applied to the squared area mismatch.
const AREA_SCALE: f64 = 0.1;
/// Aspect ratio that scores zero in the proportion term. Squarer rooms score
/// below zero, longer ones above.
const PROPORTION_BASELINE: f64 = 2.0;
/// Floor for room dimensions in the aspect ratio.
const MIN_DIMENSION: f64 = 0.01;

/// How the optimizer's free vector is turned into row widths and column
/// heights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpacingPolicy {
    /// One value per row and column; each axis is scaled so it sums to the
    /// boundary's extent.
    #[default]
    Normalize,
    /// One value per row and column except the last of each axis. Values are
    /// fractions of the extent; the last element takes the remainder.
    Remainder,
}

impl SpacingPolicy {
    pub fn dimension(self, x_len: usize, y_len: usize) -> usize {
        match self {
            SpacingPolicy::Normalize => x_len + y_len,
            SpacingPolicy::Remainder => x_len.saturating_sub(1) + y_len.saturating_sub(1),
        }
    }

    /// Uniform spacing expressed in this policy's free variables.
    pub fn starting_point(self, x_len: usize, y_len: usize) -> Vec<f64> {
        let free = |len: usize| match self {
            SpacingPolicy::Normalize => len,
            SpacingPolicy::Remainder => len.saturating_sub(1),
        };
        let share = |len: usize| 1.0 / len.max(1) as f64;
        std::iter::repeat_n(share(x_len), free(x_len))
            .chain(std::iter::repeat_n(share(y_len), free(y_len)))
            .collect()
    }

    pub fn spacing(self, z: &[f64], x_len: usize, y_len: usize, width: f64, height: f64) -> Spacing {
        match self {
            SpacingPolicy::Normalize => {
                let (xs, ys) = split(z, x_len);
                Spacing {
                    rows: normalize(xs, x_len, width),
                    cols: normalize(ys, y_len, height),
                }
            }
            SpacingPolicy::Remainder => {
                let (xs, ys) = split(z, x_len.saturating_sub(1));
                Spacing {
                    rows: remainder(xs, x_len, width),
                    cols: remainder(ys, y_len, height),
                }
            }
        }
    }
}

impl std::str::FromStr for SpacingPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, String> {
        match s {
            "normalize" => Ok(SpacingPolicy::Normalize),
            "remainder" => Ok(SpacingPolicy::Remainder),
            _ => Err(format!(
                "invalid spacing policy '{s}', expected: normalize or remainder"
            )),
        }
    }
}

fn split(z: &[f64], at: usize) -> (&[f64], &[f64]) {
    z.split_at(at.min(z.len()))
}

fn normalize(raw: &[f64], len: usize, total: f64) -> Vec<f64> {
    let raw = &raw[..len.min(raw.len())];
    let sum: f64 = raw.iter().sum();
    let scale = total / sum;
    if raw.len() == len && scale.is_finite() {
        raw.iter().map(|v| v * scale).collect()
    } else {
        vec![total / len.max(1) as f64; len]
    }
}

fn remainder(raw: &[f64], len: usize, total: f64) -> Vec<f64> {
    if len == 0 {
        return Vec::new();
    }
    let mut out: Vec<f64> = raw.iter().take(len - 1).map(|v| v * total).collect();
    out.resize(len - 1, total / len as f64);
    let used: f64 = out.iter().sum();
    out.push(total - used);
    out
}

/// Absolute row widths (along the boundary's width) and column heights.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Spacing {
    pub rows: Vec<f64>,
    pub cols: Vec<f64>,
}

/// Number of rows and columns a graph's room layout spans.
pub fn grid_dims(graph: &Graph) -> (usize, usize) {
    let rooms = graph.rooms();
    let rows = rooms.iter().filter_map(|r| r.rows.last()).max();
    let cols = rooms.iter().filter_map(|r| r.cols.last()).max();
    (rows.map_or(0, |m| m + 1), cols.map_or(0, |m| m + 1))
}

/// A fixed room resolved to its node index, with its target point in
/// boundary-local coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedTarget {
    pub room: usize,
    pub point: Point,
}

/// Scoring context for one candidate layout. Lower scores are better.
#[derive(Debug, Clone)]
pub struct Objective<'a> {
    pub graph: &'a Graph,
    pub x_len: usize,
    pub y_len: usize,
    pub width: f64,
    pub height: f64,
    pub weights: Weights,
    pub min_size: f64,
    pub fixed: &'a [FixedTarget],
    pub policy: SpacingPolicy,
}

impl<'a> Objective<'a> {
    pub fn new(
        graph: &'a Graph,
        boundary: &Boundary,
        weights: Weights,
        min_size: f64,
        fixed: &'a [FixedTarget],
        policy: SpacingPolicy,
    ) -> Self {
        let (x_len, y_len) = grid_dims(graph);
        Self {
            graph,
            x_len,
            y_len,
            width: boundary.width,
            height: boundary.height,
            weights,
            min_size,
            fixed,
            policy,
        }
    }

    pub fn dimension(&self) -> usize {
        self.policy.dimension(self.x_len, self.y_len)
    }

    pub fn starting_point(&self) -> Vec<f64> {
        self.policy.starting_point(self.x_len, self.y_len)
    }

    pub fn spacing(&self, z: &[f64]) -> Spacing {
        self.policy
            .spacing(z, self.x_len, self.y_len, self.width, self.height)
    }

    pub fn score(&self, z: &[f64]) -> f64 {
        self.score_spacing(&self.spacing(z))
    }

    pub fn score_spacing(&self, spacing: &Spacing) -> f64 {
        let mut total = 0.0;

        for &v in spacing.rows.iter().chain(&spacing.cols) {
            if v < self.min_size {
                total += (self.min_size - v) * MIN_SIZE_PENALTY;
            }
        }

        if !self.fixed.is_empty() {
            total += self.weights.fixed_rooms * self.fixed_distance(spacing);
        }

        for (i, room) in self.graph.rooms().iter().enumerate() {
            let w = room.width(&spacing.rows);
            let h = room.height(&spacing.cols);
            if let Some(&area) = self.graph.areas().get(i) {
                total += self.weights.areas * (area - w * h).powi(2) * AREA_SCALE;
            }
            total += self.weights.proportions * proportion(w, h);
        }

        total
    }

    /// Sum of squared distances from fixed rooms' centers to their targets.
    fn fixed_distance(&self, spacing: &Spacing) -> f64 {
        self.fixed
            .iter()
            .filter_map(|f| {
                let room = self.graph.rooms().get(f.room)?;
                let center = Point::new(
                    span_center(&room.rows, &spacing.rows),
                    span_center(&room.cols, &spacing.cols),
                );
                Some(center.distance_squared(&f.point))
            })
            .sum()
    }
}

fn span_center(span: &[usize], sizes: &[f64]) -> f64 {
    let (Some(&first), Some(&last)) = (span.first(), span.last()) else {
        return 0.0;
    };
    let start: f64 = sizes.iter().take(first).sum();
    let end: f64 = sizes.iter().take(last + 1).sum();
    (start + end) / 2.0
}

/// Aspect ratio penalty; zero at 2:1.
pub fn proportion(a: f64, b: f64) -> f64 {
    let a = a.max(MIN_DIMENSION);
    let b = b.max(MIN_DIMENSION);
    a.max(b) / a.min(b) - PROPORTION_BASELINE
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Edge, Room};

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "expected {b}, got {a}");
    }

    fn strips() -> Graph {
        Graph::new(["A", "B", "C"], [Edge::new("A", "B"), Edge::new("B", "C")])
            .with_rooms(vec![
                Room::new(vec![0], vec![0]),
                Room::new(vec![1], vec![0]),
                Room::new(vec![2], vec![0]),
            ])
            .with_areas(vec![9.0, 9.0, 9.0])
    }

    fn objective(graph: &Graph, weights: Weights) -> Objective<'_> {
        Objective::new(
            graph,
            &Boundary::new(9.0, 3.0),
            weights,
            1.0,
            &[],
            SpacingPolicy::Normalize,
        )
    }

    #[test]
    fn test_grid_dims() {
        assert_eq!(grid_dims(&strips()), (3, 1));
        assert_eq!(grid_dims(&strips().rotated()), (1, 3));
        assert_eq!(grid_dims(&Graph::default()), (0, 0));
    }

    #[test]
    fn test_normalize_sums_to_extent() {
        let s = SpacingPolicy::Normalize.spacing(&[1.0, 2.0, 3.0, 4.0], 3, 1, 12.0, 4.0);
        assert_eq!(s.rows, vec![2.0, 4.0, 6.0]);
        assert_eq!(s.cols, vec![4.0]);
    }

    #[test]
    fn test_normalize_zero_sum_falls_back_to_even_split() {
        let s = SpacingPolicy::Normalize.spacing(&[0.0, 0.0, 1.0], 2, 1, 10.0, 3.0);
        assert_eq!(s.rows, vec![5.0, 5.0]);
    }

    #[test]
    fn test_remainder_policy() {
        let policy = SpacingPolicy::Remainder;
        assert_eq!(policy.dimension(3, 2), 3);
        assert_eq!(policy.starting_point(3, 2).len(), 3);
        let s = policy.spacing(&[0.25, 0.25, 0.5], 3, 2, 8.0, 4.0);
        assert_eq!(s.rows, vec![2.0, 2.0, 4.0]);
        assert_eq!(s.cols, vec![2.0, 2.0]);
    }

    #[test]
    fn test_spacing_policy_from_str() {
        assert_eq!("remainder".parse::<SpacingPolicy>(), Ok(SpacingPolicy::Remainder));
        assert!("sum".parse::<SpacingPolicy>().is_err());
    }

    #[test]
    fn test_proportion_baseline_is_two_to_one() {
        assert_close(proportion(2.0, 1.0), 0.0);
        assert_close(proportion(1.0, 1.0), -1.0);
        assert_close(proportion(0.0, 1.0), 98.0);
    }

    #[test]
    fn test_uniform_start_scores_squares() {
        let g = strips();
        let obj = objective(&g, Weights::default());
        let start = obj.starting_point();
        assert_eq!(start.len(), obj.dimension());
        // Three exact 3x3 squares: no area error, each proportion term is -1.
        assert_close(obj.score(&start), -1.0);
    }

    #[test]
    fn test_min_size_penalty() {
        let g = Graph::new(["A"], [])
            .with_rooms(vec![Room::new(vec![0], vec![0])])
            .with_areas(vec![1.0]);
        let obj = Objective::new(
            &g,
            &Boundary::new(0.5, 2.0),
            Weights::normalized(0.0, 0.0, 1.0),
            1.0,
            &[],
            SpacingPolicy::Normalize,
        );
        // (1 - 0.5) * 10 below the floor, plus 2 / 0.5 - 2 for proportion.
        assert_close(obj.score(&[1.0, 1.0]), 5.0 + 2.0);
    }

    #[test]
    fn test_area_weight_is_monotonic() {
        let g = strips().with_areas(vec![5.0, 9.0, 9.0]);
        let z = [1.0, 1.0, 1.0, 1.0];
        let mut last = f64::NEG_INFINITY;
        for area_weight in [0.5, 1.0, 2.0, 4.0] {
            let score = objective(&g, Weights::normalized(1.0, area_weight, 1.0)).score(&z);
            assert!(score > last, "score {score} did not increase past {last}");
            last = score;
        }
    }

    #[test]
    fn test_fixed_room_distance() {
        let g = strips();
        let fixed = [FixedTarget {
            room: 0,
            point: Point::new(1.5, 5.5),
        }];
        let weights = Weights::normalized(1.0, 0.0, 0.0);
        let base = Objective::new(&g, &Boundary::new(9.0, 3.0), weights, 1.0, &[], SpacingPolicy::Normalize);
        let with_fixed = Objective { fixed: &fixed, ..base.clone() };
        let z = base.starting_point();
        // Room A's center is (1.5, 1.5); the target is 4 above it.
        assert_close(with_fixed.score(&z) - base.score(&z), 16.0);
    }
}
