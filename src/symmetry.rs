//! Rotated and mirrored variants of a mapped graph.
//!
//! A dissection library lists each layout once; its symmetric counterparts
//! are generated here. Every variant is an independent copy of its source.

use crate::graph::{Graph, Room};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mirror {
    /// Reflect the row spans (left/right along the width).
    Rows,
    /// Reflect the column spans (bottom/top along the height).
    Cols,
    Both,
}

impl Mirror {
    pub const ALL: [Mirror; 3] = [Mirror::Rows, Mirror::Cols, Mirror::Both];
}

impl Graph {
    /// Quarter turn of the grid: every room's row and column spans swap.
    pub fn rotated(&self) -> Graph {
        let mut out = self.clone();
        for room in &mut out.rooms {
            std::mem::swap(&mut room.rows, &mut room.cols);
        }
        out
    }

    /// Reflects spans around the largest index used on the mirrored axis.
    pub fn mirrored(&self, mirror: Mirror) -> Graph {
        let mut out = self.clone();
        let max_row = max_index(&self.rooms, |r| &r.rows);
        let max_col = max_index(&self.rooms, |r| &r.cols);
        for room in &mut out.rooms {
            if matches!(mirror, Mirror::Rows | Mirror::Both) {
                room.rows = reflect(&room.rows, max_row);
            }
            if matches!(mirror, Mirror::Cols | Mirror::Both) {
                room.cols = reflect(&room.cols, max_col);
            }
        }
        out
    }

    pub fn mirrors(&self) -> [Graph; 3] {
        Mirror::ALL.map(|m| self.mirrored(m))
    }
}

fn max_index(rooms: &[Room], span: impl Fn(&Room) -> &Vec<usize>) -> usize {
    rooms
        .iter()
        .filter_map(|r| span(r).last().copied())
        .max()
        .unwrap_or(0)
}

fn reflect(span: &[usize], max: usize) -> Vec<usize> {
    span.iter().rev().map(|&i| max.saturating_sub(i)).collect()
}

/// Candidate layouts for one mapped graph: the graph itself and its quarter
/// turn, plus its three mirror images when `orientation_matters` (fixed-room
/// targets make a mirrored layout score differently).
pub fn expand(mapped: Graph, orientation_matters: bool) -> Vec<Graph> {
    let mut out = Vec::with_capacity(if orientation_matters { 5 } else { 2 });
    out.push(mapped.rotated());
    if orientation_matters {
        out.extend(mapped.mirrors());
    }
    out.insert(0, mapped);
    out
}
