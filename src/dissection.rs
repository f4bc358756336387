//! Library of precomputed rectangular dissections, grouped by room count.
//!
//! Each set is a JSON array of `{ nodes, edges, rooms }` records, where every
//! room is `[rowSpan, colSpan]`. Sets for 1 to 4 rooms are bundled; larger
//! sets are loaded from `dissections_{n}_rooms.json` files on disk.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::graph::{Edge, Graph, MAX_NODES, Room};

const BUNDLED: [(usize, &str); 4] = [
    (1, include_str!("../data/dissections_1_rooms.json")),
    (2, include_str!("../data/dissections_2_rooms.json")),
    (3, include_str!("../data/dissections_3_rooms.json")),
    (4, include_str!("../data/dissections_4_rooms.json")),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DissectionDescriptor {
    pub nodes: Vec<u32>,
    pub edges: Vec<[u32; 2]>,
    pub rooms: Vec<[Vec<usize>; 2]>,
}

impl DissectionDescriptor {
    /// Converts the record into a graph with stringified node ids.
    pub fn to_graph(&self) -> Graph {
        Graph::new(
            self.nodes.iter().map(u32::to_string),
            self.edges
                .iter()
                .map(|[a, b]| Edge::new(a.to_string(), b.to_string())),
        )
        .with_rooms(
            self.rooms
                .iter()
                .map(|[rows, cols]| Room::new(rows.clone(), cols.clone()))
                .collect(),
        )
    }

    fn validate(&self) -> std::result::Result<(), String> {
        if self.rooms.len() != self.nodes.len() {
            return Err(format!(
                "{} rooms for {} nodes",
                self.rooms.len(),
                self.nodes.len()
            ));
        }
        for (i, [rows, cols]) in self.rooms.iter().enumerate() {
            for span in [rows, cols] {
                if span.is_empty() {
                    return Err(format!("room {i} has an empty span"));
                }
                if span.windows(2).any(|w| w[1] != w[0] + 1) {
                    return Err(format!("room {i} span {span:?} is not ascending and contiguous"));
                }
            }
        }
        for [a, b] in &self.edges {
            if !self.nodes.contains(a) || !self.nodes.contains(b) {
                return Err(format!("edge {a}-{b} references an unknown node"));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct DissectionLibrary {
    sets: BTreeMap<usize, Vec<DissectionDescriptor>>,
}

impl DissectionLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// The dissection sets compiled into the crate.
    pub fn bundled() -> Result<Self> {
        let mut lib = Self::new();
        for (rooms, json) in BUNDLED {
            lib.insert_json(rooms, json)?;
        }
        Ok(lib)
    }

    /// Loads every `dissections_{n}_rooms.json` present in `dir`, for
    /// `n` in `1..=MAX_NODES`, on top of the current sets.
    pub fn load_dir(&mut self, dir: &Path) -> Result<usize> {
        let mut loaded = 0;
        for rooms in 1..=MAX_NODES {
            let path = dir.join(format!("dissections_{rooms}_rooms.json"));
            if !path.is_file() {
                continue;
            }
            let json = std::fs::read_to_string(&path).map_err(|source| Error::ReadLibrary {
                path: path.clone(),
                source,
            })?;
            self.insert_json(rooms, &json)?;
            tracing::debug!(path = %path.display(), rooms, "loaded dissection set");
            loaded += 1;
        }
        Ok(loaded)
    }

    /// Parses and validates a JSON dissection set, replacing any existing set
    /// for the same room count.
    pub fn insert_json(&mut self, rooms: usize, json: &str) -> Result<()> {
        let descriptors: Vec<DissectionDescriptor> =
            serde_json::from_str(json).map_err(|source| Error::ParseLibrary { rooms, source })?;
        self.insert(rooms, descriptors)
    }

    pub fn insert(&mut self, rooms: usize, descriptors: Vec<DissectionDescriptor>) -> Result<()> {
        for (index, d) in descriptors.iter().enumerate() {
            let mut check = d.validate();
            if check.is_ok() && d.nodes.len() != rooms {
                check = Err(format!("{} nodes in a {rooms}-room set", d.nodes.len()));
            }
            check.map_err(|message| Error::InvalidDissection {
                rooms,
                index,
                message,
            })?;
        }
        self.sets.insert(rooms, descriptors);
        Ok(())
    }

    pub fn get(&self, rooms: usize) -> Result<&[DissectionDescriptor]> {
        self.sets
            .get(&rooms)
            .map(Vec::as_slice)
            .ok_or(Error::MissingDissections { rooms })
    }

    pub fn room_counts(&self) -> impl Iterator<Item = usize> + '_ {
        self.sets.keys().copied()
    }
}
