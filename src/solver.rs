use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use rayon::prelude::*;

use crate::dissection::{DissectionDescriptor, DissectionLibrary};
use crate::error::{Error, Result};
use crate::graph::{Graph, MAX_NODES};
use crate::nelder_mead::NelderMead;
use crate::objective::{FixedTarget, Objective, Spacing, SpacingPolicy};
use crate::symmetry;
use crate::types::{Boundary, FixedRoom, PlacedRoom, Plan, Settings};

/// Wall-clock cap for optimizing a single candidate.
pub const DEFAULT_CANDIDATE_LIMIT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub candidate_limit: Duration,
    /// Worker threads; `None` uses rayon's global pool.
    pub threads: Option<usize>,
    /// Feed the running best score to each optimizer run as a baseline so
    /// clearly inferior candidates stop early.
    pub short_circuit: bool,
    pub spacing: SpacingPolicy,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            candidate_limit: DEFAULT_CANDIDATE_LIMIT,
            threads: None,
            short_circuit: true,
            spacing: SpacingPolicy::default(),
        }
    }
}

/// An optimized candidate. `index` points into the candidate list.
#[derive(Debug, Clone)]
struct Candidate {
    index: usize,
    score: f64,
    spacing: Spacing,
}

/// Best candidate seen so far, shared by the optimization workers.
#[derive(Debug, Default)]
struct BestRegister {
    best: Mutex<Option<Candidate>>,
}

impl BestRegister {
    fn lock(&self) -> MutexGuard<'_, Option<Candidate>> {
        self.best.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn score(&self) -> Option<f64> {
        self.lock().as_ref().map(|c| c.score)
    }

    /// Keeps `candidate` if it beats the current best. Ties go to the lower
    /// index so the winner does not depend on scheduling.
    fn offer(&self, candidate: Candidate) -> bool {
        let mut best = self.lock();
        let better = best.as_ref().is_none_or(|b| {
            candidate.score < b.score || (candidate.score == b.score && candidate.index < b.index)
        });
        if better {
            *best = Some(candidate);
        }
        better
    }

    fn into_inner(self) -> Option<Candidate> {
        self.best.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

pub struct Solver {
    graph: Graph,
    boundary: Boundary,
    fixed_rooms: Vec<FixedRoom>,
    settings: Settings,
    options: SearchOptions,
}

impl Solver {
    pub fn new(graph: Graph, boundary: Boundary, fixed_rooms: Vec<FixedRoom>, settings: Settings) -> Self {
        Self {
            graph,
            boundary,
            fixed_rooms,
            settings,
            options: SearchOptions::default(),
        }
    }

    pub fn with_options(mut self, options: SearchOptions) -> Self {
        self.options = options;
        self
    }

    /// Checks the inputs and resolves fixed rooms into boundary-local targets.
    pub fn validate(&self) -> Result<Vec<FixedTarget>> {
        self.boundary.validate()?;
        self.settings.validate()?;

        let nodes = self.graph.node_count();
        if nodes == 0 {
            return Err(Error::EmptyGraph);
        }
        if nodes > MAX_NODES {
            return Err(Error::TooManyNodes {
                count: nodes,
                max: MAX_NODES,
            });
        }
        let areas = self.graph.areas().len();
        if areas != 0 && areas != nodes {
            return Err(Error::AreaCountMismatch { nodes, areas });
        }
        if self.fixed_rooms.len() > nodes {
            return Err(Error::TooManyFixedRooms {
                rooms: self.fixed_rooms.len(),
                nodes,
            });
        }

        self.fixed_rooms
            .iter()
            .map(|f| {
                let room = self
                    .graph
                    .node_index(&f.room)
                    .ok_or_else(|| Error::UnknownFixedRoom(f.room.clone()))?;
                Ok(FixedTarget {
                    room,
                    point: self.boundary.frame.to_local(f.point),
                })
            })
            .collect()
    }

    pub fn solve(&self, library: &DissectionLibrary) -> Result<Plan> {
        let fixed = self.validate()?;
        let descriptors = library.get(self.graph.node_count())?;

        match self.options.threads {
            Some(threads) => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .build()
                    .map_err(|e| Error::InvalidSettings(format!("worker pool: {e}")))?;
                pool.install(|| self.search(descriptors, &fixed))
            }
            None => self.search(descriptors, &fixed),
        }
    }

    fn search(&self, descriptors: &[DissectionDescriptor], fixed: &[FixedTarget]) -> Result<Plan> {
        // Mapping and optimization each get half of the total budget.
        let budget = self.settings.timeout() / 2;

        let candidates = self.expand_candidates(descriptors, !fixed.is_empty(), budget);
        if candidates.is_empty() {
            return Err(Error::NoFeasibleLayout);
        }

        let best = self
            .optimize_candidates(&candidates, fixed, budget)
            .ok_or(Error::NoSolution)?;
        tracing::info!(
            score = best.score,
            candidate = best.index,
            candidates = candidates.len(),
            "selected layout"
        );
        Ok(self.build_plan(&candidates, best))
    }

    /// Maps the requirement graph onto every dissection and expands each
    /// mapping into its symmetric variants.
    fn expand_candidates(
        &self,
        descriptors: &[DissectionDescriptor],
        orientation_matters: bool,
        budget: Duration,
    ) -> Vec<Graph> {
        let started = Instant::now();
        let stop = AtomicBool::new(false);

        let candidates: Vec<Graph> = descriptors
            .par_iter()
            .flat_map_iter(|descriptor| {
                if stop.load(Ordering::Relaxed) {
                    return Vec::new();
                }
                let target = descriptor.to_graph();
                let expanded: Vec<Graph> = self
                    .graph
                    .map_onto(&target)
                    .into_iter()
                    .flat_map(|mapped| symmetry::expand(mapped, orientation_matters))
                    .collect();
                if started.elapsed() > budget && !stop.swap(true, Ordering::Relaxed) {
                    tracing::warn!(?budget, "mapping budget exceeded, using candidates found so far");
                }
                expanded
            })
            .collect();

        tracing::debug!(
            dissections = descriptors.len(),
            candidates = candidates.len(),
            elapsed = ?started.elapsed(),
            "expanded candidates"
        );
        candidates
    }

    fn optimize_candidates(
        &self,
        candidates: &[Graph],
        fixed: &[FixedTarget],
        budget: Duration,
    ) -> Option<Candidate> {
        let started = Instant::now();
        let stop = AtomicBool::new(false);
        let register = BestRegister::default();
        let weights = self.settings.weights();
        let min_size = self.settings.min_size();

        candidates.par_iter().enumerate().for_each(|(index, graph)| {
            if stop.load(Ordering::Relaxed) {
                return;
            }

            let objective = Objective::new(
                graph,
                &self.boundary,
                weights,
                min_size,
                fixed,
                self.options.spacing,
            );
            // A single cell under the remainder policy has no free variables.
            if objective.dimension() == 0 {
                let spacing = objective.spacing(&[]);
                let score = objective.score_spacing(&spacing);
                if score.is_finite() {
                    register.offer(Candidate {
                        index,
                        score,
                        spacing,
                    });
                } else {
                    tracing::warn!(candidate = index, score, "candidate has no finite score");
                }
                return;
            }

            let baseline = if self.options.short_circuit {
                register.score()
            } else {
                None
            };
            let optimizer = NelderMead::default()
                .with_max_time(self.options.candidate_limit)
                .with_baseline(baseline);

            match optimizer.minimize(|z| objective.score(z), &objective.starting_point()) {
                Ok(min) => {
                    tracing::debug!(
                        candidate = index,
                        score = min.score,
                        iterations = min.iterations,
                        stop = ?min.stop,
                        "optimized candidate"
                    );
                    register.offer(Candidate {
                        index,
                        score: min.score,
                        spacing: objective.spacing(&min.point),
                    });
                }
                Err(err) => {
                    tracing::warn!(candidate = index, %err, "candidate failed to optimize");
                }
            }

            if started.elapsed() > budget && !stop.swap(true, Ordering::Relaxed) {
                tracing::warn!(?budget, "optimization budget exceeded, keeping best so far");
            }
        });

        register.into_inner()
    }

    fn build_plan(&self, candidates: &[Graph], best: Candidate) -> Plan {
        let graph = &candidates[best.index];
        let Spacing { rows, cols } = best.spacing;
        let rooms = graph
            .nodes()
            .zip(graph.rooms())
            .enumerate()
            .map(|(i, (label, room))| PlacedRoom {
                label: label.to_string(),
                x: room.x(&rows),
                y: room.y(&cols),
                width: room.width(&rows),
                height: room.height(&cols),
                target_area: graph.areas().get(i).copied(),
            })
            .collect();

        Plan {
            rooms,
            row_widths: rows,
            col_heights: cols,
            score: best.score,
            candidates: candidates.len(),
            graph: graph.clone(),
            boundary: self.boundary,
        }
    }
}
