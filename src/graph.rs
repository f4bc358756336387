use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Largest requirement graph the mapper is asked to handle. Mapping walks all
/// `n!` permutations of the target's nodes.
pub const MAX_NODES: usize = 7;

/// Undirected edge, stored with the lexicographically smaller label first.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Edge(String, String);

impl Edge {
    pub fn new(a: impl Into<String>, b: impl Into<String>) -> Self {
        let (a, b) = (a.into(), b.into());
        if a <= b { Self(a, b) } else { Self(b, a) }
    }

    pub fn first(&self) -> &str {
        &self.0
    }

    pub fn second(&self) -> &str {
        &self.1
    }

    pub fn touches(&self, node: &str) -> bool {
        self.0 == node || self.1 == node
    }
}

impl std::fmt::Display for Edge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.0, self.1)
    }
}

impl std::str::FromStr for Edge {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if s.matches('-').count() != 1 {
            return Err(Error::MalformedEdge(s.to_string()));
        }
        let (a, b) = s.split_once('-').ok_or_else(|| Error::MalformedEdge(s.to_string()))?;
        let (a, b) = (a.trim(), b.trim());
        if a.is_empty() || b.is_empty() {
            return Err(Error::MalformedEdge(s.to_string()));
        }
        Ok(Edge::new(a, b))
    }
}

/// Grid cells occupied by one room of a dissection. `rows` index the
/// divisions of the boundary's width, `cols` the divisions of its height.
/// Both spans are ascending and contiguous.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Room {
    pub rows: Vec<usize>,
    pub cols: Vec<usize>,
}

impl Room {
    pub fn new(rows: Vec<usize>, cols: Vec<usize>) -> Self {
        Self { rows, cols }
    }

    pub fn width(&self, row_widths: &[f64]) -> f64 {
        span_extent(&self.rows, row_widths)
    }

    pub fn height(&self, col_heights: &[f64]) -> f64 {
        span_extent(&self.cols, col_heights)
    }

    pub fn x(&self, row_widths: &[f64]) -> f64 {
        span_offset(&self.rows, row_widths)
    }

    pub fn y(&self, col_heights: &[f64]) -> f64 {
        span_offset(&self.cols, col_heights)
    }
}

fn span_extent(span: &[usize], sizes: &[f64]) -> f64 {
    span.iter()
        .map(|&i| sizes.get(i).map_or(0.0, |v| v.abs()))
        .sum()
}

fn span_offset(span: &[usize], sizes: &[f64]) -> f64 {
    let start = span.first().copied().unwrap_or(0).min(sizes.len());
    sizes[..start].iter().sum()
}

/// Nodes, undirected edges and, optionally, a grid layout (`rooms`) and
/// target areas parallel to the nodes by index.
///
/// Construction always yields canonical form: edges are ordered, duplicate
/// nodes and edges are dropped, and edges naming unknown nodes are discarded.
/// Insertion order is kept.
///
/// `==` compares the node and edge sequences in order. Two isomorphic graphs
/// with differently ordered nodes are not equal; use [`Graph::is_isomorphic`]
/// or [`Graph::map_onto`] for structural matching.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Graph {
    nodes: IndexSet<String>,
    edges: IndexSet<Edge>,
    pub(crate) rooms: Vec<Room>,
    areas: Vec<f64>,
}

impl Graph {
    pub fn new<N, E>(nodes: N, edges: E) -> Self
    where
        N: IntoIterator,
        N::Item: Into<String>,
        E: IntoIterator<Item = Edge>,
    {
        let nodes: IndexSet<String> = nodes.into_iter().map(Into::into).collect();
        let edges = edges
            .into_iter()
            .filter(|e| {
                let known = nodes.contains(e.first()) && nodes.contains(e.second());
                if !known {
                    tracing::debug!(edge = %e, "dropping edge with unknown endpoint");
                }
                known
            })
            .collect();
        Self {
            nodes,
            edges,
            rooms: Vec::new(),
            areas: Vec::new(),
        }
    }

    pub fn with_rooms(mut self, rooms: Vec<Room>) -> Self {
        self.rooms = rooms;
        self
    }

    pub fn with_areas(mut self, areas: Vec<f64>) -> Self {
        self.areas = areas;
        self
    }

    /// Builds a validated requirement graph from user input: node labels,
    /// `"a-b"` edge strings and one target area per node.
    pub fn requirement<N, E>(nodes: &[N], edges: &[E], areas: &[f64]) -> Result<Self>
    where
        N: AsRef<str>,
        E: AsRef<str>,
    {
        if nodes.is_empty() {
            return Err(Error::EmptyGraph);
        }
        if nodes.len() > MAX_NODES {
            return Err(Error::TooManyNodes {
                count: nodes.len(),
                max: MAX_NODES,
            });
        }
        let labels: Vec<&str> = nodes.iter().map(AsRef::as_ref).collect();
        for (i, label) in labels.iter().enumerate() {
            if labels[..i].contains(label) {
                return Err(Error::DuplicateNode(label.to_string()));
            }
        }
        if nodes.len() > 4 && edges.len() < nodes.len() - 2 {
            return Err(Error::InsufficientEdges {
                required: nodes.len() - 2,
                nodes: nodes.len(),
            });
        }
        if nodes.len() != areas.len() {
            return Err(Error::AreaCountMismatch {
                nodes: nodes.len(),
                areas: areas.len(),
            });
        }

        let parsed = edges
            .iter()
            .map(|raw| {
                let edge: Edge = raw.as_ref().parse()?;
                if edge.first() == edge.second() {
                    return Err(Error::SelfLoop(raw.as_ref().to_string()));
                }
                for node in [edge.first(), edge.second()] {
                    if !labels.contains(&node) {
                        return Err(Error::UnknownNode {
                            edge: raw.as_ref().to_string(),
                            node: node.to_string(),
                        });
                    }
                }
                Ok(edge)
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Graph::new(labels, parsed).with_areas(areas.to_vec()))
    }

    pub fn nodes(&self) -> impl ExactSizeIterator<Item = &str> {
        self.nodes.iter().map(String::as_str)
    }

    pub fn edges(&self) -> impl ExactSizeIterator<Item = &Edge> {
        self.edges.iter()
    }

    pub fn rooms(&self) -> &[Room] {
        &self.rooms
    }

    pub fn areas(&self) -> &[f64] {
        &self.areas
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn node_index(&self, node: &str) -> Option<usize> {
        self.nodes.get_index_of(node)
    }

    pub fn has_node(&self, node: &str) -> bool {
        self.nodes.contains(node)
    }

    pub fn has_edge(&self, edge: &Edge) -> bool {
        self.edges.contains(edge)
    }

    pub fn add_node(&mut self, node: impl Into<String>) -> bool {
        self.nodes.insert(node.into())
    }

    /// Adds `edge` if both endpoints exist and it is not present yet.
    pub fn add_edge(&mut self, edge: Edge) -> bool {
        if self.has_node(edge.first()) && self.has_node(edge.second()) {
            self.edges.insert(edge)
        } else {
            false
        }
    }

    /// Removes `node`, its incident edges and its room/area entries.
    pub fn remove_node(&mut self, node: &str) -> bool {
        let Some(idx) = self.nodes.get_index_of(node) else {
            return false;
        };
        self.nodes.shift_remove_index(idx);
        self.edges.retain(|e| !e.touches(node));
        if idx < self.rooms.len() {
            self.rooms.remove(idx);
        }
        if idx < self.areas.len() {
            self.areas.remove(idx);
        }
        true
    }

    pub fn remove_edge(&mut self, edge: &Edge) -> bool {
        self.edges.shift_remove(edge)
    }

    /// Edges rendered back as `"a-b"` strings.
    pub fn edge_strings(&self) -> Vec<String> {
        self.edges.iter().map(Edge::to_string).collect()
    }

    /// Lazily yields every bijection from this graph's nodes onto `target`'s
    /// nodes that realizes all of this graph's edges. Entry `i` of a mapping
    /// is the index in `target` of the node that `self.nodes[i]` maps to.
    ///
    /// Yields nothing unless both graphs have the same node count and `target`
    /// has at least as many edges.
    pub fn mappings(&self, target: &Graph) -> impl Iterator<Item = Vec<usize>> + use<> {
        let n = self.node_count();
        let feasible = n == target.node_count() && self.edge_count() <= target.edge_count();

        let mut adjacent = vec![vec![false; n]; n];
        if feasible {
            for e in &target.edges {
                if let (Some(a), Some(b)) = (target.node_index(e.first()), target.node_index(e.second())) {
                    adjacent[a][b] = true;
                    adjacent[b][a] = true;
                }
            }
        }
        let required: Vec<(usize, usize)> = self
            .edges
            .iter()
            .filter_map(|e| Some((self.node_index(e.first())?, self.node_index(e.second())?)))
            .collect();

        Permutations::new(n)
            .take_while(move |_| feasible)
            .filter(move |perm| required.iter().all(|&(a, b)| adjacent[perm[a]][perm[b]]))
    }

    /// Maps this requirement graph onto a dissection graph. Each result keeps
    /// this graph's nodes, edges and areas, with room `i` taken from the
    /// target node that node `i` maps to.
    ///
    /// Symmetric targets produce several equivalent results; no dedup is done.
    pub fn map_onto(&self, target: &Graph) -> Vec<Graph> {
        self.mappings(target)
            .map(|perm| Graph {
                nodes: self.nodes.clone(),
                edges: self.edges.clone(),
                rooms: perm
                    .iter()
                    .filter_map(|&j| target.rooms.get(j).cloned())
                    .collect(),
                areas: self.areas.clone(),
            })
            .collect()
    }

    pub fn is_isomorphic(&self, other: &Graph) -> bool {
        self.edge_count() == other.edge_count() && self.mappings(other).next().is_some()
    }
}

impl PartialEq for Graph {
    fn eq(&self, other: &Self) -> bool {
        self.nodes.iter().eq(other.nodes.iter()) && self.edges.iter().eq(other.edges.iter())
    }
}

impl std::ops::Add for &Graph {
    type Output = Graph;

    fn add(self, rhs: &Graph) -> Graph {
        Graph::new(
            self.nodes.iter().chain(&rhs.nodes).cloned(),
            self.edges.iter().chain(&rhs.edges).cloned(),
        )
    }
}

impl std::ops::Sub for &Graph {
    type Output = Graph;

    fn sub(self, rhs: &Graph) -> Graph {
        let mut out = Graph::new(self.nodes.iter().cloned(), self.edges.iter().cloned());
        for node in &rhs.nodes {
            out.remove_node(node);
        }
        for edge in &rhs.edges {
            out.remove_edge(edge);
        }
        out
    }
}

impl std::fmt::Display for Graph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let nodes: Vec<&str> = self.nodes().collect();
        write!(
            f,
            "Graph with\nnodes: {}\nedges: {}",
            nodes.join(", "),
            self.edge_strings().join(", ")
        )
    }
}

/// Permutations of `0..n` in lexicographic order, one materialized at a time.
#[derive(Debug, Clone)]
pub struct Permutations {
    current: Vec<usize>,
    done: bool,
}

impl Permutations {
    pub fn new(n: usize) -> Self {
        Self {
            current: (0..n).collect(),
            done: false,
        }
    }
}

impl Iterator for Permutations {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Vec<usize>> {
        if self.done {
            return None;
        }
        let out = self.current.clone();
        self.done = !next_permutation(&mut self.current);
        Some(out)
    }
}

fn next_permutation(p: &mut [usize]) -> bool {
    if p.len() < 2 {
        return false;
    }
    let mut i = p.len() - 1;
    while i > 0 && p[i - 1] >= p[i] {
        i -= 1;
    }
    if i == 0 {
        return false;
    }
    let mut j = p.len() - 1;
    while p[j] <= p[i - 1] {
        j -= 1;
    }
    p.swap(i - 1, j);
    p[i..].reverse();
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn edge(s: &str) -> Edge {
        s.parse().unwrap()
    }

    fn triangle() -> Graph {
        Graph::new(["1", "2", "3"], [edge("1-2"), edge("2-3"), edge("1-3")]).with_rooms(vec![
            Room::new(vec![0], vec![0, 1]),
            Room::new(vec![1], vec![0]),
            Room::new(vec![1], vec![1]),
        ])
    }

    fn path() -> Graph {
        Graph::requirement(&["A", "B", "C"], &["A-B", "B-C"], &[1.0, 2.0, 3.0]).unwrap()
    }

    /// Checks that every requirement edge is realized in `target` under `perm`.
    fn assert_mapping_valid(req: &Graph, target: &Graph, perm: &[usize]) {
        let labels: Vec<&str> = target.nodes().collect();
        for e in req.edges() {
            let a = labels[perm[req.node_index(e.first()).unwrap()]];
            let b = labels[perm[req.node_index(e.second()).unwrap()]];
            assert!(
                target.has_edge(&Edge::new(a, b)),
                "edge {e} maps to {a}-{b}, which is missing from target"
            );
        }
    }

    #[test]
    fn test_edges_are_canonical_and_deduplicated() {
        let g = Graph::new(
            ["b", "a", "c", "a"],
            [Edge::new("b", "a"), Edge::new("a", "b"), Edge::new("c", "a")],
        );
        let nodes: Vec<&str> = g.nodes().collect();
        assert_eq!(nodes, vec!["b", "a", "c"]);
        assert_eq!(g.edge_strings(), vec!["a-b", "a-c"]);
    }

    #[test]
    fn test_edges_with_unknown_nodes_are_dropped() {
        let g = Graph::new(["a", "b"], [Edge::new("a", "b"), Edge::new("a", "z")]);
        assert_eq!(g.edge_count(), 1);
    }

    #[test]
    fn test_equality_is_order_sensitive() {
        let a = Graph::new(["A", "B"], [edge("A-B")]);
        let b = Graph::new(["B", "A"], [edge("B-A")]);
        assert_ne!(a, b);
        assert!(a.is_isomorphic(&b));
        assert_eq!(a, Graph::new(["A", "B"], [edge("B-A")]));
    }

    #[test]
    fn test_equality_ignores_rooms_and_areas() {
        let a = Graph::new(["A"], []).with_areas(vec![1.0]);
        let b = Graph::new(["A"], []).with_rooms(vec![Room::new(vec![0], vec![0])]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_parse_edge() {
        assert_eq!(edge("b-a"), Edge::new("a", "b"));
        assert!(matches!("a-b-c".parse::<Edge>(), Err(Error::MalformedEdge(_))));
        assert!(matches!("ab".parse::<Edge>(), Err(Error::MalformedEdge(_))));
        assert!(matches!("a-".parse::<Edge>(), Err(Error::MalformedEdge(_))));
    }

    #[test]
    fn test_requirement_validation() {
        let eight: Vec<String> = (0..8).map(|i| i.to_string()).collect();
        let areas = vec![1.0; 8];
        assert!(matches!(
            Graph::requirement(&eight, &[] as &[&str], &areas),
            Err(Error::TooManyNodes { count: 8, max: 7 })
        ));

        let five = ["a", "b", "c", "d", "e"];
        assert!(matches!(
            Graph::requirement(&five, &["a-b", "b-c"], &[1.0; 5]),
            Err(Error::InsufficientEdges { required: 3, nodes: 5 })
        ));
        assert!(Graph::requirement(&five, &["a-b", "b-c", "c-d"], &[1.0; 5]).is_ok());

        assert!(matches!(
            Graph::requirement(&["a", "b"], &["a-b"], &[1.0]),
            Err(Error::AreaCountMismatch { nodes: 2, areas: 1 })
        ));
        assert!(matches!(
            Graph::requirement(&["a", "b"], &["a-x"], &[1.0, 1.0]),
            Err(Error::UnknownNode { .. })
        ));
    }

    #[test]
    fn test_requirement_rejects_degenerate_input() {
        let err = Graph::requirement(&[] as &[&str], &[] as &[&str], &[]).unwrap_err();
        assert!(matches!(err, Error::EmptyGraph));
        assert!(err.is_validation());

        let err = Graph::requirement(&["A", "A"], &[] as &[&str], &[1.0, 2.0]).unwrap_err();
        assert!(matches!(err, Error::DuplicateNode(ref n) if n == "A"), "got {err}");
        assert!(err.is_validation());

        let err = Graph::requirement(&["A", "B"], &["A-A"], &[1.0, 2.0]).unwrap_err();
        assert!(matches!(err, Error::SelfLoop(ref e) if e == "A-A"), "got {err}");
        assert!(err.is_validation());
    }

    #[test]
    fn test_add_and_remove() {
        let mut g = Graph::new(["a", "b", "c"], [edge("a-b"), edge("b-c")]).with_areas(vec![1.0, 2.0, 3.0]);
        assert!(!g.add_edge(edge("a-z")));
        assert!(!g.add_edge(edge("b-a")));
        assert!(g.add_edge(edge("a-c")));
        assert!(g.remove_node("b"));
        assert_eq!(g.edge_strings(), vec!["a-c"]);
        assert_eq!(g.areas(), &[1.0, 3.0]);
        assert!(g.remove_edge(&edge("c-a")));
        assert_eq!(g.edge_count(), 0);
        assert!(!g.remove_node("b"));
    }

    #[test]
    fn test_union_and_difference() {
        let a = Graph::new(["a", "b"], [edge("a-b")]);
        let b = Graph::new(["b", "c"], [edge("c-b")]);
        let union = &a + &b;
        assert_eq!(union, Graph::new(["a", "b", "c"], [edge("a-b"), edge("b-c")]));

        let diff = &union - &Graph::new(["c"], []);
        assert_eq!(diff, a);
    }

    #[test]
    fn test_display() {
        let text = path().to_string();
        assert!(text.contains("nodes: A, B, C"));
        assert!(text.contains("edges: A-B, B-C"));
    }

    #[test]
    fn test_permutations_count_and_order() {
        let perms: Vec<Vec<usize>> = Permutations::new(3).collect();
        assert_eq!(perms.len(), 6);
        assert_eq!(perms[0], vec![0, 1, 2]);
        assert_eq!(perms[5], vec![2, 1, 0]);
        assert_eq!(Permutations::new(7).count(), 5040);
        assert_eq!(Permutations::new(1).count(), 1);
    }

    #[test]
    fn test_path_maps_onto_triangle_six_ways() {
        let mapped = path().map_onto(&triangle());
        assert_eq!(mapped.len(), 6);
        for g in &mapped {
            assert_eq!(*g, path());
            assert_eq!(g.areas(), &[1.0, 2.0, 3.0]);
            assert_eq!(g.rooms().len(), 3);
        }
    }

    #[test]
    fn test_mapping_reorders_rooms() {
        let req = Graph::new(["A", "B"], [edge("A-B")]);
        let target = Graph::new(["0", "1"], [edge("0-1")]).with_rooms(vec![
            Room::new(vec![0], vec![0]),
            Room::new(vec![1], vec![0]),
        ]);
        let mapped = req.map_onto(&target);
        assert_eq!(mapped.len(), 2);
        assert_eq!(mapped[0].rooms(), target.rooms());
        assert_eq!(mapped[1].rooms()[0], target.rooms()[1]);
        assert_eq!(mapped[1].rooms()[1], target.rooms()[0]);
    }

    #[test]
    fn test_no_mapping_when_edges_unrealizable() {
        // Triangle requirement onto a path target: edge counts block it.
        let req = Graph::new(["A", "B", "C"], [edge("A-B"), edge("B-C"), edge("A-C")]);
        let target = Graph::new(["1", "2", "3"], [edge("1-2"), edge("2-3")]);
        assert!(req.map_onto(&target).is_empty());

        // Star requirement onto a path with a spare edge elsewhere.
        let req = Graph::new(["A", "B", "C", "D"], [edge("A-B"), edge("A-C"), edge("A-D")]);
        let target = Graph::new(["1", "2", "3", "4"], [edge("1-2"), edge("2-3"), edge("3-4")]);
        assert!(req.map_onto(&target).is_empty());
    }

    #[test]
    fn test_no_mapping_on_node_count_mismatch() {
        let req = Graph::new(["A", "B"], []);
        assert!(req.map_onto(&triangle()).is_empty());
    }

    fn arb_graph(labels: &'static [&'static str]) -> impl Strategy<Value = Graph> {
        let n = labels.len();
        proptest::collection::vec((0..n, 0..n), 0..12).prop_map(move |pairs| {
            let edges = pairs
                .into_iter()
                .filter(|(a, b)| a != b)
                .map(|(a, b)| Edge::new(labels[a], labels[b]));
            Graph::new(labels.iter().copied(), edges)
        })
    }

    proptest! {
        #[test]
        fn prop_construction_is_canonical(
            nodes in proptest::collection::vec("[a-e]", 0..8),
            pairs in proptest::collection::vec(("[a-e]", "[a-e]"), 0..12),
        ) {
            let edges: Vec<Edge> = pairs.iter().map(|(a, b)| Edge::new(a.clone(), b.clone())).collect();
            let g = Graph::new(nodes.clone(), edges.iter().rev().cloned());
            let again = Graph::new(nodes, edges);

            let labels: Vec<&str> = g.nodes().collect();
            let unique: std::collections::HashSet<&str> = labels.iter().copied().collect();
            prop_assert_eq!(unique.len(), labels.len());

            let unique_edges: std::collections::HashSet<&Edge> = g.edges().collect();
            prop_assert_eq!(unique_edges.len(), g.edge_count());
            prop_assert_eq!(g.edge_count(), again.edge_count());
            for e in g.edges() {
                prop_assert!(e.first() <= e.second());
                prop_assert!(g.has_node(e.first()) && g.has_node(e.second()));
            }
        }

        #[test]
        fn prop_mappings_realize_every_edge(
            req in arb_graph(&["A", "B", "C", "D"]),
            target in arb_graph(&["1", "2", "3", "4"]),
        ) {
            for perm in req.mappings(&target) {
                assert_mapping_valid(&req, &target, &perm);
            }
        }
    }
}
