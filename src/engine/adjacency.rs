use std::collections::{BTreeSet, VecDeque};

use crate::model::Room;

// ── Adjacency Graph ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeKind {
    /// Both rooms are in the same building.
    Building,
    /// Capacities within 25% of the larger one.
    Capacity,
}

impl EdgeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EdgeKind::Building => "building",
            EdgeKind::Capacity => "capacity",
        }
    }
}

/// Undirected edge between two room positions in the store, `a < b`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdjacencyEdge {
    pub a: usize,
    pub b: usize,
    pub kind: EdgeKind,
}

/// Derived room-to-room relation. Positions refer to the room slice the graph
/// was built from, so the graph must be rebuilt whenever that slice changes.
#[derive(Debug, Clone, Default)]
pub struct AdjacencyGraph {
    edges: Vec<AdjacencyEdge>,
    neighbors: Vec<BTreeSet<usize>>,
}

/// `|a - b| / max(a, b) <= 0.25`, evaluated exactly as `4·|a - b| <= max(a, b)`.
pub fn capacity_similar(a: u32, b: u32) -> bool {
    let diff = u64::from(a.abs_diff(b));
    let max = u64::from(a.max(b));
    4 * diff <= max
}

/// Full O(n²) rebuild over every unordered pair.
///
/// Both rules are checked independently, so a pair can carry a building edge
/// and a capacity edge; the neighbor sets still hold each room once.
pub fn build(rooms: &[Room]) -> AdjacencyGraph {
    let mut graph = AdjacencyGraph {
        edges: Vec::new(),
        neighbors: vec![BTreeSet::new(); rooms.len()],
    };

    for i in 0..rooms.len() {
        for j in (i + 1)..rooms.len() {
            if rooms[i].building == rooms[j].building {
                graph.connect(i, j, EdgeKind::Building);
            }
            if capacity_similar(rooms[i].capacity, rooms[j].capacity) {
                graph.connect(i, j, EdgeKind::Capacity);
            }
        }
    }

    graph
}

impl AdjacencyGraph {
    fn connect(&mut self, a: usize, b: usize, kind: EdgeKind) {
        self.edges.push(AdjacencyEdge { a, b, kind });
        self.neighbors[a].insert(b);
        self.neighbors[b].insert(a);
    }

    pub fn node_count(&self) -> usize {
        self.neighbors.len()
    }

    pub fn edges(&self) -> &[AdjacencyEdge] {
        &self.edges
    }

    /// Neighbors of `idx` in store order. Empty for out-of-range positions.
    pub fn neighbors(&self, idx: usize) -> impl Iterator<Item = usize> + '_ {
        self.neighbors.get(idx).into_iter().flatten().copied()
    }

    pub fn are_adjacent(&self, a: usize, b: usize) -> bool {
        self.neighbors.get(a).is_some_and(|set| set.contains(&b))
    }

    /// Breadth-first visit order starting at `start` (inclusive). Each room is
    /// visited once; neighbors are queued in store order.
    pub fn breadth_first(&self, start: usize) -> Vec<usize> {
        if start >= self.neighbors.len() {
            return Vec::new();
        }
        let mut visited = vec![false; self.neighbors.len()];
        let mut order = Vec::new();
        let mut queue = VecDeque::from([start]);
        visited[start] = true;

        while let Some(current) = queue.pop_front() {
            order.push(current);
            for next in &self.neighbors[current] {
                if !visited[*next] {
                    visited[*next] = true;
                    queue.push_back(*next);
                }
            }
        }
        order
    }
}
