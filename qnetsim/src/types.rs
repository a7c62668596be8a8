// Qnetsim: quantum entanglement network request-serving simulator
// Copyright (C) 2021  Tibor Schneider
//
// This program is free software; you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation; either version 2 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along
// with this program; if not, write to the Free Software Foundation, Inc.,
// 51 Franklin Street, Fifth Floor, Boston, MA 02110-1301 USA.

//! Module containing all type definitions shared across the crate

use petgraph::algo::dijkstra;
use petgraph::graph::{NodeIndex, UnGraph};

/// Integer label of a node, `0..net_size`. Doubles as an index into the traffic matrix and the
/// topology's adjacency matrix.
pub type NodeLabel = usize;

/// Discrete simulation time unit. No real-time interpretation.
pub type Tick = u64;

/// Undirected, unweighted physical topology graph. `NodeLabel` is mapped to `NodeIndex` 1:1 in
/// construction order (see [`crate::topology::Topology`]).
pub type PhysicalGraph = UnGraph<(), (), u32>;

/// Shortest-path hop count between two nodes in the physical graph. Returns `None` if `to` is
/// unreachable from `from`.
pub fn graph_distance(graph: &PhysicalGraph, from: NodeLabel, to: NodeLabel) -> Option<u32> {
    if from == to {
        return Some(0);
    }
    let costs = dijkstra(graph, NodeIndex::new(from), Some(NodeIndex::new(to)), |_| 1u32);
    costs.get(&NodeIndex::new(to)).copied()
}

/// Next hop label along *some* shortest path from `from` to `to` in the physical graph.
///
/// Returns `None` when `from == to` or when `to` is unreachable.
pub fn shortest_path_next_hop(
    graph: &PhysicalGraph,
    from: NodeLabel,
    to: NodeLabel,
) -> Option<NodeLabel> {
    if from == to {
        return None;
    }
    let path = shortest_path(graph, from, to)?;
    path.get(1).copied()
}

/// Full shortest path (inclusive of both endpoints) from `from` to `to`, breaking ties by
/// insertion order of the adjacency lists (i.e. lowest neighbor label first).
pub fn shortest_path(
    graph: &PhysicalGraph,
    from: NodeLabel,
    to: NodeLabel,
) -> Option<Vec<NodeLabel>> {
    if from == to {
        return Some(vec![from]);
    }
    // Dijkstra with unit weights via a plain BFS keeps deterministic, insertion-order
    // tie-breaking, which petgraph::algo::astar/dijkstra do not guarantee on their own.
    use std::collections::{HashMap, VecDeque};

    let start = NodeIndex::new(from);
    let goal = NodeIndex::new(to);
    let mut prev: HashMap<NodeIndex<u32>, NodeIndex<u32>> = HashMap::new();
    let mut visited = std::collections::HashSet::new();
    let mut queue = VecDeque::new();
    visited.insert(start);
    queue.push_back(start);

    while let Some(u) = queue.pop_front() {
        if u == goal {
            let mut path = vec![u];
            let mut cur = u;
            while let Some(&p) = prev.get(&cur) {
                path.push(p);
                cur = p;
            }
            path.reverse();
            return Some(path.into_iter().map(|idx| idx.index()).collect());
        }
        for v in graph.neighbors(u) {
            if visited.insert(v) {
                prev.insert(v, u);
                queue.push_back(v);
            }
        }
    }
    None
}
