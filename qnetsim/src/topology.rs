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

//! Topology and traffic-matrix I/O (spec component H): loads or generates the adjacency matrix,
//! loads or generates the traffic matrix, and turns traffic into a request arrival schedule.

use crate::error::{ConfigError, Error};
use crate::types::{NodeLabel, PhysicalGraph, Tick};
use itertools::iproduct;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// On-disk shape of `network.json` (spec §6).
#[derive(Debug, Serialize, Deserialize)]
struct TopologyFile {
    array: Vec<Vec<u8>>,
    #[serde(default)]
    memo_sizes: Option<Vec<usize>>,
}

/// Physical network topology plus per-node memory-pool sizes.
#[derive(Debug, Clone)]
pub struct Topology {
    /// undirected adjacency graph, node labels == `petgraph` indices
    pub graph: PhysicalGraph,
    /// memory-pool size for each node, same order as labels
    pub memo_sizes: Vec<usize>,
}

impl Topology {
    /// Build a topology from an explicit adjacency matrix and optional per-node memory sizes,
    /// validating shape and symmetry (spec §7 "Config invalid").
    pub fn from_adjacency(
        adjacency: &[Vec<u8>],
        memo_sizes: Option<Vec<usize>>,
        default_memo_size: usize,
    ) -> Result<Self, ConfigError> {
        let n = adjacency.len();
        for row in adjacency {
            if row.len() != n {
                return Err(ConfigError::AdjacencyNotSquare { rows: n, cols: row.len() });
            }
        }
        for (i, j) in iproduct!(0..n, 0..n) {
            if adjacency[i][j] != adjacency[j][i] {
                return Err(ConfigError::AdjacencyNotSymmetric(i, j));
            }
        }

        let memo_sizes = match memo_sizes {
            Some(sizes) => {
                if sizes.len() != n {
                    return Err(ConfigError::MemoSizesLengthMismatch { found: sizes.len(), expected: n });
                }
                sizes
            }
            None => vec![default_memo_size; n],
        };

        let mut graph = PhysicalGraph::with_capacity(n, 0);
        for _ in 0..n {
            graph.add_node(());
        }
        for i in 0..n {
            for j in (i + 1)..n {
                if adjacency[i][j] != 0 {
                    graph.add_edge(
                        petgraph::graph::NodeIndex::new(i),
                        petgraph::graph::NodeIndex::new(j),
                        (),
                    );
                }
            }
        }

        Ok(Topology { graph, memo_sizes })
    }

    /// Load a topology from `network.json` (spec §6). `default_memo_size` is used when the file
    /// omits `memo_sizes`.
    pub fn load_json<P: AsRef<Path>>(path: P, default_memo_size: usize) -> Result<Self, Error> {
        let text = std::fs::read_to_string(path)?;
        let file: TopologyFile = serde_json::from_str(&text)?;
        Ok(Self::from_adjacency(&file.array, file.memo_sizes, default_memo_size)?)
    }

    /// Write this topology to `network.json`.
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<(), Error> {
        let n = self.graph.node_count();
        let mut array = vec![vec![0u8; n]; n];
        for edge in self.graph.edge_indices() {
            let (a, b) = self.graph.edge_endpoints(edge).unwrap();
            array[a.index()][b.index()] = 1;
            array[b.index()][a.index()] = 1;
        }
        let file = TopologyFile { array, memo_sizes: Some(self.memo_sizes.clone()) };
        std::fs::write(path, serde_json::to_string_pretty(&file)?)?;
        Ok(())
    }

    /// Nodes 0..N-1 connected in a cycle.
    pub fn ring(net_size: NodeLabel, memo_size: usize) -> Self {
        let mut graph = PhysicalGraph::with_capacity(net_size, net_size);
        for _ in 0..net_size {
            graph.add_node(());
        }
        for i in 0..net_size {
            let j = (i + 1) % net_size;
            graph.add_edge(petgraph::graph::NodeIndex::new(i), petgraph::graph::NodeIndex::new(j), ());
        }
        Topology { graph, memo_sizes: vec![memo_size; net_size] }
    }

    /// AS-style Internet topology: grown by preferential attachment (each new node connects to
    /// `attach` existing nodes, chosen with probability proportional to current degree), which
    /// yields the heavy-tailed degree distribution characteristic of Internet AS graphs.
    pub fn as_net(net_size: NodeLabel, memo_size: usize, attach: usize, rng: &mut impl Rng) -> Self {
        let attach = attach.max(1).min(net_size.saturating_sub(1).max(1));
        let mut graph = PhysicalGraph::with_capacity(net_size, net_size * attach);
        graph.add_node(());
        if net_size > 1 {
            graph.add_node(());
            graph.add_edge(petgraph::graph::NodeIndex::new(0), petgraph::graph::NodeIndex::new(1), ());
        }
        for new_label in 2..net_size {
            let mut degrees: Vec<(NodeLabel, usize)> = (0..new_label)
                .map(|l| (l, graph.neighbors(petgraph::graph::NodeIndex::new(l)).count() + 1))
                .collect();
            let mut chosen = std::collections::HashSet::new();
            let total: usize = degrees.iter().map(|(_, d)| d).sum();
            for _ in 0..attach.min(new_label) {
                if degrees.is_empty() {
                    break;
                }
                let mut pick = rng.gen_range(0, total.max(1));
                let mut idx = 0;
                for (i, &(_, d)) in degrees.iter().enumerate() {
                    if pick < d {
                        idx = i;
                        break;
                    }
                    pick -= d;
                }
                let (label, _) = degrees.remove(idx);
                chosen.insert(label);
            }
            graph.add_node(());
            for target in chosen {
                graph.add_edge(
                    petgraph::graph::NodeIndex::new(new_label),
                    petgraph::graph::NodeIndex::new(target),
                    (),
                );
            }
        }
        Topology { graph, memo_sizes: vec![memo_size; net_size] }
    }
}

/// On-disk shape of `traffic_matrix.json` (spec §6).
#[derive(Debug, Serialize, Deserialize)]
struct TrafficMatrixFile {
    matrix: Vec<Vec<f64>>,
}

/// N x N non-negative traffic intensities, diagonal zero, used as rejection-sampling acceptance
/// thresholds to synthesize request `(origin, destination)` pairs.
#[derive(Debug, Clone)]
pub struct TrafficMatrix {
    matrix: Vec<Vec<f64>>,
}

impl TrafficMatrix {
    /// Number of nodes this matrix was built for.
    pub fn size(&self) -> usize {
        self.matrix.len()
    }

    /// Validate shape against `net_size` and wrap a raw matrix.
    pub fn new(matrix: Vec<Vec<f64>>, net_size: usize) -> Result<Self, ConfigError> {
        if matrix.len() != net_size || matrix.iter().any(|row| row.len() != net_size) {
            return Err(ConfigError::TrafficMatrixShapeMismatch {
                rows: matrix.len(),
                cols: matrix.first().map_or(0, |r| r.len()),
                expected: net_size,
            });
        }
        Ok(TrafficMatrix { matrix })
    }

    /// Load a traffic matrix from `traffic_matrix.json` (spec §6).
    pub fn load_json<P: AsRef<Path>>(path: P, net_size: usize) -> Result<Self, Error> {
        let text = std::fs::read_to_string(path)?;
        let file: TrafficMatrixFile = serde_json::from_str(&text)?;
        Ok(Self::new(file.matrix, net_size)?)
    }

    /// Write this traffic matrix to `traffic_matrix.json`.
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<(), Error> {
        let file = TrafficMatrixFile { matrix: self.matrix.clone() };
        std::fs::write(path, serde_json::to_string_pretty(&file)?)?;
        Ok(())
    }

    /// A uniform-random traffic matrix over `net_size` nodes, zero diagonal.
    pub fn uniform_random(net_size: usize, rng: &mut impl Rng) -> Self {
        let mut matrix = vec![vec![0.0; net_size]; net_size];
        for i in 0..net_size {
            for j in 0..net_size {
                if i != j {
                    matrix[i][j] = rng.gen::<f64>();
                }
            }
        }
        TrafficMatrix { matrix }
    }

    /// Draw an `(origin, destination)` pair by rejection sampling: pick a uniformly random cell,
    /// accept it with probability proportional to its traffic intensity, repeat until accepted.
    pub fn sample_pair(&self, rng: &mut impl Rng) -> (NodeLabel, NodeLabel) {
        let n = self.matrix.len();
        loop {
            let i = rng.gen_range(0, n);
            let j = rng.gen_range(0, n);
            if i == j {
                continue;
            }
            if rng.gen::<f64>() < self.matrix[i][j] {
                return (i, j);
            }
        }
    }
}

/// Submission ticks for `queue_len` requests, one every `queue_int` ticks starting at
/// `queue_start` (spec §6's `queue_len`/`queue_start`/`queue_int`).
pub fn request_schedule(queue_start: Tick, queue_len: usize, queue_int: Tick) -> Vec<Tick> {
    (0..queue_len as Tick).map(|i| queue_start + i * queue_int).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ring_topology_is_connected_cycle() {
        let topo = Topology::ring(5, 2);
        assert_eq!(topo.graph.node_count(), 5);
        assert_eq!(topo.graph.edge_count(), 5);
        for n in topo.graph.node_indices() {
            assert_eq!(topo.graph.neighbors(n).count(), 2);
        }
    }

    #[test]
    fn rejects_non_symmetric_adjacency() {
        let adj = vec![vec![0, 1], vec![0, 0]];
        let err = Topology::from_adjacency(&adj, None, 1).unwrap_err();
        assert!(matches!(err, ConfigError::AdjacencyNotSymmetric(_, _)));
    }

    #[test]
    fn rejects_non_square_adjacency() {
        let adj = vec![vec![0, 1, 0], vec![1, 0]];
        let err = Topology::from_adjacency(&adj, None, 1).unwrap_err();
        assert!(matches!(err, ConfigError::AdjacencyNotSquare { .. }));
    }

    #[test]
    fn request_schedule_is_evenly_spaced() {
        let schedule = request_schedule(10, 3, 5);
        assert_eq!(schedule, vec![10, 15, 20]);
    }
}
