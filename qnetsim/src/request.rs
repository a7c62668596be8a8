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

//! Entanglement requests, and the greedy, virtual-link-aware router.

use crate::node::NodeTable;
use crate::types::{shortest_path, shortest_path_next_hop, NodeLabel, PhysicalGraph, Tick};

/// A single request for end-to-end entanglement between two nodes.
#[derive(Debug, Clone)]
pub struct Request {
    /// tick at which this request was submitted to the network
    pub submit_tick: Tick,
    /// tick the simulator actually started serving this request (== `submit_tick` if served
    /// immediately; otherwise the tick it was promoted off the queue)
    pub start_tick: Tick,
    /// origin node label
    pub origin: NodeLabel,
    /// destination node label
    pub destination: NodeLabel,
    /// chosen route, origin first, destination last; `None` until [`Router::get_path`] runs
    pub route: Option<Vec<NodeLabel>>,
    /// multiset of route-node pairs already linked at submission time (spec §4.F step 2)
    pub available_pattern: Vec<(NodeLabel, NodeLabel)>,
}

impl Request {
    /// Construct a request submitted at `submit_tick` for `(origin, destination)`, with no route
    /// computed yet.
    pub fn new(submit_tick: Tick, origin: NodeLabel, destination: NodeLabel) -> Self {
        Request {
            submit_tick,
            start_tick: submit_tick,
            origin,
            destination,
            route: None,
            available_pattern: Vec::new(),
        }
    }

    /// Whether the origin and destination coincide -- the boundary case from spec §8, completed
    /// trivially at submission with latency and service time both zero.
    pub fn is_trivial(&self) -> bool {
        self.origin == self.destination
    }
}

/// Greedy, virtual-link-aware path selection (spec §4.E).
pub struct Router;

impl Router {
    /// Compute a route from `origin` to `destination`, preferring existing "virtual" links
    /// (nodes already holding >= 2 entanglement links with the current node, interpretable as a
    /// usable pre-established swap path) over the plain graph shortest path, whenever doing so
    /// strictly shortens the remaining distance. Returns `None` if `destination` is unreachable
    /// from `origin` in the physical graph.
    pub fn get_path(
        graph: &PhysicalGraph,
        nodes: &NodeTable,
        origin: NodeLabel,
        destination: NodeLabel,
    ) -> Option<Vec<NodeLabel>> {
        if origin == destination {
            return Some(vec![origin]);
        }

        let mut path = vec![origin];
        let mut current = origin;
        let mut guard = 0usize;
        let max_steps = nodes.len() * nodes.len() + 1;

        while current != destination {
            guard += 1;
            if guard > max_steps {
                // Should not happen given the termination argument in spec §4.E; bail out to
                // avoid a runaway loop rather than hang forever.
                return None;
            }

            let next_hop = shortest_path_next_hop(graph, current, destination)?;
            let virtual_neighbors: Vec<NodeLabel> =
                nodes.get(current).linked_labels().into_iter().filter(|&v| nodes.get(current).link_count(v) >= 2).collect();

            let step = if virtual_neighbors.is_empty() {
                next_hop
            } else {
                let next_hop_distance = crate::types::graph_distance(graph, next_hop, destination)?;
                let best = virtual_neighbors
                    .into_iter()
                    .filter_map(|v| crate::types::graph_distance(graph, v, destination).map(|d| (v, d)))
                    .min_by_key(|&(_, d)| d);
                match best {
                    Some((v, d)) if d < next_hop_distance => v,
                    _ => next_hop,
                }
            };

            path.push(step);
            current = step;
        }

        Some(path)
    }

    /// Full graph shortest path, ignoring virtual links -- used by the topology layer and tests
    /// for reference distances.
    pub fn shortest_path(graph: &PhysicalGraph, origin: NodeLabel, destination: NodeLabel) -> Option<Vec<NodeLabel>> {
        shortest_path(graph, origin, destination)
    }
}
