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

//! The integer-tick simulation loop (spec §4.F): consumes a sorted request stack, dispatches
//! per-node actions for the single currently-served request, and records per-request and
//! per-tick metrics.

use crate::node::NodeTable;
use crate::request::{Request, Router};
use crate::types::{NodeLabel, PhysicalGraph, Tick};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};

/// Everything a trial produces, in the shape of `data_<policy>.json` (spec §6) minus the
/// across-trial aggregation, which `qnetsim_cli` computes over several `SimResult`s.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SimResult {
    /// `complete_tick - submit_tick`, one entry per completed request, completion order
    pub latencies: Vec<Tick>,
    /// `complete_tick - start_tick`, one entry per completed request, completion order
    pub service_times: Vec<Tick>,
    /// queue length recorded at the end of every tick
    pub congestion: Vec<usize>,
    /// per completed request: route-node pairs already linked at submission
    pub available_patterns: Vec<Vec<(NodeLabel, NodeLabel)>>,
    /// per completed request: `(from, to)` pairs generated on-demand while it was served
    pub ondemand_patterns: Vec<Vec<(NodeLabel, NodeLabel)>>,
}

/// Drives one trial: a fixed topology, a fixed node table, and a fixed request arrival schedule.
pub struct Simulator<'a> {
    graph: &'a PhysicalGraph,
    nodes: NodeTable,
    end_tick: Tick,
    pending: Vec<Request>,
    next_to_submit: usize,
    requests_to_serve: VecDeque<Request>,
    current_ondemand: Vec<(NodeLabel, NodeLabel)>,
    result: SimResult,
}

impl<'a> Simulator<'a> {
    /// Build a simulator over `graph`/`nodes`, with `requests` submitted in ascending
    /// `submit_tick` order (the caller is responsible for that ordering; spec §4.F assumes it).
    pub fn new(graph: &'a PhysicalGraph, nodes: NodeTable, requests: Vec<Request>, end_tick: Tick) -> Self {
        Simulator {
            graph,
            nodes,
            end_tick,
            pending: requests,
            next_to_submit: 0,
            requests_to_serve: VecDeque::new(),
            current_ondemand: Vec::new(),
            result: SimResult::default(),
        }
    }

    /// Read-only access to the node table, e.g. for invariant checks in tests.
    pub fn nodes(&self) -> &NodeTable {
        &self.nodes
    }

    /// Run ticks `0..end_tick`, or until both the pending stack and the serve queue drain, and
    /// return the accumulated result.
    pub fn run(mut self) -> SimResult {
        let mut t: Tick = 0;
        while t < self.end_tick {
            self.nodes.expire_sweep(t);
            self.submit(t);
            self.act(t);
            self.check_completion(t);
            self.result.congestion.push(self.requests_to_serve.len());

            if self.next_to_submit >= self.pending.len() && self.requests_to_serve.is_empty() {
                break;
            }
            t += 1;
        }
        info!(
            "trial finished at tick {}: {} requests completed",
            t,
            self.result.latencies.len()
        );
        self.result
    }

    fn submit(&mut self, t: Tick) {
        while self.next_to_submit < self.pending.len() && self.pending[self.next_to_submit].submit_tick == t {
            let mut request = self.pending[self.next_to_submit].clone();
            self.next_to_submit += 1;

            if request.is_trivial() {
                self.result.latencies.push(0);
                self.result.service_times.push(0);
                self.result.available_patterns.push(Vec::new());
                self.result.ondemand_patterns.push(Vec::new());
                continue;
            }

            let route = match Router::get_path(self.graph, &self.nodes, request.origin, request.destination) {
                Some(route) => route,
                None => {
                    warn!(
                        "no route from {} to {}, dropping request submitted at {}",
                        request.origin, request.destination, t
                    );
                    continue;
                }
            };

            request.available_pattern = self.record_route(&route);
            request.route = Some(route);

            let was_idle = self.requests_to_serve.is_empty();
            self.requests_to_serve.push_back(request);
            if was_idle {
                self.requests_to_serve.front_mut().unwrap().start_tick = t;
                self.current_ondemand.clear();
            }
        }
    }

    /// Push this route's left/right slices onto every member node's FIFO, run the adaptive
    /// update on each, and return the multiset of already-linked pairs among route members.
    fn record_route(&mut self, route: &[NodeLabel]) -> Vec<(NodeLabel, NodeLabel)> {
        let k = route.len();
        let route_set: HashSet<NodeLabel> = route.iter().copied().collect();
        let mut available = Vec::new();
        let mut seen = HashSet::new();

        for (i, &label) in route.iter().enumerate() {
            let left = route[..i].to_vec();
            let right = route[i + 1..].to_vec();
            let used: Vec<NodeLabel> = match i {
                0 => vec![route[1]],
                i if i == k - 1 => vec![route[k - 2]],
                i => vec![route[i - 1], route[i + 1]],
            };

            let linked = self.nodes.get(label).linked_labels();
            for &other in &linked {
                if other != label && route_set.contains(&other) {
                    let pair = if label < other { (label, other) } else { (other, label) };
                    if seen.insert(pair) {
                        available.push(pair);
                    }
                }
            }

            self.nodes.get_mut(label).policy_mut().update(&linked, &used);
            self.nodes.get_mut(label).push_route(left, right);
        }

        available
    }

    fn act(&mut self, t: Tick) {
        let route = self.requests_to_serve.front().and_then(|r| r.route.clone());
        for label in 0..self.nodes.len() {
            if let Some(route) = &route {
                if let Some(position) = route.iter().position(|&l| l == label) {
                    if let Some(pair) = self.nodes.act_on_route(t, route, position) {
                        self.current_ondemand.push(pair);
                    }
                    continue;
                }
            }
            self.nodes.act_off_route(self.graph, t, label);
        }
    }

    fn check_completion(&mut self, t: Tick) {
        let (origin, destination) = match self.requests_to_serve.front() {
            Some(r) => (r.origin, r.destination),
            None => return,
        };

        let completed_index = self
            .nodes
            .get(origin)
            .pool()
            .iter()
            .find_map(|(i, m)| m.entangled().filter(|rec| rec.peer.node == destination).map(|_| i));

        let index = match completed_index {
            Some(i) => i,
            None => return,
        };

        let request = self.requests_to_serve.pop_front().expect("head exists, just matched on it");
        let route = request.route.expect("served request always has a route");
        for &label in &route {
            self.nodes.get_mut(label).pop_route();
        }
        self.nodes.expire_memory(origin, index);

        self.result.latencies.push(t - request.submit_tick);
        self.result.service_times.push(t - request.start_tick);
        self.result.available_patterns.push(request.available_pattern);
        self.result.ondemand_patterns.push(std::mem::take(&mut self.current_ondemand));

        if let Some(next) = self.requests_to_serve.front_mut() {
            next.start_tick = t + 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Node;
    use crate::policy::GenerationPolicy;
    use crate::topology::Topology;

    fn two_node_network(gen_prob: f64, swap_prob: f64, memo_size: usize) -> (Topology, NodeTable) {
        let topo = Topology::ring(2, memo_size);
        let nodes = vec![
            Node::new(0, memo_size, Tick::MAX / 2, gen_prob, swap_prob, GenerationPolicy::uniform(vec![1]), 0),
            Node::new(1, memo_size, Tick::MAX / 2, gen_prob, swap_prob, GenerationPolicy::uniform(vec![0]), 1),
        ];
        (topo, NodeTable::new(nodes))
    }

    #[test]
    fn two_node_certain_generation_completes_at_submission_tick() {
        let (topo, nodes) = two_node_network(1.0, 1.0, 1);
        let requests = vec![Request::new(0, 0, 1)];
        let result = Simulator::new(&topo.graph, nodes, requests, 20).run();
        assert_eq!(result.latencies, vec![0]);
        assert_eq!(result.service_times, vec![0]);
    }

    #[test]
    fn impossible_generation_never_completes_and_queue_stays_full() {
        let (topo, nodes) = two_node_network(0.0, 1.0, 1);
        let requests = vec![Request::new(0, 0, 1)];
        let result = Simulator::new(&topo.graph, nodes, requests, 50).run();
        assert!(result.latencies.is_empty());
        assert!(result.congestion[1..].iter().all(|&c| c == 1));
    }

    #[test]
    fn trivial_request_completes_instantly_with_zero_latency() {
        let (topo, nodes) = two_node_network(1.0, 1.0, 1);
        let requests = vec![Request::new(5, 0, 0)];
        let result = Simulator::new(&topo.graph, nodes, requests, 10).run();
        assert_eq!(result.latencies, vec![0]);
        assert_eq!(result.service_times, vec![0]);
    }

    #[test]
    fn congestion_tracks_queue_length_across_multiple_requests() {
        let (topo, nodes) = two_node_network(1.0, 1.0, 2);
        let requests = vec![Request::new(0, 0, 1), Request::new(0, 0, 1)];
        let result = Simulator::new(&topo.graph, nodes, requests, 20).run();
        assert_eq!(result.latencies.len(), 2);
        assert!(result.congestion.iter().all(|&c| c <= 2));
    }
}
