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

//! The greedy, virtual-link-aware router (spec.md §4.E), including scenario 3 from §8.

use crate::node::{Node, NodeTable};
use crate::policy::GenerationPolicy;
use crate::request::Router;
use crate::topology::Topology;

fn ring_of_four() -> (Topology, NodeTable) {
    let topo = Topology::ring(4, 1);
    let nodes = (0..4)
        .map(|i| {
            let others: Vec<usize> = (0..4).filter(|&j| j != i).collect();
            Node::new(i, 1, 1000, 1.0, 1.0, GenerationPolicy::uniform(others), i as u64)
        })
        .collect();
    (topo, NodeTable::new(nodes))
}

#[test]
fn ring_of_four_takes_one_of_the_two_symmetric_shortest_paths() {
    let (topo, nodes) = ring_of_four();
    let route = Router::get_path(&topo.graph, &nodes, 0, 2).unwrap();
    assert_eq!(route.first(), Some(&0));
    assert_eq!(route.last(), Some(&2));
    assert!(route == vec![0, 1, 2] || route == vec![0, 3, 2]);
    assert_eq!(route.len(), 3);
}

#[test]
fn unreachable_destination_returns_none() {
    // two disconnected pairs: 0-1 and 2-3
    let topo = Topology::from_adjacency(&[vec![0, 1, 0, 0], vec![1, 0, 0, 0], vec![0, 0, 0, 1], vec![0, 0, 1, 0]], None, 1).unwrap();
    let nodes: Vec<Node> = (0..4).map(|i| Node::new(i, 1, 1000, 1.0, 1.0, GenerationPolicy::uniform(vec![]), i as u64)).collect();
    let nodes = NodeTable::new(nodes);
    assert!(Router::get_path(&topo.graph, &nodes, 0, 3).is_none());
}

#[test]
fn virtual_neighbor_shortcut_is_taken_when_strictly_closer() {
    // ring of 6: 0-1-2-3-4-5-0. node 0 holds two links with node 2 (distance 2, not a direct
    // neighbor) -- a "virtual" shortcut. Routing 0 -> 3 should jump straight to node 2 rather
    // than following the plain shortest-path next hop (1 or 5), since dist(2, 3) = 1 is strictly
    // less than dist(1, 3) = dist(5, 3) = 2.
    let topo = Topology::ring(6, 2);
    let nodes: Vec<Node> = (0..6)
        .map(|i| {
            let others: Vec<usize> = (0..6).filter(|&j| j != i).collect();
            Node::new(i, 2, 1000, 1.0, 1.0, GenerationPolicy::uniform(others), i as u64)
        })
        .collect();
    let mut nodes = NodeTable::new(nodes);

    assert!(nodes.create_link(&topo.graph, 0, 0, 2));
    assert!(nodes.create_link(&topo.graph, 0, 0, 2));
    assert_eq!(nodes.get(0).link_count(2), 2);

    let route = Router::get_path(&topo.graph, &nodes, 0, 3).unwrap();
    assert_eq!(route[0], 0);
    assert_eq!(route[1], 2, "router should take the virtual shortcut to node 2");
    assert_eq!(*route.last().unwrap(), 3);
}

#[test]
fn trivial_route_is_single_node() {
    let (topo, nodes) = ring_of_four();
    let route = Router::get_path(&topo.graph, &nodes, 1, 1).unwrap();
    assert_eq!(route, vec![1]);
}
