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

//! Cross-node invariants from spec.md §8: link symmetry, link pairing, TTL enforcement, and
//! swap-failure propagation.

use crate::node::{Node, NodeTable};
use crate::policy::GenerationPolicy;
use crate::topology::Topology;

fn line_of_three(memo_size: usize, gen_prob: f64, swap_prob: f64) -> (Topology, NodeTable) {
    let topo = Topology::from_adjacency(
        &[vec![0, 1, 0], vec![1, 0, 1], vec![0, 1, 0]],
        None,
        memo_size,
    )
    .unwrap();
    let nodes = vec![
        Node::new(0, memo_size, 1000, gen_prob, swap_prob, GenerationPolicy::uniform(vec![1, 2]), 1),
        Node::new(1, memo_size, 1000, gen_prob, swap_prob, GenerationPolicy::uniform(vec![0, 2]), 2),
        Node::new(2, memo_size, 1000, gen_prob, swap_prob, GenerationPolicy::uniform(vec![0, 1]), 3),
    ];
    (topo, NodeTable::new(nodes))
}

fn assert_link_symmetry(nodes: &NodeTable) {
    for u in 0..nodes.len() {
        for v in 0..nodes.len() {
            assert_eq!(nodes.get(u).link_count(v), nodes.get(v).link_count(u), "asymmetric link count {}/{}", u, v);
        }
    }
}

#[test]
fn link_creation_is_symmetric_and_pairs_correctly() {
    let (_topo, mut nodes) = line_of_three(2, 1.0, 1.0);
    let graph = Topology::from_adjacency(&[vec![0, 1, 0], vec![1, 0, 1], vec![0, 1, 0]], None, 2).unwrap().graph;

    assert!(nodes.create_link(&graph, 0, 0, 1));
    assert_link_symmetry(&nodes);

    let mem0 = nodes.get(0).pool().iter().find_map(|(i, m)| m.entangled().map(|_| i)).unwrap();
    let rec0 = nodes.get(0).pool().get(mem0).entangled().unwrap();
    let rec1 = nodes.get(rec0.peer.node).pool().get(rec0.peer.index).entangled().unwrap();
    assert_eq!(rec1.peer.node, 0);
    assert_eq!(rec1.peer.index, mem0);
    assert_eq!(rec1.expire_tick, rec0.expire_tick);
}

#[test]
fn expiration_sweep_enforces_ttl() {
    let (topo, mut nodes) = line_of_three(2, 1.0, 1.0);
    assert!(nodes.create_link(&topo.graph, 0, 0, 1));
    let expire_tick = nodes.get(0).pool().iter().find_map(|(_, m)| m.entangled().map(|r| r.expire_tick)).unwrap();

    nodes.expire_sweep(expire_tick - 1);
    assert!(nodes.get(0).pool().iter().any(|(_, m)| m.entangled().is_some()), "should not expire early");

    nodes.expire_sweep(expire_tick);
    for (_, m) in nodes.get(0).pool().iter() {
        if let Some(rec) = m.entangled() {
            assert!(rec.expire_tick > expire_tick, "memory still entangled past its expire tick");
        }
    }
}

#[test]
fn swap_failure_expires_all_four_memories_and_decrements_both_link_counts() {
    // scenario 6: pre-existing links on each side of the middle node, swap_prob = 0
    let (topo, mut nodes) = line_of_three(2, 1.0, 0.0);
    assert!(nodes.create_link(&topo.graph, 0, 0, 1));
    assert!(nodes.create_link(&topo.graph, 0, 2, 1));
    assert_link_symmetry(&nodes);
    assert_eq!(nodes.get(1).link_count(0), 1);
    assert_eq!(nodes.get(1).link_count(2), 1);

    let mem_left = nodes.get(1).pool().iter().find_map(|(i, m)| m.entangled().filter(|r| r.peer.node == 0).map(|_| i)).unwrap();
    let mem_right = nodes.get(1).pool().iter().find_map(|(i, m)| m.entangled().filter(|r| r.peer.node == 2).map(|_| i)).unwrap();

    let succeeded = nodes.swap(1, mem_left, mem_right);
    assert!(!succeeded, "swap_prob = 0 must never succeed");

    assert_eq!(nodes.get(1).link_count(0), 0);
    assert_eq!(nodes.get(1).link_count(2), 0);
    assert_eq!(nodes.get(0).link_count(1), 0);
    assert_eq!(nodes.get(2).link_count(1), 0);
    assert_link_symmetry(&nodes);

    for (_, m) in nodes.get(0).pool().iter() {
        assert!(!m.is_reserved());
    }
    for (_, m) in nodes.get(1).pool().iter() {
        assert!(!m.is_reserved());
    }
    for (_, m) in nodes.get(2).pool().iter() {
        assert!(!m.is_reserved());
    }
}

#[test]
fn successful_swap_preserves_each_sides_original_expire_tick() {
    let (topo, mut nodes) = line_of_three(2, 1.0, 1.0);
    assert!(nodes.create_link(&topo.graph, 5, 0, 1));
    assert!(nodes.create_link(&topo.graph, 9, 2, 1));

    let left_expire = nodes.get(0).pool().iter().find_map(|(_, m)| m.entangled().map(|r| r.expire_tick)).unwrap();
    let right_expire = nodes.get(2).pool().iter().find_map(|(_, m)| m.entangled().map(|r| r.expire_tick)).unwrap();
    assert_ne!(left_expire, right_expire, "test setup must use distinct tick origins");

    let mem_left = nodes.get(1).pool().iter().find_map(|(i, m)| m.entangled().filter(|r| r.peer.node == 0).map(|_| i)).unwrap();
    let mem_right = nodes.get(1).pool().iter().find_map(|(i, m)| m.entangled().filter(|r| r.peer.node == 2).map(|_| i)).unwrap();
    assert!(nodes.swap(1, mem_left, mem_right));

    let new_left_expire = nodes.get(0).pool().iter().find_map(|(_, m)| m.entangled().map(|r| r.expire_tick)).unwrap();
    let new_right_expire = nodes.get(2).pool().iter().find_map(|(_, m)| m.entangled().map(|r| r.expire_tick)).unwrap();
    assert_eq!(new_left_expire, left_expire);
    assert_eq!(new_right_expire, right_expire);
    assert_eq!(nodes.get(0).link_count(2), 1);
    assert_eq!(nodes.get(2).link_count(0), 1);
    assert_link_symmetry(&nodes);
}
