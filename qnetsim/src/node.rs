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

//! Network nodes, and the cross-node entanglement protocol.
//!
//! A single [`Node`] only ever mutates its own memory pool directly. Operations that touch two
//! nodes at once (`create_link`, `swap`, cascading expiration) live on [`NodeTable`], which holds
//! every node and mediates between them the way [`crate::simulator::Simulator`]'s teacher,
//! `snowcap`'s `Network`, mediates BGP events between `Router`s rather than letting routers reach
//! into each other directly.

use crate::memory::MemoryHandle;
use crate::policy::GenerationPolicy;
use crate::pool::MemoryPool;
use crate::types::{graph_distance, NodeLabel, PhysicalGraph, Tick};
use log::{debug, trace};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::{HashMap, VecDeque};

/// A network vertex holding a fixed-size pool of quantum memories, a generation policy, and
/// per-active-request path bookkeeping.
#[derive(Debug)]
pub struct Node {
    label: NodeLabel,
    pool: MemoryPool,
    policy: GenerationPolicy,
    /// number of live entanglement links with each other node label (0 if none)
    link_count: HashMap<NodeLabel, u32>,
    /// per active request passing through this node: the route labels to its left
    left_to_connect: VecDeque<Vec<NodeLabel>>,
    /// per active request passing through this node: the route labels to its right
    right_to_connect: VecDeque<Vec<NodeLabel>>,
    rng: StdRng,
    gen_prob: f64,
    swap_prob: f64,
}

impl Node {
    /// Construct a node with an independent, seeded PRNG.
    pub fn new(
        label: NodeLabel,
        memo_size: usize,
        memo_lifetime: Tick,
        gen_prob: f64,
        swap_prob: f64,
        policy: GenerationPolicy,
        seed: u64,
    ) -> Self {
        Node {
            label,
            pool: MemoryPool::new(memo_size, memo_lifetime),
            policy,
            link_count: HashMap::new(),
            left_to_connect: VecDeque::new(),
            right_to_connect: VecDeque::new(),
            rng: StdRng::seed_from_u64(seed),
            gen_prob,
            swap_prob,
        }
    }

    /// This node's label.
    pub fn label(&self) -> NodeLabel {
        self.label
    }

    /// Read-only access to the memory pool (for invariant checks and tests).
    pub fn pool(&self) -> &MemoryPool {
        &self.pool
    }

    /// Read-only access to the generation policy.
    pub fn policy(&self) -> &GenerationPolicy {
        &self.policy
    }

    /// Mutable access to the generation policy (the simulator calls `update` on submission).
    pub fn policy_mut(&mut self) -> &mut GenerationPolicy {
        &mut self.policy
    }

    /// Number of live entanglement links with `other`.
    pub fn link_count(&self, other: NodeLabel) -> u32 {
        *self.link_count.get(&other).unwrap_or(&0)
    }

    /// All node labels this node has at least one live link with.
    pub fn linked_labels(&self) -> Vec<NodeLabel> {
        self.link_count.iter().filter(|(_, &c)| c > 0).map(|(&l, _)| l).collect()
    }

    fn increment_link(&mut self, other: NodeLabel) {
        *self.link_count.entry(other).or_insert(0) += 1;
    }

    fn decrement_link(&mut self, other: NodeLabel) {
        let count = self.link_count.entry(other).or_insert(0);
        assert!(*count > 0, "contract violation: decrementing a zero link count");
        *count -= 1;
    }

    /// Push a newly-submitted request's left/right route slices onto this node's FIFOs.
    pub fn push_route(&mut self, left: Vec<NodeLabel>, right: Vec<NodeLabel>) {
        self.left_to_connect.push_back(left);
        self.right_to_connect.push_back(right);
    }

    /// Pop the oldest active request's route slices, on its completion.
    pub fn pop_route(&mut self) {
        self.left_to_connect.pop_front();
        self.right_to_connect.pop_front();
    }

    fn any_linked(&self, labels: &[NodeLabel]) -> bool {
        labels.iter().any(|&l| self.link_count(l) > 0)
    }

    /// Index of a memory entangled with `other`, if any.
    fn memory_entangled_with(&self, other: NodeLabel) -> Option<usize> {
        self.pool.iter().find_map(|(i, m)| match m.entangled() {
            Some(rec) if rec.peer.node == other => Some(i),
            _ => None,
        })
    }
}

/// All nodes in the network, plus the cross-node entanglement protocol (component C/E of the
/// core: link creation, swapping, cascading expiration).
#[derive(Debug)]
pub struct NodeTable(Vec<Node>);

impl NodeTable {
    /// Wrap an already-constructed list of nodes, indexed by label (`nodes[i].label() == i`).
    pub fn new(nodes: Vec<Node>) -> Self {
        for (i, n) in nodes.iter().enumerate() {
            debug_assert_eq!(n.label(), i, "nodes must be ordered and labeled 0..N-1");
        }
        NodeTable(nodes)
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the table holds no nodes.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Borrow a node by label.
    pub fn get(&self, label: NodeLabel) -> &Node {
        &self.0[label]
    }

    /// Mutably borrow a node by label.
    pub fn get_mut(&mut self, label: NodeLabel) -> &mut Node {
        &mut self.0[label]
    }

    /// Iterate over all nodes in label order.
    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.0.iter()
    }

    fn pair_mut(&mut self, a: NodeLabel, b: NodeLabel) -> (&mut Node, &mut Node) {
        assert_ne!(a, b, "a node cannot be entangled with itself");
        if a < b {
            let (left, right) = self.0.split_at_mut(b);
            (&mut left[a], &mut right[0])
        } else {
            let (left, right) = self.0.split_at_mut(a);
            (&mut right[0], &mut left[b])
        }
    }

    fn entangle(&mut self, now: Tick, node_a: NodeLabel, idx_a: usize, node_b: NodeLabel, idx_b: usize) {
        let lifetime = self.0[node_a].pool.get(idx_a).lifetime();
        let expire_tick = now + lifetime;
        self.0[node_a]
            .pool
            .get_mut(idx_a)
            .set_entangled(MemoryHandle { node: node_b, index: idx_b }, expire_tick);
        self.0[node_b]
            .pool
            .get_mut(idx_b)
            .set_entangled(MemoryHandle { node: node_a, index: idx_a }, expire_tick);
    }

    fn try_entangle(&mut self, now: Tick, from: NodeLabel, to: NodeLabel) -> bool {
        let local_idx = match self.0[from].pool.reserve() {
            Some(i) => i,
            None => return false,
        };
        let other_idx = match self.0[to].pool.reserve() {
            Some(i) => i,
            None => {
                self.0[from].pool.free(local_idx);
                return false;
            }
        };
        self.entangle(now, from, local_idx, to, other_idx);
        self.0[from].increment_link(to);
        self.0[to].increment_link(from);
        debug!("link established: {} <-> {}", from, to);
        true
    }

    fn evict_random(&mut self, label: NodeLabel) -> usize {
        let candidates = self.0[label].pool.reserved_indices();
        let pick = self.0[label].rng.gen_range(0, candidates.len());
        let evict_idx = candidates[pick];
        self.expire_memory(label, evict_idx);
        evict_idx
    }

    fn reserve_or_evict(&mut self, label: NodeLabel) -> usize {
        match self.0[label].pool.reserve() {
            Some(idx) => idx,
            None => {
                self.evict_random(label);
                self.0[label].pool.reserve().expect("freed a slot via eviction")
            }
        }
    }

    /// Attempt on-demand entanglement generation between `from` and `other`, per spec §4.C.1.
    ///
    /// `d = graph_distance(from, other)`; success probability is `gen_prob^d · swap_prob^(d-1)`
    /// (for direct neighbors, `d = 1`, this is just `gen_prob`). Returns `false` (no state
    /// change) on the probabilistic roll, or if either side's memory pool is full.
    pub fn create_link(&mut self, graph: &PhysicalGraph, now: Tick, from: NodeLabel, other: NodeLabel) -> bool {
        let d = graph_distance(graph, from, other).expect("from and other must be connected") as i32;
        let gen_prob = self.0[from].gen_prob;
        let swap_prob = self.0[from].swap_prob;
        let success_prob = gen_prob.powi(d) * swap_prob.powi(d - 1);
        let roll: f64 = self.0[from].rng.gen();
        if roll > success_prob {
            trace!("generation roll failed: {} -> {} (p={})", from, other, success_prob);
            return false;
        }
        self.try_entangle(now, from, other)
    }

    /// Preemptive link creation, per spec §4.C.2: a single `gen_prob` draw (no distance
    /// discount), and a full pool is resolved by evicting a uniformly random reserved memory
    /// (cascading expire) rather than failing.
    pub fn create_link_with_priority(&mut self, now: Tick, from: NodeLabel, other: NodeLabel) -> bool {
        let gen_prob = self.0[from].gen_prob;
        let roll: f64 = self.0[from].rng.gen();
        if roll > gen_prob {
            return false;
        }
        let local_idx = self.reserve_or_evict(from);
        let other_idx = self.reserve_or_evict(other);
        self.entangle(now, from, local_idx, other, other_idx);
        self.0[from].increment_link(other);
        self.0[other].increment_link(from);
        debug!("priority link established: {} <-> {}", from, other);
        true
    }

    /// Continuous off-route generation, per spec §4.C.3: ask `from`'s policy which partner to
    /// try, then attempt ordinary `create_link`. A `None` choice (empty candidate set) is a
    /// skipped tick, per spec §7.
    pub fn create_random_link(&mut self, graph: &PhysicalGraph, now: Tick, from: NodeLabel) -> bool {
        let partner = {
            let node = &mut self.0[from];
            node.policy.choose(&mut node.rng)
        };
        match partner {
            Some(other) => self.create_link(graph, now, from, other),
            None => false,
        }
    }

    /// Clear `node`'s memory at `index`, cascading to the peer. No-op if the memory is already
    /// unreserved (the recursion base case, per spec §4.B/§7).
    pub fn expire_memory(&mut self, node: NodeLabel, index: usize) {
        if !self.0[node].pool.get(index).is_reserved() {
            return;
        }
        let record = self.0[node].pool.get(index).entangled();
        self.0[node].pool.get_mut(index).clear_entangled();
        self.0[node].pool.free(index);
        if let Some(record) = record {
            self.0[node].decrement_link(record.peer.node);
            self.expire_memory(record.peer.node, record.peer.index);
        }
    }

    /// Expiration sweep: expire every memory across every node whose `expire_tick <= now`.
    pub fn expire_sweep(&mut self, now: Tick) {
        for label in 0..self.0.len() {
            let expired: Vec<usize> = self.0[label]
                .pool
                .iter()
                .filter(|(_, m)| m.entangled().map_or(false, |r| r.expire_tick <= now))
                .map(|(i, _)| i)
                .collect();
            for index in expired {
                self.expire_memory(label, index);
            }
        }
    }

    /// Entanglement swap at `node`, consuming `mem_left` and `mem_right`'s current entanglement
    /// to forge (or fail to forge) a single direct link between their two remote partners. See
    /// spec §4.C.4. Returns whether the swap succeeded.
    ///
    /// # Panics
    /// Panics (contract violation) if either memory is not reserved.
    pub fn swap(&mut self, node: NodeLabel, mem_left: usize, mem_right: usize) -> bool {
        let left_rec = self.0[node]
            .pool
            .get(mem_left)
            .entangled()
            .filter(|_| self.0[node].pool.get(mem_left).is_reserved())
            .expect("contract violation: swap on an unreserved or unentangled memory");
        let right_rec = self.0[node]
            .pool
            .get(mem_right)
            .entangled()
            .filter(|_| self.0[node].pool.get(mem_right).is_reserved())
            .expect("contract violation: swap on an unreserved or unentangled memory");

        let swap_prob = self.0[node].swap_prob;
        let roll: f64 = self.0[node].rng.gen();
        if roll < swap_prob {
            self.0[node].pool.get_mut(mem_left).clear_entangled();
            self.0[node].pool.free(mem_left);
            self.0[node].pool.get_mut(mem_right).clear_entangled();
            self.0[node].pool.free(mem_right);
            self.0[node].decrement_link(left_rec.peer.node);
            self.0[node].decrement_link(right_rec.peer.node);

            let (node_l, node_r) = self.pair_mut(left_rec.peer.node, right_rec.peer.node);
            let l_expire = node_l.pool.get(left_rec.peer.index).entangled().unwrap().expire_tick;
            let r_expire = node_r.pool.get(right_rec.peer.index).entangled().unwrap().expire_tick;
            node_l.pool.get_mut(left_rec.peer.index).set_entangled(
                MemoryHandle { node: right_rec.peer.node, index: right_rec.peer.index },
                l_expire,
            );
            node_r.pool.get_mut(right_rec.peer.index).set_entangled(
                MemoryHandle { node: left_rec.peer.node, index: left_rec.peer.index },
                r_expire,
            );
            node_l.decrement_link(node);
            node_r.decrement_link(node);
            node_l.increment_link(right_rec.peer.node);
            node_r.increment_link(left_rec.peer.node);
            debug!("swap succeeded at {}: {} <-> {}", node, left_rec.peer.node, right_rec.peer.node);
            true
        } else {
            self.expire_memory(node, mem_left);
            self.expire_memory(node, mem_right);
            debug!("swap failed at {}", node);
            false
        }
    }

    /// Per-tick action for a node at `position` along `route` (spec §4.C.6). Returns the
    /// on-demand `(from, to)` pair generated this tick, if any.
    pub fn act_on_route(
        &mut self,
        now: Tick,
        route: &[NodeLabel],
        position: usize,
    ) -> Option<(NodeLabel, NodeLabel)> {
        let label = route[position];
        let k = route.len();

        if position == 0 {
            let right = route[1..].to_vec();
            if !self.0[label].any_linked(&right) {
                let direct_right = route[1];
                self.create_link_with_priority(now, label, direct_right);
                return Some((label, direct_right));
            }
            return None;
        }

        if position == k - 1 {
            let left = route[..k - 1].to_vec();
            if !self.0[label].any_linked(&left) {
                let direct_left = route[k - 2];
                self.create_link_with_priority(now, direct_left, label);
                return Some((direct_left, label));
            }
            return None;
        }

        let left = route[..position].to_vec();
        let right = route[position + 1..].to_vec();

        if !self.0[label].any_linked(&left) {
            let direct_left = route[position - 1];
            self.create_link_with_priority(now, direct_left, label);
            return Some((direct_left, label));
        }
        if !self.0[label].any_linked(&right) {
            let direct_right = route[position + 1];
            self.create_link_with_priority(now, label, direct_right);
            return Some((label, direct_right));
        }

        // both sides hold links: telescope toward a single long-range link via swap. Scan the
        // left slice nearest-to-farthest (the node just left of `label` is nearest) and the
        // right slice farthest-to-nearest, taking the first linked candidate on each side.
        let leftmost = left.iter().rev().find(|&&l| self.0[label].link_count(l) > 0).copied();
        let rightmost = right.iter().rev().find(|&&l| self.0[label].link_count(l) > 0).copied();
        let (leftmost, rightmost) = match (leftmost, rightmost) {
            (Some(l), Some(r)) => (l, r),
            _ => return None,
        };

        let left_mem = self.0[label].memory_entangled_with(leftmost);
        let right_mem = self.0[label].memory_entangled_with(rightmost);
        if let (Some(lm), Some(rm)) = (left_mem, right_mem) {
            self.swap(label, lm, rm);
        }
        None
    }

    /// Off-route behavior: unconditional continuous random generation (spec §4.C.7).
    pub fn act_off_route(&mut self, graph: &PhysicalGraph, now: Tick, label: NodeLabel) {
        self.create_random_link(graph, now, label);
    }
}
