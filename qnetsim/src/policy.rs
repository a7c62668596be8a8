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

//! Discrete distributions over candidate entanglement partners.
//!
//! The candidate set differs per variant (modeled explicitly in each variant's data, not via
//! conditional checks at call sites): [`GenerationPolicy::Uniform`] and
//! [`GenerationPolicy::Exponential`] range over all other nodes, while
//! [`GenerationPolicy::Adaptive`] ranges over direct graph neighbors only.

use crate::types::NodeLabel;
use rand::distributions::WeightedIndex;
use rand::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Name of a generation policy, as it appears in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
    /// [`GenerationPolicy::Uniform`]
    Uniform,
    /// [`GenerationPolicy::Exponential`]
    Exponential,
    /// [`GenerationPolicy::Adaptive`]
    Adaptive,
}

impl std::str::FromStr for PolicyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "uniform" => Ok(PolicyKind::Uniform),
            "exponential" => Ok(PolicyKind::Exponential),
            "adaptive" => Ok(PolicyKind::Adaptive),
            other => Err(other.to_string()),
        }
    }
}

/// A node's preference over which partner to attempt entanglement generation with.
#[derive(Debug, Clone)]
pub enum GenerationPolicy {
    /// Candidate set is all other nodes, uniform probability `1/(N-1)`. `update` is a no-op.
    Uniform {
        /// all other node labels
        candidates: Vec<NodeLabel>,
    },
    /// Candidate set is all other nodes, weight of `v` is `1 / graph_distance(self, v)`,
    /// normalized. `update` is a no-op.
    Exponential {
        /// all other node labels
        candidates: Vec<NodeLabel>,
        /// normalized weight per candidate, same order as `candidates`
        weights: Vec<f64>,
    },
    /// Candidate set is direct graph neighbors only, initially uniform. `update` runs the
    /// adaptive re-weighting algorithm.
    Adaptive {
        /// adaptation weight in `[0, 1)`
        alpha: f64,
        /// direct graph neighbors, fixed at construction
        neighbors: Vec<NodeLabel>,
        /// current probability per neighbor, same order as `neighbors`
        probs: Vec<f64>,
    },
}

impl GenerationPolicy {
    /// Build a [`GenerationPolicy::Uniform`] over `other_nodes`.
    pub fn uniform(other_nodes: Vec<NodeLabel>) -> Self {
        GenerationPolicy::Uniform { candidates: other_nodes }
    }

    /// Build a [`GenerationPolicy::Exponential`] over `other_nodes`, weighting each by the
    /// inverse of its graph distance from `distance_from`.
    pub fn exponential(other_nodes: Vec<NodeLabel>, distances: &[u32]) -> Self {
        assert_eq!(other_nodes.len(), distances.len());
        let raw: Vec<f64> = distances.iter().map(|&d| 1.0 / d.max(1) as f64).collect();
        let sum: f64 = raw.iter().sum();
        let weights = raw.into_iter().map(|w| w / sum).collect();
        GenerationPolicy::Exponential { candidates: other_nodes, weights }
    }

    /// Build a [`GenerationPolicy::Adaptive`] over `neighbors`, uniform initial distribution.
    pub fn adaptive(neighbors: Vec<NodeLabel>, alpha: f64) -> Self {
        let n = neighbors.len();
        let probs = vec![1.0 / n as f64; n];
        GenerationPolicy::Adaptive { alpha, neighbors, probs }
    }

    /// Candidate partners this policy may choose among.
    pub fn candidates(&self) -> &[NodeLabel] {
        match self {
            GenerationPolicy::Uniform { candidates } => candidates,
            GenerationPolicy::Exponential { candidates, .. } => candidates,
            GenerationPolicy::Adaptive { neighbors, .. } => neighbors,
        }
    }

    /// Current probability distribution, same order as [`Self::candidates`].
    pub fn probabilities(&self) -> Vec<f64> {
        match self {
            GenerationPolicy::Uniform { candidates } => {
                vec![1.0 / candidates.len() as f64; candidates.len()]
            }
            GenerationPolicy::Exponential { weights, .. } => weights.clone(),
            GenerationPolicy::Adaptive { probs, .. } => probs.clone(),
        }
    }

    /// Draw one partner label according to the current distribution. Returns `None` only when
    /// the candidate set is empty (an isolated node in the physical graph under the adaptive
    /// policy; spec.md §7 treats this as a skipped tick).
    pub fn choose(&self, rng: &mut impl Rng) -> Option<NodeLabel> {
        let candidates = self.candidates();
        if candidates.is_empty() {
            return None;
        }
        let weights = self.probabilities();
        let dist = WeightedIndex::new(&weights).expect("distribution sums to a positive value");
        Some(candidates[dist.sample(rng)])
    }

    /// Adapt the distribution after one submitted request, per spec.md §4.D.1. No-op for
    /// [`GenerationPolicy::Uniform`] and [`GenerationPolicy::Exponential`].
    pub fn update(&mut self, available: &[NodeLabel], used: &[NodeLabel]) {
        let (alpha, neighbors, probs) = match self {
            GenerationPolicy::Adaptive { alpha, neighbors, probs } => (*alpha, neighbors, probs),
            _ => return,
        };

        let neighbor_set: HashSet<NodeLabel> = neighbors.iter().copied().collect();
        let avail: HashSet<NodeLabel> =
            available.iter().copied().filter(|v| neighbor_set.contains(v)).collect();
        let used_set: HashSet<NodeLabel> =
            used.iter().copied().filter(|v| neighbor_set.contains(v)).collect();

        let index_of = |label: NodeLabel| neighbors.iter().position(|&n| n == label).unwrap();

        let t_set: HashSet<NodeLabel> = used_set.difference(&avail).copied().collect();
        if !t_set.is_empty() {
            let sigma: f64 = used_set.iter().map(|&v| probs[index_of(v)]).sum();
            let increase = (alpha / t_set.len() as f64) * (1.0 - sigma);
            for &t in &t_set {
                probs[index_of(t)] += increase;
            }
        }

        let not_used: HashSet<NodeLabel> = neighbor_set.difference(&used_set).copied().collect();
        if !not_used.is_empty() {
            let sigma_prime: f64 = used_set.iter().map(|&v| probs[index_of(v)]).sum();
            let level = (1.0 - sigma_prime) / not_used.len() as f64;
            for &v in &not_used {
                probs[index_of(v)] = level;
            }
        }
    }
}
