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

//! Discrete-event simulation of request-serving dynamics in a quantum entanglement network.
//!
//! A physical graph of nodes, each holding a fixed-size pool of quantum memories, serves a
//! stream of end-to-end entanglement requests by generating pairwise links on demand and
//! consolidating them through entanglement swaps, under a configurable per-node link-generation
//! policy (uniform, distance-weighted, or adaptive to observed traffic).

pub mod config;
pub mod error;
pub mod memory;
pub mod node;
pub mod policy;
pub mod pool;
pub mod request;
pub mod simulator;
pub mod topology;
pub mod types;

#[cfg(test)]
mod test;

pub use config::{NetType, SimConfig};
pub use error::{ConfigError, Error};
pub use node::{Node, NodeTable};
pub use policy::{GenerationPolicy, PolicyKind};
pub use request::{Request, Router};
pub use simulator::{SimResult, Simulator};
pub use topology::{Topology, TrafficMatrix};
pub use types::{NodeLabel, PhysicalGraph, Tick};
