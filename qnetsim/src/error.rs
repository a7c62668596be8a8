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

//! Module containing all error types

use thiserror::Error;

/// Main error type
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration is invalid; raised before tick 0
    #[error("Configuration Error: {0}")]
    Config(#[from] ConfigError),
    /// Failed to read or parse a topology/traffic-matrix/result file
    #[error("I/O Error: {0}")]
    Io(#[from] std::io::Error),
    /// Failed to (de)serialize JSON
    #[error("JSON Error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors raised while validating a [`crate::config::SimConfig`] or loading topology/traffic
/// input files, before the simulation starts.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    /// Unknown generation policy name
    #[error("Unknown generation policy: {0}")]
    UnknownPolicy(String),
    /// Unknown network topology generator name
    #[error("Unknown network type: {0}")]
    UnknownNetType(String),
    /// The adjacency matrix is not square
    #[error("Adjacency matrix is not square: {rows} rows, {cols} columns")]
    AdjacencyNotSquare {
        /// number of rows found
        rows: usize,
        /// number of columns found
        cols: usize,
    },
    /// The adjacency matrix is not symmetric
    #[error("Adjacency matrix is not symmetric at ({0}, {1})")]
    AdjacencyNotSymmetric(usize, usize),
    /// `memo_sizes` length does not match `net_size`
    #[error("memo_sizes has {found} entries, expected {expected}")]
    MemoSizesLengthMismatch {
        /// number of entries found
        found: usize,
        /// number of entries expected (net_size)
        expected: usize,
    },
    /// The traffic matrix is not square, or its shape does not match the network size
    #[error("Traffic matrix shape {rows}x{cols} does not match network size {expected}")]
    TrafficMatrixShapeMismatch {
        /// number of rows found
        rows: usize,
        /// number of columns found
        cols: usize,
        /// expected network size
        expected: usize,
    },
    /// A probability parameter was outside of `[0, 1]`
    #[error("{name} must be in [0, 1], got {value}")]
    ProbabilityOutOfRange {
        /// name of the offending parameter
        name: &'static str,
        /// the value that was out of range
        value: f64,
    },
    /// `adapt_param` was outside of `[0, 1)`
    #[error("adapt_param must be in [0, 1), got {0}")]
    AdaptParamOutOfRange(f64),
    /// `net_size` was zero or one (no possible links)
    #[error("net_size must be at least 2, got {0}")]
    NetSizeTooSmall(usize),
}
