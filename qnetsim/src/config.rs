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

//! Simulation configuration: the parameter table of spec §6, plus validation (spec §7's
//! "Config invalid" failure row).

use crate::error::ConfigError;
use crate::policy::PolicyKind;
use crate::types::{NodeLabel, Tick};
use serde::{Deserialize, Serialize};

/// Network topology generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetType {
    /// nodes 0..N-1 connected in a cycle
    Ring,
    /// AS-style Internet topology (preferential-attachment growth)
    AsNet,
}

impl std::str::FromStr for NetType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ring" => Ok(NetType::Ring),
            "as_net" => Ok(NetType::AsNet),
            other => Err(other.to_string()),
        }
    }
}

/// Full set of simulation parameters (spec §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimConfig {
    /// node count
    pub net_size: NodeLabel,
    /// topology generator, used only when no topology file is supplied
    pub net_type: NetType,
    /// default memory-pool size per node
    pub memo_size: usize,
    /// default entanglement lifetime, in ticks
    pub memo_lifetime: Tick,
    /// entanglement generation success probability, in `[0, 1]`
    pub gen_prob: f64,
    /// entanglement swap success probability, in `[0, 1]`
    pub swap_prob: f64,
    /// generation policy
    pub policy: PolicyKind,
    /// adaptation weight, used iff `policy == Adaptive`, in `[0, 1)`
    pub adapt_param: f64,
    /// simulation tick bound (exclusive)
    pub end_tick: Tick,
    /// number of independent trials to run
    pub num_trials: usize,
    /// number of requests to submit
    pub queue_len: usize,
    /// tick of the first request submission
    pub queue_start: Tick,
    /// tick interval between consecutive request submissions
    pub queue_int: Tick,
    /// base RNG seed
    pub seed: u64,
}

impl SimConfig {
    /// Validate parameter ranges and cross-field constraints before tick 0. Does *not* validate
    /// topology/traffic files -- those are checked on load (see [`crate::topology`]).
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.net_size < 2 {
            return Err(ConfigError::NetSizeTooSmall(self.net_size));
        }
        for (name, value) in [("gen_prob", self.gen_prob), ("swap_prob", self.swap_prob)] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::ProbabilityOutOfRange { name, value });
            }
        }
        if self.policy == PolicyKind::Adaptive && !(0.0..1.0).contains(&self.adapt_param) {
            return Err(ConfigError::AdaptParamOutOfRange(self.adapt_param));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> SimConfig {
        SimConfig {
            net_size: 4,
            net_type: NetType::Ring,
            memo_size: 2,
            memo_lifetime: 100,
            gen_prob: 0.5,
            swap_prob: 1.0,
            policy: PolicyKind::Uniform,
            adapt_param: 0.0,
            end_tick: 1000,
            num_trials: 1,
            queue_len: 10,
            queue_start: 10,
            queue_int: 10,
            seed: 0,
        }
    }

    #[test]
    fn valid_config_passes() {
        assert!(base_config().validate().is_ok());
    }

    #[test]
    fn net_size_too_small_is_rejected() {
        let mut c = base_config();
        c.net_size = 1;
        assert_eq!(c.validate(), Err(ConfigError::NetSizeTooSmall(1)));
    }

    #[test]
    fn probability_out_of_range_is_rejected() {
        let mut c = base_config();
        c.gen_prob = 1.5;
        assert!(c.validate().is_err());
    }

    #[test]
    fn adapt_param_out_of_range_only_matters_for_adaptive() {
        let mut c = base_config();
        c.adapt_param = 1.0;
        assert!(c.validate().is_ok(), "non-adaptive policy ignores adapt_param");
        c.policy = PolicyKind::Adaptive;
        assert!(c.validate().is_err());
    }
}
