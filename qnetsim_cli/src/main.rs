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

use clap::Clap;
use log::info;
use qnetsim::types::graph_distance;
use qnetsim::{
    GenerationPolicy, NetType, Node, NodeTable, PolicyKind, Request, SimConfig, SimResult,
    Simulator, Topology, TrafficMatrix,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use std::error::Error;
use std::sync::mpsc::channel;
use std::thread::spawn;

fn main() -> Result<(), Box<dyn Error>> {
    pretty_env_logger::init();

    let args = CommandLineArguments::parse();
    let config = args.to_config();
    config.validate()?;

    let topology = match &args.topology {
        Some(path) => Topology::load_json(path, config.memo_size)?,
        None => match config.net_type {
            NetType::Ring => Topology::ring(config.net_size, config.memo_size),
            NetType::AsNet => {
                let mut rng = StdRng::seed_from_u64(config.seed);
                Topology::as_net(config.net_size, config.memo_size, 3, &mut rng)
            }
        },
    };

    let traffic = match &args.traffic {
        Some(path) => TrafficMatrix::load_json(path, config.net_size)?,
        None => {
            let mut rng = StdRng::seed_from_u64(config.seed ^ 0x7A_FF1C);
            TrafficMatrix::uniform_random(config.net_size, &mut rng)
        }
    };

    let trials: Vec<SimResult> = run_trials(&topology, &traffic, &config);

    let output = aggregate(&trials);
    let filename = args
        .output
        .unwrap_or_else(|| format!("data_{}.json", policy_name(config.policy)));
    std::fs::write(&filename, serde_json::to_string_pretty(&output)?)?;
    info!("wrote {} trials to {}", trials.len(), filename);

    Ok(())
}

fn run_trials(topology: &Topology, traffic: &TrafficMatrix, config: &SimConfig) -> Vec<SimResult> {
    let (tx, rx) = channel();
    let mut handles = Vec::with_capacity(config.num_trials);

    for trial in 0..config.num_trials {
        let topology = topology.clone();
        let traffic = traffic.clone();
        let config = config.clone();
        let tx = tx.clone();
        handles.push(spawn(move || {
            let result = run_single_trial(&topology, &traffic, &config, trial as u64);
            tx.send((trial, result)).expect("receiver outlives every trial thread");
        }));
    }
    drop(tx);

    let mut results: Vec<Option<SimResult>> = (0..config.num_trials).map(|_| None).collect();
    for (trial, result) in rx {
        results[trial] = Some(result);
    }
    for handle in handles {
        handle.join().expect("trial thread panicked");
    }
    results.into_iter().map(|r| r.expect("every trial sent exactly one result")).collect()
}

fn run_single_trial(topology: &Topology, traffic: &TrafficMatrix, config: &SimConfig, trial: u64) -> SimResult {
    let base_seed = config.seed.wrapping_add(trial.wrapping_mul(1_000_003));
    let nodes = build_node_table(topology, config, base_seed);

    let mut arrival_rng = StdRng::seed_from_u64(base_seed ^ 0x5EED_u64);
    let schedule = qnetsim::topology::request_schedule(config.queue_start, config.queue_len, config.queue_int);
    let requests = schedule
        .into_iter()
        .map(|submit_tick| {
            let (origin, destination) = traffic.sample_pair(&mut arrival_rng);
            Request::new(submit_tick, origin, destination)
        })
        .collect();

    Simulator::new(&topology.graph, nodes, requests, config.end_tick).run()
}

fn build_node_table(topology: &Topology, config: &SimConfig, seed: u64) -> NodeTable {
    let n = config.net_size;
    let nodes = (0..n)
        .map(|label| {
            let others: Vec<usize> = (0..n).filter(|&j| j != label).collect();
            let policy = match config.policy {
                PolicyKind::Uniform => GenerationPolicy::uniform(others),
                PolicyKind::Exponential => {
                    let distances: Vec<u32> = others
                        .iter()
                        .map(|&o| graph_distance(&topology.graph, label, o).unwrap_or(n as u32))
                        .collect();
                    GenerationPolicy::exponential(others, &distances)
                }
                PolicyKind::Adaptive => {
                    let neighbors: Vec<usize> =
                        topology.graph.neighbors(petgraph::graph::NodeIndex::new(label)).map(|idx| idx.index()).collect();
                    GenerationPolicy::adaptive(neighbors, config.adapt_param)
                }
            };
            let memo_size = topology.memo_sizes.get(label).copied().unwrap_or(config.memo_size);
            Node::new(label, memo_size, config.memo_lifetime, config.gen_prob, config.swap_prob, policy, seed + label as u64)
        })
        .collect();
    NodeTable::new(nodes)
}

/// `data_<policy>.json` per spec.md §6, aggregated across trials the way
/// `original_source/main.py`'s trailing aggregation block does: truncate every trial's
/// latencies/service_times to the shortest trial's completed-request count before averaging.
#[derive(Debug, Serialize)]
struct OutputFile {
    latencies: Vec<Vec<u64>>,
    service_times: Vec<Vec<u64>>,
    average_latencies: Vec<f64>,
    average_service_times: Vec<f64>,
    accumulated_available_patterns: Vec<Vec<(usize, usize)>>,
    accumulated_ondemand_patterns: Vec<Vec<(usize, usize)>>,
}

fn aggregate(trials: &[SimResult]) -> OutputFile {
    let shortest = trials.iter().map(|t| t.latencies.len()).min().unwrap_or(0);

    let average_latencies = (0..shortest)
        .map(|i| {
            let sum: u64 = trials.iter().map(|t| t.latencies[i]).sum();
            sum as f64 / trials.len().max(1) as f64
        })
        .collect();
    let average_service_times = (0..shortest)
        .map(|i| {
            let sum: u64 = trials.iter().map(|t| t.service_times[i]).sum();
            sum as f64 / trials.len().max(1) as f64
        })
        .collect();

    OutputFile {
        latencies: trials.iter().map(|t| t.latencies.clone()).collect(),
        service_times: trials.iter().map(|t| t.service_times.clone()).collect(),
        average_latencies,
        average_service_times,
        accumulated_available_patterns: trials.iter().flat_map(|t| t.available_patterns.clone()).collect(),
        accumulated_ondemand_patterns: trials.iter().flat_map(|t| t.ondemand_patterns.clone()).collect(),
    }
}

fn policy_name(policy: PolicyKind) -> &'static str {
    match policy {
        PolicyKind::Uniform => "uniform",
        PolicyKind::Exponential => "exponential",
        PolicyKind::Adaptive => "adaptive",
    }
}

/// Command-line surface for the parameter table of spec.md §6.
#[derive(Clap, Debug)]
#[clap(name = "qnetsim", author = "Tibor Schneider")]
struct CommandLineArguments {
    /// Number of nodes
    #[clap(long, default_value = "10")]
    net_size: usize,
    /// Topology generator to use when `--topology` is not given
    #[clap(arg_enum, long, default_value = "ring")]
    net_type: CliNetType,
    /// Default memory-pool size per node
    #[clap(long, default_value = "4")]
    memo_size: usize,
    /// Default entanglement lifetime, in ticks
    #[clap(long, default_value = "1000")]
    memo_lifetime: u64,
    /// Entanglement generation success probability
    #[clap(long, default_value = "0.3")]
    gen_prob: f64,
    /// Entanglement swap success probability
    #[clap(long, default_value = "0.9")]
    swap_prob: f64,
    /// Generation policy
    #[clap(arg_enum, long, default_value = "uniform")]
    policy: CliPolicyKind,
    /// Adaptation weight, used iff policy = adaptive
    #[clap(long, default_value = "0.05")]
    adapt_param: f64,
    /// Simulation tick bound (exclusive)
    #[clap(long, default_value = "20000")]
    end_tick: u64,
    /// Number of independent trials to run
    #[clap(long, default_value = "1")]
    num_trials: usize,
    /// Number of requests to submit
    #[clap(long, default_value = "10")]
    queue_len: usize,
    /// Tick of the first request submission
    #[clap(long, default_value = "10")]
    queue_start: u64,
    /// Tick interval between consecutive request submissions
    #[clap(long, default_value = "100")]
    queue_int: u64,
    /// Base RNG seed
    #[clap(long, default_value = "42")]
    seed: u64,
    /// Load the topology from this network.json file instead of generating one
    #[clap(long)]
    topology: Option<String>,
    /// Load the traffic matrix from this traffic_matrix.json file instead of generating one
    #[clap(long)]
    traffic: Option<String>,
    /// Output file to write results to (defaults to data_<policy>.json)
    #[clap(short, long)]
    output: Option<String>,
}

impl CommandLineArguments {
    fn to_config(&self) -> SimConfig {
        SimConfig {
            net_size: self.net_size,
            net_type: self.net_type.into(),
            memo_size: self.memo_size,
            memo_lifetime: self.memo_lifetime,
            gen_prob: self.gen_prob,
            swap_prob: self.swap_prob,
            policy: self.policy.into(),
            adapt_param: self.adapt_param,
            end_tick: self.end_tick,
            num_trials: self.num_trials,
            queue_len: self.queue_len,
            queue_start: self.queue_start,
            queue_int: self.queue_int,
            seed: self.seed,
        }
    }
}

#[derive(Clap, Debug, Clone, Copy)]
enum CliNetType {
    Ring,
    AsNet,
}

impl From<CliNetType> for NetType {
    fn from(v: CliNetType) -> Self {
        match v {
            CliNetType::Ring => NetType::Ring,
            CliNetType::AsNet => NetType::AsNet,
        }
    }
}

#[derive(Clap, Debug, Clone, Copy)]
enum CliPolicyKind {
    Uniform,
    Exponential,
    Adaptive,
}

impl From<CliPolicyKind> for PolicyKind {
    fn from(v: CliPolicyKind) -> Self {
        match v {
            CliPolicyKind::Uniform => PolicyKind::Uniform,
            CliPolicyKind::Exponential => PolicyKind::Exponential,
            CliPolicyKind::Adaptive => PolicyKind::Adaptive,
        }
    }
}
