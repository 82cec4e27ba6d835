//! Command-line arguments for a single simulated consensus run.

use std::collections::{HashMap, HashSet};

use anyhow::{bail, Context, Result};
use clap::Parser;

/// Runs a cluster of synod processes in-process and reports how each one
/// resolved its proposal.
#[derive(Debug, Parser)]
#[command(name = "paxos-cli")]
#[command(about = "Simulate a leaderless binary consensus run")]
pub struct Cli {
    /// Number of processes in the cluster.
    #[arg(short = 'n', long, default_value = "5")]
    pub processes: usize,

    /// Deterministic seed for every process's random source. Omit for
    /// thread-local randomness (a different outcome on every run).
    #[arg(long)]
    pub seed: Option<u64>,

    /// Probability that an armed process crashes at each check point.
    /// Defaults to the protocol's own α.
    #[arg(long)]
    pub crash_probability: Option<f64>,

    /// Process id to arm with probabilistic crashing. May be repeated.
    #[arg(long = "crash", value_name = "ID")]
    pub crash_armed: Vec<usize>,

    /// Process id to hold (suppress automatic retry after an abort). May
    /// be repeated.
    #[arg(long = "hold", value_name = "ID")]
    pub held: Vec<usize>,

    /// Pin a process's initial proposal, as `ID=VALUE` with VALUE in
    /// `{0, 1}`. Processes not listed draw their proposal at random.
    /// May be repeated.
    #[arg(long = "propose", value_name = "ID=VALUE")]
    pub initial_proposals: Vec<String>,

    /// Seconds to wait for every process to decide before giving up.
    #[arg(long, default_value = "5")]
    pub timeout_secs: u64,

    /// Enable debug-level logging.
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Parses the repeated `ID=VALUE` proposal arguments into a map,
    /// rejecting malformed entries and values outside `{0, 1}`.
    pub fn parsed_initial_proposals(&self) -> Result<HashMap<usize, u8>> {
        let mut map = HashMap::with_capacity(self.initial_proposals.len());
        for entry in &self.initial_proposals {
            let (id, value) = entry
                .split_once('=')
                .with_context(|| format!("--propose expects ID=VALUE, got `{entry}`"))?;
            let id: usize = id.parse().with_context(|| format!("invalid process id in `{entry}`"))?;
            let value: u8 = value.parse().with_context(|| format!("invalid value in `{entry}`"))?;
            if value > 1 {
                bail!("--propose value must be 0 or 1, got {value} in `{entry}`");
            }
            map.insert(id, value);
        }
        Ok(map)
    }

    pub fn crash_armed_set(&self) -> HashSet<usize> {
        self.crash_armed.iter().copied().collect()
    }

    pub fn held_set(&self) -> HashSet<usize> {
        self.held.iter().copied().collect()
    }
}
