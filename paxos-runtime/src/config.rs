//! Cluster-wide configuration for a simulated run.

use std::collections::HashSet;

use paxos_consensus::ProcessId;
use serde::{Deserialize, Serialize};

/// Settings for one simulated cluster run.
///
/// Loaded from `paxos-cli`'s command-line arguments; there is no file or
/// environment layering here, unlike a long-lived server's configuration
/// — a single simulation run only ever needs the values a caller passes
/// on the command line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterConfig {
    /// Number of processes in the cluster.
    pub process_count: usize,

    /// Crash probability (α) applied at every crash check point for a
    /// process that has been armed.
    pub crash_probability: f64,

    /// Processes to arm with probabilistic crashing before launch.
    pub crash_armed: HashSet<usize>,

    /// Processes to put on hold (suppress re-propose after abort) before launch.
    pub held: HashSet<usize>,

    /// Per-process initial proposals. When a process's id is absent, it
    /// draws its own uniform proposal from `{0, 1}` on launch.
    pub initial_proposals: std::collections::HashMap<usize, u8>,

    /// Deterministic seed for the random sources. `None` uses thread-local
    /// randomness.
    pub seed: Option<u64>,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            process_count: 3,
            crash_probability: paxos_consensus::ALPHA,
            crash_armed: HashSet::new(),
            held: HashSet::new(),
            initial_proposals: std::collections::HashMap::new(),
            seed: None,
        }
    }
}

impl ClusterConfig {
    pub fn peer_ids(&self) -> Vec<ProcessId> {
        (0..self.process_count).map(ProcessId).collect()
    }
}
