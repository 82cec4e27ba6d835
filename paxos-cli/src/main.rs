//! # paxos-cli
//!
//! Command-line launcher for a simulated run of the leaderless synod
//! consensus protocol. Spins up a cluster of in-process actors, launches
//! them, and reports each process's final decision.
//!
//! ```bash
//! # Five processes, default randomness
//! paxos-cli
//!
//! # Deterministic run with two processes armed to crash
//! paxos-cli --seed 42 --crash 0 --crash 2
//!
//! # Pin initial proposals and hold one process so it never retries
//! paxos-cli --propose 0=1 --propose 1=0 --hold 1
//! ```

use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use paxos_consensus::ProposeResult;
use paxos_runtime::{Cluster, ClusterConfig};

mod args;

use args::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(format!("paxos_cli={level},paxos_runtime={level},paxos_consensus={level}"))
        .init();

    let config = ClusterConfig {
        process_count: cli.processes,
        crash_probability: cli
            .crash_probability
            .unwrap_or(paxos_consensus::ALPHA),
        crash_armed: cli.crash_armed_set(),
        held: cli.held_set(),
        initial_proposals: cli.parsed_initial_proposals()?,
        seed: cli.seed,
    };

    info!(processes = config.process_count, seed = ?config.seed, "bootstrapping cluster");
    let mut cluster = Cluster::bootstrap(&config).await?;
    cluster.launch().await?;

    let results = cluster
        .wait_for_decisions(Duration::from_secs(cli.timeout_secs))
        .await;

    let mut decided = 0;
    let mut values = std::collections::HashSet::new();
    for (id, result) in results.iter().enumerate() {
        match result {
            ProposeResult::Decided(v) => {
                decided += 1;
                values.insert(*v);
                println!("p{id}: decided {v}");
            }
            ProposeResult::Aborted => println!("p{id}: aborted (no decision yet)"),
            ProposeResult::Undecided => println!("p{id}: undecided (timed out)"),
        }
    }

    if values.len() > 1 {
        println!("warning: processes disagree — this should never happen");
    }
    println!("{decided}/{} processes decided", config.process_count);

    cluster.shutdown();
    Ok(())
}
