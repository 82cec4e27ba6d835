//! Drives a single [`Process`] as a Tokio task: one envelope at a time, to
//! completion, with no interleaving — the run-to-completion actor loop the
//! protocol core assumes.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tracing::debug;

use paxos_consensus::{Envelope, Process, ProcessId, ProposeResult, RandomSource, Transport};

/// A spawned process: a handle to its task and a watch channel mirroring
/// its `propose_result` for external observers (the launcher, tests).
pub struct ProcessHandle {
    pub id: ProcessId,
    pub propose_result: watch::Receiver<ProposeResult>,
    pub task: tokio::task::JoinHandle<()>,
}

/// Spawns the actor loop for one process and returns a handle to observe it.
pub fn spawn_process(
    id: ProcessId,
    transport: Arc<dyn Transport>,
    rng: Box<dyn RandomSource>,
    crash_probability: f64,
    mut rx: mpsc::UnboundedReceiver<Envelope>,
) -> ProcessHandle {
    let mut process = Process::with_crash_probability(id, transport, rng, crash_probability);
    let (tx, propose_result) = watch::channel(process.propose_result());

    let task = tokio::spawn(async move {
        while let Some(envelope) = rx.recv().await {
            process.handle(envelope).await;
            // `send_if_modified` would be ideal here, but ProposeResult doesn't
            // implement the comparisons it needs; a plain send is cheap since
            // watch only retains the latest value anyway.
            let _ = tx.send(process.propose_result());
            if process.is_crashed() {
                debug!(process = %id, "process task exiting after crash");
            }
        }
    });

    ProcessHandle {
        id,
        propose_result,
        task,
    }
}
