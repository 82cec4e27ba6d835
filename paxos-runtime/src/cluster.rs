//! Bootstraps a cluster of processes over an in-process [`ChannelTransport`]
//! and drives them through `ActorInfo` → optional `Crash`/`Hold` → `Launch`.

use std::sync::Arc;

use paxos_consensus::{
    ConsensusMessage, ProcessId, ProposeResult, RandomSource, SeededRandomSource,
    ThreadRandomSource, Transport,
};
use tracing::info;

use crate::actor::{spawn_process, ProcessHandle};
use crate::config::ClusterConfig;
use crate::transport::ChannelTransport;

/// A running cluster: one task per process, addressable by id.
pub struct Cluster {
    transport: Arc<ChannelTransport>,
    handles: Vec<ProcessHandle>,
}

impl Cluster {
    /// Builds every process task, wires up the shared transport, and sends
    /// the one-time `ActorInfo` plus any configured `Crash`/`Hold` arming —
    /// but does not `Launch` anything yet.
    pub async fn bootstrap(config: &ClusterConfig) -> paxos_consensus::Result<Self> {
        let n = config.process_count;
        let (transport, receivers) = ChannelTransport::new(n);
        let transport = Arc::new(transport);
        let peers = config.peer_ids();

        let mut handles = Vec::with_capacity(n);
        for (i, rx) in receivers.into_iter().enumerate() {
            let id = ProcessId(i);
            let rng = make_rng(config, i);
            handles.push(spawn_process(
                id,
                transport.clone() as Arc<dyn Transport>,
                rng,
                config.crash_probability,
                rx,
            ));
        }

        for &peer in &peers {
            transport
                .send(
                    peer,
                    peer,
                    ConsensusMessage::ActorInfo {
                        peers: peers.clone(),
                        n,
                    },
                )
                .await?;
        }
        for &id in &config.crash_armed {
            transport.send(ProcessId(id), ProcessId(id), ConsensusMessage::Crash).await?;
        }
        for &id in &config.held {
            transport.send(ProcessId(id), ProcessId(id), ConsensusMessage::Hold).await?;
        }

        Ok(Self { transport, handles })
    }

    /// Sends `Launch` to every process, kicking off the first propose round.
    pub async fn launch(&self) -> paxos_consensus::Result<()> {
        for &peer in self.transport.peers() {
            self.transport.send(peer, peer, ConsensusMessage::Launch).await?;
        }
        Ok(())
    }

    /// Waits for every process to either decide or abort without a pending
    /// retry, by polling the watch channels until each is decided or the
    /// deadline passes. Returns the final `ProposeResult` per process.
    pub async fn wait_for_decisions(&mut self, timeout: std::time::Duration) -> Vec<ProposeResult> {
        let deadline = tokio::time::Instant::now() + timeout;
        for handle in &mut self.handles {
            let _ = tokio::time::timeout_at(deadline, async {
                loop {
                    if handle.propose_result.borrow().is_decided() {
                        return;
                    }
                    if handle.propose_result.changed().await.is_err() {
                        return;
                    }
                }
            })
            .await;
        }
        self.handles
            .iter()
            .map(|h| *h.propose_result.borrow())
            .collect()
    }

    /// Current decision snapshot without waiting.
    pub fn snapshot(&self) -> Vec<(ProcessId, ProposeResult)> {
        self.handles
            .iter()
            .map(|h| (h.id, *h.propose_result.borrow()))
            .collect()
    }

    pub fn process_count(&self) -> usize {
        self.handles.len()
    }

    /// Aborts every process task. Only meaningful for cleanup in tests and
    /// the CLI's shutdown path — a real deployment would just exit.
    pub fn shutdown(&self) {
        for handle in &self.handles {
            handle.task.abort();
        }
    }
}

fn make_rng(config: &ClusterConfig, id: usize) -> Box<dyn RandomSource> {
    if let Some(&proposal) = config.initial_proposals.get(&id) {
        return Box::new(FixedInitialProposal {
            proposal,
            inner: underlying_rng(config, id),
        });
    }
    underlying_rng(config, id)
}

fn underlying_rng(config: &ClusterConfig, id: usize) -> Box<dyn RandomSource> {
    match config.seed {
        Some(seed) => Box::new(SeededRandomSource::new(seed.wrapping_add(id as u64))),
        None => Box::new(ThreadRandomSource::new()),
    }
}

/// Wraps another `RandomSource` to pin the initial proposal to a fixed
/// value while still drawing the crash coin from the wrapped source.
struct FixedInitialProposal {
    proposal: u8,
    inner: Box<dyn RandomSource>,
}

impl RandomSource for FixedInitialProposal {
    fn initial_proposal(&mut self) -> u8 {
        self.proposal
    }

    fn crash_coin(&mut self) -> f64 {
        self.inner.crash_coin()
    }
}

impl Drop for Cluster {
    fn drop(&mut self) {
        info!(processes = self.handles.len(), "cluster dropped");
    }
}
