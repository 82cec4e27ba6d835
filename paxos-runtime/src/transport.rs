//! In-process transport: one unbounded Tokio channel per process.
//!
//! A send is a channel push — it enqueues and returns immediately, exactly
//! the non-blocking broadcast behavior the protocol core requires. There is
//! no cross-channel ordering and no delivery guarantee beyond "eventually
//! landed in that process's queue unless the process's task has exited."

use async_trait::async_trait;
use tokio::sync::mpsc;

use paxos_consensus::{ConsensusMessage, Envelope, Error, ProcessId, Result, Transport};

/// Routes messages to a fixed set of processes via per-process mpsc channels.
pub struct ChannelTransport {
    peers: Vec<ProcessId>,
    senders: Vec<mpsc::UnboundedSender<Envelope>>,
}

impl ChannelTransport {
    /// Builds a transport and returns, alongside it, the receiving half of
    /// each process's channel (for the actor loop to drive).
    pub fn new(n: usize) -> (Self, Vec<mpsc::UnboundedReceiver<Envelope>>) {
        let mut senders = Vec::with_capacity(n);
        let mut receivers = Vec::with_capacity(n);
        for _ in 0..n {
            let (tx, rx) = mpsc::unbounded_channel();
            senders.push(tx);
            receivers.push(rx);
        }
        let peers = (0..n).map(ProcessId).collect();
        (Self { peers, senders }, receivers)
    }
}

#[async_trait]
impl Transport for ChannelTransport {
    async fn send(&self, from: ProcessId, to: ProcessId, message: ConsensusMessage) -> Result<()> {
        self.senders[to.0]
            .send(Envelope { from, message })
            .map_err(|_| Error::ChannelClosed { to })
    }

    fn peers(&self) -> &[ProcessId] {
        &self.peers
    }
}
