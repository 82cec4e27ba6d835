//! The delivery seam between processes.
//!
//! Messages are delivered one at a time to a recipient, with no ordering
//! guarantees beyond what the protocol tolerates, and broadcasts are
//! non-blocking: a send enqueues and returns immediately. `Transport`
//! captures exactly that contract; `paxos-runtime` provides the only
//! implementation this workspace needs (in-process mpsc channels), but the
//! trait keeps the protocol crate free of any notion of how processes are
//! actually wired together.

use async_trait::async_trait;

use crate::error::Result;
use crate::message::ConsensusMessage;
use crate::types::ProcessId;

#[async_trait]
pub trait Transport: Send + Sync {
    /// Enqueue `message`, tagged as sent from `from`, for delivery to `to`.
    async fn send(&self, from: ProcessId, to: ProcessId, message: ConsensusMessage) -> Result<()>;

    /// All process ids this transport knows how to address, in order.
    fn peers(&self) -> &[ProcessId];

    /// Fan `message` out to every peer, including `from` itself — self-delivery
    /// is a normal enqueue through the same channel, not a direct call, so
    /// that run-to-completion semantics are preserved.
    async fn broadcast(&self, from: ProcessId, message: ConsensusMessage) -> Result<()> {
        for &peer in self.peers() {
            self.send(from, peer, message.clone()).await?;
        }
        Ok(())
    }
}
