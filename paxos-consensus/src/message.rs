//! Message set exchanged between processes.

use crate::types::{Ballot, ProcessId, Value};

/// The messages a process can receive. Every payload here is named and
/// `ActorInfo` carries the peer table a real transport would otherwise
/// need a discovery protocol to assemble.
#[derive(Debug, Clone)]
pub enum ConsensusMessage {
    /// Bootstrapper → process, once: populate membership and reset state.
    ActorInfo { peers: Vec<ProcessId>, n: usize },
    /// Bootstrapper → process, once: begin proposing.
    Launch,
    /// Bootstrapper → process: arm probabilistic crash simulation.
    Crash,
    /// Bootstrapper → process: suppress re-propose after the next abort.
    Hold,
    /// Proposer → all: "what have you accepted so far, under ballot `ballot`?"
    Read { ballot: Ballot },
    /// Acceptor → proposer: ballot `ballot` is stale, abort.
    Abort { ballot: Ballot },
    /// Acceptor → proposer: reply to Read with last-accepted (value, ballot).
    Gather {
        ballot: Ballot,
        impose_ballot: Ballot,
        estimate: Value,
    },
    /// Proposer → all: accept `value` under ballot `ballot`.
    Impose { ballot: Ballot, value: Value },
    /// Acceptor → proposer: accepted the Impose.
    Ack { ballot: Ballot },
    /// Proposer → all: a quorum accepted `value`; it is decided.
    Decide { value: Value },
}

/// A message in flight, tagged with its sender so a recipient can reply
/// without the sender needing to embed a return address in every variant.
#[derive(Debug, Clone)]
pub struct Envelope {
    pub from: ProcessId,
    pub message: ConsensusMessage,
}
