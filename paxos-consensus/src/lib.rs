//! # Leaderless Synod Consensus — Process Core
//!
//! This crate is the hard part of a crash-tolerant binary consensus
//! system: the per-process state machine that runs the READ/ABORT/GATHER/
//! IMPOSE/ACK/DECIDE rounds of a leaderless Paxos synod protocol. Every
//! process proposes a value in `{0, 1}`; correct processes that decide,
//! decide the same value, and that value was proposed by some process.
//!
//! ## Scope
//!
//! This crate knows nothing about sockets, actor frameworks, or how a
//! cluster of processes is assembled. It depends on two small seams:
//!
//! - [`Transport`] — deliver a message to a process, or broadcast to all.
//! - [`RandomSource`] — draw the initial proposal and the crash coin.
//!
//! `paxos-runtime` supplies both with an in-process, Tokio-channel backed
//! implementation; tests supply a seeded `RandomSource` for determinism.
//!
//! ## Non-goals
//!
//! Byzantine tolerance, durable state across restarts, dynamic membership,
//! message authentication, and liveness under adversarial scheduling are
//! all explicitly out of scope — the protocol is built for the
//! synchronous/partially-synchronous model and may never terminate under
//! a hostile scheduler. That tradeoff is accepted, not patched around.

pub mod error;
pub mod message;
pub mod process;
pub mod rng;
pub mod transport;
pub mod types;

pub use error::{Error, Result};
pub use message::{ConsensusMessage, Envelope};
pub use process::{Process, ALPHA};
pub use rng::{RandomSource, SeededRandomSource, ThreadRandomSource};
pub use transport::Transport;
pub use types::{Ballot, ProcessId, ProposeResult, Value};
