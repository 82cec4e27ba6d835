//! Error types for the synod protocol's transport seam.
//!
//! The protocol itself never raises an error across its boundary: aborts,
//! simulated crashes, and stale messages are all absorbed internally. The
//! only thing that can fail is handing a message to a `Transport` whose
//! recipient has gone away.

use crate::types::ProcessId;

/// Errors surfaced by a [`crate::transport::Transport`] implementation.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The channel backing `to` has been closed; its process task is gone.
    #[error("channel to process {to} is closed")]
    ChannelClosed { to: ProcessId },
}

pub type Result<T> = std::result::Result<T, Error>;
