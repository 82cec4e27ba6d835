//! Collaborators that turn the per-process state machine in
//! `paxos-consensus` into a runnable cluster: an in-process transport over
//! Tokio mpsc channels, a per-process actor loop, cluster bootstrap, and
//! the configuration a simulated run is built from.

pub mod actor;
pub mod cluster;
pub mod config;
pub mod transport;

pub use actor::{spawn_process, ProcessHandle};
pub use cluster::Cluster;
pub use config::ClusterConfig;
pub use transport::ChannelTransport;
