//! The per-process synod state machine. This is the hard part of the
//! system: everything else (transport, bootstrap, randomness) exists only
//! to feed messages to, and carry messages away from, a single `Process`.
//!
//! A `Process` is driven entirely by `handle`: it consumes one envelope at
//! a time, to completion, and never suspends mid-handler. Any messages it
//! sends while handling an envelope are enqueued through `Transport` and
//! are not observed by anyone — including itself, on a self-send — until
//! this call returns.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::message::{ConsensusMessage, Envelope};
use crate::rng::RandomSource;
use crate::transport::Transport;
use crate::types::{Ballot, ProcessId, ProposeResult, Value};

/// Crash probability applied at every crash check point once a process has
/// been armed via `Crash`.
pub const ALPHA: f64 = 0.1;

pub struct Process {
    id: ProcessId,
    n: usize,
    peers: Vec<ProcessId>,

    ballot: Ballot,
    proposal: Value,
    read_ballot: Ballot,
    impose_ballot: Ballot,
    estimate: Value,

    /// (estimate, impose_ballot) reported by each peer during the current
    /// Gather round, indexed by sender id — not by ballot arithmetic.
    states: Vec<(Value, Ballot)>,
    received_states: usize,
    gather_quorum_reached: bool,

    ack_count: usize,
    ack_quorum_reached: bool,

    launched: bool,
    should_crash: bool,
    crashed: bool,
    hold: bool,

    propose_result: ProposeResult,
    started_at: Option<Instant>,
    crash_probability: f64,

    transport: Arc<dyn Transport>,
    rng: Box<dyn RandomSource>,
}

impl Process {
    pub fn new(id: ProcessId, transport: Arc<dyn Transport>, rng: Box<dyn RandomSource>) -> Self {
        Self::with_crash_probability(id, transport, rng, ALPHA)
    }

    /// Like [`Process::new`], but with a crash probability other than the
    /// protocol's own `ALPHA`.
    pub fn with_crash_probability(
        id: ProcessId,
        transport: Arc<dyn Transport>,
        rng: Box<dyn RandomSource>,
        crash_probability: f64,
    ) -> Self {
        Self {
            id,
            n: 0,
            peers: Vec::new(),
            ballot: 0,
            proposal: 0,
            read_ballot: 0,
            impose_ballot: 0,
            estimate: 0,
            states: Vec::new(),
            received_states: 0,
            gather_quorum_reached: false,
            ack_count: 0,
            ack_quorum_reached: false,
            launched: false,
            should_crash: false,
            crashed: false,
            hold: false,
            propose_result: ProposeResult::Undecided,
            started_at: None,
            crash_probability,
            transport,
            rng,
        }
    }

    pub fn id(&self) -> ProcessId {
        self.id
    }

    /// The observable decision state: `getProposeResult()`.
    pub fn propose_result(&self) -> ProposeResult {
        self.propose_result
    }

    pub fn is_crashed(&self) -> bool {
        self.crashed
    }

    /// Dispatch one envelope to completion.
    pub async fn handle(&mut self, envelope: Envelope) {
        let Envelope { from, message } = envelope;
        match message {
            ConsensusMessage::ActorInfo { peers, n } => self.on_actor_info(peers, n),
            ConsensusMessage::Launch => self.on_launch().await,
            ConsensusMessage::Crash => self.on_crash(),
            ConsensusMessage::Hold => self.on_hold(),
            ConsensusMessage::Read { ballot } => self.on_read(from, ballot).await,
            ConsensusMessage::Abort { ballot } => self.on_abort(ballot).await,
            ConsensusMessage::Gather {
                ballot,
                impose_ballot,
                estimate,
            } => self.on_gather(from, ballot, impose_ballot, estimate).await,
            ConsensusMessage::Impose { ballot, value } => self.on_impose(from, ballot, value).await,
            ConsensusMessage::Ack { ballot } => self.on_ack(ballot).await,
            ConsensusMessage::Decide { value } => self.on_decide(value),
        }
    }

    // ---- common guard ----

    fn decided_guard(&self) -> bool {
        self.propose_result.is_decided()
    }

    /// Draws the crash coin if armed. Returns true if the process just
    /// crashed — the caller should drop the message unprocessed.
    fn maybe_crash(&mut self) -> bool {
        if self.should_crash && self.rng.crash_coin() < self.crash_probability {
            warn!(process = %self.id, "simulated crash");
            self.crashed = true;
            true
        } else {
            false
        }
    }

    // ---- propose / retry ----

    async fn propose(&mut self, v: Value) {
        if self.crashed {
            return;
        }
        if self.maybe_crash() {
            return;
        }

        self.proposal = v;
        self.ballot += self.n as Ballot;
        self.states = vec![(0, 0); self.n];
        self.received_states = 0;
        self.gather_quorum_reached = false;
        self.ack_count = 0;
        self.ack_quorum_reached = false;

        debug!(process = %self.id, ballot = self.ballot, proposal = v, "broadcasting read");
        let _ = self
            .transport
            .broadcast(self.id, ConsensusMessage::Read { ballot: self.ballot })
            .await;
    }

    // ---- bootstrap handlers (no common guard) ----

    fn on_actor_info(&mut self, peers: Vec<ProcessId>, n: usize) {
        self.n = n;
        self.peers = peers;
        let base = self.id.0 as Ballot - n as Ballot;
        self.ballot = base;
        self.proposal = 0;
        self.read_ballot = 0;
        self.impose_ballot = base;
        self.estimate = 0;
        self.states = vec![(0, 0); n];
        self.received_states = 0;
        self.gather_quorum_reached = false;
        self.ack_count = 0;
        self.ack_quorum_reached = false;
        self.launched = false;
        self.should_crash = false;
        self.crashed = false;
        self.hold = false;
        self.propose_result = ProposeResult::Undecided;
        self.started_at = None;
    }

    async fn on_launch(&mut self) {
        if self.launched {
            return;
        }
        self.launched = true;
        self.started_at = Some(Instant::now());
        let v = self.rng.initial_proposal();
        info!(process = %self.id, initial_proposal = v, "launched");
        self.propose(v).await;
    }

    fn on_crash(&mut self) {
        self.should_crash = true;
    }

    fn on_hold(&mut self) {
        self.hold = true;
    }

    // ---- acceptor / proposer handlers (common guard applies) ----

    async fn on_read(&mut self, from: ProcessId, ballot: Ballot) {
        if self.crashed || self.decided_guard() {
            return;
        }
        if self.maybe_crash() {
            return;
        }

        if self.read_ballot > ballot || self.impose_ballot > ballot {
            let _ = self
                .transport
                .send(self.id, from, ConsensusMessage::Abort { ballot })
                .await;
        } else {
            self.read_ballot = ballot;
            let _ = self
                .transport
                .send(
                    self.id,
                    from,
                    ConsensusMessage::Gather {
                        ballot,
                        impose_ballot: self.impose_ballot,
                        estimate: self.estimate,
                    },
                )
                .await;
        }
    }

    async fn on_abort(&mut self, _ballot: Ballot) {
        if self.crashed {
            return;
        }
        // A decided process must never move to Aborted on a stale Abort, so
        // this handler is also gated on "already decided" even though an
        // Abort isn't, strictly, a Read/Gather/Impose/Ack (see DESIGN.md).
        if self.decided_guard() {
            return;
        }
        if self.maybe_crash() {
            return;
        }

        self.propose_result = ProposeResult::Aborted;
        if !self.hold {
            let proposal = self.proposal;
            self.propose(proposal).await;
        }
    }

    async fn on_gather(&mut self, from: ProcessId, ballot: Ballot, impose_ballot: Ballot, estimate: Value) {
        if self.crashed || self.decided_guard() {
            return;
        }
        if self.maybe_crash() {
            return;
        }
        // Only replies for the current round count: a Gather for a
        // superseded ballot must not contribute to this quorum.
        if ballot != self.ballot {
            return;
        }

        self.states[from.0] = (estimate, impose_ballot);
        self.received_states += 1;

        if self.received_states > self.n / 2 && !self.gather_quorum_reached {
            // Latched until the next propose() bumps the ballot: a later
            // Gather for this same round must not re-fire the branch.
            self.gather_quorum_reached = true;

            if let Some((value, _)) = self
                .states
                .iter()
                .filter(|(_, b)| *b > 0)
                .max_by_key(|(_, b)| *b)
            {
                self.proposal = *value;
            }

            self.states = vec![(0, 0); self.n];
            self.received_states = 0;

            let proposal = self.proposal;
            let ballot = self.ballot;
            let _ = self
                .transport
                .broadcast(self.id, ConsensusMessage::Impose { ballot, value: proposal })
                .await;
        }
    }

    async fn on_impose(&mut self, from: ProcessId, ballot: Ballot, value: Value) {
        if self.crashed || self.decided_guard() {
            return;
        }
        if self.maybe_crash() {
            return;
        }

        if self.read_ballot > ballot || self.impose_ballot > ballot {
            let _ = self
                .transport
                .send(self.id, from, ConsensusMessage::Abort { ballot })
                .await;
        } else {
            self.estimate = value;
            self.impose_ballot = ballot;
            let _ = self
                .transport
                .send(self.id, from, ConsensusMessage::Ack { ballot })
                .await;
        }
    }

    async fn on_ack(&mut self, ballot: Ballot) {
        if self.crashed || self.decided_guard() {
            return;
        }
        if self.maybe_crash() {
            return;
        }
        if ballot != self.ballot {
            return;
        }

        self.ack_count += 1;
        if self.ack_count > self.n / 2 && !self.ack_quorum_reached {
            self.ack_quorum_reached = true;
            if let Some(start) = self.started_at {
                info!(
                    process = %self.id,
                    decide_latency_ms = start.elapsed().as_millis() as u64,
                    value = self.proposal,
                    "ack quorum reached, deciding"
                );
            }
            let value = self.proposal;
            let _ = self
                .transport
                .broadcast(self.id, ConsensusMessage::Decide { value })
                .await;
        }
    }

    fn on_decide(&mut self, value: Value) {
        if self.crashed {
            return;
        }
        if self.maybe_crash() {
            return;
        }
        // Deliberately no decided_guard here: a late Decide must still land,
        // even for a process that already aborted or already decided the
        // same value.
        if let ProposeResult::Decided(existing) = self.propose_result {
            if existing != value {
                warn!(process = %self.id, existing, incoming = value, "divergent decide observed");
            }
        }
        if let Some(start) = self.started_at {
            info!(
                process = %self.id,
                decide_latency_ms = start.elapsed().as_millis() as u64,
                value,
                "decided"
            );
        }
        self.propose_result = ProposeResult::Decided(value);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::rng::SeededRandomSource;

    /// A transport that never actually delivers anything: it just records
    /// every send so a test can assert on what a process tried to do.
    struct RecordingTransport {
        peers: Vec<ProcessId>,
        sent: Mutex<Vec<(ProcessId, ProcessId, ConsensusMessage)>>,
    }

    impl RecordingTransport {
        fn new(peers: Vec<ProcessId>) -> Self {
            Self {
                peers,
                sent: Mutex::new(Vec::new()),
            }
        }

        fn sent_to(&self, to: ProcessId) -> Vec<ConsensusMessage> {
            self.sent
                .lock()
                .unwrap()
                .iter()
                .filter(|(_, t, _)| *t == to)
                .map(|(_, _, m)| m.clone())
                .collect()
        }
    }

    #[async_trait]
    impl Transport for RecordingTransport {
        async fn send(&self, from: ProcessId, to: ProcessId, message: ConsensusMessage) -> crate::error::Result<()> {
            self.sent.lock().unwrap().push((from, to, message));
            Ok(())
        }

        fn peers(&self) -> &[ProcessId] {
            &self.peers
        }
    }

    fn process(id: usize, n: usize, transport: Arc<RecordingTransport>) -> Process {
        Process::new(ProcessId(id), transport, Box::new(SeededRandomSource::new(id as u64)))
    }

    fn peer_ids(n: usize) -> Vec<ProcessId> {
        (0..n).map(ProcessId).collect()
    }

    #[tokio::test]
    async fn actor_info_resets_ballot_to_id_minus_n() {
        let transport = Arc::new(RecordingTransport::new(peer_ids(3)));
        let mut p = process(1, 3, transport);
        p.on_actor_info(peer_ids(3), 3);
        assert_eq!(p.ballot, 1 - 3);
        assert_eq!(p.impose_ballot, 1 - 3);
        assert_eq!(p.propose_result(), ProposeResult::Undecided);
    }

    #[tokio::test]
    async fn propose_increments_ballot_by_n_and_broadcasts_read() {
        let transport = Arc::new(RecordingTransport::new(peer_ids(3)));
        let mut p = process(0, 3, transport.clone());
        p.on_actor_info(peer_ids(3), 3);
        p.propose(1).await;
        assert_eq!(p.ballot, 0 - 3 + 3);
        for peer in peer_ids(3) {
            let msgs = transport.sent_to(peer);
            assert!(matches!(msgs.as_slice(), [ConsensusMessage::Read { ballot }] if *ballot == p.ballot));
        }
    }

    #[tokio::test]
    async fn read_with_stale_ballot_replies_abort() {
        let transport = Arc::new(RecordingTransport::new(peer_ids(3)));
        let mut p = process(0, 3, transport.clone());
        p.on_actor_info(peer_ids(3), 3);
        p.read_ballot = 10;
        p.on_read(ProcessId(1), 5).await;
        assert!(matches!(
            transport.sent_to(ProcessId(1)).as_slice(),
            [ConsensusMessage::Abort { ballot: 5 }]
        ));
    }

    #[tokio::test]
    async fn read_with_fresh_ballot_replies_gather() {
        let transport = Arc::new(RecordingTransport::new(peer_ids(3)));
        let mut p = process(0, 3, transport.clone());
        p.on_actor_info(peer_ids(3), 3);
        p.on_read(ProcessId(1), 5).await;
        assert!(matches!(
            transport.sent_to(ProcessId(1)).as_slice(),
            [ConsensusMessage::Gather { ballot: 5, .. }]
        ));
        assert_eq!(p.read_ballot, 5);
    }

    #[tokio::test]
    async fn gather_quorum_fires_impose_exactly_once() {
        let transport = Arc::new(RecordingTransport::new(peer_ids(5)));
        let mut p = process(0, 5, transport.clone());
        p.on_actor_info(peer_ids(5), 5);
        p.propose(1).await;
        let ballot = p.ballot;
        for sender in 0..5 {
            p.on_gather(ProcessId(sender), ballot, 0, 0).await;
        }
        let impose_broadcasts: usize = peer_ids(5)
            .into_iter()
            .map(|peer| {
                transport
                    .sent_to(peer)
                    .into_iter()
                    .filter(|m| matches!(m, ConsensusMessage::Impose { .. }))
                    .count()
            })
            .sum();
        assert_eq!(impose_broadcasts, 5);
        assert!(p.gather_quorum_reached);
    }

    #[tokio::test]
    async fn gather_ignores_replies_for_a_superseded_ballot() {
        let transport = Arc::new(RecordingTransport::new(peer_ids(3)));
        let mut p = process(0, 3, transport.clone());
        p.on_actor_info(peer_ids(3), 3);
        p.propose(1).await;
        let stale = p.ballot - 1;
        p.on_gather(ProcessId(1), stale, 0, 0).await;
        assert_eq!(p.received_states, 0);
    }

    #[tokio::test]
    async fn ack_quorum_decides_exactly_once() {
        let transport = Arc::new(RecordingTransport::new(peer_ids(3)));
        let mut p = process(0, 3, transport.clone());
        p.on_actor_info(peer_ids(3), 3);
        p.propose(1).await;
        let ballot = p.ballot;
        p.on_ack(ballot).await;
        p.on_ack(ballot).await;
        assert_eq!(p.propose_result(), ProposeResult::Decided(1));

        let decide_broadcasts: usize = peer_ids(3)
            .into_iter()
            .map(|peer| {
                transport
                    .sent_to(peer)
                    .into_iter()
                    .filter(|m| matches!(m, ConsensusMessage::Decide { .. }))
                    .count()
            })
            .sum();
        assert_eq!(decide_broadcasts, 3);
    }

    #[tokio::test]
    async fn abort_sets_aborted_and_retries_unless_held() {
        let transport = Arc::new(RecordingTransport::new(peer_ids(3)));
        let mut p = process(0, 3, transport.clone());
        p.on_actor_info(peer_ids(3), 3);
        p.propose(0).await;
        let first_ballot = p.ballot;
        p.on_abort(first_ballot).await;
        assert_eq!(p.propose_result(), ProposeResult::Aborted);
        assert_eq!(p.ballot, first_ballot + 3);
    }

    #[tokio::test]
    async fn hold_suppresses_retry_after_abort() {
        let transport = Arc::new(RecordingTransport::new(peer_ids(3)));
        let mut p = process(0, 3, transport.clone());
        p.on_actor_info(peer_ids(3), 3);
        p.on_hold();
        p.propose(0).await;
        let first_ballot = p.ballot;
        p.on_abort(first_ballot).await;
        assert_eq!(p.propose_result(), ProposeResult::Aborted);
        assert_eq!(p.ballot, first_ballot, "hold must suppress the retry broadcast");
    }

    #[tokio::test]
    async fn late_decide_lands_even_after_an_abort() {
        let transport = Arc::new(RecordingTransport::new(peer_ids(3)));
        let mut p = process(0, 3, transport.clone());
        p.on_actor_info(peer_ids(3), 3);
        p.on_hold();
        p.propose(0).await;
        let first_ballot = p.ballot;
        p.on_abort(first_ballot).await;
        assert_eq!(p.propose_result(), ProposeResult::Aborted);

        p.on_decide(1);
        assert_eq!(p.propose_result(), ProposeResult::Decided(1));
    }

    #[tokio::test]
    async fn abort_is_ignored_once_already_decided() {
        let transport = Arc::new(RecordingTransport::new(peer_ids(3)));
        let mut p = process(0, 3, transport.clone());
        p.on_actor_info(peer_ids(3), 3);
        p.on_decide(1);
        let ballot_before = p.ballot;
        p.on_abort(ballot_before).await;
        assert_eq!(p.propose_result(), ProposeResult::Decided(1));
        assert_eq!(p.ballot, ballot_before, "a decided process must not retry on a stale abort");
    }

    #[tokio::test]
    async fn crash_absorbs_all_further_messages() {
        let transport = Arc::new(RecordingTransport::new(peer_ids(3)));
        let mut p = process(0, 3, transport.clone());
        p.on_actor_info(peer_ids(3), 3);
        p.crashed = true;
        p.on_read(ProcessId(1), 99).await;
        assert!(transport.sent_to(ProcessId(1)).is_empty());
    }

    #[tokio::test]
    async fn armed_crash_coin_below_alpha_crashes_and_drops() {
        let transport = Arc::new(RecordingTransport::new(peer_ids(3)));
        let mut p = process(0, 3, transport.clone());
        p.on_actor_info(peer_ids(3), 3);
        p.should_crash = true;
        p.rng = Box::new(ConstantRandomSource(0.0));
        p.on_read(ProcessId(1), 5).await;
        assert!(p.is_crashed());
        assert!(transport.sent_to(ProcessId(1)).is_empty());
    }

    struct ConstantRandomSource(f64);
    impl RandomSource for ConstantRandomSource {
        fn initial_proposal(&mut self) -> u8 {
            0
        }
        fn crash_coin(&mut self) -> f64 {
            self.0
        }
    }
}
