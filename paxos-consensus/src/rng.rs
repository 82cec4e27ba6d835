//! Injectable randomness for the crash coin and the initial proposal draw.
//!
//! Both draws are injectable so tests can run deterministically.
//! `RandomSource` is the seam; `paxos-runtime` and test code supply
//! concrete generators.

use rand::Rng;

/// Supplies the two random draws the protocol needs: the initial
/// proposal drawn on launch, and the crash-simulation coin drawn at
/// every crash check point once a process is armed.
pub trait RandomSource: Send {
    /// Uniform value in `{0, 1}`, used to seed a process's first proposal.
    fn initial_proposal(&mut self) -> u8;

    /// Uniform draw in `[0, 1)`, compared against α to decide whether a
    /// crash-armed process crashes at this check point.
    fn crash_coin(&mut self) -> f64;
}

/// Production randomness backed by the thread-local RNG.
pub struct ThreadRandomSource(rand::rngs::ThreadRng);

impl ThreadRandomSource {
    pub fn new() -> Self {
        Self(rand::thread_rng())
    }
}

impl Default for ThreadRandomSource {
    fn default() -> Self {
        Self::new()
    }
}

impl RandomSource for ThreadRandomSource {
    fn initial_proposal(&mut self) -> u8 {
        self.0.gen_range(0..=1)
    }

    fn crash_coin(&mut self) -> f64 {
        self.0.gen_range(0.0..1.0)
    }
}

/// Deterministic randomness for tests: a seeded `StdRng`.
pub struct SeededRandomSource(rand::rngs::StdRng);

impl SeededRandomSource {
    pub fn new(seed: u64) -> Self {
        use rand::SeedableRng;
        Self(rand::rngs::StdRng::seed_from_u64(seed))
    }
}

impl RandomSource for SeededRandomSource {
    fn initial_proposal(&mut self) -> u8 {
        self.0.gen_range(0..=1)
    }

    fn crash_coin(&mut self) -> f64 {
        self.0.gen_range(0.0..1.0)
    }
}
