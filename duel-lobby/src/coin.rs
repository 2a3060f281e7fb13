//! Coin used to settle a matched room.

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub trait Coin: Send + Sync {
    /// `true` means the room creator wins.
    fn flip(&self) -> bool;
}

/// Fair coin drawing from the thread-local, OS-seeded generator.
#[derive(Debug, Default, Clone, Copy)]
pub struct FairCoin;

impl Coin for FairCoin {
    fn flip(&self) -> bool {
        rand::rng().random_bool(0.5)
    }
}

/// Deterministic coin for reproducible runs.
#[derive(Debug)]
pub struct SeededCoin {
    rng: Mutex<StdRng>,
}

impl SeededCoin {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl Coin for SeededCoin {
    fn flip(&self) -> bool {
        self.rng.lock().random_bool(0.5)
    }
}

/// Always lands the same way. Handy when a test needs a known winner.
#[derive(Debug, Clone, Copy)]
pub struct FixedCoin(pub bool);

impl Coin for FixedCoin {
    fn flip(&self) -> bool {
        self.0
    }
}
