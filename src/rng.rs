//! Deterministic random number generation.
//!
//! One master ChaCha8 generator per world instance; named streams are
//! derived from it so systems cannot perturb each other's sequences.

use std::collections::HashMap;

use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

pub struct RngManager {
    master: ChaCha8Rng,
    streams: HashMap<String, ChaCha8Rng>,
}

impl RngManager {
    pub fn new(seed: u64) -> Self {
        Self {
            master: ChaCha8Rng::seed_from_u64(seed),
            streams: HashMap::new(),
        }
    }

    /// Lazily derive a named stream. Each new name draws a full 256-bit seed
    /// from the master, so derivation order matters but draw order within a
    /// stream never does.
    pub fn stream(&mut self, name: &str) -> SystemRng<'_> {
        let entry = self.streams.entry(name.to_string()).or_insert_with(|| {
            let mut seed = [0u8; 32];
            self.master.fill_bytes(&mut seed);
            ChaCha8Rng::from_seed(seed)
        });
        SystemRng { inner: entry }
    }
}

pub struct SystemRng<'a> {
    inner: &'a mut ChaCha8Rng,
}

impl RngCore for SystemRng<'_> {
    fn next_u32(&mut self) -> u32 {
        self.inner.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.inner.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.inner.fill_bytes(dest);
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.inner.try_fill_bytes(dest)
    }
}

/// Helpers for the handful of draws the simulation actually makes.
pub trait RngExt {
    fn range_f32(&mut self, min: f32, max: f32) -> f32;
    fn range_i32(&mut self, min: i32, max: i32) -> i32;
    fn chance(&mut self, probability: f32) -> bool;
}

impl<R: Rng> RngExt for R {
    fn range_f32(&mut self, min: f32, max: f32) -> f32 {
        if max <= min {
            return min;
        }
        self.gen::<f32>() * (max - min) + min
    }

    /// Inclusive on both ends, matching how generation ranges are configured.
    fn range_i32(&mut self, min: i32, max: i32) -> i32 {
        if max <= min {
            return min;
        }
        self.gen_range(min..=max)
    }

    fn chance(&mut self, probability: f32) -> bool {
        self.gen::<f32>() < probability
    }
}
