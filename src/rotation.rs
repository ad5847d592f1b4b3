//! Randomized endpoint, identity and delay selection.
//!
//! All randomness in the crawler goes through [`Rotation`], so tests can pin
//! every choice with [`FixedRotation`].

use std::time::Duration;

use rand::Rng;

use crate::config::DelayRange;

/// Source of per-attempt choices.
pub trait Rotation: Send + Sync {
    /// Picks an index in `0..len`. `len` is never zero.
    fn pick(&self, len: usize) -> usize;

    /// Picks a delay within the range.
    fn delay(&self, range: DelayRange) -> Duration;
}

/// Uniformly random choices from the thread-local generator.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomRotation;

impl Rotation for RandomRotation {
    fn pick(&self, len: usize) -> usize {
        rand::rng().random_range(0..len.max(1))
    }

    fn delay(&self, range: DelayRange) -> Duration {
        if range.max_ms <= range.min_ms {
            return range.min();
        }
        Duration::from_millis(rand::rng().random_range(range.min_ms..=range.max_ms))
    }
}

/// Always picks the same index and the shortest delay.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedRotation {
    index: usize,
}

impl FixedRotation {
    /// Creates a rotation that always picks `index` (modulo the pool size).
    pub fn new(index: usize) -> Self {
        Self { index }
    }
}

impl Rotation for FixedRotation {
    fn pick(&self, len: usize) -> usize {
        self.index % len.max(1)
    }

    fn delay(&self, range: DelayRange) -> Duration {
        range.min()
    }
}
