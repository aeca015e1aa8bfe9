// crates/rollout-gate-core/src/core/prng.rs
// ============================================================================
// Module: Deterministic PRNG
// Description: Seeded random generator isolated from process-global state.
// Purpose: Make jitter and scatter draws reproducible for a fixed seed.
// Dependencies: rand, rand_chacha
// ============================================================================

//! ## Overview
//! Policies draw interval jitter and scatter targets from a [`Prng`] keyed by
//! the random-seed provider. The generator carries its own stream state, so a
//! captured seed replays the exact decision sequence and the engine never
//! perturbs (or is perturbed by) any process-global random source.
//! Invariants:
//! - Equal seeds produce identical draw sequences.
//! - Draws are pure functions of internal state; no I/O.

// ============================================================================
// SECTION: Imports
// ============================================================================

use rand::Rng;
use rand::RngCore;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

// ============================================================================
// SECTION: Generator
// ============================================================================

/// Deterministic seeded pseudo-random generator.
///
/// # Invariants
/// - Output depends only on the seed and the draw sequence.
pub struct Prng {
    /// Underlying seeded stream generator.
    rng: ChaCha8Rng,
}

impl Prng {
    /// Creates a generator keyed by `seed`.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Returns the next draw, uniform over the full `u32` range.
    pub fn next_u32(&mut self) -> u32 {
        self.rng.next_u32()
    }

    /// Returns a draw uniform over `[min, max]`.
    ///
    /// An inverted range is a precondition violation: callers are expected to
    /// order the bounds. Release builds clamp to `min` instead of drawing.
    ///
    /// # Panics
    /// Debug builds panic when `min > max`.
    pub fn range_inclusive(&mut self, min: i64, max: i64) -> i64 {
        debug_assert!(min <= max, "inverted draw range");
        if min >= max {
            return min;
        }
        self.rng.gen_range(min ..= max)
    }
}
