// crates/rollout-gate-providers/src/random.rs
// ============================================================================
// Module: Entropy Seed Provider
// Description: PRNG seed material drawn once from OS entropy.
// Purpose: Give policies a stable per-process seed for jitter draws.
// Dependencies: rand, rollout-gate-core
// ============================================================================

//! ## Overview
//! The seed is drawn from the operating system's entropy source exactly once,
//! at provider construction, and held constant for the process lifetime.
//! Policies re-key their deterministic generator from it on every evaluation,
//! so a captured seed value replays a device's pacing decisions exactly.

// ============================================================================
// SECTION: Imports
// ============================================================================

use rand::RngCore;
use rand::rngs::OsRng;
use rollout_gate_core::ConstVariable;
use rollout_gate_core::RandomProvider;
use rollout_gate_core::Variable;

// ============================================================================
// SECTION: Provider Implementation
// ============================================================================

/// Production [`RandomProvider`] seeded from OS entropy.
pub struct RealRandomProvider {
    /// Seed fixed at construction.
    seed: ConstVariable<u64>,
}

impl RealRandomProvider {
    /// Draws a fresh seed from OS entropy.
    #[must_use]
    pub fn new() -> Self {
        Self {
            seed: ConstVariable::new("random.seed", OsRng.next_u64()),
        }
    }
}

impl Default for RealRandomProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl RandomProvider for RealRandomProvider {
    fn seed(&self) -> &dyn Variable<u64> {
        &self.seed
    }
}
