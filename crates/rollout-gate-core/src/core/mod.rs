// crates/rollout-gate-core/src/core/mod.rs
// ============================================================================
// Module: Core Data Sources
// Description: Clock, PRNG, variable, provider, and state primitives.
// Purpose: Group the leaf abstractions the policy runtime is built on.
// Dependencies: rand, rand_chacha, serde, thiserror, time
// ============================================================================

//! ## Overview
//! Leaf abstractions of the engine: the injected [`clock::Clock`] capability,
//! the seeded [`prng::Prng`], the typed [`variable::Variable`] data-source
//! contract with its generic implementations, the capability provider traits,
//! and the [`state::State`] aggregate that owns one provider per capability.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod clock;
pub mod prng;
pub mod providers;
pub mod state;
pub mod variable;
