// crates/rollout-gate-providers/src/lib.rs
// ============================================================================
// Module: Rollout Gate Providers
// Description: Real variable providers backing the policy engine.
// Purpose: Bind engine variables to the clock, files, entropy, and the host.
// Dependencies: rand, rollout-gate-config, rollout-gate-core, time, tracing
// ============================================================================

//! ## Overview
//! This crate ships the production implementations of the engine's capability
//! providers: wall-clock facts derived from an injected [`Clock`], a
//! process-lifetime entropy seed, system facts collected at startup, the
//! administrator policy file with change-notifying reloads, and host-fed
//! status handles for the updater and the network. Each provider owns its
//! variables; policies only ever borrow them through the state aggregate.
//! Invariants:
//! - Providers fail closed: an unreadable source reads as absent, never as a
//!   guessed value.
//! - Host-fed variables signal watchers only on observable changes.
//!
//! [`Clock`]: rollout_gate_core::Clock

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod clock;
pub mod config;
pub mod device_policy;
pub mod network;
pub mod random;
pub mod system;
pub mod updater;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use crate::clock::RealTimeProvider;
pub use crate::config::RealConfigProvider;
pub use crate::device_policy::RealDevicePolicyProvider;
pub use crate::network::NetworkStatusHandle;
pub use crate::network::RealNetworkProvider;
pub use crate::random::RealRandomProvider;
pub use crate::system::RealSystemProvider;
pub use crate::system::SystemInfo;
pub use crate::updater::RealUpdaterProvider;
pub use crate::updater::UpdaterStatusHandle;
