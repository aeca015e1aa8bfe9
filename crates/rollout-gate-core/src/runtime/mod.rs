// crates/rollout-gate-core/src/runtime/mod.rs
// ============================================================================
// Module: Policy Runtime
// Description: Evaluation contexts, the decision protocol, and the driver.
// Purpose: Group the machinery that turns provider state into decisions.
// Dependencies: serde_json, thiserror, time, tracing
// ============================================================================

//! ## Overview
//! The runtime layer evaluates policies: [`context::EvaluationContext`]
//! snapshots variable reads under a time budget, [`policy::Decision`] carries
//! the tri-state outcome, [`trigger::ReevalTrigger`] names the exact wake-up
//! condition for deferred decisions, and [`orchestrator::Orchestrator`]
//! drives evaluations with fallback and expiration handling.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod context;
pub mod default_policy;
pub mod orchestrator;
pub mod policy;
pub mod rollout_policy;
pub mod trigger;
