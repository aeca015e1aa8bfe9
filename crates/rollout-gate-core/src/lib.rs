// crates/rollout-gate-core/src/lib.rs
// ============================================================================
// Module: Rollout Gate Core
// Description: Update pacing policy engine with typed data sources.
// Purpose: Decide whether and when update checks, downloads, and applies run.
// Dependencies: rand, rand_chacha, serde, serde_json, thiserror, time, tracing
// ============================================================================

//! ## Overview
//! This crate implements the decision engine of an on-device software-update
//! orchestrator. Host state is exposed through typed, named [`Variable`]s
//! bundled into capability providers and aggregated in a [`State`]. Each
//! decision runs against a fresh [`EvaluationContext`] that snapshots every
//! variable it reads and enforces an overall time budget. Policies return a
//! tri-state [`Decision`]: a verdict, a structured failure, or a deferral
//! that carries the exact wake-up condition for the retry.
//! Invariants:
//! - Within one evaluation, repeated reads of a variable see one snapshot.
//! - A deferred decision always carries its re-evaluation trigger.
//! - All randomness and clock access is injected; nothing reads global state.
//!
//! Security posture: provider values originate from host configuration and
//! device policy; policies treat absent or malformed values as failures, never
//! as permissive defaults.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod fakes;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use crate::core::clock::Clock;
pub use crate::core::clock::SystemClock;
pub use crate::core::prng::Prng;
pub use crate::core::providers::CheckRequest;
pub use crate::core::providers::ConfigProvider;
pub use crate::core::providers::ConnectionType;
pub use crate::core::providers::DevicePolicyProvider;
pub use crate::core::providers::NetworkProvider;
pub use crate::core::providers::RandomProvider;
pub use crate::core::providers::SystemProvider;
pub use crate::core::providers::TetheringState;
pub use crate::core::providers::TimeProvider;
pub use crate::core::providers::UpdaterProvider;
pub use crate::core::state::State;
pub use crate::core::variable::ChangeNotifier;
pub use crate::core::variable::ChangeWatch;
pub use crate::core::variable::ConstVariable;
pub use crate::core::variable::DEFAULT_POLL_INTERVAL;
pub use crate::core::variable::PollVariable;
pub use crate::core::variable::Variable;
pub use crate::core::variable::VariableError;
pub use crate::core::variable::VariableId;
pub use crate::core::variable::VariableMode;
pub use crate::core::variable::WatchedVariable;
pub use crate::fakes::FakeClock;
pub use crate::fakes::FakeConfigProvider;
pub use crate::fakes::FakeDevicePolicyProvider;
pub use crate::fakes::FakeNetworkProvider;
pub use crate::fakes::FakeRandomProvider;
pub use crate::fakes::FakeState;
pub use crate::fakes::FakeSystemProvider;
pub use crate::fakes::FakeTimeProvider;
pub use crate::fakes::FakeUpdaterProvider;
pub use crate::fakes::FakeVariable;
pub use crate::runtime::context::EvaluationContext;
pub use crate::runtime::context::MissingValue;
pub use crate::runtime::default_policy::DEFAULT_CHECK_INTERVAL;
pub use crate::runtime::default_policy::DefaultPolicy;
pub use crate::runtime::orchestrator::DEFAULT_EVALUATION_TIMEOUT;
pub use crate::runtime::orchestrator::DEFAULT_EXPIRATION_TIMEOUT;
pub use crate::runtime::orchestrator::DecisionLoop;
pub use crate::runtime::orchestrator::LoopStep;
pub use crate::runtime::orchestrator::Orchestrator;
pub use crate::runtime::orchestrator::OrchestratorError;
pub use crate::runtime::policy::Decision;
pub use crate::runtime::policy::Policy;
pub use crate::runtime::policy::PolicyError;
pub use crate::runtime::policy::UpdateCannotStartReason;
pub use crate::runtime::policy::UpdateCheckParams;
pub use crate::runtime::policy::UpdateDownloadParams;
pub use crate::runtime::policy::UpdateState;
pub use crate::runtime::rollout_policy::PacingConfig;
pub use crate::runtime::rollout_policy::RolloutPolicy;
pub use crate::runtime::rollout_policy::backoff_interval;
pub use crate::runtime::rollout_policy::fuzzed_interval;
pub use crate::runtime::rollout_policy::select_download_url;
pub use crate::runtime::trigger::ReevalTrigger;
