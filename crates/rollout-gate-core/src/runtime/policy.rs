// crates/rollout-gate-core/src/runtime/policy.rs
// ============================================================================
// Module: Policy Contract
// Description: Tri-state decision protocol and the policy operation set.
// Purpose: Define what a pacing policy answers and how outcomes are carried.
// Dependencies: serde, thiserror, time
// ============================================================================

//! ## Overview
//! A policy decides three questions: whether an update check may fire now,
//! whether an offered update may start downloading, and whether the current
//! network is eligible for the download. Every answer is a [`Decision`]: a
//! verdict with a typed result, a structured failure, or a deferral carrying
//! the exact [`ReevalTrigger`] to wait for. Policies are stateless; all
//! inputs arrive through the evaluation context and the driver-persisted
//! [`UpdateState`].
//! Invariants:
//! - A deferral always carries its trigger; the variant cannot be built
//!   without one.
//! - `Failed` means "retry on the caller's cadence", never "proceed with
//!   defaults".

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use time::Duration;
use time::OffsetDateTime;

use crate::core::state::State;
use crate::runtime::context::EvaluationContext;
use crate::runtime::context::MissingValue;
use crate::runtime::trigger::ReevalTrigger;

// ============================================================================
// SECTION: Decision Protocol
// ============================================================================

/// Tri-state outcome of one policy evaluation.
#[must_use]
pub enum Decision<R> {
    /// The policy reached a verdict.
    Succeeded(R),
    /// The policy could not decide; see the error for why.
    Failed(PolicyError),
    /// Undecided; retry with a fresh context once the trigger fires.
    AskAgain(ReevalTrigger),
}

/// Structured policy failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyError {
    /// A correctness-critical input variable had no value.
    #[error(transparent)]
    MissingValue(#[from] MissingValue),
    /// The update offer carries no download URLs at all.
    #[error("update offer contains no download urls")]
    NoDownloadUrls,
    /// Every offered URL reached its failure cap.
    #[error("all {url_count} download urls exhausted")]
    DownloadUrlsExhausted {
        /// Number of URLs in the exhausted offer.
        url_count: usize,
    },
    /// The reported connection type cannot be classified.
    #[error("connection type is unknown")]
    UnknownConnectionType,
}

// ============================================================================
// SECTION: Operation Results
// ============================================================================

/// Parameters of the next update check, produced by
/// [`Policy::update_check_allowed`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateCheckParams {
    /// False when update activity is administratively or structurally off.
    pub updates_enabled: bool,
    /// Channel override mandated by device policy, when any.
    pub target_channel: Option<String>,
    /// Version prefix ceiling mandated by device policy, when any.
    pub target_version_prefix: Option<String>,
    /// True when the check was requested by a user.
    pub is_interactive: bool,
}

impl Default for UpdateCheckParams {
    fn default() -> Self {
        Self {
            updates_enabled: true,
            target_channel: None,
            target_version_prefix: None,
            is_interactive: false,
        }
    }
}

/// Why an offered update may not start right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateCannotStartReason {
    /// An update check is currently due and takes precedence.
    CheckDue,
    /// The device is inside its scattering window.
    Scattering,
    /// No usable download source is available.
    CannotDownload,
}

/// Verdict and download parameters produced by [`Policy::update_can_start`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateDownloadParams {
    /// True when download/apply may begin now.
    pub update_can_start: bool,
    /// True when peer-to-peer payload sharing may be used.
    pub p2p_allowed: bool,
    /// Channel override to fetch from, when device policy mandates one.
    pub target_channel: Option<String>,
    /// Selected download URL index; `None` when only p2p is usable.
    pub download_url_idx: Option<usize>,
    /// Consecutive failures recorded against the selected URL.
    pub download_url_num_failures: u32,
    /// Populated when `update_can_start` is false.
    pub cannot_start_reason: Option<UpdateCannotStartReason>,
    /// Scatter wait period to persist; zero when inactive or satisfied.
    pub scatter_wait_period: Duration,
    /// Scatter check threshold to persist; zero when inactive or satisfied.
    pub scatter_check_threshold: u32,
}

impl Default for UpdateDownloadParams {
    fn default() -> Self {
        Self {
            update_can_start: true,
            p2p_allowed: false,
            target_channel: None,
            download_url_idx: None,
            download_url_num_failures: 0,
            cannot_start_reason: None,
            scatter_wait_period: Duration::ZERO,
            scatter_check_threshold: 0,
        }
    }
}

// ============================================================================
// SECTION: Update State
// ============================================================================

/// Per-offer decision history, persisted by the driver across process runs.
///
/// # Invariants
/// - Mutated only through values returned by policies; the engine never
///   writes it directly.
/// - Timestamps are wall-clock so the history survives restarts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateState {
    /// Wall-clock time the currently offered update was first seen.
    pub first_seen: OffsetDateTime,
    /// Update checks completed since the offer was first seen.
    pub num_checks: u32,
    /// Server-provided candidate URLs in preference order.
    pub download_urls: Vec<String>,
    /// Consecutive-failure cap after which a URL is abandoned.
    pub download_failures_max: u32,
    /// Currently selected URL index; `None` when no URL was usable.
    pub download_url_idx: Option<usize>,
    /// Consecutive failures recorded against the selected URL.
    pub download_url_num_failures: u32,
    /// Failures observed since the previous evaluation.
    pub download_url_new_failures: u32,
    /// Previously drawn scatter wait period; zero when none was drawn.
    pub scatter_wait_period: Duration,
    /// Upper bound on the effective wait period.
    pub scatter_wait_period_max: Duration,
    /// Previously drawn check threshold; zero when none was drawn.
    pub scatter_check_threshold: u32,
    /// Inclusive lower bound for fresh threshold draws.
    pub scatter_check_threshold_min: u32,
    /// Inclusive upper bound for fresh threshold draws.
    pub scatter_check_threshold_max: u32,
}

// ============================================================================
// SECTION: Policy Trait
// ============================================================================

/// A pacing policy: stateless decision logic over provider state.
pub trait Policy: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Decides whether the next check against the update server may fire.
    fn update_check_allowed(
        &self,
        ec: &mut EvaluationContext<'_>,
        state: &State,
    ) -> Decision<UpdateCheckParams>;

    /// Gates whether download/apply may begin for an already-offered update.
    fn update_can_start(
        &self,
        ec: &mut EvaluationContext<'_>,
        state: &State,
        interactive: bool,
        update_state: &UpdateState,
    ) -> Decision<UpdateDownloadParams>;

    /// Network-eligibility gate for the download, independent of timing.
    fn update_download_allowed(
        &self,
        ec: &mut EvaluationContext<'_>,
        state: &State,
    ) -> Decision<bool>;
}
