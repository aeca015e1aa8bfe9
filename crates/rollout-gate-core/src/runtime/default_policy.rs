// crates/rollout-gate-core/src/runtime/default_policy.rs
// ============================================================================
// Module: Default Policy
// Description: Permissive fallback policy with minimal rate limiting.
// Purpose: Keep updates flowing when the production policy fails.
// Dependencies: time
// ============================================================================

//! ## Overview
//! [`DefaultPolicy`] answers every operation permissively so a bug or
//! missing input in the production policy can never wedge updates entirely.
//! The one restraint it keeps is a coarse rate limit on update checks, so a
//! persistently failing production policy does not hammer the update server.
//! Invariants:
//! - Never returns [`Decision::Failed`].
//! - Consults no provider variables; its verdicts depend only on the
//!   evaluation start time and its own memo.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Mutex;

use time::Duration;
use time::OffsetDateTime;

use crate::core::state::State;
use crate::runtime::context::EvaluationContext;
use crate::runtime::policy::Decision;
use crate::runtime::policy::Policy;
use crate::runtime::policy::UpdateCheckParams;
use crate::runtime::policy::UpdateDownloadParams;
use crate::runtime::policy::UpdateState;
use crate::runtime::trigger::ReevalTrigger;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Minimum spacing between update checks allowed by the fallback policy.
pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::hours(4);

// ============================================================================
// SECTION: Policy Implementation
// ============================================================================

/// Permissive fallback policy.
pub struct DefaultPolicy {
    /// Wall-clock time of the last check this policy allowed.
    last_check_allowed: Mutex<Option<OffsetDateTime>>,
}

impl DefaultPolicy {
    /// Creates the fallback policy with no check allowed yet.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            last_check_allowed: Mutex::new(None),
        }
    }
}

impl Default for DefaultPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl Policy for DefaultPolicy {
    fn name(&self) -> &'static str {
        "default_policy"
    }

    fn update_check_allowed(
        &self,
        ec: &mut EvaluationContext<'_>,
        _state: &State,
    ) -> Decision<UpdateCheckParams> {
        let mut memo = self
            .last_check_allowed
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Some(last_allowed) = *memo {
            let next_allowed = last_allowed + DEFAULT_CHECK_INTERVAL;
            if !ec.is_wallclock_time_greater_than(next_allowed) {
                return Decision::AskAgain(ReevalTrigger::At(next_allowed));
            }
        }
        *memo = Some(ec.start_wallclock());
        Decision::Succeeded(UpdateCheckParams::default())
    }

    fn update_can_start(
        &self,
        _ec: &mut EvaluationContext<'_>,
        _state: &State,
        _interactive: bool,
        update_state: &UpdateState,
    ) -> Decision<UpdateDownloadParams> {
        // Start from the first URL when one exists; scattering and failover
        // history are ignored.
        let result = UpdateDownloadParams {
            download_url_idx: (!update_state.download_urls.is_empty()).then_some(0),
            ..UpdateDownloadParams::default()
        };
        Decision::Succeeded(result)
    }

    fn update_download_allowed(
        &self,
        _ec: &mut EvaluationContext<'_>,
        _state: &State,
    ) -> Decision<bool> {
        Decision::Succeeded(true)
    }
}
