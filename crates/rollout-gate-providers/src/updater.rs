// crates/rollout-gate-providers/src/updater.rs
// ============================================================================
// Module: Updater Status Provider
// Description: Updater process status fed by the host through a handle.
// Purpose: Expose check history and user toggles as engine variables.
// Dependencies: rollout-gate-core, time
// ============================================================================

//! ## Overview
//! The updater provider is split in two: the provider half is aggregated into
//! the engine state and read by policies, while the [`UpdaterStatusHandle`]
//! stays with the host process, which records check outcomes and user
//! toggles as they happen. Both halves share the same variables, so a write
//! through the handle is immediately visible to the next evaluation and
//! wakes any pending change watch. The start time is fixed at construction;
//! the last-check time stays absent until the first check completes.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use rollout_gate_core::CheckRequest;
use rollout_gate_core::ConstVariable;
use rollout_gate_core::UpdaterProvider;
use rollout_gate_core::Variable;
use rollout_gate_core::WatchedVariable;
use time::OffsetDateTime;

// ============================================================================
// SECTION: Shared Variables
// ============================================================================

/// Variables shared between the provider and the host handle.
struct UpdaterShared {
    /// Wall-clock time of the last completed update check.
    last_checked_time: WatchedVariable<OffsetDateTime>,
    /// Consecutive failed checks since the last success.
    consecutive_failed_checks: WatchedVariable<u32>,
    /// Pending out-of-cycle check request.
    check_request: WatchedVariable<CheckRequest>,
    /// True when the device user enabled peer-to-peer sharing.
    is_p2p_enabled: WatchedVariable<bool>,
    /// True when the device user permitted cellular downloads.
    is_cellular_enabled: WatchedVariable<bool>,
}

// ============================================================================
// SECTION: Provider Implementation
// ============================================================================

/// Production [`UpdaterProvider`] fed through an [`UpdaterStatusHandle`].
pub struct RealUpdaterProvider {
    /// Wall-clock time the updater process started.
    updater_started_time: ConstVariable<OffsetDateTime>,
    /// Host-fed status variables.
    shared: Arc<UpdaterShared>,
}

/// Host-side writer for the updater status variables.
pub struct UpdaterStatusHandle {
    /// Host-fed status variables.
    shared: Arc<UpdaterShared>,
}

impl RealUpdaterProvider {
    /// Creates the provider half and its host handle.
    #[must_use]
    pub fn new(updater_started_time: OffsetDateTime) -> (Self, UpdaterStatusHandle) {
        let shared = Arc::new(UpdaterShared {
            last_checked_time: WatchedVariable::new("updater.last_checked_time"),
            consecutive_failed_checks: WatchedVariable::with_value(
                "updater.consecutive_failed_checks",
                0,
            ),
            check_request: WatchedVariable::with_value(
                "updater.check_request",
                CheckRequest::None,
            ),
            is_p2p_enabled: WatchedVariable::with_value("updater.is_p2p_enabled", false),
            is_cellular_enabled: WatchedVariable::with_value(
                "updater.is_cellular_enabled",
                false,
            ),
        });
        let provider = Self {
            updater_started_time: ConstVariable::new(
                "updater.updater_started_time",
                updater_started_time,
            ),
            shared: Arc::clone(&shared),
        };
        (
            provider,
            UpdaterStatusHandle {
                shared,
            },
        )
    }
}

impl UpdaterStatusHandle {
    /// Records the completion time of an update check.
    pub fn set_last_checked_time(&self, checked_at: OffsetDateTime) {
        self.shared.last_checked_time.set(checked_at);
    }

    /// Records the consecutive-failure count after a check.
    pub fn set_consecutive_failed_checks(&self, failures: u32) {
        self.shared.consecutive_failed_checks.set(failures);
    }

    /// Records or withdraws an out-of-cycle check request.
    pub fn set_check_request(&self, request: CheckRequest) {
        self.shared.check_request.set(request);
    }

    /// Records the user's peer-to-peer sharing toggle.
    pub fn set_p2p_enabled(&self, enabled: bool) {
        self.shared.is_p2p_enabled.set(enabled);
    }

    /// Records the user's cellular-download toggle.
    pub fn set_cellular_enabled(&self, enabled: bool) {
        self.shared.is_cellular_enabled.set(enabled);
    }
}

impl UpdaterProvider for RealUpdaterProvider {
    fn last_checked_time(&self) -> &dyn Variable<OffsetDateTime> {
        &self.shared.last_checked_time
    }

    fn updater_started_time(&self) -> &dyn Variable<OffsetDateTime> {
        &self.updater_started_time
    }

    fn consecutive_failed_checks(&self) -> &dyn Variable<u32> {
        &self.shared.consecutive_failed_checks
    }

    fn check_request(&self) -> &dyn Variable<CheckRequest> {
        &self.shared.check_request
    }

    fn is_p2p_enabled(&self) -> &dyn Variable<bool> {
        &self.shared.is_p2p_enabled
    }

    fn is_cellular_enabled(&self) -> &dyn Variable<bool> {
        &self.shared.is_cellular_enabled
    }
}
