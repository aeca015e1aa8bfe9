// crates/rollout-gate-core/src/runtime/trigger.rs
// ============================================================================
// Module: Re-evaluation Triggers
// Description: Wake-up conditions carried by deferred decisions.
// Purpose: Let the driver wait for exactly the event the policy named.
// Dependencies: time
// ============================================================================

//! ## Overview
//! A deferred decision names the condition under which re-evaluating could
//! produce a different answer: an absolute wall-clock deadline, a change of
//! one async variable, or whichever of the two happens first. The trigger is
//! data, not a callback: the driver inspects it, sleeps on its own timer or
//! on the embedded [`ChangeWatch`], and polls readiness. Deadlines are
//! wall-clock on purpose; scheduled instants must stay meaningful across
//! process restarts.
//! Invariants:
//! - Every trigger variant names at least one wake-up condition.
//! - A trigger is consumed by exactly one retry; watches never reset.

// ============================================================================
// SECTION: Imports
// ============================================================================

use time::OffsetDateTime;

use crate::core::clock::Clock;
use crate::core::variable::ChangeWatch;

// ============================================================================
// SECTION: Trigger
// ============================================================================

/// Wake-up condition attached to a deferred decision.
#[must_use]
pub enum ReevalTrigger {
    /// Re-evaluate once wall-clock time reaches the deadline.
    At(OffsetDateTime),
    /// Re-evaluate once the watched variable changes.
    OnChange(ChangeWatch),
    /// Re-evaluate at whichever of deadline or change happens first.
    AtOrChange(OffsetDateTime, ChangeWatch),
}

impl ReevalTrigger {
    /// Builds a trigger from optional parts; `None` when neither is present.
    pub fn from_parts(
        deadline: Option<OffsetDateTime>,
        watch: Option<ChangeWatch>,
    ) -> Option<Self> {
        match (deadline, watch) {
            (Some(deadline), Some(watch)) => Some(Self::AtOrChange(deadline, watch)),
            (Some(deadline), None) => Some(Self::At(deadline)),
            (None, Some(watch)) => Some(Self::OnChange(watch)),
            (None, None) => None,
        }
    }

    /// Wall-clock deadline component, when present.
    #[must_use]
    pub const fn deadline(&self) -> Option<OffsetDateTime> {
        match self {
            Self::At(deadline) | Self::AtOrChange(deadline, _) => Some(*deadline),
            Self::OnChange(_) => None,
        }
    }

    /// Change-watch component, when present.
    #[must_use]
    pub const fn watch(&self) -> Option<&ChangeWatch> {
        match self {
            Self::OnChange(watch) | Self::AtOrChange(_, watch) => Some(watch),
            Self::At(_) => None,
        }
    }

    /// True once any named wake-up condition holds.
    #[must_use]
    pub fn is_ready(&self, clock: &dyn Clock) -> bool {
        match self {
            Self::At(deadline) => clock.wallclock() >= *deadline,
            Self::OnChange(watch) => watch.has_fired(),
            Self::AtOrChange(deadline, watch) => {
                clock.wallclock() >= *deadline || watch.has_fired()
            }
        }
    }
}
