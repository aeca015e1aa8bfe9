// crates/rollout-gate-core/src/core/clock.rs
// ============================================================================
// Module: Clock Capability
// Description: Injected wall-clock and monotonic time access.
// Purpose: Keep every time read explicit, swappable, and fakeable.
// Dependencies: time
// ============================================================================

//! ## Overview
//! All time access in the engine goes through the [`Clock`] capability. The
//! two domains are kept apart on purpose: monotonic readings govern
//! evaluation budgets and request expiration, while wall-clock instants are
//! reserved for absolute scheduled times (next-check deadlines, scatter wait
//! deadlines) that must stay meaningful across process restarts.
//! Invariants:
//! - Monotonic readings never decrease for a given clock instance.
//! - Wall-clock readings are UTC.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Instant;

use time::Duration;
use time::OffsetDateTime;

// ============================================================================
// SECTION: Capability
// ============================================================================

/// Injected time source.
///
/// # Invariants
/// - `monotonic` is measured from an arbitrary per-instance epoch and never
///   goes backwards.
pub trait Clock: Send + Sync {
    /// Current wall-clock time (UTC).
    fn wallclock(&self) -> OffsetDateTime;

    /// Monotonic reading since the clock's own epoch.
    fn monotonic(&self) -> Duration;
}

// ============================================================================
// SECTION: System Clock
// ============================================================================

/// Production clock backed by the operating system.
pub struct SystemClock {
    /// Epoch for monotonic readings, captured at construction.
    started: Instant,
}

impl SystemClock {
    /// Creates a clock whose monotonic epoch is "now".
    #[must_use]
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn wallclock(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }

    fn monotonic(&self) -> Duration {
        Duration::try_from(self.started.elapsed()).unwrap_or(Duration::MAX)
    }
}
