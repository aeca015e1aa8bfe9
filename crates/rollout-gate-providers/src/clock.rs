// crates/rollout-gate-providers/src/clock.rs
// ============================================================================
// Module: Clock-Backed Time Provider
// Description: Wall-clock time facts derived from the injected clock.
// Purpose: Expose now, date, and hour as pollable engine variables.
// Dependencies: rollout-gate-core, time
// ============================================================================

//! ## Overview
//! The time provider derives its three variables from the host's [`Clock`]
//! capability rather than reading the system clock directly, so a fake clock
//! steers these variables exactly like the rest of the engine. Poll intervals
//! reflect how fast each fact can change: the instant every second, the hour
//! every few minutes, the date once an hour.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use rollout_gate_core::Clock;
use rollout_gate_core::PollVariable;
use rollout_gate_core::TimeProvider;
use rollout_gate_core::Variable;
use time::Date;
use time::Duration;
use time::OffsetDateTime;

// ============================================================================
// SECTION: Provider Implementation
// ============================================================================

/// Production [`TimeProvider`] reading through the injected clock.
pub struct RealTimeProvider {
    /// Current wall-clock instant.
    now: PollVariable<OffsetDateTime>,
    /// Current calendar date.
    date: PollVariable<Date>,
    /// Current hour of the day.
    hour: PollVariable<u8>,
}

impl RealTimeProvider {
    /// Creates the provider on top of `clock`.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        let now_clock = Arc::clone(&clock);
        let date_clock = Arc::clone(&clock);
        let hour_clock = clock;
        Self {
            now: PollVariable::new("time.now", move || Ok(now_clock.wallclock()))
                .with_poll_interval(Duration::seconds(1)),
            date: PollVariable::new("time.date", move || Ok(date_clock.wallclock().date()))
                .with_poll_interval(Duration::hours(1)),
            hour: PollVariable::new("time.hour", move || Ok(hour_clock.wallclock().hour()))
                .with_poll_interval(Duration::minutes(5)),
        }
    }
}

impl TimeProvider for RealTimeProvider {
    fn now(&self) -> &dyn Variable<OffsetDateTime> {
        &self.now
    }

    fn date(&self) -> &dyn Variable<Date> {
        &self.date
    }

    fn hour(&self) -> &dyn Variable<u8> {
        &self.hour
    }
}
