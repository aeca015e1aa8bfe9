// crates/rollout-gate-core/src/runtime/context.rs
// ============================================================================
// Module: Evaluation Context
// Description: Per-decision snapshot cache and time budget.
// Purpose: Give one policy evaluation a consistent, bounded view of state.
// Dependencies: serde_json, thiserror, time, tracing
// ============================================================================

//! ## Overview
//! An [`EvaluationContext`] lives for exactly one policy evaluation. The
//! first read of each variable goes to the source with the remaining time
//! budget and is snapshotted; every later read returns the identical
//! snapshot, shielding the decision from concurrent provider mutation. Read
//! failures are snapshotted too, as explicit absence. The captured wall-clock
//! and monotonic "now" anchor all time comparisons made during the
//! evaluation.
//! Invariants:
//! - A cache hit never re-reads the source, regardless of mode.
//! - Once the budget reaches zero, non-const misses fail without blocking.
//! - Cached snapshots are immutable and die with the context.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use serde_json::json;
use thiserror::Error;
use time::Duration;
use time::OffsetDateTime;
use tracing::warn;

use crate::core::clock::Clock;
use crate::core::variable::ChangeWatch;
use crate::core::variable::Variable;
use crate::core::variable::VariableError;
use crate::core::variable::VariableId;
use crate::core::variable::VariableMode;
use crate::runtime::trigger::ReevalTrigger;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// A correctness-critical input variable had no value.
///
/// Produced by [`EvaluationContext::require`] and folded by policies into
/// their failure verdicts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("required variable `{variable}` has no value")]
pub struct MissingValue {
    /// Name of the absent variable.
    pub variable: String,
}

// ============================================================================
// SECTION: Cache Entries
// ============================================================================

/// Snapshot of one variable read, successful or not.
struct CachedRead {
    /// Variable name for dumps and diagnostics.
    name: String,
    /// Refresh mode recorded for the dump.
    mode: VariableMode,
    /// Snapshot value; `None` records explicit absence.
    value: Option<Arc<dyn Any + Send + Sync>>,
    /// JSON rendering of the value or the read error.
    rendered: Value,
}

// ============================================================================
// SECTION: Evaluation Context
// ============================================================================

/// Per-decision snapshot cache with a monotonic time budget.
///
/// # Invariants
/// - Created fresh for every evaluation and dropped when it returns; a
///   [`ReevalTrigger`] handed out by the policy outlives the context.
pub struct EvaluationContext<'a> {
    /// Injected clock capability.
    clock: &'a dyn Clock,
    /// Wall-clock "now" captured at construction.
    start_wallclock: OffsetDateTime,
    /// Monotonic "now" captured at construction.
    start_monotonic: Duration,
    /// Monotonic instant at which the budget is exhausted.
    deadline: Duration,
    /// Snapshot cache keyed by variable identity.
    cache: HashMap<VariableId, CachedRead>,
}

impl<'a> EvaluationContext<'a> {
    /// Opens a context with the given overall evaluation budget.
    #[must_use]
    pub fn new(clock: &'a dyn Clock, evaluation_timeout: Duration) -> Self {
        let start_monotonic = clock.monotonic();
        Self {
            clock,
            start_wallclock: clock.wallclock(),
            start_monotonic,
            deadline: start_monotonic.saturating_add(evaluation_timeout),
            cache: HashMap::new(),
        }
    }

    /// Wall-clock time captured when the evaluation started.
    #[must_use]
    pub const fn start_wallclock(&self) -> OffsetDateTime {
        self.start_wallclock
    }

    /// Monotonic reading captured when the evaluation started.
    #[must_use]
    pub const fn start_monotonic(&self) -> Duration {
        self.start_monotonic
    }

    /// Remaining evaluation budget, floored at zero.
    #[must_use]
    pub fn remaining_time(&self) -> Duration {
        (self.deadline - self.clock.monotonic()).max(Duration::ZERO)
    }

    /// True when the evaluation's captured "now" is past `timestamp`.
    #[must_use]
    pub fn is_wallclock_time_greater_than(&self, timestamp: OffsetDateTime) -> bool {
        self.start_wallclock > timestamp
    }

    /// True when the evaluation's captured monotonic reading is past
    /// `reading`.
    #[must_use]
    pub fn is_monotonic_time_greater_than(&self, reading: Duration) -> bool {
        self.start_monotonic > reading
    }

    /// Reads a variable through the snapshot cache.
    ///
    /// The first read per variable consults the source with the remaining
    /// budget; success and failure are both cached. Later reads return the
    /// snapshot unchanged. Absence (any [`VariableError`]) reads as `None`.
    pub fn value<T>(&mut self, variable: &dyn Variable<T>) -> Option<T>
    where
        T: Clone + serde::Serialize + Send + Sync + 'static,
    {
        let id = variable.id();
        if let Some(entry) = self.cache.get(&id) {
            return entry.value.as_ref().and_then(|value| value.downcast_ref::<T>()).cloned();
        }

        let remaining = self.remaining_time();
        let read = if remaining.is_zero() && variable.mode() != VariableMode::Const {
            Err(VariableError::TimedOut {
                variable: variable.name().to_owned(),
            })
        } else {
            variable.get(remaining)
        };

        match read {
            Ok(value) => {
                let rendered = serde_json::to_value(&value)
                    .unwrap_or_else(|_| Value::String("<unrenderable>".to_owned()));
                self.cache.insert(id, CachedRead {
                    name: variable.name().to_owned(),
                    mode: variable.mode(),
                    value: Some(Arc::new(value.clone())),
                    rendered,
                });
                Some(value)
            }
            Err(error) => {
                warn!(variable = variable.name(), %error, "variable read failed");
                self.cache.insert(id, CachedRead {
                    name: variable.name().to_owned(),
                    mode: variable.mode(),
                    value: None,
                    rendered: json!({ "error": error.to_string() }),
                });
                None
            }
        }
    }

    /// Reads a variable the policy cannot proceed without.
    ///
    /// # Errors
    /// Returns [`MissingValue`] when the snapshot records absence.
    pub fn require<T>(&mut self, variable: &dyn Variable<T>) -> Result<T, MissingValue>
    where
        T: Clone + serde::Serialize + Send + Sync + 'static,
    {
        self.value(variable).ok_or_else(|| MissingValue {
            variable: variable.name().to_owned(),
        })
    }

    /// Opens a one-shot change subscription on an async variable.
    #[must_use]
    pub fn subscribe<T>(&self, variable: &dyn Variable<T>) -> Option<ChangeWatch> {
        variable.watch()
    }

    /// Builds a deadline trigger one poll interval past the evaluation's
    /// captured "now", for waiting on a non-async variable.
    pub fn poll_trigger<T>(&self, variable: &dyn Variable<T>) -> ReevalTrigger {
        ReevalTrigger::At(self.start_wallclock + variable.poll_interval())
    }

    /// Renders the evaluation for diagnostics: captured times, remaining
    /// budget, and every snapshotted read.
    #[must_use]
    pub fn dump(&self) -> Value {
        let mut variables = serde_json::Map::new();
        for entry in self.cache.values() {
            variables.insert(
                entry.name.clone(),
                json!({ "mode": entry.mode, "value": entry.rendered }),
            );
        }
        json!({
            "start_wallclock": self.start_wallclock,
            "start_monotonic_secs": self.start_monotonic.whole_seconds(),
            "remaining_secs": self.remaining_time().whole_seconds(),
            "variables": variables,
        })
    }
}
