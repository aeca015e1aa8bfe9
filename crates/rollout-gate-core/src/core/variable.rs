// crates/rollout-gate-core/src/core/variable.rs
// ============================================================================
// Module: Typed Variables
// Description: Named, typed, read-only data sources with refresh modes.
// Purpose: Give policies a uniform contract over heterogeneous host state.
// Dependencies: serde, thiserror, time
// ============================================================================

//! ## Overview
//! A [`Variable`] is a named, typed, read-only view of one piece of host
//! state. Its [`VariableMode`] declares how the value refreshes: `Const`
//! values never change, `Poll` values are re-read on demand, and `Async`
//! values additionally signal waiters when they change. Every variable
//! carries a process-unique [`VariableId`] that evaluation contexts use as a
//! cache key, and a poll interval advising how soon a re-read could observe a
//! different value. The module also ships the generic implementations the
//! real and fake providers are assembled from.
//! Invariants:
//! - A `VariableId` is never reused within a process.
//! - `watch` returns a subscription only for `Async` variables.
//! - A [`ChangeWatch`] fires at most once and stays fired.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::Condvar;
use std::sync::Mutex;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use time::Duration;

// ============================================================================
// SECTION: Identity and Modes
// ============================================================================

/// Default poll interval advised for `Poll` and `Async` variables.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::minutes(5);

/// Allocator for process-unique variable identifiers.
static NEXT_VARIABLE_ID: AtomicU64 = AtomicU64::new(1);

/// Stable identity of a variable for the lifetime of the process.
///
/// Evaluation contexts key their snapshot caches by this identifier, so it
/// must be stable across reads and unique across all live variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VariableId(u64);

impl VariableId {
    /// Allocates the next unused identifier.
    fn allocate() -> Self {
        Self(NEXT_VARIABLE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// How a variable's value may be obtained and refreshed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariableMode {
    /// Fixed for the process lifetime; read once, never re-read.
    Const,
    /// Re-read synchronously on demand; the read may block.
    Poll,
    /// Pollable, and additionally notifies waiters when the value changes.
    Async,
}

/// Error surfaced by a variable read.
///
/// Reads failing is an expected condition, not a fault: evaluation contexts
/// record the failure as an absent value and leave the verdict to the policy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VariableError {
    /// The source is reachable but currently holds no value.
    #[error("variable `{variable}` has no value")]
    NoValue {
        /// Name of the variable that was read.
        variable: String,
    },
    /// The source could not be read.
    #[error("variable `{variable}` read failed: {reason}")]
    ReadFailed {
        /// Name of the variable that was read.
        variable: String,
        /// Source-specific failure description.
        reason: String,
    },
    /// The read was abandoned because the time budget was exhausted.
    #[error("variable `{variable}` read timed out")]
    TimedOut {
        /// Name of the variable that was read.
        variable: String,
    },
}

// ============================================================================
// SECTION: Variable Contract
// ============================================================================

/// Named, typed, read-only data source.
///
/// # Invariants
/// - Ownership rests with exactly one provider for the process lifetime;
///   evaluation contexts only ever borrow a variable.
/// - Implementations are safe to read concurrently.
pub trait Variable<T>: Send + Sync {
    /// Human-readable name used in errors, logs, and context dumps.
    fn name(&self) -> &str;

    /// Stable identity used as the snapshot-cache key.
    fn id(&self) -> VariableId;

    /// Declared refresh mode.
    fn mode(&self) -> VariableMode;

    /// Advised interval after which a re-read could observe a new value.
    fn poll_interval(&self) -> Duration {
        DEFAULT_POLL_INTERVAL
    }

    /// Reads the current value, waiting at most `timeout`.
    ///
    /// # Errors
    /// Returns a [`VariableError`] when the source holds no value, cannot be
    /// read, or the timeout elapses.
    fn get(&self, timeout: Duration) -> Result<T, VariableError>;

    /// Opens a one-shot change subscription; `None` unless the mode is
    /// [`VariableMode::Async`].
    fn watch(&self) -> Option<ChangeWatch> {
        None
    }
}

/// Identity and metadata embedded in every variable implementation.
pub(crate) struct VariableIdent {
    /// Human-readable variable name.
    pub(crate) name: String,
    /// Process-unique identity.
    pub(crate) id: VariableId,
    /// Declared refresh mode.
    pub(crate) mode: VariableMode,
    /// Advised poll interval.
    pub(crate) poll_interval: Duration,
}

impl VariableIdent {
    /// Creates an identity with the default poll interval.
    pub(crate) fn new(name: impl Into<String>, mode: VariableMode) -> Self {
        Self {
            name: name.into(),
            id: VariableId::allocate(),
            mode,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

// ============================================================================
// SECTION: Change Notification
// ============================================================================

/// State shared between a notifier and the watches it has handed out.
struct NotifierShared {
    /// Monotone count of changes recorded so far.
    generation: Mutex<u64>,
    /// Signaled on every generation bump.
    signal: Condvar,
}

/// Change-signal source owned by an async variable.
///
/// # Invariants
/// - Generations only grow; a watch opened at generation `g` fires once the
///   generation exceeds `g` and then stays fired.
pub struct ChangeNotifier {
    /// Shared generation state.
    shared: Arc<NotifierShared>,
}

impl ChangeNotifier {
    /// Creates an idle notifier.
    #[must_use]
    pub fn new() -> Self {
        Self {
            shared: Arc::new(NotifierShared {
                generation: Mutex::new(0),
                signal: Condvar::new(),
            }),
        }
    }

    /// Records a change and wakes any blocked waiters.
    pub fn notify(&self) {
        if let Ok(mut generation) = self.shared.generation.lock() {
            *generation = generation.saturating_add(1);
            self.shared.signal.notify_all();
        }
    }

    /// Opens a one-shot watch that fires on the next recorded change.
    #[must_use]
    pub fn watch(&self) -> ChangeWatch {
        let seen = self.shared.generation.lock().map_or(0, |generation| *generation);
        ChangeWatch {
            shared: Arc::clone(&self.shared),
            seen,
        }
    }
}

impl Default for ChangeNotifier {
    fn default() -> Self {
        Self::new()
    }
}

/// One-shot subscription to a variable change.
///
/// A watch opened before a change fires as soon as the change is recorded; a
/// fired watch never resets. Hosts may block on it or poll it.
pub struct ChangeWatch {
    /// Shared generation state.
    shared: Arc<NotifierShared>,
    /// Generation observed when the watch was opened.
    seen: u64,
}

impl ChangeWatch {
    /// True once the watched source changed after the watch was opened.
    ///
    /// A poisoned notifier reports as fired so waiters cannot hang.
    #[must_use]
    pub fn has_fired(&self) -> bool {
        self.shared.generation.lock().map_or(true, |generation| *generation > self.seen)
    }

    /// Blocks until the watch fires or `timeout` elapses; returns
    /// [`Self::has_fired`] at the time of return.
    pub fn wait_timeout(&self, timeout: std::time::Duration) -> bool {
        let Ok(guard) = self.shared.generation.lock() else {
            return true;
        };
        self.shared
            .signal
            .wait_timeout_while(guard, timeout, |generation| *generation <= self.seen)
            .map_or(true, |(generation, _)| *generation > self.seen)
    }
}

// ============================================================================
// SECTION: Generic Variables
// ============================================================================

/// Variable with a value fixed at construction.
pub struct ConstVariable<T> {
    /// Identity and metadata.
    ident: VariableIdent,
    /// The fixed value.
    value: T,
}

impl<T: Clone + Send + Sync> ConstVariable<T> {
    /// Creates a constant variable.
    #[must_use]
    pub fn new(name: impl Into<String>, value: T) -> Self {
        Self {
            ident: VariableIdent::new(name, VariableMode::Const),
            value,
        }
    }
}

impl<T: Clone + Send + Sync> Variable<T> for ConstVariable<T> {
    fn name(&self) -> &str {
        &self.ident.name
    }

    fn id(&self) -> VariableId {
        self.ident.id
    }

    fn mode(&self) -> VariableMode {
        self.ident.mode
    }

    fn poll_interval(&self) -> Duration {
        self.ident.poll_interval
    }

    fn get(&self, _timeout: Duration) -> Result<T, VariableError> {
        Ok(self.value.clone())
    }
}

/// Reader closure backing a [`PollVariable`].
type PollReader<T> = Box<dyn Fn() -> Result<T, String> + Send + Sync>;

/// Variable that re-reads its source synchronously on every fetch.
///
/// The reader runs on the evaluating thread; a slow reader consumes the
/// evaluation's remaining time budget.
pub struct PollVariable<T> {
    /// Identity and metadata.
    ident: VariableIdent,
    /// Source reader; an `Err` describes why the source was unreadable.
    read: PollReader<T>,
}

impl<T: Clone + Send + Sync> PollVariable<T> {
    /// Creates a poll variable backed by `read`.
    #[must_use]
    pub fn new<F>(name: impl Into<String>, read: F) -> Self
    where
        F: Fn() -> Result<T, String> + Send + Sync + 'static,
    {
        Self {
            ident: VariableIdent::new(name, VariableMode::Poll),
            read: Box::new(read),
        }
    }

    /// Overrides the advised poll interval.
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.ident.poll_interval = interval;
        self
    }
}

impl<T: Clone + Send + Sync> Variable<T> for PollVariable<T> {
    fn name(&self) -> &str {
        &self.ident.name
    }

    fn id(&self) -> VariableId {
        self.ident.id
    }

    fn mode(&self) -> VariableMode {
        self.ident.mode
    }

    fn poll_interval(&self) -> Duration {
        self.ident.poll_interval
    }

    fn get(&self, _timeout: Duration) -> Result<T, VariableError> {
        (self.read)().map_err(|reason| VariableError::ReadFailed {
            variable: self.ident.name.clone(),
            reason,
        })
    }
}

/// Async variable whose owner pushes values into a shared slot.
///
/// # Invariants
/// - Setting an equal value does not signal watchers; only observable changes
///   fire subscriptions.
pub struct WatchedVariable<T> {
    /// Identity and metadata.
    ident: VariableIdent,
    /// Latest pushed value; `None` until first set or after `clear`.
    slot: Mutex<Option<T>>,
    /// Change signal bumped on every observable change.
    notifier: ChangeNotifier,
}

impl<T: Clone + PartialEq + Send + Sync> WatchedVariable<T> {
    /// Creates an async variable with an empty slot.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            ident: VariableIdent::new(name, VariableMode::Async),
            slot: Mutex::new(None),
            notifier: ChangeNotifier::new(),
        }
    }

    /// Creates an async variable holding `value`.
    #[must_use]
    pub fn with_value(name: impl Into<String>, value: T) -> Self {
        let variable = Self::new(name);
        if let Ok(mut slot) = variable.slot.lock() {
            *slot = Some(value);
        }
        variable
    }

    /// Overrides the advised poll interval.
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.ident.poll_interval = interval;
        self
    }

    /// Stores a new value, signaling watchers when it differs.
    pub fn set(&self, value: T) {
        if let Ok(mut slot) = self.slot.lock() {
            let changed = slot.as_ref() != Some(&value);
            *slot = Some(value);
            drop(slot);
            if changed {
                self.notifier.notify();
            }
        }
    }

    /// Empties the slot, signaling watchers when a value was present.
    pub fn clear(&self) {
        if let Ok(mut slot) = self.slot.lock() {
            let changed = slot.take().is_some();
            drop(slot);
            if changed {
                self.notifier.notify();
            }
        }
    }
}

impl<T: Clone + PartialEq + Send + Sync> Variable<T> for WatchedVariable<T> {
    fn name(&self) -> &str {
        &self.ident.name
    }

    fn id(&self) -> VariableId {
        self.ident.id
    }

    fn mode(&self) -> VariableMode {
        self.ident.mode
    }

    fn poll_interval(&self) -> Duration {
        self.ident.poll_interval
    }

    fn get(&self, _timeout: Duration) -> Result<T, VariableError> {
        let value = self.slot.lock().map_or(None, |slot| slot.clone());
        value.ok_or_else(|| VariableError::NoValue {
            variable: self.ident.name.clone(),
        })
    }

    fn watch(&self) -> Option<ChangeWatch> {
        Some(self.notifier.watch())
    }
}
