// crates/rollout-gate-core/src/runtime/orchestrator.rs
// ============================================================================
// Module: Orchestrator
// Description: Drives policy evaluations and the deferred-decision loop.
// Purpose: Own the policy pair and turn deferrals into scheduled re-runs.
// Dependencies: thiserror, time, tracing
// ============================================================================

//! ## Overview
//! The [`Orchestrator`] owns the production policy, the permissive fallback,
//! and the clock, and runs policy operations on behalf of the host. Every
//! evaluation gets a fresh [`EvaluationContext`]; when the production policy
//! fails, the fallback answers within the same context so both see one
//! consistent snapshot. A deferred decision becomes a [`DecisionLoop`] that
//! the host polls: each poll either finishes with a verdict, or reports the
//! deadline and change watch to block on next.
//! Invariants:
//! - At most one decision loop is in flight per orchestrator; the loop holds
//!   an exclusive borrow for its whole life.
//! - A loop never outlives the expiration timeout; expiry is measured on the
//!   monotonic clock and survives wall-clock jumps.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::marker::PhantomData;
use std::sync::Arc;

use thiserror::Error;
use time::Duration;
use time::OffsetDateTime;
use tracing::debug;
use tracing::warn;

use crate::core::clock::Clock;
use crate::core::state::State;
use crate::core::variable::ChangeWatch;
use crate::runtime::context::EvaluationContext;
use crate::runtime::default_policy::DefaultPolicy;
use crate::runtime::policy::Decision;
use crate::runtime::policy::Policy;
use crate::runtime::policy::PolicyError;
use crate::runtime::trigger::ReevalTrigger;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Time budget for the variable reads of a single evaluation.
pub const DEFAULT_EVALUATION_TIMEOUT: Duration = Duration::seconds(5);

/// Monotonic lifetime of a decision loop before it gives up.
pub const DEFAULT_EXPIRATION_TIMEOUT: Duration = Duration::hours(12);

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Failure produced while driving a policy decision.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// The policy deferred and the caller asked for an immediate verdict.
    #[error("the policy deferred its decision")]
    WouldDefer,

    /// The decision loop outlived its expiration timeout.
    #[error("the decision loop expired before reaching a verdict")]
    Expired,

    /// The production and fallback policies both failed.
    #[error(transparent)]
    Policy(#[from] PolicyError),
}

// ============================================================================
// SECTION: Orchestrator
// ============================================================================

/// Owner of the policy pair and entry point for evaluations.
pub struct Orchestrator {
    /// Clock shared with the host; fakes let tests steer time.
    clock: Arc<dyn Clock>,
    /// Provider aggregate every evaluation reads through.
    state: State,
    /// Production policy consulted first.
    policy: Box<dyn Policy>,
    /// Fallback consulted when the production policy fails.
    default_policy: DefaultPolicy,
    /// Per-evaluation time budget.
    evaluation_timeout: Duration,
    /// Lifetime cap for decision loops.
    expiration_timeout: Duration,
}

impl Orchestrator {
    /// Creates an orchestrator with the default timeouts.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>, state: State, policy: Box<dyn Policy>) -> Self {
        Self {
            clock,
            state,
            policy,
            default_policy: DefaultPolicy::new(),
            evaluation_timeout: DEFAULT_EVALUATION_TIMEOUT,
            expiration_timeout: DEFAULT_EXPIRATION_TIMEOUT,
        }
    }

    /// Replaces the per-evaluation time budget.
    #[must_use]
    pub const fn with_evaluation_timeout(mut self, timeout: Duration) -> Self {
        self.evaluation_timeout = timeout;
        self
    }

    /// Replaces the decision-loop lifetime cap.
    #[must_use]
    pub const fn with_expiration_timeout(mut self, timeout: Duration) -> Self {
        self.expiration_timeout = timeout;
        self
    }

    /// Provider aggregate the orchestrator evaluates against.
    #[must_use]
    pub const fn state(&self) -> &State {
        &self.state
    }

    /// Runs one policy operation and demands an immediate verdict.
    ///
    /// The operation receives the policy to consult, the evaluation context,
    /// and the provider aggregate. A deferral is reported as
    /// [`OrchestratorError::WouldDefer`]; callers that can wait should use
    /// [`Self::begin`] instead.
    ///
    /// # Errors
    /// [`OrchestratorError::WouldDefer`] when the policy asked to be
    /// re-evaluated later, or the propagated [`PolicyError`] when both
    /// policies failed.
    pub fn decide_now<R, F>(&self, op: F) -> Result<R, OrchestratorError>
    where
        F: Fn(&dyn Policy, &mut EvaluationContext<'_>, &State) -> Decision<R>,
    {
        let mut ec = EvaluationContext::new(self.clock.as_ref(), self.evaluation_timeout);
        match self.evaluate(&mut ec, &op) {
            Decision::Succeeded(result) => Ok(result),
            Decision::Failed(error) => Err(OrchestratorError::Policy(error)),
            Decision::AskAgain(_) => Err(OrchestratorError::WouldDefer),
        }
    }

    /// Starts a decision loop for one policy operation.
    ///
    /// The loop borrows the orchestrator exclusively, so a second loop
    /// cannot start until the first one is dropped.
    pub fn begin<R, F>(&mut self, op: F) -> DecisionLoop<'_, R, F>
    where
        F: Fn(&dyn Policy, &mut EvaluationContext<'_>, &State) -> Decision<R>,
    {
        let expires_at = self.clock.monotonic().saturating_add(self.expiration_timeout);
        DecisionLoop {
            orchestrator: self,
            op,
            expires_at,
            pending: None,
            result_marker: PhantomData,
        }
    }

    /// Runs the operation on the production policy, falling back to the
    /// default policy within the same context when it fails.
    fn evaluate<R, F>(&self, ec: &mut EvaluationContext<'_>, op: &F) -> Decision<R>
    where
        F: Fn(&dyn Policy, &mut EvaluationContext<'_>, &State) -> Decision<R>,
    {
        match op(self.policy.as_ref(), ec, &self.state) {
            Decision::Failed(error) => {
                warn!(
                    policy = self.policy.name(),
                    %error,
                    "policy failed; falling back to the default policy"
                );
                debug!(context = %ec.dump(), "evaluation context at failure");
                op(&self.default_policy, ec, &self.state)
            }
            decision => decision,
        }
    }
}

// ============================================================================
// SECTION: Decision Loop
// ============================================================================

/// Outcome of one [`DecisionLoop::poll`].
#[must_use]
pub enum LoopStep<R> {
    /// The loop reached a verdict and is done.
    Finished(Result<R, OrchestratorError>),
    /// The decision is still deferred; re-poll at `deadline` or when the
    /// pending change watch fires.
    Waiting {
        /// Wall-clock time of the next scheduled re-evaluation, when one
        /// exists.
        deadline: Option<OffsetDateTime>,
    },
}

/// An in-flight deferred decision, re-evaluated on each ready poll.
pub struct DecisionLoop<'a, R, F>
where
    F: Fn(&dyn Policy, &mut EvaluationContext<'_>, &State) -> Decision<R>,
{
    /// Exclusive handle to the owning orchestrator.
    orchestrator: &'a mut Orchestrator,
    /// Operation re-run on every evaluation.
    op: F,
    /// Monotonic reading after which the loop expires.
    expires_at: Duration,
    /// Trigger left behind by the last deferral.
    pending: Option<ReevalTrigger>,
    /// Ties the loop to its operation's result type.
    result_marker: PhantomData<fn() -> R>,
}

impl<R, F> DecisionLoop<'_, R, F>
where
    F: Fn(&dyn Policy, &mut EvaluationContext<'_>, &State) -> Decision<R>,
{
    /// Advances the loop by at most one evaluation.
    ///
    /// An unexpired loop whose pending trigger has not fired reports
    /// [`LoopStep::Waiting`] without evaluating. Otherwise the operation is
    /// re-run on a fresh context and the verdict or the next wait is
    /// reported.
    pub fn poll(&mut self) -> LoopStep<R> {
        if self.orchestrator.clock.monotonic() > self.expires_at {
            return LoopStep::Finished(Err(OrchestratorError::Expired));
        }
        if let Some(trigger) = &self.pending {
            if !trigger.is_ready(self.orchestrator.clock.as_ref()) {
                return LoopStep::Waiting {
                    deadline: trigger.deadline(),
                };
            }
        }
        self.pending = None;

        let mut ec = EvaluationContext::new(
            self.orchestrator.clock.as_ref(),
            self.orchestrator.evaluation_timeout,
        );
        match self.orchestrator.evaluate(&mut ec, &self.op) {
            Decision::Succeeded(result) => LoopStep::Finished(Ok(result)),
            Decision::Failed(error) => {
                LoopStep::Finished(Err(OrchestratorError::Policy(error)))
            }
            Decision::AskAgain(trigger) => {
                let deadline = trigger.deadline();
                self.pending = Some(trigger);
                LoopStep::Waiting {
                    deadline,
                }
            }
        }
    }

    /// Change watch of the pending trigger, for hosts that block on change
    /// notifications between polls.
    #[must_use]
    pub fn pending_watch(&self) -> Option<&ChangeWatch> {
        self.pending.as_ref().and_then(ReevalTrigger::watch)
    }
}
