// crates/rollout-gate-core/src/runtime/rollout_policy.rs
// ============================================================================
// Module: Rollout Policy
// Description: Production pacing policy with backoff, scattering, failover.
// Purpose: Decide check timing, download start, and network eligibility.
// Dependencies: time, tracing
// ============================================================================

//! ## Overview
//! [`RolloutPolicy`] is the production [`Policy`]: update checks fire on a
//! fuzzed periodic interval with exponential backoff after consecutive
//! failures; downloads of an offered update are scattered across the fleet
//! by a randomized wait period and check-count threshold; download sources
//! fail over through the server's URL list under a per-URL failure cap; and
//! the network gate permits downloads only on eligible connection types.
//! Invariants:
//! - Backoff before fuzzing never exceeds the configured maximum and never
//!   shrinks as the failure count grows.
//! - Scatter targets are drawn once per offer and reused until their bounds
//!   change; re-evaluation never pushes a device further into the future.
//! - URL failover never wraps; an exhausted list is a terminal failure.

// ============================================================================
// SECTION: Imports
// ============================================================================

use time::Duration;
use time::OffsetDateTime;
use tracing::debug;

use crate::core::prng::Prng;
use crate::core::providers::CheckRequest;
use crate::core::providers::ConnectionType;
use crate::core::providers::TetheringState;
use crate::core::state::State;
use crate::runtime::context::EvaluationContext;
use crate::runtime::policy::Decision;
use crate::runtime::policy::Policy;
use crate::runtime::policy::PolicyError;
use crate::runtime::policy::UpdateCannotStartReason;
use crate::runtime::policy::UpdateCheckParams;
use crate::runtime::policy::UpdateDownloadParams;
use crate::runtime::policy::UpdateState;
use crate::runtime::trigger::ReevalTrigger;

// ============================================================================
// SECTION: Pacing Configuration
// ============================================================================

/// Interval and jitter constants governing check pacing.
///
/// # Invariants
/// - `max_backoff_interval >= periodic_interval`.
/// - Fuzz magnitudes are non-negative.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacingConfig {
    /// Interval before the first-ever check after the updater starts.
    pub initial_interval: Duration,
    /// Steady-state interval between periodic checks.
    pub periodic_interval: Duration,
    /// Interval used when the server requested a fast re-check.
    pub quick_interval: Duration,
    /// Ceiling for the backed-off interval.
    pub max_backoff_interval: Duration,
    /// Jitter applied to initial and periodic intervals.
    pub regular_fuzz: Duration,
    /// Jitter applied to the quick interval.
    pub quick_fuzz: Duration,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            initial_interval: Duration::minutes(7),
            periodic_interval: Duration::minutes(45),
            quick_interval: Duration::minutes(1),
            max_backoff_interval: Duration::hours(4),
            regular_fuzz: Duration::minutes(10),
            quick_fuzz: Duration::minutes(1),
        }
    }
}

// ============================================================================
// SECTION: Pacing Math
// ============================================================================

/// Backed-off check interval for a consecutive-failure count, before fuzz.
///
/// Starts at the periodic interval and doubles once per failure while below
/// the maximum; the result is capped at `max_backoff_interval`.
#[must_use]
pub fn backoff_interval(pacing: &PacingConfig, consecutive_failures: u32) -> Duration {
    let mut interval = pacing.periodic_interval;
    for _ in 0 .. consecutive_failures {
        if interval >= pacing.max_backoff_interval {
            break;
        }
        interval = interval.saturating_mul(2);
    }
    interval.min(pacing.max_backoff_interval)
}

/// Applies symmetric jitter of magnitude `fuzz` around `interval`.
///
/// The draw is uniform over `[max(0, interval - fuzz/2), interval + fuzz/2]`
/// in whole seconds.
#[must_use]
pub fn fuzzed_interval(prng: &mut Prng, interval: Duration, fuzz: Duration) -> Duration {
    let half_fuzz = fuzz.whole_seconds() / 2;
    let interval_secs = interval.whole_seconds();
    let min_secs = (interval_secs - half_fuzz).max(0);
    let max_secs = interval_secs + half_fuzz;
    Duration::seconds(prng.range_inclusive(min_secs, max_secs))
}

// ============================================================================
// SECTION: URL Selection
// ============================================================================

/// Picks the download URL index and carried failure count for this offer.
///
/// Previous selection state is honored only after the first check of an
/// offer. New failures accrue against the selected URL; reaching the cap
/// advances to the next index with a fresh count. The list never wraps.
///
/// # Errors
/// Returns [`PolicyError::NoDownloadUrls`] for an empty offer and
/// [`PolicyError::DownloadUrlsExhausted`] when the last URL is spent.
pub fn select_download_url(update_state: &UpdateState) -> Result<(usize, u32), PolicyError> {
    if update_state.download_urls.is_empty() {
        return Err(PolicyError::NoDownloadUrls);
    }

    let (mut url_idx, mut num_failures) = if update_state.num_checks > 1 {
        (
            update_state.download_url_idx.unwrap_or(0),
            update_state.download_url_num_failures,
        )
    } else {
        (0, 0)
    };

    num_failures = num_failures.saturating_add(update_state.download_url_new_failures);
    if num_failures >= update_state.download_failures_max {
        url_idx = url_idx.saturating_add(1);
        num_failures = 0;
        debug!(url_idx, "download url reached its failure cap; advancing");
    }
    if url_idx >= update_state.download_urls.len() {
        return Err(PolicyError::DownloadUrlsExhausted {
            url_count: update_state.download_urls.len(),
        });
    }
    Ok((url_idx, num_failures))
}

// ============================================================================
// SECTION: Scattering
// ============================================================================

/// Scatter verdict computed for one evaluation.
struct ScatterParams {
    /// True while either scatter target still holds the device back.
    is_scattering: bool,
    /// Wait period to persist; zero when satisfied or inactive.
    wait_period: Duration,
    /// Check threshold to persist; zero when satisfied or inactive.
    check_threshold: u32,
}

// ============================================================================
// SECTION: Policy Implementation
// ============================================================================

/// Production pacing policy.
pub struct RolloutPolicy {
    /// Interval and jitter constants.
    pacing: PacingConfig,
}

impl RolloutPolicy {
    /// Creates the policy with the given pacing constants.
    #[must_use]
    pub const fn new(pacing: PacingConfig) -> Self {
        Self {
            pacing,
        }
    }

    /// Absolute wall-clock time at which the next periodic check may fire.
    ///
    /// First-ever checks are anchored to the updater start time on the
    /// initial interval; later checks are anchored to the last check on the
    /// quick or backed-off periodic interval. Beyond the periodic interval
    /// the fuzz widens to the whole interval.
    fn next_update_check_time(
        &self,
        ec: &mut EvaluationContext<'_>,
        state: &State,
        check_request: CheckRequest,
    ) -> Result<OffsetDateTime, PolicyError> {
        let updater = state.updater();
        let updater_started = ec.require(updater.updater_started_time())?;
        let seed = ec.require(state.random().seed())?;
        let mut prng = Prng::new(seed);

        let Some(last_checked) = ec.value(updater.last_checked_time()) else {
            return Ok(updater_started
                + fuzzed_interval(&mut prng, self.pacing.initial_interval, self.pacing.regular_fuzz));
        };

        let (interval, fuzz) = if check_request == CheckRequest::Scheduled {
            (self.pacing.quick_interval, self.pacing.quick_fuzz)
        } else {
            let failures = ec.require(updater.consecutive_failed_checks())?;
            let interval = backoff_interval(&self.pacing, failures);
            let fuzz = if interval > self.pacing.periodic_interval {
                interval
            } else {
                self.pacing.regular_fuzz
            };
            (interval, fuzz)
        };
        Ok(last_checked + fuzzed_interval(&mut prng, interval, fuzz))
    }

    /// Computes the scatter verdict for the current offer.
    ///
    /// Previously drawn targets are reused unless their bounds changed;
    /// fresh draws happen at most once per offer. Succeeding with changed
    /// values lets the driver persist them; deferral happens only when
    /// nothing new needs persisting.
    fn update_scattering(
        &self,
        ec: &mut EvaluationContext<'_>,
        state: &State,
        update_state: &UpdateState,
    ) -> Decision<ScatterParams> {
        let mut result = ScatterParams {
            is_scattering: false,
            wait_period: Duration::ZERO,
            check_threshold: 0,
        };

        let scatter_factor = match ec.value(state.device_policy().scatter_factor()) {
            Some(factor) if factor > Duration::ZERO => factor,
            Some(_) | None => return Decision::Succeeded(result),
        };
        let seed = match ec.require(state.random().seed()) {
            Ok(seed) => seed,
            Err(missing) => return Decision::Failed(missing.into()),
        };
        let mut prng = Prng::new(seed);

        let mut wait_period = update_state.scatter_wait_period;
        if wait_period.is_zero() || wait_period > scatter_factor {
            wait_period =
                Duration::seconds(prng.range_inclusive(0, scatter_factor.whole_seconds()));
            debug!(wait_secs = wait_period.whole_seconds(), "drew new scatter wait period");
        }
        let wait_deadline =
            update_state.first_seen + wait_period.min(update_state.scatter_wait_period_max);
        if ec.is_wallclock_time_greater_than(wait_deadline) {
            wait_period = Duration::ZERO;
        }

        let mut check_threshold = update_state.scatter_check_threshold;
        if check_threshold == 0 {
            check_threshold = draw_check_threshold(
                &mut prng,
                update_state.scatter_check_threshold_min,
                update_state.scatter_check_threshold_max,
            );
            debug!(check_threshold, "drew new scatter check threshold");
        }
        if check_threshold > update_state.scatter_check_threshold_max {
            check_threshold = 0;
        }
        if check_threshold > 0 && update_state.num_checks >= check_threshold {
            check_threshold = 0;
        }

        result.is_scattering = !wait_period.is_zero() || check_threshold != 0;
        result.wait_period = wait_period;
        result.check_threshold = check_threshold;

        if result.is_scattering
            && wait_period == update_state.scatter_wait_period
            && check_threshold == update_state.scatter_check_threshold
        {
            // Nothing new to persist; wake at the wait deadline or once a
            // further check lands.
            let deadline = (!wait_period.is_zero()).then_some(wait_deadline);
            let watch = if check_threshold == 0 {
                None
            } else {
                ec.subscribe(state.updater().last_checked_time())
            };
            return match ReevalTrigger::from_parts(deadline, watch) {
                Some(trigger) => Decision::AskAgain(trigger),
                None => Decision::AskAgain(ec.poll_trigger(state.updater().last_checked_time())),
            };
        }
        Decision::Succeeded(result)
    }
}

impl Default for RolloutPolicy {
    fn default() -> Self {
        Self::new(PacingConfig::default())
    }
}

impl Policy for RolloutPolicy {
    fn name(&self) -> &'static str {
        "rollout_policy"
    }

    fn update_check_allowed(
        &self,
        ec: &mut EvaluationContext<'_>,
        state: &State,
    ) -> Decision<UpdateCheckParams> {
        let mut result = UpdateCheckParams::default();

        // Removable boot media never runs periodic update activity.
        if ec.value(state.system().is_boot_device_removable()) == Some(true) {
            result.updates_enabled = false;
            return Decision::Succeeded(result);
        }

        if ec.value(state.device_policy().is_policy_loaded()) == Some(true) {
            let device_policy = state.device_policy();
            if ec.value(device_policy.is_update_disabled()) == Some(true) {
                debug!("updates disabled by device policy; waiting for a policy change");
                return match ec.subscribe(device_policy.is_update_disabled()) {
                    Some(watch) => Decision::AskAgain(ReevalTrigger::OnChange(watch)),
                    None => Decision::AskAgain(ec.poll_trigger(device_policy.is_update_disabled())),
                };
            }
            if let Some(prefix) = ec.value(device_policy.target_version_prefix()) {
                if !prefix.is_empty() {
                    result.target_version_prefix = Some(prefix);
                }
            }
            if ec.value(device_policy.is_release_channel_delegated()) == Some(false) {
                if let Some(channel) = ec.value(device_policy.release_channel()) {
                    if !channel.is_empty() {
                        result.target_channel = Some(channel);
                    }
                }
            }
        }

        let check_request =
            ec.value(state.updater().check_request()).unwrap_or(CheckRequest::None);
        if check_request == CheckRequest::Interactive {
            result.is_interactive = true;
            return Decision::Succeeded(result);
        }

        if ec.value(state.system().is_official_build()) == Some(false) {
            result.updates_enabled = false;
            return Decision::Succeeded(result);
        }

        // Hold periodic checks until first-time provisioning completes.
        if ec.value(state.config().is_provisioning_gate_enabled()) == Some(true)
            && ec.value(state.system().is_provisioning_complete()) == Some(false)
        {
            return Decision::AskAgain(ec.poll_trigger(state.system().is_provisioning_complete()));
        }

        let next_check = match self.next_update_check_time(ec, state, check_request) {
            Ok(next_check) => next_check,
            Err(error) => return Decision::Failed(error),
        };
        // A check lands exactly at its scheduled time; only earlier defers.
        if ec.start_wallclock() < next_check {
            debug!("periodic check interval has not elapsed");
            return Decision::AskAgain(ReevalTrigger::At(next_check));
        }
        Decision::Succeeded(result)
    }

    fn update_can_start(
        &self,
        ec: &mut EvaluationContext<'_>,
        state: &State,
        interactive: bool,
        update_state: &UpdateState,
    ) -> Decision<UpdateDownloadParams> {
        let mut result = UpdateDownloadParams::default();

        // A check currently due takes precedence over starting this offer.
        match self.update_check_allowed(ec, state) {
            Decision::Succeeded(check) => {
                if check.updates_enabled {
                    result.update_can_start = false;
                    result.cannot_start_reason = Some(UpdateCannotStartReason::CheckDue);
                    return Decision::Succeeded(result);
                }
            }
            Decision::Failed(error) => return Decision::Failed(error),
            Decision::AskAgain(_) => {}
        }

        if ec.value(state.device_policy().is_policy_loaded()) == Some(true) {
            let device_policy = state.device_policy();

            if ec.value(device_policy.is_release_channel_delegated()) == Some(false) {
                if let Some(channel) = ec.value(device_policy.release_channel()) {
                    if !channel.is_empty() {
                        result.target_channel = Some(channel);
                    }
                }
            }

            // User-initiated requests and unprovisioned devices skip
            // scattering.
            let scattering_applies = !interactive
                && (ec.value(state.config().is_provisioning_gate_enabled()) == Some(false)
                    || ec.value(state.system().is_provisioning_complete()) == Some(true));
            if scattering_applies {
                match self.update_scattering(ec, state, update_state) {
                    Decision::Succeeded(scatter) if scatter.is_scattering => {
                        result.update_can_start = false;
                        result.cannot_start_reason = Some(UpdateCannotStartReason::Scattering);
                        result.scatter_wait_period = scatter.wait_period;
                        result.scatter_check_threshold = scatter.check_threshold;
                        return Decision::Succeeded(result);
                    }
                    Decision::Succeeded(_) => {}
                    Decision::Failed(error) => return Decision::Failed(error),
                    Decision::AskAgain(trigger) => return Decision::AskAgain(trigger),
                }
            }

            if ec.value(device_policy.is_p2p_enabled()) == Some(true) {
                result.p2p_allowed = true;
            }
        }

        if !result.p2p_allowed && ec.value(state.updater().is_p2p_enabled()) == Some(true) {
            result.p2p_allowed = true;
        }

        match select_download_url(update_state) {
            Ok((url_idx, num_failures)) => {
                result.download_url_idx = Some(url_idx);
                result.download_url_num_failures = num_failures;
            }
            Err(error) => {
                if result.p2p_allowed {
                    // No usable URL, but the payload can still arrive via
                    // p2p.
                    result.download_url_idx = None;
                    result.download_url_num_failures = 0;
                } else {
                    debug!(%error, "no usable download source for this offer");
                    result.update_can_start = false;
                    result.cannot_start_reason = Some(UpdateCannotStartReason::CannotDownload);
                }
            }
        }
        Decision::Succeeded(result)
    }

    fn update_download_allowed(
        &self,
        ec: &mut EvaluationContext<'_>,
        state: &State,
    ) -> Decision<bool> {
        let network = state.network();
        let conn_type = match ec.require(network.connection_type()) {
            Ok(conn_type) => conn_type,
            Err(missing) => return Decision::Failed(missing.into()),
        };

        let mut effective_type = conn_type;
        if conn_type != ConnectionType::Cellular {
            let tethering = match ec.require(network.tethering()) {
                Ok(tethering) => tethering,
                Err(missing) => return Decision::Failed(missing.into()),
            };
            if tethering == TetheringState::Confirmed {
                // A confirmed hotspot is billed like cellular.
                effective_type = ConnectionType::Cellular;
            }
        }

        let mut allowed = true;
        let mut may_override = false;
        match effective_type {
            ConnectionType::Ethernet | ConnectionType::Wifi => {}
            ConnectionType::Bluetooth => allowed = false,
            ConnectionType::Cellular => {
                allowed = false;
                may_override = true;
            }
            ConnectionType::Unknown => {
                return Decision::Failed(PolicyError::UnknownConnectionType);
            }
        }

        if !allowed && may_override {
            if let Some(allowed_types) =
                ec.value(state.device_policy().allowed_connection_types())
            {
                allowed = allowed_types.contains(&effective_type);
            } else if effective_type == ConnectionType::Cellular
                && ec.value(state.updater().is_cellular_enabled()) == Some(true)
            {
                allowed = true;
            }
        }

        if allowed {
            return Decision::Succeeded(true);
        }
        debug!("connection currently ineligible for downloads; waiting for a change");
        match ec.subscribe(network.connection_type()) {
            Some(watch) => Decision::AskAgain(ReevalTrigger::OnChange(watch)),
            None => Decision::AskAgain(ec.poll_trigger(network.connection_type())),
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Draws a check threshold uniformly over `[min, max]`.
fn draw_check_threshold(prng: &mut Prng, min: u32, max: u32) -> u32 {
    u32::try_from(prng.range_inclusive(i64::from(min), i64::from(max))).unwrap_or(max)
}
