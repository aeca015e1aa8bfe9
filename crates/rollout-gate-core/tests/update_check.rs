// crates/rollout-gate-core/tests/update_check.rs
// ============================================================================
// Module: Update Check Tests
// Description: Scenario tests for the update-check gate of the rollout policy.
// Purpose: Ensure pacing, policy, and provisioning rules order correctly.
// Dependencies: rollout-gate-core, time
// ============================================================================

//! Scenario tests for [`RolloutPolicy::update_check_allowed`].

use rollout_gate_core::CheckRequest;
use rollout_gate_core::Decision;
use rollout_gate_core::EvaluationContext;
use rollout_gate_core::FakeClock;
use rollout_gate_core::FakeState;
use rollout_gate_core::Policy;
use rollout_gate_core::PolicyError;
use rollout_gate_core::ReevalTrigger;
use rollout_gate_core::RolloutPolicy;
use rollout_gate_core::UpdateCheckParams;
use time::Duration;
use time::OffsetDateTime;
use time::macros::datetime;

#[test]
fn periodic_check_allowed_once_interval_elapsed() -> Result<(), Box<dyn std::error::Error>> {
    let now = datetime!(2026-03-02 10:00 UTC);
    let clock = test_clock(now);
    let fakes = provisioned_fakes(now);

    let result = expect_succeeded(check_allowed(&clock, &fakes))?;
    if !result.updates_enabled {
        return Err("updates should be enabled for a provisioned official device".into());
    }
    if result.is_interactive {
        return Err("a periodic check must not be flagged interactive".into());
    }
    if result.target_channel.is_some() || result.target_version_prefix.is_some() {
        return Err("no channel or prefix should apply without device policy".into());
    }
    Ok(())
}

#[test]
fn periodic_check_defers_inside_the_interval() -> Result<(), Box<dyn std::error::Error>> {
    let now = datetime!(2026-03-02 10:00 UTC);
    let clock = test_clock(now);
    let fakes = provisioned_fakes(now);
    fakes.updater.last_checked_time.set(now - Duration::minutes(10));

    let trigger = expect_ask_again(check_allowed(&clock, &fakes))?;
    let deadline = trigger.deadline().ok_or("pacing deferral should carry a deadline")?;
    if deadline <= now || deadline > now + Duration::minutes(40) {
        return Err(format!("deadline {deadline} outside the pacing window").into());
    }
    if trigger.watch().is_some() {
        return Err("pacing deferral should not carry a change watch".into());
    }
    Ok(())
}

#[test]
fn first_check_waits_out_the_initial_interval() -> Result<(), Box<dyn std::error::Error>> {
    let now = datetime!(2026-03-02 10:00 UTC);
    let clock = test_clock(now);
    let fakes = provisioned_fakes(now);
    fakes.updater.last_checked_time.clear();
    fakes.updater.updater_started_time.set(now - Duration::minutes(1));

    let trigger = expect_ask_again(check_allowed(&clock, &fakes))?;
    let deadline = trigger.deadline().ok_or("first-check deferral should carry a deadline")?;
    if deadline <= now || deadline > now + Duration::minutes(11) {
        return Err(format!("deadline {deadline} outside the initial window").into());
    }

    // Well past the widest possible first-check draw.
    fakes.updater.updater_started_time.set(now - Duration::minutes(13));
    expect_succeeded(check_allowed(&clock, &fakes))?;
    Ok(())
}

#[test]
fn backoff_extends_the_wait_after_consecutive_failures() -> Result<(), Box<dyn std::error::Error>>
{
    let now = datetime!(2026-03-02 10:00 UTC);
    let clock = test_clock(now);
    let fakes = provisioned_fakes(now);
    let last_checked = now - Duration::minutes(89);
    fakes.updater.last_checked_time.set(last_checked);

    // Without failures the periodic window tops out at 50 minutes.
    expect_succeeded(check_allowed(&clock, &fakes))?;

    // Two failures double the interval twice: 180 minutes, fuzzed by itself.
    fakes.updater.consecutive_failed_checks.set(2);
    let trigger = expect_ask_again(check_allowed(&clock, &fakes))?;
    let deadline = trigger.deadline().ok_or("backoff deferral should carry a deadline")?;
    let earliest = last_checked + Duration::minutes(90);
    let latest = last_checked + Duration::minutes(270);
    if deadline < earliest || deadline > latest {
        return Err(format!("deadline {deadline} outside the backoff window").into());
    }
    Ok(())
}

#[test]
fn server_requested_recheck_uses_the_quick_interval() -> Result<(), Box<dyn std::error::Error>> {
    let now = datetime!(2026-03-02 10:00 UTC);
    let clock = test_clock(now);
    let fakes = provisioned_fakes(now);
    fakes.updater.check_request.set(CheckRequest::Scheduled);
    fakes.updater.last_checked_time.set(now - Duration::minutes(2));

    let result = expect_succeeded(check_allowed(&clock, &fakes))?;
    if result.is_interactive {
        return Err("a server-requested recheck is not interactive".into());
    }

    // Inside the quick window the check still defers.
    fakes.updater.last_checked_time.set(now - Duration::seconds(10));
    let trigger = expect_ask_again(check_allowed(&clock, &fakes))?;
    let deadline = trigger.deadline().ok_or("quick deferral should carry a deadline")?;
    if deadline <= now || deadline > now + Duration::seconds(80) {
        return Err(format!("deadline {deadline} outside the quick window").into());
    }
    Ok(())
}

#[test]
fn interactive_request_bypasses_pacing() -> Result<(), Box<dyn std::error::Error>> {
    let now = datetime!(2026-03-02 10:00 UTC);
    let clock = test_clock(now);
    let fakes = provisioned_fakes(now);
    fakes.updater.check_request.set(CheckRequest::Interactive);
    fakes.updater.last_checked_time.set(now);

    let result = expect_succeeded(check_allowed(&clock, &fakes))?;
    if !result.is_interactive {
        return Err("an interactive request must be flagged in the result".into());
    }
    if !result.updates_enabled {
        return Err("an interactive request must leave updates enabled".into());
    }
    Ok(())
}

#[test]
fn update_disabled_by_policy_waits_for_a_policy_change() -> Result<(), Box<dyn std::error::Error>>
{
    let now = datetime!(2026-03-02 10:00 UTC);
    let clock = test_clock(now);
    let fakes = provisioned_fakes(now);
    fakes.device_policy.is_policy_loaded.set(true);
    fakes.device_policy.is_update_disabled.set(true);

    let trigger = expect_ask_again(check_allowed(&clock, &fakes))?;
    if trigger.deadline().is_some() {
        return Err("a policy-disable deferral is change-driven, not timed".into());
    }
    let watch = trigger.watch().ok_or("policy-disable deferral should carry a watch")?;
    if watch.has_fired() {
        return Err("watch must not fire before the policy changes".into());
    }

    fakes.device_policy.is_update_disabled.set(false);
    if !watch.has_fired() {
        return Err("watch should fire once the policy changes".into());
    }
    expect_succeeded(check_allowed(&clock, &fakes))?;
    Ok(())
}

#[test]
fn policy_channel_and_prefix_flow_into_the_result() -> Result<(), Box<dyn std::error::Error>> {
    let now = datetime!(2026-03-02 10:00 UTC);
    let clock = test_clock(now);
    let fakes = provisioned_fakes(now);
    fakes.device_policy.is_policy_loaded.set(true);
    fakes.device_policy.is_update_disabled.set(false);
    fakes.device_policy.target_version_prefix.set("1.2.".to_owned());
    fakes.device_policy.is_release_channel_delegated.set(false);
    fakes.device_policy.release_channel.set("beta".to_owned());

    let result = expect_succeeded(check_allowed(&clock, &fakes))?;
    if result.target_version_prefix.as_deref() != Some("1.2.") {
        return Err(format!("wrong prefix: {:?}", result.target_version_prefix).into());
    }
    if result.target_channel.as_deref() != Some("beta") {
        return Err(format!("wrong channel: {:?}", result.target_channel).into());
    }

    // A delegated channel stays with the device user.
    fakes.device_policy.is_release_channel_delegated.set(true);
    let result = expect_succeeded(check_allowed(&clock, &fakes))?;
    if result.target_channel.is_some() {
        return Err("delegated channel must not be overridden".into());
    }
    Ok(())
}

#[test]
fn removable_boot_media_disables_updates() -> Result<(), Box<dyn std::error::Error>> {
    let now = datetime!(2026-03-02 10:00 UTC);
    let clock = test_clock(now);
    let fakes = provisioned_fakes(now);
    fakes.system.is_boot_device_removable.set(true);

    let result = expect_succeeded(check_allowed(&clock, &fakes))?;
    if result.updates_enabled {
        return Err("updates must be disabled on removable boot media".into());
    }
    Ok(())
}

#[test]
fn unofficial_build_disables_periodic_checks() -> Result<(), Box<dyn std::error::Error>> {
    let now = datetime!(2026-03-02 10:00 UTC);
    let clock = test_clock(now);
    let fakes = provisioned_fakes(now);
    fakes.system.is_official_build.set(false);

    let result = expect_succeeded(check_allowed(&clock, &fakes))?;
    if result.updates_enabled {
        return Err("periodic updates must be disabled on unofficial builds".into());
    }

    // A user request still goes through on an unofficial build.
    fakes.updater.check_request.set(CheckRequest::Interactive);
    let result = expect_succeeded(check_allowed(&clock, &fakes))?;
    if !result.updates_enabled || !result.is_interactive {
        return Err("interactive checks must bypass the official-build rule".into());
    }
    Ok(())
}

#[test]
fn provisioning_gate_holds_checks_until_complete() -> Result<(), Box<dyn std::error::Error>> {
    let now = datetime!(2026-03-02 10:00 UTC);
    let clock = test_clock(now);
    let fakes = provisioned_fakes(now);
    fakes.system.is_provisioning_complete.set(false);

    let trigger = expect_ask_again(check_allowed(&clock, &fakes))?;
    let deadline = trigger.deadline().ok_or("provisioning deferral should carry a deadline")?;
    if deadline != now + Duration::minutes(5) {
        return Err(format!("expected one poll interval, got deadline {deadline}").into());
    }

    fakes.system.is_provisioning_complete.set(true);
    expect_succeeded(check_allowed(&clock, &fakes))?;
    Ok(())
}

#[test]
fn missing_seed_fails_the_evaluation() -> Result<(), Box<dyn std::error::Error>> {
    let now = datetime!(2026-03-02 10:00 UTC);
    let clock = test_clock(now);
    let fakes = provisioned_fakes(now);
    fakes.random.seed.clear();

    match check_allowed(&clock, &fakes) {
        Decision::Failed(PolicyError::MissingValue(missing)) => {
            if missing.variable != "random.seed" {
                return Err(format!("wrong missing variable: {}", missing.variable).into());
            }
            Ok(())
        }
        Decision::Failed(error) => Err(format!("wrong failure: {error}").into()),
        Decision::Succeeded(_) => Err("expected a failure, got a verdict".into()),
        Decision::AskAgain(_) => Err("expected a failure, got a deferral".into()),
    }
}

fn test_clock(now: OffsetDateTime) -> FakeClock {
    FakeClock::new(now, Duration::seconds(12_345_678))
}

fn provisioned_fakes(now: OffsetDateTime) -> FakeState {
    let fakes = FakeState::new();
    fakes.system.is_official_build.set(true);
    fakes.system.is_boot_device_removable.set(false);
    fakes.system.is_provisioning_complete.set(true);
    fakes.config.is_provisioning_gate_enabled.set(true);
    fakes.device_policy.is_policy_loaded.set(false);
    fakes.random.seed.set(4);
    fakes.updater.check_request.set(CheckRequest::None);
    fakes.updater.consecutive_failed_checks.set(0);
    fakes.updater.updater_started_time.set(now - Duration::hours(2));
    fakes.updater.last_checked_time.set(now - Duration::hours(1));
    fakes
}

fn check_allowed(clock: &FakeClock, fakes: &FakeState) -> Decision<UpdateCheckParams> {
    let policy = RolloutPolicy::default();
    let state = fakes.state();
    let mut ec = EvaluationContext::new(clock, Duration::seconds(5));
    policy.update_check_allowed(&mut ec, &state)
}

fn expect_succeeded<R>(decision: Decision<R>) -> Result<R, Box<dyn std::error::Error>> {
    match decision {
        Decision::Succeeded(result) => Ok(result),
        Decision::Failed(error) => Err(format!("expected a verdict, got failure: {error}").into()),
        Decision::AskAgain(_) => Err("expected a verdict, got a deferral".into()),
    }
}

fn expect_ask_again<R>(decision: Decision<R>) -> Result<ReevalTrigger, Box<dyn std::error::Error>> {
    match decision {
        Decision::AskAgain(trigger) => Ok(trigger),
        Decision::Failed(error) => Err(format!("expected a deferral, got failure: {error}").into()),
        Decision::Succeeded(_) => Err("expected a deferral, got a verdict".into()),
    }
}
