// crates/rollout-gate-core/tests/context.rs
// ============================================================================
// Module: Evaluation Context Tests
// Description: Scenario tests for snapshot caching and the time budget.
// Purpose: Ensure one evaluation sees one consistent, bounded view of state.
// Dependencies: rollout-gate-core, time
// ============================================================================

//! Scenario tests for [`EvaluationContext`] snapshots and budgets.

use rollout_gate_core::EvaluationContext;
use rollout_gate_core::FakeClock;
use rollout_gate_core::FakeVariable;
use rollout_gate_core::VariableMode;
use time::Duration;
use time::macros::datetime;

#[test]
fn snapshot_survives_concurrent_mutation() -> Result<(), Box<dyn std::error::Error>> {
    let clock = test_clock();
    let variable = FakeVariable::with_value("counter", 1_u64);

    let mut ec = EvaluationContext::new(&clock, Duration::seconds(5));
    if ec.value(&variable) != Some(1) {
        return Err("first read should see the initial value".into());
    }
    variable.set(2);
    if ec.value(&variable) != Some(1) {
        return Err("later reads must return the snapshot, not the new value".into());
    }
    if variable.read_count() != 1 {
        return Err(format!("expected 1 source read, got {}", variable.read_count()).into());
    }

    let mut fresh = EvaluationContext::new(&clock, Duration::seconds(5));
    if fresh.value(&variable) != Some(2) {
        return Err("a fresh context should see the new value".into());
    }
    Ok(())
}

#[test]
fn absence_is_snapshotted_too() -> Result<(), Box<dyn std::error::Error>> {
    let clock = test_clock();
    let variable: FakeVariable<u64> = FakeVariable::new("empty");

    let mut ec = EvaluationContext::new(&clock, Duration::seconds(5));
    if ec.value(&variable).is_some() {
        return Err("an unset variable should read as absent".into());
    }
    variable.set(7);
    if ec.value(&variable).is_some() {
        return Err("absence must stay snapshotted within the evaluation".into());
    }
    if variable.read_count() != 1 {
        return Err(format!("expected 1 source read, got {}", variable.read_count()).into());
    }
    Ok(())
}

#[test]
fn failed_reads_snapshot_as_absent() -> Result<(), Box<dyn std::error::Error>> {
    let clock = test_clock();
    let variable: FakeVariable<u64> = FakeVariable::new("flaky");
    variable.fail("backend down");

    let mut ec = EvaluationContext::new(&clock, Duration::seconds(5));
    if ec.value(&variable).is_some() {
        return Err("a failing read should surface as absent".into());
    }
    if ec.value(&variable).is_some() {
        return Err("the failure must stay snapshotted".into());
    }
    if variable.read_count() != 1 {
        return Err(format!("expected 1 source read, got {}", variable.read_count()).into());
    }
    Ok(())
}

#[test]
fn require_reports_the_variable_name() -> Result<(), Box<dyn std::error::Error>> {
    let clock = test_clock();
    let variable: FakeVariable<u64> = FakeVariable::new("updater.seed_material");

    let mut ec = EvaluationContext::new(&clock, Duration::seconds(5));
    match ec.require(&variable) {
        Err(missing) => {
            if missing.variable != "updater.seed_material" {
                return Err(format!("wrong variable in error: {}", missing.variable).into());
            }
            Ok(())
        }
        Ok(_) => Err("require on an unset variable should fail".into()),
    }
}

#[test]
fn exhausted_budget_fails_fresh_reads() -> Result<(), Box<dyn std::error::Error>> {
    let clock = test_clock();
    let polled = FakeVariable::with_value("polled", 3_u64).with_mode(VariableMode::Poll);
    let constant = FakeVariable::with_value("constant", 9_u64).with_mode(VariableMode::Const);

    let mut ec = EvaluationContext::new(&clock, Duration::seconds(5));
    clock.advance(Duration::seconds(6));
    if ec.value(&polled).is_some() {
        return Err("a fresh poll read past the budget must fail".into());
    }
    if polled.read_count() != 0 {
        return Err("the exhausted budget must not consult the source".into());
    }
    if ec.value(&constant) != Some(9) {
        return Err("const reads are exempt from the budget".into());
    }
    Ok(())
}

#[test]
fn remaining_time_counts_down_and_floors_at_zero() -> Result<(), Box<dyn std::error::Error>> {
    let clock = test_clock();
    let ec = EvaluationContext::new(&clock, Duration::seconds(5));

    if ec.remaining_time() != Duration::seconds(5) {
        return Err(format!("expected a full budget, got {}", ec.remaining_time()).into());
    }
    clock.advance(Duration::seconds(2));
    if ec.remaining_time() != Duration::seconds(3) {
        return Err(format!("expected 3s left, got {}", ec.remaining_time()).into());
    }
    clock.advance(Duration::seconds(10));
    if ec.remaining_time() != Duration::ZERO {
        return Err(format!("expected an empty budget, got {}", ec.remaining_time()).into());
    }
    Ok(())
}

#[test]
fn wallclock_comparisons_use_the_captured_now() -> Result<(), Box<dyn std::error::Error>> {
    let now = datetime!(2026-03-02 10:00 UTC);
    let clock = FakeClock::new(now, Duration::seconds(12_345_678));
    let ec = EvaluationContext::new(&clock, Duration::seconds(5));

    if ec.start_wallclock() != now {
        return Err("the context should capture the construction-time now".into());
    }
    if ec.is_wallclock_time_greater_than(now) {
        return Err("the comparison is strict; now is not greater than itself".into());
    }
    if !ec.is_wallclock_time_greater_than(now - Duration::seconds(1)) {
        return Err("a past instant should compare as passed".into());
    }

    // Later clock movement must not shift the captured now.
    clock.set_wallclock(now + Duration::hours(1));
    if ec.is_wallclock_time_greater_than(now + Duration::minutes(30)) {
        return Err("comparisons must anchor to the captured now".into());
    }
    Ok(())
}

#[test]
fn poll_trigger_is_anchored_at_the_start() -> Result<(), Box<dyn std::error::Error>> {
    let now = datetime!(2026-03-02 10:00 UTC);
    let clock = FakeClock::new(now, Duration::seconds(12_345_678));
    let variable =
        FakeVariable::with_value("slow", 1_u64).with_poll_interval(Duration::minutes(1));

    let ec = EvaluationContext::new(&clock, Duration::seconds(5));
    clock.advance(Duration::seconds(30));
    let trigger = ec.poll_trigger(&variable);
    if trigger.deadline() != Some(now + Duration::minutes(1)) {
        return Err("the poll trigger must anchor to the evaluation start".into());
    }
    Ok(())
}

#[test]
fn subscriptions_exist_only_for_async_variables() -> Result<(), Box<dyn std::error::Error>> {
    let clock = test_clock();
    let asynchronous = FakeVariable::with_value("pushed", 1_u64);
    let polled = FakeVariable::with_value("pulled", 1_u64).with_mode(VariableMode::Poll);

    let ec = EvaluationContext::new(&clock, Duration::seconds(5));
    if ec.subscribe(&asynchronous).is_none() {
        return Err("async variables should hand out watches".into());
    }
    if ec.subscribe(&polled).is_some() {
        return Err("poll variables have no change signal to watch".into());
    }
    Ok(())
}

#[test]
fn dump_renders_values_and_errors() -> Result<(), Box<dyn std::error::Error>> {
    let clock = test_clock();
    let good = FakeVariable::with_value("good", 42_u64);
    let bad: FakeVariable<u64> = FakeVariable::new("bad");
    bad.fail("backend down");

    let mut ec = EvaluationContext::new(&clock, Duration::seconds(5));
    let _ = ec.value(&good);
    let _ = ec.value(&bad);

    let dump = ec.dump();
    if dump["variables"]["good"]["value"] != 42 {
        return Err(format!("bad rendering of a value: {dump}").into());
    }
    let error = dump["variables"]["bad"]["value"]["error"]
        .as_str()
        .ok_or("missing error rendering")?;
    if !error.contains("backend down") {
        return Err(format!("error rendering lost the reason: {error}").into());
    }
    Ok(())
}

fn test_clock() -> FakeClock {
    FakeClock::new(datetime!(2026-03-02 10:00 UTC), Duration::seconds(12_345_678))
}
