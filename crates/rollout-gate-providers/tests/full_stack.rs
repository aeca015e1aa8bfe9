// crates/rollout-gate-providers/tests/full_stack.rs
// ============================================================================
// Module: Full Stack Tests
// Description: Real providers wired into the decision engine end to end.
// Purpose: Ensure host-fed facts drive orchestrated verdicts.
// ============================================================================

//! ## Overview
//! These tests assemble the production providers around a fake clock, wire
//! them into [`State`], and drive [`RolloutPolicy`] through the orchestrator.
//! They cover the paths a deployment exercises on day one: the download gate
//! reacting to network and policy changes, periodic check pacing over the
//! host-reported updater status, and the provisioning marker holding checks
//! back until first-time setup completes.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use rollout_gate_config::EngineConfigFile;
use rollout_gate_core::CheckRequest;
use rollout_gate_core::Clock;
use rollout_gate_core::ConnectionType;
use rollout_gate_core::Decision;
use rollout_gate_core::DevicePolicyProvider;
use rollout_gate_core::EvaluationContext;
use rollout_gate_core::FakeClock;
use rollout_gate_core::Orchestrator;
use rollout_gate_core::OrchestratorError;
use rollout_gate_core::Policy;
use rollout_gate_core::RolloutPolicy;
use rollout_gate_core::State;
use rollout_gate_core::SystemProvider;
use rollout_gate_core::TetheringState;
use rollout_gate_core::TimeProvider;
use rollout_gate_core::UpdateCheckParams;
use rollout_gate_providers::NetworkStatusHandle;
use rollout_gate_providers::RealConfigProvider;
use rollout_gate_providers::RealDevicePolicyProvider;
use rollout_gate_providers::RealNetworkProvider;
use rollout_gate_providers::RealRandomProvider;
use rollout_gate_providers::RealSystemProvider;
use rollout_gate_providers::RealTimeProvider;
use rollout_gate_providers::RealUpdaterProvider;
use rollout_gate_providers::SystemInfo;
use rollout_gate_providers::UpdaterStatusHandle;
use tempfile::TempDir;
use time::Duration;
use time::macros::datetime;

#[test]
fn the_clock_provider_tracks_injected_time() {
    let clock = test_clock();
    let clock_dyn: Arc<dyn Clock> = clock.clone();
    let provider = RealTimeProvider::new(clock_dyn);

    assert_eq!(
        provider.now().get(READ_TIMEOUT),
        Ok(datetime!(2026-03-02 10:00 UTC))
    );
    assert_eq!(provider.hour().get(READ_TIMEOUT), Ok(10));

    clock.advance(Duration::hours(15));
    assert_eq!(
        provider.now().get(READ_TIMEOUT),
        Ok(datetime!(2026-03-03 01:00 UTC))
    );
    assert_eq!(
        provider.date().get(READ_TIMEOUT),
        Ok(datetime!(2026-03-03 01:00 UTC).date())
    );
    assert_eq!(provider.hour().get(READ_TIMEOUT), Ok(1));
}

#[test]
fn the_system_provider_polls_the_provisioning_marker() {
    let dir = tempfile::tempdir().unwrap();
    let marker = dir.path().join("provisioned");
    let provider = RealSystemProvider::new(system_info(), marker.clone());

    assert_eq!(provider.is_official_build().get(READ_TIMEOUT), Ok(true));
    assert_eq!(provider.is_boot_device_removable().get(READ_TIMEOUT), Ok(false));
    assert_eq!(
        provider.os_version().get(READ_TIMEOUT),
        Ok("16921.48.0".to_string())
    );
    assert_eq!(provider.is_provisioning_complete().get(READ_TIMEOUT), Ok(false));

    fs::write(&marker, b"").unwrap();
    assert_eq!(provider.is_provisioning_complete().get(READ_TIMEOUT), Ok(true));
}

#[test]
fn the_download_gate_runs_on_real_providers() {
    let dir = tempfile::tempdir().unwrap();
    let clock = test_clock();
    let stack = build_stack(
        &dir,
        &clock,
        "allowed_connection_types = [\"ethernet\", \"wifi\"]\n",
        true,
    );

    stack.network.set_connection_type(ConnectionType::Wifi);
    stack.network.set_tethering(TetheringState::NotDetected);
    assert!(stack.orchestrator.decide_now(download_op).unwrap());

    stack.network.set_connection_type(ConnectionType::Cellular);
    assert!(matches!(
        stack.orchestrator.decide_now(download_op),
        Err(OrchestratorError::WouldDefer)
    ));

    fs::write(
        &stack.policy_path,
        "allowed_connection_types = [\"ethernet\", \"wifi\", \"cellular\"]\n",
    )
    .unwrap();
    stack.device_policy.reload().unwrap();
    assert!(stack.orchestrator.decide_now(download_op).unwrap());
}

#[test]
fn periodic_checks_run_on_real_providers() {
    let dir = tempfile::tempdir().unwrap();
    let clock = test_clock();
    let stack = build_stack(&dir, &clock, "", true);

    stack.updater.set_last_checked_time(clock.wallclock() - Duration::hours(1));
    let params = stack.orchestrator.decide_now(check_op).unwrap();
    assert!(params.updates_enabled);
    assert!(!params.is_interactive);

    stack.updater.set_check_request(CheckRequest::Interactive);
    let params = stack.orchestrator.decide_now(check_op).unwrap();
    assert!(params.is_interactive);
}

#[test]
fn the_provisioning_marker_gates_checks() {
    let dir = tempfile::tempdir().unwrap();
    let clock = test_clock();
    let stack = build_stack(&dir, &clock, "", false);

    stack.updater.set_last_checked_time(clock.wallclock() - Duration::hours(1));
    assert!(matches!(
        stack.orchestrator.decide_now(check_op),
        Err(OrchestratorError::WouldDefer)
    ));

    fs::write(&stack.marker_path, b"").unwrap();
    let params = stack.orchestrator.decide_now(check_op).unwrap();
    assert!(params.updates_enabled);
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Read timeout for direct variable fetches.
const READ_TIMEOUT: Duration = Duration::seconds(5);

/// Production providers assembled around a fake clock.
struct Stack {
    /// Engine under test, owning the provider state.
    orchestrator: Orchestrator,
    /// Host handle feeding network status.
    network: NetworkStatusHandle,
    /// Host handle feeding updater status.
    updater: UpdaterStatusHandle,
    /// Shared device policy provider, kept for reloads.
    device_policy: Arc<RealDevicePolicyProvider>,
    /// Path of the device policy document.
    policy_path: PathBuf,
    /// Path of the provisioning marker file.
    marker_path: PathBuf,
}

fn test_clock() -> Arc<FakeClock> {
    Arc::new(FakeClock::new(
        datetime!(2026-03-02 10:00 UTC),
        Duration::seconds(12_345_678),
    ))
}

fn system_info() -> SystemInfo {
    SystemInfo {
        is_official_build: true,
        is_boot_device_removable: false,
        os_version: "16921.48.0".to_string(),
    }
}

fn build_stack(dir: &TempDir, clock: &Arc<FakeClock>, policy_toml: &str, provisioned: bool) -> Stack {
    let policy_path = dir.path().join("device_policy.toml");
    fs::write(&policy_path, policy_toml).unwrap();
    let marker_path = dir.path().join("provisioned");
    if provisioned {
        fs::write(&marker_path, b"").unwrap();
    }

    let device_policy = Arc::new(RealDevicePolicyProvider::new(policy_path.clone()).unwrap());
    let (network_provider, network) = RealNetworkProvider::new();
    let (updater_provider, updater) =
        RealUpdaterProvider::new(clock.wallclock() - Duration::hours(2));
    let state = State::new(
        Arc::new(RealConfigProvider::new(&EngineConfigFile::default())),
        Arc::clone(&device_policy) as Arc<dyn DevicePolicyProvider>,
        Arc::new(network_provider),
        Arc::new(RealRandomProvider::new()),
        Arc::new(RealSystemProvider::new(system_info(), marker_path.clone())),
        Arc::new(RealTimeProvider::new(Arc::clone(clock) as Arc<dyn Clock>)),
        Arc::new(updater_provider),
    );
    let orchestrator = Orchestrator::new(
        Arc::clone(clock) as Arc<dyn Clock>,
        state,
        Box::new(RolloutPolicy::default()),
    );
    Stack {
        orchestrator,
        network,
        updater,
        device_policy,
        policy_path,
        marker_path,
    }
}

fn download_op(
    policy: &dyn Policy,
    ec: &mut EvaluationContext<'_>,
    state: &State,
) -> Decision<bool> {
    policy.update_download_allowed(ec, state)
}

fn check_op(
    policy: &dyn Policy,
    ec: &mut EvaluationContext<'_>,
    state: &State,
) -> Decision<UpdateCheckParams> {
    policy.update_check_allowed(ec, state)
}
