// crates/rollout-gate-providers/tests/device_policy_provider.rs
// ============================================================================
// Module: Device Policy Provider Tests
// Description: Reload, unload, and change-notification behavior.
// Purpose: Ensure policy edits reach watchers and bad edits are rejected.
// ============================================================================

//! Tests for the file-backed device policy provider.

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

use rollout_gate_core::ConnectionType;
use rollout_gate_core::DevicePolicyProvider;
use rollout_gate_providers::RealDevicePolicyProvider;
use tempfile::TempDir;
use time::Duration;

const READ_TIMEOUT: Duration = Duration::seconds(5);

fn write_policy(dir: &TempDir, contents: &str) -> PathBuf {
    let path = dir.path().join("device_policy.toml");
    fs::write(&path, contents).unwrap();
    path
}

#[test]
fn initial_load_serves_the_document() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_policy(&dir, "update_disabled = true\nscatter_factor_secs = 600\n");
    let provider = RealDevicePolicyProvider::new(path).unwrap();

    assert_eq!(provider.is_policy_loaded().get(READ_TIMEOUT), Ok(true));
    assert_eq!(provider.is_update_disabled().get(READ_TIMEOUT), Ok(true));
    assert_eq!(provider.scatter_factor().get(READ_TIMEOUT), Ok(Duration::minutes(10)));
    assert!(provider.target_version_prefix().get(READ_TIMEOUT).is_err());
    assert!(provider.allowed_connection_types().get(READ_TIMEOUT).is_err());
}

#[test]
fn an_absent_file_reads_as_unloaded() {
    let dir = tempfile::tempdir().unwrap();
    let provider = RealDevicePolicyProvider::new(dir.path().join("missing.toml")).unwrap();

    assert_eq!(provider.is_policy_loaded().get(READ_TIMEOUT), Ok(false));
    assert!(provider.is_update_disabled().get(READ_TIMEOUT).is_err());
}

#[test]
fn a_malformed_file_fails_construction() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_policy(&dir, "update_disabled = \"definitely\"\n");
    assert!(RealDevicePolicyProvider::new(path).is_err());
}

#[test]
fn reload_applies_changes_and_fires_watches() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_policy(&dir, "update_disabled = false\n");
    let provider = RealDevicePolicyProvider::new(path).unwrap();

    let watch = provider.is_update_disabled().watch().expect("async variable");
    write_policy(&dir, "update_disabled = true\n");
    provider.reload().unwrap();

    assert!(watch.has_fired());
    assert_eq!(provider.is_update_disabled().get(READ_TIMEOUT), Ok(true));
}

#[test]
fn an_identical_rewrite_wakes_nobody() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_policy(&dir, "update_disabled = true\np2p_enabled = true\n");
    let provider = RealDevicePolicyProvider::new(path).unwrap();

    let disabled_watch = provider.is_update_disabled().watch().expect("async variable");
    let p2p_watch = provider.is_p2p_enabled().watch().expect("async variable");
    write_policy(&dir, "update_disabled = true\np2p_enabled = true\n");
    provider.reload().unwrap();

    assert!(!disabled_watch.has_fired());
    assert!(!p2p_watch.has_fired());
}

#[test]
fn a_malformed_rewrite_keeps_the_previous_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_policy(&dir, "release_channel = \"stable-channel\"\n");
    let provider = RealDevicePolicyProvider::new(path).unwrap();

    write_policy(&dir, "release_channel = [not toml");
    assert!(provider.reload().is_err());

    assert_eq!(provider.is_policy_loaded().get(READ_TIMEOUT), Ok(true));
    assert_eq!(
        provider.release_channel().get(READ_TIMEOUT),
        Ok("stable-channel".to_string())
    );
}

#[test]
fn deleting_the_file_unloads_the_policy() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_policy(&dir, "update_disabled = true\n");
    let provider = RealDevicePolicyProvider::new(path.clone()).unwrap();

    let watch = provider.is_update_disabled().watch().expect("async variable");
    fs::remove_file(&path).unwrap();
    provider.reload().unwrap();

    assert_eq!(provider.is_policy_loaded().get(READ_TIMEOUT), Ok(false));
    assert!(provider.is_update_disabled().get(READ_TIMEOUT).is_err());
    assert!(watch.has_fired());
}

#[test]
fn the_allowlist_round_trips_through_the_provider() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_policy(&dir, "allowed_connection_types = [\"wifi\", \"cellular\"]\n");
    let provider = RealDevicePolicyProvider::new(path).unwrap();

    let types = provider.allowed_connection_types().get(READ_TIMEOUT).unwrap();
    assert_eq!(types.len(), 2);
    assert!(types.contains(&ConnectionType::Wifi));
    assert!(types.contains(&ConnectionType::Cellular));
}
