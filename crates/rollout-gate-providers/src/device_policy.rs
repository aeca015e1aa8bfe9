// crates/rollout-gate-providers/src/device_policy.rs
// ============================================================================
// Module: Device Policy Provider
// Description: Administrator policy file served as change-notifying variables.
// Purpose: Let policy edits steer the engine without a process restart.
// Dependencies: rollout-gate-config, rollout-gate-core, time, tracing
// ============================================================================

//! ## Overview
//! The provider keeps a validated snapshot of the administrator's policy file
//! and serves each policy value as an async variable. The host calls
//! [`RealDevicePolicyProvider::reload`] when it learns the file may have
//! changed (inotify, a management agent, a timer); only variables whose
//! values actually changed signal their watchers, so a rewrite with identical
//! content wakes nobody. An absent file means "no policy": the loaded flag
//! reads false and every other variable reads as absent.
//! Invariants:
//! - A malformed file never replaces a good snapshot; `reload` fails and the
//!   previous values stay served.
//! - `is_policy_loaded` is always readable, even before the first load.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::path::PathBuf;

use rollout_gate_config::ConfigError;
use rollout_gate_config::DevicePolicyFile;
use rollout_gate_core::ConnectionType;
use rollout_gate_core::DevicePolicyProvider;
use rollout_gate_core::Variable;
use rollout_gate_core::WatchedVariable;
use time::Duration;
use tracing::debug;
use tracing::warn;

// ============================================================================
// SECTION: Provider Implementation
// ============================================================================

/// Production [`DevicePolicyProvider`] over the policy file.
pub struct RealDevicePolicyProvider {
    /// Path of the administrator policy file.
    path: PathBuf,
    /// True once a policy document is loaded.
    is_policy_loaded: WatchedVariable<bool>,
    /// Administrator kill switch for automatic updates.
    is_update_disabled: WatchedVariable<bool>,
    /// Highest version prefix the device may update to.
    target_version_prefix: WatchedVariable<String>,
    /// Release channel mandated by the administrator.
    release_channel: WatchedVariable<String>,
    /// True when channel selection is delegated to the device user.
    is_release_channel_delegated: WatchedVariable<bool>,
    /// Upper bound for the randomized download wait period.
    scatter_factor: WatchedVariable<Duration>,
    /// Connection types on which downloads are explicitly permitted.
    allowed_connection_types: WatchedVariable<BTreeSet<ConnectionType>>,
    /// True when peer-to-peer payload sharing is permitted by policy.
    is_p2p_enabled: WatchedVariable<bool>,
}

impl RealDevicePolicyProvider {
    /// Creates the provider and performs the initial load.
    ///
    /// # Errors
    /// A present but malformed policy file fails construction; an absent
    /// file constructs the provider in the unloaded state.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let provider = Self {
            path: path.into(),
            is_policy_loaded: WatchedVariable::with_value(
                "device_policy.is_policy_loaded",
                false,
            ),
            is_update_disabled: WatchedVariable::new("device_policy.is_update_disabled"),
            target_version_prefix: WatchedVariable::new("device_policy.target_version_prefix"),
            release_channel: WatchedVariable::new("device_policy.release_channel"),
            is_release_channel_delegated: WatchedVariable::new(
                "device_policy.is_release_channel_delegated",
            ),
            scatter_factor: WatchedVariable::new("device_policy.scatter_factor"),
            allowed_connection_types: WatchedVariable::new(
                "device_policy.allowed_connection_types",
            ),
            is_p2p_enabled: WatchedVariable::new("device_policy.is_p2p_enabled"),
        };
        provider.reload()?;
        Ok(provider)
    }

    /// Re-reads the policy file and pushes changed values to watchers.
    ///
    /// # Errors
    /// A present but malformed file is an error; the previously served
    /// snapshot stays in place.
    pub fn reload(&self) -> Result<(), ConfigError> {
        match DevicePolicyFile::load(&self.path) {
            Ok(file) => {
                debug!(path = %self.path.display(), "device policy loaded");
                self.apply(&file)
            }
            Err(ConfigError::Io {
                source, ..
            }) if source.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "device policy file absent; unloading");
                self.unload();
                Ok(())
            }
            Err(error) => {
                warn!(path = %self.path.display(), %error, "device policy reload failed");
                Err(error)
            }
        }
    }

    /// Pushes a validated document into the served variables.
    fn apply(&self, file: &DevicePolicyFile) -> Result<(), ConfigError> {
        self.is_update_disabled.set(file.update_disabled);
        match &file.target_version_prefix {
            Some(prefix) => self.target_version_prefix.set(prefix.clone()),
            None => self.target_version_prefix.clear(),
        }
        match &file.release_channel {
            Some(channel) => self.release_channel.set(channel.clone()),
            None => self.release_channel.clear(),
        }
        self.is_release_channel_delegated.set(file.release_channel_delegated);
        self.scatter_factor.set(file.scatter_factor());
        match file.connection_types()? {
            Some(types) => self.allowed_connection_types.set(types),
            None => self.allowed_connection_types.clear(),
        }
        self.is_p2p_enabled.set(file.p2p_enabled);
        self.is_policy_loaded.set(true);
        Ok(())
    }

    /// Drops the served snapshot; the policy is no longer in force.
    fn unload(&self) {
        self.is_policy_loaded.set(false);
        self.is_update_disabled.clear();
        self.target_version_prefix.clear();
        self.release_channel.clear();
        self.is_release_channel_delegated.clear();
        self.scatter_factor.clear();
        self.allowed_connection_types.clear();
        self.is_p2p_enabled.clear();
    }
}

impl DevicePolicyProvider for RealDevicePolicyProvider {
    fn is_policy_loaded(&self) -> &dyn Variable<bool> {
        &self.is_policy_loaded
    }

    fn is_update_disabled(&self) -> &dyn Variable<bool> {
        &self.is_update_disabled
    }

    fn target_version_prefix(&self) -> &dyn Variable<String> {
        &self.target_version_prefix
    }

    fn release_channel(&self) -> &dyn Variable<String> {
        &self.release_channel
    }

    fn is_release_channel_delegated(&self) -> &dyn Variable<bool> {
        &self.is_release_channel_delegated
    }

    fn scatter_factor(&self) -> &dyn Variable<Duration> {
        &self.scatter_factor
    }

    fn allowed_connection_types(&self) -> &dyn Variable<BTreeSet<ConnectionType>> {
        &self.allowed_connection_types
    }

    fn is_p2p_enabled(&self) -> &dyn Variable<bool> {
        &self.is_p2p_enabled
    }
}
