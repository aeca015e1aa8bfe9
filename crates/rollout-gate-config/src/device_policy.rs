// crates/rollout-gate-config/src/device_policy.rs
// ============================================================================
// Module: Device Policy File
// Description: TOML model of the administrator-managed device policy.
// Purpose: Validate policy documents before their values steer updates.
// Dependencies: rollout-gate-core, serde, time, toml
// ============================================================================

//! ## Overview
//! The device policy file is written by an administrator and consumed by the
//! device-policy provider. Every key is optional; an absent key leaves the
//! engine's behavior unchanged. Connection-type names are validated against
//! the engine's known types so a typo in an allowlist fails the whole
//! document instead of silently blocking downloads.
//! Invariants:
//! - A loaded document has passed `validate`.
//! - `allowed_connection_types = []` is a valid, maximally restrictive
//!   allowlist; an absent key means no allowlist at all.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::path::Path;

use rollout_gate_core::ConnectionType;
use serde::Deserialize;
use serde::Serialize;
use time::Duration;

use crate::ConfigError;
use crate::parse_config;
use crate::read_config_text;

// ============================================================================
// SECTION: File Model
// ============================================================================

/// Root model of the device policy file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DevicePolicyFile {
    /// Administrator kill switch for automatic updates.
    #[serde(default)]
    pub update_disabled: bool,
    /// Highest version prefix the device may update to.
    pub target_version_prefix: Option<String>,
    /// Release channel mandated by the administrator.
    pub release_channel: Option<String>,
    /// True when channel selection is delegated to the device user.
    #[serde(default)]
    pub release_channel_delegated: bool,
    /// Upper bound for the randomized download wait period, in seconds.
    #[serde(default)]
    pub scatter_factor_secs: i64,
    /// Connection-type names on which downloads are explicitly permitted.
    pub allowed_connection_types: Option<Vec<String>>,
    /// True when peer-to-peer payload sharing is permitted by policy.
    #[serde(default)]
    pub p2p_enabled: bool,
}

// ============================================================================
// SECTION: Loading and Validation
// ============================================================================

impl DevicePolicyFile {
    /// Reads, parses, and validates the policy file at `path`.
    ///
    /// # Errors
    /// [`ConfigError::Io`] when the file cannot be read,
    /// [`ConfigError::Parse`] when it is not a valid policy document, and
    /// [`ConfigError::Validation`] when an input guard or a constraint
    /// fails.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = read_config_text(path)?;
        let file: Self = parse_config(path, &text)?;
        file.validate()?;
        Ok(file)
    }

    /// Checks the document against the engine's constraints.
    ///
    /// # Errors
    /// [`ConfigError::Validation`] naming the first violated constraint.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scatter_factor_secs < 0 {
            return Err(ConfigError::validation(
                "scatter_factor_secs must not be negative",
            ));
        }
        self.connection_types().map(drop)
    }

    /// Upper bound for the randomized download wait period.
    #[must_use]
    pub const fn scatter_factor(&self) -> Duration {
        Duration::seconds(self.scatter_factor_secs)
    }

    /// Parses the allowlist into engine connection types.
    ///
    /// Returns `None` when the document carries no allowlist.
    ///
    /// # Errors
    /// [`ConfigError::Validation`] when a name is not a known concrete
    /// connection type.
    pub fn connection_types(&self) -> Result<Option<BTreeSet<ConnectionType>>, ConfigError> {
        let Some(names) = &self.allowed_connection_types else {
            return Ok(None);
        };
        let mut types = BTreeSet::new();
        for name in names {
            types.insert(parse_connection_type(name)?);
        }
        Ok(Some(types))
    }
}

/// Maps a policy-file name onto a concrete connection type.
///
/// `unknown` is deliberately not accepted: an allowlist entry that matches
/// unclassifiable connections would defeat the gate.
fn parse_connection_type(name: &str) -> Result<ConnectionType, ConfigError> {
    match name {
        "ethernet" => Ok(ConnectionType::Ethernet),
        "wifi" => Ok(ConnectionType::Wifi),
        "cellular" => Ok(ConnectionType::Cellular),
        "bluetooth" => Ok(ConnectionType::Bluetooth),
        other => Err(ConfigError::validation(format!(
            "unknown connection type in allowed_connection_types: {other}"
        ))),
    }
}
