// crates/rollout-gate-providers/src/config.rs
// ============================================================================
// Module: Engine Config Provider
// Description: Engine tuning facts loaded once at construction.
// Purpose: Expose the provisioning-gate flag from the tuning file.
// Dependencies: rollout-gate-config, rollout-gate-core, tracing
// ============================================================================

//! ## Overview
//! The engine tuning file is read exactly once, at provider construction;
//! tuning changes take effect on the next process start. An absent file is a
//! valid deployment and yields the engine defaults. The pacing overrides in
//! the same file are consumed by the host when it constructs the policy, not
//! through this provider.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;

use rollout_gate_config::ConfigError;
use rollout_gate_config::EngineConfigFile;
use rollout_gate_core::ConfigProvider;
use rollout_gate_core::ConstVariable;
use rollout_gate_core::Variable;
use tracing::debug;

// ============================================================================
// SECTION: Provider Implementation
// ============================================================================

/// Production [`ConfigProvider`] over a loaded tuning file.
pub struct RealConfigProvider {
    /// Whether periodic update activity waits for provisioning.
    is_provisioning_gate_enabled: ConstVariable<bool>,
}

impl RealConfigProvider {
    /// Creates the provider from an already-loaded tuning file.
    #[must_use]
    pub fn new(file: &EngineConfigFile) -> Self {
        Self {
            is_provisioning_gate_enabled: ConstVariable::new(
                "config.is_provisioning_gate_enabled",
                file.is_provisioning_gate_enabled(),
            ),
        }
    }

    /// Loads the tuning file at `path` and builds the provider from it.
    ///
    /// A missing file yields the engine defaults.
    ///
    /// # Errors
    /// Any [`ConfigError`] other than file-not-found is surfaced; a present
    /// but broken tuning file must fail deployment, not degrade silently.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let file = match EngineConfigFile::load(path) {
            Ok(file) => file,
            Err(ConfigError::Io {
                source, ..
            }) if source.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "engine config file absent; using defaults");
                EngineConfigFile::default()
            }
            Err(error) => return Err(error),
        };
        Ok(Self::new(&file))
    }
}

impl ConfigProvider for RealConfigProvider {
    fn is_provisioning_gate_enabled(&self) -> &dyn Variable<bool> {
        &self.is_provisioning_gate_enabled
    }
}
