// crates/rollout-gate-config/src/engine.rs
// ============================================================================
// Module: Engine Tuning File
// Description: TOML model overriding pacing intervals and the gate flag.
// Purpose: Let deployments tune check pacing without rebuilding the engine.
// Dependencies: rollout-gate-core, serde, time, toml
// ============================================================================

//! ## Overview
//! The engine tuning file carries a `[pacing]` table whose keys override
//! individual [`PacingConfig`] fields, all expressed in whole seconds, and a
//! `[provisioning]` table controlling whether periodic activity waits for
//! first-time device setup. Every key is optional; an empty file is a valid
//! file and yields the engine defaults.
//! Invariants:
//! - Overrides merge over `PacingConfig::default()`; absent keys change
//!   nothing.
//! - Validation checks the merged result, so a partial override cannot
//!   smuggle in an inconsistent interval pair.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;

use rollout_gate_core::PacingConfig;
use serde::Deserialize;
use serde::Serialize;
use time::Duration;

use crate::ConfigError;
use crate::parse_config;
use crate::read_config_text;

// ============================================================================
// SECTION: File Model
// ============================================================================

/// Root model of the engine tuning file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfigFile {
    /// Pacing interval overrides.
    #[serde(default)]
    pub pacing: PacingSection,
    /// Provisioning gate controls.
    #[serde(default)]
    pub provisioning: ProvisioningSection,
}

/// `[pacing]` table: per-field overrides for [`PacingConfig`], in seconds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PacingSection {
    /// Override for the interval before the first-ever check.
    pub initial_interval_secs: Option<i64>,
    /// Override for the steady-state periodic interval.
    pub periodic_interval_secs: Option<i64>,
    /// Override for the server-requested fast re-check interval.
    pub quick_interval_secs: Option<i64>,
    /// Override for the backoff ceiling.
    pub max_backoff_interval_secs: Option<i64>,
    /// Override for the jitter around initial and periodic intervals.
    pub regular_fuzz_secs: Option<i64>,
    /// Override for the jitter around the quick interval.
    pub quick_fuzz_secs: Option<i64>,
}

/// `[provisioning]` table: gate controls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProvisioningSection {
    /// Whether periodic update activity waits for provisioning to finish.
    #[serde(default = "default_gate_enabled")]
    pub gate_enabled: bool,
}

impl Default for ProvisioningSection {
    fn default() -> Self {
        Self {
            gate_enabled: default_gate_enabled(),
        }
    }
}

/// The provisioning gate is on unless a deployment opts out.
const fn default_gate_enabled() -> bool {
    true
}

// ============================================================================
// SECTION: Loading and Validation
// ============================================================================

impl EngineConfigFile {
    /// Reads, parses, and validates the tuning file at `path`.
    ///
    /// # Errors
    /// [`ConfigError::Io`] when the file cannot be read,
    /// [`ConfigError::Parse`] when it is not a valid tuning document, and
    /// [`ConfigError::Validation`] when an input guard or a constraint on
    /// the merged pacing values fails.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = read_config_text(path)?;
        let file: Self = parse_config(path, &text)?;
        file.validate()?;
        Ok(file)
    }

    /// Checks the merged pacing values against the engine's constraints.
    ///
    /// # Errors
    /// [`ConfigError::Validation`] naming the first violated constraint.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let pacing = self.pacing_config();
        if pacing.periodic_interval <= Duration::ZERO {
            return Err(ConfigError::validation(
                "periodic_interval_secs must be greater than zero",
            ));
        }
        if pacing.quick_interval <= Duration::ZERO {
            return Err(ConfigError::validation(
                "quick_interval_secs must be greater than zero",
            ));
        }
        if pacing.initial_interval < Duration::ZERO {
            return Err(ConfigError::validation(
                "initial_interval_secs must not be negative",
            ));
        }
        if pacing.max_backoff_interval < pacing.periodic_interval {
            return Err(ConfigError::validation(
                "max_backoff_interval_secs must not be below periodic_interval_secs",
            ));
        }
        if pacing.regular_fuzz < Duration::ZERO || pacing.quick_fuzz < Duration::ZERO {
            return Err(ConfigError::validation("fuzz seconds must not be negative"));
        }
        Ok(())
    }

    /// Merges the file's overrides over the engine's pacing defaults.
    #[must_use]
    pub fn pacing_config(&self) -> PacingConfig {
        let defaults = PacingConfig::default();
        PacingConfig {
            initial_interval: seconds_or(
                self.pacing.initial_interval_secs,
                defaults.initial_interval,
            ),
            periodic_interval: seconds_or(
                self.pacing.periodic_interval_secs,
                defaults.periodic_interval,
            ),
            quick_interval: seconds_or(self.pacing.quick_interval_secs, defaults.quick_interval),
            max_backoff_interval: seconds_or(
                self.pacing.max_backoff_interval_secs,
                defaults.max_backoff_interval,
            ),
            regular_fuzz: seconds_or(self.pacing.regular_fuzz_secs, defaults.regular_fuzz),
            quick_fuzz: seconds_or(self.pacing.quick_fuzz_secs, defaults.quick_fuzz),
        }
    }

    /// Effective provisioning-gate flag.
    #[must_use]
    pub const fn is_provisioning_gate_enabled(&self) -> bool {
        self.provisioning.gate_enabled
    }
}

/// Turns an optional seconds override into a duration, or keeps the default.
fn seconds_or(secs: Option<i64>, default: Duration) -> Duration {
    secs.map_or(default, Duration::seconds)
}
