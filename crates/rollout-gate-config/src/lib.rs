// crates/rollout-gate-config/src/lib.rs
// ============================================================================
// Module: Rollout Gate Config
// Description: File models for engine tuning and administrator device policy.
// Purpose: Load, validate, and convert configuration into core engine types.
// Dependencies: rollout-gate-core, serde, thiserror, time, toml
// ============================================================================

//! ## Overview
//! Two TOML documents configure the engine: the engine tuning file, which
//! overrides pacing intervals and the provisioning gate, and the device
//! policy file written by an administrator. Both are loaded through the same
//! strict input guards, parsed with unknown keys rejected, and validated
//! before any value reaches the engine. A file that fails any step yields a
//! [`ConfigError`]; no partially applied document is ever observable.
//! Invariants:
//! - A successfully loaded model has passed `validate`.
//! - Input guards run before the first byte is parsed.
//! - Missing keys fall back to engine defaults, never to ad-hoc values.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod device_policy;
pub mod engine;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;

use thiserror::Error;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use crate::device_policy::DevicePolicyFile;
pub use crate::engine::EngineConfigFile;
pub use crate::engine::PacingSection;
pub use crate::engine::ProvisioningSection;

// ============================================================================
// SECTION: Input Guards
// ============================================================================

/// Longest accepted config path, in bytes.
const MAX_PATH_BYTES: usize = 4_096;

/// Longest accepted single path component, in bytes.
const MAX_COMPONENT_BYTES: usize = 255;

/// Largest accepted config file, in bytes.
const MAX_FILE_BYTES: usize = 1_048_576;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Failure while loading or validating a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read from disk.
    #[error("config io error for {path}: {source}")]
    Io {
        /// Path that failed to read.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// The file contents are not valid TOML for the target model.
    #[error("config parse error for {path}: {source}")]
    Parse {
        /// Path that failed to parse.
        path: PathBuf,
        /// Underlying deserialization failure.
        #[source]
        source: Box<toml::de::Error>,
    },

    /// The file parsed but violates a documented constraint.
    #[error("config validation error: {reason}")]
    Validation {
        /// Human-readable description of the violated constraint.
        reason: String,
    },
}

impl ConfigError {
    /// Builds a validation error from a constraint description.
    pub(crate) fn validation(reason: impl Into<String>) -> Self {
        Self::Validation {
            reason: reason.into(),
        }
    }
}

// ============================================================================
// SECTION: Guarded Reader
// ============================================================================

/// Reads a config file as text after applying the input guards.
///
/// Guards run in order: path length, component length, file size, encoding.
/// The first violated guard decides the error.
pub(crate) fn read_config_text(path: &Path) -> Result<String, ConfigError> {
    if path.as_os_str().len() > MAX_PATH_BYTES {
        return Err(ConfigError::validation("config path exceeds max length"));
    }
    for component in path.components() {
        if component.as_os_str().len() > MAX_COMPONENT_BYTES {
            return Err(ConfigError::validation("config path component too long"));
        }
    }
    let bytes = std::fs::read(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    if bytes.len() > MAX_FILE_BYTES {
        return Err(ConfigError::validation("config file exceeds size limit"));
    }
    String::from_utf8(bytes)
        .map_err(|_| ConfigError::validation("config file must be utf-8"))
}

/// Parses guarded text into a model, boxing the verbose TOML error.
pub(crate) fn parse_config<T>(path: &Path, text: &str) -> Result<T, ConfigError>
where
    T: serde::de::DeserializeOwned,
{
    toml::from_str(text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source: Box::new(source),
    })
}
