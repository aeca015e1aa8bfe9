// crates/rollout-gate-providers/src/system.rs
// ============================================================================
// Module: System Facts Provider
// Description: Boot and provisioning facts collected by the host.
// Purpose: Expose per-boot constants and the provisioning marker state.
// Dependencies: rollout-gate-core
// ============================================================================

//! ## Overview
//! Build officiality, boot-device class, and the OS version are fixed for the
//! lifetime of a boot, so the host collects them once into a [`SystemInfo`]
//! and the provider serves them as constants. Provisioning completion is the
//! exception: first-time setup finishes while the process runs, so it is a
//! poll variable checking for the marker file the setup flow drops.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::PathBuf;

use rollout_gate_core::ConstVariable;
use rollout_gate_core::PollVariable;
use rollout_gate_core::SystemProvider;
use rollout_gate_core::Variable;

// ============================================================================
// SECTION: Collected Facts
// ============================================================================

/// Per-boot facts collected by the host at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemInfo {
    /// True when running a signed production image.
    pub is_official_build: bool,
    /// True when the system booted from removable media.
    pub is_boot_device_removable: bool,
    /// Running OS version string.
    pub os_version: String,
}

// ============================================================================
// SECTION: Provider Implementation
// ============================================================================

/// Production [`SystemProvider`] over collected facts and the marker file.
pub struct RealSystemProvider {
    /// True when running a signed production image.
    is_official_build: ConstVariable<bool>,
    /// True when the system booted from removable media.
    is_boot_device_removable: ConstVariable<bool>,
    /// Running OS version string.
    os_version: ConstVariable<String>,
    /// True once the provisioning marker file exists.
    is_provisioning_complete: PollVariable<bool>,
}

impl RealSystemProvider {
    /// Creates the provider from collected facts and the marker file path.
    #[must_use]
    pub fn new(info: SystemInfo, provisioning_marker: PathBuf) -> Self {
        Self {
            is_official_build: ConstVariable::new(
                "system.is_official_build",
                info.is_official_build,
            ),
            is_boot_device_removable: ConstVariable::new(
                "system.is_boot_device_removable",
                info.is_boot_device_removable,
            ),
            os_version: ConstVariable::new("system.os_version", info.os_version),
            is_provisioning_complete: PollVariable::new(
                "system.is_provisioning_complete",
                move || {
                    provisioning_marker.try_exists().map_err(|err| err.to_string())
                },
            ),
        }
    }
}

impl SystemProvider for RealSystemProvider {
    fn is_official_build(&self) -> &dyn Variable<bool> {
        &self.is_official_build
    }

    fn is_boot_device_removable(&self) -> &dyn Variable<bool> {
        &self.is_boot_device_removable
    }

    fn os_version(&self) -> &dyn Variable<String> {
        &self.os_version
    }

    fn is_provisioning_complete(&self) -> &dyn Variable<bool> {
        &self.is_provisioning_complete
    }
}
