// crates/rollout-gate-core/src/core/providers.rs
// ============================================================================
// Module: Capability Providers
// Description: Trait-per-capability bundles of related variables.
// Purpose: Group host state into the bundles the policies consult.
// Dependencies: serde, time
// ============================================================================

//! ## Overview
//! A provider is a named bundle of related [`Variable`]s covering one host
//! capability: time, randomness, system facts, device policy, engine
//! configuration, updater status, and network status. Each capability is a
//! trait; real, fake, or custom implementations are selected at construction
//! and aggregated in [`crate::State`]. Policies never talk to a source
//! directly; they read provider variables through an evaluation context.
//! Invariants:
//! - Providers are initialized once and owned exclusively by the state
//!   aggregate.
//! - Accessors return borrows; variables live as long as their provider.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use serde::Deserialize;
use serde::Serialize;
use time::Date;
use time::Duration;
use time::OffsetDateTime;

use crate::core::variable::Variable;

// ============================================================================
// SECTION: Value Types
// ============================================================================

/// Physical class of the active network connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionType {
    /// Wired connection.
    Ethernet,
    /// Wireless LAN.
    Wifi,
    /// Metered mobile data.
    Cellular,
    /// Bluetooth tether or PAN link.
    Bluetooth,
    /// The host could not classify the connection.
    Unknown,
}

/// Whether the active connection is suspected to be a tethered hotspot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TetheringState {
    /// No tethering detected.
    NotDetected,
    /// Heuristics suggest a tethered connection.
    Suspected,
    /// The host confirmed a tethered connection.
    Confirmed,
    /// The host could not determine the tethering state.
    Unknown,
}

/// Outstanding request for an out-of-cycle update check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckRequest {
    /// No out-of-cycle check requested.
    None,
    /// A user asked for a check; pacing and scattering are bypassed.
    Interactive,
    /// The server asked for a fast re-check on the quick interval.
    Scheduled,
}

// ============================================================================
// SECTION: Capability Traits
// ============================================================================

/// Wall-clock time facts.
pub trait TimeProvider: Send + Sync {
    /// Current wall-clock time.
    fn now(&self) -> &dyn Variable<OffsetDateTime>;

    /// Current calendar date.
    fn date(&self) -> &dyn Variable<Date>;

    /// Current hour of the day, `0..=23`.
    fn hour(&self) -> &dyn Variable<u8>;
}

/// Seed material for the deterministic PRNG.
pub trait RandomProvider: Send + Sync {
    /// Seed captured once per process from the host's entropy source.
    fn seed(&self) -> &dyn Variable<u64>;
}

/// Immutable-ish facts about the device and its boot.
pub trait SystemProvider: Send + Sync {
    /// True when running a signed production image.
    fn is_official_build(&self) -> &dyn Variable<bool>;

    /// True when the system booted from removable media.
    fn is_boot_device_removable(&self) -> &dyn Variable<bool>;

    /// Running OS version string.
    fn os_version(&self) -> &dyn Variable<String>;

    /// True once first-time device setup has finished.
    fn is_provisioning_complete(&self) -> &dyn Variable<bool>;
}

/// Engine configuration facts.
pub trait ConfigProvider: Send + Sync {
    /// Whether periodic update activity waits for provisioning to complete.
    fn is_provisioning_gate_enabled(&self) -> &dyn Variable<bool>;
}

/// Administrator-managed device policy.
///
/// All variables report no value until a policy document has been loaded;
/// [`Self::is_policy_loaded`] gates every other read.
pub trait DevicePolicyProvider: Send + Sync {
    /// True once a policy document is loaded and the other variables are
    /// meaningful.
    fn is_policy_loaded(&self) -> &dyn Variable<bool>;

    /// Administrator kill switch for automatic updates.
    fn is_update_disabled(&self) -> &dyn Variable<bool>;

    /// Highest version prefix the device may update to.
    fn target_version_prefix(&self) -> &dyn Variable<String>;

    /// Release channel mandated by the administrator.
    fn release_channel(&self) -> &dyn Variable<String>;

    /// True when channel selection is delegated to the device user.
    fn is_release_channel_delegated(&self) -> &dyn Variable<bool>;

    /// Upper bound for the randomized download wait period.
    fn scatter_factor(&self) -> &dyn Variable<Duration>;

    /// Connection types on which downloads are explicitly permitted.
    fn allowed_connection_types(&self) -> &dyn Variable<BTreeSet<ConnectionType>>;

    /// True when peer-to-peer payload sharing is permitted by policy.
    fn is_p2p_enabled(&self) -> &dyn Variable<bool>;
}

/// Status of the update client itself.
pub trait UpdaterProvider: Send + Sync {
    /// Wall-clock time of the last completed update check.
    fn last_checked_time(&self) -> &dyn Variable<OffsetDateTime>;

    /// Wall-clock time the updater process started.
    fn updater_started_time(&self) -> &dyn Variable<OffsetDateTime>;

    /// Consecutive failed checks since the last success.
    fn consecutive_failed_checks(&self) -> &dyn Variable<u32>;

    /// Pending out-of-cycle check request, if any.
    fn check_request(&self) -> &dyn Variable<CheckRequest>;

    /// True when the device user enabled peer-to-peer payload sharing.
    fn is_p2p_enabled(&self) -> &dyn Variable<bool>;

    /// True when the device user permitted downloads over cellular.
    fn is_cellular_enabled(&self) -> &dyn Variable<bool>;
}

/// Live network status.
pub trait NetworkProvider: Send + Sync {
    /// Class of the active connection.
    fn connection_type(&self) -> &dyn Variable<ConnectionType>;

    /// Tethering assessment for the active connection.
    fn tethering(&self) -> &dyn Variable<TetheringState>;
}
