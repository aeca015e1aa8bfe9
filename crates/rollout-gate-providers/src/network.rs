// crates/rollout-gate-providers/src/network.rs
// ============================================================================
// Module: Network Status Provider
// Description: Live connection status fed by the host through a handle.
// Purpose: Expose connection class and tethering state as engine variables.
// Dependencies: rollout-gate-core
// ============================================================================

//! ## Overview
//! The host's connectivity stack reports connection changes through the
//! [`NetworkStatusHandle`]; the provider half serves the latest report to
//! policies. Both variables start absent, so the download gate fails closed
//! until the host has reported at least once. Reports with an unchanged
//! value do not wake watchers.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use rollout_gate_core::ConnectionType;
use rollout_gate_core::NetworkProvider;
use rollout_gate_core::TetheringState;
use rollout_gate_core::Variable;
use rollout_gate_core::WatchedVariable;

// ============================================================================
// SECTION: Shared Variables
// ============================================================================

/// Variables shared between the provider and the host handle.
struct NetworkShared {
    /// Class of the active connection.
    connection_type: WatchedVariable<ConnectionType>,
    /// Tethering assessment for the active connection.
    tethering: WatchedVariable<TetheringState>,
}

// ============================================================================
// SECTION: Provider Implementation
// ============================================================================

/// Production [`NetworkProvider`] fed through a [`NetworkStatusHandle`].
pub struct RealNetworkProvider {
    /// Host-fed status variables.
    shared: Arc<NetworkShared>,
}

/// Host-side writer for the network status variables.
pub struct NetworkStatusHandle {
    /// Host-fed status variables.
    shared: Arc<NetworkShared>,
}

impl RealNetworkProvider {
    /// Creates the provider half and its host handle.
    #[must_use]
    pub fn new() -> (Self, NetworkStatusHandle) {
        let shared = Arc::new(NetworkShared {
            connection_type: WatchedVariable::new("network.connection_type"),
            tethering: WatchedVariable::new("network.tethering"),
        });
        (
            Self {
                shared: Arc::clone(&shared),
            },
            NetworkStatusHandle {
                shared,
            },
        )
    }
}

impl NetworkStatusHandle {
    /// Records the class of the active connection.
    pub fn set_connection_type(&self, connection_type: ConnectionType) {
        self.shared.connection_type.set(connection_type);
    }

    /// Records the tethering assessment for the active connection.
    pub fn set_tethering(&self, tethering: TetheringState) {
        self.shared.tethering.set(tethering);
    }
}

impl NetworkProvider for RealNetworkProvider {
    fn connection_type(&self) -> &dyn Variable<ConnectionType> {
        &self.shared.connection_type
    }

    fn tethering(&self) -> &dyn Variable<TetheringState> {
        &self.shared.tethering
    }
}
