// crates/rollout-gate-core/src/core/state.rs
// ============================================================================
// Module: State Aggregate
// Description: Owner of one provider instance per capability.
// Purpose: Give policies a single root from which all host state is reached.
// Dependencies: none beyond the provider traits
// ============================================================================

//! ## Overview
//! [`State`] owns one shared handle per capability provider and exposes typed
//! accessors. It is created once at startup with the provider set chosen for
//! the host (real, fake, or mixed) and lives for the process. Policies borrow
//! providers through it for the duration of a single evaluation and never
//! retain them.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use crate::core::providers::ConfigProvider;
use crate::core::providers::DevicePolicyProvider;
use crate::core::providers::NetworkProvider;
use crate::core::providers::RandomProvider;
use crate::core::providers::SystemProvider;
use crate::core::providers::TimeProvider;
use crate::core::providers::UpdaterProvider;

// ============================================================================
// SECTION: Aggregate
// ============================================================================

/// Aggregate of every capability provider.
///
/// # Invariants
/// - Constructed once per process; providers are not swapped afterwards.
pub struct State {
    /// Engine configuration facts.
    config: Arc<dyn ConfigProvider>,
    /// Administrator-managed device policy.
    device_policy: Arc<dyn DevicePolicyProvider>,
    /// Live network status.
    network: Arc<dyn NetworkProvider>,
    /// PRNG seed material.
    random: Arc<dyn RandomProvider>,
    /// Device and boot facts.
    system: Arc<dyn SystemProvider>,
    /// Wall-clock time facts.
    time: Arc<dyn TimeProvider>,
    /// Update client status.
    updater: Arc<dyn UpdaterProvider>,
}

impl State {
    /// Assembles the aggregate from one provider per capability.
    #[must_use]
    pub fn new(
        config: Arc<dyn ConfigProvider>,
        device_policy: Arc<dyn DevicePolicyProvider>,
        network: Arc<dyn NetworkProvider>,
        random: Arc<dyn RandomProvider>,
        system: Arc<dyn SystemProvider>,
        time: Arc<dyn TimeProvider>,
        updater: Arc<dyn UpdaterProvider>,
    ) -> Self {
        Self {
            config,
            device_policy,
            network,
            random,
            system,
            time,
            updater,
        }
    }

    /// Engine configuration provider.
    #[must_use]
    pub fn config(&self) -> &dyn ConfigProvider {
        self.config.as_ref()
    }

    /// Device policy provider.
    #[must_use]
    pub fn device_policy(&self) -> &dyn DevicePolicyProvider {
        self.device_policy.as_ref()
    }

    /// Network status provider.
    #[must_use]
    pub fn network(&self) -> &dyn NetworkProvider {
        self.network.as_ref()
    }

    /// Random seed provider.
    #[must_use]
    pub fn random(&self) -> &dyn RandomProvider {
        self.random.as_ref()
    }

    /// System facts provider.
    #[must_use]
    pub fn system(&self) -> &dyn SystemProvider {
        self.system.as_ref()
    }

    /// Time provider.
    #[must_use]
    pub fn time(&self) -> &dyn TimeProvider {
        self.time.as_ref()
    }

    /// Updater status provider.
    #[must_use]
    pub fn updater(&self) -> &dyn UpdaterProvider {
        self.updater.as_ref()
    }
}
