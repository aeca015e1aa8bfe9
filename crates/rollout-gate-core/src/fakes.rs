// crates/rollout-gate-core/src/fakes.rs
// ============================================================================
// Module: Fakes
// Description: Scriptable clock, variables, and providers for tests.
// Purpose: Let tests steer every input a policy evaluation consumes.
// Dependencies: time
// ============================================================================

//! ## Overview
//! Test doubles for every seam the engine injects: a [`FakeClock`] with
//! settable wall-clock and monotonic readings, a [`FakeVariable`] whose read
//! outcome is scripted per test, one fake per capability provider exposing
//! its variables as public fields, and a [`FakeState`] that wires a full
//! aggregate while keeping handles for later mutation. Downstream hosts use
//! the same doubles for their own wiring tests.
//! Invariants:
//! - Every mutation of a fake variable signals its watchers.
//! - Fakes never block; scripted reads return immediately.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use time::Date;
use time::Duration;
use time::OffsetDateTime;

use crate::core::clock::Clock;
use crate::core::providers::CheckRequest;
use crate::core::providers::ConfigProvider;
use crate::core::providers::ConnectionType;
use crate::core::providers::DevicePolicyProvider;
use crate::core::providers::NetworkProvider;
use crate::core::providers::RandomProvider;
use crate::core::providers::SystemProvider;
use crate::core::providers::TetheringState;
use crate::core::providers::TimeProvider;
use crate::core::providers::UpdaterProvider;
use crate::core::state::State;
use crate::core::variable::ChangeNotifier;
use crate::core::variable::ChangeWatch;
use crate::core::variable::Variable;
use crate::core::variable::VariableError;
use crate::core::variable::VariableId;
use crate::core::variable::VariableIdent;
use crate::core::variable::VariableMode;

// ============================================================================
// SECTION: Fake Clock
// ============================================================================

/// Clock whose readings are set by the test.
pub struct FakeClock {
    /// Current wall-clock and monotonic readings.
    readings: Mutex<(OffsetDateTime, Duration)>,
}

impl FakeClock {
    /// Creates a clock at the given readings.
    #[must_use]
    pub fn new(wallclock: OffsetDateTime, monotonic: Duration) -> Self {
        Self {
            readings: Mutex::new((wallclock, monotonic)),
        }
    }

    /// Sets the wall-clock reading; the monotonic reading is untouched.
    pub fn set_wallclock(&self, wallclock: OffsetDateTime) {
        let mut readings = self.readings.lock().unwrap_or_else(PoisonError::into_inner);
        readings.0 = wallclock;
    }

    /// Sets the monotonic reading; the wall-clock reading is untouched.
    pub fn set_monotonic(&self, monotonic: Duration) {
        let mut readings = self.readings.lock().unwrap_or_else(PoisonError::into_inner);
        readings.1 = monotonic;
    }

    /// Advances both readings together, as real time passing would.
    pub fn advance(&self, delta: Duration) {
        let mut readings = self.readings.lock().unwrap_or_else(PoisonError::into_inner);
        readings.0 += delta;
        readings.1 = readings.1.saturating_add(delta);
    }
}

impl Clock for FakeClock {
    fn wallclock(&self) -> OffsetDateTime {
        self.readings.lock().unwrap_or_else(PoisonError::into_inner).0
    }

    fn monotonic(&self) -> Duration {
        self.readings.lock().unwrap_or_else(PoisonError::into_inner).1
    }
}

// ============================================================================
// SECTION: Fake Variable
// ============================================================================

/// Variable whose read outcome is scripted by the test.
///
/// Fresh fakes hold no value. Every mutation signals watchers, whether or
/// not the value changed, so tests control exactly when a watch fires.
pub struct FakeVariable<T> {
    /// Identity and metadata.
    ident: VariableIdent,
    /// Scripted outcome returned by the next reads.
    outcome: Mutex<Result<T, VariableError>>,
    /// Change signal bumped on every mutation.
    notifier: ChangeNotifier,
    /// Number of reads served so far.
    reads: AtomicUsize,
}

impl<T: Clone + Send + Sync> FakeVariable<T> {
    /// Creates an async-mode fake holding no value.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let ident = VariableIdent::new(name, VariableMode::Async);
        let outcome = Mutex::new(Err(VariableError::NoValue {
            variable: ident.name.clone(),
        }));
        Self {
            ident,
            outcome,
            notifier: ChangeNotifier::new(),
            reads: AtomicUsize::new(0),
        }
    }

    /// Creates an async-mode fake holding `value`.
    #[must_use]
    pub fn with_value(name: impl Into<String>, value: T) -> Self {
        let variable = Self::new(name);
        if let Ok(mut outcome) = variable.outcome.lock() {
            *outcome = Ok(value);
        }
        variable
    }

    /// Overrides the refresh mode reported to readers.
    #[must_use]
    pub fn with_mode(mut self, mode: VariableMode) -> Self {
        self.ident.mode = mode;
        self
    }

    /// Overrides the advised poll interval.
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.ident.poll_interval = interval;
        self
    }

    /// Scripts a successful read.
    pub fn set(&self, value: T) {
        if let Ok(mut outcome) = self.outcome.lock() {
            *outcome = Ok(value);
            drop(outcome);
            self.notifier.notify();
        }
    }

    /// Scripts a failing read.
    pub fn fail(&self, reason: impl Into<String>) {
        if let Ok(mut outcome) = self.outcome.lock() {
            *outcome = Err(VariableError::ReadFailed {
                variable: self.ident.name.clone(),
                reason: reason.into(),
            });
            drop(outcome);
            self.notifier.notify();
        }
    }

    /// Scripts an absent value, as before the first `set`.
    pub fn clear(&self) {
        if let Ok(mut outcome) = self.outcome.lock() {
            *outcome = Err(VariableError::NoValue {
                variable: self.ident.name.clone(),
            });
            drop(outcome);
            self.notifier.notify();
        }
    }

    /// Number of reads served since construction.
    #[must_use]
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::Relaxed)
    }
}

impl<T: Clone + Send + Sync> Variable<T> for FakeVariable<T> {
    fn name(&self) -> &str {
        &self.ident.name
    }

    fn id(&self) -> VariableId {
        self.ident.id
    }

    fn mode(&self) -> VariableMode {
        self.ident.mode
    }

    fn poll_interval(&self) -> Duration {
        self.ident.poll_interval
    }

    fn get(&self, _timeout: Duration) -> Result<T, VariableError> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        self.outcome
            .lock()
            .map_or_else(
                |_| {
                    Err(VariableError::ReadFailed {
                        variable: self.ident.name.clone(),
                        reason: "fake outcome lock poisoned".to_owned(),
                    })
                },
                |outcome| outcome.clone(),
            )
    }

    fn watch(&self) -> Option<ChangeWatch> {
        (self.ident.mode == VariableMode::Async).then(|| self.notifier.watch())
    }
}

// ============================================================================
// SECTION: Fake Providers
// ============================================================================

/// Fake wall-clock time facts.
pub struct FakeTimeProvider {
    /// Current wall-clock time.
    pub now: FakeVariable<OffsetDateTime>,
    /// Current calendar date.
    pub date: FakeVariable<Date>,
    /// Current hour of the day.
    pub hour: FakeVariable<u8>,
}

impl FakeTimeProvider {
    /// Creates the provider with all variables unset.
    #[must_use]
    pub fn new() -> Self {
        Self {
            now: FakeVariable::new("time.now"),
            date: FakeVariable::new("time.date"),
            hour: FakeVariable::new("time.hour"),
        }
    }
}

impl Default for FakeTimeProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeProvider for FakeTimeProvider {
    fn now(&self) -> &dyn Variable<OffsetDateTime> {
        &self.now
    }

    fn date(&self) -> &dyn Variable<Date> {
        &self.date
    }

    fn hour(&self) -> &dyn Variable<u8> {
        &self.hour
    }
}

/// Fake PRNG seed material.
pub struct FakeRandomProvider {
    /// Scripted seed.
    pub seed: FakeVariable<u64>,
}

impl FakeRandomProvider {
    /// Creates the provider with the seed unset.
    #[must_use]
    pub fn new() -> Self {
        Self {
            seed: FakeVariable::new("random.seed"),
        }
    }
}

impl Default for FakeRandomProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl RandomProvider for FakeRandomProvider {
    fn seed(&self) -> &dyn Variable<u64> {
        &self.seed
    }
}

/// Fake device and boot facts.
pub struct FakeSystemProvider {
    /// Scripted official-build flag.
    pub is_official_build: FakeVariable<bool>,
    /// Scripted removable-boot flag.
    pub is_boot_device_removable: FakeVariable<bool>,
    /// Scripted OS version.
    pub os_version: FakeVariable<String>,
    /// Scripted provisioning-complete flag.
    pub is_provisioning_complete: FakeVariable<bool>,
}

impl FakeSystemProvider {
    /// Creates the provider with all variables unset.
    #[must_use]
    pub fn new() -> Self {
        Self {
            is_official_build: FakeVariable::new("system.is_official_build"),
            is_boot_device_removable: FakeVariable::new("system.is_boot_device_removable"),
            os_version: FakeVariable::new("system.os_version"),
            is_provisioning_complete: FakeVariable::new("system.is_provisioning_complete"),
        }
    }
}

impl Default for FakeSystemProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemProvider for FakeSystemProvider {
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

/// Fake engine configuration facts.
pub struct FakeConfigProvider {
    /// Scripted provisioning-gate flag.
    pub is_provisioning_gate_enabled: FakeVariable<bool>,
}

impl FakeConfigProvider {
    /// Creates the provider with all variables unset.
    #[must_use]
    pub fn new() -> Self {
        Self {
            is_provisioning_gate_enabled: FakeVariable::new("config.is_provisioning_gate_enabled"),
        }
    }
}

impl Default for FakeConfigProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigProvider for FakeConfigProvider {
    fn is_provisioning_gate_enabled(&self) -> &dyn Variable<bool> {
        &self.is_provisioning_gate_enabled
    }
}

/// Fake administrator-managed device policy.
pub struct FakeDevicePolicyProvider {
    /// Scripted policy-loaded flag.
    pub is_policy_loaded: FakeVariable<bool>,
    /// Scripted update kill switch.
    pub is_update_disabled: FakeVariable<bool>,
    /// Scripted target version prefix.
    pub target_version_prefix: FakeVariable<String>,
    /// Scripted mandated release channel.
    pub release_channel: FakeVariable<String>,
    /// Scripted channel-delegation flag.
    pub is_release_channel_delegated: FakeVariable<bool>,
    /// Scripted scatter factor.
    pub scatter_factor: FakeVariable<Duration>,
    /// Scripted allowed connection types.
    pub allowed_connection_types: FakeVariable<BTreeSet<ConnectionType>>,
    /// Scripted policy-level p2p permission.
    pub is_p2p_enabled: FakeVariable<bool>,
}

impl FakeDevicePolicyProvider {
    /// Creates the provider with all variables unset.
    #[must_use]
    pub fn new() -> Self {
        Self {
            is_policy_loaded: FakeVariable::new("device_policy.is_policy_loaded"),
            is_update_disabled: FakeVariable::new("device_policy.is_update_disabled"),
            target_version_prefix: FakeVariable::new("device_policy.target_version_prefix"),
            release_channel: FakeVariable::new("device_policy.release_channel"),
            is_release_channel_delegated: FakeVariable::new(
                "device_policy.is_release_channel_delegated",
            ),
            scatter_factor: FakeVariable::new("device_policy.scatter_factor"),
            allowed_connection_types: FakeVariable::new("device_policy.allowed_connection_types"),
            is_p2p_enabled: FakeVariable::new("device_policy.is_p2p_enabled"),
        }
    }
}

impl Default for FakeDevicePolicyProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl DevicePolicyProvider for FakeDevicePolicyProvider {
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

/// Fake update client status.
pub struct FakeUpdaterProvider {
    /// Scripted last completed check time.
    pub last_checked_time: FakeVariable<OffsetDateTime>,
    /// Scripted updater start time.
    pub updater_started_time: FakeVariable<OffsetDateTime>,
    /// Scripted consecutive-failure count.
    pub consecutive_failed_checks: FakeVariable<u32>,
    /// Scripted out-of-cycle check request.
    pub check_request: FakeVariable<CheckRequest>,
    /// Scripted user-level p2p permission.
    pub is_p2p_enabled: FakeVariable<bool>,
    /// Scripted user-level cellular permission.
    pub is_cellular_enabled: FakeVariable<bool>,
}

impl FakeUpdaterProvider {
    /// Creates the provider with all variables unset.
    #[must_use]
    pub fn new() -> Self {
        Self {
            last_checked_time: FakeVariable::new("updater.last_checked_time"),
            updater_started_time: FakeVariable::new("updater.updater_started_time"),
            consecutive_failed_checks: FakeVariable::new("updater.consecutive_failed_checks"),
            check_request: FakeVariable::new("updater.check_request"),
            is_p2p_enabled: FakeVariable::new("updater.is_p2p_enabled"),
            is_cellular_enabled: FakeVariable::new("updater.is_cellular_enabled"),
        }
    }
}

impl Default for FakeUpdaterProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl UpdaterProvider for FakeUpdaterProvider {
    fn last_checked_time(&self) -> &dyn Variable<OffsetDateTime> {
        &self.last_checked_time
    }

    fn updater_started_time(&self) -> &dyn Variable<OffsetDateTime> {
        &self.updater_started_time
    }

    fn consecutive_failed_checks(&self) -> &dyn Variable<u32> {
        &self.consecutive_failed_checks
    }

    fn check_request(&self) -> &dyn Variable<CheckRequest> {
        &self.check_request
    }

    fn is_p2p_enabled(&self) -> &dyn Variable<bool> {
        &self.is_p2p_enabled
    }

    fn is_cellular_enabled(&self) -> &dyn Variable<bool> {
        &self.is_cellular_enabled
    }
}

/// Fake live network status.
pub struct FakeNetworkProvider {
    /// Scripted connection class.
    pub connection_type: FakeVariable<ConnectionType>,
    /// Scripted tethering assessment.
    pub tethering: FakeVariable<TetheringState>,
}

impl FakeNetworkProvider {
    /// Creates the provider with all variables unset.
    #[must_use]
    pub fn new() -> Self {
        Self {
            connection_type: FakeVariable::new("network.connection_type"),
            tethering: FakeVariable::new("network.tethering"),
        }
    }
}

impl Default for FakeNetworkProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl NetworkProvider for FakeNetworkProvider {
    fn connection_type(&self) -> &dyn Variable<ConnectionType> {
        &self.connection_type
    }

    fn tethering(&self) -> &dyn Variable<TetheringState> {
        &self.tethering
    }
}

// ============================================================================
// SECTION: Fake State
// ============================================================================

/// Full fake provider set with handles retained for mutation.
///
/// [`Self::state`] hands an aggregate to the code under test while the test
/// keeps this struct to steer variables mid-scenario.
pub struct FakeState {
    /// Fake engine configuration.
    pub config: Arc<FakeConfigProvider>,
    /// Fake device policy.
    pub device_policy: Arc<FakeDevicePolicyProvider>,
    /// Fake network status.
    pub network: Arc<FakeNetworkProvider>,
    /// Fake random seed.
    pub random: Arc<FakeRandomProvider>,
    /// Fake system facts.
    pub system: Arc<FakeSystemProvider>,
    /// Fake time facts.
    pub time: Arc<FakeTimeProvider>,
    /// Fake updater status.
    pub updater: Arc<FakeUpdaterProvider>,
}

impl FakeState {
    /// Creates a full fake provider set with every variable unset.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: Arc::new(FakeConfigProvider::new()),
            device_policy: Arc::new(FakeDevicePolicyProvider::new()),
            network: Arc::new(FakeNetworkProvider::new()),
            random: Arc::new(FakeRandomProvider::new()),
            system: Arc::new(FakeSystemProvider::new()),
            time: Arc::new(FakeTimeProvider::new()),
            updater: Arc::new(FakeUpdaterProvider::new()),
        }
    }

    /// Builds a [`State`] aggregate sharing these providers.
    #[must_use]
    pub fn state(&self) -> State {
        State::new(
            Arc::clone(&self.config) as Arc<dyn ConfigProvider>,
            Arc::clone(&self.device_policy) as Arc<dyn DevicePolicyProvider>,
            Arc::clone(&self.network) as Arc<dyn NetworkProvider>,
            Arc::clone(&self.random) as Arc<dyn RandomProvider>,
            Arc::clone(&self.system) as Arc<dyn SystemProvider>,
            Arc::clone(&self.time) as Arc<dyn TimeProvider>,
            Arc::clone(&self.updater) as Arc<dyn UpdaterProvider>,
        )
    }
}

impl Default for FakeState {
    fn default() -> Self {
        Self::new()
    }
}
