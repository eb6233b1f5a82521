//! HAL interface and lifecycle types.
//!
//! This module defines the data structures exchanged between a driver and
//! its host:
//! - `InterfaceValue` - Shared f64 slot backing one exported interface
//! - `StateInterface` / `CommandInterface` - Named handles onto those slots
//! - `LifecycleState` / `LifecycleEvent` - Driver lifecycle vocabulary
//! - `HalContext` - Logging name and clock handed to a driver at init

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// One f64 slot shared between a driver buffer and the handles exported
/// from it.
///
/// Clones refer to the same storage. The value is stored as raw bits in an
/// atomic so handles stay `Send` without a lock in the cycle path.
#[derive(Debug, Clone)]
pub struct InterfaceValue(Arc<AtomicU64>);

impl InterfaceValue {
    /// Create a new slot holding `value`.
    pub fn new(value: f64) -> Self {
        Self(Arc::new(AtomicU64::new(value.to_bits())))
    }

    /// Current value.
    #[inline]
    pub fn get(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Acquire))
    }

    /// Overwrite the value.
    #[inline]
    pub fn set(&self, value: f64) {
        self.0.store(value.to_bits(), Ordering::Release);
    }

    /// True if both values refer to the same slot.
    pub fn same_slot(&self, other: &InterfaceValue) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Default for InterfaceValue {
    fn default() -> Self {
        Self::new(0.0)
    }
}

/// Read-only handle onto one state slot, exported to the host.
#[derive(Debug, Clone)]
pub struct StateInterface {
    prefix_name: String,
    interface_name: String,
    value: InterfaceValue,
}

impl StateInterface {
    /// Bind `prefix_name/interface_name` to `value`.
    pub fn new(
        prefix_name: impl Into<String>,
        interface_name: impl Into<String>,
        value: InterfaceValue,
    ) -> Self {
        Self {
            prefix_name: prefix_name.into(),
            interface_name: interface_name.into(),
            value,
        }
    }

    /// Component (joint or GPIO) name.
    pub fn prefix_name(&self) -> &str {
        &self.prefix_name
    }

    /// Interface name within the component.
    pub fn interface_name(&self) -> &str {
        &self.interface_name
    }

    /// `"<prefix>/<interface>"`.
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.prefix_name, self.interface_name)
    }

    /// Current state value.
    pub fn get_value(&self) -> f64 {
        self.value.get()
    }

    /// Underlying slot.
    pub fn slot(&self) -> &InterfaceValue {
        &self.value
    }
}

/// Read/write handle onto one command slot, exported to the host.
#[derive(Debug, Clone)]
pub struct CommandInterface {
    prefix_name: String,
    interface_name: String,
    value: InterfaceValue,
}

impl CommandInterface {
    /// Bind `prefix_name/interface_name` to `value`.
    pub fn new(
        prefix_name: impl Into<String>,
        interface_name: impl Into<String>,
        value: InterfaceValue,
    ) -> Self {
        Self {
            prefix_name: prefix_name.into(),
            interface_name: interface_name.into(),
            value,
        }
    }

    /// Component (joint or GPIO) name.
    pub fn prefix_name(&self) -> &str {
        &self.prefix_name
    }

    /// Interface name within the component.
    pub fn interface_name(&self) -> &str {
        &self.interface_name
    }

    /// `"<prefix>/<interface>"`.
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.prefix_name, self.interface_name)
    }

    /// Current command value.
    pub fn get_value(&self) -> f64 {
        self.value.get()
    }

    /// Write a new command value.
    pub fn set_value(&self, value: f64) {
        self.value.set(value);
    }

    /// Underlying slot.
    pub fn slot(&self) -> &InterfaceValue {
        &self.value
    }
}

/// Driver lifecycle states.
///
/// ```text
/// Unconfigured ──configure──► Inactive ──activate──► Active
///      ▲                        │  ▲                   │
///      └────────cleanup─────────┘  └─────deactivate────┘
///
/// any ──shutdown──► Finalized
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleState {
    /// Initialized, buffers allocated, not configured.
    Unconfigured,
    /// Configured, serial link closed.
    Inactive,
    /// Serial link open, cyclic read/write allowed.
    Active,
    /// Terminal.
    Finalized,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LifecycleState::Unconfigured => "unconfigured",
            LifecycleState::Inactive => "inactive",
            LifecycleState::Active => "active",
            LifecycleState::Finalized => "finalized",
        };
        f.write_str(name)
    }
}

/// Lifecycle events a host may request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleEvent {
    /// Reset buffers, enter Inactive.
    Configure,
    /// Open the serial link, enter Active.
    Activate,
    /// Close the serial link, return to Inactive.
    Deactivate,
    /// Return from Inactive to Unconfigured.
    Cleanup,
    /// Close everything, enter Finalized.
    Shutdown,
}

impl fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LifecycleEvent::Configure => "configure",
            LifecycleEvent::Activate => "activate",
            LifecycleEvent::Deactivate => "deactivate",
            LifecycleEvent::Cleanup => "cleanup",
            LifecycleEvent::Shutdown => "shutdown",
        };
        f.write_str(name)
    }
}

/// Logger name and clock handed to a driver at init.
#[derive(Debug, Clone)]
pub struct HalContext {
    component: String,
    origin: Instant,
}

impl HalContext {
    /// Create a context for the hardware component `component`.
    pub fn new(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            origin: Instant::now(),
        }
    }

    /// Hardware component name used in log lines.
    pub fn component(&self) -> &str {
        &self.component
    }

    /// Current monotonic time.
    pub fn now(&self) -> Instant {
        Instant::now()
    }

    /// Time since the context was created.
    pub fn uptime(&self) -> Duration {
        self.origin.elapsed()
    }
}
