//! HAL driver trait and error types.
//!
//! This module defines:
//! - `SystemInterface` trait - Lifecycle and cyclic contract of a hardware adapter
//! - `HalError` enum - Error types for HAL operations
//! - `ValidationRule` enum - Which hardware-description rule was violated
//! - `DriverFactory` type alias - Factory function type
//! - `DriverDiagnostics` struct - Optional driver diagnostics

use crate::hal::config::HardwareInfo;
use crate::hal::types::{
    CommandInterface, HalContext, LifecycleEvent, LifecycleState, StateInterface,
};
use std::fmt;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Hardware-description rule checked during driver init.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValidationRule {
    /// A joint must have exactly one command interface.
    JointCommandInterfaceCount,
    /// The joint command interface must be `position`.
    JointCommandInterfaceName,
    /// A joint must have exactly one state interface.
    JointStateInterfaceCount,
    /// The joint state interface must be `position`.
    JointStateInterfaceName,
    /// Exactly two GPIO components.
    GpioComponentCount,
    /// Each GPIO component has exactly one command interface.
    GpioCommandInterfaceCount,
    /// GPIO component 0 has 3 state interfaces, component 1 has 1.
    GpioStateInterfaceCount,
}

impl fmt::Display for ValidationRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValidationRule::JointCommandInterfaceCount => "joint_command_interface_count",
            ValidationRule::JointCommandInterfaceName => "joint_command_interface_name",
            ValidationRule::JointStateInterfaceCount => "joint_state_interface_count",
            ValidationRule::JointStateInterfaceName => "joint_state_interface_name",
            ValidationRule::GpioComponentCount => "gpio_component_count",
            ValidationRule::GpioCommandInterfaceCount => "gpio_command_interface_count",
            ValidationRule::GpioStateInterfaceCount => "gpio_state_interface_count",
        };
        f.write_str(name)
    }
}

/// Error types for HAL operations.
#[derive(Debug, Clone, Error)]
pub enum HalError {
    /// Malformed or incomplete configuration.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Hardware description violates one of the adapter's cardinality rules.
    #[error("Configuration error ({rule}): {message}")]
    Validation {
        /// Violated rule
        rule: ValidationRule,
        /// Offending component with expected vs found count
        message: String,
    },

    /// Serial device could not be opened or closed.
    #[error("Serial connection error: {0}")]
    ConnectionError(String),

    /// Serial read or write failed.
    #[error("Serial transport fault: {0}")]
    TransportFault(String),

    /// Requested lifecycle transition is not valid from the current state.
    #[error("Cannot {event} from {from} state: {reason}")]
    InvalidTransition {
        /// State at the time of the request
        from: LifecycleState,
        /// Requested event
        event: LifecycleEvent,
        /// Why the transition was rejected
        reason: &'static str,
    },

    /// Lifecycle call made before a successful `on_init`.
    #[error("Driver not initialized")]
    NotInitialized,

    /// Driver not found
    #[error("Driver not found: {0}")]
    DriverNotFound(String),
}

impl HalError {
    /// True for configuration-class failures (fatal to init).
    pub fn is_config_error(&self) -> bool {
        matches!(self, HalError::ConfigError(_) | HalError::Validation { .. })
    }

    /// The violated rule, if this is a validation failure.
    pub fn validation_rule(&self) -> Option<ValidationRule> {
        match self {
            HalError::Validation { rule, .. } => Some(*rule),
            _ => None,
        }
    }
}

/// Factory function type for creating driver instances.
pub type DriverFactory = fn() -> Box<dyn SystemInterface>;

/// Optional driver diagnostics.
#[derive(Debug, Clone, Default)]
pub struct DriverDiagnostics {
    /// Number of read cycles executed
    pub cycle_count: u64,
    /// Serial lines received
    pub lines_received: u64,
    /// Tokens written to the serial device
    pub tokens_written: u64,
    /// Failed serial writes
    pub write_faults: u64,
    /// Driver-specific diagnostics (JSON string)
    pub custom: Option<String>,
}

/// Trait defining the lifecycle and cyclic contract of a hardware adapter.
///
/// A host drives the adapter through this trait and talks to it only via
/// the exported interface handles.
///
/// # Lifecycle
///
/// 1. `on_init()` - Validate the description, allocate buffers
/// 2. `on_configure()` - Reset buffers (Unconfigured/Inactive → Inactive)
/// 3. `export_state_interfaces()` / `export_command_interfaces()`
/// 4. `on_activate()` - Open hardware (Inactive → Active)
/// 5. `read()` then `write()` once per control period while Active
/// 6. `on_deactivate()` - Close hardware (Active → Inactive)
/// 7. `on_shutdown()` - Terminal (→ Finalized)
///
/// The host calls `read`/`write` only while Active; drivers do not guard
/// against calls in other states.
pub trait SystemInterface: Send {
    /// Returns the driver's unique identifier.
    fn name(&self) -> &'static str;

    /// Returns the driver's semantic version.
    fn version(&self) -> &'static str;

    /// Current lifecycle state, `None` until `on_init` succeeds.
    fn lifecycle_state(&self) -> Option<LifecycleState>;

    /// Validate `info` and allocate buffers.
    ///
    /// # Errors
    /// `HalError::ConfigError` / `HalError::Validation` on any description
    /// problem. A failed instance must be discarded.
    fn on_init(&mut self, info: &HardwareInfo, ctx: HalContext) -> Result<(), HalError>;

    /// Reset all buffers to zero and enter Inactive.
    fn on_configure(&mut self) -> Result<(), HalError>;

    /// Return from Inactive to Unconfigured.
    fn on_cleanup(&mut self) -> Result<(), HalError>;

    /// Handles onto the state buffers, joints first then GPIO inputs.
    fn export_state_interfaces(&self) -> Vec<StateInterface>;

    /// Handles onto the command buffers, joints first then GPIO outputs.
    fn export_command_interfaces(&self) -> Vec<CommandInterface>;

    /// Open hardware and enter Active.
    ///
    /// # Errors
    /// `HalError::ConnectionError` if the device cannot be opened; the
    /// driver stays Inactive.
    fn on_activate(&mut self) -> Result<(), HalError>;

    /// Close hardware and return to Inactive. Close failures are logged.
    fn on_deactivate(&mut self) -> Result<(), HalError>;

    /// Close hardware if needed and enter Finalized.
    fn on_shutdown(&mut self) -> Result<(), HalError>;

    /// Update state buffers for this period.
    ///
    /// # Arguments
    /// * `time` - Time of this control step
    /// * `period` - Time since the previous step
    fn read(&mut self, time: Instant, period: Duration) -> Result<(), HalError>;

    /// Push command buffers toward the hardware.
    ///
    /// # Errors
    /// `HalError::TransportFault` if the device write fails; the cycle is
    /// failed for this period only.
    fn write(&mut self, time: Instant, period: Duration) -> Result<(), HalError>;

    /// Get driver-specific diagnostics.
    /// Default: None
    fn diagnostics(&self) -> Option<DriverDiagnostics> {
        None
    }
}
