//! Prelude module for common re-exports.
//!
//! ```rust
//! use rrbot_common::prelude::*;
//! ```

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{ConfigError, ConfigLoader, LogLevel, SharedConfig};
pub use crate::hal::config::{ComponentInfo, HalConfig, HardwareInfo, InterfaceInfo};

// ─── Driver contract ────────────────────────────────────────────────
pub use crate::hal::driver::{
    DriverDiagnostics, DriverFactory, HalError, SystemInterface, ValidationRule,
};
pub use crate::hal::types::{
    CommandInterface, HalContext, InterfaceValue, LifecycleEvent, LifecycleState,
    StateInterface,
};

// ─── Constants ──────────────────────────────────────────────────────
pub use crate::hal::consts::{HW_IF_POSITION, SERIAL_BAUD_RATE};
