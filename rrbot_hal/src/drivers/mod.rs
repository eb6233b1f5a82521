//! HAL driver implementations.
//!
//! - [`rrbot`] - RRBot two-joint system with GPIO and serial relay
//!
//! # Adding New Drivers
//!
//! 1. Create a new submodule under `drivers/`
//! 2. Implement the `SystemInterface` trait from `rrbot_common::hal::driver`
//! 3. Register its factory in [`register_all_drivers`]

pub mod rrbot;

use crate::driver_registry::DriverRegistry;
use rrbot_common::hal::consts::{RRBOT_DRIVER_NAME, RRBOT_LOOPBACK_DRIVER_NAME};

/// Register all built-in drivers.
pub fn register_all_drivers(registry: &mut DriverRegistry) {
    registry.register(RRBOT_DRIVER_NAME, rrbot::create_driver);
    registry.register(RRBOT_LOOPBACK_DRIVER_NAME, rrbot::create_loopback_driver);
}

/// A registry holding every built-in driver.
pub fn builtin_registry() -> DriverRegistry {
    let mut registry = DriverRegistry::new();
    register_all_drivers(&mut registry);
    registry
}
