//! HAL configuration types.
//!
//! This module contains configuration types for the hardware abstraction layer:
//! - `HalConfig` - Host configuration loaded from the HAL TOML file
//! - `HardwareInfo` - Hardware description handed to a driver at init
//! - `ComponentInfo` / `InterfaceInfo` - Joints and GPIO components

use crate::config::SharedConfig;
use crate::hal::consts::{DEFAULT_CYCLE_TIME_US, RRBOT_DRIVER_NAME};
use crate::hal::driver::HalError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Default function for cycle_time_us
fn default_cycle_time_us() -> u32 {
    DEFAULT_CYCLE_TIME_US
}

/// Default function for driver
fn default_driver() -> String {
    RRBOT_DRIVER_NAME.to_string()
}

/// Host configuration loaded from the HAL TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HalConfig {
    /// Control period in microseconds.
    #[serde(default = "default_cycle_time_us")]
    pub cycle_time_us: u32,

    /// Registry name of the driver to load.
    #[serde(default = "default_driver")]
    pub driver: String,

    /// Stop after this many cycles (0 = run until signalled).
    #[serde(default)]
    pub max_cycles: u64,

    /// Logging and service identity.
    #[serde(default)]
    pub shared: SharedConfig,

    /// Hardware description passed to the driver.
    pub hardware: HardwareInfo,

    /// Command values written by the host every period,
    /// keyed by `"<component>/<interface>"`.
    #[serde(default)]
    pub setpoints: BTreeMap<String, f64>,
}

impl HalConfig {
    /// Validate the host configuration.
    ///
    /// # Validation Rules
    /// 1. `cycle_time_us` > 0
    /// 2. `driver` not empty
    /// 3. shared config valid
    /// 4. setpoint values finite
    pub fn validate(&self) -> Result<(), HalError> {
        if self.cycle_time_us == 0 {
            return Err(HalError::ConfigError(
                "cycle_time_us must be greater than 0".to_string(),
            ));
        }

        if self.driver.is_empty() {
            return Err(HalError::ConfigError("driver cannot be empty".to_string()));
        }

        self.shared
            .validate()
            .map_err(|e| HalError::ConfigError(e.to_string()))?;

        if let Some((name, value)) = self.setpoints.iter().find(|(_, v)| !v.is_finite()) {
            return Err(HalError::ConfigError(format!(
                "Setpoint '{}' is not finite: {}",
                name, value
            )));
        }

        Ok(())
    }
}

/// One named interface of a component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterfaceInfo {
    /// Interface name (e.g. "position", "analog_output1")
    pub name: String,
}

impl InterfaceInfo {
    /// Create an interface description.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// A joint or GPIO component with its ordered interfaces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentInfo {
    /// Component name (unique within its category)
    pub name: String,

    /// Command interfaces in declaration order
    #[serde(default)]
    pub command_interfaces: Vec<InterfaceInfo>,

    /// State interfaces in declaration order
    #[serde(default)]
    pub state_interfaces: Vec<InterfaceInfo>,
}

impl ComponentInfo {
    /// Build a component from interface name lists.
    pub fn new(name: impl Into<String>, command: &[&str], state: &[&str]) -> Self {
        Self {
            name: name.into(),
            command_interfaces: command.iter().map(|n| InterfaceInfo::new(*n)).collect(),
            state_interfaces: state.iter().map(|n| InterfaceInfo::new(*n)).collect(),
        }
    }
}

/// Hardware description handed to a driver's `on_init`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HardwareInfo {
    /// Hardware component name (used as the logger name)
    pub name: String,

    /// Free-form driver parameters (e.g. `port`)
    #[serde(default, rename = "parameters")]
    pub hardware_parameters: HashMap<String, String>,

    /// Joints in declaration order
    #[serde(default)]
    pub joints: Vec<ComponentInfo>,

    /// GPIO components in declaration order
    #[serde(default)]
    pub gpios: Vec<ComponentInfo>,
}

impl HardwareInfo {
    /// Look up a hardware parameter.
    pub fn parameter(&self, key: &str) -> Option<&str> {
        self.hardware_parameters.get(key).map(String::as_str)
    }

    /// Structural validation common to every driver.
    ///
    /// # Validation Rules
    /// 1. `name` not empty
    /// 2. component names not empty and unique within joints / within GPIOs
    /// 3. interface names not empty and unique per component and direction
    pub fn validate(&self) -> Result<(), HalError> {
        if self.name.is_empty() {
            return Err(HalError::ConfigError(
                "Hardware name cannot be empty".to_string(),
            ));
        }

        validate_components("joint", &self.joints)?;
        validate_components("GPIO", &self.gpios)?;
        Ok(())
    }
}

fn validate_components(kind: &str, components: &[ComponentInfo]) -> Result<(), HalError> {
    let mut names = HashSet::new();
    for (idx, component) in components.iter().enumerate() {
        if component.name.is_empty() {
            return Err(HalError::ConfigError(format!(
                "{} {} has empty name",
                kind, idx
            )));
        }
        if !names.insert(component.name.as_str()) {
            return Err(HalError::ConfigError(format!(
                "Duplicate {} name: {}",
                kind, component.name
            )));
        }
        check_interface_names(kind, component, "command", &component.command_interfaces)?;
        check_interface_names(kind, component, "state", &component.state_interfaces)?;
    }
    Ok(())
}

fn check_interface_names(
    kind: &str,
    component: &ComponentInfo,
    direction: &str,
    interfaces: &[InterfaceInfo],
) -> Result<(), HalError> {
    let mut seen = HashSet::new();
    for interface in interfaces {
        if interface.name.is_empty() {
            return Err(HalError::ConfigError(format!(
                "{} '{}' has a {} interface with empty name",
                kind, component.name, direction
            )));
        }
        if !seen.insert(interface.name.as_str()) {
            return Err(HalError::ConfigError(format!(
                "{} '{}' declares {} interface '{}' twice",
                kind, component.name, direction, interface.name
            )));
        }
    }
    Ok(())
}
