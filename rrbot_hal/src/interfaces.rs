//! Interface registry for the RRBot adapter.
//!
//! Validates a hardware description against the adapter's fixed
//! cardinalities and binds exported handles to buffer slots.
//!
//! Slot binding follows declaration order: joint `i` binds `state[i]` /
//! `command[i]`; the N-th GPIO state interface (counting across components
//! in declaration order) binds `gpio_in[N]`, the N-th GPIO command
//! interface binds `gpio_out[N]`.

use heapless::Vec as FixedVec;
use rrbot_common::hal::config::{ComponentInfo, HardwareInfo};
use rrbot_common::hal::consts::{
    GPIO_COMMAND_INTERFACES_PER_COMPONENT, GPIO_COMPONENT_COUNT, GPIO_IN_SLOTS, GPIO_OUT_SLOTS,
    GPIO_STATE_INTERFACE_COUNTS, HW_IF_POSITION,
};
use rrbot_common::hal::driver::{HalError, ValidationRule};
use rrbot_common::hal::types::{CommandInterface, InterfaceValue, StateInterface};
use tracing::{info, warn};

/// Buffers backing every exported handle.
#[derive(Debug, Clone)]
pub struct InterfaceBuffers {
    /// Joint position states, one per joint
    pub joint_states: Vec<InterfaceValue>,
    /// Joint position commands, one per joint
    pub joint_commands: Vec<InterfaceValue>,
    /// GPIO inputs (state), populated by `read`
    pub gpio_in: FixedVec<InterfaceValue, GPIO_IN_SLOTS>,
    /// GPIO outputs (command), written by the host
    pub gpio_out: FixedVec<InterfaceValue, GPIO_OUT_SLOTS>,
}

impl InterfaceBuffers {
    /// Allocate buffers for `joint_count` joints, every slot NaN.
    pub fn allocate(joint_count: usize) -> Self {
        let nan = || InterfaceValue::new(f64::NAN);
        Self {
            joint_states: (0..joint_count).map(|_| nan()).collect(),
            joint_commands: (0..joint_count).map(|_| nan()).collect(),
            gpio_in: (0..GPIO_IN_SLOTS).map(|_| nan()).collect(),
            gpio_out: (0..GPIO_OUT_SLOTS).map(|_| nan()).collect(),
        }
    }

    /// Number of joints.
    pub fn joint_count(&self) -> usize {
        self.joint_states.len()
    }

    /// Set every slot of all four buffers to zero.
    pub fn reset(&self) {
        self.joint_states
            .iter()
            .chain(&self.joint_commands)
            .chain(self.gpio_in.iter())
            .chain(self.gpio_out.iter())
            .for_each(|slot| slot.set(0.0));
    }

    /// Copy each joint state into its command so activation causes no jump.
    pub fn hold_current_position(&self) {
        for (state, command) in self.joint_states.iter().zip(&self.joint_commands) {
            command.set(state.get());
        }
    }

    /// Current GPIO input values.
    pub fn gpio_in_values(&self) -> [f64; GPIO_IN_SLOTS] {
        std::array::from_fn(|i| self.gpio_in[i].get())
    }

    /// Current GPIO output values.
    pub fn gpio_out_values(&self) -> [f64; GPIO_OUT_SLOTS] {
        std::array::from_fn(|i| self.gpio_out[i].get())
    }
}

fn violation(rule: ValidationRule, message: String) -> HalError {
    HalError::Validation { rule, message }
}

/// Check the description against the adapter's interface contract.
///
/// Rules are checked in order and the first violation is returned:
/// 1. every joint has exactly one `position` command and one `position` state
/// 2. exactly two GPIO components
/// 3. each GPIO component has exactly one command interface
/// 4. GPIO 0 has 3 state interfaces, GPIO 1 has 1
pub fn validate(info: &HardwareInfo) -> Result<(), HalError> {
    for joint in &info.joints {
        validate_joint(joint)?;
    }

    if info.gpios.len() != GPIO_COMPONENT_COUNT {
        return Err(violation(
            ValidationRule::GpioComponentCount,
            format!(
                "{} has '{}' GPIO components, '{}' expected.",
                info.name,
                info.gpios.len(),
                GPIO_COMPONENT_COUNT
            ),
        ));
    }

    for gpio in &info.gpios {
        if gpio.command_interfaces.len() != GPIO_COMMAND_INTERFACES_PER_COMPONENT {
            return Err(violation(
                ValidationRule::GpioCommandInterfaceCount,
                format!(
                    "GPIO component {} has '{}' command interfaces, '{}' expected.",
                    gpio.name,
                    gpio.command_interfaces.len(),
                    GPIO_COMMAND_INTERFACES_PER_COMPONENT
                ),
            ));
        }
    }

    for (gpio, &expected) in info.gpios.iter().zip(&GPIO_STATE_INTERFACE_COUNTS) {
        if gpio.state_interfaces.len() != expected {
            return Err(violation(
                ValidationRule::GpioStateInterfaceCount,
                format!(
                    "GPIO component {} has '{}' state interfaces, '{}' expected.",
                    gpio.name,
                    gpio.state_interfaces.len(),
                    expected
                ),
            ));
        }
    }

    Ok(())
}

fn validate_joint(joint: &ComponentInfo) -> Result<(), HalError> {
    if joint.command_interfaces.len() != 1 {
        return Err(violation(
            ValidationRule::JointCommandInterfaceCount,
            format!(
                "Joint '{}' has {} command interfaces found. 1 expected.",
                joint.name,
                joint.command_interfaces.len()
            ),
        ));
    }
    if joint.command_interfaces[0].name != HW_IF_POSITION {
        return Err(violation(
            ValidationRule::JointCommandInterfaceName,
            format!(
                "Joint '{}' has {} command interface. '{}' expected.",
                joint.name, joint.command_interfaces[0].name, HW_IF_POSITION
            ),
        ));
    }
    if joint.state_interfaces.len() != 1 {
        return Err(violation(
            ValidationRule::JointStateInterfaceCount,
            format!(
                "Joint '{}' has {} state interfaces. 1 expected.",
                joint.name,
                joint.state_interfaces.len()
            ),
        ));
    }
    if joint.state_interfaces[0].name != HW_IF_POSITION {
        return Err(violation(
            ValidationRule::JointStateInterfaceName,
            format!(
                "Joint '{}' has {} state interface. '{}' expected.",
                joint.name, joint.state_interfaces[0].name, HW_IF_POSITION
            ),
        ));
    }
    Ok(())
}

/// Build state handles: joint positions, then GPIO state interfaces.
pub fn export_state_handles(info: &HardwareInfo, buffers: &InterfaceBuffers) -> Vec<StateInterface> {
    let mut handles: Vec<StateInterface> = info
        .joints
        .iter()
        .zip(&buffers.joint_states)
        .map(|(joint, slot)| StateInterface::new(&joint.name, HW_IF_POSITION, slot.clone()))
        .collect();

    info!("State interfaces:");
    let gpio_states = info
        .gpios
        .iter()
        .flat_map(|gpio| gpio.state_interfaces.iter().map(move |i| (gpio, i)));
    for (slot_idx, (gpio, interface)) in gpio_states.enumerate() {
        let Some(slot) = buffers.gpio_in.get(slot_idx) else {
            warn!("No GPIO input slot for {}/{}", gpio.name, interface.name);
            continue;
        };
        handles.push(StateInterface::new(&gpio.name, &interface.name, slot.clone()));
        info!("Added {}/{}", gpio.name, interface.name);
    }

    handles
}

/// Build command handles: joint positions, then GPIO command interfaces.
pub fn export_command_handles(
    info: &HardwareInfo,
    buffers: &InterfaceBuffers,
) -> Vec<CommandInterface> {
    let mut handles: Vec<CommandInterface> = info
        .joints
        .iter()
        .zip(&buffers.joint_commands)
        .map(|(joint, slot)| CommandInterface::new(&joint.name, HW_IF_POSITION, slot.clone()))
        .collect();

    info!("Command interfaces:");
    let gpio_commands = info
        .gpios
        .iter()
        .flat_map(|gpio| gpio.command_interfaces.iter().map(move |i| (gpio, i)));
    for (slot_idx, (gpio, interface)) in gpio_commands.enumerate() {
        let Some(slot) = buffers.gpio_out.get(slot_idx) else {
            warn!("No GPIO output slot for {}/{}", gpio.name, interface.name);
            continue;
        };
        handles.push(CommandInterface::new(&gpio.name, &interface.name, slot.clone()));
        info!("Added {}/{}", gpio.name, interface.name);
    }

    handles
}
