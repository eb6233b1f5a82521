//! RRBot adapter lifecycle integration tests.
//!
//! Drives `RrbotSystemWithGpio` through init → configure → activate →
//! read/write → deactivate → shutdown on an in-memory serial device and
//! checks buffers through the exported handles.

use rrbot_common::prelude::*;
use rrbot_hal::drivers::rrbot::RrbotSystemWithGpio;
use rrbot_hal::serial::{LoopbackSerial, SerialTransport};
use std::collections::HashMap;
use std::time::{Duration, Instant};

const PORT: &str = "/dev/ttyUSB0";
const PERIOD: Duration = Duration::from_millis(10);

fn rrbot_hardware() -> HardwareInfo {
    HardwareInfo {
        name: "RRBotSystemWithGPIO".to_string(),
        hardware_parameters: HashMap::from([("port".to_string(), PORT.to_string())]),
        joints: vec![
            ComponentInfo::new("joint1", &["position"], &["position"]),
            ComponentInfo::new("joint2", &["position"], &["position"]),
        ],
        gpios: vec![
            ComponentInfo::new(
                "flange_analog_IOs",
                &["analog_output1"],
                &["analog_output1", "analog_input1", "analog_input2"],
            ),
            ComponentInfo::new("flange_vacuum", &["vacuum"], &["vacuum"]),
        ],
    }
}

fn with_parameter(key: &str, value: &str) -> HardwareInfo {
    let mut hw = rrbot_hardware();
    hw.hardware_parameters
        .insert(key.to_string(), value.to_string());
    hw
}

/// Adapter plus a handle on its in-memory serial device.
fn new_adapter() -> (RrbotSystemWithGpio<LoopbackSerial>, LoopbackSerial) {
    let serial = LoopbackSerial::new();
    let device = serial.clone();
    (RrbotSystemWithGpio::new(serial), device)
}

fn initialized(hw: &HardwareInfo) -> (RrbotSystemWithGpio<LoopbackSerial>, LoopbackSerial) {
    let (mut adapter, device) = new_adapter();
    adapter
        .on_init(hw, HalContext::new(&hw.name))
        .expect("init");
    (adapter, device)
}

fn active() -> (RrbotSystemWithGpio<LoopbackSerial>, LoopbackSerial) {
    let (mut adapter, device) = initialized(&rrbot_hardware());
    adapter.on_configure().expect("configure");
    adapter.on_activate().expect("activate");
    (adapter, device)
}

fn state<'a>(handles: &'a [StateInterface], name: &str) -> &'a StateInterface {
    handles
        .iter()
        .find(|h| h.full_name() == name)
        .unwrap_or_else(|| panic!("no state interface {name}"))
}

fn command<'a>(handles: &'a [CommandInterface], name: &str) -> &'a CommandInterface {
    handles
        .iter()
        .find(|h| h.full_name() == name)
        .unwrap_or_else(|| panic!("no command interface {name}"))
}

fn init_error(hw: &HardwareInfo) -> HalError {
    let (mut adapter, _device) = new_adapter();
    let err = adapter
        .on_init(hw, HalContext::new(&hw.name))
        .expect_err("init should fail");
    assert!(adapter.buffers().is_none());
    assert_eq!(adapter.lifecycle_state(), None);
    err
}

// =============================================================================
// on_init
// =============================================================================

#[test]
fn test_init_without_port_fails_before_allocation() {
    let mut hw = rrbot_hardware();
    hw.hardware_parameters.clear();

    let err = init_error(&hw);
    assert!(matches!(err, HalError::ConfigError(_)));
    assert!(err.to_string().contains("port"));
}

#[test]
fn test_init_allocates_nan_buffers() {
    let (adapter, _device) = initialized(&rrbot_hardware());

    assert_eq!(adapter.lifecycle_state(), Some(LifecycleState::Unconfigured));
    assert_eq!(adapter.port(), Some(PORT));

    let buffers = adapter.buffers().expect("buffers");
    assert_eq!(buffers.joint_count(), 2);
    assert!(buffers.joint_states.iter().all(|v| v.get().is_nan()));
    assert!(buffers.joint_commands.iter().all(|v| v.get().is_nan()));
    assert!(buffers.gpio_in_values().iter().all(|v| v.is_nan()));
    assert!(buffers.gpio_out_values().iter().all(|v| v.is_nan()));
}

#[test]
fn test_init_twice_is_rejected() {
    let hw = rrbot_hardware();
    let (mut adapter, _device) = initialized(&hw);
    let err = adapter
        .on_init(&hw, HalContext::new(&hw.name))
        .unwrap_err();
    assert!(err.is_config_error());
}

#[test]
fn test_init_reports_each_validation_rule() {
    let mut hw = rrbot_hardware();
    hw.joints[0].command_interfaces.push(InterfaceInfo::new("velocity"));
    assert_eq!(
        init_error(&hw).validation_rule(),
        Some(ValidationRule::JointCommandInterfaceCount)
    );

    let mut hw = rrbot_hardware();
    hw.joints[1].command_interfaces[0].name = "velocity".to_string();
    assert_eq!(
        init_error(&hw).validation_rule(),
        Some(ValidationRule::JointCommandInterfaceName)
    );

    let mut hw = rrbot_hardware();
    hw.joints[0].state_interfaces.clear();
    assert_eq!(
        init_error(&hw).validation_rule(),
        Some(ValidationRule::JointStateInterfaceCount)
    );

    let mut hw = rrbot_hardware();
    hw.joints[0].state_interfaces[0].name = "effort".to_string();
    assert_eq!(
        init_error(&hw).validation_rule(),
        Some(ValidationRule::JointStateInterfaceName)
    );

    let mut hw = rrbot_hardware();
    hw.gpios.pop();
    assert_eq!(
        init_error(&hw).validation_rule(),
        Some(ValidationRule::GpioComponentCount)
    );

    let mut hw = rrbot_hardware();
    hw.gpios[1].command_interfaces.push(InterfaceInfo::new("blow_off"));
    assert_eq!(
        init_error(&hw).validation_rule(),
        Some(ValidationRule::GpioCommandInterfaceCount)
    );

    let mut hw = rrbot_hardware();
    hw.gpios[0].state_interfaces.pop();
    let err = init_error(&hw);
    assert_eq!(
        err.validation_rule(),
        Some(ValidationRule::GpioStateInterfaceCount)
    );
    assert!(err.to_string().contains("flange_analog_IOs"));
}

#[test]
fn test_init_rejects_malformed_noise_seed() {
    let err = init_error(&with_parameter("gpio_noise_seed", "not-a-number"));
    assert!(matches!(err, HalError::ConfigError(_)));
}

// =============================================================================
// Export
// =============================================================================

#[test]
fn test_export_before_init_is_empty() {
    let (adapter, _device) = new_adapter();
    assert!(adapter.export_state_interfaces().is_empty());
    assert!(adapter.export_command_interfaces().is_empty());
}

#[test]
fn test_export_order_and_names() {
    let (adapter, _device) = initialized(&rrbot_hardware());

    let states: Vec<String> = adapter
        .export_state_interfaces()
        .iter()
        .map(StateInterface::full_name)
        .collect();
    assert_eq!(
        states,
        vec![
            "joint1/position",
            "joint2/position",
            "flange_analog_IOs/analog_output1",
            "flange_analog_IOs/analog_input1",
            "flange_analog_IOs/analog_input2",
            "flange_vacuum/vacuum",
        ]
    );

    let commands: Vec<String> = adapter
        .export_command_interfaces()
        .iter()
        .map(CommandInterface::full_name)
        .collect();
    assert_eq!(
        commands,
        vec![
            "joint1/position",
            "joint2/position",
            "flange_analog_IOs/analog_output1",
            "flange_vacuum/vacuum",
        ]
    );
}

#[test]
fn test_handles_bind_buffer_slots() {
    let (adapter, _device) = initialized(&rrbot_hardware());
    let buffers = adapter.buffers().expect("buffers");
    let states = adapter.export_state_interfaces();
    let commands = adapter.export_command_interfaces();

    assert!(state(&states, "joint2/position").slot().same_slot(&buffers.joint_states[1]));
    assert!(state(&states, "flange_vacuum/vacuum").slot().same_slot(&buffers.gpio_in[3]));
    assert!(
        command(&commands, "flange_analog_IOs/analog_output1")
            .slot()
            .same_slot(&buffers.gpio_out[0])
    );
    assert!(command(&commands, "flange_vacuum/vacuum").slot().same_slot(&buffers.gpio_out[1]));
}

// =============================================================================
// Lifecycle transitions
// =============================================================================

#[test]
fn test_configure_zeroes_every_buffer() {
    let (mut adapter, _device) = initialized(&rrbot_hardware());
    adapter.on_configure().expect("configure");

    assert_eq!(adapter.lifecycle_state(), Some(LifecycleState::Inactive));
    let buffers = adapter.buffers().expect("buffers");
    assert!(buffers.joint_states.iter().all(|v| v.get() == 0.0));
    assert!(buffers.joint_commands.iter().all(|v| v.get() == 0.0));
    assert_eq!(buffers.gpio_in_values(), [0.0; 4]);
    assert_eq!(buffers.gpio_out_values(), [0.0; 2]);

    // Reconfiguring an Inactive adapter resets again.
    buffers.gpio_out[1].set(0.27);
    adapter.on_configure().expect("reconfigure");
    assert_eq!(adapter.buffers().unwrap().gpio_out_values(), [0.0; 2]);
}

#[test]
fn test_lifecycle_calls_before_init() {
    let (mut adapter, _device) = new_adapter();
    assert!(matches!(adapter.on_configure(), Err(HalError::NotInitialized)));
    assert!(matches!(adapter.on_activate(), Err(HalError::NotInitialized)));
    assert!(matches!(
        adapter.read(Instant::now(), PERIOD),
        Err(HalError::NotInitialized)
    ));
}

#[test]
fn test_activate_requires_configure() {
    let (mut adapter, device) = initialized(&rrbot_hardware());
    let err = adapter.on_activate().unwrap_err();
    assert!(matches!(
        err,
        HalError::InvalidTransition {
            from: LifecycleState::Unconfigured,
            event: LifecycleEvent::Activate,
            ..
        }
    ));
    assert!(!device.is_open());
}

#[test]
fn test_activate_holds_current_position_and_opens_port() {
    let (mut adapter, device) = initialized(&rrbot_hardware());
    adapter.on_configure().expect("configure");

    let buffers = adapter.buffers().expect("buffers");
    buffers.joint_states[0].set(1.5);
    buffers.joint_states[1].set(-0.25);
    buffers.joint_commands[0].set(9.0);

    adapter.on_activate().expect("activate");

    assert_eq!(adapter.lifecycle_state(), Some(LifecycleState::Active));
    let buffers = adapter.buffers().expect("buffers");
    for (state, command) in buffers.joint_states.iter().zip(&buffers.joint_commands) {
        assert_eq!(state.get(), command.get());
    }
    assert_eq!(device.connection(), Some((PORT.to_string(), SERIAL_BAUD_RATE)));
}

#[test]
fn test_activate_fails_and_stays_inactive_when_port_unavailable() {
    let (mut adapter, device) = initialized(&rrbot_hardware());
    adapter.on_configure().expect("configure");
    device.fail_open(true);

    let err = adapter.on_activate().unwrap_err();
    assert!(matches!(err, HalError::ConnectionError(_)));
    assert_eq!(adapter.lifecycle_state(), Some(LifecycleState::Inactive));
    assert!(!device.is_open());

    device.fail_open(false);
    adapter.on_activate().expect("activate after device returns");
    assert_eq!(adapter.lifecycle_state(), Some(LifecycleState::Active));
}

#[test]
fn test_deactivate_closes_port() {
    let (mut adapter, device) = active();
    adapter.on_deactivate().expect("deactivate");

    assert_eq!(adapter.lifecycle_state(), Some(LifecycleState::Inactive));
    assert!(!device.is_open());

    // Deactivating twice is not a valid transition.
    assert!(matches!(
        adapter.on_deactivate(),
        Err(HalError::InvalidTransition { .. })
    ));
}

#[test]
fn test_deactivate_completes_even_if_close_fails() {
    let (mut adapter, device) = active();
    device.fail_close(true);

    adapter.on_deactivate().expect("deactivate despite close error");
    assert_eq!(adapter.lifecycle_state(), Some(LifecycleState::Inactive));
    assert!(!device.is_open());
}

#[test]
fn test_reactivate_after_deactivate() {
    let (mut adapter, device) = active();
    adapter.on_deactivate().expect("deactivate");
    adapter.on_activate().expect("reactivate");
    assert!(device.is_open());
}

#[test]
fn test_cleanup_returns_to_unconfigured() {
    let (mut adapter, _device) = initialized(&rrbot_hardware());
    adapter.on_configure().expect("configure");
    adapter.on_cleanup().expect("cleanup");
    assert_eq!(adapter.lifecycle_state(), Some(LifecycleState::Unconfigured));
    assert!(adapter.on_activate().is_err());

    adapter.on_configure().expect("configure again");
    adapter.on_activate().expect("activate");
    assert!(matches!(
        adapter.on_cleanup(),
        Err(HalError::InvalidTransition { .. })
    ));
}

#[test]
fn test_shutdown_from_active_finalizes() {
    let (mut adapter, device) = active();
    adapter.on_shutdown().expect("shutdown");

    assert_eq!(adapter.lifecycle_state(), Some(LifecycleState::Finalized));
    assert!(!device.is_open());
    assert!(matches!(
        adapter.on_configure(),
        Err(HalError::InvalidTransition {
            from: LifecycleState::Finalized,
            ..
        })
    ));
    assert!(adapter.on_shutdown().is_err());
}

#[test]
fn test_drop_closes_open_port() {
    let (adapter, device) = active();
    assert!(device.is_open());
    drop(adapter);
    assert!(!device.is_open());
}

// =============================================================================
// read
// =============================================================================

#[test]
fn test_read_single_step_convergence() {
    let (mut adapter, _device) = active();
    let states = adapter.export_state_interfaces();
    let commands = adapter.export_command_interfaces();

    assert_eq!(state(&states, "joint1/position").get_value(), 0.0);
    command(&commands, "joint1/position").set_value(10.0);
    command(&commands, "joint2/position").set_value(-3.5);

    adapter.read(Instant::now(), PERIOD).expect("read");

    assert_eq!(state(&states, "joint1/position").get_value(), 10.0);
    assert_eq!(state(&states, "joint2/position").get_value(), -3.5);
}

#[test]
fn test_read_mirrors_gpio_outputs_on_every_read() {
    let (mut adapter, _device) = active();
    let states = adapter.export_state_interfaces();
    let commands = adapter.export_command_interfaces();

    command(&commands, "flange_analog_IOs/analog_output1").set_value(0.75);
    command(&commands, "flange_vacuum/vacuum").set_value(0.27);

    for _ in 0..3 {
        adapter.read(Instant::now(), PERIOD).expect("read");
        assert_eq!(
            state(&states, "flange_analog_IOs/analog_output1").get_value(),
            0.75
        );
        assert_eq!(state(&states, "flange_vacuum/vacuum").get_value(), 0.27);
    }
}

#[test]
fn test_read_fills_analog_inputs_with_noise() {
    let (mut adapter, _device) = active();
    let states = adapter.export_state_interfaces();
    adapter.read(Instant::now(), PERIOD).expect("read");

    let upper = i32::MAX as f64 + 1.0;
    for name in [
        "flange_analog_IOs/analog_input1",
        "flange_analog_IOs/analog_input2",
    ] {
        let value = state(&states, name).get_value();
        assert!((0.0..=upper).contains(&value), "{name} = {value}");
        assert_eq!(value.fract(), 0.0);
    }
}

#[test]
fn test_fixed_noise_seed_is_reproducible() {
    let hw = with_parameter("gpio_noise_seed", "42");
    let sample = || {
        let (mut adapter, _device) = initialized(&hw);
        adapter.on_configure().expect("configure");
        adapter.on_activate().expect("activate");
        adapter.read(Instant::now(), PERIOD).expect("read");
        adapter.buffers().unwrap().gpio_in_values()
    };
    assert_eq!(sample(), sample());
}

#[test]
fn test_read_consumes_one_line_per_period() {
    let (mut adapter, device) = active();
    device.push_line("vacuum on");
    device.push_line("vacuum off");

    adapter.read(Instant::now(), PERIOD).expect("read");
    assert_eq!(device.pending_lines(), 1);

    adapter.read(Instant::now(), PERIOD).expect("read");
    assert_eq!(device.pending_lines(), 0);

    // Nothing queued: read still succeeds.
    adapter.read(Instant::now(), PERIOD).expect("read");

    let diag = adapter.diagnostics().expect("diagnostics");
    assert_eq!(diag.cycle_count, 3);
    assert_eq!(diag.lines_received, 2);
}

#[test]
fn test_read_swallows_serial_read_fault() {
    let (mut adapter, device) = active();
    let states = adapter.export_state_interfaces();
    let commands = adapter.export_command_interfaces();
    command(&commands, "joint1/position").set_value(2.0);
    command(&commands, "flange_vacuum/vacuum").set_value(0.27);

    device.push_line("garbled");
    device.fail_read(true);

    adapter.read(Instant::now(), PERIOD).expect("read never fails");

    assert_eq!(state(&states, "joint1/position").get_value(), 2.0);
    assert_eq!(state(&states, "flange_vacuum/vacuum").get_value(), 0.27);
    assert_eq!(adapter.sampler_stats().read_errors, 1);

    let diag = adapter.diagnostics().expect("diagnostics");
    assert_eq!(diag.lines_received, 0);
    assert!(diag.custom.expect("custom").contains("\"read_errors\":1"));
}

// =============================================================================
// write
// =============================================================================

#[test]
fn test_write_token_selection() {
    let (mut adapter, device) = active();
    let commands = adapter.export_command_interfaces();
    let vacuum = command(&commands, "flange_vacuum/vacuum");
    device.push_line("ready");

    for value in [0.0, 0.26999999, 0.27, 1.0] {
        vacuum.set_value(value);
        adapter.write(Instant::now(), PERIOD).expect("write");
    }

    assert_eq!(device.written(), vec!["0", "0", "1", "0"]);
    assert_eq!(adapter.diagnostics().unwrap().tokens_written, 4);
}

#[test]
fn test_write_ignores_other_outputs() {
    let (mut adapter, device) = active();
    let commands = adapter.export_command_interfaces();
    command(&commands, "flange_analog_IOs/analog_output1").set_value(0.27);
    device.push_line("ready");

    adapter.write(Instant::now(), PERIOD).expect("write");
    assert_eq!(device.written(), vec!["0"]);
}

#[test]
fn test_write_skipped_when_no_data_available() {
    let (mut adapter, device) = active();
    let commands = adapter.export_command_interfaces();
    command(&commands, "flange_vacuum/vacuum").set_value(0.27);

    adapter.write(Instant::now(), PERIOD).expect("write");
    assert!(device.written().is_empty());
}

#[test]
fn test_write_fault_is_surfaced() {
    let (mut adapter, device) = active();
    device.push_line("ready");
    device.fail_write(true);

    let err = adapter.write(Instant::now(), PERIOD).unwrap_err();
    assert!(matches!(err, HalError::TransportFault(_)));
    assert_eq!(adapter.diagnostics().unwrap().write_faults, 1);

    // Next period goes through once the device recovers.
    device.fail_write(false);
    adapter.write(Instant::now(), PERIOD).expect("write");
    assert_eq!(device.written(), vec!["0"]);
}

#[test]
fn test_diagnostics_custom_json() {
    let (adapter, _device) = active();
    let custom = adapter.diagnostics().unwrap().custom.expect("custom");
    assert!(custom.contains(PORT));
    assert!(custom.contains("\"serial_open\":true"));
    assert!(custom.contains("\"lifecycle\":\"active\""));
    assert!(custom.contains("\"cycle_enabled\":true"));
}

#[test]
fn test_diagnostics_cycle_disabled_when_inactive() {
    let (mut adapter, _device) = active();
    adapter.on_deactivate().expect("deactivate");
    let custom = adapter.diagnostics().unwrap().custom.expect("custom");
    assert!(custom.contains("\"cycle_enabled\":false"));

    let (fresh, _device) = new_adapter();
    let custom = fresh.diagnostics().unwrap().custom.expect("custom");
    assert!(custom.contains("\"cycle_enabled\":false"));
}
