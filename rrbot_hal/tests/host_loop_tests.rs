//! HalCore host loop integration tests.
//!
//! Loads a host config from a temporary TOML file and runs the adapter on
//! the loopback driver for a fixed number of cycles.

use rrbot_common::hal::consts::{RRBOT_DRIVER_NAME, RRBOT_LOOPBACK_DRIVER_NAME};
use rrbot_common::prelude::*;
use rrbot_hal::core::HalCore;
use rrbot_hal::drivers::builtin_registry;
use std::io::Write;
use std::time::{Duration, Instant};
use tempfile::NamedTempFile;

fn host_toml(port: &str, setpoints: &str) -> String {
    format!(
        r#"
cycle_time_us = 1000
driver = "{RRBOT_LOOPBACK_DRIVER_NAME}"
max_cycles = 5

[shared]
service_name = "rrbot_hal_test"
log_level = "debug"

[hardware]
name = "RRBotSystemWithGPIO"

[hardware.parameters]
port = "{port}"
gpio_noise_seed = "7"

[[hardware.joints]]
name = "joint1"
command_interfaces = [{{ name = "position" }}]
state_interfaces = [{{ name = "position" }}]

[[hardware.joints]]
name = "joint2"
command_interfaces = [{{ name = "position" }}]
state_interfaces = [{{ name = "position" }}]

[[hardware.gpios]]
name = "flange_analog_IOs"
command_interfaces = [{{ name = "analog_output1" }}]
state_interfaces = [
    {{ name = "analog_output1" }},
    {{ name = "analog_input1" }},
    {{ name = "analog_input2" }},
]

[[hardware.gpios]]
name = "flange_vacuum"
command_interfaces = [{{ name = "vacuum" }}]
state_interfaces = [{{ name = "vacuum" }}]

[setpoints]
{setpoints}
"#
    )
}

const DEFAULT_SETPOINTS: &str = r#"
"joint1/position" = 0.5
"flange_analog_IOs/analog_output1" = 1.25
"flange_vacuum/vacuum" = 0.27
"#;

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp file");
    file.write_all(content.as_bytes()).expect("write config");
    file
}

fn load(content: &str) -> HalConfig {
    let file = write_config(content);
    HalCore::load_config(file.path()).expect("load config")
}

fn loopback_core() -> HalCore {
    let config = load(&host_toml("/dev/ttyLOOP0", DEFAULT_SETPOINTS));
    let mut core = HalCore::new(config, builtin_registry()).expect("new");
    core.init(RRBOT_LOOPBACK_DRIVER_NAME).expect("init");
    core
}

#[test]
fn test_load_config_from_file() {
    let config = load(&host_toml("/dev/ttyACM0", DEFAULT_SETPOINTS));

    assert_eq!(config.cycle_time_us, 1000);
    assert_eq!(config.driver, RRBOT_LOOPBACK_DRIVER_NAME);
    assert_eq!(config.max_cycles, 5);
    assert_eq!(config.shared.log_level, LogLevel::Debug);
    assert_eq!(config.hardware.parameter("port"), Some("/dev/ttyACM0"));
    assert_eq!(config.hardware.joints.len(), 2);
    assert_eq!(config.hardware.gpios[0].state_interfaces.len(), 3);
    assert_eq!(config.setpoints.get("flange_vacuum/vacuum"), Some(&0.27));
}

#[test]
fn test_load_config_missing_file() {
    let err = HalCore::load_config(std::path::Path::new("/nonexistent/rrbot_hal.toml"))
        .unwrap_err();
    assert!(matches!(err, HalError::ConfigError(_)));
}

#[test]
fn test_new_rejects_zero_cycle_time() {
    let mut config = load(&host_toml("/dev/ttyLOOP0", ""));
    config.cycle_time_us = 0;
    assert!(HalCore::new(config, builtin_registry()).is_err());
}

#[test]
fn test_init_unknown_driver() {
    let config = load(&host_toml("/dev/ttyLOOP0", ""));
    let mut core = HalCore::new(config, builtin_registry()).expect("new");
    assert!(matches!(
        core.init("ethercat"),
        Err(HalError::DriverNotFound(_))
    ));
    assert_eq!(core.driver_state(), None);
}

#[test]
fn test_init_rejects_unknown_setpoint() {
    let config = load(&host_toml("/dev/ttyLOOP0", r#""joint3/position" = 1.0"#));
    let mut core = HalCore::new(config, builtin_registry()).expect("new");
    let err = core.init(RRBOT_LOOPBACK_DRIVER_NAME).unwrap_err();
    assert!(err.is_config_error());
    assert!(err.to_string().contains("joint3/position"));
}

#[test]
fn test_init_without_port_fails() {
    let toml = host_toml("/dev/ttyLOOP0", "").replace("port = \"/dev/ttyLOOP0\"\n", "");
    let mut core = HalCore::new(load(&toml), builtin_registry()).expect("new");
    let err = core.init(RRBOT_LOOPBACK_DRIVER_NAME).unwrap_err();
    assert!(matches!(err, HalError::ConfigError(_)));
}

#[test]
fn test_activate_failure_leaves_driver_inactive() {
    let config = load(&host_toml("/nonexistent/ttyRRBOT", ""));
    let mut core = HalCore::new(config, builtin_registry()).expect("new");

    let err = core.init(RRBOT_DRIVER_NAME).unwrap_err();
    assert!(matches!(err, HalError::ConnectionError(_)));
    assert_eq!(core.driver_state(), Some(LifecycleState::Inactive));
    assert!(core.run().is_err());

    core.shutdown().expect("shutdown");
    assert_eq!(core.driver_state(), Some(LifecycleState::Finalized));
}

#[test]
fn test_prepare_exports_without_activating() {
    let config = load(&host_toml("/dev/ttyLOOP0", DEFAULT_SETPOINTS));
    let mut core = HalCore::new(config, builtin_registry()).expect("new");
    core.prepare(RRBOT_LOOPBACK_DRIVER_NAME).expect("prepare");

    assert_eq!(core.driver_state(), Some(LifecycleState::Inactive));
    assert_eq!(core.state_interfaces().len(), 6);
    assert_eq!(core.command_interfaces().len(), 4);
    assert_eq!(core.state_value("joint2/position"), Some(0.0));
    assert_eq!(core.state_value("joint9/position"), None);
    assert!(core.prepare(RRBOT_LOOPBACK_DRIVER_NAME).is_err());
}

#[test]
fn test_run_applies_setpoints_and_relays_vacuum() {
    let mut core = loopback_core();
    assert_eq!(core.driver_state(), Some(LifecycleState::Active));

    core.run().expect("run");

    let stats = core.stats();
    assert_eq!(stats.cycle_count, 5);
    assert_eq!(stats.write_faults, 0);
    assert!(stats.max_cycle_time_us >= stats.avg_cycle_time_us());

    assert_eq!(core.state_value("joint1/position"), Some(0.5));
    assert_eq!(core.state_value("joint2/position"), Some(0.0));
    assert_eq!(
        core.state_value("flange_analog_IOs/analog_output1"),
        Some(1.25)
    );
    assert_eq!(core.state_value("flange_vacuum/vacuum"), Some(0.27));

    let diag = core.driver_diagnostics().expect("diagnostics");
    assert_eq!(diag.cycle_count, 5);
    assert_eq!(diag.tokens_written, 5);
    assert_eq!(diag.lines_received, 5);
    assert_eq!(diag.write_faults, 0);
}

#[test]
fn test_run_cycle_with_manual_command() {
    let config = load(&host_toml("/dev/ttyLOOP0", ""));
    let mut core = HalCore::new(config, builtin_registry()).expect("new");
    core.init(RRBOT_LOOPBACK_DRIVER_NAME).expect("init");

    core.command_handle("joint2/position")
        .expect("joint2 command")
        .set_value(-1.0);

    let outcome = core.run_cycle(Instant::now(), Duration::from_millis(1));
    assert!(outcome.is_ok());
    assert_eq!(core.state_value("joint2/position"), Some(-1.0));
    assert_eq!(core.state_value("joint1/position"), Some(0.0));
    assert_eq!(core.stats().cycle_count, 1);
}

#[test]
fn test_run_cycle_before_init() {
    let config = load(&host_toml("/dev/ttyLOOP0", ""));
    let mut core = HalCore::new(config, builtin_registry()).expect("new");
    let outcome = core.run_cycle(Instant::now(), Duration::from_millis(1));
    assert!(matches!(outcome.read, Some(HalError::NotInitialized)));
    assert!(!outcome.is_ok());
}

#[test]
fn test_run_stops_when_flag_cleared() {
    let toml = host_toml("/dev/ttyLOOP0", "").replace("max_cycles = 5", "max_cycles = 0");
    let mut core = HalCore::new(load(&toml), builtin_registry()).expect("new");
    core.init(RRBOT_LOOPBACK_DRIVER_NAME).expect("init");

    let running = core.running_flag();
    let stopper = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(30));
        running.store(false, std::sync::atomic::Ordering::SeqCst);
    });

    core.run().expect("run");
    stopper.join().expect("stopper thread");
    assert!(core.stats().cycle_count > 0);
}

#[test]
fn test_shutdown_finalizes_active_driver() {
    let mut core = loopback_core();
    core.shutdown().expect("shutdown");
    assert_eq!(core.driver_state(), Some(LifecycleState::Finalized));

    // Second shutdown is a no-op.
    core.shutdown().expect("second shutdown");
}
