//! HAL constants.
//!
//! Interface names, the fixed GPIO cardinalities of the RRBot adapter and
//! the serial protocol constants.

use static_assertions::const_assert_eq;

/// Canonical HAL service name (used for logging and default config).
pub const HAL_SERVICE_NAME: &str = "rrbot_hal";

/// Default host configuration file path.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/rrbot/rrbot_hal.toml";

/// Default control period in microseconds (100 Hz).
pub const DEFAULT_CYCLE_TIME_US: u32 = 10_000;

/// Registry name of the serial-backed RRBot adapter.
pub const RRBOT_DRIVER_NAME: &str = "rrbot_system_with_gpio";

/// Registry name of the RRBot adapter wired to an in-memory serial device.
pub const RRBOT_LOOPBACK_DRIVER_NAME: &str = "rrbot_system_with_gpio_loopback";

/// Canonical joint position interface name.
pub const HW_IF_POSITION: &str = "position";

/// Hardware parameter holding the serial device path.
pub const PORT_PARAMETER: &str = "port";

/// Optional hardware parameter fixing the GPIO noise seed.
pub const NOISE_SEED_PARAMETER: &str = "gpio_noise_seed";

// ─── GPIO cardinalities ─────────────────────────────────────────────

/// Number of GPIO components the adapter requires.
pub const GPIO_COMPONENT_COUNT: usize = 2;

/// Command interfaces per GPIO component.
pub const GPIO_COMMAND_INTERFACES_PER_COMPONENT: usize = 1;

/// State interfaces per GPIO component, by component index.
pub const GPIO_STATE_INTERFACE_COUNTS: [usize; GPIO_COMPONENT_COUNT] = [3, 1];

/// Total GPIO input slots (sum of state interfaces).
pub const GPIO_IN_SLOTS: usize = 4;

/// Total GPIO output slots (sum of command interfaces).
pub const GPIO_OUT_SLOTS: usize = 2;

const_assert_eq!(
    GPIO_IN_SLOTS,
    GPIO_STATE_INTERFACE_COUNTS[0] + GPIO_STATE_INTERFACE_COUNTS[1]
);
const_assert_eq!(
    GPIO_OUT_SLOTS,
    GPIO_COMMAND_INTERFACES_PER_COMPONENT * GPIO_COMPONENT_COUNT
);

// ─── Serial protocol ────────────────────────────────────────────────

/// Fixed serial baud rate.
pub const SERIAL_BAUD_RATE: u32 = 115_200;

/// Serial read timeout in milliseconds; bounds `read_line` latency.
pub const SERIAL_READ_TIMEOUT_MS: u64 = 100;

/// Upper bound on buffered inbound bytes without a line terminator.
pub const SERIAL_MAX_LINE_BYTES: usize = 4096;

/// `gpio_out[1]` value that selects [`TOKEN_ONE`]. Compared bit-exactly.
pub const WRITE_ONE_THRESHOLD: f64 = 0.27;

/// Token written when the threshold matches.
pub const TOKEN_ONE: &str = "1";

/// Token written otherwise.
pub const TOKEN_ZERO: &str = "0";

/// Minimum interval between the per-cycle GPIO dumps, in milliseconds.
pub const CYCLE_LOG_THROTTLE_MS: u64 = 500;
