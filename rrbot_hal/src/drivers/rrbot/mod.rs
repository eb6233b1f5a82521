//! RRBot system-with-GPIO driver module.
//!
//! Two position-controlled joints with a one-step motion placeholder, two
//! GPIO components (3+1 inputs, 1+1 outputs) and a serial relay that
//! forwards one GPIO output to an external board.

mod driver;
mod sampler;

pub use driver::RrbotSystemWithGpio;
pub use sampler::{CyclicSampler, GpioNoise, LogThrottle, SamplerStats, SeedPolicy, select_token};

use crate::serial::{LoopbackSerial, SerialLink};
use rrbot_common::hal::driver::SystemInterface;

/// Factory: adapter on a real serial port.
pub fn create_driver() -> Box<dyn SystemInterface> {
    Box::new(RrbotSystemWithGpio::new(SerialLink::new()))
}

/// Factory: adapter on an echoing in-memory serial device.
pub fn create_loopback_driver() -> Box<dyn SystemInterface> {
    Box::new(RrbotSystemWithGpio::new(LoopbackSerial::echoing()))
}
