//! Serial link to the GPIO relay device.
//!
//! The adapter talks to its device through the [`SerialTransport`] trait:
//!
//! - [`SerialLink`] - A real serial port (via the `serialport` crate)
//! - [`LoopbackSerial`] - An in-memory device for running without hardware
//!
//! No operation retries. A failed `open` or `write` is reported once and the
//! caller decides what to do.

mod link;
mod loopback;

pub use link::SerialLink;
pub use loopback::{LOOPBACK_GREETING, LoopbackSerial};

use rrbot_common::hal::driver::HalError;

/// Connection to a line-oriented serial device.
pub trait SerialTransport: Send {
    /// Open `port` at `baud_rate`.
    ///
    /// # Errors
    /// `HalError::ConnectionError` if the device cannot be opened or the link
    /// is already open.
    fn open(&mut self, port: &str, baud_rate: u32) -> Result<(), HalError>;

    /// Close the link.
    ///
    /// # Errors
    /// `HalError::ConnectionError` if the link is not open or flushing fails.
    fn close(&mut self) -> Result<(), HalError>;

    /// True while the link is open.
    fn is_open(&self) -> bool;

    /// True if at least one inbound byte is waiting. False when closed.
    fn is_data_available(&self) -> bool;

    /// Read one line, without its terminator.
    ///
    /// Callers check [`is_data_available`](Self::is_data_available) first.
    ///
    /// # Errors
    /// `HalError::TransportFault` on I/O failure or when no terminator arrives
    /// within the read timeout.
    fn read_line(&mut self) -> Result<String, HalError>;

    /// Send `payload` verbatim. No terminator is appended.
    ///
    /// # Errors
    /// `HalError::TransportFault` on I/O failure.
    fn write(&mut self, payload: &str) -> Result<(), HalError>;
}

/// Strip a trailing `\n` or `\r\n`.
pub(crate) fn trim_line_ending(line: &str) -> &str {
    let line = line.strip_suffix('\n').unwrap_or(line);
    line.strip_suffix('\r').unwrap_or(line)
}
