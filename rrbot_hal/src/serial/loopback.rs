//! In-memory serial device.
//!
//! `LoopbackSerial` stands in for the relay board when no hardware is
//! attached. Clones share one device, so a test (or the host) can keep a
//! clone to inject inbound lines, inspect written tokens and force faults.

use super::{SerialTransport, trim_line_ending};
use rrbot_common::hal::driver::HalError;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::trace;

/// Lines the echoing device sends right after it is opened.
///
/// Two lines, so one is still queued after the first read of each period.
pub const LOOPBACK_GREETING: [&str; 2] = ["rrbot relay", "ready"];

#[derive(Debug, Default)]
struct DeviceState {
    open: bool,
    port: Option<String>,
    baud_rate: u32,
    inbound: VecDeque<String>,
    written: Vec<String>,
    echo: bool,
    fail_open: bool,
    fail_close: bool,
    fail_read: bool,
    fail_write: bool,
}

/// Shared in-memory serial device.
#[derive(Debug, Clone, Default)]
pub struct LoopbackSerial {
    device: Arc<Mutex<DeviceState>>,
}

impl LoopbackSerial {
    /// A silent device: nothing arrives unless pushed with [`push_line`](Self::push_line).
    pub fn new() -> Self {
        Self::default()
    }

    /// A device that greets on open and echoes every written payload back
    /// as an inbound line, like a relay board reporting its output state.
    pub fn echoing() -> Self {
        let serial = Self::default();
        serial.lock().echo = true;
        serial
    }

    fn lock(&self) -> MutexGuard<'_, DeviceState> {
        self.device.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue an inbound line (terminator optional).
    pub fn push_line(&self, line: &str) {
        self.lock().inbound.push_back(trim_line_ending(line).to_string());
    }

    /// Payloads written so far, oldest first.
    pub fn written(&self) -> Vec<String> {
        self.lock().written.clone()
    }

    /// Inbound lines not yet read.
    pub fn pending_lines(&self) -> usize {
        self.lock().inbound.len()
    }

    /// Port and baud rate of the current connection.
    pub fn connection(&self) -> Option<(String, u32)> {
        let device = self.lock();
        device
            .port
            .clone()
            .filter(|_| device.open)
            .map(|port| (port, device.baud_rate))
    }

    /// Make subsequent `open` calls fail.
    pub fn fail_open(&self, fail: bool) {
        self.lock().fail_open = fail;
    }

    /// Make subsequent `close` calls fail (the link still ends up closed).
    pub fn fail_close(&self, fail: bool) {
        self.lock().fail_close = fail;
    }

    /// Make subsequent `read_line` calls fail, leaving queued lines in place.
    pub fn fail_read(&self, fail: bool) {
        self.lock().fail_read = fail;
    }

    /// Make subsequent `write` calls fail.
    pub fn fail_write(&self, fail: bool) {
        self.lock().fail_write = fail;
    }
}

impl SerialTransport for LoopbackSerial {
    fn open(&mut self, port: &str, baud_rate: u32) -> Result<(), HalError> {
        let mut device = self.lock();
        if device.fail_open {
            return Err(HalError::ConnectionError(format!(
                "Failed to open serial port '{}' at {} baud: device unavailable",
                port, baud_rate
            )));
        }
        if device.open {
            return Err(HalError::ConnectionError(format!(
                "Serial port '{}' is already open",
                port
            )));
        }

        device.open = true;
        device.port = Some(port.to_string());
        device.baud_rate = baud_rate;
        if device.echo {
            device
                .inbound
                .extend(LOOPBACK_GREETING.iter().map(|line| line.to_string()));
        }
        Ok(())
    }

    fn close(&mut self) -> Result<(), HalError> {
        let mut device = self.lock();
        if !device.open {
            return Err(HalError::ConnectionError(
                "Serial port is not open".to_string(),
            ));
        }
        device.open = false;
        if device.fail_close {
            return Err(HalError::ConnectionError(
                "Failed to flush serial port on close".to_string(),
            ));
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.lock().open
    }

    fn is_data_available(&self) -> bool {
        let device = self.lock();
        device.open && !device.inbound.is_empty()
    }

    fn read_line(&mut self) -> Result<String, HalError> {
        let mut device = self.lock();
        if !device.open {
            return Err(HalError::TransportFault("Serial port is not open".to_string()));
        }
        if device.fail_read {
            return Err(HalError::TransportFault(
                "Failed to read from serial port: framing error".to_string(),
            ));
        }
        device.inbound.pop_front().ok_or_else(|| {
            HalError::TransportFault("Timed out waiting for a line".to_string())
        })
    }

    fn write(&mut self, payload: &str) -> Result<(), HalError> {
        let mut device = self.lock();
        if !device.open {
            return Err(HalError::TransportFault("Serial port is not open".to_string()));
        }
        if device.fail_write {
            return Err(HalError::TransportFault(
                "Failed to write to serial port: broken pipe".to_string(),
            ));
        }

        trace!("loopback <- {:?}", payload);
        device.written.push(payload.to_string());
        if device.echo {
            device.inbound.push_back(payload.to_string());
        }
        Ok(())
    }
}
