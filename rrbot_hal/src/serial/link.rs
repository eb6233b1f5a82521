//! Serial port backed transport.

use super::{SerialTransport, trim_line_ending};
use rrbot_common::hal::consts::{SERIAL_MAX_LINE_BYTES, SERIAL_READ_TIMEOUT_MS};
use rrbot_common::hal::driver::HalError;
use serialport::SerialPort;
use std::io::{ErrorKind, Read, Write};
use std::time::Duration;
use tracing::debug;

/// A serial port opened with the `serialport` crate.
///
/// Reads are bounded by the port timeout so a silent device cannot stall
/// the control thread indefinitely.
pub struct SerialLink {
    /// Port path of the current connection (e.g. "/dev/ttyACM0")
    port_name: String,
    /// Read/write timeout applied when opening
    timeout: Duration,
    /// Open port, `None` while closed
    port: Option<Box<dyn SerialPort>>,
    /// Bytes read but not yet returned as a line
    pending: Vec<u8>,
}

impl SerialLink {
    /// Create a closed link with the default read timeout.
    pub fn new() -> Self {
        Self::with_timeout(Duration::from_millis(SERIAL_READ_TIMEOUT_MS))
    }

    /// Create a closed link with a custom read timeout.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            port_name: String::new(),
            timeout,
            port: None,
            pending: Vec::new(),
        }
    }

    /// Port path of the last `open`.
    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    fn take_line(&mut self) -> Option<String> {
        let end = self.pending.iter().position(|&b| b == b'\n')?;
        let raw: Vec<u8> = self.pending.drain(..=end).collect();
        let text = String::from_utf8_lossy(&raw);
        Some(trim_line_ending(&text).to_string())
    }
}

impl Default for SerialLink {
    fn default() -> Self {
        Self::new()
    }
}

impl SerialTransport for SerialLink {
    fn open(&mut self, port: &str, baud_rate: u32) -> Result<(), HalError> {
        if self.port.is_some() {
            return Err(HalError::ConnectionError(format!(
                "Serial port '{}' is already open",
                self.port_name
            )));
        }

        let opened = serialport::new(port, baud_rate)
            .timeout(self.timeout)
            .open()
            .map_err(|e| {
                HalError::ConnectionError(format!(
                    "Failed to open serial port '{}' at {} baud: {}",
                    port, baud_rate, e
                ))
            })?;

        self.port_name = port.to_string();
        self.pending.clear();
        self.port = Some(opened);
        debug!("Serial port '{}' opened at {} baud", port, baud_rate);
        Ok(())
    }

    fn close(&mut self) -> Result<(), HalError> {
        let mut port = self.port.take().ok_or_else(|| {
            HalError::ConnectionError(format!("Serial port '{}' is not open", self.port_name))
        })?;
        self.pending.clear();

        // The port is released on drop whether or not the flush succeeds.
        port.flush().map_err(|e| {
            HalError::ConnectionError(format!(
                "Failed to flush serial port '{}' on close: {}",
                self.port_name, e
            ))
        })?;
        debug!("Serial port '{}' closed", self.port_name);
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.port.is_some()
    }

    fn is_data_available(&self) -> bool {
        let Some(port) = &self.port else {
            return false;
        };
        if !self.pending.is_empty() {
            return true;
        }
        port.bytes_to_read().map(|n| n > 0).unwrap_or(false)
    }

    fn read_line(&mut self) -> Result<String, HalError> {
        loop {
            if let Some(line) = self.take_line() {
                return Ok(line);
            }

            if self.pending.len() >= SERIAL_MAX_LINE_BYTES {
                let raw = std::mem::take(&mut self.pending);
                return Ok(String::from_utf8_lossy(&raw).into_owned());
            }

            let port = self.port.as_mut().ok_or_else(|| {
                HalError::TransportFault(format!("Serial port '{}' is not open", self.port_name))
            })?;

            let mut chunk = [0u8; 64];
            match port.read(&mut chunk) {
                Ok(0) => {
                    return Err(HalError::TransportFault(format!(
                        "Serial port '{}' reached end of stream",
                        self.port_name
                    )));
                }
                Ok(n) => self.pending.extend_from_slice(&chunk[..n]),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) if e.kind() == ErrorKind::TimedOut => {
                    return Err(HalError::TransportFault(format!(
                        "Timed out waiting for a line on '{}' ({} bytes buffered)",
                        self.port_name,
                        self.pending.len()
                    )));
                }
                Err(e) => {
                    return Err(HalError::TransportFault(format!(
                        "Failed to read from serial port '{}': {}",
                        self.port_name, e
                    )));
                }
            }
        }
    }

    fn write(&mut self, payload: &str) -> Result<(), HalError> {
        let port = self.port.as_mut().ok_or_else(|| {
            HalError::TransportFault(format!("Serial port '{}' is not open", self.port_name))
        })?;

        port.write_all(payload.as_bytes())
            .and_then(|_| port.flush())
            .map_err(|e| {
                HalError::TransportFault(format!(
                    "Failed to write to serial port '{}': {}",
                    self.port_name, e
                ))
            })
    }
}
