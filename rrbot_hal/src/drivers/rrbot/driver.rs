//! RRBot system with GPIO: lifecycle and cyclic contract.
//!
//! The adapter owns the joint and GPIO buffers, the serial link and the
//! lifecycle state. Hosts see it only through `SystemInterface` and the
//! exported handles.

use super::sampler::{CyclicSampler, SamplerStats, SeedPolicy};
use crate::interfaces::{self, InterfaceBuffers};
use crate::lifecycle::LifecycleStateMachine;
use crate::serial::SerialTransport;
use rrbot_common::hal::config::HardwareInfo;
use rrbot_common::hal::consts::{NOISE_SEED_PARAMETER, PORT_PARAMETER, SERIAL_BAUD_RATE};
use rrbot_common::hal::driver::{DriverDiagnostics, HalError, SystemInterface};
use rrbot_common::hal::types::{
    CommandInterface, HalContext, LifecycleEvent, LifecycleState, StateInterface,
};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// State that exists only after a successful `on_init`.
struct Initialized {
    info: HardwareInfo,
    ctx: HalContext,
    port: String,
    buffers: InterfaceBuffers,
}

/// Two-joint robot with two GPIO banks, relaying one GPIO output to a
/// serial device.
pub struct RrbotSystemWithGpio<T: SerialTransport> {
    /// Driver name
    name: &'static str,
    /// Driver version
    version: &'static str,
    /// Description, context and buffers (None until init succeeds)
    hw: Option<Initialized>,
    /// Lifecycle state
    lifecycle: LifecycleStateMachine,
    /// Serial link to the relay device
    serial: T,
    /// Per-period read/write step
    sampler: CyclicSampler,
}

impl<T: SerialTransport> RrbotSystemWithGpio<T> {
    /// Create an uninitialized adapter talking through `serial`.
    pub fn new(serial: T) -> Self {
        Self {
            name: "rrbot_system_with_gpio",
            version: env!("CARGO_PKG_VERSION"),
            hw: None,
            lifecycle: LifecycleStateMachine::new(),
            serial,
            sampler: CyclicSampler::new(SeedPolicy::WallClock),
        }
    }

    /// Buffers backing the exported handles, once initialized.
    pub fn buffers(&self) -> Option<&InterfaceBuffers> {
        self.hw.as_ref().map(|hw| &hw.buffers)
    }

    /// Configured serial port, once initialized.
    pub fn port(&self) -> Option<&str> {
        self.hw.as_ref().map(|hw| hw.port.as_str())
    }

    /// Serial link.
    pub fn serial(&self) -> &T {
        &self.serial
    }

    /// Sampler counters.
    pub fn sampler_stats(&self) -> SamplerStats {
        self.sampler.stats()
    }

    fn initialized(&self) -> Result<&Initialized, HalError> {
        self.hw.as_ref().ok_or(HalError::NotInitialized)
    }

    /// Check `event` against the lifecycle table without committing.
    fn guard(&self, event: LifecycleEvent) -> Result<LifecycleState, HalError> {
        self.initialized()?;
        let from = self.lifecycle.state();
        self.lifecycle.next_state(event).into_result(from, event)
    }

    fn commit(&mut self, event: LifecycleEvent) {
        let _ = self.lifecycle.handle_event(event);
    }

    /// Close the serial link if open, logging any failure.
    fn close_serial(&mut self) {
        if !self.serial.is_open() {
            return;
        }
        if let Err(e) = self.serial.close() {
            let port = self.port().unwrap_or_default();
            error!(
                "Something went wrong while closing connection with port {}: {}",
                port, e
            );
        }
    }
}

fn seed_policy(info: &HardwareInfo) -> Result<SeedPolicy, HalError> {
    match info.parameter(NOISE_SEED_PARAMETER) {
        None => Ok(SeedPolicy::WallClock),
        Some(raw) => raw.trim().parse::<u64>().map(SeedPolicy::Fixed).map_err(|e| {
            HalError::ConfigError(format!(
                "Invalid {} '{}': {}",
                NOISE_SEED_PARAMETER, raw, e
            ))
        }),
    }
}

impl<T: SerialTransport> SystemInterface for RrbotSystemWithGpio<T> {
    fn name(&self) -> &'static str {
        self.name
    }

    fn version(&self) -> &'static str {
        self.version
    }

    fn lifecycle_state(&self) -> Option<LifecycleState> {
        self.hw.as_ref().map(|_| self.lifecycle.state())
    }

    fn on_init(&mut self, info: &HardwareInfo, ctx: HalContext) -> Result<(), HalError> {
        if self.hw.is_some() {
            return Err(HalError::ConfigError(format!(
                "{} is already initialized",
                ctx.component()
            )));
        }

        info.validate().inspect_err(|e| error!("{}", e))?;

        let Some(port) = info.parameter(PORT_PARAMETER) else {
            error!("No Serial Port provided! Aborting");
            return Err(HalError::ConfigError(format!(
                "Hardware parameter '{}' is required",
                PORT_PARAMETER
            )));
        };
        let port = port.to_string();

        let policy = seed_policy(info).inspect_err(|e| error!("{}", e))?;

        let buffers = InterfaceBuffers::allocate(info.joints.len());

        interfaces::validate(info).inspect_err(|e| error!("{}", e))?;

        info!(
            "Initialized {} with {} joints, {} GPIO components, port {}",
            ctx.component(),
            info.joints.len(),
            info.gpios.len(),
            port
        );

        self.sampler = CyclicSampler::new(policy);
        self.lifecycle = LifecycleStateMachine::new();
        self.hw = Some(Initialized {
            info: info.clone(),
            ctx,
            port,
            buffers,
        });
        Ok(())
    }

    fn on_configure(&mut self) -> Result<(), HalError> {
        self.guard(LifecycleEvent::Configure)?;
        info!("Configuring ...please wait...");

        self.initialized()?.buffers.reset();
        self.commit(LifecycleEvent::Configure);

        info!("Successfully configured!");
        Ok(())
    }

    fn on_cleanup(&mut self) -> Result<(), HalError> {
        self.guard(LifecycleEvent::Cleanup)?;
        self.commit(LifecycleEvent::Cleanup);
        info!("Successfully cleaned up!");
        Ok(())
    }

    fn export_state_interfaces(&self) -> Vec<StateInterface> {
        match &self.hw {
            Some(hw) => interfaces::export_state_handles(&hw.info, &hw.buffers),
            None => Vec::new(),
        }
    }

    fn export_command_interfaces(&self) -> Vec<CommandInterface> {
        match &self.hw {
            Some(hw) => interfaces::export_command_handles(&hw.info, &hw.buffers),
            None => Vec::new(),
        }
    }

    fn on_activate(&mut self) -> Result<(), HalError> {
        self.guard(LifecycleEvent::Activate)?;
        info!("Activating ...please wait...");

        let hw = self.initialized()?;
        hw.buffers.hold_current_position();
        let port = hw.port.clone();

        info!("Activating serial device on {} ...please wait...", port);
        if let Err(e) = self.serial.open(&port, SERIAL_BAUD_RATE) {
            error!(
                "Something went wrong while interacting with port {}: {}",
                port, e
            );
            return Err(e);
        }

        self.commit(LifecycleEvent::Activate);
        info!("Successfully activated!");
        Ok(())
    }

    fn on_deactivate(&mut self) -> Result<(), HalError> {
        self.guard(LifecycleEvent::Deactivate)?;

        self.close_serial();
        self.commit(LifecycleEvent::Deactivate);

        info!("Successfully deactivated!");
        Ok(())
    }

    fn on_shutdown(&mut self) -> Result<(), HalError> {
        self.guard(LifecycleEvent::Shutdown)?;

        self.close_serial();
        self.commit(LifecycleEvent::Shutdown);

        if let Some(hw) = &self.hw {
            info!(
                "{} finalized after {:.1}s",
                hw.ctx.component(),
                hw.ctx.uptime().as_secs_f64()
            );
        }
        Ok(())
    }

    fn read(&mut self, time: Instant, period: Duration) -> Result<(), HalError> {
        let hw = self.hw.as_ref().ok_or(HalError::NotInitialized)?;
        debug!("read, period={:?}", period);
        self.sampler.read(&hw.buffers, &mut self.serial, time);
        Ok(())
    }

    fn write(&mut self, time: Instant, period: Duration) -> Result<(), HalError> {
        let hw = self.hw.as_ref().ok_or(HalError::NotInitialized)?;
        debug!("write, period={:?}", period);
        self.sampler
            .write(&hw.buffers, &mut self.serial, time)
            .inspect_err(|e| {
                error!(
                    "Something went wrong while sending the message to the port {}: {}",
                    hw.port, e
                )
            })
    }

    fn diagnostics(&self) -> Option<DriverDiagnostics> {
        let stats = self.sampler.stats();
        let custom = serde_json::json!({
            "port": self.port(),
            "serial_open": self.serial.is_open(),
            "lifecycle": self.lifecycle_state().map(|s| s.to_string()),
            "cycle_enabled": self.hw.is_some() && self.lifecycle.allows_cycle(),
            "read_errors": stats.read_errors,
            "no_data_cycles": stats.unavailable,
        });
        Some(DriverDiagnostics {
            cycle_count: stats.reads,
            lines_received: stats.lines_received,
            tokens_written: stats.tokens_written,
            write_faults: stats.write_faults,
            custom: Some(custom.to_string()),
        })
    }
}

impl<T: SerialTransport> Drop for RrbotSystemWithGpio<T> {
    fn drop(&mut self) {
        if self.serial.is_open() {
            warn!("Adapter dropped with serial link open, closing");
            self.close_serial();
        }
    }
}
