//! HAL Core struct and control loop management.
//!
//! `HalCore` plays the supervisor role for one adapter: it loads the driver
//! by name, walks it through init → configure → export → activate, runs
//! the periodic read → setpoint update → write loop, and winds it down.

use crate::driver_registry::DriverRegistry;
use rrbot_common::config::ConfigLoader;
use rrbot_common::hal::config::HalConfig;
use rrbot_common::hal::driver::{DriverDiagnostics, HalError, SystemInterface};
use rrbot_common::hal::types::{CommandInterface, HalContext, LifecycleState, StateInterface};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// HAL Core manages one adapter and its control loop.
pub struct HalCore {
    /// Host configuration
    config: HalConfig,
    /// Available drivers
    registry: DriverRegistry,
    /// Active driver instance
    driver: Option<Box<dyn SystemInterface>>,
    /// Exported state handles
    state_handles: Vec<StateInterface>,
    /// Exported command handles
    command_handles: Vec<CommandInterface>,
    /// Command handles paired with the value written every period
    setpoints: Vec<(CommandInterface, f64)>,
    /// Running flag for loop control
    running: Arc<AtomicBool>,
    /// Cycle time from config
    cycle_time: Duration,
    /// Timing statistics
    stats: CycleStats,
}

/// Control loop statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleStats {
    /// Number of cycles executed
    pub cycle_count: u64,
    /// Cycles whose read step returned an error
    pub read_errors: u64,
    /// Cycles whose write step returned an error
    pub write_faults: u64,
    /// Number of timing violations (cycle exceeded target)
    pub timing_violations: u64,
    /// Maximum observed cycle time
    pub max_cycle_time_us: u64,
    /// Sum of cycle times for average calculation
    pub total_cycle_time_us: u64,
}

impl CycleStats {
    /// Average cycle time in microseconds.
    pub fn avg_cycle_time_us(&self) -> u64 {
        self.total_cycle_time_us
            .checked_div(self.cycle_count)
            .unwrap_or(0)
    }
}

/// What happened in one control period.
#[derive(Debug, Clone)]
pub struct CycleOutcome {
    /// Error from the read step, if any
    pub read: Option<HalError>,
    /// Error from the write step, if any
    pub write: Option<HalError>,
}

impl CycleOutcome {
    /// True if both steps succeeded.
    pub fn is_ok(&self) -> bool {
        self.read.is_none() && self.write.is_none()
    }
}

impl HalCore {
    /// Create a new HalCore with the given configuration and driver registry.
    ///
    /// # Errors
    /// Returns error if configuration validation fails.
    pub fn new(config: HalConfig, registry: DriverRegistry) -> Result<Self, HalError> {
        config.validate()?;

        let cycle_time = Duration::from_micros(config.cycle_time_us as u64);
        info!(
            "HalCore created for '{}' with {} joints, cycle_time={}us",
            config.hardware.name,
            config.hardware.joints.len(),
            config.cycle_time_us
        );

        Ok(Self {
            config,
            registry,
            driver: None,
            state_handles: Vec::new(),
            command_handles: Vec::new(),
            setpoints: Vec::new(),
            running: Arc::new(AtomicBool::new(false)),
            cycle_time,
            stats: CycleStats::default(),
        })
    }

    /// Load host configuration from a TOML file.
    pub fn load_config(config_path: &Path) -> Result<HalConfig, HalError> {
        info!("Loading configuration from {:?}", config_path);

        let config = HalConfig::load(config_path).map_err(|e| {
            HalError::ConfigError(format!("Failed to load config file {:?}: {}", config_path, e))
        })?;

        info!(
            "Loaded config: driver={}, hardware={}, {} setpoints",
            config.driver,
            config.hardware.name,
            config.setpoints.len()
        );
        Ok(config)
    }

    /// Host configuration.
    pub fn config(&self) -> &HalConfig {
        &self.config
    }

    /// Create, configure and activate the driver.
    ///
    /// # Errors
    /// Any error from [`HalCore::prepare`] or [`HalCore::activate`].
    pub fn init(&mut self, driver_name: &str) -> Result<(), HalError> {
        self.prepare(driver_name)?;
        self.activate()
    }

    /// Create the driver and bring it up to Inactive with handles exported.
    ///
    /// # Errors
    /// Returns error if the driver is unknown, init/configure fails, or a
    /// configured setpoint names no exported command interface.
    pub fn prepare(&mut self, driver_name: &str) -> Result<(), HalError> {
        info!("Initializing HalCore with driver '{}'...", driver_name);
        if self.driver.is_some() {
            return Err(HalError::ConfigError("Driver already loaded".to_string()));
        }

        let mut driver = self.registry.create_driver(driver_name)?;
        info!("Created driver: {} v{}", driver.name(), driver.version());

        let ctx = HalContext::new(&self.config.hardware.name);
        driver.on_init(&self.config.hardware, ctx)?;
        driver.on_configure()?;

        let state_handles = driver.export_state_interfaces();
        let command_handles = driver.export_command_interfaces();
        let setpoints = resolve_setpoints(&self.config, &command_handles)?;

        info!(
            "Exported {} state and {} command interfaces",
            state_handles.len(),
            command_handles.len()
        );

        self.state_handles = state_handles;
        self.command_handles = command_handles;
        self.setpoints = setpoints;
        self.driver = Some(driver);
        Ok(())
    }

    /// Activate the driver.
    ///
    /// # Errors
    /// Returns error if no driver is loaded or activation fails (the driver
    /// stays Inactive).
    pub fn activate(&mut self) -> Result<(), HalError> {
        let driver = self.driver.as_mut().ok_or(HalError::NotInitialized)?;
        driver.on_activate()?;
        info!("HalCore active");
        Ok(())
    }

    /// Run one control period: read, apply setpoints, write.
    ///
    /// Errors are counted and logged, never propagated; the next period
    /// runs regardless.
    pub fn run_cycle(&mut self, now: Instant, dt: Duration) -> CycleOutcome {
        let mut outcome = CycleOutcome {
            read: None,
            write: None,
        };
        let Some(driver) = self.driver.as_mut() else {
            outcome.read = Some(HalError::NotInitialized);
            return outcome;
        };

        if let Err(e) = driver.read(now, dt) {
            self.stats.read_errors += 1;
            warn!("Read failed: {}", e);
            outcome.read = Some(e);
        }

        for (handle, value) in &self.setpoints {
            handle.set_value(*value);
        }

        if let Err(e) = driver.write(now, dt) {
            self.stats.write_faults += 1;
            if self.stats.write_faults <= 10 || self.stats.write_faults % 1000 == 0 {
                warn!(
                    "Write fault #{}: {} (continuing next period)",
                    self.stats.write_faults, e
                );
            }
            outcome.write = Some(e);
        }

        self.stats.cycle_count += 1;
        outcome
    }

    /// Run the control loop.
    ///
    /// Blocks until the running flag is cleared or `max_cycles` is reached.
    ///
    /// # Errors
    /// Returns error if the driver is not Active.
    pub fn run(&mut self) -> Result<(), HalError> {
        let state = self.driver.as_ref().and_then(|d| d.lifecycle_state());
        if state != Some(LifecycleState::Active) {
            return Err(HalError::ConfigError(format!(
                "Control loop requires an active driver (state: {:?})",
                state
            )));
        }

        info!(
            "Starting HalCore control loop (cycle_time={}us)...",
            self.cycle_time.as_micros()
        );
        self.running.store(true, Ordering::SeqCst);

        if detect_rt_mode() {
            info!("Running in real-time mode");
        } else {
            info!("Running in standard (non-RT) mode");
        }

        let max_cycles = self.config.max_cycles;
        let mut last_cycle = Instant::now();

        while self.running.load(Ordering::SeqCst) {
            let cycle_start = Instant::now();
            let dt = cycle_start.duration_since(last_cycle);
            last_cycle = cycle_start;

            let _ = self.run_cycle(cycle_start, dt);

            let cycle_time_us = cycle_start.elapsed().as_micros() as u64;
            self.stats.total_cycle_time_us += cycle_time_us;
            self.stats.max_cycle_time_us = self.stats.max_cycle_time_us.max(cycle_time_us);

            if cycle_time_us > self.config.cycle_time_us as u64 {
                self.stats.timing_violations += 1;
                if self.stats.timing_violations <= 10 || self.stats.timing_violations % 1000 == 0 {
                    warn!(
                        "Timing violation #{}: cycle took {}us (target {}us)",
                        self.stats.timing_violations, cycle_time_us, self.config.cycle_time_us
                    );
                }
            }

            if self.stats.cycle_count % 1000 == 0 {
                debug!(
                    "Control loop: {} cycles, avg={}us, max={}us, violations={}, write_faults={}",
                    self.stats.cycle_count,
                    self.stats.avg_cycle_time_us(),
                    self.stats.max_cycle_time_us,
                    self.stats.timing_violations,
                    self.stats.write_faults
                );
            }

            if max_cycles > 0 && self.stats.cycle_count >= max_cycles {
                info!("Reached max_cycles={}", max_cycles);
                break;
            }

            let elapsed = cycle_start.elapsed();
            if elapsed < self.cycle_time {
                std::thread::sleep(self.cycle_time - elapsed);
            }
        }

        self.running.store(false, Ordering::SeqCst);
        info!(
            "HalCore control loop stopped after {} cycles (violations: {}, write faults: {})",
            self.stats.cycle_count, self.stats.timing_violations, self.stats.write_faults
        );
        Ok(())
    }

    /// Deactivate (if Active) and finalize the driver.
    ///
    /// # Errors
    /// Returns error if the driver rejects the shutdown transition.
    pub fn shutdown(&mut self) -> Result<(), HalError> {
        info!("Shutdown requested");
        self.running.store(false, Ordering::SeqCst);

        let Some(driver) = self.driver.as_mut() else {
            return Ok(());
        };

        match driver.lifecycle_state() {
            Some(LifecycleState::Active) => {
                driver.on_deactivate()?;
                driver.on_shutdown()?;
            }
            Some(LifecycleState::Finalized) | None => {}
            Some(_) => driver.on_shutdown()?,
        }
        Ok(())
    }

    /// Get the running flag for signal handlers.
    pub fn running_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    /// Exported state handles.
    pub fn state_interfaces(&self) -> &[StateInterface] {
        &self.state_handles
    }

    /// Exported command handles.
    pub fn command_interfaces(&self) -> &[CommandInterface] {
        &self.command_handles
    }

    /// Current value of the state interface `"<component>/<interface>"`.
    pub fn state_value(&self, full_name: &str) -> Option<f64> {
        self.state_handles
            .iter()
            .find(|h| h.full_name() == full_name)
            .map(StateInterface::get_value)
    }

    /// Command handle `"<component>/<interface>"`.
    pub fn command_handle(&self, full_name: &str) -> Option<&CommandInterface> {
        self.command_handles
            .iter()
            .find(|h| h.full_name() == full_name)
    }

    /// Lifecycle state of the loaded driver.
    pub fn driver_state(&self) -> Option<LifecycleState> {
        self.driver.as_ref().and_then(|d| d.lifecycle_state())
    }

    /// Diagnostics of the loaded driver.
    pub fn driver_diagnostics(&self) -> Option<DriverDiagnostics> {
        self.driver.as_ref().and_then(|d| d.diagnostics())
    }

    /// Control loop statistics.
    pub fn stats(&self) -> CycleStats {
        self.stats
    }
}

/// Pair each configured setpoint with its command handle.
fn resolve_setpoints(
    config: &HalConfig,
    handles: &[CommandInterface],
) -> Result<Vec<(CommandInterface, f64)>, HalError> {
    config
        .setpoints
        .iter()
        .map(|(name, value)| {
            handles
                .iter()
                .find(|h| h.full_name() == *name)
                .map(|h| (h.clone(), *value))
                .ok_or_else(|| {
                    HalError::ConfigError(format!(
                        "Setpoint '{}' does not match any command interface",
                        name
                    ))
                })
        })
        .collect()
}

/// Detect if running in real-time mode by checking scheduler policy.
fn detect_rt_mode() -> bool {
    #[cfg(target_os = "linux")]
    {
        use libc::{SCHED_FIFO, SCHED_RR, sched_getscheduler};
        // SAFETY: sched_getscheduler(0) only queries the calling thread's policy.
        unsafe {
            let policy = sched_getscheduler(0);
            policy == SCHED_FIFO || policy == SCHED_RR
        }
    }
    #[cfg(not(target_os = "linux"))]
    {
        false
    }
}
