//! Per-period read/write step of the RRBot adapter.
//!
//! `read` moves each joint straight to its command, mirrors GPIO outputs
//! 0/1 into inputs 0/3, fills inputs 1/2 with noise and drains one serial
//! line. `write` sends `"1"` or `"0"` to the device depending on whether
//! `gpio_out[1]` is exactly [`WRITE_ONE_THRESHOLD`].

use crate::interfaces::InterfaceBuffers;
use crate::serial::SerialTransport;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rrbot_common::hal::consts::{
    CYCLE_LOG_THROTTLE_MS, TOKEN_ONE, TOKEN_ZERO, WRITE_ONE_THRESHOLD,
};
use rrbot_common::hal::driver::HalError;
use std::fmt::Write as _;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tracing::{info, warn};

/// Largest value the noise generator produces (matches a C `RAND_MAX`).
const NOISE_MAX: u32 = i32::MAX as u32;

/// Token for a given `gpio_out[1]` value. Exact equality, no tolerance.
pub fn select_token(value: f64) -> &'static str {
    if value == WRITE_ONE_THRESHOLD {
        TOKEN_ONE
    } else {
        TOKEN_ZERO
    }
}

/// How the GPIO noise generator is seeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedPolicy {
    /// Reseed from wall-clock seconds before every sample. Values repeat
    /// within the same second and are not reproducible across runs.
    WallClock,
    /// Seed once; the sequence is reproducible.
    Fixed(u64),
}

/// Pseudo-random source for the two simulated GPIO inputs.
#[derive(Debug, Clone)]
pub struct GpioNoise {
    policy: SeedPolicy,
    rng: StdRng,
}

impl GpioNoise {
    /// Create a generator with the given seed policy.
    pub fn new(policy: SeedPolicy) -> Self {
        let seed = match policy {
            SeedPolicy::WallClock => wall_clock_seed(),
            SeedPolicy::Fixed(seed) => seed,
        };
        Self {
            policy,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Active seed policy.
    pub fn policy(&self) -> SeedPolicy {
        self.policy
    }

    /// Two samples in `0..=NOISE_MAX`, rounded through f32.
    pub fn sample_pair(&mut self) -> (f64, f64) {
        if self.policy == SeedPolicy::WallClock {
            self.rng = StdRng::seed_from_u64(wall_clock_seed());
        }
        (self.sample(), self.sample())
    }

    fn sample(&mut self) -> f64 {
        self.rng.random_range(0..=NOISE_MAX) as f32 as f64
    }
}

fn wall_clock_seed() -> u64 {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();
    secs.wrapping_add(2)
}

/// Rate limiter for periodic diagnostic log lines.
#[derive(Debug, Clone)]
pub struct LogThrottle {
    interval: Duration,
    last: Option<Instant>,
}

impl LogThrottle {
    /// Allow at most one line per `interval`.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    /// True if a line may be emitted at `now`; records the emission.
    pub fn ready(&mut self, now: Instant) -> bool {
        match self.last {
            Some(last) if now.saturating_duration_since(last) < self.interval => false,
            _ => {
                self.last = Some(now);
                true
            }
        }
    }
}

/// Counters kept by the sampler.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SamplerStats {
    /// `read` calls
    pub reads: u64,
    /// `write` calls
    pub writes: u64,
    /// Serial lines received
    pub lines_received: u64,
    /// Serial read failures (swallowed)
    pub read_errors: u64,
    /// Tokens sent to the device
    pub tokens_written: u64,
    /// Failed writes
    pub write_faults: u64,
    /// Cycles in which no serial data was available
    pub unavailable: u64,
}

/// Steady-state read/write step.
#[derive(Debug, Clone)]
pub struct CyclicSampler {
    noise: GpioNoise,
    read_log: LogThrottle,
    write_log: LogThrottle,
    stats: SamplerStats,
}

impl CyclicSampler {
    /// Create a sampler using `policy` for the GPIO noise.
    pub fn new(policy: SeedPolicy) -> Self {
        let throttle = Duration::from_millis(CYCLE_LOG_THROTTLE_MS);
        Self {
            noise: GpioNoise::new(policy),
            read_log: LogThrottle::new(throttle),
            write_log: LogThrottle::new(throttle),
            stats: SamplerStats::default(),
        }
    }

    /// Counters so far.
    pub fn stats(&self) -> SamplerStats {
        self.stats
    }

    /// Update state buffers for one period. Never fails; serial read
    /// problems are logged and counted.
    pub fn read<T: SerialTransport>(
        &mut self,
        buffers: &InterfaceBuffers,
        serial: &mut T,
        now: Instant,
    ) {
        self.stats.reads += 1;

        for (state, command) in buffers.joint_states.iter().zip(&buffers.joint_commands) {
            let current = state.get();
            state.set(current + (command.get() - current));
        }

        buffers.gpio_in[0].set(buffers.gpio_out[0].get());
        buffers.gpio_in[3].set(buffers.gpio_out[1].get());

        let (first, second) = self.noise.sample_pair();
        buffers.gpio_in[1].set(first);
        buffers.gpio_in[2].set(second);

        if self.read_log.ready(now) {
            let mut dump = String::from("Reading states:");
            for (idx, value) in buffers.gpio_in_values().iter().enumerate() {
                let _ = write!(dump, "\n\t{:.2} from GPIO input '{}'", value, idx);
            }
            info!("{}", dump);
        }

        if !serial.is_data_available() {
            self.stats.unavailable += 1;
            warn!("Serial device has no data available");
            return;
        }

        match serial.read_line() {
            Ok(line) => {
                self.stats.lines_received += 1;
                info!("Serial device: {}", line);
            }
            Err(e) => {
                self.stats.read_errors += 1;
                warn!("Discarding serial read failure: {}", e);
            }
        }
    }

    /// Push `gpio_out[1]` to the device as a token.
    ///
    /// Skipped (with a warning) when the device has no data available.
    ///
    /// # Errors
    /// `HalError::TransportFault` if the write fails.
    pub fn write<T: SerialTransport>(
        &mut self,
        buffers: &InterfaceBuffers,
        serial: &mut T,
        now: Instant,
    ) -> Result<(), HalError> {
        self.stats.writes += 1;

        if self.write_log.ready(now) {
            let mut dump = String::from("Writing commands:");
            for (idx, value) in buffers.gpio_out_values().iter().enumerate() {
                let _ = write!(dump, "\n\t{:.2} for GPIO output '{}'", value, idx);
            }
            info!("{}", dump);
        }

        if !serial.is_data_available() {
            self.stats.unavailable += 1;
            warn!("Serial device has no data available, skipping write");
            return Ok(());
        }

        let token = select_token(buffers.gpio_out[1].get());
        match serial.write(token) {
            Ok(()) => {
                self.stats.tokens_written += 1;
                info!("write_{}", if token == TOKEN_ONE { "one" } else { "zero" });
                Ok(())
            }
            Err(e) => {
                self.stats.write_faults += 1;
                Err(e)
            }
        }
    }
}
