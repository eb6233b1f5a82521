//! # RRBot HAL Library
//!
//! Hardware adapter for a two-joint robot with two GPIO components, plus a
//! host that drives it through its lifecycle and control loop.
//!
//! Drivers implement the `SystemInterface` trait defined in
//! `rrbot_common::hal::driver`.
//!
//! # Module Structure
//!
//! - [`core`] - HalCore struct, control loop management
//! - [`driver_registry`] - Driver factory registration
//! - [`drivers`] - HAL driver implementations
//! - [`interfaces`] - Interface buffers, validation and handle export
//! - [`lifecycle`] - Lifecycle state machine
//! - [`serial`] - Serial transport (real port and loopback device)
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                     rrbot_hal (single crate)                     │
//! │  ┌─────────────┐    ┌──────────────┐    ┌─────────────────────┐  │
//! │  │  Handles    │◄──►│  HalCore     │◄──►│  Driver Registry    │  │
//! │  │ (state/cmd) │    │ (Cycle Loop) │    │                     │  │
//! │  └──────▲──────┘    └──────┬───────┘    └─────────────────────┘  │
//! │         │                  │                                     │
//! │         │                  ▼                                     │
//! │  ┌──────┴──────┐    ┌────────────────┐    ┌─────────────────┐    │
//! │  │  Buffers    │◄───│ SystemInterface│───►│ SerialTransport │    │
//! │  │             │    │  (trait object)│    │                 │    │
//! │  └─────────────┘    └────────────────┘    └─────────────────┘    │
//! └──────────────────────────────────────────────────────────────────┘
//! ```

#![deny(missing_docs)]

pub mod core;
pub mod driver_registry;
pub mod drivers;
pub mod interfaces;
pub mod lifecycle;
pub mod serial;

// Re-export key types for convenience
pub use crate::core::{CycleOutcome, CycleStats, HalCore};
pub use crate::driver_registry::DriverRegistry;
pub use crate::drivers::{builtin_registry, register_all_drivers};
pub use crate::interfaces::InterfaceBuffers;
pub use crate::lifecycle::{LifecycleStateMachine, TransitionResult};
pub use crate::serial::{LoopbackSerial, SerialLink, SerialTransport};
