//! RRBot Common Library
//!
//! This crate provides the types shared between the RRBot GPIO adapter and
//! any host that drives it: the hardware description, exported interface
//! handles, the lifecycle vocabulary and the driver trait.
//!
//! # Module Structure
//!
//! - [`hal`] - Hardware description, driver trait, interface handles, constants
//! - [`config`] - Configuration loading traits and types
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```rust
//! use rrbot_common::prelude::*;
//!
//! let value = InterfaceValue::new(0.0);
//! let handle = CommandInterface::new("joint1", HW_IF_POSITION, value.clone());
//! handle.set_value(1.5);
//! assert_eq!(value.get(), 1.5);
//! ```

pub mod config;
pub mod hal;
pub mod prelude;
