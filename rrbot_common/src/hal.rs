//! Hardware abstraction layer types shared by adapter and host.
//!
//! - [`config`] - Hardware description and host configuration
//! - [`consts`] - Interface names, cardinalities, serial protocol constants
//! - [`driver`] - `SystemInterface` trait and `HalError`
//! - [`types`] - Interface handles, lifecycle vocabulary, `HalContext`

pub mod config;
pub mod consts;
pub mod driver;
pub mod types;
