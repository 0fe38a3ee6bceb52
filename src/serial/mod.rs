//! Serial port communication module
//!
//! This module provides functionality for:
//! - Listing available serial ports
//! - Auto-detecting the Arduino that carries the power sensors
//! - Opening the high-speed telemetry link

pub mod port;
pub mod resolve;

pub use port::{PortConfig, SerialConnection};
pub use resolve::resolve;
