//! # PanScan Core Library
//!
//! Core functionality for driving a pan/tilt distance-scanning rig.

#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//!
//! This library provides:
//! - Serial port discovery and connection management
//! - The line-oriented wire protocol spoken by the scanner firmware
//! - The ready/response handshake that keeps host and device in step
//! - Telemetry parsing into pan/tilt/voltage readings
//! - A simulated device for running without hardware
//!
//! ## Example
//!
//! ```rust,ignore
//! use panscan_core::protocol::{AutoSelector, ConnectionConfig, SerialConnection};
//! use panscan_core::scanner::{ControllerConfig, Scanner};
//!
//! let mut link = SerialConnection::new(ConnectionConfig::default());
//! link.connect_with(&mut AutoSelector)?;
//!
//! let mut scanner = Scanner::new(link, ControllerConfig::default());
//! scanner.center()?;
//! let reading = scanner.read_sensor()?;
//! println!("{:.1} {:.1} {:.3} V", reading.pan, reading.tilt, reading.voltage);
//! ```

pub mod config;
pub mod demo;
pub mod protocol;
pub mod scanner;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::ScannerConfig;
    pub use crate::demo::DemoDevice;
    pub use crate::protocol::{
        AutoSelector, Command, ConnectionConfig, FixedPortSelector, PortInfo, PortSelector,
        ProtocolError, SerialConnection, Transport,
    };
    pub use crate::scanner::{ControllerConfig, DeviceState, Reading, Scanner, Sweep, SweepPlan};
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
