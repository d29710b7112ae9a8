//! Serial Protocol Communication
//!
//! Implements the line-oriented text protocol spoken by the scanner firmware.
//!
//! Commands go out as a single line terminated by `\r`. Responses come back
//! as `\n` terminated lines: either the `ready` sentinel or an axis record
//! such as `X10`, `Y35` or `Z445`.

pub mod commands;
mod connection;
mod error;
pub mod selector;
pub mod serial;
pub mod telemetry;
mod transport;

pub use commands::Command;
pub use connection::{ConnectionConfig, SerialConnection};
pub use error::ProtocolError;
pub use selector::{AutoSelector, Confirmation, FixedPortSelector, PortSelector};
pub use serial::{
    clear_buffers, configure_port, discover, is_known_board, list_ports, open_port, BaudClass,
    PortInfo,
};
pub use telemetry::{Axis, RawTriple, TelemetryLine};
pub use transport::Transport;

/// Default baud rate for the scanner firmware
pub const DEFAULT_BAUD_RATE: u32 = 115200;

/// Default bounded wait for a single line read in milliseconds
pub const DEFAULT_READ_TIMEOUT_MS: u64 = 1000;

/// Line the device sends once it has finished a command
pub const READY_SENTINEL: &str = "ready";

/// Terminator appended to every outbound command
pub const COMMAND_TERMINATOR: char = '\r';

/// Baud rates every host serial driver is expected to support
pub const STANDARD_BAUDS: &[u32] = &[
    50, 75, 110, 134, 150, 200, 300, 600, 1200, 1800, 2400, 4800, 9600, 19200, 38400, 57600,
    115200,
];

/// Higher baud rates that only some hosts and adapters accept
pub const EXTENDED_BAUDS: &[u32] = &[
    230400, 460800, 500000, 576000, 921600, 1000000, 1152000, 1500000, 2000000, 2500000,
    3000000, 3500000, 4000000,
];

/// USB vendor/product pairs of the Arduino boards (and common clones) that
/// run the scanner firmware
pub const KNOWN_BOARDS: &[(u16, u16)] = &[
    (0x2341, 0x0043),
    (0x2341, 0x0001),
    (0x2A03, 0x0043),
    (0x2341, 0x0243),
    (0x0403, 0x6001),
    (0x1A86, 0x7523),
];
