//! Protocol errors

use thiserror::Error;

/// Errors that can occur while talking to the scanner
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// The endpoint is missing, busy, or refused the requested baud rate
    #[error("Connection failed: {0}")]
    Connection(String),

    /// A read or write was attempted with no open connection
    #[error("Not connected to scanner")]
    NotConnected,

    /// The selection strategy declined every candidate port
    #[error("No serial port selected")]
    NoPortSelected,

    /// A sensor drain did not yield one clean X/Y/Z triple
    #[error("Malformed telemetry: {0}")]
    MalformedTelemetry(String),

    /// The ready sentinel did not arrive within the configured maximum wait
    #[error("Device unresponsive: no ready signal after {waited_ms}ms")]
    DeviceUnresponsive {
        /// How long the handshake waited before giving up
        waited_ms: u64,
    },

    /// The serial driver reported an error on an open port
    #[error("Serial port error: {0}")]
    Serial(String),

    /// Reading or writing the port failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serialport::Error> for ProtocolError {
    fn from(e: serialport::Error) -> Self {
        ProtocolError::Serial(e.to_string())
    }
}
