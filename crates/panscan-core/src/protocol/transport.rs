//! Line transport abstraction
//!
//! The handshake only needs line-level primitives, so anything that can move
//! text lines to and from the device can stand in for the serial port.

use super::ProtocolError;

/// Line-level link to the scanner
pub trait Transport {
    /// Read the next line, without its terminator
    ///
    /// Blocks for at most the configured read timeout. Returns an empty string
    /// when no data arrived in time; a timeout is never an error.
    fn read_line(&mut self) -> Result<String, ProtocolError>;

    /// Send `text` followed by the command terminator
    fn write_line(&mut self, text: &str) -> Result<(), ProtocolError>;

    /// Check whether received bytes are still waiting to be read
    fn has_pending_input(&mut self) -> Result<bool, ProtocolError>;

    /// Release the link. Calling this more than once has no further effect.
    fn close(&mut self);

    /// Check whether the link is open
    fn is_open(&self) -> bool;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn read_line(&mut self) -> Result<String, ProtocolError> {
        (**self).read_line()
    }

    fn write_line(&mut self, text: &str) -> Result<(), ProtocolError> {
        (**self).write_line(text)
    }

    fn has_pending_input(&mut self) -> Result<bool, ProtocolError> {
        (**self).has_pending_input()
    }

    fn close(&mut self) {
        (**self).close()
    }

    fn is_open(&self) -> bool {
        (**self).is_open()
    }
}
