//! Port selection strategies
//!
//! Connecting may need a decision: which port, whether to accept an unusual
//! baud rate, whether to open a detected board. Those decisions are delegated
//! to a [`PortSelector`] so a terminal front-end can ask a person while
//! headless runs and tests answer deterministically.

use super::{discover, BaudClass, PortInfo};

/// A yes/no question raised while connecting
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Confirmation<'a> {
    /// Open this detected endpoint at this baud rate?
    Connect {
        /// Endpoint about to be opened
        port: &'a PortInfo,
        /// Requested baud rate
        baud_rate: u32,
    },
    /// Use a baud rate that is not universally supported?
    Baud {
        /// Requested baud rate
        baud_rate: u32,
        /// How widely the rate is supported
        class: BaudClass,
    },
}

/// Decision strategy used by [`SerialConnection::connect_with`](super::SerialConnection::connect_with)
pub trait PortSelector {
    /// Enumerate candidate endpoints
    ///
    /// The default implementation asks the operating system, afresh on every call.
    fn list_candidates(&mut self, known_boards_only: bool) -> Vec<PortInfo> {
        discover(known_boards_only).collect()
    }

    /// Pick one of `candidates` by index, or `None` to give up
    fn choose(&mut self, candidates: &[PortInfo]) -> Option<usize>;

    /// Answer a yes/no question
    fn confirm(&mut self, question: &Confirmation<'_>) -> bool;
}

/// Headless strategy: takes the first candidate and accepts everything
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoSelector;

impl PortSelector for AutoSelector {
    fn choose(&mut self, candidates: &[PortInfo]) -> Option<usize> {
        if candidates.is_empty() {
            None
        } else {
            Some(0)
        }
    }

    fn confirm(&mut self, _question: &Confirmation<'_>) -> bool {
        true
    }
}

/// Strategy for a port named up front (e.g. from the command line)
///
/// The named path is offered as the only candidate even when enumeration does
/// not report it, so virtual and symlinked devices still work.
#[derive(Debug, Clone)]
pub struct FixedPortSelector {
    path: String,
}

impl FixedPortSelector {
    /// Create a selector for a device path
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    /// The device path this selector picks
    pub fn path(&self) -> &str {
        &self.path
    }
}

impl PortSelector for FixedPortSelector {
    fn list_candidates(&mut self, _known_boards_only: bool) -> Vec<PortInfo> {
        let found = discover(false).find(|p| p.device_path == self.path || p.name == self.path);
        vec![found.unwrap_or_else(|| PortInfo::from_path(&self.path))]
    }

    fn choose(&mut self, candidates: &[PortInfo]) -> Option<usize> {
        candidates
            .iter()
            .position(|p| p.device_path == self.path || p.name == self.path)
    }

    fn confirm(&mut self, _question: &Confirmation<'_>) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auto_selector() {
        let mut s = AutoSelector;
        assert_eq!(s.choose(&[]), None);
        let ports = vec![
            PortInfo::from_path("/dev/ttyACM0"),
            PortInfo::from_path("/dev/ttyUSB0"),
        ];
        assert_eq!(s.choose(&ports), Some(0));
        assert!(s.confirm(&Confirmation::Baud {
            baud_rate: 12345,
            class: BaudClass::NonStandard,
        }));
    }

    #[test]
    fn test_fixed_selector_offers_named_path() {
        let mut s = FixedPortSelector::new("/dev/panscan-virtual");
        let candidates = s.list_candidates(true);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].device_path, "/dev/panscan-virtual");
        assert_eq!(s.choose(&candidates), Some(0));
    }

    #[test]
    fn test_fixed_selector_rejects_others() {
        let mut s = FixedPortSelector::new("/dev/ttyACM7");
        let ports = vec![PortInfo::from_path("/dev/ttyUSB0")];
        assert_eq!(s.choose(&ports), None);
    }
}
