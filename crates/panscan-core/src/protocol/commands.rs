//! Protocol commands
//!
//! Defines the commands understood by the scanner firmware.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::COMMAND_TERMINATOR;

/// Outbound instructions for the scanner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    /// Move the pan servo to an angle in degrees (`PAN|<angle>`)
    Pan(u32),

    /// Move the tilt servo to an angle in degrees (`TILT|<angle>`)
    Tilt(u32),

    /// Pause for a number of milliseconds before the next instruction (`DELAY|<ms>`)
    Delay(u64),

    /// Take one sensor reading (`READSENSOR`)
    ReadSensor,
}

impl Command {
    /// Keyword that starts the command line
    pub fn keyword(&self) -> &'static str {
        match self {
            Command::Pan(_) => "PAN",
            Command::Tilt(_) => "TILT",
            Command::Delay(_) => "DELAY",
            Command::ReadSensor => "READSENSOR",
        }
    }

    /// Parse a command line as the firmware would
    ///
    /// Accepts an optional trailing terminator. Returns `None` for anything the
    /// firmware would not recognize.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        let (keyword, arg) = match line.split_once('|') {
            Some((k, a)) => (k, Some(a.trim())),
            None => (line, None),
        };

        match (keyword, arg) {
            ("PAN", Some(a)) => a.parse().ok().map(Command::Pan),
            ("TILT", Some(a)) => a.parse().ok().map(Command::Tilt),
            ("DELAY", Some(a)) => a.parse().ok().map(Command::Delay),
            ("READSENSOR", None) => Some(Command::ReadSensor),
            _ => None,
        }
    }
}

/// Frame an outbound line for the wire by appending the command terminator
pub fn encode_line(text: &str) -> Vec<u8> {
    let mut data = Vec::with_capacity(text.len() + 1);
    data.extend_from_slice(text.as_bytes());
    data.push(COMMAND_TERMINATOR as u8);
    data
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Pan(angle) | Command::Tilt(angle) => write!(f, "{}|{}", self.keyword(), angle),
            Command::Delay(ms) => write!(f, "{}|{}", self.keyword(), ms),
            Command::ReadSensor => f.write_str(self.keyword()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_lines() {
        assert_eq!(Command::Pan(85).to_string(), "PAN|85");
        assert_eq!(Command::Tilt(0).to_string(), "TILT|0");
        assert_eq!(Command::Delay(100).to_string(), "DELAY|100");
        assert_eq!(Command::ReadSensor.to_string(), "READSENSOR");
    }

    #[test]
    fn test_encode_line_terminated() {
        assert_eq!(encode_line(&Command::Pan(170).to_string()), b"PAN|170\r".to_vec());
        assert_eq!(encode_line("READSENSOR"), b"READSENSOR\r".to_vec());
    }

    #[test]
    fn test_parse() {
        assert_eq!(Command::parse("PAN|12\r"), Some(Command::Pan(12)));
        assert_eq!(Command::parse("TILT|90"), Some(Command::Tilt(90)));
        assert_eq!(Command::parse("DELAY|1000"), Some(Command::Delay(1000)));
        assert_eq!(Command::parse("READSENSOR"), Some(Command::ReadSensor));
        assert_eq!(Command::parse("PAN|-3"), None);
        assert_eq!(Command::parse("PAN"), None);
        assert_eq!(Command::parse("READSENSOR|1"), None);
        assert_eq!(Command::parse("hello"), None);
    }
}
