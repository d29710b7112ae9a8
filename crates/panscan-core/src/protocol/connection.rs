//! Connection management
//!
//! Owns the serial link to the scanner: selecting and opening an endpoint,
//! line framing on top of the raw byte stream, and releasing the port.

use serde::{Deserialize, Serialize};
use serialport::SerialPort;
use std::io::{ErrorKind, Read, Write};
use std::time::{Duration, Instant};

use super::{
    commands::encode_line,
    serial::{clear_buffers, configure_port, open_port},
    BaudClass, Confirmation, PortInfo, PortSelector, ProtocolError, Transport, DEFAULT_BAUD_RATE,
    DEFAULT_READ_TIMEOUT_MS,
};

/// Log target for raw line traffic
const TRAFFIC_TARGET: &str = "panscan_core::traffic";

/// Connection configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Baud rate
    pub baud_rate: u32,
    /// Bounded wait for a single line read in milliseconds
    pub read_timeout_ms: u64,
    /// Only auto-detect endpoints with known controller board USB IDs
    pub known_boards_only: bool,
    /// Emit every line sent and received at trace level
    pub log_traffic: bool,
    /// Pause after opening the port before the link is used, in milliseconds
    pub open_delay_ms: u64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            baud_rate: DEFAULT_BAUD_RATE,
            read_timeout_ms: DEFAULT_READ_TIMEOUT_MS,
            known_boards_only: true,
            log_traffic: false,
            open_delay_ms: 0,
        }
    }
}

/// Serial link to the scanner
///
/// At most one port is open at a time. The port is released on [`close`](Transport::close)
/// or when the connection is dropped.
pub struct SerialConnection {
    /// Serial port handle
    port: Option<Box<dyn SerialPort>>,
    /// Endpoint the port was opened on
    endpoint: Option<PortInfo>,
    /// Connection configuration
    config: ConnectionConfig,
    /// Bytes received but not yet returned as a line
    rx: Vec<u8>,
}

impl SerialConnection {
    /// Create a new connection (not yet connected)
    pub fn new(config: ConnectionConfig) -> Self {
        Self {
            port: None,
            endpoint: None,
            config,
            rx: Vec::new(),
        }
    }

    /// Get the endpoint of the open port
    pub fn endpoint(&self) -> Option<&PortInfo> {
        self.endpoint.as_ref()
    }

    /// Get the connection configuration
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Select an endpoint through `selector` and open it
    ///
    /// Known controller boards are tried first, each after a confirmation. If
    /// none of them opens, the selector chooses from every visible endpoint.
    pub fn connect_with(&mut self, selector: &mut dyn PortSelector) -> Result<(), ProtocolError> {
        self.ensure_closed()?;

        let baud_rate = self.config.baud_rate;
        let class = BaudClass::classify(baud_rate);
        if class != BaudClass::Standard {
            tracing::warn!("baud rate {} is {:?}; asking for confirmation", baud_rate, class);
            if !selector.confirm(&Confirmation::Baud { baud_rate, class }) {
                return Err(ProtocolError::Connection(format!(
                    "baud rate {} rejected",
                    baud_rate
                )));
            }
        }

        let mut failed: Vec<String> = Vec::new();
        let mut last_err = None;

        for port in selector.list_candidates(self.config.known_boards_only) {
            tracing::info!(
                "possible scanner port detected: {} ({})",
                port.device_path,
                port.description.as_deref().unwrap_or("no description")
            );
            if !selector.confirm(&Confirmation::Connect {
                port: &port,
                baud_rate,
            }) {
                tracing::info!("not connecting to port {}", port.name);
                continue;
            }
            match self.open(&port, baud_rate) {
                Ok(()) => return Ok(()),
                Err(e) => {
                    tracing::warn!("{}", e);
                    failed.push(port.device_path.clone());
                    last_err = Some(e);
                }
            }
        }

        tracing::info!("no recognized port opened; falling back to manual selection");
        let all = selector.list_candidates(false);
        let port = selector
            .choose(&all)
            .and_then(|i| all.get(i))
            .ok_or(ProtocolError::NoPortSelected)?;

        if failed.contains(&port.device_path) {
            if let Some(e) = last_err {
                return Err(e);
            }
        }
        self.open(port, baud_rate)
    }

    /// Open `endpoint` at `baud_rate`
    pub fn open(&mut self, endpoint: &PortInfo, baud_rate: u32) -> Result<(), ProtocolError> {
        self.ensure_closed()?;

        let read_timeout = Duration::from_millis(self.config.read_timeout_ms);
        let mut port = open_port(&endpoint.device_path, baud_rate, Some(read_timeout))?;
        configure_port(port.as_mut())?;

        if self.config.open_delay_ms > 0 {
            tracing::debug!(
                "open: waiting {}ms after port open for the board to settle",
                self.config.open_delay_ms
            );
            std::thread::sleep(Duration::from_millis(self.config.open_delay_ms));
        }
        clear_buffers(port.as_mut())?;

        self.port = Some(port);
        self.endpoint = Some(endpoint.clone());
        self.config.baud_rate = baud_rate;
        self.rx.clear();

        tracing::info!("opened port {} at {} baud", endpoint.name, baud_rate);
        Ok(())
    }

    fn ensure_closed(&self) -> Result<(), ProtocolError> {
        match &self.endpoint {
            Some(endpoint) if self.port.is_some() => Err(ProtocolError::Connection(format!(
                "already connected to {}",
                endpoint.device_path
            ))),
            _ => Ok(()),
        }
    }

    /// Take one complete line out of the receive buffer
    fn take_line(&mut self) -> Option<String> {
        let pos = self.rx.iter().position(|&b| b == b'\n')?;
        let bytes: Vec<u8> = self.rx.drain(..=pos).collect();
        Some(decode_line(&bytes))
    }

    fn log_rx(&self, line: &str) {
        if self.config.log_traffic && !line.is_empty() {
            tracing::trace!(target: TRAFFIC_TARGET, "<- {}", line);
        }
    }
}

fn decode_line(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes)
        .trim_end_matches(['\r', '\n'])
        .to_string()
}

impl Transport for SerialConnection {
    fn read_line(&mut self) -> Result<String, ProtocolError> {
        if let Some(line) = self.take_line() {
            self.log_rx(&line);
            return Ok(line);
        }

        let timeout = Duration::from_millis(self.config.read_timeout_ms);
        let deadline = Instant::now() + timeout;
        let port = self.port.as_mut().ok_or(ProtocolError::NotConnected)?;
        let mut buffer = [0u8; 256];

        while Instant::now() < deadline {
            match port.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => {
                    self.rx.extend_from_slice(&buffer[..n]);
                    if self.rx[self.rx.len() - n..].contains(&b'\n') {
                        break;
                    }
                }
                Err(ref e) if e.kind() == ErrorKind::TimedOut || e.kind() == ErrorKind::WouldBlock => {
                    break
                }
                Err(e) => return Err(ProtocolError::Serial(e.to_string())),
            }
        }

        // An unterminated tail stays buffered and reports as pending input
        match self.take_line() {
            Some(line) => {
                self.log_rx(&line);
                Ok(line)
            }
            None => Ok(String::new()),
        }
    }

    fn write_line(&mut self, text: &str) -> Result<(), ProtocolError> {
        let port = self.port.as_mut().ok_or(ProtocolError::NotConnected)?;

        port.write_all(&encode_line(text))?;
        port.flush()?;

        if self.config.log_traffic {
            tracing::trace!(target: TRAFFIC_TARGET, "-> {}", text);
        }
        Ok(())
    }

    fn has_pending_input(&mut self) -> Result<bool, ProtocolError> {
        let port = self.port.as_mut().ok_or(ProtocolError::NotConnected)?;
        if !self.rx.is_empty() {
            return Ok(true);
        }
        Ok(port.bytes_to_read()? > 0)
    }

    fn close(&mut self) {
        if self.port.take().is_some() {
            if let Some(endpoint) = &self.endpoint {
                tracing::info!("closed port {}", endpoint.name);
            }
        }
        self.endpoint = None;
        self.rx.clear();
    }

    fn is_open(&self) -> bool {
        self.port.is_some()
    }
}

impl Drop for SerialConnection {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Selector with canned candidates and answers
    struct ScriptedSelector {
        candidates: Vec<PortInfo>,
        answer: bool,
        choice: Option<usize>,
        questions: usize,
    }

    impl PortSelector for ScriptedSelector {
        fn list_candidates(&mut self, _known_boards_only: bool) -> Vec<PortInfo> {
            self.candidates.clone()
        }

        fn choose(&mut self, _candidates: &[PortInfo]) -> Option<usize> {
            self.choice
        }

        fn confirm(&mut self, _question: &Confirmation<'_>) -> bool {
            self.questions += 1;
            self.answer
        }
    }

    #[test]
    fn test_connection_config_default() {
        let config = ConnectionConfig::default();
        assert_eq!(config.baud_rate, DEFAULT_BAUD_RATE);
        assert_eq!(config.read_timeout_ms, DEFAULT_READ_TIMEOUT_MS);
        assert!(config.known_boards_only);
        assert!(!config.log_traffic);
    }

    #[test]
    fn test_new_connection_is_closed() {
        let conn = SerialConnection::new(ConnectionConfig::default());
        assert!(!conn.is_open());
        assert!(conn.endpoint().is_none());
    }

    #[test]
    fn test_io_requires_connection() {
        let mut conn = SerialConnection::new(ConnectionConfig::default());
        assert!(matches!(
            conn.write_line("PAN|10"),
            Err(ProtocolError::NotConnected)
        ));
        assert!(matches!(conn.read_line(), Err(ProtocolError::NotConnected)));
        assert!(matches!(
            conn.has_pending_input(),
            Err(ProtocolError::NotConnected)
        ));
    }

    #[test]
    fn test_close_is_idempotent() {
        let mut conn = SerialConnection::new(ConnectionConfig::default());
        conn.close();
        conn.close();
        assert!(!conn.is_open());
    }

    #[test]
    fn test_declined_everything() {
        let mut conn = SerialConnection::new(ConnectionConfig::default());
        let mut selector = ScriptedSelector {
            candidates: vec![PortInfo::from_path("/dev/panscan-missing0")],
            answer: false,
            choice: None,
            questions: 0,
        };
        let result = conn.connect_with(&mut selector);
        assert!(matches!(result, Err(ProtocolError::NoPortSelected)));
        assert_eq!(selector.questions, 1);
        assert!(!conn.is_open());
    }

    #[test]
    fn test_nonstandard_baud_declined() {
        let config = ConnectionConfig {
            baud_rate: 12345,
            ..ConnectionConfig::default()
        };
        let mut conn = SerialConnection::new(config);
        let mut selector = ScriptedSelector {
            candidates: Vec::new(),
            answer: false,
            choice: None,
            questions: 0,
        };
        let result = conn.connect_with(&mut selector);
        assert!(matches!(result, Err(ProtocolError::Connection(_))));
        assert_eq!(selector.questions, 1);
    }

    #[test]
    fn test_failed_open_is_reported_once() {
        let mut conn = SerialConnection::new(ConnectionConfig::default());
        let mut selector = ScriptedSelector {
            candidates: vec![PortInfo::from_path("/dev/panscan-missing1")],
            answer: true,
            choice: Some(0),
            questions: 0,
        };
        let result = conn.connect_with(&mut selector);
        assert!(matches!(result, Err(ProtocolError::Connection(_))));
        assert!(!conn.is_open());
    }

    #[test]
    fn test_decode_line() {
        assert_eq!(decode_line(b"X10\r\n"), "X10");
        assert_eq!(decode_line(b"ready\n"), "ready");
        assert_eq!(decode_line(b"Z4"), "Z4");
    }

    #[cfg(unix)]
    fn pty_link() -> (SerialConnection, serialport::TTYPort) {
        let (host, mut device) = serialport::TTYPort::pair().unwrap();
        device.set_timeout(Duration::from_secs(2)).unwrap();
        let mut conn = SerialConnection::new(ConnectionConfig {
            read_timeout_ms: 100,
            ..ConnectionConfig::default()
        });
        conn.port = Some(Box::new(host));
        conn.endpoint = Some(PortInfo::from_path("/dev/ptmx"));
        (conn, device)
    }

    #[cfg(unix)]
    #[test]
    fn test_write_line_appends_carriage_return() {
        let (mut conn, mut device) = pty_link();
        conn.write_line("PAN|10").unwrap();

        let mut buf = [0u8; 7];
        device.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"PAN|10\r");
    }

    #[cfg(unix)]
    #[test]
    fn test_read_line_timeout_is_empty() {
        let (mut conn, _device) = pty_link();
        assert_eq!(conn.read_line().unwrap(), "");
        assert!(!conn.has_pending_input().unwrap());
    }

    #[cfg(unix)]
    #[test]
    fn test_split_line_is_held_until_terminated() {
        let (mut conn, mut device) = pty_link();
        device.write_all(b"X10\nY20\nZ4").unwrap();
        device.flush().unwrap();

        assert_eq!(conn.read_line().unwrap(), "X10");
        assert_eq!(conn.read_line().unwrap(), "Y20");
        assert_eq!(conn.read_line().unwrap(), "");
        assert!(conn.has_pending_input().unwrap());

        device.write_all(b"45\r\n").unwrap();
        device.flush().unwrap();
        assert_eq!(conn.read_line().unwrap(), "Z445");
        assert!(!conn.has_pending_input().unwrap());
    }

    #[cfg(unix)]
    #[test]
    fn test_sensor_reading_survives_stalled_line() {
        use crate::scanner::{ControllerConfig, Scanner};
        use std::thread;

        let (conn, mut device) = pty_link();
        let firmware = thread::spawn(move || {
            let mut command = [0u8; 11];
            device.read_exact(&mut command).unwrap();
            assert_eq!(&command, b"READSENSOR\r");

            device.write_all(b"X10\nY20\nZ4").unwrap();
            device.flush().unwrap();
            thread::sleep(Duration::from_millis(300));
            device.write_all(b"45\nready\n").unwrap();
            device.flush().unwrap();
        });

        let mut scanner = Scanner::new(conn, ControllerConfig::default());
        let raw = scanner.read_raw().unwrap();
        firmware.join().unwrap();

        assert_eq!((raw.x, raw.y, raw.z), (10, 20, 445));
        assert!(scanner.ready());
    }
}
