//! Serial port handling
//!
//! Provides endpoint discovery and low-level port access for the scanner link.

use serde::{Deserialize, Serialize};
use serialport::{SerialPort, SerialPortInfo, SerialPortType};
use std::collections::HashMap;
#[cfg(target_os = "linux")]
use std::fs;
use std::time::Duration;

use super::{ProtocolError, DEFAULT_READ_TIMEOUT_MS, EXTENDED_BAUDS, KNOWN_BOARDS, STANDARD_BAUDS};

/// Information about an available serial endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortInfo {
    /// Short name (e.g., "ttyUSB0" or "COM3")
    pub name: String,

    /// Full device path used to open the port
    pub device_path: String,

    /// USB vendor ID (if USB device)
    pub vendor_id: Option<u16>,

    /// USB product ID (if USB device)
    pub product_id: Option<u16>,

    /// Human readable description (if available)
    pub description: Option<String>,
}

impl PortInfo {
    /// Describe an endpoint known only by its device path
    pub fn from_path(path: &str) -> Self {
        Self {
            name: short_name(path).to_string(),
            device_path: path.to_string(),
            vendor_id: None,
            product_id: None,
            description: None,
        }
    }

    /// Check whether this endpoint belongs to a supported controller board
    pub fn is_known_board(&self) -> bool {
        match (self.vendor_id, self.product_id) {
            (Some(vid), Some(pid)) => is_known_board(vid, pid),
            _ => false,
        }
    }
}

impl From<SerialPortInfo> for PortInfo {
    fn from(info: SerialPortInfo) -> Self {
        let (vendor_id, product_id, description) = match info.port_type {
            SerialPortType::UsbPort(usb_info) => {
                let description = match (usb_info.manufacturer, usb_info.product) {
                    (Some(m), Some(p)) => Some(format!("{} {}", m, p)),
                    (m, p) => m.or(p),
                };
                (Some(usb_info.vid), Some(usb_info.pid), description)
            }
            SerialPortType::BluetoothPort => (None, None, Some("Bluetooth".to_string())),
            SerialPortType::PciPort => (None, None, Some("PCI".to_string())),
            _ => (None, None, None),
        };

        Self {
            name: short_name(&info.port_name).to_string(),
            device_path: info.port_name,
            vendor_id,
            product_id,
            description,
        }
    }
}

/// Check a USB vendor/product pair against the supported boards
pub fn is_known_board(vendor_id: u16, product_id: u16) -> bool {
    KNOWN_BOARDS.contains(&(vendor_id, product_id))
}

fn short_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Helper used to sort port names so that:
///  - ttyACM* ports come first (sorted numerically by suffix)
///  - then ttyUSB* ports (sorted numerically)
///  - then other ports (sorted by name)
fn port_sort_key(name: &str) -> (u8, usize, String) {
    let basename = short_name(name);
    if let Some(rest) = basename.strip_prefix("ttyACM") {
        let num = rest.parse::<usize>().unwrap_or(usize::MAX);
        return (0, num, basename.to_string());
    }
    if let Some(rest) = basename.strip_prefix("ttyUSB") {
        let num = rest.parse::<usize>().unwrap_or(usize::MAX);
        return (1, num, basename.to_string());
    }
    (2, 0, basename.to_string())
}

/// List all available serial ports, with /dev fallbacks and deterministic ordering
///
/// Enumerates afresh on every call.
pub fn list_ports() -> Vec<PortInfo> {
    let mut map: HashMap<String, PortInfo> = HashMap::new();
    for info in serialport::available_ports().unwrap_or_default() {
        let p = PortInfo::from(info);
        map.entry(p.device_path.clone()).or_insert(p);
    }

    // Linux-only: Add /dev/ttyACM* and /dev/ttyUSB* entries if present but not found by API
    #[cfg(target_os = "linux")]
    if let Ok(entries) = fs::read_dir("/dev") {
        for entry in entries.flatten() {
            if let Some(fname) = entry.file_name().to_str() {
                if fname.starts_with("ttyACM") || fname.starts_with("ttyUSB") {
                    let full = format!("/dev/{}", fname);
                    map.entry(full.clone())
                        .or_insert_with(|| PortInfo::from_path(&full));
                }
            }
        }
    }

    let mut v: Vec<PortInfo> = map.into_values().collect();
    v.sort_by_key(|p| port_sort_key(&p.device_path));
    v
}

/// Enumerate candidate endpoints
///
/// With `known_boards_only` set, only endpoints whose USB IDs match a
/// supported controller board are returned.
pub fn discover(known_boards_only: bool) -> impl Iterator<Item = PortInfo> {
    list_ports()
        .into_iter()
        .filter(move |p| !known_boards_only || p.is_known_board())
}

/// Classification of a baud rate by how widely it is supported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BaudClass {
    /// Supported by every host serial driver
    Standard,
    /// Works on some hosts and adapters
    Extended,
    /// Unlikely to be supported anywhere
    NonStandard,
}

impl BaudClass {
    /// Classify a baud rate
    pub fn classify(baud: u32) -> Self {
        if STANDARD_BAUDS.contains(&baud) {
            BaudClass::Standard
        } else if EXTENDED_BAUDS.contains(&baud) {
            BaudClass::Extended
        } else {
            BaudClass::NonStandard
        }
    }
}

/// Open a serial port with the given line read timeout
pub fn open_port(
    path: &str,
    baud_rate: u32,
    read_timeout: Option<Duration>,
) -> Result<Box<dyn SerialPort>, ProtocolError> {
    if baud_rate == 0 {
        return Err(ProtocolError::Connection(format!(
            "{path}: baud rate must be non-zero"
        )));
    }

    serialport::new(path, baud_rate)
        .timeout(read_timeout.unwrap_or(Duration::from_millis(DEFAULT_READ_TIMEOUT_MS)))
        .open()
        .map_err(|e| {
            ProtocolError::Connection(format!(
                "can't open {path} at {baud_rate} baud ({e}); is the port already in use?"
            ))
        })
}

/// Configure a serial port for the scanner link (8N1, no flow control)
pub fn configure_port(port: &mut dyn SerialPort) -> Result<(), ProtocolError> {
    port.set_data_bits(serialport::DataBits::Eight)?;
    port.set_parity(serialport::Parity::None)?;
    port.set_stop_bits(serialport::StopBits::One)?;
    port.set_flow_control(serialport::FlowControl::None)?;

    // Keep DTR asserted so the board does not drop back into its bootloader mid-session
    if let Err(e) = port.write_data_terminal_ready(true) {
        tracing::debug!("configure_port: failed to set DTR high: {} (continuing)", e);
    }

    Ok(())
}

/// Clear the serial port buffers
pub fn clear_buffers(port: &mut dyn SerialPort) -> Result<(), ProtocolError> {
    port.clear(serialport::ClearBuffer::All)?;
    Ok(())
}
