//! Device Controller
//!
//! Turns pan/tilt/delay/read intents into the firmware's ready/response
//! handshake. Every operation blocks until the device reports `ready`.
//!
//! Per command the controller moves `Idle -> AwaitingReady -> Idle`. It never
//! writes a new command while a previous one is still awaiting `ready`.

mod reading;
mod sweep;

pub use reading::{
    map_range, raw_to_voltage, CalibrationRow, DistanceRow, Reading, ScanRow, RAW_MAX, RAW_MIN,
    VOLTAGE_MAX, VOLTAGE_MIN,
};
pub use sweep::{AxisRange, Sweep, SweepPlan, SweepProgress};

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use crate::protocol::{Command, ProtocolError, RawTriple, TelemetryLine, Transport};

/// Default ceiling for pan and tilt angles in degrees
pub const DEFAULT_MAX_ANGLE: u32 = 170;

/// Controller configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Highest accepted pan/tilt angle in degrees
    pub max_angle: u32,
    /// Longest time to wait for the ready sentinel; `None` waits forever
    ///
    /// Checked between line reads, so the actual wait can run past this by up
    /// to one transport read timeout.
    pub max_wait: Option<Duration>,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            max_angle: DEFAULT_MAX_ANGLE,
            max_wait: None,
        }
    }
}

/// Handshake state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HandshakeState {
    /// Device has reported ready; a command may be sent
    Idle,
    /// A command was sent and its ready sentinel has not been seen yet
    AwaitingReady,
}

/// Host-side mirror of the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceState {
    /// Last pan angle the device acknowledged
    pub pan_angle: Option<u32>,
    /// Last tilt angle the device acknowledged
    pub tilt_angle: Option<u32>,
    /// Whether the device is idle
    pub ready: bool,
}

/// Controller for the pan/tilt scanner
///
/// Owns its [`Transport`] exclusively. Out-of-range pan/tilt requests are
/// dropped without sending anything and without an error; check the returned
/// flag when it matters.
pub struct Scanner<T: Transport> {
    transport: T,
    config: ControllerConfig,
    state: HandshakeState,
    pan_angle: Option<u32>,
    tilt_angle: Option<u32>,
}

impl<T: Transport> Scanner<T> {
    /// Wrap an open transport. No command is sent.
    pub fn new(transport: T, config: ControllerConfig) -> Self {
        Self {
            transport,
            config,
            state: HandshakeState::Idle,
            pan_angle: None,
            tilt_angle: None,
        }
    }

    /// Wrap an open transport and move the rig to its center
    ///
    /// The device forgets its orientation across power cycles, so each session
    /// starts from a known position.
    pub fn homed(transport: T, config: ControllerConfig) -> Result<Self, ProtocolError> {
        let mut scanner = Self::new(transport, config);
        scanner.center()?;
        Ok(scanner)
    }

    /// Whether the device has acknowledged the last command
    pub fn ready(&self) -> bool {
        self.state == HandshakeState::Idle
    }

    /// Current handshake state
    pub fn handshake_state(&self) -> HandshakeState {
        self.state
    }

    /// Snapshot of the mirrored device state
    pub fn state(&self) -> DeviceState {
        DeviceState {
            pan_angle: self.pan_angle,
            tilt_angle: self.tilt_angle,
            ready: self.ready(),
        }
    }

    /// Last acknowledged pan angle
    pub fn pan_angle(&self) -> Option<u32> {
        self.pan_angle
    }

    /// Last acknowledged tilt angle
    pub fn tilt_angle(&self) -> Option<u32> {
        self.tilt_angle
    }

    /// Controller configuration
    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// Borrow the underlying transport
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Mutably borrow the underlying transport
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Give back the transport
    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Move the pan axis
    ///
    /// Returns `Ok(false)` without touching the device when `angle` is outside
    /// `0..=max_angle`.
    pub fn pan(&mut self, angle: i64) -> Result<bool, ProtocolError> {
        let Some(angle) = self.checked_angle("pan", angle) else {
            return Ok(false);
        };
        self.send(Command::Pan(angle))?;
        self.pan_angle = Some(angle);
        Ok(true)
    }

    /// Move the tilt axis
    ///
    /// Returns `Ok(false)` without touching the device when `angle` is outside
    /// `0..=max_angle`.
    pub fn tilt(&mut self, angle: i64) -> Result<bool, ProtocolError> {
        let Some(angle) = self.checked_angle("tilt", angle) else {
            return Ok(false);
        };
        self.send(Command::Tilt(angle))?;
        self.tilt_angle = Some(angle);
        Ok(true)
    }

    /// Let the device pause, typically so the mount stops vibrating before a read
    pub fn delay(&mut self, milliseconds: u64) -> Result<(), ProtocolError> {
        self.send(Command::Delay(milliseconds)).map(|_| ())
    }

    /// Take one reading and return the raw axis values
    pub fn read_raw(&mut self) -> Result<RawTriple, ProtocolError> {
        let lines = self.send(Command::ReadSensor)?;
        RawTriple::from_lines(lines.as_slice())
    }

    /// Take one reading, with the sensor value converted to volts
    pub fn read_sensor(&mut self) -> Result<Reading, ProtocolError> {
        self.read_raw().map(Reading::from)
    }

    /// Move both axes to 0
    pub fn zero(&mut self) -> Result<(), ProtocolError> {
        self.pan(0)?;
        self.tilt(0)?;
        Ok(())
    }

    /// Move both axes to `max_angle / 2`
    pub fn center(&mut self) -> Result<(), ProtocolError> {
        let mid = i64::from(self.config.max_angle / 2);
        self.pan(mid)?;
        self.tilt(mid)?;
        // Pick up anything still trailing the last acknowledgement
        self.read_until_ready()?;
        Ok(())
    }

    fn checked_angle(&self, axis: &str, angle: i64) -> Option<u32> {
        match u32::try_from(angle) {
            Ok(a) if a <= self.config.max_angle => Some(a),
            _ => {
                tracing::warn!(
                    "ignoring {} angle {} outside 0..={}",
                    axis,
                    angle,
                    self.config.max_angle
                );
                None
            }
        }
    }

    /// Send one command and drain until the device is ready again
    ///
    /// Returns the data lines received during the drain. Angle commands sent
    /// this way bypass range checking and do not update the mirrored angles.
    pub fn send(&mut self, command: Command) -> Result<Vec<String>, ProtocolError> {
        if self.state == HandshakeState::AwaitingReady {
            tracing::debug!("send: previous command still outstanding, draining first");
            self.read_until_ready()?;
        }

        tracing::debug!("send: {}", command);
        self.transport.write_line(&command.to_string())?;
        self.state = HandshakeState::AwaitingReady;
        self.read_until_ready()
    }

    /// Drain the link until the ready sentinel has been seen and no input is pending
    ///
    /// Returns every non-blank line other than the sentinel, in arrival order.
    /// Draining continues past the sentinel while input is pending so trailing
    /// lines of this response do not leak into the next one. With `max_wait`
    /// configured, fails with [`ProtocolError::DeviceUnresponsive`] if the
    /// sentinel has not arrived in time.
    pub fn read_until_ready(&mut self) -> Result<Vec<String>, ProtocolError> {
        let started = Instant::now();
        let mut data = Vec::new();

        loop {
            let ready = self.state == HandshakeState::Idle;
            if ready && !self.transport.has_pending_input()? {
                break;
            }

            if let Some(max_wait) = self.config.max_wait {
                if started.elapsed() >= max_wait {
                    if ready {
                        tracing::warn!(
                            "read_until_ready: input still pending after {:?}, leaving the rest",
                            max_wait
                        );
                        break;
                    }
                    return Err(ProtocolError::DeviceUnresponsive {
                        waited_ms: u64::try_from(started.elapsed().as_millis())
                            .unwrap_or(u64::MAX),
                    });
                }
            }

            let line = self.transport.read_line()?;
            match TelemetryLine::classify(&line) {
                TelemetryLine::Ready => self.state = HandshakeState::Idle,
                TelemetryLine::Data(text) => data.push(text.to_string()),
                TelemetryLine::Empty => {}
            }
        }

        Ok(data)
    }
}
