//! Demo Mode - Simulated scanner for running without hardware
//!
//! Speaks the same line protocol as the firmware. The simulated sensor looks
//! at a flat wall with a rounded object in front of it near the rig's center,
//! plus a little ADC noise.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;

use crate::protocol::{Command, ProtocolError, Transport, READY_SENTINEL};

/// Distance to the background wall in centimetres
const WALL_DISTANCE_CM: f64 = 120.0;
/// Distance to the nearest point of the object in centimetres
const OBJECT_DISTANCE_CM: f64 = 45.0;
/// Angular radius of the object in degrees
const OBJECT_RADIUS_DEG: f64 = 18.0;
/// Where the object sits (pan, tilt)
const OBJECT_CENTER: (f64, f64) = (90.0, 82.0);

/// Simulated scanner firmware
pub struct DemoDevice {
    /// Current pan servo angle
    pan: u32,
    /// Current tilt servo angle
    tilt: u32,
    /// Lines waiting to be read by the host
    outbox: VecDeque<String>,
    /// Commands received, in order
    received: Vec<String>,
    /// Whether the simulated port is open
    open: bool,
    /// Random number generator for sensor noise
    rng: StdRng,
}

impl Default for DemoDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl DemoDevice {
    /// Create a simulator seeded from entropy
    pub fn new() -> Self {
        Self::from_rng(StdRng::from_entropy())
    }

    /// Create a simulator with reproducible noise
    pub fn with_seed(seed: u64) -> Self {
        Self::from_rng(StdRng::seed_from_u64(seed))
    }

    fn from_rng(rng: StdRng) -> Self {
        Self {
            pan: 0,
            tilt: 0,
            outbox: VecDeque::new(),
            received: Vec::new(),
            open: true,
            rng,
        }
    }

    /// Command lines received so far, without terminators
    pub fn received(&self) -> &[String] {
        &self.received
    }

    /// Current servo angles (pan, tilt)
    pub fn angles(&self) -> (u32, u32) {
        (self.pan, self.tilt)
    }

    /// Simulated distance in centimetres at the current orientation
    pub fn distance_cm(&self) -> f64 {
        let dp = self.pan as f64 - OBJECT_CENTER.0;
        let dt = self.tilt as f64 - OBJECT_CENTER.1;
        let off_axis = (dp * dp + dt * dt).sqrt() / OBJECT_RADIUS_DEG;
        if off_axis >= 1.0 {
            WALL_DISTANCE_CM
        } else {
            // Dome: nearest at the middle, blending into the wall at the rim
            let depth = (1.0 - off_axis * off_axis).sqrt();
            WALL_DISTANCE_CM - (WALL_DISTANCE_CM - OBJECT_DISTANCE_CM) * depth
        }
    }

    /// Raw ADC count the sensor would report at the current orientation
    fn sample(&mut self) -> i64 {
        // Infrared ranging sensors fall off roughly with inverse distance
        let volts = 60.0 / (self.distance_cm() + 4.0);
        let counts = volts / 5.0 * 1023.0 + self.rng.gen_range(-4.0..=4.0);
        counts.round().clamp(0.0, 1023.0) as i64
    }

    fn handle(&mut self, line: &str) {
        match Command::parse(line) {
            Some(Command::Pan(angle)) => self.pan = angle,
            Some(Command::Tilt(angle)) => self.tilt = angle,
            Some(Command::Delay(_)) => {}
            Some(Command::ReadSensor) => {
                let z = self.sample();
                self.outbox.push_back(format!("X{}", self.pan));
                self.outbox.push_back(format!("Y{}", self.tilt));
                self.outbox.push_back(format!("Z{}", z));
            }
            None => {
                self.outbox.push_back(format!("unknown command: {}", line.trim()));
            }
        }
        self.outbox.push_back(READY_SENTINEL.to_string());
    }
}

impl Transport for DemoDevice {
    fn read_line(&mut self) -> Result<String, ProtocolError> {
        if !self.open {
            return Err(ProtocolError::NotConnected);
        }
        Ok(self.outbox.pop_front().unwrap_or_default())
    }

    fn write_line(&mut self, text: &str) -> Result<(), ProtocolError> {
        if !self.open {
            return Err(ProtocolError::NotConnected);
        }
        self.received.push(text.to_string());
        self.handle(text);
        Ok(())
    }

    fn has_pending_input(&mut self) -> Result<bool, ProtocolError> {
        if !self.open {
            return Err(ProtocolError::NotConnected);
        }
        Ok(!self.outbox.is_empty())
    }

    fn close(&mut self) {
        self.open = false;
        self.outbox.clear();
    }

    fn is_open(&self) -> bool {
        self.open
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acknowledges_every_command() {
        let mut dev = DemoDevice::with_seed(0);
        dev.write_line("PAN|30").unwrap();
        assert_eq!(dev.read_line().unwrap(), "ready");
        assert!(!dev.has_pending_input().unwrap());
        assert_eq!(dev.angles(), (30, 0));
    }

    #[test]
    fn test_sensor_exchange() {
        let mut dev = DemoDevice::with_seed(0);
        dev.write_line("TILT|12").unwrap();
        dev.read_line().unwrap();
        dev.write_line("READSENSOR").unwrap();
        let mut lines = Vec::new();
        while dev.has_pending_input().unwrap() {
            lines.push(dev.read_line().unwrap());
        }
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "X0");
        assert_eq!(lines[1], "Y12");
        assert!(lines[2].starts_with('Z'));
        assert_eq!(lines[3], "ready");
    }

    #[test]
    fn test_unknown_command_is_noise() {
        let mut dev = DemoDevice::with_seed(0);
        dev.write_line("SPIN|3").unwrap();
        assert_eq!(dev.read_line().unwrap(), "unknown command: SPIN|3");
        assert_eq!(dev.read_line().unwrap(), "ready");
        assert_eq!(dev.read_line().unwrap(), "");
    }

    #[test]
    fn test_object_is_closer_than_wall() {
        let mut dev = DemoDevice::with_seed(0);
        assert_eq!(dev.distance_cm(), WALL_DISTANCE_CM);
        dev.write_line("PAN|90").unwrap();
        dev.write_line("TILT|82").unwrap();
        assert!((dev.distance_cm() - OBJECT_DISTANCE_CM).abs() < 1e-9);
    }

    #[test]
    fn test_closed_device() {
        let mut dev = DemoDevice::with_seed(0);
        dev.close();
        dev.close();
        assert!(!dev.is_open());
        assert!(matches!(
            dev.write_line("READSENSOR"),
            Err(ProtocolError::NotConnected)
        ));
    }
}
