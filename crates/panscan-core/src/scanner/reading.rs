//! Sensor readings and the row schemas handed to persistence

use serde::{Deserialize, Serialize};

use crate::protocol::RawTriple;

/// Lower bound of the raw sensor domain
pub const RAW_MIN: f64 = 0.0;
/// Upper bound of the raw sensor domain (10-bit ADC)
pub const RAW_MAX: f64 = 1023.0;
/// Voltage at [`RAW_MIN`]
pub const VOLTAGE_MIN: f64 = 0.0;
/// Voltage at [`RAW_MAX`]
pub const VOLTAGE_MAX: f64 = 5.0;

/// Linearly rescale `x` from `[in_min, in_max]` to `[out_min, out_max]`
///
/// Values outside the input range extrapolate; nothing is clamped.
pub fn map_range(x: f64, in_min: f64, in_max: f64, out_min: f64, out_max: f64) -> f64 {
    (x - in_min) * (out_max - out_min) / (in_max - in_min) + out_min
}

/// Convert a raw ADC count to volts
pub fn raw_to_voltage(raw: i64) -> f64 {
    map_range(raw as f64, RAW_MIN, RAW_MAX, VOLTAGE_MIN, VOLTAGE_MAX)
}

/// One pan/tilt/voltage sample from a single sensor exchange
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Pan angle reported by the device, degrees
    pub pan: f64,
    /// Tilt angle reported by the device, degrees
    pub tilt: f64,
    /// Sensor output, volts
    pub voltage: f64,
}

impl Reading {
    /// Build a reading from the raw axis values
    pub fn from_raw(raw: RawTriple) -> Self {
        Self {
            pan: raw.x as f64,
            tilt: raw.y as f64,
            voltage: raw_to_voltage(raw.z),
        }
    }

    /// The reading as a `(pan, tilt, value)` tuple
    pub fn as_tuple(&self) -> (f64, f64, f64) {
        (self.pan, self.tilt, self.voltage)
    }
}

impl From<RawTriple> for Reading {
    fn from(raw: RawTriple) -> Self {
        Reading::from_raw(raw)
    }
}

/// Row of a scan data set
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScanRow {
    /// Pan angle, degrees
    pub pan: f64,
    /// Tilt angle, degrees
    pub tilt: f64,
    /// Sensor output, volts
    pub voltage: f64,
}

impl From<Reading> for ScanRow {
    fn from(r: Reading) -> Self {
        Self {
            pan: r.pan,
            tilt: r.tilt,
            voltage: r.voltage,
        }
    }
}

/// Row of a calibrated scan, with voltage already converted to distance
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DistanceRow {
    /// Pan angle, degrees
    pub pan: f64,
    /// Tilt angle, degrees
    pub tilt: f64,
    /// Distance in centimetres
    pub distance: f64,
}

impl DistanceRow {
    /// Convert a reading with an externally fitted voltage-to-distance curve
    pub fn from_reading(reading: Reading, to_distance: impl Fn(f64) -> f64) -> Self {
        Self {
            pan: reading.pan,
            tilt: reading.tilt,
            distance: to_distance(reading.voltage),
        }
    }
}

/// Row of a calibration data set: a measured distance and the voltage read there
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CalibrationRow {
    /// Distance to the target in centimetres
    pub distance: f64,
    /// Sensor output, volts
    pub voltage: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_range() {
        assert_eq!(map_range(5.0, 0.0, 10.0, 0.0, 100.0), 50.0);
        assert_eq!(map_range(0.0, 0.0, 10.0, -1.0, 1.0), -1.0);
        assert_eq!(map_range(20.0, 0.0, 10.0, 0.0, 1.0), 2.0);
    }

    #[test]
    fn test_raw_to_voltage_bounds() {
        assert_eq!(raw_to_voltage(0), 0.0);
        assert!((raw_to_voltage(1023) - 5.0).abs() < 1e-12);
        assert!((raw_to_voltage(512) - 2.5024).abs() < 1e-3);
    }

    #[test]
    fn test_reading_from_raw() {
        let r = Reading::from(RawTriple { x: 10, y: 20, z: 512 });
        assert_eq!(r.pan, 10.0);
        assert_eq!(r.tilt, 20.0);
        assert!((r.voltage - 2.5).abs() < 0.01);
    }

    #[test]
    fn test_distance_row_uses_supplied_curve() {
        let reading = Reading {
            pan: 1.0,
            tilt: 2.0,
            voltage: 2.0,
        };
        let row = DistanceRow::from_reading(reading, |v| 60.0 / v);
        assert_eq!(row.distance, 30.0);
        assert_eq!((row.pan, row.tilt), (1.0, 2.0));
    }

    #[test]
    fn test_calibration_row_field_names() {
        let json = serde_json::to_string(&CalibrationRow {
            distance: 20.0,
            voltage: 2.5,
        })
        .unwrap();
        assert_eq!(json, r#"{"Distance":20.0,"Voltage":2.5}"#);
    }
}
