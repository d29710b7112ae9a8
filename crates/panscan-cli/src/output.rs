//! CSV output for scan and calibration data sets

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use panscan_core::scanner::{CalibrationRow, ScanRow};

/// Default file name for a scan started now
pub fn default_scan_path() -> PathBuf {
    PathBuf::from(format!(
        "scan-{}.csv",
        chrono::Local::now().format("%Y%m%d-%H%M%S")
    ))
}

/// Default file name for a calibration run started now
pub fn default_calibration_path() -> PathBuf {
    PathBuf::from(format!(
        "calibration-{}.csv",
        chrono::Local::now().format("%Y%m%d-%H%M%S")
    ))
}

/// Write scan rows to a CSV file
pub fn write_scan_csv<P: AsRef<Path>>(path: P, rows: &[ScanRow]) -> io::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);

    writeln!(writer, "pan,tilt,voltage")?;
    for row in rows {
        writeln!(writer, "{},{},{:.4}", row.pan, row.tilt, row.voltage)?;
    }

    writer.flush()
}

/// Write calibration rows to a CSV file
pub fn write_calibration_csv<P: AsRef<Path>>(path: P, rows: &[CalibrationRow]) -> io::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);

    writeln!(writer, "Distance,Voltage")?;
    for row in rows {
        writeln!(writer, "{},{:.4}", row.distance, row.voltage)?;
    }

    writer.flush()
}
