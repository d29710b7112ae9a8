//! Pan/tilt sweep
//!
//! Walks a rectangular grid of angles and takes one reading per point.

use serde::{Deserialize, Serialize};

use super::{Reading, Scanner};
use crate::protocol::{ProtocolError, Transport};

/// Half-open range of angles `start..end` visited every `step` degrees
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AxisRange {
    /// First angle
    pub start: i64,
    /// End of the range (exclusive)
    pub end: i64,
    /// Increment between angles; a non-positive step yields no points
    pub step: i64,
}

impl AxisRange {
    /// Create a range
    pub fn new(start: i64, end: i64, step: i64) -> Self {
        Self { start, end, step }
    }

    /// Range of `radius` degrees either side of `center`
    pub fn centered(center: i64, radius: i64, step: i64) -> Self {
        Self::new(center - radius, center + radius, step)
    }

    /// Angles visited, in order
    pub fn points(&self) -> impl Iterator<Item = i64> {
        let end = if self.step > 0 { self.end } else { self.start };
        (self.start..end).step_by(self.step.max(1) as usize)
    }

    /// Number of angles visited
    pub fn len(&self) -> usize {
        self.points().count()
    }

    /// Check whether the range visits no angles
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Grid and timing of a sweep
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepPlan {
    /// Pan angles (outer loop)
    pub pan: AxisRange,
    /// Tilt angles (inner loop)
    pub tilt: AxisRange,
    /// Device-side pause before each reading, 0 to skip
    pub settle_ms: u64,
    /// Device-side pause before the first move, 0 to skip
    pub start_delay_ms: u64,
}

impl SweepPlan {
    /// Total number of readings the plan produces
    pub fn total_points(&self) -> usize {
        self.pan.len() * self.tilt.len()
    }
}

/// Progress report passed to the sweep callback after each reading
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SweepProgress {
    /// Readings taken so far
    pub completed: usize,
    /// Readings the plan will take in total
    pub total: usize,
    /// The reading just taken
    pub reading: Reading,
}

/// Runs a [`SweepPlan`] against a scanner
#[derive(Debug, Clone, Copy)]
pub struct Sweep {
    plan: SweepPlan,
}

impl Sweep {
    /// Create a sweep for a plan
    pub fn new(plan: SweepPlan) -> Self {
        Self { plan }
    }

    /// The plan being swept
    pub fn plan(&self) -> &SweepPlan {
        &self.plan
    }

    /// Visit every grid point and collect the readings
    ///
    /// Angles the controller rejects as out of range are skipped by the device
    /// move only; the reading at that point is still taken. The first error
    /// stops the sweep.
    pub fn run<T, F>(
        &self,
        scanner: &mut Scanner<T>,
        mut on_progress: F,
    ) -> Result<Vec<Reading>, ProtocolError>
    where
        T: Transport,
        F: FnMut(SweepProgress),
    {
        let total = self.plan.total_points();
        let mut readings = Vec::with_capacity(total);
        tracing::info!("starting sweep of {} points", total);

        if self.plan.start_delay_ms > 0 {
            scanner.delay(self.plan.start_delay_ms)?;
        }

        for pan in self.plan.pan.points() {
            scanner.pan(pan)?;
            for tilt in self.plan.tilt.points() {
                scanner.tilt(tilt)?;
                if self.plan.settle_ms > 0 {
                    scanner.delay(self.plan.settle_ms)?;
                }
                let reading = scanner.read_sensor()?;
                readings.push(reading);
                on_progress(SweepProgress {
                    completed: readings.len(),
                    total,
                    reading,
                });
            }
        }

        tracing::info!("sweep finished with {} readings", readings.len());
        Ok(readings)
    }
}
