//! Fit verdicts from a waste volume and an available bin volume.

use serde::Serialize;

use crate::model::{FitStatus, Volume};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
/// Where the bin volume of a comparison came from.
pub enum VolumeSource {
    /// Fixed per-category capacity threshold.
    Threshold,
    /// Live estimate from the distance sensor.
    Sensor,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
/// Tolerance factors applied on top of the bin volume, one per volume source.
///
/// Fixed thresholds are rough capacity estimates and get the wider band; a
/// sensor measurement describes the actual bin and gets the narrower one.
pub struct TolerancePolicy {
    /// Factor used against fixed thresholds.
    pub threshold: f64,
    /// Factor used against sensor-derived volumes.
    pub sensor: f64,
}

impl Default for TolerancePolicy {
    fn default() -> Self {
        Self {
            threshold: 1.5,
            sensor: 1.1,
        }
    }
}

impl TolerancePolicy {
    /// Factor to use for a given volume source.
    #[must_use]
    pub const fn factor(&self, source: VolumeSource) -> f64 {
        match source {
            VolumeSource::Threshold => self.threshold,
            VolumeSource::Sensor => self.sensor,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
/// Outcome of a volume comparison.
pub struct FitVerdict {
    /// Tri-state verdict.
    pub status: FitStatus,
    /// Remaining space when the item fits, overage otherwise.
    pub margin: Volume,
}

/// Compare `waste` against `bin`, allowing overage up to `bin * tolerance_factor`.
///
/// Both boundaries are inclusive: `waste == bin` fits and
/// `waste == bin * tolerance_factor` is a partial fit.
#[must_use]
pub fn evaluate_fit(waste: Volume, bin: Volume, tolerance_factor: f64) -> FitVerdict {
    let margin = waste.abs_diff(bin);
    let status = if waste <= bin {
        FitStatus::Fits
    } else if waste <= bin.scaled(tolerance_factor) {
        FitStatus::PartialFit
    } else {
        FitStatus::DoesNotFit
    };
    FitVerdict { status, margin }
}
