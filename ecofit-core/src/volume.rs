//! Available bin volume, either estimated from a sensor distance or looked up
//! from the fixed per-category thresholds.
//!
//! The estimator treats the empty part of the bin as a rectangular prism whose
//! height is the distance between the sensor and the top of the contents.
//! Width and length share the distance unit (centimetres), so the product is
//! in cubic centimetres, i.e. millilitres.

use serde::Serialize;

use crate::model::{BinCategory, Volume, VolumeError, check_non_negative};

/// Threshold used when a bin label does not name a known category.
pub const DEFAULT_THRESHOLD_ML: f64 = 1000.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
/// Footprint of the monitored bin.
pub struct BinGeometry {
    /// Inner width in centimetres.
    pub width_cm: f64,
    /// Inner length in centimetres.
    pub length_cm: f64,
}

impl Default for BinGeometry {
    fn default() -> Self {
        Self {
            width_cm: 20.0,
            length_cm: 20.0,
        }
    }
}

impl BinGeometry {
    /// Build a geometry from validated dimensions.
    ///
    /// # Errors
    ///
    /// Returns a [`VolumeError`] when either dimension is negative or not finite.
    pub fn new(width_cm: f64, length_cm: f64) -> Result<Self, VolumeError> {
        Ok(Self {
            width_cm: check_non_negative(width_cm)?,
            length_cm: check_non_negative(length_cm)?,
        })
    }
}

/// Estimate the empty volume above the bin contents from a sensor distance.
///
/// # Errors
///
/// Returns a [`VolumeError`] when `distance_cm` is negative or not finite.
pub fn estimate_volume_from_distance(
    distance_cm: f64,
    geometry: BinGeometry,
) -> Result<Volume, VolumeError> {
    let distance_cm = check_non_negative(distance_cm)?;
    Volume::new(distance_cm * geometry.width_cm * geometry.length_cm)
}

const DEFAULT_THRESHOLD: Volume = Volume::constant(DEFAULT_THRESHOLD_ML);
const RECYCLING_THRESHOLD: Volume = Volume::constant(1000.0);
const GENERAL_THRESHOLD: Volume = Volume::constant(2000.0);
const ORGANIC_THRESHOLD: Volume = Volume::constant(1500.0);
const HAZARDOUS_THRESHOLD: Volume = Volume::constant(500.0);
const ELECTRONIC_THRESHOLD: Volume = Volume::constant(2000.0);

/// Fixed capacity threshold for a bin category.
#[must_use]
pub const fn threshold_for_category(category: BinCategory) -> Volume {
    match category {
        BinCategory::Recycling => RECYCLING_THRESHOLD,
        BinCategory::General => GENERAL_THRESHOLD,
        BinCategory::Organic => ORGANIC_THRESHOLD,
        BinCategory::Hazardous => HAZARDOUS_THRESHOLD,
        BinCategory::Electronic => ELECTRONIC_THRESHOLD,
    }
}

/// Threshold for a free-form bin label (`recycling`, `blue_bin`, ...).
///
/// Labels that do not parse fall back to [`DEFAULT_THRESHOLD_ML`].
#[must_use]
pub fn threshold_for_label(label: &str) -> Volume {
    label
        .parse::<BinCategory>()
        .map_or(DEFAULT_THRESHOLD, threshold_for_category)
}
