//! High-level service facade combining the classifier, the sensor and the
//! fit-decision engine.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use crate::advice::disposal_tips;
use crate::fit::{FitVerdict, TolerancePolicy, VolumeSource, evaluate_fit};
use crate::model::{
    BinCategory, Classification, FALLBACK_CONFIDENCE, SensorReading, Volume, VolumeError,
    WasteType,
};
use crate::ports::{ClassifierPort, SensorError, SensorPort};
use crate::volume::{
    BinGeometry, estimate_volume_from_distance, threshold_for_category, threshold_for_label,
};

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
/// Errors that can occur while producing a fit decision.
pub enum ServiceError {
    /// The sensor could not provide a distance, so the bin volume is unknown.
    #[error(transparent)]
    Sensor(#[from] SensorError),
    /// A distance or volume was out of range.
    #[error("Invalid volume: {0}")]
    Volume(#[from] VolumeError),
}

#[derive(Debug, Clone)]
/// How a waste item was described by the user.
pub enum ItemInput {
    /// Base64 encoded photo.
    Image(String),
    /// Free-text description.
    Description(String),
}

#[derive(Debug, Clone, Serialize)]
/// Classification, bin and fit verdict for an item checked against a fixed threshold.
pub struct DisposalReport {
    /// Classifier output (confidence `1.0` when the type was given by the caller).
    pub classification: Classification,
    /// Bin the item belongs in.
    pub bin_category: BinCategory,
    /// Capacity the item was compared against.
    pub bin_volume: Volume,
    /// Volume of the item.
    pub waste_volume: Volume,
    /// Verdict and margin.
    pub verdict: FitVerdict,
    /// Ordered disposal tips.
    pub tips: Vec<&'static str>,
}

#[derive(Debug, Clone, Serialize)]
/// Fit verdict for an item checked against the live sensor estimate.
pub struct SensorFitReport {
    /// Raw sensor reading.
    pub reading: SensorReading,
    /// Estimated free volume of the bin.
    pub bin_volume: Volume,
    /// Volume of the item.
    pub waste_volume: Volume,
    /// Verdict and margin.
    pub verdict: FitVerdict,
}

/// Public entry point for classifying items and deciding whether they fit.
pub struct EcoFitService {
    classifier: Arc<dyn ClassifierPort>,
    sensor: Arc<dyn SensorPort>,
    geometry: BinGeometry,
    tolerance: TolerancePolicy,
}

impl EcoFitService {
    /// Create a new service bound to the provided capabilities with default
    /// geometry and tolerances.
    #[must_use]
    pub fn new(classifier: Arc<dyn ClassifierPort>, sensor: Arc<dyn SensorPort>) -> Self {
        Self {
            classifier,
            sensor,
            geometry: BinGeometry::default(),
            tolerance: TolerancePolicy::default(),
        }
    }

    /// Replace the bin footprint used by the sensor estimator.
    #[must_use]
    pub fn with_geometry(mut self, geometry: BinGeometry) -> Self {
        self.geometry = geometry;
        self
    }

    /// Replace the tolerance factors.
    #[must_use]
    pub fn with_tolerance(mut self, tolerance: TolerancePolicy) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Identifier of the classifier backend in use.
    #[must_use]
    pub fn classifier_id(&self) -> &str {
        self.classifier.id()
    }

    /// Address of the configured sensor.
    #[must_use]
    pub fn sensor_address(&self) -> &str {
        self.sensor.address()
    }

    /// Classify an item. Never fails; degraded results carry low confidence.
    pub async fn classify(&self, input: &ItemInput) -> Classification {
        let classification = match input {
            ItemInput::Image(image_data) => self.classifier.classify_image(image_data).await,
            ItemInput::Description(description) => {
                self.classifier.classify_text(description).await
            }
        };
        if classification.waste_type == WasteType::Other
            && classification.confidence <= FALLBACK_CONFIDENCE
        {
            warn!(
                backend = self.classifier.id(),
                "classifier returned a fallback result"
            );
        }
        classification
    }

    /// Classify an item and check it against its bin's fixed threshold.
    pub async fn dispose(&self, input: &ItemInput, waste_volume: Volume) -> DisposalReport {
        let classification = self.classify(input).await;
        let bin_category = classification.waste_type.bin_category();
        self.threshold_report(
            classification,
            bin_category,
            threshold_for_category(bin_category),
            waste_volume,
        )
    }

    /// Check an item of known type against a fixed threshold.
    ///
    /// `bin_label` overrides the mapped bin; labels that do not name a category
    /// use the default threshold while the report keeps the mapped category.
    #[must_use]
    pub fn assess_known(
        &self,
        waste_type: WasteType,
        waste_volume: Volume,
        bin_label: Option<&str>,
    ) -> DisposalReport {
        let mapped = waste_type.bin_category();
        let (bin_category, bin_volume) = match bin_label {
            Some(label) => (
                label.parse().unwrap_or(mapped),
                threshold_for_label(label),
            ),
            None => (mapped, threshold_for_category(mapped)),
        };
        self.threshold_report(
            Classification::new(waste_type, 1.0),
            bin_category,
            bin_volume,
            waste_volume,
        )
    }

    /// Take one sensor reading.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Sensor`] when the sensor is unavailable.
    pub async fn read_sensor(&self) -> Result<SensorReading, ServiceError> {
        Ok(self.sensor.read_distance().await?)
    }

    /// Check an item against the bin volume estimated from a live reading.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Sensor`] when no reading is available; no
    /// default volume is substituted. Returns [`ServiceError::Volume`] when
    /// the reading is out of range.
    pub async fn sensor_fit(&self, waste_volume: Volume) -> Result<SensorFitReport, ServiceError> {
        let reading = self.read_sensor().await?;
        let bin_volume = estimate_volume_from_distance(reading.distance_cm, self.geometry)?;
        let verdict = evaluate_fit(
            waste_volume,
            bin_volume,
            self.tolerance.factor(VolumeSource::Sensor),
        );
        debug!(
            distance_cm = reading.distance_cm,
            bin_ml = bin_volume.millilitres(),
            waste_ml = waste_volume.millilitres(),
            status = %verdict.status,
            "sensor fit evaluated"
        );
        Ok(SensorFitReport {
            reading,
            bin_volume,
            waste_volume,
            verdict,
        })
    }

    fn threshold_report(
        &self,
        classification: Classification,
        bin_category: BinCategory,
        bin_volume: Volume,
        waste_volume: Volume,
    ) -> DisposalReport {
        let verdict = evaluate_fit(
            waste_volume,
            bin_volume,
            self.tolerance.factor(VolumeSource::Threshold),
        );
        let tips = disposal_tips(
            classification.waste_type,
            bin_category,
            verdict.status,
            waste_volume,
        );
        DisposalReport {
            classification,
            bin_category,
            bin_volume,
            waste_volume,
            verdict,
            tips,
        }
    }
}
