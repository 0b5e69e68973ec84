//! Domain data structures for waste items, bins, volumes and user accounts.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
/// Material category assigned to a waste item by a classifier.
pub enum WasteType {
    /// Plastic packaging and bottles.
    Plastic,
    /// Paper and cardboard.
    Paper,
    /// Glass jars and bottles.
    Glass,
    /// Cans and scrap metal.
    Metal,
    /// Food and garden waste.
    Organic,
    /// Electronic devices.
    Electronic,
    /// Chemicals, paint, oil.
    Hazardous,
    /// Loose batteries.
    Batteries,
    /// Textiles.
    Clothes,
    /// Electronic waste collected separately from devices.
    EWaste,
    /// Bulbs and fluorescent tubes.
    LightBulbs,
    /// Medicine.
    Pharmaceutical,
    /// Residual household waste.
    Residual,
    /// Anything a classifier could not place; also the fallback result.
    Other,
    /// Label the service does not recognise.
    Unknown,
}

impl WasteType {
    /// Every waste type, in declaration order.
    pub const ALL: [Self; 15] = [
        Self::Plastic,
        Self::Paper,
        Self::Glass,
        Self::Metal,
        Self::Organic,
        Self::Electronic,
        Self::Hazardous,
        Self::Batteries,
        Self::Clothes,
        Self::EWaste,
        Self::LightBulbs,
        Self::Pharmaceutical,
        Self::Residual,
        Self::Other,
        Self::Unknown,
    ];

    /// Wire label of the waste type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Plastic => "plastic",
            Self::Paper => "paper",
            Self::Glass => "glass",
            Self::Metal => "metal",
            Self::Organic => "organic",
            Self::Electronic => "electronic",
            Self::Hazardous => "hazardous",
            Self::Batteries => "batteries",
            Self::Clothes => "clothes",
            Self::EWaste => "e_waste",
            Self::LightBulbs => "light_bulbs",
            Self::Pharmaceutical => "pharmaceutical",
            Self::Residual => "residual",
            Self::Other => "other",
            Self::Unknown => "unknown",
        }
    }

    /// Bin the waste type is disposed in. Total over all waste types.
    #[must_use]
    pub const fn bin_category(self) -> BinCategory {
        match self {
            Self::Plastic | Self::Paper | Self::Glass | Self::Metal => BinCategory::Recycling,
            Self::Organic => BinCategory::Organic,
            Self::Electronic | Self::EWaste => BinCategory::Electronic,
            Self::Hazardous | Self::Batteries | Self::LightBulbs | Self::Pharmaceutical => {
                BinCategory::Hazardous
            }
            Self::Clothes | Self::Residual | Self::Other | Self::Unknown => BinCategory::General,
        }
    }

    /// Parse a label coming from an external classifier, mapping anything
    /// unrecognised to [`WasteType::Unknown`].
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        label.parse().unwrap_or(Self::Unknown)
    }
}

impl fmt::Display for WasteType {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
/// A label did not name a known variant.
#[error("Unknown label: {0}")]
pub struct UnknownLabel(pub String);

impl FromStr for WasteType {
    type Err = UnknownLabel;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw.trim().to_lowercase().replace(['-', ' '], "_");
        Self::ALL
            .into_iter()
            .find(|waste_type| waste_type.as_str() == normalized)
            .ok_or_else(|| UnknownLabel(raw.to_owned()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
/// Physical disposal stream.
pub enum BinCategory {
    /// Blue bin.
    #[serde(alias = "blue_bin")]
    Recycling,
    /// Yellow bin.
    #[serde(alias = "yellow_bin")]
    General,
    /// Green bin.
    #[serde(alias = "green_bin")]
    Organic,
    /// Black bin.
    #[serde(alias = "black_bin")]
    Hazardous,
    /// Red bin.
    #[serde(alias = "red_bin")]
    Electronic,
}

impl BinCategory {
    /// Every bin category, in declaration order.
    pub const ALL: [Self; 5] = [
        Self::Recycling,
        Self::General,
        Self::Organic,
        Self::Hazardous,
        Self::Electronic,
    ];

    /// Wire label of the bin category.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Recycling => "recycling",
            Self::General => "general",
            Self::Organic => "organic",
            Self::Hazardous => "hazardous",
            Self::Electronic => "electronic",
        }
    }

    /// Colour label of the physical bin, as printed on the lid.
    #[must_use]
    pub const fn colour_label(self) -> &'static str {
        match self {
            Self::Recycling => "blue_bin",
            Self::General => "yellow_bin",
            Self::Organic => "green_bin",
            Self::Hazardous => "black_bin",
            Self::Electronic => "red_bin",
        }
    }
}

impl fmt::Display for BinCategory {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl FromStr for BinCategory {
    type Err = UnknownLabel;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|category| {
                category.as_str() == normalized || category.colour_label() == normalized
            })
            .ok_or_else(|| UnknownLabel(raw.to_owned()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
/// Verdict on whether an item fits the available bin volume.
pub enum FitStatus {
    /// Waste volume is within the bin volume.
    Fits,
    /// Waste volume exceeds the bin volume but stays within the tolerance band.
    PartialFit,
    /// Waste volume exceeds the tolerance band.
    DoesNotFit,
}

impl FitStatus {
    /// Wire label of the verdict.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Fits => "fits",
            Self::PartialFit => "partial_fit",
            Self::DoesNotFit => "does_not_fit",
        }
    }
}

impl fmt::Display for FitStatus {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq)]
/// Rejected numeric input for a volume or distance.
pub enum VolumeError {
    /// The value was below zero.
    #[error("Value must not be negative, got {0}")]
    Negative(f64),
    /// The value was NaN or infinite.
    #[error("Value must be a finite number")]
    NotFinite,
}

#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize)]
#[serde(transparent)]
/// Non-negative volume in millilitres.
pub struct Volume(f64);

impl Volume {
    /// Empty volume.
    pub const ZERO: Self = Self(0.0);

    /// Build a volume from millilitres.
    ///
    /// # Errors
    ///
    /// Returns a [`VolumeError`] for negative or non-finite input.
    pub fn new(millilitres: f64) -> Result<Self, VolumeError> {
        check_non_negative(millilitres).map(Self)
    }

    /// Volume from a compile-time constant; a negative value fails const evaluation.
    pub(crate) const fn constant(millilitres: f64) -> Self {
        assert!(millilitres >= 0.0, "volume constants must not be negative");
        Self(millilitres)
    }

    /// Volume in millilitres.
    #[must_use]
    pub const fn millilitres(self) -> f64 {
        self.0
    }

    /// Volume in litres.
    #[must_use]
    pub fn litres(self) -> f64 {
        self.0 / 1000.0
    }

    /// Distance between two volumes, never negative.
    #[must_use]
    pub fn abs_diff(self, other: Self) -> Self {
        Self((self.0 - other.0).abs())
    }

    /// Volume scaled by a non-negative factor; negative factors yield zero.
    #[must_use]
    pub fn scaled(self, factor: f64) -> Self {
        Self((self.0 * factor).max(0.0))
    }
}

impl fmt::Display for Volume {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{:.2} ml", self.0)
    }
}

pub(crate) fn check_non_negative(value: f64) -> Result<f64, VolumeError> {
    if !value.is_finite() {
        return Err(VolumeError::NotFinite);
    }
    if value < 0.0 {
        return Err(VolumeError::Negative(value));
    }
    Ok(value)
}

/// Confidence reported alongside degraded classifier results.
pub const FALLBACK_CONFIDENCE: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
/// Classifier output: a waste type and a certainty in `[0, 1]`.
pub struct Classification {
    /// Assigned material category.
    pub waste_type: WasteType,
    /// Classifier certainty, clamped to the closed unit interval.
    pub confidence: f64,
}

impl Classification {
    /// Build a classification, clamping the confidence into `[0, 1]`.
    #[must_use]
    pub fn new(waste_type: WasteType, confidence: f64) -> Self {
        let confidence = if confidence.is_nan() {
            0.0
        } else {
            confidence.clamp(0.0, 1.0)
        };
        Self {
            waste_type,
            confidence,
        }
    }

    /// Result returned when a classifier cannot process its input.
    #[must_use]
    pub fn fallback() -> Self {
        Self::new(WasteType::Other, FALLBACK_CONFIDENCE)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
/// Distance reported by the bin sensor.
pub struct SensorReading {
    /// Distance from the sensor to the top of the bin contents, in centimetres.
    pub distance_cm: f64,
    /// When the reading was received.
    pub read_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
/// Identifier for a stored user account.
pub struct UserId(pub String);

impl fmt::Display for UserId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

#[derive(Debug, Clone)]
/// Account data ready to be persisted.
pub struct NewUser {
    /// Display name.
    pub name: String,
    /// Lowercased email address.
    pub email: String,
    /// Password hash; plain passwords never reach the store.
    pub password_hash: String,
    /// Optional postal address.
    pub address: Option<String>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
/// Household answers collected during onboarding.
pub struct Profile {
    /// Self-assessed amount of waste (`low`, `medium`, `high`).
    pub waste_amount: Option<String>,
    /// Household owns a recycling bin.
    pub has_recycling_bin: Option<bool>,
    /// Household owns a compost bin.
    pub has_compost_bin: Option<bool>,
    /// Area has weekly collection.
    pub has_weekly_collection: Option<bool>,
    /// Kind of residence.
    pub residence_type: Option<String>,
    /// Number of people, as chosen in the app (e.g. `7+`).
    pub household_size: Option<String>,
    /// Onboarding flow finished.
    pub onboarding_completed: Option<bool>,
}

impl Profile {
    /// Overwrite the fields that are present in `update`, leaving the rest untouched.
    pub fn apply(&mut self, update: Profile) {
        let Profile {
            waste_amount,
            has_recycling_bin,
            has_compost_bin,
            has_weekly_collection,
            residence_type,
            household_size,
            onboarding_completed,
        } = update;
        if waste_amount.is_some() {
            self.waste_amount = waste_amount;
        }
        if has_recycling_bin.is_some() {
            self.has_recycling_bin = has_recycling_bin;
        }
        if has_compost_bin.is_some() {
            self.has_compost_bin = has_compost_bin;
        }
        if has_weekly_collection.is_some() {
            self.has_weekly_collection = has_weekly_collection;
        }
        if residence_type.is_some() {
            self.residence_type = residence_type;
        }
        if household_size.is_some() {
            self.household_size = household_size;
        }
        if onboarding_completed.is_some() {
            self.onboarding_completed = onboarding_completed;
        }
    }
}

#[derive(Debug, Clone)]
/// Account row as held by the store, including the password hash.
pub struct StoredUser {
    /// Store-assigned identifier.
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// Lowercased email address.
    pub email: String,
    /// Password hash.
    pub password_hash: String,
    /// Optional postal address.
    pub address: Option<String>,
    /// Onboarding answers.
    pub profile: Profile,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last profile update.
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
/// Account view safe to return to clients.
pub struct UserAccount {
    /// Store-assigned identifier.
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// Lowercased email address.
    pub email: String,
    /// Optional postal address.
    pub address: Option<String>,
    /// Onboarding answers.
    #[serde(flatten)]
    pub profile: Profile,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last profile update.
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<StoredUser> for UserAccount {
    fn from(user: StoredUser) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            address: user.address,
            profile: user.profile,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}
