//! Request and response bodies of the HTTP API, plus boundary validation.
//!
//! Validation happens here so nothing malformed reaches the service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use ecofit_core::{
    fit::FitVerdict,
    model::{BinCategory, FitStatus, UnknownLabel, UserId, Volume, WasteType},
    service::{DisposalReport, ItemInput, SensorFitReport},
};

use crate::{accounts::MAX_PASSWORD_BYTES, accounts::Registration, error::AppError};

const MIN_PASSWORD_BYTES: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
/// Which field of a [`DisposeRequest`] carries the item.
pub enum InputMethod {
    /// `image_data` holds a base64 photo.
    Image,
    /// `description` holds free text.
    Description,
}

#[derive(Debug, Deserialize)]
/// Body of `POST /api/v1/dispose`.
pub struct DisposeRequest {
    /// Selects the populated field.
    pub input_method: InputMethod,
    /// Base64 photo, plain or as a data URL.
    #[serde(default)]
    pub image_data: Option<String>,
    /// Free-text description.
    #[serde(default)]
    pub description: Option<String>,
    /// Item volume in millilitres.
    pub volume: f64,
}

impl DisposeRequest {
    /// Check the method/payload pairing and the volume.
    ///
    /// # Errors
    ///
    /// [`AppError::Validation`] when the selected field is blank or the volume is not positive.
    pub fn validate(self) -> Result<(ItemInput, Volume), AppError> {
        let volume = positive_volume(self.volume, "volume")?;
        let input = match self.input_method {
            InputMethod::Image => ItemInput::Image(non_blank(self.image_data).ok_or_else(|| {
                AppError::validation("Image data required for image input method")
            })?),
            InputMethod::Description => {
                ItemInput::Description(non_blank(self.description).ok_or_else(|| {
                    AppError::validation("Description required for description input method")
                })?)
            }
        };
        Ok((input, volume))
    }
}

#[derive(Debug, Deserialize)]
/// Body of `POST /api/v1/fit`.
pub struct FitRequest {
    /// Waste type label, e.g. `plastic` or `light-bulbs`.
    pub waste_type: String,
    /// Item volume in millilitres.
    pub waste_volume_ml: f64,
    /// Optional bin label overriding the mapped bin.
    #[serde(default)]
    pub bin_category: Option<String>,
}

impl FitRequest {
    /// Parse the waste type and check the volume.
    ///
    /// # Errors
    ///
    /// [`AppError::Validation`] for an unknown waste type or a non-positive volume.
    pub fn validate(&self) -> Result<(WasteType, Volume), AppError> {
        let waste_type = self
            .waste_type
            .parse()
            .map_err(|err: UnknownLabel| AppError::validation(err.to_string()))?;
        Ok((waste_type, positive_volume(self.waste_volume_ml, "waste_volume_ml")?))
    }
}

#[derive(Debug, Deserialize)]
/// Body of `POST /api/v1/check-distance`.
pub struct DistanceRequest {
    /// Item volume in millilitres.
    #[serde(alias = "waste_volume_ml")]
    pub volume: f64,
}

impl DistanceRequest {
    /// Check the volume.
    ///
    /// # Errors
    ///
    /// [`AppError::Validation`] when the volume is not positive.
    pub fn validate(&self) -> Result<Volume, AppError> {
        positive_volume(self.volume, "volume")
    }
}

#[derive(Debug, Serialize)]
/// Answer of the threshold-based routes.
pub struct DisposalResponse {
    /// Assigned waste type.
    pub waste_type: WasteType,
    /// Bin the item was checked against.
    pub bin_category: BinCategory,
    /// Verdict.
    pub fit_status: FitStatus,
    /// Classifier certainty; `1.0` when the type was given.
    pub confidence: f64,
    /// Threshold used.
    pub bin_volume_ml: f64,
    /// Ordered disposal tips.
    pub tips: Vec<&'static str>,
    /// Summary line.
    pub message: String,
}

impl DisposalResponse {
    /// Response for a freshly classified item.
    pub fn classified(report: DisposalReport) -> Self {
        let message = format!("Waste classified as {}", report.classification.waste_type);
        Self::with_message(report, message)
    }

    /// Response for an item of known type, summarised by its verdict.
    pub fn assessed(report: DisposalReport) -> Self {
        let message = fit_message(report.verdict);
        Self::with_message(report, message)
    }

    fn with_message(report: DisposalReport, message: String) -> Self {
        Self {
            waste_type: report.classification.waste_type,
            bin_category: report.bin_category,
            fit_status: report.verdict.status,
            confidence: report.classification.confidence,
            bin_volume_ml: report.bin_volume.millilitres(),
            tips: report.tips,
            message,
        }
    }
}

#[derive(Debug, Serialize)]
/// Answer of `GET /api/v1/check-distance`.
pub struct DistanceResponse {
    /// Always `ok`; failures use the error body.
    pub status: &'static str,
    /// Measured distance.
    pub distance_cm: f64,
    /// When the reading was taken.
    pub read_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
/// Answer of `POST /api/v1/check-distance`.
pub struct SensorFitResponse {
    /// Always `ok`; failures use the error body.
    pub status: &'static str,
    /// Measured distance.
    pub distance_cm: f64,
    /// When the reading was taken.
    pub read_at: DateTime<Utc>,
    /// Estimated free volume, two decimals.
    pub bin_volume_ml: f64,
    /// Same in litres.
    pub bin_volume_liters: f64,
    /// Item volume.
    pub waste_volume_ml: f64,
    /// Verdict.
    pub fit_status: FitStatus,
    /// Remaining space or overage.
    pub message: String,
}

impl From<SensorFitReport> for SensorFitResponse {
    fn from(report: SensorFitReport) -> Self {
        Self {
            status: "ok",
            distance_cm: report.reading.distance_cm,
            read_at: report.reading.read_at,
            bin_volume_ml: round2(report.bin_volume.millilitres()),
            bin_volume_liters: round2(report.bin_volume.litres()),
            waste_volume_ml: report.waste_volume.millilitres(),
            fit_status: report.verdict.status,
            message: fit_message(report.verdict),
        }
    }
}

#[derive(Debug, Deserialize)]
/// Body of `POST /api/v1/user/register`.
pub struct RegisterRequest {
    /// Display name.
    pub name: String,
    /// Email, any case.
    pub email: String,
    /// Password, 6 to 72 bytes.
    pub password: String,
    /// Optional postal address.
    #[serde(default)]
    pub address: Option<String>,
}

impl RegisterRequest {
    /// Check name, email shape and password length.
    ///
    /// # Errors
    ///
    /// [`AppError::Validation`] naming the first offending field.
    pub fn validate(self) -> Result<Registration, AppError> {
        if self.name.trim().is_empty() {
            return Err(AppError::validation("Name must not be empty"));
        }
        check_email(&self.email)?;
        if self.password.len() < MIN_PASSWORD_BYTES || self.password.len() > MAX_PASSWORD_BYTES {
            return Err(AppError::validation(format!(
                "Password must be between {MIN_PASSWORD_BYTES} and {MAX_PASSWORD_BYTES} characters"
            )));
        }
        Ok(Registration {
            name: self.name,
            email: self.email,
            password: self.password,
            address: self.address,
        })
    }
}

#[derive(Debug, Serialize)]
/// Answer of a successful registration.
pub struct RegisterResponse {
    /// Confirmation text.
    pub message: &'static str,
    /// New account id.
    pub user_id: UserId,
    /// Stored, lowercased email.
    pub email: String,
}

#[derive(Debug, Deserialize)]
/// Body of `POST /api/v1/user/login`.
pub struct LoginRequest {
    /// Email, any case.
    pub email: String,
    /// Password, at most 72 bytes.
    pub password: String,
}

impl LoginRequest {
    /// Check email shape and password length.
    ///
    /// # Errors
    ///
    /// [`AppError::Validation`] for a malformed email or an overlong password.
    pub fn validate(&self) -> Result<(), AppError> {
        check_email(&self.email)?;
        if self.password.len() > MAX_PASSWORD_BYTES {
            return Err(AppError::validation(format!(
                "Password must be at most {MAX_PASSWORD_BYTES} characters"
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
/// Answer of a successful login.
pub struct LoginResponse {
    /// Confirmation text.
    pub message: &'static str,
    /// Account id.
    pub user_id: UserId,
    /// Session token; sessions are not issued, always `null`.
    pub token: Option<String>,
}

#[derive(Debug, Serialize)]
/// Answer of a profile update.
pub struct ProfileResponse {
    /// Confirmation text.
    pub message: &'static str,
    /// Always `true`; failures use the error body.
    pub success: bool,
}

/// Human-readable summary of a verdict, rounded to two decimals.
pub fn fit_message(verdict: FitVerdict) -> String {
    match verdict.status {
        FitStatus::Fits => format!("Item fits! Remaining space: {}", verdict.margin),
        FitStatus::PartialFit => format!("Item partially fits. Overage: {}", verdict.margin),
        FitStatus::DoesNotFit => format!("Item does not fit. Overage: {}", verdict.margin),
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|text| !text.trim().is_empty())
}

fn positive_volume(value: f64, field: &str) -> Result<Volume, AppError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(AppError::validation(format!("{field} must be greater than 0")));
    }
    Volume::new(value).map_err(|err| AppError::validation(err.to_string()))
}

fn check_email(email: &str) -> Result<(), AppError> {
    let email = email.trim();
    let valid = email.split_once('@').is_some_and(|(local, domain)| {
        !local.is_empty()
            && !domain.contains('@')
            && domain
                .split_once('.')
                .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty())
            && !email.contains(char::is_whitespace)
    });
    if valid {
        Ok(())
    } else {
        Err(AppError::validation("Invalid email address"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dispose(json: &str) -> Result<(ItemInput, Volume), AppError> {
        serde_json::from_str::<DisposeRequest>(json)
            .expect("well-formed request")
            .validate()
    }

    #[test]
    fn dispose_requires_payload_matching_the_method() {
        let err = dispose(r#"{"input_method":"image","description":"bottle","volume":200}"#)
            .expect_err("no image");
        assert_eq!(err.to_string(), "Image data required for image input method");

        let err = dispose(r#"{"input_method":"description","description":"  ","volume":200}"#)
            .expect_err("blank description");
        assert_eq!(
            err.to_string(),
            "Description required for description input method"
        );
    }

    #[test]
    fn dispose_rejects_non_positive_volume() {
        assert!(dispose(r#"{"input_method":"description","description":"can","volume":0}"#).is_err());
        assert!(dispose(r#"{"input_method":"description","description":"can","volume":-5}"#).is_err());
    }

    #[test]
    fn unknown_input_method_is_a_parse_error() {
        assert!(serde_json::from_str::<DisposeRequest>(
            r#"{"input_method":"voice","volume":10}"#
        )
        .is_err());
    }

    #[test]
    fn fit_request_parses_waste_type_labels() {
        let request = FitRequest {
            waste_type: "light-bulbs".to_owned(),
            waste_volume_ml: 100.0,
            bin_category: None,
        };
        let (waste_type, volume) = request.validate().expect("valid");
        assert_eq!(waste_type, WasteType::LightBulbs);
        assert_eq!(volume, Volume::new(100.0).expect("valid"));

        let bad = FitRequest {
            waste_type: "styrofoam".to_owned(),
            ..request
        };
        assert!(matches!(bad.validate(), Err(AppError::Validation(_))));
    }

    #[test]
    fn distance_request_accepts_either_volume_key() {
        let legacy: DistanceRequest = serde_json::from_str(r#"{"volume":250}"#).expect("parse");
        let named: DistanceRequest =
            serde_json::from_str(r#"{"waste_volume_ml":250}"#).expect("parse");
        assert_eq!(legacy.validate().ok(), named.validate().ok());
    }

    #[test]
    fn registration_validation() {
        let base = || RegisterRequest {
            name: "Ada".to_owned(),
            email: "ada@bins.test".to_owned(),
            password: "compost42".to_owned(),
            address: None,
        };
        assert!(base().validate().is_ok());
        assert!(RegisterRequest { name: " ".to_owned(), ..base() }.validate().is_err());
        assert!(RegisterRequest { email: "ada.bins.test".to_owned(), ..base() }.validate().is_err());
        assert!(RegisterRequest { password: "12345".to_owned(), ..base() }.validate().is_err());
        assert!(RegisterRequest { password: "p".repeat(73), ..base() }.validate().is_err());
    }

    #[test]
    fn email_shapes() {
        assert!(check_email("a@b.co").is_ok());
        assert!(check_email("a@b").is_err());
        assert!(check_email("@b.co").is_err());
        assert!(check_email("a b@c.de").is_err());
        assert!(check_email("a@b@c.de").is_err());
    }

    #[test]
    fn fit_messages_use_two_decimals() {
        let verdict = |status, margin| FitVerdict {
            status,
            margin: Volume::new(margin).expect("valid"),
        };
        assert_eq!(
            fit_message(verdict(FitStatus::Fits, 1000.0)),
            "Item fits! Remaining space: 1000.00 ml"
        );
        assert_eq!(
            fit_message(verdict(FitStatus::PartialFit, 300.0)),
            "Item partially fits. Overage: 300.00 ml"
        );
        assert_eq!(
            fit_message(verdict(FitStatus::DoesNotFit, 500.5)),
            "Item does not fit. Overage: 500.50 ml"
        );
    }
}
