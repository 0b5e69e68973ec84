use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use ecofit_core::{ports::SensorError, ports::StoreError, service::ServiceError};

use crate::accounts::AccountError;

const GENERIC_MESSAGE: &str = "Internal server error";

#[derive(Error, Debug)]
/// Failure of a request, rendered as `{"detail": ...}` with a matching status.
pub enum AppError {
    /// Body was not valid JSON for the route.
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    /// Body parsed but broke a field rule.
    #[error("{0}")]
    Validation(String),

    /// Sensor or volume failure from the service.
    #[error(transparent)]
    Service(#[from] ServiceError),

    /// Account or store failure.
    #[error(transparent)]
    Account(#[from] AccountError),

    /// A dependency is down.
    #[error("{0}")]
    Unavailable(String),
}

impl AppError {
    /// Shorthand for [`AppError::Validation`].
    pub fn validation<M: Into<String>>(message: M) -> Self {
        Self::Validation(message.into())
    }

    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MalformedPayload(_) | Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Service(ServiceError::Sensor(sensor)) => match sensor {
                SensorError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
                SensorError::Connection { .. } => StatusCode::SERVICE_UNAVAILABLE,
                SensorError::Protocol { .. } => StatusCode::BAD_GATEWAY,
                SensorError::MalformedResponse { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Service(ServiceError::Volume(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Account(account) => match account {
                AccountError::Validation(_)
                | AccountError::InvalidCredentials
                | AccountError::Store(StoreError::DuplicateEmail | StoreError::InvalidId) => {
                    StatusCode::BAD_REQUEST
                }
                AccountError::Store(StoreError::NotFound) => StatusCode::NOT_FOUND,
                AccountError::Store(StoreError::NotConnected) => StatusCode::SERVICE_UNAVAILABLE,
                AccountError::Store(StoreError::Backend(_)) | AccountError::Hashing(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
        }
    }

    fn detail(&self) -> String {
        match self {
            Self::Service(ServiceError::Sensor(
                sensor @ (SensorError::Timeout { .. }
                | SensorError::Connection { .. }
                | SensorError::Protocol { .. }),
            )) => sensor.to_string(),
            Self::Service(ServiceError::Sensor(SensorError::MalformedResponse {
                address, ..
            })) => format!("ESP32 error: could not read distance from {address}"),
            Self::Account(AccountError::Store(StoreError::NotConnected)) => {
                StoreError::NotConnected.to_string()
            }
            _ if self.status() == StatusCode::INTERNAL_SERVER_ERROR => GENERIC_MESSAGE.to_owned(),
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(status = status.as_u16(), error = %self, "request failed");
        }

        (status, Json(json!({ "detail": self.detail() }))).into_response()
    }
}
