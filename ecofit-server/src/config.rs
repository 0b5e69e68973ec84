use std::{env, fmt::Display, ops::RangeInclusive, str::FromStr, time::Duration};

use ecofit_core::volume::BinGeometry;
use tracing::{info, warn};

const BCRYPT_COST_RANGE: RangeInclusive<u32> = 4..=31;

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
/// Startup configuration errors.
pub enum ConfigError {
    /// A variable could not be parsed or is out of range.
    #[error("Invalid {key} value {value:?}: {reason}")]
    Invalid {
        /// Variable name.
        key: &'static str,
        /// Raw value.
        value: String,
        /// Parser message.
        reason: String,
    },

    /// The model backend was selected without an endpoint.
    #[error("ECOFIT_MODEL_URL must be set when ECOFIT_CLASSIFIER is \"model\"")]
    MissingModelUrl,
}

#[derive(Debug, Clone)]
/// Server settings read from the environment.
pub struct Config {
    /// `ECOFIT_HOST`.
    pub host: String,
    /// `ECOFIT_PORT`.
    pub port: u16,
    /// `ESP32_IP`.
    pub sensor_address: String,
    /// `ESP32_TIMEOUT`, in seconds.
    pub sensor_timeout: Duration,
    /// `ECOFIT_CLASSIFIER` backend id.
    pub classifier: String,
    /// `ECOFIT_MODEL_URL`.
    pub model_url: Option<String>,
    /// `ECOFIT_DATABASE_PATH`.
    pub database_path: String,
    /// `ECOFIT_BIN_WIDTH_CM` x `ECOFIT_BIN_LENGTH_CM`.
    pub bin_geometry: BinGeometry,
    /// `ECOFIT_ALLOWED_ORIGINS`, split on commas.
    pub allowed_origins: Vec<String>,
    /// `ECOFIT_BCRYPT_COST`.
    pub bcrypt_cost: u32,
}

impl Config {
    /// Read the process environment.
    ///
    /// # Errors
    ///
    /// [`ConfigError`] for any invalid value.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(var)
    }

    /// Build the configuration from any key lookup; `load` uses the process environment.
    ///
    /// # Errors
    ///
    /// [`ConfigError`] for any invalid value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let classifier: String = try_load(&lookup, "ECOFIT_CLASSIFIER", "keyword")?;
        let model_url = lookup("ECOFIT_MODEL_URL").filter(|url| !url.trim().is_empty());
        if classifier == "model" && model_url.is_none() {
            return Err(ConfigError::MissingModelUrl);
        }

        let width: f64 = try_load(&lookup, "ECOFIT_BIN_WIDTH_CM", "20")?;
        let length: f64 = try_load(&lookup, "ECOFIT_BIN_LENGTH_CM", "20")?;
        let bin_geometry = BinGeometry::new(width, length).map_err(|err| ConfigError::Invalid {
            key: "ECOFIT_BIN_WIDTH_CM/ECOFIT_BIN_LENGTH_CM",
            value: format!("{width}x{length}"),
            reason: err.to_string(),
        })?;

        let timeout_secs: u64 = try_load(&lookup, "ESP32_TIMEOUT", "5")?;

        let bcrypt_cost: u32 = try_load(&lookup, "ECOFIT_BCRYPT_COST", "12")?;
        if !BCRYPT_COST_RANGE.contains(&bcrypt_cost) {
            return Err(ConfigError::Invalid {
                key: "ECOFIT_BCRYPT_COST",
                value: bcrypt_cost.to_string(),
                reason: format!(
                    "must be between {} and {}",
                    BCRYPT_COST_RANGE.start(),
                    BCRYPT_COST_RANGE.end()
                ),
            });
        }

        let origins: String = try_load(&lookup, "ECOFIT_ALLOWED_ORIGINS", "*")?;

        Ok(Self {
            host: try_load(&lookup, "ECOFIT_HOST", "0.0.0.0")?,
            port: try_load(&lookup, "ECOFIT_PORT", "8000")?,
            sensor_address: try_load(&lookup, "ESP32_IP", "192.168.43.168")?,
            sensor_timeout: Duration::from_secs(timeout_secs),
            classifier,
            model_url,
            database_path: try_load(&lookup, "ECOFIT_DATABASE_PATH", "ecofit.db")?,
            bin_geometry,
            allowed_origins: origins
                .split(',')
                .map(str::trim)
                .filter(|origin| !origin.is_empty())
                .map(str::to_owned)
                .collect(),
            bcrypt_cost,
        })
    }

    /// `host:port` to bind.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn var(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn try_load<F, T>(lookup: &F, key: &'static str, default: &str) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: Display,
{
    let raw = lookup(key).unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default.to_owned()
    });

    raw.parse().map_err(|err: T::Err| {
        warn!("Invalid {key} value: {err}");
        ConfigError::Invalid {
            key,
            value: raw.clone(),
            reason: err.to_string(),
        }
    })
}
