//! Traits describing the external capabilities and their error types.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::model::{Classification, NewUser, Profile, SensorReading, StoredUser, UserId};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
/// Reasons a distance reading could not be obtained.
pub enum SensorError {
    /// The sensor did not answer within the configured timeout.
    #[error("ESP32 connection timeout. Check if device is online at {address}")]
    Timeout {
        /// Configured sensor address.
        address: String,
    },
    /// No connection could be established.
    #[error("Cannot connect to ESP32 at {address}. Check network connection and IP address.")]
    Connection {
        /// Configured sensor address.
        address: String,
    },
    /// The sensor answered with an error status.
    #[error("ESP32 HTTP error from {address}: {detail}")]
    Protocol {
        /// Configured sensor address.
        address: String,
        /// Status or transport detail.
        detail: String,
    },
    /// The reply could not be turned into a distance.
    #[error("ESP32 error: malformed response from {address}: {detail}")]
    MalformedResponse {
        /// Configured sensor address.
        address: String,
        /// What was wrong with the reply.
        detail: String,
    },
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
/// Errors raised by a user store.
pub enum StoreError {
    /// The store has not been connected yet, or was already closed.
    #[error("Database not connected")]
    NotConnected,
    /// An account with this email exists.
    #[error("Email already registered")]
    DuplicateEmail,
    /// The identifier is not in the store's format.
    #[error("Invalid user ID format")]
    InvalidId,
    /// No account matched.
    #[error("User not found")]
    NotFound,
    /// The storage engine failed.
    #[error("Storage error: {0}")]
    Backend(String),
}

#[async_trait]
/// Turns an item description into a waste type.
///
/// Implementations never fail: degraded paths return
/// [`Classification::fallback`].
pub trait ClassifierPort: Send + Sync {
    /// Backend identifier used for configuration.
    fn id(&self) -> &str;

    /// Classify a base64 encoded image.
    async fn classify_image(&self, image_data: &str) -> Classification;

    /// Classify a free-text description.
    async fn classify_text(&self, description: &str) -> Classification;
}

#[async_trait]
/// Reads the distance between the bin sensor and the bin contents.
pub trait SensorPort: Send + Sync {
    /// Address of the sensor, used in diagnostics.
    fn address(&self) -> &str;

    /// Take one reading.
    ///
    /// # Errors
    ///
    /// Returns a [`SensorError`] naming why no distance is available. Callers
    /// must not substitute a default distance.
    async fn read_distance(&self) -> Result<SensorReading, SensorError>;
}

#[async_trait]
/// Persistent storage for user accounts.
pub trait UserStore: Send + Sync {
    /// Name of the underlying database, reported by health checks.
    fn database_name(&self) -> &str;

    /// Check that the store is connected and answering.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotConnected`] before connect or after close.
    async fn ping(&self) -> Result<(), StoreError>;

    /// Insert a new account.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DuplicateEmail`] when the email is taken.
    async fn insert(&self, user: NewUser) -> Result<UserId, StoreError>;

    /// Look an account up by lowercased email.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] when the store cannot be queried.
    async fn find_by_email(&self, email: &str) -> Result<Option<StoredUser>, StoreError>;

    /// Look an account up by id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidId`] for malformed ids.
    async fn find_by_id(&self, id: &UserId) -> Result<Option<StoredUser>, StoreError>;

    /// Merge the present fields of `update` into the stored profile.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when no account has this id.
    async fn update_profile(
        &self,
        id: &UserId,
        update: Profile,
        updated_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;
}
