use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use ecofit_core::{
    model::{NewUser, Profile, UserAccount, UserId},
    ports::{StoreError, UserStore},
};

/// bcrypt ignores everything past this many bytes.
pub const MAX_PASSWORD_BYTES: usize = 72;

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
/// Errors raised by account operations.
pub enum AccountError {
    /// Input rejected before touching the store.
    #[error("{0}")]
    Validation(String),

    /// Unknown email or wrong password; the two are not told apart.
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// The store failed or reported a conflict.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// bcrypt or its worker task failed.
    #[error("Password hashing failed: {0}")]
    Hashing(String),
}

/// Validated sign-up data.
pub struct Registration {
    /// Display name.
    pub name: String,
    /// Email as entered.
    pub email: String,
    /// Plain password; only its hash is stored.
    pub password: String,
    /// Optional postal address.
    pub address: Option<String>,
}

/// Registration, login and profile updates over a [`UserStore`].
pub struct Accounts {
    store: Arc<dyn UserStore>,
    bcrypt_cost: u32,
}

impl Accounts {
    /// Create the account service; `bcrypt_cost` is the hashing work factor.
    pub fn new(store: Arc<dyn UserStore>, bcrypt_cost: u32) -> Self {
        Self { store, bcrypt_cost }
    }

    /// Underlying store, for health checks.
    pub fn store(&self) -> &dyn UserStore {
        self.store.as_ref()
    }

    /// Create an account with a lowercased email and a bcrypt hash.
    ///
    /// # Errors
    ///
    /// [`StoreError::DuplicateEmail`] when the email is taken, [`AccountError::Validation`]
    /// for a blank password, or any store and hashing failure.
    pub async fn register(&self, registration: Registration) -> Result<UserId, AccountError> {
        let email = registration.email.trim().to_lowercase();

        if self.store.find_by_email(&email).await?.is_some() {
            return Err(StoreError::DuplicateEmail.into());
        }

        let password_hash = hash_password(registration.password, self.bcrypt_cost).await?;

        let id = self
            .store
            .insert(NewUser {
                name: registration.name.trim().to_owned(),
                email: email.clone(),
                password_hash,
                address: registration.address,
                created_at: Utc::now(),
            })
            .await?;

        info!("User registered successfully: {email} (ID: {id})");
        Ok(id)
    }

    /// Check credentials and return the account id.
    ///
    /// # Errors
    ///
    /// [`AccountError::InvalidCredentials`] for an unknown email or a wrong password.
    pub async fn login(&self, email: &str, password: String) -> Result<UserId, AccountError> {
        let email = email.trim().to_lowercase();

        let Some(user) = self.store.find_by_email(&email).await? else {
            warn!("Login attempt with non-existent email: {email}");
            return Err(AccountError::InvalidCredentials);
        };

        if !verify_password(password, user.password_hash).await {
            warn!("Login attempt with incorrect password for email: {email}");
            return Err(AccountError::InvalidCredentials);
        }

        info!("User logged in successfully: {email} (ID: {})", user.id);
        Ok(user.id)
    }

    /// Write the present onboarding fields.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] or [`StoreError::InvalidId`] for a bad id.
    pub async fn update_profile(&self, id: &UserId, update: Profile) -> Result<(), AccountError> {
        self.store.update_profile(id, update, Utc::now()).await?;
        info!("User profile updated successfully: {id}");
        Ok(())
    }

    /// Account view without the password hash.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] when no account has this id.
    pub async fn account(&self, id: &UserId) -> Result<UserAccount, AccountError> {
        self.store
            .find_by_id(id)
            .await?
            .map(UserAccount::from)
            .ok_or(AccountError::Store(StoreError::NotFound))
    }
}

fn password_bytes(password: &str) -> Vec<u8> {
    let bytes = password.as_bytes();
    bytes.get(..MAX_PASSWORD_BYTES).unwrap_or(bytes).to_vec()
}

async fn hash_password(password: String, cost: u32) -> Result<String, AccountError> {
    let password = password.trim();
    if password.is_empty() {
        return Err(AccountError::Validation("Password cannot be empty".to_owned()));
    }
    if password.len() > MAX_PASSWORD_BYTES {
        warn!(
            "Password exceeds {MAX_PASSWORD_BYTES} bytes ({}), truncating",
            password.len()
        );
    }

    let bytes = password_bytes(password);
    tokio::task::spawn_blocking(move || bcrypt::hash(bytes, cost))
        .await
        .map_err(|err| AccountError::Hashing(err.to_string()))?
        .map_err(|err| AccountError::Hashing(err.to_string()))
}

async fn verify_password(password: String, hash: String) -> bool {
    let bytes = password_bytes(password.trim());
    let verified = tokio::task::spawn_blocking(move || bcrypt::verify(bytes, &hash)).await;
    match verified {
        Ok(Ok(matches)) => matches,
        Ok(Err(err)) => {
            warn!("Password verification error: {err}");
            false
        }
        Err(err) => {
            warn!("Password verification task failed: {err}");
            false
        }
    }
}
