//! # SQLite user store
//!
//! Holds registered accounts and their onboarding answers.
//!
//! ## Lifecycle
//!
//! - Constructed unconnected at startup, `connect` opens the file and creates
//!   the schema, `close` drops the connection at shutdown
//! - Every call before `connect` or after `close` answers
//!   [`StoreError::NotConnected`], which the DB health check reports as 503
//!
//! ## Implementation
//!
//! - One `rusqlite::Connection` behind a mutex; queries run on the blocking pool
//! - Ids are SQLite row ids rendered as strings
//! - Emails are unique and stored lowercased by the caller
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, ErrorCode, OptionalExtension, Row, params};
use tracing::info;

use ecofit_core::{
    model::{NewUser, Profile, StoredUser, UserId},
    ports::{StoreError, UserStore},
};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS users (
    id                    INTEGER PRIMARY KEY AUTOINCREMENT,
    name                  TEXT NOT NULL,
    email                 TEXT NOT NULL UNIQUE,
    password_hash         TEXT NOT NULL,
    address               TEXT,
    waste_amount          TEXT,
    has_recycling_bin     INTEGER,
    has_compost_bin       INTEGER,
    has_weekly_collection INTEGER,
    residence_type        TEXT,
    household_size        TEXT,
    onboarding_completed  INTEGER,
    created_at            TEXT NOT NULL,
    updated_at            TEXT
);";

const SELECT_USER: &str = "SELECT id, name, email, password_hash, address, waste_amount,
    has_recycling_bin, has_compost_bin, has_weekly_collection, residence_type,
    household_size, onboarding_completed, created_at, updated_at FROM users";

/// [`UserStore`] backed by a single SQLite connection.
pub struct SqliteUserStore {
    path: String,
    connection: Arc<Mutex<Option<Connection>>>,
}

impl SqliteUserStore {
    /// Unconnected store for the file at `path` (`:memory:` allowed).
    pub fn new<P: Into<String>>(path: P) -> Self {
        Self {
            path: path.into(),
            connection: Arc::new(Mutex::new(None)),
        }
    }

    /// Open the database and create the schema.
    ///
    /// # Errors
    ///
    /// [`StoreError::Backend`] when the file cannot be opened or migrated.
    pub async fn connect(&self) -> Result<(), StoreError> {
        let path = self.path.clone();
        let slot = Arc::clone(&self.connection);
        tokio::task::spawn_blocking(move || {
            let connection = Connection::open(&path).map_err(backend)?;
            connection.execute_batch(SCHEMA).map_err(backend)?;
            *slot.lock().map_err(|err| StoreError::Backend(err.to_string()))? = Some(connection);
            info!("Connected to user database at {path}");
            Ok(())
        })
        .await
        .map_err(|err| StoreError::Backend(err.to_string()))?
    }

    /// Drop the connection; later calls report [`StoreError::NotConnected`].
    pub async fn close(&self) {
        let slot = Arc::clone(&self.connection);
        let closed = tokio::task::spawn_blocking(move || {
            slot.lock().map(|mut guard| guard.take().is_some()).unwrap_or(false)
        })
        .await
        .unwrap_or(false);
        if closed {
            info!("Disconnected from user database");
        }
    }

    async fn with_connection<T, F>(&self, op: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, StoreError> + Send + 'static,
    {
        let slot = Arc::clone(&self.connection);
        tokio::task::spawn_blocking(move || {
            let guard = slot
                .lock()
                .map_err(|err| StoreError::Backend(err.to_string()))?;
            let connection = guard.as_ref().ok_or(StoreError::NotConnected)?;
            op(connection)
        })
        .await
        .map_err(|err| StoreError::Backend(err.to_string()))?
    }
}

#[async_trait]
impl UserStore for SqliteUserStore {
    fn database_name(&self) -> &str {
        &self.path
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.with_connection(|connection| {
            connection
                .query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
                .map(drop)
                .map_err(backend)
        })
        .await
    }

    async fn insert(&self, user: NewUser) -> Result<UserId, StoreError> {
        self.with_connection(move |connection| {
            connection
                .execute(
                    "INSERT INTO users (name, email, password_hash, address, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![
                        user.name,
                        user.email,
                        user.password_hash,
                        user.address,
                        user.created_at
                    ],
                )
                .map_err(|err| match err.sqlite_error_code() {
                    Some(ErrorCode::ConstraintViolation) => StoreError::DuplicateEmail,
                    _ => backend(err),
                })?;
            Ok(UserId(connection.last_insert_rowid().to_string()))
        })
        .await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<StoredUser>, StoreError> {
        let email = email.to_owned();
        self.with_connection(move |connection| {
            connection
                .query_row(&format!("{SELECT_USER} WHERE email = ?1"), [email], read_user)
                .optional()
                .map_err(backend)
        })
        .await
    }

    async fn find_by_id(&self, id: &UserId) -> Result<Option<StoredUser>, StoreError> {
        let row_id = parse_id(id)?;
        self.with_connection(move |connection| {
            connection
                .query_row(&format!("{SELECT_USER} WHERE id = ?1"), [row_id], read_user)
                .optional()
                .map_err(backend)
        })
        .await
    }

    async fn update_profile(
        &self,
        id: &UserId,
        update: Profile,
        updated_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let row_id = parse_id(id)?;
        let changed = self
            .with_connection(move |connection| {
                connection
                    .execute(
                        "UPDATE users SET
                            waste_amount = COALESCE(?1, waste_amount),
                            has_recycling_bin = COALESCE(?2, has_recycling_bin),
                            has_compost_bin = COALESCE(?3, has_compost_bin),
                            has_weekly_collection = COALESCE(?4, has_weekly_collection),
                            residence_type = COALESCE(?5, residence_type),
                            household_size = COALESCE(?6, household_size),
                            onboarding_completed = COALESCE(?7, onboarding_completed),
                            updated_at = ?8
                         WHERE id = ?9",
                        params![
                            update.waste_amount,
                            update.has_recycling_bin,
                            update.has_compost_bin,
                            update.has_weekly_collection,
                            update.residence_type,
                            update.household_size,
                            update.onboarding_completed,
                            updated_at,
                            row_id
                        ],
                    )
                    .map_err(backend)
            })
            .await?;

        if changed == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

fn parse_id(id: &UserId) -> Result<i64, StoreError> {
    id.0.trim().parse::<i64>().ok().ok_or(StoreError::InvalidId)
}

fn backend(err: rusqlite::Error) -> StoreError {
    StoreError::Backend(err.to_string())
}

fn read_user(row: &Row<'_>) -> rusqlite::Result<StoredUser> {
    Ok(StoredUser {
        id: UserId(row.get::<_, i64>("id")?.to_string()),
        name: row.get("name")?,
        email: row.get("email")?,
        password_hash: row.get("password_hash")?,
        address: row.get("address")?,
        profile: Profile {
            waste_amount: row.get("waste_amount")?,
            has_recycling_bin: row.get("has_recycling_bin")?,
            has_compost_bin: row.get("has_compost_bin")?,
            has_weekly_collection: row.get("has_weekly_collection")?,
            residence_type: row.get("residence_type")?,
            household_size: row.get("household_size")?,
            onboarding_completed: row.get("onboarding_completed")?,
        },
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            name: "Ada".to_owned(),
            email: email.to_owned(),
            password_hash: "$2b$04$hash".to_owned(),
            address: Some("1 Bin Lane".to_owned()),
            created_at: Utc::now(),
        }
    }

    async fn connected() -> SqliteUserStore {
        let store = SqliteUserStore::new(":memory:");
        store.connect().await.expect("in-memory database");
        store
    }

    #[tokio::test]
    async fn calls_before_connect_report_not_connected() {
        let store = SqliteUserStore::new(":memory:");
        assert_eq!(store.ping().await, Err(StoreError::NotConnected));
        assert_eq!(
            store.insert(new_user("a@b.test")).await,
            Err(StoreError::NotConnected)
        );
    }

    #[tokio::test]
    async fn close_disconnects() {
        let store = connected().await;
        assert_eq!(store.ping().await, Ok(()));
        store.close().await;
        assert_eq!(store.ping().await, Err(StoreError::NotConnected));
    }

    #[tokio::test]
    async fn inserted_user_can_be_found_by_email_and_id() {
        let store = connected().await;
        let id = store.insert(new_user("ada@bins.test")).await.expect("insert");

        let by_email = store
            .find_by_email("ada@bins.test")
            .await
            .expect("query")
            .expect("present");
        assert_eq!(by_email.id, id);
        assert_eq!(by_email.address.as_deref(), Some("1 Bin Lane"));
        assert_eq!(by_email.profile, Profile::default());

        let by_id = store.find_by_id(&id).await.expect("query").expect("present");
        assert_eq!(by_id.email, "ada@bins.test");
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let store = connected().await;
        store.insert(new_user("dup@bins.test")).await.expect("first insert");
        assert_eq!(
            store.insert(new_user("dup@bins.test")).await,
            Err(StoreError::DuplicateEmail)
        );
    }

    #[tokio::test]
    async fn profile_update_merges_present_fields() {
        let store = connected().await;
        let id = store.insert(new_user("p@bins.test")).await.expect("insert");

        let first = Profile {
            waste_amount: Some("medium".to_owned()),
            has_compost_bin: Some(false),
            ..Profile::default()
        };
        store.update_profile(&id, first, Utc::now()).await.expect("update");

        let second = Profile {
            has_compost_bin: Some(true),
            onboarding_completed: Some(true),
            ..Profile::default()
        };
        store.update_profile(&id, second, Utc::now()).await.expect("update");

        let user = store.find_by_id(&id).await.expect("query").expect("present");
        assert_eq!(user.profile.waste_amount.as_deref(), Some("medium"));
        assert_eq!(user.profile.has_compost_bin, Some(true));
        assert_eq!(user.profile.onboarding_completed, Some(true));
        assert!(user.updated_at.is_some());
    }

    #[tokio::test]
    async fn unknown_or_malformed_ids() {
        let store = connected().await;
        assert_eq!(
            store
                .update_profile(&UserId("42".to_owned()), Profile::default(), Utc::now())
                .await,
            Err(StoreError::NotFound)
        );
        assert_eq!(
            store.find_by_id(&UserId("not-an-id".to_owned())).await.err(),
            Some(StoreError::InvalidId)
        );
    }
}
