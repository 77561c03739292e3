//! User registration.
//!
//! The only route that talks to a relational store directly. Passwords are
//! hashed with Argon2 before they leave this module.

use std::sync::Arc;
use std::time::Duration;

use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHasher};
use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use tokio::sync::OnceCell;
use tracing::{error, info, warn};

use crate::backend::Credentials;
use crate::error::{RegisterError, StoreError};

const CREATE_USERS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id SERIAL PRIMARY KEY,
    username VARCHAR(50) UNIQUE NOT NULL,
    password VARCHAR(255) NOT NULL
)"#;

const INSERT_USER: &str = "INSERT INTO users (username, password) VALUES ($1, $2)";

/// Persistence for registered users.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a user; a taken username yields `StoreError::Conflict`.
    async fn insert_user(&self, username: &str, password_hash: &str) -> Result<(), StoreError>;
}

/// Postgres-backed user store.
///
/// The pool connects lazily and the `users` table is created on first use.
pub struct PgUserStore {
    pool: PgPool,
    schema_ready: OnceCell<()>,
}

impl PgUserStore {
    /// Build a lazily connecting store from a connection string.
    pub fn connect_lazy(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect_lazy(database_url)?;

        Ok(Self {
            pool,
            schema_ready: OnceCell::new(),
        })
    }

    /// Close all pooled connections.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn ensure_schema(&self) -> Result<(), StoreError> {
        self.schema_ready
            .get_or_try_init(|| async {
                sqlx::query(CREATE_USERS_TABLE).execute(&self.pool).await?;
                info!("users table ready");
                Ok::<(), StoreError>(())
            })
            .await?;
        Ok(())
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn insert_user(&self, username: &str, password_hash: &str) -> Result<(), StoreError> {
        self.ensure_schema().await?;

        sqlx::query(INSERT_USER)
            .bind(username)
            .bind(password_hash)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

/// Hash a password into a PHC string.
pub fn hash_password(password: &str) -> Result<String, RegisterError> {
    let mut salt_bytes = [0u8; 16];
    getrandom::getrandom(&mut salt_bytes).map_err(|e| RegisterError::Hashing(e.to_string()))?;
    let salt =
        SaltString::encode_b64(&salt_bytes).map_err(|e| RegisterError::Hashing(e.to_string()))?;

    let phc = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| RegisterError::Hashing(e.to_string()))?
        .to_string();
    Ok(phc)
}

/// Validates, hashes and stores new users.
#[derive(Clone)]
pub struct Registrar {
    store: Option<Arc<dyn UserStore>>,
}

impl Registrar {
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self { store: Some(store) }
    }

    /// Registrar without a backing store; every registration fails with 500.
    pub fn unavailable() -> Self {
        Self { store: None }
    }

    pub async fn register(&self, credentials: &Credentials) -> Result<(), RegisterError> {
        if !credentials.is_complete() {
            return Err(RegisterError::MissingCredentials);
        }

        let store = self.store.as_ref().ok_or_else(|| {
            error!("Registration attempted but DATABASE_URL is not configured");
            RegisterError::StoreUnavailable
        })?;

        // Argon2 is CPU-bound
        let password = credentials.password.clone();
        let hash = tokio::task::spawn_blocking(move || hash_password(&password))
            .await
            .map_err(|e| RegisterError::Hashing(e.to_string()))??;

        match store.insert_user(&credentials.username, &hash).await {
            Ok(()) => {
                info!(username = %credentials.username, "User registered");
                Ok(())
            }
            Err(StoreError::Conflict) => {
                warn!(username = %credentials.username, "Registration for existing user");
                Err(RegisterError::UserExists)
            }
            Err(StoreError::Database(msg)) => {
                error!(username = %credentials.username, error = %msg, "Registration failed");
                Err(RegisterError::Store(msg))
            }
        }
    }
}
