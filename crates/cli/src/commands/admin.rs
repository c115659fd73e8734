//! Admin user management commands.
//!
//! # Usage
//!
//! ```bash
//! jw-cli admin create -e admin@example.com -n "Admin Name" -r super_admin --password '...'
//! ```
//!
//! # Environment Variables
//!
//! - `ADMIN_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `JW_ADMIN_PASSWORD` - Used when `--password` is not given

use jouwwinkel_admin::db;
use jouwwinkel_admin::services::{AdminAuthError, AdminAuthService};
use jouwwinkel_core::{AdminRole, AdminUserId};
use thiserror::Error;

use super::migrate::{MigrationError, database_url};

/// Errors that can occur during admin operations.
#[derive(Debug, Error)]
pub enum AdminError {
    /// Required environment variable is missing.
    #[error(transparent)]
    Config(#[from] MigrationError),

    /// Database connection error.
    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    /// Invalid role.
    #[error("Invalid role: {0}. Valid roles: super_admin, admin, viewer")]
    InvalidRole(String),

    /// Rejected by the auth service (bad email, weak password, duplicate).
    #[error(transparent)]
    Auth(#[from] AdminAuthError),
}

/// Create a new admin user with a password.
///
/// # Arguments
///
/// * `email` - Admin's email address
/// * `name` - Admin's display name
/// * `role` - Admin's role (`super_admin`, `admin`, or `viewer`)
/// * `password` - Initial password, hashed with Argon2id
///
/// # Returns
///
/// The ID of the created admin user.
pub async fn create_user(
    email: &str,
    name: &str,
    role: &str,
    password: &str,
) -> Result<AdminUserId, AdminError> {
    let role: AdminRole = role
        .parse()
        .map_err(|_| AdminError::InvalidRole(role.to_owned()))?;

    let database_url = database_url("ADMIN_DATABASE_URL")?;

    tracing::info!("Connecting to admin database...");
    let pool = db::create_pool(&database_url).await?;

    tracing::info!("Creating admin user: {} ({})", email, role);

    let user = AdminAuthService::new(&pool)
        .create_user(email, name, role, password)
        .await?;

    tracing::info!(
        "Admin user created successfully! ID: {}, Email: {}, Role: {}",
        user.id,
        user.email,
        user.role
    );

    Ok(user.id)
}
