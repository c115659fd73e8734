//! Database migration commands.
//!
//! # Environment Variables
//!
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string for the shop schema
//! - `ADMIN_DATABASE_URL` - `PostgreSQL` connection string for the admin schema
//!
//! Both fall back to `DATABASE_URL`; in a normal install all three point at
//! the same database.
//!
//! # Migration Files
//!
//! - Storefront: `crates/storefront/migrations/`
//! - Admin: `crates/admin/migrations/`
//!
//! The two sets share sqlx's bookkeeping table, so each run ignores the
//! versions applied by the other set.

use secrecy::{ExposeSecret, SecretString};
use sqlx::PgPool;
use sqlx::migrate::Migrator;
use thiserror::Error;

/// Errors that can occur while migrating.
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("Missing environment variable: {0} (or DATABASE_URL)")]
    MissingEnvVar(&'static str),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Run storefront database migrations.
///
/// # Errors
///
/// Returns an error if the database URL is missing or a migration fails.
pub async fn storefront() -> Result<(), MigrationError> {
    run("storefront", "STOREFRONT_DATABASE_URL", sqlx::migrate!("../storefront/migrations")).await
}

/// Run admin database migrations.
///
/// # Errors
///
/// Returns an error if the database URL is missing or a migration fails.
pub async fn admin() -> Result<(), MigrationError> {
    run("admin", "ADMIN_DATABASE_URL", sqlx::migrate!("../admin/migrations")).await
}

async fn run(name: &str, env_var: &'static str, mut migrator: Migrator) -> Result<(), MigrationError> {
    let database_url = database_url(env_var)?;

    tracing::info!("Connecting to {name} database...");
    let pool = PgPool::connect(database_url.expose_secret()).await?;

    tracing::info!("Running {name} migrations...");
    migrator.set_ignore_missing(true);
    migrator.run(&pool).await?;

    tracing::info!("{name} migrations complete!");
    Ok(())
}

/// Read a database URL with fallback to generic `DATABASE_URL`.
pub(crate) fn database_url(env_var: &'static str) -> Result<SecretString, MigrationError> {
    dotenvy::dotenv().ok();

    std::env::var(env_var)
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| MigrationError::MissingEnvVar(env_var))
}
