//! Admin authentication service.
//!
//! Email and password sign-in with Argon2id hashes. Accounts are created
//! from the command line (`jw-cli admin create`), never through the web.

mod error;

pub use error::AdminAuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use sqlx::PgPool;
use tracing::instrument;

use jouwwinkel_core::Email;

use crate::db::admin_users::AdminUserRepository;
use crate::db::RepositoryError;
use crate::models::admin_user::{AdminRole, AdminUser};

/// Minimum password length for admin accounts.
pub const MIN_PASSWORD_LENGTH: usize = 12;

/// Longest accepted password; bounds the hashing work per request.
const MAX_PASSWORD_LENGTH: usize = 128;

/// Verified against when the email is unknown, so both paths cost one hash.
const DUMMY_HASH: &str =
    "$argon2id$v=19$m=19456,t=2,p=1$c29tZXNhbHRzb21lc2FsdA$Kf1MHqhHD2x2ywzXWy8Wk9w5L6U0Hn8nI/LOFqYkV7g";

/// Admin authentication service.
pub struct AdminAuthService<'a> {
    users: AdminUserRepository<'a>,
}

impl<'a> AdminAuthService<'a> {
    /// Create a new admin authentication service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            users: AdminUserRepository::new(pool),
        }
    }

    /// Check an email and password and stamp the login.
    ///
    /// # Errors
    ///
    /// Returns `AdminAuthError::InvalidCredentials` if the email is unknown
    /// or the password is wrong.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<AdminUser, AdminAuthError> {
        let Ok(email) = Email::parse(email) else {
            return Err(AdminAuthError::InvalidCredentials);
        };
        if password.len() > MAX_PASSWORD_LENGTH {
            return Err(AdminAuthError::InvalidCredentials);
        }

        let Some((user, hash)) = self.users.get_with_password_hash(&email).await? else {
            // Spend the same work as a real check
            let _ = verify_password(password, DUMMY_HASH);
            return Err(AdminAuthError::InvalidCredentials);
        };

        verify_password(password, &hash)?;
        self.users.record_login(user.id).await?;

        tracing::info!(admin_id = %user.id, "admin signed in");
        Ok(user)
    }

    /// Create an account with a password.
    ///
    /// # Errors
    ///
    /// Returns `AdminAuthError::InvalidEmail` or `AdminAuthError::WeakPassword`
    /// for bad input, `AdminAuthError::UserAlreadyExists` for a taken email.
    pub async fn create_user(
        &self,
        email: &str,
        name: &str,
        role: AdminRole,
        password: &str,
    ) -> Result<AdminUser, AdminAuthError> {
        let email = Email::parse(email)?;
        validate_password(password)?;
        let hash = hash_password(password)?;

        self.users
            .create(&email, name.trim(), role, &hash)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AdminAuthError::UserAlreadyExists,
                other => AdminAuthError::Repository(other),
            })
    }
}

/// Enforce the password length rules.
///
/// # Errors
///
/// Returns `AdminAuthError::WeakPassword` describing the failed rule.
pub fn validate_password(password: &str) -> Result<(), AdminAuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AdminAuthError::WeakPassword(format!(
            "must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(AdminAuthError::WeakPassword(format!(
            "must be at most {MAX_PASSWORD_LENGTH} bytes"
        )));
    }
    Ok(())
}

/// Hash a password with Argon2id and a random salt.
///
/// # Errors
///
/// Returns `AdminAuthError::PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AdminAuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AdminAuthError::PasswordHash)
}

/// Verify a password against a stored hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AdminAuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AdminAuthError::InvalidCredentials)?;
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AdminAuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_then_verify() {
        let hash = hash_password("lange-zin-als-wachtwoord").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("lange-zin-als-wachtwoord", &hash).is_ok());
        assert!(matches!(
            verify_password("iets-anders-helemaal", &hash),
            Err(AdminAuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_dummy_hash_never_verifies() {
        assert!(verify_password("", DUMMY_HASH).is_err());
        assert!(verify_password("password", DUMMY_HASH).is_err());
    }

    #[test]
    fn test_password_rules() {
        assert!(matches!(
            validate_password("short"),
            Err(AdminAuthError::WeakPassword(_))
        ));
        assert!(validate_password("twelve chars").is_ok());
        assert!(validate_password(&"x".repeat(MAX_PASSWORD_LENGTH + 1)).is_err());
    }
}
