//! Authentication error types.

use thiserror::Error;

use crate::db::RepositoryError;

/// Errors that can occur during sign-in, registration and passkey management.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] jouwwinkel_core::EmailError),

    /// Wrong password or unknown email.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Customer not found.
    #[error("customer not found")]
    CustomerNotFound,

    /// An account already uses this email.
    #[error("customer already exists")]
    CustomerAlreadyExists,

    /// Password too weak or invalid.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// Name missing or too long.
    #[error("invalid name: {0}")]
    InvalidName(String),

    /// `WebAuthn` error.
    #[error("webauthn error: {0}")]
    WebAuthn(#[from] webauthn_rs::prelude::WebauthnError),

    /// No passkeys registered for the account.
    #[error("no passkeys registered for this account")]
    NoCredentials,

    /// Credential not found.
    #[error("credential not found")]
    CredentialNotFound,

    /// Challenge state missing from the session or expired.
    #[error("invalid session state")]
    InvalidSessionState,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}

impl AuthError {
    /// Message safe to show on a form.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidCredentials | Self::CustomerNotFound => {
                "Invalid email or password".to_owned()
            }
            Self::CustomerAlreadyExists => "An account with this email already exists".to_owned(),
            Self::WeakPassword(msg) | Self::InvalidName(msg) => msg.clone(),
            Self::InvalidEmail(_) => "Invalid email address".to_owned(),
            Self::NoCredentials => "No passkeys registered for this account".to_owned(),
            Self::CredentialNotFound => "Passkey not found".to_owned(),
            Self::InvalidSessionState => "Session expired, please try again".to_owned(),
            Self::WebAuthn(_) => "Passkey verification failed".to_owned(),
            Self::Repository(_) | Self::PasswordHash => {
                "Something went wrong, please try again".to_owned()
            }
        }
    }
}
