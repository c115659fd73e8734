//! Customer authentication service.
//!
//! Provides password and `WebAuthn` passkey authentication for shop customers.

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use sqlx::PgPool;
use tracing::instrument;
use webauthn_rs::prelude::*;

use jouwwinkel_core::models::Customer;
use jouwwinkel_core::{CredentialId, CustomerId, Email};

use crate::db::{CredentialRepository, CustomerRepository, RepositoryError};
use crate::models::CustomerCredential;

/// Minimum password length.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Longest accepted password; bounds the hashing work per request.
const MAX_PASSWORD_LENGTH: usize = 128;

/// Longest accepted customer name.
const MAX_NAME_LENGTH: usize = 120;

/// Authentication service.
///
/// Handles customer registration, login, and `WebAuthn` passkey management.
pub struct AuthService<'a> {
    customers: CustomerRepository<'a>,
    credentials: CredentialRepository<'a>,
    webauthn: &'a Webauthn,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(pool: &'a PgPool, webauthn: &'a Webauthn) -> Self {
        Self {
            customers: CustomerRepository::new(pool),
            credentials: CredentialRepository::new(pool),
            webauthn,
        }
    }

    // =========================================================================
    // Password Authentication
    // =========================================================================

    /// Register a new customer with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::InvalidName` if the name is blank or too long.
    /// Returns `AuthError::WeakPassword` if the password doesn't meet requirements.
    /// Returns `AuthError::CustomerAlreadyExists` if the email is already registered.
    #[instrument(skip(self, password))]
    pub async fn register_with_password(
        &self,
        email: &str,
        full_name: &str,
        password: &str,
    ) -> Result<Customer, AuthError> {
        let email = Email::parse(email)?;
        let full_name = validate_name(full_name)?;
        validate_password(password)?;

        let password_hash = hash_password(password)?;

        self.customers
            .create_with_password(&email, full_name, &password_hash)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::CustomerAlreadyExists,
                other => AuthError::Repository(other),
            })
    }

    /// Login with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong.
    #[instrument(skip(self, password))]
    pub async fn login_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Customer, AuthError> {
        let email = Email::parse(email)?;

        let (customer, password_hash) = self
            .customers
            .get_password_hash(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &password_hash)?;

        Ok(customer)
    }

    // =========================================================================
    // WebAuthn Registration
    // =========================================================================

    /// Start passkey registration for a signed-in customer.
    ///
    /// Returns the challenge to send to the client and the registration state
    /// to store in the session.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::WebAuthn` if the challenge cannot be generated.
    pub async fn start_passkey_registration(
        &self,
        customer_id: CustomerId,
        email: &Email,
        display_name: &str,
    ) -> Result<(CreationChallengeResponse, PasskeyRegistration), AuthError> {
        let existing = self.credentials.list_for_customer(customer_id).await?;
        let exclude_credentials: Vec<CredentialID> = existing
            .iter()
            .map(|c| CredentialID::from(c.webauthn_id.clone()))
            .collect();

        let (challenge, reg_state) = self.webauthn.start_passkey_registration(
            webauthn_user_id(customer_id),
            email.as_str(),
            display_name,
            Some(exclude_credentials),
        )?;

        Ok((challenge, reg_state))
    }

    /// Finish passkey registration and store the new passkey.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::WebAuthn` if validation fails.
    /// Returns `AuthError::Repository` if the passkey cannot be saved.
    pub async fn finish_passkey_registration(
        &self,
        customer_id: CustomerId,
        state: &PasskeyRegistration,
        response: &RegisterPublicKeyCredential,
        name: &str,
    ) -> Result<CustomerCredential, AuthError> {
        let passkey = self.webauthn.finish_passkey_registration(response, state)?;
        let name = match name.trim() {
            "" => "Passkey",
            trimmed => trimmed,
        };
        let credential = self.credentials.create(customer_id, &passkey, name).await?;
        Ok(credential)
    }

    // =========================================================================
    // WebAuthn Authentication
    // =========================================================================

    /// Start passkey authentication for the account with this email.
    ///
    /// Returns the challenge, the state to keep in the session, and the
    /// customer the challenge was issued for.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::CustomerNotFound` if the customer doesn't exist.
    /// Returns `AuthError::NoCredentials` if the customer has no passkeys.
    /// Returns `AuthError::WebAuthn` if the challenge cannot be generated.
    pub async fn start_passkey_authentication(
        &self,
        email: &str,
    ) -> Result<(RequestChallengeResponse, PasskeyAuthentication, CustomerId), AuthError> {
        let email = Email::parse(email)?;
        let customer = self
            .customers
            .get_by_email(&email)
            .await?
            .ok_or(AuthError::CustomerNotFound)?;

        let credentials = self.credentials.list_for_customer(customer.id).await?;
        if credentials.is_empty() {
            return Err(AuthError::NoCredentials);
        }

        let passkeys: Vec<Passkey> = credentials.iter().map(|c| c.passkey.clone()).collect();
        let (challenge, auth_state) = self.webauthn.start_passkey_authentication(&passkeys)?;

        Ok((challenge, auth_state, customer.id))
    }

    /// Finish passkey authentication.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::WebAuthn` if validation fails.
    /// Returns `AuthError::CredentialNotFound` if the passkey isn't the customer's.
    pub async fn finish_passkey_authentication(
        &self,
        state: &PasskeyAuthentication,
        response: &PublicKeyCredential,
        customer_id: CustomerId,
    ) -> Result<Customer, AuthError> {
        let auth_result = self
            .webauthn
            .finish_passkey_authentication(response, state)?;

        let mut credential = self
            .credentials
            .by_webauthn_id(auth_result.cred_id().as_ref())
            .await?
            .filter(|c| c.customer_id == customer_id)
            .ok_or(AuthError::CredentialNotFound)?;

        // Counter and backup state change on most sign-ins
        credential.passkey.update_credential(&auth_result);
        self.credentials
            .record_use(credential.id, &credential.passkey)
            .await?;

        self.customers
            .get_by_id(customer_id)
            .await?
            .ok_or(AuthError::CustomerNotFound)
    }

    // =========================================================================
    // Credential Management
    // =========================================================================

    /// All passkeys of a customer.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Repository` if the database operation fails.
    pub async fn get_credentials(
        &self,
        customer_id: CustomerId,
    ) -> Result<Vec<CustomerCredential>, AuthError> {
        let credentials = self.credentials.list_for_customer(customer_id).await?;
        Ok(credentials)
    }

    /// Delete one of the customer's passkeys.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::CredentialNotFound` if the customer has no such passkey.
    pub async fn delete_credential(
        &self,
        customer_id: CustomerId,
        credential_id: CredentialId,
    ) -> Result<(), AuthError> {
        self.credentials
            .delete(credential_id, customer_id)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => AuthError::CredentialNotFound,
                other => AuthError::Repository(other),
            })
    }
}

/// Stable `WebAuthn` user handle for a customer.
///
/// Derived from the numeric ID so the same account always presents the same
/// handle to the authenticator.
fn webauthn_user_id(customer_id: CustomerId) -> Uuid {
    const PREFIX: u128 = 0x4a57_0000_0000_8000_8000_0000_0000_0000;
    Uuid::from_u128(PREFIX | u128::from(customer_id.as_i32().unsigned_abs()))
}

fn validate_name(name: &str) -> Result<&str, AuthError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AuthError::InvalidName("Please enter your name".to_owned()));
    }
    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(AuthError::InvalidName(format!(
            "Name must be at most {MAX_NAME_LENGTH} characters"
        )));
    }
    Ok(name)
}

/// Validate password meets requirements.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "Password must be at most {MAX_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Hash a password using Argon2id.
fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_password_length_rules() {
        assert!(matches!(
            validate_password("short"),
            Err(AuthError::WeakPassword(_))
        ));
        assert!(validate_password("long enough").is_ok());
        assert!(validate_password(&"x".repeat(MAX_PASSWORD_LENGTH + 1)).is_err());
    }

    #[test]
    fn test_hash_then_verify() {
        let hash = hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("correct horse", &hash).is_ok());
        assert!(matches!(
            verify_password("wrong horse", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_verify_rejects_garbage_hash() {
        assert!(matches!(
            verify_password("anything", "not-a-hash"),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_validate_name() {
        assert_eq!(validate_name("  Sanne de Vries ").unwrap(), "Sanne de Vries");
        assert!(validate_name("   ").is_err());
        assert!(validate_name(&"a".repeat(MAX_NAME_LENGTH + 1)).is_err());
    }

    #[test]
    fn test_webauthn_user_id_is_stable() {
        let a = webauthn_user_id(CustomerId::new(42));
        let b = webauthn_user_id(CustomerId::new(42));
        let c = webauthn_user_id(CustomerId::new(43));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_user_message_hides_internals() {
        let err = AuthError::Repository(RepositoryError::NotFound);
        assert!(!err.user_message().contains("not found"));
        assert_eq!(
            AuthError::CustomerNotFound.user_message(),
            AuthError::InvalidCredentials.user_message()
        );
    }
}
