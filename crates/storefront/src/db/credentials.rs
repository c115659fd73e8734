//! Passkey storage for customer accounts.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use webauthn_rs::prelude::Passkey;

use jouwwinkel_core::{CredentialId, CustomerId};

use super::{RepositoryError, conflict_on_unique};
use crate::models::CustomerCredential;

#[derive(sqlx::FromRow)]
struct CredentialRow {
    id: CredentialId,
    customer_id: CustomerId,
    webauthn_id: Vec<u8>,
    passkey: serde_json::Value,
    name: String,
    created_at: DateTime<Utc>,
    last_used_at: Option<DateTime<Utc>>,
}

impl TryFrom<CredentialRow> for CustomerCredential {
    type Error = RepositoryError;

    fn try_from(row: CredentialRow) -> Result<Self, Self::Error> {
        let passkey: Passkey = serde_json::from_value(row.passkey)
            .map_err(|e| RepositoryError::DataCorruption(format!("invalid passkey data: {e}")))?;
        Ok(Self {
            id: row.id,
            customer_id: row.customer_id,
            webauthn_id: row.webauthn_id,
            passkey,
            name: row.name,
            created_at: row.created_at,
            last_used_at: row.last_used_at,
        })
    }
}

fn passkey_json(passkey: &Passkey) -> Result<serde_json::Value, RepositoryError> {
    serde_json::to_value(passkey)
        .map_err(|e| RepositoryError::DataCorruption(format!("failed to serialize passkey: {e}")))
}

/// Repository for customer passkeys.
pub struct CredentialRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CredentialRepository<'a> {
    /// Create a new credential repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All passkeys of a customer, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if any stored passkey is invalid.
    pub async fn list_for_customer(
        &self,
        customer_id: CustomerId,
    ) -> Result<Vec<CustomerCredential>, RepositoryError> {
        let rows = sqlx::query_as::<_, CredentialRow>(
            "SELECT id, customer_id, webauthn_id, passkey, name, created_at, last_used_at \
             FROM shop.customer_credential WHERE customer_id = $1 ORDER BY created_at",
        )
        .bind(customer_id)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(CustomerCredential::try_from).collect()
    }

    /// Store a freshly registered passkey.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the credential ID already exists.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(
        &self,
        customer_id: CustomerId,
        passkey: &Passkey,
        name: &str,
    ) -> Result<CustomerCredential, RepositoryError> {
        let row = sqlx::query_as::<_, CredentialRow>(
            "INSERT INTO shop.customer_credential (customer_id, webauthn_id, passkey, name) \
             VALUES ($1, $2, $3, $4) \
             RETURNING id, customer_id, webauthn_id, passkey, name, created_at, last_used_at",
        )
        .bind(customer_id)
        .bind(passkey.cred_id().as_ref())
        .bind(passkey_json(passkey)?)
        .bind(name)
        .fetch_one(self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "credential already exists"))?;

        CustomerCredential::try_from(row)
    }

    /// Find a passkey by its `WebAuthn` credential ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the stored passkey is invalid.
    pub async fn by_webauthn_id(
        &self,
        webauthn_id: &[u8],
    ) -> Result<Option<CustomerCredential>, RepositoryError> {
        let row = sqlx::query_as::<_, CredentialRow>(
            "SELECT id, customer_id, webauthn_id, passkey, name, created_at, last_used_at \
             FROM shop.customer_credential WHERE webauthn_id = $1",
        )
        .bind(webauthn_id)
        .fetch_optional(self.pool)
        .await?;

        row.map(CustomerCredential::try_from).transpose()
    }

    /// Save the updated passkey state after a sign-in.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the credential doesn't exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn record_use(&self, id: CredentialId, passkey: &Passkey) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE shop.customer_credential SET passkey = $2, last_used_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(passkey_json(passkey)?)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Delete one of the customer's passkeys.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the customer has no such passkey.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn delete(&self, id: CredentialId, customer_id: CustomerId) -> Result<(), RepositoryError> {
        let result =
            sqlx::query("DELETE FROM shop.customer_credential WHERE id = $1 AND customer_id = $2")
                .bind(id)
                .bind(customer_id)
                .execute(self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
