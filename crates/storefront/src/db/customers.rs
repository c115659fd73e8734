//! Customer accounts.

use sqlx::PgPool;
use tracing::instrument;

use jouwwinkel_core::models::{Customer, ShippingAddress};
use jouwwinkel_core::{CustomerId, Email};

use super::{RepositoryError, conflict_on_unique};

macro_rules! customer_select {
    () => {
        "SELECT id, email, full_name, phone, street, postal_code, city, country, created_at, updated_at \
         FROM shop.customer"
    };
}

/// Profile fields a customer may edit.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub full_name: String,
    pub phone: String,
    pub street: String,
    pub postal_code: String,
    pub city: String,
    pub country: String,
}

impl From<&ShippingAddress> for ProfileUpdate {
    fn from(address: &ShippingAddress) -> Self {
        Self {
            full_name: address.full_name.clone(),
            phone: address.phone.clone(),
            street: address.street.clone(),
            postal_code: address.postal_code.clone(),
            city: address.city.clone(),
            country: address.country.clone(),
        }
    }
}

/// Repository for customer accounts.
pub struct CustomerRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CustomerRepository<'a> {
    /// Create a new customer repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a customer by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: CustomerId) -> Result<Option<Customer>, RepositoryError> {
        let row = sqlx::query_as::<_, Customer>(concat!(customer_select!(), " WHERE id = $1"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(row)
    }

    /// Get a customer by email address.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_email(&self, email: &Email) -> Result<Option<Customer>, RepositoryError> {
        let row = sqlx::query_as::<_, Customer>(concat!(customer_select!(), " WHERE email = $1"))
            .bind(email)
            .fetch_optional(self.pool)
            .await?;
        Ok(row)
    }

    /// Create a customer together with their password hash.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email already exists.
    /// Returns `RepositoryError::Database` for other database errors.
    #[instrument(skip(self, password_hash), fields(email = %email))]
    pub async fn create_with_password(
        &self,
        email: &Email,
        full_name: &str,
        password_hash: &str,
    ) -> Result<Customer, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let customer = sqlx::query_as::<_, Customer>(
            "INSERT INTO shop.customer (email, full_name) VALUES ($1, $2) \
             RETURNING id, email, full_name, phone, street, postal_code, city, country, created_at, updated_at",
        )
        .bind(email)
        .bind(full_name)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| conflict_on_unique(e, "email already exists"))?;

        sqlx::query("INSERT INTO shop.customer_password (customer_id, password_hash) VALUES ($1, $2)")
            .bind(customer.id)
            .bind(password_hash)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(customer)
    }

    /// Get a customer and their password hash by email.
    ///
    /// Returns `None` if the customer doesn't exist or has no password set.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_password_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(Customer, String)>, RepositoryError> {
        let Some(customer) = self.get_by_email(email).await? else {
            return Ok(None);
        };

        let hash: Option<String> =
            sqlx::query_scalar("SELECT password_hash FROM shop.customer_password WHERE customer_id = $1")
                .bind(customer.id)
                .fetch_optional(self.pool)
                .await?;

        Ok(hash.map(|h| (customer, h)))
    }

    /// Save the profile and default shipping address.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the customer doesn't exist.
    /// Returns `RepositoryError::Database` for other database errors.
    #[instrument(skip(self, update))]
    pub async fn update_profile(
        &self,
        id: CustomerId,
        update: &ProfileUpdate,
    ) -> Result<Customer, RepositoryError> {
        let row = sqlx::query_as::<_, Customer>(
            "UPDATE shop.customer SET full_name = $2, phone = $3, street = $4, postal_code = $5, \
             city = $6, country = $7, updated_at = NOW() WHERE id = $1 \
             RETURNING id, email, full_name, phone, street, postal_code, city, country, created_at, updated_at",
        )
        .bind(id)
        .bind(&update.full_name)
        .bind(&update.phone)
        .bind(&update.street)
        .bind(&update.postal_code)
        .bind(&update.city)
        .bind(&update.country)
        .fetch_optional(self.pool)
        .await?;

        row.ok_or(RepositoryError::NotFound)
    }
}
