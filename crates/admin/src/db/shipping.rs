//! Shipping partners (carriers).

use sqlx::PgPool;

use jouwwinkel_core::ShippingPartnerId;
use jouwwinkel_core::models::ShippingPartner;

use super::{RepositoryError, conflict_on_unique};

macro_rules! partner_columns {
    () => {
        "id, name, tracking_url_template, contact_email, contact_phone, is_active, created_at"
    };
}

/// Editable carrier fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShippingPartnerInput {
    pub name: String,
    /// URL with a `{tracking}` placeholder.
    pub tracking_url_template: Option<String>,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub is_active: bool,
}

/// Repository for shipping partners.
pub struct ShippingPartnerRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ShippingPartnerRepository<'a> {
    /// Create a new shipping partner repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All partners by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<ShippingPartner>, RepositoryError> {
        let rows = sqlx::query_as::<_, ShippingPartner>(concat!(
            "SELECT ",
            partner_columns!(),
            " FROM shop.shipping_partner ORDER BY name"
        ))
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Partners that can take new shipments.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_active(&self) -> Result<Vec<ShippingPartner>, RepositoryError> {
        let rows = sqlx::query_as::<_, ShippingPartner>(concat!(
            "SELECT ",
            partner_columns!(),
            " FROM shop.shipping_partner WHERE is_active ORDER BY name"
        ))
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Get a partner by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: ShippingPartnerId) -> Result<Option<ShippingPartner>, RepositoryError> {
        let row = sqlx::query_as::<_, ShippingPartner>(concat!(
            "SELECT ",
            partner_columns!(),
            " FROM shop.shipping_partner WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(row)
    }

    /// Create a partner.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the name is taken.
    pub async fn create(&self, input: &ShippingPartnerInput) -> Result<ShippingPartner, RepositoryError> {
        let row = sqlx::query_as::<_, ShippingPartner>(concat!(
            "INSERT INTO shop.shipping_partner (name, tracking_url_template, contact_email, \
             contact_phone, is_active) VALUES ($1, $2, $3, $4, $5) RETURNING ",
            partner_columns!()
        ))
        .bind(&input.name)
        .bind(input.tracking_url_template.as_deref())
        .bind(input.contact_email.as_deref())
        .bind(input.contact_phone.as_deref())
        .bind(input.is_active)
        .fetch_one(self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "a shipping partner with this name already exists"))?;
        Ok(row)
    }

    /// Update a partner.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the partner does not exist.
    /// Returns `RepositoryError::Conflict` if the name is taken.
    pub async fn update(
        &self,
        id: ShippingPartnerId,
        input: &ShippingPartnerInput,
    ) -> Result<ShippingPartner, RepositoryError> {
        let row = sqlx::query_as::<_, ShippingPartner>(concat!(
            "UPDATE shop.shipping_partner SET name = $2, tracking_url_template = $3, \
             contact_email = $4, contact_phone = $5, is_active = $6 WHERE id = $1 RETURNING ",
            partner_columns!()
        ))
        .bind(id)
        .bind(&input.name)
        .bind(input.tracking_url_template.as_deref())
        .bind(input.contact_email.as_deref())
        .bind(input.contact_phone.as_deref())
        .bind(input.is_active)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "a shipping partner with this name already exists"))?;
        row.ok_or(RepositoryError::NotFound)
    }

    /// Flip the active flag; returns the new value.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the partner does not exist.
    pub async fn toggle_active(&self, id: ShippingPartnerId) -> Result<bool, RepositoryError> {
        sqlx::query_scalar(
            "UPDATE shop.shipping_partner SET is_active = NOT is_active WHERE id = $1 \
             RETURNING is_active",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    /// Delete a partner. Shipped orders keep their tracking number.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the partner does not exist.
    pub async fn delete(&self, id: ShippingPartnerId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM shop.shipping_partner WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
