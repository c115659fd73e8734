//! Shipping partner (carrier) management.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use jouwwinkel_core::ShippingPartnerId;
use jouwwinkel_core::models::ShippingPartner;
use jouwwinkel_core::validation::ValidationErrors;

use crate::db::{ShippingPartnerInput, ShippingPartnerRepository};
use crate::error::AppError;
use crate::filters;
use crate::middleware::RequireWriter;
use crate::models::Flash;
use crate::routes::context::{PageContext, set_flash};
use crate::routes::forms::conflict_on;
use crate::state::AppState;

const MAX_NAME_LENGTH: usize = 100;
const MAX_URL_LENGTH: usize = 500;
const MAX_PHONE_LENGTH: usize = 30;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PartnerForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub tracking_url_template: String,
    #[serde(default)]
    pub contact_email: String,
    #[serde(default)]
    pub contact_phone: String,
    pub is_active: Option<String>,
}

impl PartnerForm {
    fn from_partner(partner: &ShippingPartner) -> Self {
        Self {
            name: partner.name.clone(),
            tracking_url_template: partner.tracking_url_template.clone().unwrap_or_default(),
            contact_email: partner.contact_email.clone().unwrap_or_default(),
            contact_phone: partner.contact_phone.clone().unwrap_or_default(),
            is_active: partner.is_active.then(|| "on".to_owned()),
        }
    }

    #[must_use]
    pub const fn active(&self) -> bool {
        self.is_active.is_some()
    }

    /// # Errors
    ///
    /// Returns the collected field errors.
    pub fn validate(&self) -> Result<ShippingPartnerInput, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let name = errors.text("name", &self.name, MAX_NAME_LENGTH, true);

        let tracking_url_template =
            errors.optional_text("tracking_url_template", &self.tracking_url_template, MAX_URL_LENGTH);
        if let Some(template) = &tracking_url_template {
            if !template.contains(ShippingPartner::TRACKING_PLACEHOLDER) {
                errors.add(
                    "tracking_url_template",
                    format!("Include {} where the tracking number goes", ShippingPartner::TRACKING_PLACEHOLDER),
                );
            } else if !template.starts_with("https://") && !template.starts_with("http://") {
                errors.add("tracking_url_template", "Enter a full https:// address");
            }
        }

        let contact_email = if self.contact_email.trim().is_empty() {
            None
        } else {
            errors
                .email("contact_email", &self.contact_email)
                .map(|email| email.to_string())
        };
        let contact_phone = errors.optional_text("contact_phone", &self.contact_phone, MAX_PHONE_LENGTH);

        errors.into_result(ShippingPartnerInput {
            name,
            tracking_url_template,
            contact_email,
            contact_phone,
            is_active: self.active(),
        })
    }
}

#[derive(Template, WebTemplate)]
#[template(path = "shipping/index.html")]
pub struct ShippingIndexTemplate {
    pub ctx: PageContext,
    pub partners: Vec<ShippingPartner>,
}

#[derive(Template, WebTemplate)]
#[template(path = "shipping/form.html")]
pub struct PartnerFormTemplate {
    pub ctx: PageContext,
    pub partner_id: Option<i32>,
    pub form: PartnerForm,
    pub errors: ValidationErrors,
    /// Example link built from the saved template.
    pub example_url: Option<String>,
}

fn form_page(
    ctx: PageContext,
    partner_id: Option<i32>,
    form: PartnerForm,
    errors: ValidationErrors,
) -> Response {
    let page = PartnerFormTemplate {
        ctx,
        partner_id,
        form,
        errors,
        example_url: None,
    };
    (StatusCode::UNPROCESSABLE_ENTITY, page).into_response()
}

/// GET /shipping
#[instrument(skip_all)]
pub async fn index(State(state): State<AppState>, ctx: PageContext) -> Result<ShippingIndexTemplate, AppError> {
    let partners = ShippingPartnerRepository::new(state.pool()).list().await?;
    Ok(ShippingIndexTemplate { ctx, partners })
}

/// GET /shipping/new
pub async fn new_partner(ctx: PageContext) -> PartnerFormTemplate {
    PartnerFormTemplate {
        ctx,
        partner_id: None,
        form: PartnerForm {
            is_active: Some("on".to_owned()),
            ..PartnerForm::default()
        },
        errors: ValidationErrors::new(),
        example_url: None,
    }
}

/// POST /shipping
#[instrument(skip(state, session, ctx, admin, form), fields(admin_id = %admin.id))]
pub async fn create(
    State(state): State<AppState>,
    session: Session,
    RequireWriter(admin): RequireWriter,
    ctx: PageContext,
    Form(form): Form<PartnerForm>,
) -> Result<Response, AppError> {
    let errors = match form.validate() {
        Ok(input) => match ShippingPartnerRepository::new(state.pool()).create(&input).await {
            Ok(partner) => {
                tracing::info!(partner_id = %partner.id, name = %partner.name, "Shipping partner created");
                set_flash(&session, Flash::success(format!("{} added", partner.name))).await?;
                return Ok(Redirect::to("/shipping").into_response());
            }
            Err(e) => conflict_on("name", e)?,
        },
        Err(errors) => errors,
    };
    Ok(form_page(ctx, None, form, errors))
}

/// GET /shipping/{id}
#[instrument(skip(state, ctx))]
pub async fn edit(
    State(state): State<AppState>,
    ctx: PageContext,
    Path(id): Path<i32>,
) -> Result<PartnerFormTemplate, AppError> {
    let partner = ShippingPartnerRepository::new(state.pool())
        .get(ShippingPartnerId::new(id))
        .await?
        .ok_or_else(|| AppError::NotFound("Shipping partner".to_owned()))?;
    Ok(PartnerFormTemplate {
        ctx,
        partner_id: Some(id),
        form: PartnerForm::from_partner(&partner),
        errors: ValidationErrors::new(),
        example_url: partner.tracking_url("3SABCD1234567"),
    })
}

/// POST /shipping/{id}
#[instrument(skip(state, session, ctx, admin, form), fields(admin_id = %admin.id))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    RequireWriter(admin): RequireWriter,
    ctx: PageContext,
    Path(id): Path<i32>,
    Form(form): Form<PartnerForm>,
) -> Result<Response, AppError> {
    let errors = match form.validate() {
        Ok(input) => match ShippingPartnerRepository::new(state.pool())
            .update(ShippingPartnerId::new(id), &input)
            .await
        {
            Ok(partner) => {
                set_flash(&session, Flash::success(format!("{} saved", partner.name))).await?;
                return Ok(Redirect::to("/shipping").into_response());
            }
            Err(e) => conflict_on("name", e)?,
        },
        Err(errors) => errors,
    };
    Ok(form_page(ctx, Some(id), form, errors))
}

/// POST /shipping/{id}/toggle
#[instrument(skip(state, session, admin), fields(admin_id = %admin.id))]
pub async fn toggle(
    State(state): State<AppState>,
    session: Session,
    RequireWriter(admin): RequireWriter,
    Path(id): Path<i32>,
) -> Result<Redirect, AppError> {
    let active = ShippingPartnerRepository::new(state.pool())
        .toggle_active(ShippingPartnerId::new(id))
        .await?;
    let message = if active {
        "Shipping partner activated"
    } else {
        "Shipping partner deactivated; it is no longer offered when shipping orders"
    };
    set_flash(&session, Flash::success(message)).await?;
    Ok(Redirect::to("/shipping"))
}

/// Orders shipped with this partner keep only their tracking number.
///
/// POST /shipping/{id}/delete
#[instrument(skip(state, session, admin), fields(admin_id = %admin.id))]
pub async fn delete(
    State(state): State<AppState>,
    session: Session,
    RequireWriter(admin): RequireWriter,
    Path(id): Path<i32>,
) -> Result<Redirect, AppError> {
    ShippingPartnerRepository::new(state.pool())
        .delete(ShippingPartnerId::new(id))
        .await?;
    tracing::info!(partner_id = id, "Shipping partner deleted");
    set_flash(&session, Flash::success("Shipping partner deleted")).await?;
    Ok(Redirect::to("/shipping"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn form() -> PartnerForm {
        PartnerForm {
            name: "PostNL".to_owned(),
            tracking_url_template: "https://jouw.postnl.nl/track-and-trace/{tracking}".to_owned(),
            is_active: Some("on".to_owned()),
            ..PartnerForm::default()
        }
    }

    #[test]
    fn test_valid_partner() {
        let input = form().validate().unwrap();
        assert_eq!(input.name, "PostNL");
        assert_eq!(input.contact_email, None);
        assert!(input.is_active);
    }

    #[test]
    fn test_template_needs_placeholder() {
        let missing = PartnerForm {
            tracking_url_template: "https://jouw.postnl.nl/track".to_owned(),
            ..form()
        };
        assert!(missing.validate().unwrap_err().get("tracking_url_template").is_some());

        let relative = PartnerForm {
            tracking_url_template: "/track/{tracking}".to_owned(),
            ..form()
        };
        assert!(relative.validate().unwrap_err().get("tracking_url_template").is_some());

        let none = PartnerForm {
            tracking_url_template: String::new(),
            ..form()
        };
        assert_eq!(none.validate().unwrap().tracking_url_template, None);
    }

    #[test]
    fn test_contact_email_checked_when_given() {
        let bad = PartnerForm {
            contact_email: "not-an-address".to_owned(),
            ..form()
        };
        assert!(bad.validate().unwrap_err().get("contact_email").is_some());

        let good = PartnerForm {
            contact_email: "zakelijk@postnl.nl".to_owned(),
            ..form()
        };
        assert_eq!(
            good.validate().unwrap().contact_email.as_deref(),
            Some("zakelijk@postnl.nl")
        );
    }
}
