//! Coupon management.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use jouwwinkel_core::coupon::{Coupon, CouponTerms, normalize_code, validate_coupon_terms};
use jouwwinkel_core::validation::ValidationErrors;
use jouwwinkel_core::{CouponId, DiscountType};

use crate::db::{CouponInput, CouponRepository};
use crate::error::AppError;
use crate::filters;
use crate::middleware::RequireWriter;
use crate::models::Flash;
use crate::routes::context::{PageContext, set_flash};
use crate::routes::forms::conflict_on;
use crate::state::AppState;

const MAX_DESCRIPTION_LENGTH: usize = 500;

/// `<input type="datetime-local">` value format.
const INPUT_DATETIME: &str = "%Y-%m-%dT%H:%M";

fn input_datetime(value: Option<DateTime<Utc>>) -> String {
    value
        .map(|dt| dt.format(INPUT_DATETIME).to_string())
        .unwrap_or_default()
}

fn optional_amount(value: Option<Decimal>) -> String {
    value.map(|d| d.to_string()).unwrap_or_default()
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CouponForm {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub discount_type: String,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub min_order_amount: String,
    #[serde(default)]
    pub max_discount: String,
    #[serde(default)]
    pub usage_limit: String,
    #[serde(default)]
    pub starts_at: String,
    #[serde(default)]
    pub expires_at: String,
    pub is_active: Option<String>,
}

impl CouponForm {
    fn from_coupon(coupon: &Coupon) -> Self {
        Self {
            code: coupon.code.clone(),
            description: coupon.description.clone(),
            discount_type: coupon.discount_type.to_string(),
            value: coupon.value.to_string(),
            min_order_amount: optional_amount(coupon.min_order_amount),
            max_discount: optional_amount(coupon.max_discount),
            usage_limit: coupon.usage_limit.map(|l| l.to_string()).unwrap_or_default(),
            starts_at: input_datetime(coupon.starts_at),
            expires_at: input_datetime(coupon.expires_at),
            is_active: coupon.is_active.then(|| "on".to_owned()),
        }
    }

    #[must_use]
    pub const fn active(&self) -> bool {
        self.is_active.is_some()
    }

    /// Parse the raw fields, then check the terms as a whole.
    ///
    /// # Errors
    ///
    /// Returns the collected field errors.
    pub fn validate(&self) -> Result<CouponInput, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let description = errors.text("description", &self.description, MAX_DESCRIPTION_LENGTH, false);
        let discount_type: DiscountType = errors.choice("discount_type", &self.discount_type);
        let value = errors.money("value", &self.value, false);
        let min_order_amount = errors.optional_money("min_order_amount", &self.min_order_amount);
        let max_discount = errors.optional_money("max_discount", &self.max_discount);
        let usage_limit = errors.optional_int("usage_limit", &self.usage_limit, 1);
        let starts_at = errors.datetime("starts_at", &self.starts_at);
        let expires_at = errors.datetime("expires_at", &self.expires_at);

        let terms = CouponTerms {
            code: normalize_code(&self.code),
            discount_type,
            value,
            min_order_amount,
            max_discount,
            usage_limit,
            starts_at,
            expires_at,
        };

        // Field-level errors first; the combined rules would only repeat them.
        errors.into_result(())?;
        validate_coupon_terms(&terms)?;

        Ok(CouponInput {
            terms,
            description,
            is_active: self.active(),
        })
    }
}

pub struct DiscountTypeOption {
    pub value: &'static str,
    pub label: &'static str,
    pub selected: bool,
}

fn discount_type_options(selected: &str) -> Vec<DiscountTypeOption> {
    DiscountType::ALL
        .iter()
        .map(|t| DiscountTypeOption {
            value: t.as_str(),
            label: match t {
                DiscountType::Percentage => "Percentage",
                DiscountType::Fixed => "Fixed amount",
            },
            selected: t.as_str() == selected,
        })
        .collect()
}

/// One row of the coupon table.
pub struct CouponRowView {
    pub id: i32,
    pub code: String,
    pub summary: String,
    pub description: String,
    pub usage: String,
    pub expires_at: Option<String>,
    pub expired: bool,
    pub is_active: bool,
}

impl CouponRowView {
    fn new(coupon: &Coupon, now: DateTime<Utc>) -> Self {
        let usage = coupon.usage_limit.map_or_else(
            || coupon.times_used.to_string(),
            |limit| format!("{} / {limit}", coupon.times_used),
        );
        Self {
            id: coupon.id.as_i32(),
            code: coupon.code.clone(),
            summary: coupon.summary(),
            description: coupon.description.clone(),
            usage,
            expires_at: coupon.expires_at.as_ref().map(filters::short_datetime),
            expired: coupon.expires_at.is_some_and(|e| e <= now),
            is_active: coupon.is_active,
        }
    }
}

#[derive(Template, WebTemplate)]
#[template(path = "coupons/index.html")]
pub struct CouponsIndexTemplate {
    pub ctx: PageContext,
    pub coupons: Vec<CouponRowView>,
}

#[derive(Template, WebTemplate)]
#[template(path = "coupons/form.html")]
pub struct CouponFormTemplate {
    pub ctx: PageContext,
    pub coupon_id: Option<i32>,
    pub times_used: i32,
    pub discount_types: Vec<DiscountTypeOption>,
    pub form: CouponForm,
    pub errors: ValidationErrors,
}

impl CouponFormTemplate {
    fn new(
        ctx: PageContext,
        coupon_id: Option<i32>,
        times_used: i32,
        form: CouponForm,
        errors: ValidationErrors,
    ) -> Self {
        Self {
            ctx,
            coupon_id,
            times_used,
            discount_types: discount_type_options(&form.discount_type),
            form,
            errors,
        }
    }
}

/// GET /coupons
#[instrument(skip_all)]
pub async fn index(State(state): State<AppState>, ctx: PageContext) -> Result<CouponsIndexTemplate, AppError> {
    let now = Utc::now();
    let coupons = CouponRepository::new(state.pool()).list().await?;
    Ok(CouponsIndexTemplate {
        ctx,
        coupons: coupons.iter().map(|c| CouponRowView::new(c, now)).collect(),
    })
}

/// GET /coupons/new
pub async fn new_coupon(ctx: PageContext) -> CouponFormTemplate {
    let form = CouponForm {
        discount_type: DiscountType::Percentage.to_string(),
        is_active: Some("on".to_owned()),
        ..CouponForm::default()
    };
    CouponFormTemplate::new(ctx, None, 0, form, ValidationErrors::new())
}

/// POST /coupons
#[instrument(skip(state, session, ctx, admin, form), fields(admin_id = %admin.id))]
pub async fn create(
    State(state): State<AppState>,
    session: Session,
    RequireWriter(admin): RequireWriter,
    ctx: PageContext,
    Form(form): Form<CouponForm>,
) -> Result<Response, AppError> {
    let errors = match form.validate() {
        Ok(input) => match CouponRepository::new(state.pool()).create(&input).await {
            Ok(coupon) => {
                tracing::info!(coupon_id = %coupon.id, code = %coupon.code, "Coupon created");
                set_flash(&session, Flash::success(format!("Coupon {} created", coupon.code))).await?;
                return Ok(Redirect::to("/coupons").into_response());
            }
            Err(e) => conflict_on("code", e)?,
        },
        Err(errors) => errors,
    };
    let page = CouponFormTemplate::new(ctx, None, 0, form, errors);
    Ok((StatusCode::UNPROCESSABLE_ENTITY, page).into_response())
}

/// GET /coupons/{id}
#[instrument(skip(state, ctx))]
pub async fn edit(
    State(state): State<AppState>,
    ctx: PageContext,
    Path(id): Path<i32>,
) -> Result<CouponFormTemplate, AppError> {
    let coupon = CouponRepository::new(state.pool())
        .get(CouponId::new(id))
        .await?
        .ok_or_else(|| AppError::NotFound("Coupon".to_owned()))?;
    let form = CouponForm::from_coupon(&coupon);
    Ok(CouponFormTemplate::new(
        ctx,
        Some(id),
        coupon.times_used,
        form,
        ValidationErrors::new(),
    ))
}

/// POST /coupons/{id}
///
/// The usage counter is kept; only the terms change.
#[instrument(skip(state, session, ctx, admin, form), fields(admin_id = %admin.id))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    RequireWriter(admin): RequireWriter,
    ctx: PageContext,
    Path(id): Path<i32>,
    Form(form): Form<CouponForm>,
) -> Result<Response, AppError> {
    let repo = CouponRepository::new(state.pool());
    let coupon_id = CouponId::new(id);
    let errors = match form.validate() {
        Ok(input) => match repo.update(coupon_id, &input).await {
            Ok(coupon) => {
                set_flash(&session, Flash::success(format!("Coupon {} saved", coupon.code))).await?;
                return Ok(Redirect::to("/coupons").into_response());
            }
            Err(e) => conflict_on("code", e)?,
        },
        Err(errors) => errors,
    };
    let times_used = repo.get(coupon_id).await?.map_or(0, |c| c.times_used);
    let page = CouponFormTemplate::new(ctx, Some(id), times_used, form, errors);
    Ok((StatusCode::UNPROCESSABLE_ENTITY, page).into_response())
}

/// POST /coupons/{id}/toggle
#[instrument(skip(state, session, admin), fields(admin_id = %admin.id))]
pub async fn toggle(
    State(state): State<AppState>,
    session: Session,
    RequireWriter(admin): RequireWriter,
    Path(id): Path<i32>,
) -> Result<Redirect, AppError> {
    let active = CouponRepository::new(state.pool())
        .toggle_active(CouponId::new(id))
        .await?;
    let message = if active { "Coupon activated" } else { "Coupon deactivated" };
    set_flash(&session, Flash::success(message)).await?;
    Ok(Redirect::to("/coupons"))
}

/// POST /coupons/{id}/delete
#[instrument(skip(state, session, admin), fields(admin_id = %admin.id))]
pub async fn delete(
    State(state): State<AppState>,
    session: Session,
    RequireWriter(admin): RequireWriter,
    Path(id): Path<i32>,
) -> Result<Redirect, AppError> {
    CouponRepository::new(state.pool()).delete(CouponId::new(id)).await?;
    tracing::info!(coupon_id = id, "Coupon deleted");
    set_flash(&session, Flash::success("Coupon deleted")).await?;
    Ok(Redirect::to("/coupons"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn form() -> CouponForm {
        CouponForm {
            code: " zomer10 ".to_owned(),
            discount_type: "percentage".to_owned(),
            value: "10".to_owned(),
            is_active: Some("on".to_owned()),
            ..CouponForm::default()
        }
    }

    #[test]
    fn test_valid_coupon_is_normalised() {
        let input = form().validate().unwrap();
        assert_eq!(input.terms.code, "ZOMER10");
        assert_eq!(input.terms.discount_type, DiscountType::Percentage);
        assert_eq!(input.terms.usage_limit, None);
        assert!(input.is_active);
    }

    #[test]
    fn test_field_errors() {
        let bad = CouponForm {
            discount_type: "bogo".to_owned(),
            usage_limit: "0".to_owned(),
            starts_at: "tomorrow".to_owned(),
            ..form()
        };
        let errors = bad.validate().unwrap_err();
        assert!(errors.get("discount_type").is_some());
        assert!(errors.get("usage_limit").is_some());
        assert!(errors.get("starts_at").is_some());
    }

    #[test]
    fn test_term_rules() {
        let too_much = CouponForm {
            value: "150".to_owned(),
            ..form()
        };
        assert!(too_much.validate().unwrap_err().get("value").is_some());

        let backwards = CouponForm {
            starts_at: "2025-06-01T09:00".to_owned(),
            expires_at: "2025-05-01T09:00".to_owned(),
            ..form()
        };
        assert!(backwards.validate().unwrap_err().get("expires_at").is_some());
    }

    #[test]
    fn test_datetime_round_trip_for_inputs() {
        let form = form();
        let input = CouponForm {
            starts_at: "2025-06-01T09:30".to_owned(),
            ..form
        }
        .validate()
        .unwrap();
        assert_eq!(input_datetime(input.terms.starts_at), "2025-06-01T09:30");
    }

    #[test]
    fn test_discount_type_options() {
        let options = discount_type_options("fixed");
        assert_eq!(options.len(), 2);
        assert!(options.iter().any(|o| o.value == "fixed" && o.selected));
        assert!(options.iter().any(|o| o.value == "percentage" && !o.selected));
    }
}
