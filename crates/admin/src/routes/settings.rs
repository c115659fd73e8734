//! Store settings: texts, hero block, contact details and shipping rule.
//!
//! Everything here lives in one `UiConfig` document that the storefront
//! reads (and caches) on every page.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use jouwwinkel_core::models::UiConfig;
use jouwwinkel_core::validation::ValidationErrors;

use crate::db::SettingsRepository;
use crate::error::AppError;
use crate::filters;
use crate::middleware::RequireWriter;
use crate::models::Flash;
use crate::routes::context::{PageContext, set_flash};
use crate::routes::forms::image_url;
use crate::state::AppState;

const MAX_SHORT_TEXT: usize = 120;
const MAX_LONG_TEXT: usize = 300;
const MAX_MARKDOWN: usize = 20_000;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SettingsForm {
    pub store_name: String,
    pub tagline: String,
    pub announcement: String,
    pub hero_title: String,
    pub hero_subtitle: String,
    pub hero_image_url: String,
    pub hero_cta_label: String,
    pub hero_cta_url: String,
    pub about_markdown: String,
    pub contact_email: String,
    pub contact_phone: String,
    pub shipping_fee: String,
    pub free_shipping_threshold: String,
    pub low_stock_threshold: String,
}

impl From<&UiConfig> for SettingsForm {
    fn from(config: &UiConfig) -> Self {
        Self {
            store_name: config.store_name.clone(),
            tagline: config.tagline.clone(),
            announcement: config.announcement.clone(),
            hero_title: config.hero_title.clone(),
            hero_subtitle: config.hero_subtitle.clone(),
            hero_image_url: config.hero_image_url.clone().unwrap_or_default(),
            hero_cta_label: config.hero_cta_label.clone(),
            hero_cta_url: config.hero_cta_url.clone(),
            about_markdown: config.about_markdown.clone(),
            contact_email: config.contact_email.clone(),
            contact_phone: config.contact_phone.clone(),
            shipping_fee: config.shipping_fee.to_string(),
            free_shipping_threshold: config
                .free_shipping_threshold
                .map(|t| t.to_string())
                .unwrap_or_default(),
            low_stock_threshold: config.low_stock_threshold.to_string(),
        }
    }
}

impl SettingsForm {
    /// # Errors
    ///
    /// Returns the collected field errors.
    pub fn validate(&self) -> Result<UiConfig, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let hero_cta_url = errors.text("hero_cta_url", &self.hero_cta_url, MAX_LONG_TEXT, true);
        if !hero_cta_url.is_empty() && !hero_cta_url.starts_with('/') && !hero_cta_url.starts_with("https://") {
            errors.add("hero_cta_url", "Use a path like /products or a full https:// address");
        }
        let contact_email = errors
            .email("contact_email", &self.contact_email)
            .map(|e| e.to_string())
            .unwrap_or_default();

        let config = UiConfig {
            store_name: errors.text("store_name", &self.store_name, MAX_SHORT_TEXT, true),
            tagline: errors.text("tagline", &self.tagline, MAX_LONG_TEXT, false),
            announcement: errors.text("announcement", &self.announcement, MAX_LONG_TEXT, false),
            hero_title: errors.text("hero_title", &self.hero_title, MAX_SHORT_TEXT, true),
            hero_subtitle: errors.text("hero_subtitle", &self.hero_subtitle, MAX_LONG_TEXT, false),
            hero_image_url: image_url(&mut errors, "hero_image_url", &self.hero_image_url),
            hero_cta_label: errors.text("hero_cta_label", &self.hero_cta_label, MAX_SHORT_TEXT, true),
            hero_cta_url,
            about_markdown: errors.text("about_markdown", &self.about_markdown, MAX_MARKDOWN, false),
            contact_email,
            contact_phone: errors.text("contact_phone", &self.contact_phone, MAX_SHORT_TEXT, false),
            shipping_fee: errors.money("shipping_fee", &self.shipping_fee, true),
            free_shipping_threshold: errors
                .optional_money("free_shipping_threshold", &self.free_shipping_threshold),
            low_stock_threshold: errors
                .optional_int("low_stock_threshold", &self.low_stock_threshold, 0)
                .unwrap_or(0),
        };
        errors.into_result(config)
    }
}

#[derive(Template, WebTemplate)]
#[template(path = "settings.html")]
pub struct SettingsTemplate {
    pub ctx: PageContext,
    pub form: SettingsForm,
    pub errors: ValidationErrors,
}

/// GET /settings
#[instrument(skip_all)]
pub async fn show(State(state): State<AppState>, ctx: PageContext) -> Result<SettingsTemplate, AppError> {
    let config = SettingsRepository::new(state.pool()).load().await?;
    Ok(SettingsTemplate {
        ctx,
        form: SettingsForm::from(&config),
        errors: ValidationErrors::new(),
    })
}

/// POST /settings
#[instrument(skip(state, session, ctx, admin, form), fields(admin_id = %admin.id))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    RequireWriter(admin): RequireWriter,
    ctx: PageContext,
    Form(form): Form<SettingsForm>,
) -> Result<Response, AppError> {
    match form.validate() {
        Ok(config) => {
            SettingsRepository::new(state.pool()).save(&config).await?;
            tracing::info!("Store settings saved");
            set_flash(
                &session,
                Flash::success("Settings saved; the shop shows them within a minute"),
            )
            .await?;
            Ok(Redirect::to("/settings").into_response())
        }
        Err(errors) => {
            let page = SettingsTemplate { ctx, form, errors };
            Ok((StatusCode::UNPROCESSABLE_ENTITY, page).into_response())
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    #[test]
    fn test_defaults_round_trip_through_form() {
        let defaults = UiConfig::default();
        let parsed = SettingsForm::from(&defaults).validate().unwrap();
        assert_eq!(parsed, defaults);
    }

    #[test]
    fn test_shipping_rule_fields() {
        let form = SettingsForm {
            shipping_fee: "3,95".to_owned(),
            free_shipping_threshold: String::new(),
            low_stock_threshold: "-1".to_owned(),
            ..SettingsForm::from(&UiConfig::default())
        };
        let errors = form.validate().unwrap_err();
        assert!(errors.get("low_stock_threshold").is_some());
        assert!(errors.get("shipping_fee").is_none());

        let form = SettingsForm {
            low_stock_threshold: "3".to_owned(),
            ..form
        };
        let config = form.validate().unwrap();
        assert_eq!(config.shipping_fee, Decimal::new(395, 2));
        assert_eq!(config.free_shipping_threshold, None);
        assert_eq!(config.low_stock_threshold, 3);
    }

    #[test]
    fn test_cta_must_be_local_or_https() {
        let form = SettingsForm {
            hero_cta_url: "javascript:alert(1)".to_owned(),
            ..SettingsForm::from(&UiConfig::default())
        };
        assert!(form.validate().unwrap_err().get("hero_cta_url").is_some());
    }
}
