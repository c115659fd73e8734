//! Combo management: bundle details and component products.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use rust_decimal::Decimal;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use jouwwinkel_core::models::Combo;
use jouwwinkel_core::validation::ValidationErrors;
use jouwwinkel_core::{ComboId, Price, ProductId};

use crate::db::{ComboInput, ComboItemRow, ComboRepository, ComboRow, ProductRepository, RepositoryError};
use crate::error::AppError;
use crate::filters;
use crate::middleware::RequireWriter;
use crate::models::Flash;
use crate::routes::context::{PageContext, set_flash};
use crate::routes::forms::{capitalise, conflict_on, image_url};
use crate::state::AppState;

const MAX_NAME_LENGTH: usize = 200;
const MAX_DESCRIPTION_LENGTH: usize = 5_000;
const MAX_ITEM_QUANTITY: i32 = 99;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ComboForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub price: String,
    pub is_active: Option<String>,
}

impl ComboForm {
    fn from_combo(combo: &Combo) -> Self {
        Self {
            name: combo.name.clone(),
            slug: combo.slug.clone(),
            description: combo.description.clone(),
            image_url: combo.image_url.clone().unwrap_or_default(),
            price: combo.price.to_string(),
            is_active: combo.is_active.then(|| "on".to_owned()),
        }
    }

    #[must_use]
    pub const fn active(&self) -> bool {
        self.is_active.is_some()
    }

    /// # Errors
    ///
    /// Returns the collected field errors.
    pub fn validate(&self) -> Result<ComboInput, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let name = errors.text("name", &self.name, MAX_NAME_LENGTH, true);
        let slug = errors.slug("slug", &self.slug, &name);
        let description = errors.text("description", &self.description, MAX_DESCRIPTION_LENGTH, false);
        let image_url = image_url(&mut errors, "image_url", &self.image_url);
        let price = errors.money("price", &self.price, false);

        errors.into_result(ComboInput {
            name,
            slug,
            description,
            image_url,
            price,
            is_active: self.active(),
        })
    }
}

/// One row of the combo table.
pub struct ComboRowView {
    pub id: i32,
    pub name: String,
    pub price: String,
    pub regular_total: String,
    pub item_count: i64,
    pub is_active: bool,
}

impl From<&ComboRow> for ComboRowView {
    fn from(row: &ComboRow) -> Self {
        Self {
            id: row.combo.id.as_i32(),
            name: row.combo.name.clone(),
            price: Price::eur(row.combo.price).to_string(),
            regular_total: Price::eur(row.regular_total).to_string(),
            item_count: row.item_count,
            is_active: row.combo.is_active,
        }
    }
}

pub struct ComboItemView {
    pub product_id: i32,
    pub product_name: String,
    pub quantity: i32,
    pub price: String,
    pub stock: i32,
}

impl From<&ComboItemRow> for ComboItemView {
    fn from(item: &ComboItemRow) -> Self {
        Self {
            product_id: item.product_id.as_i32(),
            product_name: item.product_name.clone(),
            quantity: item.quantity,
            price: Price::eur(item.price).to_string(),
            stock: item.stock,
        }
    }
}

pub struct ProductChoice {
    pub id: i32,
    pub name: String,
}

#[derive(Template, WebTemplate)]
#[template(path = "combos/index.html")]
pub struct CombosIndexTemplate {
    pub ctx: PageContext,
    pub combos: Vec<ComboRowView>,
}

#[derive(Template, WebTemplate)]
#[template(path = "combos/form.html")]
pub struct ComboFormTemplate {
    pub ctx: PageContext,
    /// `None` while creating.
    pub combo_id: Option<i32>,
    pub form: ComboForm,
    pub errors: ValidationErrors,
    pub items: Vec<ComboItemView>,
    /// Sum of the component prices at one combo.
    pub regular_total: String,
    pub products: Vec<ProductChoice>,
    pub max_quantity: i32,
}

impl ComboFormTemplate {
    fn new(ctx: PageContext, combo_id: Option<i32>, form: ComboForm, errors: ValidationErrors) -> Self {
        Self {
            ctx,
            combo_id,
            form,
            errors,
            items: Vec::new(),
            regular_total: Price::eur(Decimal::ZERO).to_string(),
            products: Vec::new(),
            max_quantity: MAX_ITEM_QUANTITY,
        }
    }
}

/// The edit page with the component table and the product picker.
async fn edit_page(
    state: &AppState,
    ctx: PageContext,
    id: ComboId,
    form: ComboForm,
    errors: ValidationErrors,
) -> Result<ComboFormTemplate, AppError> {
    let pool = state.pool();
    let items = ComboRepository::new(pool).items(id).await?;
    let products = ProductRepository::new(pool).all().await?;

    let regular_total: Decimal = items
        .iter()
        .map(|item| item.price * Decimal::from(item.quantity))
        .sum();

    Ok(ComboFormTemplate {
        items: items.iter().map(ComboItemView::from).collect(),
        regular_total: Price::eur(regular_total).to_string(),
        products: products
            .iter()
            .filter(|p| p.is_active)
            .map(|p| ProductChoice {
                id: p.id.as_i32(),
                name: p.name.clone(),
            })
            .collect(),
        ..ComboFormTemplate::new(ctx, Some(id.as_i32()), form, errors)
    })
}

/// GET /combos
#[instrument(skip_all)]
pub async fn index(State(state): State<AppState>, ctx: PageContext) -> Result<CombosIndexTemplate, AppError> {
    let rows = ComboRepository::new(state.pool()).list().await?;
    Ok(CombosIndexTemplate {
        ctx,
        combos: rows.iter().map(ComboRowView::from).collect(),
    })
}

/// GET /combos/new
pub async fn new_combo(ctx: PageContext) -> ComboFormTemplate {
    let form = ComboForm {
        is_active: Some("on".to_owned()),
        ..ComboForm::default()
    };
    ComboFormTemplate::new(ctx, None, form, ValidationErrors::new())
}

/// Create a combo; components are added on its edit page.
///
/// POST /combos
#[instrument(skip(state, session, ctx, admin, form), fields(admin_id = %admin.id))]
pub async fn create(
    State(state): State<AppState>,
    session: Session,
    RequireWriter(admin): RequireWriter,
    ctx: PageContext,
    Form(form): Form<ComboForm>,
) -> Result<Response, AppError> {
    let errors = match form.validate() {
        Ok(input) => match ComboRepository::new(state.pool()).create(&input).await {
            Ok(combo) => {
                tracing::info!(combo_id = %combo.id, "Combo created");
                set_flash(
                    &session,
                    Flash::success(format!("{} created; now add its products", combo.name)),
                )
                .await?;
                return Ok(Redirect::to(&format!("/combos/{}", combo.id)).into_response());
            }
            Err(e) => conflict_on("slug", e)?,
        },
        Err(errors) => errors,
    };
    let page = ComboFormTemplate::new(ctx, None, form, errors);
    Ok((StatusCode::UNPROCESSABLE_ENTITY, page).into_response())
}

/// GET /combos/{id}
#[instrument(skip(state, ctx))]
pub async fn edit(
    State(state): State<AppState>,
    ctx: PageContext,
    Path(id): Path<i32>,
) -> Result<ComboFormTemplate, AppError> {
    let combo = ComboRepository::new(state.pool())
        .get(ComboId::new(id))
        .await?
        .ok_or_else(|| AppError::NotFound("Combo".to_owned()))?;
    let form = ComboForm::from_combo(&combo);
    edit_page(&state, ctx, combo.id, form, ValidationErrors::new()).await
}

/// POST /combos/{id}
#[instrument(skip(state, session, ctx, admin, form), fields(admin_id = %admin.id))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    RequireWriter(admin): RequireWriter,
    ctx: PageContext,
    Path(id): Path<i32>,
    Form(form): Form<ComboForm>,
) -> Result<Response, AppError> {
    let combo_id = ComboId::new(id);
    let errors = match form.validate() {
        Ok(input) => match ComboRepository::new(state.pool()).update(combo_id, &input).await {
            Ok(_) => {
                set_flash(&session, Flash::success("Combo saved")).await?;
                return Ok(Redirect::to(&format!("/combos/{id}")).into_response());
            }
            Err(e) => conflict_on("slug", e)?,
        },
        Err(errors) => errors,
    };
    let page = edit_page(&state, ctx, combo_id, form, errors).await?;
    Ok((StatusCode::UNPROCESSABLE_ENTITY, page).into_response())
}

/// POST /combos/{id}/delete
#[instrument(skip(state, session, admin), fields(admin_id = %admin.id))]
pub async fn delete(
    State(state): State<AppState>,
    session: Session,
    RequireWriter(admin): RequireWriter,
    Path(id): Path<i32>,
) -> Result<Redirect, AppError> {
    ComboRepository::new(state.pool()).delete(ComboId::new(id)).await?;
    tracing::info!(combo_id = id, "Combo deleted");
    set_flash(&session, Flash::success("Combo deleted")).await?;
    Ok(Redirect::to("/combos"))
}

#[derive(Debug, Deserialize)]
pub struct ItemForm {
    pub product_id: i32,
    #[serde(default)]
    pub quantity: String,
}

impl ItemForm {
    /// # Errors
    ///
    /// Returns the quantity error.
    pub fn quantity(&self) -> Result<i32, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let quantity = errors.optional_int("quantity", &self.quantity, 1).unwrap_or(1);
        if quantity > MAX_ITEM_QUANTITY {
            errors.add("quantity", format!("At most {MAX_ITEM_QUANTITY} of one product"));
        }
        errors.into_result(quantity)
    }
}

/// Add a product to the combo, or change its quantity.
///
/// POST /combos/{id}/items
#[instrument(skip(state, session, admin), fields(admin_id = %admin.id))]
pub async fn set_item(
    State(state): State<AppState>,
    session: Session,
    RequireWriter(admin): RequireWriter,
    Path(id): Path<i32>,
    Form(form): Form<ItemForm>,
) -> Result<Redirect, AppError> {
    let flash = match form.quantity() {
        Ok(quantity) => match ComboRepository::new(state.pool())
            .set_item(ComboId::new(id), ProductId::new(form.product_id), quantity)
            .await
        {
            Ok(()) => Flash::success("Combo products updated"),
            Err(RepositoryError::Conflict(message)) => Flash::error(capitalise(&message)),
            Err(e) => return Err(e.into()),
        },
        Err(errors) => Flash::error(errors.messages().join(" ")),
    };
    set_flash(&session, flash).await?;
    Ok(Redirect::to(&format!("/combos/{id}")))
}

/// POST /combos/{id}/items/{product_id}/delete
#[instrument(skip(state, session, admin), fields(admin_id = %admin.id))]
pub async fn remove_item(
    State(state): State<AppState>,
    session: Session,
    RequireWriter(admin): RequireWriter,
    Path((id, product_id)): Path<(i32, i32)>,
) -> Result<Redirect, AppError> {
    ComboRepository::new(state.pool())
        .remove_item(ComboId::new(id), ProductId::new(product_id))
        .await?;
    set_flash(&session, Flash::success("Product removed from the combo")).await?;
    Ok(Redirect::to(&format!("/combos/{id}")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_combo_form() {
        let form = ComboForm {
            name: "Ontbijtset".to_owned(),
            price: "39.00".to_owned(),
            ..ComboForm::default()
        };
        let input = form.validate().unwrap();
        assert_eq!(input.slug, "ontbijtset");
        assert_eq!(input.price, Decimal::new(39, 0));
        assert!(!input.is_active);

        let free = ComboForm {
            price: "0".to_owned(),
            ..form
        };
        assert!(free.validate().unwrap_err().get("price").is_some());
    }

    #[test]
    fn test_item_quantity() {
        let item = |quantity: &str| ItemForm {
            product_id: 1,
            quantity: quantity.to_owned(),
        };
        assert_eq!(item("").quantity().unwrap(), 1);
        assert_eq!(item("3").quantity().unwrap(), 3);
        assert!(item("0").quantity().is_err());
        assert!(item("100").quantity().is_err());
    }
}
