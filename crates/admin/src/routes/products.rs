//! Product management: list, edit, images, options and variants.

use std::collections::HashMap;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use jouwwinkel_core::models::{Product, Variant, VariantOption};
use jouwwinkel_core::validation::ValidationErrors;
use jouwwinkel_core::variants::{MAX_COMBINATIONS, normalize_values};
use jouwwinkel_core::{CategoryId, Price, ProductId, VariantOptionId};

use crate::db::{
    CategoryRepository, CategoryRow, ProductFilter, ProductInput, ProductRepository, ProductRow,
    RepositoryError, VariantRepository, VariantUpdate,
};
use crate::error::AppError;
use crate::filters;
use crate::middleware::RequireWriter;
use crate::models::Flash;
use crate::routes::context::{PageContext, Pager, set_flash};
use crate::routes::forms::capitalise;
use crate::routes::media::{read_upload, release_image};
use crate::services::inventory::{self, InventoryError};
use crate::state::AppState;

const MAX_NAME_LENGTH: usize = 200;
const MAX_DESCRIPTION_LENGTH: usize = 10_000;
const MAX_OPTION_NAME_LENGTH: usize = 60;
const MAX_SKU_LENGTH: usize = 64;

/// One row of the product table.
pub struct ProductRowView {
    pub id: i32,
    pub name: String,
    pub slug: String,
    pub category: String,
    pub price: String,
    pub available: i64,
    pub variant_count: i64,
    pub is_active: bool,
    pub is_featured: bool,
}

impl From<&ProductRow> for ProductRowView {
    fn from(row: &ProductRow) -> Self {
        Self {
            id: row.id.as_i32(),
            name: row.name.clone(),
            slug: row.slug.clone(),
            category: row.category_name.clone().unwrap_or_default(),
            price: Price::eur(row.price).to_string(),
            available: row.available(),
            variant_count: row.variant_count,
            is_active: row.is_active,
            is_featured: row.is_featured,
        }
    }
}

/// Category choice in a select box.
pub struct CategoryOption {
    pub id: i32,
    pub name: String,
    pub selected: bool,
}

fn category_options(rows: &[CategoryRow], selected: &str) -> Vec<CategoryOption> {
    rows.iter()
        .map(|row| CategoryOption {
            id: row.category.id.as_i32(),
            name: row.category.name.clone(),
            selected: row.category.id.as_i32().to_string() == selected,
        })
        .collect()
}

/// The product form as typed, kept for re-rendering after errors.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductForm {
    #[serde(default)]
    pub category_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub price: String,
    #[serde(default)]
    pub compare_at_price: String,
    #[serde(default)]
    pub stock: String,
    pub is_featured: Option<String>,
    pub is_active: Option<String>,
}

impl ProductForm {
    fn from_product(product: &Product) -> Self {
        Self {
            category_id: product
                .category_id
                .map(|id| id.as_i32().to_string())
                .unwrap_or_default(),
            name: product.name.clone(),
            slug: product.slug.clone(),
            description: product.description.clone(),
            price: product.price.to_string(),
            compare_at_price: product
                .compare_at_price
                .map(|p| p.to_string())
                .unwrap_or_default(),
            stock: product.stock.to_string(),
            is_featured: product.is_featured.then(|| "on".to_owned()),
            is_active: product.is_active.then(|| "on".to_owned()),
        }
    }

    fn new_product() -> Self {
        Self {
            stock: "0".to_owned(),
            is_active: Some("on".to_owned()),
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn featured(&self) -> bool {
        self.is_featured.is_some()
    }

    #[must_use]
    pub const fn active(&self) -> bool {
        self.is_active.is_some()
    }

    /// Check every field and build the repository input.
    ///
    /// # Errors
    ///
    /// Returns the collected field errors.
    pub fn validate(&self) -> Result<ProductInput, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let name = errors.text("name", &self.name, MAX_NAME_LENGTH, true);
        let slug = errors.slug("slug", &self.slug, &name);
        let description = errors.text("description", &self.description, MAX_DESCRIPTION_LENGTH, false);
        let price = errors.money("price", &self.price, false);
        let compare_at_price = errors.optional_money("compare_at_price", &self.compare_at_price);
        if compare_at_price.is_some_and(|was| was <= price) {
            errors.add("compare_at_price", "Must be higher than the price");
        }
        let stock = errors.stock("stock", &self.stock);
        let category_id = errors
            .optional_int("category_id", &self.category_id, 1)
            .map(CategoryId::new);

        errors.into_result(ProductInput {
            category_id,
            name,
            slug,
            description,
            price,
            compare_at_price,
            stock,
            is_featured: self.featured(),
            is_active: self.active(),
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct ProductsQuery {
    #[serde(default)]
    pub q: String,
    #[serde(default)]
    pub category: String,
    pub page: Option<u32>,
}

#[derive(Template, WebTemplate)]
#[template(path = "products/index.html")]
pub struct ProductsIndexTemplate {
    pub ctx: PageContext,
    pub products: Vec<ProductRowView>,
    pub categories: Vec<CategoryOption>,
    pub search: String,
    pub pager: Pager,
}

#[derive(Template, WebTemplate)]
#[template(path = "products/form.html")]
pub struct ProductFormTemplate {
    pub ctx: PageContext,
    /// `None` while creating.
    pub product_id: Option<i32>,
    pub form: ProductForm,
    pub errors: ValidationErrors,
    pub categories: Vec<CategoryOption>,
}

/// Variant row in the bulk editor.
pub struct VariantView {
    pub id: i32,
    pub label: String,
    pub sku: String,
    pub price_override: String,
    pub stock: i32,
}

impl From<&Variant> for VariantView {
    fn from(variant: &Variant) -> Self {
        Self {
            id: variant.id.as_i32(),
            label: variant.label(),
            sku: variant.sku.clone().unwrap_or_default(),
            price_override: variant.price_override.map(|p| p.to_string()).unwrap_or_default(),
            stock: variant.stock,
        }
    }
}

pub struct OptionView {
    pub id: i32,
    pub name: String,
    pub values: String,
}

impl From<&VariantOption> for OptionView {
    fn from(option: &VariantOption) -> Self {
        Self {
            id: option.id.as_i32(),
            name: option.name.clone(),
            values: option.values.join(", "),
        }
    }
}

#[derive(Template, WebTemplate)]
#[template(path = "products/edit.html")]
pub struct ProductEditTemplate {
    pub ctx: PageContext,
    pub product_id: i32,
    pub slug: String,
    pub form: ProductForm,
    pub errors: ValidationErrors,
    pub categories: Vec<CategoryOption>,
    pub images: Vec<String>,
    pub options: Vec<OptionView>,
    pub variants: Vec<VariantView>,
    pub max_combinations: usize,
    pub max_upload_mb: usize,
}

/// Product list page handler.
///
/// GET /products
#[instrument(skip(state, ctx))]
pub async fn index(
    State(state): State<AppState>,
    ctx: PageContext,
    Query(query): Query<ProductsQuery>,
) -> Result<ProductsIndexTemplate, AppError> {
    let pool = state.pool();
    let page = query.page.unwrap_or(1);
    let search = query.q.trim().to_owned();
    let category_id = query.category.parse::<i32>().ok().map(CategoryId::new);

    let filter = ProductFilter {
        search: (!search.is_empty()).then(|| search.clone()),
        category_id,
        page,
    };
    let (rows, total) = ProductRepository::new(pool).list(&filter).await?;
    let categories = CategoryRepository::new(pool).list().await?;

    Ok(ProductsIndexTemplate {
        ctx,
        products: rows.iter().map(ProductRowView::from).collect(),
        categories: category_options(&categories, &query.category),
        pager: Pager::new(page, total, &[("q", &search), ("category", &query.category)]),
        search,
    })
}

/// Empty product form.
///
/// GET /products/new
pub async fn new_product(
    State(state): State<AppState>,
    ctx: PageContext,
) -> Result<ProductFormTemplate, AppError> {
    let categories = CategoryRepository::new(state.pool()).list().await?;
    Ok(ProductFormTemplate {
        ctx,
        product_id: None,
        form: ProductForm::new_product(),
        errors: ValidationErrors::new(),
        categories: category_options(&categories, ""),
    })
}

/// Map repository refusals on save to form errors.
fn save_errors(err: RepositoryError) -> Result<ValidationErrors, AppError> {
    let mut errors = ValidationErrors::new();
    match err {
        RepositoryError::Conflict(message) => errors.add("slug", capitalise(&message)),
        RepositoryError::NotFound => errors.add("category_id", "Choose an existing category"),
        other => return Err(other.into()),
    }
    Ok(errors)
}

async fn new_form_page(
    state: &AppState,
    ctx: PageContext,
    form: ProductForm,
    errors: ValidationErrors,
) -> Result<Response, AppError> {
    let categories = CategoryRepository::new(state.pool()).list().await?;
    let page = ProductFormTemplate {
        ctx,
        product_id: None,
        categories: category_options(&categories, &form.category_id),
        form,
        errors,
    };
    Ok((StatusCode::UNPROCESSABLE_ENTITY, page).into_response())
}

/// Create a product, then continue on its edit page for images and variants.
///
/// POST /products
#[instrument(skip(state, session, ctx, admin, form), fields(admin_id = %admin.id))]
pub async fn create(
    State(state): State<AppState>,
    session: Session,
    RequireWriter(admin): RequireWriter,
    ctx: PageContext,
    Form(form): Form<ProductForm>,
) -> Result<Response, AppError> {
    let input = match form.validate() {
        Ok(input) => input,
        Err(errors) => return new_form_page(&state, ctx, form, errors).await,
    };

    match ProductRepository::new(state.pool()).create(&input).await {
        Ok(product) => {
            tracing::info!(product_id = %product.id, "Product created");
            set_flash(&session, Flash::success(format!("{} created", product.name))).await?;
            Ok(Redirect::to(&format!("/products/{}", product.id)).into_response())
        }
        Err(e) => {
            let errors = save_errors(e)?;
            new_form_page(&state, ctx, form, errors).await
        }
    }
}

/// Everything on the edit page except the form itself.
async fn edit_page(
    state: &AppState,
    ctx: PageContext,
    product: &Product,
    form: ProductForm,
    errors: ValidationErrors,
) -> Result<ProductEditTemplate, AppError> {
    let pool = state.pool();
    let variant_repo = VariantRepository::new(pool);
    let category_repo = CategoryRepository::new(pool);
    let (categories, options, variants) = tokio::try_join!(
        category_repo.list(),
        variant_repo.options(product.id),
        variant_repo.variants(product.id),
    )?;

    Ok(ProductEditTemplate {
        ctx,
        product_id: product.id.as_i32(),
        slug: product.slug.clone(),
        categories: category_options(&categories, &form.category_id),
        form,
        errors,
        images: product.image_urls.clone(),
        options: options.iter().map(OptionView::from).collect(),
        variants: variants.iter().map(VariantView::from).collect(),
        max_combinations: MAX_COMBINATIONS,
        max_upload_mb: state.media().max_bytes() / (1024 * 1024),
    })
}

async fn load_product(state: &AppState, id: i32) -> Result<Product, AppError> {
    ProductRepository::new(state.pool())
        .get(ProductId::new(id))
        .await?
        .ok_or_else(|| AppError::NotFound("Product".to_owned()))
}

/// Product edit page: details, images, options and variants.
///
/// GET /products/{id}
#[instrument(skip(state, ctx))]
pub async fn edit(
    State(state): State<AppState>,
    ctx: PageContext,
    Path(id): Path<i32>,
) -> Result<ProductEditTemplate, AppError> {
    let product = load_product(&state, id).await?;
    let form = ProductForm::from_product(&product);
    edit_page(&state, ctx, &product, form, ValidationErrors::new()).await
}

/// Save the product details.
///
/// POST /products/{id}
#[instrument(skip(state, session, ctx, admin, form), fields(admin_id = %admin.id))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    RequireWriter(admin): RequireWriter,
    ctx: PageContext,
    Path(id): Path<i32>,
    Form(form): Form<ProductForm>,
) -> Result<Response, AppError> {
    let product = load_product(&state, id).await?;

    let errors = match form.validate() {
        Ok(input) => match ProductRepository::new(state.pool()).update(product.id, &input).await {
            Ok(saved) => {
                tracing::info!(product_id = %saved.id, "Product updated");
                set_flash(&session, Flash::success("Product saved")).await?;
                return Ok(Redirect::to(&format!("/products/{id}")).into_response());
            }
            Err(e) => save_errors(e)?,
        },
        Err(errors) => errors,
    };

    let page = edit_page(&state, ctx, &product, form, errors).await?;
    Ok((StatusCode::UNPROCESSABLE_ENTITY, page).into_response())
}

/// Delete a product that was never ordered; its images go with it.
///
/// POST /products/{id}/delete
#[instrument(skip(state, session, admin), fields(admin_id = %admin.id))]
pub async fn delete(
    State(state): State<AppState>,
    session: Session,
    RequireWriter(admin): RequireWriter,
    Path(id): Path<i32>,
) -> Result<Redirect, AppError> {
    let product = load_product(&state, id).await?;

    match ProductRepository::new(state.pool()).delete(product.id).await {
        Ok(()) => {
            for url in &product.image_urls {
                release_image(&state, url).await?;
            }
            tracing::info!(product_id = %product.id, "Product deleted");
            set_flash(&session, Flash::success(format!("{} deleted", product.name))).await?;
            Ok(Redirect::to("/products"))
        }
        Err(RepositoryError::Conflict(message)) => {
            set_flash(&session, Flash::error(capitalise(&message))).await?;
            Ok(Redirect::to(&format!("/products/{id}")))
        }
        Err(e) => Err(e.into()),
    }
}

/// Upload an image and attach it to the product.
///
/// POST /products/{id}/images
#[instrument(skip(state, session, admin, multipart), fields(admin_id = %admin.id))]
pub async fn upload_image(
    State(state): State<AppState>,
    session: Session,
    RequireWriter(admin): RequireWriter,
    Path(id): Path<i32>,
    mut multipart: Multipart,
) -> Result<Redirect, AppError> {
    let product = load_product(&state, id).await?;
    let bytes = read_upload(&mut multipart).await?;

    let flash = match state.media().save(&bytes).await {
        Ok(url) => {
            ProductRepository::new(state.pool())
                .add_image(product.id, &url)
                .await?;
            Flash::success("Image added")
        }
        Err(e @ crate::services::MediaError::Io(_)) => return Err(e.into()),
        Err(e) => Flash::error(capitalise(&e.to_string())),
    };
    set_flash(&session, flash).await?;
    Ok(Redirect::to(&format!("/products/{id}")))
}

#[derive(Debug, Deserialize)]
pub struct ImageForm {
    pub url: String,
}

/// Detach an image; the file is removed when nothing else shows it.
///
/// POST /products/{id}/images/remove
#[instrument(skip(state, session, admin), fields(admin_id = %admin.id))]
pub async fn remove_image(
    State(state): State<AppState>,
    session: Session,
    RequireWriter(admin): RequireWriter,
    Path(id): Path<i32>,
    Form(form): Form<ImageForm>,
) -> Result<Redirect, AppError> {
    let removed = ProductRepository::new(state.pool())
        .remove_image(ProductId::new(id), &form.url)
        .await?;
    if removed {
        release_image(&state, &form.url).await?;
        set_flash(&session, Flash::success("Image removed")).await?;
    }
    Ok(Redirect::to(&format!("/products/{id}")))
}

#[derive(Debug, Deserialize)]
pub struct OptionForm {
    pub name: String,
    pub values: String,
}

impl OptionForm {
    /// Trimmed name and the de-duplicated value list.
    ///
    /// # Errors
    ///
    /// Returns the collected field errors.
    pub fn validate(&self) -> Result<(String, Vec<String>), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let name = errors.text("name", &self.name, MAX_OPTION_NAME_LENGTH, true);
        let values = normalize_values(&self.values);
        if values.is_empty() {
            errors.add("values", "Enter at least one value, separated by commas");
        }
        errors.into_result((name, values))
    }
}

/// Add an option such as Size with its values.
///
/// POST /products/{id}/options
#[instrument(skip(state, session, admin), fields(admin_id = %admin.id))]
pub async fn add_option(
    State(state): State<AppState>,
    session: Session,
    RequireWriter(admin): RequireWriter,
    Path(id): Path<i32>,
    Form(form): Form<OptionForm>,
) -> Result<Redirect, AppError> {
    let flash = match form.validate() {
        Ok((name, values)) => {
            match VariantRepository::new(state.pool())
                .add_option(ProductId::new(id), &name, &values)
                .await
            {
                Ok(option) => Flash::success(format!(
                    "Option {} added; generate the inventory to create its variants",
                    option.name
                )),
                Err(RepositoryError::Conflict(message)) => Flash::error(capitalise(&message)),
                Err(e) => return Err(e.into()),
            }
        }
        Err(errors) => Flash::error(errors.messages().join(" ")),
    };
    set_flash(&session, flash).await?;
    Ok(Redirect::to(&format!("/products/{id}")))
}

/// Remove an option. Existing variants stay until the next generation.
///
/// POST /products/{id}/options/{option_id}/delete
#[instrument(skip(state, session, admin), fields(admin_id = %admin.id))]
pub async fn delete_option(
    State(state): State<AppState>,
    session: Session,
    RequireWriter(admin): RequireWriter,
    Path((id, option_id)): Path<(i32, i32)>,
) -> Result<Redirect, AppError> {
    VariantRepository::new(state.pool())
        .delete_option(ProductId::new(id), VariantOptionId::new(option_id))
        .await?;
    set_flash(
        &session,
        Flash::success("Option removed; generate the inventory to update the variants"),
    )
    .await?;
    Ok(Redirect::to(&format!("/products/{id}")))
}

/// Create and remove variant rows to match the options.
///
/// POST /products/{id}/variants/generate
#[instrument(skip(state, session, admin), fields(admin_id = %admin.id))]
pub async fn generate(
    State(state): State<AppState>,
    session: Session,
    RequireWriter(admin): RequireWriter,
    Path(id): Path<i32>,
) -> Result<Redirect, AppError> {
    let flash = match inventory::generate_inventory(state.pool(), ProductId::new(id)).await {
        Ok(plan) if plan.is_noop() => Flash::success("Variants already match the options"),
        Ok(plan) => Flash::success(format!(
            "{} variants created, {} kept, {} removed",
            plan.create.len(),
            plan.keep.len(),
            plan.remove.len()
        )),
        Err(InventoryError::Variants(e)) => Flash::error(capitalise(&e.to_string())),
        Err(InventoryError::Repository(RepositoryError::Conflict(message))) => {
            Flash::error(capitalise(&message))
        }
        Err(e) => return Err(e.into()),
    };
    set_flash(&session, flash).await?;
    Ok(Redirect::to(&format!("/products/{id}")))
}

/// Read `sku_<id>`, `price_<id>` and `stock_<id>` for every variant.
///
/// # Errors
///
/// Returns the collected field errors, keyed by the input name.
fn parse_variant_updates(
    variants: &[Variant],
    fields: &HashMap<String, String>,
) -> Result<Vec<VariantUpdate>, ValidationErrors> {
    let mut errors = ValidationErrors::new();
    let field = |name: String| fields.get(&name).map_or("", String::as_str);

    let updates = variants
        .iter()
        .map(|variant| {
            let id = variant.id.as_i32();
            let label = variant.label();
            let sku_key = format!("sku_{id}");
            let price_key = format!("price_{id}");
            let stock_key = format!("stock_{id}");

            let sku = errors.optional_text(&label, field(sku_key), MAX_SKU_LENGTH);
            let price_override = errors.optional_money(&label, field(price_key));
            let stock = errors.stock(&label, field(stock_key));
            VariantUpdate {
                id: variant.id,
                sku,
                price_override,
                stock,
            }
        })
        .collect();

    errors.into_result(updates)
}

/// Save stock, SKU and price override of every variant at once.
///
/// POST /products/{id}/variants
#[instrument(skip(state, session, admin, fields), fields(admin_id = %admin.id))]
pub async fn save_variants(
    State(state): State<AppState>,
    session: Session,
    RequireWriter(admin): RequireWriter,
    Path(id): Path<i32>,
    Form(fields): Form<HashMap<String, String>>,
) -> Result<Redirect, AppError> {
    let product_id = ProductId::new(id);
    let variants = VariantRepository::new(state.pool()).variants(product_id).await?;

    let flash = match parse_variant_updates(&variants, &fields) {
        Ok(updates) => match inventory::save_variants(state.pool(), product_id, &updates).await {
            Ok(()) => Flash::success(format!("{} variants saved", updates.len())),
            Err(InventoryError::Repository(RepositoryError::Conflict(message))) => {
                Flash::error(capitalise(&message))
            }
            Err(e) => return Err(e.into()),
        },
        Err(errors) => Flash::error(errors.to_string()),
    };
    set_flash(&session, flash).await?;
    Ok(Redirect::to(&format!("/products/{id}")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use jouwwinkel_core::VariantId;
    use rust_decimal::Decimal;

    use super::*;

    fn form() -> ProductForm {
        ProductForm {
            category_id: "3".to_owned(),
            name: " Linnen schort ".to_owned(),
            slug: String::new(),
            description: "Stevig".to_owned(),
            price: "24,95".to_owned(),
            compare_at_price: String::new(),
            stock: "12".to_owned(),
            is_featured: None,
            is_active: Some("on".to_owned()),
        }
    }

    #[test]
    fn test_valid_product_form() {
        let input = form().validate().unwrap();
        assert_eq!(input.name, "Linnen schort");
        assert_eq!(input.slug, "linnen-schort");
        assert_eq!(input.price, Decimal::new(2495, 2));
        assert_eq!(input.category_id, Some(CategoryId::new(3)));
        assert!(input.is_active);
        assert!(!input.is_featured);
    }

    #[test]
    fn test_product_form_errors() {
        let bad = ProductForm {
            name: String::new(),
            price: "0".to_owned(),
            stock: "-1".to_owned(),
            ..form()
        };
        let errors = bad.validate().unwrap_err();
        assert!(errors.get("name").is_some());
        assert!(errors.get("price").is_some());
        assert!(errors.get("stock").is_some());

        let discounted = ProductForm {
            compare_at_price: "20".to_owned(),
            ..form()
        };
        assert!(discounted.validate().unwrap_err().get("compare_at_price").is_some());
    }

    #[test]
    fn test_option_form() {
        let form = OptionForm {
            name: "Maat".to_owned(),
            values: "S, M, m, L,".to_owned(),
        };
        let (name, values) = form.validate().unwrap();
        assert_eq!(name, "Maat");
        assert_eq!(values, vec!["S", "M", "L"]);

        let empty = OptionForm {
            name: "Kleur".to_owned(),
            values: " , ".to_owned(),
        };
        assert!(empty.validate().unwrap_err().get("values").is_some());
    }

    fn variant(id: i32, values: &[&str]) -> Variant {
        Variant {
            id: VariantId::new(id),
            product_id: ProductId::new(1),
            option_values: values.iter().map(|v| (*v).to_owned()).collect(),
            sku: None,
            price_override: None,
            stock: 0,
        }
    }

    #[test]
    fn test_parse_variant_updates() {
        let variants = [variant(7, &["S"]), variant(8, &["M"])];
        let fields: HashMap<String, String> = [
            ("sku_7", "SCH-S"),
            ("price_7", ""),
            ("stock_7", "4"),
            ("sku_8", ""),
            ("price_8", "26.50"),
            ("stock_8", "0"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_owned(), v.to_owned()))
        .collect();

        let updates = parse_variant_updates(&variants, &fields).unwrap();
        assert_eq!(updates[0].sku.as_deref(), Some("SCH-S"));
        assert_eq!(updates[0].stock, 4);
        assert_eq!(updates[1].sku, None);
        assert_eq!(updates[1].price_override, Some(Decimal::new(2650, 2)));
    }

    #[test]
    fn test_parse_variant_updates_rejects_bad_stock() {
        let variants = [variant(7, &["S"])];
        let fields: HashMap<String, String> =
            [("stock_7".to_owned(), "veel".to_owned())].into_iter().collect();
        let errors = parse_variant_updates(&variants, &fields).unwrap_err();
        assert!(errors.get("S").is_some());
    }
}
