//! Category management.

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

use jouwwinkel_core::CategoryId;
use jouwwinkel_core::models::Category;
use jouwwinkel_core::validation::ValidationErrors;

use crate::db::{CategoryInput, CategoryRepository, CategoryRow};
use crate::error::AppError;
use crate::filters;
use crate::middleware::RequireWriter;
use crate::models::Flash;
use crate::routes::context::{PageContext, set_flash};
use crate::routes::forms::{conflict_on, image_url};
use crate::state::AppState;

const MAX_NAME_LENGTH: usize = 100;
const MAX_DESCRIPTION_LENGTH: usize = 2_000;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CategoryForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub sort_order: String,
    pub is_active: Option<String>,
}

impl CategoryForm {
    fn from_category(category: &Category) -> Self {
        Self {
            name: category.name.clone(),
            slug: category.slug.clone(),
            description: category.description.clone().unwrap_or_default(),
            image_url: category.image_url.clone().unwrap_or_default(),
            sort_order: category.sort_order.to_string(),
            is_active: category.is_active.then(|| "on".to_owned()),
        }
    }

    #[must_use]
    pub const fn active(&self) -> bool {
        self.is_active.is_some()
    }

    /// # Errors
    ///
    /// Returns the collected field errors.
    pub fn validate(&self) -> Result<CategoryInput, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let name = errors.text("name", &self.name, MAX_NAME_LENGTH, true);
        let slug = errors.slug("slug", &self.slug, &name);
        let description = errors.optional_text("description", &self.description, MAX_DESCRIPTION_LENGTH);
        let image_url = image_url(&mut errors, "image_url", &self.image_url);
        let sort_order = errors.optional_int("sort_order", &self.sort_order, 0).unwrap_or(0);

        errors.into_result(CategoryInput {
            name,
            slug,
            description,
            image_url,
            sort_order,
            is_active: self.active(),
        })
    }
}

#[derive(Template, WebTemplate)]
#[template(path = "categories/index.html")]
pub struct CategoriesIndexTemplate {
    pub ctx: PageContext,
    pub categories: Vec<CategoryRow>,
}

#[derive(Template, WebTemplate)]
#[template(path = "categories/form.html")]
pub struct CategoryFormTemplate {
    pub ctx: PageContext,
    pub category_id: Option<i32>,
    pub form: CategoryForm,
    pub errors: ValidationErrors,
}

fn form_page(
    ctx: PageContext,
    category_id: Option<i32>,
    form: CategoryForm,
    errors: ValidationErrors,
) -> Response {
    let page = CategoryFormTemplate {
        ctx,
        category_id,
        form,
        errors,
    };
    (StatusCode::UNPROCESSABLE_ENTITY, page).into_response()
}

/// GET /categories
#[instrument(skip_all)]
pub async fn index(
    State(state): State<AppState>,
    ctx: PageContext,
) -> Result<CategoriesIndexTemplate, AppError> {
    let categories = CategoryRepository::new(state.pool()).list().await?;
    Ok(CategoriesIndexTemplate { ctx, categories })
}

/// GET /categories/new
pub async fn new_category(ctx: PageContext) -> CategoryFormTemplate {
    CategoryFormTemplate {
        ctx,
        category_id: None,
        form: CategoryForm {
            sort_order: "0".to_owned(),
            is_active: Some("on".to_owned()),
            ..CategoryForm::default()
        },
        errors: ValidationErrors::new(),
    }
}

/// POST /categories
#[instrument(skip(state, session, ctx, admin, form), fields(admin_id = %admin.id))]
pub async fn create(
    State(state): State<AppState>,
    session: Session,
    RequireWriter(admin): RequireWriter,
    ctx: PageContext,
    Form(form): Form<CategoryForm>,
) -> Result<Response, AppError> {
    let input = match form.validate() {
        Ok(input) => input,
        Err(errors) => return Ok(form_page(ctx, None, form, errors)),
    };
    match CategoryRepository::new(state.pool()).create(&input).await {
        Ok(category) => {
            tracing::info!(category_id = %category.id, "Category created");
            set_flash(&session, Flash::success(format!("{} created", category.name))).await?;
            Ok(Redirect::to("/categories").into_response())
        }
        Err(e) => Ok(form_page(ctx, None, form, conflict_on("slug", e)?)),
    }
}

/// GET /categories/{id}
#[instrument(skip(state, ctx))]
pub async fn edit(
    State(state): State<AppState>,
    ctx: PageContext,
    Path(id): Path<i32>,
) -> Result<CategoryFormTemplate, AppError> {
    let category = CategoryRepository::new(state.pool())
        .get(CategoryId::new(id))
        .await?
        .ok_or_else(|| AppError::NotFound("Category".to_owned()))?;
    Ok(CategoryFormTemplate {
        ctx,
        category_id: Some(id),
        form: CategoryForm::from_category(&category),
        errors: ValidationErrors::new(),
    })
}

/// POST /categories/{id}
#[instrument(skip(state, session, ctx, admin, form), fields(admin_id = %admin.id))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    RequireWriter(admin): RequireWriter,
    ctx: PageContext,
    Path(id): Path<i32>,
    Form(form): Form<CategoryForm>,
) -> Result<Response, AppError> {
    let input = match form.validate() {
        Ok(input) => input,
        Err(errors) => return Ok(form_page(ctx, Some(id), form, errors)),
    };
    match CategoryRepository::new(state.pool())
        .update(CategoryId::new(id), &input)
        .await
    {
        Ok(category) => {
            tracing::info!(category_id = %category.id, "Category updated");
            set_flash(&session, Flash::success("Category saved")).await?;
            Ok(Redirect::to("/categories").into_response())
        }
        Err(e) => Ok(form_page(ctx, Some(id), form, conflict_on("slug", e)?)),
    }
}

/// Delete a category; its products stay, without a category.
///
/// POST /categories/{id}/delete
#[instrument(skip(state, session, admin), fields(admin_id = %admin.id))]
pub async fn delete(
    State(state): State<AppState>,
    session: Session,
    RequireWriter(admin): RequireWriter,
    Path(id): Path<i32>,
) -> Result<Redirect, AppError> {
    CategoryRepository::new(state.pool())
        .delete(CategoryId::new(id))
        .await?;
    tracing::info!(category_id = id, "Category deleted");
    set_flash(&session, Flash::success("Category deleted")).await?;
    Ok(Redirect::to("/categories"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_category_form() {
        let form = CategoryForm {
            name: "Keuken & Tafel".to_owned(),
            sort_order: "2".to_owned(),
            is_active: Some("on".to_owned()),
            ..CategoryForm::default()
        };
        let input = form.validate().unwrap();
        assert_eq!(input.slug, "keuken-tafel");
        assert_eq!(input.sort_order, 2);
        assert_eq!(input.description, None);
        assert!(input.is_active);
    }

    #[test]
    fn test_category_form_errors() {
        let form = CategoryForm {
            name: "Tassen".to_owned(),
            sort_order: "-1".to_owned(),
            image_url: "ftp://example.com/a.png".to_owned(),
            ..CategoryForm::default()
        };
        let errors = form.validate().unwrap_err();
        assert!(errors.get("sort_order").is_some());
        assert!(errors.get("image_url").is_some());
    }
}
