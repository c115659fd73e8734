//! Category pages.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
};

use crate::error::AppError;
use crate::filters;
use crate::routes::context::PageContext;
use crate::routes::products::{self, ListQuery};
use crate::state::AppState;

#[derive(Template, WebTemplate)]
#[template(path = "categories/index.html")]
pub struct CategoriesTemplate {
    pub ctx: PageContext,
}

/// GET /categories
///
/// The category list is the cached menu already carried by the page context.
pub async fn index(ctx: PageContext) -> impl IntoResponse {
    CategoriesTemplate { ctx }
}

/// GET /categories/{slug}
///
/// Same page as `/products?category={slug}`, keeping sort and page.
pub async fn show(
    state: State<AppState>,
    ctx: PageContext,
    Path(slug): Path<String>,
    Query(query): Query<ListQuery>,
) -> Result<Response, AppError> {
    products::index(
        state,
        ctx,
        Query(ListQuery {
            category: Some(slug),
            ..query
        }),
    )
    .await
}
