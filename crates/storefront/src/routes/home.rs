//! Home page.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::State,
    response::{IntoResponse, Response},
};
use tracing::instrument;

use crate::db::{CatalogRepository, ComboRepository};
use crate::error::AppError;
use crate::filters;
use crate::routes::combos::{ComboCard, combo_cards};
use crate::routes::context::PageContext;
use crate::routes::products::{ProductCard, product_cards};
use crate::state::AppState;

const FEATURED_LIMIT: i64 = 8;
const HOME_COMBOS: usize = 3;

#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub ctx: PageContext,
    pub featured: Vec<ProductCard>,
    pub combos: Vec<ComboCard>,
}

/// GET /
///
/// Hero from the site settings, featured products, the category menu and a
/// few combos.
#[instrument(skip_all)]
pub async fn home(State(state): State<AppState>, ctx: PageContext) -> Result<Response, AppError> {
    let featured = CatalogRepository::new(state.pool())
        .featured_products(FEATURED_LIMIT)
        .await?;
    let featured = product_cards(&state, ctx.customer.as_ref(), &featured).await?;

    let mut combos = ComboRepository::new(state.pool()).list_active().await?;
    combos.truncate(HOME_COMBOS);
    let combos = combo_cards(&state, &combos).await?;

    Ok(HomeTemplate {
        ctx,
        featured,
        combos,
    }
    .into_response())
}
