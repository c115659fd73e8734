//! Wishlist toggle (HTMX).

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    http::HeaderMap,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tracing::instrument;

use jouwwinkel_core::ProductId;

use crate::db::WishlistRepository;
use crate::error::AppError;
use crate::middleware::auth::{RequireAuth, safe_return_path};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ToggleForm {
    pub product_id: i32,
    /// Page to return to for non-HTMX posts.
    #[serde(default)]
    pub next: String,
}

/// The heart button, swapped in place.
#[derive(Template, WebTemplate)]
#[template(path = "partials/wishlist_button.html")]
pub struct WishlistButtonTemplate {
    pub product_id: i32,
    pub saved: bool,
}

/// Save or unsave a product.
#[instrument(skip(state, headers, current), fields(customer_id = %current.id))]
pub async fn toggle(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
    headers: HeaderMap,
    Form(form): Form<ToggleForm>,
) -> Result<Response, AppError> {
    let saved = WishlistRepository::new(state.pool())
        .toggle(current.id, ProductId::new(form.product_id))
        .await?;
    tracing::debug!(saved, "Wishlist toggled");

    if headers.contains_key("hx-request") {
        return Ok(WishlistButtonTemplate {
            product_id: form.product_id,
            saved,
        }
        .into_response());
    }
    let back = safe_return_path(&form.next).unwrap_or("/account/wishlist");
    Ok(Redirect::to(back).into_response())
}
