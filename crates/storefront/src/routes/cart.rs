//! Cart route handlers.
//!
//! The cart lives in the session as item keys and quantities. It is
//! re-priced against the catalog on every view, so prices and stock shown are
//! always current. Mutations answer HTMX requests with fragments and plain
//! form posts with a redirect back to `/cart`.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{AppendHeaders, IntoResponse, Redirect, Response},
};
use chrono::Utc;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use jouwwinkel_core::cart::{Cart, CartItem, MAX_LINE_QUANTITY, PricedLine};
use jouwwinkel_core::coupon::{Coupon, normalize_code};
use jouwwinkel_core::{ComboId, Price, ProductId, VariantId};

use crate::db::RepositoryError;
use crate::error::AppError;
use crate::filters;
use crate::models::Flash;
use crate::routes::context::{PageContext, load_cart, save_cart, set_flash};
use crate::services::cart::{PricedCart, price_cart};
use crate::state::AppState;

/// One cart line ready for display.
#[derive(Clone)]
pub struct CartLineView {
    /// Item key posted back by the quantity and remove forms.
    pub key: String,
    pub title: String,
    pub url: String,
    pub variant_label: Option<String>,
    pub image_url: Option<String>,
    pub quantity: u32,
    pub unit_price: String,
    pub line_total: String,
    /// Units left when fewer than requested are in stock.
    pub short_of: Option<u32>,
}

impl From<&PricedLine> for CartLineView {
    fn from(line: &PricedLine) -> Self {
        let url = match line.item {
            CartItem::Product { .. } => format!("/products/{}", line.slug),
            CartItem::Combo { .. } => format!("/combos/{}", line.slug),
        };
        Self {
            key: line.item.to_string(),
            title: line.title.clone(),
            url,
            variant_label: line.variant_label.clone(),
            image_url: line.image_url.clone(),
            quantity: line.quantity,
            unit_price: Price::eur(line.unit_price).to_string(),
            line_total: Price::eur(line.line_total()).to_string(),
            short_of: if line.is_short() { line.available } else { None },
        }
    }
}

/// Cart display data for templates.
#[derive(Clone)]
pub struct CartView {
    pub lines: Vec<CartLineView>,
    pub item_count: u32,
    pub subtotal: String,
    pub discount: Option<String>,
    pub shipping: String,
    pub total: String,
    pub coupon_code: Option<String>,
    /// e.g. `10% off`, when the coupon counts.
    pub coupon_summary: Option<String>,
    /// Why the coupon code does not count right now.
    pub coupon_error: Option<String>,
    pub free_shipping_remaining: Option<String>,
    /// Lines removed because they can no longer be sold.
    pub dropped: usize,
    pub max_quantity: u32,
}

impl CartView {
    pub(crate) fn new(cart: &Cart, priced: &PricedCart) -> Self {
        let totals = &priced.totals;
        Self {
            lines: priced.lines.iter().map(CartLineView::from).collect(),
            item_count: totals.item_count,
            subtotal: Price::eur(totals.subtotal).to_string(),
            discount: (!totals.discount.is_zero()).then(|| Price::eur(totals.discount).to_string()),
            shipping: if totals.shipping.is_zero() {
                "Free".to_owned()
            } else {
                Price::eur(totals.shipping).to_string()
            },
            total: Price::eur(totals.total).to_string(),
            coupon_code: cart.coupon_code().map(str::to_owned),
            coupon_summary: priced.coupon.as_ref().map(Coupon::summary),
            coupon_error: priced.coupon_error.as_ref().map(ToString::to_string),
            free_shipping_remaining: priced
                .free_shipping_remaining
                .map(|r| Price::eur(r).to_string()),
            dropped: priced.dropped,
            max_quantity: MAX_LINE_QUANTITY,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// What keeps the cart from being ordered as shown: a line that cannot
    /// be filled, or a coupon code that would be refused at checkout.
    #[must_use]
    pub fn checkout_blocker(&self) -> Option<&'static str> {
        if self.lines.iter().any(|l| l.short_of.is_some()) {
            Some("Lower the quantities marked above to continue.")
        } else if self.coupon_error.is_some() {
            Some("Your coupon code no longer applies. Remove it to continue.")
        } else {
            None
        }
    }

    #[must_use]
    pub fn can_checkout(&self) -> bool {
        !self.is_empty() && self.checkout_blocker().is_none()
    }
}

/// Add to cart form data.
///
/// Exactly one of `product_id` and `combo_id` names the item.
#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub product_id: Option<i32>,
    pub variant_id: Option<i32>,
    pub combo_id: Option<i32>,
    pub quantity: Option<u32>,
}

impl AddToCartForm {
    fn item(&self) -> Option<CartItem> {
        match (self.product_id, self.combo_id) {
            (Some(product_id), None) => Some(CartItem::product(
                ProductId::new(product_id),
                self.variant_id.map(VariantId::new),
            )),
            (None, Some(combo_id)) => Some(CartItem::combo(ComboId::new(combo_id))),
            _ => None,
        }
    }
}

/// Update cart form data.
#[derive(Debug, Deserialize)]
pub struct UpdateCartForm {
    pub item: String,
    pub quantity: u32,
}

/// Remove from cart form data.
#[derive(Debug, Deserialize)]
pub struct RemoveFromCartForm {
    pub item: String,
}

#[derive(Debug, Deserialize)]
pub struct CouponForm {
    #[serde(default)]
    pub code: String,
}

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartShowTemplate {
    pub ctx: PageContext,
    pub cart: CartView,
    /// Always empty on the full page; shared with the fragment.
    pub notice: Option<String>,
}

/// Cart lines and totals fragment (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_items.html")]
pub struct CartItemsTemplate {
    pub cart: CartView,
    /// Inline message about the last change, such as a refused coupon.
    pub notice: Option<String>,
}

/// Cart count badge fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_count.html")]
pub struct CartCountTemplate {
    pub count: u32,
}

fn is_htmx(headers: &HeaderMap) -> bool {
    headers.contains_key("hx-request")
}

/// Re-price `cart` and store it back when unsellable lines were dropped.
pub(crate) async fn reprice(
    state: &AppState,
    session: &Session,
    cart: &mut Cart,
) -> Result<PricedCart, AppError> {
    let rule = state.content().ui_config().await?.shipping_rule();
    let mut conn = state.pool().acquire().await.map_err(RepositoryError::from)?;
    let priced = price_cart(&mut conn, cart, &rule, Utc::now()).await?;
    if priced.dropped > 0 {
        save_cart(session, cart).await?;
    }
    Ok(priced)
}

/// Answer a cart change: the refreshed fragment for HTMX, otherwise a flash
/// message and a redirect to the cart page.
async fn respond(
    state: &AppState,
    session: &Session,
    headers: &HeaderMap,
    cart: &mut Cart,
    notice: Option<Flash>,
) -> Result<Response, AppError> {
    if !is_htmx(headers) {
        if let Some(flash) = notice {
            set_flash(session, flash).await?;
        }
        return Ok(Redirect::to("/cart").into_response());
    }
    let priced = reprice(state, session, cart).await?;
    let view = CartView::new(cart, &priced);
    Ok((
        AppendHeaders([("HX-Trigger", "cart-updated")]),
        CartItemsTemplate {
            cart: view,
            notice: notice.map(|f| f.message),
        },
    )
        .into_response())
}

/// Display cart page.
#[instrument(skip_all)]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    ctx: PageContext,
) -> Result<CartShowTemplate, AppError> {
    let mut cart = load_cart(&session).await?;
    let priced = reprice(&state, &session, &mut cart).await?;
    let cart = CartView::new(&cart, &priced);
    // the badge was counted before unsellable lines were dropped
    let ctx = PageContext {
        cart_count: cart.item_count,
        ..ctx
    };
    Ok(CartShowTemplate {
        ctx,
        cart,
        notice: None,
    })
}

/// Add item to cart.
///
/// HTMX requests get the new count badge and a `cart-updated` trigger.
#[instrument(skip(state, session, headers))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    Form(form): Form<AddToCartForm>,
) -> Result<Response, AppError> {
    let item = form
        .item()
        .ok_or_else(|| AppError::BadRequest("Choose a product to add".to_owned()))?;
    let quantity = form.quantity.unwrap_or(1).clamp(1, MAX_LINE_QUANTITY);

    let mut cart = load_cart(&session).await?;
    cart.add(item, quantity);
    reprice(&state, &session, &mut cart).await?;

    // the catalog refused the item: unknown, inactive or missing its variant
    if cart.quantity_of(&item) == 0 {
        save_cart(&session, &cart).await?;
        let message = "This item can't be added to your cart";
        if is_htmx(&headers) {
            return Ok((StatusCode::UNPROCESSABLE_ENTITY, message).into_response());
        }
        set_flash(&session, Flash::error(message)).await?;
        return Ok(Redirect::to("/cart").into_response());
    }

    save_cart(&session, &cart).await?;
    tracing::debug!(%item, quantity, "Added to cart");

    if is_htmx(&headers) {
        return Ok((
            AppendHeaders([("HX-Trigger", "cart-updated")]),
            CartCountTemplate {
                count: cart.item_count(),
            },
        )
            .into_response());
    }
    set_flash(&session, Flash::success("Added to your cart")).await?;
    Ok(Redirect::to("/cart").into_response())
}

/// Change a line's quantity; zero removes it.
#[instrument(skip(state, session, headers))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    Form(form): Form<UpdateCartForm>,
) -> Result<Response, AppError> {
    let item: CartItem = form
        .item
        .parse()
        .map_err(|_| AppError::BadRequest("Unknown cart line".to_owned()))?;

    let mut cart = load_cart(&session).await?;
    cart.set_quantity(&item, form.quantity.min(MAX_LINE_QUANTITY));
    save_cart(&session, &cart).await?;

    respond(&state, &session, &headers, &mut cart, None).await
}

/// Remove a line from the cart.
#[instrument(skip(state, session, headers))]
pub async fn remove(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    Form(form): Form<RemoveFromCartForm>,
) -> Result<Response, AppError> {
    let item: CartItem = form
        .item
        .parse()
        .map_err(|_| AppError::BadRequest("Unknown cart line".to_owned()))?;

    let mut cart = load_cart(&session).await?;
    cart.remove(&item);
    save_cart(&session, &cart).await?;

    respond(&state, &session, &headers, &mut cart, None).await
}

/// Apply a coupon code. A code that does not apply to the cart right now is
/// refused and not stored.
#[instrument(skip(state, session, headers, form))]
pub async fn apply_coupon(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    Form(form): Form<CouponForm>,
) -> Result<Response, AppError> {
    let code = normalize_code(&form.code);
    let mut cart = load_cart(&session).await?;

    let notice = if code.is_empty() {
        Flash::error("Enter a coupon code")
    } else if cart.is_empty() {
        Flash::error("Add something to your cart first")
    } else {
        let previous = cart.coupon_code().map(str::to_owned);
        cart.set_coupon(Some(&code));
        let priced = reprice(&state, &session, &mut cart).await?;
        match priced.coupon_error {
            Some(e) => {
                cart.set_coupon(previous.as_deref());
                Flash::error(capitalize(&e.to_string()))
            }
            None => {
                save_cart(&session, &cart).await?;
                tracing::info!(code = %code, "Coupon applied");
                Flash::success(format!("Coupon {code} applied"))
            }
        }
    };

    respond(&state, &session, &headers, &mut cart, Some(notice)).await
}

/// Take the coupon off the cart.
#[instrument(skip_all)]
pub async fn remove_coupon(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let mut cart = load_cart(&session).await?;
    cart.set_coupon(None);
    save_cart(&session, &cart).await?;
    respond(&state, &session, &headers, &mut cart, None).await
}

/// Get cart count badge (HTMX).
#[instrument(skip_all)]
pub async fn count(session: Session) -> Result<CartCountTemplate, AppError> {
    let count = load_cart(&session).await?.item_count();
    Ok(CartCountTemplate { count })
}

pub(crate) fn capitalize(message: &str) -> String {
    let mut chars = message.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use jouwwinkel_core::cart::CartTotals;
    use jouwwinkel_core::coupon::CouponError;
    use rust_decimal::Decimal;

    use super::*;

    fn line(item: CartItem, quantity: u32, available: Option<u32>) -> PricedLine {
        PricedLine {
            item,
            title: "Theedoek".to_owned(),
            slug: "theedoek".to_owned(),
            variant_label: None,
            image_url: None,
            unit_price: Decimal::new(450, 2),
            quantity,
            available,
        }
    }

    #[test]
    fn test_add_form_names_exactly_one_item() {
        let form = |product_id, combo_id| AddToCartForm {
            product_id,
            variant_id: Some(3),
            combo_id,
            quantity: None,
        };
        assert_eq!(
            form(Some(1), None).item(),
            Some(CartItem::product(ProductId::new(1), Some(VariantId::new(3))))
        );
        assert_eq!(form(None, Some(2)).item(), Some(CartItem::combo(ComboId::new(2))));
        assert_eq!(form(Some(1), Some(2)).item(), None);
        assert_eq!(form(None, None).item(), None);
    }

    #[test]
    fn test_line_view_links_and_shortage() {
        let view = CartLineView::from(&line(CartItem::product(ProductId::new(1), None), 3, Some(2)));
        assert_eq!(view.url, "/products/theedoek");
        assert_eq!(view.short_of, Some(2));
        assert_eq!(view.line_total, "€13.50");

        let combo = CartLineView::from(&line(CartItem::combo(ComboId::new(4)), 1, Some(5)));
        assert_eq!(combo.url, "/combos/theedoek");
        assert_eq!(combo.key, "c4");
        assert_eq!(combo.short_of, None);
    }

    #[test]
    fn test_short_line_blocks_checkout() {
        let lines = vec![line(CartItem::product(ProductId::new(1), None), 3, Some(2))];
        let priced = PricedCart {
            totals: CartTotals::default(),
            lines,
            ..PricedCart::default()
        };
        let view = CartView::new(&Cart::new(), &priced);
        assert!(!view.is_empty());
        assert!(!view.can_checkout());
        assert_eq!(
            view.checkout_blocker(),
            Some("Lower the quantities marked above to continue.")
        );
        assert_eq!(view.shipping, "Free");
        assert!(view.discount.is_none());
    }

    #[test]
    fn test_refused_coupon_blocks_checkout() {
        let mut cart = Cart::new();
        cart.set_coupon(Some("ZOMER"));
        let priced = PricedCart {
            lines: vec![line(CartItem::product(ProductId::new(1), None), 1, Some(5))],
            coupon_error: Some(CouponError::Expired),
            ..PricedCart::default()
        };
        let view = CartView::new(&cart, &priced);
        assert!(!view.can_checkout());
        assert_eq!(
            view.checkout_blocker(),
            Some("Your coupon code no longer applies. Remove it to continue.")
        );

        let fine = PricedCart {
            coupon_error: None,
            ..priced
        };
        assert!(CartView::new(&cart, &fine).can_checkout());
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("this coupon has expired"), "This coupon has expired");
        assert_eq!(capitalize(""), "");
    }
}
